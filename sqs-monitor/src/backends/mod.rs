#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "in_memory")]
pub mod in_memory;

#[cfg(feature = "aws")]
pub use aws::{AwsBackend, AwsConfig, SnsClient, SqsClient};
#[cfg(feature = "in_memory")]
pub use in_memory::{InMemoryBackend, InMemoryQueueClient, InMemoryTopicClient};
