use aws_config::{profile::ProfileFileCredentialsProvider, BehaviorVersion, SdkConfig};
use aws_credential_types::provider::ProvideCredentials as _;
use aws_sdk_sqs::error::DisplayErrorContext;

use crate::{
    lifecycle::Message,
    pagination::Page,
    provider::{Provider, QueueClient, Topic, TopicClient},
    MonitorError, Result,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AwsConfig {
    /// Named profile to load instead of the default one.
    pub profile: Option<String>,
    /// Endpoint override, e.g. for ElasticMQ or LocalStack.
    pub endpoint_url: Option<String>,
}

/// Amazon SQS for queues and Amazon SNS for topics.
pub struct AwsBackend {
    cfg: AwsConfig,
}

impl AwsBackend {
    pub fn new(cfg: AwsConfig) -> Self {
        Self { cfg }
    }
}

impl Provider for AwsBackend {
    type Config = SdkConfig;

    type Queue = SqsClient;
    type Topic = SnsClient;

    async fn load_config(&self) -> Result<SdkConfig> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(profile) = &self.cfg.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint_url) = &self.cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        if sdk_config.region().is_none() {
            return Err(MonitorError::Configuration(
                "no AWS region found in the environment or profile".to_owned(),
            ));
        }
        // A named profile must exist and yield credentials on its own, even
        // when the environment could stand in for it.
        if let Some(profile) = &self.cfg.profile {
            ProfileFileCredentialsProvider::builder()
                .profile_name(profile)
                .build()
                .provide_credentials()
                .await
                .map_err(|e| {
                    MonitorError::Configuration(format!(
                        "unable to use AWS profile `{profile}`: {}",
                        DisplayErrorContext(&e)
                    ))
                })?;
        }

        // The default chain is always installed; ask it for credentials so a
        // bare environment fails here rather than on the first request.
        let Some(credentials) = sdk_config.credentials_provider() else {
            return Err(MonitorError::Configuration(
                "no AWS credentials provider available".to_owned(),
            ));
        };
        credentials.provide_credentials().await.map_err(|e| {
            MonitorError::Configuration(format!(
                "no AWS credentials found: {}",
                DisplayErrorContext(&e)
            ))
        })?;

        Ok(sdk_config)
    }

    fn queue_client(&self, config: &SdkConfig) -> Result<SqsClient> {
        Ok(SqsClient(aws_sdk_sqs::Client::new(config)))
    }

    fn topic_client(&self, config: &SdkConfig) -> Result<SnsClient> {
        Ok(SnsClient(aws_sdk_sns::Client::new(config)))
    }
}

#[derive(Clone, Debug)]
pub struct SqsClient(aws_sdk_sqs::Client);

impl SqsClient {
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self(client)
    }
}

impl QueueClient for SqsClient {
    async fn list_queues_page(&self, next_token: Option<String>) -> Result<Page<String>> {
        let out = self
            .0
            .list_queues()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(MonitorError::provider)?;

        Ok(Page::new(out.queue_urls.unwrap_or_default(), out.next_token))
    }

    async fn receive_messages(
        &self,
        queue: &str,
        max_messages: i32,
        wait_seconds: i32,
    ) -> Result<Vec<Message>> {
        let out = self
            .0
            .receive_message()
            .queue_url(queue)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(MonitorError::provider)?;

        Ok(out
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|message| Message {
                message_id: message.message_id,
                body: message.body,
                receipt_handle: message.receipt_handle,
            })
            .collect())
    }

    async fn delete_message(&self, queue: &str, receipt_handle: &str) -> Result<()> {
        self.0
            .delete_message()
            .queue_url(queue)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(MonitorError::provider)?;

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SnsClient(aws_sdk_sns::Client);

impl SnsClient {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self(client)
    }
}

impl TopicClient for SnsClient {
    async fn list_topics_page(&self, next_token: Option<String>) -> Result<Page<Topic>> {
        let out = self
            .0
            .list_topics()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(MonitorError::provider)?;

        let topics = out
            .topics
            .unwrap_or_default()
            .into_iter()
            .map(|topic| Topic {
                topic_arn: topic.topic_arn,
            })
            .collect();
        Ok(Page::new(topics, out.next_token))
    }
}
