use std::{collections::VecDeque, future::Future};

use futures_util::{stream, Stream};
use tracing::{trace, warn};

use crate::Result;

/// One page of results as delivered by a backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token for the next page. `None` or an empty token ends
    /// the listing.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Something able to fetch the page starting at a continuation token.
pub trait PageSource: Send {
    type Item: Send;

    fn fetch_page(
        &mut self,
        next_token: Option<String>,
    ) -> impl Future<Output = Result<Page<Self::Item>>> + Send;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    FirstPage,
    MorePages,
    Exhausted,
}

/// A pull-based, one-shot sequence over the pages of a [`PageSource`].
///
/// A page is only requested once every item of the previous one has been
/// handed out and the consumer asks for another. The sequence ends when the
/// source reports no continuation token or when a fetch fails; failures are
/// logged and never returned to the consumer. Dropping the paginator stops it
/// early without further requests.
pub struct Paginator<S: PageSource> {
    source: Option<S>,
    what: &'static str,
    buffer: VecDeque<S::Item>,
    next_token: Option<String>,
    state: State,
    degraded: bool,
}

impl<S: PageSource> Paginator<S> {
    /// `what` names the listed items in log output, e.g. `"queues"`.
    pub fn new(source: S, what: &'static str) -> Self {
        Self {
            source: Some(source),
            what,
            buffer: VecDeque::new(),
            next_token: None,
            state: State::FirstPage,
            degraded: false,
        }
    }

    /// A paginator that yields nothing, used when there is no client to ask.
    pub fn empty(what: &'static str) -> Self {
        Self {
            source: None,
            what,
            buffer: VecDeque::new(),
            next_token: None,
            state: State::Exhausted,
            degraded: true,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.state != State::Exhausted
    }

    /// Whether the sequence ended short: there was no source to ask, or a
    /// page could not be fetched.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub async fn next(&mut self) -> Option<S::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(item);
            }
            if !self.has_more_pages() {
                return None;
            }
            let Some(source) = self.source.as_mut() else {
                self.state = State::Exhausted;
                return None;
            };

            let token = self.next_token.take();
            trace!(what = self.what, first = self.state == State::FirstPage, "fetching page");
            match source.fetch_page(token).await {
                Ok(page) => {
                    self.buffer.extend(page.items);
                    self.next_token = page.next_token.filter(|t| !t.is_empty());
                    self.state = if self.next_token.is_some() {
                        State::MorePages
                    } else {
                        State::Exhausted
                    };
                }
                Err(e) => {
                    warn!(what = self.what, error = %e, "unable to get next page");
                    self.state = State::Exhausted;
                    self.source = None;
                    self.degraded = true;
                    return None;
                }
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = S::Item> + Send {
        stream::unfold(self, |mut pages| async move {
            let item = pages.next().await?;
            Some((item, pages))
        })
    }
}
