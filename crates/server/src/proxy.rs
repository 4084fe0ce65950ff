//! Chat proxy: turns one inbound conversation into one upstream stream and
//! relays it as [`StreamEvent`]s.
//!
//! Every relayed stream ends with exactly one terminal event (`Done` or
//! `Error`). The stream is pull-driven: the upstream is polled only when the
//! consumer asks for the next event, so a slow client pauses the upstream
//! instead of growing a buffer. Dropping the stream drops the upstream and
//! releases the concurrency permit.

use std::{pin::Pin, sync::Arc, time::Duration};

use futures::{Stream, StreamExt};
use providers::ProviderRegistry;
use relay_core::llm::{ChatDelta, ChatOpts, ChatStream};
use relay_core::{validate_conversation, ChatError, ProviderKind, RawMessage, StreamEvent};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// One inbound chat call, as parsed from the request body.
#[derive(Clone, Debug, Default)]
pub struct ChatRequest {
    pub messages: Vec<RawMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

pub struct ChatProxy {
    registry: ProviderRegistry,
    limiter: Arc<Semaphore>,
    max_concurrent: usize,
    idle_timeout: Duration,
    defaults: ChatOpts,
}

impl ChatProxy {
    pub fn new(registry: ProviderRegistry, max_concurrent: usize, idle_timeout: Duration) -> Self {
        Self {
            registry,
            limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            idle_timeout,
            defaults: ChatOpts::default(),
        }
    }

    /// Streams currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.limiter.available_permits()
    }

    /// Validates, opens the upstream and returns the live event stream.
    ///
    /// Errors returned here happen before any byte of the response is
    /// committed; failures after this point arrive as an in-band
    /// `StreamEvent::Error`.
    pub async fn open(&self, provider: &str, req: ChatRequest) -> Result<EventStream, ChatError> {
        let kind: ProviderKind = provider.parse()?;
        let client = self.registry.resolve(kind)?;
        let msgs = validate_conversation(req.messages)?;
        let opts = self.defaults.merged(req.max_tokens, req.temperature);
        opts.validate()?;

        let permit = self.limiter.clone().try_acquire_owned().map_err(|_| {
            warn!(target:"server::proxy","rejecting {} request: {} streams in flight", kind, self.max_concurrent);
            ChatError::Overloaded(format!(
                "{} concurrent streams already in flight",
                self.max_concurrent
            ))
        })?;

        info!(target:"server::proxy","processing {} request with {} messages", kind, msgs.len());
        let upstream = client.stream_chat(msgs, opts).await?;
        Ok(Box::pin(relay(upstream, self.idle_timeout, permit)))
    }
}

/// Forwards upstream fragments one-for-one and closes with a single
/// terminal event. The permit lives exactly as long as the stream.
pub fn relay(
    mut upstream: ChatStream,
    idle: Duration,
    permit: OwnedSemaphorePermit,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    async_stream::stream! {
        let _permit = permit;
        let mut fragments = 0usize;
        loop {
            match tokio::time::timeout(idle, upstream.next()).await {
                Ok(Some(Ok(ChatDelta::Text(text)))) => {
                    if text.is_empty() {
                        continue;
                    }
                    fragments += 1;
                    yield StreamEvent::Content(text);
                }
                Ok(Some(Ok(ChatDelta::Finish(reason)))) => {
                    debug!(target:"server::proxy","upstream finished reason={:?} fragments={}", reason, fragments);
                    yield StreamEvent::Done;
                    break;
                }
                Ok(None) => {
                    debug!(target:"server::proxy","upstream closed fragments={}", fragments);
                    yield StreamEvent::Done;
                    break;
                }
                Ok(Some(Err(e))) => {
                    warn!(target:"server::proxy","upstream failed after {} fragments: {}", fragments, e);
                    yield StreamEvent::Error(e.to_string());
                    break;
                }
                Err(_) => {
                    let e = ChatError::Timeout(format!("no upstream activity for {}ms", idle.as_millis()));
                    warn!(target:"server::proxy","aborting stream after {} fragments: {}", fragments, e);
                    yield StreamEvent::Error(e.to_string());
                    break;
                }
            }
        }
    }
}
