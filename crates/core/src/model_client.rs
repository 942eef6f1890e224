use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use tokio::time::sleep;
use tracing::Instrument;
use tutor_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent,
};

/// The error returned by [`ModelClient::invoke`].
pub type ModelClientError = Box<dyn ModelProviderError>;

type SendRequestResult = Result<String, ModelClientError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How rate-limited requests are retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between two attempts.
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }
}

/// A wrapper around a model provider that provides a type-erased chat
/// completion interface for the orchestrators.
///
/// The client does nothing until [`ModelClient::invoke`] is called.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
}

impl ModelClient {
    /// Wraps a model provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Sends the messages and returns the complete reply, which is always
    /// an assistant message.
    ///
    /// Requests failing with [`ErrorKind::RateLimitExceeded`] are retried
    /// according to the [`RetryPolicy`], other errors are returned at once.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    pub async fn invoke(
        &self,
        messages: Vec<ModelMessage>,
    ) -> Result<ModelMessage, ModelClientError> {
        let req = ModelRequest { messages };
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_policy.initial_interval)
            .with_max_interval(self.retry_policy.max_interval)
            .with_max_elapsed_time(None)
            .build();
        let mut retries = 0;

        loop {
            let err = match (self.handler_fn)(req.clone()).await {
                Ok(transcript) => return Ok(ModelMessage::Assistant(transcript)),
                Err(err) => err,
            };
            if err.kind() != ErrorKind::RateLimitExceeded
                || retries >= self.retry_policy.max_retries
            {
                return Err(err);
            }
            let Some(delay) = backoff.next_backoff() else {
                return Err(err);
            };
            retries += 1;
            warn!("rate limited, retry #{retries} in {delay:?}");
            sleep(delay).await;
        }
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(Box::new(err));
        }
    };

    let mut transcript = String::new();

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(event) => event,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Box::new(err));
            }
        };

        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
            }
            ModelResponseEvent::Completed(reason) => {
                debug!("model finished: {reason:?}");
            }
        }
    }

    trace!("finished a request");

    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use tutor_test_model::{PresetEvent, PresetResponse, TestModelProvider};

    use super::*;

    fn hi() -> Vec<ModelMessage> {
        vec![ModelMessage::User("Hi".to_owned())]
    }

    #[tokio::test]
    async fn test_invoke() {
        let model_provider = TestModelProvider::default();
        for _ in 0..3 {
            model_provider.add_response(PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]));
        }

        let model_client = ModelClient::new(model_provider.clone());

        for _ in 0..3 {
            let reply = model_client.invoke(hi()).await.unwrap();
            assert_eq!(reply, ModelMessage::Assistant("How are you?".to_owned()));
        }
        assert_eq!(model_provider.requests().len(), 3);
        assert_eq!(model_provider.requests()[0].messages, hi());
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_failure("timeout"));
        let model_client = ModelClient::new(model_provider.clone());

        let err = model_client.invoke(hi()).await.unwrap_err();
        assert_eq!(err.to_string(), "timeout");
        assert_eq!(err.kind(), ErrorKind::Other);
        // Only rate limiting is retried.
        assert_eq!(model_provider.requests().len(), 1);

        let err = model_client.invoke(hi()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_rate_limited() {
        let model_provider = TestModelProvider::default();
        model_provider
            .add_response(PresetResponse::with_text("RESPONSE: ok").with_failures(2));
        let model_client = ModelClient::new(model_provider.clone());

        let reply = model_client.invoke(hi()).await.unwrap();
        assert_eq!(reply.content(), "RESPONSE: ok");
        assert_eq!(model_provider.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let model_provider = TestModelProvider::default();
        model_provider
            .add_response(PresetResponse::with_text("never").with_failures(0));
        let model_client =
            ModelClient::new(model_provider.clone()).with_retry_policy(
                RetryPolicy {
                    max_retries: 2,
                    ..RetryPolicy::default()
                },
            );

        let err = model_client.invoke(hi()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(model_provider.requests().len(), 3);
    }
}
