//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use tutor_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: Vec<PresetEvent>,
    event_idx: usize,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();

        let Some(sleep) = &mut this.sleep else {
            this.sleep = Some(Box::pin(sleep(this.delay)));
            return Pin::new(this).poll_next_event(cx);
        };
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        let event_idx = this.event_idx;
        this.event_idx += 1;
        match this.events.get(event_idx) {
            Some(PresetEvent::MessageDelta(msg)) => {
                Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                    msg.clone(),
                ))))
            }
            Some(PresetEvent::Failure(message)) => {
                // Nothing can be pulled out after a failure.
                this.event_idx = this.events.len() + 1;
                Poll::Ready(Err(Error::new(message.clone(), ErrorKind::Other)))
            }
            None if event_idx == this.events.len() => Poll::Ready(Ok(Some(
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ))),
            // In case this method is called after completion.
            None => Poll::Ready(Ok(None)),
        }
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    failed_attempts: u64,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Before sending requests, you need to setup the script, which is how the
/// model should respond. Each request consumes the next preset response in
/// the order they were added. If the script runs out of responses, an
/// error will be returned.
///
/// Every request is recorded, so tests can inspect what the model was
/// actually asked. Clones of the provider share the same script.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.lock_script().responses.push_back(preset);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_script().requests.clone()
    }

    /// Returns the number of preset responses not consumed yet.
    #[inline]
    pub fn remaining_responses(&self) -> usize {
        self.lock_script().responses.len()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_response(&self, req: &ModelRequest) -> Result<Vec<PresetEvent>, Error> {
        let mut script = self.lock_script();
        script.requests.push(req.clone());

        let Some(preset) = script.responses.front() else {
            return Err(Error::new("no enough steps", ErrorKind::Other));
        };
        if let Some(failures) = preset.failures {
            if failures == 0 || script.failed_attempts < failures {
                script.failed_attempts += 1;
                return Err(Error::new(
                    "rate limited",
                    ErrorKind::RateLimitExceeded,
                ));
            }
        }

        script.failed_attempts = 0;
        let events = script
            .responses
            .pop_front()
            .map(|preset| preset.events)
            .unwrap_or_default();
        Ok(events)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let resp = self.next_response(req).map(|events| TestModelResponse {
            events,
            event_idx: 0,
            delay,
            sleep: None,
        });
        ready(resp)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use tutor_model::{ModelMessage, ModelRequest};

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> Result<String, Error> {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        loop {
            let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?;
            match event {
                Some(ModelResponseEvent::MessageDelta(delta)) => {
                    msg.push_str(&delta);
                }
                Some(ModelResponseEvent::Completed(_)) | None => break,
            }
        }
        Ok(msg)
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::User(text.to_owned())],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_text("RESPONSE: Sure."));

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "Hello, world!");

        let resp = provider.send_request(&request("Again")).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "RESPONSE: Sure.");

        assert_eq!(provider.remaining_responses(), 0);
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1], request("Again"));
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_text("ok").with_failures(2));

        for _ in 0..2 {
            let err = provider.send_request(&request("Hi")).await.err().unwrap();
            assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        }
        let resp = provider.send_request(&request("Hi")).await.unwrap();
        assert_eq!(collect_response(resp).await.unwrap(), "ok");

        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_failure_event() {
        let provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_failure("timeout"));

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        let err = collect_response(resp).await.unwrap_err();
        assert_eq!(err.to_string(), "timeout");
    }
}
