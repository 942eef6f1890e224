use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tutor_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
};

use crate::Error;
use crate::io::Lines;
use crate::proto::ChatChunk;

struct PartialState {
    lines: Lines,
    pending_finish_reason: Option<ModelFinishReason>,
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OllamaResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OllamaResponse {
    #[inline]
    pub(crate) fn from_lines(lines: Lines) -> Self {
        let partial_state = PartialState {
            lines,
            pending_finish_reason: None,
        };
        Self {
            next_event_fut: Some(Box::pin(next_event(partial_state))),
        }
    }
}

impl ModelResponse for OllamaResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(next_event_fut.as_mut().poll(cx));
        *this.next_event_fut = None;
        let (event, partial_state) = match result {
            Ok((Some(event), partial_state)) => (event, partial_state),
            Ok((None, _)) => return Poll::Ready(Ok(None)),
            Err(err) => return Poll::Ready(Err(err)),
        };

        *this.next_event_fut = Some(Box::pin(next_event(partial_state)));
        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    if let Some(reason) = partial_state.pending_finish_reason.take() {
        return Ok((Some(ModelResponseEvent::Completed(reason)), partial_state));
    }

    loop {
        let line = match partial_state.lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                return Err(Error::new(format!("{err:?}"), ErrorKind::Other));
            }
        };
        trace!("got ndjson line: {line}");

        let chunk = serde_json::from_str::<ChatChunk>(&line)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if let Some(error) = chunk.error {
            return Err(Error::new(error, ErrorKind::Other));
        }
        if chunk.done {
            partial_state.pending_finish_reason =
                Some(match chunk.done_reason.as_deref() {
                    Some("length") => ModelFinishReason::Length,
                    _ => ModelFinishReason::Stop,
                });
        }

        let content = chunk.message.map(|m| m.content).unwrap_or_default();
        if !content.is_empty() {
            return Ok((
                Some(ModelResponseEvent::MessageDelta(content)),
                partial_state,
            ));
        }
        if let Some(reason) = partial_state.pending_finish_reason.take() {
            return Ok((
                Some(ModelResponseEvent::Completed(reason)),
                partial_state,
            ));
        }
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        chunks: Chunks,
    ) -> Result<(String, Option<ModelFinishReason>), Error> {
        let mut resp = pin!(OllamaResponse::from_lines(Lines::new(chunks)));
        let mut text = String::new();
        let mut finish_reason = None;
        while let Some(event) =
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason);
                }
            }
        }
        Ok((text, finish_reason))
    }

    #[tokio::test]
    async fn test_simple_events() {
        let chunks = Chunks::from_static(&[
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"<think>ok\"},\"done\":false}\n",
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"</think>\\nRESPONSE: Hi\"},",
            b"\"done\":false}\n{\"message\":{\"role\":\"assistant\",\"content\":\"\"},",
            b"\"done\":true,\"done_reason\":\"stop\"}\n",
        ]);
        let (text, finish_reason) = collect(chunks).await.unwrap();
        assert_eq!(text, "<think>ok</think>\nRESPONSE: Hi");
        assert_eq!(finish_reason, Some(ModelFinishReason::Stop));
    }

    #[tokio::test]
    async fn test_error_chunk() {
        let chunks = Chunks::from_static(&[
            b"{\"message\":{\"role\":\"assistant\",\"content\":\"Hi\"},\"done\":false}\n",
            b"{\"error\":\"out of memory\"}\n",
        ]);
        let err = collect(chunks).await.unwrap_err();
        assert_eq!(err.message(), "out of memory");
    }
}
