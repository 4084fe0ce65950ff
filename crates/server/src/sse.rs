//! Server-sent-event framing for relayed [`StreamEvent`]s.
//!
//! Each event becomes one `data: <json>\n\n` frame handed to hyper as its
//! own body chunk, so it goes out as soon as the socket takes it.

use std::{
    convert::Infallible,
    pin::Pin,
    task::{ready, Context, Poll},
};

use axum::{
    body::Body,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::Stream;
use pin_project_lite::pin_project;
use relay_core::StreamEvent;
use tracing::{debug, error};

pub fn frame(event: &StreamEvent) -> Bytes {
    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        error!(target:"server::sse","failed to encode event: {}", e);
        r#"{"error":"failed to encode event"}"#.to_string()
    });
    Bytes::from(format!("data: {json}\n\n"))
}

pin_project! {
    /// Frames an event stream. Stops after the first terminal event and
    /// notes on drop whether the client went away before one was sent.
    pub struct SseFrames<S> {
        #[pin]
        events: S,
        terminated: bool,
        frames: usize,
    }

    impl<S> PinnedDrop for SseFrames<S> {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if !*this.terminated {
                debug!(target:"server::sse","client disconnected after {} frames; upstream released", this.frames);
            }
        }
    }
}

impl<S> SseFrames<S> {
    pub fn new(events: S) -> Self {
        Self {
            events,
            terminated: false,
            frames: 0,
        }
    }
}

impl<S> Stream for SseFrames<S>
where
    S: Stream<Item = StreamEvent>,
{
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.terminated {
            return Poll::Ready(None);
        }
        match ready!(this.events.poll_next(cx)) {
            Some(event) => {
                *this.terminated = event.is_terminal();
                *this.frames += 1;
                Poll::Ready(Some(Ok(frame(&event))))
            }
            None => Poll::Ready(None),
        }
    }
}

/// A `200 text/event-stream` response that intermediaries should neither
/// cache nor buffer.
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Body::from_stream(SseFrames::new(events)),
    )
        .into_response()
}
