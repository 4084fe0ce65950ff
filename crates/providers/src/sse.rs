//! Decoder for upstream `text/event-stream` bodies.
//!
//! Yields the `data:` payload of each complete event. Multi-line data
//! fields are joined with `\n`; events that carry no data are skipped. A
//! partial event left over at EOF is a decode error, never silently dropped.

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use relay_core::ChatError;

use crate::error::map_reqwest_err;

pub(crate) fn response_events(
    resp: reqwest::Response,
) -> impl Stream<Item = Result<String, ChatError>> + Send + 'static {
    decode_events(resp.bytes_stream().map(|r| r.map_err(map_reqwest_err)))
}

pub fn decode_events<S>(chunks: S) -> impl Stream<Item = Result<String, ChatError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + 'static,
{
    async_stream::stream! {
        let mut chunks = Box::pin(chunks);
        let mut buf = BytesMut::new();
        'outer: loop {
            let Some(chunk) = chunks.next().await else {
                if buf.iter().any(|b| !b.is_ascii_whitespace()) {
                    yield Err(ChatError::Decode("truncated event at end of stream".into()));
                }
                break;
            };
            match chunk {
                Ok(b) => {
                    buf.extend_from_slice(&b);
                    while let Some((pos, sep)) = find_event_boundary(&buf) {
                        let ev = buf.split_to(pos).freeze();
                        buf.advance(sep);
                        match event_data(&ev) {
                            Ok(Some(data)) => { yield Ok(data); }
                            Ok(None) => {}
                            Err(e) => { yield Err(e); break 'outer; }
                        }
                    }
                }
                Err(e) => { yield Err(e); break 'outer; }
            }
        }
    }
}

/// Position and length of the first blank-line separator.
fn find_event_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let crlf = twoway::find_bytes(buf, b"\r\n\r\n").map(|p| (p, 4));
    let lf = twoway::find_bytes(buf, b"\n\n").map(|p| (p, 2));
    match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn event_data(ev: &Bytes) -> Result<Option<String>, ChatError> {
    let s = std::str::from_utf8(ev).map_err(|e| ChatError::Decode(e.to_string()))?;
    let mut data_lines = Vec::new();
    for line in s.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        return Ok(None);
    }
    Ok(Some(data_lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(chunks: Vec<&'static str>) -> Vec<Result<String, ChatError>> {
        let s = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes()))),
        );
        decode_events(s).collect().await
    }

    #[tokio::test]
    async fn reassembles_events_split_across_chunks() {
        let out = collect(vec!["data: {\"a\"", ":1}\n", "\ndata: two\n\n"]).await;
        assert_eq!(out, vec![Ok("{\"a\":1}".to_string()), Ok("two".to_string())]);
    }

    #[tokio::test]
    async fn handles_crlf_and_skips_dataless_events() {
        let out = collect(vec![": keepalive\r\n\r\nevent: ping\r\n\r\ndata: x\r\n\r\n"]).await;
        assert_eq!(out, vec![Ok("x".to_string())]);
    }

    #[tokio::test]
    async fn joins_multiline_data_and_reports_trailing_partial() {
        let out = collect(vec!["data: a\ndata: b\n\ndata: never finished"]).await;
        assert_eq!(
            out,
            vec![
                Ok("a\nb".to_string()),
                Err(ChatError::Decode("truncated event at end of stream".into())),
            ]
        );
    }

    #[tokio::test]
    async fn trailing_whitespace_at_eof_is_fine() {
        let out = collect(vec!["data: a\n\n", "\r\n"]).await;
        assert_eq!(out, vec![Ok("a".to_string())]);
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let s = stream::iter(vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(ChatError::Network("reset".into())),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ]);
        let out: Vec<_> = decode_events(s).collect().await;
        assert_eq!(
            out,
            vec![Ok("one".to_string()), Err(ChatError::Network("reset".into()))]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let s = stream::iter(vec![Ok(Bytes::from_static(b"data: \xff\xfe\n\n"))]);
        let out: Vec<_> = decode_events(s).collect().await;
        assert!(matches!(out.as_slice(), [Err(ChatError::Decode(_))]));
    }
}
