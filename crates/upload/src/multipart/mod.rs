//! Lazy multipart reader over an HTTP request body.
//!
//! [`Multipart`] pulls frames from an [`http_body::Body`] only when the codec
//! needs more bytes, so parts are read one after another in a single pass and
//! a part's content is never held in memory beyond what the caller asks for.
//!
//! The reader can't be restarted: a part that is skipped by calling
//! [`Multipart::next_part`] is drained from the body and lost.

use std::fmt::Display;

use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use http_body::Body;
use http_body_util::BodyExt;
use mime::Mime;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::codec::MultipartDecoder;
use crate::ensure;
use crate::protocol::{MultipartError, MultipartItem, PartHeader};

/// Maximum boundary length, see RFC 2046 Section 5.1.1
const MAX_BOUNDARY_LEN: usize = 70;

/// Reads the parts of a multipart body one after another.
#[derive(Debug)]
pub struct Multipart<B> {
    body: B,
    buf: BytesMut,
    decoder: MultipartDecoder,
    /// the body has returned its last frame
    body_eof: bool,
    /// the current part still has unread content
    in_part: bool,
}

impl<B> Multipart<B>
where
    B: Body + Unpin,
    B::Error: Display,
{
    /// Creates a reader for a body framed with `boundary`.
    pub fn new(body: B, boundary: &str) -> Self {
        Self { body, buf: BytesMut::with_capacity(8 * 1024), decoder: MultipartDecoder::new(boundary), body_eof: false, in_part: false }
    }

    /// Advances to the next part and returns its header.
    ///
    /// Any unread content of the current part is skipped. Returns `Ok(None)`
    /// once the close delimiter has been read.
    pub async fn next_part(&mut self) -> Result<Option<PartHeader>, MultipartError> {
        let mut skipped: usize = 0;
        loop {
            match self.next_item().await? {
                MultipartItem::Head(header) => {
                    if skipped > 0 {
                        trace!(size = skipped, "skip unread part content");
                    }
                    self.in_part = true;
                    return Ok(Some(header));
                }
                MultipartItem::Chunk(bytes) => skipped += bytes.len(),
                MultipartItem::PartEnd => self.in_part = false,
                MultipartItem::Eof => {
                    self.in_part = false;
                    return Ok(None);
                }
            }
        }
    }

    /// Reads at most `limit` bytes of the current part's content.
    ///
    /// Reading stops as soon as `limit` bytes are collected, so a caller can
    /// pass `max + 1` to tell "exactly at the limit" from "over the limit"
    /// without consuming the whole part.
    pub async fn read_part_limited(&mut self, limit: u64) -> Result<Bytes, MultipartError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut data = BytesMut::new();

        while self.in_part && data.len() < limit {
            match self.next_item().await? {
                MultipartItem::Chunk(bytes) => {
                    let remaining = limit - data.len();
                    if bytes.len() > remaining {
                        data.extend_from_slice(&bytes[..remaining]);
                    } else {
                        data.extend_from_slice(&bytes);
                    }
                }
                MultipartItem::PartEnd => self.in_part = false,
                MultipartItem::Head(_) | MultipartItem::Eof => {
                    return Err(MultipartError::invalid_body("part ended without a delimiter"));
                }
            }
        }

        Ok(data.freeze())
    }

    /// Reads and discards whatever is left of the body.
    ///
    /// Body errors are ignored, the goal is only to leave the transport in a
    /// clean state. Calling it again is a no-op.
    pub async fn drain(&mut self) {
        self.buf.clear();
        self.in_part = false;
        if !self.body_eof {
            drain_body(&mut self.body).await;
            self.body_eof = true;
        }
    }

    /// Consumes the reader and returns the underlying body.
    pub fn into_inner(self) -> B {
        self.body
    }

    async fn next_item(&mut self) -> Result<MultipartItem, MultipartError> {
        loop {
            let decoded = if self.body_eof {
                self.decoder.decode_eof(&mut self.buf)?
            } else {
                self.decoder.decode(&mut self.buf)?
            };

            if let Some(item) = decoded {
                return Ok(item);
            }

            ensure!(!self.body_eof, MultipartError::IncompleteStream);
            self.fill_buf().await?;
        }
    }

    async fn fill_buf(&mut self) -> Result<(), MultipartError> {
        match self.body.frame().await {
            Some(Ok(frame)) => {
                // trailers carry no part content
                if let Ok(mut data) = frame.into_data() {
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        let len = chunk.len();
                        self.buf.extend_from_slice(chunk);
                        data.advance(len);
                    }
                }
                Ok(())
            }
            Some(Err(e)) => Err(MultipartError::invalid_body(e)),
            None => {
                self.body_eof = true;
                Ok(())
            }
        }
    }
}

/// Extracts the multipart boundary from the request headers.
///
/// The request must declare `multipart/form-data` or `multipart/mixed` with a
/// non-empty `boundary` parameter of at most 70 characters.
pub fn boundary(headers: &HeaderMap) -> Result<String, MultipartError> {
    let content_type = headers.get(CONTENT_TYPE).ok_or_else(|| MultipartError::invalid_content_type("missing content-type"))?;
    let content_type = content_type.to_str().map_err(MultipartError::invalid_content_type)?;
    let mime = content_type.parse::<Mime>().map_err(MultipartError::invalid_content_type)?;

    ensure!(
        mime.type_() == mime::MULTIPART && matches!(mime.subtype().as_str(), "form-data" | "mixed"),
        MultipartError::invalid_content_type(format!("{mime} is not multipart/form-data"))
    );

    let boundary = mime.get_param(mime::BOUNDARY).ok_or(MultipartError::MissingBoundary)?;
    let boundary = boundary.as_str().trim_matches('"');

    ensure!(!boundary.is_empty(), MultipartError::invalid_boundary("boundary is empty"));
    ensure!(
        boundary.len() <= MAX_BOUNDARY_LEN,
        MultipartError::invalid_boundary(format!("boundary length {} exceed the limit {MAX_BOUNDARY_LEN}", boundary.len()))
    );

    Ok(boundary.to_string())
}

/// Reads a body to its end, discarding every frame.
pub async fn drain_body<B>(body: &mut B)
where
    B: Body + Unpin,
    B::Error: Display,
{
    let mut size: usize = 0;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    size += data.remaining();
                }
            }
            Err(e) => {
                debug!(cause = %e, "stop draining request body");
                break;
            }
        }
    }

    if size > 0 {
        debug!(size, "skip request body");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http::HeaderValue;
    use http_body::Frame;
    use http_body_util::{Full, StreamBody};
    use std::io;

    const BODY: &str = "--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n0123456789\r\n--b\r\nContent-Disposition: form-data; name=\"f\"; filename=\"f.txt\"\r\n\r\nabc\r\n--b--\r\n";

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    fn chunked_body(body: &'static str, step: usize) -> StreamBody<stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, io::Error>>>> {
        let frames: Vec<Result<Frame<Bytes>, io::Error>> =
            body.as_bytes().chunks(step).map(|chunk| Ok(Frame::data(Bytes::copy_from_slice(chunk)))).collect();
        StreamBody::new(stream::iter(frames))
    }

    #[test]
    fn check_boundary() {
        assert_eq!(boundary(&headers("multipart/form-data; boundary=abc")).unwrap(), "abc");
        assert_eq!(boundary(&headers("multipart/form-data; boundary=\"abc\"")).unwrap(), "abc");
        assert_eq!(boundary(&headers("multipart/mixed; boundary=xyz")).unwrap(), "xyz");

        assert!(matches!(boundary(&HeaderMap::new()), Err(MultipartError::InvalidContentType { .. })));
        assert!(matches!(boundary(&headers("application/json")), Err(MultipartError::InvalidContentType { .. })));
        assert!(matches!(boundary(&headers("multipart/form-data")), Err(MultipartError::MissingBoundary)));

        let long = format!("multipart/form-data; boundary={}", "a".repeat(MAX_BOUNDARY_LEN + 1));
        assert!(matches!(boundary(&headers(&long)), Err(MultipartError::InvalidBoundary { .. })));
    }

    #[tokio::test]
    async fn read_parts_in_order() {
        let mut multipart = Multipart::new(chunked_body(BODY, 7), "b");

        let first = multipart.next_part().await.unwrap().unwrap();
        assert_eq!(first.name(), Some("a"));
        assert_eq!(multipart.read_part_limited(100).await.unwrap(), Bytes::from_static(b"0123456789"));

        let second = multipart.next_part().await.unwrap().unwrap();
        assert_eq!(second.file_name(), "f.txt");
        assert_eq!(multipart.read_part_limited(100).await.unwrap(), Bytes::from_static(b"abc"));

        assert!(multipart.next_part().await.unwrap().is_none());
        assert!(multipart.next_part().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn limited_read_stops_early() {
        let mut multipart = Multipart::new(Full::new(Bytes::from_static(BODY.as_bytes())), "b");

        multipart.next_part().await.unwrap().unwrap();
        assert_eq!(multipart.read_part_limited(4).await.unwrap(), Bytes::from_static(b"0123"));

        // the rest of the first part is skipped
        let second = multipart.next_part().await.unwrap().unwrap();
        assert_eq!(second.file_name(), "f.txt");
        assert_eq!(multipart.read_part_limited(3).await.unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn skip_unread_part() {
        let mut multipart = Multipart::new(chunked_body(BODY, 1), "b");

        multipart.next_part().await.unwrap().unwrap();
        let second = multipart.next_part().await.unwrap().unwrap();
        assert_eq!(second.file_name(), "f.txt");
    }

    #[tokio::test]
    async fn truncated_body() {
        let mut multipart = Multipart::new(Full::new(Bytes::from_static(b"--b\r\n\r\nnever closed")), "b");

        multipart.next_part().await.unwrap().unwrap();
        let result = multipart.read_part_limited(100).await;
        assert!(matches!(result, Err(MultipartError::IncompleteStream)));
    }

    #[tokio::test]
    async fn body_error_is_reported() {
        let frames: Vec<Result<Frame<Bytes>, io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"--b\r\n\r\npartial"))),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ];
        let mut multipart = Multipart::new(StreamBody::new(stream::iter(frames)), "b");

        multipart.next_part().await.unwrap().unwrap();
        let result = multipart.read_part_limited(100).await;
        assert!(matches!(result, Err(MultipartError::InvalidBody { .. })));
    }

    #[tokio::test]
    async fn drain_consumes_the_body() {
        let mut multipart = Multipart::new(chunked_body(BODY, 5), "b");
        multipart.next_part().await.unwrap().unwrap();

        multipart.drain().await;
        multipart.drain().await;

        let mut body = multipart.into_inner();
        assert!(body.frame().await.is_none());
    }
}
