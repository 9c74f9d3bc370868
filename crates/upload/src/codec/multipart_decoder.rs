//! Decoder implementation for `multipart/*` bodies.
//!
//! This module frames a multipart body as defined in
//! [RFC 2046 Section 5.1.1](https://www.rfc-editor.org/rfc/rfc2046#section-5.1.1)
//! and [RFC 7578](https://www.rfc-editor.org/rfc/rfc7578).
//!
//! The body is a sequence of parts separated by `--boundary` lines and closed by
//! `--boundary--`. Each part has its own header block followed by raw content.
//! Content is streamed out as soon as it can no longer be the start of the next
//! delimiter, so a part is never buffered entirely.
//!
//! Inside content, `\r\n--boundary` only ends the part when it is followed by
//! `--`, whitespace or a line break. Any other byte makes it part of the content.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;
use MultipartState::*;

use crate::codec::PartHeaderDecoder;
use crate::protocol::{MultipartError, MultipartItem};
use crate::utils::find;

/// A decoder walking the parts of a multipart body.
///
/// Yields [`MultipartItem::Head`] for every part, followed by zero or more
/// [`MultipartItem::Chunk`] and one [`MultipartItem::PartEnd`]; the close
/// delimiter yields [`MultipartItem::Eof`].
#[derive(Debug, Clone)]
pub struct MultipartDecoder {
    state: MultipartState,
    /// `--boundary`, opening the first part
    dash_boundary: Bytes,
    /// `\r\n--boundary`, terminating every part's content
    delimiter: Bytes,
    header_decoder: PartHeaderDecoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MultipartState {
    /// Skip everything before the first boundary
    Preamble,
    /// Read the rest of a boundary line, either CRLF or the closing `--`
    BoundaryTail,
    /// Read the part header block
    Headers,
    /// Read part content until the next delimiter
    Body,
    /// The close delimiter has been read, the epilogue is ignored
    End,
}

impl MultipartDecoder {
    /// Creates a decoder for the given boundary, without the leading dashes.
    pub fn new(boundary: &str) -> Self {
        let mut dash_boundary = BytesMut::with_capacity(boundary.len() + 2);
        dash_boundary.extend_from_slice(b"--");
        dash_boundary.extend_from_slice(boundary.as_bytes());

        let mut delimiter = BytesMut::with_capacity(boundary.len() + 4);
        delimiter.extend_from_slice(b"\r\n");
        delimiter.extend_from_slice(&dash_boundary);

        Self { state: Preamble, dash_boundary: dash_boundary.freeze(), delimiter: delimiter.freeze(), header_decoder: PartHeaderDecoder }
    }

    /// Returns true once the close delimiter has been decoded.
    pub fn is_finished(&self) -> bool {
        self.state == End
    }

    fn read_preamble(&self, src: &mut BytesMut) -> Option<MultipartState> {
        if let Some(index) = find(src, &self.dash_boundary) {
            src.advance(index + self.dash_boundary.len());
            return Some(BoundaryTail);
        }

        // keep a tail that may still grow into the boundary
        let keep = self.dash_boundary.len() - 1;
        if src.len() > keep {
            let skipped = src.len() - keep;
            src.advance(skipped);
            trace!(skipped, "skip multipart preamble");
        }
        None
    }

    fn read_boundary_tail(src: &mut BytesMut) -> Result<Option<MultipartState>, MultipartError> {
        let padding = src.iter().take_while(|b| matches!(b, b' ' | b'\t')).count();
        let rest = &src[padding..];

        if rest.starts_with(b"--") {
            return Ok(Some(End));
        }

        if rest.starts_with(b"\r\n") {
            src.advance(padding + 2);
            return Ok(Some(Headers));
        }

        if rest.starts_with(b"\n") {
            src.advance(padding + 1);
            return Ok(Some(Headers));
        }

        if rest.is_empty() || rest == b"\r" || rest == b"-" {
            return Ok(None);
        }

        Err(MultipartError::invalid_boundary("malformed boundary line"))
    }
}

/// Tells whether the bytes after a delimiter found in part content make it a
/// boundary line, or `None` when more input is needed.
fn ends_part(rest: &[u8]) -> Option<bool> {
    match rest {
        [] | [b'-'] => None,
        [b'-', b'-', ..] | [b' ' | b'\t' | b'\r' | b'\n', ..] => Some(true),
        _ => Some(false),
    }
}

impl Decoder for MultipartDecoder {
    type Item = MultipartItem;
    type Error = MultipartError;

    /// Decodes the next multipart item from the input buffer.
    ///
    /// # Returns
    /// - `Ok(Some(item))` when an item is decoded
    /// - `Ok(None)` when more data is needed
    /// - `Err(MultipartError)` if the body is not a valid multipart stream
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                Preamble => match self.read_preamble(src) {
                    Some(next) => self.state = next,
                    None => return Ok(None),
                },

                BoundaryTail => match Self::read_boundary_tail(src)? {
                    Some(End) => {
                        trace!("read multipart close delimiter");
                        self.state = End;
                    }
                    Some(next) => self.state = next,
                    None => return Ok(None),
                },

                Headers => {
                    return match self.header_decoder.decode(src)? {
                        Some(header) => {
                            self.state = Body;
                            Ok(Some(MultipartItem::Head(header)))
                        }
                        None => Ok(None),
                    };
                }

                Body => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    return match find(src, &self.delimiter) {
                        Some(0) => match ends_part(&src[self.delimiter.len()..]) {
                            Some(true) => {
                                src.advance(self.delimiter.len());
                                self.state = BoundaryTail;
                                Ok(Some(MultipartItem::PartEnd))
                            }
                            Some(false) => {
                                trace!("boundary lookalike in part content");
                                Ok(Some(MultipartItem::Chunk(src.split_to(self.delimiter.len()).freeze())))
                            }
                            None => Ok(None),
                        },
                        Some(index) => {
                            trace!(len = index, "read part bytes");
                            Ok(Some(MultipartItem::Chunk(src.split_to(index).freeze())))
                        }
                        None => {
                            // the tail may be the beginning of the delimiter
                            let safe = src.len().saturating_sub(self.delimiter.len() - 1);
                            if safe == 0 {
                                return Ok(None);
                            }
                            trace!(len = safe, "read part bytes");
                            Ok(Some(MultipartItem::Chunk(src.split_to(safe).freeze())))
                        }
                    };
                }

                End => {
                    src.clear();
                    return Ok(Some(MultipartItem::Eof));
                }
            }
        }
    }

    /// Decodes the remaining items once the underlying body has ended.
    ///
    /// A body that ends before the close delimiter is an error.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(item) => Ok(Some(item)),
            None => Err(MultipartError::IncompleteStream),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const BODY: &str = indoc! {"
        preamble is ignored\r
        --XyZ\r
        Content-Disposition: form-data; name=\"field\"\r
        \r
        value\r
        --XyZ\r
        Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r
        Content-Type: text/plain\r
        \r
        line one\r
        line two\r
        --XyZ--\r
        epilogue is ignored too"};

    /// Feeds `input` to the decoder in pieces of `step` bytes and collects
    /// every part as `(file_name, content)`.
    fn collect_parts(input: &[u8], step: usize) -> Vec<(String, Vec<u8>)> {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::new();
        let mut parts: Vec<(String, Vec<u8>)> = vec![];
        let mut chunks = input.chunks(step);

        loop {
            let item = match decoder.decode(&mut buf).unwrap() {
                Some(item) => item,
                None => match chunks.next() {
                    Some(chunk) => {
                        buf.extend_from_slice(chunk);
                        continue;
                    }
                    None => decoder.decode_eof(&mut buf).unwrap().unwrap(),
                },
            };

            match item {
                MultipartItem::Head(header) => parts.push((header.file_name().to_string(), vec![])),
                MultipartItem::Chunk(bytes) => parts.last_mut().unwrap().1.extend_from_slice(&bytes),
                MultipartItem::PartEnd => (),
                MultipartItem::Eof => return parts,
            }
        }
    }

    #[test]
    fn decode_whole_body() {
        let parts = collect_parts(BODY.as_bytes(), BODY.len());

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], (String::new(), b"value".to_vec()));
        assert_eq!(parts[1], ("a.txt".to_string(), b"line one\r\nline two".to_vec()));
    }

    #[test]
    fn decode_at_every_split_point() {
        let expected = collect_parts(BODY.as_bytes(), BODY.len());
        for step in 1..BODY.len() {
            assert_eq!(collect_parts(BODY.as_bytes(), step), expected, "split by {step} bytes");
        }
    }

    #[test]
    fn item_sequence() {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::from(BODY);

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::Head(_))));
        assert_eq!(decoder.decode(&mut buf).unwrap().unwrap().as_bytes().unwrap(), &Bytes::from_static(b"value"));
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::PartEnd)));
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::Head(_))));
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_chunk());
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::PartEnd)));
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
        assert!(decoder.is_finished());
        assert!(buf.is_empty());

        // stays finished
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
    }

    #[test]
    fn empty_part_content() {
        let body = "--XyZ\r\nContent-Disposition: form-data; name=\"empty\"; filename=\"e.bin\"\r\n\r\n\r\n--XyZ--";
        let parts = collect_parts(body.as_bytes(), body.len());
        assert_eq!(parts, vec![("e.bin".to_string(), vec![])]);
    }

    #[test]
    fn boundary_with_transport_padding() {
        let body = "--XyZ  \r\n\r\ndata\r\n--XyZ--\r\n";
        let parts = collect_parts(body.as_bytes(), 3);
        assert_eq!(parts, vec![(String::new(), b"data".to_vec())]);
    }

    #[test]
    fn content_resembling_the_boundary() {
        let body = "--XyZ\r\n\r\n--Xy\r\n--XyQ\r\n--XyZ--";
        let parts = collect_parts(body.as_bytes(), 2);
        assert_eq!(parts, vec![(String::new(), b"--Xy\r\n--XyQ".to_vec())]);
    }

    #[test]
    fn delimiter_followed_by_other_bytes_is_content() {
        let body = "--XyZ\r\n\r\nhead\r\n--XyZabc\r\n--XyZ-x\r\n--XyZ--";
        let expected = vec![(String::new(), b"head\r\n--XyZabc\r\n--XyZ-x".to_vec())];

        for step in 1..=body.len() {
            assert_eq!(collect_parts(body.as_bytes(), step), expected, "split by {step} bytes");
        }
    }

    #[test]
    fn garbage_after_part_delimiter() {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::from("--XyZ\r\n\r\ndata\r\n--XyZ \tjunk");

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::Head(_))));
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_chunk());
        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::PartEnd)));
        assert!(matches!(decoder.decode(&mut buf), Err(MultipartError::InvalidBoundary { .. })));
    }

    #[test]
    fn missing_close_delimiter() {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::from("--XyZ\r\n\r\nno end");

        assert!(matches!(decoder.decode(&mut buf).unwrap(), Some(MultipartItem::Head(_))));
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        let result = decoder.decode_eof(&mut buf);
        assert!(matches!(result, Err(MultipartError::IncompleteStream)));
    }

    #[test]
    fn no_boundary_in_body() {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::from("just some bytes, no multipart at all");

        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert!(matches!(decoder.decode_eof(&mut buf), Err(MultipartError::IncompleteStream)));
    }

    #[test]
    fn malformed_boundary_line() {
        let mut decoder = MultipartDecoder::new("XyZ");
        let mut buf = BytesMut::from("--XyZgarbage\r\n\r\n");

        assert!(matches!(decoder.decode(&mut buf), Err(MultipartError::InvalidBoundary { .. })));
    }
}
