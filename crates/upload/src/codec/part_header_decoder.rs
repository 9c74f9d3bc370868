//! Decoder for the header block that opens every multipart part.
//!
//! The block uses the same `name: value` line format as HTTP/1.1 headers and is
//! terminated by an empty line, so parsing is delegated to `httparse::parse_headers`.
//!
//! # Limits
//!
//! - Maximum number of headers per part: 32
//! - Maximum header block size per part: 8KB

use bytes::{Buf, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{MultipartError, PartHeader};

/// Maximum number of headers allowed in a part
const MAX_HEADER_NUM: usize = 32;

/// Maximum size in bytes allowed for a part's header block
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes one part header block into a [`PartHeader`].
///
/// The source buffer must start right after the boundary line. On success the
/// header block, including the terminating empty line, is consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartHeaderDecoder;

impl Decoder for PartHeaderDecoder {
    type Item = PartHeader;
    type Error = MultipartError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];

        let parsed_result = httparse::parse_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => MultipartError::too_many_headers(MAX_HEADER_NUM),
            e => MultipartError::invalid_header(e.to_string()),
        })?;

        let (offset, header_map) = match parsed_result {
            Status::Complete((offset, parsed)) => {
                ensure!(offset <= MAX_HEADER_BYTES, MultipartError::too_large_header(offset, MAX_HEADER_BYTES));

                let mut header_map = HeaderMap::with_capacity(parsed.len());
                for header in parsed {
                    let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(MultipartError::invalid_header)?;
                    let value = HeaderValue::from_bytes(header.value).map_err(MultipartError::invalid_header)?;
                    header_map.append(name, value);
                }
                (offset, header_map)
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, MultipartError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        src.advance(offset);
        trace!(header_size = offset, header_num = header_map.len(), "parsed part header");

        Ok(Some(PartHeader::new(header_map)))
    }
}
