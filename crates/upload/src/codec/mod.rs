//! Multipart codec for framing `multipart/form-data` bodies
//!
//! This module turns raw body bytes into a stream of [`MultipartItem`](crate::protocol::MultipartItem)s.
//! Both decoders implement [`tokio_util::codec::Decoder`] and work on a `BytesMut`
//! buffer, so they can be driven by any byte source: an `http_body::Body`, a
//! `FramedRead`, or a plain buffer in tests and benchmarks.
//!
//! - [`MultipartDecoder`]: a state machine walking boundaries, part headers and part content
//! - [`PartHeaderDecoder`]: parses the header block of a single part with `httparse`
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use needle_upload::codec::MultipartDecoder;
//! use needle_upload::protocol::MultipartItem;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = MultipartDecoder::new("boundary");
//! let mut buffer = BytesMut::from("--boundary\r\n\r\nhello\r\n--boundary--");
//!
//! assert!(matches!(decoder.decode(&mut buffer), Ok(Some(MultipartItem::Head(_)))));
//! assert!(matches!(decoder.decode(&mut buffer), Ok(Some(MultipartItem::Chunk(_)))));
//! assert!(matches!(decoder.decode(&mut buffer), Ok(Some(MultipartItem::PartEnd))));
//! assert!(matches!(decoder.decode(&mut buffer), Ok(Some(MultipartItem::Eof))));
//! ```

mod multipart_decoder;
mod part_header_decoder;

pub use multipart_decoder::MultipartDecoder;
pub use part_header_decoder::PartHeaderDecoder;
