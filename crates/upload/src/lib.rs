//! Multipart upload decoding for a needle store
//!
//! This crate turns an HTTP `multipart/form-data` upload into a [`ParsedUpload`]:
//! the payload a volume server writes as a needle, together with the metadata it
//! stores next to it (file name, mime hint, gzip flag, uncompressed size and the
//! chunk manifest marker).
//!
//! # Features
//!
//! - Single-pass, lazy multipart reading over any `http_body::Body`
//! - Selection of the part that carries the uploaded file
//! - Size limit enforced while reading, never after buffering the whole part
//! - Path components stripped from uploaded file names
//! - Mime type inference from the file extension
//! - Transparent gzip compression of compressible content
//! - Cleanup of the request body on every failure
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use http::Request;
//! use http_body_util::Full;
//! use needle_upload::parse_upload;
//! use tracing::{Level, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     let _ = tracing::subscriber::set_global_default(subscriber);
//!
//!     let body = "--XyZ\r\n\
//!                 Content-Disposition: form-data; name=\"file\"; filename=\"hello.bin\"\r\n\
//!                 \r\n\
//!                 hello world\r\n\
//!                 --XyZ--\r\n";
//!
//!     let request = Request::builder()
//!         .method("POST")
//!         .uri("/3,01637037d6")
//!         .header("Content-Type", "multipart/form-data; boundary=XyZ")
//!         .body(Full::new(Bytes::from(body)))
//!         .unwrap();
//!
//!     let upload = parse_upload(request, 32 * 1024 * 1024).await.unwrap();
//!     info!(%upload, "decoded");
//!
//!     assert_eq!(upload.file_name(), "hello.bin");
//!     assert_eq!(upload.data().as_ref(), b"hello world");
//!     assert!(!upload.is_gzipped());
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: `tokio_util` decoders framing a multipart body into parts
//! - [`multipart`]: lazy part reader pulling frames from a request body
//! - [`protocol`]: shared types and the error taxonomy
//! - [`decoder`]: part selection and the mime/compression policy
//! - [`compression`]: gzip codec and the compressibility heuristic
//! - [`mime_type`]: extension based mime lookup
//!
//! # Error Handling
//!
//! - [`UploadError::Stream`]: the body isn't a readable multipart stream
//! - [`UploadError::SizeLimitExceeded`]: the uploaded file is larger than allowed
//!
//! Compression failures are never errors: the content is stored as received.
//!
//! # Limitations
//!
//! - Maximum part header block size: 8KB
//! - Maximum number of headers per part: 32
//! - Only the first file part of an upload is decoded

pub mod codec;
pub mod compression;
pub mod decoder;
pub mod mime_type;
pub mod multipart;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

pub use decoder::{UploadDecoder, parse_upload};
pub use protocol::{ParsedUpload, UploadError};
