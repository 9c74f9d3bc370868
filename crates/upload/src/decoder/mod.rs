//! The upload decoder: from a multipart request to a [`ParsedUpload`].
//!
//! # Part selection
//!
//! The first part is read under the size limit. If it carries no filename, the
//! following parts are scanned for the first one that does, and that part
//! replaces the first one. The scan ends silently at the end of the body or at
//! the first read error; only a named part that is too large fails the call.
//!
//! A replacement part contributes its filename and content only. The
//! `Content-Type` and `Content-Encoding` always come from the first part.
//!
//! # Mime type and compression
//!
//! Unless the request is a chunk manifest (`cm=true`), the selected part goes
//! through [`StoragePlan::decide`]:
//!
//! - a declared `Content-Type` that differs from the type inferred from the file
//!   extension is kept as the mime hint
//! - `Content-Encoding: gzip` content is stored as-is and measured uncompressed
//! - otherwise content judged compressible is gzipped, if that makes it smaller
//!
//! # Cleanup
//!
//! Every failing call drains the request body before returning, so the
//! connection can be reused by the transport.

use std::fmt::Display;

use bytes::Bytes;
use http::Request;
use http_body::Body;
use tracing::{debug, trace, warn};

use crate::compression::{Compressibility, Gzip, GzipCodec, GzipHeuristic};
use crate::ensure;
use crate::mime_type::{GuessMime, MimeLookup, extension};
use crate::multipart::{Multipart, boundary, drain_body};
use crate::protocol::{MultipartError, ParsedUpload, PartHeader, UploadError};

mod params;
mod plan;

pub use params::UploadParams;
pub use plan::StoragePlan;

/// Decodes multipart uploads into [`ParsedUpload`]s.
///
/// The decoder holds no per-request state and can be shared across requests.
pub struct UploadDecoder {
    mime_lookup: Box<dyn MimeLookup>,
    compressibility: Box<dyn Compressibility>,
    gzip: Box<dyn GzipCodec>,
}

impl UploadDecoder {
    /// Creates a decoder with the default collaborators.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> UploadDecoderBuilder {
        UploadDecoderBuilder::new()
    }

    /// Decodes `request` into a [`ParsedUpload`].
    ///
    /// # Errors
    ///
    /// - [`UploadError::Stream`] if the body isn't a readable multipart stream
    ///   or has no parts
    /// - [`UploadError::SizeLimitExceeded`] if the selected part holds more than
    ///   `size_limit` bytes
    ///
    /// The request body is drained before an error is returned.
    pub async fn decode<B>(&self, request: Request<B>, size_limit: u64) -> Result<ParsedUpload, UploadError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        let (head, mut body) = request.into_parts();

        let boundary = match boundary(&head.headers) {
            Ok(boundary) => boundary,
            Err(e) => {
                warn!(cause = %e, "open multipart reader error");
                drain_body(&mut body).await;
                return Err(e.into());
            }
        };

        let mut multipart = Multipart::new(body, &boundary);

        let selected = match select_part(&mut multipart, size_limit).await {
            Ok(selected) => selected,
            Err(e) => {
                warn!(cause = %e, "read multipart upload error");
                multipart.drain().await;
                return Err(e);
            }
        };

        let is_chunked_file = UploadParams::from_uri(&head.uri).is_chunked_file();
        let parsed = self.build(selected, is_chunked_file);
        debug!(upload = %parsed, "decoded multipart upload");

        Ok(parsed)
    }

    /// Assembles the result, applying the mime and compression policy unless
    /// the payload is a chunk manifest.
    fn build(&self, selected: SelectedPart, is_chunked_file: bool) -> ParsedUpload {
        let SelectedPart { header, file_name, data } = selected;
        let original_data_size = data.len();

        if is_chunked_file {
            return ParsedUpload { file_name, data, original_data_size, is_chunked_file, ..ParsedUpload::default() };
        }

        let ext = extension(&file_name);
        let ext = ext.as_deref().unwrap_or_default();
        let inferred_type = if ext.is_empty() { String::new() } else { self.mime_lookup.by_extension(ext) };

        let plan = StoragePlan::decide(
            header.content_type().as_deref(),
            header.content_encoding().as_deref(),
            &inferred_type,
            |mime_type| self.compressibility.is_gzippable(ext, mime_type, &data),
        );
        trace!(?plan, ext, inferred_type = %inferred_type, "decided storage plan");

        let mime_type = plan.mime_type().unwrap_or_default().to_string();

        let (data, is_gzipped, original_data_size) = match plan {
            StoragePlan::Unchanged | StoragePlan::DeclareOnly { .. } => (data, false, original_data_size),

            StoragePlan::AlreadyGzipped { .. } => {
                let original_data_size = match self.gzip.decompressed_len(&data) {
                    Ok(len) => usize::try_from(len).unwrap_or(usize::MAX),
                    Err(e) => {
                        debug!(cause = %e, "can't measure gzip encoded content, keep raw size");
                        original_data_size
                    }
                };
                (data, true, original_data_size)
            }

            StoragePlan::Compress { .. } => match self.gzip.compress(&data) {
                Ok(compressed) if compressed.len() < data.len() => (compressed, true, original_data_size),
                Ok(compressed) => {
                    trace!(from = data.len(), to = compressed.len(), "gzip doesn't shrink payload, keep original");
                    (data, false, original_data_size)
                }
                Err(e) => {
                    warn!(cause = %e, "gzip payload error, keep original");
                    (data, false, original_data_size)
                }
            },
        };

        ParsedUpload { file_name, data, mime_type, is_gzipped, original_data_size, is_chunked_file }
    }
}

impl std::fmt::Debug for UploadDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadDecoder").finish_non_exhaustive()
    }
}

impl Default for UploadDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes `request` with the default collaborators.
///
/// See [`UploadDecoder::decode`].
pub async fn parse_upload<B>(request: Request<B>, size_limit: u64) -> Result<ParsedUpload, UploadError>
where
    B: Body + Unpin,
    B::Error: Display,
{
    UploadDecoder::new().decode(request, size_limit).await
}

/// The part chosen to hold the upload.
struct SelectedPart {
    /// headers of the first part, they drive the mime and gzip handling
    header: PartHeader,
    file_name: String,
    data: Bytes,
}

/// Picks the part holding the uploaded file and reads its content.
async fn select_part<B>(multipart: &mut Multipart<B>, size_limit: u64) -> Result<SelectedPart, UploadError>
where
    B: Body + Unpin,
    B::Error: Display,
{
    let header = multipart.next_part().await?.ok_or(MultipartError::NoParts)?;
    let mut file_name = header.file_name().to_string();
    let mut data = read_limited(multipart, size_limit).await?;

    if file_name.is_empty() {
        loop {
            let next = match multipart.next_part().await {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    debug!(cause = %e, "stop looking for a named part");
                    break;
                }
            };

            if next.file_name().is_empty() {
                continue;
            }

            data = read_limited(multipart, size_limit).await?;
            file_name = next.file_name().to_string();
            break;
        }
    }

    Ok(SelectedPart { header, file_name, data })
}

/// Reads the current part, failing when it holds more than `size_limit` bytes.
async fn read_limited<B>(multipart: &mut Multipart<B>, size_limit: u64) -> Result<Bytes, UploadError>
where
    B: Body + Unpin,
    B::Error: Display,
{
    let data = multipart.read_part_limited(size_limit.saturating_add(1)).await?;
    ensure!(data.len() as u64 <= size_limit, UploadError::size_limit_exceeded(size_limit));
    Ok(data)
}

/// Builds an [`UploadDecoder`] with custom collaborators.
pub struct UploadDecoderBuilder {
    mime_lookup: Box<dyn MimeLookup>,
    compressibility: Box<dyn Compressibility>,
    gzip: Box<dyn GzipCodec>,
}

impl UploadDecoderBuilder {
    fn new() -> Self {
        Self { mime_lookup: Box::new(GuessMime), compressibility: Box::new(GzipHeuristic), gzip: Box::new(Gzip::default()) }
    }

    pub fn mime_lookup<M: MimeLookup + 'static>(mut self, mime_lookup: M) -> Self {
        self.mime_lookup = Box::new(mime_lookup);
        self
    }

    pub fn compressibility<C: Compressibility + 'static>(mut self, compressibility: C) -> Self {
        self.compressibility = Box::new(compressibility);
        self
    }

    pub fn gzip<G: GzipCodec + 'static>(mut self, gzip: G) -> Self {
        self.gzip = Box::new(gzip);
        self
    }

    pub fn build(self) -> UploadDecoder {
        UploadDecoder { mime_lookup: self.mime_lookup, compressibility: self.compressibility, gzip: self.gzip }
    }
}

impl std::fmt::Debug for UploadDecoderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadDecoderBuilder").finish_non_exhaustive()
    }
}
