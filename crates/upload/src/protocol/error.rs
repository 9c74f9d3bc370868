use std::io;
use thiserror::Error;

/// Top-level error returned by [`crate::UploadDecoder::decode`].
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("multipart error: {source}")]
    Stream {
        #[from]
        source: MultipartError,
    },

    #[error("file over the limited {limit} bytes")]
    SizeLimitExceeded { limit: u64 },
}

impl UploadError {
    pub fn size_limit_exceeded(limit: u64) -> Self {
        Self::SizeLimitExceeded { limit }
    }

    /// Returns true if the upload was rejected for being larger than the size limit.
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Self::SizeLimitExceeded { .. })
    }
}

/// Errors raised while framing or reading a multipart body.
#[derive(Error, Debug)]
pub enum MultipartError {
    #[error("invalid content-type: {reason}")]
    InvalidContentType { reason: String },

    #[error("multipart boundary is missing")]
    MissingBoundary,

    #[error("invalid multipart boundary: {reason}")]
    InvalidBoundary { reason: String },

    #[error("part header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("part header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid part header: {reason}")]
    InvalidHeader { reason: String },

    #[error("multipart body has no parts")]
    NoParts,

    #[error("multipart stream ended before the close delimiter")]
    IncompleteStream,

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    /// `tokio_util::codec::Decoder` requires `From<io::Error>`
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl MultipartError {
    pub fn invalid_content_type<S: ToString>(str: S) -> Self {
        Self::InvalidContentType { reason: str.to_string() }
    }

    pub fn invalid_boundary<S: ToString>(str: S) -> Self {
        Self::InvalidBoundary { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}
