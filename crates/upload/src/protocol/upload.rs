use std::fmt::{Display, Formatter};

use bytes::Bytes;

/// The normalized content record decoded from one multipart upload.
///
/// It carries everything a needle needs besides placement: the payload to
/// store, the display name, the uncompressed size and the hints used when
/// serving the content back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedUpload {
    pub(crate) file_name: String,
    pub(crate) data: Bytes,
    pub(crate) mime_type: String,
    pub(crate) is_gzipped: bool,
    pub(crate) original_data_size: usize,
    pub(crate) is_chunked_file: bool,
}

impl ParsedUpload {
    /// The base name of the uploaded file, empty if no part supplied one.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The payload to store, gzip-compressed when [`Self::is_gzipped`] is true.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consumes the upload and returns the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// The declared mime type, only set when it can't be deduced from the file extension.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_gzipped(&self) -> bool {
        self.is_gzipped
    }

    /// Length of the content before any compression.
    pub fn original_data_size(&self) -> usize {
        self.original_data_size
    }

    /// Whether the payload is a chunk manifest rather than file content.
    pub fn is_chunked_file(&self) -> bool {
        self.is_chunked_file
    }
}

impl Display for ParsedUpload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "file_name: {}, data_len: {}, mime_type: {}, is_gzipped: {}, original_data_size: {}, is_chunked_file: {}",
            self.file_name,
            self.data.len(),
            self.mime_type,
            self.is_gzipped,
            self.original_data_size,
            self.is_chunked_file
        )
    }
}
