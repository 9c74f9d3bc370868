use bytes::Bytes;

use crate::protocol::PartHeader;

/// An item produced by the multipart codec.
///
/// A well-formed body decodes into the sequence
/// `(Head Chunk* PartEnd)* Eof`.
#[derive(Debug, Clone)]
pub enum MultipartItem {
    /// The headers that open a new part
    Head(PartHeader),
    /// A piece of the current part's content
    Chunk(Bytes),
    /// The current part is complete
    PartEnd,
    /// The close delimiter was reached
    Eof,
}

impl MultipartItem {
    /// Returns true if this item marks the end of the multipart stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, MultipartItem::Eof)
    }

    /// Returns true if this item contains part content
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, MultipartItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            MultipartItem::Chunk(bytes) => Some(bytes),
            _ => None,
        }
    }
}
