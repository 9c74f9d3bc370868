//! Data types shared by the codec, the multipart reader and the decoder.
//!
//! - [`MultipartItem`]: what the codec yields while walking a multipart body
//! - [`PartHeader`]: the header block of one part, with its `Content-Disposition` parsed
//! - [`ParsedUpload`]: the record handed to the storage engine
//! - [`UploadError`] / [`MultipartError`]: the error taxonomy

mod item;
pub use item::MultipartItem;

mod part;
pub use part::PartHeader;

mod upload;
pub use upload::ParsedUpload;

mod error;
pub use error::MultipartError;
pub use error::UploadError;
