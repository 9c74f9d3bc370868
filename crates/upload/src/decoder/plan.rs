/// How a decoded payload should be stored.
///
/// Produced by [`StoragePlan::decide`] from the part's declared headers and the
/// mime type inferred from its file name. Deciding performs no I/O; applying the
/// plan (compressing, measuring gzip input) is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoragePlan {
    /// Store the payload as-is, with no mime hint.
    Unchanged,
    /// Store the payload as-is and record the declared mime type.
    DeclareOnly { mime_type: String },
    /// Try to gzip the payload; keep it only if it shrinks.
    Compress { mime_type: Option<String> },
    /// The payload arrived gzip-encoded and is stored untouched.
    AlreadyGzipped { mime_type: Option<String> },
}

impl StoragePlan {
    /// Decides how to store a part.
    ///
    /// The declared `Content-Type` wins over `inferred_type` when present and
    /// different, and is then reported as the mime hint. `is_gzippable` receives
    /// the effective mime type and is only consulted when the part isn't
    /// already `Content-Encoding: gzip`.
    pub fn decide<F>(declared_type: Option<&str>, content_encoding: Option<&str>, inferred_type: &str, is_gzippable: F) -> Self
    where
        F: FnOnce(&str) -> bool,
    {
        let mime_type = declared_type.filter(|declared| !declared.is_empty() && *declared != inferred_type).map(str::to_string);

        if content_encoding.is_some_and(|encoding| encoding.trim().eq_ignore_ascii_case("gzip")) {
            return StoragePlan::AlreadyGzipped { mime_type };
        }

        let effective_type = mime_type.as_deref().unwrap_or(inferred_type);
        if is_gzippable(effective_type) {
            return StoragePlan::Compress { mime_type };
        }

        match mime_type {
            Some(mime_type) => StoragePlan::DeclareOnly { mime_type },
            None => StoragePlan::Unchanged,
        }
    }

    /// The declared mime type to record, if any.
    pub fn mime_type(&self) -> Option<&str> {
        match self {
            StoragePlan::Unchanged => None,
            StoragePlan::DeclareOnly { mime_type } => Some(mime_type),
            StoragePlan::Compress { mime_type } | StoragePlan::AlreadyGzipped { mime_type } => mime_type.as_deref(),
        }
    }
}
