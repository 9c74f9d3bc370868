//! Mime type inference from file names.

/// Looks up the mime type registered for a file extension.
#[cfg_attr(test, mockall::automock)]
pub trait MimeLookup: Send + Sync {
    /// `ext` includes the leading dot, e.g. `.txt`. Returns an empty string
    /// for an unknown extension.
    fn by_extension(&self, ext: &str) -> String;
}

/// [`MimeLookup`] backed by the `mime_guess` extension table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessMime;

impl MimeLookup for GuessMime {
    fn by_extension(&self, ext: &str) -> String {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.is_empty() {
            return String::new();
        }

        mime_guess::from_ext(ext).first_raw().map(str::to_string).unwrap_or_default()
    }
}

/// Returns the lowercase extension of `file_name`, including the dot.
///
/// The extension starts at the last `.`; a name without a dot, or whose only
/// dot is the first character (`.bashrc`), has no extension.
pub fn extension(file_name: &str) -> Option<String> {
    match file_name.rfind('.') {
        Some(index) if index > 0 => Some(file_name[index..].to_lowercase()),
        _ => None,
    }
}
