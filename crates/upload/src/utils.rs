//! Small helpers shared by the codec and the decoder.

/// Returns early with an error if a condition is not met.
///
/// Works like `assert!`, except that it returns `Err($error)` instead of panicking.
///
/// # Example
///
/// ```ignore
/// ensure!(headers.len() <= MAX_HEADER_NUM, MultipartError::too_many_headers(MAX_HEADER_NUM));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Finds the first position of `needle` inside `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
