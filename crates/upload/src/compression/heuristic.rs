use crate::compression::Compressibility;

/// Number of leading bytes inspected when sniffing for text
const SNIFF_LEN: usize = 512;

/// Payloads smaller than this are only compressed when the type says so
const MIN_GUESS_SIZE: usize = 128;

/// The default [`Compressibility`]: file type first, content sniffing second.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipHeuristic;

impl Compressibility for GzipHeuristic {
    fn is_gzippable(&self, ext: &str, mime_type: &str, data: &[u8]) -> bool {
        if let Some(should_gzip) = gzippable_file_type(ext, mime_type) {
            return should_gzip;
        }

        data.len() >= MIN_GUESS_SIZE && looks_like_text(data)
    }
}

/// Decides by extension and mime type alone; `None` means "not sure".
fn gzippable_file_type(ext: &str, mime_type: &str) -> Option<bool> {
    if mime_type.starts_with("text/") {
        return Some(true);
    }

    match ext {
        ".svg" | ".bmp" | ".wav" => return Some(true),
        _ => (),
    }

    if mime_type.starts_with("image/") {
        return Some(false);
    }

    match ext {
        ".zip" | ".rar" | ".gz" | ".bz2" | ".xz" | ".zst" | ".br" | ".7z" => return Some(false),
        ".pdf" | ".txt" | ".html" | ".htm" | ".css" | ".js" | ".json" => return Some(true),
        ".php" | ".java" | ".go" | ".rb" | ".c" | ".cpp" | ".h" | ".hpp" | ".rs" | ".py" => return Some(true),
        ".png" | ".jpg" | ".jpeg" | ".gif" | ".webp" => return Some(false),
        _ => (),
    }

    if let Some(subtype) = mime_type.strip_prefix("application/") {
        let subtype = subtype.split(';').next().unwrap_or_default().trim();
        if subtype.ends_with("xml") || subtype.ends_with("script") || subtype.ends_with("json") {
            return Some(true);
        }
    }

    if let Some(subtype) = mime_type.strip_prefix("audio/") {
        if matches!(subtype, "wave" | "wav" | "x-wav" | "x-pn-wav") {
            return Some(true);
        }
    }

    None
}

/// Sniffs the leading bytes for text content.
///
/// The sample must be UTF-8 (a multi-byte sequence cut by the sample end is
/// fine) and free of control bytes other than common whitespace and ESC.
fn looks_like_text(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(SNIFF_LEN)];

    let text = match std::str::from_utf8(sample) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&sample[..e.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    !text.bytes().any(|b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b)) || b == 0x7f)
}
