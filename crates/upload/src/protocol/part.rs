//! Multipart part headers.
//!
//! Every part of a `multipart/form-data` body starts with its own header block.
//! [`PartHeader`] keeps that block as an [`http::HeaderMap`] and pre-parses the
//! `Content-Disposition` parameters needed to select the uploaded file.

use std::borrow::Cow;

use http::HeaderMap;
use http::header::{CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_TYPE};
use percent_encoding::percent_decode_str;

/// The header block of a single multipart part.
#[derive(Debug, Clone)]
pub struct PartHeader {
    headers: HeaderMap,
    name: Option<String>,
    filename: Option<String>,
}

impl PartHeader {
    /// Creates a part header, parsing the `Content-Disposition` parameters.
    pub fn new(headers: HeaderMap) -> Self {
        let disposition = headers
            .get(CONTENT_DISPOSITION)
            .map(|value| parse_disposition(&String::from_utf8_lossy(value.as_bytes())))
            .unwrap_or_default();

        Self { headers, name: disposition.name, filename: disposition.filename_ext.or(disposition.filename) }
    }

    /// Returns all headers of the part.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the form field name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the filename exactly as the client supplied it.
    pub fn raw_file_name(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Returns the base component of the supplied filename, or an empty string
    /// if the part carries no filename.
    ///
    /// Directory components are discarded, so `a/b/evil.txt` becomes `evil.txt`.
    pub fn file_name(&self) -> &str {
        match self.filename.as_deref() {
            Some(filename) if !filename.is_empty() => base_name(filename),
            _ => "",
        }
    }

    /// Returns the declared `Content-Type` of the part.
    pub fn content_type(&self) -> Option<Cow<'_, str>> {
        self.header_str(CONTENT_TYPE)
    }

    /// Returns the declared `Content-Encoding` of the part.
    pub fn content_encoding(&self) -> Option<Cow<'_, str>> {
        self.header_str(CONTENT_ENCODING)
    }

    fn header_str(&self, name: http::HeaderName) -> Option<Cow<'_, str>> {
        self.headers.get(name).map(|value| String::from_utf8_lossy(value.as_bytes())).filter(|value| !value.is_empty())
    }
}

/// Returns the last element of a slash separated path.
///
/// Trailing slashes are removed before extracting the last element; a path
/// made only of slashes yields `/`.
pub(crate) fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }

    match trimmed.rfind('/') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

#[derive(Debug, Default)]
struct DispositionParams {
    name: Option<String>,
    filename: Option<String>,
    filename_ext: Option<String>,
}

/// Parses the parameters of a `Content-Disposition` header value.
///
/// Supports token values, quoted-string values with backslash escapes and
/// RFC 5987 extended values (`filename*=UTF-8''...`). The disposition type
/// itself is ignored.
fn parse_disposition(value: &str) -> DispositionParams {
    let mut params = DispositionParams::default();

    let Some(start) = value.find(';') else {
        return params;
    };
    let mut rest = &value[start + 1..];

    loop {
        rest = rest.trim_start_matches(|c: char| c == ';' || c.is_ascii_whitespace());
        if rest.is_empty() {
            break;
        }

        let key_end = rest.find(['=', ';']).unwrap_or(rest.len());
        let key = rest[..key_end].trim().to_ascii_lowercase();
        rest = &rest[key_end..];

        let param_value = match rest.strip_prefix('=') {
            Some(after_eq) => {
                let after_eq = after_eq.trim_start();
                if let Some(quoted) = after_eq.strip_prefix('"') {
                    let (unquoted, consumed) = read_quoted(quoted);
                    rest = &quoted[consumed..];
                    unquoted
                } else {
                    let end = after_eq.find(';').unwrap_or(after_eq.len());
                    rest = &after_eq[end..];
                    after_eq[..end].trim().to_string()
                }
            }
            None => String::new(),
        };

        match key.as_str() {
            "name" => params.name = Some(param_value),
            "filename" => params.filename = Some(param_value),
            "filename*" => params.filename_ext = decode_ext_value(&param_value),
            _ => (),
        }
    }

    params
}

/// Reads a quoted-string body (the opening quote already stripped).
///
/// Returns the unescaped value and the number of bytes consumed, including the
/// closing quote when present.
fn read_quoted(src: &str) -> (String, usize) {
    let mut value = String::new();
    let mut chars = src.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    value.push(escaped);
                }
            }
            '"' => return (value, index + 1),
            c => value.push(c),
        }
    }

    (value, src.len())
}

/// Decodes an RFC 5987 `charset'language'value` extended parameter.
///
/// Only UTF-8 and its ASCII subset are accepted; anything else, or a value
/// that doesn't decode to UTF-8, is dropped.
fn decode_ext_value(value: &str) -> Option<String> {
    let (charset, rest) = value.split_once('\'')?;
    let (_language, encoded) = rest.split_once('\'')?;

    if !charset.eq_ignore_ascii_case("utf-8") && !charset.eq_ignore_ascii_case("us-ascii") {
        return None;
    }

    percent_decode_str(encoded).decode_utf8().ok().map(Cow::into_owned)
}
