use http::Uri;
use tracing::debug;

/// Upload options carried in the request query string.
#[derive(Debug, Default)]
pub struct UploadParams {
    /// chunk manifest flag
    cm: Option<String>,
}

impl UploadParams {
    /// Reads the options from the request URI. A missing or unparsable query
    /// yields the defaults.
    ///
    /// The query is read as flat `key=value` pairs; when a key repeats, its
    /// first value wins.
    pub fn from_uri(uri: &Uri) -> Self {
        let Some(query) = uri.query() else {
            return Self::default();
        };

        let pairs = match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => pairs,
            Err(e) => {
                debug!(cause = %e, query, "ignore unparsable upload query");
                return Self::default();
            }
        };

        let cm = pairs.into_iter().find(|(key, _)| key == "cm").map(|(_, value)| value);
        Self { cm }
    }

    /// Whether the upload is a chunk manifest; anything that is not a valid
    /// boolean counts as false.
    pub fn is_chunked_file(&self) -> bool {
        self.cm.as_deref().and_then(parse_bool).unwrap_or(false)
    }
}

/// Parses the boolean spellings accepted on the wire.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
