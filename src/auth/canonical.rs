//! Canonical request construction for Onshape API-key signing.
//!
//! The string that gets signed is built as:
//! ```text
//! lowercase(method) + "\n" + lowercase(path[?query]) + "\n" + lowercase(date)
//! ```
//!
//! Query keys are sorted by their raw (unencoded) value using ordinal
//! comparison, then each key and value is percent-encoded independently.
//!
//! The encoded path and query are also what goes on the wire. Both encode
//! sets are supersets of what the `url` crate escapes for http(s) URLs, so
//! the URL parser never re-encodes the string that was signed.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Method;
use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};

use crate::error::OnshapeError;

/// Characters left unescaped in query components: `A-Z a-z 0-9 - _ . ! ~ * ( )`.
///
/// `'` stays escaped: http(s) URLs escape it in the query.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'(')
    .remove(b')');

/// Characters escaped in the path. `/` and existing `%XX` escapes pass through.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

/// Format a timestamp as an RFC 1123 HTTP date, e.g. `Mon, 14 Jan 2019 21:35:06 GMT`.
pub fn http_date(at: OffsetDateTime) -> Result<String, OnshapeError> {
    at.to_offset(UtcOffset::UTC)
        .format(HTTP_DATE)
        .map_err(|e| OnshapeError::Signing(format!("Failed to format date: {e}")))
}

/// Query parameters attached to a request.
///
/// Entries with no value are kept so callers can pass optional filters
/// straight through, but they are dropped before encoding. Keys are held
/// in a `BTreeMap`, which orders them by byte value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    entries: BTreeMap<String, Option<String>>,
}

impl QueryParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.entries.insert(key.into(), Some(value.to_string()));
        self
    }

    /// Set a parameter that may be absent.
    pub fn insert_opt<V: ToString>(
        &mut self,
        key: impl Into<String>,
        value: Option<V>,
    ) -> &mut Self {
        self.entries
            .insert(key.into(), value.map(|v| v.to_string()));
        self
    }

    /// Builder-style variant of [`QueryParams::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// Build parameters from a serializable struct or map of scalars.
    ///
    /// `null` fields are dropped; nested arrays or objects are rejected.
    pub fn from_serializable<T: serde::Serialize + ?Sized>(
        params: &T,
    ) -> Result<Self, OnshapeError> {
        let value = serde_json::to_value(params)?;
        let object = match value {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => return Ok(Self::default()),
            other => {
                return Err(OnshapeError::Signing(format!(
                    "Query parameters must serialize to an object, got {other}"
                )));
            }
        };

        let mut query = Self::new();
        for (key, value) in object {
            let value = match value {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Bool(b) => Some(b.to_string()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => {
                    return Err(OnshapeError::Signing(format!(
                        "Query parameter `{key}` is not a scalar value"
                    )));
                }
            };
            query.entries.insert(key, value);
        }
        Ok(query)
    }

    /// True if no parameter carries a value.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Option::is_none)
    }

    /// Encode as `key=value` pairs joined by `&`, sorted by raw key.
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .filter_map(|(key, value)| {
                value.as_ref().map(|value| {
                    format!(
                        "{}={}",
                        utf8_percent_encode(key, QUERY_COMPONENT),
                        utf8_percent_encode(value, QUERY_COMPONENT)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

/// The parts of a request that get signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: Method,
    path: String,
    query_string: String,
    date: String,
}

impl CanonicalRequest {
    /// Normalize the request parts.
    ///
    /// A missing leading `/` on `path` is prepended and characters that are
    /// not valid in a URL path are percent-encoded.
    pub fn new(method: &Method, path: &str, query: &QueryParams, date: impl Into<String>) -> Self {
        let encoded = utf8_percent_encode(path, PATH).to_string();
        let path = if encoded.starts_with('/') {
            encoded
        } else {
            format!("/{encoded}")
        };

        Self {
            method: method.clone(),
            path,
            query_string: query.encode(),
            date: date.into(),
        }
    }

    /// The normalized, encoded path, case preserved.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The encoded query string, empty if there are no parameters.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The date that is signed.
    pub fn date(&self) -> &str {
        &self.date
    }

    /// `path` followed by `?query` when the query string is non-empty.
    pub fn path_and_query(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// The exact string fed into the HMAC.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.method.as_str().to_lowercase(),
            self.path_and_query().to_lowercase(),
            self.date.to_lowercase()
        )
    }
}

/// Build the canonical string for a request in one call.
pub fn build_canonical_string(
    method: &Method,
    path: &str,
    query: &QueryParams,
    date: &str,
) -> String {
    CanonicalRequest::new(method, path, query, date).canonical_string()
}
