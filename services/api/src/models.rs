//! API models for request and response payloads

use serde::{Deserialize, Deserializer};

pub mod car;
pub mod comment;
pub mod garage;
pub mod image;
pub mod post;
pub mod user;

/// Deserialize a field that distinguishes "absent" from "explicitly null"
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: absent → `None`, `null` → `Some(None)`,
/// value → `Some(Some(value))`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        url: Option<Option<String>>,
    }

    #[test]
    fn nullable_distinguishes_absent_from_null() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.url, None);

        let cleared: Patch = serde_json::from_str(r#"{"url":null}"#).unwrap();
        assert_eq!(cleared.url, Some(None));

        let set: Patch = serde_json::from_str(r#"{"url":"https://cdn/x.jpg"}"#).unwrap();
        assert_eq!(set.url, Some(Some("https://cdn/x.jpg".to_string())));
    }
}
