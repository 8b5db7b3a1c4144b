use axum::body::Bytes;
use rand::Rng;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};

use crate::error::AppError;

/// Decodes a JSON request body. An empty body reads as `{}` so bodiless POSTs still work.
pub fn parse_body<T: DeserializeOwned>(body: Bytes) -> Result<T, AppError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body
    };

    serde_json::from_slice(raw).map_err(|_| AppError::MalformedPayload)
}

/// Random lowercase id suffix, as in `List:<randstr>`.
pub fn randstr() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// `None` for absent, empty or whitespace-only strings.
pub fn str_or_none(value: Option<&str>) -> Option<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Keeps `null` apart from a missing field: missing is `None`, null is `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
