//! Deserializers which accept scalar values either natively or as strings,
//! and treat an explicit `null` like an absent field.
//!
//! Overrides always insert strings into the document, so a numeric field set
//! via `--set masterProfile.count=3` arrives as `"3"`.
use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, de::Error as _};

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<T> {
    Native(T),
    Text(String),
}

/// Deserializes an optional `T` from either its native representation or a
/// string which parses as `T`.
pub(crate) fn option<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Repr<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Repr::Native(value)) => Ok(Some(value)),
        Some(Repr::Text(text)) => text.trim().parse().map(Some).map_err(|err| {
            D::Error::custom(format_args!("failed to parse {text:?}: {err}"))
        }),
    }
}

/// Deserializes `T`, falling back to `T::default()` for `null`.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
