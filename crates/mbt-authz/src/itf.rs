// itf.rs — Decoding helpers for the model checker's JSON trace encoding.
//
// The model checker wraps collection values in marker objects:
//
//   {"#set": [a, b]}          → a set
//   {"#map": [[k, v], ...]}   → an ordered mapping
//   {"#bigint": "123"}        → an integer too large for plain JSON
//
// These helpers are used as `#[serde(deserialize_with = "...")]` targets on
// the raw trace structs, so the markers never leak past decoding. Plain
// arrays and numbers are accepted too, which keeps hand-written traces
// short.

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum SetRepr<T> {
    Tagged {
        #[serde(rename = "#set")]
        items: Vec<T>,
    },
    Plain(Vec<T>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapRepr<K, V> {
    Tagged {
        #[serde(rename = "#map")]
        entries: Vec<(K, V)>,
    },
    Plain(Vec<(K, V)>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntRepr {
    Plain(i64),
    Big {
        #[serde(rename = "#bigint")]
        digits: String,
    },
}

/// Decode a `#set`-wrapped (or plain) array into a `BTreeSet`.
pub fn set<'de, D, T>(deserializer: D) -> Result<BTreeSet<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Ord,
{
    match SetRepr::<T>::deserialize(deserializer)? {
        SetRepr::Tagged { items } | SetRepr::Plain(items) => Ok(items.into_iter().collect()),
    }
}

/// Decode a `#map`-wrapped (or plain) list of pairs, keeping entry order.
pub fn map<'de, D, K, V>(deserializer: D) -> Result<Vec<(K, V)>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    match MapRepr::<K, V>::deserialize(deserializer)? {
        MapRepr::Tagged { entries } | MapRepr::Plain(entries) => Ok(entries),
    }
}

/// Decode a plain or `#bigint`-wrapped integer.
pub fn int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IntRepr::deserialize(deserializer)? {
        IntRepr::Plain(value) => Ok(value),
        IntRepr::Big { digits } => digits
            .parse::<i64>()
            .map_err(|e| D::Error::custom(format!("invalid #bigint '{}': {}", digits, e))),
    }
}
