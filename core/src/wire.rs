//! Helpers for the shared store's lossy JSON encoding.
//!
//! The store drops empty arrays, empty objects and nulls. An array that loses
//! some of its elements comes back as an object keyed by the surviving
//! indices, and a whole collection may be absent. Everything here turns those
//! shapes back into dense Rust containers.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A list that may arrive dense, with null holes, or as an index-keyed map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseList<T>(Vec<Option<T>>);

#[derive(Deserialize)]
#[serde(untagged)]
enum SparseRepr<T> {
    Dense(Vec<Option<T>>),
    Keyed(BTreeMap<String, T>),
}

impl<T> SparseList<T> {
    pub fn dense(items: Vec<T>) -> Self {
        Self(items.into_iter().map(Some).collect())
    }

    /// Length as seen on the wire, counting holes.
    pub fn wire_len(&self) -> usize {
        self.0.len()
    }

    /// Drops holes, keeping wire order.
    pub fn into_present(self) -> Vec<T> {
        self.0.into_iter().flatten().collect()
    }

    /// Fills holes, and pads up to `len`, with `T::default()`.
    pub fn into_dense(self, len: usize) -> Vec<T>
    where
        T: Default,
    {
        let mut out: Vec<T> = self
            .0
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        while out.len() < len {
            out.push(T::default());
        }
        out
    }
}

impl<'de, T> Deserialize<'de> for SparseList<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match SparseRepr::<T>::deserialize(deserializer)? {
            SparseRepr::Dense(items) => Ok(Self(items)),
            SparseRepr::Keyed(map) => {
                let mut items: Vec<Option<T>> = Vec::new();
                for (key, value) in map {
                    let Ok(index) = key.parse::<usize>() else {
                        continue;
                    };
                    if index >= items.len() {
                        items.resize_with(index + 1, || None);
                    }
                    items[index] = Some(value);
                }
                Ok(Self(items))
            }
        }
    }
}

impl<T> Serialize for SparseList<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Deserializes a map that the store may have dropped entirely.
pub fn map_or_empty<T>(value: Option<&Value>) -> BTreeMap<String, T>
where
    T: DeserializeOwned,
{
    let Some(Value::Object(entries)) = value else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(key, raw)| {
            serde_json::from_value::<T>(raw.clone())
                .ok()
                .map(|parsed| (key.clone(), parsed))
        })
        .collect()
}

/// Ordered list that may arrive as an array or as a map of push keys.
/// Push keys sort in insertion order, so map entries come back in key order.
pub fn list_or_empty<T>(value: Option<&Value>) -> Vec<T>
where
    T: DeserializeOwned,
{
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|raw| serde_json::from_value::<T>(raw.clone()).ok())
            .collect(),
        Some(Value::Object(_)) => map_or_empty::<T>(value).into_values().collect(),
        _ => Vec::new(),
    }
}

/// Applies the store's sparse encoding to a document, in place.
///
/// Returns `false` when the value itself should disappear.
pub fn sparsify(value: &mut Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(entries) => {
            entries.retain(|_, child| sparsify(child));
            !entries.is_empty()
        }
        Value::Array(items) => {
            let mut kept = Vec::with_capacity(items.len());
            let mut holes = false;
            for (index, mut child) in std::mem::take(items).into_iter().enumerate() {
                if sparsify(&mut child) {
                    kept.push((index, child));
                } else {
                    holes = true;
                }
            }
            if kept.is_empty() {
                return false;
            }
            if holes {
                let keyed = kept
                    .into_iter()
                    .map(|(index, child)| (index.to_string(), child))
                    .collect();
                *value = Value::Object(keyed);
            } else {
                *items = kept.into_iter().map(|(_, child)| child).collect();
            }
            true
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keyed_list_fills_holes() {
        let list: SparseList<Vec<u32>> = serde_json::from_value(json!({"0": [1], "2": [2]})).unwrap();
        assert_eq!(list.into_dense(4), vec![vec![1], vec![], vec![2], vec![]]);
    }

    #[test]
    fn sparsify_turns_holey_arrays_into_maps() {
        let mut doc = json!({"a": [[1], [], [2]], "b": [], "c": {}, "d": null, "e": 0});
        assert!(sparsify(&mut doc));
        assert_eq!(doc, json!({"a": {"0": [1], "2": [2]}, "e": 0}));
    }
}
