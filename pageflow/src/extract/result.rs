//! The record produced for one scraped item.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// An ordered mapping from field name to an optional value.
///
/// A value is `None` when the field could not be located on the item.
/// Field order is the extractor's declared order and is preserved through
/// serialization. The record cannot be modified once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ExtractionResult {
    fields: Vec<(String, Option<String>)>,
}

impl ExtractionResult {
    /// Builds a result from `(name, value)` pairs in declared order.
    ///
    /// A repeated name overwrites the earlier value in place.
    pub fn from_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut out: Vec<(String, Option<String>)> = Vec::new();
        for (name, value) in fields {
            let name = name.into();
            let value = value.map(Into::into);
            match out.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => out.push((name, value)),
            }
        }
        Self { fields: out }
    }

    /// Returns the value of a field, or `None` if absent or undeclared.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Returns true if the field was declared, present or not.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Iterates over `(name, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    /// Returns the declared field names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Names of fields that have a value.
    #[must_use]
    pub fn present(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Names of fields recorded as absent.
    #[must_use]
    pub fn absent(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields were declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// SHA-256 over names and values in order, hex encoded.
    ///
    /// Absent values hash differently from empty strings.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, value) in &self.fields {
            hasher.update(name.as_bytes());
            hasher.update([0x1f]);
            match value {
                Some(v) => {
                    hasher.update([0x01]);
                    hasher.update(v.as_bytes());
                }
                None => hasher.update([0x00]),
            }
            hasher.update([0x1e]);
        }
        hex::encode(hasher.finalize())
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtractionResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResultVisitor;

        impl<'de> Visitor<'de> for ResultVisitor {
            type Value = ExtractionResult;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to strings or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields: Vec<(String, Option<String>)> = Vec::new();
                while let Some((name, value)) = access.next_entry::<String, Option<String>>()? {
                    fields.push((name, value));
                }
                Ok(ExtractionResult::from_fields(fields))
            }
        }

        deserializer.deserialize_map(ResultVisitor)
    }
}
