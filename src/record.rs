// 📇 Record Model
// One calendar entry as an ordered field map (field name → string value)

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ============================================================================
// RECORD
// ============================================================================

/// Record - ordered-insertion mapping from field name to field value
///
/// Field names are case-preserving (uppercase by calendar convention, but
/// renamed/aliased fields may use any case). Values are always strings;
/// a missing field is simply absent, never an empty marker.
///
/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

/// RecordSet - records in document order
pub type RecordSet = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Record { fields: Vec::new() }
    }

    /// Insert or overwrite a field
    ///
    /// Overwriting keeps the field's original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// (name, value) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

// ============================================================================
// SERDE (order-preserving)
// ============================================================================

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object with string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            record.insert(k, v);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Record, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut record = Record::new();
        record.insert("SUMMARY", "Talk");
        record.insert("DTSTART", "20240101");
        record.insert("LOCATION", "Room 1");

        let keys: Vec<&str> = record.keys().collect();
        assert_eq!(keys, vec!["SUMMARY", "DTSTART", "LOCATION"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut record = Record::new();
        record.insert("A", "1");
        record.insert("B", "2");
        record.insert("A", "3");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("A"), Some("3"));
        assert_eq!(record.keys().next(), Some("A"));
    }

    #[test]
    fn test_serialize_keeps_insertion_order() {
        let record: Record = vec![("Z", "last"), ("A", "first")].into_iter().collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Z":"last","A":"first"}"#);
    }

    #[test]
    fn test_deserialize_from_cached_json() {
        let records: RecordSet =
            serde_json::from_str(r#"[{"SUMMARY":"Talk","URL":"http://e.com"}]"#).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("SUMMARY"), Some("Talk"));
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["SUMMARY", "URL"]);
    }
}
