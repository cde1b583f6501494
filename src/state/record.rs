use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One extracted item: field name to value, in configured field order
///
/// A field whose selector matched nothing is kept with an absent value,
/// so every record of a job carries the same set of keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, keeping its original position if it already exists
    pub fn insert(&mut self, name: &str, value: Option<String>) {
        let value = value.map(Value::String).unwrap_or(Value::Null);
        self.0.insert(name.to_string(), value);
    }

    /// Returns `None` for an unknown field and `Some(None)` for an absent value
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.0.get(name).map(Value::as_str)
    }

    /// Iterates the fields in order
    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            let name: String = name.into();
            record.insert(&name, value);
        }
        record
    }
}
