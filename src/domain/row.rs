use std::sync::Arc;

use serde_json::{Map, Value};

/// One parsed data record together with the header it was read under.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    headers: Arc<Vec<String>>,
    fields: Vec<String>,
}

impl Row {
    pub fn new(headers: Arc<Vec<String>>, fields: Vec<String>) -> Self {
        Self { headers, fields }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.fields.get(idx))
            .map(String::as_str)
    }

    /// JSON object keyed by header; fields beyond the header are keyed by position.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.fields.len());
        for (idx, value) in self.fields.iter().enumerate() {
            let key = self
                .headers
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("_{}", idx));
            map.insert(key, Value::String(value.clone()));
        }
        Value::Object(map)
    }
}
