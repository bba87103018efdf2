use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One listing page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub category: String,
    pub page_number: usize,
    pub resolved_url: String,
}

/// Field name to extracted value, as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

/// A single- or multi-valued output field. Lists keep extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    pub fn render(&self, separator: &str) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(separator),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub category: String,
    pub name: String,
    pub image_url: String,
    pub description: FieldValue,
    pub price: String,
    /// Always absolute.
    pub url: String,
    /// Schema fields outside the canonical set, in schema order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<(String, FieldValue)>,
}

impl ProductRecord {
    pub const CANONICAL_FIELDS: [&'static str; 6] =
        ["category", "name", "image_url", "description", "price", "url"];

    /// Value of an output column, `None` for an unknown column.
    pub fn column(&self, name: &str) -> Option<FieldValue> {
        let text = |value: &String| Some(FieldValue::Text(value.clone()));
        match name {
            "category" => text(&self.category),
            "name" => text(&self.name),
            "image_url" => text(&self.image_url),
            "description" => Some(self.description.clone()),
            "price" => text(&self.price),
            "url" => text(&self.url),
            _ => self
                .extras
                .iter()
                .find(|(extra, _)| extra == name)
                .map(|(_, value)| value.clone()),
        }
    }
}
