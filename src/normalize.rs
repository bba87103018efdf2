//! Raw engine records to canonical [`ProductRecord`]s.
//!
//! Everything here is pure: the same raw record, category and profile always
//! give the same product.

use serde_json::Value;
use url::Url;

use crate::{
    profile::{NameCase, SiteProfile},
    record::{FieldValue, ProductRecord, RawRecord},
};

pub fn normalize(raw: &RawRecord, category: &str, site: &SiteProfile) -> ProductRecord {
    let text = |field: &str| raw.get(field).map(to_text).unwrap_or_default();

    let name = match site.name_case {
        NameCase::AsIs => text("name"),
        NameCase::Title => title_case(&text("name")),
    };

    let extras = site
        .schema
        .field_names()
        .filter(|field| !ProductRecord::CANONICAL_FIELDS.contains(field))
        .map(|field| {
            let value = raw.get(field).map(field_value).unwrap_or_default();
            (field.to_string(), value)
        })
        .collect();

    ProductRecord {
        category: category.to_string(),
        name,
        image_url: text("image_url"),
        description: raw.get("description").map(field_value).unwrap_or_default(),
        price: strip_price(&text("price"), &site.price_strip_markers),
        url: resolve_url(&text("url"), &site.domain_root),
        extras,
    }
}

/// Removes the first marker the price starts with, then trims.
pub fn strip_price(price: &str, markers: &[String]) -> String {
    markers
        .iter()
        .find_map(|marker| price.strip_prefix(marker.as_str()))
        .map(|rest| rest.trim().to_string())
        .unwrap_or_else(|| price.to_string())
}

/// Resolves a scheme-less URL against `domain_root`.
pub fn resolve_url(url: &str, domain_root: &str) -> String {
    if url.is_empty() || url.starts_with("http") {
        return url.to_string();
    }
    let root = if domain_root.ends_with('/') {
        domain_root.to_string()
    } else {
        format!("{domain_root}/")
    };
    match Url::parse(&root).and_then(|base| base.join(url)) {
        Ok(resolved) => resolved.to_string(),
        Err(err) => {
            tracing::debug!(url, domain_root, "url join failed ({err}), concatenating");
            format!("{root}{}", url.trim_start_matches('/'))
        }
    }
}

/// Converts a raw value, flattening nested lists to their first text.
pub fn field_value(value: &Value) -> FieldValue {
    match value {
        Value::Array(items) => FieldValue::List(
            items
                .iter()
                .map(scalar_text)
                .filter(|item| !item.is_empty())
                .collect(),
        ),
        other => FieldValue::Text(scalar_text(other)),
    }
}

fn to_text(value: &Value) -> String {
    field_value(value).render(" ")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Object(object) => object
            .values()
            .map(scalar_text)
            .find(|text| !text.is_empty())
            .unwrap_or_default(),
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(" "),
        other => other.to_string(),
    }
}

fn title_case(name: &str) -> String {
    name.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
