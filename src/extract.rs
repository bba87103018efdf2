//! CSS-schema extraction.
//!
//! Runs an [`ExtractionSchema`] over a listing page and returns one JSON
//! object per product block, the payload shape a crawl engine reports.

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::{
    error::ConfigError,
    profile::{ExtractionSchema, FieldKind, FieldRule},
};

#[derive(Debug)]
pub struct CompiledSchema {
    content: Selector,
    base: Selector,
    fields: Vec<CompiledField>,
}

#[derive(Debug)]
struct CompiledField {
    name: String,
    selector: Option<Selector>,
    kind: CompiledKind,
}

#[derive(Debug)]
enum CompiledKind {
    Text,
    Attribute(String),
    List(Vec<CompiledField>),
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|err| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        reason: err.to_string(),
    })
}

fn compile_fields(rules: &[FieldRule]) -> Result<Vec<CompiledField>, ConfigError> {
    rules
        .iter()
        .map(|rule| {
            let selector = rule.selector.as_deref().map(parse_selector).transpose()?;
            let kind = match &rule.kind {
                FieldKind::Text => CompiledKind::Text,
                FieldKind::Attribute { attribute } => CompiledKind::Attribute(attribute.clone()),
                FieldKind::List { fields } => CompiledKind::List(compile_fields(fields)?),
            };
            Ok(CompiledField {
                name: rule.name.clone(),
                selector,
                kind,
            })
        })
        .collect()
}

impl CompiledSchema {
    pub fn compile(content_selector: &str, schema: &ExtractionSchema) -> Result<Self, ConfigError> {
        Ok(Self {
            content: parse_selector(content_selector)?,
            base: parse_selector(&schema.base_selector)?,
            fields: compile_fields(&schema.fields)?,
        })
    }

    /// Extract every product block inside the content region of `html`.
    pub fn extract(&self, html: &str) -> Vec<Map<String, Value>> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        for region in document.select(&self.content) {
            if self.base.matches(&region) {
                records.extend(extract_object(region, &self.fields));
            }
            for block in region.select(&self.base) {
                records.extend(extract_object(block, &self.fields));
            }
        }
        records
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn targets<'a>(element: ElementRef<'a>, selector: Option<&Selector>) -> Vec<ElementRef<'a>> {
    match selector {
        Some(selector) => element.select(selector).collect(),
        None => vec![element],
    }
}

fn extract_object(element: ElementRef<'_>, fields: &[CompiledField]) -> Option<Map<String, Value>> {
    let mut object = Map::new();
    for field in fields {
        if let Some(value) = extract_field(element, field) {
            object.insert(field.name.clone(), value);
        }
    }
    (!object.is_empty()).then_some(object)
}

fn extract_field(element: ElementRef<'_>, field: &CompiledField) -> Option<Value> {
    let matched = targets(element, field.selector.as_ref());
    match &field.kind {
        CompiledKind::Text => matched
            .first()
            .map(|el| element_text(*el))
            .filter(|text| !text.is_empty())
            .map(Value::String),
        CompiledKind::Attribute(attribute) => matched
            .first()
            .and_then(|el| el.value().attr(attribute))
            .map(|value| Value::String(value.trim().to_string())),
        CompiledKind::List(sub_fields) if sub_fields.is_empty() => {
            let items: Vec<Value> = matched
                .into_iter()
                .map(element_text)
                .filter(|text| !text.is_empty())
                .map(Value::String)
                .collect();
            Some(Value::Array(items))
        }
        CompiledKind::List(sub_fields) => {
            let items: Vec<Value> = matched
                .into_iter()
                .filter_map(|el| extract_object(el, sub_fields))
                .map(Value::Object)
                .collect();
            Some(Value::Array(items))
        }
    }
}
