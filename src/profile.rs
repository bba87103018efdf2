//! Static description of one target site.
//!
//! A [`SiteProfile`] is loaded once at startup and shared read-only by the
//! fetcher, the normalizer and the crawler.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub base_url: String,
}

/// How a page number is attached to a category base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum PageUrlStyle {
    /// `base?param=N`, or `base&param=N` when the base already has a query.
    Query {
        #[serde(default = "default_page_param")]
        param: String,
    },
    /// `base` + `N` + `suffix`, e.g. `.../samsung-phones-f-9-0-p` + `3` + `.php`.
    Suffix {
        #[serde(default)]
        suffix: String,
    },
}

fn default_page_param() -> String {
    "page".to_string()
}

impl Default for PageUrlStyle {
    fn default() -> Self {
        PageUrlStyle::Query {
            param: default_page_param(),
        }
    }
}

impl PageUrlStyle {
    pub fn page_url(&self, base_url: &str, page_number: usize) -> String {
        match self {
            PageUrlStyle::Query { param } => {
                let sep = if base_url.contains('?') { '&' } else { '?' };
                format!("{base_url}{sep}{param}={page_number}")
            }
            PageUrlStyle::Suffix { suffix } => format!("{base_url}{page_number}{suffix}"),
        }
    }
}

/// What to pull out of an element matched by a [`FieldRule`] selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Attribute {
        attribute: String,
    },
    /// Every match becomes one entry. Without `fields` the entries are the
    /// matched texts; with `fields` each entry is an object.
    List {
        #[serde(default)]
        fields: Vec<FieldRule>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// Relative to the enclosing element. Absent means the element itself.
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    pub name: String,
    /// Selector of the repeated block holding one product.
    pub base_selector: String,
    pub fields: Vec<FieldRule>,
}

impl ExtractionSchema {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCase {
    #[default]
    AsIs,
    /// `galaxy_s24_ultra` becomes `Galaxy S24 Ultra`.
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub site_id: String,
    /// Root that relative product URLs are resolved against.
    pub domain_root: String,
    pub categories: Vec<Category>,
    #[serde(default)]
    pub pagination: PageUrlStyle,
    pub schema: ExtractionSchema,
    /// Scopes a listing page to the region holding the product blocks.
    pub content_selector: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub price_strip_markers: Vec<String>,
    #[serde(default)]
    pub name_case: NameCase,
}

fn default_session_id() -> String {
    "product_crawl_session".to_string()
}

impl SiteProfile {
    pub fn category(&self, index: usize) -> Result<&Category, ConfigError> {
        self.categories
            .get(index)
            .ok_or(ConfigError::CategoryOutOfRange {
                index,
                len: self.categories.len(),
            })
    }

    /// Output columns: `category` followed by the schema fields in order.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once("category")
            .chain(self.schema.field_names())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::NoCategories(self.site_id.clone()));
        }
        crate::extract::CompiledSchema::compile(&self.content_selector, &self.schema)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_style_appends_page_param() {
        let style = PageUrlStyle::default();
        assert_eq!(
            style.page_url("https://www.ryans.com/category/laptop", 3),
            "https://www.ryans.com/category/laptop?page=3"
        );
        assert_eq!(
            style.page_url("https://shop.test/list?sort=asc", 2),
            "https://shop.test/list?sort=asc&page=2"
        );
    }

    #[test]
    fn suffix_style_puts_number_before_suffix() {
        let style = PageUrlStyle::Suffix {
            suffix: ".php".into(),
        };
        assert_eq!(
            style.page_url("https://www.gsmarena.com/samsung-phones-f-9-0-p", 4),
            "https://www.gsmarena.com/samsung-phones-f-9-0-p4.php"
        );
    }

    #[test]
    fn field_rules_deserialize_every_kind() {
        let json = r#"[
            {"name": "name", "selector": ".p-item-name a", "type": "text"},
            {"name": "image_url", "selector": "img", "type": "attribute", "attribute": "src"},
            {"name": "tags", "selector": ".tag", "type": "list"},
            {"name": "description", "selector": "li", "type": "list",
             "fields": [{"name": "feature", "type": "text"}]}
        ]"#;
        let rules: Vec<FieldRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0].kind, FieldKind::Text);
        assert_eq!(
            rules[1].kind,
            FieldKind::Attribute {
                attribute: "src".into()
            }
        );
        assert_eq!(rules[2].kind, FieldKind::List { fields: vec![] });
        match &rules[3].kind {
            FieldKind::List { fields } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].selector, None);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
