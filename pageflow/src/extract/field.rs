//! Declarative field definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::normalize::Normalizer;
use super::text::normalize_whitespace;
use crate::errors::{ConfigurationError, FieldLookupFault};

/// Where a field's raw value comes from once its element is located.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSource {
    /// The element's text content, whitespace collapsed.
    #[default]
    Text,
    /// The value of an attribute.
    Attr {
        /// Attribute name.
        name: String,
    },
    /// The last token of the `class` attribute (`star-rating Three` → `Three`).
    ClassToken,
    /// An attribute resolved against the page URL.
    AbsoluteUrl {
        /// Attribute holding the (possibly relative) URL.
        attr: String,
    },
    /// The text of every matching element, joined (e.g. all tags of a quote).
    TextList {
        /// Placed between values.
        #[serde(default = "default_separator")]
        separator: String,
    },
    /// A fixed value, such as the name of the site being crawled.
    Constant {
        /// The value.
        value: String,
    },
}

fn default_separator() -> String {
    ", ".to_string()
}

/// One named field of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, used as the column header on export.
    pub name: String,
    /// CSS selector relative to the item; `None` targets the item element.
    #[serde(default)]
    pub selector: Option<String>,
    /// What to read from the located element.
    #[serde(default)]
    pub source: ValueSource,
    /// Normalization steps, applied in order.
    #[serde(default)]
    pub normalizers: Vec<Normalizer>,
    /// When set, failing to produce this field skips the whole item.
    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    /// Creates a field reading the text of `selector`.
    #[must_use]
    pub fn text(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: Some(selector.into()),
            source: ValueSource::Text,
            normalizers: Vec::new(),
            required: false,
        }
    }

    /// Creates a field reading attribute `attr` of `selector`.
    #[must_use]
    pub fn attr(name: impl Into<String>, selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            source: ValueSource::Attr { name: attr.into() },
            ..Self::text(name, selector)
        }
    }

    /// Creates a field reading attribute `attr` of the item element itself.
    #[must_use]
    pub fn item_attr(name: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            selector: None,
            source: ValueSource::Attr { name: attr.into() },
            ..Self::text(name, "")
        }
    }

    /// Creates a field reading the last class token of `selector`.
    #[must_use]
    pub fn class_token(name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            source: ValueSource::ClassToken,
            ..Self::text(name, selector)
        }
    }

    /// Creates a field resolving attribute `attr` of `selector` to an absolute URL.
    #[must_use]
    pub fn absolute_url(name: impl Into<String>, selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            source: ValueSource::AbsoluteUrl { attr: attr.into() },
            ..Self::text(name, selector)
        }
    }

    /// Creates a field joining the text of every match of `selector`.
    #[must_use]
    pub fn text_list(name: impl Into<String>, selector: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            source: ValueSource::TextList {
                separator: separator.into(),
            },
            ..Self::text(name, selector)
        }
    }

    /// Creates a field with the same value for every item.
    #[must_use]
    pub fn constant(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            selector: None,
            source: ValueSource::Constant { value: value.into() },
            ..Self::text(name, "")
        }
    }

    /// Appends a normalization step.
    #[must_use]
    pub fn normalize(mut self, step: Normalizer) -> Self {
        self.normalizers.push(step);
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Turns a located raw value into the final field value.
    ///
    /// Missing or blank values are `NotFound`; normalizers run in order and
    /// a blank result is also `NotFound`, so present values are never empty.
    pub fn finish(&self, raw: Option<String>) -> Result<String, FieldLookupFault> {
        let mut value = raw
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| FieldLookupFault::not_found(&self.name))?;

        for step in &self.normalizers {
            value = step.apply(&self.name, value)?;
        }

        let value = value.trim().to_string();
        if value.is_empty() {
            return Err(FieldLookupFault::not_found(&self.name));
        }
        Ok(value)
    }
}

/// Reads the raw text value for [`ValueSource::Text`].
pub(crate) fn collapse_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    normalize_whitespace(&parts.collect::<String>())
}

/// Describes how to find items on a page and which fields to pull from each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorSpec {
    /// CSS selector matching one element per item.
    pub item_selector: String,
    /// Fields in declared (export) order.
    pub fields: Vec<FieldSpec>,
}

impl ExtractorSpec {
    /// Creates a new spec.
    #[must_use]
    pub fn new(item_selector: impl Into<String>) -> Self {
        Self {
            item_selector: item_selector.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Declared field names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Rejects empty or duplicate names and missing selectors.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.item_selector.trim().is_empty() {
            return Err(ConfigurationError::new("item_selector", "must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(ConfigurationError::new("fields", "at least one field is required"));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ConfigurationError::new("fields", "field names must not be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigurationError::new(
                    "fields",
                    format!("duplicate field name '{}'", field.name),
                ));
            }
            if field.selector.as_deref().is_some_and(|s| s.trim().is_empty()) {
                return Err(ConfigurationError::new(
                    "fields",
                    format!("field '{}' has an empty selector", field.name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ValueTable;

    #[test]
    fn test_finish_trims_and_rejects_blank() {
        let field = FieldSpec::text("title", "h3 a");
        assert_eq!(field.finish(Some("  Sharp Objects ".to_string())).unwrap(), "Sharp Objects");
        assert_eq!(field.finish(Some("   ".to_string())), Err(FieldLookupFault::not_found("title")));
        assert_eq!(field.finish(None), Err(FieldLookupFault::not_found("title")));
    }

    #[test]
    fn test_finish_runs_normalizers_in_order() {
        let field = FieldSpec::class_token("rating", "p.star-rating")
            .normalize(Normalizer::lookup(ValueTable::star_ratings()));
        assert_eq!(field.finish(Some("Two".to_string())).unwrap(), "2");
        assert_eq!(
            field.finish(Some("Zero".to_string())),
            Err(FieldLookupFault::unrecognized("rating", "Zero"))
        );
    }

    #[test]
    fn test_item_attr_has_no_selector() {
        let field = FieldSpec::item_attr("asin", "data-asin");
        assert!(field.selector.is_none());
        assert_eq!(field.source, ValueSource::Attr { name: "data-asin".to_string() });
    }

    #[test]
    fn test_list_and_constant_serde() {
        let fields: Vec<FieldSpec> = serde_json::from_str(
            r#"[
                {"name": "tags", "selector": "a.tag", "source": {"kind": "text_list"}},
                {"name": "source", "source": {"kind": "constant", "value": "bbc-news"}}
            ]"#,
        )
        .unwrap();
        assert_eq!(fields[0], FieldSpec::text_list("tags", "a.tag", ", "));
        assert_eq!(fields[1], FieldSpec::constant("source", "bbc-news"));
        assert_eq!(fields[1].finish(Some("bbc-news".to_string())).unwrap(), "bbc-news");
    }

    #[test]
    fn test_spec_validation() {
        let spec = ExtractorSpec::new("article.product_pod")
            .field(FieldSpec::attr("title", "h3 a", "title"))
            .field(FieldSpec::text("price", "p.price_color"));
        assert!(spec.validate().is_ok());
        assert_eq!(spec.field_names(), vec!["title", "price"]);

        let duplicate = spec.clone().field(FieldSpec::text("price", "span"));
        assert!(duplicate.validate().unwrap_err().message.contains("duplicate"));

        let empty = ExtractorSpec::new("li");
        assert_eq!(empty.validate().unwrap_err().field, "fields");
    }

    #[test]
    fn test_field_spec_serde_defaults() {
        let field: FieldSpec =
            serde_json::from_str(r#"{"name": "image", "selector": "img", "source": {"kind": "attr", "name": "src"}}"#)
                .unwrap();
        assert_eq!(field, FieldSpec::attr("image", "img", "src"));
        assert!(!field.required);
    }
}
