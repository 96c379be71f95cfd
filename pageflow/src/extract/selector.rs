//! CSS-selector driven extraction over static HTML.

use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use super::field::{collapse_text, ExtractorSpec, FieldSpec, ValueSource};
use super::{ExtractionResult, FieldExtractor};
use crate::errors::{FieldLookupFault, ItemExtractionFault, SelectorError};

/// Compiles a CSS selector, keeping the source text in the error.
pub(crate) fn compile_selector(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError::new(selector, format!("{e:?}")))
}

/// One item element lifted out of a parsed page.
///
/// Holds the element's outer HTML rather than a live node so items can be
/// sent across tasks; the fragment is re-parsed on extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlItem {
    html: String,
    tag: String,
    base_url: Option<Url>,
}

impl HtmlItem {
    /// Creates an item from its outer HTML and root tag name.
    #[must_use]
    pub fn new(html: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            tag: tag.into(),
            base_url: None,
        }
    }

    /// Lifts an element out of a parsed document.
    #[must_use]
    pub fn from_element(element: ElementRef<'_>, base_url: Option<&Url>) -> Self {
        Self {
            html: element.html(),
            tag: element.value().name().to_string(),
            base_url: base_url.cloned(),
        }
    }

    /// Sets the URL relative links are resolved against.
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// The item's outer HTML.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }

    /// The root element's tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The page URL, if known.
    #[must_use]
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn document(&self) -> Html {
        // Table parts are dropped by the parser outside a table context.
        let wrapped = match self.tag.as_str() {
            "td" | "th" => format!("<table><tbody><tr>{}</tr></tbody></table>", self.html),
            "tr" => format!("<table><tbody>{}</tbody></table>", self.html),
            "tbody" | "thead" | "tfoot" => format!("<table>{}</table>", self.html),
            _ => return Html::parse_fragment(&self.html),
        };
        Html::parse_fragment(&wrapped)
    }
}

struct CompiledField {
    spec: FieldSpec,
    selector: Option<Selector>,
}

/// A [`FieldExtractor`] for [`HtmlItem`]s built from an [`ExtractorSpec`].
///
/// Selectors are compiled once at construction.
pub struct SelectorExtractor {
    fields: Vec<CompiledField>,
}

impl std::fmt::Debug for SelectorExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorExtractor")
            .field("fields", &self.fields.iter().map(|c| c.spec.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl SelectorExtractor {
    /// Compiles the given fields.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SelectorError> {
        let fields = fields
            .into_iter()
            .map(|spec| {
                let selector = spec.selector.as_deref().map(compile_selector).transpose()?;
                Ok(CompiledField { spec, selector })
            })
            .collect::<Result<Vec<_>, SelectorError>>()?;
        Ok(Self { fields })
    }

    /// Compiles the fields of an extractor spec.
    pub fn from_spec(spec: &ExtractorSpec) -> Result<Self, SelectorError> {
        Self::new(spec.fields.clone())
    }

    fn lookup(field: &CompiledField, root: ElementRef<'_>, base: Option<&Url>) -> Result<String, FieldLookupFault> {
        let spec = &field.spec;
        let raw = match (&spec.source, &field.selector) {
            (ValueSource::Constant { value }, _) => Some(value.clone()),
            (ValueSource::TextList { separator }, Some(selector)) => {
                let parts: Vec<String> = root
                    .select(selector)
                    .map(|element| collapse_text(element.text()))
                    .filter(|text| !text.is_empty())
                    .collect();
                (!parts.is_empty()).then(|| parts.join(separator))
            }
            (source, selector) => {
                let element = match selector {
                    Some(selector) => root
                        .select(selector)
                        .next()
                        .ok_or_else(|| FieldLookupFault::not_found(&spec.name))?,
                    None => root,
                };
                Self::read(source, element, base, &spec.name)?
            }
        };

        spec.finish(raw)
    }

    fn read(
        source: &ValueSource,
        element: ElementRef<'_>,
        base: Option<&Url>,
        field: &str,
    ) -> Result<Option<String>, FieldLookupFault> {
        let raw = match source {
            ValueSource::Text | ValueSource::TextList { .. } => Some(collapse_text(element.text())),
            ValueSource::Attr { name } => element.value().attr(name).map(str::to_string),
            ValueSource::ClassToken => element
                .value()
                .attr("class")
                .and_then(|classes| classes.split_whitespace().last())
                .map(str::to_string),
            ValueSource::AbsoluteUrl { attr } => match (element.value().attr(attr), base) {
                (Some(href), Some(base)) => Some(
                    base.join(href.trim())
                        .map_err(|e| FieldLookupFault::malformed(field, format!("bad link '{href}': {e}")))?
                        .to_string(),
                ),
                (href, _) => href.map(str::to_string),
            },
            ValueSource::Constant { value } => Some(value.clone()),
        };
        Ok(raw)
    }
}

impl FieldExtractor<HtmlItem> for SelectorExtractor {
    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.spec.name.clone()).collect()
    }

    fn extract(&self, item: &HtmlItem) -> Result<ExtractionResult, ItemExtractionFault> {
        let document = item.document();
        let root_selector = Selector::parse(&item.tag)
            .map_err(|e| ItemExtractionFault::new(format!("unusable item tag '{}': {e:?}", item.tag)))?;
        let root = document
            .select(&root_selector)
            .next()
            .ok_or_else(|| ItemExtractionFault::new(format!("item has no <{}> element", item.tag)))?;

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match Self::lookup(field, root, item.base_url()) {
                Ok(value) => Some(value),
                Err(fault) if field.spec.required => return Err(ItemExtractionFault::missing_required(&fault)),
                Err(fault) => {
                    tracing::trace!(field = %field.spec.name, error = %fault, "Field absent");
                    None
                }
            };
            values.push((field.spec.name.clone(), value));
        }
        Ok(ExtractionResult::from_fields(values))
    }
}
