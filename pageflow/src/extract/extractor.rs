//! The field extractor contract and a closure-based implementation.

use std::fmt;
use std::sync::Arc;

use super::ExtractionResult;
use crate::errors::{FieldLookupFault, ItemExtractionFault};

/// Pulls a fixed, declared set of named fields out of one item.
///
/// Implementations must be pure: the same item always yields the same
/// result. A field that cannot be located is recorded as absent; only a
/// fault that makes the whole item unusable is returned as `Err`.
pub trait FieldExtractor<I>: Send + Sync {
    /// Declared field names in order.
    fn field_names(&self) -> Vec<String>;

    /// Extracts one item.
    fn extract(&self, item: &I) -> Result<ExtractionResult, ItemExtractionFault>;
}

impl<I, T> FieldExtractor<I> for Arc<T>
where
    T: FieldExtractor<I> + ?Sized,
{
    fn field_names(&self) -> Vec<String> {
        (**self).field_names()
    }

    fn extract(&self, item: &I) -> Result<ExtractionResult, ItemExtractionFault> {
        (**self).extract(item)
    }
}

type LookupFn<I> = Box<dyn Fn(&I) -> Result<Option<String>, FieldLookupFault> + Send + Sync>;

struct Lookup<I> {
    name: String,
    required: bool,
    lookup: LookupFn<I>,
}

/// Extractor built from one lookup closure per field.
///
/// Works for any item type, e.g. element handles from a browser driver.
/// A closure returning `Ok(None)` or `Err(_)` marks its field absent.
pub struct LookupExtractor<I> {
    fields: Vec<Lookup<I>>,
}

impl<I> Default for LookupExtractor<I> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<I> LookupExtractor<I> {
    /// Creates an extractor with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an optional field.
    #[must_use]
    pub fn field<F>(mut self, name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&I) -> Result<Option<String>, FieldLookupFault> + Send + Sync + 'static,
    {
        self.fields.push(Lookup {
            name: name.into(),
            required: false,
            lookup: Box::new(lookup),
        });
        self
    }

    /// Adds a field whose absence skips the item.
    #[must_use]
    pub fn required_field<F>(mut self, name: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&I) -> Result<Option<String>, FieldLookupFault> + Send + Sync + 'static,
    {
        self.fields.push(Lookup {
            name: name.into(),
            required: true,
            lookup: Box::new(lookup),
        });
        self
    }
}

impl<I> fmt::Debug for LookupExtractor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupExtractor")
            .field("fields", &self.fields.iter().map(|l| l.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl<I> FieldExtractor<I> for LookupExtractor<I> {
    fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|l| l.name.clone()).collect()
    }

    fn extract(&self, item: &I) -> Result<ExtractionResult, ItemExtractionFault> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match (field.lookup)(item) {
                Ok(Some(v)) if !v.trim().is_empty() => Some(v),
                Ok(_) if field.required => {
                    return Err(ItemExtractionFault::missing_required(&FieldLookupFault::not_found(
                        &field.name,
                    )))
                }
                Err(fault) if field.required => return Err(ItemExtractionFault::missing_required(&fault)),
                Ok(_) => None,
                Err(fault) => {
                    tracing::trace!(field = %field.name, error = %fault, "Field absent");
                    None
                }
            };
            values.push((field.name.clone(), value));
        }
        Ok(ExtractionResult::from_fields(values))
    }
}
