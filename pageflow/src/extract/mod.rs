//! Field extraction: turning one item into one [`ExtractionResult`].
//!
//! [`FieldExtractor`] is the contract the crawl engine consumes. Two
//! implementations ship with the crate: [`LookupExtractor`], built from
//! per-field closures over any item type, and (with the `web` feature)
//! [`SelectorExtractor`], driven by a declarative [`ExtractorSpec`] of CSS
//! selectors over [`HtmlItem`]s.

mod extractor;
mod field;
mod normalize;
mod result;
#[cfg(feature = "web")]
mod selector;
mod text;

pub use extractor::{FieldExtractor, LookupExtractor};
pub use field::{ExtractorSpec, FieldSpec, ValueSource};
pub use normalize::{Normalizer, ValueTable};
pub use result::ExtractionResult;
#[cfg(feature = "web")]
pub(crate) use selector::compile_selector;
#[cfg(feature = "web")]
pub use selector::{HtmlItem, SelectorExtractor};
pub use text::{clean_text, html_to_text, normalize_whitespace};
