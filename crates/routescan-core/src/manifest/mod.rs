//! Field extraction from delivery manifest pages.

mod extractor;
pub mod rules;

pub use extractor::PageExtractor;
pub use rules::{clean_store_name, FieldRuleset, HeaderMatch, HeaderRule, PageMatches};
