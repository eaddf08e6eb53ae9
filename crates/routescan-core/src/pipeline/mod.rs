//! Document and batch processing.

mod batch;
mod document;

pub use batch::{document_name, BatchDriver};
pub use document::DocumentPipeline;
