//! Bounded parallel processing of a directory of documents.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{error, info};

use crate::models::config::BatchConfig;
use crate::models::ResultSet;
use crate::ocr::OcrBackend;
use crate::pdf::PageRasterizer;

use super::DocumentPipeline;

/// Identifier of `path` in the result table: its path relative to `root`
/// with `/` separators, or the file name if it is not under `root`.
pub fn document_name(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if relative.components().next().is_some() => relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// Distributes whole documents over a fixed number of blocking workers.
pub struct BatchDriver<R, E>
where
    R: PageRasterizer + 'static,
    E: OcrBackend + 'static,
{
    pipeline: Arc<DocumentPipeline<R, E>>,
    pool_size: usize,
}

impl<R, E> BatchDriver<R, E>
where
    R: PageRasterizer + 'static,
    E: OcrBackend + 'static,
{
    pub fn new(pipeline: DocumentPipeline<R, E>, pool_size: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            pool_size: pool_size.max(1),
        }
    }

    /// Size the pool from the machine's parallelism and the batch config.
    pub fn from_config(pipeline: DocumentPipeline<R, E>, config: &BatchConfig) -> Self {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(pipeline, config.pool_size(available))
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Process `files` (all under `root`) and return the deduplicated table.
    ///
    /// Records are merged in the order documents finish. `on_document` is
    /// called once per finished document with its name and record count.
    pub async fn run<F>(&self, root: &Path, files: &[PathBuf], mut on_document: F) -> ResultSet
    where
        F: FnMut(&str, usize),
    {
        info!(
            "Starting worker pool with {} workers for {} PDFs",
            self.pool_size,
            files.len()
        );

        let jobs = files.iter().map(|path| {
            let pipeline = Arc::clone(&self.pipeline);
            let path = path.clone();
            let document = document_name(root, &path);
            async move {
                let name = document.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || pipeline.process(&path, &document)).await;
                (name, outcome)
            }
        });

        let mut finished = futures_util::stream::iter(jobs).buffer_unordered(self.pool_size);
        let mut results = ResultSet::new();

        while let Some((document, outcome)) = finished.next().await {
            match outcome {
                Ok(records) => {
                    on_document(&document, records.len());
                    results.extend(records);
                }
                Err(e) => {
                    error!("Worker processing {} failed: {}", document, e);
                    on_document(&document, 0);
                }
            }
        }

        results.dedup();
        if results.is_empty() {
            info!("No Route IDs were extracted");
        } else {
            info!("Total Route IDs extracted: {}", results.len());
        }
        results
    }
}
