//! The document renderer seam and its Typst implementation.

use std::sync::Arc;

use shared_types::{AppError, PageSnapshot, RenderMode};
use tokio::sync::Semaphore;

use crate::storage::{storage_error, BlobStore, PutOutcome};
use crate::typst::{build_case_file_source, compile_typst};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Bytes written by a render, and where they were written.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Turns an ordered page list into one stored document.
///
/// In `Issued` mode the output path is write-once: an existing object at
/// that path is a `Conflict` and is left untouched.
#[allow(async_fn_in_trait)]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        pages: &[PageSnapshot],
        output_path: &str,
        mode: RenderMode,
    ) -> Result<RenderedDocument, AppError>;
}

/// Compiles pages with the in-process Typst engine and writes the PDF to a
/// [`BlobStore`]. At most `max_concurrent` compilations run at once.
pub struct TypstRenderer<B> {
    blobs: Arc<B>,
    permits: Arc<Semaphore>,
}

impl<B> Clone for TypstRenderer<B> {
    fn clone(&self) -> Self {
        Self {
            blobs: Arc::clone(&self.blobs),
            permits: Arc::clone(&self.permits),
        }
    }
}

impl<B: BlobStore> TypstRenderer<B> {
    pub fn new(blobs: Arc<B>, max_concurrent: usize) -> Self {
        Self {
            blobs,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

impl<B: BlobStore> DocumentRenderer for TypstRenderer<B> {
    async fn render(
        &self,
        pages: &[PageSnapshot],
        output_path: &str,
        mode: RenderMode,
    ) -> Result<RenderedDocument, AppError> {
        if pages.is_empty() {
            return Err(AppError::render("Cannot render a document with no pages"));
        }

        let source = build_case_file_source(pages, mode)?;
        let bytes = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|e| AppError::render(format!("Renderer unavailable: {e}")))?;
            compile_typst(source).await?
        };

        tracing::debug!(
            path = output_path,
            mode = mode.as_str(),
            pages = pages.len(),
            size = bytes.len(),
            "Rendered document"
        );

        match mode {
            RenderMode::Issued => {
                let outcome = self
                    .blobs
                    .put_new(output_path, PDF_CONTENT_TYPE, bytes.clone())
                    .await
                    .map_err(|e| storage_error("Failed to store case file", e))?;
                if outcome == PutOutcome::AlreadyExists {
                    tracing::warn!(path = output_path, "Issued document already exists");
                    return Err(AppError::conflict(format!(
                        "A document already exists at {output_path}"
                    )));
                }
            }
            RenderMode::Draft | RenderMode::Preview => {
                self.blobs
                    .put(output_path, PDF_CONTENT_TYPE, bytes.clone())
                    .await
                    .map_err(|e| storage_error("Failed to store preview", e))?;
            }
        }

        Ok(RenderedDocument {
            path: output_path.to_string(),
            bytes,
        })
    }
}
