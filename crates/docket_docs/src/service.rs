use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Local;
use docket_core::{DocketConfig, DocketError, Result};
use docket_render::{CancellationToken, PdfRenderer, WkhtmltopdfRenderer};
use serde::Serialize;
use tracing::{debug, info};

use crate::archive::{validate_folder_name, zip_directory};
use crate::extract::{Document, Extractor};
use crate::html::build_default;
use crate::template::{Template, fill};
use crate::xlsx::assemble_workbook;

/// Standard-alphabet, padded base64 used by the `*_base64` operations.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

// ---------------------------------------------------------------------------
// DocumentService
// ---------------------------------------------------------------------------

/// Public entry point: models in, PDF / workbook / archive out.
///
/// Each call works on its own data and temp files; the service holds no
/// mutable state and can be shared behind an `Arc`.
pub struct DocumentService {
    config: DocketConfig,
    extractor: Extractor,
    renderer: Arc<dyn PdfRenderer>,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("content_root", &self.config.content_root)
            .field("extractor", &self.extractor)
            .finish()
    }
}

impl DocumentService {
    /// Service using the external converter described by `config.renderer`.
    pub fn new(config: DocketConfig) -> Self {
        let renderer = Arc::new(WkhtmltopdfRenderer::from_config(&config.renderer));
        Self::with_renderer(config, renderer)
    }

    pub fn with_renderer(config: DocketConfig, renderer: Arc<dyn PdfRenderer>) -> Self {
        Self {
            config,
            extractor: Extractor::default(),
            renderer,
        }
    }

    /// Replace the extractor, e.g. to register a different empty-list shape.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn config(&self) -> &DocketConfig {
        &self.config
    }

    // -- HTML -----------------------------------------------------------------

    /// The HTML that would be handed to the renderer for `model`.
    pub async fn render_html<T: Serialize + ?Sized>(&self, model: &T) -> Result<String> {
        self.render_document_html(&Document::from_model(model)?).await
    }

    /// Fill the configured template, or build the default report when the
    /// template file does not exist.
    pub async fn render_document_html(&self, document: &Document) -> Result<String> {
        let extraction = self.extractor.extract(document);
        let now = Local::now();

        let path = self.config.template_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => {
                debug!(template = %path.display(), "filling template");
                Ok(fill(&Template::parse(&source), &extraction, &self.config.html, now))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(template = %path.display(), "template missing, using default layout");
                Ok(build_default(&extraction, &self.config.html, now))
            }
            Err(e) => Err(e.into()),
        }
    }

    // -- PDF ------------------------------------------------------------------

    pub async fn generate_pdf_from_model<T: Serialize + ?Sized>(&self, model: &T) -> Result<Vec<u8>> {
        self.generate_pdf_with_cancel(model, &CancellationToken::new())
            .await
    }

    pub async fn generate_pdf_with_cancel<T: Serialize + ?Sized>(
        &self,
        model: &T,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.generate_pdf_from_document(&Document::from_model(model)?, cancel)
            .await
    }

    pub async fn generate_pdf_from_document(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let html = self.render_document_html(document).await?;
        let pdf = self.renderer.render(&html, cancel).await?;
        info!(shape = document.shape_name(), bytes = pdf.len(), "generated PDF");
        Ok(pdf)
    }

    pub async fn generate_pdf_base64<T: Serialize + ?Sized>(&self, model: &T) -> Result<String> {
        let pdf = self.generate_pdf_from_model(model).await?;
        Ok(encode_base64(&pdf))
    }

    // -- Workbook -------------------------------------------------------------

    pub async fn generate_excel_from_model<T: Serialize>(&self, values: &[T]) -> Result<Vec<u8>> {
        self.generate_excel_from_document(&Document::from_model(values)?)
            .await
    }

    pub async fn generate_excel_from_document(&self, document: &Document) -> Result<Vec<u8>> {
        let extraction = self.extractor.extract(document);
        let options = self.config.sheet.clone();

        let bytes = tokio::task::spawn_blocking(move || assemble_workbook(&extraction, &options))
            .await
            .map_err(|e| DocketError::Internal(format!("workbook task failed: {e}")))??;

        info!(shape = document.shape_name(), bytes = bytes.len(), "generated workbook");
        Ok(bytes)
    }

    pub async fn generate_excel_base64<T: Serialize>(&self, values: &[T]) -> Result<String> {
        let bytes = self.generate_excel_from_model(values).await?;
        Ok(encode_base64(&bytes))
    }

    /// Converting an HTML table into a workbook is not supported.
    pub async fn generate_excel_from_html_table(&self, _html: &str) -> Result<Vec<u8>> {
        Err(DocketError::UnsupportedOperation(
            "converting an HTML table to a workbook requires an HTML parser".into(),
        ))
    }

    // -- Archive --------------------------------------------------------------

    /// Zip `<export_root>/<folder_name>` into `<export_root>/<folder_name>.zip`.
    pub async fn create_zip_file(&self, folder_name: &str) -> Result<PathBuf> {
        let source = self
            .config
            .export_root()
            .join(validate_folder_name(folder_name)?);

        tokio::task::spawn_blocking(move || zip_directory(&source))
            .await
            .map_err(|e| DocketError::Internal(format!("archive task failed: {e}")))?
    }
}
