// Model-to-document pipeline: field extraction, HTML templates, workbooks, archives

pub mod archive;
pub mod extract;
pub mod html;
pub mod service;
pub mod template;
pub mod xlsx;

pub use archive::zip_directory;
pub use extract::{
    Describe, Document, DocumentValue, Extraction, Extractor, FieldSet, Message, Row, VALUE_FIELD,
};
pub use html::build_default;
pub use service::DocumentService;
pub use template::{Slot, Template, TemplateContext, fill};
pub use xlsx::assemble_workbook;
