// HTML-to-PDF through an external converter process

pub mod renderer;

pub use renderer::{PdfRenderer, WkhtmltopdfRenderer, resolve_executable};
pub use tokio_util::sync::CancellationToken;
