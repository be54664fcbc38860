pub mod config;
pub mod error;
pub mod logging;

pub use config::{DocketConfig, HtmlConfig, RendererConfig, SheetConfig, TextDirection};
pub use error::{DocketError, ErrorCategory, Result};
