use anyhow::{Context, Result, bail};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable that overrides [`DocketConfig::content_root`].
pub const CONTENT_ROOT_ENV: &str = "DOCKET_CONTENT_ROOT";

pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d";
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M";

// ---------------------------------------------------------------------------
// DocketConfig
// ---------------------------------------------------------------------------

/// Pipeline configuration, usually stored as `docket.json` next to the
/// content root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocketConfig {
    /// Root directory that holds templates and export folders.
    pub content_root: PathBuf,
    /// Template directory, relative to `content_root`.
    pub templates_dir: PathBuf,
    /// Template file stem; the file is `<template_name>.html`.
    pub template_name: String,
    /// Export directory, relative to `content_root`.
    pub export_dir: PathBuf,

    pub renderer: RendererConfig,
    pub html: HtmlConfig,
    pub sheet: SheetConfig,

    pub log_level: String,
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            templates_dir: PathBuf::from("Templates"),
            template_name: "TableTemplate".into(),
            export_dir: PathBuf::from("ExportFile"),
            renderer: RendererConfig::default(),
            html: HtmlConfig::default(),
            sheet: SheetConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl DocketConfig {
    /// Default config rooted at `content_root`.
    pub fn with_content_root(content_root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: content_root.into(),
            ..Self::default()
        }
    }

    /// Full path of the HTML template: `<root>/<templates_dir>/<name>.html`.
    pub fn template_path(&self) -> PathBuf {
        self.content_root
            .join(&self.templates_dir)
            .join(format!("{}.html", self.template_name))
    }

    /// Directory that holds exported folders and their archives.
    pub fn export_root(&self) -> PathBuf {
        self.content_root.join(&self.export_dir)
    }

    /// Load config from a specific file path, writing defaults if the file
    /// does not exist yet.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            config
                .validate()
                .with_context(|| format!("Invalid config in {}", path.display()))?;
            info!("Loaded config from {}", path.display());
            config
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            config
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Reject settings that would only fail later, at render time.
    pub fn validate(&self) -> Result<()> {
        self.html.validate()
    }

    /// Apply `DOCKET_CONTENT_ROOT` when it is set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Some(root) = std::env::var_os(CONTENT_ROOT_ENV).filter(|v| !v.is_empty()) {
            self.content_root = PathBuf::from(root);
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Settings for the external HTML-to-PDF converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Explicit executable path. When unset, well-known install locations
    /// are probed before falling back to `PATH`.
    pub executable: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Pass `--enable-local-file-access` so templates can load local assets.
    pub enable_local_file_access: bool,
    /// Extra arguments placed before the input/output paths.
    pub extra_args: Vec<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            executable: None,
            timeout_secs: 60,
            enable_local_file_access: true,
            extra_args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Rtl,
    Ltr,
}

impl TextDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rtl => "rtl",
            Self::Ltr => "ltr",
        }
    }
}

/// Options shared by the template filler and the default HTML builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HtmlConfig {
    pub lang: String,
    pub direction: TextDirection,
    /// Fixed `{{ModelType}}` label. When unset the label is derived from
    /// the model's type name.
    pub report_label: Option<String>,
    pub date_format: String,
    pub time_format: String,
    /// Text written for fields that could not be resolved.
    pub missing_placeholder: String,
    /// HTML-escape header and cell text before insertion.
    pub escape_values: bool,
    pub attribute_label: String,
    pub value_label: String,
    pub generated_label: String,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            lang: "fa".into(),
            direction: TextDirection::Rtl,
            report_label: None,
            date_format: DEFAULT_DATE_FORMAT.into(),
            time_format: DEFAULT_TIME_FORMAT.into(),
            missing_placeholder: "-".into(),
            escape_values: false,
            attribute_label: "Attribute".into(),
            value_label: "Value".into(),
            generated_label: "Generated".into(),
        }
    }
}

impl HtmlConfig {
    /// Human-facing report label for a model shape.
    pub fn model_label(&self, shape_name: &str) -> String {
        match &self.report_label {
            Some(label) => label.clone(),
            None => format!("{shape_name} report"),
        }
    }

    /// Both strftime formats must parse.
    pub fn validate(&self) -> Result<()> {
        for (key, format) in [
            ("html.date_format", &self.date_format),
            ("html.time_format", &self.time_format),
        ] {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                bail!("{key} is not a valid strftime format: {format:?}");
            }
        }
        Ok(())
    }

    /// `now` in `date_format`.
    pub fn format_date(&self, now: &DateTime<Local>) -> String {
        format_or_default(now, &self.date_format, DEFAULT_DATE_FORMAT)
    }

    /// `now` in `time_format`.
    pub fn format_time(&self, now: &DateTime<Local>) -> String {
        format_or_default(now, &self.time_format, DEFAULT_TIME_FORMAT)
    }
}

/// chrono reports a bad format as `fmt::Error` at display time; fall back to
/// the built-in format instead of panicking in `to_string`.
fn format_or_default(now: &DateTime<Local>, format: &str, default: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", now.format(format)).is_ok() {
        return out;
    }
    warn!(format, "invalid strftime format, using {default}");
    now.format(default).to_string()
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    pub sheet_name: String,
    /// Written to A1 when there are no rows.
    pub empty_message: String,
    /// Text written for fields that could not be resolved. Empty leaves the
    /// cell blank.
    pub missing_placeholder: String,
    /// Write numeric-looking values as numbers rather than text.
    pub numeric_cells: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            sheet_name: "Data".into(),
            empty_message: "No data available".into(),
            missing_placeholder: String::new(),
            numeric_cells: true,
        }
    }
}
