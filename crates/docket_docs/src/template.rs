//! Placeholder templates for HTML reports.
//!
//! A template is parsed once into literal text and named slots. Rendering
//! walks the parsed segments, so substituted text is never scanned again and
//! the order in which slots are filled cannot change the result.

use chrono::{DateTime, Local};
use docket_core::HtmlConfig;

use crate::extract::Extraction;
use crate::html::{data_rows, header_cells};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// A named placeholder recognized in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `{{ModelType}}`
    ModelType,
    /// `{{CurrentDate}}`
    CurrentDate,
    /// `{{CurrentTime}}`
    CurrentTime,
    /// `{{HeaderRow}}` or `{{Properties}}`
    HeaderRow,
    /// `{{DataRows}}`
    DataRows,
}

impl Slot {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ModelType" => Some(Self::ModelType),
            "CurrentDate" => Some(Self::CurrentDate),
            "CurrentTime" => Some(Self::CurrentTime),
            "HeaderRow" | "Properties" => Some(Self::HeaderRow),
            "DataRows" => Some(Self::DataRows),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(Slot),
}

/// A parsed template. Text that is not a known `{{Slot}}` is kept as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                break;
            };

            match Slot::from_name(after_open[..end].trim()) {
                Some(slot) => {
                    literal.push_str(&rest[..start]);
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Slot(slot));
                    rest = &after_open[end + CLOSE.len()..];
                }
                // Not a slot: keep the `{{` as text and rescan from just
                // after it, so a real slot later in the span still fills.
                None => {
                    literal.push_str(&rest[..start + OPEN.len()]);
                    rest = after_open;
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// Slots in the order they appear, including repeats.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, context: &TemplateContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(context.value(*slot)),
            }
        }
        out
    }
}

/// Values for every [`Slot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    pub model_type: String,
    pub current_date: String,
    pub current_time: String,
    pub header_row: String,
    pub data_rows: String,
}

impl TemplateContext {
    pub fn from_extraction(
        extraction: &Extraction,
        options: &HtmlConfig,
        now: DateTime<Local>,
    ) -> Self {
        Self {
            model_type: options.model_label(&extraction.shape_name),
            current_date: options.format_date(&now),
            current_time: options.format_time(&now),
            header_row: header_cells(&extraction.fields, options),
            data_rows: data_rows(extraction, options),
        }
    }

    pub fn value(&self, slot: Slot) -> &str {
        match slot {
            Slot::ModelType => &self.model_type,
            Slot::CurrentDate => &self.current_date,
            Slot::CurrentTime => &self.current_time,
            Slot::HeaderRow => &self.header_row,
            Slot::DataRows => &self.data_rows,
        }
    }
}

/// Fill `template` with the fields and rows of `extraction`.
pub fn fill(
    template: &Template,
    extraction: &Extraction,
    options: &HtmlConfig,
    now: DateTime<Local>,
) -> String {
    template.render(&TemplateContext::from_extraction(extraction, options, now))
}
