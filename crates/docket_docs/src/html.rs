use chrono::{DateTime, Local};
use docket_core::HtmlConfig;

use crate::extract::{Extraction, FieldSet};

/// One `<th>` line per field, in field order.
pub fn header_cells(fields: &FieldSet, options: &HtmlConfig) -> String {
    let mut html = String::new();
    for name in fields.iter() {
        html.push_str(&format!("<th>{}</th>\n", cell_text(name, options)));
    }
    html
}

/// One `<tr>` per row, one `<td>` per field. Unresolved fields use the
/// configured placeholder.
pub fn data_rows(extraction: &Extraction, options: &HtmlConfig) -> String {
    let mut html = String::new();
    for row in extraction.display_rows(&options.missing_placeholder) {
        html.push_str("<tr>\n");
        for cell in &row {
            html.push_str(&format!("<td>{}</td>\n", cell_text(cell, options)));
        }
        html.push_str("</tr>\n");
    }
    html
}

/// Build a complete, self-contained report without an external template.
///
/// A single record is laid out as an attribute/value table; lists (including
/// empty ones) get the same header and row grid the template path produces.
pub fn build_default(extraction: &Extraction, options: &HtmlConfig, now: DateTime<Local>) -> String {
    let title = escape_html(&options.model_label(&extraction.shape_name));
    let generated = format!("{} {}", options.format_date(&now), options.format_time(&now));

    let table = match extraction.single_row() {
        Some(row) => {
            let mut html = format!(
                "<table class=\"info-table\">\n<tr><th>{}</th><th>{}</th></tr>\n",
                escape_html(&options.attribute_label),
                escape_html(&options.value_label),
            );
            for (name, value) in extraction.fields.iter().zip(row) {
                let value = value.as_deref().unwrap_or(options.missing_placeholder.as_str());
                html.push_str(&format!(
                    "<tr><td><strong>{}</strong></td><td>{}</td></tr>\n",
                    cell_text(name, options),
                    cell_text(value, options),
                ));
            }
            html.push_str("</table>");
            html
        }
        None => format!(
            "<table class=\"info-table\">\n<tr>\n{}</tr>\n{}</table>",
            header_cells(&extraction.fields, options),
            data_rows(extraction, options),
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}" dir="{dir}">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
body {{ font-family: 'Tahoma', 'Arial', sans-serif; direction: {dir}; background: #f8f9fa; }}
.container {{ max-width: 800px; margin: 20px auto; padding: 20px; background: white; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
.header {{ text-align: center; margin-bottom: 30px; border-bottom: 2px solid #007bff; padding-bottom: 15px; }}
.header h1 {{ color: #007bff; margin: 0; }}
.info-table {{ width: 100%; border-collapse: collapse; margin-top: 20px; }}
.info-table th {{ background: #007bff; color: white; padding: 12px; text-align: start; }}
.info-table td {{ padding: 12px; border-bottom: 1px solid #ddd; }}
.info-table tr:nth-child(even) {{ background: #f8f9fa; }}
.footer {{ margin-top: 30px; text-align: center; color: #666; font-size: 12px; }}
</style>
</head>
<body>
<div class="container">
<div class="header">
<h1>{title}</h1>
</div>
{table}
<div class="footer">
<p>{generated_label}: {generated}</p>
</div>
</div>
</body>
</html>
"#,
        lang = escape_html(&options.lang),
        dir = options.direction.as_str(),
        title = title,
        table = table,
        generated_label = escape_html(&options.generated_label),
        generated = generated,
    )
}

fn cell_text(text: &str, options: &HtmlConfig) -> String {
    if options.escape_values {
        escape_html(text)
    } else {
        text.to_string()
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
