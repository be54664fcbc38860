use std::io::Read;
use std::path::Path;

use docket_core::{DocketConfig, DocketError, RendererConfig};
use docket_docs::*;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct Ticket {
    number: u32,
    title: String,
    assignee: Option<String>,
}

fn tickets() -> Vec<Ticket> {
    vec![
        Ticket {
            number: 101,
            title: "Printer offline".into(),
            assignee: Some("Leila".into()),
        },
        Ticket {
            number: 102,
            title: "VPN drops".into(),
            assignee: None,
        },
    ]
}

#[test]
fn test_headers_and_rows_stay_aligned() {
    let doc = Document::from_model(&tickets()).unwrap();
    let ex = doc.describe();

    assert_eq!(ex.shape_name, "Ticket");
    assert_eq!(ex.fields.names(), ["Number", "Title", "Assignee"]);
    for row in &ex.rows {
        assert_eq!(row.len(), ex.fields.len());
    }
    assert_eq!(ex.display_rows("-")[1], vec!["102", "VPN drops", "-"]);
}

#[test]
fn test_two_record_list() {
    let ex = Document::from_json("Row", json!([{"Name": "A", "Age": 3}, {"Name": "B", "Age": 4}]))
        .describe();
    assert_eq!(ex.fields.names(), ["Name", "Age"]);
    assert_eq!(ex.display_rows("-"), vec![vec!["A", "3"], vec!["B", "4"]]);
}

#[test]
fn test_empty_list_never_yields_empty_field_set() {
    let empty: Vec<Ticket> = Vec::new();
    let ex = Document::from_model(&empty).unwrap().describe();
    assert!(!ex.fields.is_empty());
    assert!(ex.rows.is_empty());

    let with_ticket_shape = Extractor::with_fallback_shape::<Ticket>();
    let ex = with_ticket_shape.extract(&Document::from_model(&empty).unwrap());
    assert_eq!(ex.fields.names(), ["Number", "Title", "Assignee"]);
}

#[test]
fn test_template_and_default_builder_agree_on_rows() {
    let ex = Document::from_model(&tickets()).unwrap().describe();
    let options = docket_core::HtmlConfig::default();
    let now = chrono::Local::now();

    let from_template = fill(&Template::parse("{{DataRows}}"), &ex, &options, now);
    let from_default = build_default(&ex, &options, now);

    assert!(from_default.contains(&from_template));
}

#[test]
fn test_workbook_and_archive_together() {
    let tmp = tempfile::tempdir().unwrap();
    let folder = tmp.path().join("ExportFile").join("weekly");
    std::fs::create_dir_all(folder.join("sheets")).unwrap();

    let ex = Document::from_model(&tickets()).unwrap().describe();
    let workbook = assemble_workbook(&ex, &docket_core::SheetConfig::default()).unwrap();
    std::fs::write(folder.join("sheets").join("tickets.xlsx"), &workbook).unwrap();
    std::fs::write(folder.join("readme.txt"), "weekly export").unwrap();

    let zip_path = zip_directory(&folder).unwrap();
    let mut archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);

    let mut inner = Vec::new();
    archive
        .by_name("sheets/tickets.xlsx")
        .unwrap()
        .read_to_end(&mut inner)
        .unwrap();
    assert_eq!(inner, workbook);
}

// ---------------------------------------------------------------------------
// End to end through a stand-in converter process
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn shell_service(root: &Path, script: &str) -> DocumentService {
    let mut config = DocketConfig::with_content_root(root);
    config.renderer = RendererConfig {
        executable: Some("sh".into()),
        timeout_secs: 10,
        enable_local_file_access: true,
        extra_args: vec!["-c".into(), script.into(), "renderer".into()],
    };
    DocumentService::new(config)
}

#[cfg(unix)]
#[tokio::test]
async fn test_pdf_bytes_come_from_output_file() {
    let tmp = tempfile::tempdir().unwrap();
    let service = shell_service(tmp.path(), r#"printf '%%PDF-1.4 fake' > "$3""#);

    let pdf = service.generate_pdf_from_model(&tickets()).await.unwrap();
    assert_eq!(pdf, b"%PDF-1.4 fake");
}

#[cfg(unix)]
#[tokio::test]
async fn test_renderer_receives_filled_html() {
    let tmp = tempfile::tempdir().unwrap();
    let service = shell_service(tmp.path(), r#"cp "$2" "$3""#);

    let pdf = service.generate_pdf_from_model(&tickets()).await.unwrap();
    let html = String::from_utf8(pdf).unwrap();
    assert!(html.contains("<td>Printer offline</td>"));
    assert!(html.contains("<td>VPN drops</td>\n<td>-</td>"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_renderer_failure_returns_no_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let service = shell_service(
        tmp.path(),
        r#"printf 'half' > "$3"; echo 'QFont: cannot load' >&2; exit 1"#,
    );

    match service.generate_pdf_base64(&tickets()).await {
        Err(DocketError::RendererFailure { stderr, .. }) => {
            assert!(stderr.contains("QFont: cannot load"));
        }
        other => panic!("expected RendererFailure, got: {other:?}"),
    }
}

#[test]
fn test_shipped_template_fills_every_slot() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../assets/Templates/TableTemplate.html");
    let template = Template::parse(&std::fs::read_to_string(path).unwrap());
    assert!(template.slots().any(|slot| slot == Slot::DataRows));

    let ex = Document::from_model(&tickets()).unwrap().describe();
    let html = fill(
        &template,
        &ex,
        &docket_core::HtmlConfig::default(),
        chrono::Local::now(),
    );
    assert!(!html.contains("{{"));
    assert!(html.contains("<title>Ticket report</title>"));
    assert!(html.contains("<th>Assignee</th>"));
}
