//! Printable PDF checklist: title, metadata table, one row per entry and
//! the validation summary, laid out on Letter pages with the base-14
//! Helvetica fonts.

use crate::checklist::{Checklist, ChecklistEntry};
use crate::error::{ReviewError, Result};
use crate::validation::ChecklistValidationReport;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 50;
const ROW_HEIGHT: i64 = 14;
/// Longest value printed in the table before truncation
const VALUE_WIDTH: usize = 45;
const SUMMARY_LIMIT: usize = 10;

/// Table columns: x offset and heading.
const COLUMNS: [(i64, &str); 4] = [(MARGIN, "Field"), (200, "Value"), (450, "Page"), (500, "Status")];

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> Object {
        match self {
            Font::Regular => Object::Name(b"F1".to_vec()),
            Font::Bold => Object::Name(b"F2".to_vec()),
        }
    }
}

/// Cursor over a growing list of pages.
struct Layout {
    pages: Vec<Vec<Operation>>,
    y: i64,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Start a new page unless `height` still fits on this one.
    fn reserve(&mut self, height: i64) {
        if self.y - height < MARGIN {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        // pages is never empty
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn text_at(&mut self, x: i64, font: Font, size: i64, text: &str) {
        let y = self.y;
        let ops = self.ops();
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.resource(), Object::Integer(size)]));
        ops.push(Operation::new("Td", vec![Object::Integer(x), Object::Integer(y)]));
        ops.push(Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]));
        ops.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, font: Font, size: i64, text: &str) {
        self.reserve(size + 4);
        self.y -= size + 4;
        self.text_at(MARGIN, font, size, text);
    }

    fn rule(&mut self) {
        let y = self.y - 4;
        let ops = self.ops();
        ops.push(Operation::new("w", vec![Object::Integer(1)]));
        ops.push(Operation::new("m", vec![Object::Integer(MARGIN), Object::Integer(y)]));
        ops.push(Operation::new(
            "l",
            vec![Object::Integer(PAGE_WIDTH - MARGIN), Object::Integer(y)],
        ));
        ops.push(Operation::new("S", vec![]));
    }

    fn gap(&mut self, height: i64) {
        self.y -= height;
    }

    fn row(&mut self, font: Font, cells: [&str; 4]) {
        self.reserve(ROW_HEIGHT);
        self.y -= ROW_HEIGHT;
        for ((x, _), cell) in COLUMNS.iter().zip(cells) {
            self.text_at(*x, font, 9, cell);
        }
    }

    fn table(&mut self, title: &str, entries: &[ChecklistEntry]) {
        self.gap(10);
        self.line(Font::Bold, 14, title);
        self.row(Font::Bold, COLUMNS.map(|(_, heading)| heading));
        self.rule();
        for entry in entries {
            let page = entry.page.map(|p| p.to_string()).unwrap_or_else(|| "N/A".to_string());
            let status = entry.status.as_str().to_uppercase();
            self.row(
                Font::Regular,
                [
                    entry.label.as_str(),
                    truncate(entry.value.display(), VALUE_WIDTH).as_str(),
                    page.as_str(),
                    status.as_str(),
                ],
            );
        }
    }
}

/// Base-14 fonts only cover Latin text; anything else prints as '?'.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c as u8 } else { b'?' })
        .collect()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max - 3).collect();
    format!("{}...", kept)
}

fn layout(checklist: &Checklist, report: Option<&ChecklistValidationReport>) -> Layout {
    let mut layout = Layout::new();

    layout.line(Font::Bold, 20, "Plan Document Checklist");
    layout.line(Font::Bold, 16, &checklist.metadata.group_name);
    layout.gap(12);

    let mut metadata = vec![
        ("Generated:", checklist.metadata.generated_at.clone()),
        ("System:", checklist.metadata.generator.clone()),
    ];
    if let Some(report) = report {
        metadata.extend([
            ("Status:", report.overall_status.as_str().to_uppercase()),
            ("Fields Found:", report.fields_found.to_string()),
            ("Missing Fields:", report.fields_missing.to_string()),
            ("Needs Review:", report.fields_with_issues.to_string()),
        ]);
    }
    for (label, value) in &metadata {
        layout.reserve(ROW_HEIGHT);
        layout.y -= ROW_HEIGHT;
        layout.text_at(MARGIN, Font::Bold, 10, label);
        layout.text_at(160, Font::Regular, 10, value);
    }

    layout.table("Group Information", &checklist.group_info);
    layout.table("Plan Details", &checklist.plan_details);

    if let Some(report) = report {
        for (title, messages) in [("Warnings", &report.warnings), ("Suggestions", &report.suggestions)] {
            if messages.is_empty() {
                continue;
            }
            layout.gap(10);
            layout.line(Font::Bold, 12, title);
            for message in messages.iter().take(SUMMARY_LIMIT) {
                layout.line(Font::Regular, 9, &format!("- {}", truncate(message, 100)));
            }
        }
    }

    layout
}

/// Render the checklist as PDF bytes. The report adds the status rows and
/// the warning and suggestion lists.
pub fn render_pdf(
    checklist: &Checklist,
    report: Option<&ChecklistValidationReport>,
) -> Result<Vec<u8>> {
    let layout = layout(checklist, report);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(layout.pages.len());
    for operations in layout.pages {
        let content = Content { operations }
            .encode()
            .map_err(|e| ReviewError::Pdf(format!("failed to encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ReviewError::Pdf(format!("failed to write document: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::ingestion::ExtractionTable;
    use crate::learning_store::LearningStore;
    use crate::validation::validate_all;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|w| w == needle.as_bytes())
    }

    fn fixture() -> (Checklist, ChecklistValidationReport) {
        let table = ExtractionTable::from_csv_reader(
            "\
Field,Extracted_Value,Confidence,Page_Number
Group Name,Aurora Dynamics,0.95,1
COBRA,18 months post-employment,0.94,4
Retirees,Not eligible,0.91,4
Subrogation,N/F,0.0,
"
            .as_bytes(),
        )
        .unwrap();
        let catalog = FieldCatalog::standard();
        let checklist = Checklist::generate("Aurora Dynamics", &table, &catalog);
        let report = validate_all(&checklist.field_values(), &catalog, &LearningStore::in_memory());
        (checklist, report)
    }

    #[test]
    fn test_pdf_has_sections_and_rows() {
        let (checklist, report) = fixture();
        let bytes = render_pdf(&checklist, Some(&report)).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, "(Plan Document Checklist)"));
        assert!(contains(&bytes, "(Group Information)"));
        assert!(contains(&bytes, "(Plan Details)"));
        assert!(contains(&bytes, "(18 months post-employment)"));
        assert!(contains(&bytes, "(MISSING)"));
        assert!(contains(&bytes, "(Warnings)"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_pdf_without_report_skips_summary() {
        let (checklist, _) = fixture();
        let bytes = render_pdf(&checklist, None).unwrap();
        assert!(!contains(&bytes, "(Status:)"));
        assert!(!contains(&bytes, "(Warnings)"));
    }

    #[test]
    fn test_long_tables_break_pages() {
        let mut layout = Layout::new();
        for i in 0..120 {
            layout.row(Font::Regular, ["Field", i.to_string().as_str(), "1", "FOUND"]);
        }
        assert!(layout.pages.len() > 2);
        assert!(layout.y >= MARGIN);
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(pdf_text("Café\t(A)"), b"Caf??(A)".to_vec());
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("short", 8), "short");
    }
}
