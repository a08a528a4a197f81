//! Export adapters: editable HTML form, JSON document, flat CSV record,
//! printable PDF.
//!
//! Adapters only read the checklist and report they are given.

use crate::checklist::{Checklist, ChecklistEntry};
use crate::error::Result;
use crate::pdf;
use crate::validation::ChecklistValidationReport;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Warnings and suggestions beyond this are left off the HTML form.
const HTML_LIST_LIMIT: usize = 10;

#[derive(Serialize)]
struct ChecklistExport<'a> {
    checklist: &'a Checklist,
    validation: &'a ChecklistValidationReport,
}

/// Reviewer edits are posted here by the HTML form's save action.
const DASHBOARD_URL: &str = "http://localhost:8080";

/// File-name stem for a group. Whitespace, path separators and characters
/// that are not allowed in file names become underscores.
pub fn group_slug(group_name: &str) -> String {
    let slug: String = group_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();
    if slug.chars().all(|c| c == '.') {
        return "group".to_string();
    }
    slug
}

pub fn to_json(checklist: &Checklist, report: &ChecklistValidationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ChecklistExport {
        checklist,
        validation: report,
    })?)
}

/// Header row of column names, then one row of values.
pub fn write_csv<W: Write>(checklist: &Checklist, writer: W) -> Result<()> {
    let record = checklist.flatten();
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(record.iter().map(|(k, _)| k))?;
    csv_writer.write_record(record.iter().map(|(_, v)| v))?;
    csv_writer.flush()?;
    Ok(())
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn entry_rows(html: &mut String, entries: &[ChecklistEntry]) {
    for entry in entries {
        let page = entry.page.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
        let _ = write!(
            html,
            r#"      <tr class="{status}">
        <td>{label}</td>
        <td><input type="text" name="{label}" value="{value}" data-original="{value}"></td>
        <td>{page}</td>
        <td class="confidence {band}">{confidence:.0}%</td>
        <td><span class="badge {status}">{status}</span></td>
      </tr>
"#,
            status = entry.status.as_str(),
            label = escape_html(&entry.label),
            value = escape_html(entry.value.display()),
            page = page,
            band = entry.confidence_band().as_str(),
            confidence = entry.confidence * 100.0,
        );
    }
}

fn section(html: &mut String, title: &str, entries: &[ChecklistEntry]) {
    let _ = write!(
        html,
        r#"  <h2>{}</h2>
  <table>
    <thead><tr><th>Field</th><th>Value</th><th>Page</th><th>Confidence</th><th>Status</th></tr></thead>
    <tbody>
"#,
        escape_html(title)
    );
    entry_rows(html, entries);
    html.push_str("    </tbody>\n  </table>\n");
}

fn message_list(html: &mut String, class: &str, title: &str, messages: &[String]) {
    if messages.is_empty() {
        return;
    }
    let _ = writeln!(html, r#"  <div class="{}"><h3>{}</h3><ul>"#, class, title);
    for message in messages.iter().take(HTML_LIST_LIMIT) {
        let _ = writeln!(html, "    <li>{}</li>", escape_html(message));
    }
    html.push_str("  </ul></div>\n");
}

/// Edits are tracked against each input's `data-original` value. Saving
/// posts them to the dashboard as corrections; exporting downloads the
/// current values with the edit list.
const FORM_SCRIPT: &str = r#"    const changes = [];
    const form = document.getElementById('checklistForm');

    form.querySelectorAll('input[data-original]').forEach(field => {
      field.addEventListener('change', () => {
        const original = field.dataset.original;
        const previous = changes.findIndex(c => c.field === field.name);
        if (previous >= 0) changes.splice(previous, 1);
        if (field.value !== original) {
          changes.push({
            field: field.name,
            original: original,
            corrected: field.value,
            timestamp: new Date().toISOString()
          });
          field.classList.add('changed');
        } else {
          field.classList.remove('changed');
        }
        document.getElementById('changeCount').textContent = changes.length;
      });
    });

    async function saveChanges() {
      if (changes.length === 0) {
        alert('No changes to save.');
        return;
      }
      let saved = 0;
      for (const change of changes) {
        // a filled-in missing value is not a correction
        if (!change.original || change.original === 'N/F') continue;
        try {
          const response = await fetch(DASHBOARD_URL + '/api/teach/correction', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ incorrect: change.original, correct: change.corrected, user: 'reviewer' })
          });
          if (response.ok) saved += 1;
        } catch (e) {
          console.error('Could not reach the review dashboard', e);
        }
      }
      alert(`Saved ${saved} of ${changes.length} correction(s) to the learning store.`);
    }

    function exportData() {
      const data = { group_name: form.dataset.group, fields: {}, corrections: changes };
      for (const [key, value] of new FormData(form).entries()) {
        data.fields[key] = value;
      }
      const blob = new Blob([JSON.stringify(data, null, 2)], { type: 'application/json' });
      const link = document.createElement('a');
      link.href = URL.createObjectURL(blob);
      link.download = form.dataset.export;
      link.click();
    }
"#;

/// Self-contained editable review form.
pub fn render_html(checklist: &Checklist, report: &ChecklistValidationReport) -> String {
    let group = escape_html(&checklist.metadata.group_name);
    let mut html = String::new();

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Plan Document Checklist - {group}</title>
  <style>
    body {{ font-family: sans-serif; margin: 2em; }}
    table {{ border-collapse: collapse; width: 100%; margin-bottom: 1.5em; }}
    th, td {{ border: 1px solid #ccc; padding: 6px; text-align: left; }}
    input {{ width: 100%; }}
    .badge.found {{ color: #1b7f3b; }}
    .badge.missing {{ color: #b3261e; }}
    .badge.needs_review {{ color: #a86200; }}
    .confidence.high {{ background: #e6f4ea; }}
    .confidence.medium {{ background: #fff4e0; }}
    .confidence.low {{ background: #fde7e9; }}
    .warnings, .suggestions {{ padding: 0.5em 1em; margin-bottom: 1em; }}
    .warnings {{ background: #fde7e9; }}
    .suggestions {{ background: #e8f0fe; }}
    input.changed {{ border-left: 3px solid #3498db; }}
    .actions button {{ margin-right: 0.5em; padding: 0.5em 1em; }}
  </style>
</head>
<body>
  <h1>Plan Document Checklist: {group}</h1>
  <p>Generated {generated} by {generator}</p>
  <div class="summary">
    <p>Status: <strong>{status}</strong></p>
    <p>Fields validated: {validated} | Found: {found} | Missing: {missing} | Needs review: {issues}</p>
  </div>
"#,
        group = group,
        generated = escape_html(&checklist.metadata.generated_at),
        generator = escape_html(&checklist.metadata.generator),
        status = report.overall_status.as_str().to_uppercase(),
        validated = report.fields_validated,
        found = report.fields_found,
        missing = report.fields_missing,
        issues = report.fields_with_issues,
    );

    message_list(&mut html, "warnings", "Warnings", &report.warnings);
    message_list(&mut html, "suggestions", "Suggestions", &report.suggestions);

    let slug = group_slug(&checklist.metadata.group_name);
    let _ = writeln!(
        html,
        r#"  <form id="checklistForm" data-group="{}" data-export="checklist_data_{}.json">"#,
        group,
        escape_html(&slug)
    );
    section(&mut html, "Group Information", &checklist.group_info);
    section(&mut html, "Plan Details", &checklist.plan_details);
    html.push_str(
        r#"    <div class="actions">
      <span><span id="changeCount">0</span> edited field(s)</span>
      <button type="button" onclick="saveChanges()">Save &amp; Continue Learning</button>
      <button type="button" onclick="exportData()">Export Data (JSON)</button>
      <button type="button" onclick="window.print()">Print</button>
    </div>
  </form>
"#,
    );
    let _ = write!(html, "  <script>\n    const DASHBOARD_URL = '{}';\n", DASHBOARD_URL);
    html.push_str(FORM_SCRIPT);
    html.push_str("  </script>\n</body>\n</html>\n");

    html
}

pub fn write_html(
    checklist: &Checklist,
    report: &ChecklistValidationReport,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(format!(
        "checklist_preview_{}.html",
        group_slug(&checklist.metadata.group_name)
    ));
    std::fs::write(&path, render_html(checklist, report))?;
    info!("Wrote HTML preview to {}", path.display());
    Ok(path)
}

pub fn write_json(
    checklist: &Checklist,
    report: &ChecklistValidationReport,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(format!(
        "checklist_data_{}.json",
        group_slug(&checklist.metadata.group_name)
    ));
    std::fs::write(&path, to_json(checklist, report)?)?;
    info!("Wrote JSON export to {}", path.display());
    Ok(path)
}

pub fn write_pdf(
    checklist: &Checklist,
    report: &ChecklistValidationReport,
    dir: &Path,
) -> Result<PathBuf> {
    let path = dir.join(format!(
        "checklist_{}.pdf",
        group_slug(&checklist.metadata.group_name)
    ));
    std::fs::write(&path, pdf::render_pdf(checklist, Some(report))?)?;
    info!("Wrote PDF checklist to {}", path.display());
    Ok(path)
}

pub fn write_csv_file(checklist: &Checklist, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!(
        "checklist_data_{}.csv",
        group_slug(&checklist.metadata.group_name)
    ));
    write_csv(checklist, std::fs::File::create(&path)?)?;
    info!("Wrote CSV export to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldCatalog;
    use crate::ingestion::ExtractionTable;
    use crate::learning_store::LearningStore;
    use crate::validation::validate_all;

    fn fixture() -> (Checklist, ChecklistValidationReport) {
        let table = ExtractionTable::from_csv_reader(
            "\
Field,Extracted_Value,Confidence,Page_Number
Group Name,Smith & Sons <Holdings>,0.95,1
COBRA,18 months,0.94,4
Retirees,Not eligible,0.91,4
"
            .as_bytes(),
        )
        .unwrap();
        let catalog = FieldCatalog::standard();
        let checklist = Checklist::generate("Smith & Sons", &table, &catalog);
        let report = validate_all(&checklist.field_values(), &catalog, &LearningStore::in_memory());
        (checklist, report)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_html_contains_entries_and_escapes() {
        let (checklist, report) = fixture();
        let html = render_html(&checklist, &report);

        assert!(html.contains("Smith &amp; Sons &lt;Holdings&gt;"));
        assert!(!html.contains("<Holdings>"));
        assert!(html.contains("Status: <strong>COMPLETE</strong>"));
        assert!(html.contains("Could not identify &#39;Not eligible&#39; for Retirees"));
        assert!(html.contains(r#"<td class="confidence high">94%</td>"#));
    }

    #[test]
    fn test_html_form_tracks_edits() {
        let (checklist, report) = fixture();
        let html = render_html(&checklist, &report);

        assert!(html.contains(r#"value="18 months" data-original="18 months""#));
        assert!(html.contains(r#"<form id="checklistForm" data-group="Smith &amp; Sons""#));
        assert!(html.contains(r#"data-export="checklist_data_Smith_&amp;_Sons.json""#));
        assert!(html.contains(r#"onclick="saveChanges()""#));
        assert!(html.contains(r#"onclick="exportData()""#));
        assert!(html.contains("/api/teach/correction"));
        assert!(html.contains("const DASHBOARD_URL = 'http://localhost:8080';"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_group_slug_is_a_single_file_name() {
        assert_eq!(group_slug("Smith & Sons"), "Smith_&_Sons");
        assert_eq!(group_slug("Acme/West: Plan"), "Acme_West__Plan");
        assert_eq!(group_slug(r"a\b*c?"), "a_b_c_");
        assert_eq!(group_slug(".."), "group");

        let (mut checklist, report) = fixture();
        checklist.metadata.group_name = "North/South Holdings".to_string();
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_html(&checklist, &report, dir.path()).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.ends_with("checklist_preview_North_South_Holdings.html"));
    }

    #[test]
    fn test_json_export_round_trips() {
        let (checklist, report) = fixture();
        let json = to_json(&checklist, &report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["checklist"]["metadata"]["group_name"], "Smith & Sons");
        assert_eq!(value["validation"]["overall_status"], "complete");
        let back: Checklist = serde_json::from_value(value["checklist"].clone()).unwrap();
        assert_eq!(back, checklist);
    }

    #[test]
    fn test_csv_has_header_and_one_row() {
        let (checklist, _) = fixture();
        let mut out = Vec::new();
        write_csv(&checklist, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Group_Name,Generated_At,Group Name,Group Name_Page"));
        assert!(lines[1].starts_with("Smith & Sons,"));
    }

    #[test]
    fn test_export_file_names() {
        let (checklist, report) = fixture();
        let dir = tempfile::TempDir::new().unwrap();
        let html = write_html(&checklist, &report, dir.path()).unwrap();
        let json = write_json(&checklist, &report, dir.path()).unwrap();
        let csv = write_csv_file(&checklist, dir.path()).unwrap();
        let pdf = write_pdf(&checklist, &report, dir.path()).unwrap();

        assert!(pdf.ends_with("checklist_Smith_&_Sons.pdf"));
        assert!(pdf.exists());
        assert!(html.ends_with("checklist_preview_Smith_&_Sons.html"));
        assert!(json.ends_with("checklist_data_Smith_&_Sons.json"));
        assert!(csv.ends_with("checklist_data_Smith_&_Sons.csv"));
        assert!(html.exists() && json.exists() && csv.exists());
    }
}
