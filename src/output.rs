//! Record serialization: tabular (CSV), structured (JSON) and a colored
//! human-readable report.
//!
//! Both machine formats preserve aggregation order exactly; nothing here
//! sorts, groups or deduplicates.

use std::borrow::Cow;

use colored::Colorize;

use crate::error::Result;
use crate::record::{Field, Record};

/// Fixed tabular column set. The per-pattern column groups (ts/m/e/d) are
/// filled from the merged record: shared fields like `component` land in a
/// pattern's columns only when that pattern's distinguishing field
/// (`mitigation`, `exposure`, `action`) was matched.
pub const CSV_HEADER: [&str; 17] = [
    "filename",
    "functionname",
    "begin",
    "end",
    "tsmodel",
    "tsfunction",
    "mcomponent",
    "mthreat",
    "mmitigation",
    "mref",
    "ecomponent",
    "ethreat",
    "eexposure",
    "eref",
    "daction",
    "dcomponent",
    "dref",
];

/// Render the record collection as CSV: one header line, one row per
/// record, absent annotation fields as empty cells.
pub fn to_csv(records: &[Record]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().copied());

    for rec in records {
        let begin = rec.begin.to_string();
        let end = rec.end.to_string();
        let has_m = rec.mitigation.is_some();
        let has_e = rec.exposure.is_some();
        let has_d = rec.action.is_some();

        push_row(
            &mut out,
            [
                rec.filepath.as_str(),
                rec.name.as_str(),
                begin.as_str(),
                end.as_str(),
                opt(&rec.model),
                opt(&rec.function),
                gated(has_m, &rec.component),
                gated(has_m, &rec.threat),
                opt(&rec.mitigation),
                gated(has_m, &rec.reference),
                gated(has_e, &rec.component),
                gated(has_e, &rec.threat),
                opt(&rec.exposure),
                gated(has_e, &rec.reference),
                opt(&rec.action),
                gated(has_d, &rec.component),
                gated(has_d, &rec.reference),
            ]
            .into_iter(),
        );
    }

    out
}

/// Render the record collection as a JSON array. Identity keys are always
/// present; annotation keys are omitted entirely when absent.
pub fn to_json(records: &[Record], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(json)
}

/// Render a colored per-declaration summary for humans.
pub fn format_report(records: &[Record]) -> String {
    let mut out = String::new();
    let mut current_file: Option<&str> = None;
    let mut files = 0usize;
    let mut annotated = 0usize;

    for rec in records {
        if current_file != Some(rec.filepath.as_str()) {
            if current_file.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{} ({})\n", rec.filepath.bold(), rec.package));
            current_file = Some(rec.filepath.as_str());
            files += 1;
        }

        out.push_str(&format!(
            "  {} [{}-{}]\n",
            rec.name.cyan(),
            rec.begin,
            rec.end
        ));

        let fields = [
            (Field::Model, &rec.model),
            (Field::Function, &rec.function),
            (Field::Component, &rec.component),
            (Field::Threat, &rec.threat),
            (Field::Mitigation, &rec.mitigation),
            (Field::Exposure, &rec.exposure),
            (Field::Action, &rec.action),
            (Field::Ref, &rec.reference),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                out.push_str(&format!("    {}: {}\n", field.name().dimmed(), value));
            }
        }

        if rec.is_annotated() {
            annotated += 1;
        }
    }

    out.push_str(&format!(
        "\n{} files, {} declarations, {} annotated\n",
        files,
        records.len(),
        annotated
    ));
    out
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn gated<'a>(gate: bool, value: &'a Option<String>) -> &'a str {
    if gate {
        opt(value)
    } else {
        ""
    }
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        out.push_str(&escape_cell(cell));
        first = false;
    }
    out.push('\n');
}

/// Quote a cell when it contains a separator, quote or line break, with
/// embedded quotes doubled.
fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}
