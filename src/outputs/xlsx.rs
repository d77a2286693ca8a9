//! Spreadsheet report: one sheet per group, leading column visually merged.
//!
//! Each sheet has a bold header row `source | keyword | category` followed by
//! the group's rows in processing order. Once every sheet is written, a merge
//! pass walks each sheet's `source` column and merges every maximal run of two
//! or more equal values into a single left-aligned, vertically centred,
//! wrapped cell. Single-row runs are left alone and no row is moved or
//! dropped.

use crate::errors::WriteError;
use crate::models::{ReportGroup, Row};
use crate::utils::truncate_chars;
use itertools::Itertools;
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Longest sheet name the format accepts, in characters.
pub const SHEET_NAME_LIMIT: usize = 31;

pub const HEADERS: [&str; 3] = ["source", "keyword", "category"];

const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Write all groups to `path`, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.display(), groups = groups.len()))]
pub fn write_report(groups: &[ReportGroup], path: &Path) -> Result<(), WriteError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let merge_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap();

    let mut taken = HashSet::new();
    for (index, group) in groups.iter().enumerate() {
        let name = sheet_name(&group.label, index, &taken);
        taken.insert(name.to_lowercase());

        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_rows(sheet, &name, &group.rows, &header_format)?;
        debug!(sheet = %name, rows = group.rows.len(), "Wrote sheet");
    }

    for (index, group) in groups.iter().enumerate() {
        let sheet = workbook.worksheet_from_index(index)?;
        let merged = merge_leading_column(sheet, &group.rows, &merge_format)?;
        debug!(group = %group.label, merged, "Merged source cells");
    }

    workbook.save(path)?;
    info!(
        rows = groups.iter().map(|g| g.rows.len()).sum::<usize>(),
        "Wrote spreadsheet report"
    );
    Ok(())
}

fn write_rows(
    sheet: &mut Worksheet,
    name: &str,
    rows: &[Row],
    header_format: &Format,
) -> Result<(), WriteError> {
    for (col, header) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, header_format)?;
    }
    sheet.set_column_width(0, 60)?;
    sheet.set_column_width(1, 32)?;
    sheet.set_column_width(2, 20)?;

    for (i, row) in rows.iter().enumerate() {
        let r = sheet_row(i, name)?;
        sheet.write_string(r, 0, &row.source)?;
        sheet.write_string(r, 1, &row.keyword)?;
        sheet.write_string(r, 2, &row.category)?;
    }
    Ok(())
}

/// Merge repeated `source` values; returns the number of merged regions.
fn merge_leading_column(
    sheet: &mut Worksheet,
    rows: &[Row],
    format: &Format,
) -> Result<usize, WriteError> {
    let name = sheet.name();
    let values: Vec<&str> = rows.iter().map(|r| r.source.as_str()).collect();
    let runs = merge_runs(&values);
    for &(first, last) in &runs {
        sheet.merge_range(
            sheet_row(first, &name)?,
            0,
            sheet_row(last, &name)?,
            0,
            values[first],
            format,
        )?;
    }
    Ok(runs.len())
}

/// Sheet row for the data row at `index` (row 0 is the header).
fn sheet_row(index: usize, sheet: &str) -> Result<u32, WriteError> {
    u32::try_from(index + 1).map_err(|_| WriteError::TooManyRows {
        sheet: sheet.to_string(),
    })
}

/// Inclusive `(first, last)` data-row indices of every run of two or more
/// equal consecutive values.
pub fn merge_runs(values: &[&str]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let grouped = values.iter().chunk_by(|v| **v);
    for (_, run) in &grouped {
        let len = run.count();
        if len >= 2 {
            runs.push((start, start + len - 1));
        }
        start += len;
    }
    runs
}

/// Derive a valid, unique sheet name from a group label.
///
/// Invalid characters become `_`, surrounding apostrophes are dropped and the
/// result is cut to [`SHEET_NAME_LIMIT`] characters. An empty result becomes
/// `Sheet<n>`. Names already in `taken` (lowercased, as sheet names are
/// case-insensitive) get a `~<n>` suffix.
pub fn sheet_name(label: &str, index: usize, taken: &HashSet<String>) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let mut name = truncate_chars(cleaned, SHEET_NAME_LIMIT)
        .trim_end_matches('\'')
        .to_string();
    if name.trim().is_empty() {
        name = format!("Sheet{}", index + 1);
    }
    if name.eq_ignore_ascii_case("history") {
        name.push('_');
    }

    if !taken.contains(&name.to_lowercase()) {
        return name;
    }
    let mut n = 2usize;
    loop {
        let suffix = format!("~{n}");
        let base = truncate_chars(&name, SHEET_NAME_LIMIT - suffix.chars().count());
        let candidate = format!("{base}{suffix}");
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
