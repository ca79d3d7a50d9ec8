//! Uploaded report tables and remote symbol sheets.
//!
//! CSV goes through the `csv` reader; `.xls`/`.xlsx` workbooks are read with
//! calamine, first worksheet only. Other extensions are
//! [`TrendError::UnsupportedFileType`].

use crate::domain::error::TrendError;
use calamine::{open_workbook_auto_from_rs, Reader};
use std::fs::{self, File};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

pub const SYMBOL_COLUMN: &str = "Symbol";

/// A loaded table, cells kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl UploadedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    }

    /// Non-blank, trimmed cells of column `name`.
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| row.get(idx))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

fn parse_error(file: &str, reason: impl ToString) -> TrendError {
    TrendError::ImportParse {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}

/// Read a CSV table from any reader. `file` only labels errors.
pub fn read_table<R: Read>(reader: R, file: &str) -> Result<UploadedTable, TrendError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| parse_error(file, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(parse_error(file, "missing header row"));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| parse_error(file, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!(file, columns = headers.len(), rows = rows.len(), "table loaded");
    Ok(UploadedTable { headers, rows })
}

/// Read the first worksheet of an `.xls`/`.xlsx` workbook. The first row is
/// the header; every cell is kept as its display text.
pub fn read_workbook(bytes: Vec<u8>, file: &str) -> Result<UploadedTable, TrendError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| parse_error(file, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error(file, "workbook has no worksheets"))?
        .map_err(|e| parse_error(file, e))?;

    let mut cells = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers: Vec<String> = cells
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(parse_error(file, "missing header row"));
    }
    let rows: Vec<Vec<String>> = cells.collect();
    debug!(file, columns = headers.len(), rows = rows.len(), "workbook loaded");
    Ok(UploadedTable { headers, rows })
}

/// Load an uploaded report: `.csv`, `.xls` or `.xlsx` (case-insensitive).
pub fn load_table(path: &Path) -> Result<UploadedTable, TrendError> {
    let name = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => {
            let file = File::open(path)?;
            read_table(file, &name)
        }
        Some("xls") | Some("xlsx") => read_workbook(fs::read(path)?, &name),
        _ => Err(TrendError::UnsupportedFileType { file: name }),
    }
}

/// The `Symbol` column of a CSV (header matched case-insensitively).
pub fn symbols_from_csv<R: Read>(reader: R, file: &str) -> Result<Vec<String>, TrendError> {
    let table = read_table(reader, file)?;
    table
        .column(SYMBOL_COLUMN)
        .ok_or_else(|| parse_error(file, format!("no {SYMBOL_COLUMN:?} column")))
}

/// Rewrite a Google Sheets edit link into its CSV export link.
///
/// `.../edit#gid=0` becomes `.../export?format=csv&gid=0`; a link already in
/// export form is returned as is. Anything not on docs.google.com is
/// rejected.
pub fn google_sheet_csv_url(url: &str) -> Result<String, TrendError> {
    let url = url.trim();
    let invalid = || TrendError::InvalidToken {
        kind: "sheet url",
        token: url.to_string(),
    };
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .and_then(|rest| rest.split('/').next())
        .ok_or_else(invalid)?;
    if host != "docs.google.com" {
        return Err(invalid());
    }
    if url.contains("/export?") {
        return Ok(url.to_string());
    }
    if url.contains("/edit#gid=") {
        return Ok(url.replacen("/edit#gid=", "/export?format=csv&gid=", 1));
    }
    if let Some(base) = url.split("/edit").next().filter(|_| url.contains("/edit")) {
        return Ok(format!("{base}/export?format=csv"));
    }
    Err(invalid())
}

/// Downloads a public Google Sheet as CSV.
#[cfg(feature = "http")]
pub struct HttpSheetSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpSheetSource {
    pub fn new() -> Result<Self, TrendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| TrendError::data_source(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn fetch_table(&self, sheet_url: &str) -> Result<UploadedTable, TrendError> {
        let url = google_sheet_csv_url(sheet_url)?;
        debug!(%url, "downloading sheet");
        let resp = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TrendError::data_source(format!("failed to download {url}: {e}")))?;
        let body = resp
            .bytes()
            .map_err(|e| TrendError::data_source(format!("failed to read {url}: {e}")))?;
        read_table(body.as_ref(), &url)
    }

    pub fn fetch_symbols(&self, sheet_url: &str) -> Result<Vec<String>, TrendError> {
        let table = self.fetch_table(sheet_url)?;
        table
            .column(SYMBOL_COLUMN)
            .ok_or_else(|| parse_error(sheet_url, format!("no {SYMBOL_COLUMN:?} column")))
    }
}
