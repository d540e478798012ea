use super::UploadError;
use crate::core::history::format_date;
use calamine::{Data, DataType, Reader, open_workbook_auto};
use std::path::Path;
use tracing::debug;

/// Cell text of the first worksheet of an upload, row by row. Row 0 is the
/// first row of the sheet even when it is blank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| cell.into().trim().to_string()).collect())
                .collect(),
        }
    }

    /// Reads the first worksheet of `path`. For CSV uploads the delimiter is
    /// taken from the header row, the first non-blank line after
    /// `header_rows` metadata lines.
    pub fn read(path: &Path, header_rows: usize) -> Result<Self, UploadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let sheet = match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Self::read_workbook(path)?,
            "csv" | "txt" => Self::read_csv(path, header_rows)?,
            _ => return Err(UploadError::UnsupportedFormat(extension)),
        };
        debug!("Read {} rows from {}", sheet.rows.len(), path.display());
        Ok(sheet)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    fn read_workbook(path: &Path) -> Result<Self, UploadError> {
        let unreadable = |reason: String| UploadError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| unreadable("workbook has no worksheets".to_string()))?
            .map_err(|e| unreadable(e.to_string()))?;

        // Ranges start at the first used cell; pad back to absolute positions
        // so metadata rows are counted from the top of the sheet.
        let (row_offset, col_offset) = range
            .start()
            .map_or((0, 0), |(r, c)| (r as usize, c as usize));

        let mut rows = vec![Vec::new(); row_offset];
        rows.extend(range.rows().map(|row| {
            std::iter::repeat_n(String::new(), col_offset)
                .chain(row.iter().map(cell_text))
                .collect()
        }));
        Ok(Self { rows })
    }

    fn read_csv(path: &Path, header_rows: usize) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path).map_err(|e| UploadError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let content = String::from_utf8_lossy(&bytes);
        let delimiter = sniff_delimiter(&content, header_rows);

        // The csv reader skips blank lines, but they count as metadata rows.
        let blank = char::from(delimiter).to_string();
        let content = content
            .lines()
            .map(|line| if line.trim().is_empty() { blank.as_str() } else { line })
            .collect::<Vec<_>>()
            .join("\n");

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| UploadError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
        }
        Ok(Self { rows })
    }
}

/// Spreadsheet exports in Spanish locales separate fields with ';'. Values
/// may carry decimal commas, so only the header row is counted.
fn sniff_delimiter(content: &str, header_rows: usize) -> u8 {
    let count = |text: &str| (text.matches(';').count(), text.matches(',').count());
    let header = content
        .lines()
        .skip(header_rows)
        .find(|line| !line.trim().is_empty());
    let (semicolons, commas) = match header.map(count) {
        Some((0, 0)) | None => count(content),
        Some(counts) => counts,
    };
    if semicolons > commas { b';' } else { b',' }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(format_date)
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}
