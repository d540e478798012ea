use super::{Sheet, UploadError};
use crate::core::history::{FundHistoryRecord, parse_date};
use crate::core::recommendation::FundTier;
use chrono::NaiveDate;
use tracing::debug;

pub const DATE_COLUMN: &str = "Fechas";
pub const FUND_COLUMNS: [(FundTier, &str); 3] = [
    (FundTier::C, "Fondo C"),
    (FundTier::D, "Fondo D"),
    (FundTier::E, "Fondo E"),
];

/// One complete row of a fund export.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRow {
    pub date: NaiveDate,
    pub fund_c: f64,
    pub fund_d: f64,
    pub fund_e: f64,
}

impl UploadRow {
    pub fn stamp(self, label: FundTier) -> FundHistoryRecord {
        FundHistoryRecord {
            date: self.date,
            fund_c: Some(self.fund_c),
            fund_d: Some(self.fund_d),
            fund_e: Some(self.fund_e),
            position: None,
            recommendation: Some(label),
        }
    }
}

#[derive(Debug)]
struct Columns {
    date: usize,
    funds: [usize; 3],
}

impl Columns {
    fn locate(header: &[String]) -> Result<Self, UploadError> {
        let find = |name: &'static str| {
            header
                .iter()
                .position(|cell| cell.trim() == name)
                .ok_or(UploadError::MissingColumn(name))
        };
        Ok(Columns {
            date: find(DATE_COLUMN)?,
            funds: [
                find(FUND_COLUMNS[0].1)?,
                find(FUND_COLUMNS[1].1)?,
                find(FUND_COLUMNS[2].1)?,
            ],
        })
    }
}

/// Extracts the fund table from an export. The first `header_rows` rows are
/// metadata; the header is the first non-blank row after them.
pub fn parse_upload(sheet: &Sheet, header_rows: usize) -> Result<Vec<UploadRow>, UploadError> {
    let rows = sheet.rows();
    let header_index = (header_rows..rows.len())
        .find(|&i| rows[i].iter().any(|cell| !cell.trim().is_empty()))
        .ok_or(UploadError::MissingHeader {
            skipped: header_rows,
        })?;
    let columns = Columns::locate(&rows[header_index])?;
    debug!(?columns, header_row = header_index + 1, "Located upload columns");

    let table = &rows[header_index + 1..];
    let notation = Notation::detect(
        table
            .iter()
            .flat_map(|row| columns.funds.map(|i| cell(row, i))),
    );
    debug!(?notation, "Detected number notation");

    let mut parsed = Vec::new();
    let mut dropped = 0;
    for (index, row) in rows.iter().enumerate().skip(header_index + 1) {
        let date_text = cell(row, columns.date);
        let values = columns.funds.map(|i| cell(row, i));
        if date_text.is_empty() || values.iter().any(|v| v.is_empty()) {
            dropped += 1;
            continue;
        }

        let row_number = index + 1;
        let date = parse_date(date_text).ok_or_else(|| UploadError::InvalidDate {
            row: row_number,
            value: date_text.to_string(),
        })?;

        let mut numbers = [0.0; 3];
        for ((slot, text), (_, column)) in numbers.iter_mut().zip(values).zip(FUND_COLUMNS) {
            *slot = notation.parse(text).ok_or_else(|| UploadError::InvalidNumber {
                row: row_number,
                column,
                value: text.to_string(),
            })?;
        }

        parsed.push(UploadRow {
            date,
            fund_c: numbers[0],
            fund_d: numbers[1],
            fund_e: numbers[2],
        });
    }

    if parsed.is_empty() {
        return Err(UploadError::NoDataRows);
    }
    debug!(rows = parsed.len(), dropped, "Parsed upload");
    Ok(parsed)
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map_or("", |c| c.trim())
}

/// How unit values are written across one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `40123.45`
    Plain,
    /// `40.123,45`, with `.` grouping thousands.
    Chilean,
}

impl Notation {
    /// Chilean as soon as any value carries a decimal comma.
    pub fn detect<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        if values.into_iter().any(|v| v.contains(',')) {
            Notation::Chilean
        } else {
            Notation::Plain
        }
    }

    pub fn parse(self, text: &str) -> Option<f64> {
        let cleaned: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '$')
            .collect();

        let normalized = match self {
            Notation::Plain => cleaned,
            Notation::Chilean if cleaned.contains(',') || is_grouped(&cleaned) => {
                cleaned.replace('.', "").replace(',', ".")
            }
            // Numeric spreadsheet cells keep a plain decimal point.
            Notation::Chilean => cleaned,
        };
        let value = normalized.parse::<f64>().ok()?;
        value.is_finite().then_some(value)
    }
}

/// True for thousands-grouped integers such as `30.200` or `1.234.567`.
fn is_grouped(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let mut groups = digits.split('.');
    let lead_ok = groups
        .next()
        .is_some_and(|g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    let mut rest = groups.peekable();
    lead_ok
        && rest.peek().is_some()
        && rest.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

/// Parses a single unit value, detecting its notation on its own.
pub fn parse_number(text: &str) -> Option<f64> {
    Notation::detect([text]).parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn export(table: Vec<Vec<&str>>) -> Sheet {
        let mut rows: Vec<Vec<&str>> = vec![
            vec!["AFP PlanVital"],
            vec!["Valor cuota"],
            vec![],
            vec!["Periodo", "01/03/2024 - 08/03/2024"],
            vec![],
            vec!["Moneda", "CLP"],
            vec![],
        ];
        rows.extend(table);
        Sheet::from_rows(rows)
    }

    #[test]
    fn test_parses_export_and_drops_incomplete_rows() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo A", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "1", "40.123,45", "30.100,10", "25.000,00"],
            vec!["04/03/2024", "1", "40.200,00", "", "25.010,00"],
            vec!["05/03/2024", "1", "40.250,50", "30.150,00", "25.020,00"],
            vec!["2024-03-06", "1", "40300.5", "30200", "25030"],
            vec!["", "", "", "", ""],
            vec!["07/03/2024", "1", "40.310,00", "30.210,00", "25.040,00"],
        ]);

        let rows = parse_upload(&sheet, 7).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0],
            UploadRow {
                date: date(2024, 3, 1),
                fund_c: 40123.45,
                fund_d: 30100.10,
                fund_e: 25000.0,
            }
        );
        assert_eq!(rows[2].date, date(2024, 3, 6));
        assert_eq!(rows[2].fund_c, 40300.5);
    }

    #[test]
    fn test_header_follows_metadata_rows() {
        let sheet = Sheet::from_rows(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["2024-03-01", "1", "2", "3"],
        ]);

        assert_eq!(parse_upload(&sheet, 0).unwrap().len(), 1);
        assert_eq!(
            parse_upload(&sheet, 7).unwrap_err(),
            UploadError::MissingHeader { skipped: 7 }
        );
    }

    #[test]
    fn test_missing_column() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo E"],
            vec!["01/03/2024", "1", "3"],
        ]);

        assert_eq!(
            parse_upload(&sheet, 7).unwrap_err(),
            UploadError::MissingColumn("Fondo D")
        );
    }

    #[test]
    fn test_column_names_must_match_exactly() {
        let sheet = export(vec![
            vec!["Fecha", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "1", "2", "3"],
        ]);

        assert_eq!(
            parse_upload(&sheet, 7).unwrap_err(),
            UploadError::MissingColumn("Fechas")
        );
    }

    #[test]
    fn test_bad_date_rejects_upload() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "1", "2", "3"],
            vec!["marzo", "1", "2", "3"],
        ]);

        assert_eq!(
            parse_upload(&sheet, 7).unwrap_err(),
            UploadError::InvalidDate {
                row: 10,
                value: "marzo".to_string()
            }
        );
    }

    #[test]
    fn test_bad_number_names_column() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "1", "n/d", "3"],
        ]);

        assert_eq!(
            parse_upload(&sheet, 7).unwrap_err(),
            UploadError::InvalidNumber {
                row: 9,
                column: "Fondo D",
                value: "n/d".to_string()
            }
        );
    }

    #[test]
    fn test_no_complete_rows() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "1", "", "3"],
        ]);

        assert_eq!(parse_upload(&sheet, 7).unwrap_err(), UploadError::NoDataRows);
    }

    #[test]
    fn test_stamp() {
        let record = UploadRow {
            date: date(2024, 3, 1),
            fund_c: 1.0,
            fund_d: 2.0,
            fund_e: 3.0,
        }
        .stamp(FundTier::E);

        assert_eq!(record.unit_value(FundTier::D), Some(2.0));
        assert_eq!(record.position, None);
        assert_eq!(record.recommendation, Some(FundTier::E));
    }

    #[test]
    fn test_thousands_without_decimals_follow_upload_notation() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["01/03/2024", "40.123,45", "30.100,10", "25.000,00"],
            vec!["04/03/2024", "40.200", "30.200", "25.010"],
        ]);

        let rows = parse_upload(&sheet, 7).unwrap();
        assert_eq!(rows[0].fund_d, 30100.1);
        assert_eq!(rows[1].fund_c, 40200.0);
        assert_eq!(rows[1].fund_d, 30200.0);
        assert_eq!(rows[1].fund_e, 25010.0);
    }

    #[test]
    fn test_plain_upload_keeps_decimal_points() {
        let sheet = export(vec![
            vec!["Fechas", "Fondo C", "Fondo D", "Fondo E"],
            vec!["2024-03-01", "40123.45", "30.200", "25000"],
        ]);

        let rows = parse_upload(&sheet, 7).unwrap();
        assert_eq!(rows[0].fund_c, 40123.45);
        assert_eq!(rows[0].fund_d, 30.2);
    }

    #[test]
    fn test_chilean_notation_with_numeric_cells() {
        assert_eq!(Notation::Chilean.parse("40123.45"), Some(40123.45));
        assert_eq!(Notation::Chilean.parse("40.12"), Some(40.12));
        assert_eq!(Notation::Chilean.parse("1.234.567"), Some(1234567.0));
        assert_eq!(Notation::Chilean.parse("1.234.56"), None);
    }

    #[test]
    fn test_notation_detection() {
        assert_eq!(Notation::detect(["40123.45", "30.200"]), Notation::Plain);
        assert_eq!(Notation::detect(["30.200", "30.100,10"]), Notation::Chilean);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("40123.45"), Some(40123.45));
        assert_eq!(parse_number("40.123,45"), Some(40123.45));
        assert_eq!(parse_number("1.234.567,8"), Some(1234567.8));
        assert_eq!(parse_number("$ 25.000,00"), Some(25000.0));
        assert_eq!(parse_number("30"), Some(30.0));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }
}
