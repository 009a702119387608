use chrono::NaiveDate;

use crate::error::{FitlogError, Result};
use crate::models::{HealthRecord, NewHealthRecord, normalize_bowel_movements, parse_weight};

/// Spreadsheet tools need the byte-order mark to detect UTF-8.
pub const BOM: char = '\u{feff}';

pub const HEADERS: [&str; 6] = [
    "日期",
    "早起体重(斤)",
    "晚间体重(斤)",
    "排便次数",
    "是否排便",
    "备注",
];

const YES: &str = "是";
const NO: &str = "否";

/// Serialize the whole collection, BOM and header included.
///
/// Returns `None` for an empty collection: there is nothing worth writing and
/// the caller should tell the user instead of producing a header-only file.
/// Notes are always quoted with embedded quotes doubled; the other columns
/// are dates, numbers and 是/否 and never need quoting.
#[must_use]
pub fn encode_csv(records: &[HealthRecord]) -> Option<String> {
    if records.is_empty() {
        return None;
    }

    let mut out = String::new();
    out.push(BOM);
    out.push_str(&HEADERS.join(","));
    for r in records {
        out.push('\n');
        out.push_str(&encode_row(r));
    }
    out.push('\n');
    Some(out)
}

fn encode_row(r: &HealthRecord) -> String {
    format!(
        "{},{},{},{},{},{}",
        r.date.format("%Y-%m-%d"),
        r.morning_weight,
        r.evening_weight,
        r.bm_count,
        if r.has_bm { YES } else { NO },
        quote(r.notes.as_deref().unwrap_or_default()),
    )
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Deterministic download name for an export made on `date`.
#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("fitlog_records_{}.csv", date.format("%Y-%m-%d"))
}

/// Read a file produced by [`encode_csv`] back into unsaved records.
///
/// The header must match [`HEADERS`] name for name. Rows go through the same
/// checks as form input, so a hand-edited file with a bad weight is rejected
/// with its line number. Notes are kept exactly as quoted.
pub fn parse_export_csv(data: &str) -> Result<Vec<NewHealthRecord>> {
    let data = data.strip_prefix(BOM).unwrap_or(data);
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::None)
        .from_reader(data.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| FitlogError::Validation(format!("Failed to read CSV header: {e}")))?;
    if headers.len() != HEADERS.len() {
        return Err(FitlogError::Validation(format!(
            "Expected {} columns ({}), found {}",
            HEADERS.len(),
            HEADERS.join(","),
            headers.len()
        )));
    }
    if let Some((i, found)) = headers
        .iter()
        .enumerate()
        .find(|(i, h)| h.trim() != HEADERS[*i])
    {
        return Err(FitlogError::Validation(format!(
            "Column {} must be '{}', found '{}'",
            i + 1,
            HEADERS[i],
            found.trim()
        )));
    }

    let mut records = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2;
        let row = result
            .map_err(|e| FitlogError::Validation(format!("Failed to parse CSV row {line}: {e}")))?;
        let field = |i: usize| row.get(i).unwrap_or("").trim();
        let notes = row.get(5).unwrap_or("");

        if field(0).is_empty() {
            continue;
        }

        let date = NaiveDate::parse_from_str(field(0), "%Y-%m-%d").map_err(|_| {
            FitlogError::Validation(format!("Row {line}: invalid date '{}'", field(0)))
        })?;
        let morning_weight = parse_weight(field(1), "morning")
            .map_err(|e| FitlogError::Validation(format!("Row {line}: {e}")))?;
        let evening_weight = parse_weight(field(2), "evening")
            .map_err(|e| FitlogError::Validation(format!("Row {line}: {e}")))?;
        let bm_count: u32 = field(3).parse().map_err(|_| {
            FitlogError::Validation(format!("Row {line}: invalid count '{}'", field(3)))
        })?;
        let has_bm = parse_flag(field(4)).ok_or_else(|| {
            FitlogError::Validation(format!("Row {line}: invalid flag '{}'", field(4)))
        })?;
        let (has_bm, bm_count) = normalize_bowel_movements(has_bm, bm_count);
        let notes = Some(notes.to_string()).filter(|n| !n.trim().is_empty());

        records.push(NewHealthRecord {
            date,
            morning_weight,
            evening_weight,
            has_bm,
            bm_count,
            notes,
        });
    }

    Ok(records)
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        YES | "yes" | "true" | "1" => Some(true),
        NO | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HealthRecord {
        HealthRecord {
            id: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            morning_weight: 130.5,
            evening_weight: 132.0,
            has_bm: true,
            bm_count: 1,
            notes: Some("a \"quote\"".to_string()),
        }
    }

    #[test]
    fn test_empty_collection_is_refused() {
        assert!(encode_csv(&[]).is_none());
    }

    #[test]
    fn test_single_record_row() {
        let csv = encode_csv(&[sample()]).unwrap();
        assert!(csv.starts_with('\u{feff}'));
        let lines: Vec<&str> = csv.trim_start_matches(BOM).lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "日期,早起体重(斤),晚间体重(斤),排便次数,是否排便,备注");
        assert_eq!(lines[1], r#"2024-01-01,130.5,132,1,是,"a ""quote""""#);
    }

    #[test]
    fn test_missing_notes_are_empty_quoted() {
        let mut r = sample();
        r.notes = None;
        r.has_bm = false;
        r.bm_count = 0;
        let csv = encode_csv(&[r]).unwrap();
        assert!(csv.contains("2024-01-01,130.5,132,0,否,\"\"\n"));
    }

    #[test]
    fn test_notes_with_commas_and_newlines_survive_import() {
        let mut r = sample();
        r.notes = Some("felt ok, slept late\nsecond line".to_string());
        let csv = encode_csv(&[r.clone()]).unwrap();
        let parsed = parse_export_csv(&csv).unwrap();
        assert_eq!(parsed, vec![r.to_new()]);
    }

    #[test]
    fn test_import_exported_file() {
        let mut second = sample();
        second.id = "2".to_string();
        second.date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        second.has_bm = false;
        second.bm_count = 0;
        second.notes = None;

        let csv = encode_csv(&[sample(), second.clone()]).unwrap();
        let parsed = parse_export_csv(&csv).unwrap();
        assert_eq!(parsed, vec![sample().to_new(), second.to_new()]);
    }

    #[test]
    fn test_notes_keep_surrounding_spaces() {
        let mut r = sample();
        r.notes = Some("  indented note  ".to_string());
        let csv = encode_csv(&[r.clone()]).unwrap();
        let parsed = parse_export_csv(&csv).unwrap();
        assert_eq!(parsed[0].notes.as_deref(), Some("  indented note  "));
        assert_eq!(parsed, vec![r.to_new()]);
    }

    #[test]
    fn test_import_rejects_reordered_header() {
        let data = "日期,晚间体重(斤),早起体重(斤),排便次数,是否排便,备注\n\
                    2024-01-01,140,130,0,否,\"\"\n";
        let err = parse_export_csv(data).unwrap_err();
        assert!(matches!(err, FitlogError::Validation(_)));
        assert!(err.to_string().contains("Column 2"), "{err}");
    }

    #[test]
    fn test_import_rejects_foreign_header() {
        let data = "date,evening,morning,count,flag,notes\n2024-01-01,140,130,0,no,\n";
        assert!(parse_export_csv(data).is_err());
    }

    #[test]
    fn test_import_tolerates_padded_values() {
        let data = "日期, 早起体重(斤) ,晚间体重(斤),排便次数,是否排便,备注\n\
                    2024-01-01 , 130 ,131, 2 , 是 ,\"\"\n";
        let parsed = parse_export_csv(data).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!((parsed[0].morning_weight - 130.0).abs() < f64::EPSILON);
        assert_eq!(parsed[0].bm_count, 2);
        assert!(parsed[0].has_bm);
        assert!(parsed[0].notes.is_none());
    }

    #[test]
    fn test_import_rejects_bad_weight_with_row_number() {
        let data = "日期,早起体重(斤),晚间体重(斤),排便次数,是否排便,备注\n\
                    2024-01-01,130,131,0,否,\"\"\n\
                    2024-01-02,heavy,131,0,否,\"\"\n";
        let err = parse_export_csv(data).unwrap_err();
        assert!(err.to_string().contains("Row 3"), "{err}");
    }

    #[test]
    fn test_import_rejects_wrong_columns() {
        assert!(parse_export_csv("date,weight\n2024-01-01,130\n").is_err());
    }

    #[test]
    fn test_export_file_name() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(export_file_name(d), "fitlog_records_2024-06-15.csv");
    }
}
