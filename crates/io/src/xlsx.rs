// Excel import/export (xlsx, xlsm, xls, xlsb, ods in; xlsx out)

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use sabana_engine::{Table, Value};

use crate::csv::header_names;

/// Name of the single sheet written by `export`.
pub const SHEET_NAME: &str = "resultado";

/// Last row index an xlsx sheet can hold (header included).
const MAX_XLSX_ROWS: usize = 1_048_576;

/// Import the first sheet of a workbook; its first row is the header.
pub fn import(path: &Path) -> Result<Table, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    first_sheet(&mut workbook)
}

pub fn import_from_bytes(bytes: &[u8]) -> Result<Table, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;
    first_sheet(&mut workbook)
}

fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Result<Table, String> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| cell_value(c).display()).collect(),
        None => return Err(format!("Sheet '{}' is empty (no header row)", sheet_name)),
    };
    let mut table = Table::new(header_names(header.iter().map(String::as_str)));
    for cells in rows {
        table.push_row(cells.iter().map(cell_value).collect());
    }

    if workbook.sheet_names().len() > 1 {
        log::info!("workbook has {} sheets; only '{}' was read", workbook.sheet_names().len(), sheet_name);
    }
    Ok(table)
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::String(s) if s.trim().is_empty() => Value::Empty,
        Data::String(s) => Value::text(s.as_str()),
        Data::Float(n) => Value::number(*n),
        Data::Int(n) => Value::number(*n as f64),
        Data::Bool(b) => Value::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Value::text(format!("#{:?}", e)),
        Data::DateTime(dt) => serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) => iso_datetime_to_text(s),
        Data::DurationIso(s) => iso_duration_to_text(s),
    }
}

fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Render an Excel serial (1900 system) the way a carrier sheet shows it:
/// time-only serials as `HH:MM:SS`, whole days as `YYYY-MM-DD`, otherwise both.
pub fn serial_to_text(serial: f64) -> Value {
    let total_secs = (serial * 86_400.0).round() as i64;
    let days = total_secs.div_euclid(86_400);
    let secs = total_secs.rem_euclid(86_400) as u32;

    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0);
    let date = excel_epoch()
        .and_then(|epoch| epoch.checked_add_days(Days::new(u64::try_from(days).ok()?)));

    match (date, time) {
        (_, Some(t)) if days == 0 => Value::text(t.format("%H:%M:%S").to_string()),
        (Some(d), _) if secs == 0 => Value::text(d.format("%Y-%m-%d").to_string()),
        (Some(d), Some(t)) => Value::text(format!("{} {}", d.format("%Y-%m-%d"), t.format("%H:%M:%S"))),
        _ => Value::number(serial),
    }
}

/// ODS `date-value` cells (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS[.f]`) in the
/// same text forms as `serial_to_text`. Unrecognised strings pass through.
pub fn iso_datetime_to_text(iso: &str) -> Value {
    let datetime = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(iso, fmt).ok());

    match datetime {
        Some(dt) if Some(dt.date()) == excel_epoch() => {
            Value::text(dt.time().format("%H:%M:%S").to_string())
        }
        Some(dt) if dt.time() == NaiveTime::MIN => Value::text(dt.date().format("%Y-%m-%d").to_string()),
        Some(dt) => Value::text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        None => match NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            Ok(d) => Value::text(d.format("%Y-%m-%d").to_string()),
            Err(_) => Value::text(iso),
        },
    }
}

/// ODS `time-value` cells (`PT23H30M00S`, optionally with a day part) as
/// `HH:MM:SS`. Durations of a day or more, and anything unparseable, pass
/// through as written.
pub fn iso_duration_to_text(iso: &str) -> Value {
    match iso_duration_seconds(iso) {
        Some(secs) if (0.0..86_400.0).contains(&secs) => serial_to_text(secs / 86_400.0),
        _ => Value::text(iso),
    }
}

fn iso_duration_seconds(iso: &str) -> Option<f64> {
    let rest = iso.strip_prefix('P')?;
    let (days, time) = rest.split_once('T').unwrap_or((rest, ""));

    let mut total = match days {
        "" => 0.0,
        d => d.strip_suffix('D')?.parse::<f64>().ok()? * 86_400.0,
    };
    let mut start = 0;
    for (i, c) in time.char_indices() {
        let unit = match c {
            'H' => 3_600.0,
            'M' => 60.0,
            'S' => 1.0,
            _ => continue,
        };
        total += time[start..i].parse::<f64>().ok()? * unit;
        start = i + 1;
    }
    (start == time.len()).then_some(total)
}

/// Write `table` as a one-sheet workbook.
pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    let mut workbook = build_workbook(table)?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))
}

/// The workbook `export` would write, as bytes.
pub fn xlsx_bytes(table: &Table) -> Result<Vec<u8>, String> {
    let mut workbook = build_workbook(table)?;
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX file: {}", e))
}

fn build_workbook(table: &Table) -> Result<XlsxWorkbook, String> {
    if table.len() + 1 > MAX_XLSX_ROWS {
        return Err(format!(
            "{} rows do not fit in one xlsx sheet (limit {})",
            table.len(),
            MAX_XLSX_ROWS - 1
        ));
    }

    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(SHEET_NAME)
        .map_err(|e| format!("Failed to create sheet '{}': {}", SHEET_NAME, e))?;
    write_sheet(table, worksheet)?;
    Ok(workbook)
}

fn write_sheet(table: &Table, worksheet: &mut Worksheet) -> Result<(), String> {
    let header_format = Format::new().set_bold();
    for (col, name) in table.columns().iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to freeze header: {}", e))?;

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            let written = match value {
                Value::Empty => continue,
                Value::Number(n) => worksheet.write_number(row_num, col, *n),
                Value::Text(s) => worksheet.write_string(row_num, col, s),
            };
            written.map_err(|e| format!("Failed to write cell ({}, {}): {}", row_num, col, e))?;
        }
    }
    Ok(())
}
