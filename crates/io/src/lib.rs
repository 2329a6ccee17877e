// File I/O operations

use std::path::Path;

use sabana_engine::Table;

pub mod csv;
pub mod json;
pub mod map;
pub mod xlsx;

/// Extensions `load_table` understands, lowercase.
pub const READABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods", "csv", "txt", "tsv"];

/// Extensions `export_table` can write, lowercase.
pub const WRITABLE_EXTENSIONS: &[&str] = &["xlsx", "csv", "json"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Read the first sheet (or the whole delimited file) as a raw table.
pub fn load_table(path: &Path) -> Result<Table, String> {
    let table = match extension_of(path).as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import(path)?,
        "csv" | "txt" => csv::import(path)?,
        "tsv" => csv::import_tsv(path)?,
        other => return Err(unsupported("read", other)),
    };
    log::debug!("read {} rows x {} columns from {}", table.len(), table.columns().len(), path.display());
    Ok(table)
}

/// Same as `load_table` for an in-memory upload; `extension` picks the reader.
pub fn load_table_from_bytes(bytes: &[u8], extension: &str) -> Result<Table, String> {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => xlsx::import_from_bytes(bytes),
        "csv" | "txt" => {
            let content = csv::decode(bytes.to_vec());
            csv::import_from_string(&content, csv::sniff_delimiter(&content))
        }
        "tsv" => csv::import_from_string(&csv::decode(bytes.to_vec()), b'\t'),
        other => Err(unsupported("read", other)),
    }
}

/// Write `table` in the format named by the path's extension.
pub fn export_table(table: &Table, path: &Path) -> Result<(), String> {
    match extension_of(path).as_str() {
        "xlsx" => xlsx::export(table, path),
        "csv" => csv::export(table, path),
        "json" => json::export(table, path),
        other => Err(unsupported("write", other)),
    }?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn unsupported(action: &str, ext: &str) -> String {
    let known = if action == "read" { READABLE_EXTENSIONS } else { WRITABLE_EXTENSIONS };
    if ext.is_empty() {
        format!("cannot {action} a file without an extension (expected one of: {})", known.join(", "))
    } else {
        format!("cannot {action} '.{ext}' files (expected one of: {})", known.join(", "))
    }
}
