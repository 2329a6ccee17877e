// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use sabana_engine::Table;

/// Export table as `{"columns": [...], "rows": [[...], ...]}`.
/// Numbers stay numbers and empty cells become `null`.
pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, table).map_err(|e| e.to_string())?;
    Ok(())
}
