use crate::config::PartitionKey;
use crate::error::ParamResult;
use crate::store::{ParameterStore, TableRow};
use csv::{Writer, WriterBuilder};
use rusqlite::types::Value;
use std::fs::File;
use std::path::Path;

// Create CSV writer with the table's column names as header
fn create_csv_writer<T: TableRow>(path: &Path) -> ParamResult<Writer<File>> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    wtr.write_record(T::COLUMNS.iter().map(|(name, _)| *name))?;
    Ok(wtr)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(_) => String::new(),
    }
}

/// Write one partition of a parameter table to CSV. Undefined values are
/// written as empty cells.
pub fn export_partition<T: TableRow>(
    store: &ParameterStore,
    key: &PartitionKey,
    path: &Path,
) -> ParamResult<usize> {
    let rows: Vec<T> = store.load_partition(key)?;
    let mut wtr = create_csv_writer::<T>(path)?;
    for row in &rows {
        wtr.write_record(row.to_values().iter().map(cell))?;
    }
    wtr.flush()?;
    log::info!("Wrote {} rows of {} to {}", rows.len(), T::TABLE, path.display());
    Ok(rows.len())
}
