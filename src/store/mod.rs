//! SQLite-backed store of versioned parameter tables.
//!
//! Every parameter table is partitioned by (DelineationName,
//! DiscretizationName, ParameterizationName). Writing a partition deletes and
//! re-inserts only that partition's rows inside one immediate transaction, so
//! other partitions are never touched and a failed write leaves the old rows
//! in place.

pub mod meta;
pub mod tables;

use crate::config::PartitionKey;
use crate::error::{ParamError, ParamResult};
use rusqlite::types::{FromSql, Value};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior, params, params_from_iter};
use std::path::Path;
use std::time::Duration;

const KEY_COLUMNS: [&str; 3] = ["DelineationName", "DiscretizationName", "ParameterizationName"];

/// A record stored in a partitioned table. The first three columns are
/// always the partition key.
pub trait TableRow: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [(&'static str, &'static str)];

    fn key(&self) -> &PartitionKey;
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &mut RowReader<'_, '_>) -> rusqlite::Result<Self>;
}

pub struct RowReader<'a, 'b> {
    row: &'a Row<'b>,
    idx: usize,
}

impl<'a, 'b> RowReader<'a, 'b> {
    pub fn new(row: &'a Row<'b>) -> Self {
        RowReader { row, idx: 0 }
    }

    pub fn next<T: FromSql>(&mut self) -> rusqlite::Result<T> {
        let value = self.row.get(self.idx)?;
        self.idx += 1;
        Ok(value)
    }

    pub fn key(&mut self) -> rusqlite::Result<PartitionKey> {
        Ok(PartitionKey {
            delineation: self.next()?,
            discretization: self.next()?,
            parameterization: self.next()?,
        })
    }
}

pub fn real(v: Option<f64>) -> Value {
    match v {
        Some(x) if !x.is_nan() => Value::Real(x),
        _ => Value::Null,
    }
}

pub fn integer(v: Option<i64>) -> Value {
    v.map(Value::Integer).unwrap_or(Value::Null)
}

pub fn text(v: &str) -> Value {
    Value::Text(v.to_string())
}

pub fn key_values(key: &PartitionKey) -> [Value; 3] {
    [
        text(&key.delineation),
        text(&key.discretization),
        text(&key.parameterization),
    ]
}

fn create_table_sql<T: TableRow>() -> String {
    let columns: Vec<String> = T::COLUMNS
        .iter()
        .map(|(name, ty)| format!("\"{}\" {}", name, ty))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS \"{}\" ({});
         CREATE INDEX IF NOT EXISTS \"{}_partition\" ON \"{}\" ({});",
        T::TABLE,
        columns.join(", "),
        T::TABLE,
        T::TABLE,
        KEY_COLUMNS.join(", ")
    )
}

fn select_sql<T: TableRow>() -> String {
    let columns: Vec<String> = T::COLUMNS
        .iter()
        .map(|(name, _)| format!("\"{}\"", name))
        .collect();
    format!("SELECT {} FROM \"{}\"", columns.join(", "), T::TABLE)
}

const PARTITION_FILTER: &str =
    "WHERE DelineationName = ?1 AND DiscretizationName = ?2 AND ParameterizationName = ?3";

pub struct ParameterStore {
    conn: Connection,
}

impl ParameterStore {
    pub fn open(path: &Path) -> ParamResult<Self> {
        let conn = Connection::open(path)?;
        // a concurrent run waits for the writer instead of failing
        conn.busy_timeout(Duration::from_secs(60))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> ParamResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ParamResult<Self> {
        let store = ParameterStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> ParamResult<()> {
        let ddl = [
            create_table_sql::<crate::hillslope::HillslopeRecord>(),
            create_table_sql::<crate::channel::ChannelRecord>(),
            create_table_sql::<tables::Keyed<crate::soil::HorizonTextureRow>>(),
            create_table_sql::<tables::Keyed<crate::soil::HorizonRow>>(),
            create_table_sql::<tables::Keyed<crate::soil::HorizonAggregate>>(),
            create_table_sql::<tables::Keyed<crate::soil::MapUnitAggregate>>(),
            meta::SCHEMA.to_string(),
        ];
        self.conn.execute_batch(&ddl.join("\n"))?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn load_partition<T: TableRow>(&self, key: &PartitionKey) -> ParamResult<Vec<T>> {
        let sql = format!("{} {} ORDER BY rowid", select_sql::<T>(), PARTITION_FILTER);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![key.delineation, key.discretization, key.parameterization],
            |row| T::from_row(&mut RowReader::new(row)),
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    pub fn load_all<T: TableRow>(&self) -> ParamResult<Vec<T>> {
        let sql = format!("{} ORDER BY rowid", select_sql::<T>());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| T::from_row(&mut RowReader::new(row)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    /// Run `f` inside one immediate transaction; nothing is committed unless
    /// `f` succeeds. The immediate lock serializes concurrent runs.
    pub fn write<F>(&mut self, f: F) -> ParamResult<()>
    where
        F: FnOnce(&Transaction<'_>) -> ParamResult<()>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        f(&tx)?;
        tx.commit()?;
        Ok(())
    }

    pub fn replace_partition<T: TableRow>(
        &mut self,
        key: &PartitionKey,
        rows: &[T],
    ) -> ParamResult<()> {
        self.write(|tx| replace_partition_in(tx, key, rows))
    }
}

pub fn replace_partition_in<T: TableRow>(
    tx: &Transaction<'_>,
    key: &PartitionKey,
    rows: &[T],
) -> ParamResult<()> {
    if let Some(stray) = rows.iter().find(|r| r.key() != key) {
        return Err(ParamError::PartitionMismatch {
            expected: key.to_string(),
            found: stray.key().to_string(),
        });
    }

    let deleted = tx.execute(
        &format!("DELETE FROM \"{}\" {}", T::TABLE, PARTITION_FILTER),
        params![key.delineation, key.discretization, key.parameterization],
    )?;

    let names: Vec<String> = T::COLUMNS
        .iter()
        .map(|(name, _)| format!("\"{}\"", name))
        .collect();
    let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        T::TABLE,
        names.join(", "),
        placeholders.join(", ")
    ))?;
    for row in rows {
        stmt.execute(params_from_iter(row.to_values()))?;
    }

    log::debug!(
        "{}: replaced {} rows of {} with {}",
        T::TABLE,
        deleted,
        key,
        rows.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provenance;
    use crate::hillslope::{HillslopeElement, HillslopeRecord};
    use crate::params::{CoverParams, SoilParams};

    fn record(key: &PartitionKey, id: i64, ksat: f64) -> HillslopeRecord {
        HillslopeRecord {
            key: key.clone(),
            hillslope_id: id,
            element: HillslopeElement {
                area: Some(100.0 * id as f64),
                channel_id: Some(id + 1),
                ..Default::default()
            },
            soil: SoilParams {
                ksat: Some(ksat),
                clay: Some(0.25),
                ..Default::default()
            },
            cover: CoverParams {
                canopy: Some(0.4),
                ..Default::default()
            },
            provenance: Provenance {
                creation_date: "2024-01-01T00:00:00.000000".to_string(),
                tool_version: "4.0".to_string(),
                store_version: "4.0".to_string(),
                status: "X".to_string(),
            },
        }
    }

    #[test]
    fn records_survive_a_round_trip() {
        let mut store = ParameterStore::in_memory().unwrap();
        let key = PartitionKey::new("d", "s", "p");
        let rows = vec![record(&key, 1, 3.5), record(&key, 2, 7.0)];
        store.replace_partition(&key, &rows).unwrap();
        let loaded: Vec<HillslopeRecord> = store.load_partition(&key).unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn other_partitions_are_untouched() {
        let mut store = ParameterStore::in_memory().unwrap();
        let current = PartitionKey::new("d", "s", "p1");
        let other = PartitionKey::new("d", "s", "p0");
        let other_disc = PartitionKey::new("d", "s2", "p1");
        store
            .replace_partition(&other, &[record(&other, 1, 1.0), record(&other, 2, 2.0)])
            .unwrap();
        store
            .replace_partition(&other_disc, &[record(&other_disc, 1, 9.0)])
            .unwrap();
        let before_other: Vec<HillslopeRecord> = store.load_partition(&other).unwrap();
        let before_disc: Vec<HillslopeRecord> = store.load_partition(&other_disc).unwrap();

        store
            .replace_partition(&current, &[record(&current, 1, 5.0)])
            .unwrap();
        store
            .replace_partition(&current, &[record(&current, 1, 6.0), record(&current, 3, 6.0)])
            .unwrap();

        assert_eq!(store.load_partition::<HillslopeRecord>(&other).unwrap(), before_other);
        assert_eq!(store.load_partition::<HillslopeRecord>(&other_disc).unwrap(), before_disc);
        let now: Vec<HillslopeRecord> = store.load_partition(&current).unwrap();
        assert_eq!(now.len(), 2);
        assert_eq!(now[0].soil.ksat, Some(6.0));
    }

    #[test]
    fn replacing_twice_is_idempotent() {
        let mut store = ParameterStore::in_memory().unwrap();
        let key = PartitionKey::new("d", "s", "p");
        let other = PartitionKey::new("d", "s", "q");
        store.replace_partition(&other, &[record(&other, 1, 1.0)]).unwrap();
        let rows = vec![record(&key, 1, 3.5), record(&key, 2, 7.0)];

        store.replace_partition(&key, &rows).unwrap();
        let once: Vec<HillslopeRecord> = store.load_all().unwrap();
        store.replace_partition(&key, &rows).unwrap();
        let twice: Vec<HillslopeRecord> = store.load_all().unwrap();

        let sort = |mut v: Vec<HillslopeRecord>| {
            v.sort_by(|a, b| (&a.key, a.hillslope_id).cmp(&(&b.key, b.hillslope_id)));
            v
        };
        assert_eq!(sort(once), sort(twice));
    }

    #[test]
    fn failed_write_leaves_partition_intact() {
        let mut store = ParameterStore::in_memory().unwrap();
        let key = PartitionKey::new("d", "s", "p");
        let stray = PartitionKey::new("d", "s", "elsewhere");
        store.replace_partition(&key, &[record(&key, 1, 3.5)]).unwrap();

        let result = store.replace_partition(&key, &[record(&key, 1, 8.0), record(&stray, 2, 8.0)]);
        assert!(matches!(result, Err(ParamError::PartitionMismatch { .. })));

        let result = store.write(|tx| {
            replace_partition_in(tx, &key, &[record(&key, 5, 8.0)])?;
            Err(ParamError::MissingWorkspace)
        });
        assert!(result.is_err());

        let loaded: Vec<HillslopeRecord> = store.load_partition(&key).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].soil.ksat, Some(3.5));
    }

    #[test]
    fn undefined_values_stored_as_null() {
        let mut store = ParameterStore::in_memory().unwrap();
        let key = PartitionKey::new("d", "s", "p");
        let mut row = record(&key, 1, 1.0);
        row.soil.porosity = Some(f64::NAN);
        store.replace_partition(&key, &[row]).unwrap();
        let nulls: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM parameters_hillslopes WHERE Porosity IS NULL",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(nulls, 1);
    }
}
