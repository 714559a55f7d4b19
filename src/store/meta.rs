//! Workspace and parameterization metadata.

use super::ParameterStore;
use crate::config::{PartitionKey, ParameterizationRun, TIMESTAMP_FORMAT};
use crate::error::{ParamError, ParamResult};
use chrono::NaiveDateTime;
use rusqlite::{OptionalExtension, params};
use std::path::PathBuf;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS meta_workspace (
    LookupDirectory TEXT NOT NULL,
    CreationDate TEXT
);
CREATE TABLE IF NOT EXISTS meta_parameterization (
    DelineationName TEXT NOT NULL,
    DiscretizationName TEXT NOT NULL,
    ParameterizationName TEXT NOT NULL,
    SlopeType TEXT,
    FlowLengthMethod TEXT,
    HGRType TEXT,
    ChannelType TEXT,
    LandCoverPath TEXT,
    LandCoverLookupPath TEXT,
    SoilsPath TEXT,
    SoilsDatabasePath TEXT,
    MaxHorizons INTEGER,
    MaxThickness REAL,
    CreationDate TEXT,
    ToolVersionAtCreation TEXT,
    StoreVersionAtCreation TEXT,
    Status TEXT,
    PRIMARY KEY (DelineationName, DiscretizationName, ParameterizationName)
);
";

impl ParameterStore {
    pub fn set_lookup_directory(&mut self, dir: &str, created: NaiveDateTime) -> ParamResult<()> {
        self.write(|tx| {
            tx.execute("DELETE FROM meta_workspace", [])?;
            tx.execute(
                "INSERT INTO meta_workspace (LookupDirectory, CreationDate) VALUES (?1, ?2)",
                params![dir, created.format(TIMESTAMP_FORMAT).to_string()],
            )?;
            Ok(())
        })
    }

    pub fn lookup_directory(&self) -> ParamResult<PathBuf> {
        let dir: Option<String> = self
            .connection()
            .query_row("SELECT LookupDirectory FROM meta_workspace LIMIT 1", [], |r| {
                r.get(0)
            })
            .optional()?;
        dir.map(PathBuf::from).ok_or(ParamError::MissingWorkspace)
    }

    pub fn register_run(&mut self, run: &ParameterizationRun) -> ParamResult<()> {
        self.write(|tx| {
            tx.execute(
                "INSERT OR REPLACE INTO meta_parameterization (
                    DelineationName, DiscretizationName, ParameterizationName,
                    SlopeType, FlowLengthMethod, HGRType, ChannelType,
                    LandCoverPath, LandCoverLookupPath, SoilsPath, SoilsDatabasePath,
                    MaxHorizons, MaxThickness, CreationDate,
                    ToolVersionAtCreation, StoreVersionAtCreation, Status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    run.key.delineation,
                    run.key.discretization,
                    run.key.parameterization,
                    run.slope_type,
                    run.flow_length_method,
                    run.hydraulic_geometry,
                    run.channel_type,
                    run.land_cover_path,
                    run.land_cover_lut,
                    run.soils_path,
                    run.soils_database_path,
                    run.max_horizons,
                    run.max_thickness,
                    run.creation_date.format(TIMESTAMP_FORMAT).to_string(),
                    run.tool_version,
                    run.store_version,
                    run.status,
                ],
            )?;
            Ok(())
        })
    }

    pub fn load_run(&self, key: &PartitionKey) -> ParamResult<ParameterizationRun> {
        let row = self
            .connection()
            .query_row(
                "SELECT SlopeType, FlowLengthMethod, HGRType, ChannelType,
                        LandCoverPath, LandCoverLookupPath, SoilsPath, SoilsDatabasePath,
                        MaxHorizons, MaxThickness, CreationDate,
                        ToolVersionAtCreation, StoreVersionAtCreation, Status
                 FROM meta_parameterization
                 WHERE DelineationName = ?1 AND DiscretizationName = ?2 AND ParameterizationName = ?3",
                params![key.delineation, key.discretization, key.parameterization],
                |r| {
                    Ok((
                        [
                            r.get::<_, Option<String>>(0)?,
                            r.get(1)?,
                            r.get(2)?,
                            r.get(3)?,
                            r.get(4)?,
                            r.get(5)?,
                            r.get(6)?,
                            r.get(7)?,
                        ],
                        r.get::<_, Option<u32>>(8)?,
                        r.get::<_, Option<f64>>(9)?,
                        r.get::<_, String>(10)?,
                        [
                            r.get::<_, Option<String>>(11)?,
                            r.get(12)?,
                            r.get(13)?,
                        ],
                    ))
                },
            )
            .optional()?;

        let Some((text, max_horizons, max_thickness, created, versions)) = row else {
            return Err(ParamError::MissingRun(key.to_string()));
        };
        let creation_date = NaiveDateTime::parse_from_str(&created, TIMESTAMP_FORMAT).map_err(
            |_| ParamError::InvalidValue {
                table: "meta_parameterization".to_string(),
                field: "CreationDate".to_string(),
                value: created.clone(),
            },
        )?;
        let [slope, flow, hgr, channel, lc, lc_lut, soils, soils_db] =
            text.map(Option::unwrap_or_default);
        let [tool_version, store_version, status] = versions.map(Option::unwrap_or_default);

        Ok(ParameterizationRun {
            key: key.clone(),
            slope_type: slope,
            flow_length_method: flow,
            hydraulic_geometry: hgr,
            channel_type: channel,
            land_cover_path: lc,
            land_cover_lut: lc_lut,
            soils_path: soils,
            soils_database_path: soils_db,
            max_horizons: max_horizons.unwrap_or(0),
            max_thickness: max_thickness.unwrap_or(0.0),
            creation_date,
            tool_version,
            store_version,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{STATUS_COMPUTED, STORE_VERSION, TOOL_VERSION};
    use chrono::NaiveDate;

    fn run(key: PartitionKey) -> ParameterizationRun {
        ParameterizationRun {
            key,
            slope_type: "Complex".to_string(),
            flow_length_method: "Geometric Abstraction".to_string(),
            hydraulic_geometry: "Southeastern Arizona".to_string(),
            channel_type: "Default".to_string(),
            land_cover_path: "nlcd.tif".to_string(),
            land_cover_lut: "mrlc2001_lut.csv".to_string(),
            soils_path: "soils.shp".to_string(),
            soils_database_path: "/data/gssurgo".to_string(),
            max_horizons: 4,
            max_thickness: 1000.0,
            creation_date: NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_micro_opt(8, 15, 0, 123456)
                .unwrap(),
            tool_version: TOOL_VERSION.to_string(),
            store_version: STORE_VERSION.to_string(),
            status: STATUS_COMPUTED.to_string(),
        }
    }

    #[test]
    fn run_metadata_round_trips() {
        let mut store = ParameterStore::in_memory().unwrap();
        let key = PartitionKey::new("d", "s", "p");
        store.register_run(&run(key.clone())).unwrap();
        assert_eq!(store.load_run(&key).unwrap(), run(key.clone()));

        let mut changed = run(key.clone());
        changed.channel_type = "Earthen".to_string();
        store.register_run(&changed).unwrap();
        assert_eq!(store.load_run(&key).unwrap().channel_type, "Earthen");
    }

    #[test]
    fn unknown_run_is_an_error() {
        let store = ParameterStore::in_memory().unwrap();
        let err = store.load_run(&PartitionKey::new("d", "s", "nope")).unwrap_err();
        assert!(matches!(err, ParamError::MissingRun(_)));
    }

    #[test]
    fn workspace_lookup_directory() {
        let mut store = ParameterStore::in_memory().unwrap();
        assert!(matches!(
            store.lookup_directory(),
            Err(ParamError::MissingWorkspace)
        ));
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        store.set_lookup_directory("/lookups/v1", created).unwrap();
        store.set_lookup_directory("/lookups/v2", created).unwrap();
        assert_eq!(store.lookup_directory().unwrap(), PathBuf::from("/lookups/v2"));
    }
}
