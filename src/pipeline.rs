//! End-to-end runs against the parameter store.

use crate::channel::{self, ChannelRecord};
use crate::config::{FragmentColumns, PartitionKey, SoilColumns};
use crate::error::ParamResult;
use crate::hillslope::{self, HillslopeRecord};
use crate::io::csv as input;
use crate::report::RunReport;
use crate::soil;
use crate::store::tables::Keyed;
use crate::store::{ParameterStore, replace_partition_in};
use indicatif::ProgressBar;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Also write the horizon and component soil tables for inspection.
    pub save_intermediate: bool,
}

pub fn import_elements(
    store: &mut ParameterStore,
    key: &PartitionKey,
    hillslopes: Option<&Path>,
    channels: Option<&Path>,
) -> ParamResult<(usize, usize)> {
    let hillslope_rows = hillslopes
        .map(|p| input::read_hillslope_elements(p, key))
        .transpose()?;
    let channel_rows = channels
        .map(|p| input::read_channel_elements(p, key))
        .transpose()?;

    store.write(|tx| {
        if let Some(rows) = &hillslope_rows {
            replace_partition_in(tx, key, rows)?;
        }
        if let Some(rows) = &channel_rows {
            replace_partition_in(tx, key, rows)?;
        }
        Ok(())
    })?;

    Ok((
        hillslope_rows.map_or(0, |r| r.len()),
        channel_rows.map_or(0, |r| r.len()),
    ))
}

/// Parameterize every hillslope and channel of a registered partition.
///
/// Nothing is written unless every stage succeeds; both parameter tables (and
/// the intermediate soil tables when requested) are replaced in one
/// transaction.
pub fn run_parameterization(
    store: &mut ParameterStore,
    key: &PartitionKey,
    options: RunOptions,
    pb: &ProgressBar,
) -> ParamResult<RunReport> {
    let run = store.load_run(key)?;
    let lookup_dir = store.lookup_directory()?;
    let provenance = run.provenance();
    let mut report = RunReport::new();
    let fragment_columns = FragmentColumns::new();

    log::info!("Parameterizing {}", key);

    // soils
    let soil_fragments = input::read_soil_fragments(
        Path::new(&run.soils_path),
        &fragment_columns,
        &mut report,
    )?;
    let map_units: BTreeSet<String> = soil_fragments.iter().map(|f| f.map_unit.clone()).collect();
    let wanted: HashSet<String> = map_units.iter().cloned().collect();
    let tables = input::read_soil_tables(
        Path::new(&run.soils_database_path),
        &SoilColumns::new(),
        &wanted,
    )?;
    let reference = input::read_texture_table(&lookup_dir)?;
    log::debug!("Reference texture table has {} entries", reference.len());

    let map_units: Vec<String> = map_units.into_iter().collect();
    let build = soil::build_horizon_rows(
        &map_units,
        &tables,
        &reference,
        run.horizon_limit(),
        run.thickness_limit(),
        &mut report,
        pb,
    );
    let aggregation = soil::aggregate(&build.rows);
    report.excluded_horizons = aggregation.excluded_horizons;
    report.excluded_components = aggregation.excluded_components;

    // hillslopes
    let soil_by_hillslope =
        hillslope::weight_soils(&soil_fragments, &aggregation.by_map_unit, &mut report);
    let cover_fragments = input::read_cover_fragments(
        Path::new(&run.land_cover_path),
        &fragment_columns,
        &mut report,
    )?;
    let land_cover = input::read_land_cover_table(&lookup_dir, &run.land_cover_lut)?;
    let cover_by_hillslope =
        hillslope::weight_land_cover(&cover_fragments, &land_cover, &mut report);
    let computed = hillslope::merge_soil_cover(soil_by_hillslope, &cover_by_hillslope);

    let existing: Vec<HillslopeRecord> = store.load_partition(key)?;
    let hillslopes =
        hillslope::apply_to_partition(key, existing, &computed, &provenance, &mut report);

    // channels take their weights from the new hillslope rows
    let existing: Vec<ChannelRecord> = store.load_partition(key)?;
    if existing.is_empty() {
        log::warn!("No channel elements in {}; only hillslopes are parameterized", key);
    }
    let channel_ids: Vec<i64> = existing.iter().map(|c| c.channel_id).collect();
    let mut derived = channel::derive_from_hillslopes(&channel_ids, &hillslopes, &mut report);
    let channel_types = input::read_channel_type_table(&lookup_dir)?;
    channel::apply_channel_type(&mut derived, &channel_types, &run.channel_type, &mut report);
    let channels = channel::apply_to_partition(key, existing, &derived, &provenance);

    store.write(|tx| {
        replace_partition_in(tx, key, &hillslopes)?;
        replace_partition_in(tx, key, &channels)?;
        if options.save_intermediate {
            replace_partition_in(tx, key, &Keyed::all(key, build.textures.clone()))?;
            replace_partition_in(tx, key, &Keyed::all(key, build.rows.clone()))?;
            replace_partition_in(tx, key, &Keyed::all(key, aggregation.by_horizon.clone()))?;
            replace_partition_in(tx, key, &Keyed::all(key, aggregation.by_map_unit.clone()))?;
        }
        Ok(())
    })?;

    log::info!(
        "Wrote {} hillslopes and {} channels to {}",
        hillslopes.len(),
        channels.len(),
        key
    );
    Ok(report)
}

pub fn copy_previous(
    store: &mut ParameterStore,
    key: &PartitionKey,
    previous: &str,
) -> ParamResult<(usize, usize)> {
    let source = key.with_parameterization(previous);

    let mut hillslopes: Vec<HillslopeRecord> = store.load_partition(key)?;
    let mut channels: Vec<ChannelRecord> = store.load_partition(key)?;
    let old_hillslopes: Vec<HillslopeRecord> = store.load_partition(&source)?;
    let old_channels: Vec<ChannelRecord> = store.load_partition(&source)?;
    if old_hillslopes.is_empty() && old_channels.is_empty() {
        log::warn!("Parameterization {} has no rows to copy", source);
    }

    let copied_hillslopes = hillslope::copy_parameters(&mut hillslopes, &old_hillslopes);
    let copied_channels = channel::copy_parameters(&mut channels, &old_channels);

    store.write(|tx| {
        replace_partition_in(tx, key, &hillslopes)?;
        replace_partition_in(tx, key, &channels)?;
        Ok(())
    })?;

    log::info!(
        "Copied {} hillslopes and {} channels from {} to {}",
        copied_hillslopes,
        copied_channels,
        source,
        key
    );
    Ok((copied_hillslopes, copied_channels))
}
