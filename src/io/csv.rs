use crate::channel::{ChannelElement, ChannelRecord};
use crate::config::{FragmentColumns, PartitionKey, Provenance, SoilColumns};
use crate::error::{ParamError, ParamResult};
use crate::hillslope::{CoverFragment, HillslopeElement, HillslopeRecord, SoilFragment};
use crate::horizon::{RawHorizon, TextureClass, TextureGroup, is_missing};
use crate::lookup::{
    ChannelTypeOverride, ChannelTypeTable, LandCoverClass, LandCoverTable, ReferenceTexture,
    TextureTable,
};
use crate::params::{ChannelParams, CoverParams, SoilParams};
use crate::report::RunReport;
use crate::soil::{Component, SoilTables};
use csv::{Reader, ReaderBuilder, StringRecord};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const TEXTURE_LOOKUP: &str = "kin_lut.csv";
pub const CHANNEL_TYPE_LOOKUP: &str = "channel_types.csv";

fn open_reader(path: &Path) -> ParamResult<Reader<BufReader<File>>> {
    if !path.exists() {
        return Err(ParamError::MissingTable(path.to_path_buf()));
    }
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

fn table_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// Header positions for the requested column names
fn positions<const N: usize>(
    headers: &StringRecord,
    table: &str,
    names: [&str; N],
) -> ParamResult<[usize; N]> {
    let mut found = [0; N];
    for (slot, name) in found.iter_mut().zip(names) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ParamError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })?;
    }
    Ok(found)
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn parse_number(table: &str, field: &str, value: &str) -> ParamResult<Option<f64>> {
    let value = value.trim();
    if is_missing(value) {
        return Ok(None);
    }
    let parsed = value.parse::<f64>().map_err(|_| ParamError::InvalidValue {
        table: table.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })?;
    Ok(if parsed == -9999.0 { None } else { Some(parsed) })
}

fn parse_id(table: &str, field: &str, value: &str) -> ParamResult<i64> {
    let invalid = || ParamError::InvalidValue {
        table: table.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    };
    match value.trim().parse::<i64>() {
        Ok(-9999) => return Err(invalid()),
        Ok(id) => return Ok(id),
        Err(_) => {}
    }
    // shapefile exports write integer ids as 12.0
    parse_number(table, field, value)?
        .and_then(whole_number)
        .ok_or_else(invalid)
}

// Integral floats below 2^53 convert exactly.
fn whole_number(v: f64) -> Option<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    (v.fract() == 0.0 && v.abs() < EXACT).then_some(v as i64)
}

// empty, None and -9999 cells are missing
fn optional_value<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    let Some(raw) = raw else { return Ok(None) };
    let raw = raw.trim();
    if is_missing(raw) {
        return Ok(None);
    }
    let value: f64 = raw.parse().map_err(serde::de::Error::custom)?;
    Ok(if value == -9999.0 { None } else { Some(value) })
}

fn optional_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    match optional_value(d)? {
        Some(v) => whole_number(v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id {}", v))),
        None => Ok(None),
    }
}

fn deserialize_all<T: for<'de> Deserialize<'de>>(path: &Path) -> ParamResult<Vec<T>> {
    let mut rdr = open_reader(path)?;
    let rows = rdr.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    log::debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read the gSSURGO component, horizon and texture tables of `map_units`.
///
/// Only rows reachable from the requested map units are kept.
pub fn read_soil_tables(
    dir: &Path,
    columns: &SoilColumns,
    map_units: &HashSet<String>,
) -> ParamResult<SoilTables> {
    let path = dir.join("component.csv");
    let table = table_name(&path);
    let mut rdr = open_reader(&path)?;
    let [mukey, cokey, pct] = positions(
        rdr.headers()?,
        &table,
        [
            columns.map_unit_key.as_str(),
            columns.component_key.as_str(),
            columns.component_pct.as_str(),
        ],
    )?;
    let mut components = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if !map_units.contains(cell(&record, mukey)) {
            continue;
        }
        components.push(Component {
            key: cell(&record, cokey).to_string(),
            map_unit: cell(&record, mukey).to_string(),
            percentage: parse_number(&table, &columns.component_pct, cell(&record, pct))?,
        });
    }
    let component_keys: HashSet<&str> = components.iter().map(|c| c.key.as_str()).collect();

    // horizon cells stay raw; bad values are reported per horizon later
    let path = dir.join("chorizon.csv");
    let table = table_name(&path);
    let mut rdr = open_reader(&path)?;
    let idx = positions(
        rdr.headers()?,
        &table,
        [
            columns.component_key.as_str(),
            columns.horizon_key.as_str(),
            columns.top_depth.as_str(),
            columns.bottom_depth.as_str(),
            columns.ksat.as_str(),
            columns.sand.as_str(),
            columns.silt.as_str(),
            columns.clay.as_str(),
            columns.bulk_density.as_str(),
            columns.particle_density.as_str(),
            columns.sieve_no10.as_str(),
            columns.kwfact.as_str(),
        ],
    )?;
    let mut horizons = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if !component_keys.contains(cell(&record, idx[0])) {
            continue;
        }
        let get = |i: usize| cell(&record, idx[i]).to_string();
        horizons.push(RawHorizon {
            component_key: get(0),
            horizon_key: get(1),
            top_depth: get(2),
            bottom_depth: get(3),
            ksat: get(4),
            sand: get(5),
            silt: get(6),
            clay: get(7),
            bulk_density: get(8),
            particle_density: get(9),
            sieve_no10: get(10),
            kwfact: get(11),
        });
    }
    let horizon_keys: HashSet<&str> = horizons.iter().map(|h| h.horizon_key.as_str()).collect();

    let path = dir.join("chtexturegrp.csv");
    let table = table_name(&path);
    let mut rdr = open_reader(&path)?;
    let [chkey, chtgkey, label] = positions(
        rdr.headers()?,
        &table,
        [
            columns.horizon_key.as_str(),
            columns.texture_group_key.as_str(),
            columns.texture_group_label.as_str(),
        ],
    )?;
    let mut texture_groups = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if !horizon_keys.contains(cell(&record, chkey)) {
            continue;
        }
        texture_groups.push(TextureGroup {
            horizon_key: cell(&record, chkey).to_string(),
            group_key: cell(&record, chtgkey).to_string(),
            label: cell(&record, label).to_string(),
        });
    }
    let group_keys: HashSet<&str> = texture_groups.iter().map(|g| g.group_key.as_str()).collect();

    let path = dir.join("chtexture.csv");
    let table = table_name(&path);
    let mut rdr = open_reader(&path)?;
    let [chtgkey, texcl, lieutex] = positions(
        rdr.headers()?,
        &table,
        [
            columns.texture_group_key.as_str(),
            columns.texture_class.as_str(),
            columns.lieu_texture.as_str(),
        ],
    )?;
    let mut texture_classes = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if !group_keys.contains(cell(&record, chtgkey)) {
            continue;
        }
        texture_classes.push(TextureClass {
            group_key: cell(&record, chtgkey).to_string(),
            texcl: cell(&record, texcl).to_string(),
            lieutex: cell(&record, lieutex).to_string(),
        });
    }

    log::info!(
        "Read {} components, {} horizons, {} texture groups from {}",
        components.len(),
        horizons.len(),
        texture_groups.len(),
        dir.display()
    );
    Ok(SoilTables {
        components,
        horizons,
        texture_groups,
        texture_classes,
    })
}

/// Fragments without an area are left out and reported.
pub fn read_soil_fragments(
    path: &Path,
    columns: &FragmentColumns,
    report: &mut RunReport,
) -> ParamResult<Vec<SoilFragment>> {
    let table = table_name(path);
    let mut rdr = open_reader(path)?;
    let [id, mukey, area] = positions(
        rdr.headers()?,
        &table,
        [
            columns.hillslope_id.as_str(),
            columns.map_unit_key.as_str(),
            columns.area.as_str(),
        ],
    )?;
    let mut fragments = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let hillslope_id = parse_id(&table, &columns.hillslope_id, cell(&record, id))?;
        let Some(area) = parse_number(&table, &columns.area, cell(&record, area))? else {
            report.fragment_without_area(&table, hillslope_id);
            continue;
        };
        fragments.push(SoilFragment {
            hillslope_id,
            map_unit: cell(&record, mukey).to_string(),
            area,
        });
    }
    Ok(fragments)
}

pub fn read_cover_fragments(
    path: &Path,
    columns: &FragmentColumns,
    report: &mut RunReport,
) -> ParamResult<Vec<CoverFragment>> {
    let table = table_name(path);
    let mut rdr = open_reader(path)?;
    let [id, code, area] = positions(
        rdr.headers()?,
        &table,
        [
            columns.hillslope_id.as_str(),
            columns.class_code.as_str(),
            columns.area.as_str(),
        ],
    )?;
    let mut fragments = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let hillslope_id = parse_id(&table, &columns.hillslope_id, cell(&record, id))?;
        let class_code = parse_id(&table, &columns.class_code, cell(&record, code))?;
        let Some(area) = parse_number(&table, &columns.area, cell(&record, area))? else {
            report.fragment_without_area(&table, hillslope_id);
            continue;
        };
        fragments.push(CoverFragment {
            hillslope_id,
            class_code,
            area,
        });
    }
    Ok(fragments)
}

#[derive(Debug, Deserialize)]
struct TextureRow {
    #[serde(rename = "TextureName")]
    name: String,
    #[serde(rename = "KS", deserialize_with = "optional_value", default)]
    ks: Option<f64>,
    #[serde(rename = "G", deserialize_with = "optional_value", default)]
    g: Option<f64>,
    #[serde(rename = "POR", deserialize_with = "optional_value", default)]
    porosity: Option<f64>,
    #[serde(rename = "SMAX", deserialize_with = "optional_value", default)]
    smax: Option<f64>,
    #[serde(rename = "CV", deserialize_with = "optional_value", default)]
    cv: Option<f64>,
    #[serde(rename = "SAND", deserialize_with = "optional_value", default)]
    sand: Option<f64>,
    #[serde(rename = "SILT", deserialize_with = "optional_value", default)]
    silt: Option<f64>,
    #[serde(rename = "CLAY", deserialize_with = "optional_value", default)]
    clay: Option<f64>,
    #[serde(rename = "DIST", deserialize_with = "optional_value", default)]
    distribution: Option<f64>,
    #[serde(rename = "KFF", deserialize_with = "optional_value", default)]
    kff: Option<f64>,
    #[serde(rename = "BPressure", deserialize_with = "optional_value", default)]
    bpressure: Option<f64>,
}

pub fn read_texture_table(lookup_dir: &Path) -> ParamResult<TextureTable> {
    let rows: Vec<TextureRow> = deserialize_all(&lookup_dir.join(TEXTURE_LOOKUP))?;
    TextureTable::from_entries(
        rows.into_iter()
            .map(|r| {
                (
                    r.name,
                    ReferenceTexture {
                        ks: r.ks,
                        g: r.g,
                        porosity: r.porosity,
                        smax: r.smax,
                        cv: r.cv,
                        sand: r.sand,
                        silt: r.silt,
                        clay: r.clay,
                        distribution: r.distribution,
                        kff: r.kff,
                        bpressure: r.bpressure,
                    },
                )
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct LandCoverRow {
    #[serde(rename = "CLASS")]
    class: i64,
    #[serde(rename = "NAME", default)]
    name: String,
    #[serde(rename = "COVER", deserialize_with = "optional_value", default)]
    canopy: Option<f64>,
    #[serde(rename = "INT", deserialize_with = "optional_value", default)]
    interception: Option<f64>,
    #[serde(rename = "N", deserialize_with = "optional_value", default)]
    manning: Option<f64>,
    #[serde(rename = "IMPERV", deserialize_with = "optional_value", default)]
    imperviousness: Option<f64>,
}

/// The land-cover lookup table is named per run; `.csv` is appended when absent.
pub fn read_land_cover_table(lookup_dir: &Path, name: &str) -> ParamResult<LandCoverTable> {
    let file = if name.to_ascii_lowercase().ends_with(".csv") {
        name.to_string()
    } else {
        format!("{}.csv", name)
    };
    let rows: Vec<LandCoverRow> = deserialize_all(&lookup_dir.join(&file))?;
    LandCoverTable::from_entries(
        &file,
        rows.into_iter()
            .map(|r| {
                (
                    r.class,
                    LandCoverClass {
                        name: r.name,
                        canopy: r.canopy,
                        interception: r.interception,
                        manning: r.manning,
                        imperviousness: r.imperviousness,
                    },
                )
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct ChannelTypeRow {
    #[serde(rename = "Channel_Type")]
    name: String,
    #[serde(rename = "Ksat", deserialize_with = "optional_value", default)]
    ksat: Option<f64>,
    #[serde(rename = "Manning", deserialize_with = "optional_value", default)]
    manning: Option<f64>,
    #[serde(rename = "Pave", deserialize_with = "optional_value", default)]
    pave: Option<f64>,
}

pub fn read_channel_type_table(lookup_dir: &Path) -> ParamResult<ChannelTypeTable> {
    let rows: Vec<ChannelTypeRow> = deserialize_all(&lookup_dir.join(CHANNEL_TYPE_LOOKUP))?;
    ChannelTypeTable::from_entries(
        rows.into_iter()
            .map(|r| {
                (
                    r.name,
                    ChannelTypeOverride {
                        ksat: r.ksat,
                        manning: r.manning,
                        pave: r.pave,
                    },
                )
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct HillslopeElementRow {
    #[serde(rename = "HillslopeID")]
    hillslope_id: i64,
    #[serde(rename = "ChannelID", deserialize_with = "optional_id", default)]
    channel_id: Option<i64>,
    #[serde(rename = "Area", deserialize_with = "optional_value", default)]
    area: Option<f64>,
    #[serde(rename = "FlowLength", deserialize_with = "optional_value", default)]
    flow_length: Option<f64>,
    #[serde(rename = "Width", deserialize_with = "optional_value", default)]
    width: Option<f64>,
    #[serde(rename = "MeanSlope", deserialize_with = "optional_value", default)]
    mean_slope: Option<f64>,
    #[serde(rename = "CentroidX", deserialize_with = "optional_value", default)]
    centroid_x: Option<f64>,
    #[serde(rename = "CentroidY", deserialize_with = "optional_value", default)]
    centroid_y: Option<f64>,
}

pub fn read_hillslope_elements(path: &Path, key: &PartitionKey) -> ParamResult<Vec<HillslopeRecord>> {
    let rows: Vec<HillslopeElementRow> = deserialize_all(path)?;
    Ok(rows
        .into_iter()
        .map(|r| HillslopeRecord {
            key: key.clone(),
            hillslope_id: r.hillslope_id,
            element: HillslopeElement {
                channel_id: r.channel_id,
                area: r.area,
                flow_length: r.flow_length,
                width: r.width,
                mean_slope: r.mean_slope,
                centroid_x: r.centroid_x,
                centroid_y: r.centroid_y,
            },
            soil: SoilParams::default(),
            cover: CoverParams::default(),
            provenance: Provenance::unset(),
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct ChannelElementRow {
    #[serde(rename = "ChannelID")]
    channel_id: i64,
    #[serde(rename = "DownstreamID", deserialize_with = "optional_id", default)]
    downstream_id: Option<i64>,
    #[serde(rename = "Length", deserialize_with = "optional_value", default)]
    length: Option<f64>,
    #[serde(rename = "MeanSlope", deserialize_with = "optional_value", default)]
    mean_slope: Option<f64>,
    #[serde(rename = "ContributingArea", deserialize_with = "optional_value", default)]
    contributing_area: Option<f64>,
    #[serde(rename = "UpstreamArea", deserialize_with = "optional_value", default)]
    upstream_area: Option<f64>,
    #[serde(rename = "WidthUpstream", deserialize_with = "optional_value", default)]
    width_upstream: Option<f64>,
    #[serde(rename = "WidthDownstream", deserialize_with = "optional_value", default)]
    width_downstream: Option<f64>,
    #[serde(rename = "DepthUpstream", deserialize_with = "optional_value", default)]
    depth_upstream: Option<f64>,
    #[serde(rename = "DepthDownstream", deserialize_with = "optional_value", default)]
    depth_downstream: Option<f64>,
    #[serde(rename = "SideSlope1", deserialize_with = "optional_value", default)]
    side_slope1: Option<f64>,
    #[serde(rename = "SideSlope2", deserialize_with = "optional_value", default)]
    side_slope2: Option<f64>,
    #[serde(rename = "CentroidX", deserialize_with = "optional_value", default)]
    centroid_x: Option<f64>,
    #[serde(rename = "CentroidY", deserialize_with = "optional_value", default)]
    centroid_y: Option<f64>,
}

pub fn read_channel_elements(path: &Path, key: &PartitionKey) -> ParamResult<Vec<ChannelRecord>> {
    let rows: Vec<ChannelElementRow> = deserialize_all(path)?;
    Ok(rows
        .into_iter()
        .map(|r| ChannelRecord {
            key: key.clone(),
            channel_id: r.channel_id,
            element: ChannelElement {
                downstream_id: r.downstream_id,
                length: r.length,
                mean_slope: r.mean_slope,
                contributing_area: r.contributing_area,
                upstream_area: r.upstream_area,
                width_upstream: r.width_upstream,
                width_downstream: r.width_downstream,
                depth_upstream: r.depth_upstream,
                depth_downstream: r.depth_downstream,
                side_slope1: r.side_slope1,
                side_slope2: r.side_slope2,
                centroid_x: r.centroid_x,
                centroid_y: r.centroid_y,
            },
            params: ChannelParams::default(),
            woolhiser: None,
            provenance: Provenance::unset(),
        })
        .collect())
}
