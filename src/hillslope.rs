//! Area-weighted soil and land-cover parameters per hillslope.

use crate::config::{PartitionKey, Provenance};
use crate::lookup::LandCoverTable;
use crate::params::{CoverParams, SoilParams};
use crate::report::RunReport;
use crate::soil::MapUnitAggregate;
use crate::weights::weighted_mean;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct SoilFragment {
    pub hillslope_id: i64,
    pub map_unit: String,
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverFragment {
    pub hillslope_id: i64,
    pub class_code: i64,
    pub area: f64,
}

/// Hillslope attributes written by discretization. Carried through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HillslopeElement {
    pub channel_id: Option<i64>,
    pub area: Option<f64>,
    pub flow_length: Option<f64>,
    pub width: Option<f64>,
    pub mean_slope: Option<f64>,
    pub centroid_x: Option<f64>,
    pub centroid_y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HillslopeRecord {
    pub key: PartitionKey,
    pub hillslope_id: i64,
    pub element: HillslopeElement,
    pub soil: SoilParams,
    pub cover: CoverParams,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HillslopeSoilCover {
    pub hillslope_id: i64,
    pub soil: SoilParams,
    pub cover: CoverParams,
}

/// Weight map-unit soil parameters by fragment area for each hillslope.
///
/// Fragments whose map unit has no aggregate are reported and ignored; a
/// hillslope with no matched fragment gets undefined parameters. When a
/// hillslope has both paved and unpaved fragments the paved ones are dropped.
pub fn weight_soils(
    fragments: &[SoilFragment],
    map_units: &[MapUnitAggregate],
    report: &mut RunReport,
) -> BTreeMap<i64, SoilParams> {
    let by_key: HashMap<&str, &SoilParams> = map_units
        .iter()
        .map(|m| (m.map_unit.as_str(), &m.soil))
        .collect();

    let mut hillslopes: BTreeMap<i64, Vec<(&SoilParams, f64)>> = BTreeMap::new();
    for fragment in fragments {
        let matched = hillslopes.entry(fragment.hillslope_id).or_default();
        match by_key.get(fragment.map_unit.as_str()) {
            Some(soil) => matched.push((*soil, fragment.area)),
            None => {
                if report.unmatched_map_units.insert(fragment.map_unit.clone()) {
                    log::warn!(
                        "Map unit {} intersects the watershed but has no soil parameters",
                        fragment.map_unit
                    );
                }
            }
        }
    }

    hillslopes
        .into_iter()
        .map(|(id, mut matched)| {
            let paved = matched.iter().any(|(s, _)| s.is_paved());
            let unpaved = matched.iter().any(|(s, _)| !s.is_paved());
            if paved && unpaved {
                matched.retain(|(s, _)| !s.is_paved());
            }
            let rows: Vec<([Option<f64>; 14], f64)> =
                matched.iter().map(|(s, area)| (s.to_array(), *area)).collect();
            let mut soil = SoilParams::from_array(weighted_mean(&rows));
            soil.renormalize_texture();
            (id, soil)
        })
        .collect()
}

pub fn weight_land_cover(
    fragments: &[CoverFragment],
    lut: &LandCoverTable,
    report: &mut RunReport,
) -> BTreeMap<i64, CoverParams> {
    let mut hillslopes: BTreeMap<i64, Vec<([Option<f64>; 4], f64)>> = BTreeMap::new();
    for fragment in fragments {
        let matched = hillslopes.entry(fragment.hillslope_id).or_default();
        match lut.resolve(fragment.class_code) {
            Some(class) => matched.push((
                [
                    class.canopy,
                    class.interception,
                    class.manning,
                    class.imperviousness,
                ],
                fragment.area,
            )),
            None => {
                if report.unmatched_land_cover.insert(fragment.class_code) {
                    log::warn!(
                        "Land cover class {} is not in the land cover lookup table",
                        fragment.class_code
                    );
                }
            }
        }
    }

    hillslopes
        .into_iter()
        .map(|(id, rows)| (id, CoverParams::from_array(weighted_mean(&rows))))
        .collect()
}

// left join on soil
pub fn merge_soil_cover(
    soil: BTreeMap<i64, SoilParams>,
    cover: &BTreeMap<i64, CoverParams>,
) -> Vec<HillslopeSoilCover> {
    soil.into_iter()
        .map(|(hillslope_id, soil)| HillslopeSoilCover {
            hillslope_id,
            soil,
            cover: cover.get(&hillslope_id).copied().unwrap_or_default(),
        })
        .collect()
}

/// Replace the parameter columns of a partition's hillslope rows.
///
/// Element columns of existing rows are kept. Existing rows without a
/// computed value get undefined parameters; computed hillslopes with no
/// element row are appended and reported.
pub fn apply_to_partition(
    key: &PartitionKey,
    existing: Vec<HillslopeRecord>,
    computed: &[HillslopeSoilCover],
    provenance: &Provenance,
    report: &mut RunReport,
) -> Vec<HillslopeRecord> {
    let mut by_id: BTreeMap<i64, &HillslopeSoilCover> =
        computed.iter().map(|c| (c.hillslope_id, c)).collect();

    let mut records: Vec<HillslopeRecord> = existing
        .into_iter()
        .map(|record| {
            let params = by_id.remove(&record.hillslope_id);
            HillslopeRecord {
                key: key.clone(),
                soil: params.map(|p| p.soil).unwrap_or_default(),
                cover: params.map(|p| p.cover).unwrap_or_default(),
                provenance: provenance.clone(),
                ..record
            }
        })
        .collect();

    for (hillslope_id, params) in by_id {
        log::warn!("Hillslope {} has no element row in {}", hillslope_id, key);
        report.hillslopes_without_element.push(hillslope_id);
        records.push(HillslopeRecord {
            key: key.clone(),
            hillslope_id,
            element: HillslopeElement::default(),
            soil: params.soil,
            cover: params.cover,
            provenance: provenance.clone(),
        });
    }
    records
}

// Rows with no previous counterpart are left unchanged.
pub fn copy_parameters(current: &mut [HillslopeRecord], previous: &[HillslopeRecord]) -> usize {
    let by_id: HashMap<i64, &HillslopeRecord> =
        previous.iter().map(|h| (h.hillslope_id, h)).collect();
    let mut copied = 0;
    for record in current.iter_mut() {
        if let Some(prev) = by_id.get(&record.hillslope_id) {
            record.soil = prev.soil;
            record.cover = prev.cover;
            copied += 1;
        }
    }
    copied
}
