//! Horizon → component → map-unit aggregation of soil parameters.

use crate::horizon::{self, HorizonParams, RawHorizon, ResolvedTexture, TextureClass, TextureGroup};
use crate::lookup::{TextureTable, apply_pavement};
use crate::params::SoilParams;
use crate::report::RunReport;
use crate::weights::weighted_mean;
use indicatif::ProgressBar;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub key: String,
    pub map_unit: String,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct SoilTables {
    pub components: Vec<Component>,
    pub horizons: Vec<RawHorizon>,
    pub texture_groups: Vec<TextureGroup>,
    pub texture_classes: Vec<TextureClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonRow {
    pub map_unit: String,
    pub component: String,
    pub component_pct: Option<f64>,
    pub horizon: HorizonParams,
    pub texture: ResolvedTexture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonTextureRow {
    pub map_unit: String,
    pub component: String,
    pub horizon: String,
    pub group_key: String,
    pub texture: String,
}

#[derive(Debug, Default)]
pub struct HorizonBuild {
    pub rows: Vec<HorizonRow>,
    pub textures: Vec<HorizonTextureRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonAggregate {
    pub map_unit: String,
    pub component: String,
    pub horizon: String,
    pub total_thickness: f64,
    pub component_pct: f64,
    pub soil: SoilParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapUnitAggregate {
    pub map_unit: String,
    pub total_component_pct: f64,
    pub soil: SoilParams,
}

#[derive(Debug, Default)]
pub struct SoilAggregation {
    pub by_horizon: Vec<HorizonAggregate>,
    pub by_map_unit: Vec<MapUnitAggregate>,
    pub excluded_horizons: usize,
    pub excluded_components: usize,
}

fn sort_depth(raw: &RawHorizon) -> f64 {
    raw.top_depth.trim().parse::<f64>().unwrap_or(f64::INFINITY)
}

/// Compute and texture-resolve every horizon of every component in `map_units`.
///
/// Horizons of a component are taken in top-depth order, those starting
/// at or below `max_thickness` are ignored, and numbering stops at
/// `max_horizons`. Horizons that fail to parse or whose texture is not in the
/// reference table are reported and left out.
pub fn build_horizon_rows(
    map_units: &[String],
    tables: &SoilTables,
    reference: &TextureTable,
    max_horizons: Option<u32>,
    max_thickness: Option<f64>,
    report: &mut RunReport,
    pb: &ProgressBar,
) -> HorizonBuild {
    let mut components: HashMap<&str, Vec<&Component>> = HashMap::new();
    for c in &tables.components {
        components.entry(c.map_unit.as_str()).or_default().push(c);
    }
    let mut horizons: HashMap<&str, Vec<&RawHorizon>> = HashMap::new();
    for h in &tables.horizons {
        horizons.entry(h.component_key.as_str()).or_default().push(h);
    }
    let mut groups: HashMap<&str, Vec<&TextureGroup>> = HashMap::new();
    for g in &tables.texture_groups {
        groups.entry(g.horizon_key.as_str()).or_default().push(g);
    }
    let mut classes: HashMap<String, Vec<TextureClass>> = HashMap::new();
    for t in &tables.texture_classes {
        classes.entry(t.group_key.clone()).or_default().push(t.clone());
    }

    let mut owners: HashMap<&str, &str> = HashMap::new();
    let mut build = HorizonBuild::default();

    pb.set_length(map_units.len() as u64);
    for map_unit in map_units {
        pb.inc(1);
        for component in components.get(map_unit.as_str()).into_iter().flatten() {
            let mut candidates: Vec<&RawHorizon> = horizons
                .get(component.key.as_str())
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|h| {
                    let top = sort_depth(h);
                    // unparseable depths fall through so the horizon is reported
                    top.is_infinite() || max_thickness.is_none_or(|max| top < max)
                })
                .collect();
            candidates.sort_by(|a, b| sort_depth(a).total_cmp(&sort_depth(b)));

            for (sequence, raw) in (1u32..).zip(candidates.iter()) {
                let params = match horizon::calculate(raw, sequence, max_horizons) {
                    Ok(Some(p)) => p,
                    Ok(None) => break,
                    Err(e) => {
                        report.skip_horizon(e.to_string());
                        continue;
                    }
                };

                if let Some(owner) = owners.insert(raw.horizon_key.as_str(), component.key.as_str()) {
                    if owner != component.key {
                        log::warn!(
                            "Horizon id {} appears under components {} and {}",
                            raw.horizon_key,
                            owner,
                            component.key
                        );
                        report.horizon_id_collisions.insert(raw.horizon_key.clone());
                    }
                }

                let horizon_groups = groups
                    .get(raw.horizon_key.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                let (seen, resolved) = horizon::resolve_textures(horizon_groups, &classes);
                build
                    .textures
                    .extend(seen.into_iter().map(|(group_key, texture)| HorizonTextureRow {
                        map_unit: map_unit.clone(),
                        component: component.key.clone(),
                        horizon: raw.horizon_key.clone(),
                        group_key,
                        texture,
                    }));

                let Some(texture) = resolved else {
                    log::warn!("Horizon {} has no texture", raw.horizon_key);
                    report.horizons_without_texture.push(raw.horizon_key.clone());
                    continue;
                };
                let Some(entry) = reference.resolve(&texture.texture) else {
                    report.texture_not_found(&raw.horizon_key, &texture.texture);
                    continue;
                };

                let mut params = params;
                entry.apply(&mut params.soil, params.kwfact);
                apply_pavement(&mut params.soil, &texture.group_label);

                build.rows.push(HorizonRow {
                    map_unit: map_unit.clone(),
                    component: component.key.clone(),
                    component_pct: component.percentage,
                    horizon: params,
                    texture,
                });
            }
        }
    }
    pb.finish_and_clear();

    log::info!(
        "Resolved {} horizons across {} map units",
        build.rows.len(),
        map_units.len()
    );
    build
}

// Paved rows carry filler texture, so sand, silt and clay come from the
// unpaved rows whenever there are any. Pave stays 0 or 1.
fn weight_soil(rows: &[(SoilParams, f64)]) -> SoilParams {
    let all: Vec<([Option<f64>; 14], f64)> =
        rows.iter().map(|(s, w)| (s.to_array(), *w)).collect();
    let mut soil = SoilParams::from_array(weighted_mean(&all));

    let unpaved: Vec<([Option<f64>; 14], f64)> = rows
        .iter()
        .filter(|(s, _)| !s.is_paved())
        .map(|(s, w)| (s.to_array(), *w))
        .collect();
    if !unpaved.is_empty() && unpaved.len() < rows.len() {
        let texture = SoilParams::from_array(weighted_mean(&unpaved));
        soil.sand = texture.sand;
        soil.silt = texture.silt;
        soil.clay = texture.clay;
        soil.pave = Some(0.0);
    }
    soil.renormalize_texture();
    soil
}

/// Thickness-weight horizons, then percentage-weight the result per map unit.
///
/// Rows with non-positive thickness or non-positive (or missing) component
/// percentage are dropped first. The first pass groups by map unit, component
/// and horizon id; the second groups by map unit. A group is paved only when
/// all of its rows are; otherwise paved rows are left out of the texture
/// fractions. Texture fractions are renormalized after each pass.
pub fn aggregate(rows: &[HorizonRow]) -> SoilAggregation {
    let excluded_horizons = rows.iter().filter(|r| r.horizon.thickness <= 0.0).count();
    if excluded_horizons > 0 {
        log::warn!(
            "{} horizons have non-positive thickness and are ignored",
            excluded_horizons
        );
    }
    let rows: Vec<&HorizonRow> = rows.iter().filter(|r| r.horizon.thickness > 0.0).collect();

    let excluded: BTreeSet<(&str, &str)> = rows
        .iter()
        .filter(|r| !r.component_pct.is_some_and(|p| p > 0.0))
        .map(|r| (r.map_unit.as_str(), r.component.as_str()))
        .collect();
    let excluded_components = excluded.len();
    if excluded_components > 0 {
        log::warn!(
            "{} components have non-positive percentage and are ignored",
            excluded_components
        );
    }
    let rows: Vec<&HorizonRow> = rows
        .into_iter()
        .filter(|r| r.component_pct.is_some_and(|p| p > 0.0))
        .collect();

    let mut horizon_groups: BTreeMap<(&str, &str, &str), (f64, Vec<(SoilParams, f64)>)> =
        BTreeMap::new();
    for r in &rows {
        let key = (
            r.map_unit.as_str(),
            r.component.as_str(),
            r.horizon.horizon_id.as_str(),
        );
        let pct = r.component_pct.unwrap_or_default();
        horizon_groups
            .entry(key)
            .or_insert_with(|| (pct, Vec::new()))
            .1
            .push((r.horizon.soil, r.horizon.thickness));
    }

    let by_horizon: Vec<HorizonAggregate> = horizon_groups
        .into_iter()
        .map(|((map_unit, component, horizon), (pct, values))| HorizonAggregate {
            map_unit: map_unit.to_string(),
            component: component.to_string(),
            horizon: horizon.to_string(),
            total_thickness: values.iter().map(|(_, w)| w).sum(),
            component_pct: pct,
            soil: weight_soil(&values),
        })
        .collect();

    let mut map_unit_groups: BTreeMap<&str, Vec<(SoilParams, f64)>> = BTreeMap::new();
    for h in &by_horizon {
        map_unit_groups
            .entry(h.map_unit.as_str())
            .or_default()
            .push((h.soil, h.component_pct));
    }

    let by_map_unit = map_unit_groups
        .into_iter()
        .map(|(map_unit, values)| MapUnitAggregate {
            map_unit: map_unit.to_string(),
            total_component_pct: values.iter().map(|(_, w)| w).sum(),
            soil: weight_soil(&values),
        })
        .collect();

    SoilAggregation {
        by_horizon,
        by_map_unit,
        excluded_horizons,
        excluded_components,
    }
}
