//! Per-horizon physical quantities derived from raw soil-survey attributes.

use crate::error::HorizonError;
use crate::params::SoilParams;
use std::collections::HashMap;

/// Erodibility used when the survey leaves `kwfact` empty.
pub const DEFAULT_KWFACT: f64 = 0.2;

/// µm/s to mm/hr
const KSAT_CONVERSION: f64 = 3.6;
const MM_PER_INCH: f64 = 25.4;

// Raw chorizon row as text; parsed per horizon so one bad cell only skips that horizon
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHorizon {
    pub component_key: String,
    pub horizon_key: String,
    pub top_depth: String,
    pub bottom_depth: String,
    pub ksat: String,
    pub sand: String,
    pub silt: String,
    pub clay: String,
    pub bulk_density: String,
    pub particle_density: String,
    pub sieve_no10: String,
    pub kwfact: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonParams {
    pub horizon_id: String,
    pub horizon_number: u32,
    pub top_depth: f64,
    pub bottom_depth: f64,
    pub thickness: f64,
    pub kwfact: f64,
    pub soil: SoilParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureGroup {
    pub horizon_key: String,
    pub group_key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureClass {
    pub group_key: String,
    pub texcl: String,
    pub lieutex: String,
}

impl TextureClass {
    /// `texcl`, or the "in lieu of texture" term when no class is recorded.
    pub fn name(&self) -> &str {
        let texcl = self.texcl.trim();
        if is_missing(texcl) {
            self.lieutex.trim()
        } else {
            texcl
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTexture {
    pub group_key: String,
    pub group_label: String,
    pub texture: String,
}

pub fn is_missing(value: &str) -> bool {
    value.is_empty()
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("null")
        || value.eq_ignore_ascii_case("nan")
}

fn parse_optional(
    horizon: &str,
    field: &'static str,
    value: &str,
) -> Result<Option<f64>, HorizonError> {
    let value = value.trim();
    if is_missing(value) {
        return Ok(None);
    }
    let parsed = value
        .parse::<f64>()
        .map_err(|_| HorizonError::Malformed {
            horizon: horizon.to_string(),
            field,
            value: value.to_string(),
        })?;
    Ok(if parsed == -9999.0 { None } else { Some(parsed) })
}

fn parse_required(horizon: &str, field: &'static str, value: &str) -> Result<f64, HorizonError> {
    parse_optional(horizon, field, value)?.ok_or_else(|| HorizonError::MissingField {
        horizon: horizon.to_string(),
        field,
    })
}

pub fn conductivity_mm_per_hr(ksat_um_per_s: f64) -> f64 {
    ksat_um_per_s * KSAT_CONVERSION
}

/// Wetting-front capillary drive G (mm) from Ksat (mm/hr), Goodrich (1990).
/// The relation is fitted in inches, hence the conversions on both sides.
pub fn wetting_front(ksat_mm_per_hr: f64) -> Option<f64> {
    if ksat_mm_per_hr <= 0.0 {
        return None;
    }
    Some(MM_PER_INCH * (4.83 * (MM_PER_INCH / ksat_mm_per_hr).powf(0.326)))
}

pub fn porosity(bulk_density: Option<f64>, particle_density: Option<f64>) -> Option<f64> {
    match (bulk_density, particle_density) {
        (Some(bulk), Some(particle)) => Some(1.0 - bulk / particle),
        _ => None,
    }
}

pub fn splash(kwfact: f64) -> f64 {
    422.0 * kwfact * 0.8
}

/// A missing clay fraction takes the high-clay branch.
pub fn cohesion(kwfact: f64, clay: Option<f64>) -> f64 {
    match clay {
        Some(c) if c <= 0.22 => 5.6 * kwfact / (188.0 - 468.0 * c + 907.0 * c * c) * 0.5,
        _ => 5.6 * kwfact / 130.0 * 0.5,
    }
}

/// Derive the survey-based parameters of one horizon.
///
/// Returns `Ok(None)` once `sequence` passes the horizon cutoff. Texture
/// dependent fields (pavement and the reference-only parameters) are left
/// unset; they are filled when the horizon's texture is resolved.
pub fn calculate(
    raw: &RawHorizon,
    sequence: u32,
    max_horizons: Option<u32>,
) -> Result<Option<HorizonParams>, HorizonError> {
    if let Some(max) = max_horizons {
        if sequence > max {
            return Ok(None);
        }
    }

    let id = raw.horizon_key.as_str();
    let top = parse_required(id, "top depth", &raw.top_depth)?;
    let bottom = parse_required(id, "bottom depth", &raw.bottom_depth)?;
    let ksat = parse_optional(id, "ksat", &raw.ksat)?.map(conductivity_mm_per_hr);
    let sand = parse_optional(id, "sand", &raw.sand)?.map(|v| v / 100.0);
    let silt = parse_optional(id, "silt", &raw.silt)?.map(|v| v / 100.0);
    let clay = parse_optional(id, "clay", &raw.clay)?.map(|v| v / 100.0);
    let bulk = parse_optional(id, "bulk density", &raw.bulk_density)?;
    let particle = parse_optional(id, "particle density", &raw.particle_density)?;
    let sieve = parse_optional(id, "sieve no. 10", &raw.sieve_no10)?;
    let kwfact = parse_optional(id, "kwfact", &raw.kwfact)?.unwrap_or(DEFAULT_KWFACT);

    let soil = SoilParams {
        ksat,
        g: ksat.and_then(wetting_front),
        porosity: porosity(bulk, particle),
        rock: sieve.map(|s| 1.0 - s / 100.0),
        sand,
        silt,
        clay,
        splash: Some(splash(kwfact)),
        cohesion: Some(cohesion(kwfact, clay)),
        ..Default::default()
    };

    Ok(Some(HorizonParams {
        horizon_id: raw.horizon_key.clone(),
        horizon_number: sequence,
        top_depth: top,
        bottom_depth: bottom,
        thickness: bottom - top,
        kwfact,
        soil,
    }))
}

/// Walk a horizon's texture groups in table order.
///
/// Every (group, texture) pair encountered is returned for inspection. The
/// horizon resolves against the last texture seen, paired with the label of
/// the last group; when a horizon has several texture groups the earlier
/// ones are ignored.
pub fn resolve_textures(
    groups: &[&TextureGroup],
    classes: &HashMap<String, Vec<TextureClass>>,
) -> (Vec<(String, String)>, Option<ResolvedTexture>) {
    let mut seen = Vec::new();
    let mut last_texture: Option<String> = None;
    let mut last_group: Option<&TextureGroup> = None;

    for group in groups {
        last_group = Some(*group);
        for class in classes.get(&group.group_key).into_iter().flatten() {
            let name = class.name().to_string();
            seen.push((group.group_key.clone(), name.clone()));
            last_texture = Some(name);
        }
    }

    let resolved = match (last_group, last_texture) {
        (Some(group), Some(texture)) => Some(ResolvedTexture {
            group_key: group.group_key.clone(),
            group_label: group.label.trim().to_string(),
            texture,
        }),
        _ => None,
    };
    (seen, resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn raw() -> RawHorizon {
        RawHorizon {
            component_key: "c1".to_string(),
            horizon_key: "h1".to_string(),
            top_depth: "0".to_string(),
            bottom_depth: "200".to_string(),
            ksat: "10".to_string(),
            sand: "40".to_string(),
            silt: "40".to_string(),
            clay: "20".to_string(),
            bulk_density: "1.325".to_string(),
            particle_density: "2.65".to_string(),
            sieve_no10: "85".to_string(),
            kwfact: ".28".to_string(),
        }
    }

    #[test]
    fn reference_horizon() {
        let h = calculate(&raw(), 1, None).unwrap().unwrap();
        assert_abs_diff_eq!(h.thickness, 200.0);
        assert_abs_diff_eq!(h.soil.ksat.unwrap(), 36.0, epsilon = 1e-12);
        assert_relative_eq!(h.soil.g.unwrap(), 109.496950, max_relative = 1e-6);
        assert_abs_diff_eq!(h.soil.porosity.unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(h.soil.rock.unwrap(), 0.15, epsilon = 1e-12);
        assert_abs_diff_eq!(h.soil.clay.unwrap(), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(h.soil.splash.unwrap(), 422.0 * 0.28 * 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(
            h.soil.cohesion.unwrap(),
            5.6 * 0.28 / (188.0 - 468.0 * 0.2 + 907.0 * 0.04) * 0.5,
            epsilon = 1e-12
        );
        assert_eq!(h.soil.pave, None);
        assert_eq!(h.soil.smax, None);
    }

    #[test]
    fn cohesion_branches_on_clay() {
        assert_abs_diff_eq!(cohesion(0.2, Some(0.3)), 5.6 * 0.2 / 130.0 * 0.5);
        assert_abs_diff_eq!(
            cohesion(0.2, Some(0.22)),
            5.6 * 0.2 / (188.0 - 468.0 * 0.22 + 907.0 * 0.22 * 0.22) * 0.5
        );
        assert_abs_diff_eq!(cohesion(0.2, None), 5.6 * 0.2 / 130.0 * 0.5);
    }

    #[test]
    fn none_erodibility_uses_default() {
        let h = calculate(
            &RawHorizon {
                kwfact: "None".to_string(),
                ..raw()
            },
            1,
            None,
        )
        .unwrap()
        .unwrap();
        assert_eq!(h.kwfact, DEFAULT_KWFACT);
        assert_abs_diff_eq!(h.soil.splash.unwrap(), 67.52, epsilon = 1e-9);
    }

    #[test]
    fn missing_density_leaves_porosity_undefined() {
        let h = calculate(
            &RawHorizon {
                particle_density: String::new(),
                ..raw()
            },
            1,
            None,
        )
        .unwrap()
        .unwrap();
        assert_eq!(h.soil.porosity, None);
        assert_eq!(porosity(Some(1.2), None), None);
    }

    #[test]
    fn horizons_past_cutoff_are_dropped() {
        assert!(calculate(&raw(), 3, Some(2)).unwrap().is_none());
        assert!(calculate(&raw(), 2, Some(2)).unwrap().is_some());
        assert!(calculate(&raw(), 40, None).unwrap().is_some());
    }

    #[test]
    fn malformed_numbers_fail_the_horizon() {
        let err = calculate(
            &RawHorizon {
                ksat: "fast".to_string(),
                ..raw()
            },
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, HorizonError::Malformed { field: "ksat", .. }));

        let err = calculate(
            &RawHorizon {
                bottom_depth: String::new(),
                ..raw()
            },
            1,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, HorizonError::MissingField { .. }));
    }

    #[test]
    fn zero_conductivity_has_no_wetting_front() {
        assert_eq!(wetting_front(0.0), None);
        let h = calculate(
            &RawHorizon {
                ksat: "0".to_string(),
                ..raw()
            },
            1,
            None,
        )
        .unwrap()
        .unwrap();
        assert_eq!(h.soil.ksat, Some(0.0));
        assert_eq!(h.soil.g, None);
    }

    #[test]
    fn last_texture_wins() {
        let g1 = TextureGroup {
            horizon_key: "h1".to_string(),
            group_key: "g1".to_string(),
            label: "SIL".to_string(),
        };
        let g2 = TextureGroup {
            horizon_key: "h1".to_string(),
            group_key: "g2".to_string(),
            label: "CL".to_string(),
        };
        let mut classes = HashMap::new();
        classes.insert(
            "g1".to_string(),
            vec![TextureClass {
                group_key: "g1".to_string(),
                texcl: "Silt loam".to_string(),
                lieutex: String::new(),
            }],
        );
        classes.insert(
            "g2".to_string(),
            vec![TextureClass {
                group_key: "g2".to_string(),
                texcl: "None".to_string(),
                lieutex: "Clay loam".to_string(),
            }],
        );

        let (seen, resolved) = resolve_textures(&[&g1, &g2], &classes);
        assert_eq!(seen.len(), 2);
        let resolved = resolved.unwrap();
        assert_eq!(resolved.texture, "Clay loam");
        assert_eq!(resolved.group_label, "CL");
        assert_eq!(resolved.group_key, "g2");
    }

    #[test]
    fn horizon_without_textures_does_not_resolve() {
        let (seen, resolved) = resolve_textures(&[], &HashMap::new());
        assert!(seen.is_empty());
        assert!(resolved.is_none());
    }
}
