use crate::error::{ParamError, ParamResult};
use crate::horizon::{DEFAULT_KWFACT, cohesion, splash};
use crate::params::SoilParams;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

/// Texture-group labels that describe water, ice, rock or man-made surfaces.
/// `VAR` (variable) is treated as paved pending confirmation against other
/// survey areas.
pub const PAVED_TEXTURES: [&str; 9] = ["WB", "UWB", "ICE", "CEM", "IND", "GYP", "BR", "CEM_BR", "VAR"];

/// Placeholder texture for paved horizons. Sums to 1 so element files stay
/// valid, but carries no physical meaning.
pub const PAVED_SAND: f64 = 0.33;
pub const PAVED_SILT: f64 = 0.33;
pub const PAVED_CLAY: f64 = 0.34;

pub fn is_paved_texture(group_label: &str) -> bool {
    PAVED_TEXTURES.contains(&group_label.trim())
}

/// One row of the reference texture table (`kin_lut`). Sand, silt and clay
/// are percentages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTexture {
    pub ks: Option<f64>,
    pub g: Option<f64>,
    pub porosity: Option<f64>,
    pub smax: Option<f64>,
    pub cv: Option<f64>,
    pub sand: Option<f64>,
    pub silt: Option<f64>,
    pub clay: Option<f64>,
    pub distribution: Option<f64>,
    pub kff: Option<f64>,
    pub bpressure: Option<f64>,
}

impl ReferenceTexture {
    /// Overwrite survey-derived values with reference values.
    ///
    /// Ksat, G, texture, splash, cohesion and porosity only change when the
    /// reference value is present. SMax, CV, Distribution and BPressure have no
    /// survey counterpart and are always taken from the reference row.
    pub fn apply(&self, soil: &mut SoilParams, kwfact: f64) {
        let kf = if kwfact == 0.0 {
            match self.kff {
                Some(kff) if kff > 0.0 => kff,
                _ => DEFAULT_KWFACT,
            }
        } else {
            kwfact
        };
        let clay = self.clay.map(|c| c / 100.0);

        let overrides = [
            (&mut soil.ksat, self.ks),
            (&mut soil.g, self.g),
            (&mut soil.sand, self.sand.map(|s| s / 100.0)),
            (&mut soil.silt, self.silt.map(|s| s / 100.0)),
            (&mut soil.clay, clay),
            (&mut soil.splash, Some(splash(kf))),
            (&mut soil.cohesion, Some(cohesion(kf, clay))),
            (&mut soil.porosity, self.porosity),
        ];
        for (slot, value) in overrides {
            if let Some(v) = value.filter(|v| !v.is_nan()) {
                *slot = Some(v);
            }
        }

        soil.smax = self.smax;
        soil.cv = self.cv;
        soil.distribution = self.distribution;
        soil.bpressure = self.bpressure;
    }
}

pub fn apply_pavement(soil: &mut SoilParams, group_label: &str) {
    if is_paved_texture(group_label) {
        soil.pave = Some(1.0);
        soil.sand = Some(PAVED_SAND);
        soil.silt = Some(PAVED_SILT);
        soil.clay = Some(PAVED_CLAY);
    } else {
        soil.pave = Some(0.0);
    }
}

fn index_unique<K, V>(table: &str, entries: Vec<(K, V)>) -> ParamResult<HashMap<K, V>>
where
    K: Eq + Hash + ToString,
{
    let mut map = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        match map.entry(key) {
            Entry::Occupied(e) => {
                return Err(ParamError::DuplicateKey {
                    table: table.to_string(),
                    key: e.key().to_string(),
                });
            }
            Entry::Vacant(e) => {
                e.insert(value);
            }
        }
    }
    Ok(map)
}

#[derive(Debug, Clone, Default)]
pub struct TextureTable {
    entries: HashMap<String, ReferenceTexture>,
}

impl TextureTable {
    pub fn from_entries(entries: Vec<(String, ReferenceTexture)>) -> ParamResult<Self> {
        let entries = entries
            .into_iter()
            .map(|(name, row)| (name.trim().to_string(), row))
            .collect();
        Ok(TextureTable {
            entries: index_unique("kin_lut", entries)?,
        })
    }

    pub fn resolve(&self, texture: &str) -> Option<&ReferenceTexture> {
        self.entries.get(texture.trim())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandCoverClass {
    pub name: String,
    pub canopy: Option<f64>,
    pub interception: Option<f64>,
    pub manning: Option<f64>,
    pub imperviousness: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct LandCoverTable {
    classes: HashMap<i64, LandCoverClass>,
}

impl LandCoverTable {
    pub fn from_entries(table: &str, entries: Vec<(i64, LandCoverClass)>) -> ParamResult<Self> {
        Ok(LandCoverTable {
            classes: index_unique(table, entries)?,
        })
    }

    pub fn resolve(&self, class_code: i64) -> Option<&LandCoverClass> {
        self.classes.get(&class_code)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelTypeOverride {
    pub ksat: Option<f64>,
    pub manning: Option<f64>,
    pub pave: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ChannelTypeTable {
    types: HashMap<String, ChannelTypeOverride>,
}

impl ChannelTypeTable {
    pub fn from_entries(entries: Vec<(String, ChannelTypeOverride)>) -> ParamResult<Self> {
        Ok(ChannelTypeTable {
            types: index_unique("channel_types", entries)?,
        })
    }

    pub fn resolve(&self, channel_type: &str) -> Option<&ChannelTypeOverride> {
        self.types.get(channel_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn clay_loam() -> ReferenceTexture {
        ReferenceTexture {
            ks: Some(2.3),
            g: Some(208.0),
            porosity: Some(0.46),
            smax: Some(0.91),
            cv: Some(0.85),
            sand: Some(20.0),
            silt: Some(30.0),
            clay: Some(50.0),
            distribution: Some(0.24),
            kff: Some(0.28),
            bpressure: Some(26.0),
        }
    }

    #[test]
    fn reference_values_override_survey_values() {
        let mut soil = SoilParams {
            ksat: Some(36.0),
            g: Some(109.5),
            porosity: Some(0.5),
            sand: Some(0.6),
            silt: Some(0.3),
            clay: Some(0.1),
            smax: Some(123.0),
            ..Default::default()
        };
        clay_loam().apply(&mut soil, 0.2);

        assert_eq!(soil.ksat, Some(2.3));
        assert_eq!(soil.g, Some(208.0));
        assert_eq!(soil.porosity, Some(0.46));
        assert_abs_diff_eq!(soil.sand.unwrap(), 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(soil.silt.unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(soil.clay.unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            soil.sand.unwrap() + soil.silt.unwrap() + soil.clay.unwrap(),
            1.0,
            epsilon = 1e-9
        );
        assert_eq!(soil.smax, Some(0.91));
        assert_eq!(soil.bpressure, Some(26.0));
        assert_abs_diff_eq!(soil.splash.unwrap(), 422.0 * 0.2 * 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(soil.cohesion.unwrap(), 5.6 * 0.2 / 130.0 * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn missing_reference_values_keep_survey_values() {
        let mut soil = SoilParams {
            ksat: Some(36.0),
            porosity: Some(0.5),
            smax: Some(99.0),
            ..Default::default()
        };
        let reference = ReferenceTexture {
            ks: None,
            porosity: Some(f64::NAN),
            smax: None,
            ..clay_loam()
        };
        reference.apply(&mut soil, 0.2);
        assert_eq!(soil.ksat, Some(36.0));
        assert_eq!(soil.porosity, Some(0.5));
        // reference-only fields are overwritten even with a missing value
        assert_eq!(soil.smax, None);
    }

    #[test]
    fn zero_erodibility_falls_back_to_reference_kff() {
        let mut soil = SoilParams::default();
        clay_loam().apply(&mut soil, 0.0);
        assert_abs_diff_eq!(soil.splash.unwrap(), 422.0 * 0.28 * 0.8, epsilon = 1e-12);

        let mut soil = SoilParams::default();
        let no_kff = ReferenceTexture {
            kff: Some(-1.0),
            ..clay_loam()
        };
        no_kff.apply(&mut soil, 0.0);
        assert_abs_diff_eq!(soil.splash.unwrap(), 422.0 * 0.2 * 0.8, epsilon = 1e-12);
    }

    #[test]
    fn paved_textures_force_placeholder_fractions() {
        let mut soil = SoilParams {
            sand: Some(0.7),
            silt: Some(0.2),
            clay: Some(0.1),
            ..Default::default()
        };
        apply_pavement(&mut soil, "BR");
        assert_eq!(soil.pave, Some(1.0));
        assert_eq!((soil.sand, soil.silt, soil.clay), (Some(0.33), Some(0.33), Some(0.34)));

        let mut soil = SoilParams::default();
        apply_pavement(&mut soil, "CL");
        assert_eq!(soil.pave, Some(0.0));
        assert!(is_paved_texture("WB"));
        assert!(!is_paved_texture("SIL"));
    }

    #[test]
    fn duplicate_reference_rows_are_rejected() {
        let entries = vec![
            ("CL".to_string(), clay_loam()),
            ("CL ".to_string(), clay_loam()),
        ];
        assert!(matches!(
            TextureTable::from_entries(entries),
            Err(ParamError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn unknown_texture_does_not_resolve() {
        let table = TextureTable::from_entries(vec![("CL".to_string(), clay_loam())]).unwrap();
        assert!(table.resolve("CL").is_some());
        assert!(table.resolve("MUCK").is_none());
        assert_eq!(table.len(), 1);
    }
}
