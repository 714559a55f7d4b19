use chrono::NaiveDateTime;
use std::fmt;

pub const TOOL_VERSION: &str = "4.0";
pub const STORE_VERSION: &str = "4.0";
pub const STATUS_COMPUTED: &str = "X";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

// Configuration structure for gSSURGO column name mapping
#[derive(Debug, Clone)]
pub struct SoilColumns {
    pub map_unit_key: String,
    pub component_key: String,
    pub component_pct: String,
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
    pub texture_group_key: String,
    pub texture_group_label: String,
    pub texture_class: String,
    pub lieu_texture: String,
}

impl SoilColumns {
    pub fn new() -> Self {
        SoilColumns {
            map_unit_key: "mukey".to_string(),
            component_key: "cokey".to_string(),
            component_pct: "comppct_r".to_string(),
            horizon_key: "chkey".to_string(),
            top_depth: "hzdept_r".to_string(),
            bottom_depth: "hzdepb_r".to_string(),
            ksat: "ksat_r".to_string(),
            sand: "sandtotal_r".to_string(),
            silt: "silttotal_r".to_string(),
            clay: "claytotal_r".to_string(),
            bulk_density: "dbthirdbar_r".to_string(),
            particle_density: "partdensity".to_string(),
            sieve_no10: "sieveno10_r".to_string(),
            kwfact: "kwfact".to_string(),
            texture_group_key: "chtgkey".to_string(),
            texture_group_label: "texture".to_string(),
            texture_class: "texcl".to_string(),
            lieu_texture: "lieutex".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FragmentColumns {
    pub hillslope_id: String,
    pub map_unit_key: String,
    pub class_code: String,
    pub area: String,
}

impl FragmentColumns {
    pub fn new() -> Self {
        FragmentColumns {
            hillslope_id: "HillslopeID".to_string(),
            map_unit_key: "MUKEY".to_string(),
            class_code: "gridcode".to_string(),
            area: "Shape_Area".to_string(),
        }
    }
}

/// (DelineationName, DiscretizationName, ParameterizationName)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey {
    pub delineation: String,
    pub discretization: String,
    pub parameterization: String,
}

impl PartitionKey {
    pub fn new(delineation: &str, discretization: &str, parameterization: &str) -> Self {
        PartitionKey {
            delineation: delineation.to_string(),
            discretization: discretization.to_string(),
            parameterization: parameterization.to_string(),
        }
    }

    pub fn with_parameterization(&self, parameterization: &str) -> Self {
        PartitionKey {
            parameterization: parameterization.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.delineation, self.discretization, self.parameterization
        )
    }
}

/// One row of `meta_parameterization`: everything a run needs to recover its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterizationRun {
    pub key: PartitionKey,
    pub slope_type: String,
    pub flow_length_method: String,
    pub hydraulic_geometry: String,
    pub channel_type: String,
    pub land_cover_path: String,
    pub land_cover_lut: String,
    pub soils_path: String,
    pub soils_database_path: String,
    pub max_horizons: u32,
    pub max_thickness: f64,
    pub creation_date: NaiveDateTime,
    pub tool_version: String,
    pub store_version: String,
    pub status: String,
}

impl ParameterizationRun {
    pub fn provenance(&self) -> Provenance {
        Provenance {
            creation_date: self.creation_date.format(TIMESTAMP_FORMAT).to_string(),
            tool_version: self.tool_version.clone(),
            store_version: self.store_version.clone(),
            status: self.status.clone(),
        }
    }

    /// `0` disables the horizon-count cutoff.
    pub fn horizon_limit(&self) -> Option<u32> {
        (self.max_horizons > 0).then_some(self.max_horizons)
    }

    /// `0` disables the top-depth cutoff.
    pub fn thickness_limit(&self) -> Option<f64> {
        (self.max_thickness > 0.0).then_some(self.max_thickness)
    }
}

// Provenance columns stamped on every parameter row a run writes
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub creation_date: String,
    pub tool_version: String,
    pub store_version: String,
    pub status: String,
}

impl Provenance {
    pub fn unset() -> Self {
        Provenance {
            creation_date: String::new(),
            tool_version: String::new(),
            store_version: String::new(),
            status: String::new(),
        }
    }
}
