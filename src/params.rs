// Parameter names in storage order, checked against the table column lists
#[cfg(test)]
pub const SOIL_PARAMETERS: [&str; 14] = [
    "Ksat",
    "G",
    "Porosity",
    "Rock",
    "Sand",
    "Silt",
    "Clay",
    "Splash",
    "Cohesion",
    "Pave",
    "SMax",
    "CV",
    "Distribution",
    "BPressure",
];

#[cfg(test)]
pub const COVER_PARAMETERS: [&str; 4] = ["Canopy", "Interception", "Manning", "Imperviousness"];

#[cfg(test)]
pub const CHANNEL_PARAMETERS: [&str; 16] = [
    "Ksat",
    "Manning",
    "Pave",
    "Imperviousness",
    "SMax",
    "CV",
    "G",
    "Porosity",
    "Rock",
    "Sand",
    "Silt",
    "Clay",
    "Splash",
    "Cohesion",
    "Distribution",
    "BPressure",
];

// Soil parameters, Ksat in mm/hr, G in mm, fractions 0-1
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SoilParams {
    pub ksat: Option<f64>,
    pub g: Option<f64>,
    pub porosity: Option<f64>,
    pub rock: Option<f64>,
    pub sand: Option<f64>,
    pub silt: Option<f64>,
    pub clay: Option<f64>,
    pub splash: Option<f64>,
    pub cohesion: Option<f64>,
    pub pave: Option<f64>,
    pub smax: Option<f64>,
    pub cv: Option<f64>,
    pub distribution: Option<f64>,
    pub bpressure: Option<f64>,
}

impl SoilParams {
    pub fn to_array(&self) -> [Option<f64>; 14] {
        [
            self.ksat,
            self.g,
            self.porosity,
            self.rock,
            self.sand,
            self.silt,
            self.clay,
            self.splash,
            self.cohesion,
            self.pave,
            self.smax,
            self.cv,
            self.distribution,
            self.bpressure,
        ]
    }

    pub fn from_array(v: [Option<f64>; 14]) -> Self {
        SoilParams {
            ksat: v[0],
            g: v[1],
            porosity: v[2],
            rock: v[3],
            sand: v[4],
            silt: v[5],
            clay: v[6],
            splash: v[7],
            cohesion: v[8],
            pave: v[9],
            smax: v[10],
            cv: v[11],
            distribution: v[12],
            bpressure: v[13],
        }
    }

    pub fn is_paved(&self) -> bool {
        self.pave == Some(1.0)
    }

    pub fn renormalize_texture(&mut self) {
        let (sand, silt, clay) =
            crate::weights::renormalize_texture(self.sand, self.silt, self.clay);
        self.sand = sand;
        self.silt = silt;
        self.clay = clay;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverParams {
    pub canopy: Option<f64>,
    pub interception: Option<f64>,
    pub manning: Option<f64>,
    pub imperviousness: Option<f64>,
}

impl CoverParams {
    pub fn to_array(&self) -> [Option<f64>; 4] {
        [
            self.canopy,
            self.interception,
            self.manning,
            self.imperviousness,
        ]
    }

    pub fn from_array(v: [Option<f64>; 4]) -> Self {
        CoverParams {
            canopy: v[0],
            interception: v[1],
            manning: v[2],
            imperviousness: v[3],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelParams {
    pub ksat: Option<f64>,
    pub manning: Option<f64>,
    pub pave: Option<f64>,
    pub imperviousness: Option<f64>,
    pub smax: Option<f64>,
    pub cv: Option<f64>,
    pub g: Option<f64>,
    pub porosity: Option<f64>,
    pub rock: Option<f64>,
    pub sand: Option<f64>,
    pub silt: Option<f64>,
    pub clay: Option<f64>,
    pub splash: Option<f64>,
    pub cohesion: Option<f64>,
    pub distribution: Option<f64>,
    pub bpressure: Option<f64>,
}

impl ChannelParams {
    pub fn to_array(&self) -> [Option<f64>; 16] {
        [
            self.ksat,
            self.manning,
            self.pave,
            self.imperviousness,
            self.smax,
            self.cv,
            self.g,
            self.porosity,
            self.rock,
            self.sand,
            self.silt,
            self.clay,
            self.splash,
            self.cohesion,
            self.distribution,
            self.bpressure,
        ]
    }

    pub fn from_array(v: [Option<f64>; 16]) -> Self {
        ChannelParams {
            ksat: v[0],
            manning: v[1],
            pave: v[2],
            imperviousness: v[3],
            smax: v[4],
            cv: v[5],
            g: v[6],
            porosity: v[7],
            rock: v[8],
            sand: v[9],
            silt: v[10],
            clay: v[11],
            splash: v[12],
            cohesion: v[13],
            distribution: v[14],
            bpressure: v[15],
        }
    }

    pub fn from_hillslope(soil: &SoilParams, cover: &CoverParams) -> Self {
        ChannelParams {
            ksat: soil.ksat,
            manning: cover.manning,
            pave: soil.pave,
            imperviousness: cover.imperviousness,
            smax: soil.smax,
            cv: soil.cv,
            g: soil.g,
            porosity: soil.porosity,
            rock: soil.rock,
            sand: soil.sand,
            silt: soil.silt,
            clay: soil.clay,
            splash: soil.splash,
            cohesion: soil.cohesion,
            distribution: soil.distribution,
            bpressure: soil.bpressure,
        }
    }

    pub fn renormalize_texture(&mut self) {
        let (sand, silt, clay) =
            crate::weights::renormalize_texture(self.sand, self.silt, self.clay);
        self.sand = sand;
        self.silt = silt;
        self.clay = clay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soil_array_order_matches_names() {
        let p = SoilParams {
            sand: Some(0.2),
            pave: Some(1.0),
            bpressure: Some(7.0),
            ..Default::default()
        };
        let a = p.to_array();
        assert_eq!(a[SOIL_PARAMETERS.iter().position(|n| *n == "Sand").unwrap()], Some(0.2));
        assert_eq!(a[SOIL_PARAMETERS.iter().position(|n| *n == "Pave").unwrap()], Some(1.0));
        assert_eq!(a[13], Some(7.0));
        assert_eq!(SoilParams::from_array(a), p);
        assert!(p.is_paved());
    }

    #[test]
    fn channel_view_takes_manning_from_cover() {
        let soil = SoilParams {
            ksat: Some(3.0),
            clay: Some(0.4),
            ..Default::default()
        };
        let cover = CoverParams {
            manning: Some(0.05),
            imperviousness: Some(0.1),
            ..Default::default()
        };
        let c = ChannelParams::from_hillslope(&soil, &cover);
        assert_eq!(c.ksat, Some(3.0));
        assert_eq!(c.manning, Some(0.05));
        assert_eq!(c.imperviousness, Some(0.1));
        assert_eq!(c.clay, Some(0.4));
        assert_eq!(ChannelParams::from_array(c.to_array()), c);
    }
}
