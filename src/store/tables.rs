use super::{RowReader, TableRow, integer, key_values, real, text};
use crate::channel::{ChannelElement, ChannelRecord};
use crate::config::{PartitionKey, Provenance};
use crate::hillslope::{HillslopeElement, HillslopeRecord};
use crate::horizon::{HorizonParams, ResolvedTexture};
use crate::params::{ChannelParams, CoverParams, SoilParams};
use crate::soil::{HorizonAggregate, HorizonRow, HorizonTextureRow, MapUnitAggregate};
use rusqlite::types::Value;

pub const HILLSLOPE_TABLE: &str = "parameters_hillslopes";
pub const CHANNEL_TABLE: &str = "parameters_channels";

const HILLSLOPE_COLUMNS: [(&str, &str); 33] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("HillslopeID", "INTEGER NOT NULL"),
    ("ChannelID", "INTEGER"),
    ("Area", "REAL"),
    ("FlowLength", "REAL"),
    ("Width", "REAL"),
    ("MeanSlope", "REAL"),
    ("CentroidX", "REAL"),
    ("CentroidY", "REAL"),
    ("Ksat", "REAL"),
    ("G", "REAL"),
    ("Porosity", "REAL"),
    ("Rock", "REAL"),
    ("Sand", "REAL"),
    ("Silt", "REAL"),
    ("Clay", "REAL"),
    ("Splash", "REAL"),
    ("Cohesion", "REAL"),
    ("Pave", "REAL"),
    ("SMax", "REAL"),
    ("CV", "REAL"),
    ("Distribution", "REAL"),
    ("BPressure", "REAL"),
    ("Canopy", "REAL"),
    ("Interception", "REAL"),
    ("Manning", "REAL"),
    ("Imperviousness", "REAL"),
    ("CreationDate", "TEXT"),
    ("ToolVersionAtCreation", "TEXT"),
    ("StoreVersionAtCreation", "TEXT"),
    ("Status", "TEXT"),
];

const CHANNEL_COLUMNS: [(&str, &str); 38] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("ChannelID", "INTEGER NOT NULL"),
    ("DownstreamID", "INTEGER"),
    ("Length", "REAL"),
    ("MeanSlope", "REAL"),
    ("ContributingArea", "REAL"),
    ("UpstreamArea", "REAL"),
    ("WidthUpstream", "REAL"),
    ("WidthDownstream", "REAL"),
    ("DepthUpstream", "REAL"),
    ("DepthDownstream", "REAL"),
    ("SideSlope1", "REAL"),
    ("SideSlope2", "REAL"),
    ("CentroidX", "REAL"),
    ("CentroidY", "REAL"),
    ("Ksat", "REAL"),
    ("Manning", "REAL"),
    ("Pave", "REAL"),
    ("Imperviousness", "REAL"),
    ("SMax", "REAL"),
    ("CV", "REAL"),
    ("G", "REAL"),
    ("Porosity", "REAL"),
    ("Rock", "REAL"),
    ("Sand", "REAL"),
    ("Silt", "REAL"),
    ("Clay", "REAL"),
    ("Splash", "REAL"),
    ("Cohesion", "REAL"),
    ("Distribution", "REAL"),
    ("BPressure", "REAL"),
    ("Woolhiser", "TEXT"),
    ("CreationDate", "TEXT"),
    ("ToolVersionAtCreation", "TEXT"),
    ("StoreVersionAtCreation", "TEXT"),
    ("Status", "TEXT"),
];

const HORIZON_TEXTURE_COLUMNS: [(&str, &str); 8] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("MapUnitKey", "TEXT"),
    ("ComponentKey", "TEXT"),
    ("HorizonKey", "TEXT"),
    ("TextureGroupKey", "TEXT"),
    ("Texture", "TEXT"),
];

const HORIZON_COLUMNS: [(&str, &str); 30] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("MapUnitKey", "TEXT"),
    ("ComponentKey", "TEXT"),
    ("ComponentPercentage", "REAL"),
    ("HorizonKey", "TEXT"),
    ("HorizonNumber", "INTEGER"),
    ("TopDepth", "REAL"),
    ("BottomDepth", "REAL"),
    ("Thickness", "REAL"),
    ("KwFact", "REAL"),
    ("TextureGroupKey", "TEXT"),
    ("TextureGroupLabel", "TEXT"),
    ("Texture", "TEXT"),
    ("Ksat", "REAL"),
    ("G", "REAL"),
    ("Porosity", "REAL"),
    ("Rock", "REAL"),
    ("Sand", "REAL"),
    ("Silt", "REAL"),
    ("Clay", "REAL"),
    ("Splash", "REAL"),
    ("Cohesion", "REAL"),
    ("Pave", "REAL"),
    ("SMax", "REAL"),
    ("CV", "REAL"),
    ("Distribution", "REAL"),
    ("BPressure", "REAL"),
    ("HorizonSource", "TEXT"),
];

const BY_HORIZON_COLUMNS: [(&str, &str); 22] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("MapUnitKey", "TEXT"),
    ("ComponentKey", "TEXT"),
    ("HorizonKey", "TEXT"),
    ("TotalThickness", "REAL"),
    ("ComponentPercentage", "REAL"),
    ("Ksat", "REAL"),
    ("G", "REAL"),
    ("Porosity", "REAL"),
    ("Rock", "REAL"),
    ("Sand", "REAL"),
    ("Silt", "REAL"),
    ("Clay", "REAL"),
    ("Splash", "REAL"),
    ("Cohesion", "REAL"),
    ("Pave", "REAL"),
    ("SMax", "REAL"),
    ("CV", "REAL"),
    ("Distribution", "REAL"),
    ("BPressure", "REAL"),
];

const BY_COMPONENT_COLUMNS: [(&str, &str); 19] = [
    ("DelineationName", "TEXT NOT NULL"),
    ("DiscretizationName", "TEXT NOT NULL"),
    ("ParameterizationName", "TEXT NOT NULL"),
    ("MapUnitKey", "TEXT"),
    ("TotalComponentPercentage", "REAL"),
    ("Ksat", "REAL"),
    ("G", "REAL"),
    ("Porosity", "REAL"),
    ("Rock", "REAL"),
    ("Sand", "REAL"),
    ("Silt", "REAL"),
    ("Clay", "REAL"),
    ("Splash", "REAL"),
    ("Cohesion", "REAL"),
    ("Pave", "REAL"),
    ("SMax", "REAL"),
    ("CV", "REAL"),
    ("Distribution", "REAL"),
    ("BPressure", "REAL"),
];

const HORIZON_SOURCE: &str = "SSURGO";

fn read_soil(r: &mut RowReader<'_, '_>) -> rusqlite::Result<SoilParams> {
    let mut values = [None; 14];
    for v in values.iter_mut() {
        *v = r.next()?;
    }
    Ok(SoilParams::from_array(values))
}

fn read_provenance(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Provenance> {
    Ok(Provenance {
        creation_date: r.next::<Option<String>>()?.unwrap_or_default(),
        tool_version: r.next::<Option<String>>()?.unwrap_or_default(),
        store_version: r.next::<Option<String>>()?.unwrap_or_default(),
        status: r.next::<Option<String>>()?.unwrap_or_default(),
    })
}

fn provenance_values(p: &Provenance) -> [Value; 4] {
    [
        text(&p.creation_date),
        text(&p.tool_version),
        text(&p.store_version),
        text(&p.status),
    ]
}

impl TableRow for HillslopeRecord {
    const TABLE: &'static str = HILLSLOPE_TABLE;
    const COLUMNS: &'static [(&'static str, &'static str)] = &HILLSLOPE_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let e = &self.element;
        let mut values = Vec::with_capacity(HILLSLOPE_COLUMNS.len());
        values.extend(key_values(&self.key));
        values.push(Value::Integer(self.hillslope_id));
        values.push(integer(e.channel_id));
        values.extend(
            [
                e.area,
                e.flow_length,
                e.width,
                e.mean_slope,
                e.centroid_x,
                e.centroid_y,
            ]
            .map(real),
        );
        values.extend(self.soil.to_array().map(real));
        values.extend(self.cover.to_array().map(real));
        values.extend(provenance_values(&self.provenance));
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        let key = r.key()?;
        let hillslope_id = r.next()?;
        let element = HillslopeElement {
            channel_id: r.next()?,
            area: r.next()?,
            flow_length: r.next()?,
            width: r.next()?,
            mean_slope: r.next()?,
            centroid_x: r.next()?,
            centroid_y: r.next()?,
        };
        let soil = read_soil(r)?;
        let cover = CoverParams {
            canopy: r.next()?,
            interception: r.next()?,
            manning: r.next()?,
            imperviousness: r.next()?,
        };
        Ok(HillslopeRecord {
            key,
            hillslope_id,
            element,
            soil,
            cover,
            provenance: read_provenance(r)?,
        })
    }
}

impl TableRow for ChannelRecord {
    const TABLE: &'static str = CHANNEL_TABLE;
    const COLUMNS: &'static [(&'static str, &'static str)] = &CHANNEL_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let e = &self.element;
        let mut values = Vec::with_capacity(CHANNEL_COLUMNS.len());
        values.extend(key_values(&self.key));
        values.push(Value::Integer(self.channel_id));
        values.push(integer(e.downstream_id));
        values.extend(
            [
                e.length,
                e.mean_slope,
                e.contributing_area,
                e.upstream_area,
                e.width_upstream,
                e.width_downstream,
                e.depth_upstream,
                e.depth_downstream,
                e.side_slope1,
                e.side_slope2,
                e.centroid_x,
                e.centroid_y,
            ]
            .map(real),
        );
        values.extend(self.params.to_array().map(real));
        values.push(
            self.woolhiser
                .as_deref()
                .map(text)
                .unwrap_or(Value::Null),
        );
        values.extend(provenance_values(&self.provenance));
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        let key = r.key()?;
        let channel_id = r.next()?;
        let element = ChannelElement {
            downstream_id: r.next()?,
            length: r.next()?,
            mean_slope: r.next()?,
            contributing_area: r.next()?,
            upstream_area: r.next()?,
            width_upstream: r.next()?,
            width_downstream: r.next()?,
            depth_upstream: r.next()?,
            depth_downstream: r.next()?,
            side_slope1: r.next()?,
            side_slope2: r.next()?,
            centroid_x: r.next()?,
            centroid_y: r.next()?,
        };
        let mut params = [None; 16];
        for v in params.iter_mut() {
            *v = r.next()?;
        }
        Ok(ChannelRecord {
            key,
            channel_id,
            element,
            params: ChannelParams::from_array(params),
            woolhiser: r.next()?,
            provenance: read_provenance(r)?,
        })
    }
}

/// An intermediate row tagged with the partition that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyed<T> {
    pub key: PartitionKey,
    pub row: T,
}

impl<T> Keyed<T> {
    pub fn all(key: &PartitionKey, rows: Vec<T>) -> Vec<Keyed<T>> {
        rows.into_iter()
            .map(|row| Keyed {
                key: key.clone(),
                row,
            })
            .collect()
    }
}

impl TableRow for Keyed<HorizonTextureRow> {
    const TABLE: &'static str = "parameters_soil_horizons_with_textures";
    const COLUMNS: &'static [(&'static str, &'static str)] = &HORIZON_TEXTURE_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let r = &self.row;
        let mut values = key_values(&self.key).to_vec();
        values.extend([
            text(&r.map_unit),
            text(&r.component),
            text(&r.horizon),
            text(&r.group_key),
            text(&r.texture),
        ]);
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Keyed {
            key: r.key()?,
            row: HorizonTextureRow {
                map_unit: r.next()?,
                component: r.next()?,
                horizon: r.next()?,
                group_key: r.next()?,
                texture: r.next()?,
            },
        })
    }
}

impl TableRow for Keyed<HorizonRow> {
    const TABLE: &'static str = "parameters_soil_horizons";
    const COLUMNS: &'static [(&'static str, &'static str)] = &HORIZON_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let r = &self.row;
        let h = &r.horizon;
        let mut values = key_values(&self.key).to_vec();
        values.extend([
            text(&r.map_unit),
            text(&r.component),
            real(r.component_pct),
            text(&h.horizon_id),
            Value::Integer(i64::from(h.horizon_number)),
            real(Some(h.top_depth)),
            real(Some(h.bottom_depth)),
            real(Some(h.thickness)),
            real(Some(h.kwfact)),
            text(&r.texture.group_key),
            text(&r.texture.group_label),
            text(&r.texture.texture),
        ]);
        values.extend(h.soil.to_array().map(real));
        values.push(text(HORIZON_SOURCE));
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        let key = r.key()?;
        let map_unit = r.next()?;
        let component = r.next()?;
        let component_pct = r.next()?;
        let horizon_id = r.next()?;
        let horizon_number = r.next()?;
        let top_depth = r.next()?;
        let bottom_depth = r.next()?;
        let thickness = r.next()?;
        let kwfact = r.next()?;
        let texture = ResolvedTexture {
            group_key: r.next()?,
            group_label: r.next()?,
            texture: r.next()?,
        };
        let soil = read_soil(r)?;
        Ok(Keyed {
            key,
            row: HorizonRow {
                map_unit,
                component,
                component_pct,
                horizon: HorizonParams {
                    horizon_id,
                    horizon_number,
                    top_depth,
                    bottom_depth,
                    thickness,
                    kwfact,
                    soil,
                },
                texture,
            },
        })
    }
}

impl TableRow for Keyed<HorizonAggregate> {
    const TABLE: &'static str = "parameters_soil_weighted_by_horizon";
    const COLUMNS: &'static [(&'static str, &'static str)] = &BY_HORIZON_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let r = &self.row;
        let mut values = key_values(&self.key).to_vec();
        values.extend([
            text(&r.map_unit),
            text(&r.component),
            text(&r.horizon),
            real(Some(r.total_thickness)),
            real(Some(r.component_pct)),
        ]);
        values.extend(r.soil.to_array().map(real));
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Keyed {
            key: r.key()?,
            row: HorizonAggregate {
                map_unit: r.next()?,
                component: r.next()?,
                horizon: r.next()?,
                total_thickness: r.next()?,
                component_pct: r.next()?,
                soil: read_soil(r)?,
            },
        })
    }
}

impl TableRow for Keyed<MapUnitAggregate> {
    const TABLE: &'static str = "parameters_soil_weighted_by_component";
    const COLUMNS: &'static [(&'static str, &'static str)] = &BY_COMPONENT_COLUMNS;

    fn key(&self) -> &PartitionKey {
        &self.key
    }

    fn to_values(&self) -> Vec<Value> {
        let r = &self.row;
        let mut values = key_values(&self.key).to_vec();
        values.extend([text(&r.map_unit), real(Some(r.total_component_pct))]);
        values.extend(r.soil.to_array().map(real));
        values
    }

    fn from_row(r: &mut RowReader<'_, '_>) -> rusqlite::Result<Self> {
        Ok(Keyed {
            key: r.key()?,
            row: MapUnitAggregate {
                map_unit: r.next()?,
                total_component_pct: r.next()?,
                soil: read_soil(r)?,
            },
        })
    }
}
