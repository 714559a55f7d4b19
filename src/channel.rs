//! Channel parameters from adjacent hillslopes and the selected channel type.

use crate::config::{PartitionKey, Provenance};
use crate::hillslope::HillslopeRecord;
use crate::lookup::ChannelTypeTable;
use crate::params::ChannelParams;
use crate::report::RunReport;
use crate::weights::weighted_mean;
use std::collections::{BTreeMap, HashMap};

/// Woolhiser channel routing is always enabled for now.
pub const WOOLHISER: &str = "Yes";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelElement {
    pub downstream_id: Option<i64>,
    pub length: Option<f64>,
    pub mean_slope: Option<f64>,
    pub contributing_area: Option<f64>,
    pub upstream_area: Option<f64>,
    pub width_upstream: Option<f64>,
    pub width_downstream: Option<f64>,
    pub depth_upstream: Option<f64>,
    pub depth_downstream: Option<f64>,
    pub side_slope1: Option<f64>,
    pub side_slope2: Option<f64>,
    pub centroid_x: Option<f64>,
    pub centroid_y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub key: PartitionKey,
    pub channel_id: i64,
    pub element: ChannelElement,
    pub params: ChannelParams,
    pub woolhiser: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedChannel {
    pub channel_id: i64,
    pub params: ChannelParams,
    pub woolhiser: String,
}

/// Discretization numbers the hillslopes draining into channel `n` as
/// `n-1` (left), `n-2` (right) and `n-3` (headwater).
pub fn adjacent_hillslopes(channel_id: i64) -> [i64; 3] {
    [channel_id - 1, channel_id - 2, channel_id - 3]
}

/// Area-weight the adjacent hillslopes' parameters for every channel.
///
/// Hillslopes without an area do not contribute. A channel with no
/// contributing hillslope gets undefined parameters.
pub fn derive_from_hillslopes(
    channel_ids: &[i64],
    hillslopes: &[HillslopeRecord],
    report: &mut RunReport,
) -> Vec<DerivedChannel> {
    let by_id: HashMap<i64, &HillslopeRecord> =
        hillslopes.iter().map(|h| (h.hillslope_id, h)).collect();

    channel_ids
        .iter()
        .map(|&channel_id| {
            let rows: Vec<([Option<f64>; 16], f64)> = adjacent_hillslopes(channel_id)
                .iter()
                .filter_map(|id| by_id.get(id))
                .filter_map(|h| {
                    h.element.area.map(|area| {
                        (
                            ChannelParams::from_hillslope(&h.soil, &h.cover).to_array(),
                            area,
                        )
                    })
                })
                .collect();

            if rows.is_empty() {
                log::warn!("Channel {} has no adjacent hillslopes", channel_id);
                report.channels_without_hillslopes.push(channel_id);
            }

            let mut params = ChannelParams::from_array(weighted_mean(&rows));
            params.renormalize_texture();
            DerivedChannel {
                channel_id,
                params,
                woolhiser: WOOLHISER.to_string(),
            }
        })
        .collect()
}

/// Overwrite Ksat, Manning and Pave with the channel type's values.
///
/// Values are only applied when all three are present. An unknown channel
/// type is reported and leaves the hillslope-derived values in place.
pub fn apply_channel_type(
    channels: &mut [DerivedChannel],
    types: &ChannelTypeTable,
    channel_type: &str,
    report: &mut RunReport,
) {
    let Some(overrides) = types.resolve(channel_type) else {
        log::warn!("Channel type {} not found in the lookup table", channel_type);
        report.channel_type_not_found = Some(channel_type.to_string());
        return;
    };

    match (overrides.ksat, overrides.manning, overrides.pave) {
        (Some(ksat), Some(manning), Some(pave)) => {
            for channel in channels.iter_mut() {
                channel.params.ksat = Some(ksat);
                channel.params.manning = Some(manning);
                channel.params.pave = Some(pave);
            }
        }
        _ => log::info!(
            "Channel type {} has no complete override; keeping hillslope values",
            channel_type
        ),
    }
}

pub fn apply_to_partition(
    key: &PartitionKey,
    existing: Vec<ChannelRecord>,
    derived: &[DerivedChannel],
    provenance: &Provenance,
) -> Vec<ChannelRecord> {
    let mut by_id: BTreeMap<i64, &DerivedChannel> =
        derived.iter().map(|c| (c.channel_id, c)).collect();

    let mut records: Vec<ChannelRecord> = existing
        .into_iter()
        .map(|record| {
            let derived = by_id.remove(&record.channel_id);
            ChannelRecord {
                key: key.clone(),
                params: derived.map(|d| d.params).unwrap_or_default(),
                woolhiser: derived.map(|d| d.woolhiser.clone()),
                provenance: provenance.clone(),
                ..record
            }
        })
        .collect();

    records.extend(by_id.into_values().map(|d| ChannelRecord {
        key: key.clone(),
        channel_id: d.channel_id,
        element: ChannelElement::default(),
        params: d.params,
        woolhiser: Some(d.woolhiser.clone()),
        provenance: provenance.clone(),
    }));
    records
}

pub fn copy_parameters(current: &mut [ChannelRecord], previous: &[ChannelRecord]) -> usize {
    let by_id: HashMap<i64, &ChannelRecord> =
        previous.iter().map(|c| (c.channel_id, c)).collect();
    let mut copied = 0;
    for record in current.iter_mut() {
        if let Some(prev) = by_id.get(&record.channel_id) {
            record.params = prev.params;
            record.woolhiser = prev.woolhiser.clone();
            copied += 1;
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hillslope::HillslopeElement;
    use crate::lookup::ChannelTypeOverride;
    use crate::params::{CoverParams, SoilParams};
    use approx::assert_abs_diff_eq;

    fn hillslope(id: i64, area: Option<f64>, ksat: f64, manning: f64) -> HillslopeRecord {
        HillslopeRecord {
            key: PartitionKey::new("d", "s", "p"),
            hillslope_id: id,
            element: HillslopeElement {
                area,
                ..Default::default()
            },
            soil: SoilParams {
                ksat: Some(ksat),
                sand: Some(0.4),
                silt: Some(0.4),
                clay: Some(0.2),
                pave: Some(0.0),
                ..Default::default()
            },
            cover: CoverParams {
                manning: Some(manning),
                ..Default::default()
            },
            provenance: Provenance::unset(),
        }
    }

    #[test]
    fn channel_weights_adjacent_hillslopes() {
        let hillslopes = vec![
            hillslope(1, Some(100.0), 10.0, 0.1),
            hillslope(2, Some(300.0), 20.0, 0.2),
            hillslope(3, Some(600.0), 30.0, 0.3),
        ];
        let mut report = RunReport::new();
        let channels = derive_from_hillslopes(&[4], &hillslopes, &mut report);
        let c = &channels[0];
        assert_eq!(c.channel_id, 4);
        assert_abs_diff_eq!(c.params.ksat.unwrap(), 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.params.manning.unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(
            c.params.sand.unwrap() + c.params.silt.unwrap() + c.params.clay.unwrap(),
            1.0,
            epsilon = 1e-9
        );
        assert_eq!(c.woolhiser, "Yes");
    }

    #[test]
    fn only_existing_candidates_contribute() {
        let hillslopes = vec![hillslope(13, Some(50.0), 8.0, 0.1)];
        let mut report = RunReport::new();
        let channels = derive_from_hillslopes(&[14, 24], &hillslopes, &mut report);
        assert_abs_diff_eq!(channels[0].params.ksat.unwrap(), 8.0, epsilon = 1e-12);

        // channel 24 looks for 23, 22 and 21; none exist
        assert_eq!(channels[1].params, ChannelParams::default());
        assert_eq!(report.channels_without_hillslopes, vec![24]);
    }

    #[test]
    fn channel_type_overrides_three_fields() {
        let types = ChannelTypeTable::from_entries(vec![
            (
                "Earthen".to_string(),
                ChannelTypeOverride {
                    ksat: Some(2.0),
                    manning: Some(0.035),
                    pave: Some(0.0),
                },
            ),
            (
                "Partial".to_string(),
                ChannelTypeOverride {
                    ksat: Some(2.0),
                    manning: None,
                    pave: Some(0.0),
                },
            ),
        ])
        .unwrap();
        let hillslopes = vec![hillslope(1, Some(1.0), 10.0, 0.1)];
        let mut report = RunReport::new();
        let mut channels = derive_from_hillslopes(&[2], &hillslopes, &mut report);

        apply_channel_type(&mut channels, &types, "Partial", &mut report);
        assert_eq!(channels[0].params.ksat, Some(10.0));

        apply_channel_type(&mut channels, &types, "Earthen", &mut report);
        assert_eq!(channels[0].params.ksat, Some(2.0));
        assert_eq!(channels[0].params.manning, Some(0.035));
        assert_eq!(channels[0].params.pave, Some(0.0));
        assert!(report.channel_type_not_found.is_none());

        apply_channel_type(&mut channels, &types, "Concrete", &mut report);
        assert_eq!(report.channel_type_not_found.as_deref(), Some("Concrete"));
        assert_eq!(channels[0].params.ksat, Some(2.0));
    }

    #[test]
    fn partition_rows_take_derived_values() {
        let key = PartitionKey::new("d", "s", "p");
        let existing = vec![ChannelRecord {
            key: key.clone(),
            channel_id: 4,
            element: ChannelElement {
                length: Some(850.0),
                ..Default::default()
            },
            params: ChannelParams::default(),
            woolhiser: None,
            provenance: Provenance::unset(),
        }];
        let derived = vec![DerivedChannel {
            channel_id: 4,
            params: ChannelParams {
                ksat: Some(3.0),
                ..Default::default()
            },
            woolhiser: WOOLHISER.to_string(),
        }];
        let records = apply_to_partition(&key, existing, &derived, &Provenance::unset());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].element.length, Some(850.0));
        assert_eq!(records[0].params.ksat, Some(3.0));
        assert_eq!(records[0].woolhiser.as_deref(), Some("Yes"));
    }
}
