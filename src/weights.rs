/// Weighted mean of each parameter column.
///
/// A parameter only averages over the rows where it is present, so a missing
/// value never counts as zero. A column with no present value, or whose
/// present rows carry zero total weight, is undefined.
pub fn weighted_mean<const N: usize>(rows: &[([Option<f64>; N], f64)]) -> [Option<f64>; N] {
    let mut sums = [0.0f64; N];
    let mut weights = [0.0f64; N];

    for (values, weight) in rows {
        for (i, value) in values.iter().enumerate() {
            if let Some(v) = value {
                sums[i] += v * weight;
                weights[i] += weight;
            }
        }
    }

    let mut out = [None; N];
    for i in 0..N {
        if weights[i] != 0.0 {
            out[i] = Some(sums[i] / weights[i]);
        }
    }
    out
}

/// Scale sand, silt and clay so they sum to 1. A zero sum, or any missing
/// fraction, leaves the values as they are.
pub fn renormalize_texture(
    sand: Option<f64>,
    silt: Option<f64>,
    clay: Option<f64>,
) -> (Option<f64>, Option<f64>, Option<f64>) {
    match (sand, silt, clay) {
        (Some(s), Some(i), Some(c)) => {
            let total = s + i + c;
            if total != 0.0 {
                (Some(s / total), Some(i / total), Some(c / total))
            } else {
                (sand, silt, clay)
            }
        }
        _ => (sand, silt, clay),
    }
}
