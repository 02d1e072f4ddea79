/// Model Fitter - regress observed pace against per-segment elevation change
///
/// Reference segments are split at zero elevation change into an uphill set
/// (strictly positive) and a downhill-or-flat set, then four regressions are fitted.
use serde::{Deserialize, Serialize};

use crate::error::{PacerError, Result};
use crate::track_reducer::Segment;

pub const DEFAULT_MAX_FIT_PACE: f64 = 20.0;
pub const DEFAULT_UPHILL_PENALTY_PER_M: f64 = 6.0 / 20.0;
pub const DEFAULT_DOWNHILL_PENALTY_PER_M: f64 = 3.0 / 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    // manual
    pub uphill_penalty_per_m: f64,
    pub downhill_penalty_per_m: f64,
    // parabola over all qualifying segments
    pub a_para: f64,
    pub b_para: f64,
    pub c_para: f64,
    // parabola over downhill-or-flat segments
    pub a_para_down: f64,
    pub b_para_down: f64,
    pub c_para_down: f64,
    // lines per direction
    pub a_lin_up: f64,
    pub b_lin_up: f64,
    pub a_lin_down: f64,
    pub b_lin_down: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Segments at or above this pace (min/km) are treated as stops and ignored.
    pub max_pace: f64,
    pub uphill_penalty_per_m: f64,
    pub downhill_penalty_per_m: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            max_pace: DEFAULT_MAX_FIT_PACE,
            uphill_penalty_per_m: DEFAULT_UPHILL_PENALTY_PER_M,
            downhill_penalty_per_m: DEFAULT_DOWNHILL_PENALTY_PER_M,
        }
    }
}

/// How the reference segments were used by the fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitReport {
    pub total_segments: usize,
    pub without_pace: usize,
    pub too_slow: usize,
    pub uphill: usize,
    pub downhill: usize,
}

impl FitReport {
    pub fn qualifying(&self) -> usize {
        self.uphill + self.downhill
    }
}

pub fn fit_model_parameters(segments: &[Segment], config: &FitConfig) -> Result<ModelParameters> {
    fit_with_report(segments, config).map(|(params, _)| params)
}

pub fn fit_with_report(
    segments: &[Segment],
    config: &FitConfig,
) -> Result<(ModelParameters, FitReport)> {
    let mut report = FitReport {
        total_segments: segments.len(),
        ..FitReport::default()
    };

    let mut samples: Vec<(f64, f64)> = Vec::with_capacity(segments.len());
    for segment in segments {
        match segment.pace {
            Some(pace) if pace.is_finite() && segment.elevation_delta_sum.is_finite() => {
                if pace < config.max_pace {
                    samples.push((segment.elevation_delta_sum, pace));
                } else {
                    report.too_slow += 1;
                }
            }
            _ => report.without_pace += 1,
        }
    }
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (up, down): (Vec<(f64, f64)>, Vec<(f64, f64)>) =
        samples.iter().partition(|(delta, _)| *delta > 0.0);
    report.uphill = up.len();
    report.downhill = down.len();

    log::debug!(
        "fitting on {} of {} segments ({} up, {} down, {} without pace, {} too slow)",
        report.qualifying(),
        report.total_segments,
        report.uphill,
        report.downhill,
        report.without_pace,
        report.too_slow
    );

    require("qualifying", &samples, 3)?;
    require("downhill-or-flat", &down, 3)?;
    require("uphill", &up, 2)?;

    let para = polyfit_pairs(&samples, 2)?;
    let para_down = polyfit_pairs(&down, 2)?;
    let lin_up = polyfit_pairs(&up, 1)?;
    let lin_down = polyfit_pairs(&down, 1)?;

    let params = ModelParameters {
        uphill_penalty_per_m: config.uphill_penalty_per_m,
        downhill_penalty_per_m: config.downhill_penalty_per_m,
        a_para: para[0],
        b_para: para[1],
        c_para: para[2],
        a_para_down: para_down[0],
        b_para_down: para_down[1],
        c_para_down: para_down[2],
        a_lin_up: lin_up[0],
        b_lin_up: lin_up[1],
        a_lin_down: lin_down[0],
        b_lin_down: lin_down[1],
    };
    log::debug!("fitted parameters: {:?}", params);

    Ok((params, report))
}

fn require(partition: &'static str, samples: &[(f64, f64)], needed: usize) -> Result<()> {
    if samples.len() < needed {
        return Err(PacerError::InputData {
            partition,
            needed,
            got: samples.len(),
        });
    }
    Ok(())
}

fn polyfit_pairs(samples: &[(f64, f64)], degree: usize) -> Result<Vec<f64>> {
    let xs: Vec<f64> = samples.iter().map(|s| s.0).collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.1).collect();
    polyfit(&xs, &ys, degree)
}

/// Least-squares polynomial fit. Coefficients are returned highest power first,
/// so a line comes back as `[slope, intercept]`.
///
/// x is scaled into [-1, 1] before the normal equations are formed.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    let terms = degree + 1;
    if xs.len() != ys.len() {
        return Err(PacerError::InvalidParameter(format!(
            "polyfit needs matching x/y lengths, got {} and {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.len() < terms {
        return Err(PacerError::DegenerateFit(format!(
            "degree {} fit needs at least {} points, got {}",
            degree,
            terms,
            xs.len()
        )));
    }

    let scale = xs.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(PacerError::DegenerateFit(
            "all x values are zero or non-finite".to_string(),
        ));
    }

    // normal equations, lowest power first
    let mut ata = vec![vec![0.0; terms]; terms];
    let mut aty = vec![0.0; terms];
    for (&x, &y) in xs.iter().zip(ys) {
        let u = x / scale;
        let mut powers = vec![1.0; 2 * terms - 1];
        for k in 1..powers.len() {
            powers[k] = powers[k - 1] * u;
        }
        for r in 0..terms {
            aty[r] += powers[r] * y;
            for c in 0..terms {
                ata[r][c] += powers[r + c];
            }
        }
    }

    let solution = solve(ata, aty, xs.len())?;

    let mut coefficients: Vec<f64> = solution
        .iter()
        .enumerate()
        .map(|(k, c)| c / scale.powi(k as i32))
        .collect();
    coefficients.reverse();

    if coefficients.iter().any(|c| !c.is_finite()) {
        return Err(PacerError::DegenerateFit(format!(
            "non-finite coefficients {:?}",
            coefficients
        )));
    }
    Ok(coefficients)
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>, sample_count: usize) -> Result<Vec<f64>> {
    let n = b.len();
    let tolerance = 1e-12 * sample_count as f64;

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= tolerance {
            return Err(PacerError::DegenerateFit(
                "singular system, x values are not spread enough for this degree".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
