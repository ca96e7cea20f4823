use crate::state::filter_state::Interval;

/// Number of histogram bins.
pub const BIN_COUNT: usize = 30;

/// One histogram bar: `[x0, x1)` and how many values fell into it. The last
/// bin is closed on the right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub count: usize,
}

/// Split the finite values into `n` equal-width bins over their extent.
/// Empty input gives no bins; a zero-width extent gives a single bin.
pub fn bin_values(values: &[f64], n: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || n == 0 {
        return Vec::new();
    }
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if (max - min).abs() < f64::EPSILON {
        return vec![Bin {
            x0: min,
            x1: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / n as f64;
    let mut bins: Vec<Bin> = (0..n)
        .map(|i| Bin {
            x0: min + i as f64 * width,
            x1: if i + 1 == n { max } else { min + (i + 1) as f64 * width },
            count: 0,
        })
        .collect();

    for v in finite {
        let idx = (((v - min) / width).floor() as usize).min(n - 1);
        bins[idx].count += 1;
    }
    bins
}

/// A bar is dimmed when its edges leave the brushed value range or its count
/// leaves the brushed count range.
pub fn bar_dimmed(bin: &Bin, x_range: Option<&Interval>, y_range: Option<&Interval>) -> bool {
    if let Some(x) = x_range {
        if bin.x0 < x.min || bin.x1 > x.max {
            return true;
        }
    }
    if let Some(y) = y_range {
        let c = bin.count as f64;
        if c < y.min || c > y.max {
            return true;
        }
    }
    false
}
