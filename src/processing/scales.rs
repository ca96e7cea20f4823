use egui::Color32;

/// Linear mapping from a data domain onto a pixel range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if (d1 - d0).abs() < f64::EPSILON {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if (r1 - r0).abs() < f64::EPSILON {
            return d0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }
}

/// 1, 2 or 5 times a power of ten, close to `range / count`.
pub fn nice_step(range: f64, count: usize) -> Option<f64> {
    if range <= 0.0 || !range.is_finite() || count == 0 {
        return None;
    }
    let raw_step = range / count as f64;
    let order = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / order;
    let step = if normalized <= 1.0 {
        order
    } else if normalized <= 2.0 {
        2.0 * order
    } else if normalized <= 5.0 {
        5.0 * order
    } else {
        10.0 * order
    };
    Some(step)
}

/// Extend a domain outward to round tick boundaries.
pub fn nice_domain(min: f64, max: f64, count: usize) -> (f64, f64) {
    match nice_step(max - min, count) {
        Some(step) => ((min / step).floor() * step, (max / step).ceil() * step),
        None => (min, max),
    }
}

/// Round tick values inside `[min, max]`.
pub fn ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    let Some(step) = nice_step(max - min, count) else {
        return if min.is_finite() { vec![min] } else { Vec::new() };
    };
    let start = (min / step).ceil() as i64;
    let end = (max / step).floor() as i64;
    (start..=end).map(|i| i as f64 * step).collect()
}

/// Format a numeric value for axis tick labels.
pub fn format_tick_value(val: f64) -> String {
    if val.abs() >= 1e6 || (val != 0.0 && val.abs() < 1e-3) {
        format!("{val:.2e}")
    } else if val == 0.0 {
        "0".to_string()
    } else {
        let s = format!("{val:.6}");
        let s = s.trim_end_matches('0');
        let s = s.trim_end_matches('.');
        s.to_string()
    }
}

/// Sequential color scale over a fixed domain, ColorBrewer "Blues".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequentialScale {
    pub domain: (f64, f64),
}

impl SequentialScale {
    pub fn new(domain: (f64, f64)) -> Self {
        Self { domain }
    }

    pub fn color(&self, v: f64) -> Color32 {
        let (d0, d1) = self.domain;
        let t = if (d1 - d0).abs() < f64::EPSILON {
            0.5
        } else {
            ((v - d0) / (d1 - d0)).clamp(0.0, 1.0)
        };
        to_color32(colorous::BLUES.eval_continuous(t))
    }
}

fn to_color32(c: colorous::Color) -> Color32 {
    Color32::from_rgb(c.r, c.g, c.b)
}

/// d3 "category10", used for clusters.
pub fn cluster_color(cluster: usize) -> Color32 {
    to_color32(colorous::CATEGORY10[cluster % colorous::CATEGORY10.len()])
}

/// Tableau 10, used for donut slices.
pub fn category_color(index: usize) -> Color32 {
    to_color32(colorous::TABLEAU10[index % colorous::TABLEAU10.len()])
}

const REGION_PALETTE: [(&str, [u8; 3]); 4] = [
    ("Northeast", [228, 87, 110]),
    ("Midwest", [78, 121, 167]),
    ("South", [118, 183, 178]),
    ("West", [242, 142, 44]),
];

/// Outline color for a region. Known census regions get their fixed color;
/// anything else cycles through the same palette by its position in the
/// sorted region list.
pub fn region_color(region: &str, regions: &[String]) -> Color32 {
    if let Some((_, c)) = REGION_PALETTE.iter().find(|(name, _)| *name == region) {
        return Color32::from_rgb(c[0], c[1], c[2]);
    }
    match regions.iter().position(|r| r == region) {
        Some(i) => {
            let [r, g, b] = REGION_PALETTE[i % REGION_PALETTE.len()].1;
            Color32::from_rgb(r, g, b)
        }
        None => Color32::from_gray(136),
    }
}
