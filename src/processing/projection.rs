use crate::data::geometry::Geometry;

const ALASKA: u32 = 2;
const HAWAII: u32 = 15;

/// Albers equal-area conic with the usual parallels for the contiguous US.
/// Output is in unit-sphere coordinates with y pointing north.
#[derive(Debug, Clone, Copy)]
pub struct Albers {
    n: f64,
    c: f64,
    rho0: f64,
    lon0: f64,
}

impl Default for Albers {
    fn default() -> Self {
        Self::new(29.5, 45.5, 37.5, -96.0)
    }
}

impl Albers {
    pub fn new(parallel1: f64, parallel2: f64, lat0: f64, lon0: f64) -> Self {
        let (p1, p2, l0) = (parallel1.to_radians(), parallel2.to_radians(), lat0.to_radians());
        let n = (p1.sin() + p2.sin()) / 2.0;
        let c = p1.cos().powi(2) + 2.0 * n * p1.sin();
        let rho0 = (c - 2.0 * n * l0.sin()).max(0.0).sqrt() / n;
        Self {
            n,
            c,
            rho0,
            lon0: lon0.to_radians(),
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> [f64; 2] {
        let rho = (self.c - 2.0 * self.n * lat.to_radians().sin()).max(0.0).sqrt() / self.n;
        let theta = self.n * (lon.to_radians() - self.lon0);
        [rho * theta.sin(), self.rho0 - rho * theta.cos()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min: [f64; 2],
    max: [f64; 2],
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min: [f64::INFINITY; 2],
            max: [f64::NEG_INFINITY; 2],
        }
    }

    fn add(&mut self, p: [f64; 2]) {
        for i in 0..2 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    fn is_valid(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    fn size(&self) -> [f64; 2] {
        [self.max[0] - self.min[0], self.max[1] - self.min[1]]
    }
}

/// Affine map from projected coordinates of one inset group onto screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Placement {
    scale: f64,
    src_min: [f64; 2],
    src_max_y: f64,
    dst_min: [f64; 2],
}

impl Placement {
    fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.dst_min[0] + (p[0] - self.src_min[0]) * self.scale,
            // Screen y grows downward.
            self.dst_min[1] + (self.src_max_y - p[1]) * self.scale,
        ]
    }
}

fn group_of(state_code: Option<u32>) -> usize {
    match state_code {
        Some(ALASKA) => 1,
        Some(HAWAII) => 2,
        _ => 0,
    }
}

/// Fits the projected geometry into a screen rectangle. Alaska and Hawaii are
/// moved into insets along the bottom-left corner.
#[derive(Debug, Clone, Copy)]
pub struct MapLayout {
    albers: Albers,
    placements: [Option<Placement>; 3],
}

impl MapLayout {
    /// `rect` is `[left, top, width, height]` in screen units.
    pub fn fit(geometry: &Geometry, rect: [f64; 4]) -> Self {
        let albers = Albers::default();
        let mut bounds = [Bounds::empty(); 3];
        for shape in &geometry.counties {
            let g = group_of(shape.id.map(|id| id / 1000));
            for poly in &shape.polygons {
                for [lon, lat] in poly.exterior() {
                    bounds[g].add(albers.project(lon, lat));
                }
            }
        }

        let [left, top, width, height] = rect;
        let fit_into = |b: &Bounds, dst: [f64; 4]| -> Option<Placement> {
            if !b.is_valid() {
                return None;
            }
            let [w, h] = b.size();
            let scale = if w <= 0.0 || h <= 0.0 {
                1.0
            } else {
                (dst[2] / w).min(dst[3] / h)
            };
            // Center inside the destination box.
            let dx = (dst[2] - w * scale) / 2.0;
            let dy = (dst[3] - h * scale) / 2.0;
            Some(Placement {
                scale,
                src_min: b.min,
                src_max_y: b.max[1],
                dst_min: [dst[0] + dx, dst[1] + dy],
            })
        };

        let has_insets = bounds[1].is_valid() || bounds[2].is_valid();
        let main_box = if has_insets {
            [left + width * 0.15, top, width * 0.85, height * 0.85]
        } else {
            [left, top, width, height]
        };
        let alaska_box = [left, top + height * 0.68, width * 0.22, height * 0.3];
        let hawaii_box = [left + width * 0.23, top + height * 0.82, width * 0.12, height * 0.16];

        Self {
            albers,
            placements: [
                fit_into(&bounds[0], main_box),
                fit_into(&bounds[1], alaska_box),
                fit_into(&bounds[2], hawaii_box),
            ],
        }
    }

    /// Screen position of a lon/lat point belonging to the given state.
    pub fn to_screen(&self, state_code: Option<u32>, lon: f64, lat: f64) -> Option<[f64; 2]> {
        let placement = self.placements[group_of(state_code)]?;
        Some(placement.apply(self.albers.project(lon, lat)))
    }
}
