use std::collections::HashMap;

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;

/// Points per leaf bucket.
const BUCKET: usize = 64;

/// Stored positions are rotated by this angle. Distances are unchanged, and
/// points sharing an x or a y value no longer share a coordinate on either
/// split axis.
const ROTATION: f64 = 0.5;

/// 2D KD-tree over plotted points for nearest-county hover lookup.
///
/// Counties at the same position share one tree entry, so ties of any size
/// (a state-level score copied to every county, a zero-width extent) never
/// overflow a bucket.
pub struct HoverTree {
    tree: KdTree<f64, u64, 2, BUCKET, u32>,
    /// Counties at each distinct position, indexed by tree item.
    slots: Vec<Vec<u32>>,
    sin: f64,
    cos: f64,
}

impl HoverTree {
    /// Build from `(fips, x, y)` triples. Non-finite points are skipped.
    /// Coordinates should already be normalized so both axes weigh equally.
    pub fn build(points: impl IntoIterator<Item = (u32, f64, f64)>) -> Self {
        let (sin, cos) = ROTATION.sin_cos();
        let mut tree: KdTree<f64, u64, 2, BUCKET, u32> = KdTree::new();
        let mut slots: Vec<Vec<u32>> = Vec::new();
        let mut by_position: HashMap<(u64, u64), usize> = HashMap::new();

        for (fips, x, y) in points {
            if !(x.is_finite() && y.is_finite()) {
                continue;
            }
            // `+ 0.0` folds -0.0 into 0.0 before keying on the bits.
            let key = ((x + 0.0).to_bits(), (y + 0.0).to_bits());
            match by_position.get(&key) {
                Some(&slot) => slots[slot].push(fips),
                None => {
                    let slot = slots.len();
                    tree.add(&rotate(sin, cos, x, y), slot as u64);
                    by_position.insert(key, slot);
                    slots.push(vec![fips]);
                }
            }
        }

        Self { tree, slots, sin, cos }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nearest point to (qx, qy): the counties at that position and the
    /// euclidean distance.
    pub fn nearest_all(&self, qx: f64, qy: f64) -> Option<(&[u32], f64)> {
        if self.is_empty() {
            return None;
        }
        let result = self
            .tree
            .nearest_one::<SquaredEuclidean>(&rotate(self.sin, self.cos, qx, qy));
        let slot = self.slots.get(result.item as usize)?;
        Some((slot.as_slice(), result.distance.sqrt()))
    }

    /// Nearest point to (qx, qy) as (fips, euclidean distance). With several
    /// counties at that position, the first one added wins.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<(u32, f64)> {
        let (slot, dist) = self.nearest_all(qx, qy)?;
        slot.first().map(|&fips| (fips, dist))
    }
}

fn rotate(sin: f64, cos: f64, x: f64, y: f64) -> [f64; 2] {
    [x * cos - y * sin, x * sin + y * cos]
}
