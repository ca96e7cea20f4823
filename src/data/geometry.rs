use std::collections::HashMap;
use std::path::Path;

use geo::{Area, LineString, Polygon, TriangulateEarcut};
use serde::Deserialize;

use crate::error::LoadError;

/// One filled polygon in lon/lat degrees. Only the outer ring is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPolygon {
    pub polygon: Polygon<f64>,
    /// Fill triangles, indexing the closed exterior ring's coordinates.
    pub triangles: Vec<[u32; 3]>,
}

impl GeoPolygon {
    /// Polygon over an outer ring, closed if it isn't already. `None` for
    /// rings that enclose no area.
    pub fn new(ring: Vec<[f64; 2]>) -> Option<Self> {
        if ring.len() < 3 {
            return None;
        }
        let polygon = Polygon::new(LineString::from(ring), Vec::new());
        if !(polygon.unsigned_area() > 0.0) {
            return None;
        }
        let raw = polygon.earcut_triangles_raw();
        let triangles = raw
            .triangle_indices
            .chunks_exact(3)
            .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
            .collect();
        Some(Self { polygon, triangles })
    }

    /// Exterior coordinates, first point repeated at the end.
    pub fn exterior(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.polygon.exterior().coords().map(|c| [c.x, c.y])
    }
}

/// A county or state outline.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoShape {
    /// County FIPS for counties, two-digit state code for states.
    pub id: Option<u32>,
    pub name: Option<String>,
    pub polygons: Vec<GeoPolygon>,
}

/// Decoded geometry feed.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub counties: Vec<GeoShape>,
    pub states: Vec<GeoShape>,
}

#[derive(Debug, Deserialize)]
struct Topology {
    #[serde(default)]
    transform: Option<Transform>,
    arcs: Vec<Vec<Vec<f64>>>,
    objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Transform {
    scale: [f64; 2],
    translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        arcs: Vec<Vec<i64>>,
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<i64>>>,
        #[serde(default)]
        id: Option<serde_json::Value>,
        #[serde(default)]
        properties: Option<Properties>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(default)]
    name: Option<String>,
}

pub fn load_geometry(path: &Path) -> Result<Geometry, LoadError> {
    let text = std::fs::read_to_string(path)?;
    let geometry = parse_topology(&text)?;
    tracing::info!(
        "Loaded geometry from {}: {} counties, {} states",
        path.display(),
        geometry.counties.len(),
        geometry.states.len()
    );
    Ok(geometry)
}

/// Decode a TopoJSON topology with `counties` and `states` objects.
pub fn parse_topology(text: &str) -> Result<Geometry, LoadError> {
    let topo: Topology = serde_json::from_str(text)?;
    let arcs = decode_arcs(&topo.arcs, topo.transform)?;

    let object = |name: &str| {
        topo.objects
            .get(name)
            .ok_or_else(|| LoadError::Topology(format!("missing object `{name}`")))
    };

    let mut counties = Vec::new();
    collect_shapes(object("counties")?, &arcs, &mut counties)?;
    let mut states = Vec::new();
    if let Some(obj) = topo.objects.get("states") {
        collect_shapes(obj, &arcs, &mut states)?;
    }
    Ok(Geometry { counties, states })
}

/// Absolute lon/lat positions for every arc, undoing delta encoding when the
/// topology is quantized.
fn decode_arcs(raw: &[Vec<Vec<f64>>], transform: Option<Transform>) -> Result<Vec<Vec<[f64; 2]>>, LoadError> {
    raw.iter()
        .map(|arc| {
            let mut x = 0.0;
            let mut y = 0.0;
            arc.iter()
                .map(|pos| {
                    let (px, py) = match pos.as_slice() {
                        [px, py, ..] => (*px, *py),
                        _ => return Err(LoadError::Topology("arc position needs two coordinates".to_string())),
                    };
                    Ok(match transform {
                        Some(t) => {
                            x += px;
                            y += py;
                            [x * t.scale[0] + t.translate[0], y * t.scale[1] + t.translate[1]]
                        }
                        None => [px, py],
                    })
                })
                .collect()
        })
        .collect()
}

fn collect_shapes(
    geometry: &TopoGeometry,
    arcs: &[Vec<[f64; 2]>],
    out: &mut Vec<GeoShape>,
) -> Result<(), LoadError> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            for g in geometries {
                collect_shapes(g, arcs, out)?;
            }
        }
        TopoGeometry::Polygon { arcs: rings, id, properties } => {
            out.push(GeoShape {
                id: id.as_ref().and_then(parse_id),
                name: properties.as_ref().and_then(|p| p.name.clone()),
                polygons: polygon(rings, arcs)?.into_iter().collect(),
            });
        }
        TopoGeometry::MultiPolygon { arcs: polys, id, properties } => {
            let mut polygons = Vec::new();
            for rings in polys {
                polygons.extend(polygon(rings, arcs)?);
            }
            out.push(GeoShape {
                id: id.as_ref().and_then(parse_id),
                name: properties.as_ref().and_then(|p| p.name.clone()),
                polygons,
            });
        }
        TopoGeometry::Other => {}
    }
    Ok(())
}

/// us-atlas ids are zero-padded strings ("01001"); plain numbers also occur.
fn parse_id(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        _ => None,
    }
}

/// Outer ring only; holes are not filled separately.
fn polygon(rings: &[Vec<i64>], arcs: &[Vec<[f64; 2]>]) -> Result<Option<GeoPolygon>, LoadError> {
    let Some(outer) = rings.first() else {
        return Ok(None);
    };
    let ring = stitch_ring(outer, arcs)?;
    let polygon = GeoPolygon::new(ring);
    if polygon.is_none() {
        tracing::debug!("Dropped a ring with no area ({} arcs)", outer.len());
    }
    Ok(polygon)
}

fn stitch_ring(indices: &[i64], arcs: &[Vec<[f64; 2]>]) -> Result<Vec<[f64; 2]>, LoadError> {
    let mut ring: Vec<[f64; 2]> = Vec::new();
    for &index in indices {
        // Negative indices reference the one's complement arc, reversed.
        let (arc_idx, reversed) = if index < 0 { (!index, true) } else { (index, false) };
        let arc = usize::try_from(arc_idx)
            .ok()
            .and_then(|i| arcs.get(i))
            .ok_or_else(|| LoadError::Topology(format!("arc index {index} out of range")))?;
        let points: Vec<[f64; 2]> = if reversed {
            arc.iter().rev().copied().collect()
        } else {
            arc.clone()
        };
        // Consecutive arcs share their joining point.
        let skip = usize::from(!ring.is_empty());
        ring.extend(points.into_iter().skip(skip));
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two unit squares sharing an edge, quantized with scale 1, translate 0.
    const TOPO: &str = r#"{
      "type": "Topology",
      "transform": {"scale": [1, 1], "translate": [-100, 30]},
      "arcs": [
        [[1, 0], [0, 1]],
        [[1, 1], [-1, 0], [0, -1], [1, 0]],
        [[1, 0], [1, 0], [0, 1], [-1, 0]]
      ],
      "objects": {
        "counties": {"type": "GeometryCollection", "geometries": [
          {"type": "Polygon", "id": "01001", "arcs": [[0, 1]]},
          {"type": "Polygon", "id": 1003, "arcs": [[2, -1]]},
          {"type": "Point"}
        ]},
        "states": {"type": "GeometryCollection", "geometries": [
          {"type": "MultiPolygon", "id": "01", "properties": {"name": "Alabama"},
           "arcs": [[[1, 2]]]}
        ]}
      }
    }"#;

    #[test]
    fn decodes_quantized_topology() {
        let geo = parse_topology(TOPO).unwrap();
        assert_eq!(geo.counties.len(), 2);
        assert_eq!(geo.counties[0].id, Some(1001));
        assert_eq!(geo.counties[1].id, Some(1003));
        assert_eq!(geo.states[0].name.as_deref(), Some("Alabama"));
        assert_eq!(geo.states[0].id, Some(1));

        let ring: Vec<[f64; 2]> = geo.counties[0].polygons[0].exterior().collect();
        assert_eq!(
            ring,
            vec![[-99.0, 30.0], [-99.0, 31.0], [-100.0, 31.0], [-100.0, 30.0], [-99.0, 30.0]]
        );
        // Reversed arc stitches back onto the shared edge.
        let ring: Vec<[f64; 2]> = geo.counties[1].polygons[0].exterior().collect();
        assert_eq!(ring.len(), 5);
        assert!(ring.contains(&[-98.0, 31.0]));
        assert_eq!(geo.counties[1].polygons[0].triangles.len(), 2);
    }

    #[test]
    fn rejects_missing_counties_object() {
        let err = parse_topology(r#"{"type":"Topology","arcs":[],"objects":{}}"#).unwrap_err();
        assert!(matches!(err, LoadError::Topology(_)));
    }

    #[test]
    fn rejects_bad_arc_reference() {
        let text = r#"{"type":"Topology","arcs":[],"objects":{"counties":
            {"type":"Polygon","id":"1","arcs":[[4]]}}}"#;
        assert!(matches!(parse_topology(text), Err(LoadError::Topology(_))));
    }

    fn mesh_area(poly: &GeoPolygon) -> f64 {
        let pts: Vec<[f64; 2]> = poly.exterior().collect();
        poly.triangles
            .iter()
            .map(|t| {
                let [a, b, c] = t.map(|i| pts[i as usize]);
                ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])).abs() / 2.0
            })
            .sum()
    }

    #[test]
    fn triangulates_concave_ring() {
        // L-shape: 6 vertices -> 4 triangles.
        let poly = GeoPolygon::new(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0], [1.0, 2.0], [0.0, 2.0]]).unwrap();
        assert_eq!(poly.triangles.len(), 4);
        assert!((mesh_area(&poly) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_rings_are_handled() {
        let poly = GeoPolygon::new(vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]).unwrap();
        assert_eq!(poly.triangles.len(), 2);
        assert!((mesh_area(&poly) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_rings_are_dropped() {
        assert!(GeoPolygon::new(vec![[0.0, 0.0], [1.0, 1.0]]).is_none());
        // Collinear: no area to fill.
        assert!(GeoPolygon::new(vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]).is_none());
    }
}
