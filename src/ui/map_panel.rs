use std::sync::Arc;

use egui::{Color32, Mesh, Pos2, Rect, Sense, Shape, Stroke};
use geo::{BoundingRect, Contains, Coord, LineString, Polygon};

use crate::data::geometry::{GeoShape, Geometry};
use crate::processing::evaluator::{count_passing, passes, passes_unmatched};
use crate::processing::projection::MapLayout;
use crate::processing::scales::{format_tick_value, region_color, SequentialScale};
use crate::state::broadcast::{Panel, PanelId, RefreshContext};
use crate::state::filter_state::{FilterCommand, GeoFilter, GeoMode, ResetScope};
use crate::state::record_store::{RecordStore, AVG_SCORE_COLUMN, WELLBEING_COLUMN};
use crate::state::theme::Theme;
use crate::ui::widgets::{toolbar_btn, toolbar_toggle_btn};

const LEGEND_HEIGHT: f32 = 30.0;

/// Column the county fill encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMetric {
    #[default]
    AvgScore,
    Wellbeing,
}

impl MapMetric {
    pub const ALL: [MapMetric; 2] = [MapMetric::AvgScore, MapMetric::Wellbeing];

    pub fn label(&self) -> &'static str {
        match self {
            MapMetric::AvgScore => "Avg. anxiety/depression",
            MapMetric::Wellbeing => "Wellbeing",
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            MapMetric::AvgScore => AVG_SCORE_COLUMN,
            MapMetric::Wellbeing => WELLBEING_COLUMN,
        }
    }
}

/// Fill of one county. `fill` is `None` for the no-data style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountyStyle {
    pub fill: Option<Color32>,
    pub dimmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineStyle {
    pub color: Color32,
    pub dimmed: bool,
}

/// Everything the map draws, parallel to the geometry's county and state lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapView {
    pub scale: Option<SequentialScale>,
    pub counties: Vec<CountyStyle>,
    pub states: Vec<OutlineStyle>,
    pub passing: usize,
    pub total: usize,
}

/// Projected outer ring of one polygon, with the index of the polygon it came
/// from so triangles can be looked up.
struct ScreenRing {
    polygon: usize,
    points: Vec<Pos2>,
    /// Hit-test shape in screen space.
    outline: Polygon<f64>,
    bounds: geo::Rect<f64>,
}

struct ScreenCache {
    rect: Rect,
    counties: Vec<Vec<ScreenRing>>,
    states: Vec<Vec<ScreenRing>>,
}

pub struct MapPanel {
    geometry: Arc<Geometry>,
    base: Arc<RecordStore>,
    regions: Vec<String>,
    metric: MapMetric,
    mode: GeoMode,
    view: MapView,
    cache: Option<ScreenCache>,
}

impl MapPanel {
    pub fn new(geometry: Arc<Geometry>, base: Arc<RecordStore>, metric: MapMetric, mode: GeoMode) -> Self {
        let regions = base.regions();
        Self {
            geometry,
            base,
            regions,
            metric,
            mode,
            view: MapView::default(),
            cache: None,
        }
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn metric(&self) -> MapMetric {
        self.metric
    }

    pub fn mode(&self) -> GeoMode {
        self.mode
    }

    /// Switch the encoded column. Recolors locally; filter state is untouched.
    pub fn set_metric(&mut self, metric: MapMetric, ctx: &RefreshContext<'_>) {
        if self.metric != metric {
            tracing::debug!("Map metric -> {}", metric.label());
            self.metric = metric;
            self.view = self.compute_view(ctx);
        }
    }

    /// Switch what a click selects. The current geography filter is kept.
    pub fn set_mode(&mut self, mode: GeoMode) {
        if self.mode != mode {
            tracing::debug!("Map geo mode -> {}", mode.label());
            self.mode = mode;
        }
    }

    /// Command for a click on county `fips` in the current mode.
    pub fn click_command(&self, fips: u32) -> Option<FilterCommand> {
        self.mode
            .target_for(&self.base, fips)
            .map(FilterCommand::ToggleGeo)
    }

    fn compute_view(&self, ctx: &RefreshContext<'_>) -> MapView {
        let column = self.metric.column();
        let scale = self.base.extent(column).map(SequentialScale::new);
        if scale.is_none() {
            tracing::warn!("No finite {column} values; map has no color scale");
        }

        let counties = self
            .geometry
            .counties
            .iter()
            .map(|shape| match shape.id.and_then(|fips| ctx.store.get(fips)) {
                Some(record) => CountyStyle {
                    fill: record.value(column).zip(scale).map(|(v, s)| s.color(v)),
                    dimmed: !passes(record, ctx.clusters, ctx.filter),
                },
                None => CountyStyle {
                    fill: None,
                    dimmed: match shape.id {
                        Some(fips) => !passes_unmatched(fips, &self.base, ctx.clusters, ctx.filter),
                        None => ctx.filter.geo().is_active(),
                    },
                },
            })
            .collect();

        let states = self
            .geometry
            .states
            .iter()
            .map(|shape| {
                let name = shape.name.as_deref();
                let region = name.and_then(|n| self.base.region_of_state(n));
                let color = region.map_or(Color32::from_gray(136), |r| region_color(r, &self.regions));
                let dimmed = match ctx.filter.geo() {
                    GeoFilter::None => false,
                    GeoFilter::State(s) => name != Some(s.as_str()),
                    GeoFilter::Region(r) => region != Some(r.as_str()),
                };
                OutlineStyle { color, dimmed }
            })
            .collect();

        MapView {
            scale,
            counties,
            states,
            passing: count_passing(ctx.store, ctx.clusters, ctx.filter),
            total: ctx.store.len(),
        }
    }

    fn ensure_cache(&mut self, rect: Rect) {
        if self.cache.as_ref().is_some_and(|c| c.rect == rect) {
            return;
        }
        let layout = MapLayout::fit(
            &self.geometry,
            [rect.left() as f64, rect.top() as f64, rect.width() as f64, rect.height() as f64],
        );
        let project = |state: Option<u32>, shape: &GeoShape| -> Vec<ScreenRing> {
            shape
                .polygons
                .iter()
                .enumerate()
                .filter_map(|(polygon, poly)| {
                    let coords: Vec<Coord<f64>> = poly
                        .exterior()
                        .map(|[lon, lat]| layout.to_screen(state, lon, lat).map(|[x, y]| Coord { x, y }))
                        .collect::<Option<_>>()?;
                    let points = coords.iter().map(|c| Pos2::new(c.x as f32, c.y as f32)).collect();
                    let outline = Polygon::new(LineString::new(coords), Vec::new());
                    let bounds = outline.bounding_rect()?;
                    Some(ScreenRing {
                        polygon,
                        points,
                        outline,
                        bounds,
                    })
                })
                .collect()
        };
        let counties = self
            .geometry
            .counties
            .iter()
            .map(|s| project(s.id.map(|id| id / 1000), s))
            .collect();
        let states = self.geometry.states.iter().map(|s| project(s.id, s)).collect();
        self.cache = Some(ScreenCache {
            rect,
            counties,
            states,
        });
    }

    /// Index of the county under a screen position.
    fn county_at(&self, pos: Pos2) -> Option<usize> {
        let cache = self.cache.as_ref()?;
        let p = Coord {
            x: pos.x as f64,
            y: pos.y as f64,
        };
        cache
            .counties
            .iter()
            .position(|rings| rings.iter().any(|ring| ring.bounds.contains(&p) && ring.outline.contains(&p)))
    }

    pub fn show(&mut self, ui: &mut egui::Ui, ctx: &RefreshContext<'_>, theme: &Theme) -> Option<FilterCommand> {
        let mut command = None;

        ui.horizontal(|ui| {
            ui.label("Click selects:");
            for mode in [GeoMode::State, GeoMode::Region] {
                if toolbar_toggle_btn(ui, mode.label(), self.mode == mode).clicked() {
                    self.set_mode(mode);
                }
            }
            ui.separator();
            let mut metric = self.metric;
            egui::ComboBox::from_id_salt("map_metric")
                .selected_text(metric.label())
                .show_ui(ui, |ui| {
                    for m in MapMetric::ALL {
                        ui.selectable_value(&mut metric, m, m.label());
                    }
                });
            self.set_metric(metric, ctx);
            ui.separator();
            if toolbar_btn(ui, "Reset map").clicked() {
                command = Some(FilterCommand::Reset(ResetScope::Map));
            }
        });

        let size = ui.available_size();
        let (response, painter) = ui.allocate_painter(size, Sense::click());
        let map_rect = Rect::from_min_max(
            response.rect.min,
            Pos2::new(response.rect.max.x, response.rect.max.y - LEGEND_HEIGHT),
        );
        if map_rect.width() < 10.0 || map_rect.height() < 10.0 {
            return command;
        }
        self.ensure_cache(map_rect);
        let Some(cache) = self.cache.as_ref() else {
            return command;
        };

        let mut mesh = Mesh::default();
        for (i, rings) in cache.counties.iter().enumerate() {
            let Some(style) = self.view.counties.get(i) else {
                continue;
            };
            let base_color = style.fill.unwrap_or(theme.no_data_color());
            let color = if style.dimmed { theme.dim(base_color) } else { base_color };
            for ring in rings {
                let Some(poly) = self.geometry.counties[i].polygons.get(ring.polygon) else {
                    continue;
                };
                let offset = mesh.vertices.len() as u32;
                for &p in &ring.points {
                    mesh.colored_vertex(p, color);
                }
                for t in &poly.triangles {
                    mesh.add_triangle(offset + t[0], offset + t[1], offset + t[2]);
                }
            }
        }
        painter.add(Shape::mesh(mesh));

        for (i, rings) in cache.states.iter().enumerate() {
            let Some(style) = self.view.states.get(i) else {
                continue;
            };
            let (color, width) = if style.dimmed {
                (theme.dim(style.color), 0.8)
            } else {
                (style.color, 1.6)
            };
            for ring in rings {
                painter.add(Shape::closed_line(ring.points.clone(), Stroke::new(width, color)));
            }
        }

        let hovered = response.hover_pos().and_then(|p| self.county_at(p));
        if let Some(i) = hovered {
            for ring in &cache.counties[i] {
                painter.add(Shape::closed_line(ring.points.clone(), Stroke::new(1.5, theme.axis_color())));
            }
        }

        self.draw_legend(&painter, response.rect, theme);

        if response.clicked() {
            let clicked = response
                .interact_pointer_pos()
                .and_then(|p| self.county_at(p))
                .and_then(|i| self.geometry.counties[i].id);
            if let Some(fips) = clicked {
                command = self.click_command(fips).or(command);
            }
        }

        if let Some(i) = hovered {
            let shape = &self.geometry.counties[i];
            let column = self.metric.column();
            let text = match shape.id {
                Some(fips) => {
                    let place = self.base.derive_state(fips).unwrap_or("Unknown state");
                    let value = ctx
                        .store
                        .get(fips)
                        .and_then(|r| r.value(column))
                        .map_or("no data".to_string(), |v| format!("{v:.2}"));
                    let name = shape.name.clone().unwrap_or_else(|| format!("{fips:05}"));
                    format!("{name} ({place})\n{}: {value}", self.metric.label())
                }
                None => "Unknown county".to_string(),
            };
            response.on_hover_text_at_pointer(text);
        }

        command
    }

    fn draw_legend(&self, painter: &egui::Painter, rect: Rect, theme: &Theme) {
        let top = rect.bottom() - LEGEND_HEIGHT + 6.0;
        let font = egui::FontId::proportional(11.0);
        let text_color = theme.axis_color();
        let mut x = rect.left() + 4.0;

        if let Some(scale) = self.view.scale {
            let width = 160.0;
            let steps = 32;
            for s in 0..steps {
                let t = s as f64 / (steps - 1) as f64;
                let v = scale.domain.0 + t * (scale.domain.1 - scale.domain.0);
                let x0 = x + width * s as f32 / steps as f32;
                painter.rect_filled(
                    Rect::from_min_size(Pos2::new(x0, top), egui::vec2(width / steps as f32 + 0.5, 10.0)),
                    0.0,
                    scale.color(v),
                );
            }
            painter.text(
                Pos2::new(x, top + 12.0),
                egui::Align2::LEFT_TOP,
                format_tick_value(scale.domain.0),
                font.clone(),
                text_color,
            );
            painter.text(
                Pos2::new(x + width, top + 12.0),
                egui::Align2::RIGHT_TOP,
                format_tick_value(scale.domain.1),
                font.clone(),
                text_color,
            );
            x += width + 16.0;
        }

        painter.rect_filled(Rect::from_min_size(Pos2::new(x, top), egui::vec2(10.0, 10.0)), 0.0, theme.no_data_color());
        painter.text(Pos2::new(x + 14.0, top - 1.0), egui::Align2::LEFT_TOP, "No data", font.clone(), text_color);

        painter.text(
            Pos2::new(rect.right() - 4.0, top - 1.0),
            egui::Align2::RIGHT_TOP,
            format!("{} of {} counties shown", self.view.passing, self.view.total),
            font,
            text_color,
        );
    }
}

impl Panel for MapPanel {
    fn id(&self) -> PanelId {
        PanelId::Map
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) {
        self.view = self.compute_view(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_geometry, fixture_store};
    use crate::state::filter_state::FilterState;
    use crate::state::record_store::ClusterAssignment;

    fn panel(mode: GeoMode) -> MapPanel {
        MapPanel::new(Arc::new(fixture_geometry()), fixture_store(), MapMetric::AvgScore, mode)
    }

    fn style_of(panel: &MapPanel, fips: u32) -> CountyStyle {
        let i = panel
            .geometry
            .counties
            .iter()
            .position(|s| s.id == Some(fips))
            .unwrap();
        panel.view().counties[i]
    }

    #[test]
    fn hit_test_finds_the_county_under_the_cursor() {
        let mut map = panel(GeoMode::State);
        let rect = Rect::from_min_size(Pos2::new(0.0, 0.0), egui::vec2(800.0, 500.0));
        map.ensure_cache(rect);
        let layout = MapLayout::fit(&map.geometry, [0.0, 0.0, 800.0, 500.0]);
        let at = |lon: f64, lat: f64| {
            let [x, y] = layout.to_screen(Some(1), lon, lat).unwrap();
            map.county_at(Pos2::new(x as f32, y as f32))
        };
        // Centers of 1001 and 1003, then open water south of both.
        assert_eq!(at(-87.5, 32.5), Some(0));
        assert_eq!(at(-86.5, 32.5), Some(1));
        assert_eq!(at(-87.5, 31.0), None);
    }

    #[test]
    fn fills_from_full_store_domain() {
        let store = fixture_store().project(&[]);
        let filter = FilterState::new();
        let ctx = RefreshContext {
            store: &store,
            clusters: None,
            filter: &filter,
        };
        let mut map = panel(GeoMode::State);
        map.refresh(&ctx);

        assert_eq!(map.view().scale, Some(SequentialScale::new((25.0, 60.0))));
        let lowest = style_of(&map, 13001);
        let highest = style_of(&map, 36001);
        assert_eq!(lowest.fill, Some(SequentialScale::new((25.0, 60.0)).color(25.0)));
        assert_ne!(lowest.fill, highest.fill);
        // No row for 1005 or 99001.
        assert_eq!(style_of(&map, 1005).fill, None);
        assert!(!style_of(&map, 99001).dimmed);
        assert_eq!((map.view().passing, map.view().total), (6, 6));
    }

    #[test]
    fn geo_filter_dims_counties_and_outlines() {
        let store = fixture_store().project(&[]);
        let mut filter = FilterState::new();
        filter.set_geo(GeoFilter::State("Alabama".to_string()));
        let ctx = RefreshContext {
            store: &store,
            clusters: None,
            filter: &filter,
        };
        let mut map = panel(GeoMode::State);
        map.refresh(&ctx);

        assert!(!style_of(&map, 1001).dimmed);
        assert!(style_of(&map, 36001).dimmed);
        // Unmatched counties follow their derived state.
        assert!(!style_of(&map, 1005).dimmed);
        assert!(style_of(&map, 99001).dimmed);

        let outlines: Vec<bool> = map.view().states.iter().map(|s| s.dimmed).collect();
        assert_eq!(outlines, vec![false, true, true, true]);

        filter.set_geo(GeoFilter::Region("South".to_string()));
        let ctx = RefreshContext {
            store: &store,
            clusters: None,
            filter: &filter,
        };
        map.refresh(&ctx);
        let outlines: Vec<bool> = map.view().states.iter().map(|s| s.dimmed).collect();
        assert_eq!(outlines, vec![false, false, true, true]);
        assert_eq!(map.view().passing, 3);
    }

    #[test]
    fn metric_switch_recolors_without_filter_change() {
        let store = fixture_store().project(&[]);
        let filter = FilterState::new();
        let ctx = RefreshContext {
            store: &store,
            clusters: None,
            filter: &filter,
        };
        let mut map = panel(GeoMode::State);
        map.refresh(&ctx);
        map.set_metric(MapMetric::Wellbeing, &ctx);
        assert_eq!(map.view().scale, Some(SequentialScale::new((49.0, 60.0))));
        assert!(filter.is_unfiltered());
    }

    #[test]
    fn click_follows_mode() {
        let mut map = panel(GeoMode::State);
        assert_eq!(
            map.click_command(36001),
            Some(FilterCommand::ToggleGeo(GeoFilter::State("New York".to_string())))
        );
        map.set_mode(GeoMode::Region);
        assert_eq!(
            map.click_command(1005),
            Some(FilterCommand::ToggleGeo(GeoFilter::Region("South".to_string())))
        );
        assert_eq!(map.click_command(99001), None);
    }

    #[test]
    fn unmatched_county_dims_with_its_cluster() {
        let store = fixture_store().project(&[]);
        let clusters = ClusterAssignment::new(3, [(1001, 0), (1005, 1)]);
        let mut filter = FilterState::new();
        filter.init_clusters(3);
        filter.set_cluster_enabled(1, false);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut map = panel(GeoMode::State);
        map.refresh(&ctx);

        assert!(style_of(&map, 1005).dimmed);
        assert_eq!(style_of(&map, 1005).fill, None);
        assert!(!style_of(&map, 1001).dimmed);
        // 99001 has no assignment, so no cluster predicate applies to it.
        assert!(!style_of(&map, 99001).dimmed);
    }
}
