use std::collections::BTreeSet;

use egui::{Pos2, Rect, Sense, Stroke};

use crate::data::analysis::TopVariable;
use crate::processing::binning::{bar_dimmed, bin_values, Bin, BIN_COUNT};
use crate::processing::evaluator::{passing, Predicates};
use crate::processing::kd_tree::HoverTree;
use crate::processing::scales::cluster_color;
use crate::state::broadcast::{Panel, PanelId, RefreshContext};
use crate::state::filter_state::{BrushSelection, FilterCommand, Interval, ResetScope};
use crate::state::record_store::{extent, AVG_SCORE_COLUMN};
use crate::state::theme::Theme;
use crate::ui::plot_frame::{track_brush, BrushGesture, PlotFrame};
use crate::ui::widgets::toolbar_btn;

/// Which brushable chart occupies the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushKind {
    #[default]
    Histogram,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint {
    pub fips: u32,
    pub cluster: Option<usize>,
    pub x: f64,
    pub y: f64,
    pub dimmed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum BrushView {
    #[default]
    Empty,
    Histogram {
        bins: Vec<Bin>,
        dimmed: Vec<bool>,
    },
    Scatter {
        points: Vec<ScatterPoint>,
    },
}

/// Histogram of one variable over the geography/cluster subset, or a scatter
/// of the average score against one variable. Both write the shared brush.
pub struct BrushPanel {
    kind: BrushKind,
    variables: Vec<TopVariable>,
    selected: usize,
    view: BrushView,
    /// Scatter hover lookup in unit-normalized coordinates, with the extents
    /// used to normalize.
    hover: Option<(HoverTree, (f64, f64), (f64, f64))>,
    anchor: Option<Pos2>,
}

impl BrushPanel {
    pub fn new(kind: BrushKind, variables: Vec<TopVariable>) -> Self {
        if variables.is_empty() {
            tracing::warn!("No variables offered for the {kind:?} panel");
        }
        Self {
            kind,
            variables,
            selected: 0,
            view: BrushView::Empty,
            hover: None,
            anchor: None,
        }
    }

    pub fn view(&self) -> &BrushView {
        &self.view
    }

    pub fn kind(&self) -> BrushKind {
        self.kind
    }

    /// Short name of the selected variable.
    pub fn variable(&self) -> Option<&str> {
        self.variables.get(self.selected).map(|v| v.short.as_str())
    }

    /// Pick another variable and recompute this panel. A histogram range
    /// brush drawn on the previous variable no longer has a bar to sit on, so
    /// the returned command clears it.
    pub fn select_variable(&mut self, index: usize, ctx: &RefreshContext<'_>) -> Option<FilterCommand> {
        if index == self.selected || index >= self.variables.len() {
            return None;
        }
        self.selected = index;
        let var = self.variables[index].short.as_str();
        tracing::debug!("{:?} variable -> {var}", self.kind);
        let stale = matches!(
            ctx.filter.range_brush(),
            Some(BrushSelection::Range { axis, .. }) if axis != var
        );
        self.refresh(ctx);
        stale.then_some(FilterCommand::ClearRangeBrush)
    }

    fn compute_view(&self, ctx: &RefreshContext<'_>) -> BrushView {
        let Some(var) = self.variable() else {
            return BrushView::Empty;
        };
        match self.kind {
            BrushKind::Histogram => {
                let values: Vec<f64> = passing(ctx.store, ctx.clusters, ctx.filter, Predicates::GEO_CLUSTER)
                    .filter_map(|r| r.value(var))
                    .collect();
                let bins = bin_values(&values, BIN_COUNT);
                let (x, y) = match ctx.filter.range_brush() {
                    Some(BrushSelection::Range { axis, x, y }) if axis == var => (Some(x), Some(y)),
                    _ => (None, None),
                };
                let dimmed = bins.iter().map(|b| bar_dimmed(b, x, y)).collect();
                BrushView::Histogram { bins, dimmed }
            }
            BrushKind::Scatter => {
                let members = match ctx.filter.range_brush() {
                    Some(BrushSelection::Members(set)) => Some(set),
                    _ => None,
                };
                let points = passing(ctx.store, ctx.clusters, ctx.filter, Predicates::ALL.without_brush())
                    .filter_map(|r| {
                        Some(ScatterPoint {
                            fips: r.fips(),
                            cluster: ctx.clusters.and_then(|c| c.cluster_of(r.fips())),
                            x: r.value(AVG_SCORE_COLUMN)?,
                            y: r.value(var)?,
                            dimmed: members.is_some_and(|set| !set.contains(&r.fips())),
                        })
                    })
                    .collect();
                BrushView::Scatter { points }
            }
        }
    }

    fn rebuild_hover(&mut self) {
        self.hover = match &self.view {
            BrushView::Scatter { points } => {
                let xe = extent(points.iter().map(|p| p.x));
                let ye = extent(points.iter().map(|p| p.y));
                xe.zip(ye).map(|(xe, ye)| {
                    let tree = HoverTree::build(
                        points
                            .iter()
                            .map(|p| (p.fips, normalize(p.x, xe), normalize(p.y, ye))),
                    );
                    (tree, xe, ye)
                })
                .filter(|(tree, _, _)| !tree.is_empty())
            }
            _ => None,
        };
    }

    pub fn show(&mut self, ui: &mut egui::Ui, ctx: &RefreshContext<'_>, theme: &Theme) -> Option<FilterCommand> {
        let mut command = None;

        ui.horizontal(|ui| {
            let mut selected = self.selected;
            let current = self.variable().unwrap_or("(none)").to_string();
            egui::ComboBox::from_id_salt("brush_variable")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for (i, v) in self.variables.iter().enumerate() {
                        ui.selectable_value(&mut selected, i, v.short.as_str());
                    }
                });
            if let Some(clear) = self.select_variable(selected, ctx) {
                command = Some(clear);
            }
            if toolbar_btn(ui, "Reset").clicked() {
                command = Some(FilterCommand::Reset(ResetScope::Brush));
            }
        });

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let outer = response.rect;
        if outer.width() < 80.0 || outer.height() < 60.0 {
            return command;
        }
        let var = self.variable().unwrap_or_default().to_string();

        let frame = match &self.view {
            BrushView::Empty => None,
            BrushView::Histogram { bins, .. } => match (bins.first(), bins.last()) {
                (Some(first), Some(last)) => {
                    let max = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;
                    let (x0, x1) = if last.x1 > first.x0 { (first.x0, last.x1) } else { (first.x0 - 0.5, first.x0 + 0.5) };
                    Some(PlotFrame::exact(outer, (x0, x1), (0.0, max * 1.1)))
                }
                _ => None,
            },
            BrushView::Scatter { points } => extent(points.iter().map(|p| p.x))
                .zip(extent(points.iter().map(|p| p.y)))
                .map(|(xe, ye)| PlotFrame::fit(outer, xe, ye)),
        };
        let Some(frame) = frame else {
            painter.text(
                outer.center(),
                egui::Align2::CENTER_CENTER,
                "No counties in the current selection",
                egui::FontId::proportional(13.0),
                theme.axis_color(),
            );
            return command;
        };

        match &self.view {
            BrushView::Histogram { bins, dimmed } => {
                frame.draw_axes(&painter, theme, &var, "Counties");
                let base = cluster_color(0);
                for (bin, &dim) in bins.iter().zip(dimmed) {
                    let r = Rect::from_two_pos(
                        frame.data_to_screen(bin.x0, 0.0),
                        frame.data_to_screen(bin.x1, bin.count as f64),
                    )
                    .shrink2(egui::vec2(0.5, 0.0));
                    painter.rect_filled(r, 0.0, if dim { theme.dim(base) } else { base });
                }
                if let Some(BrushSelection::Range { axis, x, y }) = ctx.filter.range_brush() {
                    if *axis == var {
                        let r = Rect::from_two_pos(frame.data_to_screen(x.min, y.min), frame.data_to_screen(x.max, y.max));
                        painter.rect(r, 0.0, theme.brush_fill(), Stroke::new(1.0, theme.axis_color()), egui::StrokeKind::Middle);
                    }
                }
            }
            BrushView::Scatter { points } => {
                frame.draw_axes(&painter, theme, AVG_SCORE_COLUMN, &var);
                for p in points {
                    let color = p.cluster.map_or(theme.axis_color(), cluster_color);
                    let (color, radius) = if p.dimmed { (theme.dim(color), 2.0) } else { (color, 3.0) };
                    painter.circle_filled(frame.data_to_screen(p.x, p.y), radius, color);
                }
            }
            BrushView::Empty => {}
        }

        match track_brush(&response, &mut self.anchor) {
            BrushGesture::Drag(screen) => {
                painter.rect(screen, 0.0, theme.brush_fill(), Stroke::new(1.0, theme.axis_color()), egui::StrokeKind::Middle);
                let (xa, ya) = frame.screen_to_data(screen.min);
                let (xb, yb) = frame.screen_to_data(screen.max);
                let (x, y) = (Interval::new(xa, xb), Interval::new(ya, yb));
                command = match &self.view {
                    BrushView::Histogram { .. } => Some(FilterCommand::SetRangeBrush(BrushSelection::Range {
                        axis: var.clone(),
                        x,
                        y,
                    })),
                    BrushView::Scatter { points } => Some(scatter_brush(points, x, y)),
                    BrushView::Empty => None,
                };
            }
            BrushGesture::Click => command = Some(FilterCommand::ClearRangeBrush),
            BrushGesture::None => {}
        }

        if let (Some(pos), Some((tree, xe, ye))) = (response.hover_pos(), &self.hover) {
            let (dx, dy) = frame.screen_to_data(pos);
            let hit = tree
                .nearest(normalize(dx, *xe), normalize(dy, *ye))
                .filter(|&(_, d)| d < 0.02);
            if let Some((fips, _)) = hit {
                let place = ctx.store.get(fips).map(|r| r.record.state_name.clone()).unwrap_or_default();
                response.on_hover_text_at_pointer(format!("{fips:05} {place}"));
            }
        }

        command
    }
}

fn normalize(v: f64, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo {
        (v - lo) / (hi - lo)
    } else {
        0.5
    }
}

/// Keys whose point lies inside the rectangle, edges included.
pub fn members_in_rect<K: Ord + Copy>(
    points: impl IntoIterator<Item = (K, f64, f64)>,
    x: Interval,
    y: Interval,
) -> BTreeSet<K> {
    points
        .into_iter()
        .filter(|&(_, px, py)| x.contains(px) && y.contains(py))
        .map(|(k, _, _)| k)
        .collect()
}

fn scatter_brush(points: &[ScatterPoint], x: Interval, y: Interval) -> FilterCommand {
    let members = members_in_rect(points.iter().map(|p| (p.fips, p.x, p.y)), x, y);
    FilterCommand::SetRangeBrush(BrushSelection::Members(members))
}

impl Panel for BrushPanel {
    fn id(&self) -> PanelId {
        PanelId::Brush
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) {
        self.view = self.compute_view(ctx);
        self.rebuild_hover();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_analysis, fixture_augmented, fixture_clusters, tied_analysis, tied_store, INCOME};
    use crate::state::filter_state::{FilterState, GeoFilter};

    fn refreshed(kind: BrushKind, filter: &FilterState) -> BrushPanel {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter,
        };
        let analysis = fixture_analysis();
        let vars = match kind {
            BrushKind::Histogram => analysis.hist_vars.clone(),
            BrushKind::Scatter => analysis.top_vars.clone(),
        };
        let mut panel = BrushPanel::new(kind, vars);
        panel.refresh(&ctx);
        panel
    }

    fn all_clusters() -> FilterState {
        let mut f = FilterState::new();
        f.init_clusters(3);
        f
    }

    #[test]
    fn rectangle_selects_inclusive_members() {
        let pts = [('A', 1.0, 2.0), ('B', 5.0, 5.0), ('C', 2.0, 3.0)];
        let set = members_in_rect(pts, Interval::new(0.0, 3.0), Interval::new(0.0, 4.0));
        assert_eq!(set, BTreeSet::from(['A', 'C']));
        let edge = members_in_rect(pts, Interval::new(1.0, 1.0), Interval::new(2.0, 2.0));
        assert_eq!(edge, BTreeSet::from(['A']));
    }

    #[test]
    fn histogram_bins_geo_and_cluster_subset_only() {
        let mut filter = all_clusters();
        filter.set_axis_brush("AvgScore", 40.0, 50.0);
        let panel = refreshed(BrushKind::Histogram, &filter);
        assert_eq!(panel.variable(), Some(INCOME));
        let BrushView::Histogram { bins, dimmed } = panel.view() else {
            panic!("expected histogram");
        };
        assert_eq!(bins.len(), BIN_COUNT);
        // Axis brushes do not narrow the histogram; 36003 has no income.
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert!(dimmed.iter().all(|d| !d));

        filter.set_geo(GeoFilter::State("Alabama".to_string()));
        let panel = refreshed(BrushKind::Histogram, &filter);
        let BrushView::Histogram { bins, .. } = panel.view() else {
            panic!("expected histogram");
        };
        assert_eq!((bins[0].x0, bins[BIN_COUNT - 1].x1), (50000.0, 62000.0));
        assert_eq!((bins[0].count, bins[BIN_COUNT - 1].count), (1, 1));
    }

    #[test]
    fn histogram_dims_bars_outside_brush_on_same_axis() {
        let mut filter = all_clusters();
        filter.set_range_brush(BrushSelection::Range {
            axis: INCOME.to_string(),
            x: Interval::new(40000.0, 50000.0),
            y: Interval::new(0.0, 10.0),
        });
        let panel = refreshed(BrushKind::Histogram, &filter);
        let BrushView::Histogram { dimmed, .. } = panel.view() else {
            panic!("expected histogram");
        };
        assert!(!dimmed[0]);
        assert!(dimmed[BIN_COUNT - 1]);

        filter.set_range_brush(BrushSelection::Range {
            axis: "Unemp".to_string(),
            x: Interval::new(0.0, 1.0),
            y: Interval::new(0.0, 1.0),
        });
        let panel = refreshed(BrushKind::Histogram, &filter);
        let BrushView::Histogram { dimmed, .. } = panel.view() else {
            panic!("expected histogram");
        };
        assert!(dimmed.iter().all(|d| !d));
    }

    #[test]
    fn scatter_ignores_own_brush_and_dims_non_members() {
        let mut filter = all_clusters();
        filter.set_range_brush(BrushSelection::Members(BTreeSet::from([1001, 1003])));
        let panel = refreshed(BrushKind::Scatter, &filter);
        let BrushView::Scatter { points } = panel.view() else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 5);
        let dimmed: Vec<u32> = points.iter().filter(|p| p.dimmed).map(|p| p.fips).collect();
        assert_eq!(dimmed, vec![13001, 36001, 39001]);

        let cmd = scatter_brush(points, Interval::new(30.0, 50.0), Interval::new(40000.0, 65000.0));
        assert_eq!(
            cmd,
            FilterCommand::SetRangeBrush(BrushSelection::Members(BTreeSet::from([1001, 1003, 39001])))
        );
    }

    #[test]
    fn switching_variable_clears_a_range_brush_on_the_old_axis() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = all_clusters();
        filter.set_range_brush(BrushSelection::Range {
            axis: INCOME.to_string(),
            x: Interval::new(40000.0, 50000.0),
            y: Interval::new(0.0, 10.0),
        });
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut panel = BrushPanel::new(BrushKind::Histogram, fixture_analysis().hist_vars);
        panel.refresh(&ctx);

        assert_eq!(panel.select_variable(0, &ctx), None);
        assert_eq!(panel.select_variable(1, &ctx), Some(FilterCommand::ClearRangeBrush));
        assert_eq!(panel.variable(), Some("Unemp"));
        // Back onto the brushed axis: nothing to clear.
        assert_eq!(panel.select_variable(0, &ctx), None);
    }

    #[test]
    fn switching_variable_keeps_scatter_members() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = all_clusters();
        filter.set_range_brush(BrushSelection::Members(BTreeSet::from([1001])));
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut panel = BrushPanel::new(BrushKind::Scatter, fixture_analysis().top_vars);
        panel.refresh(&ctx);
        assert_eq!(panel.select_variable(1, &ctx), None);
        assert_eq!(panel.variable(), Some("Wellbeing"));
    }

    fn tied_scatter(n: u32, vary_income: bool) -> BrushPanel {
        let analysis = tied_analysis(n);
        let store = tied_store(n, vary_income).project(&analysis.axis_aliases());
        let clusters = analysis.cluster_assignment();
        let mut filter = FilterState::new();
        filter.init_clusters(1);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut panel = BrushPanel::new(BrushKind::Scatter, analysis.top_vars.clone());
        panel.refresh(&ctx);
        panel
    }

    #[test]
    fn scatter_survives_a_shared_average_score() {
        let panel = tied_scatter(40, true);
        let BrushView::Scatter { points } = panel.view() else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 40);
        assert!(points.iter().all(|p| p.x == 35.0));
        let (tree, xe, ye) = panel.hover.as_ref().unwrap();
        assert_eq!(*xe, (35.0, 35.0));
        let (fips, _) = tree.nearest(normalize(35.0, *xe), normalize(40500.0, *ye)).unwrap();
        assert_eq!(fips, 1001 + 2 * 5);
    }

    #[test]
    fn scatter_survives_identical_points() {
        let panel = tied_scatter(60, false);
        let BrushView::Scatter { points } = panel.view() else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 60);
        let (tree, xe, ye) = panel.hover.as_ref().unwrap();
        let (slot, _) = tree.nearest_all(normalize(35.0, *xe), normalize(50000.0, *ye)).unwrap();
        assert_eq!(slot.len(), 60);
    }
}
