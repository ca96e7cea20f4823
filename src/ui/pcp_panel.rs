use egui::{Align2, FontId, Pos2, Rect, Sense, Shape, Stroke};

use crate::processing::evaluator::{passing, Predicates};
use crate::processing::scales::{cluster_color, format_tick_value, nice_domain, ticks, LinearScale};
use crate::state::broadcast::{Panel, PanelId, RefreshContext};
use crate::state::filter_state::{FilterCommand, ResetScope};
use crate::state::theme::Theme;
use crate::ui::widgets::toolbar_btn;

/// Horizontal distance in points within which a press grabs an axis.
const AXIS_GRAB: f32 = 12.0;
const SIDE_MARGIN: f32 = 40.0;
const TOP_MARGIN: f32 = 22.0;
const BOTTOM_MARGIN: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PcpAxis {
    pub name: String,
    /// Full-store extent rounded outward to nice bounds.
    pub domain: (f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcpPath {
    pub fips: u32,
    pub cluster: Option<usize>,
    /// One value per axis, all finite.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PcpView {
    pub axes: Vec<PcpAxis>,
    pub paths: Vec<PcpPath>,
}

pub struct PcpPanel {
    axis_names: Vec<String>,
    view: PcpView,
    /// Axis being brushed and the screen y the drag started at.
    drag: Option<(usize, f32)>,
}

impl PcpPanel {
    pub fn new(axis_names: Vec<String>) -> Self {
        Self {
            axis_names,
            view: PcpView::default(),
            drag: None,
        }
    }

    pub fn view(&self) -> &PcpView {
        &self.view
    }

    fn compute_view(&self, ctx: &RefreshContext<'_>) -> PcpView {
        let axes: Vec<PcpAxis> = self
            .axis_names
            .iter()
            .filter_map(|name| match ctx.store.extent(name) {
                Some((min, max)) => Some(PcpAxis {
                    name: name.clone(),
                    domain: nice_domain(min, max, 5),
                }),
                None => {
                    tracing::warn!("PCP axis {name} has no finite values, leaving it out");
                    None
                }
            })
            .collect();

        let paths = passing(ctx.store, ctx.clusters, ctx.filter, Predicates::ALL)
            .filter_map(|r| {
                let values = axes
                    .iter()
                    .map(|a| r.value(&a.name))
                    .collect::<Option<Vec<f64>>>()?;
                Some(PcpPath {
                    fips: r.fips(),
                    cluster: ctx.clusters.and_then(|c| c.cluster_of(r.fips())),
                    values,
                })
            })
            .collect();

        PcpView { axes, paths }
    }

    fn axis_x(&self, rect: Rect, i: usize) -> f32 {
        let n = self.view.axes.len();
        if n <= 1 {
            return rect.center().x;
        }
        let usable = rect.width() - 2.0 * SIDE_MARGIN;
        rect.left() + SIDE_MARGIN + usable * i as f32 / (n - 1) as f32
    }

    fn axis_scale(&self, rect: Rect, i: usize) -> LinearScale {
        LinearScale::new(
            self.view.axes[i].domain,
            ((rect.bottom() - BOTTOM_MARGIN) as f64, (rect.top() + TOP_MARGIN) as f64),
        )
    }

    fn axis_near(&self, rect: Rect, x: f32) -> Option<usize> {
        (0..self.view.axes.len())
            .map(|i| (i, (self.axis_x(rect, i) - x).abs()))
            .filter(|&(_, d)| d <= AXIS_GRAB)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, ctx: &RefreshContext<'_>, theme: &Theme) -> Option<FilterCommand> {
        let mut command = None;
        ui.horizontal(|ui| {
            ui.label(format!("{} counties", self.view.paths.len()));
            if toolbar_btn(ui, "Reset").clicked() {
                command = Some(FilterCommand::Reset(ResetScope::Pcp));
            }
        });

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        if self.view.axes.is_empty() || rect.height() < TOP_MARGIN + BOTTOM_MARGIN + 10.0 {
            return command;
        }
        painter.rect_filled(rect, 0.0, theme.plot_bg());

        for path in &self.view.paths {
            let points: Vec<Pos2> = path
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| Pos2::new(self.axis_x(rect, i), self.axis_scale(rect, i).map(v) as f32))
                .collect();
            let color = path.cluster.map_or(theme.axis_color(), cluster_color).gamma_multiply(0.5);
            painter.add(Shape::line(points, Stroke::new(1.0, color)));
        }

        let font = FontId::proportional(11.0);
        let axis_color = theme.axis_color();
        for (i, axis) in self.view.axes.iter().enumerate() {
            let x = self.axis_x(rect, i);
            let scale = self.axis_scale(rect, i);
            painter.vline(x, (rect.top() + TOP_MARGIN)..=(rect.bottom() - BOTTOM_MARGIN), Stroke::new(1.0, axis_color));
            painter.text(Pos2::new(x, rect.top() + 2.0), Align2::CENTER_TOP, &axis.name, font.clone(), axis_color);
            for t in ticks(axis.domain.0, axis.domain.1, 5) {
                let y = scale.map(t) as f32;
                painter.hline((x - 3.0)..=x, y, Stroke::new(1.0, axis_color));
                painter.text(Pos2::new(x - 5.0, y), Align2::RIGHT_CENTER, format_tick_value(t), font.clone(), axis_color);
            }
            if let Some(brush) = ctx.filter.axis_brushes().get(&axis.name) {
                let y0 = scale.map(brush.max) as f32;
                let y1 = scale.map(brush.min) as f32;
                let r = Rect::from_min_max(Pos2::new(x - 8.0, y0), Pos2::new(x + 8.0, y1));
                painter.rect(r, 2.0, theme.brush_fill(), Stroke::new(1.0, axis_color), egui::StrokeKind::Middle);
            }
        }

        if response.drag_started() {
            self.drag = response
                .interact_pointer_pos()
                .and_then(|p| self.axis_near(rect, p.x).map(|i| (i, p.y)));
        }
        if let (Some((i, start)), Some(pos)) = (self.drag, response.interact_pointer_pos()) {
            if response.dragged() && (pos.y - start).abs() > 2.0 {
                command = Some(brush_command(
                    &self.view.axes[i].name,
                    &self.axis_scale(rect, i),
                    start,
                    pos.y,
                ));
            }
        }
        if response.drag_stopped() {
            self.drag = None;
        }
        if response.clicked() {
            if let Some(i) = response.interact_pointer_pos().and_then(|p| self.axis_near(rect, p.x)) {
                command = Some(FilterCommand::ClearAxisBrush(self.view.axes[i].name.clone()));
            }
        }

        command
    }
}

/// Axis brush for a vertical drag between two screen y positions.
fn brush_command(axis: &str, scale: &LinearScale, y0: f32, y1: f32) -> FilterCommand {
    let a = scale.invert(y0 as f64);
    let b = scale.invert(y1 as f64);
    FilterCommand::SetAxisBrush {
        axis: axis.to_string(),
        min: a.min(b),
        max: a.max(b),
    }
}

impl Panel for PcpPanel {
    fn id(&self) -> PanelId {
        PanelId::Pcp
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) {
        self.view = self.compute_view(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{fixture_analysis, fixture_augmented, fixture_clusters};
    use crate::state::filter_state::FilterState;
    use crate::state::record_store::AVG_SCORE_COLUMN;

    #[test]
    fn axes_use_nice_full_store_extent() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = FilterState::new();
        filter.init_clusters(3);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut pcp = PcpPanel::new(fixture_analysis().pcp_axes());
        pcp.refresh(&ctx);

        let names: Vec<&str> = pcp.view().axes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec![AVG_SCORE_COLUMN, "Income", "Wellbeing"]);
        assert_eq!(pcp.view().axes[0].domain, (20.0, 60.0));
        // 36003 has no income value.
        assert_eq!(pcp.view().paths.len(), 5);
        assert!(pcp.view().paths.iter().all(|p| p.fips != 36003 && p.values.len() == 3));
    }

    #[test]
    fn failing_paths_are_removed() {
        let store = fixture_augmented();
        let clusters = fixture_clusters();
        let mut filter = FilterState::new();
        filter.init_clusters(3);
        filter.set_axis_brush(AVG_SCORE_COLUMN, 40.0, 50.0);
        let ctx = RefreshContext {
            store: &store,
            clusters: Some(&clusters),
            filter: &filter,
        };
        let mut pcp = PcpPanel::new(fixture_analysis().pcp_axes());
        pcp.refresh(&ctx);
        let fips: Vec<u32> = pcp.view().paths.iter().map(|p| p.fips).collect();
        assert_eq!(fips, vec![1001]);
        assert_eq!(pcp.view().paths[0].cluster, Some(0));
        // Axis extents do not follow the filter.
        assert_eq!(pcp.view().axes[0].domain, (20.0, 60.0));
    }

    #[test]
    fn vertical_drag_maps_to_ordered_range() {
        let scale = LinearScale::new((20.0, 60.0), (200.0, 0.0));
        let cmd = brush_command("AvgScore", &scale, 50.0, 100.0);
        assert_eq!(
            cmd,
            FilterCommand::SetAxisBrush {
                axis: "AvgScore".to_string(),
                min: 40.0,
                max: 50.0,
            }
        );
    }
}
