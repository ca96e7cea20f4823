use std::f64::consts::TAU;

use egui::{Align2, Color32, FontId, Mesh, Pos2, Sense, Shape, Vec2};

use crate::processing::evaluator::{passing, Predicates};
use crate::processing::scales::category_color;
use crate::processing::statistics::mean;
use crate::state::broadcast::{Panel, PanelId, RefreshContext};
use crate::state::filter_state::{EduCategory, FilterCommand};
use crate::state::theme::Theme;

/// Outward shift of the active slice, in points.
const ACTIVE_OFFSET: f32 = 8.0;

/// One education category. Angles are radians clockwise from 12 o'clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonutSlice {
    pub category: EduCategory,
    pub mean: f64,
    pub fraction: f64,
    pub start: f64,
    pub end: f64,
}

impl DonutSlice {
    fn mid(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonutView {
    pub slices: Vec<DonutSlice>,
    pub active: Option<EduCategory>,
}

#[derive(Default)]
pub struct DonutPanel {
    view: DonutView,
}

impl DonutPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &DonutView {
        &self.view
    }

    fn compute_view(&self, ctx: &RefreshContext<'_>) -> DonutView {
        let subset: Vec<_> = passing(ctx.store, ctx.clusters, ctx.filter, Predicates::ALL.without_donut()).collect();
        let means: Vec<(EduCategory, f64)> = EduCategory::ALL
            .iter()
            .filter_map(|&c| {
                mean(subset.iter().filter_map(|r| r.value(c.column())))
                    .filter(|m| *m > 0.0)
                    .map(|m| (c, m))
            })
            .collect();
        let total: f64 = means.iter().map(|(_, m)| m).sum();

        let mut slices = Vec::with_capacity(means.len());
        if total > 0.0 {
            let mut angle = 0.0;
            for (category, m) in means {
                let fraction = m / total;
                let end = angle + fraction * TAU;
                slices.push(DonutSlice {
                    category,
                    mean: m,
                    fraction,
                    start: angle,
                    end,
                });
                angle = end;
            }
        } else if !subset.is_empty() {
            tracing::warn!("No education values in the current selection; donut left empty");
        }

        DonutView {
            slices,
            active: ctx.filter.donut().map(|d| d.category),
        }
    }

    /// Command for a click on `category`: the mean currently shown becomes the
    /// threshold. `None` when the category has no slice.
    pub fn click_command(&self, category: EduCategory) -> Option<FilterCommand> {
        self.view
            .slices
            .iter()
            .find(|s| s.category == category)
            .map(|s| FilterCommand::ToggleDonut {
                category,
                threshold: s.mean,
            })
    }

    fn slice_at(&self, center: Pos2, inner: f32, outer: f32, pos: Pos2) -> Option<EduCategory> {
        let d = pos - center;
        let r = d.length();
        if r < inner || r > outer + ACTIVE_OFFSET {
            return None;
        }
        let theta = (d.x as f64).atan2(-(d.y as f64)).rem_euclid(TAU);
        self.view
            .slices
            .iter()
            .find(|s| s.start <= theta && theta < s.end)
            .map(|s| s.category)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, theme: &Theme) -> Option<FilterCommand> {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let rect = response.rect;
        if self.view.slices.is_empty() {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "No counties in the current selection",
                FontId::proportional(13.0),
                theme.axis_color(),
            );
            return None;
        }

        let center = rect.center();
        let outer = (rect.width().min(rect.height()) / 2.0 - ACTIVE_OFFSET - 18.0).max(10.0);
        let inner = outer * 0.55;
        let hovered = response.hover_pos().and_then(|p| self.slice_at(center, inner, outer, p));

        for slice in &self.view.slices {
            let is_active = self.view.active == Some(slice.category);
            let offset = if is_active {
                unit(slice.mid()) * ACTIVE_OFFSET
            } else {
                Vec2::ZERO
            };
            let base = category_color(slice.category as usize);
            let color = if self.view.active.is_some() && !is_active {
                theme.dim(base)
            } else if hovered == Some(slice.category) {
                base.gamma_multiply(1.2)
            } else {
                base
            };
            painter.add(Shape::mesh(ring_segment(center + offset, inner, outer, slice.start, slice.end, color)));

            let label_pos = center + offset + unit(slice.mid()) * (outer + 10.0);
            let align = if slice.mid() < std::f64::consts::PI {
                Align2::LEFT_CENTER
            } else {
                Align2::RIGHT_CENTER
            };
            painter.text(
                label_pos,
                align,
                format!("{} {:.1}%", slice.category.label(), slice.fraction * 100.0),
                FontId::proportional(11.0),
                theme.axis_color(),
            );
        }

        let mut command = None;
        if response.clicked() {
            let hit = response
                .interact_pointer_pos()
                .and_then(|p| self.slice_at(center, inner, outer, p));
            if let Some(category) = hit {
                command = self.click_command(category);
            }
        }
        if let Some(category) = hovered {
            if let Some(slice) = self.view.slices.iter().find(|s| s.category == category) {
                response.on_hover_text_at_pointer(format!(
                    "{}\nmean {:.1}% of adults",
                    category.column(),
                    slice.mean
                ));
            }
        }
        command
    }
}

fn unit(theta: f64) -> Vec2 {
    Vec2::new(theta.sin() as f32, -theta.cos() as f32)
}

/// Filled annulus segment between two angles.
fn ring_segment(center: Pos2, inner: f32, outer: f32, start: f64, end: f64, color: Color32) -> Mesh {
    let steps = (((end - start) / TAU * 96.0).ceil() as usize).max(2);
    let mut mesh = Mesh::default();
    for i in 0..=steps {
        let theta = start + (end - start) * i as f64 / steps as f64;
        let u = unit(theta);
        mesh.colored_vertex(center + u * inner, color);
        mesh.colored_vertex(center + u * outer, color);
    }
    for i in 0..steps as u32 {
        let k = i * 2;
        mesh.add_triangle(k, k + 1, k + 2);
        mesh.add_triangle(k + 1, k + 3, k + 2);
    }
    mesh
}

impl Panel for DonutPanel {
    fn id(&self) -> PanelId {
        PanelId::Donut
    }

    fn refresh(&mut self, ctx: &RefreshContext<'_>) {
        self.view = self.compute_view(ctx);
    }
}
