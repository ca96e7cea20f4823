use egui::{Align2, FontId, Pos2, Rect, Response, Stroke};

use crate::processing::scales::{format_tick_value, ticks};
use crate::state::theme::Theme;

/// Margins reserved around the data area for tick labels.
const LEFT_MARGIN: f32 = 52.0;
const BOTTOM_MARGIN: f32 = 34.0;
const TOP_MARGIN: f32 = 8.0;
const RIGHT_MARGIN: f32 = 12.0;

/// Data bounds of a painter-drawn 2D plot and the screen rect they map onto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotFrame {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub rect: Rect,
}

impl PlotFrame {
    /// Frame the given extents inside `outer`, leaving room for axis labels.
    /// Adds 5% padding on each side of each axis.
    pub fn fit(outer: Rect, x: (f64, f64), y: (f64, f64)) -> Self {
        let pad = |(lo, hi): (f64, f64)| {
            let p = (hi - lo) * 0.05;
            let p = if p.abs() < 1e-15 { 0.5 } else { p };
            (lo - p, hi + p)
        };
        let (x_min, x_max) = pad(x);
        let (y_min, y_max) = pad(y);
        Self::exact(outer, (x_min, x_max), (y_min, y_max))
    }

    /// Frame the given bounds without padding.
    pub fn exact(outer: Rect, x: (f64, f64), y: (f64, f64)) -> Self {
        let rect = Rect::from_min_max(
            outer.min + egui::vec2(LEFT_MARGIN, TOP_MARGIN),
            outer.max - egui::vec2(RIGHT_MARGIN, BOTTOM_MARGIN),
        );
        Self {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
            rect,
        }
    }

    /// Convert screen position to data coordinates.
    pub fn screen_to_data(&self, pos: Pos2) -> (f64, f64) {
        let t_x = (pos.x - self.rect.left()) as f64 / self.rect.width() as f64;
        let t_y = 1.0 - (pos.y - self.rect.top()) as f64 / self.rect.height() as f64;
        (
            self.x_min + t_x * (self.x_max - self.x_min),
            self.y_min + t_y * (self.y_max - self.y_min),
        )
    }

    /// Convert data coordinates to screen position.
    pub fn data_to_screen(&self, x: f64, y: f64) -> Pos2 {
        let t_x = (x - self.x_min) / (self.x_max - self.x_min);
        let t_y = 1.0 - (y - self.y_min) / (self.y_max - self.y_min);
        Pos2::new(
            self.rect.left() + (t_x as f32) * self.rect.width(),
            self.rect.top() + (t_y as f32) * self.rect.height(),
        )
    }

    /// Grid, axis lines, tick labels and axis titles.
    pub fn draw_axes(&self, painter: &egui::Painter, theme: &Theme, x_label: &str, y_label: &str) {
        let grid = Stroke::new(1.0, theme.grid_color());
        let axis = theme.axis_color();
        let font = FontId::proportional(11.0);

        painter.rect_filled(self.rect, 0.0, theme.plot_bg());

        for v in ticks(self.x_min, self.x_max, 6) {
            let p = self.data_to_screen(v, self.y_min);
            painter.vline(p.x, self.rect.y_range(), grid);
            painter.text(
                Pos2::new(p.x, self.rect.bottom() + 3.0),
                Align2::CENTER_TOP,
                format_tick_value(v),
                font.clone(),
                axis,
            );
        }
        for v in ticks(self.y_min, self.y_max, 5) {
            let p = self.data_to_screen(self.x_min, v);
            painter.hline(self.rect.x_range(), p.y, grid);
            painter.text(
                Pos2::new(self.rect.left() - 4.0, p.y),
                Align2::RIGHT_CENTER,
                format_tick_value(v),
                font.clone(),
                axis,
            );
        }

        let stroke = Stroke::new(1.0, axis);
        painter.hline(self.rect.x_range(), self.rect.bottom(), stroke);
        painter.vline(self.rect.left(), self.rect.y_range(), stroke);

        painter.text(
            Pos2::new(self.rect.center().x, self.rect.bottom() + 18.0),
            Align2::CENTER_TOP,
            x_label,
            font.clone(),
            axis,
        );
        painter.text(
            Pos2::new(self.rect.left() + 4.0, self.rect.top() + 2.0),
            Align2::LEFT_TOP,
            y_label,
            font,
            axis,
        );
    }
}

/// Outcome of a rectangular brush gesture on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushGesture {
    None,
    /// Drag in progress or just released; screen-space rectangle.
    Drag(Rect),
    /// Press and release without movement.
    Click,
}

/// Track a primary-button rectangle drag on `response`. `anchor` carries the
/// drag start between frames.
pub fn track_brush(response: &Response, anchor: &mut Option<Pos2>) -> BrushGesture {
    if response.drag_started_by(egui::PointerButton::Primary) {
        *anchor = response.interact_pointer_pos();
    }
    if response.dragged_by(egui::PointerButton::Primary) || response.drag_stopped() {
        let current = response.interact_pointer_pos();
        let gesture = match (*anchor, current) {
            (Some(a), Some(b)) if a.distance(b) > 2.0 => BrushGesture::Drag(Rect::from_two_pos(a, b)),
            _ => BrushGesture::None,
        };
        if response.drag_stopped() {
            *anchor = None;
        }
        return gesture;
    }
    if response.clicked() {
        return BrushGesture::Click;
    }
    BrushGesture::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_and_data_coordinates_invert() {
        let outer = Rect::from_min_size(Pos2::new(0.0, 0.0), egui::vec2(464.0, 342.0));
        let frame = PlotFrame::exact(outer, (0.0, 10.0), (0.0, 100.0));
        assert_eq!(frame.rect.width(), 400.0);
        assert_eq!(frame.rect.height(), 300.0);

        let p = frame.data_to_screen(2.5, 50.0);
        assert_eq!(p, Pos2::new(152.0, 158.0));
        let (x, y) = frame.screen_to_data(p);
        assert!((x - 2.5).abs() < 1e-6 && (y - 50.0).abs() < 1e-6);
    }

    #[test]
    fn fit_pads_degenerate_extent() {
        let outer = Rect::from_min_size(Pos2::ZERO, egui::vec2(300.0, 200.0));
        let frame = PlotFrame::fit(outer, (3.0, 3.0), (0.0, 10.0));
        assert_eq!((frame.x_min, frame.x_max), (2.5, 3.5));
        assert_eq!((frame.y_min, frame.y_max), (-0.5, 10.5));
    }
}
