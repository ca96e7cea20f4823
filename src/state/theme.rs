use egui::{Color32, Visuals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn visuals(&self) -> Visuals {
        match self {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        }
    }

    pub fn plot_bg(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(20, 20, 20),
            Theme::Light => Color32::from_rgb(255, 255, 255),
        }
    }

    pub fn grid_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgba_premultiplied(100, 100, 100, 60),
            Theme::Light => Color32::from_rgba_premultiplied(180, 180, 180, 80),
        }
    }

    pub fn axis_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_gray(170),
            Theme::Light => Color32::from_gray(60),
        }
    }

    /// Fill for counties with no tabular row or no metric value.
    pub fn no_data_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_gray(70),
            Theme::Light => Color32::from_gray(204),
        }
    }

    /// Selection rectangles and active brushes.
    pub fn brush_fill(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgba_unmultiplied(120, 170, 255, 40),
            Theme::Light => Color32::from_rgba_unmultiplied(30, 90, 200, 40),
        }
    }

    /// Fade a mark that fails the active filters.
    pub fn dim(&self, color: Color32) -> Color32 {
        color.gamma_multiply(0.15)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}
