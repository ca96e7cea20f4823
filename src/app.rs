use eframe::egui;
use crate::config::DashboardConfig;
use crate::data::analysis::{load_analysis, AnalysisResult};
use crate::data::geometry::{load_geometry, Geometry};
use crate::data::loader::load_table;
use crate::error::LoadError;
use crate::state::broadcast::PanelId;
use crate::state::dashboard::Dashboard;
use crate::state::record_store::RecordStore;
use crate::state::theme::Theme;
use crate::ui::widgets::{panel_frame, toolbar_btn, toolbar_toggle_btn};
use std::sync::{Arc, Mutex};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Pending async load result, filled by a worker thread.
struct PendingLoad<T> {
    label: &'static str,
    result: Arc<Mutex<Option<Result<T, LoadError>>>>,
}

impl<T: Send + 'static> PendingLoad<T> {
    fn spawn(label: &'static str, job: impl FnOnce() -> Result<T, LoadError> + Send + 'static) -> Self {
        let result: Arc<Mutex<Option<Result<T, LoadError>>>> = Arc::new(Mutex::new(None));
        let result_clone = Arc::clone(&result);
        std::thread::spawn(move || {
            let loaded = job();
            if let Ok(mut lock) = result_clone.lock() {
                *lock = Some(loaded);
            }
        });
        Self { label, result }
    }

    /// Take the result if the worker has finished.
    fn poll(&self) -> Option<Result<T, LoadError>> {
        match self.result.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        }
    }
}

/// The CountyScope dashboard application.
pub struct CountyScopeApp {
    config: DashboardConfig,
    theme: Theme,
    dashboard: Option<Dashboard>,
    /// County table and geometry, loaded together.
    pending_data: Option<PendingLoad<(RecordStore, Geometry)>>,
    pending_analysis: Option<PendingLoad<AnalysisResult>>,
    /// Analysis outcome that arrived before the dashboard existed.
    early_analysis: Option<Result<AnalysisResult, String>>,
    /// Fatal load error shown in place of the dashboard.
    error_message: Option<String>,
    /// Whether to show the About window (hidden menu).
    show_about: bool,
    /// Whether to show the Debug Info window (hidden menu).
    show_debug: bool,
}

impl CountyScopeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: DashboardConfig) -> Self {
        let theme = Theme::default();

        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();

        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::proportional(14.0),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            egui::FontId::proportional(13.5),
        );
        style.text_styles.insert(
            egui::TextStyle::Heading,
            egui::FontId::proportional(20.0),
        );
        style.text_styles.insert(
            egui::TextStyle::Small,
            egui::FontId::proportional(11.5),
        );

        style.spacing.button_padding = egui::vec2(8.0, 4.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.window_margin = egui::Margin::same(12);

        ctx.set_style(style);
        ctx.set_visuals(styled_visuals(theme));

        let data_path = config.data.clone();
        let geometry_path = config.geometry.clone();
        let pending_data = PendingLoad::spawn("Loading county data...", move || {
            let table = load_table(&data_path)?;
            let store = RecordStore::from_table(&table)?;
            tracing::info!("Loaded {} counties from {:?}", store.len(), data_path);
            let geometry = load_geometry(&geometry_path)?;
            Ok((store, geometry))
        });

        let source = config.analysis.clone();
        let pending_analysis = PendingLoad::spawn("Fetching analysis...", move || load_analysis(&source));

        Self {
            config,
            theme,
            dashboard: None,
            pending_data: Some(pending_data),
            pending_analysis: Some(pending_analysis),
            early_analysis: None,
            error_message: None,
            show_about: false,
            show_debug: false,
        }
    }

    /// Move finished worker results into the dashboard.
    fn poll_loads(&mut self) {
        if let Some(result) = self.pending_data.as_ref().and_then(PendingLoad::poll) {
            self.pending_data = None;
            match result {
                Ok((store, geometry)) => {
                    let mut dashboard = Dashboard::new(&self.config, store, geometry);
                    match self.early_analysis.take() {
                        Some(Ok(analysis)) => dashboard.on_analysis_loaded(analysis),
                        Some(Err(e)) => dashboard.on_analysis_failed(e),
                        None => {}
                    }
                    self.dashboard = Some(dashboard);
                }
                Err(e) => {
                    tracing::error!("Failed to load county data: {e}");
                    self.error_message = Some(format!("Failed to load county data: {e}"));
                }
            }
        }

        if let Some(result) = self.pending_analysis.as_ref().and_then(PendingLoad::poll) {
            self.pending_analysis = None;
            let outcome = result.map_err(|e| {
                tracing::error!("Failed to load analysis from {}: {e}", self.config.analysis);
                e.to_string()
            });
            match (&mut self.dashboard, outcome) {
                (Some(dashboard), Ok(analysis)) => dashboard.on_analysis_loaded(analysis),
                (Some(dashboard), Err(e)) => dashboard.on_analysis_failed(e),
                (None, outcome) => self.early_analysis = Some(outcome),
            }
        }
    }

    fn show_dashboard(ui: &mut egui::Ui, dashboard: &mut Dashboard, theme: &Theme) {
        let avail = ui.available_size();
        let spacing = ui.spacing().item_spacing;
        let top_h = (avail.y - spacing.y) * 0.55;
        let bottom_h = avail.y - spacing.y - top_h;

        ui.horizontal(|ui| {
            let map_w = (avail.x - spacing.x) * 0.6;
            ui.allocate_ui(egui::vec2(map_w, top_h), |ui| {
                panel_frame(ui, PanelId::Map.label(), |ui| dashboard.show_panel(PanelId::Map, ui, theme));
            });
            ui.allocate_ui(egui::vec2(ui.available_width(), top_h), |ui| {
                panel_frame(ui, PanelId::Pca.label(), |ui| dashboard.show_panel(PanelId::Pca, ui, theme));
            });
        });

        ui.horizontal(|ui| {
            let w = (avail.x - 2.0 * spacing.x) / 3.0;
            for id in [PanelId::Pcp, PanelId::Brush, PanelId::Donut] {
                ui.allocate_ui(egui::vec2(w, bottom_h), |ui| {
                    panel_frame(ui, id.label(), |ui| dashboard.show_panel(id, ui, theme));
                });
            }
        });
    }
}

/// Theme visuals with our custom rounding.
fn styled_visuals(theme: Theme) -> egui::Visuals {
    let mut vis = theme.visuals();
    vis.window_corner_radius = egui::CornerRadius::same(8);
    vis.widgets.noninteractive.corner_radius = egui::CornerRadius::same(6);
    vis.widgets.inactive.corner_radius = egui::CornerRadius::same(6);
    vis.widgets.hovered.corner_radius = egui::CornerRadius::same(6);
    vis.widgets.active.corner_radius = egui::CornerRadius::same(6);
    vis.widgets.open.corner_radius = egui::CornerRadius::same(6);
    vis.widgets.hovered.bg_stroke = egui::Stroke::new(1.5, egui::Color32::from_gray(160));
    vis.widgets.active.bg_stroke = egui::Stroke::new(2.0, egui::Color32::from_gray(200));
    vis
}

impl eframe::App for CountyScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(styled_visuals(self.theme));

        self.poll_loads();

        // --- Header panel ---
        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.visuals_mut().override_text_color = Some(ui.visuals().strong_text_color());
                    let heading_response = ui.heading("CountyScope");
                    ui.visuals_mut().override_text_color = None;
                    heading_response.context_menu(|ui| {
                        if ui.button("About CountyScope").clicked() {
                            self.show_about = true;
                            ui.close_menu();
                        }
                        if ui.button("Debug Info").clicked() {
                            self.show_debug = true;
                            ui.close_menu();
                        }
                    });

                    ui.separator();

                    if let Some(dashboard) = self.dashboard.as_mut() {
                        let active = dashboard.filter().has_record_predicates();
                        if toolbar_toggle_btn(ui, "Reset all", active).clicked() {
                            dashboard.reset_all();
                        }
                        ui.label(format!(
                            "{} of {} counties",
                            dashboard.passing_count(),
                            dashboard.store().len()
                        ));
                    }

                    if let Some(pending) = &self.pending_analysis {
                        ui.separator();
                        ui.spinner();
                        ui.label(pending.label);
                    }

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if toolbar_btn(ui, self.theme.label()).clicked() {
                            self.theme = self.theme.toggle();
                        }
                    });
                });
            });

        // --- Dashboard ---
        let theme = self.theme;
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(err) = &self.error_message {
                ui.centered_and_justified(|ui| {
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), err);
                });
            } else if let Some(dashboard) = self.dashboard.as_mut() {
                Self::show_dashboard(ui, dashboard, &theme);
            }
        });

        // Show loading indicator
        if let Some(pending) = &self.pending_data {
            egui::Window::new("Loading")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(pending.label);
                    });
                });
        }
        if self.pending_data.is_some() || self.pending_analysis.is_some() {
            ctx.request_repaint();
        }

        // About window (hidden menu)
        if self.show_about {
            egui::Window::new("About CountyScope")
                .open(&mut self.show_about)
                .collapsible(false)
                .resizable(false)
                .default_width(320.0)
                .show(ctx, |ui| {
                    ui.heading("CountyScope");
                    ui.label(format!("Version: {VERSION}"));
                    ui.add_space(4.0);
                    ui.label("Linked views of US county mental-health data.");
                    ui.add_space(10.0);
                    ui.label("Views:");
                    ui.label("  \u{2022} Choropleth map with state or region selection");
                    ui.label("  \u{2022} PCA biplot with cluster toggles");
                    ui.label("  \u{2022} Parallel coordinates with axis brushes");
                    ui.label("  \u{2022} Brushable histogram or scatter plot");
                    ui.label("  \u{2022} Education donut");
                    ui.add_space(10.0);
                    ui.label("Right-click the title for this menu.");
                });
        }

        // Debug Info window (hidden menu)
        if self.show_debug {
            egui::Window::new("Debug Info")
                .open(&mut self.show_debug)
                .collapsible(false)
                .resizable(false)
                .default_width(300.0)
                .show(ctx, |ui| {
                    match &self.dashboard {
                        Some(dashboard) => {
                            ui.label(format!("Counties: {}", dashboard.store().len()));
                            ui.label(format!("Passing: {}", dashboard.passing_count()));
                            ui.label(format!("Broadcasts: {}", dashboard.broadcasts()));
                            ui.label(format!(
                                "Analysis: {}",
                                if dashboard.analysis().is_some() { "loaded" } else { "pending" }
                            ));
                            ui.label(format!(
                                "Numeric columns: {}",
                                dashboard.store().numeric_columns().len()
                            ));
                            for alias in dashboard.store().aliases() {
                                ui.small(format!("{} = {}", alias.short, alias.full));
                            }
                            if let Some(stats) = dashboard.visible_stats() {
                                ui.monospace(stats.report("AvgScore (visible)"));
                            }
                        }
                        None => {
                            ui.label("No data loaded");
                        }
                    }
                    ui.label(format!("Theme: {:?}", self.theme));
                });
        }
    }
}
