use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::data::analysis::AnalysisResult;
use crate::data::geometry::Geometry;
use crate::processing::evaluator::{count_passing, passing, Predicates};
use crate::processing::statistics::ColumnStats;
use crate::state::broadcast::{Broadcaster, FilterEvent, Panel, PanelId, RefreshContext};
use crate::state::filter_state::{FilterCommand, FilterState, ResetScope};
use crate::state::record_store::{AugmentedStore, ClusterAssignment, RecordStore};
use crate::state::theme::Theme;
use crate::ui::donut_panel::DonutPanel;
use crate::ui::hist_panel::{BrushKind, BrushPanel};
use crate::ui::map_panel::MapPanel;
use crate::ui::pca_panel::PcaPanel;
use crate::ui::pcp_panel::PcpPanel;
use crate::ui::widgets::pending_notice;

/// Owns the loaded data, the one `FilterState`, and every panel. All filter
/// changes go through [`Dashboard::apply_command`].
pub struct Dashboard {
    base: Arc<RecordStore>,
    store: AugmentedStore,
    analysis: Option<Arc<AnalysisResult>>,
    clusters: Option<ClusterAssignment>,
    filter: FilterState,
    broadcaster: Broadcaster,
    brush_kind: BrushKind,
    exclude_pca_outlier: bool,
    analysis_error: Option<String>,
    map: MapPanel,
    donut: DonutPanel,
    pca: Option<PcaPanel>,
    pcp: Option<PcpPanel>,
    brush: Option<BrushPanel>,
}

impl Dashboard {
    /// Build from the tabular and geometry feeds. Analysis-driven panels stay
    /// empty until [`Dashboard::on_analysis_loaded`].
    pub fn new(config: &DashboardConfig, base: RecordStore, geometry: Geometry) -> Self {
        let base = Arc::new(base);
        let store = base.project(&[]);
        let map = MapPanel::new(Arc::new(geometry), Arc::clone(&base), config.metric, config.geo_mode);
        let mut dashboard = Self {
            base,
            store,
            analysis: None,
            clusters: None,
            filter: FilterState::new(),
            broadcaster: Broadcaster::new(config.skip_origin_refresh),
            brush_kind: config.brush_kind,
            exclude_pca_outlier: config.exclude_pca_outlier,
            analysis_error: None,
            map,
            donut: DonutPanel::new(),
            pca: None,
            pcp: None,
            brush: None,
        };
        dashboard.refresh(None);
        dashboard
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn store(&self) -> &AugmentedStore {
        &self.store
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_deref()
    }

    pub fn map(&self) -> &MapPanel {
        &self.map
    }

    pub fn donut(&self) -> &DonutPanel {
        &self.donut
    }

    pub fn pca(&self) -> Option<&PcaPanel> {
        self.pca.as_ref()
    }

    pub fn pcp(&self) -> Option<&PcpPanel> {
        self.pcp.as_ref()
    }

    pub fn brush(&self) -> Option<&BrushPanel> {
        self.brush.as_ref()
    }

    /// Number of filter events broadcast so far.
    pub fn broadcasts(&self) -> u64 {
        self.broadcaster.dispatched()
    }

    pub fn passing_count(&self) -> usize {
        count_passing(&self.store, self.clusters.as_ref(), &self.filter)
    }

    /// Statistics of the average score over the counties passing every filter.
    pub fn visible_stats(&self) -> Option<ColumnStats> {
        ColumnStats::compute(
            passing(&self.store, self.clusters.as_ref(), &self.filter, Predicates::ALL)
                .filter_map(|r| r.record.avg_score),
        )
    }

    /// Install a freshly loaded analysis result: alias columns, cluster
    /// assignment, and the panels that depend on it. Clusters start all
    /// enabled.
    pub fn on_analysis_loaded(&mut self, result: AnalysisResult) {
        let analysis = Arc::new(result);
        self.store = self.base.project(&analysis.axis_aliases());
        let clusters = analysis.cluster_assignment();
        let unmatched = analysis
            .points
            .iter()
            .filter(|p| self.base.get(p.fips).is_none())
            .count();
        if unmatched > 0 {
            tracing::warn!("{unmatched} analysis points have no county row");
        }
        tracing::info!(
            "Cluster assignment covers {} of {} counties",
            clusters.len(),
            self.base.len()
        );
        self.clusters = Some(clusters);
        self.filter.init_clusters(analysis.k);

        let variables = match self.brush_kind {
            BrushKind::Histogram if !analysis.hist_vars.is_empty() => analysis.hist_vars.clone(),
            _ => analysis.top_vars.clone(),
        };
        self.pca = Some(PcaPanel::new(Arc::clone(&analysis), self.exclude_pca_outlier));
        self.pcp = Some(PcpPanel::new(analysis.pcp_axes()));
        self.brush = Some(BrushPanel::new(self.brush_kind, variables));
        self.analysis = Some(analysis);
        self.analysis_error = None;
        self.refresh(None);
    }

    pub fn on_analysis_failed(&mut self, message: String) {
        self.analysis_error = Some(message);
    }

    /// Apply one panel command. Broadcasts only when the filter changed and
    /// returns the panels that were refreshed.
    pub fn apply_command(&mut self, origin: PanelId, command: FilterCommand) -> Vec<PanelId> {
        if !self.filter.apply(&command) {
            tracing::debug!("{} command {:?} changed nothing", origin.label(), command);
            return Vec::new();
        }
        let event = FilterEvent { origin, command };
        self.refresh(Some(&event))
    }

    /// Global reset: every predicate cleared, all clusters enabled.
    pub fn reset_all(&mut self) -> Vec<PanelId> {
        if !self.filter.reset(ResetScope::All) {
            return Vec::new();
        }
        tracing::info!("All filters reset");
        self.refresh(None)
    }

    /// Recompute panel views, either as a broadcast of `event` or, with no
    /// event, for every panel.
    fn refresh(&mut self, event: Option<&FilterEvent>) -> Vec<PanelId> {
        let ctx = RefreshContext {
            store: &self.store,
            clusters: self.clusters.as_ref(),
            filter: &self.filter,
        };
        let mut panels: Vec<&mut dyn Panel> = Vec::with_capacity(PanelId::ORDER.len());
        panels.push(&mut self.map);
        if let Some(p) = self.pca.as_mut() {
            panels.push(p);
        }
        if let Some(p) = self.pcp.as_mut() {
            panels.push(p);
        }
        if let Some(p) = self.brush.as_mut() {
            panels.push(p);
        }
        panels.push(&mut self.donut);

        match event {
            Some(event) => self.broadcaster.broadcast(event, &mut panels, &ctx),
            None => self.broadcaster.refresh_all(&mut panels, &ctx),
        }
    }

    /// Draw one panel and apply whatever command it produced.
    pub fn show_panel(&mut self, id: PanelId, ui: &mut egui::Ui, theme: &Theme) {
        let notice = match &self.analysis_error {
            Some(err) => format!("Analysis unavailable: {err}"),
            None => "Waiting for analysis...".to_string(),
        };
        let ctx = RefreshContext {
            store: &self.store,
            clusters: self.clusters.as_ref(),
            filter: &self.filter,
        };
        let command = match id {
            PanelId::Map => self.map.show(ui, &ctx, theme),
            PanelId::Donut => self.donut.show(ui, theme),
            PanelId::Pca => match self.pca.as_mut() {
                Some(panel) => panel.show(ui, &ctx, theme),
                None => {
                    pending_notice(ui, &notice);
                    None
                }
            },
            PanelId::Pcp => match self.pcp.as_mut() {
                Some(panel) => panel.show(ui, &ctx, theme),
                None => {
                    pending_notice(ui, &notice);
                    None
                }
            },
            PanelId::Brush => match self.brush.as_mut() {
                Some(panel) => panel.show(ui, &ctx, theme),
                None => {
                    pending_notice(ui, &notice);
                    None
                }
            },
        };
        if let Some(command) = command {
            self.apply_command(id, command);
        }
    }
}
