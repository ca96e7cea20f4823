use crate::state::filter_state::{FilterCommand, FilterState};
use crate::state::record_store::{AugmentedStore, ClusterAssignment};

/// The five dashboard panels, in refresh order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelId {
    Map,
    Pca,
    Pcp,
    Brush,
    Donut,
}

impl PanelId {
    pub const ORDER: [PanelId; 5] = [
        PanelId::Map,
        PanelId::Pca,
        PanelId::Pcp,
        PanelId::Brush,
        PanelId::Donut,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PanelId::Map => "Map",
            PanelId::Pca => "PCA",
            PanelId::Pcp => "Parallel Coordinates",
            PanelId::Brush => "Histogram / Scatter",
            PanelId::Donut => "Education",
        }
    }
}

/// Everything a panel reads when it recomputes its view.
#[derive(Clone, Copy)]
pub struct RefreshContext<'a> {
    pub store: &'a AugmentedStore,
    pub clusters: Option<&'a ClusterAssignment>,
    pub filter: &'a FilterState,
}

/// A panel's recompute entry point. Implementations rebuild their cached view
/// model from the context; drawing happens separately every frame.
pub trait Panel {
    fn id(&self) -> PanelId;
    fn refresh(&mut self, ctx: &RefreshContext<'_>);
}

/// An applied filter change and the panel that caused it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEvent {
    pub origin: PanelId,
    pub command: FilterCommand,
}

/// Fixed fan-out from one filter event to every subscribed panel.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    subscribers: Vec<PanelId>,
    skip_origin: bool,
    dispatched: u64,
}

impl Broadcaster {
    pub fn new(skip_origin: bool) -> Self {
        Self {
            subscribers: PanelId::ORDER.to_vec(),
            skip_origin,
            dispatched: 0,
        }
    }

    /// Number of events broadcast so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Refresh every subscriber (except the origin when configured to skip
    /// it) in declared order. Returns the panels refreshed.
    pub fn broadcast(
        &mut self,
        event: &FilterEvent,
        panels: &mut [&mut dyn Panel],
        ctx: &RefreshContext<'_>,
    ) -> Vec<PanelId> {
        self.dispatched += 1;
        tracing::debug!(
            "Broadcast #{} from {}: {:?}",
            self.dispatched,
            event.origin.label(),
            event.command
        );
        let skip = self.skip_origin.then_some(event.origin);
        self.refresh(panels, ctx, skip)
    }

    /// Refresh every subscriber unconditionally (initial render, data reload).
    pub fn refresh_all(
        &self,
        panels: &mut [&mut dyn Panel],
        ctx: &RefreshContext<'_>,
    ) -> Vec<PanelId> {
        self.refresh(panels, ctx, None)
    }

    fn refresh(
        &self,
        panels: &mut [&mut dyn Panel],
        ctx: &RefreshContext<'_>,
        skip: Option<PanelId>,
    ) -> Vec<PanelId> {
        let mut refreshed = Vec::with_capacity(self.subscribers.len());
        for &id in &self.subscribers {
            if Some(id) == skip {
                continue;
            }
            if let Some(panel) = panels.iter_mut().find(|p| p.id() == id) {
                panel.refresh(ctx);
                refreshed.push(id);
            }
        }
        refreshed
    }
}
