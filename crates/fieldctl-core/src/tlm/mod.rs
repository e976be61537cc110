// ── Team Location Mapper ──
//
// Authoritative store of which team drives from which location. Three
// slots exist: `current` (what the pusher uses), `staged` (an operator's
// pending revision) and the on-demand path that replaces `current`
// directly. A single RwLock guards the slots and is held only for the
// in-memory swap; network reconciliation happens after it is released.

mod export;
mod network;

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info};

use crate::error::TlmError;
use crate::model::{FieldLocation, Mapping, TeamNumber};

pub use export::{LogExporter, MatchExporter, NullExporter};
pub use network::{CommandConfigurator, NetworkConfigurator, NullConfigurator};

/// Read side of the mapper, as seen by the distribution pusher and other
/// consumers that never mutate the mapping.
pub trait TeamLocationMapper: Send + Sync {
    /// Location of `team` in the current snapshot.
    fn get_field_for_team(&self, team: TeamNumber) -> Result<FieldLocation, TlmError>;

    /// The live snapshot. Never partially updated.
    fn current_mapping(&self) -> Arc<Mapping>;

    /// Teams in the live snapshot, read atomically.
    fn current_teams(&self) -> Vec<TeamNumber> {
        self.current_mapping().teams()
    }
}

struct Slots {
    current: Arc<Mapping>,
    staged: Option<Mapping>,
}

/// The mapping store.
///
/// Cheap to share behind `Arc`. All mutations are linearizable: readers
/// see either the old or the new snapshot in full.
pub struct MappingStore {
    slots: RwLock<Slots>,
    /// Serializes reconciliation so network state follows mapping order.
    reconcile_lock: Mutex<()>,
    changes: watch::Sender<Arc<Mapping>>,
    network: Arc<dyn NetworkConfigurator>,
    exporter: Arc<dyn MatchExporter>,
}

impl MappingStore {
    pub fn new(network: Arc<dyn NetworkConfigurator>, exporter: Arc<dyn MatchExporter>) -> Self {
        let empty = Arc::new(Mapping::new());
        let (changes, _) = watch::channel(Arc::clone(&empty));
        Self {
            slots: RwLock::new(Slots {
                current: empty,
                staged: None,
            }),
            reconcile_lock: Mutex::new(()),
            changes,
            network,
            exporter,
        }
    }

    /// A store with no network and no telemetry attached.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullConfigurator), Arc::new(NullExporter))
    }

    /// Subscribe to every snapshot that becomes current.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Mapping>> {
        self.changes.subscribe()
    }

    // ── On-demand ────────────────────────────────────────────────

    /// Replace the current mapping immediately, bypassing staging.
    ///
    /// The swap is visible before this returns, even if reconciliation
    /// fails. A failure is logged and returned; the mapping is NOT rolled
    /// back and operators must reconcile explicitly.
    pub async fn insert_on_demand_map(&self, mapping: Mapping) -> Result<(), TlmError> {
        let snapshot = self.swap_current(mapping);
        info!(teams = snapshot.len(), "applied on-demand mapping");
        self.after_swap(&snapshot).await
    }

    // ── Staging ──────────────────────────────────────────────────

    /// The staged mapping, or an empty one if nothing is staged.
    pub fn stage_mapping(&self) -> Mapping {
        self.slots.read().staged.clone().unwrap_or_default()
    }

    pub fn has_staged(&self) -> bool {
        self.slots.read().staged.is_some()
    }

    /// Replace the staged mapping wholesale.
    pub fn insert_stage_mapping(&self, mapping: Mapping) {
        debug!(teams = mapping.len(), "replaced staged mapping");
        self.slots.write().staged = Some(mapping);
    }

    /// Start a new revision from the live mapping and return it.
    pub fn stage_from_current(&self) -> Mapping {
        let mut slots = self.slots.write();
        let staged = (*slots.current).clone();
        slots.staged = Some(staged.clone());
        staged
    }

    /// Assign one team in the staged revision, creating an empty revision
    /// if none exists. Refuses a location already staged for another team.
    /// Returns the team's previous staged location.
    pub fn stage_assign(
        &self,
        team: TeamNumber,
        location: FieldLocation,
    ) -> Result<Option<FieldLocation>, TlmError> {
        let mut slots = self.slots.write();
        let staged = slots.staged.get_or_insert_with(Mapping::new);
        if let Some(occupant) = staged.occupant(location).filter(|t| *t != team) {
            return Err(TlmError::LocationOccupied { location, occupant });
        }
        Ok(staged.insert(team, location))
    }

    /// Drop one team from the staged revision.
    pub fn stage_remove(&self, team: TeamNumber) -> Option<FieldLocation> {
        self.slots
            .write()
            .staged
            .as_mut()
            .and_then(|staged| staged.remove(team))
    }

    /// Discard the staged revision. Returns whether one existed.
    pub fn clear_stage(&self) -> bool {
        self.slots.write().staged.take().is_some()
    }

    /// Promote the staged revision to current and clear staging.
    ///
    /// Triggers the same reconciliation as an on-demand remap.
    pub async fn commit_staged_map(&self) -> Result<(), TlmError> {
        let snapshot = {
            let mut slots = self.slots.write();
            let staged = slots.staged.take().ok_or(TlmError::NothingStaged)?;
            let snapshot = Arc::new(staged);
            slots.current = Arc::clone(&snapshot);
            self.changes.send_replace(Arc::clone(&snapshot));
            snapshot
        };
        info!(teams = snapshot.len(), "committed staged mapping");
        self.after_swap(&snapshot).await
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Push the current mapping to the network and converge devices.
    ///
    /// This is the manual recovery path after a failed or bypassed
    /// reconcile. `full_refresh` re-reads device state first, which is
    /// slower but catches manual changes made behind the store's back.
    pub async fn reconcile(&self, full_refresh: bool) -> Result<(), TlmError> {
        let _guard = self.reconcile_lock.lock().await;
        let snapshot = self.current_mapping();

        if let Err(e) = self.network.sync_mapping(&snapshot).await {
            error!(error = %e, "error synchronizing match state");
            return Err(e.into());
        }
        if let Err(e) = self.network.converge(!full_refresh).await {
            error!(error = %e, "error converging fields");
            return Err(e.into());
        }
        debug!(teams = snapshot.len(), full_refresh, "network reconciled");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────

    fn swap_current(&self, mapping: Mapping) -> Arc<Mapping> {
        let snapshot = Arc::new(mapping);
        let mut slots = self.slots.write();
        slots.current = Arc::clone(&snapshot);
        self.changes.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    async fn after_swap(&self, snapshot: &Mapping) -> Result<(), TlmError> {
        self.exporter.export_current_match(snapshot);
        self.reconcile(false).await
    }
}

impl TeamLocationMapper for MappingStore {
    fn get_field_for_team(&self, team: TeamNumber) -> Result<FieldLocation, TlmError> {
        self.slots
            .read()
            .current
            .get(team)
            .ok_or(TlmError::NoMapping { team })
    }

    fn current_mapping(&self) -> Arc<Mapping> {
        Arc::clone(&self.slots.read().current)
    }
}
