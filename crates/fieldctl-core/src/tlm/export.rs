// ── Match telemetry export ──

use tracing::info;

use crate::model::Mapping;

/// Receives every mapping that becomes current, so telemetry can label
/// robot stats with the match they belong to.
pub trait MatchExporter: Send + Sync {
    fn export_current_match(&self, mapping: &Mapping);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullExporter;

impl MatchExporter for NullExporter {
    fn export_current_match(&self, _mapping: &Mapping) {}
}

/// Emits one structured log line per mapped team.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExporter;

impl MatchExporter for LogExporter {
    fn export_current_match(&self, mapping: &Mapping) {
        for (team, location) in mapping.iter() {
            info!(
                team = team.get(),
                field = location.field(),
                quadrant = %location.quadrant(),
                "current match assignment"
            );
        }
    }
}
