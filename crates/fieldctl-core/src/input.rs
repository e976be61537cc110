// ── Driver input sources ──

use dashmap::DashMap;
use tracing::debug;

use crate::error::InputError;
use crate::model::{ControlFrame, FieldLocation};

/// Supplies the latest controller state for a driver position.
pub trait InputSource: Send + Sync {
    fn get_state(&self, location: FieldLocation) -> Result<ControlFrame, InputError>;
}

#[derive(Debug, Clone)]
struct Binding {
    controller: String,
    state: Option<ControlFrame>,
}

/// In-memory input table for local-input setups.
///
/// Each location is bound to at most one controller id. Whatever reads the
/// physical controller calls [`update_state`](Self::update_state); the
/// pusher reads it back on every control tick.
#[derive(Debug, Default)]
pub struct InputTable {
    bindings: DashMap<FieldLocation, Binding>,
}

impl InputTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `controller` to `location`, discarding any state reported by
    /// the previous controller. A controller drives one location at a
    /// time, so an existing binding elsewhere is released. Returns the
    /// previously bound id.
    pub fn bind_controller(
        &self,
        location: FieldLocation,
        controller: impl Into<String>,
    ) -> Option<String> {
        let controller = controller.into();
        if let Some(old) = self.find_controller(&controller).filter(|l| *l != location) {
            debug!(%controller, from = %old, to = %location, "moving controller");
            self.bindings.remove(&old);
        }
        debug!(%location, %controller, "binding controller");
        self.bindings
            .insert(
                location,
                Binding {
                    controller,
                    state: None,
                },
            )
            .map(|old| old.controller)
    }

    pub fn unbind(&self, location: FieldLocation) -> Option<String> {
        self.bindings.remove(&location).map(|(_, b)| b.controller)
    }

    /// The controller id bound to `location`, if any.
    pub fn controller_for(&self, location: FieldLocation) -> Option<String> {
        self.bindings.get(&location).map(|b| b.controller.clone())
    }

    /// Find the location a controller is bound to.
    pub fn find_controller(&self, controller: &str) -> Option<FieldLocation> {
        self.bindings
            .iter()
            .find(|entry| entry.controller == controller)
            .map(|entry| *entry.key())
    }

    pub fn update_state(&self, location: FieldLocation, frame: ControlFrame) -> Result<(), InputError> {
        let mut binding = self
            .bindings
            .get_mut(&location)
            .ok_or(InputError::Unbound { location })?;
        binding.state = Some(frame);
        Ok(())
    }
}

impl InputSource for InputTable {
    fn get_state(&self, location: FieldLocation) -> Result<ControlFrame, InputError> {
        let binding = self
            .bindings
            .get(&location)
            .ok_or(InputError::Unbound { location })?;
        binding.state.ok_or(InputError::NoState { location })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn loc(s: &str) -> FieldLocation {
        s.parse().unwrap()
    }

    #[test]
    fn unbound_location_errors() {
        let table = InputTable::new();
        assert_eq!(
            table.get_state(loc("field1:red")),
            Err(InputError::Unbound {
                location: loc("field1:red")
            })
        );
        assert!(table.update_state(loc("field1:red"), ControlFrame::neutral()).is_err());
    }

    #[test]
    fn bound_without_state_reports_no_state() {
        let table = InputTable::new();
        table.bind_controller(loc("field1:blue"), "js0");
        assert_eq!(
            table.get_state(loc("field1:blue")),
            Err(InputError::NoState {
                location: loc("field1:blue")
            })
        );
    }

    #[test]
    fn update_then_read() {
        let table = InputTable::new();
        table.bind_controller(loc("field2:green"), "js1");

        let mut frame = ControlFrame::neutral();
        frame.button_a = true;
        table.update_state(loc("field2:green"), frame).unwrap();

        assert_eq!(table.get_state(loc("field2:green")).unwrap(), frame);
        assert_eq!(table.find_controller("js1"), Some(loc("field2:green")));
    }

    #[test]
    fn rebinding_clears_state() {
        let table = InputTable::new();
        table.bind_controller(loc("field1:red"), "js0");
        table
            .update_state(loc("field1:red"), ControlFrame::neutral())
            .unwrap();

        let previous = table.bind_controller(loc("field1:red"), "js3");

        assert_eq!(previous.as_deref(), Some("js0"));
        assert!(matches!(
            table.get_state(loc("field1:red")),
            Err(InputError::NoState { .. })
        ));
        assert_eq!(table.unbind(loc("field1:red")).as_deref(), Some("js3"));
        assert_eq!(table.controller_for(loc("field1:red")), None);
    }

    #[test]
    fn binding_moves_controller() {
        let table = InputTable::new();
        table.bind_controller(loc("field1:red"), "js0");
        table.bind_controller(loc("field1:blue"), "js0");

        assert_eq!(table.controller_for(loc("field1:red")), None);
        assert_eq!(table.controller_for(loc("field1:blue")).as_deref(), Some("js0"));
        assert_eq!(table.find_controller("js0"), Some(loc("field1:blue")));
    }
}
