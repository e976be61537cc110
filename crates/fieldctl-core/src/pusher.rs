// ── Control / location distribution ──
//
// Two periodic tasks read the mapping store and publish per-team frames
// to the broker. Within a tick every team is handled concurrently and
// failures stay with the team that caused them. Shutdown is observed only
// between ticks, so a tick that has started always finishes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PusherConfig;
use crate::error::PublishError;
use crate::input::InputSource;
use crate::model::{LocationFrame, TeamNumber};
use crate::tlm::TeamLocationMapper;

/// Aggregate mapping topic, published alongside per-team location frames.
pub const LOCATIONS_TOPIC: &str = "sys/tlm/locations";

pub fn gamepad_topic(team: TeamNumber) -> String {
    format!("robot/{team}/gamepad")
}

pub fn location_topic(team: TeamNumber) -> String {
    format!("robot/{team}/location")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Fire and forget. Used for high-rate control frames where the next
    /// tick supersedes a lost one.
    AtMostOnce,
    AtLeastOnce,
}

/// Outbound broker connection.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        delivery: Delivery,
    ) -> Result<(), PublishError>;
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub published: usize,
    pub failed: usize,
}

impl TickReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.published += 1;
        } else {
            self.failed += 1;
        }
    }
}

struct PusherInner {
    mapper: Arc<dyn TeamLocationMapper>,
    input: Arc<dyn InputSource>,
    publisher: Arc<dyn Publisher>,
    config: PusherConfig,
}

/// Owns the periodic distribution tasks.
pub struct Pusher {
    inner: Arc<PusherInner>,
    cancel: Mutex<CancellationToken>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Pusher {
    pub fn new(
        mapper: Arc<dyn TeamLocationMapper>,
        input: Arc<dyn InputSource>,
        publisher: Arc<dyn Publisher>,
        config: PusherConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PusherInner {
                mapper,
                input,
                publisher,
                config,
            }),
            cancel: Mutex::new(CancellationToken::new()),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the control and location tasks. Calling `start` on a running
    /// pusher is a no-op.
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            return;
        }

        let cancel = {
            let mut guard = self.cancel.lock();
            if guard.is_cancelled() {
                *guard = CancellationToken::new();
            }
            guard.clone()
        };

        let cfg = &self.inner.config;
        info!(
            control_ms = cfg.control_period.as_millis(),
            location_ms = cfg.location_period.as_millis(),
            "starting distribution pusher"
        );

        handles.push(tokio::spawn(tick_task(
            Arc::clone(&self.inner),
            cfg.control_period,
            cancel.clone(),
            Tick::Control,
        )));
        handles.push(tokio::spawn(tick_task(
            Arc::clone(&self.inner),
            cfg.location_period,
            cancel,
            Tick::Location,
        )));
    }

    /// Signal both tasks and wait for them to finish their current tick.
    pub async fn stop(&self) {
        self.cancel.lock().cancel();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("distribution pusher stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    /// Run one control tick now.
    pub async fn push_controls(&self) -> TickReport {
        self.inner.push_controls().await
    }

    /// Run one location tick now.
    pub async fn push_locations(&self) -> TickReport {
        self.inner.push_locations().await
    }
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Control,
    Location,
}

async fn tick_task(inner: Arc<PusherInner>, period: Duration, cancel: CancellationToken, kind: Tick) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let report = match kind {
                    Tick::Control => inner.push_controls().await,
                    Tick::Location => inner.push_locations().await,
                };
                if report.failed > 0 {
                    debug!(?kind, published = report.published, failed = report.failed, "tick finished with failures");
                }
            }
        }
    }
    debug!(?kind, "tick task exiting");
}

impl PusherInner {
    async fn push_controls(&self) -> TickReport {
        let mapping = self.mapper.current_mapping();

        let sends = mapping.iter().map(|(team, location)| async move {
            let frame = match self.input.get_state(location) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(team = team.get(), %location, error = %e, "no input for team");
                    return false;
                }
            };
            self.send_json(&gamepad_topic(team), &frame, Delivery::AtMostOnce)
                .await
                .map_err(|e| warn!(team = team.get(), error = %e, "control publish failed"))
                .is_ok()
        });

        let mut report = TickReport::default();
        for ok in join_all(sends).await {
            report.record(ok);
        }
        report
    }

    async fn push_locations(&self) -> TickReport {
        let mapping = self.mapper.current_mapping();

        let sends = mapping.iter().map(|(team, location)| async move {
            let frame = LocationFrame::from(location);
            self.send_json(&location_topic(team), &frame, Delivery::AtLeastOnce)
                .await
                .map_err(|e| warn!(team = team.get(), error = %e, "location publish failed"))
                .is_ok()
        });
        let aggregate = async {
            self.send_json(LOCATIONS_TOPIC, &*mapping, Delivery::AtLeastOnce)
                .await
                .map_err(|e| warn!(error = %e, "mapping publish failed"))
                .is_ok()
        };

        let (teams, aggregate_ok) = tokio::join!(join_all(sends), aggregate);

        let mut report = TickReport::default();
        for ok in teams {
            report.record(ok);
        }
        report.record(aggregate_ok);
        report
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        value: &T,
        delivery: Delivery,
    ) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(value).map_err(|source| PublishError::Encode {
            topic: topic.to_owned(),
            source,
        })?;
        tokio::time::timeout(
            self.config.publish_timeout,
            self.publisher.publish(topic, payload, delivery),
        )
        .await
        .map_err(|_| PublishError::Timeout {
            topic: topic.to_owned(),
        })?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::input::InputTable;
    use crate::model::{ControlFrame, FieldLocation, Mapping};
    use crate::tlm::MappingStore;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, Vec<u8>, Delivery)>>,
        /// Topics that fail immediately.
        reject: HashSet<String>,
        /// Topics that never complete.
        hang: HashSet<String>,
    }

    impl RecordingPublisher {
        fn topics(&self) -> Vec<String> {
            let mut t: Vec<_> = self.sent.lock().iter().map(|(t, _, _)| t.clone()).collect();
            t.sort();
            t
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
            delivery: Delivery,
        ) -> Result<(), PublishError> {
            if self.hang.contains(topic) {
                std::future::pending::<()>().await;
            }
            if self.reject.contains(topic) {
                return Err(PublishError::Broker {
                    topic: topic.to_owned(),
                    message: "not connected".into(),
                });
            }
            self.sent.lock().push((topic.to_owned(), payload, delivery));
            Ok(())
        }
    }

    fn team(n: u32) -> TeamNumber {
        TeamNumber::new(n).unwrap()
    }

    fn loc(s: &str) -> FieldLocation {
        s.parse().unwrap()
    }

    async fn fixture(
        publisher: Arc<RecordingPublisher>,
    ) -> (Arc<MappingStore>, Arc<InputTable>, Pusher) {
        let store = Arc::new(MappingStore::detached());
        let mapping: Mapping = [
            (team(1), loc("field1:red")),
            (team(2), loc("field1:blue")),
            (team(3), loc("field1:green")),
        ]
        .into_iter()
        .collect();
        store.insert_on_demand_map(mapping).await.unwrap();

        let input = Arc::new(InputTable::new());
        for l in ["field1:red", "field1:blue", "field1:green"] {
            input.bind_controller(loc(l), format!("js-{l}"));
            input.update_state(loc(l), ControlFrame::neutral()).unwrap();
        }

        let pusher = Pusher::new(
            store.clone(),
            input.clone(),
            publisher,
            PusherConfig::default(),
        );
        (store, input, pusher)
    }

    #[tokio::test]
    async fn control_tick_publishes_every_mapped_team() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_, _, pusher) = fixture(publisher.clone()).await;

        let report = pusher.push_controls().await;

        assert_eq!(report, TickReport { published: 3, failed: 0 });
        assert_eq!(
            publisher.topics(),
            vec!["robot/1/gamepad", "robot/2/gamepad", "robot/3/gamepad"]
        );
        let (_, payload, delivery) = publisher.sent.lock()[0].clone();
        assert_eq!(delivery, Delivery::AtMostOnce);
        let frame: ControlFrame = serde_json::from_slice(&payload).unwrap();
        assert_eq!(frame, ControlFrame::neutral());
    }

    #[tokio::test]
    async fn input_failure_is_isolated_to_one_team() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_, input, pusher) = fixture(publisher.clone()).await;
        input.unbind(loc("field1:blue"));

        let report = pusher.push_controls().await;

        assert_eq!(report, TickReport { published: 2, failed: 1 });
        assert_eq!(publisher.topics(), vec!["robot/1/gamepad", "robot/3/gamepad"]);
    }

    #[tokio::test]
    async fn broker_failure_is_isolated_to_one_team() {
        let publisher = Arc::new(RecordingPublisher {
            reject: HashSet::from(["robot/3/gamepad".to_owned()]),
            ..Default::default()
        });
        let (_, _, pusher) = fixture(publisher.clone()).await;

        let report = pusher.push_controls().await;

        assert_eq!(report.failed, 1);
        assert_eq!(publisher.topics(), vec!["robot/1/gamepad", "robot/2/gamepad"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_publish_does_not_block_other_teams() {
        let publisher = Arc::new(RecordingPublisher {
            hang: HashSet::from(["robot/2/gamepad".to_owned()]),
            ..Default::default()
        });
        let (_, _, pusher) = fixture(publisher.clone()).await;

        let report = pusher.push_controls().await;

        assert_eq!(report, TickReport { published: 2, failed: 1 });
        assert_eq!(publisher.topics(), vec!["robot/1/gamepad", "robot/3/gamepad"]);
    }

    #[tokio::test]
    async fn location_tick_publishes_frames_and_aggregate() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_, _, pusher) = fixture(publisher.clone()).await;

        let report = pusher.push_locations().await;

        assert_eq!(report, TickReport { published: 4, failed: 0 });
        let sent = publisher.sent.lock().clone();

        let (_, payload, _) = sent
            .iter()
            .find(|(t, _, _)| t == "robot/2/location")
            .unwrap();
        let frame: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(frame, serde_json::json!({"Field": 1, "Quadrant": "BLUE"}));

        let (_, payload, _) = sent.iter().find(|(t, _, _)| t == LOCATIONS_TOPIC).unwrap();
        let all: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(
            all,
            serde_json::json!({"1": "field1:red", "2": "field1:blue", "3": "field1:green"})
        );
    }

    #[tokio::test]
    async fn empty_mapping_publishes_only_aggregate() {
        let publisher = Arc::new(RecordingPublisher::default());
        let pusher = Pusher::new(
            Arc::new(MappingStore::detached()),
            Arc::new(InputTable::new()),
            publisher.clone(),
            PusherConfig::default(),
        );

        assert_eq!(pusher.push_controls().await, TickReport::default());
        assert_eq!(pusher.push_locations().await.published, 1);
        assert_eq!(publisher.topics(), vec![LOCATIONS_TOPIC]);
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_tick_until_stopped() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_, _, pusher) = fixture(publisher.clone()).await;

        pusher.start();
        assert!(pusher.is_running());
        tokio::time::sleep(Duration::from_millis(130)).await;
        pusher.stop().await;
        assert!(!pusher.is_running());

        let after_stop = publisher.sent.lock().len();
        assert!(after_stop >= 3, "expected at least one control tick, saw {after_stop}");

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(publisher.sent.lock().len(), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (_, _, pusher) = fixture(publisher.clone()).await;

        pusher.start();
        pusher.stop().await;
        let before = publisher.sent.lock().len();

        pusher.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        pusher.stop().await;

        assert!(publisher.sent.lock().len() > before);
    }

    #[tokio::test]
    async fn remap_is_seen_on_next_tick() {
        let publisher = Arc::new(RecordingPublisher::default());
        let (store, input, pusher) = fixture(publisher.clone()).await;

        let moved: Mapping = [(team(9), loc("field1:red"))].into_iter().collect();
        store.insert_on_demand_map(moved).await.unwrap();
        input
            .update_state(loc("field1:red"), ControlFrame::neutral())
            .unwrap();

        pusher.push_controls().await;
        assert_eq!(publisher.topics(), vec!["robot/9/gamepad"]);
    }
}
