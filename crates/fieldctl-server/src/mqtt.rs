// ── MQTT publisher ──
//
// rumqttc splits a connection into a cloneable client (request queue) and
// an event loop that must be polled for anything to reach the wire. The
// driver task owns the event loop and reconnects with a fixed backoff.

use std::time::Duration;

use async_trait::async_trait;
use fieldctl_core::{Delivery, PublishError, Publisher};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Where and how to reach the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Outstanding requests buffered while the connection is down.
    pub request_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "fieldctl".into(),
            keep_alive: Duration::from_secs(5),
            request_capacity: 256,
        }
    }
}

/// [`Publisher`] backed by an MQTT broker connection.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Create the client and spawn the event loop driver. The driver exits
    /// when `cancel` fires.
    pub fn connect(config: &BrokerConfig, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (client, eventloop) = Self::pair(config);
        info!(host = %config.host, port = config.port, client_id = %config.client_id, "connecting to broker");
        let handle = tokio::spawn(drive(eventloop, client.clone(), cancel));
        (Self { client }, handle)
    }

    fn pair(config: &BrokerConfig) -> (AsyncClient, EventLoop) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);
        options.set_clean_session(true);
        AsyncClient::new(options, config.request_capacity.max(1))
    }
}

fn qos(delivery: Delivery) -> QoS {
    match delivery {
        Delivery::AtMostOnce => QoS::AtMostOnce,
        Delivery::AtLeastOnce => QoS::AtLeastOnce,
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        delivery: Delivery,
    ) -> Result<(), PublishError> {
        self.client
            .publish(topic, qos(delivery), false, payload)
            .await
            .map_err(|e| PublishError::Broker {
                topic: topic.to_owned(),
                message: e.to_string(),
            })
    }
}

async fn drive(mut eventloop: EventLoop, client: AsyncClient, cancel: CancellationToken) {
    let mut connected = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    connected = true;
                    info!("broker connection established");
                }
                Ok(_) => {}
                Err(e) => {
                    if connected {
                        warn!(error = %e, "broker connection lost");
                    } else {
                        debug!(error = %e, "broker connection attempt failed");
                    }
                    connected = false;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }

    if connected {
        let _ = client.try_disconnect();
    }
    debug!("broker driver exiting");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn delivery_maps_to_qos() {
        assert_eq!(qos(Delivery::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(qos(Delivery::AtLeastOnce), QoS::AtLeastOnce);
    }

    #[tokio::test]
    async fn publish_queues_while_disconnected() {
        let (client, _eventloop) = MqttPublisher::pair(&BrokerConfig::default());
        let publisher = MqttPublisher { client };

        publisher
            .publish("robot/7/gamepad", b"{}".to_vec(), Delivery::AtMostOnce)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn driver_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let config = BrokerConfig {
            // Nothing listens here; the driver just keeps retrying.
            port: 1,
            ..BrokerConfig::default()
        };
        let (_publisher, handle) = MqttPublisher::connect(&config, cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
