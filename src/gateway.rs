use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, warn};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde_derive::Serialize;

use crate::clock::{MonotonicClock, TimeSource};
use crate::config::{GatewayConfig, HttpConfig, MqttConfig, TransportMode};
use crate::uid::TagUid;

const MQTT_CONNECT_ATTEMPTS: u8 = 3;
const MQTT_CONNECT_PAUSE: Duration = Duration::from_millis(100);
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTT_TOPIC: &str = "tags/ingest";
const DEFAULT_MQTT_CLIENT_ID: &str = "tag-relay";

/// Wire payload consumed by the collector. Field order is part of the
/// contract; `uid` is omitted entirely for absence events.
#[derive(Debug, Serialize)]
struct EventPayload {
    ts: u32,
    tag_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
}

fn build_payload(uid: Option<&TagUid>, ts: u32) -> String {
    let payload = EventPayload {
        ts,
        tag_present: uid.is_some(),
        uid: uid.map(TagUid::to_hex),
    };
    serde_json::to_string(&payload).unwrap()
}

// Success window matching the HTTP client convention where connection
// failures surface as a negative code.
fn is_success_code(code: i32) -> bool {
    (1..400).contains(&code)
}

struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    fn new() -> Self {
        HttpTransport {
            client: reqwest::Client::new(),
        }
    }

    async fn send(&self, config: Option<&HttpConfig>, payload: &str) -> bool {
        let Some(config) = config else {
            warn!("http transport selected but no [gateway.http] config");
            return false;
        };
        if config.endpoint.is_empty() {
            return false;
        }

        let mut request = self
            .client
            .post(&config.endpoint)
            .header("Content-Type", "application/json")
            .body(payload.to_owned());
        if let Some(token) = config.bearer_token.as_ref() {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => is_success_code(i32::from(response.status().as_u16())),
            Err(err) => {
                debug!("http send failed: {err}");
                false
            }
        }
    }
}

struct MqttTransport {
    client: Option<AsyncClient>,
    connected: Arc<AtomicBool>,
    event_task: Option<tokio::task::JoinHandle<()>>,
}

impl MqttTransport {
    fn new() -> Self {
        MqttTransport {
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            event_task: None,
        }
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Relaxed)
    }

    async fn ensure_connected(&mut self, config: &MqttConfig) -> bool {
        if self.is_connected() {
            return true;
        }
        for attempt in 0..MQTT_CONNECT_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(MQTT_CONNECT_PAUSE).await;
            }
            if self.try_connect(config).await {
                return true;
            }
        }
        false
    }

    async fn try_connect(&mut self, config: &MqttConfig) -> bool {
        self.teardown();

        let base = config.client_id.as_deref().unwrap_or(DEFAULT_MQTT_CLIENT_ID);
        let client_id = format!("{}-{:x}", base, rand::random::<u32>());
        let mut options = MqttOptions::new(
            client_id,
            config.host.clone(),
            config.port.unwrap_or(DEFAULT_MQTT_PORT),
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_seconds.unwrap_or(5)));
        if let (Some(username), Some(password)) =
            (config.username.as_ref(), config.password.as_ref())
        {
            options.set_credentials(username.clone(), password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // The first poll drives the TCP connect and MQTT handshake.
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {}
            Ok(other) => {
                debug!("unexpected event during mqtt connect: {other:?}");
                return false;
            }
            Err(err) => {
                debug!("mqtt connect failed: {err}");
                return false;
            }
        }

        let connected = Arc::new(AtomicBool::new(true));
        let flag = connected.clone();
        // Keep-alive pings and broker traffic need the event loop polled for
        // the lifetime of the connection.
        let task = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!("mqtt event: {event:?}"),
                    Err(err) => {
                        error!("mqtt connection lost: {err}");
                        flag.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            }
        });

        self.client = Some(client);
        self.connected = connected;
        self.event_task = Some(task);
        true
    }

    async fn publish(&mut self, config: &MqttConfig, payload: &str) -> bool {
        if !self.ensure_connected(config).await {
            return false;
        }
        let Some(client) = self.client.as_ref() else {
            return false;
        };

        let topic = config.topic.as_deref().unwrap_or(DEFAULT_MQTT_TOPIC);
        let retain = config.retain.unwrap_or(true);
        match client
            .publish(topic, QoS::AtMostOnce, retain, payload.to_owned())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!("mqtt publish failed: {err:?}");
                self.connected.store(false, Ordering::Relaxed);
                false
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        self.client = None;
        self.connected.store(false, Ordering::Relaxed);
    }
}

enum Transport {
    Http(HttpTransport),
    Mqtt(MqttTransport),
}

impl Transport {
    fn for_mode(mode: TransportMode) -> Transport {
        match mode {
            TransportMode::Http => Transport::Http(HttpTransport::new()),
            TransportMode::Mqtt => Transport::Mqtt(MqttTransport::new()),
        }
    }
}

/// Turns accepted readings and absence edges into wire payloads and pushes
/// them over the active transport. Failures are terminal for that one call
/// and surface as `false`; nothing is queued or retried beyond the built-in
/// MQTT reconnect budget.
pub struct MessageGateway {
    config: GatewayConfig,
    enabled: bool,
    transport: Transport,
    clock: Box<dyn TimeSource>,
}

impl MessageGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self::with_time_source(config, Box::new(MonotonicClock::new()))
    }

    /// Same as `new` but with an injected millisecond time source.
    pub fn with_time_source(config: GatewayConfig, clock: Box<dyn TimeSource>) -> Self {
        let enabled = config.enabled.unwrap_or(true);
        let transport = Transport::for_mode(config.mode);
        MessageGateway {
            config,
            enabled,
            transport,
            clock,
        }
    }

    /// Brings up the selected transport. Only MQTT has connection state to
    /// establish ahead of the first send.
    pub async fn begin(&mut self) {
        if let (Transport::Mqtt(transport), Some(mqtt)) =
            (&mut self.transport, self.config.mqtt.as_ref())
        {
            if !transport.ensure_connected(mqtt).await {
                warn!("mqtt broker unreachable at startup; will retry on send");
            }
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switches the active transport, tearing down the old connection state
    /// and initializing the new one.
    pub async fn set_mode(&mut self, mode: TransportMode) {
        if let Transport::Mqtt(transport) = &mut self.transport {
            transport.teardown();
        }
        self.config.mode = mode;
        self.transport = Transport::for_mode(mode);
        self.begin().await;
    }

    pub fn mode(&self) -> TransportMode {
        self.config.mode
    }

    pub async fn send_tag(&mut self, uid: &TagUid) -> bool {
        if !self.enabled {
            return false;
        }
        let payload = build_payload(Some(uid), self.clock.now_ms());
        self.dispatch(&payload).await
    }

    pub async fn send_absent(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        let payload = build_payload(None, self.clock.now_ms());
        self.dispatch(&payload).await
    }

    async fn dispatch(&mut self, payload: &str) -> bool {
        debug!("dispatching {payload}");
        match &mut self.transport {
            Transport::Http(transport) => transport.send(self.config.http.as_ref(), payload).await,
            Transport::Mqtt(transport) => match self.config.mqtt.as_ref() {
                Some(mqtt) => transport.publish(mqtt, payload).await,
                None => {
                    warn!("mqtt transport selected but no [gateway.mqtt] config");
                    false
                }
            },
        }
    }
}
