use serde_derive::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub timing: Option<TimingConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Http,
    Mqtt,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GatewayConfig {
    pub mode: TransportMode,
    pub enabled: Option<bool>,
    pub http: Option<HttpConfig>,
    pub mqtt: Option<MqttConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: String,
    pub bearer_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Base client id; a random hex suffix is appended per connect attempt.
    pub client_id: Option<String>,
    pub topic: Option<String>,
    pub retain: Option<bool>,
    pub keep_alive_seconds: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
pub struct TimingConfig {
    pub poll_interval_ms: Option<u32>,
    pub loop_interval_ms: Option<u32>,
    pub cooldown_ms: Option<u32>,
    pub push_min_interval_ms: Option<u32>,
    pub heartbeat_interval_ms: Option<u32>,
}

/// Cadence constants with defaults filled in.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    pub poll_interval_ms: u32,
    pub loop_interval_ms: u32,
    pub cooldown_ms: u32,
    pub push_min_interval_ms: u32,
    pub heartbeat_interval_ms: u32,
}

impl TimingConfig {
    pub fn resolve(&self) -> Timing {
        Timing {
            poll_interval_ms: self.poll_interval_ms.unwrap_or(350),
            loop_interval_ms: self.loop_interval_ms.unwrap_or(60),
            cooldown_ms: self.cooldown_ms.unwrap_or(1200),
            push_min_interval_ms: self.push_min_interval_ms.unwrap_or(150),
            heartbeat_interval_ms: self.heartbeat_interval_ms.unwrap_or(1000),
        }
    }
}
