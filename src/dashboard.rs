use log::info;

/// Logical channels on the operator dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    LastUid,
    Uptime,
    TagPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelValue {
    Int(u32),
    Text(String),
}

/// Seam over the dashboard SDK: push one value to one logical channel.
/// Delivery is fire-and-forget.
pub trait DashboardLink {
    fn push_value(&mut self, channel: Channel, value: ChannelValue);
}

/// Mirrors every push to the log. Stands in when no real dashboard SDK is
/// wired up.
pub struct LogDashboard;

impl DashboardLink for LogDashboard {
    fn push_value(&mut self, channel: Channel, value: ChannelValue) {
        match value {
            ChannelValue::Int(v) => info!("dashboard {channel:?} <- {v}"),
            ChannelValue::Text(v) => info!("dashboard {channel:?} <- {v}"),
        }
    }
}

#[cfg(test)]
pub struct RecordingDashboard {
    pub pushes: Vec<(Channel, ChannelValue)>,
}

#[cfg(test)]
impl RecordingDashboard {
    pub fn new() -> Self {
        RecordingDashboard { pushes: Vec::new() }
    }
}

#[cfg(test)]
impl DashboardLink for RecordingDashboard {
    fn push_value(&mut self, channel: Channel, value: ChannelValue) {
        self.pushes.push((channel, value));
    }
}
