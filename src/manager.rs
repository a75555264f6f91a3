use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::clock::{MonotonicClock, TimeSource as _};
use crate::config::Timing;
use crate::dashboard::{Channel, ChannelValue, DashboardLink};
use crate::gateway::MessageGateway;
use crate::messages::ControlCommand;
use crate::reader::TagReader;
use crate::tracker::{Decision, PresenceTracker};

/// How often the cooperative loop wakes to compare cadence deadlines.
const TICK: Duration = Duration::from_millis(10);

/// Owns every piece of mutable relay state and drives it from one task:
/// drain the reader, poll it on its own cadence, run the presence decision
/// at a coarser cadence, and heartbeat the dashboard. Transport sends are
/// awaited inline, so a stalled send stalls polling for its duration.
pub struct Manager<R: TagReader, D: DashboardLink> {
    reader: R,
    dashboard: D,
    gateway: MessageGateway,
    tracker: PresenceTracker,
    control: mpsc::UnboundedReceiver<ControlCommand>,
    timing: Timing,
    clock: MonotonicClock,
    last_poll_at: u32,
    last_decision_at: u32,
    last_heartbeat_at: u32,
}

impl<R: TagReader, D: DashboardLink> Manager<R, D> {
    pub fn new(
        reader: R,
        dashboard: D,
        gateway: MessageGateway,
        control: mpsc::UnboundedReceiver<ControlCommand>,
        timing: Timing,
    ) -> Self {
        Manager {
            reader,
            dashboard,
            gateway,
            tracker: PresenceTracker::new(timing.cooldown_ms, timing.push_min_interval_ms),
            control,
            timing,
            clock: MonotonicClock::new(),
            last_poll_at: 0,
            last_decision_at: 0,
            last_heartbeat_at: 0,
        }
    }

    pub async fn run_loop(mut self) -> anyhow::Result<()> {
        self.gateway.begin().await;
        let mut tick = tokio::time::interval(TICK);
        loop {
            tick.tick().await;
            let now = self.clock.now_ms();
            self.step(now).await;
        }
    }

    async fn step(&mut self, now: u32) {
        self.handle_control().await;

        // Buffered frames always get parsed before anything else.
        self.reader.pump();

        // Ask for a fresh inventory round only when the reader is idle.
        if now.wrapping_sub(self.last_poll_at) >= self.timing.poll_interval_ms
            && !self.reader.data_pending()
        {
            self.reader.poll();
            self.last_poll_at = now;
        }

        if now.wrapping_sub(self.last_heartbeat_at) >= self.timing.heartbeat_interval_ms {
            self.heartbeat(now);
            self.last_heartbeat_at = now;
        }

        if now.wrapping_sub(self.last_decision_at) < self.timing.loop_interval_ms {
            return;
        }
        self.last_decision_at = now;

        let uid = self.reader.current_uid();
        match self.tracker.observe(&uid, now) {
            Decision::Idle => {}
            Decision::Accepted { uid, push } => {
                info!("accepted tag {uid}");
                if push {
                    if !self.gateway.send_tag(&uid).await {
                        debug!("collector push dropped for {uid}");
                    }
                    self.dashboard
                        .push_value(Channel::LastUid, ChannelValue::Text(uid.to_hex()));
                    self.dashboard
                        .push_value(Channel::TagPresent, ChannelValue::Int(1));
                }
            }
            Decision::Cleared => {
                info!("tag field cleared");
                if !self.gateway.send_absent().await {
                    debug!("absence notification dropped");
                }
                self.dashboard
                    .push_value(Channel::TagPresent, ChannelValue::Int(0));
            }
        }
    }

    async fn handle_control(&mut self) {
        while let Ok(command) = self.control.try_recv() {
            match command {
                ControlCommand::SetMode(mode) => {
                    self.gateway.set_mode(mode).await;
                    info!("transport mode now {:?}", self.gateway.mode());
                }
                ControlCommand::SetEnabled(enabled) => {
                    self.gateway.set_enabled(enabled);
                    info!(
                        "gateway {}",
                        if self.gateway.is_enabled() {
                            "enabled"
                        } else {
                            "disabled"
                        }
                    );
                }
                ControlCommand::ClearCache => {
                    self.tracker.clear_cache();
                    info!("acceptance cache cleared");
                }
            }
        }
    }

    fn heartbeat(&mut self, now: u32) {
        self.dashboard
            .push_value(Channel::Uptime, ChannelValue::Int(now / 1000));
        self.dashboard.push_value(
            Channel::TagPresent,
            ChannelValue::Int(self.tracker.is_present() as u32),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, TransportMode};
    use crate::dashboard::RecordingDashboard;
    use crate::reader::FrameReader;
    use crate::uid::{TagUid, UID_LEN};

    fn uid(tag: u8) -> TagUid {
        let mut bytes = [0u8; UID_LEN];
        bytes[0] = tag;
        TagUid::new(bytes)
    }

    fn timing() -> Timing {
        Timing {
            poll_interval_ms: 350,
            loop_interval_ms: 60,
            cooldown_ms: 1200,
            push_min_interval_ms: 0,
            heartbeat_interval_ms: 1000,
        }
    }

    // Gateway that never does I/O; the manager's dashboard traffic is what
    // these tests observe.
    fn inert_gateway() -> MessageGateway {
        MessageGateway::new(GatewayConfig {
            mode: TransportMode::Http,
            enabled: Some(false),
            http: None,
            mqtt: None,
        })
    }

    struct Fixture {
        manager: Manager<FrameReader, RecordingDashboard>,
        frames: mpsc::UnboundedSender<TagUid>,
        control: mpsc::UnboundedSender<ControlCommand>,
    }

    fn fixture() -> Fixture {
        let (frames, frame_rx) = mpsc::unbounded_channel();
        let (control, control_rx) = mpsc::unbounded_channel();
        let manager = Manager::new(
            FrameReader::new(frame_rx),
            RecordingDashboard::new(),
            inert_gateway(),
            control_rx,
            timing(),
        );
        Fixture {
            manager,
            frames,
            control,
        }
    }

    #[tokio::test]
    async fn test_edges_reach_the_dashboard() {
        let mut f = fixture();

        f.frames.send(uid(0xA1)).unwrap();
        f.manager.step(60).await;
        assert_eq!(
            f.manager.dashboard.pushes,
            vec![
                (Channel::LastUid, ChannelValue::Text(uid(0xA1).to_hex())),
                (Channel::TagPresent, ChannelValue::Int(1)),
            ]
        );

        f.manager.dashboard.pushes.clear();
        f.frames.send(TagUid::ZERO).unwrap();
        f.manager.step(120).await;
        assert_eq!(
            f.manager.dashboard.pushes,
            vec![(Channel::TagPresent, ChannelValue::Int(0))]
        );
    }

    #[tokio::test]
    async fn test_decision_cadence_is_respected() {
        let mut f = fixture();
        f.frames.send(uid(1)).unwrap();
        // Too soon after the (implicit) tick at t=0.
        f.manager.step(59).await;
        assert!(f.manager.dashboard.pushes.is_empty());
        f.manager.step(60).await;
        assert!(!f.manager.dashboard.pushes.is_empty());
    }

    #[tokio::test]
    async fn test_heartbeat_reports_uptime_and_presence() {
        let mut f = fixture();
        f.manager.step(1000).await;
        assert_eq!(
            f.manager.dashboard.pushes[..2],
            [
                (Channel::Uptime, ChannelValue::Int(1)),
                (Channel::TagPresent, ChannelValue::Int(0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_cache_command_reopens_the_gate() {
        let mut f = fixture();
        let a = uid(5);

        f.frames.send(a).unwrap();
        f.manager.step(60).await;
        f.manager.dashboard.pushes.clear();

        // Steady re-read inside the cooldown: suppressed.
        f.manager.step(120).await;
        assert!(f.manager.dashboard.pushes.is_empty());

        f.control.send(ControlCommand::ClearCache).unwrap();
        f.manager.step(180).await;
        assert_eq!(
            f.manager.dashboard.pushes[0],
            (Channel::LastUid, ChannelValue::Text(a.to_hex()))
        );
    }
}
