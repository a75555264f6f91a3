use crate::config::TransportMode;

/// Runtime control commands injected alongside the frame stream
/// (`!`-prefixed stdin lines).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    SetMode(TransportMode),
    SetEnabled(bool),
    ClearCache,
}

impl ControlCommand {
    /// Parses the text after the `!` prefix, e.g. `mode mqtt` or `disable`.
    pub fn parse(line: &str) -> Option<ControlCommand> {
        let mut parts = line.split_whitespace();
        match parts.next()? {
            "mode" => match parts.next()? {
                "http" => Some(ControlCommand::SetMode(TransportMode::Http)),
                "mqtt" => Some(ControlCommand::SetMode(TransportMode::Mqtt)),
                _ => None,
            },
            "enable" => Some(ControlCommand::SetEnabled(true)),
            "disable" => Some(ControlCommand::SetEnabled(false)),
            "clear" => Some(ControlCommand::ClearCache),
            _ => None,
        }
    }
}
