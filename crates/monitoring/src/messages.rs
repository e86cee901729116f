//! Small JSON messages exchanged with drones.

use serde::{Deserialize, Serialize};

/// Whether a drone is currently flying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovingState {
    Moving,
    Stopped,
}

/// Payload of `drone/<orderId>/moving`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingMessage {
    pub moving_state: MovingState,
}

/// Instruction for a drone in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneCommand {
    Halt,
    Proceed,
}

impl DroneCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneCommand::Halt => "halt",
            DroneCommand::Proceed => "proceed",
        }
    }
}

impl std::fmt::Display for DroneCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload of `drone/<orderId>/command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub command: DroneCommand,
}
