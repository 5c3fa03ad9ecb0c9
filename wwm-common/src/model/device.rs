//! Device liveness and push-channel connection state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness of the classification device; a single last-writer-wins value
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub online: bool,
}

impl DeviceStatus {
    /// Same device, marked offline
    pub fn offline(&self) -> Self {
        Self {
            device_id: self.device_id.clone(),
            online: false,
        }
    }
}

/// Push-channel connection state, owned by the stream client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}
