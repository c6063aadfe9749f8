use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command sent over mpv's JSON IPC socket
#[derive(Debug, Clone, Serialize)]
pub struct IpcRequest {
    pub command: Vec<Value>,
    pub request_id: u64,
}

/// A line read back from the IPC socket: either a reply or an unsolicited event
#[derive(Debug, Clone, Deserialize)]
pub struct IpcResponse {
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub event: Option<String>,
}

impl IpcResponse {
    pub fn is_event(&self) -> bool {
        self.event.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.error.as_deref() == Some("success")
    }
}
