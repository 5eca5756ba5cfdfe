use serde_json::Value;

pub const RESIZE_MESSAGE_TYPE: &str = "plugin.resize";

#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// Embedded content reporting its rendered height.
    Resize { height: f64 },
}

impl HostMessage {
    /// Parses a posted message; unknown types and malformed payloads yield
    /// `None` and are ignored by the host.
    pub fn parse(raw: &Value) -> Option<Self> {
        match raw.get("type").and_then(Value::as_str) {
            Some(RESIZE_MESSAGE_TYPE) => {
                let height = raw.get("payload")?.get("height")?.as_f64()?;
                if !height.is_finite() {
                    return None;
                }
                Some(HostMessage::Resize { height })
            }
            _ => None,
        }
    }
}
