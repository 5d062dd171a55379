use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Event name announcing a freshly stored selfie.
pub const IMAGE_SENT: &str = "imagesent";

/// Wire envelope for every frame on the hub: `{"event": ..., "data": ...}`.
///
/// Used to recognise inbound frames and to build outbound ones. The hub relays the
/// original text of a recognised frame, so keys this struct does not model survive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl HubEvent {
    pub fn image_sent(user_id: &str) -> Self {
        Self {
            event: IMAGE_SENT.to_string(),
            data: json!({ "userId": user_id }),
        }
    }

    pub fn is_image_sent(&self) -> bool {
        self.event == IMAGE_SENT
    }

    /// The `userId` carried by an `imagesent` payload, if it is a string.
    pub fn user_id(&self) -> Option<&str> {
        self.data.get("userId").and_then(|v| v.as_str())
    }
}
