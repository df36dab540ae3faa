use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    domain::{ContextId, MenuId, OverlayId, SurfaceId},
    error::RelayError,
};

pub type Args = serde_json::Map<String, Value>;

/// Command names understood by the page scripts and the coordinator.
pub mod commands {
    pub const RUN_LOGIC: &str = "runLogic";
    pub const ADD_MENU: &str = "addMenu";
    pub const HANDLE_IMAGE_DATA: &str = "handleImageData";
    pub const OPEN_OVERLAY: &str = "openOverlay";
    pub const CLOSE_OVERLAY: &str = "closeOverlay";
    pub const RENDER: &str = "render";
    pub const RENDER_ALTERED_IMAGE: &str = "renderAlteredImage";
}

/// A routed command. `to` is soft addressing only: it is compared as a string and
/// carries no proof of who sent the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ContextId>,
    pub cmd: String,
    #[serde(default)]
    pub args: Args,
}

impl Message {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            to: None,
            cmd: cmd.into(),
            args: Args::new(),
        }
    }

    pub fn addressed(to: ContextId, cmd: impl Into<String>) -> Self {
        Self {
            to: Some(to),
            cmd: cmd.into(),
            args: Args::new(),
        }
    }

    pub fn with_args<T: Serialize>(mut self, args: &T) -> Result<Self, RelayError> {
        match serde_json::to_value(args) {
            Ok(Value::Object(map)) => {
                self.args = map;
                Ok(self)
            }
            Ok(_) => Err(RelayError::invalid_args(
                self.cmd,
                <serde_json::Error as serde::ser::Error>::custom("args must be an object"),
            )),
            Err(err) => Err(RelayError::invalid_args(self.cmd, err)),
        }
    }

    pub fn args_as<T: DeserializeOwned>(&self) -> Result<T, RelayError> {
        serde_json::from_value(Value::Object(self.args.clone()))
            .map_err(|err| RelayError::invalid_args(self.cmd.clone(), err))
    }

    /// True when `identity` may execute this message locally.
    pub fn is_for(&self, identity: &ContextId) -> bool {
        self.to.as_ref().map_or(true, |to| to == identity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOverlayArgs {
    pub overlay: ContextId,
    pub hidden: bool,
    pub id: OverlayId,
    pub old_image_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderArgs {
    pub old_image_src: String,
    pub id: OverlayId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDataArgs {
    pub old_image_src: String,
    pub new_image_src: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseOverlayArgs {
    pub id: OverlayId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransformStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    pub status: TransformStatus,
    pub old_image_locator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image_locator: Option<String>,
}

impl TransformResult {
    pub fn ok(old_image_locator: impl Into<String>, new_image_locator: impl Into<String>) -> Self {
        Self {
            status: TransformStatus::Ok,
            old_image_locator: old_image_locator.into(),
            new_image_locator: Some(new_image_locator.into()),
        }
    }

    pub fn error(old_image_locator: impl Into<String>) -> Self {
        Self {
            status: TransformStatus::Error,
            old_image_locator: old_image_locator.into(),
            new_image_locator: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == TransformStatus::Ok
    }
}

/// Who sent a delivered message. Stamped by the transport, not by the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderInfo {
    pub context: ContextId,
    pub surface: Option<SurfaceId>,
    pub instance: Uuid,
}

/// Outcome of a send that asked for an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Replied(Value),
    /// Nobody received the message, or the receiver finished without answering.
    NoListener,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub menu_id: MenuId,
    pub source_image_locator: String,
    pub target_surface: SurfaceId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_to_is_omitted_from_the_wire_shape() {
        let json = serde_json::to_value(Message::new(commands::ADD_MENU)).expect("json");
        assert_eq!(json, serde_json::json!({ "cmd": "addMenu", "args": {} }));
    }

    #[test]
    fn typed_args_use_camel_case_keys() {
        let message = Message::addressed(ContextId::scrape(), commands::RENDER)
            .with_args(&RenderArgs {
                old_image_src: "http://x/img.png".into(),
                id: OverlayId::new("relay_1"),
            })
            .expect("args");

        assert_eq!(message.args["oldImageSrc"], "http://x/img.png");
        assert_eq!(message.args["id"], "relay_1");
        let back: RenderArgs = message.args_as().expect("decode");
        assert_eq!(back.id.as_str(), "relay_1");
    }

    #[test]
    fn missing_args_are_reported_with_the_command_name() {
        let err = Message::new(commands::CLOSE_OVERLAY)
            .args_as::<CloseOverlayArgs>()
            .expect_err("id is required");
        assert!(err.to_string().contains("closeOverlay"));
    }

    #[test]
    fn unaddressed_messages_are_for_everyone() {
        let message = Message::new(commands::RUN_LOGIC);
        assert!(message.is_for(&ContextId::background()));
        assert!(message.is_for(&ContextId::logic()));

        let addressed = Message::addressed(ContextId::logic(), commands::CLOSE_OVERLAY);
        assert!(addressed.is_for(&ContextId::logic()));
        assert!(!addressed.is_for(&ContextId::scrape()));
    }

    #[test]
    fn transform_status_uses_upper_case_names() {
        let json = serde_json::to_value(TransformResult::error("http://x/broken.png"))
            .expect("json");
        assert_eq!(
            json,
            serde_json::json!({ "status": "ERROR", "oldImageLocator": "http://x/broken.png" })
        );
    }
}
