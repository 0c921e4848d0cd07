//! Inbound and outbound message contracts for the transport adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::asset::AssetType;

/// Stable identity of an end user, as assigned by the transport.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to a file attachment held by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Transport-side file handle, opaque to the engine.
    pub file_ref: String,
    /// Content kind as detected by the transport.
    pub kind: AssetType,
}

/// A message delivered by the transport adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// UUIDv7 message id.
    pub id: Uuid,
    pub user: UserId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// A plain text message.
    pub fn text(user: UserId, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user,
            text: text.into(),
            attachment: None,
            received_at: Utc::now(),
        }
    }

    /// A message carrying a file attachment.
    pub fn with_attachment(user: UserId, attachment: AttachmentRef) -> Self {
        Self {
            id: Uuid::now_v7(),
            user,
            text: String::new(),
            attachment: Some(attachment),
            received_at: Utc::now(),
        }
    }

    /// The message text, trimmed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// A media reference for outbound messages with a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: AssetType,
}

/// A message for the transport adapter to deliver to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub user: UserId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
    /// Ask the transport not to render a link preview.
    #[serde(default)]
    pub disable_preview: bool,
}

impl OutboundMessage {
    pub fn text(user: UserId, text: impl Into<String>) -> Self {
        Self {
            user,
            text: text.into(),
            media: None,
            disable_preview: false,
        }
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }

    pub fn no_preview(mut self) -> Self {
        self.disable_preview = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_text_message() {
        let msg = InboundMessage::text(UserId::new("u1"), "  /register  ");
        assert_eq!(msg.trimmed(), "/register");
        assert!(msg.attachment.is_none());
    }

    #[test]
    fn test_inbound_serde_omits_missing_attachment() {
        let msg = InboundMessage::text(UserId::new("u1"), "hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("attachment"));
    }

    #[test]
    fn test_inbound_attachment_roundtrip() {
        let msg = InboundMessage::with_attachment(
            UserId::new("u2"),
            AttachmentRef {
                file_ref: "file-123".into(),
                kind: AssetType::Image,
            },
        );
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: InboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.attachment.unwrap().file_ref, "file-123");
    }

    #[test]
    fn test_outbound_builders() {
        let msg = OutboundMessage::text(UserId::new("u1"), "done")
            .with_media(MediaRef {
                url: "https://gateway.example/ipfs/Qm123".into(),
                kind: AssetType::Image,
            })
            .no_preview();
        assert!(msg.disable_preview);
        assert_eq!(msg.media.unwrap().kind, AssetType::Image);
    }
}
