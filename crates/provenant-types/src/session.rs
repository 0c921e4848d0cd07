//! Conversational session state.
//!
//! One session tracks one user's progress through a multi-step workflow.
//! The state is a tagged enum rather than a loose string-keyed map, so
//! illegal combinations are unrepresentable and every transition is
//! explicit in the engine.

use chrono::{DateTime, Duration, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::asset::{AssetId, AssetType, ContentHash};
use crate::message::UserId;

/// The multi-step workflow kinds that hold a session open between messages.
///
/// Single-shot commands (balance, my-assets, start) complete within one
/// message and never create a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowKind {
    Register,
    License,
    Transfer,
    Verify,
    AssetsByAddress,
}

impl std::fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowKind::Register => "register",
            WorkflowKind::License => "license",
            WorkflowKind::Transfer => "transfer",
            WorkflowKind::Verify => "verify",
            WorkflowKind::AssetsByAddress => "assets-by-address",
        };
        f.write_str(name)
    }
}

/// The step a session is currently waiting on.
///
/// Which variants are legal depends on the session's `WorkflowKind`; the
/// engine only ever constructs valid combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Register: waiting for a file attachment.
    AwaitFile,
    /// License/transfer: waiting for the asset id.
    AwaitAssetId,
    /// License: waiting for the price.
    AwaitPrice,
    /// License: waiting for the commercial yes/no answer.
    AwaitCommercial,
    /// License: waiting for the royalty percentage.
    AwaitRoyalty,
    /// Transfer: waiting for the recipient address.
    AwaitRecipient,
    /// Verify: waiting for `hash` or `id` method selection.
    AwaitMethod,
    /// Verify: waiting for a content hash.
    AwaitHash,
    /// Verify: waiting for an asset id.
    AwaitId,
    /// Assets-by-address: waiting for a wallet address.
    AwaitAddress,
    /// A write call is in flight; no further input is accepted until it
    /// reaches a terminal outcome.
    Submitting,
}

/// Fields accumulated across a session's completed steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowFields {
    pub asset_id: Option<AssetId>,
    /// Price in base units, already scaled.
    pub price_wei: Option<U256>,
    /// Price exactly as the user typed it, for echo in confirmations.
    pub price_text: Option<String>,
    pub commercial: Option<bool>,
    pub royalty_percent: Option<u8>,
    pub recipient: Option<Address>,
    pub content_hash: Option<ContentHash>,
    pub asset_type: Option<AssetType>,
}

/// One user's in-progress workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user: UserId,
    pub flow: WorkflowKind,
    pub state: FlowState,
    pub fields: FlowFields,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session in the given workflow's entry state.
    pub fn new(user: UserId, flow: WorkflowKind, state: FlowState) -> Self {
        let now = Utc::now();
        Self {
            user,
            flow,
            state,
            fields: FlowFields::default(),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Record activity, resetting the idle clock.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    /// How long the session has been idle.
    pub fn idle_for(&self) -> Duration {
        Utc::now() - self.last_active_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_fresh() {
        let s = Session::new(
            UserId::new("u1"),
            WorkflowKind::License,
            FlowState::AwaitAssetId,
        );
        assert_eq!(s.state, FlowState::AwaitAssetId);
        assert!(s.fields.asset_id.is_none());
        assert!(s.idle_for() < Duration::seconds(1));
    }

    #[test]
    fn test_touch_resets_idle_clock() {
        let mut s = Session::new(
            UserId::new("u1"),
            WorkflowKind::Transfer,
            FlowState::AwaitAssetId,
        );
        s.last_active_at = Utc::now() - Duration::minutes(20);
        assert!(s.idle_for() >= Duration::minutes(20));
        s.touch();
        assert!(s.idle_for() < Duration::seconds(1));
    }

    #[test]
    fn test_workflow_kind_display() {
        assert_eq!(WorkflowKind::Register.to_string(), "register");
        assert_eq!(WorkflowKind::AssetsByAddress.to_string(), "assets-by-address");
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let mut s = Session::new(
            UserId::new("u1"),
            WorkflowKind::License,
            FlowState::AwaitRoyalty,
        );
        s.fields.asset_id = Some(AssetId(7));
        s.fields.price_wei = Some(U256::exp10(17) * 5);
        s.fields.commercial = Some(true);
        let json = serde_json::to_string(&s).unwrap();
        let parsed: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.state, FlowState::AwaitRoyalty);
        assert_eq!(parsed.fields.asset_id, Some(AssetId(7)));
        assert_eq!(parsed.fields.commercial, Some(true));
    }
}
