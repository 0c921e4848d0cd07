//! Verification workflow: read-only certificate lookup by hash or id.

use provenant_types::error::{FlowReject, LedgerFailure, TransportError};
use provenant_types::message::{InboundMessage, UserId};
use provenant_types::session::{FlowState, Session, WorkflowKind};
use tracing::info;

use super::engine::{Engine, format_timestamp};
use super::{failure_text, input};
use crate::ledger::LedgerApi;
use crate::transport::Transport;
use crate::upload::Uploader;
use crate::wallet::WalletStore;

impl<L, T, U, W> Engine<L, T, U, W>
where
    L: LedgerApi,
    T: Transport,
    U: Uploader,
    W: WalletStore,
{
    /// Entry: read-only, so no wallet is required.
    pub(super) async fn start_verify(&self, user: &UserId) -> Result<(), TransportError> {
        self.sessions.put(Session::new(
            user.clone(),
            WorkflowKind::Verify,
            FlowState::AwaitMethod,
        ));
        self.reply(
            user,
            "Verify by content hash or by asset id? Answer hash or id.",
        )
        .await
    }

    pub(super) async fn verify_method(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        match msg.trimmed().to_ascii_lowercase().as_str() {
            "hash" => {
                session.state = FlowState::AwaitHash;
                self.sessions.put(session);
                self.reply(&user, "Send the content hash (starts with Qm).").await
            }
            "id" => {
                session.state = FlowState::AwaitId;
                self.sessions.put(session);
                self.reply(&user, "Send the asset id number.").await
            }
            _ => {
                self.reprompt(session, FlowReject::new("Please answer hash or id."))
                    .await
            }
        }
    }

    pub(super) async fn verify_hash(
        &self,
        session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let hash = match input::content_hash(msg.trimmed()) {
            Ok(hash) => hash,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        self.sessions.remove(&user);
        match self.ledger.verify_by_hash(&hash).await {
            Ok(v) if v.exists => {
                info!(%user, asset_id = %v.asset_id, "verified by hash");
                let kind = v
                    .asset_type
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                self.reply(
                    &user,
                    format!(
                        "Verified: registered asset.\nId: {}\nOwner: {}\nType: {kind}\nRegistered: {}",
                        v.asset_id,
                        v.owner,
                        format_timestamp(v.registered_at)
                    ),
                )
                .await
            }
            Ok(_) => {
                self.reply(&user, "No asset with that content hash is registered.")
                    .await
            }
            Err(failure) => self.reply(&user, failure_text(&failure)).await,
        }
    }

    pub(super) async fn verify_id(
        &self,
        session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let id = match input::asset_id(msg.trimmed()) {
            Ok(id) => id,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        self.sessions.remove(&user);
        match self.ledger.get_asset(id).await {
            Ok(asset) => {
                info!(%user, asset_id = %asset.id, "verified by id");
                self.reply(
                    &user,
                    format!(
                        "Verified: registered asset.\nId: {}\nOwner: {}\nType: {}\nHash: {}\nRegistered: {}\n{}",
                        asset.id,
                        asset.owner,
                        asset.asset_type,
                        asset.content_hash,
                        format_timestamp(asset.registered_at),
                        self.content_url(&asset.content_hash)
                    ),
                )
                .await
            }
            Err(LedgerFailure::NotFound) => {
                self.reply(&user, format!("No asset with id #{id} is registered."))
                    .await
            }
            Err(failure) => self.reply(&user, failure_text(&failure)).await,
        }
    }
}
