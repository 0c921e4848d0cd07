//! Message router driving the per-workflow state machines.

use std::sync::Arc;

use provenant_types::asset::{Asset, AssetId};
use provenant_types::credential::WalletRecord;
use provenant_types::error::{FlowReject, TransportError, WalletError};
use provenant_types::message::{InboundMessage, OutboundMessage, UserId};
use provenant_types::session::{FlowState, Session, WorkflowKind};
use tracing::{info, warn};

use super::{Command, EngineConfig, HELP_TEXT, failure_text, parse_command};
use crate::ledger::LedgerApi;
use crate::session::{SessionLookup, SessionStore};
use crate::transport::Transport;
use crate::upload::Uploader;
use crate::wallet::WalletStore;

/// The workflow engine: one instance serves every user.
///
/// All collaborators are shared handles; the engine itself holds no
/// per-user mutable state outside the [`SessionStore`].
pub struct Engine<L, T, U, W> {
    pub(super) ledger: Arc<L>,
    pub(super) transport: Arc<T>,
    pub(super) uploader: Arc<U>,
    pub(super) wallets: Arc<W>,
    pub(super) sessions: Arc<SessionStore>,
    pub(super) cfg: EngineConfig,
}

impl<L, T, U, W> Engine<L, T, U, W>
where
    L: LedgerApi,
    T: Transport,
    U: Uploader,
    W: WalletStore,
{
    pub fn new(
        ledger: Arc<L>,
        transport: Arc<T>,
        uploader: Arc<U>,
        wallets: Arc<W>,
        sessions: Arc<SessionStore>,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            transport,
            uploader,
            wallets,
            sessions,
            cfg,
        }
    }

    /// Process one inbound message to completion.
    ///
    /// Ledger and wallet failures are turned into user-facing replies here;
    /// only transport failures propagate to the caller.
    pub async fn handle(&self, msg: InboundMessage) -> Result<(), TransportError> {
        let user = msg.user.clone();
        if let Some(cmd) = parse_command(msg.trimmed()) {
            return self.run_command(&user, cmd).await;
        }

        match self.sessions.get(&user) {
            SessionLookup::Active(mut session) => {
                session.touch();
                self.advance(session, &msg).await
            }
            SessionLookup::Expired(session) => {
                info!(%user, flow = %session.flow, "expired session, prompting restart");
                self.reply(
                    &user,
                    format!(
                        "Your {} operation timed out after inactivity. Send /{} to start over.",
                        session.flow, session.flow
                    ),
                )
                .await
            }
            SessionLookup::Missing => {
                if msg.attachment.is_some() {
                    self.reply(&user, "Send /register first, then the file.").await
                } else {
                    self.reply(&user, HELP_TEXT).await
                }
            }
        }
    }

    async fn run_command(&self, user: &UserId, cmd: Command) -> Result<(), TransportError> {
        match cmd {
            Command::Cancel => self.cancel(user).await,
            Command::Help => self.reply(user, HELP_TEXT).await,
            Command::Start => self.start_wallet(user).await,
            Command::Register => self.start_register(user).await,
            Command::License => self.start_license(user).await,
            Command::Transfer => self.start_transfer(user).await,
            Command::Verify => self.start_verify(user).await,
            Command::Balance => self.show_balance(user).await,
            Command::MyAssets => self.show_my_assets(user).await,
            Command::AssetsByAddress => self.start_assets_by_address(user).await,
        }
    }

    /// Route a non-command message into the active session's state machine.
    async fn advance(
        &self,
        session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        use FlowState::*;
        use WorkflowKind::*;
        match (session.flow, session.state) {
            (Register, AwaitFile) => self.register_file(session, msg).await,
            (License, AwaitAssetId) => self.license_asset_id(session, msg).await,
            (License, AwaitPrice) => self.license_price(session, msg).await,
            (License, AwaitCommercial) => self.license_commercial(session, msg).await,
            (License, AwaitRoyalty) => self.license_royalty(session, msg).await,
            (Transfer, AwaitAssetId) => self.transfer_asset_id(session, msg).await,
            (Transfer, AwaitRecipient) => self.transfer_recipient(session, msg).await,
            (Verify, AwaitMethod) => self.verify_method(session, msg).await,
            (Verify, AwaitHash) => self.verify_hash(session, msg).await,
            (Verify, AwaitId) => self.verify_id(session, msg).await,
            (AssetsByAddress, AwaitAddress) => self.assets_by_address(session, msg).await,
            (_, Submitting) => {
                self.reply(&session.user, "Still working on your last request, one moment.")
                    .await
            }
            (flow, state) => {
                // A combination the machines never construct; drop it rather
                // than leave the user wedged.
                warn!(user = %session.user, ?flow, ?state, "session in impossible state, discarding");
                self.sessions.remove(&session.user);
                self.reply(
                    &session.user,
                    "Something went wrong with the current operation. Please start over.",
                )
                .await
            }
        }
    }

    async fn cancel(&self, user: &UserId) -> Result<(), TransportError> {
        match self.sessions.remove(user) {
            Some(session) => {
                info!(%user, flow = %session.flow, "session cancelled");
                self.reply(user, format!("Cancelled the {} operation.", session.flow))
                    .await
            }
            None => self.reply(user, "Nothing to cancel.").await,
        }
    }

    // -----------------------------------------------------------------------
    // Shared helpers for the per-workflow modules
    // -----------------------------------------------------------------------

    pub(super) async fn reply(
        &self,
        user: &UserId,
        text: impl Into<String>,
    ) -> Result<(), TransportError> {
        self.transport
            .send(OutboundMessage::text(user.clone(), text))
            .await
    }

    /// Re-prompt after a validation reject: the session goes back untouched
    /// and the corrective message is sent.
    pub(super) async fn reprompt(
        &self,
        session: Session,
        reject: FlowReject,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        self.sessions.put(session);
        self.reply(&user, reject.message).await
    }

    /// Resolve the user's wallet, prompting for `/start` when absent.
    pub(super) async fn wallet_or_prompt(
        &self,
        user: &UserId,
    ) -> Result<Option<WalletRecord>, TransportError> {
        match self.wallets.resolve(user).await {
            Ok(record) => Ok(Some(record)),
            Err(WalletError::NotProvisioned) => {
                self.reply(user, "You don't have a wallet yet. Send /start to create one.")
                    .await?;
                Ok(None)
            }
            Err(err) => {
                warn!(%user, error = %err, "wallet resolution failed");
                self.reply(user, "Wallet storage is unavailable right now. Please try again later.")
                    .await?;
                Ok(None)
            }
        }
    }

    /// Load an asset and confirm the user's wallet owns it.
    ///
    /// On any failure (unknown id, not the owner, ledger error) the active
    /// session is discarded, the user is told why, and `None` comes back.
    pub(super) async fn load_owned_asset(
        &self,
        user: &UserId,
        id: AssetId,
    ) -> Result<Option<Asset>, TransportError> {
        let Some(record) = self.wallet_or_prompt(user).await? else {
            self.sessions.remove(user);
            return Ok(None);
        };
        match self.ledger.get_asset(id).await {
            Ok(asset) if asset.owner == record.address => Ok(Some(asset)),
            Ok(_) => {
                info!(%user, %id, "ownership denied");
                self.sessions.remove(user);
                self.reply(user, format!("You are not the owner of asset #{id}."))
                    .await?;
                Ok(None)
            }
            Err(failure) => {
                self.sessions.remove(user);
                self.reply(user, failure_text(&failure)).await?;
                Ok(None)
            }
        }
    }

    /// Gateway URL for a registered content hash.
    pub(super) fn content_url(&self, hash: &provenant_types::asset::ContentHash) -> String {
        format!("{}/{}", self.cfg.gateway_base.trim_end_matches('/'), hash)
    }

    /// Explorer URL for a submitted transaction.
    pub(super) fn tx_url(&self, tx: &crate::ledger::TxHash) -> String {
        format!("{}/{}", self.cfg.explorer_base.trim_end_matches('/'), tx)
    }
}

impl<L, T, U, W> crate::dispatch::MessageHandler for Engine<L, T, U, W>
where
    L: LedgerApi + 'static,
    T: Transport + 'static,
    U: Uploader + 'static,
    W: WalletStore + 'static,
{
    async fn handle_message(&self, msg: InboundMessage) {
        let user = msg.user.clone();
        if let Err(err) = self.handle(msg).await {
            warn!(%user, error = %err, "failed to deliver reply");
        }
    }
}

/// Human-readable date for a ledger timestamp (unix seconds).
pub(super) fn format_timestamp(unix_secs: u64) -> String {
    match chrono::DateTime::from_timestamp(unix_secs as i64, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => format!("@{unix_secs}"),
    }
}
