//! Transfer workflow: asset id, recipient address, submit.

use provenant_types::error::{FlowReject, TransportError};
use provenant_types::message::{InboundMessage, UserId};
use provenant_types::session::{FlowState, Session, WorkflowKind};
use tracing::{info, warn};

use super::engine::Engine;
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
    pub(super) async fn start_transfer(&self, user: &UserId) -> Result<(), TransportError> {
        if self.wallet_or_prompt(user).await?.is_none() {
            return Ok(());
        }
        self.sessions.put(Session::new(
            user.clone(),
            WorkflowKind::Transfer,
            FlowState::AwaitAssetId,
        ));
        self.reply(user, "Which asset do you want to transfer? Send its id number.")
            .await
    }

    /// `AwaitAssetId`: validate the id, confirm ownership, ask for the
    /// recipient.
    pub(super) async fn transfer_asset_id(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let id = match input::asset_id(msg.trimmed()) {
            Ok(id) => id,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        let Some(_asset) = self.load_owned_asset(&user, id).await? else {
            return Ok(());
        };

        session.fields.asset_id = Some(id);
        session.state = FlowState::AwaitRecipient;
        self.sessions.put(session);
        self.reply(
            &user,
            "Who should receive it? Send the recipient's wallet address (0x...).",
        )
        .await
    }

    /// `AwaitRecipient`: canonical address, not zero, not the sender, then
    /// the single write call.
    pub(super) async fn transfer_recipient(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let recipient = match input::recipient(msg.trimmed()) {
            Ok(addr) => addr,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        let Some(record) = self.wallet_or_prompt(&user).await? else {
            self.sessions.remove(&user);
            return Ok(());
        };
        // Rejected before any write call; the session stays at this step.
        if recipient == record.address {
            return self
                .reprompt(
                    session,
                    FlowReject::new("That's your own wallet. Send a different recipient address."),
                )
                .await;
        }

        let Some(id) = session.fields.asset_id else {
            warn!(%user, "transfer session missing asset id");
            self.sessions.remove(&user);
            return self
                .reply(&user, "Something went wrong with the current operation. Please start over.")
                .await;
        };

        session.fields.recipient = Some(recipient);
        session.state = FlowState::Submitting;
        self.sessions.put(session);

        match self
            .ledger
            .transfer_asset(&record.credential, id, recipient)
            .await
        {
            Ok(tx) => {
                info!(%user, asset_id = %id, %recipient, %tx, "asset transferred");
                self.sessions.remove(&user);
                self.reply(
                    &user,
                    format!(
                        "Asset #{id} transferred to {recipient}.\n{}",
                        self.tx_url(&tx)
                    ),
                )
                .await
            }
            Err(failure) => {
                warn!(%user, asset_id = %id, error = %failure, "transfer submission failed");
                self.sessions.remove(&user);
                self.reply(&user, failure_text(&failure)).await
            }
        }
    }
}
