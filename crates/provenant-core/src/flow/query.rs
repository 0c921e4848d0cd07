//! Single-shot commands and the one-step assets-by-address flow.

use provenant_types::address::Address;
use provenant_types::amount::{format_units, format_units_dp};
use provenant_types::error::TransportError;
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
    /// `/start`: provision a wallet for a first-time user (idempotent).
    pub(super) async fn start_wallet(&self, user: &UserId) -> Result<(), TransportError> {
        match self.wallets.provision(user).await {
            Ok(record) => {
                info!(%user, address = %record.address, "wallet ready");
                self.reply(
                    user,
                    format!(
                        "Welcome! Your wallet address is {}.\n\
                         Use /register to register your first asset, or /help for all commands.",
                        record.address
                    ),
                )
                .await
            }
            Err(err) => {
                warn!(%user, error = %err, "wallet provisioning failed");
                self.reply(user, "Couldn't create your wallet right now. Please try again later.")
                    .await
            }
        }
    }

    /// `/balance`: current gas balance, with a funding hint when low.
    pub(super) async fn show_balance(&self, user: &UserId) -> Result<(), TransportError> {
        let Some(record) = self.wallet_or_prompt(user).await? else {
            return Ok(());
        };
        match self.ledger.balance_of(record.address).await {
            Ok(balance) => {
                let mut text = format!(
                    "Wallet: {}\nBalance: {}",
                    record.address,
                    format_units_dp(balance, 4)
                );
                if balance < self.cfg.funding_threshold {
                    text.push_str(
                        "\nYour balance is low; it will be topped up automatically on your next /register.",
                    );
                }
                self.reply(user, text).await
            }
            Err(failure) => self.reply(user, failure_text(&failure)).await,
        }
    }

    /// `/my-assets`: everything owned by the user's wallet, with license
    /// status per asset.
    pub(super) async fn show_my_assets(&self, user: &UserId) -> Result<(), TransportError> {
        let Some(record) = self.wallet_or_prompt(user).await? else {
            return Ok(());
        };
        let text = match self.owned_asset_listing(record.address).await {
            Ok(Some(listing)) => format!("Your assets:\n{listing}"),
            Ok(None) => "You don't own any assets yet. Use /register to add one.".to_string(),
            Err(failure) => failure_text(&failure),
        };
        self.reply(user, text).await
    }

    /// `/assets-by-address` entry: one-step flow prompting for the address.
    pub(super) async fn start_assets_by_address(
        &self,
        user: &UserId,
    ) -> Result<(), TransportError> {
        self.sessions.put(Session::new(
            user.clone(),
            WorkflowKind::AssetsByAddress,
            FlowState::AwaitAddress,
        ));
        self.reply(user, "Whose assets? Send a wallet address (0x...).").await
    }

    /// `AwaitAddress`: validate and list.
    pub(super) async fn assets_by_address(
        &self,
        session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let address = match input::address(msg.trimmed()) {
            Ok(addr) => addr,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        self.sessions.remove(&user);
        let text = match self.owned_asset_listing(address).await {
            Ok(Some(listing)) => format!("Assets owned by {address}:\n{listing}"),
            Ok(None) => format!("{address} doesn't own any assets."),
            Err(failure) => failure_text(&failure),
        };
        self.reply(&user, text).await
    }

    /// One line per owned asset; `None` when the address owns nothing.
    async fn owned_asset_listing(
        &self,
        owner: Address,
    ) -> Result<Option<String>, provenant_types::error::LedgerFailure> {
        let ids = self.ledger.assets_by_owner(owner).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let mut lines = Vec::with_capacity(ids.len());
        for id in ids {
            let asset = self.ledger.get_asset(id).await?;
            let license = match self.ledger.get_license(id).await {
                Ok(license) if license.is_set() => format!(
                    "licensed at {}{}",
                    format_units(license.price_wei),
                    if license.commercial { " (commercial)" } else { "" }
                ),
                _ => "no license".to_string(),
            };
            lines.push(format!(
                "#{id} - {} {} - {license}",
                asset.asset_type, asset.content_hash
            ));
        }
        Ok(Some(lines.join("\n")))
    }
}
