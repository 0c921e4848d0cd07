//! License workflow: asset id, price, commercial flag, royalty, submit.

use provenant_types::amount::format_units;
use provenant_types::asset::License;
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
    pub(super) async fn start_license(&self, user: &UserId) -> Result<(), TransportError> {
        if self.wallet_or_prompt(user).await?.is_none() {
            return Ok(());
        }
        self.sessions.put(Session::new(
            user.clone(),
            WorkflowKind::License,
            FlowState::AwaitAssetId,
        ));
        self.reply(user, "Which asset do you want to license? Send its id number.")
            .await
    }

    /// `AwaitAssetId`: validate the id, confirm ownership, surface any
    /// existing license, then ask for the price.
    pub(super) async fn license_asset_id(
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

        // An existing license is replaced, not an error; the user just
        // deserves to know.
        if let Ok(existing) = self.ledger.get_license(id).await
            && existing.is_set()
        {
            self.reply(
                &user,
                format!(
                    "Asset #{id} is currently licensed at {}. The new terms will replace it.",
                    format_units(existing.price_wei)
                ),
            )
            .await?;
        }

        session.fields.asset_id = Some(id);
        session.state = FlowState::AwaitPrice;
        self.sessions.put(session);
        self.reply(&user, "What's the license price? Send a decimal amount, e.g. 0.5.")
            .await
    }

    /// `AwaitPrice`: non-negative decimal, scaled to base units.
    pub(super) async fn license_price(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let text = msg.trimmed();
        let units = match input::price(text) {
            Ok(units) => units,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        session.fields.price_wei = Some(units);
        session.fields.price_text = Some(text.to_string());
        session.state = FlowState::AwaitCommercial;
        self.sessions.put(session);
        self.reply(&user, "Allow commercial use? Answer yes or no.").await
    }

    /// `AwaitCommercial`: yes/no.
    pub(super) async fn license_commercial(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let commercial = match input::yes_no(msg.trimmed()) {
            Ok(commercial) => commercial,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        session.fields.commercial = Some(commercial);
        session.state = FlowState::AwaitRoyalty;
        self.sessions.put(session);
        self.reply(&user, "What royalty percentage on resales? Send a whole number from 0 to 100.")
            .await
    }

    /// `AwaitRoyalty`: integer 0..=100, then the single write call.
    pub(super) async fn license_royalty(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let royalty = match input::royalty(msg.trimmed()) {
            Ok(royalty) => royalty,
            Err(reject) => return self.reprompt(session, reject).await,
        };

        // All fields are present by construction; a hole here is a routing
        // bug, not user error.
        let (Some(id), Some(price_wei), Some(commercial)) = (
            session.fields.asset_id,
            session.fields.price_wei,
            session.fields.commercial,
        ) else {
            warn!(%user, "license session missing accumulated fields");
            self.sessions.remove(&user);
            return self
                .reply(&user, "Something went wrong with the current operation. Please start over.")
                .await;
        };
        let price_text = session
            .fields
            .price_text
            .clone()
            .unwrap_or_else(|| format_units(price_wei));

        session.fields.royalty_percent = Some(royalty);
        session.state = FlowState::Submitting;
        self.sessions.put(session);

        let Some(record) = self.wallet_or_prompt(&user).await? else {
            self.sessions.remove(&user);
            return Ok(());
        };

        let license = License {
            price_wei,
            commercial,
            royalty_percent: royalty,
        };
        match self
            .ledger
            .set_license(&record.credential, id, &license)
            .await
        {
            Ok(tx) => {
                info!(%user, asset_id = %id, %tx, "license set");
                self.sessions.remove(&user);
                self.reply(
                    &user,
                    format!(
                        "License set on asset #{id}!\nPrice: {price_text}\nCommercial use: {}\nRoyalty: {royalty}%\n{}",
                        if commercial { "yes" } else { "no" },
                        self.tx_url(&tx)
                    ),
                )
                .await
            }
            Err(failure) => {
                warn!(%user, asset_id = %id, error = %failure, "license submission failed");
                self.sessions.remove(&user);
                self.reply(&user, failure_text(&failure)).await
            }
        }
    }
}
