//! Registration workflow: fund-check, file upload, ledger write, read-back.

use provenant_types::error::{FlowReject, LedgerFailure, TransportError};
use provenant_types::message::{InboundMessage, MediaRef, OutboundMessage, UserId};
use provenant_types::session::{FlowState, Session, WorkflowKind};
use provenant_types::amount::format_units;
use tracing::{info, warn};

use super::engine::Engine;
use super::failure_text;
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
    /// Entry: check gas, auto-fund if short, then wait for the file.
    pub(super) async fn start_register(&self, user: &UserId) -> Result<(), TransportError> {
        let Some(record) = self.wallet_or_prompt(user).await? else {
            return Ok(());
        };

        match self.ledger.balance_of(record.address).await {
            Ok(balance) if balance < self.cfg.funding_threshold => {
                match self.ledger.fund(record.address, self.cfg.funding_amount).await {
                    Ok(tx) => {
                        info!(%user, %tx, "auto-funded wallet below threshold");
                        self.reply(
                            user,
                            format!(
                                "Topped up your wallet with {} to cover network fees.",
                                format_units(self.cfg.funding_amount)
                            ),
                        )
                        .await?;
                    }
                    // Registration may still succeed if fees are low; let the
                    // write call classify the outcome if not.
                    Err(failure) => {
                        warn!(%user, error = %failure, "auto-funding failed");
                    }
                }
            }
            Ok(_) => {}
            Err(failure) => {
                self.reply(user, failure_text(&failure)).await?;
                return Ok(());
            }
        }

        self.sessions.put(Session::new(
            user.clone(),
            WorkflowKind::Register,
            FlowState::AwaitFile,
        ));
        self.reply(
            user,
            "Send the file you want to register (image, video, audio, or document). \
             Send /cancel to stop.",
        )
        .await
    }

    /// `AwaitFile`: download the attachment, pin it, submit the write call.
    pub(super) async fn register_file(
        &self,
        mut session: Session,
        msg: &InboundMessage,
    ) -> Result<(), TransportError> {
        let user = session.user.clone();
        let Some(attachment) = &msg.attachment else {
            return self
                .reprompt(
                    session,
                    FlowReject::new(
                        "That doesn't look like a file. Send the file to register, or /cancel.",
                    ),
                )
                .await;
        };
        let kind = attachment.kind;

        session.state = FlowState::Submitting;
        session.fields.asset_type = Some(kind);
        self.sessions.put(session);
        self.reply(&user, "Got your file, registering it now...").await?;

        let path = match self
            .transport
            .fetch_attachment(&attachment.file_ref, &self.cfg.temp_dir)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                warn!(%user, error = %err, "attachment download failed");
                self.sessions.remove(&user);
                return self
                    .reply(&user, "Couldn't download your file. Please try /register again.")
                    .await;
            }
        };

        let uploaded = self.uploader.upload(&path).await;
        let _ = tokio::fs::remove_file(&path).await;
        let hash = match uploaded {
            Ok(hash) => hash,
            Err(err) => {
                warn!(%user, error = %err, "pinning upload failed");
                self.sessions.remove(&user);
                return self
                    .reply(&user, "Couldn't upload your file to storage. Please try /register again.")
                    .await;
            }
        };

        let Some(record) = self.wallet_or_prompt(&user).await? else {
            self.sessions.remove(&user);
            return Ok(());
        };

        match self.ledger.register_asset(&record.credential, &hash, kind).await {
            Ok(id) => {
                info!(%user, asset_id = %id, hash = %hash, "asset registered");
                self.sessions.remove(&user);
                let url = self.content_url(&hash);
                self.transport
                    .send(
                        OutboundMessage::text(
                            user,
                            format!(
                                "Asset registered!\nId: {id}\nType: {kind}\nHash: {hash}\n{url}"
                            ),
                        )
                        .with_media(MediaRef { url, kind }),
                    )
                    .await
            }
            // The intended end state already holds: recover the existing id
            // and report success-with-notice.
            Err(LedgerFailure::Duplicate) => {
                self.sessions.remove(&user);
                match self.ledger.verify_by_hash(&hash).await {
                    Ok(v) if v.exists => {
                        info!(%user, asset_id = %v.asset_id, "duplicate hash, recovered existing id");
                        self.reply(
                            &user,
                            format!(
                                "This content is already registered as asset #{}. You're all set.",
                                v.asset_id
                            ),
                        )
                        .await
                    }
                    _ => {
                        // Hash indexed but record missing: the ledger is
                        // inconsistent. Don't guess a recovery.
                        warn!(%user, hash = %hash, "duplicate reported but read-back found nothing");
                        self.reply(
                            &user,
                            failure_text(&LedgerFailure::Unknown(
                                "duplicate without record".to_string(),
                            )),
                        )
                        .await
                    }
                }
            }
            Err(failure) => {
                warn!(%user, error = %failure, "registration failed");
                self.sessions.remove(&user);
                self.reply(&user, failure_text(&failure)).await
            }
        }
    }
}
