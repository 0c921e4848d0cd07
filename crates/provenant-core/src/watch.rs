//! Background watcher for balance deltas and new registrations.
//!
//! An independent observer: it shares only the read-only user-to-address
//! view from the wallet store and pushes unsolicited notifications through
//! the transport. It never touches session state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use primitive_types::U256;
use provenant_types::address::Address;
use provenant_types::amount::format_units;
use provenant_types::message::{OutboundMessage, UserId};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::LedgerApi;
use crate::transport::Transport;
use crate::wallet::WalletStore;

/// Polls wallet balances and the registry size on a fixed interval and
/// notifies the affected users about changes.
pub struct Watcher<L, T, W> {
    ledger: Arc<L>,
    transport: Arc<T>,
    wallets: Arc<W>,
    interval: Duration,
}

impl<L, T, W> Watcher<L, T, W>
where
    L: LedgerApi,
    T: Transport,
    W: WalletStore,
{
    pub fn new(
        ledger: Arc<L>,
        transport: Arc<T>,
        wallets: Arc<W>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            transport,
            wallets,
            interval,
        }
    }

    /// Run until cancelled. The first tick only records baselines, so a
    /// restart never replays history as fresh notifications.
    pub async fn run(self, cancel: CancellationToken) {
        let mut balances: HashMap<Address, U256> = HashMap::new();
        let mut last_total: Option<u64> = None;
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = self.interval.as_secs(), "watcher started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let entries = match self.wallets.all_addresses().await {
                        Ok(entries) => entries,
                        Err(err) => {
                            warn!(error = %err, "watcher could not list wallets");
                            continue;
                        }
                    };
                    self.observe_balances(&entries, &mut balances).await;
                    self.observe_registrations(&entries, &mut last_total).await;
                }
            }
        }
        info!("watcher stopped");
    }

    async fn observe_balances(
        &self,
        entries: &[(UserId, Address)],
        last: &mut HashMap<Address, U256>,
    ) {
        for (user, address) in entries {
            let balance = match self.ledger.balance_of(*address).await {
                Ok(balance) => balance,
                Err(err) => {
                    debug!(%user, error = %err, "balance poll failed");
                    continue;
                }
            };
            match last.insert(*address, balance) {
                // First observation is the baseline.
                None => {}
                Some(prev) if balance == prev => {}
                Some(prev) if balance > prev => {
                    self.notify(
                        user,
                        format!("Received {}. New balance: {}.",
                            format_units(balance - prev),
                            format_units(balance)),
                    )
                    .await;
                }
                Some(prev) => {
                    self.notify(
                        user,
                        format!("Sent {}. New balance: {}.",
                            format_units(prev - balance),
                            format_units(balance)),
                    )
                    .await;
                }
            }
        }
    }

    async fn observe_registrations(
        &self,
        entries: &[(UserId, Address)],
        last_total: &mut Option<u64>,
    ) {
        let total = match self.ledger.total_assets().await {
            Ok(total) => total,
            Err(err) => {
                debug!(error = %err, "registry size poll failed");
                return;
            }
        };
        let Some(prev) = *last_total else {
            *last_total = Some(total);
            return;
        };
        // Asset ids are dense and 1-based, so the new ones are exactly
        // prev+1..=total.
        for id in (prev + 1)..=total {
            let asset = match self.ledger.get_asset(provenant_types::asset::AssetId(id)).await {
                Ok(asset) => asset,
                Err(err) => {
                    debug!(id, error = %err, "new asset read failed");
                    continue;
                }
            };
            if let Some((user, _)) = entries.iter().find(|(_, addr)| *addr == asset.owner) {
                self.notify(
                    user,
                    format!(
                        "Asset #{} ({}) was registered to your wallet.",
                        asset.id, asset.asset_type
                    ),
                )
                .await;
            }
        }
        *last_total = Some(total);
    }

    async fn notify(&self, user: &UserId, text: String) {
        if let Err(err) = self
            .transport
            .send(OutboundMessage::text(user.clone(), text))
            .await
        {
            warn!(%user, error = %err, "watcher notification failed");
        }
    }
}
