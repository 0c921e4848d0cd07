//! SQLite-backed wallet store.
//!
//! One row per user: address in the clear for read-only views, the signing
//! credential encrypted at rest with the [`CredentialVault`]. WAL journal
//! mode with a busy timeout, schema created on open. Provisioning generates
//! a fresh key and is idempotent per user.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use k256::ecdsa::SigningKey;
use provenant_core::wallet::WalletStore;
use provenant_types::address::Address;
use provenant_types::credential::{Credential, WalletRecord};
use provenant_types::error::WalletError;
use provenant_types::message::UserId;
use rand::rngs::OsRng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::evm;
use crate::vault::CredentialVault;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS wallets (
    user_id TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    credential BLOB NOT NULL,
    created_at TEXT NOT NULL
)";

pub struct SqliteWalletStore {
    pool: SqlitePool,
    vault: CredentialVault,
}

impl SqliteWalletStore {
    /// Open (or create) the store at the given path.
    pub async fn open(path: &Path, vault: CredentialVault) -> Result<Self, WalletError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(storage)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        // A single connection: the wallet table sees one write per new user.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage)?;
        sqlx::query(SCHEMA).execute(&pool).await.map_err(storage)?;

        Ok(Self { pool, vault })
    }

    fn decode_row(&self, address: &str, ciphertext: &[u8]) -> Result<WalletRecord, WalletError> {
        let address = Address::from_str(address)
            .map_err(|e| WalletError::Storage(format!("corrupt address: {e}")))?;
        let plain = self
            .vault
            .decrypt(ciphertext)
            .map_err(|_| WalletError::Crypto)?;
        let bytes: [u8; 32] = plain.try_into().map_err(|_| WalletError::Crypto)?;
        Ok(WalletRecord {
            address,
            credential: Credential::from_bytes(bytes),
        })
    }
}

fn storage(err: sqlx::Error) -> WalletError {
    WalletError::Storage(err.to_string())
}

impl WalletStore for SqliteWalletStore {
    async fn resolve(&self, user: &UserId) -> Result<WalletRecord, WalletError> {
        let row: Option<(String, Vec<u8>)> =
            sqlx::query_as("SELECT address, credential FROM wallets WHERE user_id = ?")
                .bind(user.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;
        match row {
            Some((address, ciphertext)) => self.decode_row(&address, &ciphertext),
            None => Err(WalletError::NotProvisioned),
        }
    }

    async fn provision(&self, user: &UserId) -> Result<WalletRecord, WalletError> {
        match self.resolve(user).await {
            Ok(existing) => return Ok(existing),
            Err(WalletError::NotProvisioned) => {}
            Err(other) => return Err(other),
        }

        let key = SigningKey::random(&mut OsRng);
        let address = evm::tx::address_of(&key);
        let credential = Credential::from_bytes(key.to_bytes().into());
        let ciphertext = self
            .vault
            .encrypt(credential.expose())
            .map_err(|_| WalletError::Crypto)?;

        // Another racing provision for the same user loses on the primary
        // key; fall back to reading the winner's row.
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO wallets (user_id, address, credential, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(user.as_str())
        .bind(address.to_string())
        .bind(&ciphertext)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if inserted.rows_affected() == 0 {
            return self.resolve(user).await;
        }
        info!(user = user.as_str(), %address, "wallet provisioned");
        Ok(WalletRecord {
            address,
            credential,
        })
    }

    async fn all_addresses(&self) -> Result<Vec<(UserId, Address)>, WalletError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT user_id, address FROM wallets ORDER BY user_id")
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;
        rows.into_iter()
            .map(|(user, address)| {
                let address = Address::from_str(&address)
                    .map_err(|e| WalletError::Storage(format!("corrupt address: {e}")))?;
                Ok((UserId::new(user), address))
            })
            .collect()
    }
}
