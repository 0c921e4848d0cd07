//! Typed ledger API over the registry contract.
//!
//! [`EvmLedger`] implements `provenant_core::ledger::LedgerApi` by encoding
//! contract calls with the [`abi`] codec, running them through the core's
//! retry client, and decoding the typed results. [`EvmSigner`] turns a
//! user's credential into an EIP-155 transaction signer.

pub mod abi;
pub mod tx;

use k256::ecdsa::SigningKey;
use primitive_types::U256;
use provenant_core::ledger::{LedgerApi, TxHash};
use provenant_core::rpc::{LedgerTransport, RetryRpcClient, TxParams, TxSigner};
use provenant_types::address::Address;
use provenant_types::asset::{Asset, AssetId, AssetType, ContentHash, HashVerification, License};
use provenant_types::credential::Credential;
use provenant_types::error::LedgerFailure;
use serde_json::{Value, json};

use abi::{AbiError, Decoder, Token};

impl From<AbiError> for LedgerFailure {
    fn from(err: AbiError) -> Self {
        LedgerFailure::Unknown(err.to_string())
    }
}

/// Signs on behalf of one credential, for one chain.
pub struct EvmSigner {
    key: SigningKey,
    address: Address,
    chain_id: u64,
}

impl EvmSigner {
    pub fn from_credential(credential: &Credential, chain_id: u64) -> Result<Self, LedgerFailure> {
        let key = SigningKey::from_bytes(credential.expose().into())
            .map_err(|_| LedgerFailure::Unknown("invalid signing credential".to_string()))?;
        let address = tx::address_of(&key);
        Ok(Self {
            key,
            address,
            chain_id,
        })
    }
}

impl TxSigner for EvmSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, params: &TxParams) -> Result<Vec<u8>, LedgerFailure> {
        tx::sign_legacy(params, self.chain_id, &self.key)
    }
}

/// The asset registry contract as seen through JSON-RPC.
pub struct EvmLedger<T> {
    client: RetryRpcClient<T>,
    contract: Address,
    chain_id: u64,
    /// Operator signer, used only for gas-token funding transfers.
    operator: EvmSigner,
}

impl<T: LedgerTransport> EvmLedger<T> {
    pub fn new(
        client: RetryRpcClient<T>,
        contract: Address,
        chain_id: u64,
        operator: &Credential,
    ) -> Result<Self, LedgerFailure> {
        Ok(Self {
            client,
            contract,
            chain_id,
            operator: EvmSigner::from_credential(operator, chain_id)?,
        })
    }

    async fn write(
        &self,
        credential: &Credential,
        data: Vec<u8>,
    ) -> Result<TxHash, LedgerFailure> {
        let signer = EvmSigner::from_credential(credential, self.chain_id)?;
        self.client
            .submit_write(&signer, self.contract, U256::zero(), &data)
            .await
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerFailure> {
        self.client.call_contract(self.contract, &data).await
    }
}

/// Parse a JSON-RPC `"0x..."` quantity.
fn parse_quantity(value: &Value) -> Result<U256, LedgerFailure> {
    let s = value
        .as_str()
        .ok_or_else(|| LedgerFailure::Unknown(format!("expected quantity, got {value}")))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    U256::from_str_radix(digits, 16)
        .map_err(|e| LedgerFailure::Unknown(format!("bad quantity '{s}': {e}")))
}

impl<T: LedgerTransport> LedgerApi for EvmLedger<T> {
    async fn register_asset(
        &self,
        credential: &Credential,
        hash: &ContentHash,
        kind: AssetType,
    ) -> Result<AssetId, LedgerFailure> {
        let data = abi::encode_call(
            "registerAsset(string,string)",
            &[
                Token::Str(hash.as_str().to_string()),
                Token::Str(kind.as_str().to_string()),
            ],
        );
        self.write(credential, data).await?;

        // The id is assigned on-chain; read it back by hash.
        let verification = self.verify_by_hash(hash).await?;
        if verification.exists {
            Ok(verification.asset_id)
        } else {
            Err(LedgerFailure::Unknown(
                "registration confirmed but hash not indexed".to_string(),
            ))
        }
    }

    async fn get_asset(&self, id: AssetId) -> Result<Asset, LedgerFailure> {
        let ret = self
            .call(abi::encode_call("getAsset(uint256)", &[Token::Uint(U256::from(id.0))]))
            .await?;
        let mut d = Decoder::new(&ret);
        let owner = d.address()?;
        let content_hash = ContentHash::new(d.string()?);
        let kind = d.string()?;
        let registered_at = d.uint_u64()?;
        let asset_type = kind
            .parse::<AssetType>()
            .map_err(LedgerFailure::Unknown)?;
        Ok(Asset {
            id,
            owner,
            content_hash,
            asset_type,
            registered_at,
        })
    }

    async fn verify_by_hash(&self, hash: &ContentHash) -> Result<HashVerification, LedgerFailure> {
        let ret = self
            .call(abi::encode_call(
                "verifyAsset(string)",
                &[Token::Str(hash.as_str().to_string())],
            ))
            .await?;
        let mut d = Decoder::new(&ret);
        let exists = d.bool()?;
        let asset_id = AssetId(d.uint_u64()?);
        let owner = d.address()?;
        let registered_at = d.uint_u64()?;
        let kind = d.string()?;
        let asset_type = if exists { kind.parse().ok() } else { None };
        Ok(HashVerification {
            exists,
            asset_id,
            owner,
            registered_at,
            asset_type,
        })
    }

    async fn set_license(
        &self,
        credential: &Credential,
        id: AssetId,
        license: &License,
    ) -> Result<TxHash, LedgerFailure> {
        let data = abi::encode_call(
            "setLicense(uint256,uint256,bool,uint256)",
            &[
                Token::Uint(U256::from(id.0)),
                Token::Uint(license.price_wei),
                Token::Bool(license.commercial),
                Token::Uint(U256::from(license.royalty_percent)),
            ],
        );
        self.write(credential, data).await
    }

    async fn get_license(&self, id: AssetId) -> Result<License, LedgerFailure> {
        let ret = self
            .call(abi::encode_call("getLicense(uint256)", &[Token::Uint(U256::from(id.0))]))
            .await?;
        let mut d = Decoder::new(&ret);
        let price_wei = d.uint()?;
        let commercial = d.bool()?;
        let royalty = d.uint_u64()?;
        let royalty_percent = u8::try_from(royalty)
            .map_err(|_| LedgerFailure::Unknown(format!("royalty out of range: {royalty}")))?;
        Ok(License {
            price_wei,
            commercial,
            royalty_percent,
        })
    }

    async fn transfer_asset(
        &self,
        credential: &Credential,
        id: AssetId,
        to: Address,
    ) -> Result<TxHash, LedgerFailure> {
        let data = abi::encode_call(
            "transferAsset(uint256,address)",
            &[Token::Uint(U256::from(id.0)), Token::Address(to)],
        );
        self.write(credential, data).await
    }

    async fn assets_by_owner(&self, owner: Address) -> Result<Vec<AssetId>, LedgerFailure> {
        let ret = self
            .call(abi::encode_call(
                "getAssetsByOwner(address)",
                &[Token::Address(owner)],
            ))
            .await?;
        let mut d = Decoder::new(&ret);
        d.uint_array()?
            .into_iter()
            .map(|v| {
                if v > U256::from(u64::MAX) {
                    Err(LedgerFailure::Unknown("asset id out of range".to_string()))
                } else {
                    Ok(AssetId(v.as_u64()))
                }
            })
            .collect()
    }

    async fn balance_of(&self, address: Address) -> Result<U256, LedgerFailure> {
        let result = self
            .client
            .read("eth_getBalance", json!([address.to_string(), "latest"]))
            .await?;
        parse_quantity(&result)
    }

    async fn total_assets(&self) -> Result<u64, LedgerFailure> {
        let ret = self.call(abi::encode_call("totalAssets()", &[])).await?;
        let mut d = Decoder::new(&ret);
        Ok(d.uint_u64()?)
    }

    async fn fund(&self, to: Address, amount: U256) -> Result<TxHash, LedgerFailure> {
        // Plain value transfer from the operator wallet.
        self.client
            .submit_write(&self.operator, to, amount, &[])
            .await
    }
}
