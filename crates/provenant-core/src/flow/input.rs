//! Per-step input validators.
//!
//! Pure functions from user text to typed values; a [`FlowReject`] carries
//! the corrective message for the re-prompt and means the session must not
//! advance.

use primitive_types::U256;
use provenant_types::address::Address;
use provenant_types::amount::parse_units;
use provenant_types::asset::{AssetId, ContentHash};
use provenant_types::error::FlowReject;

pub(super) fn asset_id(text: &str) -> Result<AssetId, FlowReject> {
    text.parse::<u64>()
        .map(AssetId)
        .map_err(|_| FlowReject::new("That's not an asset id. Send a plain number, or /cancel."))
}

pub(super) fn price(text: &str) -> Result<U256, FlowReject> {
    parse_units(text).map_err(|err| FlowReject::new(format!("{err}. Try again, e.g. 0.5.")))
}

pub(super) fn yes_no(text: &str) -> Result<bool, FlowReject> {
    match text.to_ascii_lowercase().as_str() {
        "yes" | "y" => Ok(true),
        "no" | "n" => Ok(false),
        _ => Err(FlowReject::new("Please answer yes or no.")),
    }
}

pub(super) fn royalty(text: &str) -> Result<u8, FlowReject> {
    match text.parse::<u8>() {
        Ok(r) if r <= 100 => Ok(r),
        _ => Err(FlowReject::new(
            "Royalty must be a whole number between 0 and 100.",
        )),
    }
}

pub(super) fn address(text: &str) -> Result<Address, FlowReject> {
    text.parse::<Address>()
        .map_err(|err| FlowReject::new(format!("{err}. Send an address like 0x12ab...cd34.")))
}

/// A transfer recipient: a canonical address that is not the zero address.
/// (Whether it is the sender's own wallet is checked against the resolved
/// wallet record, not here.)
pub(super) fn recipient(text: &str) -> Result<Address, FlowReject> {
    let addr = address(text)?;
    if addr.is_zero() {
        return Err(FlowReject::new(
            "The zero address would burn the asset. Send a real recipient.",
        ));
    }
    Ok(addr)
}

pub(super) fn content_hash(text: &str) -> Result<ContentHash, FlowReject> {
    let hash = ContentHash::new(text);
    if !hash.is_canonical() {
        return Err(FlowReject::new(
            "That doesn't look like a content hash. It starts with Qm, e.g. QmYwAP...",
        ));
    }
    Ok(hash)
}
