//! HTLC script-tree construction.
//!
//! Three tapscript leaves cover every spend path:
//! redeem (secret + redeemer key), refund (CSV timelock + initiator key)
//! and instant refund (2-of-2, refund before expiry with redeemer consent).
//! The redeem leaf sits alone at depth one — it is the expected spend path
//! and gets the smallest control block; the two refund leaves share the
//! second branch. Key-path spending is disabled by a NUMS internal key.

use bitcoin::key::Secp256k1;
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CHECKSIGADD, OP_CSV, OP_DROP, OP_EQUALVERIFY, OP_NUMEQUAL, OP_SHA256,
};
use bitcoin::script::Builder;
use bitcoin::secp256k1::{PublicKey, SecretKey};
use bitcoin::taproot::{LeafVersion, TaprootBuilder, TaprootSpendInfo};
use bitcoin::{Address, Network, ScriptBuf, TapLeafHash, XOnlyPublicKey};
use gardenswap_types::SwapLeg;
use sha2::{Digest, Sha256};
use std::str::FromStr;

use crate::error::HtlcError;
use crate::Result;

/// Tag hashed into the NUMS scalar.
const NUMS_TAG: &[u8] = b"GardenHTLC";

/// Fixed generator-independent point H; no party knows its discrete log.
const NUMS_H: &str = "0250929b74c1a04954b78b4b6035e97a5e078a5a0f28ec96d547bfee9ace803ac0";

/// The spend paths committed into the HTLC script tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HtlcLeaf {
    Redeem,
    Refund,
    InstantRefund,
}

impl std::fmt::Display for HtlcLeaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HtlcLeaf::Redeem => f.write_str("redeem"),
            HtlcLeaf::Refund => f.write_str("refund"),
            HtlcLeaf::InstantRefund => f.write_str("instant_refund"),
        }
    }
}

/// The internal key used for every HTLC output.
///
/// `H + SHA256("GardenHTLC")·G`, reduced to x-only form. Adding the hash
/// point to H keeps the key provably unspendable, forcing every spend
/// through one of the script leaves.
pub fn nums_internal_key() -> XOnlyPublicKey {
    let secp = Secp256k1::new();
    let h = PublicKey::from_str(NUMS_H).expect("constant point is valid");
    let scalar: [u8; 32] = Sha256::digest(NUMS_TAG).into();
    let sk = SecretKey::from_slice(&scalar).expect("tag hash is a valid scalar");
    let hashed_g = PublicKey::from_secret_key(&secp, &sk);
    h.combine(&hashed_g)
        .expect("sum of distinct points is not infinity")
        .x_only_public_key()
        .0
}

/// The script-side view of one Bitcoin HTLC.
#[derive(Debug, Clone)]
pub struct HtlcScript {
    pub secret_hash: [u8; 32],
    pub initiator: XOnlyPublicKey,
    pub redeemer: XOnlyPublicKey,
    pub timelock: u16,
    pub network: Network,
}

impl HtlcScript {
    pub fn new(
        secret_hash: [u8; 32],
        initiator: XOnlyPublicKey,
        redeemer: XOnlyPublicKey,
        timelock: u16,
        network: Network,
    ) -> Self {
        Self {
            secret_hash,
            initiator,
            redeemer,
            timelock,
            network,
        }
    }

    /// Build the script view from an orderbook leg snapshot.
    pub fn from_leg(leg: &SwapLeg) -> Result<Self> {
        let network = leg
            .chain
            .bitcoin_network()
            .ok_or_else(|| HtlcError::script_type(format!("{} is not a bitcoin chain", leg.chain)))?;

        let secret_hash = parse_hash32(&leg.secret_hash)?;
        let initiator = parse_xonly(&leg.initiator, "initiator")?;
        let redeemer = parse_xonly(&leg.redeemer, "redeemer")?;

        let timelock = u16::try_from(leg.timelock).map_err(|_| {
            HtlcError::validation(format!(
                "timelock {} exceeds the CSV height range",
                leg.timelock
            ))
        })?;
        if timelock == 0 {
            return Err(HtlcError::validation("timelock must be non-zero"));
        }

        Ok(Self::new(secret_hash, initiator, redeemer, timelock, network))
    }

    /// `OP_SHA256 <hash> OP_EQUALVERIFY <redeemer> OP_CHECKSIG`
    pub fn redeem_leaf(&self) -> ScriptBuf {
        Builder::new()
            .push_opcode(OP_SHA256)
            .push_slice(self.secret_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_slice(self.redeemer.serialize())
            .push_opcode(OP_CHECKSIG)
            .into_script()
    }

    /// `<timelock> OP_CSV OP_DROP <initiator> OP_CHECKSIG`
    pub fn refund_leaf(&self) -> ScriptBuf {
        Builder::new()
            .push_int(i64::from(self.timelock))
            .push_opcode(OP_CSV)
            .push_opcode(OP_DROP)
            .push_slice(self.initiator.serialize())
            .push_opcode(OP_CHECKSIG)
            .into_script()
    }

    /// `<redeemer> OP_CHECKSIG <initiator> OP_CHECKSIGADD 2 OP_NUMEQUAL`
    ///
    /// Key order is fixed by the witness layout: the initiator signature is
    /// pushed first and the redeemer signature lands on top of the stack,
    /// so the first key checked must be the redeemer's.
    pub fn instant_refund_leaf(&self) -> ScriptBuf {
        Builder::new()
            .push_slice(self.redeemer.serialize())
            .push_opcode(OP_CHECKSIG)
            .push_slice(self.initiator.serialize())
            .push_opcode(OP_CHECKSIGADD)
            .push_int(2)
            .push_opcode(OP_NUMEQUAL)
            .into_script()
    }

    pub fn leaf_script(&self, leaf: HtlcLeaf) -> ScriptBuf {
        match leaf {
            HtlcLeaf::Redeem => self.redeem_leaf(),
            HtlcLeaf::Refund => self.refund_leaf(),
            HtlcLeaf::InstantRefund => self.instant_refund_leaf(),
        }
    }

    /// BIP341 tagged hash of a leaf (leaf version ∥ compact-size script).
    pub fn leaf_hash(&self, leaf: HtlcLeaf) -> TapLeafHash {
        TapLeafHash::from_script(&self.leaf_script(leaf), LeafVersion::TapScript)
    }

    /// Assemble the two-level tree and tweak the NUMS key into the output.
    ///
    /// Branch ordering inside a level follows the BIP341 lexicographic sort
    /// applied by the builder, so the commitment is deterministic however
    /// the leaves are added.
    pub fn spend_info(&self) -> Result<TaprootSpendInfo> {
        let secp = Secp256k1::new();
        TaprootBuilder::new()
            .add_leaf(1, self.redeem_leaf())
            .and_then(|b| b.add_leaf(2, self.refund_leaf()))
            .and_then(|b| b.add_leaf(2, self.instant_refund_leaf()))
            .map_err(|e| HtlcError::validation(format!("taproot tree: {e}")))?
            .finalize(&secp, nums_internal_key())
            .map_err(|_| HtlcError::validation("taproot tree finalization failed"))
    }

    /// The HTLC's Taproot deposit address.
    pub fn address(&self) -> Result<Address> {
        let spend_info = self.spend_info()?;
        Ok(Address::p2tr_tweaked(spend_info.output_key(), self.network))
    }

    /// Serialized control block proving `leaf` belongs to the tree
    /// (parity byte ∥ internal key ∥ merkle path).
    pub fn control_block(&self, leaf: HtlcLeaf) -> Result<Vec<u8>> {
        let spend_info = self.spend_info()?;
        let script = self.leaf_script(leaf);
        spend_info
            .control_block(&(script, LeafVersion::TapScript))
            .map(|cb| cb.serialize())
            .ok_or_else(|| HtlcError::ControlBlockGeneration {
                leaf: leaf.to_string(),
            })
    }
}

fn parse_hash32(hex_hash: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_hash.trim_start_matches("0x"))
        .map_err(|_| HtlcError::validation("secret hash is not hex"))?;
    bytes
        .try_into()
        .map_err(|_| HtlcError::validation("secret hash must be 32 bytes"))
}

fn parse_xonly(hex_key: &str, role: &str) -> Result<XOnlyPublicKey> {
    XOnlyPublicKey::from_str(hex_key.trim_start_matches("0x"))
        .map_err(|_| HtlcError::validation(format!("{role} is not a 32-byte x-only pubkey")))
}
