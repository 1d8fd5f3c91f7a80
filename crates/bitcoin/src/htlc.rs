//! The Bitcoin HTLC settlement surface.
//!
//! Composes the script tree and the transaction builder into the four
//! operations a swap leg needs: initiate, redeem, refund and the co-signed
//! instant refund. All chain access goes through the provider capability;
//! all signing through the Schnorr signer capability.

use std::sync::Arc;

use bitcoin::hashes::Hash;
use bitcoin::key::Secp256k1;
use bitcoin::secp256k1::{schnorr, Message};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{absolute::LockTime, Address, Amount, Sequence, Transaction, TxOut, Witness};
use gardenswap_types::SwapLeg;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{HtlcError, SignatureFault};
use crate::provider::{ChainDataProvider, FeeUrgency, Utxo};
use crate::script::{HtlcLeaf, HtlcScript};
use crate::signer::SchnorrSigner;
use crate::tx::{inputs_for, sacp_signature_bytes, TxBuilder, DUST_LIMIT};
use crate::Result;

/// A counterparty SACP signature for one HTLC UTXO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstantRefundSignature {
    pub txid: String,
    pub vout: u32,
    /// Hex BIP340 signature (64 bytes, without the sighash-type byte).
    pub signature: String,
}

impl InstantRefundSignature {
    fn matches(&self, utxo: &Utxo) -> bool {
        self.txid == utxo.txid && self.vout == utxo.vout
    }
}

/// Blocks until a UTXO's CSV refund path opens.
///
/// An unconfirmed UTXO counts as `timelock + 1`: its own confirmation plus
/// the full relative lock. A confirmed one is spendable once the tip
/// reaches its height plus the timelock.
pub fn blocks_remaining(utxo: &Utxo, timelock: u64, tip: u64) -> u64 {
    match utxo.status.block_height {
        Some(height) if utxo.status.confirmed => (height + timelock).saturating_sub(tip),
        _ => timelock + 1,
    }
}

/// HTLC operations for one Bitcoin chain.
pub struct BitcoinHtlc<P, S> {
    provider: Arc<P>,
    signer: Arc<S>,
}

impl<P, S> BitcoinHtlc<P, S>
where
    P: ChainDataProvider,
    S: SchnorrSigner,
{
    pub fn new(provider: Arc<P>, signer: Arc<S>) -> Self {
        Self { provider, signer }
    }

    fn builder(&self, leg: &SwapLeg) -> Result<TxBuilder<P, S>> {
        Ok(TxBuilder::new(
            self.provider.clone(),
            self.signer.clone(),
            HtlcScript::from_leg(leg)?,
        ))
    }

    fn key_path_address(
        &self,
        key: bitcoin::XOnlyPublicKey,
        network: bitcoin::Network,
    ) -> Address {
        let secp = Secp256k1::new();
        Address::p2tr(&secp, key, None, network)
    }

    /// Fund the HTLC address with the leg amount from the signer's wallet.
    ///
    /// The wallet is the signer key's plain key-path P2TR output set.
    /// Sub-dust change folds into the fee.
    pub async fn initiate(&self, leg: &SwapLeg, fee: Option<u64>) -> Result<String> {
        let script = HtlcScript::from_leg(leg)?;
        let htlc_address = script.address()?;
        let wallet_address =
            self.key_path_address(self.signer.x_only_public_key(), script.network);
        let wallet_spk = wallet_address.script_pubkey();

        let mut utxos = self.provider.get_utxos(&wallet_address.to_string()).await?;
        let available: u64 = utxos.iter().map(|u| u.value).sum();
        if available == 0 {
            return Err(HtlcError::NotFunded {
                address: wallet_address.to_string(),
            });
        }

        let fee = match fee {
            Some(sats) => sats,
            None => {
                self.provider
                    .suggest_fee(&wallet_address.to_string(), leg.amount, FeeUrgency::Hour)
                    .await?
            }
        };

        let required = leg.amount + fee;
        utxos.sort_by(|a, b| b.value.cmp(&a.value));
        let mut selected = Vec::new();
        let mut selected_value = 0u64;
        for utxo in utxos {
            if selected_value >= required {
                break;
            }
            selected_value += utxo.value;
            selected.push(utxo);
        }
        if selected_value < required {
            return Err(HtlcError::InsufficientFunds {
                required,
                available,
            });
        }

        let mut outputs = vec![TxOut {
            value: Amount::from_sat(leg.amount),
            script_pubkey: htlc_address.script_pubkey(),
        }];
        let change = selected_value - required;
        if change >= DUST_LIMIT {
            outputs.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: wallet_spk.clone(),
            });
        }

        let mut tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs_for(&selected, Sequence::ENABLE_RBF_NO_LOCKTIME)?,
            output: outputs,
        };

        let prevouts: Vec<TxOut> = selected
            .iter()
            .map(|u| TxOut {
                value: Amount::from_sat(u.value),
                script_pubkey: wallet_spk.clone(),
            })
            .collect();
        let mut digests = Vec::with_capacity(tx.input.len());
        {
            let mut cache = SighashCache::new(&tx);
            for index in 0..tx.input.len() {
                let sighash = cache
                    .taproot_key_spend_signature_hash(
                        index,
                        &Prevouts::All(&prevouts),
                        TapSighashType::Default,
                    )
                    .map_err(|e| HtlcError::Sighash(e.to_string()))?;
                digests.push(sighash.to_byte_array());
            }
        }
        for (index, digest) in digests.into_iter().enumerate() {
            let sig = self.signer.sign_schnorr_tweaked(digest, None).await?;
            let mut witness = Witness::new();
            witness.push(sig);
            tx.input[index].witness = witness;
        }

        let txid = self.broadcast(&tx).await?;
        info!(txid = %txid, address = %htlc_address, amount = leg.amount, "initiated htlc");
        Ok(txid)
    }

    /// Claim the HTLC with the swap secret.
    pub async fn redeem(
        &self,
        leg: &SwapLeg,
        secret: [u8; 32],
        explicit_txids: Option<&[String]>,
    ) -> Result<String> {
        let builder = self.builder(leg)?;
        let script = builder.script();

        let hashed: [u8; 32] = Sha256::digest(secret).into();
        if hashed != script.secret_hash {
            return Err(HtlcError::SecretMismatch);
        }

        let receiver = self.key_path_address(script.redeemer, script.network);
        let (tx, _) = builder
            .build_signed_sweep(HtlcLeaf::Redeem, &receiver, None, Some(secret), explicit_txids)
            .await?;

        let txid = self.broadcast(&tx).await?;
        info!(txid = %txid, receiver = %receiver, "redeemed htlc");
        Ok(txid)
    }

    /// Blocks until every HTLC UTXO's refund path is open (0 = refundable).
    pub async fn refund_blocks_remaining(&self, leg: &SwapLeg) -> Result<u64> {
        let builder = self.builder(leg)?;
        let utxos = builder.collect_utxos(None).await?;
        if utxos.is_empty() {
            return Err(HtlcError::NotFunded {
                address: builder.script().address()?.to_string(),
            });
        }
        let tip = self.provider.latest_tip().await?;
        Ok(utxos
            .iter()
            .map(|u| blocks_remaining(u, leg.timelock, tip))
            .max()
            .unwrap_or(0))
    }

    /// Sweep the HTLC back to the initiator after the timelock.
    pub async fn refund(&self, leg: &SwapLeg, fee: Option<u64>) -> Result<String> {
        let remaining = self.refund_blocks_remaining(leg).await?;
        if remaining > 0 {
            return Err(HtlcError::TimelockNotExpired {
                blocks_remaining: remaining,
            });
        }

        let builder = self.builder(leg)?;
        let script = builder.script();
        let receiver = self.key_path_address(script.initiator, script.network);
        let (tx, _) = builder
            .build_signed_sweep(HtlcLeaf::Refund, &receiver, fee, None, None)
            .await?;

        let txid = self.broadcast(&tx).await?;
        info!(txid = %txid, receiver = %receiver, "refunded htlc");
        Ok(txid)
    }

    /// Produce the co-signed instant-refund transaction hex (redeemer side).
    ///
    /// Every HTLC UTXO is refunded to the initiator in one transaction;
    /// each input carries this signer's `SIGHASH_SINGLE|ANYONECANPAY`
    /// signature in both witness slots — the counterparty substitutes its
    /// own signature into the first slot before broadcasting.
    pub async fn generate_instant_refund_sacp(&self, leg: &SwapLeg) -> Result<String> {
        let builder = self.builder(leg)?;
        let script = builder.script();
        let receiver = self.key_path_address(script.initiator, script.network);

        let utxos = builder.collect_utxos(None).await?;
        let temp = self
            .signed_sacp(&builder, &utxos, &receiver, 0, None)
            .await?;
        let fee = builder.fee_for_vsize(temp.vsize() as u64).await?;
        debug!(vsize = temp.vsize(), fee, "sized instant refund");

        let tx = self
            .signed_sacp(&builder, &utxos, &receiver, fee, None)
            .await?;
        Ok(bitcoin::consensus::encode::serialize_hex(&tx))
    }

    /// Broadcast the instant refund with the counterparty's signatures
    /// (initiator side).
    pub async fn instant_refund(
        &self,
        leg: &SwapLeg,
        counterparty_sigs: &[InstantRefundSignature],
        fee: Option<u64>,
    ) -> Result<String> {
        if counterparty_sigs.is_empty() {
            return Err(HtlcError::validation(
                "instant refund requires at least one counterparty signature",
            ));
        }

        let builder = self.builder(leg)?;
        let script = builder.script();
        let receiver = self.key_path_address(script.initiator, script.network);
        let utxos = builder.collect_utxos(None).await?;

        let fee = match fee {
            Some(sats) => sats,
            None => {
                let temp = self
                    .signed_sacp(&builder, &utxos, &receiver, 0, None)
                    .await?;
                builder.fee_for_vsize(temp.vsize() as u64).await?
            }
        };

        let tx = self
            .signed_sacp(&builder, &utxos, &receiver, fee, Some(counterparty_sigs))
            .await?;
        let txid = self.broadcast(&tx).await?;
        info!(txid = %txid, inputs = tx.input.len(), "instant refunded htlc");
        Ok(txid)
    }

    /// Assemble and witness a SACP transaction.
    ///
    /// With `counterparty_sigs`, each input gets [own sig, counterparty
    /// sig]; the counterparty signature is Schnorr-verified against the
    /// redeemer key before it is attached. Without, both slots hold this
    /// signer's signature (fee sizing and SACP generation).
    async fn signed_sacp(
        &self,
        builder: &TxBuilder<P, S>,
        utxos: &[Utxo],
        receiver: &Address,
        fee: u64,
        counterparty_sigs: Option<&[InstantRefundSignature]>,
    ) -> Result<Transaction> {
        let script = builder.script();
        let mut tx = builder.assemble_sacp(utxos, receiver, fee)?;
        let leaf_script = script.instant_refund_leaf();
        let control_block = script.control_block(HtlcLeaf::InstantRefund)?;
        let secp = Secp256k1::verification_only();

        for (index, utxo) in utxos.iter().enumerate() {
            let digest = builder.sacp_sighash(&tx, index, utxo)?;
            let own = self.signer.sign_schnorr(digest).await?;

            let first_slot = match counterparty_sigs {
                None => own,
                Some(sigs) => {
                    let provided = sigs.iter().find(|s| s.matches(utxo)).ok_or_else(|| {
                        HtlcError::CounterpartySignature {
                            utxo: utxo.outpoint(),
                            fault: SignatureFault::Missing,
                        }
                    })?;
                    let bytes = hex::decode(&provided.signature)
                        .ok()
                        .and_then(|b| <[u8; 64]>::try_from(b).ok())
                        .ok_or_else(|| {
                            HtlcError::validation("counterparty signature is not 64 bytes of hex")
                        })?;
                    let sig = schnorr::Signature::from_slice(&bytes)
                        .map_err(|e| HtlcError::validation(e.to_string()))?;
                    secp.verify_schnorr(&sig, &Message::from_digest(digest), &script.redeemer)
                        .map_err(|_| HtlcError::CounterpartySignature {
                            utxo: utxo.outpoint(),
                            fault: SignatureFault::Invalid,
                        })?;
                    bytes
                }
            };

            // Witness order: initiator signature first, redeemer's on top.
            let (initiator_sig, redeemer_sig) = match counterparty_sigs {
                Some(_) => (own, first_slot),
                None => (first_slot, own),
            };
            let mut witness = Witness::new();
            witness.push(sacp_signature_bytes(initiator_sig));
            witness.push(sacp_signature_bytes(redeemer_sig));
            witness.push(leaf_script.as_bytes());
            witness.push(&control_block);
            tx.input[index].witness = witness;
        }
        Ok(tx)
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<String> {
        let tx_hex = bitcoin::consensus::encode::serialize_hex(tx);
        self.provider.broadcast(&tx_hex).await
    }
}
