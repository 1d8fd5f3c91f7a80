//! HTLC sweep-transaction assembly and script-path signing.
//!
//! Every spend of the HTLC address goes through a two-pass protocol: the
//! transaction is first built and fully signed at fee zero to learn its
//! exact virtual size (witness size depends on the final signatures), then
//! rebuilt with the fee implied by that size and re-signed.

use std::str::FromStr;
use std::sync::Arc;

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use tracing::debug;

use crate::error::HtlcError;
use crate::provider::{ChainDataProvider, Utxo};
use crate::script::{HtlcLeaf, HtlcScript};
use crate::signer::SchnorrSigner;
use crate::Result;

/// Outputs below this are treated as unspendable.
pub(crate) const DUST_LIMIT: u64 = 546;

/// Sighash-type byte appended to SACP signatures.
const SACP_SIGHASH_BYTE: u8 = 0x83; // SIGHASH_SINGLE | SIGHASH_ANYONECANPAY

/// How the fee of a sweep is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTarget {
    /// Use this absolute fee in sats.
    Absolute(u64),
    /// Derive the fee from a known virtual size at the hour rate.
    VirtualSize(u64),
}

/// An unsigned sweep with its funding set.
#[derive(Debug, Clone)]
pub struct RawTx {
    pub tx: Transaction,
    pub utxos: Vec<Utxo>,
    pub fee: u64,
    pub balance: u64,
}

/// Builds and signs transactions spending one HTLC's outputs.
pub struct TxBuilder<P, S> {
    provider: Arc<P>,
    signer: Arc<S>,
    script: HtlcScript,
}

impl<P, S> TxBuilder<P, S>
where
    P: ChainDataProvider,
    S: SchnorrSigner,
{
    pub fn new(provider: Arc<P>, signer: Arc<S>, script: HtlcScript) -> Self {
        Self {
            provider,
            signer,
            script,
        }
    }

    pub fn script(&self) -> &HtlcScript {
        &self.script
    }

    /// The UTXOs currently funding the HTLC address.
    ///
    /// Explicit txids are resolved through the provider and filtered to
    /// outputs actually paying the HTLC address; otherwise the full address
    /// UTXO set is used.
    pub async fn collect_utxos(&self, explicit_txids: Option<&[String]>) -> Result<Vec<Utxo>> {
        let address = self.script.address()?.to_string();
        let Some(txids) = explicit_txids else {
            return self.provider.get_utxos(&address).await;
        };

        let mut utxos = Vec::new();
        for txid in txids {
            let tx = self.provider.get_transaction(txid).await?;
            for (vout, output) in tx.vout.iter().enumerate() {
                if output.scriptpubkey_address.as_deref() == Some(address.as_str()) {
                    utxos.push(Utxo {
                        txid: tx.txid.clone(),
                        vout: vout as u32,
                        value: output.value,
                        status: tx.status.clone(),
                    });
                }
            }
        }
        Ok(utxos)
    }

    /// Assemble an unsigned sweep of the given UTXO set into one output.
    pub fn assemble_sweep(
        &self,
        utxos: &[Utxo],
        receiver: &Address,
        fee: u64,
        sequence: Sequence,
    ) -> Result<Transaction> {
        let balance = balance_of(utxos, &self.script)?;
        if balance <= fee || balance - fee < DUST_LIMIT {
            return Err(HtlcError::InsufficientFunds {
                required: fee + DUST_LIMIT,
                available: balance,
            });
        }

        Ok(Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs_for(utxos, sequence)?,
            output: vec![TxOut {
                value: Amount::from_sat(balance - fee),
                script_pubkey: receiver.script_pubkey(),
            }],
        })
    }

    /// Collect funding and assemble an unsigned sweep, resolving the fee.
    pub async fn build_raw_tx(
        &self,
        receiver: &Address,
        fee: FeeTarget,
        sequence: Sequence,
        explicit_txids: Option<&[String]>,
    ) -> Result<RawTx> {
        let utxos = self.collect_utxos(explicit_txids).await?;
        let balance = balance_of(&utxos, &self.script)?;
        let fee = self.resolve_fee(fee).await?;
        let tx = self.assemble_sweep(&utxos, receiver, fee, sequence)?;
        Ok(RawTx {
            tx,
            utxos,
            fee,
            balance,
        })
    }

    async fn resolve_fee(&self, fee: FeeTarget) -> Result<u64> {
        match fee {
            FeeTarget::Absolute(sats) => Ok(sats),
            FeeTarget::VirtualSize(vsize) => self.fee_for_vsize(vsize).await,
        }
    }

    /// Fee in sats for a transaction of `vsize` vbytes at the hour rate.
    pub async fn fee_for_vsize(&self, vsize: u64) -> Result<u64> {
        let rates = self.provider.fee_rates().await?;
        Ok((rates.hour * vsize as f64).ceil() as u64)
    }

    /// Build and sign a sweep through `leaf`, sizing the fee via the
    /// two-pass protocol unless an absolute fee is given.
    pub async fn build_signed_sweep(
        &self,
        leaf: HtlcLeaf,
        receiver: &Address,
        fee: Option<u64>,
        secret: Option<[u8; 32]>,
        explicit_txids: Option<&[String]>,
    ) -> Result<(Transaction, Vec<Utxo>)> {
        let sequence = match leaf {
            HtlcLeaf::Refund => Sequence::from_height(self.script.timelock),
            _ => Sequence::ENABLE_RBF_NO_LOCKTIME,
        };

        let utxos = self.collect_utxos(explicit_txids).await?;
        let fee = match fee {
            Some(sats) => sats,
            None => {
                let mut temp = self.assemble_sweep(&utxos, receiver, 0, sequence)?;
                self.sign_sweep(&mut temp, &utxos, leaf, secret).await?;
                let fee = self.fee_for_vsize(temp.vsize() as u64).await?;
                debug!(vsize = temp.vsize(), fee, leaf = %leaf, "sized sweep");
                fee
            }
        };

        let mut tx = self.assemble_sweep(&utxos, receiver, fee, sequence)?;
        self.sign_sweep(&mut tx, &utxos, leaf, secret).await?;
        Ok((tx, utxos))
    }

    /// Sign every input with `SIGHASH_DEFAULT` and attach the leaf witness.
    async fn sign_sweep(
        &self,
        tx: &mut Transaction,
        utxos: &[Utxo],
        leaf: HtlcLeaf,
        secret: Option<[u8; 32]>,
    ) -> Result<()> {
        if leaf == HtlcLeaf::InstantRefund {
            return Err(HtlcError::validation(
                "instant refund inputs are signed through the SACP path",
            ));
        }
        let secret = match (leaf, secret) {
            (HtlcLeaf::Redeem, None) => {
                return Err(HtlcError::validation("redeem requires the secret"))
            }
            (_, secret) => secret,
        };

        let prevouts = self.prevouts(utxos)?;
        let leaf_hash = self.script.leaf_hash(leaf);
        let mut digests = Vec::with_capacity(tx.input.len());
        {
            let mut cache = SighashCache::new(&*tx);
            for index in 0..utxos.len() {
                let sighash = cache
                    .taproot_script_spend_signature_hash(
                        index,
                        &Prevouts::All(&prevouts),
                        leaf_hash,
                        TapSighashType::Default,
                    )
                    .map_err(|e| HtlcError::Sighash(e.to_string()))?;
                digests.push(sighash.to_byte_array());
            }
        }

        let leaf_script = self.script.leaf_script(leaf);
        let control_block = self.script.control_block(leaf)?;
        for (index, digest) in digests.into_iter().enumerate() {
            let sig = self.signer.sign_schnorr(digest).await?;
            let mut witness = Witness::new();
            witness.push(sig);
            if let (HtlcLeaf::Redeem, Some(secret)) = (leaf, secret) {
                witness.push(secret);
            }
            witness.push(leaf_script.as_bytes());
            witness.push(&control_block);
            tx.input[index].witness = witness;
        }
        Ok(())
    }

    /// Assemble the instant-refund (SACP) transaction.
    ///
    /// One output per input so `SIGHASH_SINGLE` pairs each input with its
    /// own payout; the fee is paid once, by the largest UTXO's output.
    pub fn assemble_sacp(
        &self,
        utxos: &[Utxo],
        receiver: &Address,
        fee: u64,
    ) -> Result<Transaction> {
        balance_of(utxos, &self.script)?;
        let max_index = utxos
            .iter()
            .enumerate()
            .max_by_key(|(_, u)| u.value)
            .map(|(i, _)| i)
            .expect("balance check guarantees at least one utxo");

        let mut outputs = Vec::with_capacity(utxos.len());
        for (index, utxo) in utxos.iter().enumerate() {
            let value = if index == max_index {
                if utxo.value <= fee || utxo.value - fee < DUST_LIMIT {
                    return Err(HtlcError::InsufficientFunds {
                        required: fee + DUST_LIMIT,
                        available: utxo.value,
                    });
                }
                utxo.value - fee
            } else {
                utxo.value
            };
            outputs.push(TxOut {
                value: Amount::from_sat(value),
                script_pubkey: receiver.script_pubkey(),
            });
        }

        Ok(Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: inputs_for(utxos, Sequence::ENABLE_RBF_NO_LOCKTIME)?,
            output: outputs,
        })
    }

    /// `SIGHASH_SINGLE|ANYONECANPAY` digest for one SACP input.
    ///
    /// Commits only to this input and its paired output, so each party can
    /// sign independently without coordinating on the full transaction.
    pub fn sacp_sighash(&self, tx: &Transaction, index: usize, utxo: &Utxo) -> Result<[u8; 32]> {
        let prevout = TxOut {
            value: Amount::from_sat(utxo.value),
            script_pubkey: self.script.address()?.script_pubkey(),
        };
        let mut cache = SighashCache::new(tx);
        let sighash = cache
            .taproot_script_spend_signature_hash(
                index,
                &Prevouts::One(index, prevout),
                self.script.leaf_hash(HtlcLeaf::InstantRefund),
                TapSighashType::SinglePlusAnyoneCanPay,
            )
            .map_err(|e| HtlcError::Sighash(e.to_string()))?;
        Ok(sighash.to_byte_array())
    }

    fn prevouts(&self, utxos: &[Utxo]) -> Result<Vec<TxOut>> {
        let script_pubkey = self.script.address()?.script_pubkey();
        Ok(utxos
            .iter()
            .map(|u| TxOut {
                value: Amount::from_sat(u.value),
                script_pubkey: script_pubkey.clone(),
            })
            .collect())
    }
}

/// A non-default sighash type rides along with the signature.
pub fn sacp_signature_bytes(sig: [u8; 64]) -> [u8; 65] {
    let mut bytes = [0u8; 65];
    bytes[..64].copy_from_slice(&sig);
    bytes[64] = SACP_SIGHASH_BYTE;
    bytes
}

fn balance_of(utxos: &[Utxo], script: &HtlcScript) -> Result<u64> {
    let balance: u64 = utxos.iter().map(|u| u.value).sum();
    if balance == 0 {
        return Err(HtlcError::NotFunded {
            address: script
                .address()
                .map(|a| a.to_string())
                .unwrap_or_default(),
        });
    }
    Ok(balance)
}

pub(crate) fn inputs_for(utxos: &[Utxo], sequence: Sequence) -> Result<Vec<TxIn>> {
    utxos
        .iter()
        .map(|utxo| {
            let txid = Txid::from_str(&utxo.txid)
                .map_err(|_| HtlcError::validation(format!("invalid txid {}", utxo.txid)))?;
            Ok(TxIn {
                previous_output: OutPoint::new(txid, utxo.vout),
                script_sig: ScriptBuf::new(),
                sequence,
                witness: Witness::new(),
            })
        })
        .collect()
}
