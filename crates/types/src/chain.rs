use serde::{Deserialize, Serialize};

/// A chain a swap leg can settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    BitcoinRegtest,
    Ethereum,
    Arbitrum,
    Base,
    Solana,
    Starknet,
    Sui,
}

/// Chain family, used for execution dispatch.
///
/// Each family exposes the same HTLC capability (initiate/redeem/refund);
/// the executor selects an implementation by family tag, never by probing
/// a value's shape at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Bitcoin,
    Evm,
    Solana,
    Starknet,
    Sui,
}

impl Chain {
    /// The family this chain dispatches under.
    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet | Chain::BitcoinRegtest => ChainFamily::Bitcoin,
            Chain::Ethereum | Chain::Arbitrum | Chain::Base => ChainFamily::Evm,
            Chain::Solana => ChainFamily::Solana,
            Chain::Starknet => ChainFamily::Starknet,
            Chain::Sui => ChainFamily::Sui,
        }
    }

    /// The `bitcoin` crate network for Bitcoin-family chains.
    pub fn bitcoin_network(&self) -> Option<bitcoin::Network> {
        match self {
            Chain::Bitcoin => Some(bitcoin::Network::Bitcoin),
            Chain::BitcoinTestnet => Some(bitcoin::Network::Testnet),
            Chain::BitcoinRegtest => Some(bitcoin::Network::Regtest),
            _ => None,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Chain::Bitcoin => "bitcoin",
            Chain::BitcoinTestnet => "bitcoin_testnet",
            Chain::BitcoinRegtest => "bitcoin_regtest",
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
            Chain::Base => "base",
            Chain::Solana => "solana",
            Chain::Starknet => "starknet",
            Chain::Sui => "sui",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitcoin_chains_map_to_bitcoin_family() {
        assert_eq!(Chain::Bitcoin.family(), ChainFamily::Bitcoin);
        assert_eq!(Chain::BitcoinTestnet.family(), ChainFamily::Bitcoin);
        assert_eq!(Chain::BitcoinRegtest.family(), ChainFamily::Bitcoin);
    }

    #[test]
    fn evm_chains_map_to_evm_family() {
        assert_eq!(Chain::Ethereum.family(), ChainFamily::Evm);
        assert_eq!(Chain::Arbitrum.family(), ChainFamily::Evm);
        assert_eq!(Chain::Base.family(), ChainFamily::Evm);
    }

    #[test]
    fn bitcoin_network_only_for_bitcoin_chains() {
        assert_eq!(
            Chain::BitcoinRegtest.bitcoin_network(),
            Some(bitcoin::Network::Regtest)
        );
        assert_eq!(Chain::Ethereum.bitcoin_network(), None);
    }

    #[test]
    fn chain_serializes_snake_case() {
        let json = serde_json::to_string(&Chain::BitcoinTestnet).unwrap();
        assert_eq!(json, "\"bitcoin_testnet\"");
    }
}
