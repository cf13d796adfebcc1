//! Well-known networks served by the Linkdrop escrow API.

use crate::chain::ChainId;

/// Network name (as used in escrow API paths) to chain id.
static KNOWN_NETWORKS: &[(&str, ChainId)] = &[
    ("base", ChainId::new(8453)),
    ("polygon", ChainId::new(137)),
    ("arbitrum", ChainId::new(42161)),
    ("optimism", ChainId::new(10)),
    ("avalanche", ChainId::new(43114)),
];

pub fn chain_id_by_network_name(network_name: &str) -> Option<ChainId> {
    KNOWN_NETWORKS
        .iter()
        .find(|(name, _)| *name == network_name)
        .map(|(_, chain_id)| *chain_id)
}

pub fn network_name_by_chain_id(chain_id: ChainId) -> Option<&'static str> {
    KNOWN_NETWORKS
        .iter()
        .find(|(_, known)| *known == chain_id)
        .map(|(name, _)| *name)
}

/// Per-network instances for the chains where Linkdrop escrows are deployed.
///
/// Implemented for [`ChainId`]; other per-network data (escrow deployments,
/// stablecoin addresses) can implement it the same way.
///
/// ```
/// use linkdrop_types::chain::ChainId;
/// use linkdrop_types::networks::KnownNetwork;
///
/// assert_eq!(ChainId::base().inner(), 8453);
/// ```
pub trait KnownNetwork<A> {
    fn base() -> A;
    fn polygon() -> A;
    fn arbitrum() -> A;
    fn optimism() -> A;
    fn avalanche() -> A;
}

impl KnownNetwork<ChainId> for ChainId {
    fn base() -> ChainId {
        ChainId::new(8453)
    }

    fn polygon() -> ChainId {
        ChainId::new(137)
    }

    fn arbitrum() -> ChainId {
        ChainId::new(42161)
    }

    fn optimism() -> ChainId {
        ChainId::new(10)
    }

    fn avalanche() -> ChainId {
        ChainId::new(43114)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_name_round_trip() {
        for (name, chain_id) in KNOWN_NETWORKS {
            assert_eq!(chain_id_by_network_name(name), Some(*chain_id));
            assert_eq!(network_name_by_chain_id(*chain_id), Some(*name));
        }
        assert!(chain_id_by_network_name("etherlink").is_none());
    }
}
