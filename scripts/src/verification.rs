//! Verification registry: block-explorer parameters used after a deployment

use std::collections::BTreeMap;

use alloy::primitives::ChainId;
use tracing::debug;

use crate::{
    errors::ConfigError,
    networks::NetworkRegistry,
    secrets::{CredentialRef, CredentialResolver, Secret, SecretSource},
};

/// Explorer API parameters of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    /// Id of the network in the [`NetworkRegistry`]
    pub network_id: String,
    /// Must equal the chain id of the network entry
    pub chain_id: ChainId,
    pub api_url: String,
    pub browser_url: String,
    pub api_key_ref: CredentialRef,
}

/// Verification parameters with the API key resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVerification {
    pub network_id: String,
    pub chain_id: ChainId,
    pub api_url: String,
    pub browser_url: String,
    pub api_key: Secret,
}

/// Explorer entries keyed by network id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRegistry {
    entries: BTreeMap<String, VerificationEntry>,
}

impl VerificationRegistry {
    /// Build the registry, rejecting a network declared twice
    pub fn new(entries: Vec<VerificationEntry>) -> Result<Self, ConfigError> {
        let mut by_id = BTreeMap::new();
        for entry in entries {
            if by_id.contains_key(&entry.network_id) {
                return Err(ConfigError::InvalidDeclaration(format!(
                    "verification for {} declared twice",
                    entry.network_id
                )));
            }
            by_id.insert(entry.network_id.clone(), entry);
        }
        Ok(VerificationRegistry { entries: by_id })
    }

    /// Explorer entries in network id order
    pub fn entries(&self) -> impl Iterator<Item = &VerificationEntry> {
        self.entries.values()
    }

    /// Look up the explorer of `network_id`, checking its chain id against the
    /// network registry
    pub fn resolve_verification(
        &self,
        network_id: &str,
        networks: &NetworkRegistry,
    ) -> Result<&VerificationEntry, ConfigError> {
        let entry = self
            .entries
            .get(network_id)
            .ok_or_else(|| ConfigError::UnsupportedNetworkForVerification(network_id.to_string()))?;
        check_chain_id(entry, networks)?;
        Ok(entry)
    }

    /// Resolve the explorer API key of `entry`
    pub fn resolve_api_key<S: SecretSource>(
        &self,
        entry: &VerificationEntry,
        credentials: &CredentialResolver<S>,
    ) -> Result<Secret, ConfigError> {
        credentials.resolve_secret(&entry.api_key_ref)
    }

    /// Resolve explorer parameters and API key of `network_id`
    pub fn resolve<S: SecretSource>(
        &self,
        network_id: &str,
        networks: &NetworkRegistry,
        credentials: &CredentialResolver<S>,
    ) -> Result<ResolvedVerification, ConfigError> {
        let entry = self.resolve_verification(network_id, networks)?;
        let api_key = self.resolve_api_key(entry, credentials)?;
        debug!("Resolved verification for {} via {}", network_id, entry.api_url);

        Ok(ResolvedVerification {
            network_id: entry.network_id.clone(),
            chain_id: entry.chain_id,
            api_url: entry.api_url.clone(),
            browser_url: entry.browser_url.clone(),
            api_key,
        })
    }

    /// Check every entry names a declared network with the same chain id
    pub fn check_consistency(&self, networks: &NetworkRegistry) -> Result<(), ConfigError> {
        self.entries
            .values()
            .try_for_each(|entry| check_chain_id(entry, networks))
    }
}

/// A verification entry must agree with the network registry on the chain id
fn check_chain_id(entry: &VerificationEntry, networks: &NetworkRegistry) -> Result<(), ConfigError> {
    let network_chain_id = networks.chain_id(&entry.network_id);
    if network_chain_id != Some(entry.chain_id) {
        return Err(ConfigError::ConfigInconsistency {
            network: entry.network_id.clone(),
            network_chain_id,
            verification_chain_id: entry.chain_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{networks::NetworkEntry, secrets::MapSecretSource};

    fn networks() -> NetworkRegistry {
        NetworkRegistry::new(vec![
            NetworkEntry::new("base-mainnet", 8453, "https://mainnet.base.org", None, vec![])
                .unwrap(),
            NetworkEntry::new("hardhat", 31337, "http://127.0.0.1:8545", None, vec![]).unwrap(),
        ])
        .unwrap()
    }

    fn basescan(chain_id: ChainId) -> VerificationEntry {
        VerificationEntry {
            network_id: "base-mainnet".to_string(),
            chain_id,
            api_url: "https://api.basescan.org/api".to_string(),
            browser_url: "https://basescan.org".to_string(),
            api_key_ref: "API_KEY_BASE_ONLINE".into(),
        }
    }

    #[test]
    fn resolves_matching_entry() {
        let registry = VerificationRegistry::new(vec![basescan(8453)]).unwrap();
        let credentials =
            CredentialResolver::new(MapSecretSource::new().with("API_KEY_BASE_ONLINE", "scan"));
        let resolved = registry
            .resolve("base-mainnet", &networks(), &credentials)
            .unwrap();
        assert_eq!(resolved.chain_id, 8453);
        assert_eq!(resolved.api_key.expose(), "scan");
    }

    #[test]
    fn diverging_chain_id_is_an_inconsistency() {
        let registry = VerificationRegistry::new(vec![basescan(1)]).unwrap();
        assert_eq!(
            registry
                .resolve_verification("base-mainnet", &networks())
                .unwrap_err(),
            ConfigError::ConfigInconsistency {
                network: "base-mainnet".to_string(),
                network_chain_id: Some(8453),
                verification_chain_id: 1,
            }
        );
        assert!(registry.check_consistency(&networks()).is_err());
    }

    #[test]
    fn entry_without_network_is_an_inconsistency() {
        let mut orphan = basescan(42161);
        orphan.network_id = "arbitrumOne".to_string();
        let registry = VerificationRegistry::new(vec![orphan]).unwrap();
        assert!(matches!(
            registry.check_consistency(&networks()),
            Err(ConfigError::ConfigInconsistency {
                network_chain_id: None,
                ..
            })
        ));
    }

    #[test]
    fn missing_entry_is_unsupported() {
        let registry = VerificationRegistry::new(vec![basescan(8453)]).unwrap();
        let err = registry
            .resolve_verification("hardhat", &networks())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnsupportedNetworkForVerification("hardhat".to_string())
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn missing_api_key_is_a_missing_credential() {
        let registry = VerificationRegistry::new(vec![basescan(8453)]).unwrap();
        let credentials = CredentialResolver::new(MapSecretSource::new());
        assert_eq!(
            registry
                .resolve("base-mainnet", &networks(), &credentials)
                .unwrap_err(),
            ConfigError::MissingCredential("API_KEY_BASE_ONLINE".to_string())
        );
    }

    #[test]
    fn duplicate_entries_are_rejected() {
        assert!(VerificationRegistry::new(vec![basescan(8453), basescan(8453)]).is_err());
    }
}
