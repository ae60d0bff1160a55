//! Network registry: connection parameters of every deployment target

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
};

use alloy::primitives::ChainId;
use tracing::debug;
use url::{form_urlencoded::byte_serialize, Url};

use crate::{
    constants::{CREDENTIAL_PLACEHOLDER, REDACTED},
    errors::ConfigError,
    secrets::{CredentialRef, CredentialResolver, Secret, SecretSource},
};

/// An endpoint URL with at most one credential placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate(String);

impl EndpointTemplate {
    /// Validate `template`: the placeholder must appear exactly once if the network
    /// declares a credential, never otherwise, and the result must be an http(s) URL.
    pub fn new(template: &str, expects_credential: bool) -> Result<Self, ConfigError> {
        let occurrences = template.matches(CREDENTIAL_PLACEHOLDER).count();
        let expected = usize::from(expects_credential);
        if occurrences != expected {
            return Err(ConfigError::InvalidDeclaration(format!(
                "endpoint {template:?} must contain {CREDENTIAL_PLACEHOLDER} {expected} time(s), found {occurrences}"
            )));
        }

        let template = EndpointTemplate(template.to_string());
        let probe = template.fill("credential");
        if !is_http_url(&probe) {
            return Err(ConfigError::InvalidDeclaration(format!(
                "endpoint {:?} is not an http(s) URL",
                template.0
            )));
        }
        Ok(template)
    }

    /// The raw template, placeholder included
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The endpoint with the credential masked, safe to print
    pub fn redacted(&self) -> String {
        self.fill(REDACTED)
    }

    fn fill(&self, value: &str) -> String {
        self.0.replacen(CREDENTIAL_PLACEHOLDER, value, 1)
    }
}

/// Whether `url` is a well-formed http or https URL with a host
fn is_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}

/// Static declaration of a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub id: String,
    pub chain_id: ChainId,
    pub endpoint: EndpointTemplate,
    /// Secret interpolated into the endpoint, if any
    pub credential_ref: Option<CredentialRef>,
    /// Deployer keys, in order
    pub accounts: Vec<CredentialRef>,
}

impl NetworkEntry {
    /// Validate and build an entry. A credential reference requires the placeholder.
    pub fn new(
        id: impl Into<String>,
        chain_id: ChainId,
        endpoint: &str,
        credential_ref: Option<CredentialRef>,
        accounts: Vec<CredentialRef>,
    ) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ConfigError::InvalidDeclaration(String::from(
                "network id must not be empty",
            )));
        }
        if chain_id == 0 {
            return Err(ConfigError::InvalidDeclaration(format!(
                "network {id}: chain id must be positive"
            )));
        }
        let endpoint =
            EndpointTemplate::new(endpoint, credential_ref.is_some()).map_err(|e| match e {
                ConfigError::InvalidDeclaration(s) => {
                    ConfigError::InvalidDeclaration(format!("network {id}: {s}"))
                }
                other => other,
            })?;

        Ok(NetworkEntry {
            id,
            chain_id,
            endpoint,
            credential_ref,
            accounts,
        })
    }
}

/// A network with its endpoint and accounts resolved
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedNetwork {
    pub id: String,
    pub chain_id: ChainId,
    /// Endpoint with the credential interpolated
    pub url: Url,
    /// Endpoint with the credential masked
    pub redacted_url: String,
    pub accounts: Vec<Secret>,
}

// The URL may embed a credential, only the masked form is printed
impl Debug for ResolvedNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedNetwork")
            .field("id", &self.id)
            .field("chain_id", &self.chain_id)
            .field("url", &self.redacted_url)
            .field("accounts", &self.accounts)
            .finish()
    }
}

/// Every declared network, keyed by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    entries: BTreeMap<String, NetworkEntry>,
}

impl NetworkRegistry {
    /// Build the registry, rejecting duplicated ids and chain ids
    pub fn new(entries: Vec<NetworkEntry>) -> Result<Self, ConfigError> {
        let mut by_id = BTreeMap::new();
        let mut chain_ids: BTreeMap<ChainId, String> = BTreeMap::new();

        for entry in entries {
            if let Some(other) = chain_ids.insert(entry.chain_id, entry.id.clone()) {
                return Err(ConfigError::InvalidDeclaration(format!(
                    "chain id {} declared by both {} and {}",
                    entry.chain_id, other, entry.id
                )));
            }
            if by_id.contains_key(&entry.id) {
                return Err(ConfigError::InvalidDeclaration(format!(
                    "network {} declared twice",
                    entry.id
                )));
            }
            by_id.insert(entry.id.clone(), entry);
        }

        Ok(NetworkRegistry { entries: by_id })
    }

    /// Look up a network by id
    pub fn resolve_network(&self, network_id: &str) -> Result<&NetworkEntry, ConfigError> {
        self.entries
            .get(network_id)
            .ok_or_else(|| ConfigError::UnknownNetwork(network_id.to_string()))
    }

    /// Chain id declared for `network_id`, if the network exists
    pub fn chain_id(&self, network_id: &str) -> Option<ChainId> {
        self.entries.get(network_id).map(|entry| entry.chain_id)
    }

    /// Networks in id order
    pub fn entries(&self) -> impl Iterator<Item = &NetworkEntry> {
        self.entries.values()
    }

    /// Whether `network_id` is declared
    pub fn contains(&self, network_id: &str) -> bool {
        self.entries.contains_key(network_id)
    }

    /// Build the full endpoint URL. An absent or empty credential is an error,
    /// never an empty URL segment. The credential is percent-encoded.
    pub fn resolve_endpoint<S: SecretSource>(
        &self,
        entry: &NetworkEntry,
        credentials: &CredentialResolver<S>,
    ) -> Result<Url, ConfigError> {
        let endpoint = match &entry.credential_ref {
            Some(reference) => {
                let secret = credentials.resolve_non_empty(reference)?;
                // Reserved characters of the secret must not leak into the URL structure
                let encoded: String = byte_serialize(secret.expose().as_bytes()).collect();
                entry.endpoint.fill(&encoded)
            }
            None => entry.endpoint.as_str().to_string(),
        };

        // Don't echo the parse input, it holds the credential
        Url::parse(&endpoint).map_err(|e| {
            ConfigError::InvalidDeclaration(format!(
                "network {}: endpoint {} does not form a valid URL: {}",
                entry.id,
                entry.endpoint.redacted(),
                e
            ))
        })
    }

    /// Resolve every deployer key of the network, in declared order
    pub fn resolve_accounts<S: SecretSource>(
        &self,
        entry: &NetworkEntry,
        credentials: &CredentialResolver<S>,
    ) -> Result<Vec<Secret>, ConfigError> {
        entry
            .accounts
            .iter()
            .map(|reference| credentials.resolve_non_empty(reference))
            .collect()
    }

    /// Resolve endpoint and accounts of `network_id`
    pub fn resolve<S: SecretSource>(
        &self,
        network_id: &str,
        credentials: &CredentialResolver<S>,
    ) -> Result<ResolvedNetwork, ConfigError> {
        let entry = self.resolve_network(network_id)?;
        let url = self.resolve_endpoint(entry, credentials)?;
        let accounts = self.resolve_accounts(entry, credentials)?;
        debug!(
            "Resolved network {} (chain id {}) at {}",
            entry.id,
            entry.chain_id,
            entry.endpoint.redacted()
        );

        Ok(ResolvedNetwork {
            id: entry.id.clone(),
            chain_id: entry.chain_id,
            url,
            redacted_url: entry.endpoint.redacted(),
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MapSecretSource;

    fn arbitrum() -> NetworkEntry {
        NetworkEntry::new(
            "arbitrum",
            42161,
            "https://arb-mainnet.g.alchemy.com/v2/{credential}",
            Some("ALCHEMY_ARB_ONLINE".into()),
            vec!["PRIVATE_KEY".into()],
        )
        .unwrap()
    }

    fn mainnet() -> NetworkEntry {
        NetworkEntry::new(
            "mainnet",
            1,
            "https://ethereum.publicnode.com",
            None,
            vec!["PRIVATE_KEY".into()],
        )
        .unwrap()
    }

    fn registry() -> NetworkRegistry {
        NetworkRegistry::new(vec![arbitrum(), mainnet()]).unwrap()
    }

    #[test]
    fn resolve_network_returns_entry_with_same_id() {
        let registry = registry();
        for entry in registry.entries() {
            assert_eq!(registry.resolve_network(&entry.id).unwrap().id, entry.id);
        }
    }

    #[test]
    fn unknown_network_is_reported_by_id() {
        assert_eq!(
            registry().resolve_network("unknown-chain").unwrap_err(),
            ConfigError::UnknownNetwork("unknown-chain".to_string())
        );
    }

    #[test]
    fn endpoint_interpolates_credential() {
        let registry = registry();
        let credentials =
            CredentialResolver::new(MapSecretSource::new().with("ALCHEMY_ARB_ONLINE", "key123"));
        let url = registry
            .resolve_endpoint(registry.resolve_network("arbitrum").unwrap(), &credentials)
            .unwrap();
        assert_eq!(url.as_str(), "https://arb-mainnet.g.alchemy.com/v2/key123");
    }

    #[test]
    fn credential_cannot_alter_url_structure() {
        let registry = registry();
        let credentials = CredentialResolver::new(
            MapSecretSource::new().with("ALCHEMY_ARB_ONLINE", "abc#def/../x?y"),
        );
        let url = registry
            .resolve_endpoint(registry.resolve_network("arbitrum").unwrap(), &credentials)
            .unwrap();
        assert_eq!(url.host_str(), Some("arb-mainnet.g.alchemy.com"));
        assert_eq!(url.path(), "/v2/abc%23def%2F..%2Fx%3Fy");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn empty_or_absent_endpoint_credential_fails() {
        let registry = registry();
        let entry = registry.resolve_network("arbitrum").unwrap();

        let absent = CredentialResolver::new(MapSecretSource::new());
        assert_eq!(
            registry.resolve_endpoint(entry, &absent).unwrap_err(),
            ConfigError::MissingCredential("ALCHEMY_ARB_ONLINE".to_string())
        );

        let empty = CredentialResolver::new(MapSecretSource::new().with("ALCHEMY_ARB_ONLINE", ""));
        assert_eq!(
            registry.resolve_endpoint(entry, &empty).unwrap_err(),
            ConfigError::MissingCredential("ALCHEMY_ARB_ONLINE".to_string())
        );
    }

    #[test]
    fn resolve_collects_accounts_and_masks_debug_output() {
        let registry = registry();
        let credentials = CredentialResolver::new(
            MapSecretSource::new()
                .with("ALCHEMY_ARB_ONLINE", "key123")
                .with("PRIVATE_KEY", "0xabc"),
        );
        let resolved = registry.resolve("arbitrum", &credentials).unwrap();
        assert_eq!(resolved.chain_id, 42161);
        assert_eq!(resolved.accounts, vec![Secret::new("0xabc")]);
        assert_eq!(
            resolved.redacted_url,
            "https://arb-mainnet.g.alchemy.com/v2/***"
        );

        let printed = format!("{:?}", resolved);
        assert!(!printed.contains("key123"));
        assert!(!printed.contains("0xabc"));
    }

    #[test]
    fn missing_account_key_fails() {
        let registry = registry();
        let credentials = CredentialResolver::new(MapSecretSource::new());
        assert_eq!(
            registry.resolve("mainnet", &credentials).unwrap_err(),
            ConfigError::MissingCredential("PRIVATE_KEY".to_string())
        );
    }

    #[test]
    fn placeholder_must_match_credential_declaration() {
        assert!(EndpointTemplate::new("https://rpc.example/{credential}", true).is_ok());
        assert!(EndpointTemplate::new("https://rpc.example/", true).is_err());
        assert!(EndpointTemplate::new("https://rpc.example/{credential}", false).is_err());
        assert!(
            EndpointTemplate::new("https://rpc.example/{credential}/{credential}", true).is_err()
        );
    }

    #[test]
    fn endpoint_must_be_http() {
        assert!(EndpointTemplate::new("ftp://rpc.example", false).is_err());
        assert!(EndpointTemplate::new("not a url", false).is_err());
        assert!(EndpointTemplate::new("http://127.0.0.1:8545", false).is_ok());
    }

    #[test]
    fn duplicate_chain_ids_are_rejected() {
        let clash = NetworkEntry::new("mainnet-alias", 1, "https://rpc.example", None, vec![])
            .unwrap();
        assert!(matches!(
            NetworkRegistry::new(vec![mainnet(), clash]),
            Err(ConfigError::InvalidDeclaration(_))
        ));
    }

    #[test]
    fn zero_chain_id_is_rejected() {
        assert!(NetworkEntry::new("zero", 0, "https://rpc.example", None, vec![]).is_err());
    }
}
