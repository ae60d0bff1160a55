//! Composes the registries into one immutable snapshot handed to the build/deploy driver

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::{
    declarations::Declarations,
    errors::ConfigError,
    networks::ResolvedNetwork,
    profiles::{CompilerProfile, ProfileTable},
    secrets::{CredentialResolver, SecretSource},
    toggles::{FeatureToggles, ResolvedToggles},
    verification::ResolvedVerification,
};

/// Networks selected for the current invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Only the declared default network
    Default,
    /// The given networks, in order
    Networks(Vec<String>),
    /// Nothing is active, every network is resolved leniently
    None,
}

/// Outcome of resolving a network's connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkResolution {
    Ready(ResolvedNetwork),
    /// Only possible for networks that aren't active
    Unavailable(ConfigError),
}

/// Outcome of resolving a network's explorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResolution {
    Ready(ResolvedVerification),
    /// No explorer is declared, the verify step is skipped
    Unsupported,
    /// Only possible for networks that aren't active
    Unavailable(ConfigError),
}

/// Resolution state of one declared network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSnapshot {
    pub active: bool,
    pub network: NetworkResolution,
    pub verification: VerificationResolution,
}

/// The fully resolved configuration of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub default_network: String,
    /// Active network ids, in selection order
    pub active_networks: Vec<String>,
    pub profiles: ProfileTable,
    /// Every declared network, keyed by id
    pub networks: BTreeMap<String, NetworkSnapshot>,
    pub toggles: ResolvedToggles,
}

impl ConfigSnapshot {
    /// Resolved connection parameters of `network_id`, if available
    pub fn network(&self, network_id: &str) -> Option<&ResolvedNetwork> {
        match &self.networks.get(network_id)?.network {
            NetworkResolution::Ready(network) => Some(network),
            NetworkResolution::Unavailable(_) => None,
        }
    }

    /// Resolved explorer parameters of `network_id`, if available
    pub fn verification(&self, network_id: &str) -> Option<&ResolvedVerification> {
        match &self.networks.get(network_id)?.verification {
            VerificationResolution::Ready(verification) => Some(verification),
            _ => None,
        }
    }

    /// Active networks with their resolution, in selection order
    pub fn active(&self) -> impl Iterator<Item = (&str, &NetworkSnapshot)> {
        self.active_networks
            .iter()
            .filter_map(|id| self.networks.get(id).map(|s| (id.as_str(), s)))
    }

    /// Profiles `source` is compiled under
    pub fn resolve_profiles_for_source(
        &self,
        source: impl AsRef<std::path::Path>,
    ) -> Vec<CompilerProfile> {
        self.profiles.resolve_profiles_for_source(source)
    }
}

/// Resolves the declarations against a secret source
pub struct ConfigResolver<S> {
    declarations: Declarations,
    credentials: CredentialResolver<S>,
}

impl<S: SecretSource> ConfigResolver<S> {
    /// Resolver of `declarations` reading secrets from `source`
    pub fn new(declarations: Declarations, source: S) -> Self {
        ConfigResolver {
            declarations,
            credentials: CredentialResolver::new(source),
        }
    }

    /// The declarations being resolved
    pub fn declarations(&self) -> &Declarations {
        &self.declarations
    }

    /// Resolve everything, or nothing.
    ///
    /// Aborts on an unknown selected network, a registry inconsistency, or a missing
    /// credential of an active network. Failures of other networks are recorded in
    /// the snapshot.
    pub fn resolve_config(&self, selection: &Selection) -> Result<ConfigSnapshot, ConfigError> {
        let declarations = &self.declarations;
        let active_networks = self.active_networks(selection)?;

        declarations
            .verification
            .check_consistency(&declarations.networks)?;

        let mut networks = BTreeMap::new();
        for entry in declarations.networks.entries() {
            let active = active_networks.contains(&entry.id);
            let network = match declarations.networks.resolve(&entry.id, &self.credentials) {
                Ok(resolved) => NetworkResolution::Ready(resolved),
                Err(e) if active => return Err(e),
                Err(e) => NetworkResolution::Unavailable(e),
            };
            let verification = self.resolve_verification(&entry.id, active)?;

            networks.insert(
                entry.id.clone(),
                NetworkSnapshot {
                    active,
                    network,
                    verification,
                },
            );
        }

        let toggles =
            FeatureToggles::new(self.credentials.source()).resolve_all(&declarations.toggles);

        info!(
            "Resolved configuration: {} network(s), {} active, gas reporter {}",
            networks.len(),
            active_networks.len(),
            toggles.gas_reporter.enabled
        );

        Ok(ConfigSnapshot {
            default_network: declarations.default_network.clone(),
            active_networks,
            profiles: declarations.profiles.clone(),
            networks,
            toggles,
        })
    }

    /// Turn the selection into network ids, rejecting unknown ones
    fn active_networks(&self, selection: &Selection) -> Result<Vec<String>, ConfigError> {
        let requested = match selection {
            Selection::Default => vec![self.declarations.default_network.clone()],
            Selection::Networks(ids) => ids.clone(),
            Selection::None => vec![],
        };

        let mut active: Vec<String> = Vec::with_capacity(requested.len());
        for id in requested {
            self.declarations.networks.resolve_network(&id)?;
            if !active.contains(&id) {
                active.push(id);
            }
        }
        Ok(active)
    }

    fn resolve_verification(
        &self,
        network_id: &str,
        active: bool,
    ) -> Result<VerificationResolution, ConfigError> {
        let declarations = &self.declarations;
        match declarations
            .verification
            .resolve(network_id, &declarations.networks, &self.credentials)
        {
            Ok(resolved) => Ok(VerificationResolution::Ready(resolved)),
            Err(ConfigError::UnsupportedNetworkForVerification(_)) => {
                if active {
                    warn!(
                        "No explorer declared for {}, verification will be skipped",
                        network_id
                    );
                }
                Ok(VerificationResolution::Unsupported)
            }
            Err(e) if active => Err(e),
            Err(e) => Ok(VerificationResolution::Unavailable(e)),
        }
    }
}
