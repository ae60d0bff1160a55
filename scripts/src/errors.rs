//! Definitions of errors that can occur while resolving the deployment configuration

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy::primitives::ChainId;

/// Errors raised while resolving networks, credentials and verification targets.
///
/// Every variant carries the identifier that failed (network id or credential
/// reference name), never a secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested network has no registry entry
    UnknownNetwork(String),
    /// The referenced secret is undefined (or empty where a value is required)
    MissingCredential(String),
    /// The network and verification registries disagree about a network
    ConfigInconsistency {
        /// The network id both registries refer to
        network: String,
        /// Chain id recorded in the network registry, if the network is declared at all
        network_chain_id: Option<ChainId>,
        /// Chain id recorded in the verification registry
        verification_chain_id: ChainId,
    },
    /// No explorer entry exists for the network, verification will be skipped
    UnsupportedNetworkForVerification(String),
    /// The static declarations are malformed
    InvalidDeclaration(String),
}

impl ConfigError {
    /// Whether the build/deploy driver may carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfigError::UnsupportedNetworkForVerification(_))
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownNetwork(id) => write!(f, "unknown network: {}", id),
            ConfigError::MissingCredential(reference) => {
                write!(f, "missing credential: {}", reference)
            }
            ConfigError::ConfigInconsistency {
                network,
                network_chain_id: Some(network_chain_id),
                verification_chain_id,
            } => write!(
                f,
                "config inconsistency for network {}: registry chain id {} but verification chain id {}",
                network, network_chain_id, verification_chain_id
            ),
            ConfigError::ConfigInconsistency {
                network,
                network_chain_id: None,
                verification_chain_id,
            } => write!(
                f,
                "config inconsistency: verification entry {} (chain id {}) has no matching network",
                network, verification_chain_id
            ),
            ConfigError::UnsupportedNetworkForVerification(id) => {
                write!(f, "verification is not supported on network: {}", id)
            }
            ConfigError::InvalidDeclaration(s) => write!(f, "invalid declaration: {}", s),
        }
    }
}

impl Error for ConfigError {}

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error resolving the configuration
    Config(ConfigError),
    /// Error reading the declarations file
    DeclarationFile(String),
    /// Error when building output file
    JsonOutputError(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::Config(e) => write!(f, "error resolving config: {}", e),
            ScriptError::DeclarationFile(s) => {
                write!(f, "error reading declarations file: {}", s)
            }
            ScriptError::JsonOutputError(s) => write!(f, "error writing json output: {}", s),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for ScriptError {
    fn from(e: ConfigError) -> Self {
        ScriptError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_names_the_reference_only() {
        let err = ConfigError::MissingCredential("PRIVATE_KEY".to_string());
        assert_eq!(err.to_string(), "missing credential: PRIVATE_KEY");
    }

    #[test]
    fn only_unsupported_verification_is_recoverable() {
        assert!(ConfigError::UnsupportedNetworkForVerification("hardhat".into()).is_recoverable());
        assert!(!ConfigError::UnknownNetwork("x".into()).is_recoverable());
        assert!(!ConfigError::MissingCredential("x".into()).is_recoverable());
        assert!(!ConfigError::ConfigInconsistency {
            network: "base-mainnet".into(),
            network_chain_id: Some(8453),
            verification_chain_id: 1,
        }
        .is_recoverable());
    }

    #[test]
    fn inconsistency_message_carries_both_chain_ids() {
        let err = ConfigError::ConfigInconsistency {
            network: "base-mainnet".into(),
            network_chain_id: Some(8453),
            verification_chain_id: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("base-mainnet"));
        assert!(msg.contains("8453"));
        assert!(msg.contains(" 1"));
    }
}
