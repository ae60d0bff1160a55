//! Static declarations of the pipeline: compilers, networks, explorers and toggles.
//!
//! Declarations come either from the builtin tables below or from a JSON file.

use std::{fs, path::Path};

use alloy::primitives::ChainId;
use json::JsonValue;

use crate::{
    constants::{
        DEFAULT_NETWORK, DEFAULT_OPTIMIZER_RUNS, DEPLOYER_KEY_REF, LOCAL_CHAIN_ID, LOCAL_RPC,
    },
    errors::{ConfigError, ScriptError},
    networks::{NetworkEntry, NetworkRegistry},
    profiles::{CompilerProfile, ProfileSelector, ProfileTable},
    secrets::CredentialRef,
    toggles::ToggleBindings,
    verification::{VerificationEntry, VerificationRegistry},
};

/// Builtin compiler versions, the last one is the default
const BUILTIN_COMPILERS: &[&str] = &["0.8.19", "0.8.20"];

/// Builtin networks: id, chain id, endpoint, endpoint credential
const BUILTIN_NETWORKS: &[(&str, ChainId, &str, Option<&str>)] = &[
    ("linea_goerli", 59140, "https://rpc.goerli.linea.build/", None),
    ("linea_mainnet", 59144, "https://rpc.linea.build/", None),
    ("goerli", 5, "https://ethereum-goerli.publicnode.com", None),
    ("mainnet", 1, "https://ethereum.publicnode.com", None),
    (
        "arbitrum",
        42161,
        "https://arb-mainnet.g.alchemy.com/v2/{credential}",
        Some("ALCHEMY_ARB_ONLINE"),
    ),
    (
        "arbitrumGoerli",
        421613,
        "https://arb-goerli.g.alchemy.com/v2/{credential}",
        Some("ALCHEMY_ARB_GOERLI"),
    ),
    ("base-mainnet", 8453, "https://mainnet.base.org", None),
    ("base-goerli", 84531, "https://goerli.base.org", None),
];

/// Builtin explorers: network id, chain id, api url, browser url, api key
const BUILTIN_EXPLORERS: &[(&str, ChainId, &str, &str, &str)] = &[
    (
        "mainnet",
        1,
        "https://api.etherscan.io/api",
        "https://etherscan.io",
        "API_KEY_ETH_ONLINE",
    ),
    (
        "goerli",
        5,
        "https://api-goerli.etherscan.io/api",
        "https://goerli.etherscan.io",
        "API_KEY_ETH_GOERLI",
    ),
    (
        "arbitrum",
        42161,
        "https://api.arbiscan.io/api",
        "https://arbiscan.io/",
        "API_KEY_ARB_ONLINE",
    ),
    (
        "arbitrumGoerli",
        421613,
        "https://api-goerli.arbiscan.io/api",
        "https://goerli.arbiscan.io/",
        "API_KEY_ARB_GOERLI",
    ),
    (
        "base-mainnet",
        8453,
        "https://api.basescan.org/api",
        "https://basescan.org",
        "API_KEY_BASE_ONLINE",
    ),
    (
        "base-goerli",
        84531,
        "https://api-goerli.basescan.org/api",
        "https://goerli.basescan.org",
        "API_KEY_BASE_ONLINE",
    ),
    (
        "linea_mainnet",
        59144,
        "https://api.lineascan.build/api",
        "https://lineascan.build/",
        "API_KEY_LINEA_ONLINE",
    ),
    (
        "linea_goerli",
        59140,
        "https://api-testnet.lineascan.build/api",
        "https://goerli.lineascan.build/address",
        "API_KEY_LINEA_GOERLI",
    ),
];

/// Everything declared for the pipeline, validated but not yet resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarations {
    pub default_network: String,
    pub profiles: ProfileTable,
    pub networks: NetworkRegistry,
    pub verification: VerificationRegistry,
    pub toggles: ToggleBindings,
}

impl Declarations {
    /// Check the parts agree with each other
    pub fn new(
        default_network: String,
        profiles: ProfileTable,
        networks: NetworkRegistry,
        verification: VerificationRegistry,
        toggles: ToggleBindings,
    ) -> Result<Self, ConfigError> {
        if !networks.contains(&default_network) {
            return Err(ConfigError::InvalidDeclaration(format!(
                "default network {default_network} is not declared"
            )));
        }
        Ok(Declarations {
            default_network,
            profiles,
            networks,
            verification,
            toggles,
        })
    }

    /// The builtin pipeline tables
    pub fn builtin() -> Result<Self, ConfigError> {
        let profiles = BUILTIN_COMPILERS
            .iter()
            .map(|version| CompilerProfile::new(version.parse()?, true, DEFAULT_OPTIMIZER_RUNS))
            .collect::<Result<Vec<_>, _>>()?;

        let mut networks = vec![NetworkEntry::new(
            DEFAULT_NETWORK,
            LOCAL_CHAIN_ID,
            LOCAL_RPC,
            None,
            vec![],
        )?];
        for (id, chain_id, endpoint, credential) in BUILTIN_NETWORKS {
            networks.push(NetworkEntry::new(
                *id,
                *chain_id,
                endpoint,
                credential.map(CredentialRef::new),
                vec![CredentialRef::new(DEPLOYER_KEY_REF)],
            )?);
        }

        let explorers = BUILTIN_EXPLORERS
            .iter()
            .map(
                |(network_id, chain_id, api_url, browser_url, api_key)| VerificationEntry {
                    network_id: network_id.to_string(),
                    chain_id: *chain_id,
                    api_url: api_url.to_string(),
                    browser_url: browser_url.to_string(),
                    api_key_ref: CredentialRef::new(*api_key),
                },
            )
            .collect();

        Declarations::new(
            DEFAULT_NETWORK.to_string(),
            ProfileTable::new(profiles, vec![])?,
            NetworkRegistry::new(networks)?,
            VerificationRegistry::new(explorers)?,
            ToggleBindings::default(),
        )
    }

    /// Parse declarations from a JSON document
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed = json::parse(raw)
            .map_err(|e| ConfigError::InvalidDeclaration(format!("malformed json: {e}")))?;

        let default_network = match &parsed["defaultNetwork"] {
            JsonValue::Null => DEFAULT_NETWORK.to_string(),
            value => as_str(value, "defaultNetwork")?.to_string(),
        };

        Declarations::new(
            default_network,
            parse_profiles(&parsed)?,
            parse_networks(&parsed["networks"])?,
            parse_verification(&parsed["verification"])?,
            parse_toggles(&parsed["toggles"])?,
        )
    }

    /// Read and parse a JSON declarations file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ScriptError::DeclarationFile(format!("{}: {}", path.display(), e)))?;
        Ok(Declarations::from_json_str(&raw)?)
    }
}

/// Parse `compilers` and `overrides`
fn parse_profiles(parsed: &JsonValue) -> Result<ProfileTable, ConfigError> {
    let compilers = &parsed["compilers"];
    if compilers.is_null() {
        return Err(missing("compilers"));
    }

    let profiles = optional_array(compilers, "compilers")?
        .members()
        .map(|compiler| {
            let version = as_str(&compiler["version"], "compilers[].version")?;
            let optimizer = optional_object(&compiler["optimizer"], "compilers[].optimizer")?;
            let enabled = match &optimizer["enabled"] {
                JsonValue::Null => false,
                enabled => enabled
                    .as_bool()
                    .ok_or_else(|| invalid("compilers[].optimizer.enabled"))?,
            };
            let runs = match &optimizer["runs"] {
                JsonValue::Null => DEFAULT_OPTIMIZER_RUNS,
                runs => runs
                    .as_u32()
                    .ok_or_else(|| invalid("compilers[].optimizer.runs"))?,
            };
            CompilerProfile::new(version.parse()?, enabled, runs)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let selectors = optional_array(&parsed["overrides"], "overrides")?
        .members()
        .map(|selector| {
            ProfileSelector::new(
                as_str(&selector["source"], "overrides[].source")?,
                as_str(&selector["versions"], "overrides[].versions")?,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    ProfileTable::new(profiles, selectors)
}

/// Parse the `networks` object
fn parse_networks(networks: &JsonValue) -> Result<NetworkRegistry, ConfigError> {
    if networks.is_null() {
        return Err(missing("networks"));
    }

    let entries = optional_object(networks, "networks")?
        .entries()
        .map(|(id, network)| {
            let credential = match &network["credential"] {
                JsonValue::Null => None,
                value => Some(CredentialRef::new(as_str(value, "networks.credential")?)),
            };
            let accounts = optional_array(&network["accounts"], "networks.accounts")?
                .members()
                .map(|account| as_str(account, "networks.accounts[]").map(CredentialRef::new))
                .collect::<Result<Vec<_>, _>>()?;

            NetworkEntry::new(
                id,
                as_u64(&network["chainId"], "networks.chainId")?,
                as_str(&network["url"], "networks.url")?,
                credential,
                accounts,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    NetworkRegistry::new(entries)
}

/// Parse the optional `verification` object
fn parse_verification(verification: &JsonValue) -> Result<VerificationRegistry, ConfigError> {
    let entries = optional_object(verification, "verification")?
        .entries()
        .map(|(network_id, explorer)| {
            Ok(VerificationEntry {
                network_id: network_id.to_string(),
                chain_id: as_u64(&explorer["chainId"], "verification.chainId")?,
                api_url: as_str(&explorer["apiUrl"], "verification.apiUrl")?.to_string(),
                browser_url: as_str(&explorer["browserUrl"], "verification.browserUrl")?
                    .to_string(),
                api_key_ref: CredentialRef::new(as_str(
                    &explorer["apiKey"],
                    "verification.apiKey",
                )?),
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    VerificationRegistry::new(entries)
}

/// Parse the optional `toggles` object, unset bindings keep their default
fn parse_toggles(toggles: &JsonValue) -> Result<ToggleBindings, ConfigError> {
    let toggles = optional_object(toggles, "toggles")?;
    let mut bindings = ToggleBindings::default();
    for (name, binding) in [
        ("gasReporter", &mut bindings.gas_reporter),
        ("contractSizer", &mut bindings.contract_sizer),
        ("gasPrice", &mut bindings.gas_price),
    ] {
        if !toggles[name].is_null() {
            *binding = as_str(&toggles[name], name)?.to_string();
        }
    }
    Ok(bindings)
}

/// `value` if it is absent or an array. `members()` of anything else is silently empty.
fn optional_array<'a>(value: &'a JsonValue, field: &str) -> Result<&'a JsonValue, ConfigError> {
    if value.is_null() || value.is_array() {
        Ok(value)
    } else {
        Err(invalid(field))
    }
}

/// `value` if it is absent or an object. `entries()` of anything else is silently empty.
fn optional_object<'a>(value: &'a JsonValue, field: &str) -> Result<&'a JsonValue, ConfigError> {
    if value.is_null() || value.is_object() {
        Ok(value)
    } else {
        Err(invalid(field))
    }
}

fn as_str<'a>(value: &'a JsonValue, field: &str) -> Result<&'a str, ConfigError> {
    match value {
        JsonValue::Null => Err(missing(field)),
        value => value.as_str().ok_or_else(|| invalid(field)),
    }
}

fn as_u64(value: &JsonValue, field: &str) -> Result<u64, ConfigError> {
    match value {
        JsonValue::Null => Err(missing(field)),
        value => value.as_u64().ok_or_else(|| invalid(field)),
    }
}

fn missing(field: &str) -> ConfigError {
    ConfigError::InvalidDeclaration(format!("missing field {field}"))
}

fn invalid(field: &str) -> ConfigError {
    ConfigError::InvalidDeclaration(format!("invalid value for {field}"))
}
