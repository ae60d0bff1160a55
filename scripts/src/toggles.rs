//! Operational switches read from environment flags

use tracing::{debug, warn};

use crate::{
    constants::{
        DEFAULT_GAS_CURRENCY, DEFAULT_GAS_PRICE, GAS_PRICE_FLAG, REPORT_SIZE_FLAG, TOGGLE_ENABLED,
    },
    secrets::SecretSource,
};

/// Value a toggle resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleValue {
    Bool(bool),
    Number(u64),
}

/// A resolved toggle and the environment key it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureToggle {
    pub name: String,
    pub resolved_value: ToggleValue,
    pub source: String,
}

/// Environment keys driving each toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleBindings {
    pub gas_reporter: String,
    pub contract_sizer: String,
    pub gas_price: String,
}

impl Default for ToggleBindings {
    fn default() -> Self {
        ToggleBindings {
            gas_reporter: REPORT_SIZE_FLAG.to_string(),
            contract_sizer: REPORT_SIZE_FLAG.to_string(),
            gas_price: GAS_PRICE_FLAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasReporterSettings {
    pub enabled: bool,
    pub currency: String,
    /// In gwei
    pub gas_price: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractSizerSettings {
    pub run_on_compile: bool,
}

/// Every toggle of an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToggles {
    pub gas_reporter: GasReporterSettings,
    pub contract_sizer: ContractSizerSettings,
    /// Raw toggles in resolution order
    pub toggles: Vec<FeatureToggle>,
}

/// Reads switches from an environment source. Never fails.
pub struct FeatureToggles<S> {
    source: S,
}

impl<S: SecretSource> FeatureToggles<S> {
    /// Toggles read from `source`
    pub fn new(source: S) -> Self {
        FeatureToggles { source }
    }

    /// `true` only when the value is exactly `"true"`; anything else, absence
    /// included, is `false`
    pub fn resolve_toggle(&self, name: &str) -> bool {
        self.source.lookup(name).as_deref() == Some(TOGGLE_ENABLED)
    }

    /// Parse a numeric switch, keeping `default` when it is absent or malformed
    pub fn resolve_numeric(&self, name: &str, default: u64) -> u64 {
        match self.source.lookup(name) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring non numeric value of {}, using {}", name, default);
                default
            }),
        }
    }

    /// Resolve the gas reporter and contract sizer switches
    pub fn resolve_all(&self, bindings: &ToggleBindings) -> ResolvedToggles {
        let gas_enabled = self.resolve_toggle(&bindings.gas_reporter);
        let sizer_enabled = self.resolve_toggle(&bindings.contract_sizer);
        let gas_price = self.resolve_numeric(&bindings.gas_price, DEFAULT_GAS_PRICE);
        debug!(
            "Toggles: gas reporter {}, contract sizer {}, gas price {}",
            gas_enabled, sizer_enabled, gas_price
        );

        ResolvedToggles {
            gas_reporter: GasReporterSettings {
                enabled: gas_enabled,
                currency: DEFAULT_GAS_CURRENCY.to_string(),
                gas_price,
            },
            contract_sizer: ContractSizerSettings {
                run_on_compile: sizer_enabled,
            },
            toggles: vec![
                FeatureToggle {
                    name: String::from("gasReporter"),
                    resolved_value: ToggleValue::Bool(gas_enabled),
                    source: bindings.gas_reporter.clone(),
                },
                FeatureToggle {
                    name: String::from("contractSizer"),
                    resolved_value: ToggleValue::Bool(sizer_enabled),
                    source: bindings.contract_sizer.clone(),
                },
                FeatureToggle {
                    name: String::from("gasPrice"),
                    resolved_value: ToggleValue::Number(gas_price),
                    source: bindings.gas_price.clone(),
                },
            ],
        }
    }
}
