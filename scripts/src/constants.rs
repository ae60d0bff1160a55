//! Constants used in the deploy scripts

/// Token substituted with the network credential inside an endpoint template
pub const CREDENTIAL_PLACEHOLDER: &str = "{credential}";

/// Replacement for secrets in anything printed or written to disk
pub const REDACTED: &str = "***";

/// Network used when the invocation doesn't select one
pub const DEFAULT_NETWORK: &str = "hardhat";

/// Chain id of the local development network
pub const LOCAL_CHAIN_ID: u64 = 31337;

/// Endpoint of the local development network
pub const LOCAL_RPC: &str = "http://127.0.0.1:8545";

/// Secret holding the deployer private key
pub const DEPLOYER_KEY_REF: &str = "PRIVATE_KEY";

/// Environment flag driving both the gas reporter and the contract sizer
pub const REPORT_SIZE_FLAG: &str = "REPORT_SIZE";

/// Environment value overriding the gas reporter gas price
pub const GAS_PRICE_FLAG: &str = "GAS_PRICE";

/// The only value a boolean toggle accepts as enabled
pub const TOGGLE_ENABLED: &str = "true";

/// Gas reporter currency
pub const DEFAULT_GAS_CURRENCY: &str = "USD";

/// Gas reporter gas price, in gwei
pub const DEFAULT_GAS_PRICE: u64 = 21;

/// Default optimizer runs for the builtin compiler profiles
pub const DEFAULT_OPTIMIZER_RUNS: u32 = 200;
