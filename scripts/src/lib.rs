//! Resolution of the multi-network build & deployment configuration of the contracts.

pub mod cli;
pub mod commands;
pub mod constants;
pub mod declarations;
pub mod errors;
pub mod networks;
pub mod profiles;
pub mod resolver;
pub mod secrets;
pub mod toggles;
pub mod verification;

// Our output utils
pub mod output_writer;
