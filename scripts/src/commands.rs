use tracing::{info, warn};

use crate::{
    cli::{ProfilesArgs, ResolveArgs},
    errors::ScriptError,
    output_writer::write_manifest,
    resolver::{ConfigResolver, NetworkResolution, Selection, VerificationResolution},
    secrets::SecretSource,
};

/// Resolve the selected networks and optionally write the manifest
pub fn resolve_networks<S: SecretSource>(
    args: ResolveArgs,
    resolver: &ConfigResolver<S>,
    selection: &Selection,
) -> Result<(), ScriptError> {
    let snapshot = resolver.resolve_config(selection)?;

    for (network_id, state) in snapshot.active() {
        if let NetworkResolution::Ready(network) = &state.network {
            info!(
                "{}: chain id {}, endpoint {}, {} account(s)",
                network_id,
                network.chain_id,
                network.redacted_url,
                network.accounts.len()
            );
        }
        match &state.verification {
            VerificationResolution::Ready(verification) => {
                info!("{}: verify on {}", network_id, verification.browser_url)
            }
            _ => warn!("{}: verification unsupported, skipping", network_id),
        }
    }
    info!(
        "Gas reporter: {}, contract sizer: {}",
        snapshot.toggles.gas_reporter.enabled, snapshot.toggles.contract_sizer.run_on_compile
    );

    if let Some(output) = args.output {
        write_manifest(&output, &snapshot)?;
        info!("Manifest written to {}", output.display());
    }

    Ok(())
}

/// Resolve networks leniently and report what is missing.
///
/// Without an explicit selection every declared network is reported.
pub fn check_networks<S: SecretSource>(
    resolver: &ConfigResolver<S>,
    selection: &Selection,
) -> Result<(), ScriptError> {
    let snapshot = resolver.resolve_config(&Selection::None)?;

    let checked: Vec<&str> = match selection {
        Selection::Networks(ids) => {
            for id in ids {
                resolver.declarations().networks.resolve_network(id)?;
            }
            ids.iter().map(String::as_str).collect()
        }
        Selection::Default | Selection::None => {
            snapshot.networks.keys().map(String::as_str).collect()
        }
    };

    for network_id in checked {
        let Some(state) = snapshot.networks.get(network_id) else {
            continue;
        };
        match &state.network {
            NetworkResolution::Ready(network) => {
                info!("{}: ready on chain {}", network_id, network.chain_id)
            }
            NetworkResolution::Unavailable(e) => warn!("{}: {}", network_id, e),
        }
        match &state.verification {
            VerificationResolution::Ready(_) => info!("{}: verification ready", network_id),
            VerificationResolution::Unsupported => {
                info!("{}: verification unsupported", network_id)
            }
            VerificationResolution::Unavailable(e) => {
                warn!("{}: verification unavailable, {}", network_id, e)
            }
        }
    }

    Ok(())
}

/// Log the compiler profiles a source is built with
pub fn print_profiles<S: SecretSource>(args: ProfilesArgs, resolver: &ConfigResolver<S>) {
    let profiles = resolver
        .declarations()
        .profiles
        .resolve_profiles_for_source(&args.source);

    for profile in profiles {
        info!(
            "{}: solc {} (optimizer {}, {} runs)",
            args.source.display(),
            profile.version,
            if profile.optimizer.enabled { "on" } else { "off" },
            profile.optimizer.runs
        );
    }
}
