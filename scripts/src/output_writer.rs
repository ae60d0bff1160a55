use std::{fs, fs::File, io::Read, path::Path};

use json::JsonValue;

use crate::{
    errors::ScriptError,
    resolver::{ConfigSnapshot, NetworkResolution, VerificationResolution},
};

/// Write the active networks of `snapshot` into the manifest at `file_path`.
///
/// Entries of other networks already in the file are kept. Only redacted endpoints
/// are written, never secret values.
pub fn write_manifest(file_path: &Path, snapshot: &ConfigSnapshot) -> Result<(), ScriptError> {
    // If the file doesn't exist, create it
    if !file_path.exists() {
        fs::write(file_path, "{}").map_err(|e| ScriptError::JsonOutputError(e.to_string()))?;
    }

    // Parse it's json content into objects
    let mut parsed_json = get_json_from_file(file_path)?;

    for (network_id, state) in snapshot.active() {
        // Active networks are always ready, an unavailable one aborts the resolution
        let NetworkResolution::Ready(network) = &state.network else {
            continue;
        };

        let mut entry = JsonValue::new_object();
        entry["chainId"] = network.chain_id.into();
        entry["endpoint"] = network.redacted_url.as_str().into();
        entry["accounts"] = network.accounts.len().into();
        entry["verification"] = match &state.verification {
            VerificationResolution::Ready(verification) => {
                let mut explorer = JsonValue::new_object();
                explorer["apiUrl"] = verification.api_url.as_str().into();
                explorer["browserUrl"] = verification.browser_url.as_str().into();
                explorer
            }
            _ => JsonValue::Null,
        };

        parsed_json[network_id] = entry;
    }

    // Write the updated json back to the file
    fs::write(file_path, json::stringify_pretty(parsed_json, 4))
        .map_err(|e| ScriptError::JsonOutputError(e.to_string()))?;

    Ok(())
}

/// Read the chain id recorded for `network_id` in the manifest
pub fn read_manifest_chain_id(file_path: &Path, network_id: &str) -> Result<u64, ScriptError> {
    if !file_path.exists() {
        return Err(ScriptError::JsonOutputError(String::from(
            "Manifest file not found",
        )));
    }

    let parsed_json = get_json_from_file(file_path)?;
    parsed_json[network_id]["chainId"].as_u64().ok_or_else(|| {
        ScriptError::JsonOutputError(format!("No chain id recorded for {network_id}"))
    })
}

/// Parses the JSON file at the given path
fn get_json_from_file(file_path: &Path) -> Result<JsonValue, ScriptError> {
    let mut file_contents = String::new();
    File::open(file_path)
        .map_err(|e| ScriptError::JsonOutputError(e.to_string()))?
        .read_to_string(&mut file_contents)
        .map_err(|e| ScriptError::JsonOutputError(e.to_string()))?;

    json::parse(&file_contents).map_err(|e| ScriptError::JsonOutputError(e.to_string()))
}
