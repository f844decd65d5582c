use crate::error::ConfigError;
use core_types::Target;
use rust_decimal::Decimal;
use std::path::Path;

/// Loads a market's target portfolio from its JSON file.
///
/// Called once per run-cycle so that edits to the file take effect without a
/// restart. A missing or unreadable file is an error the caller turns into an
/// explicit alert; individual weight bounds are validated here, while the
/// weight *sum* is only warned about by the rebalancer.
pub fn load_targets(path: &Path) -> Result<Vec<Target>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::TargetsIo {
        path: path.display().to_string(),
        source,
    })?;

    let targets: Vec<Target> =
        serde_json::from_str(&raw).map_err(|source| ConfigError::TargetsParse {
            path: path.display().to_string(),
            source,
        })?;

    for t in &targets {
        if t.target_weight < Decimal::ZERO || t.target_weight > Decimal::ONE {
            return Err(ConfigError::Invalid(format!(
                "target weight for {} must be within [0, 1], got {}",
                t.symbol, t.target_weight
            )));
        }
    }

    tracing::debug!(path = %path.display(), count = targets.len(), "Loaded target list.");
    Ok(targets)
}
