use csm_store::ParamMap;

use crate::error::{ServiceError, ServiceResult};

/// Domain tag for driver parameter keys.
pub const PARAMS_DOMAIN: &str = "csm-driver-params-v1";

/// Stable cache key of a parameter set.
///
/// BLAKE3 over `PARAMS_DOMAIN ":" <json>`, hex-encoded. [`ParamMap`] is a
/// sorted map, so equal parameter sets always produce the same key.
pub fn params_key(params: &ParamMap) -> ServiceResult<String> {
    let data = serde_json::to_vec(params)
        .map_err(|e| ServiceError::Configuration(format!("can not serialize params: {e}")))?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(PARAMS_DOMAIN.as_bytes());
    hasher.update(b":");
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize().as_bytes()))
}
