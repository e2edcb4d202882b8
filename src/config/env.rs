//! Environment overrides.
//!
//! Canonical `DESKPILOT_*` variables take precedence. The variable names the
//! Anthropic tooling uses (`ANTHROPIC_API_KEY`, `MODEL_NAME`,
//! `MAX_OUTPUT_TOKENS`) are accepted as fallbacks.

use crate::error::ConfigError;

use super::Config;

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(key) = env_with_fallback(env_lookup, "DESKPILOT_API_KEY", "ANTHROPIC_API_KEY") {
        config.api.api_key = key;
    }
    if let Some(model) = env_with_fallback(env_lookup, "DESKPILOT_MODEL", "MODEL_NAME") {
        config.api.model = model;
    }
    if let Some(url) = non_empty(env_lookup("DESKPILOT_BASE_URL")) {
        config.api.base_url = url;
    }
    if let Some(raw) = env_with_fallback(env_lookup, "DESKPILOT_MAX_TOKENS", "MAX_OUTPUT_TOKENS") {
        let parsed = raw.parse::<u32>().ok().filter(|v| *v > 0).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid DESKPILOT_MAX_TOKENS value `{raw}`: expected a positive integer"
            ))
        })?;
        config.api.max_tokens = parsed;
    }
    if let Some(raw) = non_empty(env_lookup("DESKPILOT_API_TIMEOUT_SECS")) {
        let parsed = raw.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid DESKPILOT_API_TIMEOUT_SECS value `{raw}`: expected positive integer seconds"
            ))
        })?;
        // Zero would mean no timeout at all.
        config.api.timeout_secs = parsed.max(1);
    }
    Ok(())
}

/// Resolve a value from the canonical env var or, if absent, its fallback.
pub(super) fn env_with_fallback<FEnv>(
    env_lookup: &FEnv,
    canonical: &str,
    fallback: &str,
) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    non_empty(env_lookup(canonical)).or_else(|| non_empty(env_lookup(fallback)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
