use std::{env, str::FromStr};

/// Interprets the usual spellings of on/off. Anything unrecognised, or a missing value, yields `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Reads `name` from the environment and parses it. Returns `Ok(None)` when the variable is unset or blank, and the
/// raw string when it is set but cannot be parsed, so that callers can log what was wrong with it.
pub fn parse_env_value<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(s) if s.trim().is_empty() => Ok(None),
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|_| s),
        Err(_) => Ok(None),
    }
}
