// src/runtime/version.rs

//! Runtime version constraints.
//!
//! Constraints are compared as `major.minor` strings: `"3.11.4"` becomes
//! `"3.11"` and a bare `"3"` becomes `"3.0"`.

/// Normalize a user-supplied version constraint to `major.minor`.
pub fn normalize_version(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty runtime version".to_string());
    }

    let mut parts = raw.split('.');
    let major = parse_component(parts.next(), raw)?;
    let minor = match parts.next() {
        Some(part) => parse_component(Some(part), raw)?,
        None => 0,
    };

    Ok(format!("{major}.{minor}"))
}

fn parse_component(part: Option<&str>, raw: &str) -> Result<u32, String> {
    let part = part.unwrap_or_default().trim();
    part.parse::<u32>()
        .map_err(|_| format!("invalid runtime version '{raw}' (expected e.g. \"3.11\")"))
}

/// Whether a candidate reporting `reported` satisfies the normalized
/// constraint `wanted`. No constraint accepts anything.
pub fn satisfies(reported: &str, wanted: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(wanted) => reported.trim() == wanted,
    }
}
