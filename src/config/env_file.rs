//! `.env` file loading.
//!
//! Only the subset the gateway tooling writes is understood: `KEY=VALUE`
//! lines, optional `export ` prefix, `#` comments, and single or double
//! quoted values.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

/// Read variables from an env file.
///
/// A missing file yields an empty map; other I/O errors are returned.
pub fn load_env_file(path: &Path) -> std::io::Result<HashMap<String, String>> {
    if !path.exists() {
        debug!(path = %path.display(), "no env file");
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(path)?;
    Ok(parse_env(&content))
}

/// Parse env file content.
pub fn parse_env(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), unquote(value.trim()).to_string()))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
