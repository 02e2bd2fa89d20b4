//! Configuration loading

use std::fmt;
use std::path::{Path, PathBuf};

use crate::domain::ports::FileSystem;
use crate::error::{PapError, PapResult};
use crate::infrastructure::fs::LocalFs;

use super::types::RepositoryConfig;

/// Non-fatal configuration warning (e.g. an unknown key)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    /// 1-indexed
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown config key '{}' in {}", self.key, self.file.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean '{suggestion}'?)")?;
        }
        Ok(())
    }
}

/// Load configuration and collect non-fatal warnings
pub fn load_with_warnings(path: &Path) -> PapResult<(RepositoryConfig, Vec<ConfigWarning>)> {
    let content = LocalFs::new().read(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);
    let config: RepositoryConfig = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| PapError::Corrupted {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
                file: path.to_path_buf(),
                key,
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Explicit file, then `<config dir>/pap/config.toml`, then defaults
pub fn load_or_default(explicit: Option<&Path>) -> RepositoryConfig {
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(user_config_path());

    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_with_warnings(&path) {
            Ok((config, warnings)) => {
                for warning in &warnings {
                    tracing::warn!(%warning, "ignoring unknown configuration key");
                }
                return RepositoryConfig::with_env_overrides(config);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable configuration file");
            }
        }
    }

    RepositoryConfig::default().with_env_overrides()
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pap").join("config.toml"))
}

/// Apply `PAP_*` overrides read through `lookup`
pub fn with_env_overrides<F>(mut config: RepositoryConfig, lookup: F) -> RepositoryConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup("PAP_DOMAINS_ROOT").filter(|v| !v.is_empty()) {
        config.storage.domains_root = Some(PathBuf::from(root));
    }

    if let Some(template) = lookup("PAP_DOMAIN_TEMPLATE").filter(|v| !v.is_empty()) {
        config.storage.domain_template = Some(PathBuf::from(template));
    }

    if let Some(val) = lookup("PAP_SYNC_INTERVAL_SECS") {
        match val.trim().parse::<i64>() {
            Ok(secs) => config.sync.interval_secs = secs,
            Err(_) => {
                tracing::warn!(value = %val, "invalid PAP_SYNC_INTERVAL_SECS value, expected an integer");
            }
        }
    }

    if let Some(val) = lookup("PAP_PDP_ONLY") {
        if let Some(flag) = parse_flag("PAP_PDP_ONLY", &val) {
            config.service.pdp_only = flag;
        }
    }

    if let Some(val) = lookup("PAP_ENABLE_JSON_PROFILE") {
        if let Some(flag) = parse_flag("PAP_ENABLE_JSON_PROFILE", &val) {
            config.service.enable_json_profile = flag;
        }
    }

    config
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(var = name, value, "invalid boolean value, expected true or false");
            None
        }
    }
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "storage",
        "domains_root",
        "domain_template",
        "sync",
        "interval_secs",
        "shutdown_timeout_secs",
        "service",
        "pdp_only",
        "enable_json_profile",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ac) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b.iter().enumerate() {
            let cost = usize::from(ac != bc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }

    prev[b.len()]
}
