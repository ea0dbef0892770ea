use std::fs;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_ALLOWED_VERBS: &[&str] = &["get", "list", "describe", "logs", "scale"];
pub const DEFAULT_BLOCKED_VERBS: &[&str] = &["delete", "edit"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub cluster_name: String,
    pub allowed_verbs: Vec<String>,
    pub blocked_verbs: Vec<String>,
    pub max_command_len: usize,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            cluster_name: "dev-cluster".into(),
            allowed_verbs: to_owned(DEFAULT_ALLOWED_VERBS),
            blocked_verbs: to_owned(DEFAULT_BLOCKED_VERBS),
            max_command_len: 500,
            body_limit_bytes: 16 * 1024,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    cluster_name: Option<String>,
    allowed_verbs: Option<Vec<String>>,
    blocked_verbs: Option<Vec<String>>,
    max_command_len: Option<usize>,
    body_limit_bytes: Option<usize>,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let raw = fs::read_to_string("server.toml").ok();
    let settings = build_settings(raw.as_deref(), |key| std::env::var(key).ok())
        .context("failed to load server.toml")?;
    Ok(settings)
}

/// Defaults, then the optional `server.toml` contents, then environment overrides.
pub fn build_settings<F>(raw_file: Option<&str>, lookup: F) -> anyhow::Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Some(raw) = raw_file {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.bind_addr {
            settings.server_bind = v;
        }
        if let Some(v) = file_cfg.cluster_name {
            settings.cluster_name = v;
        }
        if let Some(v) = file_cfg.allowed_verbs {
            settings.allowed_verbs = normalize_verbs(v);
        }
        if let Some(v) = file_cfg.blocked_verbs {
            settings.blocked_verbs = normalize_verbs(v);
        }
        if let Some(v) = file_cfg.max_command_len {
            settings.max_command_len = v;
        }
        if let Some(v) = file_cfg.body_limit_bytes {
            settings.body_limit_bytes = v;
        }
    }

    if let Some(v) = lookup("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__BIND_ADDR") {
        settings.server_bind = v;
    }
    if let Some(v) = lookup("APP__CLUSTER_NAME") {
        settings.cluster_name = v;
    }
    if let Some(v) = lookup("APP__ALLOWED_VERBS") {
        settings.allowed_verbs = normalize_verbs(v.split(','));
    }
    if let Some(v) = lookup("APP__BLOCKED_VERBS") {
        settings.blocked_verbs = normalize_verbs(v.split(','));
    }
    if let Some(v) = lookup("APP__MAX_COMMAND_LEN") {
        match v.parse::<usize>() {
            Ok(parsed) => settings.max_command_len = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring APP__MAX_COMMAND_LEN"),
        }
    }

    Ok(settings)
}

fn normalize_verbs<I, S>(verbs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    verbs
        .into_iter()
        .map(|verb| verb.as_ref().trim().to_ascii_lowercase())
        .filter(|verb| !verb.is_empty())
        .collect()
}

fn to_owned(verbs: &[&str]) -> Vec<String> {
    verbs.iter().map(|verb| verb.to_string()).collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
