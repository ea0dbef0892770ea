use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::{
    domain::DryRunMode,
    protocol::{EXECUTE_ROUTE, TRANSLATE_ROUTE},
};
use tracing::warn;
use url::Url;

use crate::{
    classify::{DestructiveVocabulary, DEFAULT_DESTRUCTIVE_VERBS},
    conversation::DEFAULT_GREETING,
};

pub const DEFAULT_CONFIG_FILE: &str = "kubechat.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub backend_url: String,
    pub translate_path: String,
    pub execute_path: String,
    pub translate_timeout_seconds: u64,
    pub execute_timeout_seconds: u64,
    pub dry_run_mode: DryRunMode,
    pub destructive_verbs: Vec<String>,
    pub greeting: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080".into(),
            translate_path: TRANSLATE_ROUTE.into(),
            execute_path: EXECUTE_ROUTE.into(),
            translate_timeout_seconds: 30,
            execute_timeout_seconds: 60,
            dry_run_mode: DryRunMode::Local,
            destructive_verbs: DEFAULT_DESTRUCTIVE_VERBS
                .iter()
                .map(|verb| verb.to_string())
                .collect(),
            greeting: Some(DEFAULT_GREETING.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    backend_url: Option<String>,
    translate_path: Option<String>,
    execute_path: Option<String>,
    translate_timeout_seconds: Option<u64>,
    execute_timeout_seconds: Option<u64>,
    dry_run_mode: Option<DryRunMode>,
    destructive_verbs: Option<Vec<String>>,
    greeting: Option<String>,
}

impl ClientSettings {
    pub fn translate_url(&self) -> anyhow::Result<Url> {
        self.endpoint(&self.translate_path)
    }

    pub fn execute_url(&self) -> anyhow::Result<Url> {
        self.endpoint(&self.execute_path)
    }

    pub fn translate_timeout(&self) -> Duration {
        Duration::from_secs(self.translate_timeout_seconds)
    }

    pub fn execute_timeout(&self) -> Duration {
        Duration::from_secs(self.execute_timeout_seconds)
    }

    pub fn vocabulary(&self) -> DestructiveVocabulary {
        DestructiveVocabulary::new(&self.destructive_verbs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base = Url::parse(&self.backend_url)
            .with_context(|| format!("invalid backend url '{}'", self.backend_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("backend url '{}' must use http or https", self.backend_url);
        }
        if self.translate_timeout_seconds == 0 || self.execute_timeout_seconds == 0 {
            bail!("remote call timeouts must be at least one second");
        }
        if self.vocabulary().verbs().is_empty() {
            bail!("destructive verb list must not be empty");
        }
        self.translate_url()?;
        self.execute_url()?;
        Ok(())
    }

    fn endpoint(&self, path: &str) -> anyhow::Result<Url> {
        let joined = format!(
            "{}/{}",
            self.backend_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).with_context(|| format!("invalid endpoint url '{joined}'"))
    }
}

/// Defaults, then `path` (or `kubechat.toml` when present), then environment overrides.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_toml(&mut settings, &raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_toml(&mut settings, &raw)
                    .with_context(|| format!("failed to parse {DEFAULT_CONFIG_FILE}"))?;
            }
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

pub fn apply_toml(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.backend_url {
        settings.backend_url = v;
    }
    if let Some(v) = file_cfg.translate_path {
        settings.translate_path = v;
    }
    if let Some(v) = file_cfg.execute_path {
        settings.execute_path = v;
    }
    if let Some(v) = file_cfg.translate_timeout_seconds {
        settings.translate_timeout_seconds = v;
    }
    if let Some(v) = file_cfg.execute_timeout_seconds {
        settings.execute_timeout_seconds = v;
    }
    if let Some(v) = file_cfg.dry_run_mode {
        settings.dry_run_mode = v;
    }
    if let Some(v) = file_cfg.destructive_verbs {
        settings.destructive_verbs = v;
    }
    if let Some(v) = file_cfg.greeting {
        settings.greeting = (!v.trim().is_empty()).then_some(v);
    }
    Ok(())
}

/// Applies `KUBECHAT_*` and `APP__*` variables. Unparseable values are logged and skipped.
pub fn apply_env_overrides<F>(settings: &mut ClientSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("KUBECHAT_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = lookup("APP__TRANSLATE_TIMEOUT_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.translate_timeout_seconds = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring APP__TRANSLATE_TIMEOUT_SECONDS"),
        }
    }
    if let Some(v) = lookup("APP__EXECUTE_TIMEOUT_SECONDS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.execute_timeout_seconds = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring APP__EXECUTE_TIMEOUT_SECONDS"),
        }
    }

    if let Some(v) = lookup("APP__DRY_RUN_MODE") {
        match v.parse::<DryRunMode>() {
            Ok(mode) => settings.dry_run_mode = mode,
            Err(error) => warn!(%error, "ignoring APP__DRY_RUN_MODE"),
        }
    }

    if let Some(v) = lookup("APP__DESTRUCTIVE_VERBS") {
        settings.destructive_verbs = v
            .split(',')
            .map(str::trim)
            .filter(|verb| !verb.is_empty())
            .map(str::to_string)
            .collect();
    }
}
