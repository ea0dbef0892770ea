//! Boundary adapters for the remote translator and executor.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use shared::{
    error::ApiError,
    protocol::{ExecuteRequest, TranslateRequest, TranslateResponse},
};
use tracing::debug;
use url::Url;

use crate::{
    config::ClientSettings,
    error::{ExecutionError, TranslationError},
};

#[async_trait]
pub trait CommandTranslator: Send + Sync {
    /// `Ok(None)` means the translator was reachable but produced no usable command.
    async fn translate(&self, query: &str) -> Result<Option<String>, TranslationError>;
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command_text: &str, dry_run: bool) -> Result<String, ExecutionError>;
}

pub struct MissingTranslator;

#[async_trait]
impl CommandTranslator for MissingTranslator {
    async fn translate(&self, _query: &str) -> Result<Option<String>, TranslationError> {
        Err(TranslationError::Unavailable)
    }
}

pub struct MissingExecutor;

#[async_trait]
impl CommandExecutor for MissingExecutor {
    async fn execute(&self, _command_text: &str, _dry_run: bool) -> Result<String, ExecutionError> {
        Err(ExecutionError::Unavailable)
    }
}

#[derive(Debug, Clone)]
pub struct BackendEndpoints {
    pub translate_url: Url,
    pub execute_url: Url,
    pub translate_timeout: Duration,
    pub execute_timeout: Duration,
}

impl BackendEndpoints {
    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Ok(Self {
            translate_url: settings.translate_url()?,
            execute_url: settings.execute_url()?,
            translate_timeout: settings.translate_timeout(),
            execute_timeout: settings.execute_timeout(),
        })
    }
}

/// Talks to the KubeChat API over HTTP. Implements both boundary traits.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    endpoints: BackendEndpoints,
}

impl HttpBackend {
    pub fn new(endpoints: BackendEndpoints) -> Self {
        Self {
            http: Client::new(),
            endpoints,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> anyhow::Result<Self> {
        Ok(Self::new(BackendEndpoints::from_settings(settings)?))
    }

    pub fn endpoints(&self) -> &BackendEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl CommandTranslator for HttpBackend {
    async fn translate(&self, query: &str) -> Result<Option<String>, TranslationError> {
        let res = self
            .http
            .post(self.endpoints.translate_url.clone())
            .timeout(self.endpoints.translate_timeout)
            .json(&TranslateRequest {
                query: query.to_string(),
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let (status, message) = failure_summary(res).await;
            return Err(TranslationError::Status { status, message });
        }

        let body: TranslateResponse = res.json().await?;
        if body.usable_command().is_none() {
            debug!(llm_raw = body.llm_raw.as_deref(), "translator returned no command");
        }
        Ok(body.usable_command().map(str::to_string))
    }
}

#[async_trait]
impl CommandExecutor for HttpBackend {
    async fn execute(&self, command_text: &str, dry_run: bool) -> Result<String, ExecutionError> {
        let res = self
            .http
            .post(self.endpoints.execute_url.clone())
            .timeout(self.endpoints.execute_timeout)
            .json(&ExecuteRequest {
                command: command_text.to_string(),
                dry_run,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            let (status, message) = failure_summary(res).await;
            return Err(ExecutionError::Status { status, message });
        }

        let body: Value = res.json().await?;
        Ok(result_text(&body))
    }
}

/// `result`, else `output`, else the whole body pretty-printed.
///
/// A field counts as absent when it is missing, null, an empty string, `false` or a numeric
/// zero. Any other value is returned, pretty-printed when it is not a string.
pub fn result_text(body: &Value) -> String {
    for key in ["result", "output"] {
        match body.get(key) {
            Some(Value::String(text)) if !text.is_empty() => return text.clone(),
            Some(value) if !is_blank(value) => return pretty(value),
            _ => {}
        }
    }
    pretty(body)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(text) => text.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
        _ => false,
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

async fn failure_summary(res: Response) -> (u16, String) {
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    (status.as_u16(), error_message(status.canonical_reason(), &text))
}

fn error_message(reason: Option<&str>, body: &str) -> String {
    if let Ok(api_error) = serde_json::from_str::<ApiError>(body) {
        return api_error.summary();
    }
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return match value.get("details").and_then(Value::as_str) {
                Some(details) => format!("{error}: {details}"),
                None => error.to_string(),
            };
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    reason.unwrap_or("request failed").to_string()
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
