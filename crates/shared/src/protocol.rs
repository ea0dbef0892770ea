use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const TRANSLATE_ROUTE: &str = "/api/v1/llm-parse";
pub const EXECUTE_ROUTE: &str = "/api/v1/execute";
pub const DRY_RUN_ROUTE: &str = "/api/v1/dry-run";
pub const HEALTH_ROUTE: &str = "/api/v1/health";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateRequest {
    pub query: String,
}

/// Translator reply. A missing or blank `kubectl_command` means no usable command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslateResponse {
    #[serde(
        default,
        alias = "command_text",
        alias = "commandText",
        skip_serializing_if = "Option::is_none"
    )]
    pub kubectl_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_raw: Option<String>,
}

impl TranslateResponse {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            kubectl_command: Some(command.into()),
            llm_raw: None,
        }
    }

    pub fn usable_command(&self) -> Option<&str> {
        self.kubectl_command
            .as_deref()
            .map(str::trim)
            .filter(|command| !command.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub output: String,
    pub cluster: String,
    pub executed_at: DateTime<Utc>,
    pub dry_run: bool,
}

/// Reply from the dry-run route, which validates a command without running it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryRunResponse {
    pub result: String,
    pub success: bool,
    pub cluster: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
