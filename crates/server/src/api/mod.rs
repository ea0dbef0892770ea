//! Request handling for the development backend: keyword translation, kubectl validation,
//! and canned execution output. Nothing here talks to a real cluster.

use std::collections::BTreeSet;

use chrono::Utc;
use shared::{
    error::ApiError,
    protocol::{DryRunResponse, ExecuteResponse, TranslateResponse},
};
use tracing::info;

use crate::config::Settings;

const MIN_QUERY_LEN: usize = 3;
const MAX_QUERY_LEN: usize = 500;
const INJECTION_CHARS: &[char] = &[';', '|', '&', '>', '<', '$', '`'];
const NO_MATCH_TEXT: &str = "I could not map that request to a kubectl command.";

#[derive(Debug, Clone)]
pub struct ApiContext {
    pub cluster_name: String,
    pub policy: CommandPolicy,
}

impl ApiContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cluster_name: settings.cluster_name.clone(),
            policy: CommandPolicy {
                allowed_verbs: settings.allowed_verbs.iter().cloned().collect(),
                blocked_verbs: settings.blocked_verbs.iter().cloned().collect(),
                max_command_len: settings.max_command_len,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandPolicy {
    pub allowed_verbs: BTreeSet<String>,
    pub blocked_verbs: BTreeSet<String>,
    pub max_command_len: usize,
}

/// The parts of a kubectl invocation the validator looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub verb: String,
    pub resource: String,
    pub resource_name: Option<String>,
    pub namespace: Option<String>,
    pub all_namespaces: bool,
}

pub fn parse_command(command: &str) -> Option<ParsedCommand> {
    let parts: Vec<&str> = command.split_whitespace().collect();
    if parts.len() < 3 || parts[0] != "kubectl" {
        return None;
    }

    let verb = parts[1].to_ascii_lowercase();
    let (resource, mut resource_name) = match parts[2].split_once('/') {
        Some((kind, name)) => (kind.to_string(), Some(name.to_string())),
        None => (parts[2].to_string(), None),
    };
    if resource_name.is_none() {
        resource_name = parts
            .get(3)
            .filter(|candidate| !candidate.starts_with('-'))
            .map(|candidate| candidate.to_string());
    }

    let mut namespace = None;
    let mut all_namespaces = false;
    for (i, part) in parts.iter().enumerate() {
        match *part {
            "-n" | "--namespace" => namespace = parts.get(i + 1).map(|ns| ns.to_string()),
            "-A" | "--all-namespaces" => all_namespaces = true,
            _ => {
                if let Some(ns) = part.strip_prefix("--namespace=") {
                    namespace = Some(ns.to_string());
                }
            }
        }
    }

    Some(ParsedCommand {
        verb,
        resource,
        resource_name,
        namespace,
        all_namespaces,
    })
}

impl CommandPolicy {
    /// Blocked verbs pass only when `dry_run` is set; everything else must be allow-listed.
    pub fn validate(&self, command: &str, dry_run: bool) -> Result<ParsedCommand, ApiError> {
        let command = command.trim();
        if command.len() < 3 {
            return Err(ApiError::validation("Invalid request format")
                .with_details("command must be at least 3 characters"));
        }
        if command.len() > self.max_command_len {
            return Err(ApiError::validation("Command too long").with_details(format!(
                "Command exceeds {} characters",
                self.max_command_len
            )));
        }
        if command.contains(INJECTION_CHARS) {
            return Err(ApiError::validation("Potential command injection detected")
                .with_details(command));
        }
        let Some(parsed) = parse_command(command) else {
            return Err(ApiError::validation("Invalid kubectl command syntax"));
        };

        if self.blocked_verbs.contains(&parsed.verb) {
            if !dry_run {
                return Err(ApiError::forbidden("Blocked dangerous verb", &parsed.verb));
            }
        } else if !self.allowed_verbs.contains(&parsed.verb) {
            return Err(ApiError::forbidden("Verb not allowed", &parsed.verb));
        }

        if let Some(name) = &parsed.resource_name {
            if !is_valid_resource_name(name) {
                return Err(ApiError::forbidden("Resource name not whitelisted", name));
            }
        }

        Ok(parsed)
    }
}

fn is_valid_resource_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

pub fn validate_query(query: &str) -> Result<&str, ApiError> {
    let query = query.trim();
    if query.len() < MIN_QUERY_LEN || query.len() > MAX_QUERY_LEN {
        return Err(ApiError::validation("Missing or invalid query"));
    }
    Ok(query)
}

/// Keyword lookup standing in for the language model. First matching rule wins.
pub fn translate_query(query: &str) -> TranslateResponse {
    let lowered = query.to_ascii_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .filter(|word| !word.is_empty())
        .collect();
    let has = |keyword: &str| words.iter().any(|word| word.starts_with(keyword));

    if has("scale") {
        return TranslateResponse::command(scale_command(&words));
    }
    if has("delete") || has("remove") {
        return TranslateResponse::command("kubectl delete pod crashed-pod-abc123");
    }
    if has("why") || has("event") {
        return TranslateResponse::command("kubectl get events --sort-by=.lastTimestamp");
    }
    if has("log") {
        return TranslateResponse::command("kubectl logs deployment/frontend --tail=50");
    }
    if has("node") {
        return TranslateResponse::command("kubectl get nodes");
    }
    if has("service") || has("svc") {
        return TranslateResponse::command("kubectl get services -A");
    }
    if has("deployment") {
        return TranslateResponse::command("kubectl get deployments -A");
    }
    if has("pod") {
        return TranslateResponse::command("kubectl get pods -A");
    }

    TranslateResponse {
        kubectl_command: None,
        llm_raw: Some(NO_MATCH_TEXT.to_string()),
    }
}

fn scale_command(words: &[&str]) -> String {
    let replicas = words
        .iter()
        .find_map(|word| word.parse::<u32>().ok())
        .unwrap_or(1);
    let target = words
        .iter()
        .position(|word| word.starts_with("deployment"))
        .and_then(|index| index.checked_sub(1))
        .map(|index| words[index])
        .filter(|word| !matches!(*word, "the" | "a" | "scale"))
        .unwrap_or("frontend");
    format!("kubectl scale deployment {target} --replicas={replicas}")
}

pub fn execute_command(ctx: &ApiContext, parsed: &ParsedCommand, dry_run: bool) -> ExecuteResponse {
    let output = if dry_run {
        format!(
            "{} {} validated against {} (server dry run)",
            parsed.verb,
            target_label(parsed),
            ctx.cluster_name
        )
    } else {
        canned_output(parsed)
    };
    ExecuteResponse {
        output,
        cluster: ctx.cluster_name.clone(),
        executed_at: Utc::now(),
        dry_run,
    }
}

pub fn dry_run_result(ctx: &ApiContext) -> DryRunResponse {
    DryRunResponse {
        result: "Command validated successfully".to_string(),
        success: true,
        cluster: ctx.cluster_name.clone(),
    }
}

fn target_label(parsed: &ParsedCommand) -> String {
    match &parsed.resource_name {
        Some(name) => format!("{}/{name}", parsed.resource),
        None => parsed.resource.clone(),
    }
}

fn canned_output(parsed: &ParsedCommand) -> String {
    let namespace = parsed.namespace.as_deref().unwrap_or("default");
    match parsed.verb.as_str() {
        "scale" => format!("{} scaled", target_label(parsed)),
        "describe" => format!(
            "Name:         {}\nNamespace:    {namespace}\nStatus:       Running",
            parsed.resource_name.as_deref().unwrap_or(&parsed.resource)
        ),
        "logs" => "(no log lines in the selected window)".to_string(),
        "delete" => format!("{} deleted", target_label(parsed)),
        "get" | "list" => match parsed.resource.as_str() {
            "pods" | "pod" | "po" => {
                let ns_column = if parsed.all_namespaces { "NAMESPACE   " } else { "" };
                let ns_value = if parsed.all_namespaces { "default     " } else { "" };
                format!(
                    "{ns_column}NAME                        READY   STATUS    RESTARTS   AGE\n\
                     {ns_value}frontend-7d4b9c6f5d-x2k8l   1/1     Running   0          3h"
                )
            }
            "nodes" | "node" | "no" => {
                "NAME           STATUS   ROLES           AGE   VERSION\n\
                 control-plane  Ready    control-plane   12d   v1.30.2"
                    .to_string()
            }
            _ => format!("No resources found in {namespace} namespace."),
        },
        _ => "Operation successful".to_string(),
    }
}

/// One structured audit record per execute or dry-run request.
pub fn audit(cluster: &str, command: &str, dry_run: bool, outcome: &Result<(), ApiError>) {
    match outcome {
        Ok(()) => info!(
            target: "audit",
            %cluster,
            %command,
            dry_run,
            success = true,
            "kubectl request"
        ),
        Err(error) => info!(
            target: "audit",
            %cluster,
            %command,
            dry_run,
            success = false,
            details = %error.summary(),
            "kubectl request"
        ),
    }
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
