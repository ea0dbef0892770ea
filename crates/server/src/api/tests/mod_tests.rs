use super::*;
use shared::error::ErrorCode;

fn context() -> ApiContext {
    ApiContext::from_settings(&Settings::default())
}

#[test]
fn scale_query_maps_to_scale_command() {
    let reply = translate_query("Scale the frontend deployment to 5 replicas");
    assert_eq!(
        reply.usable_command(),
        Some("kubectl scale deployment frontend --replicas=5")
    );
}

#[test]
fn unmatched_query_returns_raw_text_only() {
    let reply = translate_query("what is the meaning of life");
    assert_eq!(reply.usable_command(), None);
    assert_eq!(reply.llm_raw.as_deref(), Some(NO_MATCH_TEXT));
}

#[test]
fn query_length_is_bounded() {
    assert!(validate_query("  hi ").is_err());
    assert!(validate_query(&"pods ".repeat(200)).is_err());
    assert_eq!(validate_query("  list pods ").expect("valid"), "list pods");
}

#[test]
fn parses_slash_form_and_namespace_flags() {
    let parsed = parse_command("kubectl scale deployment/web --replicas=2 -n shop").expect("parse");
    assert_eq!(parsed.verb, "scale");
    assert_eq!(parsed.resource, "deployment");
    assert_eq!(parsed.resource_name.as_deref(), Some("web"));
    assert_eq!(parsed.namespace.as_deref(), Some("shop"));

    let parsed = parse_command("kubectl get pods -A").expect("parse");
    assert_eq!(parsed.resource_name, None);
    assert!(parsed.all_namespaces);

    assert_eq!(parse_command("helm list pods"), None);
    assert_eq!(parse_command("kubectl get"), None);
}

#[test]
fn blocked_verb_is_forbidden_unless_dry_run() {
    let policy = context().policy;

    let err = policy
        .validate("kubectl delete pod crashed-pod-abc123", false)
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert_eq!(err.summary(), "Blocked dangerous verb: delete");

    let parsed = policy
        .validate("kubectl delete pod crashed-pod-abc123", true)
        .expect("dry run passes");
    assert_eq!(parsed.resource_name.as_deref(), Some("crashed-pod-abc123"));
}

#[test]
fn verbs_outside_allow_list_are_forbidden() {
    let err = context()
        .policy
        .validate("kubectl apply -f deploy.yaml", true)
        .expect_err("should fail");
    assert_eq!(err.code, ErrorCode::Forbidden);
    assert_eq!(err.message, "Verb not allowed");
}

#[test]
fn rejects_bad_resource_names_syntax_and_injection() {
    let policy = context().policy;

    let err = policy
        .validate("kubectl describe pod web_1", false)
        .expect_err("bad name");
    assert_eq!(err.message, "Resource name not whitelisted");

    let err = policy.validate("ls -la /tmp", false).expect_err("not kubectl");
    assert_eq!(err.code, ErrorCode::Validation);

    let err = policy
        .validate("kubectl get pods; rm -rf /", false)
        .expect_err("injection");
    assert_eq!(err.message, "Potential command injection detected");

    let long = format!("kubectl get pods {}", "x".repeat(600));
    assert_eq!(
        policy.validate(&long, false).expect_err("too long").message,
        "Command too long"
    );
}

#[test]
fn execute_returns_canned_output_for_cluster() {
    let ctx = context();
    let parsed = ctx
        .policy
        .validate("kubectl scale deployment frontend --replicas=5", false)
        .expect("valid");

    let reply = execute_command(&ctx, &parsed, false);
    assert_eq!(reply.output, "deployment/frontend scaled");
    assert_eq!(reply.cluster, "dev-cluster");
    assert!(!reply.dry_run);

    let reply = execute_command(&ctx, &parsed, true);
    assert!(reply.dry_run);
    assert!(reply.output.contains("server dry run"));
}
