use super::*;
use shared::domain::{Message, Sender};

const SCALE_QUERY: &str = "scale the frontend deployment to 5 replicas";
const SCALE_COMMAND: &str = "kubectl scale deployment frontend --replicas=5";
const DELETE_QUERY: &str = "delete the crashed pod";
const DELETE_COMMAND: &str = "kubectl delete pod crashed-pod-abc123";

fn translate_ticket(dispatch: &Dispatch) -> Ticket {
    match dispatch.effect() {
        Some(Effect::Translate { ticket, .. }) => *ticket,
        other => panic!("expected translate effect, got {other:?}"),
    }
}

fn execute_ticket(dispatch: &Dispatch) -> Ticket {
    match dispatch.effect() {
        Some(Effect::Execute { ticket, .. }) => *ticket,
        other => panic!("expected execute effect, got {other:?}"),
    }
}

/// Drives a fresh controller into `Preview` for `command`.
fn previewing(query: &str, command: &str) -> (ApprovalController, ConversationLog) {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let ticket = translate_ticket(&controller.submit(&mut log, query));
    let dispatch = controller.on_translated(&mut log, ticket, Ok(Some(command.to_string())));
    assert!(dispatch.is_applied());
    assert_eq!(controller.phase(), Phase::Preview);
    (controller, log)
}

fn kinds(log: &ConversationLog) -> Vec<MessageKind> {
    log.messages().iter().map(|m| m.kind).collect()
}

#[test]
fn submit_appends_user_message_and_requests_translation() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();

    let dispatch = controller.submit(&mut log, "  list the pods  ");

    assert_eq!(
        dispatch.effect(),
        Some(&Effect::Translate {
            ticket: Ticket(1),
            query: "list the pods".into(),
        })
    );
    assert_eq!(controller.phase(), Phase::AwaitingTranslation);
    let message = log.last().expect("user message");
    assert_eq!(message.sender, Sender::User);
    assert_eq!(message.kind, MessageKind::Plain);
    assert_eq!(message.content, "list the pods");
    let pending = controller.pending().expect("pending");
    assert_eq!(pending.original_query(), "list the pods");
    assert_eq!(pending.proposed_command_text(), None);
}

#[test]
fn scale_translation_enters_preview_flagged_destructive() {
    let (controller, log) = previewing(SCALE_QUERY, SCALE_COMMAND);

    let preview = controller.preview().expect("preview");
    assert_eq!(preview.command_text, SCALE_COMMAND);
    assert_eq!(preview.original_query, SCALE_QUERY);
    assert!(preview.is_destructive);
    // Entering preview appends nothing beyond the submitted query.
    assert_eq!(log.len(), 1);
}

#[test]
fn read_only_translation_is_not_destructive() {
    let (controller, _) = previewing("show me all pods", "kubectl get pods -A");
    assert!(!controller.preview().expect("preview").is_destructive);
}

#[test]
fn delete_execute_and_result_return_to_idle() {
    let (mut controller, mut log) = previewing(DELETE_QUERY, DELETE_COMMAND);
    assert!(controller.pending().expect("pending").is_destructive());

    let dispatch = controller.execute(&mut log);
    assert_eq!(
        dispatch.effect(),
        Some(&Effect::Execute {
            ticket: Ticket(1),
            command_text: DELETE_COMMAND.into(),
            dry_run: false,
        })
    );
    assert_eq!(controller.phase(), Phase::Executing);
    let command = log.last().expect("command message");
    assert_eq!(command.kind, MessageKind::Command);
    assert_eq!(command.content, DELETE_COMMAND);

    let ticket = execute_ticket(&dispatch);
    controller.on_executed(&mut log, ticket, Ok("Operation successful".into()));

    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.pending().is_none());
    let result = log.last().expect("result message");
    assert_eq!(result.kind, MessageKind::Result);
    assert_eq!(result.content, "Operation successful");
    assert_eq!(result.command_text.as_deref(), Some(DELETE_COMMAND));
    assert_eq!(
        kinds(&log),
        vec![MessageKind::Plain, MessageKind::Command, MessageKind::Result]
    );
}

#[test]
fn translation_failure_appends_one_error_and_clears() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let ticket = translate_ticket(&controller.submit(&mut log, DELETE_QUERY));

    controller.on_translated(
        &mut log,
        ticket,
        Err(TranslationError::Transport("connection refused".into())),
    );

    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.pending().is_none());
    let errors: Vec<&Message> = log
        .messages()
        .iter()
        .filter(|m| m.kind == MessageKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].content.starts_with(TRANSLATION_FAILED_TEXT));
    assert_eq!(errors[0].sender, Sender::System);
}

#[test]
fn empty_translation_is_a_plain_reply_not_an_error() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let ticket = translate_ticket(&controller.submit(&mut log, "what is the meaning of life"));

    controller.on_translated(&mut log, ticket, Ok(Some("   ".into())));

    assert_eq!(controller.phase(), Phase::Idle);
    let reply = log.last().expect("reply");
    assert_eq!(reply.kind, MessageKind::Plain);
    assert_eq!(reply.sender, Sender::System);
    assert_eq!(reply.content, NO_COMMAND_TEXT);

    let ticket = translate_ticket(&controller.submit(&mut log, "again"));
    controller.on_translated(&mut log, ticket, Ok(None));
    assert_eq!(log.last().expect("reply").content, NO_COMMAND_TEXT);
}

#[test]
fn cancel_from_preview_warns_and_accepts_next_submit() {
    let (mut controller, mut log) = previewing(SCALE_QUERY, SCALE_COMMAND);

    assert!(controller.cancel(&mut log).is_applied());

    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.pending().is_none());
    let warning = log.last().expect("warning");
    assert_eq!(warning.kind, MessageKind::Warning);
    assert!(warning.content.contains(SCALE_COMMAND));

    let next = controller.submit(&mut log, "get nodes");
    assert_eq!(translate_ticket(&next), Ticket(2));
}

#[test]
fn second_cancel_has_no_observable_effect() {
    let (mut controller, mut log) = previewing(SCALE_QUERY, SCALE_COMMAND);
    controller.cancel(&mut log);
    let after_first = log.snapshot();

    let second = controller.cancel(&mut log);

    assert_eq!(
        second,
        Dispatch::Rejected(Rejection::NotApplicable {
            action: OperatorAction::Cancel,
            phase: Phase::Idle,
        })
    );
    assert_eq!(log.snapshot(), after_first);
    assert_eq!(controller.phase(), Phase::Idle);
}

#[test]
fn local_dry_run_labels_transcript_without_executor() {
    let (mut controller, mut log) = previewing(SCALE_QUERY, SCALE_COMMAND);

    let dispatch = controller.dry_run(&mut log);

    assert_eq!(dispatch, Dispatch::Applied(None));
    assert_eq!(controller.phase(), Phase::Idle);
    let messages = log.messages();
    let command = &messages[messages.len() - 2];
    let result = &messages[messages.len() - 1];
    assert_eq!(command.kind, MessageKind::Command);
    assert_eq!(command.content, format!("[DRY RUN] {SCALE_COMMAND}"));
    assert_eq!(result.kind, MessageKind::Result);
    assert!(result.content.starts_with(DRY_RUN_PREFIX));
    assert!(result.content.contains(SCALE_COMMAND));
}

#[test]
fn remote_dry_run_asks_executor_and_labels_result() {
    let mut controller =
        ApprovalController::new(DestructiveVocabulary::default(), DryRunMode::Remote);
    let mut log = ConversationLog::new();
    let ticket = translate_ticket(&controller.submit(&mut log, SCALE_QUERY));
    controller.on_translated(&mut log, ticket, Ok(Some(SCALE_COMMAND.into())));

    let dispatch = controller.dry_run(&mut log);
    assert_eq!(
        dispatch.effect(),
        Some(&Effect::Execute {
            ticket,
            command_text: SCALE_COMMAND.into(),
            dry_run: true,
        })
    );
    assert_eq!(controller.phase(), Phase::Executing);

    controller.on_executed(&mut log, ticket, Ok("deployment scaled (dry-run)".into()));
    assert_eq!(
        log.last().expect("result").content,
        "[DRY RUN] deployment scaled (dry-run)"
    );
    assert_eq!(controller.phase(), Phase::Idle);
}

#[test]
fn execution_failure_appends_error_and_returns_to_idle() {
    let (mut controller, mut log) = previewing(DELETE_QUERY, DELETE_COMMAND);
    let ticket = execute_ticket(&controller.execute(&mut log));

    controller.on_executed(
        &mut log,
        ticket,
        Err(ExecutionError::Status {
            status: 403,
            message: "Blocked dangerous verb: delete".into(),
        }),
    );

    assert_eq!(controller.phase(), Phase::Idle);
    let error = log.last().expect("error");
    assert_eq!(error.kind, MessageKind::Error);
    assert!(error.content.starts_with(EXECUTION_FAILED_TEXT));
    assert!(error.content.contains("Blocked dangerous verb"));
}

#[test]
fn submit_is_a_no_op_while_a_command_is_pending() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let ticket = translate_ticket(&controller.submit(&mut log, SCALE_QUERY));

    let busy = controller.submit(&mut log, "another request");
    assert_eq!(
        busy,
        Dispatch::Rejected(Rejection::NotApplicable {
            action: OperatorAction::Submit,
            phase: Phase::AwaitingTranslation,
        })
    );
    assert_eq!(log.len(), 1);

    controller.on_translated(&mut log, ticket, Ok(Some(SCALE_COMMAND.into())));
    let busy = controller.submit(&mut log, "another request");
    assert!(matches!(
        busy,
        Dispatch::Rejected(Rejection::NotApplicable {
            phase: Phase::Preview,
            ..
        })
    ));
    assert_eq!(log.len(), 1);
    assert_eq!(
        controller.pending().expect("pending").original_query(),
        SCALE_QUERY
    );
}

#[test]
fn blank_query_is_rejected() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();

    assert_eq!(
        controller.submit(&mut log, " \t "),
        Dispatch::Rejected(Rejection::EmptyQuery)
    );
    assert!(log.is_empty());
    assert_eq!(controller.phase(), Phase::Idle);
}

#[test]
fn actions_outside_preview_are_rejected() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();

    assert!(matches!(
        controller.execute(&mut log),
        Dispatch::Rejected(Rejection::NotApplicable {
            action: OperatorAction::Execute,
            phase: Phase::Idle,
        })
    ));
    controller.submit(&mut log, SCALE_QUERY);
    assert!(matches!(
        controller.dry_run(&mut log),
        Dispatch::Rejected(Rejection::NotApplicable {
            action: OperatorAction::DryRun,
            phase: Phase::AwaitingTranslation,
        })
    ));
    assert_eq!(log.len(), 1);
}

#[test]
fn stray_cancel_during_execution_is_ignored() {
    let (mut controller, mut log) = previewing(DELETE_QUERY, DELETE_COMMAND);
    let ticket = execute_ticket(&controller.execute(&mut log));
    let before = log.len();

    assert!(matches!(
        controller.cancel(&mut log),
        Dispatch::Rejected(Rejection::NotApplicable {
            phase: Phase::Executing,
            ..
        })
    ));
    assert!(matches!(controller.execute(&mut log), Dispatch::Rejected(_)));
    assert_eq!(log.len(), before);

    controller.on_executed(&mut log, ticket, Ok("pod deleted".into()));
    assert_eq!(log.last().expect("result").kind, MessageKind::Result);
}

#[test]
fn translation_for_cancelled_request_is_discarded() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let stale = translate_ticket(&controller.submit(&mut log, SCALE_QUERY));

    assert!(controller.cancel(&mut log).is_applied());
    let warning = log.last().expect("warning");
    assert_eq!(warning.kind, MessageKind::Warning);
    assert!(warning.content.contains(SCALE_QUERY));

    let fresh = translate_ticket(&controller.submit(&mut log, DELETE_QUERY));
    let before = log.snapshot();

    assert_eq!(
        controller.on_translated(&mut log, stale, Ok(Some(SCALE_COMMAND.into()))),
        Dispatch::Stale(stale)
    );
    assert_eq!(log.snapshot(), before);
    assert_eq!(controller.phase(), Phase::AwaitingTranslation);

    controller.on_translated(&mut log, fresh, Ok(Some(DELETE_COMMAND.into())));
    assert_eq!(
        controller.preview().expect("preview").command_text,
        DELETE_COMMAND
    );
}

#[test]
fn execution_outcome_with_unknown_ticket_is_discarded() {
    let (mut controller, mut log) = previewing(DELETE_QUERY, DELETE_COMMAND);
    controller.execute(&mut log);
    let before = log.len();

    assert_eq!(
        controller.on_executed(&mut log, Ticket(42), Ok("unexpected".into())),
        Dispatch::Stale(Ticket(42))
    );
    assert_eq!(log.len(), before);
    assert_eq!(controller.phase(), Phase::Executing);
}

#[test]
fn submit_message_precedes_its_outcomes_and_log_only_grows() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();
    let mut observations = vec![log.snapshot()];

    let ticket = translate_ticket(&controller.submit(&mut log, DELETE_QUERY));
    observations.push(log.snapshot());
    controller.on_translated(&mut log, ticket, Ok(Some(DELETE_COMMAND.into())));
    observations.push(log.snapshot());
    let ticket = execute_ticket(&controller.execute(&mut log));
    observations.push(log.snapshot());
    controller.on_executed(&mut log, ticket, Ok("pod deleted".into()));
    observations.push(log.snapshot());

    for pair in observations.windows(2) {
        assert_eq!(&pair[1][..pair[0].len()], pair[0].as_slice());
    }

    let submitted = log
        .messages()
        .iter()
        .position(|m| m.sender == Sender::User)
        .expect("user message");
    let outcomes: Vec<usize> = log
        .messages()
        .iter()
        .enumerate()
        .filter(|(_, m)| m.sender == Sender::System)
        .map(|(index, _)| index)
        .collect();
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|index| *index > submitted));
}

#[test]
fn tickets_increase_across_cycles() {
    let mut controller = ApprovalController::default();
    let mut log = ConversationLog::new();

    for expected in 1..=3 {
        let ticket = translate_ticket(&controller.submit(&mut log, "get pods"));
        assert_eq!(ticket, Ticket(expected));
        controller.on_translated(&mut log, ticket, Ok(None));
    }
    assert_eq!(log.len(), 6);
}
