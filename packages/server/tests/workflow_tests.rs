//! End-to-end turns through the orchestrator with mocked models.

mod common;

use std::time::Duration;

use common::{failing_verdict, fast_settings, passing_verdict, TestHarness, LEASE_ANSWER, LEASE_CONTRACT};
use juridico_core::common::markup::unemphasized_amounts;
use juridico_core::common::ConversationId;
use juridico_core::domains::audit::AuditMode;
use juridico_core::domains::conversation::{ChatMessage, Role};
use juridico_core::domains::workflow::prompts::{OUT_OF_SCOPE_RESPONSE, TIMEOUT_RESPONSE};
use juridico_core::domains::workflow::{
    ClassificationLabel, TurnRequest, WorkflowError, WorkflowSettings,
};
use juridico_core::kernel::test_dependencies::{CallKind, MockAI, MockRetrieval};
use juridico_core::kernel::tools::LEGAL_SEARCH_TOOL;
use juridico_core::kernel::{Message, TestDependencies};
use serde_json::json;

fn blocking() -> WorkflowSettings {
    WorkflowSettings {
        audit_mode: AuditMode::Blocking,
        ..fast_settings()
    }
}

#[tokio::test]
async fn out_of_scope_question_gets_the_static_reply() {
    let deps = TestDependencies::new().mock_ai(MockAI::new().with_response("out_of_scope"));
    let harness = TestHarness::new(deps).await;

    let outcome = harness
        .orchestrator()
        .run_turn(TurnRequest::new("Quem vai ganhar o jogo de futebol hoje?"))
        .await
        .unwrap();

    assert_eq!(outcome.label, ClassificationLabel::OutOfScope);
    assert_eq!(outcome.response, OUT_OF_SCOPE_RESPONSE);

    // Only the classifier talked to the model.
    let calls = harness.deps.ai.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Complete);

    // History is updated before run_turn returns.
    let history = harness.deps.conversation_store.history(outcome.conversation_id);
    assert_eq!(
        history,
        vec![
            ChatMessage::user("Quem vai ganhar o jogo de futebol hoje?"),
            ChatMessage::assistant(OUT_OF_SCOPE_RESPONSE),
        ]
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.deps.audit_sink.entries().is_empty());
}

#[tokio::test]
async fn asset_protection_question_returns_before_the_judge_answers() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("societario")
            .with_tool_response(
                "Constitua uma LTDA com capital social de R 20.000,00, dividido 50% para cada sócio. \
                 A responsabilidade de cada um fica limitada ao valor das suas quotas.",
            )
            .hanging_on(CallKind::Structured),
    );
    let harness = TestHarness::new(deps).await;
    let question = "Quero abrir uma empresa com um sócio, como protejo meu patrimônio?";

    let outcome = tokio::time::timeout(
        Duration::from_millis(500),
        harness.orchestrator().run_turn(TurnRequest::new(question)),
    )
    .await
    .expect("turn waited for the judge")
    .unwrap();

    assert_eq!(outcome.label, ClassificationLabel::Societario);
    assert!(outcome.audit.is_none());
    assert!(outcome.response.contains("**R$ 20.000,00**"));
    assert!(outcome.response.contains("**50%**"));
    assert!(
        unemphasized_amounts(&outcome.response).is_empty(),
        "bare amounts in {:?}",
        outcome.response
    );

    let history = harness.deps.conversation_store.history(outcome.conversation_id);
    assert_eq!(
        history,
        vec![ChatMessage::user(question), ChatMessage::assistant(outcome.response.clone())]
    );

    // The judge was asked and is still thinking.
    for _ in 0..100 {
        if !harness.deps.ai.calls_of(CallKind::Structured).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(harness.deps.ai.calls_of(CallKind::Structured).len(), 1);
    assert!(harness.deps.audit_sink.entries().is_empty());
}

#[tokio::test]
async fn lease_contract_review_end_to_end() {
    let deps = TestDependencies::new()
        .mock_ai(
            MockAI::new()
                .with_response("societario")
                .with_tool_call(
                    LEGAL_SEARCH_TOOL,
                    json!({"termo_busca": "multa rescisória locação Lei 8.245"}),
                )
                .with_tool_response(LEASE_ANSWER)
                .with_json_response(&passing_verdict()),
        )
        .mock_retrieval(MockRetrieval::new().with_answer(
            "Lei 8.245/91, Art. 4º: a multa será proporcional ao período de cumprimento do contrato.",
        ));
    let harness = TestHarness::new(deps).await;

    let outcome = harness
        .orchestrator()
        .run_turn(
            TurnRequest::new("Essa multa do meu contrato de aluguel é abusiva?")
                .with_document(LEASE_CONTRACT),
        )
        .await
        .unwrap();

    assert_eq!(outcome.label, ClassificationLabel::Societario);
    assert!(outcome.response.contains("**R$ 54.000,00**"));
    assert!(outcome.response.contains("**Lei 8.245/91**"));
    assert!(outcome.response.contains("**Art. 4º**"));

    let specialist = &harness.deps.ai.calls_of(CallKind::Tools)[0];
    assert!(specialist.transcript.contains("Cláusula 7ª"));
    assert!(specialist.tool_outputs[0].contains("proporcional"));

    let audits = harness.wait_for_audits(1).await;
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].conversation_id, outcome.conversation_id);
    assert_eq!(audits[0].label, ClassificationLabel::Societario);
    assert!(audits[0].record.approved);

    // The judge saw the formatted answer, not the raw draft.
    let judge = &harness.deps.ai.calls_of(CallKind::Structured)[0];
    assert!(judge.transcript.contains("**R$ 54.000,00**"));

    // The document itself is never persisted.
    let history = harness.deps.conversation_store.history(outcome.conversation_id);
    assert!(history.iter().all(|m| !m.content.contains("Cláusula 7ª")));
}

#[tokio::test]
async fn history_only_grows_and_failures_leave_it_untouched() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("trabalhista")
            .with_tool_response("O aviso prévio é de **30 dias**."),
    );
    let harness = TestHarness::new(deps.clone()).await;
    let id = ConversationId::new();

    let mut previous: Vec<ChatMessage> = Vec::new();
    for question in ["Aviso prévio?", "E se for justa causa?", "Obrigado"] {
        harness
            .orchestrator()
            .run_turn(TurnRequest::new(question).in_conversation(id))
            .await
            .unwrap();

        let history = harness.deps.conversation_store.history(id);
        assert_eq!(history.len(), previous.len() + 2);
        assert_eq!(&history[..previous.len()], previous.as_slice());
        assert_eq!(history[history.len() - 2], ChatMessage::user(question));
        previous = history;
    }

    // Same conversation store, broken model.
    let broken = TestHarness::new(deps.mock_ai(MockAI::failing())).await;
    let err = broken
        .orchestrator()
        .run_turn(TurnRequest::new("Mais uma pergunta").in_conversation(id))
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Model { .. }));
    assert_eq!(broken.deps.conversation_store.history(id), previous);
}

#[tokio::test]
async fn follow_up_turns_see_prior_history() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("simples")
            .with_tool_response("Resposta"),
    );
    let harness = TestHarness::new(deps).await;
    let id = ConversationId::new();

    for question in ["Quero abrir um MEI", "Qual o limite de faturamento?"] {
        harness
            .orchestrator()
            .run_turn(TurnRequest::new(question).in_conversation(id))
            .await
            .unwrap();
    }

    let expected = vec![
        Message::user("Quero abrir um MEI"),
        Message::assistant("Resposta"),
        Message::user("Qual o limite de faturamento?"),
    ];
    let second_classifier = &harness.deps.ai.calls_of(CallKind::Complete)[1];
    assert_eq!(second_classifier.messages, expected);
    let second_specialist = &harness.deps.ai.calls_of(CallKind::Tools)[1];
    assert_eq!(second_specialist.messages, expected);
    assert!(!second_specialist.transcript.contains("Usuário:"));
}

#[tokio::test]
async fn blocking_audit_revises_at_most_max_revisions_times() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("simples")
            .with_tool_response("O DAS custa R 70,60.")
            .with_json_response(&failing_verdict("Faltou citar a LC 123")),
    );
    let harness = TestHarness::with_settings(deps, blocking()).await;

    let outcome = harness
        .orchestrator()
        .run_turn(TurnRequest::new("Quanto custa o DAS do MEI?"))
        .await
        .unwrap();

    let drafts = harness.deps.ai.calls_of(CallKind::Tools);
    assert_eq!(drafts.len(), 3);
    assert!(!drafts[0].transcript.contains("Faltou citar a LC 123"));
    assert!(drafts[1].transcript.contains("Faltou citar a LC 123"));
    assert_eq!(harness.deps.ai.calls_of(CallKind::Structured).len(), 3);

    // Last draft is accepted after the cap.
    assert_eq!(outcome.revisions, 2);
    assert!(!outcome.audit.unwrap().approved);
    assert_eq!(outcome.response, "O DAS custa **R$ 70,60**.");

    let history = harness.deps.conversation_store.history(outcome.conversation_id);
    assert_eq!(history.len(), 2);
    assert_eq!(harness.deps.audit_sink.entries().len(), 1);
}

#[tokio::test]
async fn blocking_audit_accepts_a_passing_first_draft() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("corporativo")
            .with_tool_response("Resposta fundamentada")
            .with_json_response(&passing_verdict()),
    );
    let harness = TestHarness::with_settings(deps, blocking()).await;

    let outcome = harness
        .orchestrator()
        .run_turn(TurnRequest::new("JCP no Lucro Real?"))
        .await
        .unwrap();

    assert_eq!(harness.deps.ai.calls_of(CallKind::Tools).len(), 1);
    assert_eq!(outcome.revisions, 0);
    assert!(outcome.audit.unwrap().approved);
}

#[tokio::test]
async fn zero_revisions_means_a_single_draft() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("trabalhista")
            .with_json_response(&failing_verdict("")),
    );
    let settings = WorkflowSettings {
        max_revisions: 0,
        ..blocking()
    };
    let harness = TestHarness::with_settings(deps, settings).await;

    harness
        .orchestrator()
        .run_turn(TurnRequest::new("Férias vencidas?"))
        .await
        .unwrap();

    assert_eq!(harness.deps.ai.calls_of(CallKind::Tools).len(), 1);
}

#[tokio::test]
async fn hung_model_times_out_without_history() {
    let deps = TestDependencies::new().mock_ai(MockAI::hanging());
    let settings = WorkflowSettings {
        model_timeout: Duration::from_millis(50),
        ..fast_settings()
    };
    let harness = TestHarness::with_settings(deps, settings).await;
    let id = ConversationId::new();

    let err = harness
        .orchestrator()
        .run_turn(TurnRequest::new("Teto do MEI?").in_conversation(id))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err.user_message(), TIMEOUT_RESPONSE);
    assert!(harness.deps.conversation_store.history(id).is_empty());
}

#[tokio::test]
async fn malformed_verdict_is_absorbed() {
    // No structured response queued: the judge gets "{}".
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("simples")
            .with_tool_response("Resposta"),
    );
    let harness = TestHarness::new(deps).await;

    let outcome = harness
        .orchestrator()
        .run_turn(TurnRequest::new("Fator R?"))
        .await
        .unwrap();

    assert_eq!(outcome.response, "Resposta");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.deps.ai.calls_of(CallKind::Structured).len(), 1);
    assert!(harness.deps.audit_sink.entries().is_empty());
}

#[tokio::test]
async fn greeting_is_answered_without_format_or_audit() {
    let deps = TestDependencies::new().mock_ai(
        MockAI::new()
            .with_response("conversational")
            .with_tool_response("Olá! Como posso ajudar a sua empresa?"),
    );
    let harness = TestHarness::new(deps).await;

    let outcome = harness
        .orchestrator()
        .run_turn(TurnRequest::new("Bom dia!"))
        .await
        .unwrap();

    assert_eq!(outcome.label, ClassificationLabel::Conversational);
    assert_eq!(outcome.response, "Olá! Como posso ajudar a sua empresa?");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.deps.ai.calls_of(CallKind::Structured).is_empty());
    assert_eq!(
        harness.deps.conversation_store.history(outcome.conversation_id).len(),
        2
    );
}

#[tokio::test]
async fn legacy_transcript_seeds_a_new_conversation() {
    let deps = TestDependencies::new().mock_ai(MockAI::new().with_response("out_of_scope"));
    let harness = TestHarness::new(deps).await;

    let request = TurnRequest {
        legacy_history: Some("User: Oi\nAI: Olá! Como posso ajudar?".to_string()),
        ..TurnRequest::new("Divórcio?")
    };
    let outcome = harness.orchestrator().run_turn(request).await.unwrap();

    let history = harness.deps.conversation_store.history(outcome.conversation_id);
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].content, "Olá! Como posso ajudar?");
}
