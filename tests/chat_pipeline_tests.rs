//! Chat deflection: answering from the FAQ corpus versus handing off to support.

mod test_utils;

use std::sync::Arc;
use std::time::Duration;

use coverdesk::chat::{ChatStatus, DeflectionPipeline};
use coverdesk::error::TicketError;
use coverdesk::models::ticket::{TicketCategory, TicketPriority, TicketStatus};
use coverdesk::repositories::{FaqRepository, NewFaqEntry, TicketRepository};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use test_utils::{ScriptedCompleter, StaticEmbedder, setup_test_db, t0};
use uuid::Uuid;

const AI_TIMEOUT: Duration = Duration::from_millis(200);

async fn seed_faq(db: &DatabaseConnection, question: &str, answer: &str, embedding: Vec<f32>) {
    FaqRepository::new(db.clone())
        .create(
            NewFaqEntry {
                question: question.to_string(),
                answer: answer.to_string(),
                category: TicketCategory::Policy,
                embedding,
            },
            t0(),
        )
        .await
        .unwrap();
}

fn pipeline(
    db: &DatabaseConnection,
    embedder: StaticEmbedder,
    completer: Arc<ScriptedCompleter>,
) -> DeflectionPipeline {
    DeflectionPipeline::new(
        TicketRepository::new(db.clone()),
        FaqRepository::new(db.clone()),
        Arc::new(embedder),
        completer,
        AI_TIMEOUT,
    )
}

/// Unit vector whose cosine similarity with `[1, 0]` is `score`.
fn at_similarity(score: f32) -> Vec<f32> {
    vec![score, (1.0 - score * score).sqrt()]
}

#[tokio::test]
async fn confident_match_is_answered_without_ticket() {
    let db = setup_test_db().await.unwrap();
    seed_faq(&db, "How do I file a claim?", "Use the Claims tab.", vec![1.0, 0.0]).await;
    seed_faq(&db, "What is a deductible?", "The part you pay.", vec![0.0, 1.0]).await;

    let completer = Arc::new(ScriptedCompleter::answering("Open the Claims tab and press New."));
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer.clone());

    let outcome = pipeline
        .handle_query_at(Uuid::new_v4(), None, "How can I file a claim?", t0())
        .await
        .unwrap();

    assert_eq!(outcome.status, ChatStatus::Resolved);
    assert_eq!(outcome.answer, "Open the Claims tab and press New.");
    assert!(outcome.ticket_id.is_none());
    assert!((outcome.score.unwrap() - 1.0).abs() < 1e-6);

    let prompts = completer.prompts();
    assert_eq!(prompts.len(), 1);
    let claim_line = prompts[0].find("Q: How do I file a claim? A: Use the Claims tab.").unwrap();
    let deductible_line = prompts[0].find("Q: What is a deductible?").unwrap();
    assert!(claim_line < deductible_line, "best match should come first");

    let (tickets, total) = TicketRepository::new(db)
        .list(&Default::default(), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(tickets.is_empty());
}

#[tokio::test]
async fn score_just_below_threshold_opens_ticket_even_when_ai_is_confident() {
    let db = setup_test_db().await.unwrap();
    seed_faq(&db, "Is flood damage covered?", "Only with the flood add-on.", at_similarity(0.59)).await;

    let completer = Arc::new(ScriptedCompleter::answering("Yes, flood damage is covered."));
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer);
    let user = Uuid::new_v4();

    let outcome = pipeline
        .handle_query_at(
            user,
            Some("jane@example.com".to_string()),
            "Does my policy cover flood damage in the basement?",
            t0(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.status, ChatStatus::Unresolved);
    assert!(outcome.score.is_none());
    let code = outcome.ticket_id.expect("ticket opened");
    assert!(outcome.answer.contains(&code));

    let ticket = TicketRepository::new(db).find_by_ref(&code).await.unwrap();
    assert_eq!(ticket.user_id, user);
    assert_eq!(ticket.requester_email.as_deref(), Some("jane@example.com"));
    assert_eq!(ticket.status, TicketStatus::Open);
    assert_eq!(ticket.priority, TicketPriority::Low);
    assert_eq!(ticket.category, TicketCategory::Policy);
    assert_eq!(ticket.subject, "Does my policy cover flood...");
    assert_eq!(
        ticket.ai_response.as_deref(),
        Some("Yes, flood damage is covered.")
    );
}

#[tokio::test]
async fn ai_giving_up_opens_ticket() {
    let db = setup_test_db().await.unwrap();
    seed_faq(&db, "How do I pay my premium?", "Use autopay.", vec![1.0, 0.0]).await;

    let completer = Arc::new(ScriptedCompleter::answering("I'm sorry, I don't know."));
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer);

    let outcome = pipeline
        .handle_query_at(Uuid::new_v4(), None, "Why was my bill higher this month?", t0())
        .await
        .unwrap();

    assert_eq!(outcome.status, ChatStatus::Unresolved);
    let ticket = TicketRepository::new(db)
        .find_by_ref(outcome.ticket_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(ticket.category, TicketCategory::Payment);
}

#[tokio::test]
async fn empty_corpus_still_consults_ai_and_keeps_its_draft() {
    let db = setup_test_db().await.unwrap();
    let completer = Arc::new(ScriptedCompleter::answering("Please file a claim in the app."));
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer.clone());

    let outcome = pipeline
        .handle_query_at(Uuid::new_v4(), None, "I was in an accident", t0())
        .await
        .unwrap();

    assert_eq!(outcome.status, ChatStatus::Unresolved);
    assert_eq!(completer.prompts().len(), 1);
    assert!(completer.prompts()[0].contains("I was in an accident"));
    let ticket = TicketRepository::new(db)
        .find_by_ref(outcome.ticket_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(ticket.category, TicketCategory::Claim);
    assert_eq!(
        ticket.ai_response.as_deref(),
        Some("Please file a claim in the app.")
    );
}

#[tokio::test]
async fn faq_store_failure_is_reported_not_ticketed() {
    let db = setup_test_db().await.unwrap();
    let completer = Arc::new(ScriptedCompleter::answering("unused"));
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer.clone());

    db.execute_unprepared("DROP TABLE faq_entries").await.unwrap();

    let result = pipeline
        .handle_query_at(Uuid::new_v4(), None, "How do I change my plan?", t0())
        .await;

    assert!(matches!(result, Err(TicketError::Database(_))));
    assert!(completer.prompts().is_empty());
    let (tickets, total) = TicketRepository::new(db)
        .list(&Default::default(), 1, 10)
        .await
        .unwrap();
    assert!(tickets.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn provider_failures_degrade_to_ticket() {
    let db = setup_test_db().await.unwrap();
    seed_faq(&db, "How do I reset my password?", "Use the login screen.", vec![1.0, 0.0]).await;

    let embed_down = pipeline(
        &db,
        StaticEmbedder::failing(),
        Arc::new(ScriptedCompleter::answering("unused")),
    );
    let outcome = embed_down
        .handle_query_at(Uuid::new_v4(), None, "I cannot log in", t0())
        .await
        .unwrap();
    assert_eq!(outcome.status, ChatStatus::Unresolved);

    let completion_down = pipeline(
        &db,
        StaticEmbedder::new(vec![1.0, 0.0]),
        Arc::new(ScriptedCompleter::failing(500)),
    );
    let outcome = completion_down
        .handle_query_at(Uuid::new_v4(), None, "I cannot log in", t0())
        .await
        .unwrap();
    assert_eq!(outcome.status, ChatStatus::Unresolved);
    let ticket = TicketRepository::new(db.clone())
        .find_by_ref(outcome.ticket_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(ticket.category, TicketCategory::Account);
}

#[tokio::test]
async fn slow_completion_times_out_into_ticket() {
    let db = setup_test_db().await.unwrap();
    seed_faq(&db, "How do I add a driver?", "Edit your policy.", vec![1.0, 0.0]).await;

    let completer = Arc::new(
        ScriptedCompleter::answering("Edit your policy.").delayed(Duration::from_secs(5)),
    );
    let pipeline = pipeline(&db, StaticEmbedder::new(vec![1.0, 0.0]), completer);

    let started = std::time::Instant::now();
    let outcome = pipeline
        .handle_query_at(Uuid::new_v4(), None, "How do I add my son as a driver", t0())
        .await
        .unwrap();

    assert_eq!(outcome.status, ChatStatus::Unresolved);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn blank_query_or_user_is_rejected() {
    let db = setup_test_db().await.unwrap();
    let pipeline = pipeline(
        &db,
        StaticEmbedder::new(vec![1.0, 0.0]),
        Arc::new(ScriptedCompleter::answering("unused")),
    );

    let blank = pipeline
        .handle_query_at(Uuid::new_v4(), None, "   ", t0())
        .await
        .unwrap_err();
    assert!(matches!(blank, TicketError::Validation { field: Some("query"), .. }));

    let anonymous = pipeline
        .handle_query_at(Uuid::nil(), None, "hello", t0())
        .await
        .unwrap_err();
    assert!(matches!(anonymous, TicketError::Validation { field: Some("user_id"), .. }));
}
