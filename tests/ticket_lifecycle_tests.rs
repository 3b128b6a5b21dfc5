//! Ticket store and lifecycle behaviour against an in-memory database.

mod test_utils;

use chrono::Duration;
use coverdesk::error::TicketError;
use coverdesk::models::ticket::{TicketPriority, TicketStatus};
use coverdesk::repositories::{TicketFilter, TicketRepository, ticket::is_ticket_code};
use coverdesk::tickets::{CreateTicket, TicketService};
use test_utils::{RecordingDispatcher, create_ticket, draft, setup_test_db, t0};
use uuid::Uuid;

#[tokio::test]
async fn create_sets_code_deadline_and_initial_flags() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);

    let ticket = create_ticket(&repo, TicketPriority::High, t0()).await;

    assert!(is_ticket_code(&ticket.ticket_id), "bad code {}", ticket.ticket_id);
    assert_eq!(ticket.status, TicketStatus::Open);
    assert!(!ticket.warning_sent);
    assert!(!ticket.is_escalated);
    assert_eq!(ticket.sla_deadline, (t0() + Duration::hours(24)).fixed_offset());
}

#[tokio::test]
async fn ticket_code_collision_is_retried() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);

    let first = repo
        .create_with_codes(draft(Uuid::new_v4(), TicketPriority::Low, "First"), t0(), || {
            "TKT-AAAAAAAA".to_string()
        })
        .await
        .unwrap();
    assert_eq!(first.ticket_id, "TKT-AAAAAAAA");

    let mut candidates = vec!["TKT-BBBBBBBB", "TKT-AAAAAAAA"];
    let second = repo
        .create_with_codes(draft(Uuid::new_v4(), TicketPriority::Low, "Second"), t0(), || {
            candidates.pop().unwrap().to_string()
        })
        .await
        .unwrap();
    assert_eq!(second.ticket_id, "TKT-BBBBBBBB");
}

#[tokio::test]
async fn exhausted_code_attempts_surface_as_domain_error() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let fixed = || "TKT-CCCCCCCC".to_string();

    repo.create_with_codes(draft(Uuid::new_v4(), TicketPriority::Low, "One"), t0(), fixed)
        .await
        .unwrap();
    let err = repo
        .create_with_codes(draft(Uuid::new_v4(), TicketPriority::Low, "Two"), t0(), fixed)
        .await
        .unwrap_err();

    assert!(matches!(err, TicketError::IdGenerationExhausted { .. }));
}

#[tokio::test]
async fn find_by_reference_accepts_uuid_and_code() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let ticket = create_ticket(&repo, TicketPriority::Medium, t0()).await;

    let by_pk = repo.find_by_ref(&ticket.id.to_string()).await.unwrap();
    let by_code = repo
        .find_by_ref(&ticket.ticket_id.to_lowercase())
        .await
        .unwrap();
    assert_eq!(by_pk.id, ticket.id);
    assert_eq!(by_code.id, ticket.id);

    let missing = repo.find_by_ref("TKT-ZZZZZZZZ").await.unwrap_err();
    assert!(matches!(missing, TicketError::NotFound { .. }));
}

#[tokio::test]
async fn list_filters_by_requester_status_and_subject() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    for (offset, subject) in ["Broken windshield", "Premium refund", "Windshield again"]
        .iter()
        .enumerate()
    {
        repo.create(
            draft(alice, TicketPriority::Low, subject),
            t0() + Duration::minutes(offset as i64),
        )
        .await
        .unwrap();
    }
    repo.create(draft(bob, TicketPriority::Low, "Windshield for bob"), t0())
        .await
        .unwrap();

    let (items, total) = repo
        .list(
            &TicketFilter {
                user_id: Some(alice),
                search: Some("WINDSHIELD".to_string()),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    // newest first
    assert_eq!(items[0].subject, "Windshield again");
    assert_eq!(items[1].subject, "Broken windshield");

    let (page_two, total) = repo
        .list(
            &TicketFilter {
                user_id: Some(alice),
                ..Default::default()
            },
            2,
            2,
        )
        .await
        .unwrap();
    assert_eq!(total, 3);
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].subject, "Broken windshield");

    let (closed, total) = repo
        .list(
            &TicketFilter {
                status: Some(TicketStatus::Closed),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert!(closed.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn messages_keep_insertion_order() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let ticket = create_ticket(&repo, TicketPriority::Low, t0()).await;

    for body in ["first", "second", "third"] {
        repo.append_message(ticket.id, ticket.user_id, body.to_string(), vec![], t0())
            .await
            .unwrap();
    }
    repo.append_message(
        ticket.id,
        Uuid::new_v4(),
        "photo attached".to_string(),
        vec!["upload/abc123".to_string()],
        t0(),
    )
    .await
    .unwrap();

    let bodies: Vec<String> = repo
        .messages(ticket.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.body)
        .collect();
    assert_eq!(bodies, vec!["first", "second", "third", "photo attached"]);
}

#[tokio::test]
async fn closed_ticket_rejects_replies_and_further_transitions() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let ticket = create_ticket(&repo, TicketPriority::Low, t0()).await;

    let closed = repo
        .update_status_checked(&ticket, TicketStatus::Closed, t0())
        .await
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    let reply = repo
        .append_message(closed.id, closed.user_id, "hello?".to_string(), vec![], t0())
        .await
        .unwrap_err();
    assert!(matches!(reply, TicketError::TicketClosed { .. }));
    assert!(repo.messages(closed.id).await.unwrap().is_empty());

    let reopen = repo
        .update_status_checked(&closed, TicketStatus::Open, t0())
        .await
        .unwrap_err();
    assert!(matches!(
        reopen,
        TicketError::InvalidTransition {
            from: TicketStatus::Closed,
            to: TicketStatus::Open
        }
    ));

    let assign = repo
        .set_assignee(&closed, Uuid::new_v4(), None, t0())
        .await
        .unwrap_err();
    assert!(matches!(assign, TicketError::TicketClosed { .. }));
}

#[tokio::test]
async fn stale_status_write_is_a_conflict() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let ticket = create_ticket(&repo, TicketPriority::Low, t0()).await;

    repo.update_status_checked(&ticket, TicketStatus::InReview, t0())
        .await
        .unwrap();

    // `ticket` still says OPEN
    let err = repo
        .update_status_checked(&ticket, TicketStatus::Waiting, t0())
        .await
        .unwrap_err();
    assert!(matches!(err, TicketError::Conflict { .. }));

    let current = repo.find_by_pk(ticket.id).await.unwrap();
    assert_eq!(current.status, TicketStatus::InReview);
}

#[tokio::test]
async fn priority_change_keeps_original_deadline() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let ticket = create_ticket(&repo, TicketPriority::Low, t0()).await;

    let updated = repo
        .set_priority(&ticket, TicketPriority::Emergency, t0() + Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(updated.priority, TicketPriority::Emergency);
    assert_eq!(updated.sla_deadline, ticket.sla_deadline);
}

#[tokio::test]
async fn transition_notifies_requester_and_survives_mail_failure() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);

    let mailer = RecordingDispatcher::new();
    let service = TicketService::new(repo.clone(), mailer.clone());
    let ticket = create_ticket(&repo, TicketPriority::Medium, t0()).await;

    let updated = service
        .transition(&ticket, TicketStatus::InReview, t0())
        .await
        .unwrap();
    assert_eq!(updated.status, TicketStatus::InReview);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "requester@example.com");
    assert!(sent[0].subject.contains(&ticket.ticket_id));
    assert!(sent[0].body.contains("IN_REVIEW"));

    let broken_mailer = RecordingDispatcher::failing();
    let service = TicketService::new(repo.clone(), broken_mailer.clone());
    let resolved = service
        .transition(&updated, TicketStatus::Resolved, t0())
        .await
        .unwrap();
    assert_eq!(broken_mailer.sent().len(), 1);
    assert_eq!(
        repo.find_by_pk(ticket.id).await.unwrap().status,
        resolved.status
    );
}

#[tokio::test]
async fn service_validates_and_parses_priority_leniently() {
    let db = setup_test_db().await.unwrap();
    let service = TicketService::new(TicketRepository::new(db), RecordingDispatcher::new());
    let user = Uuid::new_v4();

    let input = |subject: &str, priority: Option<&str>| CreateTicket {
        subject: subject.to_string(),
        query: "My claim has been pending for weeks".to_string(),
        category: coverdesk::models::ticket::TicketCategory::Claim,
        priority: priority.map(str::to_string),
        policy_id: Some(Uuid::new_v4()),
        claim_id: None,
    };

    let urgent = service
        .create(user, None, input("Claim stuck", Some("urgent")), t0())
        .await
        .unwrap();
    assert_eq!(urgent.priority, TicketPriority::Emergency);
    assert_eq!(urgent.sla_deadline, (t0() + Duration::hours(2)).fixed_offset());
    assert!(urgent.policy_id.is_some());

    let unknown = service
        .create(user, None, input("Claim stuck", Some("whenever")), t0())
        .await
        .unwrap();
    assert_eq!(unknown.priority, TicketPriority::Low);

    let blank = service
        .create(user, None, input("   ", None), t0())
        .await
        .unwrap_err();
    assert!(matches!(blank, TicketError::Validation { field: Some("subject"), .. }));
}

#[tokio::test]
async fn assignment_records_agent_and_emails_them() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);
    let mailer = RecordingDispatcher::new();
    let service = TicketService::new(repo.clone(), mailer.clone());
    let ticket = create_ticket(&repo, TicketPriority::High, t0()).await;
    let agent = Uuid::new_v4();

    let assigned = service
        .assign(&ticket, agent, Some("agent@coverdesk.local".to_string()), t0())
        .await
        .unwrap();

    assert_eq!(assigned.assigned_to, Some(agent));
    assert_eq!(assigned.assignee_email.as_deref(), Some("agent@coverdesk.local"));
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "agent@coverdesk.local");

    let nobody = service
        .assign(&ticket, Uuid::nil(), None, t0())
        .await
        .unwrap_err();
    assert!(matches!(nobody, TicketError::Validation { .. }));
}

#[tokio::test]
async fn stale_copy_cannot_assign_or_reprioritize_after_close() {
    let db = setup_test_db().await.unwrap();
    let repo = TicketRepository::new(db);

    let stale = create_ticket(&repo, TicketPriority::Medium, t0()).await;
    repo.update_status_checked(&stale, TicketStatus::Closed, t0())
        .await
        .unwrap();

    let assigned = repo
        .set_assignee(&stale, Uuid::new_v4(), Some("agent@coverdesk.local".to_string()), t0())
        .await;
    assert!(matches!(assigned, Err(TicketError::TicketClosed { .. })));

    let reprioritized = repo.set_priority(&stale, TicketPriority::High, t0()).await;
    assert!(matches!(reprioritized, Err(TicketError::TicketClosed { .. })));

    let stored = repo.find_by_pk(stale.id).await.unwrap();
    assert_eq!(stored.status, TicketStatus::Closed);
    assert_eq!(stored.assigned_to, None);
    assert_eq!(stored.assignee_email, None);
    assert_eq!(stored.priority, TicketPriority::Medium);
}
