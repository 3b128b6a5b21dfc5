//! Shared fixtures for integration tests: an in-memory database with the schema
//! applied, recording mail dispatcher and scripted AI providers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use coverdesk::ai::{CompletionProvider, EmbeddingProvider, ProviderError};
use coverdesk::mail::{EmailDispatcher, EmailMessage, MailError};
use coverdesk::models::ticket::{Model as Ticket, TicketCategory, TicketPriority};
use coverdesk::repositories::{NewTicket, TicketRepository};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

/// In-memory SQLite database with all migrations applied. A single pooled
/// connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Fixed reference instant used by time-sensitive tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid instant")
}

pub fn draft(user_id: Uuid, priority: TicketPriority, subject: &str) -> NewTicket {
    NewTicket {
        user_id,
        requester_email: Some("requester@example.com".to_string()),
        category: TicketCategory::Claim,
        priority,
        subject: subject.to_string(),
        query: format!("{subject}, please help"),
        ai_response: None,
        policy_id: None,
        claim_id: None,
    }
}

pub async fn create_ticket(
    repo: &TicketRepository,
    priority: TicketPriority,
    now: DateTime<Utc>,
) -> Ticket {
    repo.create(draft(Uuid::new_v4(), priority, "Windshield damage"), now)
        .await
        .expect("ticket created")
}

/// Mail dispatcher that records every message, optionally failing each send.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    /// Messages handed to the dispatcher, including failed attempts.
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailDispatcher for RecordingDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        if self.fail {
            Err(MailError::Transport("relay refused connection".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Embedder returning fixed vectors per text, with a fallback for unknown text.
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: Some(fallback),
        }
    }

    pub fn failing() -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: None,
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.vectors
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 503,
                body: "embedding backend down".to_string(),
            })
    }
}

/// Completion provider with a canned reply, optional delay, and a record of prompts.
pub struct ScriptedCompleter {
    reply: Result<String, u16>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompleter {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompleter {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(status) => Err(ProviderError::Status {
                status: *status,
                body: "upstream error".to_string(),
            }),
        }
    }
}
