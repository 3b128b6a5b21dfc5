//! Chat deflection: answer a customer question from the FAQ corpus or hand it
//! off to a human by opening a ticket.

pub mod classify;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::ai::prompt::{build_prompt, context_line, is_give_up};
use crate::ai::similarity::{cosine_similarity, is_rankable};
use crate::ai::{CompletionProvider, EmbeddingProvider, ProviderError};
use crate::error::TicketError;
use crate::models::ticket::TicketPriority;
use crate::repositories::{FaqRepository, NewTicket, TicketRepository};

pub use classify::{classify, subject_from_query};

/// FAQs kept as context for the completion call.
pub const TOP_K: usize = 15;
/// Top similarity below this is treated as "no good match".
pub const CONFIDENCE_THRESHOLD: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Resolved,
    Unresolved,
}

impl ChatStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Unresolved => "unresolved",
        }
    }
}

/// Result of a chat query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatOutcome {
    pub answer: String,
    pub status: ChatStatus,
    /// Human-readable code of the ticket opened for an unresolved query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    /// Similarity of the best FAQ match for a resolved query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// An FAQ with its similarity to the query.
#[derive(Debug, Clone)]
struct ScoredFaq {
    question: String,
    answer: String,
    score: f32,
}

/// A validated query and who asked it.
struct Inquiry<'a> {
    user_id: Uuid,
    requester_email: Option<String>,
    query: &'a str,
    now: DateTime<Utc>,
}

/// Why the pipeline chose to open a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandoffReason {
    LowConfidence,
    AiGaveUp,
    ProviderFailed,
}

impl HandoffReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::AiGaveUp => "ai_gave_up",
            Self::ProviderFailed => "provider_failed",
        }
    }
}

#[derive(Clone)]
pub struct DeflectionPipeline {
    tickets: TicketRepository,
    faqs: FaqRepository,
    embedder: Arc<dyn EmbeddingProvider>,
    completer: Arc<dyn CompletionProvider>,
    ai_timeout: Duration,
}

impl DeflectionPipeline {
    pub fn new(
        tickets: TicketRepository,
        faqs: FaqRepository,
        embedder: Arc<dyn EmbeddingProvider>,
        completer: Arc<dyn CompletionProvider>,
        ai_timeout: Duration,
    ) -> Self {
        Self {
            tickets,
            faqs,
            embedder,
            completer,
            ai_timeout,
        }
    }

    pub async fn handle_query(
        &self,
        user_id: Uuid,
        requester_email: Option<String>,
        query: &str,
    ) -> Result<ChatOutcome, TicketError> {
        self.handle_query_at(user_id, requester_email, query, Utc::now())
            .await
    }

    /// Runs the pipeline with an explicit clock. Provider failures never reach
    /// the caller; they open a ticket instead. FAQ store errors do propagate.
    pub async fn handle_query_at(
        &self,
        user_id: Uuid,
        requester_email: Option<String>,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatOutcome, TicketError> {
        if user_id.is_nil() {
            return Err(TicketError::validation("user_id", "user_id is required"));
        }
        let query = query.trim();
        if query.is_empty() {
            return Err(TicketError::validation("query", "query cannot be empty"));
        }

        let inquiry = Inquiry {
            user_id,
            requester_email,
            query,
            now,
        };

        let query_vector = match self.embed(query).await {
            Ok(vector) => vector,
            Err(err) => {
                tracing::warn!(error = %err, "Embedding failed, handing query off to support");
                return self
                    .hand_off(inquiry, None, HandoffReason::ProviderFailed)
                    .await;
            }
        };

        let ranked = rank(&query_vector, self.faqs.list_active().await?);
        let top_score = ranked.first().map(|faq| faq.score);
        let low_confidence = top_score.is_none_or(|score| score < CONFIDENCE_THRESHOLD);

        let context = ranked
            .iter()
            .map(|faq| context_line(&faq.question, &faq.answer))
            .collect::<Vec<_>>()
            .join("\n");

        let answer = match self.complete(&build_prompt(query, &context)).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "Completion failed, handing query off to support");
                return self
                    .hand_off(inquiry, None, HandoffReason::ProviderFailed)
                    .await;
            }
        };

        if is_give_up(&answer) {
            return self
                .hand_off(inquiry, Some(answer), HandoffReason::AiGaveUp)
                .await;
        }
        if low_confidence {
            return self
                .hand_off(inquiry, Some(answer), HandoffReason::LowConfidence)
                .await;
        }

        counter!("chat_queries_total", "outcome" => ChatStatus::Resolved.as_str()).increment(1);
        tracing::info!(user_id = %user_id, score = ?top_score, "Chat query answered from FAQ");

        Ok(ChatOutcome {
            answer,
            status: ChatStatus::Resolved,
            ticket_id: None,
            score: top_score,
        })
    }

    async fn embed(&self, query: &str) -> Result<Vec<f32>, ProviderError> {
        tokio::time::timeout(self.ai_timeout, self.embedder.embed(query))
            .await
            .map_err(|_| ProviderError::Timeout(self.ai_timeout))?
    }

    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        tokio::time::timeout(self.ai_timeout, self.completer.complete(prompt))
            .await
            .map_err(|_| ProviderError::Timeout(self.ai_timeout))?
    }

    async fn hand_off(
        &self,
        inquiry: Inquiry<'_>,
        ai_response: Option<String>,
        reason: HandoffReason,
    ) -> Result<ChatOutcome, TicketError> {
        let Inquiry {
            user_id,
            requester_email,
            query,
            now,
        } = inquiry;
        let category = classify(query);
        let ticket = self
            .tickets
            .create(
                NewTicket {
                    user_id,
                    requester_email,
                    category,
                    priority: TicketPriority::Low,
                    subject: subject_from_query(query),
                    query: query.to_string(),
                    ai_response,
                    policy_id: None,
                    claim_id: None,
                },
                now,
            )
            .await?;

        counter!(
            "chat_queries_total",
            "outcome" => ChatStatus::Unresolved.as_str(),
            "reason" => reason.as_str()
        )
        .increment(1);
        tracing::info!(
            user_id = %user_id,
            ticket_id = %ticket.ticket_id,
            category = %category,
            reason = reason.as_str(),
            "Chat query handed off to support"
        );

        Ok(ChatOutcome {
            answer: handoff_message(&ticket.ticket_id),
            status: ChatStatus::Unresolved,
            ticket_id: Some(ticket.ticket_id),
            score: None,
        })
    }
}

fn rank(query_vector: &[f32], faqs: Vec<crate::models::faq_entry::Model>) -> Vec<ScoredFaq> {
    if !is_rankable(query_vector) {
        return Vec::new();
    }

    let mut scored: Vec<ScoredFaq> = faqs
        .into_iter()
        .filter_map(|faq| {
            let embedding = faq.embedding_vector();
            if embedding.len() != query_vector.len() || !is_rankable(&embedding) {
                return None;
            }
            Some(ScoredFaq {
                score: cosine_similarity(query_vector, &embedding),
                question: faq.question,
                answer: faq.answer,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(TOP_K);
    scored
}

pub fn handoff_message(ticket_id: &str) -> String {
    format!(
        "I couldn't find a reliable answer to that, so I've passed your question to our support team. \
         Your ticket number is {ticket_id}; an agent will get back to you."
    )
}
