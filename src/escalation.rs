//! SLA escalation sweep.
//!
//! Each sweep makes two independent passes over tickets still awaiting support
//! (OPEN or IN_REVIEW):
//!
//! * warning: deadline within the warning window, assignee gets a heads-up;
//! * breach: deadline passed, ticket forced to EMERGENCY and the admin notified.
//!
//! The `warning_sent` and `is_escalated` flags are flipped with conditional
//! updates before any email goes out, so overlapping sweeps notify at most once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::config::EscalationConfig;
use crate::error::TicketError;
use crate::mail::{EmailDispatcher, send_best_effort, sla_breach_notice, sla_warning_notice};
use crate::models::ticket::Model as Ticket;
use crate::repositories::TicketRepository;

/// Counters for one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub warning_candidates: u64,
    pub warnings_marked: u64,
    pub warnings_emailed: u64,
    pub breach_candidates: u64,
    pub escalated: u64,
    pub escalations_emailed: u64,
    pub ticket_errors: u64,
    pub failed_passes: u64,
}

#[derive(Clone)]
pub struct EscalationSweeper {
    tickets: TicketRepository,
    mailer: Arc<dyn EmailDispatcher>,
    config: EscalationConfig,
}

impl EscalationSweeper {
    pub fn new(
        tickets: TicketRepository,
        mailer: Arc<dyn EmailDispatcher>,
        config: EscalationConfig,
    ) -> Self {
        Self {
            tickets,
            mailer,
            config,
        }
    }

    pub async fn sweep(&self) -> SweepStats {
        self.sweep_at(Utc::now()).await
    }

    /// Runs both passes as of `now`. A pass that cannot load its candidates is
    /// logged and does not prevent the other pass.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();

        if let Err(err) = self.warning_pass(now, &mut stats).await {
            stats.failed_passes += 1;
            error!(error = %err, "SLA warning pass failed");
        }
        if let Err(err) = self.breach_pass(now, &mut stats).await {
            stats.failed_passes += 1;
            error!(error = %err, "SLA breach pass failed");
        }

        info!(
            warning_candidates = stats.warning_candidates,
            warnings_marked = stats.warnings_marked,
            warnings_emailed = stats.warnings_emailed,
            breach_candidates = stats.breach_candidates,
            escalated = stats.escalated,
            ticket_errors = stats.ticket_errors,
            "Escalation sweep completed"
        );

        stats
    }

    async fn warning_pass(
        &self,
        now: DateTime<Utc>,
        stats: &mut SweepStats,
    ) -> Result<(), TicketError> {
        let candidates = self
            .tickets
            .warning_candidates(now, self.config.warning_window())
            .await?;
        stats.warning_candidates = candidates.len() as u64;

        for ticket in candidates {
            match self.warn(&ticket, now).await {
                Ok(None) => {}
                Ok(Some(emailed)) => {
                    stats.warnings_marked += 1;
                    if emailed {
                        stats.warnings_emailed += 1;
                    }
                }
                Err(err) => {
                    stats.ticket_errors += 1;
                    error!(ticket_id = %ticket.ticket_id, error = %err, "Failed to record SLA warning");
                }
            }
        }

        Ok(())
    }

    /// `None` when another sweep already warned; otherwise whether an email went out.
    async fn warn(&self, ticket: &Ticket, now: DateTime<Utc>) -> Result<Option<bool>, TicketError> {
        if !self.tickets.mark_warning_sent(ticket.id, now).await? {
            debug!(ticket_id = %ticket.ticket_id, "SLA warning already recorded");
            return Ok(None);
        }
        counter!("ticket_sla_warnings_total", "priority" => ticket.priority.as_str()).increment(1);

        let Some(assignee_email) = ticket.assignee_email.as_deref() else {
            warn!(ticket_id = %ticket.ticket_id, "SLA deadline approaching but ticket has no assignee");
            return Ok(Some(false));
        };

        let remaining = ticket.sla_deadline.with_timezone(&Utc) - now;
        let notice = sla_warning_notice(ticket, assignee_email, remaining);
        Ok(Some(send_best_effort(self.mailer.as_ref(), notice).await))
    }

    async fn breach_pass(
        &self,
        now: DateTime<Utc>,
        stats: &mut SweepStats,
    ) -> Result<(), TicketError> {
        let breached = self.tickets.breached(now).await?;
        stats.breach_candidates = breached.len() as u64;

        for ticket in breached {
            match self.tickets.mark_escalated(ticket.id, now).await {
                Ok(false) => {
                    debug!(ticket_id = %ticket.ticket_id, "Ticket already escalated");
                }
                Ok(true) => {
                    stats.escalated += 1;
                    counter!("ticket_sla_escalations_total", "previous_priority" => ticket.priority.as_str())
                        .increment(1);
                    warn!(
                        ticket_id = %ticket.ticket_id,
                        previous_priority = %ticket.priority,
                        sla_deadline = %ticket.sla_deadline,
                        "SLA breached, ticket escalated to EMERGENCY"
                    );

                    let notice = sla_breach_notice(&ticket, &self.config.admin_email);
                    if send_best_effort(self.mailer.as_ref(), notice).await {
                        stats.escalations_emailed += 1;
                    }
                }
                Err(err) => {
                    stats.ticket_errors += 1;
                    error!(ticket_id = %ticket.ticket_id, error = %err, "Failed to escalate ticket");
                }
            }
        }

        Ok(())
    }
}
