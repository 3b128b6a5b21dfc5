//! SLA deadline calculation.

use chrono::{DateTime, Duration, TimeZone};

use crate::models::ticket::TicketPriority;

/// SLA response window for a priority level.
pub fn sla_window(priority: TicketPriority) -> Duration {
    match priority {
        TicketPriority::Emergency => Duration::hours(2),
        TicketPriority::High => Duration::hours(24),
        TicketPriority::Medium => Duration::hours(48),
        TicketPriority::Low => Duration::hours(72),
    }
}

/// Absolute deadline for a ticket created at `now` with `priority`.
pub fn compute_deadline<Tz: TimeZone>(priority: TicketPriority, now: DateTime<Tz>) -> DateTime<Tz> {
    now + sla_window(priority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::Iterable;

    #[test]
    fn offsets_match_priority_table() {
        let now = Utc::now();
        assert_eq!(compute_deadline(TicketPriority::Emergency, now) - now, Duration::hours(2));
        assert_eq!(compute_deadline(TicketPriority::High, now) - now, Duration::hours(24));
        assert_eq!(compute_deadline(TicketPriority::Medium, now) - now, Duration::hours(48));
        assert_eq!(compute_deadline(TicketPriority::Low, now) - now, Duration::hours(72));
    }

    #[test]
    fn more_urgent_priorities_never_get_later_deadlines() {
        let now = Utc::now();
        for a in TicketPriority::iter() {
            for b in TicketPriority::iter() {
                if a.urgency() > b.urgency() {
                    assert!(compute_deadline(a, now) <= compute_deadline(b, now));
                }
            }
        }
    }

    #[test]
    fn unrecognised_labels_get_the_low_window() {
        let now = Utc::now();
        let deadline = compute_deadline(TicketPriority::from_label("whenever"), now);
        assert_eq!(deadline - now, Duration::hours(72));
    }
}
