//! Ticket status transition rules.
//!
//! Every status write goes through [`ensure_transition`]; the table below is
//! the only place legal moves are defined.

use crate::error::TicketError;
use crate::models::ticket::TicketStatus;

/// Statuses reachable from `from` in a single step.
pub fn allowed_transitions(from: TicketStatus) -> &'static [TicketStatus] {
    use TicketStatus::*;

    match from {
        Open => &[InReview, Waiting, Resolved, Closed],
        InReview => &[Waiting, Resolved, Closed, Open],
        Waiting => &[InReview, Resolved, Closed],
        Resolved => &[Closed, Open],
        Closed => &[],
    }
}

pub fn can_transition(from: TicketStatus, to: TicketStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn ensure_transition(from: TicketStatus, to: TicketStatus) -> Result<(), TicketError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(TicketError::InvalidTransition { from, to })
    }
}

pub fn is_terminal(status: TicketStatus) -> bool {
    allowed_transitions(status).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;
    use TicketStatus::*;

    #[test]
    fn closed_is_terminal() {
        assert!(is_terminal(Closed));
        for to in TicketStatus::iter() {
            assert!(matches!(
                ensure_transition(Closed, to),
                Err(TicketError::InvalidTransition { from: Closed, .. })
            ));
        }
    }

    #[test]
    fn only_closed_is_terminal() {
        for status in TicketStatus::iter() {
            assert_eq!(is_terminal(status), status == Closed);
        }
    }

    #[test]
    fn table_matches_expected_moves() {
        assert!(can_transition(Open, InReview));
        assert!(can_transition(InReview, Open));
        assert!(can_transition(Waiting, InReview));
        assert!(can_transition(Resolved, Open));
        assert!(can_transition(Resolved, Closed));

        assert!(!can_transition(Waiting, Open));
        assert!(!can_transition(Resolved, Waiting));
        assert!(!can_transition(Resolved, InReview));
    }

    #[test]
    fn self_transitions_are_rejected() {
        for status in TicketStatus::iter() {
            assert!(!can_transition(status, status));
        }
    }
}
