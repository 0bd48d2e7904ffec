// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Scan decisions
//!
//! [`evaluate`] is the whole validation policy as a pure function of the
//! current ticket record and the scan time. It never touches the store: the
//! [`crate::manager::ValidationEngine`] commits the [`StateChange`] it returns
//! with a conditional update, and evaluates again on a fresh record if a
//! concurrent scan got there first.

use fare_payload::TicketId;
use serde::{Deserialize, Serialize};

use crate::ticket::{StateChange, Ticket, TicketStatus};

/// Why a scan was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The payload could not be decoded.
    Malformed,
    /// The signature does not verify, or its key epoch is not trusted.
    BadSignature,
    /// No ticket with this id exists.
    Unknown,
    /// The payload is authentic but disagrees with the stored record.
    ClaimsMismatch,
    /// The ticket was already exhausted, expired or revoked.
    AlreadyTerminal(TicketStatus),
    /// The ticket expired; this scan recorded the expiry.
    Expired,
}

/// Result of presenting a ticket to a validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    Accepted {
        ticket_id: TicketId,
        /// Rides left after this scan, `None` for timed passes.
        remaining_after: Option<u16>,
    },
    Rejected(RejectReason),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted { .. })
    }
}

/// Decision taken on a ticket record, before it is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Accept {
        change: StateChange,
        remaining_after: Option<u16>,
    },
    Reject {
        reason: RejectReason,
        /// Transition recorded by the rejection itself (expiry), if any.
        change: Option<StateChange>,
    },
}

/// Decides on a scan of `ticket` at `now_ns`.
///
/// Checks, in order: terminal status, then expiry. A ticket scanned after its
/// deadline is rejected and moved to `Expired` in the same step.
pub fn evaluate(ticket: &Ticket, now_ns: u64) -> Evaluation {
    if ticket.status.is_terminal() {
        return Evaluation::Reject {
            reason: RejectReason::AlreadyTerminal(ticket.status),
            change: None,
        };
    }

    if ticket.is_expired_at(now_ns) {
        return Evaluation::Reject {
            reason: RejectReason::Expired,
            change: Some(StateChange::expire(ticket)),
        };
    }

    if ticket.rides_remaining == Some(0) {
        // only reachable for records not written through StateChange
        return Evaluation::Reject {
            reason: RejectReason::AlreadyTerminal(TicketStatus::Exhausted),
            change: None,
        };
    }

    let change = StateChange::consume(ticket, now_ns);
    Evaluation::Accept {
        change,
        remaining_after: change.rides_remaining(),
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU16;

    use fare_payload::{KeyEpoch, TicketType};
    use rstest::*;

    use super::*;
    use crate::ticket::{IssuancePolicy, OwnerId};

    const ISSUED_AT_NS: u64 = 1_000_000_000_000;
    const SECOND_NS: u64 = 1_000_000_000;

    fn ticket(ticket_type: TicketType) -> Ticket {
        Ticket::issue(
            TicketId::new_random(),
            OwnerId::new("rider"),
            ticket_type,
            KeyEpoch(0),
            ISSUED_AT_NS,
            &IssuancePolicy::default(),
        )
    }

    #[rstest]
    #[case(TicketStatus::Exhausted)]
    #[case(TicketStatus::Expired)]
    #[case(TicketStatus::Revoked)]
    fn terminal_tickets_are_rejected_without_change(#[case] status: TicketStatus) {
        let mut ticket = ticket(TicketType::SingleRide);
        ticket.status = status;

        assert_eq!(
            evaluate(&ticket, ISSUED_AT_NS),
            Evaluation::Reject {
                reason: RejectReason::AlreadyTerminal(status),
                change: None,
            }
        );
    }

    #[test]
    fn terminal_status_wins_over_expiry() {
        let mut ticket = ticket(TicketType::TimedPass { duration_secs: 1 });
        ticket.status = TicketStatus::Revoked;

        assert!(matches!(
            evaluate(&ticket, ISSUED_AT_NS + 10 * SECOND_NS),
            Evaluation::Reject {
                reason: RejectReason::AlreadyTerminal(TicketStatus::Revoked),
                ..
            }
        ));
    }

    #[rstest]
    #[case::before_deadline(ISSUED_AT_NS + 59 * SECOND_NS, true)]
    #[case::at_deadline(ISSUED_AT_NS + 60 * SECOND_NS, true)]
    #[case::after_deadline(ISSUED_AT_NS + 61 * SECOND_NS, false)]
    fn timed_pass_is_bounded_by_its_deadline(#[case] now_ns: u64, #[case] accepted: bool) {
        let ticket = ticket(TicketType::TimedPass { duration_secs: 60 });

        match evaluate(&ticket, now_ns) {
            Evaluation::Accept {
                change,
                remaining_after,
            } => {
                assert!(accepted);
                assert_eq!(remaining_after, None);
                assert_eq!(change.status(), TicketStatus::Active);
            }
            Evaluation::Reject { reason, change } => {
                assert!(!accepted);
                assert_eq!(reason, RejectReason::Expired);
                assert_eq!(change.map(|c| c.status()), Some(TicketStatus::Expired));
            }
        }
    }

    #[test]
    fn last_ride_is_accepted_and_exhausts() {
        let ticket = ticket(TicketType::MultiRide {
            rides: NonZeroU16::new(1).unwrap(),
        });

        let Evaluation::Accept {
            change,
            remaining_after,
        } = evaluate(&ticket, ISSUED_AT_NS)
        else {
            panic!("last ride must be accepted");
        };
        assert_eq!(remaining_after, Some(0));
        assert_eq!(change.status(), TicketStatus::Exhausted);
    }

    #[test]
    fn empty_active_record_is_not_consumed() {
        let mut ticket = ticket(TicketType::SingleRide);
        ticket.rides_remaining = Some(0);

        assert_eq!(
            evaluate(&ticket, ISSUED_AT_NS),
            Evaluation::Reject {
                reason: RejectReason::AlreadyTerminal(TicketStatus::Exhausted),
                change: None,
            }
        );
    }
}
