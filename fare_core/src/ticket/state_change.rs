// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::{Ticket, TicketStatus};

/// The new mutable fields of a ticket, committed by a conditional update.
///
/// Only built through the constructors below, so a change can never leave a
/// ticket with no rides left while still `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    rides_remaining: Option<u16>,
    status: TicketStatus,
    validated_at_ns: Option<u64>,
}

impl StateChange {
    /// One accepted scan of `ticket` at `now_ns`.
    ///
    /// Ride-counted tickets lose one ride and become `Exhausted` with the last
    /// one; timed passes keep their (absent) counter.
    pub fn consume(ticket: &Ticket, now_ns: u64) -> Self {
        let rides_remaining = ticket.rides_remaining.map(|rides| rides.saturating_sub(1));
        let status = match rides_remaining {
            Some(0) => TicketStatus::Exhausted,
            _ => TicketStatus::Active,
        };
        Self {
            rides_remaining,
            status,
            validated_at_ns: Some(now_ns),
        }
    }

    pub fn expire(ticket: &Ticket) -> Self {
        Self::terminate(ticket, TicketStatus::Expired)
    }

    pub fn revoke(ticket: &Ticket) -> Self {
        Self::terminate(ticket, TicketStatus::Revoked)
    }

    fn terminate(ticket: &Ticket, status: TicketStatus) -> Self {
        Self {
            rides_remaining: ticket.rides_remaining,
            status,
            validated_at_ns: None,
        }
    }

    pub fn rides_remaining(&self) -> Option<u16> {
        self.rides_remaining
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    /// Time of the accepted scan this change records, if any.
    pub fn validated_at_ns(&self) -> Option<u64> {
        self.validated_at_ns
    }
}
