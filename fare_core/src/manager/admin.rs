// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use fare_payload::TicketId;
use log::{debug, info};

use super::{
    adapters::{TicketRead, TicketUpdate, UpdateOutcome},
    DEFAULT_MAX_ATTEMPTS,
};
use crate::{
    ticket::{StateChange, Ticket},
    Error,
};

/// Operator actions on ticket records.
pub struct TicketAdmin<E> {
    /// Context that implements adapters
    context: E,
    max_attempts: u32,
}

impl<E> TicketAdmin<E> {
    pub fn new(context: E) -> Self {
        Self {
            context,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

impl<E> TicketAdmin<E>
where
    E: TicketRead + TicketUpdate,
{
    /// Withdraws an `Active` ticket and returns the revoked record. Later
    /// scans are rejected as `AlreadyTerminal(Revoked)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TicketNotFound`] if the ticket does not exist.
    ///
    /// Returns [`Error::TicketNotActive`] if the ticket is already in a
    /// terminal state.
    ///
    /// Returns [`Error::Contention`] if the record kept changing underneath,
    /// and [`Error::AdapterError`] if the store fails.
    pub async fn revoke(&self, ticket_id: TicketId) -> Result<Ticket, Error> {
        for _ in 0..self.max_attempts {
            let ticket = self
                .context
                .ticket(ticket_id)
                .await
                .map_err(Error::adapter)?
                .ok_or(Error::TicketNotFound { ticket_id })?;
            if ticket.status.is_terminal() {
                return Err(Error::TicketNotActive {
                    ticket_id,
                    status: ticket.status,
                });
            }

            match self
                .context
                .conditional_update(ticket_id, ticket.version, StateChange::revoke(&ticket))
                .await
                .map_err(Error::adapter)?
            {
                UpdateOutcome::Applied(revoked) => {
                    info!("Ticket {ticket_id} revoked");
                    return Ok(revoked);
                }
                UpdateOutcome::NotFound => return Err(Error::TicketNotFound { ticket_id }),
                UpdateOutcome::VersionMismatch => {
                    debug!("Ticket {ticket_id} changed while revoking, retrying")
                }
            }
        }

        Err(Error::Contention {
            ticket_id,
            attempts: self.max_attempts,
        })
    }
}
