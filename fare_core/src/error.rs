// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Module containing the error type of the issuer and the validation engine.
//!
//! Rejected scans are not errors: they are reported as
//! [`crate::validation::ValidationOutcome::Rejected`]. The variants below are
//! conditions the caller has to react to (retry later, alert, abort).

use fare_payload::TicketId;

use crate::ticket::TicketStatus;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to get current system time: {source_error_message} ")]
    InvalidSystemTime { source_error_message: String },

    #[error("Error from adapter.\n Caused by: {source_error}")]
    AdapterError { source_error: anyhow::Error },

    /// The store reported an id conflict twice in a row while issuing.
    #[error("Ticket id {ticket_id} collided again after regenerating it, giving up")]
    IdCollision { ticket_id: TicketId },

    /// Every attempt to commit a decision lost the race against a concurrent
    /// update. The scan can be presented again.
    #[error("Ticket {ticket_id} was updated concurrently {attempts} times in a row, try again")]
    Contention { ticket_id: TicketId, attempts: u32 },

    #[error("Ticket {ticket_id} does not exist")]
    TicketNotFound { ticket_id: TicketId },

    #[error("Ticket {ticket_id} is {status} and can no longer change state")]
    TicketNotActive {
        ticket_id: TicketId,
        status: TicketStatus,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn adapter<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::AdapterError {
            source_error: anyhow::Error::new(err),
        }
    }

    /// Whether presenting the same request again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Contention { .. } | Error::AdapterError { .. })
    }
}
