// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use fare_payload::{KeyRing, PayloadError, SignedPayload, TicketClaims, TicketId};
use log::{debug, info, warn};

use super::adapters::{TicketRead, TicketUpdate, UpdateOutcome};
use crate::{
    ticket::TicketStatus,
    validation::{evaluate, Evaluation, RejectReason, ValidationOutcome},
    Error,
};

/// Number of read-evaluate-update cycles tried before giving up on a ticket
/// that keeps being updated concurrently.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// The ticket validation state machine.
///
/// Holds no lock and no per-ticket state: each scan reads the live record,
/// evaluates it, and commits the result with a conditional update on the
/// record's version. Losing that race restarts the cycle on a fresh record,
/// so a fare unit is consumed at most once however many validators scan it
/// at the same time.
pub struct ValidationEngine<E> {
    /// Context that implements adapters
    context: E,
    key_ring: KeyRing,
    max_attempts: u32,
}

/// What to do with an acceptable scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanMode {
    Consume,
    Inspect,
}

impl<E> ValidationEngine<E> {
    pub fn new(context: E, key_ring: KeyRing) -> Self {
        Self {
            context,
            key_ring,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the retry bound on contention. At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn key_ring(&self) -> &KeyRing {
        &self.key_ring
    }

    pub fn context(&self) -> &E {
        &self.context
    }

    /// Decodes `payload` and verifies its signature. Fails closed: any error
    /// is a rejection.
    pub fn authenticate(&self, payload: &str) -> Result<SignedPayload, RejectReason> {
        let signed = SignedPayload::from_qr_string(payload).map_err(|err| {
            match &err {
                PayloadError::UnsupportedVersion { .. } => {
                    warn!("Rejected payload with unsupported version: {err}")
                }
                _ => warn!("Rejected malformed payload: {err}"),
            }
            RejectReason::Malformed
        })?;

        signed.verify(&self.key_ring).map_err(|err| {
            warn!(
                "Rejected payload for ticket {}: {err}",
                signed.claims.ticket_id
            );
            RejectReason::BadSignature
        })?;

        Ok(signed)
    }
}

impl<E> ValidationEngine<E>
where
    E: TicketRead + TicketUpdate,
{
    /// Validates a scanned payload at `now_ns`, consuming one ride (or
    /// recording one use of a timed pass) when it is accepted.
    ///
    /// Every refusal is reported as [`ValidationOutcome::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contention`] if the ticket was updated concurrently on
    /// every attempt.
    ///
    /// Returns [`Error::AdapterError`] if the store fails.
    pub async fn validate(&self, payload: &str, now_ns: u64) -> Result<ValidationOutcome, Error> {
        match self.authenticate(payload) {
            Ok(signed) => {
                self.scan(signed.claims.ticket_id, Some(&signed.claims), now_ns, ScanMode::Consume)
                    .await
            }
            Err(reason) => Ok(ValidationOutcome::Rejected(reason)),
        }
    }

    /// Validates a ticket by its id alone, for when the id is read out to a
    /// driver instead of being scanned. Same semantics as [`Self::validate`]
    /// minus the payload checks.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub async fn validate_ticket_id(
        &self,
        ticket_id: TicketId,
        now_ns: u64,
    ) -> Result<ValidationOutcome, Error> {
        self.scan(ticket_id, None, now_ns, ScanMode::Consume).await
    }

    /// Reports whether `payload` would be accepted at `now_ns` without
    /// consuming anything. An accepted check reports the rides currently
    /// left. A ticket found past its deadline is still moved to `Expired`.
    ///
    /// # Errors
    ///
    /// See [`Self::validate`].
    pub async fn check(&self, payload: &str, now_ns: u64) -> Result<ValidationOutcome, Error> {
        match self.authenticate(payload) {
            Ok(signed) => {
                self.scan(signed.claims.ticket_id, Some(&signed.claims), now_ns, ScanMode::Inspect)
                    .await
            }
            Err(reason) => Ok(ValidationOutcome::Rejected(reason)),
        }
    }

    async fn scan(
        &self,
        ticket_id: TicketId,
        claims: Option<&TicketClaims>,
        now_ns: u64,
        mode: ScanMode,
    ) -> Result<ValidationOutcome, Error> {
        for attempt in 1..=self.max_attempts {
            let Some(ticket) = self
                .context
                .ticket(ticket_id)
                .await
                .map_err(Error::adapter)?
            else {
                info!("Rejected scan of unknown ticket {ticket_id}");
                return Ok(ValidationOutcome::Rejected(RejectReason::Unknown));
            };

            if let Some(claims) = claims {
                if !ticket.matches_claims(claims) {
                    warn!("Signed claims of ticket {ticket_id} disagree with the stored record");
                    return Ok(ValidationOutcome::Rejected(RejectReason::ClaimsMismatch));
                }
            }

            let (change, outcome) = match evaluate(&ticket, now_ns) {
                Evaluation::Reject {
                    reason,
                    change: None,
                } => return Ok(ValidationOutcome::Rejected(reason)),
                Evaluation::Reject {
                    reason,
                    change: Some(change),
                } => (change, ValidationOutcome::Rejected(reason)),
                Evaluation::Accept { .. } if mode == ScanMode::Inspect => {
                    return Ok(ValidationOutcome::Accepted {
                        ticket_id,
                        remaining_after: ticket.rides_remaining,
                    })
                }
                Evaluation::Accept {
                    change,
                    remaining_after,
                } => (
                    change,
                    ValidationOutcome::Accepted {
                        ticket_id,
                        remaining_after,
                    },
                ),
            };

            match self
                .context
                .conditional_update(ticket_id, ticket.version, change)
                .await
                .map_err(Error::adapter)?
            {
                UpdateOutcome::Applied(updated) => {
                    if updated.status != TicketStatus::Active {
                        info!("Ticket {ticket_id} is now {}", updated.status);
                    }
                    return Ok(outcome);
                }
                UpdateOutcome::NotFound => {
                    return Ok(ValidationOutcome::Rejected(RejectReason::Unknown))
                }
                UpdateOutcome::VersionMismatch => debug!(
                    "Ticket {ticket_id} changed during scan (attempt {attempt}/{}), retrying",
                    self.max_attempts
                ),
            }
        }

        warn!(
            "Giving up on ticket {ticket_id} after {} contended attempts",
            self.max_attempts
        );
        Err(Error::Contention {
            ticket_id,
            attempts: self.max_attempts,
        })
    }
}
