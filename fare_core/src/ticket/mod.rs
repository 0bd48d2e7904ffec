// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Ticket records
//!
//! A [`Ticket`] is the live, store-owned view of an issued ticket. Its
//! lifecycle is a small state machine:
//!
//! - `Active`: entered at issuance, the only state a scan can be accepted in.
//! - `Exhausted`: the last ride was consumed.
//! - `Expired`: a scan arrived after `expires_at_ns`.
//! - `Revoked`: withdrawn by an operator.
//!
//! Every non-`Active` state is terminal. Records only move through
//! [`StateChange`] values applied with [`Ticket::apply`], which keeps the
//! ride counter and the status consistent and bumps the version used for
//! optimistic concurrency.

mod policy;
mod state_change;

use std::fmt;

use fare_payload::{KeyEpoch, TicketClaims, TicketId, TicketType};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use policy::IssuancePolicy;
pub use state_change::StateChange;

/// Opaque identifier of the ticket owner, as supplied by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Exhausted,
    Expired,
    Revoked,
}

impl TicketStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TicketStatus::Active)
    }
}

/// A ticket record as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub owner_id: OwnerId,
    pub ticket_type: TicketType,
    /// Rides left, `None` for passes that are only bounded by time.
    pub rides_remaining: Option<u16>,
    pub issued_at_ns: u64,
    pub expires_at_ns: Option<u64>,
    pub status: TicketStatus,
    /// Incremented by every applied [`StateChange`].
    pub version: u64,
    /// Epoch of the key that signed the ticket's payload.
    pub key_epoch: KeyEpoch,
    pub last_validated_at_ns: Option<u64>,
}

impl Ticket {
    /// Builds the `Active` record of a freshly issued ticket.
    pub fn issue(
        id: TicketId,
        owner_id: OwnerId,
        ticket_type: TicketType,
        key_epoch: KeyEpoch,
        issued_at_ns: u64,
        policy: &IssuancePolicy,
    ) -> Self {
        Self {
            id,
            owner_id,
            ticket_type,
            rides_remaining: ticket_type.initial_rides(),
            issued_at_ns,
            expires_at_ns: policy.expires_at_ns(&ticket_type, issued_at_ns),
            status: TicketStatus::Active,
            version: 0,
            key_epoch,
            last_validated_at_ns: None,
        }
    }

    /// The claims signed into this ticket's payload.
    pub fn claims(&self) -> TicketClaims {
        TicketClaims {
            ticket_id: self.id,
            ticket_type: self.ticket_type,
            issued_at_ns: self.issued_at_ns,
            key_epoch: self.key_epoch,
        }
    }

    /// Whether `claims` describe this ticket as it was issued.
    pub fn matches_claims(&self, claims: &TicketClaims) -> bool {
        self.claims() == *claims
    }

    pub fn is_expired_at(&self, now_ns: u64) -> bool {
        self.expires_at_ns
            .is_some_and(|expires_at_ns| now_ns > expires_at_ns)
    }

    /// Applies `change` and bumps the version.
    ///
    /// Stores call this inside their atomic conditional update, after having
    /// checked the expected version.
    pub fn apply(&mut self, change: &StateChange) {
        self.rides_remaining = change.rides_remaining();
        self.status = change.status();
        if let Some(validated_at_ns) = change.validated_at_ns() {
            self.last_validated_at_ns = Some(validated_at_ns);
        }
        self.version += 1;
    }
}
