// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, sync::Arc};

use fare_payload::{KeyPair, SignedPayload, TicketId, TicketType};
use log::{info, warn};

use super::adapters::{InsertOutcome, TicketStore};
use crate::{
    ticket::{IssuancePolicy, OwnerId, Ticket},
    Error,
};

/// Generator of fresh ticket ids.
pub type IdSource = Arc<dyn Fn() -> TicketId + Send + Sync>;

/// A newly issued ticket: the stored record and the payload for the rider.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub ticket: Ticket,
    pub payload: SignedPayload,
    /// The base64url string to render as a QR code.
    pub payload_string: String,
}

impl IssuedTicket {
    pub fn ticket_id(&self) -> TicketId {
        self.ticket.id
    }
}

pub struct TicketIssuer<E> {
    /// Context that implements adapters
    context: E,
    key_pair: KeyPair,
    policy: IssuancePolicy,
    id_source: IdSource,
}

impl<E> TicketIssuer<E> {
    /// Creates a new issuer signing with `key_pair` and storing records in
    /// `context`. Ids are random v4 UUIDs.
    ///
    /// The caller is expected to have authenticated the owner and captured
    /// the payment before asking for a ticket.
    pub fn new(context: E, key_pair: KeyPair, policy: IssuancePolicy) -> Self {
        Self {
            context,
            key_pair,
            policy,
            id_source: Arc::new(TicketId::new_random),
        }
    }

    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    pub fn context(&self) -> &E {
        &self.context
    }
}

impl<E> TicketIssuer<E>
where
    E: TicketStore,
{
    /// Issues a ticket of `ticket_type` to `owner_id`, timestamped now.
    ///
    /// # Errors
    ///
    /// See [`Self::issue_at`].
    pub async fn issue(
        &self,
        owner_id: OwnerId,
        ticket_type: TicketType,
    ) -> Result<IssuedTicket, Error> {
        let now_ns = crate::get_current_timestamp_u64_ns()?;
        self.issue_at(owner_id, ticket_type, now_ns).await
    }

    /// Issues a ticket of `ticket_type` to `owner_id`, timestamped `now_ns`.
    ///
    /// The record is stored before the payload is signed, so a payload never
    /// exists for a ticket the store does not know.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdCollision`] if the store rejects the generated id,
    /// and then a regenerated one, as already taken.
    ///
    /// Returns [`Error::AdapterError`] if the store fails.
    pub async fn issue_at(
        &self,
        owner_id: OwnerId,
        ticket_type: TicketType,
        now_ns: u64,
    ) -> Result<IssuedTicket, Error> {
        let mut ticket_id = (self.id_source)();

        for attempt in 0..2 {
            if attempt > 0 {
                warn!("Ticket id {ticket_id} already taken, regenerating");
                ticket_id = (self.id_source)();
            }

            let ticket = Ticket::issue(
                ticket_id,
                owner_id.clone(),
                ticket_type,
                self.key_pair.epoch(),
                now_ns,
                &self.policy,
            );

            match self
                .context
                .insert_ticket(ticket.clone())
                .await
                .map_err(Error::adapter)?
            {
                InsertOutcome::Inserted => {
                    let payload = SignedPayload::new(ticket.claims(), &self.key_pair);
                    let payload_string = payload.to_qr_string();
                    info!(
                        "Issued ticket {} ({:?}) to owner {}",
                        ticket.id, ticket.ticket_type, ticket.owner_id
                    );
                    return Ok(IssuedTicket {
                        ticket,
                        payload,
                        payload_string,
                    });
                }
                InsertOutcome::Conflict => continue,
            }
        }

        Err(Error::IdCollision { ticket_id })
    }
}

impl<E> fmt::Debug for TicketIssuer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketIssuer")
            .field("key_pair", &self.key_pair)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
