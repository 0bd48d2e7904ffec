// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory context implementation for the ticket manager.
//!
//! Records live in a shared map behind a lock; a conditional update checks
//! the version and applies the change while holding the write lock, which
//! makes it atomic for every engine sharing the same storage.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use fare_payload::TicketId;
use thiserror::Error;

use crate::{
    manager::adapters::*,
    ticket::{OwnerId, StateChange, Ticket},
};

pub type TicketStorage = Arc<RwLock<HashMap<TicketId, Ticket>>>;

#[derive(Debug, Error)]
pub enum InMemoryError {
    #[error("something went wrong: {error}")]
    AdapterError { error: String },
}

impl InMemoryError {
    fn poisoned<T>(err: std::sync::PoisonError<T>) -> Self {
        InMemoryError::AdapterError {
            error: err.to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContext {
    /// local ticket store with rwlocks to allow sharing with other components as needed
    ticket_storage: TicketStorage,
}

impl InMemoryContext {
    pub fn new(ticket_storage: TicketStorage) -> Self {
        InMemoryContext { ticket_storage }
    }

    pub fn ticket_storage(&self) -> TicketStorage {
        self.ticket_storage.clone()
    }

    /// Every ticket issued to `owner_id`, oldest first.
    pub fn tickets_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<Ticket>, InMemoryError> {
        let ticket_storage = self
            .ticket_storage
            .read()
            .map_err(InMemoryError::poisoned)?;
        let mut tickets: Vec<Ticket> = ticket_storage
            .values()
            .filter(|ticket| &ticket.owner_id == owner_id)
            .cloned()
            .collect();
        tickets.sort_unstable_by_key(|ticket| ticket.issued_at_ns);
        Ok(tickets)
    }
}

#[async_trait]
impl TicketRead for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn ticket(&self, ticket_id: TicketId) -> Result<Option<Ticket>, Self::AdapterError> {
        let ticket_storage = self
            .ticket_storage
            .read()
            .map_err(InMemoryError::poisoned)?;
        Ok(ticket_storage.get(&ticket_id).cloned())
    }
}

#[async_trait]
impl TicketStore for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn insert_ticket(&self, ticket: Ticket) -> Result<InsertOutcome, Self::AdapterError> {
        let mut ticket_storage = self
            .ticket_storage
            .write()
            .map_err(InMemoryError::poisoned)?;
        if ticket_storage.contains_key(&ticket.id) {
            return Ok(InsertOutcome::Conflict);
        }
        ticket_storage.insert(ticket.id, ticket);
        Ok(InsertOutcome::Inserted)
    }
}

#[async_trait]
impl TicketUpdate for InMemoryContext {
    type AdapterError = InMemoryError;

    async fn conditional_update(
        &self,
        ticket_id: TicketId,
        expected_version: u64,
        change: StateChange,
    ) -> Result<UpdateOutcome, Self::AdapterError> {
        let mut ticket_storage = self
            .ticket_storage
            .write()
            .map_err(InMemoryError::poisoned)?;
        let Some(ticket) = ticket_storage.get_mut(&ticket_id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if ticket.version != expected_version {
            return Ok(UpdateOutcome::VersionMismatch);
        }
        ticket.apply(&change);
        Ok(UpdateOutcome::Applied(ticket.clone()))
    }
}

#[cfg(test)]
mod tests {
    use fare_payload::{KeyEpoch, TicketType};
    use rstest::*;

    use super::*;
    use crate::ticket::{IssuancePolicy, TicketStatus};

    #[fixture]
    fn ticket() -> Ticket {
        Ticket::issue(
            TicketId::new_random(),
            OwnerId::new("001131"),
            TicketType::SingleRide,
            KeyEpoch(0),
            100,
            &IssuancePolicy::default(),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn insert_refuses_duplicate_ids(ticket: Ticket) {
        let context = InMemoryContext::default();
        assert_eq!(
            context.insert_ticket(ticket.clone()).await.unwrap(),
            InsertOutcome::Inserted
        );

        let mut duplicate = ticket.clone();
        duplicate.owner_id = OwnerId::new("someone else");
        assert_eq!(
            context.insert_ticket(duplicate).await.unwrap(),
            InsertOutcome::Conflict
        );
        assert_eq!(context.ticket(ticket.id).await.unwrap(), Some(ticket));
    }

    #[rstest]
    #[tokio::test]
    async fn conditional_update_checks_version(ticket: Ticket) {
        let context = InMemoryContext::default();
        context.insert_ticket(ticket.clone()).await.unwrap();
        let change = StateChange::consume(&ticket, 200);

        let UpdateOutcome::Applied(updated) = context
            .conditional_update(ticket.id, 0, change)
            .await
            .unwrap()
        else {
            panic!("first update must apply");
        };
        assert_eq!(updated.version, 1);
        assert_eq!(updated.status, TicketStatus::Exhausted);

        assert_eq!(
            context.conditional_update(ticket.id, 0, change).await.unwrap(),
            UpdateOutcome::VersionMismatch
        );
        assert_eq!(context.ticket(ticket.id).await.unwrap(), Some(updated));
    }

    #[rstest]
    #[tokio::test]
    async fn conditional_update_of_missing_ticket(ticket: Ticket) {
        let context = InMemoryContext::default();
        assert_eq!(
            context
                .conditional_update(ticket.id, 0, StateChange::revoke(&ticket))
                .await
                .unwrap(),
            UpdateOutcome::NotFound
        );
    }

    #[rstest]
    #[tokio::test]
    async fn tickets_are_listed_per_owner(ticket: Ticket) {
        let context = InMemoryContext::default();
        let mut later = ticket.clone();
        later.id = TicketId::new_random();
        later.issued_at_ns = 300;
        let mut other_owner = ticket.clone();
        other_owner.id = TicketId::new_random();
        other_owner.owner_id = OwnerId::new("001132");

        for t in [later.clone(), ticket.clone(), other_owner] {
            context.insert_ticket(t).await.unwrap();
        }

        assert_eq!(
            context.tickets_for_owner(&ticket.owner_id).unwrap(),
            vec![ticket, later]
        );
    }
}
