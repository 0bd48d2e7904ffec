// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use fare_payload::TicketId;

use crate::ticket::{StateChange, Ticket};

/// Outcome of inserting a new ticket record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same id already exists. Nothing was written.
    Conflict,
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The change was written; holds the record as stored afterwards.
    Applied(Ticket),
    /// The record's version differs from the expected one. Nothing was written.
    VersionMismatch,
    NotFound,
}

/// Reads ticket records.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait TicketRead {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Retrieves the live record of `ticket_id`, `None` if it was never issued.
    async fn ticket(&self, ticket_id: TicketId) -> Result<Option<Ticket>, Self::AdapterError>;
}

/// Inserts new ticket records.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait TicketStore {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Stores `ticket` unless its id is already taken, in which case
    /// [`InsertOutcome::Conflict`] is returned and the existing record is left
    /// untouched.
    async fn insert_ticket(&self, ticket: Ticket) -> Result<InsertOutcome, Self::AdapterError>;
}

/// Atomically updates ticket records.
///
/// # Example
///
/// For example code see [crate::manager::context::memory::InMemoryContext]
#[async_trait]
pub trait TicketUpdate {
    /// Defines the user-specified error type.
    ///
    /// This error type should implement the `Error` and `Debug` traits from
    /// the standard library.
    /// Errors of this type are returned to the user when an operation fails.
    type AdapterError: std::error::Error + std::fmt::Debug + Send + Sync + 'static;

    /// Applies `change` to `ticket_id` only if the stored version still equals
    /// `expected_version`, bumping the version as part of the same atomic step.
    ///
    /// [`Ticket::apply`] performs the field updates; implementations backed by
    /// a database typically express the same thing as
    /// `UPDATE … WHERE id = ? AND version = ?` and report
    /// [`UpdateOutcome::VersionMismatch`] when no row matched.
    async fn conditional_update(
        &self,
        ticket_id: TicketId,
        expected_version: u64,
        change: StateChange,
    ) -> Result<UpdateOutcome, Self::AdapterError>;
}
