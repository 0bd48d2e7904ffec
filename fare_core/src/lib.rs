// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Transit fare core
//!
//! Issuance and validation of signed transit tickets.
//!
//! A ticket is two things: a durable [`ticket::Ticket`] record owned by a
//! store, and a static [`fare_payload::SignedPayload`] handed to the rider as a
//! QR code. The payload proves what was issued; only the store knows how much
//! of it is left. Every scan therefore goes through the
//! [`manager::ValidationEngine`], which decides on a presented payload with the
//! pure [`validation::evaluate`] function and commits the decision through the
//! store's conditional update, retrying when a concurrent scan won the race.
//!
//! ## Getting started
//!
//! Take a look at the [`manager`] module to see how to wire an issuer and a
//! validation engine to a store, and at [`manager::adapters`] for the store
//! contract your storage has to implement.

use std::time::{SystemTime, UNIX_EPOCH};

mod error;
pub mod manager;
pub mod ticket;
pub mod validation;

pub use error::{Error, Result};
pub use fare_payload;

/// Current Unix time in nanoseconds, the time unit used by tickets.
pub fn get_current_timestamp_u64_ns() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| Error::InvalidSystemTime {
            source_error_message: err.to_string(),
        })?
        .as_nanos() as u64)
}
