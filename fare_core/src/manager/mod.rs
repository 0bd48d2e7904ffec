// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The `manager` module wires tickets, keys and a store together.
//!
//! - [`TicketIssuer`] creates ticket records and their signed payloads. It
//!   runs in the process that holds the private key.
//! - [`ValidationEngine`] decides on presented payloads and commits usage.
//!   It only needs the public [`fare_payload::KeyRing`], so it can run in a
//!   detached validator.
//! - [`TicketAdmin`] holds operator actions such as revocation.
//!
//! Both are generic over a user-defined context implementing the store
//! contract in [`adapters`]. Correctness under concurrent scans comes from the
//! store's conditional update, not from locks held here: several engines, in
//! several processes, can share one store.

mod admin;
pub mod adapters;
#[cfg(feature = "in_memory")]
pub mod context;
mod engine;
mod issuer;

pub use admin::TicketAdmin;
pub use engine::{ValidationEngine, DEFAULT_MAX_ATTEMPTS};
pub use issuer::{IdSource, IssuedTicket, TicketIssuer};
