// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Store adapters for the ticket manager.
//!
//! Each adapter should be implemented by the user of the library on top of
//! their storage engine. The only hard requirement is that
//! [`TicketUpdate::conditional_update`] is atomic: it must compare the version
//! and write the change as one step, across every process sharing the store.

mod ticket;

pub use ticket::*;
