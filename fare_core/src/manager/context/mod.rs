// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Context implementations.
//!
//! Contexts hold the ticket records the manager reads and updates.
//! Currently, there's only one context implementation available, the
//! `InMemoryContext`, which keeps records in process memory and is useful for
//! testing, demos and single-process deployments.
pub mod memory;
