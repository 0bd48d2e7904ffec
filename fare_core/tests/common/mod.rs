// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use fare_core::{
    fare_payload::{KeyEpoch, KeyPair, KeyRing},
    manager::{context::memory::InMemoryContext, TicketAdmin, TicketIssuer, ValidationEngine},
    ticket::IssuancePolicy,
};
use rstest::*;

/// 2025-08-01T00:00:00Z
pub const ISSUED_AT_NS: u64 = 1_754_006_400_000_000_000;
pub const SECOND_NS: u64 = 1_000_000_000;

pub struct ContextFixture {
    pub context: InMemoryContext,
    pub key_pair: KeyPair,
    pub issuer: TicketIssuer<InMemoryContext>,
    pub engine: ValidationEngine<InMemoryContext>,
    pub admin: TicketAdmin<InMemoryContext>,
}

#[fixture]
pub fn key_pair() -> KeyPair {
    KeyPair::generate(KeyEpoch(0))
}

#[fixture]
pub fn context(key_pair: KeyPair) -> ContextFixture {
    let context = InMemoryContext::default();
    let issuer = TicketIssuer::new(
        context.clone(),
        key_pair.clone(),
        IssuancePolicy::default(),
    );
    let engine = ValidationEngine::new(context.clone(), KeyRing::from_key_pair(&key_pair));
    let admin = TicketAdmin::new(context.clone());
    ContextFixture {
        context,
        key_pair,
        issuer,
        engine,
        admin,
    }
}
