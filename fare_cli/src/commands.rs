// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroU16;

use anyhow::{Context, Result};
use fare_core::{
    manager::{context::memory::InMemoryContext, TicketIssuer, ValidationEngine},
    ticket::{IssuancePolicy, OwnerId, Ticket},
    validation::ValidationOutcome,
};
use fare_payload::{KeyEpoch, KeyPair, KeyRing, SignedPayload, TicketClaims, TicketType};
use log::info;
use serde::Serialize;

const SECOND_NS: u64 = 1_000_000_000;

/// Environment lines provisioning a fresh key pair for `epoch`.
pub fn keygen(epoch: KeyEpoch) -> String {
    let key_pair = KeyPair::generate(epoch);
    info!("Generated key pair for epoch {epoch}");
    format!(
        "FARE_KEY_EPOCH={epoch}\nFARE_SIGNING_KEY={}\nFARE_PUBLIC_KEY={}\n",
        key_pair.signing_key_base64(),
        key_pair.public_key_base64()
    )
}

#[derive(Debug, Serialize)]
pub struct Inspection {
    pub claims: TicketClaims,
    pub signature_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decodes `payload` and checks its signature against `key_ring`.
///
/// A payload that does not decode is an error; a bad signature is reported in
/// the returned inspection.
pub fn inspect(payload: &str, key_ring: &KeyRing) -> Result<Inspection> {
    let signed = SignedPayload::from_qr_string(payload).context("Payload does not decode")?;
    let error = signed.verify(key_ring).err().map(|err| err.to_string());
    Ok(Inspection {
        claims: signed.claims,
        signature_valid: error.is_none(),
        error,
    })
}

#[derive(Debug, Serialize)]
pub struct DemoTicket {
    pub ticket: Ticket,
    pub payload: String,
    pub scans: Vec<ValidationOutcome>,
}

/// Issues a single ride, a three-ride pack and a 30-day pass into a fresh
/// in-memory store, then scans each of them until refused (at most four
/// times), one second apart.
pub async fn demo(
    key_pair: KeyPair,
    key_ring: KeyRing,
    policy: IssuancePolicy,
    max_attempts: u32,
) -> Result<Vec<DemoTicket>> {
    let context = InMemoryContext::default();
    let issuer = TicketIssuer::new(context.clone(), key_pair, policy);
    let engine = ValidationEngine::new(context.clone(), key_ring).with_max_attempts(max_attempts);
    let owner = OwnerId::new("demo-rider");

    let ticket_types = [
        TicketType::SingleRide,
        TicketType::MultiRide {
            rides: NonZeroU16::new(3).context("ride count")?,
        },
        TicketType::TimedPass {
            duration_secs: 30 * 86_400,
        },
    ];

    let issued_at_ns = fare_core::get_current_timestamp_u64_ns()?;
    let mut demo = Vec::with_capacity(ticket_types.len());
    for ticket_type in ticket_types {
        let issued = issuer
            .issue_at(owner.clone(), ticket_type, issued_at_ns)
            .await?;

        let mut scans = Vec::new();
        for scan in 1..=4 {
            let outcome = engine
                .validate(&issued.payload_string, issued_at_ns + scan * SECOND_NS)
                .await?;
            scans.push(outcome);
            if !outcome.is_accepted() {
                break;
            }
        }

        let ticket = context
            .tickets_for_owner(&owner)?
            .into_iter()
            .find(|ticket| ticket.id == issued.ticket_id())
            .context("issued ticket missing from store")?;
        demo.push(DemoTicket {
            ticket,
            payload: issued.payload_string,
            scans,
        });
    }
    Ok(demo)
}
