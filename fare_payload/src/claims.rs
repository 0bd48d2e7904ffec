// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ticket claims: the part of a ticket that is signed at issuance and never
//! changes afterwards.

use std::{fmt, num::NonZeroU16, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::KeyEpoch;

/// Globally unique, 128-bit ticket identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Generates a fresh random (v4) identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl From<Uuid> for TicketId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for TicketId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The kind of fare a ticket grants.
///
/// Each variant carries exactly the fields its policy needs, so a single ride
/// with a ride count, or a multi-ride pass with zero rides, cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TicketType {
    SingleRide,
    MultiRide { rides: NonZeroU16 },
    TimedPass { duration_secs: u32 },
}

impl TicketType {
    /// Number of rides granted at issuance, `None` for passes that are only
    /// bounded by time.
    pub fn initial_rides(&self) -> Option<u16> {
        match self {
            TicketType::SingleRide => Some(1),
            TicketType::MultiRide { rides } => Some(rides.get()),
            TicketType::TimedPass { .. } => None,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            TicketType::SingleRide => SINGLE_RIDE_TAG,
            TicketType::MultiRide { .. } => MULTI_RIDE_TAG,
            TicketType::TimedPass { .. } => TIMED_PASS_TAG,
        }
    }
}

pub(crate) const SINGLE_RIDE_TAG: u8 = 0x01;
pub(crate) const MULTI_RIDE_TAG: u8 = 0x02;
pub(crate) const TIMED_PASS_TAG: u8 = 0x03;

/// Claims carried by a ticket payload.
///
/// The ride count of a [`TicketType::MultiRide`] is a snapshot taken at
/// issuance; the live count is only ever read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketClaims {
    pub ticket_id: TicketId,
    pub ticket_type: TicketType,
    pub issued_at_ns: u64,
    pub key_epoch: KeyEpoch,
}
