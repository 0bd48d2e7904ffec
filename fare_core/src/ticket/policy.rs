// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use fare_payload::TicketType;
use serde::{Deserialize, Serialize};

/// Expiry rules applied at issuance.
///
/// Timed passes always expire `duration_secs` after issuance. Ride-counted
/// tickets expire only by exhaustion unless a validity period is configured
/// for their type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuancePolicy {
    pub single_ride_validity: Option<Duration>,
    pub multi_ride_validity: Option<Duration>,
}

impl IssuancePolicy {
    pub fn with_single_ride_validity(mut self, validity: Duration) -> Self {
        self.single_ride_validity = Some(validity);
        self
    }

    pub fn with_multi_ride_validity(mut self, validity: Duration) -> Self {
        self.multi_ride_validity = Some(validity);
        self
    }

    pub fn expires_at_ns(&self, ticket_type: &TicketType, issued_at_ns: u64) -> Option<u64> {
        let validity = match ticket_type {
            TicketType::SingleRide => self.single_ride_validity?,
            TicketType::MultiRide { .. } => self.multi_ride_validity?,
            TicketType::TimedPass { duration_secs } => {
                Duration::from_secs(u64::from(*duration_secs))
            }
        };
        let validity_ns = u64::try_from(validity.as_nanos()).unwrap_or(u64::MAX);
        Some(issued_at_ns.saturating_add(validity_ns))
    }
}
