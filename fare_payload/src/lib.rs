// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Signed ticket payloads
//!
//! This crate contains everything a ticket issuer and a detached validator
//! need to agree on, bit for bit:
//!
//! - [`keys`]: the Ed25519 [`KeyPair`] held by the issuer and the [`KeyRing`]
//!   of verifying keys (one per [`KeyEpoch`]) held by validators.
//! - [`claims`]: the immutable [`TicketClaims`] that get signed.
//! - [`codec`]: the fixed binary layout and its base64url transport form.
//! - [`SignedPayload`]: claims plus signature, the artifact rendered as a QR code.
//!
//! # Example
//! ```rust
//! use fare_payload::{KeyEpoch, KeyPair, KeyRing, SignedPayload, TicketClaims, TicketId, TicketType};
//!
//! let key_pair = KeyPair::generate(KeyEpoch(0));
//! let key_ring = KeyRing::from_key_pair(&key_pair);
//!
//! let claims = TicketClaims {
//!     ticket_id: TicketId::new_random(),
//!     ticket_type: TicketType::SingleRide,
//!     issued_at_ns: 1_700_000_000_000_000_000,
//!     key_epoch: key_pair.epoch(),
//! };
//!
//! let payload = SignedPayload::new(claims, &key_pair);
//! let qr_text = payload.to_qr_string();
//!
//! let decoded = SignedPayload::from_qr_string(&qr_text).unwrap();
//! assert!(decoded.verify(&key_ring).is_ok());
//! assert_eq!(decoded.claims, claims);
//! ```

pub mod claims;
pub mod codec;
pub mod keys;
mod signed_payload;

pub use claims::{TicketClaims, TicketId, TicketType};
pub use codec::PayloadError;
pub use keys::{
    Base64KeyProvider, KeyEpoch, KeyLoadError, KeyPair, KeyProvider, KeyRing, VerifyError,
};
pub use signed_payload::SignedPayload;
