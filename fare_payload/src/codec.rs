// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Payload codec
//!
//! Fixed-layout binary encoding of a signed ticket, big-endian integers:
//!
//! | size    | field                                                  |
//! |---------|--------------------------------------------------------|
//! | 1       | format version ([`FORMAT_VERSION`])                    |
//! | 16      | ticket id                                              |
//! | 1       | ticket type tag                                        |
//! | 0, 2, 4 | type fields: none, `rides: u16`, `duration_secs: u32`  |
//! | 8       | `issued_at_ns: u64`                                    |
//! | 1       | key epoch                                              |
//! | 64      | Ed25519 signature                                      |
//!
//! Everything before the signature is the canonical claim bytes: the exact
//! input of the signer and the verifier. The binary form is carried as
//! base64url without padding, which is what ends up in the QR code.
//!
//! Input length is bounded twice, on the text and on the decoded bytes, so an
//! oversized payload is dropped before any cryptographic work.

use std::num::NonZeroU16;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signature, SIGNATURE_LENGTH};

use crate::{
    claims::{MULTI_RIDE_TAG, SINGLE_RIDE_TAG, TIMED_PASS_TAG},
    KeyEpoch, TicketClaims, TicketId, TicketType,
};

/// The only payload layout understood by this version of the crate.
pub const FORMAT_VERSION: u8 = 0x01;

const FIXED_CLAIMS_LEN: usize = 1 + 16 + 1 + 8 + 1;
const MAX_TYPE_FIELDS_LEN: usize = 4;

/// Upper bound of a decoded payload.
pub const MAX_PAYLOAD_LEN: usize = FIXED_CLAIMS_LEN + MAX_TYPE_FIELDS_LEN + SIGNATURE_LENGTH;

/// Upper bound of a payload in its base64url text form.
pub const MAX_ENCODED_LEN: usize = (MAX_PAYLOAD_LEN * 4).div_ceil(3);

/// Reasons a payload cannot be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload is {len} bytes long, the maximum is {max}")]
    TooLarge { len: usize, max: usize },
    #[error("Payload is not valid unpadded base64url: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("Payload ended while reading {field}")]
    Truncated { field: &'static str },
    #[error("Unsupported payload version {version:#04x}")]
    UnsupportedVersion { version: u8 },
    #[error("Unknown ticket type tag {tag:#04x}")]
    UnknownTicketType { tag: u8 },
    #[error("Invalid value for {field}")]
    InvalidField { field: &'static str },
    #[error("{count} unexpected bytes after the signature")]
    TrailingBytes { count: usize },
}

/// Appends the canonical claim bytes of `claims` to `out`.
pub fn write_claims(claims: &TicketClaims, out: &mut Vec<u8>) {
    out.push(FORMAT_VERSION);
    out.extend_from_slice(claims.ticket_id.as_bytes());
    out.push(claims.ticket_type.tag());
    match claims.ticket_type {
        TicketType::SingleRide => {}
        TicketType::MultiRide { rides } => out.extend_from_slice(&rides.get().to_be_bytes()),
        TicketType::TimedPass { duration_secs } => {
            out.extend_from_slice(&duration_secs.to_be_bytes())
        }
    }
    out.extend_from_slice(&claims.issued_at_ns.to_be_bytes());
    out.push(claims.key_epoch.0);
}

/// The bytes that are signed at issuance and verified at validation.
pub fn canonical_bytes(claims: &TicketClaims) -> Vec<u8> {
    let mut out = Vec::with_capacity(FIXED_CLAIMS_LEN + MAX_TYPE_FIELDS_LEN);
    write_claims(claims, &mut out);
    out
}

/// Encodes claims and signature into the binary payload.
pub fn encode(claims: &TicketClaims, signature: &Signature) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_PAYLOAD_LEN);
    write_claims(claims, &mut out);
    out.extend_from_slice(&signature.to_bytes());
    out
}

/// Decodes a binary payload into its claims and signature.
pub fn decode(bytes: &[u8]) -> Result<(TicketClaims, Signature), PayloadError> {
    if bytes.len() > MAX_PAYLOAD_LEN {
        return Err(PayloadError::TooLarge {
            len: bytes.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    let mut reader = Reader { bytes };
    let [version] = reader.take::<1>("version")?;
    if version != FORMAT_VERSION {
        return Err(PayloadError::UnsupportedVersion { version });
    }

    let ticket_id = TicketId::from_bytes(reader.take::<16>("ticket id")?);
    let [tag] = reader.take::<1>("ticket type")?;
    let ticket_type = match tag {
        SINGLE_RIDE_TAG => TicketType::SingleRide,
        MULTI_RIDE_TAG => {
            let rides = u16::from_be_bytes(reader.take::<2>("ride count")?);
            TicketType::MultiRide {
                rides: NonZeroU16::new(rides).ok_or(PayloadError::InvalidField {
                    field: "ride count",
                })?,
            }
        }
        TIMED_PASS_TAG => TicketType::TimedPass {
            duration_secs: u32::from_be_bytes(reader.take::<4>("pass duration")?),
        },
        tag => return Err(PayloadError::UnknownTicketType { tag }),
    };
    let issued_at_ns = u64::from_be_bytes(reader.take::<8>("issue time")?);
    let [epoch] = reader.take::<1>("key epoch")?;
    let signature = Signature::from_bytes(&reader.take::<SIGNATURE_LENGTH>("signature")?);

    if !reader.bytes.is_empty() {
        return Err(PayloadError::TrailingBytes {
            count: reader.bytes.len(),
        });
    }

    let claims = TicketClaims {
        ticket_id,
        ticket_type,
        issued_at_ns,
        key_epoch: KeyEpoch(epoch),
    };
    Ok((claims, signature))
}

/// Display-safe text form of a binary payload.
pub fn to_text(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Inverse of [`to_text`], refusing oversized input before decoding it.
pub fn from_text(text: &str) -> Result<Vec<u8>, PayloadError> {
    if text.len() > MAX_ENCODED_LEN {
        return Err(PayloadError::TooLarge {
            len: text.len(),
            max: MAX_ENCODED_LEN,
        });
    }
    Ok(URL_SAFE_NO_PAD.decode(text)?)
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], PayloadError> {
        let (head, rest) = self
            .bytes
            .split_first_chunk::<N>()
            .ok_or(PayloadError::Truncated { field })?;
        self.bytes = rest;
        Ok(*head)
    }
}
