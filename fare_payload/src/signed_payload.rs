// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use ed25519_dalek::Signature;

use crate::{codec, KeyPair, KeyRing, PayloadError, TicketClaims, VerifyError};

/// Ticket claims together with the issuer's signature over their canonical
/// bytes. This is the artifact handed to the presentation layer.
///
/// A payload is static for the lifetime of its ticket: usage is tracked by
/// the store, never by re-signing the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPayload {
    pub claims: TicketClaims,
    pub signature: Signature,
}

impl SignedPayload {
    /// Signs the canonical bytes of `claims` with `key_pair`.
    ///
    /// The key epoch of the claims is expected to match the key pair; a
    /// mismatch produces a payload no validator will accept.
    pub fn new(claims: TicketClaims, key_pair: &KeyPair) -> Self {
        let signature = key_pair.sign(&codec::canonical_bytes(&claims));
        Self { claims, signature }
    }

    /// Checks the signature with the key trusted for the claims' epoch.
    pub fn verify(&self, key_ring: &KeyRing) -> Result<(), VerifyError> {
        key_ring.verify(
            self.claims.key_epoch,
            &codec::canonical_bytes(&self.claims),
            &self.signature,
        )
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        codec::encode(&self.claims, &self.signature)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        let (claims, signature) = codec::decode(bytes)?;
        Ok(Self { claims, signature })
    }

    /// The base64url string rendered into the QR code.
    pub fn to_qr_string(&self) -> String {
        codec::to_text(&self.to_bytes())
    }

    pub fn from_qr_string(text: &str) -> Result<Self, PayloadError> {
        Self::from_bytes(&codec::from_text(text)?)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU16;

    use rstest::*;

    use super::*;
    use crate::{KeyEpoch, TicketId, TicketType};

    #[fixture]
    fn key_pair() -> KeyPair {
        KeyPair::generate(KeyEpoch(1))
    }

    #[fixture]
    fn key_ring(key_pair: KeyPair) -> (KeyPair, KeyRing) {
        let ring = KeyRing::from_key_pair(&key_pair);
        (key_pair, ring)
    }

    fn claims(ticket_type: TicketType, epoch: KeyEpoch) -> TicketClaims {
        TicketClaims {
            ticket_id: TicketId::new_random(),
            ticket_type,
            issued_at_ns: 1_754_006_400_000_000_000,
            key_epoch: epoch,
        }
    }

    #[rstest]
    #[case::single_ride(TicketType::SingleRide)]
    #[case::ten_pack(TicketType::MultiRide { rides: NonZeroU16::new(10).unwrap() })]
    #[case::monthly_pass(TicketType::TimedPass { duration_secs: 2_592_000 })]
    fn signed_payload_survives_qr_transport(
        key_ring: (KeyPair, KeyRing),
        #[case] ticket_type: TicketType,
    ) {
        let (key_pair, ring) = key_ring;
        let payload = SignedPayload::new(claims(ticket_type, key_pair.epoch()), &key_pair);

        let decoded = SignedPayload::from_qr_string(&payload.to_qr_string()).unwrap();
        assert_eq!(decoded, payload);
        assert!(decoded.verify(&ring).is_ok());
    }

    #[rstest]
    #[case::single_ride(TicketType::SingleRide)]
    #[case::ten_pack(TicketType::MultiRide { rides: NonZeroU16::new(10).unwrap() })]
    #[case::monthly_pass(TicketType::TimedPass { duration_secs: 2_592_000 })]
    fn any_single_bit_flip_is_rejected(
        key_ring: (KeyPair, KeyRing),
        #[case] ticket_type: TicketType,
    ) {
        let (key_pair, ring) = key_ring;
        let bytes = SignedPayload::new(claims(ticket_type, key_pair.epoch()), &key_pair).to_bytes();

        for bit in 0..bytes.len() * 8 {
            let mut tampered = bytes.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);

            let accepted = SignedPayload::from_qr_string(&codec::to_text(&tampered))
                .ok()
                .is_some_and(|payload| payload.verify(&ring).is_ok());
            assert!(!accepted, "flipping bit {bit} went unnoticed");
        }
    }

    #[rstest]
    fn signature_from_another_key_is_rejected(key_pair: KeyPair) {
        let forger = KeyPair::generate(key_pair.epoch());
        let ring = KeyRing::from_key_pair(&key_pair);

        let forged = SignedPayload::new(claims(TicketType::SingleRide, forger.epoch()), &forger);
        assert_eq!(forged.verify(&ring), Err(VerifyError::BadSignature));
    }

    #[rstest]
    fn untrusted_epoch_is_rejected(key_pair: KeyPair) {
        let rotated = KeyPair::generate(KeyEpoch(2));
        let ring = KeyRing::from_key_pair(&key_pair);

        let payload = SignedPayload::new(claims(TicketType::SingleRide, rotated.epoch()), &rotated);
        assert_eq!(
            payload.verify(&ring),
            Err(VerifyError::UnknownEpoch { epoch: KeyEpoch(2) })
        );
    }

    #[rstest]
    fn old_epoch_stays_verifiable_after_rotation(key_pair: KeyPair) {
        let rotated = KeyPair::generate(KeyEpoch(2));
        let mut ring = KeyRing::from_key_pair(&rotated);
        ring.insert(key_pair.epoch(), key_pair.verifying_key());

        let old = SignedPayload::new(claims(TicketType::SingleRide, key_pair.epoch()), &key_pair);
        let new = SignedPayload::new(claims(TicketType::SingleRide, rotated.epoch()), &rotated);
        assert!(old.verify(&ring).is_ok());
        assert!(new.verify(&ring).is_ok());
    }
}
