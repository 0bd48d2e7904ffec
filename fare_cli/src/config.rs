// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{fmt, time::Duration};

use clap::{Parser, Subcommand};
use fare_core::{manager::DEFAULT_MAX_ATTEMPTS, ticket::IssuancePolicy};
use fare_payload::{Base64KeyProvider, KeyEpoch, KeyLoadError, KeyPair, KeyProvider, KeyRing};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Ed25519 signing key of the issuer, base64 encoded (32-byte seed or
    /// 64-byte keypair).
    #[arg(long, env = "FARE_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: Option<String>,

    /// Public key matching the signing key, base64 encoded. When both are
    /// set, loading fails if they do not belong together. On its own, it is
    /// the key trusted to verify payloads.
    #[arg(long, env = "FARE_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// Epoch of the signing key, written into every issued payload.
    #[arg(long, default_value_t = 0, env = "FARE_KEY_EPOCH")]
    pub key_epoch: u8,

    /// Additional verifying keys, e.g. the keys of previous epochs after a
    /// rotation. Expects a comma-separated list of `<epoch>:<base64 key>`.
    #[arg(long, env = "FARE_TRUSTED_KEYS", value_delimiter = ',')]
    pub trusted_keys: Vec<String>,

    /// Read-evaluate-update cycles tried before a contended scan fails.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, env = "FARE_MAX_VALIDATION_ATTEMPTS")]
    pub max_validation_attempts: u32,

    /// Validity of single-ride tickets, in seconds. Unbounded if unset.
    #[arg(long, env = "FARE_SINGLE_RIDE_VALIDITY_SECS")]
    pub single_ride_validity_secs: Option<u64>,

    /// Validity of multi-ride tickets, in seconds. Unbounded if unset.
    #[arg(long, env = "FARE_MULTI_RIDE_VALIDITY_SECS")]
    pub multi_ride_validity_secs: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a signing key and print it as environment variables.
    Keygen,
    /// Decode a payload and verify its signature, without any store.
    Inspect {
        /// The base64url payload, as read from the QR code.
        payload: String,
    },
    /// Issue one ticket of each type into an in-memory store and validate them.
    Demo,
}

impl Args {
    pub fn key_epoch(&self) -> KeyEpoch {
        KeyEpoch(self.key_epoch)
    }

    pub fn key_provider(&self) -> Base64KeyProvider {
        let provider = Base64KeyProvider::new(self.key_epoch(), self.signing_key.clone());
        match &self.public_key {
            Some(public_key) => provider.with_public_key(public_key.clone()),
            None => provider,
        }
    }

    /// Loads the issuer key pair, if a signing key is configured.
    pub fn key_pair(&self) -> Result<Option<KeyPair>, KeyLoadError> {
        if self.signing_key.is_none() {
            return Ok(None);
        }
        self.key_provider().load().map(Some)
    }

    /// Every key a validator configured like this trusts: the issuer key (or
    /// the public key alone) for the current epoch, plus the trusted keys.
    pub fn key_ring(&self) -> Result<KeyRing, KeyLoadError> {
        let mut key_ring = match (self.key_pair()?, &self.public_key) {
            (Some(key_pair), _) => KeyRing::from_key_pair(&key_pair),
            (None, Some(public_key)) => {
                let mut key_ring = KeyRing::new();
                key_ring.insert_base64(self.key_epoch(), public_key)?;
                key_ring
            }
            (None, None) => KeyRing::new(),
        };
        self.trust_additional_keys(&mut key_ring)?;
        if key_ring.is_empty() {
            return Err(KeyLoadError::Missing {
                what: "public key",
            });
        }
        Ok(key_ring)
    }

    /// The key ring of a validator paired with the issuer holding `key_pair`.
    pub fn key_ring_for(&self, key_pair: &KeyPair) -> Result<KeyRing, KeyLoadError> {
        let mut key_ring = KeyRing::from_key_pair(key_pair);
        self.trust_additional_keys(&mut key_ring)?;
        Ok(key_ring)
    }

    fn trust_additional_keys(&self, key_ring: &mut KeyRing) -> Result<(), KeyLoadError> {
        for entry in self.trusted_keys.iter().filter(|entry| !entry.trim().is_empty()) {
            key_ring.insert_entry(entry)?;
        }
        Ok(())
    }

    pub fn issuance_policy(&self) -> IssuancePolicy {
        let mut policy = IssuancePolicy::default();
        if let Some(secs) = self.single_ride_validity_secs {
            policy = policy.with_single_ride_validity(Duration::from_secs(secs));
        }
        if let Some(secs) = self.multi_ride_validity_secs {
            policy = policy.with_multi_ride_validity(Duration::from_secs(secs));
        }
        policy
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("command", &self.command)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .field("key_epoch", &self.key_epoch)
            .field("trusted_keys", &self.trusted_keys)
            .field("max_validation_attempts", &self.max_validation_attempts)
            .field("single_ride_validity_secs", &self.single_ride_validity_secs)
            .field("multi_ride_validity_secs", &self.multi_ride_validity_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[fixture]
    fn key_pair() -> KeyPair {
        KeyPair::generate(KeyEpoch(3))
    }

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fare").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn subcommands_parse() {
        assert_eq!(parse(&["keygen"]).command, Command::Keygen);
        assert_eq!(parse(&["demo"]).command, Command::Demo);
        assert_eq!(
            parse(&["inspect", "AQID"]).command,
            Command::Inspect {
                payload: "AQID".to_owned()
            }
        );
    }

    #[rstest]
    fn issuer_key_is_loaded_and_trusted(key_pair: KeyPair) {
        let args = parse(&[
            "--signing-key",
            &key_pair.signing_key_base64(),
            "--public-key",
            &key_pair.public_key_base64(),
            "--key-epoch",
            "3",
            "demo",
        ]);

        let loaded = args.key_pair().unwrap().unwrap();
        assert_eq!(loaded.epoch(), KeyEpoch(3));
        assert_eq!(loaded.verifying_key(), key_pair.verifying_key());
        assert_eq!(
            args.key_ring().unwrap().get(KeyEpoch(3)),
            Some(&key_pair.verifying_key())
        );
    }

    #[rstest]
    fn mismatched_public_key_is_refused(key_pair: KeyPair) {
        let other = KeyPair::generate(KeyEpoch(3));
        let args = parse(&[
            "--signing-key",
            &key_pair.signing_key_base64(),
            "--public-key",
            &other.public_key_base64(),
            "demo",
        ]);

        assert!(matches!(
            args.key_pair(),
            Err(KeyLoadError::PublicKeyMismatch)
        ));
    }

    #[rstest]
    fn validator_can_run_on_public_keys_only(key_pair: KeyPair) {
        let previous = KeyPair::generate(KeyEpoch(2));
        let trusted = format!("2:{}", previous.public_key_base64());
        let args = parse(&[
            "--public-key",
            &key_pair.public_key_base64(),
            "--key-epoch",
            "3",
            "--trusted-keys",
            &trusted,
            "inspect",
            "AQID",
        ]);

        assert!(args.key_pair().unwrap().is_none());
        let key_ring = args.key_ring().unwrap();
        assert_eq!(key_ring.len(), 2);
        assert_eq!(key_ring.get(KeyEpoch(2)), Some(&previous.verifying_key()));
    }

    #[test]
    fn key_ring_needs_at_least_one_key() {
        assert!(matches!(
            parse(&["inspect", "AQID"]).key_ring(),
            Err(KeyLoadError::Missing { .. })
        ));
    }

    #[test]
    fn validity_flags_build_policy() {
        let args = parse(&["--single-ride-validity-secs", "5400", "demo"]);
        assert_eq!(
            args.issuance_policy(),
            IssuancePolicy::default().with_single_ride_validity(Duration::from_secs(5400))
        );
        assert_eq!(args.max_validation_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[rstest]
    fn debug_output_hides_signing_key(key_pair: KeyPair) {
        let secret = key_pair.signing_key_base64();
        let args = parse(&["--signing-key", &secret, "keygen"]);
        assert!(!format!("{args:?}").contains(&secret));
    }
}
