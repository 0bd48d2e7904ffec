// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Key material
//!
//! The issuing process holds a single [`KeyPair`] for its whole lifetime.
//! Validators, possibly running in another process, hold a [`KeyRing`] mapping
//! each [`KeyEpoch`] to the verifying key of that generation, so that tickets
//! signed before a key rotation stay verifiable until they expire.
//!
//! Both types are immutable after construction and can be shared freely
//! between concurrent callers.

use std::{collections::HashMap, fmt};

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{
    Signature, SignatureError, Signer, SigningKey, VerifyingKey, KEYPAIR_LENGTH,
    PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
};
use serde::{Deserialize, Serialize};

/// Identifier of a key-pair generation, carried in every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyEpoch(pub u8);

impl fmt::Display for KeyEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors returned while loading key material. Any of them is fatal at
/// startup: a process must not issue or validate tickets without valid keys.
#[derive(thiserror::Error, Debug)]
pub enum KeyLoadError {
    #[error("No {what} was configured")]
    Missing { what: &'static str },

    #[error("The {what} is not valid base64: {source}")]
    InvalidEncoding {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("The {what} is {len} bytes long, expected {expected}")]
    InvalidLength {
        what: &'static str,
        len: usize,
        expected: &'static str,
    },

    #[error("The {what} is not a valid Ed25519 key: {source}")]
    InvalidKey {
        what: &'static str,
        #[source]
        source: SignatureError,
    },

    #[error("The configured public key does not match the signing key")]
    PublicKeyMismatch,

    #[error("Invalid key ring entry {entry:?}, expected `<epoch>:<base64 public key>`")]
    InvalidKeyRingEntry { entry: String },
}

/// Errors returned when a signature cannot be accepted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("No verifying key is trusted for key epoch {epoch}")]
    UnknownEpoch { epoch: KeyEpoch },
    #[error("Signature does not match the ticket claims")]
    BadSignature,
}

/// Source of the issuer's key pair.
pub trait KeyProvider {
    fn load(&self) -> Result<KeyPair, KeyLoadError>;
}

/// Loads a key pair from base64 blobs, typically injected through the
/// environment by a secret store.
///
/// The signing key may be a 32-byte seed or a 64-byte `seed || public key`
/// keypair. When a public key is supplied too, it must be the one derived from
/// the signing key.
#[derive(Clone)]
pub struct Base64KeyProvider {
    epoch: KeyEpoch,
    signing_key: Option<String>,
    public_key: Option<String>,
}

impl Base64KeyProvider {
    pub fn new(epoch: KeyEpoch, signing_key: Option<String>) -> Self {
        Self {
            epoch,
            signing_key,
            public_key: None,
        }
    }

    pub fn with_public_key(mut self, public_key: String) -> Self {
        self.public_key = Some(public_key);
        self
    }
}

impl fmt::Debug for Base64KeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Base64KeyProvider")
            .field("epoch", &self.epoch)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl KeyProvider for Base64KeyProvider {
    fn load(&self) -> Result<KeyPair, KeyLoadError> {
        let encoded = self
            .signing_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(KeyLoadError::Missing {
                what: "signing key",
            })?;
        let key_pair = KeyPair::from_bytes(self.epoch, &decode_base64("signing key", encoded)?)?;

        if let Some(public_key) = &self.public_key {
            let expected = verifying_key_from_base64(public_key.trim())?;
            if expected != key_pair.verifying_key() {
                return Err(KeyLoadError::PublicKeyMismatch);
            }
        }
        Ok(key_pair)
    }
}

/// The issuer's Ed25519 signing key, tagged with its epoch.
#[derive(Clone)]
pub struct KeyPair {
    epoch: KeyEpoch,
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn new(epoch: KeyEpoch, signing_key: SigningKey) -> Self {
        Self { epoch, signing_key }
    }

    /// Generates a key pair from the thread-local CSPRNG.
    pub fn generate(epoch: KeyEpoch) -> Self {
        let seed: [u8; SECRET_KEY_LENGTH] = rand::random();
        Self::new(epoch, SigningKey::from_bytes(&seed))
    }

    /// Builds a key pair from raw key material, either a 32-byte seed or a
    /// 64-byte keypair.
    pub fn from_bytes(epoch: KeyEpoch, bytes: &[u8]) -> Result<Self, KeyLoadError> {
        let signing_key = match bytes.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(bytes);
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LENGTH => {
                let mut keypair = [0u8; KEYPAIR_LENGTH];
                keypair.copy_from_slice(bytes);
                SigningKey::from_keypair_bytes(&keypair).map_err(|source| {
                    KeyLoadError::InvalidKey {
                        what: "signing key",
                        source,
                    }
                })?
            }
            len => {
                return Err(KeyLoadError::InvalidLength {
                    what: "signing key",
                    len,
                    expected: "32 or 64",
                })
            }
        };
        Ok(Self::new(epoch, signing_key))
    }

    pub fn epoch(&self) -> KeyEpoch {
        self.epoch
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.verifying_key().as_bytes())
    }

    /// Exports the 32-byte seed. Only meant for provisioning a secret store.
    pub fn signing_key_base64(&self) -> String {
        STANDARD.encode(self.signing_key.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("epoch", &self.epoch)
            .field("verifying_key", &self.verifying_key())
            .finish_non_exhaustive()
    }
}

/// Verifying keys trusted by a validator, one per key epoch.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: HashMap<KeyEpoch, VerifyingKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// A key ring trusting only the public half of `key_pair`.
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        let mut ring = Self::new();
        ring.insert(key_pair.epoch(), key_pair.verifying_key());
        ring
    }

    /// Trusts `key` for `epoch`, replacing any key previously registered for it.
    pub fn insert(&mut self, epoch: KeyEpoch, key: VerifyingKey) -> Option<VerifyingKey> {
        self.keys.insert(epoch, key)
    }

    /// Stops trusting `epoch`, e.g. once every ticket signed with it expired.
    pub fn remove(&mut self, epoch: KeyEpoch) -> Option<VerifyingKey> {
        self.keys.remove(&epoch)
    }

    pub fn get(&self, epoch: KeyEpoch) -> Option<&VerifyingKey> {
        self.keys.get(&epoch)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parses a `<epoch>:<base64 public key>` entry and trusts it.
    pub fn insert_entry(&mut self, entry: &str) -> Result<KeyEpoch, KeyLoadError> {
        let invalid = || KeyLoadError::InvalidKeyRingEntry {
            entry: entry.to_owned(),
        };
        let (epoch, key) = entry.trim().split_once(':').ok_or_else(invalid)?;
        let epoch = KeyEpoch(epoch.trim().parse().map_err(|_| invalid())?);
        self.insert_base64(epoch, key)?;
        Ok(epoch)
    }

    /// Trusts the base64-encoded public key `key` for `epoch`.
    pub fn insert_base64(&mut self, epoch: KeyEpoch, key: &str) -> Result<(), KeyLoadError> {
        self.insert(epoch, verifying_key_from_base64(key.trim())?);
        Ok(())
    }

    /// Checks `signature` over `message` with the key registered for `epoch`.
    ///
    /// Uses the strict Ed25519 verification, which also rejects small-order
    /// keys and non-canonical signature encodings.
    pub fn verify(
        &self,
        epoch: KeyEpoch,
        message: &[u8],
        signature: &Signature,
    ) -> Result<(), VerifyError> {
        let key = self.get(epoch).ok_or(VerifyError::UnknownEpoch { epoch })?;
        key.verify_strict(message, signature)
            .map_err(|_| VerifyError::BadSignature)
    }
}

fn decode_base64(what: &'static str, encoded: &str) -> Result<Vec<u8>, KeyLoadError> {
    STANDARD
        .decode(encoded)
        .map_err(|source| KeyLoadError::InvalidEncoding { what, source })
}

fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey, KeyLoadError> {
    const WHAT: &str = "public key";
    let bytes = decode_base64(WHAT, encoded)?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] =
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyLoadError::InvalidLength {
                what: WHAT,
                len: bytes.len(),
                expected: "32",
            })?;
    VerifyingKey::from_bytes(&bytes).map_err(|source| KeyLoadError::InvalidKey { what: WHAT, source })
}
