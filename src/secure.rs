//! Encrypted values and password hashes.
//!
//! Tower ships no cryptography of its own. Callers register providers under an
//! algorithm id; the id is stored beside every ciphertext and hash, so values
//! written with one provider stay readable while others are added.

use crate::{Error, Result, Tower};
use frame::{EncryptedRecord, Frame, Kind, PasswordRecord, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A symmetric cipher.
pub trait Cipher: Send + Sync {
    /// The algorithm id stored with each ciphertext.
    fn id(&self) -> &str;

    /// Returns the ciphertext and the nonce it was sealed with.
    fn encrypt(
        &self,
        key: &[u8],
        plaintext: &[u8],
    ) -> std::result::Result<(Vec<u8>, Vec<u8>), failure::Error>;

    fn decrypt(
        &self,
        key: &[u8],
        ciphertext: &[u8],
        nonce: &[u8],
    ) -> std::result::Result<Vec<u8>, failure::Error>;
}

/// Cost settings handed to a `PasswordHasher`. Each hasher reads the fields it
/// understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for HashParams {
    fn default() -> Self {
        HashParams {
            iterations: 3,
            memory_kib: 64 * 1024,
            parallelism: 1,
        }
    }
}

pub trait PasswordHasher: Send + Sync {
    fn id(&self) -> &str;

    /// Returns the hash and the salt it was computed with.
    fn hash(
        &self,
        password: &[u8],
        params: &HashParams,
    ) -> std::result::Result<(Vec<u8>, Vec<u8>), failure::Error>;

    fn verify(
        &self,
        password: &[u8],
        hash: &[u8],
        salt: &[u8],
    ) -> std::result::Result<bool, failure::Error>;
}

/// Registered ciphers and hashers, keyed by algorithm id.
#[derive(Clone, Default)]
pub struct Providers {
    ciphers: HashMap<String, Arc<dyn Cipher>>,
    hashers: HashMap<String, Arc<dyn PasswordHasher>>,
}

impl Providers {
    pub fn new() -> Self {
        Providers::default()
    }

    /// Registers `cipher`, replacing any cipher with the same id.
    pub fn register_cipher<C: Cipher + 'static>(&mut self, cipher: C) -> &mut Self {
        self.ciphers.insert(cipher.id().to_owned(), Arc::new(cipher));
        self
    }

    pub fn register_hasher<H: PasswordHasher + 'static>(&mut self, hasher: H) -> &mut Self {
        self.hashers.insert(hasher.id().to_owned(), Arc::new(hasher));
        self
    }

    fn cipher(&self, id: &str) -> Result<&Arc<dyn Cipher>> {
        self.ciphers
            .get(id)
            .ok_or_else(|| Error::UnknownAlgorithm(id.to_owned()))
    }

    fn hasher(&self, id: &str) -> Result<&Arc<dyn PasswordHasher>> {
        self.hashers
            .get(id)
            .ok_or_else(|| Error::UnknownAlgorithm(id.to_owned()))
    }
}

impl Tower {
    /// Encrypts `value` with the cipher registered as `algorithm` and stores
    /// the result at `key`.
    pub fn set_encrypted(
        &self,
        key: &str,
        value: Value,
        algorithm: &str,
        secret: &[u8],
    ) -> Result<()> {
        let cipher = self.providers.cipher(algorithm)?;
        let plaintext = Frame::new(value).encode()?;
        let (ciphertext, nonce) = cipher
            .encrypt(secret, &plaintext)
            .map_err(|err| Error::EncryptionFailure(err.to_string()))?;
        self.set(
            key,
            Value::Encrypted(EncryptedRecord {
                algorithm: algorithm.to_owned(),
                ciphertext,
                nonce,
            }),
        )
    }

    /// Decrypts the value at `key` with the cipher it was written with.
    pub fn get_decrypted(&self, key: &str, secret: &[u8]) -> Result<Value> {
        let record = match self.get_as(key, Kind::Encrypted)? {
            Value::Encrypted(record) => record,
            other => return Err(other.mismatch(Kind::Encrypted).into()),
        };
        let cipher = self.providers.cipher(&record.algorithm)?;
        let plaintext = cipher
            .decrypt(secret, &record.ciphertext, &record.nonce)
            .map_err(|err| Error::DecryptionFailure(err.to_string()))?;
        // Garbage out of a cipher without authentication means a wrong key.
        Frame::decode(&plaintext)
            .map(|frame| frame.value)
            .map_err(|err| Error::DecryptionFailure(err.to_string()))
    }

    pub fn set_password(
        &self,
        key: &str,
        password: &str,
        algorithm: &str,
        params: &HashParams,
    ) -> Result<()> {
        let hasher = self.providers.hasher(algorithm)?;
        let (hash, salt) = hasher
            .hash(password.as_bytes(), params)
            .map_err(|err| Error::EncryptionFailure(err.to_string()))?;
        self.set(
            key,
            Value::Password(PasswordRecord {
                algorithm: algorithm.to_owned(),
                hash,
                salt,
            }),
        )
    }

    pub fn verify_password(&self, key: &str, password: &str) -> Result<bool> {
        let record = match self.get_as(key, Kind::Password)? {
            Value::Password(record) => record,
            other => return Err(other.mismatch(Kind::Password).into()),
        };
        let hasher = self.providers.hasher(&record.algorithm)?;
        hasher
            .verify(password.as_bytes(), &record.hash, &record.salt)
            .map_err(|err| Error::DecryptionFailure(err.to_string()))
    }
}
