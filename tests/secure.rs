mod common;

use common::fixture;
use tower::{Cipher, Error, HashParams, Kind, PasswordHasher, Providers, Value};

/// XORs with the key; the nonce is the key length, so decrypting with a key of
/// another length fails.
struct Xor;

impl Cipher for Xor {
    fn id(&self) -> &str {
        "xor"
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>), failure::Error> {
        if key.is_empty() {
            return Err(failure::err_msg("empty key"));
        }
        let ciphertext = plaintext
            .iter()
            .zip(key.iter().cycle())
            .map(|(p, k)| p ^ k)
            .collect();
        Ok((ciphertext, vec![key.len() as u8]))
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, failure::Error> {
        if nonce != [key.len() as u8] {
            return Err(failure::err_msg("wrong key"));
        }
        Ok(ciphertext
            .iter()
            .zip(key.iter().cycle())
            .map(|(c, k)| c ^ k)
            .collect())
    }
}

/// Reverses the password and appends the salt.
struct Reverse;

impl PasswordHasher for Reverse {
    fn id(&self) -> &str {
        "reverse"
    }

    fn hash(&self, password: &[u8], params: &HashParams) -> Result<(Vec<u8>, Vec<u8>), failure::Error> {
        let salt = vec![params.iterations as u8];
        let mut hash: Vec<u8> = password.iter().rev().cloned().collect();
        hash.extend_from_slice(&salt);
        Ok((hash, salt))
    }

    fn verify(&self, password: &[u8], hash: &[u8], salt: &[u8]) -> Result<bool, failure::Error> {
        let mut expected: Vec<u8> = password.iter().rev().cloned().collect();
        expected.extend_from_slice(salt);
        Ok(expected == hash)
    }
}

fn providers() -> Providers {
    let mut providers = Providers::new();
    providers.register_cipher(Xor).register_hasher(Reverse);
    providers
}

#[test]
fn encrypted_values_round_trip() {
    let tower = fixture().tower.with_providers(providers());
    tower
        .set_encrypted("secret", Value::from("launch codes"), "xor", b"k3y")
        .unwrap();
    assert_eq!(tower.kind("secret").unwrap(), Kind::Encrypted);
    assert_eq!(
        tower.get_decrypted("secret", b"k3y").unwrap(),
        Value::from("launch codes")
    );
}

#[test]
fn provider_failures_are_typed() {
    let tower = fixture().tower.with_providers(providers());
    assert!(matches!(
        tower.set_encrypted("s", Value::Int(1), "aes", b"k"),
        Err(Error::UnknownAlgorithm(_))
    ));
    assert!(matches!(
        tower.set_encrypted("s", Value::Int(1), "xor", b""),
        Err(Error::EncryptionFailure(_))
    ));
    tower.set_encrypted("s", Value::Int(1), "xor", b"key").unwrap();
    assert!(matches!(
        tower.get_decrypted("s", b"longer key"),
        Err(Error::DecryptionFailure(_))
    ));
    tower.set("plain", Value::Int(1)).unwrap();
    assert!(matches!(
        tower.get_decrypted("plain", b"key"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn passwords_verify() {
    let tower = fixture().tower.with_providers(providers());
    tower
        .set_password("pw", "hunter2", "reverse", &HashParams::default())
        .unwrap();
    assert_eq!(tower.kind("pw").unwrap(), Kind::Password);
    assert!(tower.verify_password("pw", "hunter2").unwrap());
    assert!(!tower.verify_password("pw", "hunter3").unwrap());
    assert!(matches!(
        tower.set_password("pw", "x", "bcrypt", &HashParams::default()),
        Err(Error::UnknownAlgorithm(_))
    ));
}
