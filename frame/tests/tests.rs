use frame::chrono::{Duration, NaiveTime, TimeZone, Utc};
use frame::num_bigint::BigInt;
use frame::uuid::Uuid;
use frame::*;

fn samples() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Int(-42),
        Value::Int(i64::MIN),
        Value::Float(6.25),
        Value::Decimal(Decimal::new(-10050, 2)),
        Value::BigInt("-123456789012345678901234567890".parse::<BigInt>().unwrap()),
        Value::BigInt(BigInt::from(0)),
        Value::String("hey there".to_owned()),
        Value::String(String::new()),
        Value::Bool(true),
        Value::Timestamp(Utc.timestamp_nanos(-1_000_000_001)),
        Value::Time(NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap()),
        Value::Duration(Duration::milliseconds(-1500)),
        Value::Binary(vec![0, 1, 2, 255]),
        Value::Uuid(Uuid::from_bytes([7; 16])),
        Value::List(ListHandle {
            head: -3,
            tail: 4,
            len: 8,
        }),
        Value::Map(CountHandle { count: 9 }),
        Value::Set(CountHandle { count: 0 }),
        Value::TimeSeries(CountHandle { count: 2 }),
        Value::Bloom(BloomHandle {
            slots: 4,
            salt: "pepper".to_owned(),
            count: 11,
        }),
        Value::Password(PasswordRecord {
            algorithm: "argon2id".to_owned(),
            hash: vec![1, 2, 3],
            salt: vec![4, 5],
        }),
        Value::Encrypted(EncryptedRecord {
            algorithm: "aes-256-gcm".to_owned(),
            ciphertext: vec![9; 32],
            nonce: vec![8; 12],
        }),
        Value::SecretShare(SecretShare {
            index: 2,
            threshold: 3,
            share: vec![1, 1, 2, 3, 5],
        }),
        Value::Bitmap(vec![0b1010_0000]),
    ]
}

#[test]
fn every_value_survives_a_round_trip() {
    for value in samples() {
        let bytes = Frame::new(value.clone()).encode().expect("encode");
        let frame = Frame::decode_as(&bytes, value.kind()).expect("decode");
        assert_eq!(frame.value, value);
        assert_eq!(frame.expire_at, None);
    }
}

#[test]
fn wrong_accessor_is_a_type_mismatch() {
    let bytes = Frame::new(Value::from("7")).encode().unwrap();
    assert_eq!(
        Frame::decode_as(&bytes, Kind::Int),
        Err(Error::TypeMismatch {
            expected: Kind::Int,
            found: Kind::String,
        })
    );
}

#[test]
fn short_frames_are_corrupt() {
    match Frame::decode(&[Kind::Int.tag(), 1, 2]) {
        Err(Error::Corrupt(_)) => {}
        other => panic!("expected corrupt, got {:?}", other),
    }
}

#[test]
fn bool_rejects_other_bytes() {
    let mut bytes = Frame::new(Value::Bool(false)).encode().unwrap();
    bytes[1] = 2;
    match Frame::decode(&bytes) {
        Err(Error::Corrupt(_)) => {}
        other => panic!("expected corrupt, got {:?}", other),
    }
}

#[test]
fn string_rejects_invalid_utf8() {
    let mut bytes = Frame::new(Value::from("ab")).encode().unwrap();
    bytes[5] = 0xff;
    match Frame::decode(&bytes) {
        Err(Error::Corrupt(_)) => {}
        other => panic!("expected corrupt, got {:?}", other),
    }
}

#[test]
fn encoding_is_deterministic() {
    for value in samples() {
        let a = Frame::new(value.clone()).encode().unwrap();
        let b = Frame::new(value).encode().unwrap();
        assert_eq!(a, b);
    }
}
