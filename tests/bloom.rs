mod common;

use common::fixture;
use tower::{Error, Value};

#[test]
fn membership_is_exact() {
    let f = fixture();
    let blooms = f.tower.blooms();
    blooms.create("seen", None).unwrap();

    assert_eq!(blooms.add("seen", "alice").unwrap(), 1);
    assert_eq!(blooms.add("seen", "bob").unwrap(), 2);
    assert!(blooms.contains("seen", "alice").unwrap());
    assert!(blooms.contains("seen", "bob").unwrap());
    for i in 0..1000 {
        assert!(!blooms.contains("seen", &format!("stranger{}", i)).unwrap());
    }
}

#[test]
fn re_adding_does_not_count_twice() {
    let f = fixture();
    let blooms = f.tower.blooms();
    blooms.create("b", Some(5)).unwrap();
    blooms.add("b", "x").unwrap();
    assert_eq!(blooms.add("b", "x").unwrap(), 1);
    assert_eq!(blooms.len("b").unwrap(), 1);
}

#[test]
fn slots_must_be_three_to_five() {
    let f = fixture();
    let blooms = f.tower.blooms();
    assert!(matches!(blooms.create("b", Some(2)), Err(Error::OutOfRange)));
    assert!(matches!(blooms.create("b", Some(6)), Err(Error::OutOfRange)));
    assert!(!f.tower.exists("b").unwrap());
    blooms.create("b", Some(4)).unwrap();
    match f.tower.get("b").unwrap() {
        Value::Bloom(handle) => {
            assert_eq!(handle.slots, 4);
            assert_eq!(handle.count, 0);
            assert!(!handle.salt.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn filters_with_different_salts_store_different_vectors() {
    let f = fixture();
    let blooms = f.tower.blooms();
    blooms.create("a", None).unwrap();
    blooms.create("b", None).unwrap();
    blooms.add("a", "item").unwrap();
    blooms.add("b", "item").unwrap();

    use tower::Engine;
    let first = f.engine.get(b"a:B:item").unwrap().unwrap();
    let second = f.engine.get(b"b:B:item").unwrap().unwrap();
    assert_ne!(first, second);
}

#[test]
fn clear_forgets_items_but_keeps_the_filter() {
    let f = fixture();
    let blooms = f.tower.blooms();
    blooms.create("b", None).unwrap();
    blooms.add("b", "x").unwrap();
    blooms.add("b", "y").unwrap();
    blooms.clear("b").unwrap();

    assert_eq!(blooms.len("b").unwrap(), 0);
    assert!(!blooms.contains("b", "x").unwrap());
    assert_eq!(f.engine.len(), 1);

    blooms.add("b", "x").unwrap();
    assert!(blooms.contains("b", "x").unwrap());
    blooms.delete("b").unwrap();
    assert!(f.engine.is_empty());
}
