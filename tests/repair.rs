mod common;

use common::{fixture, list_item};
use frame::{CountHandle, Frame, ListHandle};
use tower::{Engine, Kind, Value};

#[test]
fn consistent_structures_are_left_alone() {
    let f = fixture();
    f.tower.maps().create("m").unwrap();
    f.tower.maps().set("m", "a", Value::Null).unwrap();
    let report = f.tower.repair("m").unwrap();
    assert_eq!(report.kind, Kind::Map);
    assert_eq!((report.before, report.after), (1, 1));
    assert!(!report.changed);

    f.tower.set("s", Value::from("scalar")).unwrap();
    assert!(!f.tower.repair("s").unwrap().changed);
}

#[test]
fn counts_are_rebuilt_from_items() {
    let f = fixture();
    let sets = f.tower.sets();
    sets.create("s").unwrap();
    for m in &["a", "b", "c"] {
        sets.add("s", m).unwrap();
    }
    // Lose the metadata update of a fourth add.
    f.engine
        .set(b"s:S:d", &Frame::new(Value::Null).encode().unwrap())
        .unwrap();
    f.engine
        .set(
            b"s",
            &Frame::new(Value::Set(CountHandle { count: 3 }))
                .encode()
                .unwrap(),
        )
        .unwrap();

    let report = f.tower.repair("s").unwrap();
    assert_eq!((report.before, report.after), (3, 4));
    assert!(report.changed);
    assert_eq!(sets.cardinality("s").unwrap(), 4);
}

#[test]
fn bloom_counts_are_rebuilt() {
    let f = fixture();
    let blooms = f.tower.blooms();
    blooms.create("b", None).unwrap();
    blooms.add("b", "x").unwrap();
    blooms.add("b", "y").unwrap();
    f.engine.delete(b"b:B:y").unwrap();

    let report = f.tower.repair("b").unwrap();
    assert_eq!((report.before, report.after), (2, 1));
    assert_eq!(blooms.len("b").unwrap(), 1);
    assert!(blooms.contains("b", "x").unwrap());
}

#[test]
fn list_holes_are_closed() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for i in 0..5 {
        lists.push_right("l", Value::Int(i)).unwrap();
    }
    f.engine.delete(&list_item("l", 1)).unwrap();
    f.engine.delete(&list_item("l", 3)).unwrap();

    let report = f.tower.repair("l").unwrap();
    assert_eq!((report.before, report.after), (5, 3));
    assert!(report.changed);
    assert_eq!(
        f.tower.get("l").unwrap(),
        Value::List(ListHandle {
            head: 0,
            tail: 2,
            len: 3
        })
    );
    assert_eq!(
        lists.range("l", 0, -1).unwrap(),
        vec![Value::Int(0), Value::Int(2), Value::Int(4)]
    );
    assert_eq!(f.engine.len(), 4);
}

#[test]
fn list_with_no_items_becomes_canonical() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    lists.push_left("l", Value::Int(1)).unwrap();
    f.engine.delete(&list_item("l", -1)).unwrap();

    let report = f.tower.repair("l").unwrap();
    assert_eq!(report.after, 0);
    assert_eq!(f.tower.get("l").unwrap(), Value::List(ListHandle::empty()));
}
