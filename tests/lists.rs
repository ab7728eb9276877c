mod common;

use common::{fixture, list_item};
use frame::ListHandle;
use tower::{Engine, Error, Value};

fn strings(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

#[test]
fn push_and_pop_from_both_ends() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();

    assert_eq!(lists.push_right("l", Value::from("a")).unwrap(), 1);
    assert_eq!(lists.push_right("l", Value::from("b")).unwrap(), 2);
    assert_eq!(lists.push_left("l", Value::from("z")).unwrap(), 3);
    assert_eq!(lists.range("l", 0, -1).unwrap(), strings(&["z", "a", "b"]));

    assert_eq!(lists.pop_left("l").unwrap(), Value::from("z"));
    assert_eq!(lists.pop_right("l").unwrap(), Value::from("b"));
    assert_eq!(lists.len("l").unwrap(), 1);
    assert_eq!(lists.index("l", -1).unwrap(), Value::from("a"));
}

#[test]
fn first_left_push_lands_at_minus_one() {
    let f = fixture();
    f.tower.lists().create("l").unwrap();
    f.tower.lists().push_left("l", Value::Int(7)).unwrap();
    assert_eq!(
        f.tower.get("l").unwrap(),
        Value::List(ListHandle {
            head: -1,
            tail: -1,
            len: 1
        })
    );
    assert!(f.engine.get(&list_item("l", -1)).unwrap().is_some());
}

#[test]
fn emptied_list_returns_to_canonical_state() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    lists.push_left("l", Value::Int(1)).unwrap();
    lists.push_left("l", Value::Int(2)).unwrap();
    lists.pop_right("l").unwrap();
    lists.pop_right("l").unwrap();

    assert_eq!(f.tower.get("l").unwrap(), Value::List(ListHandle::empty()));
    assert!(matches!(lists.pop_left("l"), Err(Error::Empty)));
    assert!(matches!(lists.pop_right("l"), Err(Error::Empty)));
    // Only the metadata is left.
    assert_eq!(f.engine.len(), 1);
}

#[test]
fn index_bounds() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for v in &["a", "b", "c"] {
        lists.push_right("l", Value::from(*v)).unwrap();
    }
    assert_eq!(lists.index("l", 0).unwrap(), Value::from("a"));
    assert_eq!(lists.index("l", -3).unwrap(), Value::from("a"));
    assert!(matches!(lists.index("l", 3), Err(Error::OutOfRange)));
    assert!(matches!(lists.index("l", -4), Err(Error::OutOfRange)));
}

#[test]
fn range_clamps_and_handles_inverted_spans() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for v in &["a", "b", "c", "d"] {
        lists.push_right("l", Value::from(*v)).unwrap();
    }
    assert_eq!(lists.range("l", 1, 2).unwrap(), strings(&["b", "c"]));
    assert_eq!(lists.range("l", -2, 100).unwrap(), strings(&["c", "d"]));
    assert_eq!(lists.range("l", 3, 1).unwrap(), Vec::<Value>::new());
    assert_eq!(lists.range("l", 10, 20).unwrap(), Vec::<Value>::new());
}

#[test]
fn set_overwrites_in_place() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    lists.push_right("l", Value::from("a")).unwrap();
    lists.push_right("l", Value::from("b")).unwrap();
    lists.set("l", -1, Value::from("B")).unwrap();
    assert_eq!(lists.range("l", 0, -1).unwrap(), strings(&["a", "B"]));
    assert!(matches!(
        lists.set("l", 2, Value::Null),
        Err(Error::OutOfRange)
    ));
}

#[test]
fn trim_keeps_the_requested_span() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for v in &["a", "b", "c", "d", "e"] {
        lists.push_right("l", Value::from(*v)).unwrap();
    }
    lists.trim("l", 1, -2).unwrap();
    assert_eq!(lists.range("l", 0, -1).unwrap(), strings(&["b", "c", "d"]));
    assert_eq!(f.engine.len(), 4);

    lists.trim("l", 5, 9).unwrap();
    assert_eq!(f.tower.get("l").unwrap(), Value::List(ListHandle::empty()));
    assert_eq!(f.engine.len(), 1);
}

#[test]
fn missing_and_mistyped_keys() {
    let f = fixture();
    let lists = f.tower.lists();
    assert!(matches!(
        lists.push_right("nope", Value::Null),
        Err(Error::NotFound)
    ));
    lists.create("l").unwrap();
    assert!(matches!(lists.create("l"), Err(Error::AlreadyExists)));

    f.tower.maps().create("m").unwrap();
    assert!(matches!(
        lists.push_right("m", Value::Null),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn delete_removes_every_item() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for i in 0..10 {
        lists.push_left("l", Value::Int(i)).unwrap();
    }
    lists.delete("l").unwrap();
    assert!(f.engine.is_empty());
    assert!(matches!(lists.len("l"), Err(Error::NotFound)));
}

#[test]
fn items_with_negative_indices_scan_in_order() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    lists.push_right("l", Value::Int(0)).unwrap();
    lists.push_left("l", Value::Int(-1)).unwrap();
    lists.push_left("l", Value::Int(-2)).unwrap();

    let items: Vec<Value> = f
        .engine
        .scan_prefix(b"l:L:")
        .unwrap()
        .into_iter()
        .map(|(_, bytes)| tower::Frame::decode(&bytes).unwrap().value)
        .collect();
    assert_eq!(items, vec![Value::Int(-2), Value::Int(-1), Value::Int(0)]);
}

#[test]
fn index_agrees_with_full_range_across_zero() {
    let f = fixture();
    let lists = f.tower.lists();
    lists.create("l").unwrap();
    for i in 0..4 {
        lists.push_left("l", Value::Int(-1 - i)).unwrap();
        lists.push_right("l", Value::Int(i)).unwrap();
    }
    lists.pop_left("l").unwrap();

    let all = lists.range("l", 0, -1).unwrap();
    let len = lists.len("l").unwrap();
    assert_eq!(all.len() as i64, len);
    for i in -len..len {
        let expected = &all[if i < 0 { len + i } else { i } as usize];
        assert_eq!(&lists.index("l", i).unwrap(), expected, "index {}", i);
    }
    assert!(matches!(lists.index("l", len), Err(Error::OutOfRange)));
    assert!(matches!(lists.index("l", -len - 1), Err(Error::OutOfRange)));
}
