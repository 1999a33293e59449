//! Identity sharing: the same dictionary reachable from two list positions
//! decodes back to one dictionary, not two equal-but-distinct copies.

mod common;

use common::DemoReflector;
use jelly::{jelly, unjelly, Permissive, Value};

#[test]
fn shared_dict_decodes_to_one_identity() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();

    let shared = Value::dict(vec![(Value::Str("k".to_owned()), Value::Int(42))]);
    let original = Value::list(vec![shared.clone(), shared.clone(), Value::Int(0)]);

    let wire = jelly(&original, &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::List(items) = decoded else { panic!("expected a list") };
    let items = items.borrow();
    let (Value::Dict(first), Value::Dict(second)) = (&items[0], &items[1]) else {
        panic!("expected both shared positions to decode as dictionaries");
    };
    assert!(std::rc::Rc::ptr_eq(first, second), "shared dictionary must decode to the same allocation");

    // Mutating through one handle is visible through the other — proof this
    // is one dictionary, not a structurally-equal pair.
    first.borrow_mut().push(Value::Str("new".to_owned()), Value::Bool(true));
    assert_eq!(second.borrow().0.len(), 2);
}

#[test]
fn unshared_equal_dicts_stay_distinct() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();

    let a = Value::dict(vec![(Value::Str("k".to_owned()), Value::Int(1))]);
    let b = Value::dict(vec![(Value::Str("k".to_owned()), Value::Int(1))]);
    let original = Value::list(vec![a, b]);

    let wire = jelly(&original, &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::List(items) = decoded else { panic!("expected a list") };
    let items = items.borrow();
    let (Value::Dict(first), Value::Dict(second)) = (&items[0], &items[1]) else {
        panic!("expected dictionaries");
    };
    assert!(!std::rc::Rc::ptr_eq(first, second), "two structurally-equal but distinct dicts must stay distinct");
}
