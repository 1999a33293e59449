//! Symbolic round-trips: module, class, function, and bound/unbound
//! method handles, plus back-reference sharing across repeated symbolic
//! occurrences.

mod common;

use common::DemoReflector;
use jelly::{jelly, unjelly, HasIdentity, Permissive, Reflector, Value};

#[test]
fn module_roundtrips_by_name() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");

    let wire = jelly(&Value::Module(module), &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::Module(decoded) = decoded else { panic!("expected a module") };
    assert_eq!(reflector.module_name(&decoded), "m");
}

#[test]
fn class_roundtrips_with_its_module() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");
    let class = reflector.class(&module, "C", &[]);

    let wire = jelly(&Value::Class(class), &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::Class(decoded) = decoded else { panic!("expected a class") };
    assert_eq!(reflector.class_name(&decoded), "C");
    assert_eq!(reflector.module_name(&reflector.class_module(&decoded)), "m");
}

#[test]
fn function_roundtrips_with_its_module() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");
    let function = reflector.function(&module, "f");

    let wire = jelly(&Value::Function(function), &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::Function(decoded) = decoded else { panic!("expected a function") };
    assert_eq!(reflector.function_name(&decoded), "f");
}

#[test]
fn bound_method_roundtrips_with_its_receiver() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");
    let class = reflector.class(&module, "C", &["greet"]);
    let instance = reflector.instance(&class, vec![]);
    let method = reflector.make_method(&class, "greet", Some(instance.clone())).unwrap();

    let wire = jelly(&Value::Method(method), &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::Method(decoded) = decoded else { panic!("expected a method") };
    let (name, receiver, class_back) = reflector.method_parts(&decoded);
    assert_eq!(name, "greet");
    assert_eq!(reflector.class_name(&class_back), "C");
    let receiver = receiver.expect("bound method must keep its receiver");
    assert_eq!(receiver.identity(), instance.identity());
}

#[test]
fn unbound_method_roundtrips_with_no_receiver() {
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");
    let class = reflector.class(&module, "C", &["greet"]);
    let method = reflector.make_method(&class, "greet", None).unwrap();

    let wire = jelly(&Value::Method(method), &reflector, &taster, None).unwrap();
    let decoded: Value<DemoReflector> = unjelly(&wire, &reflector, &taster, None).unwrap();

    let Value::Method(decoded) = decoded else { panic!("expected a method") };
    let (_, receiver, _) = reflector.method_parts(&decoded);
    assert!(receiver.is_none(), "unbound method must decode with no receiver");
}

#[test]
fn repeated_class_occurrence_backreferences_the_same_class() {
    // Two instances of the same class: the class symbol itself should be
    // shared via `reference`/`dereference`, not duplicated structurally
    // (`spec.md` §4.3 step 6: "preserved for back-referencing").
    let reflector = DemoReflector::new();
    let taster = Permissive::new();
    let module = reflector.module("m");
    let class = reflector.class(&module, "C", &[]);
    let a = reflector.instance(&class, vec![]);
    let b = reflector.instance(&class, vec![]);

    let original = Value::list(vec![Value::Instance(a), Value::Instance(b)]);
    let wire = jelly(&original, &reflector, &taster, None).unwrap();

    let rendered = format!("{wire:?}");
    assert!(rendered.contains("Dereference") || rendered.contains("dereference"), "expected a dereference back to the shared class: {rendered}");
}
