//! A minimal in-memory host registry implementing `jelly::Reflector`, used
//! by every integration test in this directory. Not part of the public API.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jelly::{rc_identity, HasIdentity, Identity, ReflectError, Reflector, Value};

struct ModuleData {
    name: String,
    classes: RefCell<HashMap<String, Class>>,
    functions: RefCell<HashMap<String, Function>>,
}

#[derive(Clone)]
pub struct Module(Rc<ModuleData>);

impl HasIdentity for Module {
    fn identity(&self) -> Identity {
        rc_identity(&self.0)
    }
}

struct ClassData {
    name: String,
    module: Module,
    /// Own-class method names, deliberately not inherited — this harness
    /// implements the strict method-resolution policy the crate
    /// standardizes on.
    methods: Vec<String>,
}

#[derive(Clone)]
pub struct Class(Rc<ClassData>);

impl HasIdentity for Class {
    fn identity(&self) -> Identity {
        rc_identity(&self.0)
    }
}

struct FunctionData {
    name: String,
    module: Module,
}

#[derive(Clone)]
pub struct Function(Rc<FunctionData>);

impl HasIdentity for Function {
    fn identity(&self) -> Identity {
        rc_identity(&self.0)
    }
}

struct MethodData {
    name: String,
    receiver: Option<Instance>,
    class: Class,
}

#[derive(Clone)]
pub struct Method(Rc<MethodData>);

impl HasIdentity for Method {
    fn identity(&self) -> Identity {
        rc_identity(&self.0)
    }
}

struct InstanceData {
    class: Class,
    attrs: RefCell<Vec<(String, Value<DemoReflector>)>>,
}

#[derive(Clone)]
pub struct Instance(Rc<InstanceData>);

impl HasIdentity for Instance {
    fn identity(&self) -> Identity {
        rc_identity(&self.0)
    }
}

/// A registry of modules/classes/functions/instances a test populates
/// before calling `jelly`/`unjelly`. Implements `Reflector` directly.
#[derive(Default)]
pub struct DemoReflector {
    modules: RefCell<HashMap<String, Module>>,
}

impl DemoReflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self, name: &str) -> Module {
        if let Some(m) = self.modules.borrow().get(name) {
            return m.clone();
        }
        let module = Module(Rc::new(ModuleData {
            name: name.to_owned(),
            classes: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
        }));
        self.modules.borrow_mut().insert(name.to_owned(), module.clone());
        module
    }

    pub fn class(&self, module: &Module, name: &str, methods: &[&str]) -> Class {
        let class = Class(Rc::new(ClassData {
            name: name.to_owned(),
            module: module.clone(),
            methods: methods.iter().map(|s| (*s).to_owned()).collect(),
        }));
        module.0.classes.borrow_mut().insert(name.to_owned(), class.clone());
        class
    }

    pub fn function(&self, module: &Module, name: &str) -> Function {
        let function = Function(Rc::new(FunctionData { name: name.to_owned(), module: module.clone() }));
        module.0.functions.borrow_mut().insert(name.to_owned(), function.clone());
        function
    }

    pub fn instance(&self, class: &Class, attrs: Vec<(&str, Value<DemoReflector>)>) -> Instance {
        Instance(Rc::new(InstanceData {
            class: class.clone(),
            attrs: RefCell::new(attrs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect()),
        }))
    }
}

impl Reflector for DemoReflector {
    type Instance = Instance;
    type Class = Class;
    type Module = Module;
    type Function = Function;
    type Method = Method;

    fn find_module(&self, name: &str) -> Result<Self::Module, ReflectError> {
        self.modules.borrow().get(name).cloned().ok_or_else(|| ReflectError(format!("no such module `{name}`")))
    }

    fn module_name(&self, module: &Self::Module) -> String {
        module.0.name.clone()
    }

    fn find_class(&self, module: &Self::Module, name: &str) -> Result<Self::Class, ReflectError> {
        module.0.classes.borrow().get(name).cloned().ok_or_else(|| ReflectError(format!("no such class `{name}`")))
    }

    fn find_function(&self, module: &Self::Module, name: &str) -> Result<Self::Function, ReflectError> {
        module.0.functions.borrow().get(name).cloned().ok_or_else(|| ReflectError(format!("no such function `{name}`")))
    }

    fn class_name(&self, class: &Self::Class) -> String {
        class.0.name.clone()
    }

    fn class_module(&self, class: &Self::Class) -> Self::Module {
        class.0.module.clone()
    }

    fn function_name(&self, function: &Self::Function) -> String {
        function.0.name.clone()
    }

    fn function_module(&self, function: &Self::Function) -> Self::Module {
        function.0.module.clone()
    }

    fn instance_class(&self, instance: &Self::Instance) -> Self::Class {
        instance.0.class.clone()
    }

    fn export_state(&self, instance: &Self::Instance) -> Value<Self> {
        let entries =
            instance.0.attrs.borrow().iter().map(|(k, v)| (Value::Str(k.clone()), v.clone())).collect();
        Value::dict(entries)
    }

    fn new_instance(&self, class: &Self::Class) -> Result<Self::Instance, ReflectError> {
        Ok(Instance(Rc::new(InstanceData { class: class.clone(), attrs: RefCell::new(Vec::new()) })))
    }

    fn install_state(&self, instance: &Self::Instance, state: Value<Self>) -> Result<(), ReflectError> {
        let Value::Dict(dict) = state else {
            return Err(ReflectError("instance state must be a dictionary".to_owned()));
        };
        let mut attrs = Vec::new();
        for (key, value) in &dict.borrow().0 {
            let Value::Str(key) = key else {
                return Err(ReflectError("instance attribute keys must be strings".to_owned()));
            };
            attrs.push((key.clone(), value.clone()));
        }
        *instance.0.attrs.borrow_mut() = attrs;
        Ok(())
    }

    fn method_parts(&self, method: &Self::Method) -> (String, Option<Self::Instance>, Self::Class) {
        (method.0.name.clone(), method.0.receiver.clone(), method.0.class.clone())
    }

    fn make_method(
        &self,
        class: &Self::Class,
        name: &str,
        receiver: Option<Self::Instance>,
    ) -> Result<Self::Method, ReflectError> {
        if !class.0.methods.iter().any(|m| m == name) {
            return Err(ReflectError(format!("class `{}` has no method `{name}`", class.0.name)));
        }
        Ok(Method(Rc::new(MethodData { name: name.to_owned(), receiver, class: class.clone() })))
    }
}

/// Reads an instance's attribute by name, for test assertions.
pub fn attr(instance: &Instance, name: &str) -> Option<Value<DemoReflector>> {
    instance.0.attrs.borrow().iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
}
