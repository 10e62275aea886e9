//! Sample host types registered for the integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether::{BinderOptions, ObjectBinder};
use tether_core::{
    Callable, CallableKind, ConstraintViolation, Delegate, EventInfo, FieldInfo, HostArray,
    HostException, HostObject, HostType, HostValue, OperatorName, Param, PrimitiveKind,
    PropertyInfo, ScriptError, ScriptState, ScriptValue, TypeInfo,
};
use tether_registry::{GenericConstraint, TypeBuilder, TypeRegistry};
use tether_vm::Vm;

pub fn int() -> HostType {
    HostType::primitive(PrimitiveKind::Int32)
}

pub fn double() -> HostType {
    HostType::primitive(PrimitiveKind::Float64)
}

pub fn byte() -> HostType {
    HostType::primitive(PrimitiveKind::Uint8)
}

pub fn as_i32(value: &HostValue) -> i32 {
    match value {
        HostValue::I32(v) => *v,
        other => panic!("expected int, got {other:?}"),
    }
}

pub fn as_f64(value: &HostValue) -> f64 {
    match value {
        HostValue::F64(v) => *v,
        other => panic!("expected double, got {other:?}"),
    }
}

#[derive(Debug, Default)]
pub struct Counter {
    pub count: Cell<i32>,
    pub level: Cell<u8>,
    pub name: RefCell<String>,
    pub items: RefCell<Vec<i32>>,
    pub handlers: RefCell<Vec<HostValue>>,
}

pub fn counter_of(this: Option<&HostValue>) -> &Counter {
    this.and_then(|value| value.downcast_ref::<Counter>())
        .expect("receiver is a Counter")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

pub fn vector_of(value: &HostValue) -> Vector {
    *value.downcast_ref::<Vector>().expect("a Vector")
}

/// Payload of `Box<T>` instances.
pub struct Boxed(pub RefCell<HostValue>);

pub struct Types {
    pub counter: HostType,
    pub mode: HostType,
    pub handler: HostType,
    pub vector: HostType,
    pub shape: HostType,
    pub transform: HostType,
    pub boxed: HostType,
}

fn counter_type(registry: &mut TypeRegistry) -> (HostType, HostType, HostType) {
    let counter = TypeInfo::class("Counter").build();
    let mode = TypeInfo::class("Counter.Mode").build();
    let handler = TypeInfo::delegate("EventHandler").build();
    let string = HostType::string();

    let name = PropertyInfo::new("Name", string.clone())
        .with_getter(
            Callable::builder("get_Name", CallableKind::Accessor)
                .returns(string.clone())
                .invoke(|this, _| Ok(HostValue::string(counter_of(this).name.borrow().as_str()))),
        )
        .with_setter(
            Callable::builder("set_Name", CallableKind::Accessor)
                .param(Param::new("value", string.clone()))
                .invoke(|this, args| {
                    let name = args[0].as_str().unwrap_or_default();
                    if name.is_empty() {
                        return Err(HostException::new("name must not be empty"));
                    }
                    *counter_of(this).name.borrow_mut() = name.to_string();
                    Ok(HostValue::Null)
                }),
        );

    let doubled = PropertyInfo::new("Doubled", int()).with_getter(
        Callable::builder("get_Doubled", CallableKind::Accessor)
            .returns(int())
            .invoke(|this, _| Ok(HostValue::I32(counter_of(this).count.get() * 2))),
    );

    let secret = PropertyInfo::new("Secret", string.clone()).with_setter(
        Callable::builder("set_Secret", CallableKind::Accessor)
            .param(Param::new("value", string.clone()))
            .invoke(|_, _| Ok(HostValue::Null)),
    );

    let item = PropertyInfo::new("Item", int())
        .with_index(vec![Param::new("index", int())])
        .with_getter(
            Callable::builder("get_Item", CallableKind::Accessor)
                .param(Param::new("index", int()))
                .returns(int())
                .invoke(|this, args| {
                    let index = as_i32(&args[0]) as usize;
                    counter_of(this)
                        .items
                        .borrow()
                        .get(index)
                        .map(|v| HostValue::I32(*v))
                        .ok_or_else(|| HostException::new("index out of range"))
                }),
        )
        .with_setter(
            Callable::builder("set_Item", CallableKind::Accessor)
                .params([Param::new("index", int()), Param::new("value", int())])
                .invoke(|this, args| {
                    let index = as_i32(&args[0]) as usize;
                    let mut items = counter_of(this).items.borrow_mut();
                    if items.len() <= index {
                        items.resize(index + 1, 0);
                    }
                    items[index] = as_i32(&args[1]);
                    Ok(HostValue::Null)
                }),
        );

    let changed = EventInfo {
        name: "Changed".into(),
        handler_type: handler.clone(),
        is_static: false,
        add: Callable::method(
            "add_Changed",
            vec![Param::new("handler", handler.clone())],
            HostType::void(),
            |this, args| {
                counter_of(this).handlers.borrow_mut().push(args[0].clone());
                Ok(HostValue::Null)
            },
        ),
        remove: Callable::method(
            "remove_Changed",
            vec![Param::new("handler", HostType::object())],
            HostType::void(),
            |this, args| {
                counter_of(this).handlers.borrow_mut().retain(|h| *h != args[0]);
                Ok(HostValue::Null)
            },
        ),
    };

    let describe_generic = Callable::builder("Describe", CallableKind::Method)
        .static_()
        .generic(1, |type_args| {
            let ty = type_args[0].clone();
            Ok(Callable::builder("Describe", CallableKind::Method)
                .static_()
                .param(Param::new("value", ty.clone()))
                .returns(HostType::string())
                .type_args(vec![ty.clone()])
                .invoke(move |_, args| {
                    let text = args[0].stringify().unwrap_or_default();
                    Ok(HostValue::string(format!("{ty}:{text}")))
                }))
        });

    let only_values = Callable::builder("NameOf", CallableKind::Method)
        .static_()
        .generic(1, |type_args| {
            let ty = type_args[0].clone();
            if !ty.is_value_type() {
                return Err(ConstraintViolation::new(format!("{ty} is not a value type")));
            }
            Ok(Callable::builder("NameOf", CallableKind::Method)
                .static_()
                .returns(HostType::string())
                .type_args(vec![ty.clone()])
                .invoke(move |_, _| Ok(HostValue::string(ty.name()))))
        });

    let builder = TypeBuilder::new(counter.clone())
        .constructor(Callable::constructor(&counter, vec![], {
            let ty = counter.clone();
            move |_| Ok(HostValue::Object(HostObject::new(ty.clone(), Counter::default())))
        }))
        .constructor(Callable::constructor(&counter, vec![Param::new("start", int())], {
            let ty = counter.clone();
            move |args| {
                let counter = Counter::default();
                counter.count.set(as_i32(&args[0]));
                Ok(HostValue::Object(HostObject::new(ty.clone(), counter)))
            }
        }))
        .field(FieldInfo::new(
            "Count",
            int(),
            |this| HostValue::I32(counter_of(this).count.get()),
            |this, value| {
                counter_of(this).count.set(as_i32(&value));
                Ok(())
            },
        ))
        .field(FieldInfo::new(
            "Level",
            byte(),
            |this| HostValue::U8(counter_of(this).level.get()),
            |this, value| match value {
                HostValue::U8(v) => {
                    counter_of(this).level.set(v);
                    Ok(())
                }
                other => Err(HostException::new(format!("not a byte: {other:?}"))),
            },
        ))
        .field(FieldInfo::constant("Max", int(), HostValue::I32(100)))
        .property(name)
        .property(doubled)
        .property(secret)
        .property(item)
        .event(changed)
        .nested("Mode", mode.clone())
        .method(Callable::method("Add", vec![Param::new("by", int())], int(), |this, args| {
            let counter = counter_of(this);
            counter.count.set(counter.count.get() + as_i32(&args[0]));
            Ok(HostValue::I32(counter.count.get()))
        }))
        .method(Callable::method(
            "Add",
            vec![
                Param::new("a", int()),
                Param::optional("b", int(), HostValue::I32(0)),
            ],
            int(),
            |this, args| {
                let counter = counter_of(this);
                counter.count.set(counter.count.get() + as_i32(&args[0]) + as_i32(&args[1]));
                Ok(HostValue::I32(counter.count.get()))
            },
        ))
        .method(Callable::static_method(
            "TryParse",
            vec![Param::new("text", string.clone()), Param::out("value", int())],
            HostType::primitive(PrimitiveKind::Bool),
            |_, args| {
                let parsed = args[0].as_str().and_then(|text| text.parse::<i32>().ok());
                args[1] = HostValue::I32(parsed.unwrap_or(0));
                Ok(HostValue::Bool(parsed.is_some()))
            },
        ))
        .method(Callable::static_method(
            "Sum",
            vec![Param::variadic("values", int())],
            int(),
            |_, args| match &args[0] {
                HostValue::Array(values) => Ok(HostValue::I32(values.to_vec().iter().map(as_i32).sum())),
                other => Err(HostException::new(format!("expected an array, got {other:?}"))),
            },
        ))
        .method(Callable::static_method(
            "Describe",
            vec![Param::new("value", int())],
            string.clone(),
            |_, args| Ok(HostValue::string(format!("int:{}", as_i32(&args[0])))),
        ))
        .method(describe_generic)
        .method(only_values)
        .method(Callable::method("Fail", vec![], HostType::void(), |_, _| {
            Err(HostException::new("counter is broken"))
        }))
        .method(Callable::method("Explode", vec![], HostType::void(), |_, _| {
            panic!("counter exploded")
        }));

    registry.register(builder).expect("Counter registers");
    (counter, mode, handler)
}

fn vector_type(registry: &mut TypeRegistry) -> HostType {
    let vector = TypeInfo::class("Vector").build();
    let make = {
        let ty = vector.clone();
        move |x: f64, y: f64| HostValue::Object(HostObject::displayable(ty.clone(), Vector { x, y }))
    };

    let component = |name: &'static str, pick: fn(&Vector) -> f64| {
        PropertyInfo::new(name, double()).with_getter(
            Callable::builder(format!("get_{name}"), CallableKind::Accessor)
                .returns(double())
                .invoke(move |this, _| Ok(HostValue::F64(pick(&vector_of(this.expect("receiver")))))),
        )
    };

    let binary = |name: &str, left: HostType, right: HostType, ret: HostType, f: Rc<dyn Fn(&[HostValue]) -> HostValue>| {
        Callable::static_method(name, vec![Param::new("a", left), Param::new("b", right)], ret, move |_, args| Ok(f(&*args)))
    };

    let add = {
        let make = make.clone();
        binary(
            "op_Addition",
            vector.clone(),
            vector.clone(),
            vector.clone(),
            Rc::new(move |args: &[HostValue]| {
                let (a, b) = (vector_of(&args[0]), vector_of(&args[1]));
                make(a.x + b.x, a.y + b.y)
            }),
        )
    };
    let scale_right = {
        let make = make.clone();
        binary(
            "op_Multiply",
            vector.clone(),
            double(),
            vector.clone(),
            Rc::new(move |args: &[HostValue]| {
                let (v, k) = (vector_of(&args[0]), as_f64(&args[1]));
                make(v.x * k, v.y * k)
            }),
        )
    };
    let scale_left = {
        let make = make.clone();
        binary(
            "op_Multiply",
            double(),
            vector.clone(),
            vector.clone(),
            Rc::new(move |args: &[HostValue]| {
                let (k, v) = (as_f64(&args[0]), vector_of(&args[1]));
                make(v.x * k, v.y * k)
            }),
        )
    };
    let equals = binary(
        "op_Equality",
        vector.clone(),
        vector.clone(),
        HostType::primitive(PrimitiveKind::Bool),
        Rc::new(|args: &[HostValue]| HostValue::Bool(vector_of(&args[0]) == vector_of(&args[1]))),
    );
    let less = binary(
        "op_LessThan",
        vector.clone(),
        vector.clone(),
        HostType::primitive(PrimitiveKind::Bool),
        Rc::new(|args: &[HostValue]| {
            let (a, b) = (vector_of(&args[0]), vector_of(&args[1]));
            HostValue::Bool(a.x * a.x + a.y * a.y < b.x * b.x + b.y * b.y)
        }),
    );
    let negate = {
        let make = make.clone();
        Callable::static_method(
            "op_UnaryNegation",
            vec![Param::new("v", vector.clone())],
            vector.clone(),
            move |_, args| {
                let v = vector_of(&args[0]);
                Ok(make(-v.x, -v.y))
            },
        )
    };

    let builder = TypeBuilder::new(vector.clone())
        .constructor(Callable::constructor(
            &vector,
            vec![Param::new("x", double()), Param::new("y", double())],
            {
                let make = make.clone();
                move |args| Ok(make(as_f64(&args[0]), as_f64(&args[1])))
            },
        ))
        .property(component("X", |v| v.x))
        .property(component("Y", |v| v.y))
        .operator(OperatorName::Addition, add)
        .operator(OperatorName::Multiply, scale_right)
        .operator(OperatorName::Multiply, scale_left)
        .operator(OperatorName::Equality, equals)
        .operator(OperatorName::LessThan, less)
        .operator(OperatorName::UnaryNegation, negate);

    registry.register(builder).expect("Vector registers");
    vector
}

fn boxed_type(registry: &mut TypeRegistry) -> HostType {
    let definition = TypeInfo::generic_definition("Box", &["T"]).build();
    let builder = TypeBuilder::new(definition.clone())
        .constraint(0, GenericConstraint::ValueType)
        .instances(|instance| {
            let element = instance.generic_args()[0].clone();
            let ty = instance.clone();
            TypeBuilder::new(instance.clone())
                .constructor(Callable::constructor(
                    instance,
                    vec![Param::new("value", element.clone())],
                    move |args| {
                        Ok(HostValue::Object(HostObject::new(
                            ty.clone(),
                            Boxed(RefCell::new(args[0].clone())),
                        )))
                    },
                ))
                .field(FieldInfo::new(
                    "Value",
                    element,
                    |this| {
                        this.and_then(|v| v.downcast_ref::<Boxed>())
                            .map(|boxed| boxed.0.borrow().clone())
                            .unwrap_or_default()
                    },
                    |this, value| {
                        if let Some(boxed) = this.and_then(|v| v.downcast_ref::<Boxed>()) {
                            *boxed.0.borrow_mut() = value;
                        }
                        Ok(())
                    },
                ))
        });
    registry.register(builder).expect("Box registers");
    definition
}

pub fn types(registry: &mut TypeRegistry) -> Types {
    let (counter, mode, handler) = counter_type(registry);
    let vector = vector_type(registry);
    let boxed = boxed_type(registry);

    let shape = TypeInfo::interface("IShape").build();
    registry
        .register(TypeBuilder::new(shape.clone()))
        .expect("IShape registers");

    Types {
        counter,
        mode,
        handler,
        vector,
        shape,
        transform: TypeInfo::delegate("Transform").build(),
        boxed,
    }
}

/// An interpreter with the sample types bound into it.
pub struct Fixture {
    pub vm: Vm,
    pub binder: ObjectBinder,
    pub types: Types,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_options(BinderOptions::default())
    }

    pub fn with_options(options: BinderOptions) -> Self {
        let mut registry = TypeRegistry::new();
        let types = types(&mut registry);
        let mut vm = Vm::new();
        let binder = ObjectBinder::install(&mut vm, registry, options).expect("binder installs");
        Self { vm, binder, types }
    }

    pub fn type_handle(&mut self, ty: &HostType) -> ScriptValue {
        self.binder.box_type(&mut self.vm, ty.clone())
    }

    pub fn boxed(&mut self, value: HostValue) -> ScriptValue {
        self.binder.to_script(&mut self.vm, value)
    }

    pub fn construct(&mut self, ty: &HostType, args: Vec<ScriptValue>) -> Result<ScriptValue, ScriptError> {
        let handle = self.type_handle(ty);
        Ok(self.vm.call(&handle, args)?.into_iter().next().unwrap_or_default())
    }

    pub fn counter(&mut self) -> ScriptValue {
        let ty = self.types.counter.clone();
        self.construct(&ty, vec![]).expect("Counter constructs")
    }

    pub fn vector(&mut self, x: f64, y: f64) -> ScriptValue {
        let ty = self.types.vector.clone();
        self.construct(&ty, vec![ScriptValue::Number(x), ScriptValue::Number(y)])
            .expect("Vector constructs")
    }

    pub fn get(&mut self, target: &ScriptValue, key: &str) -> Result<ScriptValue, ScriptError> {
        self.vm.index(target, &ScriptValue::from(key))
    }

    pub fn set(&mut self, target: &ScriptValue, key: &str, value: impl Into<ScriptValue>) -> Result<(), ScriptError> {
        self.vm.set_index(target, &ScriptValue::from(key), value.into())
    }

    pub fn call(&mut self, target: &ScriptValue, name: &str, args: Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError> {
        self.vm.method_call(target, name, args)
    }

    /// Call a static member of a type handle.
    pub fn call_static(&mut self, ty: &ScriptValue, name: &str, args: Vec<ScriptValue>) -> Result<Vec<ScriptValue>, ScriptError> {
        let method = self.get(ty, name)?;
        self.vm.call(&method, args)
    }

    pub fn host(&self, value: &ScriptValue) -> HostValue {
        self.binder.to_host(value)
    }

    pub fn int_array(&mut self, items: &[i32]) -> ScriptValue {
        let array = HostArray::new(int(), items.iter().map(|v| HostValue::I32(*v)).collect());
        self.boxed(HostValue::Array(array))
    }

    pub fn doubler(&mut self) -> ScriptValue {
        let callable = Callable::static_method("Invoke", vec![Param::new("x", int())], int(), |_, args| {
            Ok(HostValue::I32(as_i32(&args[0]) * 2))
        });
        let delegate = Delegate::host(self.types.transform.clone(), callable, None);
        self.boxed(HostValue::from(delegate))
    }
}

pub fn raised(message: &str) -> ScriptError {
    ScriptError::Raised(message.to_string())
}
