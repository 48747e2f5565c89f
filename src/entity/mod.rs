//! Reflective description of mapping targets
//!
//! Rust has no runtime reflection, so every target type describes its own property
//! graph once through the `entity!` macro. The resulting `TypeDescriptor` is a
//! `'static` value: matchers and mapping plans hold plain references into it.
//!
//! ## Property kinds
//!
//! - **leaf**: field type implements [`LeafValue`]; populated from one column. Use
//!   `Option<T>` for nullable columns unless `T` has a zero value
//! - **nested**: field type is `Option<C>` where `C: Entity`; traversed by the matcher
//!   and instantiated on demand by graph guards
//! - **boxed**: same as nested for `Option<Box<C>>`, needed for self-referencing types
//! - **opaque**: enumerations and other values the matcher never touches
//! - **ignore**: explicit opt-out, used to break cycles in the type graph
//!
//! ## Usage
//!
//! ```ignore
//! #[derive(Debug, Default)]
//! struct PartInfo { description: Option<String> }
//! resultmap::entity!(PartInfo { description: leaf });
//!
//! #[derive(Debug, Default)]
//! struct OrderLine { line_no: i32, description: Option<String>, part: Option<PartInfo> }
//! resultmap::entity!(OrderLine { line_no: leaf, description: leaf, part: nested });
//! ```

pub mod value;

use std::any::{type_name, Any, TypeId};
use std::fmt;

pub use value::{ConversionError, LeafValue, Value, ValueType};

/// A type that query results can be mapped onto
pub trait Entity: Any + Default {
    fn descriptor() -> &'static TypeDescriptor;
}

/// Type-erased setter for a leaf property
pub type LeafSetter = Box<dyn Fn(&mut dyn Any, Value) -> Result<(), ConversionError> + Send + Sync>;

/// Instantiates a nested object if its slot is empty; returns true when it did
pub type SlotEnsure = Box<dyn Fn(&mut dyn Any) -> bool + Send + Sync>;

/// Borrows the nested object stored in a slot, if any
pub type SlotAccess =
    Box<dyn for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync>;

/// How a property participates in mapping
pub enum PropertyKind {
    Leaf {
        value_type: ValueType,
        nullable: bool,
        set: LeafSetter,
    },
    Nested {
        descriptor: fn() -> &'static TypeDescriptor,
        ensure: SlotEnsure,
        access: SlotAccess,
    },
    Opaque,
    Ignored,
}

/// One property of a target type
pub struct PropertyDescriptor {
    name: &'static str,
    owner: &'static str,
    kind: PropertyKind,
}

impl PropertyDescriptor {
    /// Describe a leaf property through a field accessor
    pub fn leaf<O, V, F>(name: &'static str, field: F) -> Self
    where
        O: Any,
        V: LeafValue,
        F: Fn(&mut O) -> &mut V + Send + Sync + 'static,
    {
        let set: LeafSetter = Box::new(move |target: &mut dyn Any, value: Value| {
            let owner = target
                .downcast_mut::<O>()
                .ok_or(ConversionError::OwnerMismatch {
                    expected: type_name::<O>(),
                })?;
            *field(owner) = V::from_value(value)?;
            Ok(())
        });

        PropertyDescriptor {
            name,
            owner: type_name::<O>(),
            kind: PropertyKind::Leaf {
                value_type: V::VALUE_TYPE,
                nullable: V::NULLABLE,
                set,
            },
        }
    }

    /// Describe a complex property stored as `Option<C>`
    pub fn nested<O, C, F>(name: &'static str, field: F) -> Self
    where
        O: Any,
        C: Entity,
        F: Fn(&mut O) -> &mut Option<C> + Send + Sync + 'static,
    {
        let field = std::sync::Arc::new(field);
        let ensure_field = field.clone();

        let ensure: SlotEnsure = Box::new(move |target: &mut dyn Any| {
            match target.downcast_mut::<O>() {
                Some(owner) => {
                    let slot = (*ensure_field)(owner);
                    if slot.is_none() {
                        *slot = Some(C::default());
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        });

        PropertyDescriptor {
            name,
            owner: type_name::<O>(),
            kind: PropertyKind::Nested {
                descriptor: C::descriptor,
                ensure,
                access: slot_access(move |target| {
                    let owner = target.downcast_mut::<O>()?;
                    (*field)(owner).as_mut().map(|child| child as &mut dyn Any)
                }),
            },
        }
    }

    /// Describe a complex property stored as `Option<Box<C>>`
    pub fn boxed<O, C, F>(name: &'static str, field: F) -> Self
    where
        O: Any,
        C: Entity,
        F: Fn(&mut O) -> &mut Option<Box<C>> + Send + Sync + 'static,
    {
        let field = std::sync::Arc::new(field);
        let ensure_field = field.clone();

        let ensure: SlotEnsure = Box::new(move |target: &mut dyn Any| {
            match target.downcast_mut::<O>() {
                Some(owner) => {
                    let slot = (*ensure_field)(owner);
                    if slot.is_none() {
                        *slot = Some(Box::new(C::default()));
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        });

        PropertyDescriptor {
            name,
            owner: type_name::<O>(),
            kind: PropertyKind::Nested {
                descriptor: C::descriptor,
                ensure,
                access: slot_access(move |target| {
                    let owner = target.downcast_mut::<O>()?;
                    (*field)(owner)
                        .as_mut()
                        .map(|child| &mut **child as &mut dyn Any)
                }),
            },
        }
    }

    /// Describe a property the matcher must never traverse or populate
    pub fn opaque<O: Any>(name: &'static str) -> Self {
        PropertyDescriptor {
            name,
            owner: type_name::<O>(),
            kind: PropertyKind::Opaque,
        }
    }

    /// Describe a property explicitly excluded from mapping
    pub fn ignored<O: Any>(name: &'static str) -> Self {
        PropertyDescriptor {
            name,
            owner: type_name::<O>(),
            kind: PropertyKind::Ignored,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type name of the struct declaring this property
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Declared leaf type, or None for non-leaf properties
    pub fn value_type(&self) -> Option<ValueType> {
        match &self.kind {
            PropertyKind::Leaf { value_type, .. } => Some(*value_type),
            _ => None,
        }
    }

    /// Write a value into this leaf property of `target`
    pub fn set(&self, target: &mut dyn Any, value: Value) -> Result<(), ConversionError> {
        match &self.kind {
            PropertyKind::Leaf { set, .. } => set(target, value),
            _ => Err(ConversionError::OwnerMismatch {
                expected: self.owner,
            }),
        }
    }

    /// Instantiate this nested property on `target` when it is unset
    pub fn ensure(&self, target: &mut dyn Any) -> bool {
        match &self.kind {
            PropertyKind::Nested { ensure, .. } => ensure(target),
            _ => false,
        }
    }

    /// Borrow the nested object held by this property on `target`
    pub fn access<'a>(&self, target: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        match &self.kind {
            PropertyKind::Nested { access, .. } => access(target),
            _ => None,
        }
    }
}

// Pins the higher-ranked signature; a bare closure in Box::new would not infer it.
fn slot_access<F>(f: F) -> SlotAccess
where
    F: for<'a> Fn(&'a mut dyn Any) -> Option<&'a mut dyn Any> + Send + Sync + 'static,
{
    Box::new(f)
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            PropertyKind::Leaf { value_type, .. } => value_type.as_str(),
            PropertyKind::Nested { .. } => "nested",
            PropertyKind::Opaque => "opaque",
            PropertyKind::Ignored => "ignored",
        };
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("kind", &kind)
            .finish()
    }
}

/// Property graph of one target type
pub struct TypeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    construct: fn() -> Box<dyn Any>,
    properties: Vec<PropertyDescriptor>,
}

impl TypeDescriptor {
    pub fn builder<T: Entity>() -> TypeDescriptorBuilder {
        TypeDescriptorBuilder {
            descriptor: TypeDescriptor {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                construct: construct_default::<T>,
                properties: Vec::new(),
            },
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Allocate an instance through the type's `Default` implementation
    pub fn construct(&self) -> Box<dyn Any> {
        (self.construct)()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .finish()
    }
}

fn construct_default<T: Entity>() -> Box<dyn Any> {
    Box::new(T::default())
}

pub struct TypeDescriptorBuilder {
    descriptor: TypeDescriptor,
}

impl TypeDescriptorBuilder {
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.descriptor.properties.push(property);
        self
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

/// Implement [`Entity`] for a struct by listing its fields and their kinds
///
/// Each field is declared as `leaf`, `nested`, `boxed`, `opaque` or `ignore`. Fields not
/// listed are invisible to the mapper.
///
/// A leaf fed by a column that may hold NULL should be declared as `Option<T>` unless
/// `T` has a zero value (integers, floats, `bool`). `String`, `Vec<u8>`, `Decimal` and the
/// chrono types cannot represent absence, so a NULL fails the row with
/// [`ConversionError::NullNotRepresentable`] naming the property and column.
///
/// # Example
///
/// ```ignore
/// resultmap::entity!(Part {
///     part_no: leaf,
///     info: nested,
///     status: opaque,
///     parent: ignore,
/// });
/// ```
#[macro_export]
macro_rules! entity {
    (@property $ty:ident, $field:ident, leaf) => {
        $crate::entity::PropertyDescriptor::leaf(stringify!($field), |o: &mut $ty| &mut o.$field)
    };
    (@property $ty:ident, $field:ident, nested) => {
        $crate::entity::PropertyDescriptor::nested(stringify!($field), |o: &mut $ty| &mut o.$field)
    };
    (@property $ty:ident, $field:ident, boxed) => {
        $crate::entity::PropertyDescriptor::boxed(stringify!($field), |o: &mut $ty| &mut o.$field)
    };
    (@property $ty:ident, $field:ident, opaque) => {
        $crate::entity::PropertyDescriptor::opaque::<$ty>(stringify!($field))
    };
    (@property $ty:ident, $field:ident, ignore) => {
        $crate::entity::PropertyDescriptor::ignored::<$ty>(stringify!($field))
    };
    ($ty:ident { $($field:ident : $kind:ident),* $(,)? }) => {
        impl $crate::entity::Entity for $ty {
            fn descriptor() -> &'static $crate::entity::TypeDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::entity::TypeDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    $crate::entity::TypeDescriptor::builder::<$ty>()
                        $(.property($crate::entity!(@property $ty, $field, $kind)))*
                        .build()
                })
            }
        }
    };
}
