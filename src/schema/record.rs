//! Per-type field descriptor tables.
//!
//! A [`Record`] lists its fields once, each as a [`FieldDescriptor`] carrying the field
//! name, its metadata tag and typed get/set accessors. Scalar fields go through
//! [`FieldValue`]; composite fields go through `serde` and a named serializer.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::coercion::{Scalar, ScalarKind};

/// A type that can be bound to a sheet row.
///
/// Implement it with the [`record!`](crate::record) macro or by hand.
pub trait Record: Default + 'static {
    /// Field descriptors in column order.
    fn descriptors() -> Vec<FieldDescriptor<Self>>;
}

/// A scalar field value: integers, floats, `bool`, `String`, or `Option` of those.
pub trait FieldValue: Sized + 'static {
    /// Declared kind used by the coercion engine.
    const KIND: ScalarKind;

    /// Current value, `None` when absent.
    fn to_scalar(&self) -> Option<Scalar>;

    /// Build a value from a coerced scalar; `None` when the scalar does not fit.
    fn from_scalar(value: Scalar) -> Option<Self>;

    /// Value to store when the cell resolves to nothing; `None` leaves the field untouched.
    fn absent() -> Option<Self> {
        None
    }
}

macro_rules! signed_field_value {
    ($($t:ty => $kind:ident),* $(,)?) => {$(
        impl FieldValue for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn to_scalar(&self) -> Option<Scalar> {
                i64::try_from(*self).ok().map(Scalar::Int)
            }

            fn from_scalar(value: Scalar) -> Option<Self> {
                match value {
                    Scalar::Int(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

macro_rules! unsigned_field_value {
    ($($t:ty => $kind:ident),* $(,)?) => {$(
        impl FieldValue for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            fn to_scalar(&self) -> Option<Scalar> {
                u64::try_from(*self).ok().map(Scalar::UInt)
            }

            fn from_scalar(value: Scalar) -> Option<Self> {
                match value {
                    Scalar::UInt(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

signed_field_value!(i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => I64);
unsigned_field_value!(u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => U64);

impl FieldValue for f32 {
    const KIND: ScalarKind = ScalarKind::F32;

    fn to_scalar(&self) -> Option<Scalar> {
        Some(Scalar::Float(f64::from(*self)))
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Float(v) => Some(v as f32),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    const KIND: ScalarKind = ScalarKind::F64;

    fn to_scalar(&self) -> Option<Scalar> {
        Some(Scalar::Float(*self))
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn to_scalar(&self) -> Option<Scalar> {
        Some(Scalar::Bool(*self))
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FieldValue for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn to_scalar(&self) -> Option<Scalar> {
        Some(Scalar::Str(self.clone()))
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: ScalarKind = T::KIND;

    fn to_scalar(&self) -> Option<Scalar> {
        self.as_ref().and_then(T::to_scalar)
    }

    fn from_scalar(value: Scalar) -> Option<Self> {
        T::from_scalar(value).map(Some)
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

pub(crate) trait ScalarAccess<R> {
    fn kind(&self) -> ScalarKind;
    fn get(&self, record: &R) -> Option<Scalar>;
    /// `Err` hands back the scalar the field type rejected.
    fn set(&self, record: &mut R, value: Option<Scalar>) -> Result<(), Scalar>;
}

pub(crate) trait CompositeAccess<R> {
    fn get(&self, record: &R) -> serde_json::Result<Value>;
    fn set(&self, record: &mut R, value: Value) -> serde_json::Result<()>;
}

struct ScalarSlot<R, T> {
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R, T: FieldValue> ScalarAccess<R> for ScalarSlot<R, T> {
    fn kind(&self) -> ScalarKind {
        T::KIND
    }

    fn get(&self, record: &R) -> Option<Scalar> {
        (self.get)(record).to_scalar()
    }

    fn set(&self, record: &mut R, value: Option<Scalar>) -> Result<(), Scalar> {
        match value {
            Some(scalar) => {
                let typed = T::from_scalar(scalar.clone()).ok_or(scalar)?;
                *(self.get_mut)(record) = typed;
            }
            None => {
                if let Some(absent) = T::absent() {
                    *(self.get_mut)(record) = absent;
                }
            }
        }
        Ok(())
    }
}

struct CompositeSlot<R, T> {
    get: fn(&R) -> &T,
    get_mut: fn(&mut R) -> &mut T,
}

impl<R, T: Serialize + DeserializeOwned> CompositeAccess<R> for CompositeSlot<R, T> {
    fn get(&self, record: &R) -> serde_json::Result<Value> {
        serde_json::to_value((self.get)(record))
    }

    fn set(&self, record: &mut R, value: Value) -> serde_json::Result<()> {
        *(self.get_mut)(record) = serde_json::from_value(value)?;
        Ok(())
    }
}

pub(crate) enum FieldAccess<R> {
    Scalar(Box<dyn ScalarAccess<R>>),
    Composite(Box<dyn CompositeAccess<R>>),
}

/// One field of a [`Record`]: name, metadata tag and typed accessors.
pub struct FieldDescriptor<R> {
    name: &'static str,
    tag: String,
    pub(crate) access: FieldAccess<R>,
}

impl<R: 'static> FieldDescriptor<R> {
    /// A scalar field bound through the coercion engine.
    pub fn scalar<T: FieldValue>(
        name: &'static str,
        tag: impl Into<String>,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        Self {
            name,
            tag: tag.into(),
            access: FieldAccess::Scalar(Box::new(ScalarSlot { get, get_mut })),
        }
    }

    /// A composite field (struct, sequence, map) bound through a named serializer.
    pub fn composite<T: Serialize + DeserializeOwned + 'static>(
        name: &'static str,
        tag: impl Into<String>,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        Self {
            name,
            tag: tag.into(),
            access: FieldAccess::Composite(Box::new(CompositeSlot { get, get_mut })),
        }
    }
}

impl<R> FieldDescriptor<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.access, FieldAccess::Composite(_))
    }

    /// Scalar kind, `None` for composite fields.
    pub fn kind(&self) -> Option<ScalarKind> {
        match &self.access {
            FieldAccess::Scalar(a) => Some(a.kind()),
            FieldAccess::Composite(_) => None,
        }
    }
}

impl<R> std::fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Implement [`Record`] for a struct from a list of `field: "tag"` entries.
///
/// Scalar fields need no marker; composite fields are marked `#[composite]` and must be
/// `Serialize + DeserializeOwned`. Fields not listed are never read or written.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use sheet_records::record;
///
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct Detail {
///     height: u32,
/// }
///
/// #[derive(Debug, Default)]
/// struct Info {
///     name: String,
///     phone: Option<String>,
///     man: bool,
///     detail: Detail,
/// }
///
/// record!(Info {
///     name: "column:user_name;comment:person name",
///     phone: "column:phone",
///     man: "column:man;default:true",
///     #[composite]
///     detail: "column:details",
/// });
/// ```
#[macro_export]
macro_rules! record {
    (@field $ty:ty, #[composite] $field:ident, $tag:expr) => {
        $crate::schema::FieldDescriptor::composite(
            stringify!($field),
            $tag,
            |r: &$ty| &r.$field,
            |r: &mut $ty| &mut r.$field,
        )
    };
    (@field $ty:ty, $field:ident, $tag:expr) => {
        $crate::schema::FieldDescriptor::scalar(
            stringify!($field),
            $tag,
            |r: &$ty| &r.$field,
            |r: &mut $ty| &mut r.$field,
        )
    };
    ($ty:ty { $( $(#[$marker:ident])? $field:ident : $tag:expr ),* $(,)? }) => {
        impl $crate::schema::Record for $ty {
            fn descriptors() -> ::std::vec::Vec<$crate::schema::FieldDescriptor<Self>> {
                ::std::vec![
                    $( $crate::record!(@field $ty, $(#[$marker])? $field, $tag) ),*
                ]
            }
        }
    };
}
