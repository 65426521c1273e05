//! Conversion between raw cell strings and typed scalar values.
//!
//! Decoding resolves the raw string first (empty-check, default substitution) and then
//! coerces it according to the field's [`ScalarKind`]. Encoding mirrors it: absent or zero
//! values are replaced by the field's default before being rendered as a string.

use std::collections::HashSet;
use std::fmt;

use crate::error::{Location, SheetError, SheetResult};
use crate::types::Cell;

/// Literals treated as `true` for boolean fields unless configured otherwise.
pub const DEFAULT_TRUTHY_LITERALS: [&str; 10] =
    ["true", "True", "TRUE", "1", "yes", "Yes", "YES", "y", "Y", "是"];

/// Declared kind of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Bool => "bool",
            ScalarKind::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed scalar value moving between a cell and a record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Signed integer of any declared width.
    Int(i64),
    /// Unsigned integer of any declared width.
    UInt(u64),
    /// Floating point number (f32 values are widened).
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Str(String),
}

impl Scalar {
    /// True for `0`, `0.0`, `false` and the empty string.
    pub fn is_zero(&self) -> bool {
        match self {
            Scalar::Int(v) => *v == 0,
            Scalar::UInt(v) => *v == 0,
            Scalar::Float(v) => *v == 0.0,
            Scalar::Bool(v) => !*v,
            Scalar::Str(s) => s.is_empty(),
        }
    }
}

/// Precision used when parsing floating point cells.
///
/// Writing always renders an `f64` field at full precision, so under [`Single`](Self::Single)
/// a value such as `0.1` reads back as `0.10000000149011612`. Use
/// [`Declared`](Self::Declared) when `f64` fields must survive a write/read round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatPrecision {
    /// Parse every float with 32-bit precision, widening the result for f64 fields.
    #[default]
    Single,
    /// Parse with the precision of the declared field type.
    Declared,
}

/// Options controlling coercion.
#[derive(Debug, Clone)]
pub struct CoercionOptions {
    /// Fail with [`SheetError::EmptyValue`] when a bound cell is empty.
    pub check_empty_required: bool,
    /// Strings decoded as `true`; everything else is `false`.
    pub truthy_literals: HashSet<String>,
    /// Float parsing precision.
    pub float_precision: FloatPrecision,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            check_empty_required: false,
            truthy_literals: DEFAULT_TRUTHY_LITERALS.iter().map(|s| s.to_string()).collect(),
            float_precision: FloatPrecision::default(),
        }
    }
}

/// Coerce `raw` into a scalar of `kind`.
///
/// The error is the parser's message; callers attach location and key.
pub fn to_typed(raw: &str, kind: ScalarKind, options: &CoercionOptions) -> Result<Scalar, String> {
    let trimmed = raw.trim();
    let out = match kind {
        ScalarKind::I8 => Scalar::Int(trimmed.parse::<i8>().map_err(|e| e.to_string())?.into()),
        ScalarKind::I16 => Scalar::Int(trimmed.parse::<i16>().map_err(|e| e.to_string())?.into()),
        ScalarKind::I32 => Scalar::Int(trimmed.parse::<i32>().map_err(|e| e.to_string())?.into()),
        ScalarKind::I64 => Scalar::Int(trimmed.parse::<i64>().map_err(|e| e.to_string())?),
        ScalarKind::U8 => Scalar::UInt(trimmed.parse::<u8>().map_err(|e| e.to_string())?.into()),
        ScalarKind::U16 => Scalar::UInt(trimmed.parse::<u16>().map_err(|e| e.to_string())?.into()),
        ScalarKind::U32 => Scalar::UInt(trimmed.parse::<u32>().map_err(|e| e.to_string())?.into()),
        ScalarKind::U64 => Scalar::UInt(trimmed.parse::<u64>().map_err(|e| e.to_string())?),
        ScalarKind::F32 => Scalar::Float(trimmed.parse::<f32>().map_err(|e| e.to_string())?.into()),
        ScalarKind::F64 => match options.float_precision {
            FloatPrecision::Single => {
                Scalar::Float(trimmed.parse::<f32>().map_err(|e| e.to_string())?.into())
            }
            FloatPrecision::Declared => {
                Scalar::Float(trimmed.parse::<f64>().map_err(|e| e.to_string())?)
            }
        },
        ScalarKind::Bool => Scalar::Bool(options.truthy_literals.contains(raw)),
        ScalarKind::String => Scalar::Str(raw.to_string()),
    };
    Ok(out)
}

/// Render a scalar as a cell string.
pub fn from_typed(value: &Scalar, kind: ScalarKind) -> String {
    match value {
        Scalar::Int(v) => v.to_string(),
        Scalar::UInt(v) => v.to_string(),
        Scalar::Float(v) if kind == ScalarKind::F32 => (*v as f32).to_string(),
        Scalar::Float(v) => v.to_string(),
        Scalar::Bool(v) => v.to_string(),
        Scalar::Str(s) => s.clone(),
    }
}

/// Applies [`CoercionOptions`] to cells and values for one field at a time.
#[derive(Debug, Clone, Copy)]
pub struct Coercer<'a> {
    options: &'a CoercionOptions,
}

impl<'a> Coercer<'a> {
    pub fn new(options: &'a CoercionOptions) -> Self {
        Self { options }
    }

    /// Resolve the string a cell contributes: `None` when empty without default.
    pub fn resolve_raw<'c>(
        &self,
        cell: &'c Cell,
        default: Option<&'c str>,
        location: &Location,
    ) -> SheetResult<Option<&'c str>> {
        if self.options.check_empty_required && cell.is_empty {
            return Err(SheetError::EmptyValue {
                location: location.at(cell.address.clone()),
                key: cell.key.clone(),
            });
        }
        if cell.is_empty || cell.value.is_empty() {
            return Ok(default.filter(|d| !d.is_empty()));
        }
        Ok(Some(cell.value.as_str()))
    }

    /// Decode a cell into a scalar of `kind`, `None` when it resolves to nothing.
    pub fn decode(
        &self,
        cell: &Cell,
        kind: ScalarKind,
        default: Option<&str>,
        location: &Location,
    ) -> SheetResult<Option<Scalar>> {
        let Some(raw) = self.resolve_raw(cell, default, location)? else {
            return Ok(None);
        };
        to_typed(raw, kind, self.options)
            .map(Some)
            .map_err(|message| SheetError::TypeMismatch {
                location: location.at(cell.address.clone()),
                key: cell.key.clone(),
                raw: raw.to_string(),
                message,
            })
    }

    /// Encode a field value, substituting `default` for absent or zero values.
    pub fn encode(&self, value: Option<&Scalar>, kind: ScalarKind, default: Option<&str>) -> String {
        match (value, default) {
            (Some(v), Some(d)) if v.is_zero() => d.to_string(),
            (Some(v), _) => from_typed(v, kind),
            (None, Some(d)) => d.to_string(),
            (None, None) => String::new(),
        }
    }
}
