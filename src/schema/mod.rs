//! Tag schema resolution.
//!
//! Each [`Record`] field carries a metadata tag (see [`tag`]). Resolving a record type
//! turns its descriptor table into a [`Schema`]: one [`FieldSchema`] per field, plus the
//! serializer resolved for every composite field. Resolution happens once per call, before
//! any row is touched, and the result is reused for every row and sheet of that call.

mod record;
pub mod tag;

use std::collections::HashSet;
use std::sync::Arc;

use crate::coercion::Coercer;
use crate::error::{Location, SheetError, SheetResult};
use crate::serializer::{Serializer, SerializerRegistry};
use crate::types::Cell;

pub use record::{FieldDescriptor, FieldValue, Record};

use record::FieldAccess;

/// Parsed metadata of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// Field name in the record type.
    pub name: String,
    /// Header key the field binds to.
    pub column: String,
    /// Substituted for empty cells on read and zero values on write.
    pub default_value: Option<String>,
    /// Written to the comment row under the header.
    pub comment: Option<String>,
    /// Excluded from read and write.
    pub skip: bool,
    /// Serializer used by composite fields; `None` means the JSON default.
    pub serializer_name: Option<String>,
}

impl FieldSchema {
    /// Parse the metadata tag of field `name`.
    pub fn parse(name: &str, tag: &str) -> Self {
        let mut settings = tag::parse_tag(tag);
        let mut value = |key: &str| settings.remove(key).flatten().filter(|v| !v.is_empty());

        let column = value("column");
        let default_value = value("default");
        let comment = value("comment");
        let serializer_name = value("serializer");
        let skip = settings.contains_key("skip") || column.as_deref() == Some("-");

        Self {
            name: name.to_string(),
            column: column.unwrap_or_else(|| name.to_string()),
            default_value,
            comment,
            skip,
            serializer_name,
        }
    }
}

/// A field ready to move values between a cell and a record.
pub struct BoundField<R> {
    schema: FieldSchema,
    descriptor: FieldDescriptor<R>,
    serializer: Option<Arc<Serializer>>,
}

impl<R> BoundField<R> {
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Set the field of `record` from `cell`.
    pub fn decode_into(
        &self,
        record: &mut R,
        cell: &Cell,
        coercer: &Coercer<'_>,
        location: &Location,
    ) -> SheetResult<()> {
        let default = self.schema.default_value.as_deref();
        match &self.descriptor.access {
            FieldAccess::Scalar(access) => {
                let kind = access.kind();
                let value = coercer.decode(cell, kind, default, location)?;
                access
                    .set(record, value)
                    .map_err(|_| SheetError::UnsupportedType {
                        location: location.at(cell.address.clone()),
                        key: cell.key.clone(),
                        kind: kind.to_string(),
                    })
            }
            FieldAccess::Composite(access) => {
                let Some(raw) = coercer.resolve_raw(cell, default, location)? else {
                    return Ok(());
                };
                let serializer = self.serializer()?;
                let fail = |message: String| SheetError::Serialization {
                    location: location.at(cell.address.clone()),
                    key: cell.key.clone(),
                    serializer: serializer.name().to_string(),
                    message,
                };
                let value = serializer.unmarshal(raw).map_err(|e| fail(e.to_string()))?;
                access.set(record, value).map_err(|e| fail(e.to_string()))
            }
        }
    }

    /// Render the field of `record` as a cell string.
    ///
    /// `location` points at the cell being written.
    pub fn encode_from(&self, record: &R, coercer: &Coercer<'_>, location: &Location) -> SheetResult<String> {
        let default = self.schema.default_value.as_deref();
        match &self.descriptor.access {
            FieldAccess::Scalar(access) => {
                Ok(coercer.encode(access.get(record).as_ref(), access.kind(), default))
            }
            FieldAccess::Composite(access) => {
                let serializer = self.serializer()?;
                let fail = |message: String| SheetError::Serialization {
                    location: location.clone(),
                    key: self.schema.column.clone(),
                    serializer: serializer.name().to_string(),
                    message,
                };
                let value = access.get(record).map_err(|e| fail(e.to_string()))?;
                if is_zero_json(&value) {
                    if let Some(d) = default {
                        return Ok(d.to_string());
                    }
                    if value.is_null() {
                        return Ok(String::new());
                    }
                }
                serializer.marshal(&value).map_err(|e| fail(e.to_string()))
            }
        }
    }

    fn serializer(&self) -> SheetResult<&Serializer> {
        self.serializer.as_deref().ok_or_else(|| SheetError::Schema {
            message: format!("composite field '{}' has no resolved serializer", self.schema.name),
        })
    }
}

fn is_zero_json(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(a) => a.is_empty(),
        serde_json::Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Resolved schema of a record type.
pub struct Schema<R> {
    fields: Vec<BoundField<R>>,
}

impl<R: Record> Schema<R> {
    /// Resolve `R` against `registry`.
    ///
    /// Fails with [`SheetError::SerializerNotFound`] when a composite field names an unknown
    /// serializer and with [`SheetError::Schema`] when no field is bound at all.
    pub fn resolve(registry: &SerializerRegistry) -> SheetResult<Self> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for descriptor in R::descriptors() {
            if !seen.insert(descriptor.name()) {
                continue;
            }
            let schema = FieldSchema::parse(descriptor.name(), descriptor.tag());
            let serializer = if descriptor.is_composite() && !schema.skip {
                Some(registry.resolve(schema.serializer_name.as_deref())?)
            } else {
                None
            };
            fields.push(BoundField {
                schema,
                descriptor,
                serializer,
            });
        }

        if fields.iter().all(|f| f.schema.skip) {
            return Err(SheetError::Schema {
                message: format!(
                    "record type {} has no readable or writable field",
                    std::any::type_name::<R>()
                ),
            });
        }
        Ok(Self { fields })
    }
}

impl<R> Schema<R> {
    /// Every field schema, skipped ones included.
    pub fn field_schemas(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().map(|f| &f.schema)
    }

    /// Schema of the field called `name`.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.field_schemas().find(|f| f.name == name)
    }

    /// Fields taking part in read and write, in column order.
    pub fn bound(&self) -> impl Iterator<Item = &BoundField<R>> {
        self.fields.iter().filter(|f| !f.schema.skip)
    }

    /// Header keys written for this record type.
    pub fn headers(&self) -> Vec<String> {
        self.bound().map(|f| f.schema.column.clone()).collect()
    }

    /// True when any bound field declares a comment.
    pub fn has_comments(&self) -> bool {
        self.bound().any(|f| f.schema.comment.is_some())
    }

    /// Comment row matching [`Self::headers`].
    pub fn comments(&self) -> Vec<String> {
        self.bound()
            .map(|f| f.schema.comment.clone().unwrap_or_default())
            .collect()
    }
}
