//! Named serializers for composite (non-scalar) fields.
//!
//! Composite field values cross the registry as [`serde_json::Value`]: a field converts
//! its typed value to and from that tree with `serde`, and the named serializer turns the
//! tree into a cell string and back. The built-in default is plain JSON.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{SheetError, SheetResult};

/// Name of the built-in JSON serializer.
pub const JSON_SERIALIZER_NAME: &str = "json";
/// Alias of the built-in serializer, as in a bare `serializer` tag.
pub const DEFAULT_SERIALIZER_ALIAS: &str = "serializer";

/// Error type returned by serializer handlers.
pub type HandlerError = Box<dyn StdError + Send + Sync>;

/// Turns a composite value into a cell string.
pub type MarshalFn = Arc<dyn Fn(&Value) -> Result<String, HandlerError> + Send + Sync>;
/// Turns a cell string back into a composite value.
pub type UnmarshalFn = Arc<dyn Fn(&str) -> Result<Value, HandlerError> + Send + Sync>;

/// A named marshal/unmarshal pair.
#[derive(Clone)]
pub struct Serializer {
    name: String,
    marshal: MarshalFn,
    unmarshal: UnmarshalFn,
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Serializer {
    /// Create a serializer from its two handlers.
    pub fn new<M, U>(name: impl Into<String>, marshal: M, unmarshal: U) -> Self
    where
        M: Fn(&Value) -> Result<String, HandlerError> + Send + Sync + 'static,
        U: Fn(&str) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            marshal: Arc::new(marshal),
            unmarshal: Arc::new(unmarshal),
        }
    }

    /// The built-in JSON serializer.
    pub fn json() -> Self {
        Self::new(
            JSON_SERIALIZER_NAME,
            |v| Ok(serde_json::to_string(v)?),
            |s| Ok(serde_json::from_str(s)?),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marshal(&self, value: &Value) -> Result<String, HandlerError> {
        (self.marshal)(value)
    }

    pub fn unmarshal(&self, data: &str) -> Result<Value, HandlerError> {
        (self.unmarshal)(data)
    }
}

/// True for names that resolve to the built-in serializer.
pub fn is_default_serializer(name: &str) -> bool {
    name.is_empty() || name == JSON_SERIALIZER_NAME || name == DEFAULT_SERIALIZER_ALIAS
}

/// Name -> serializer map with the JSON default built in.
#[derive(Debug, Clone)]
pub struct SerializerRegistry {
    default: Arc<Serializer>,
    entries: HashMap<String, Arc<Serializer>>,
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self {
            default: Arc::new(Serializer::json()),
            entries: HashMap::new(),
        }
    }
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a serializer under `name`.
    ///
    /// Fails with [`SheetError::SerializerMissingHandler`] when a handler is absent and with
    /// [`SheetError::SerializerConflict`] when the name is taken or reserved.
    pub fn register(
        &mut self,
        name: &str,
        marshal: Option<MarshalFn>,
        unmarshal: Option<UnmarshalFn>,
    ) -> SheetResult<()> {
        let marshal = marshal.ok_or_else(|| SheetError::SerializerMissingHandler {
            name: name.to_string(),
            handler: "marshal",
        })?;
        let unmarshal = unmarshal.ok_or_else(|| SheetError::SerializerMissingHandler {
            name: name.to_string(),
            handler: "unmarshal",
        })?;
        if is_default_serializer(name) || self.entries.contains_key(name) {
            return Err(SheetError::SerializerConflict {
                name: name.to_string(),
            });
        }
        self.entries.insert(
            name.to_string(),
            Arc::new(Serializer {
                name: name.to_string(),
                marshal,
                unmarshal,
            }),
        );
        Ok(())
    }

    /// Register an already built serializer under its own name.
    pub fn register_serializer(&mut self, serializer: Serializer) -> SheetResult<()> {
        let Serializer {
            name,
            marshal,
            unmarshal,
        } = serializer;
        self.register(&name, Some(marshal), Some(unmarshal))
    }

    /// Look up `name`; `None` and the reserved aliases give the JSON default.
    pub fn resolve(&self, name: Option<&str>) -> SheetResult<Arc<Serializer>> {
        match name {
            None => Ok(Arc::clone(&self.default)),
            Some(n) if is_default_serializer(n) => Ok(Arc::clone(&self.default)),
            Some(n) => self
                .entries
                .get(n)
                .cloned()
                .ok_or_else(|| SheetError::SerializerNotFound { name: n.to_string() }),
        }
    }

    /// Registered (non-default) names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipe_list() -> (MarshalFn, UnmarshalFn) {
        let marshal: MarshalFn = Arc::new(|v: &Value| -> Result<String, HandlerError> {
            let items = v.as_array().ok_or("expected an array")?;
            Ok(items
                .iter()
                .map(|i| i.as_str().unwrap_or_default().to_string())
                .collect::<Vec<_>>()
                .join("|"))
        });
        let unmarshal: UnmarshalFn = Arc::new(|s: &str| -> Result<Value, HandlerError> {
            Ok(Value::Array(s.split('|').map(Value::from).collect()))
        });
        (marshal, unmarshal)
    }

    #[test]
    fn default_resolves_for_reserved_aliases() {
        let reg = SerializerRegistry::new();
        for name in [None, Some(""), Some("json"), Some("serializer")] {
            assert_eq!(reg.resolve(name).unwrap().name(), JSON_SERIALIZER_NAME);
        }
        let json = reg.resolve(None).unwrap();
        let s = json.marshal(&json!({"height": 180})).unwrap();
        assert_eq!(json.unmarshal(&s).unwrap(), json!({"height": 180}));
    }

    #[test]
    fn register_and_resolve_custom() {
        let mut reg = SerializerRegistry::new();
        let (m, u) = pipe_list();
        reg.register("pipe", Some(m), Some(u)).unwrap();
        let pipe = reg.resolve(Some("pipe")).unwrap();
        assert_eq!(pipe.marshal(&json!(["beijing", "shanghai"])).unwrap(), "beijing|shanghai");
        assert_eq!(pipe.unmarshal("a|b").unwrap(), json!(["a", "b"]));
        assert_eq!(reg.names(), vec!["pipe"]);
    }

    #[test]
    fn duplicate_and_reserved_names_conflict() {
        let mut reg = SerializerRegistry::new();
        let (m, u) = pipe_list();
        reg.register("pipe", Some(m.clone()), Some(u.clone())).unwrap();
        assert!(matches!(
            reg.register("pipe", Some(m.clone()), Some(u.clone())),
            Err(SheetError::SerializerConflict { .. })
        ));
        assert!(matches!(
            reg.register("json", Some(m), Some(u)),
            Err(SheetError::SerializerConflict { .. })
        ));
        assert!(matches!(
            reg.register_serializer(Serializer::json()),
            Err(SheetError::SerializerConflict { .. })
        ));
    }

    #[test]
    fn missing_handlers_and_unknown_names() {
        let mut reg = SerializerRegistry::new();
        let (m, _) = pipe_list();
        assert!(matches!(
            reg.register("half", Some(m), None),
            Err(SheetError::SerializerMissingHandler { handler: "unmarshal", .. })
        ));
        assert!(matches!(
            reg.resolve(Some("nope")),
            Err(SheetError::SerializerNotFound { .. })
        ));
    }
}
