use crate::domain::{FieldValue, RelationCache};
use crate::key::{DEFAULT_EXPIRATION, DEFAULT_IDENTIFYING_FIELDS, IdentifyingValue};
use serde::{Serialize, de::DeserializeOwned};
use shared::{Error, Result, TtlSecs};

/// Capability a record type implements to be cached by its identifying fields.
///
/// Per-type settings are associated items: override `identifying_fields` for
/// composite keys and `expiration` for a different TTL. Field access is an
/// explicit accessor rather than lookup by reflection.
///
/// The relation cache must not be part of the serialized form; mark it
/// `#[serde(skip)]`.
pub trait CacheableRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable, globally unique name of the record kind
    const RECORD_TYPE: &'static str;

    fn identifying_fields() -> &'static [&'static str] {
        DEFAULT_IDENTIFYING_FIELDS
    }

    fn expiration() -> TtlSecs {
        DEFAULT_EXPIRATION
    }

    /// Current value of a named field, `None` if the record has no such field
    /// or it is not yet assigned
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Assign a named field. Stores call this to apply update attributes and
    /// newly assigned identifiers.
    fn set_field(&mut self, name: &str, _value: FieldValue) -> Result<()> {
        Err(Error::UnknownField {
            record_type: Self::RECORD_TYPE,
            field: name.to_string(),
        })
    }

    fn relations(&self) -> &RelationCache;

    fn relations_mut(&mut self) -> &mut RelationCache;

    /// Read the given fields in order. One field yields a single value, more
    /// yield a composite.
    fn identifying_values<S: AsRef<str>>(&self, fields: &[S]) -> Result<IdentifyingValue> {
        let mut values = fields
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.field(name).ok_or_else(|| Error::UnknownField {
                    record_type: Self::RECORD_TYPE,
                    field: name.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if values.len() == 1 {
            Ok(IdentifyingValue::Single(values.remove(0)))
        } else {
            Ok(IdentifyingValue::Composite(values))
        }
    }
}
