//! Cache key derivation.
//!
//! A key is `<record type>:selfCache:<value>`; composite values are joined
//! with `:` in the order the identifying fields are declared.

use crate::domain::FieldValue;
use crate::record::CacheableRecord;
use shared::TtlSecs;
use std::fmt;

pub const DEFAULT_IDENTIFYING_FIELD: &str = "id";
pub const DEFAULT_IDENTIFYING_FIELDS: &[&str] = &[DEFAULT_IDENTIFYING_FIELD];
pub const DEFAULT_EXPIRATION: TtlSecs = TtlSecs(4000);

const NAMESPACE_SEGMENT: &str = ":selfCache:";
const COMPOSITE_SEPARATOR: &str = ":";

/// Identifying value(s) of one record
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdentifyingValue {
    Single(FieldValue),
    Composite(Vec<FieldValue>),
}

impl From<FieldValue> for IdentifyingValue {
    fn from(value: FieldValue) -> Self {
        IdentifyingValue::Single(value)
    }
}

impl From<Vec<FieldValue>> for IdentifyingValue {
    fn from(values: Vec<FieldValue>) -> Self {
        IdentifyingValue::Composite(values)
    }
}

impl fmt::Display for IdentifyingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifyingValue::Single(value) => write!(f, "{}", value),
            IdentifyingValue::Composite(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(COMPOSITE_SEPARATOR)?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn derive_key(record_type: &str, values: &IdentifyingValue) -> CacheKey {
    CacheKey(format!("{}{}{}", record_type, NAMESPACE_SEGMENT, values))
}

/// Configured identifying fields of a record type, `["id"]` unless overridden
pub fn identifying_fields<R: CacheableRecord>() -> Vec<String> {
    R::identifying_fields()
        .iter()
        .map(|field| field.to_string())
        .collect()
}

/// Configured expiration of a record type, 4000 seconds unless overridden
pub fn expiration_duration<R: CacheableRecord>() -> TtlSecs {
    R::expiration()
}
