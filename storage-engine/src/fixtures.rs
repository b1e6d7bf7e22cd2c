use selfcache::{CacheableRecord, FieldValue, RelationCache};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub status: String,
    #[serde(skip)]
    pub relations: RelationCache,
}

impl Order {
    pub fn new(id: u64, status: &str) -> Self {
        Self {
            id,
            status: status.to_string(),
            relations: RelationCache::new(),
        }
    }

    /// Not yet inserted; the store assigns the id
    pub fn unsaved(status: &str) -> Self {
        Self::new(0, status)
    }
}

impl CacheableRecord for Order {
    const RECORD_TYPE: &'static str = "Order";

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => (self.id != 0).then(|| self.id.into()),
            "status" => Some(self.status.clone().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<()> {
        match (name, value) {
            ("id", FieldValue::UInt(id)) => self.id = id,
            ("status", FieldValue::Text(status)) => self.status = status,
            (name, _) => {
                return Err(Error::UnknownField {
                    record_type: Self::RECORD_TYPE,
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn relations(&self) -> &RelationCache {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationCache {
        &mut self.relations
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: u64,
    pub group_id: u64,
    #[serde(skip)]
    pub relations: RelationCache,
}

impl Membership {
    pub fn new(user_id: u64, group_id: u64) -> Self {
        Self {
            user_id,
            group_id,
            relations: RelationCache::new(),
        }
    }
}

impl CacheableRecord for Membership {
    const RECORD_TYPE: &'static str = "Membership";

    fn identifying_fields() -> &'static [&'static str] {
        &["user_id", "group_id"]
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "user_id" => Some(self.user_id.into()),
            "group_id" => Some(self.group_id.into()),
            _ => None,
        }
    }

    fn relations(&self) -> &RelationCache {
        &self.relations
    }

    fn relations_mut(&mut self) -> &mut RelationCache {
        &mut self.relations
    }
}
