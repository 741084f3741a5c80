//! Maintenance stock records.
//!
//! `last_updated` is owned by the repository: it is stamped on create and on
//! every update, and neither drafts nor patches can set it.

use super::{assign, require_id, require_text, Entity, EntityId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<u32>,
    pub unit: Option<String>,
}

impl Entity for InventoryItem {
    type Draft = NewInventoryItem;
    type Patch = InventoryPatch;

    const KIND: &'static str = "inventory item";
    const NAMESPACE: &'static str = "vista_buena_inventory";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewInventoryItem) -> Self {
        Self {
            id,
            name: draft.name,
            category: draft.category,
            quantity: draft.quantity,
            unit: draft.unit,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    fn merge(&mut self, patch: InventoryPatch) {
        assign(&mut self.name, patch.name);
        assign(&mut self.category, patch.category);
        assign(&mut self.quantity, patch.quantity);
        assign(&mut self.unit, patch.unit);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_id(self.id)?;
        require_text("name", &self.name)?;
        require_text("category", &self.category)?;
        require_text("unit", &self.unit)?;
        Ok(())
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_updated = at;
    }
}
