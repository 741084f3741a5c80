//! Bookable shared spaces (salon, gym, pool, court).

use super::{assign, require_id, require_text, Entity, EntityId, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

// RFC 3986 scheme followed by a non-empty remainder.
static URI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").expect("uri pattern must compile")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Salon,
    Gym,
    Pool,
    Court,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Salon => "salon",
            Self::Gym => "gym",
            Self::Pool => "pool",
            Self::Court => "court",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: EntityId,
    pub name: String,
    /// Serialized as `type` to match the stored collection layout.
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub capacity: u32,
    pub description: String,
    pub available: bool,
    pub image: String,
}

/// Fields accepted when creating a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub capacity: u32,
    pub description: String,
    pub available: bool,
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ResourcePatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ResourceType>,
    pub capacity: Option<u32>,
    pub description: Option<String>,
    pub available: Option<bool>,
    pub image: Option<String>,
}

impl Entity for Resource {
    type Draft = NewResource;
    type Patch = ResourcePatch;

    const KIND: &'static str = "resource";
    const NAMESPACE: &'static str = "vista_buena_resources";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewResource) -> Self {
        Self {
            id,
            name: draft.name,
            kind: draft.kind,
            capacity: draft.capacity,
            description: draft.description,
            available: draft.available,
            image: draft.image,
        }
    }

    fn merge(&mut self, patch: ResourcePatch) {
        assign(&mut self.name, patch.name);
        assign(&mut self.kind, patch.kind);
        assign(&mut self.capacity, patch.capacity);
        assign(&mut self.description, patch.description);
        assign(&mut self.available, patch.available);
        assign(&mut self.image, patch.image);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_id(self.id)?;
        require_text("name", &self.name)?;
        if !URI_PATTERN.is_match(&self.image) {
            return Err(ValidationError::InvalidImageUri(self.image.clone()));
        }
        Ok(())
    }
}
