//! Complex member records.

use super::{assign, require_id, require_text, Entity, EntityId, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern must compile")
});

/// Closed set of member roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Resident,
    Maintenance,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resident => "resident",
            Self::Maintenance => "maintenance",
            Self::Admin => "admin",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub apartment: String,
}

/// Fields accepted when creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub apartment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub apartment: Option<String>,
}

impl Entity for User {
    type Draft = NewUser;
    type Patch = UserPatch;

    const KIND: &'static str = "user";
    const NAMESPACE: &'static str = "vista_buena_users";

    fn id(&self) -> EntityId {
        self.id
    }

    fn from_draft(id: EntityId, draft: NewUser) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            role: draft.role,
            apartment: draft.apartment,
        }
    }

    fn merge(&mut self, patch: UserPatch) {
        assign(&mut self.name, patch.name);
        assign(&mut self.email, patch.email);
        assign(&mut self.role, patch.role);
        assign(&mut self.apartment, patch.apartment);
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_id(self.id)?;
        require_text("name", &self.name)?;
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(ValidationError::InvalidEmail(self.email.clone()));
        }
        Ok(())
    }
}
