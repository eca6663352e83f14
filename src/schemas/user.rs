//! Request/response shapes for the user resource.
//!
//! Every variant validates when built from JSON (directly or through serde), and a failure lists
//! every bad field. The plaintext password exists only on [`UserCreate`]; the hashed credential
//! only on [`UserInDb`], which never leaves the process.

use crate::error::ValidationErrors;
use crate::models::user::User as UserRow;
use crate::schemas::validation::{FieldReader, Patch};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const PASSWORD_MIN_LEN: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct UserBase {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl UserBase {
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut r = FieldReader::new(value);
        let base = UserBase::read(&mut r);
        r.finish()?;
        Ok(base)
    }

    fn read(r: &mut FieldReader<'_>) -> UserBase {
        UserBase {
            email: r.required_email("email"),
            first_name: r.optional_string("first_name"),
            last_name: r.optional_string("last_name"),
            is_active: r.bool_or("is_active", true),
            is_superuser: r.bool_or("is_superuser", false),
        }
    }
}

impl TryFrom<Value> for UserBase {
    type Error = ValidationErrors;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UserBase::from_value(&value)
    }
}

/// Sign-up payload. Deserialize-only in practice: the password is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct UserCreate {
    #[serde(flatten)]
    pub base: UserBase,
    #[serde(skip_serializing)]
    pub password: String,
}

impl UserCreate {
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut r = FieldReader::new(value);
        let base = UserBase::read(&mut r);
        let password = r.required_string_min("password", PASSWORD_MIN_LEN);
        r.finish()?;
        Ok(UserCreate { base, password })
    }
}

impl TryFrom<Value> for UserCreate {
    type Error = ValidationErrors;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UserCreate::from_value(&value)
    }
}

impl fmt::Debug for UserCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCreate")
            .field("base", &self.base)
            .field("password", &"***")
            .finish()
    }
}

/// Partial update. Fields not sent stay [`Patch::Absent`] and are left out when serialized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub first_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub last_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub is_active: Patch<bool>,
}

impl UserUpdate {
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut r = FieldReader::new(value);
        let update = UserUpdate {
            email: r.patch_email("email"),
            first_name: r.patch_string("first_name"),
            last_name: r.patch_string("last_name"),
            is_active: r.patch_bool("is_active"),
        };
        r.finish()?;
        Ok(update)
    }

    /// Apply to `base`. Null clears the nullable name fields and leaves non-nullable fields unchanged.
    pub fn apply(&self, mut base: UserBase) -> UserBase {
        if let Patch::Value(ref email) = self.email {
            base.email = email.clone();
        }
        match self.first_name {
            Patch::Value(ref v) => base.first_name = Some(v.clone()),
            Patch::Null => base.first_name = None,
            Patch::Absent => {}
        }
        match self.last_name {
            Patch::Value(ref v) => base.last_name = Some(v.clone()),
            Patch::Null => base.last_name = None,
            Patch::Absent => {}
        }
        if let Patch::Value(active) = self.is_active {
            base.is_active = active;
        }
        base
    }
}

impl TryFrom<Value> for UserUpdate {
    type Error = ValidationErrors;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UserUpdate::from_value(&value)
    }
}

/// Public read shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct User {
    pub id: i64,
    #[serde(flatten)]
    pub base: UserBase,
}

impl User {
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut r = FieldReader::new(value);
        let id = r.required_i64("id");
        let base = UserBase::read(&mut r);
        r.finish()?;
        Ok(User { id, base })
    }
}

impl TryFrom<Value> for User {
    type Error = ValidationErrors;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        User::from_value(&value)
    }
}

/// Internal shape carrying the stored credential hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct UserInDb {
    pub id: i64,
    #[serde(flatten)]
    pub base: UserBase,
    pub hashed_password: String,
}

impl UserInDb {
    pub fn from_value(value: &Value) -> Result<Self, ValidationErrors> {
        let mut r = FieldReader::new(value);
        let id = r.required_i64("id");
        let base = UserBase::read(&mut r);
        let hashed_password = r.required_string("hashed_password");
        r.finish()?;
        Ok(UserInDb {
            id,
            base,
            hashed_password,
        })
    }
}

impl TryFrom<Value> for UserInDb {
    type Error = ValidationErrors;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        UserInDb::from_value(&value)
    }
}

impl From<UserInDb> for User {
    fn from(user: UserInDb) -> Self {
        User {
            id: user.id,
            base: user.base,
        }
    }
}

fn base_of(row: &UserRow) -> UserBase {
    UserBase {
        email: row.email.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        is_active: row.is_active,
        is_superuser: row.is_superuser,
    }
}

impl From<&UserRow> for User {
    fn from(row: &UserRow) -> Self {
        User {
            id: row.base.id,
            base: base_of(row),
        }
    }
}

impl From<&UserRow> for UserInDb {
    fn from(row: &UserRow) -> Self {
        UserInDb {
            id: row.base.id,
            base: base_of(row),
            hashed_password: row.hashed_password.clone(),
        }
    }
}
