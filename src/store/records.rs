//! Persisted record types

use super::password::{hash_password, verify_password};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "technicien")]
    Technician,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Technician => write!(f, "technicien"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "technicien" | "technician" | "tech" => Ok(Role::Technician),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An account able to log in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Brand the technician specialises in
    #[serde(default)]
    pub specialty: Option<String>,
    pub password_salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn check_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_salt, &self.password_hash)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The user without credential material
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            specialty: self.specialty.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub specialty: Option<String>,
}

impl NewUser {
    pub(crate) fn into_user(self, id: u64) -> User {
        let (password_salt, password_hash) = hash_password(&self.password);
        User {
            id,
            email: self.email,
            name: self.name,
            role: self.role,
            specialty: self.specialty,
            password_salt,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// A technical document listed for technicians
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub name: String,
    pub brand: String,
    /// Manual, schematic, procedure...
    #[serde(rename = "type")]
    pub kind: String,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub brand: String,
    pub kind: String,
}

/// A logged technician session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: u64,
    pub problem: String,
    #[serde(default)]
    pub brand: Option<String>,
    pub solution: String,
    pub date: DateTime<Utc>,
    pub technician: String,
    pub resolved: bool,
    /// The analysis matched a knowledge entry
    #[serde(default)]
    pub matched: bool,
}

#[derive(Debug, Clone)]
pub struct NewDiagnostic {
    pub problem: String,
    pub brand: Option<String>,
    pub solution: String,
    pub matched: bool,
}

/// Next record id: the current millisecond timestamp, bumped past `existing`
pub(crate) fn next_id(existing: impl Iterator<Item = u64>) -> u64 {
    let now = Utc::now().timestamp_millis().max(0) as u64;
    match existing.max() {
        Some(max) if max >= now => max.saturating_add(1),
        _ => now,
    }
}
