//! Local persistence - JSON collections in a single-file key-value store

mod database;
mod error;
mod kv;
mod password;
mod records;
mod schema;

pub use database::Database;
pub use error::StoreError;
pub use kv::KvStore;
pub use records::{
    Diagnostic, Document, NewDiagnostic, NewDocument, NewUser, PublicUser, Role, User,
};

pub const USERS_KEY: &str = "users";
pub const DOCUMENTS_KEY: &str = "documents";
pub const DIAGNOSTICS_KEY: &str = "diagnostics";
pub const LEARNED_KNOWLEDGE_KEY: &str = "learned_knowledge";
