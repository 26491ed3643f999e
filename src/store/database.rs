//! Users, documents, diagnostics and learned knowledge over the key-value store

use super::error::StoreError;
use super::kv::KvStore;
use super::records::{
    Diagnostic, Document, NewDiagnostic, NewDocument, NewUser, Role, User, next_id,
};
use super::{DIAGNOSTICS_KEY, DOCUMENTS_KEY, LEARNED_KNOWLEDGE_KEY, USERS_KEY};
use crate::matcher::KnowledgeEntry;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// In-memory snapshot of every collection, written back wholesale on change
pub struct Database {
    kv: KvStore,
    users: Vec<User>,
    documents: Vec<Document>,
    diagnostics: Vec<Diagnostic>,
    learned: Vec<KnowledgeEntry>,
}

fn default_users() -> Vec<User> {
    let seeds = [
        (
            1,
            "admin@ascenseurs.com",
            "Admin2024!",
            "Administrateur Principal",
            Role::Admin,
            None,
        ),
        (
            2,
            "tech1@ascenseurs.com",
            "Tech123!",
            "Technicien Kone",
            Role::Technician,
            Some("Kone"),
        ),
        (
            3,
            "tech2@ascenseurs.com",
            "Tech123!",
            "Technicien Thyssen",
            Role::Technician,
            Some("Thyssen"),
        ),
    ];

    seeds
        .into_iter()
        .map(|(id, email, password, name, role, specialty)| {
            NewUser {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                role,
                specialty: specialty.map(str::to_string),
            }
            .into_user(id)
        })
        .collect()
}

fn default_documents() -> Vec<Document> {
    let now = Utc::now();
    vec![
        Document {
            id: 1,
            name: "Manuel Kone MonoSpace 2024".to_string(),
            brand: "Kone".to_string(),
            kind: "manuel".to_string(),
            added_by: "admin@ascenseurs.com".to_string(),
            created_at: now,
        },
        Document {
            id: 2,
            name: "Schéma Thyssen 3300 Electrique".to_string(),
            brand: "Thyssen".to_string(),
            kind: "schema".to_string(),
            added_by: "admin@ascenseurs.com".to_string(),
            created_at: now,
        },
    ]
}

/// Load `key`, seeding it when absent and falling back to the seed when corrupt
fn load_or_seed<T, F>(kv: &KvStore, key: &str, seed: F) -> Result<Vec<T>, StoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Vec<T>,
{
    if !kv.contains(key)? {
        let records = seed();
        kv.save(key, &records)?;
        tracing::info!(key, records = records.len(), "Seeded collection");
        return Ok(records);
    }

    match kv.get(key) {
        Ok(records) => Ok(records),
        Err(e @ StoreError::Parse { .. }) => {
            tracing::warn!(key, error = %e, "Discarding unreadable collection");
            Ok(seed())
        }
        Err(e) => Err(e),
    }
}

fn require(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        Err(StoreError::invalid(field, "must not be empty"))
    } else {
        Ok(())
    }
}

impl Database {
    /// Load every collection, seeding users and documents on first use
    pub fn open(kv: KvStore) -> Result<Self, StoreError> {
        let users = load_or_seed(&kv, USERS_KEY, default_users)?;
        let documents = load_or_seed(&kv, DOCUMENTS_KEY, default_documents)?;
        let diagnostics = load_or_seed(&kv, DIAGNOSTICS_KEY, Vec::new)?;
        let learned = load_or_seed(&kv, LEARNED_KNOWLEDGE_KEY, Vec::new)?;

        tracing::info!(
            users = users.len(),
            documents = documents.len(),
            diagnostics = diagnostics.len(),
            learned = learned.len(),
            "Database ready"
        );

        Ok(Self {
            kv,
            users,
            documents,
            diagnostics,
            learned,
        })
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Find the user matching both e-mail and password
    pub fn login(&self, email: &str, password: &str) -> Option<&User> {
        self.users
            .iter()
            .find(|u| u.email == email && u.check_password(password))
    }

    pub fn add_user(&mut self, input: NewUser) -> Result<User, StoreError> {
        require("name", &input.name)?;
        require("email", &input.email)?;
        require("password", &input.password)?;

        if self.users.iter().any(|u| u.email == input.email) {
            return Err(StoreError::DuplicateEmail(input.email));
        }

        let id = next_id(self.users.iter().map(|u| u.id));
        let user = input.into_user(id);
        self.users.push(user.clone());
        self.kv.save(USERS_KEY, &self.users)?;

        tracing::info!(id, email = %user.email, role = %user.role, "Added user");
        Ok(user)
    }

    pub fn delete_user(&mut self, id: u64) -> Result<User, StoreError> {
        let index = self
            .users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound { kind: "user", id })?;

        let removed = self.users.remove(index);
        self.kv.save(USERS_KEY, &self.users)?;

        tracing::info!(id, email = %removed.email, "Deleted user");
        Ok(removed)
    }

    pub fn users_by_role(&self, role: Role) -> Vec<&User> {
        self.users.iter().filter(|u| u.role == role).collect()
    }

    /// Add a document; `added_by` defaults to "system"
    pub fn add_document(
        &mut self,
        input: NewDocument,
        added_by: Option<&str>,
    ) -> Result<Document, StoreError> {
        require("name", &input.name)?;

        let document = Document {
            id: next_id(self.documents.iter().map(|d| d.id)),
            name: input.name,
            brand: input.brand,
            kind: input.kind,
            added_by: added_by.unwrap_or("system").to_string(),
            created_at: Utc::now(),
        };
        self.documents.push(document.clone());
        self.kv.save(DOCUMENTS_KEY, &self.documents)?;

        tracing::info!(id = document.id, name = %document.name, "Added document");
        Ok(document)
    }

    pub fn delete_document(&mut self, id: u64) -> Result<Document, StoreError> {
        let index = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or(StoreError::NotFound {
                kind: "document",
                id,
            })?;

        let removed = self.documents.remove(index);
        self.kv.save(DOCUMENTS_KEY, &self.documents)?;

        tracing::info!(id, name = %removed.name, "Deleted document");
        Ok(removed)
    }

    pub fn documents_by_brand(&self, brand: &str) -> Vec<&Document> {
        self.documents.iter().filter(|d| d.brand == brand).collect()
    }

    /// Log a diagnostic; `technician` defaults to "unknown"
    pub fn add_diagnostic(
        &mut self,
        input: NewDiagnostic,
        technician: Option<&str>,
    ) -> Result<Diagnostic, StoreError> {
        let diagnostic = Diagnostic {
            id: next_id(self.diagnostics.iter().map(|d| d.id)),
            problem: input.problem,
            brand: input.brand,
            solution: input.solution,
            date: Utc::now(),
            technician: technician.unwrap_or("unknown").to_string(),
            resolved: false,
            matched: input.matched,
        };
        self.diagnostics.push(diagnostic.clone());
        self.kv.save(DIAGNOSTICS_KEY, &self.diagnostics)?;

        Ok(diagnostic)
    }

    pub fn get_diagnostic(&self, id: u64) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.id == id)
    }

    fn update_diagnostic<F>(&mut self, id: u64, update: F) -> Result<Diagnostic, StoreError>
    where
        F: FnOnce(&mut Diagnostic),
    {
        let diagnostic = self
            .diagnostics
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound {
                kind: "diagnostic",
                id,
            })?;

        update(diagnostic);
        let updated = diagnostic.clone();
        self.kv.save(DIAGNOSTICS_KEY, &self.diagnostics)?;
        Ok(updated)
    }

    pub fn mark_resolved(&mut self, id: u64) -> Result<Diagnostic, StoreError> {
        self.update_diagnostic(id, |d| d.resolved = true)
    }

    /// Replace the recorded solution with what actually fixed the problem
    pub fn correct_diagnostic(&mut self, id: u64, solution: &str) -> Result<Diagnostic, StoreError> {
        require("solution", solution)?;
        self.update_diagnostic(id, |d| {
            d.solution = solution.to_string();
            d.resolved = true;
        })
    }

    pub fn learned_knowledge(&self) -> &[KnowledgeEntry] {
        &self.learned
    }

    /// Append one learned entry and rewrite the collection
    ///
    /// The entry is dropped again if the write fails.
    pub fn record_learning(&mut self, entry: &KnowledgeEntry) -> Result<(), StoreError> {
        self.learned.push(entry.clone());
        if let Err(e) = self.kv.save(LEARNED_KNOWLEDGE_KEY, &self.learned) {
            self.learned.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Delete every stored collection
    ///
    /// The in-memory snapshot is emptied too; seeds return on the next open.
    pub fn wipe(&mut self) -> Result<usize, StoreError> {
        let removed = self.kv.clear()?;
        self.users.clear();
        self.documents.clear();
        self.diagnostics.clear();
        self.learned.clear();

        tracing::warn!(keys = removed, "Wiped all stored data");
        Ok(removed)
    }

    pub fn stored_keys(&self) -> Result<Vec<String>, StoreError> {
        self.kv.keys()
    }
}
