//! The owning context: matcher, database, acting user and busy flag

use super::error::AssistError;
use super::guard::AnalysisGuard;
use super::photo::{pick_analysis, read_frame};
use crate::config::AssistConfig;
use crate::matcher::{Analysis, KnowledgeEntry, MatcherStats, ProblemMatcher, Triage, triage};
use crate::store::{
    Database, Diagnostic, Document, NewDiagnostic, NewDocument, NewUser, PublicUser, Role,
    StoreError, User,
};
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Everything produced by one analysis request
#[derive(Debug, Clone, Serialize)]
pub struct Diagnosis {
    pub diagnostic: Diagnostic,
    pub analysis: Analysis,
    pub triage: Triage,
}

/// A diagnostic closed out together with the knowledge it taught
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub diagnostic: Diagnostic,
    pub learned: KnowledgeEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantStats {
    /// Analysis counters over every logged diagnostic
    pub matcher: MatcherStats,
    pub users: usize,
    pub documents: usize,
    pub diagnostics: usize,
    pub resolved_diagnostics: usize,
    pub learned_entries: usize,
}

pub struct Assistant {
    config: AssistConfig,
    db: Mutex<Database>,
    matcher: Mutex<ProblemMatcher>,
    guard: AnalysisGuard,
    current_user: Option<User>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Assistant {
    /// Build the assistant, loading previously learned knowledge and history
    pub fn new(config: AssistConfig, db: Database) -> Self {
        let mut matcher =
            ProblemMatcher::with_seed(config.matcher.clone(), db.learned_knowledge().to_vec());
        let (total, successful) = history(db.diagnostics());
        matcher.set_history(total, successful);

        Self {
            config,
            db: Mutex::new(db),
            matcher: Mutex::new(matcher),
            guard: AnalysisGuard::new(),
            current_user: None,
        }
    }

    /// Authenticate and become the acting user
    pub fn login(&mut self, email: &str, password: &str) -> Result<PublicUser, AssistError> {
        let user = lock(&self.db)
            .login(email, password)
            .cloned()
            .ok_or(AssistError::InvalidCredentials)?;

        tracing::info!(email, role = %user.role, "Logged in");
        let public = user.public();
        self.current_user = Some(user);
        Ok(public)
    }

    fn require_admin(&self, action: &'static str) -> Result<&User, AssistError> {
        match self.current_user {
            None => Err(AssistError::NotAuthenticated),
            Some(ref user) if user.is_admin() => Ok(user),
            Some(_) => Err(AssistError::Forbidden { action }),
        }
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Analyse a problem description and log it as a diagnostic
    ///
    /// Refused with [`AssistError::Busy`] while another analysis is running.
    pub async fn analyze(
        &self,
        problem: &str,
        brand: Option<&str>,
    ) -> Result<Diagnosis, AssistError> {
        if problem.trim().is_empty() {
            return Err(AssistError::EmptyProblem);
        }

        let _token = self.guard.try_acquire().ok_or(AssistError::Busy)?;
        tracing::info!(problem, brand, "Analysing problem");

        tokio::time::sleep(Duration::from_millis(self.config.defaults.analysis_delay_ms)).await;

        let analysis = lock(&self.matcher).analyze(problem, brand);
        let technician = self.current_user.as_ref().map(|u| u.name.as_str());
        let diagnostic = lock(&self.db).add_diagnostic(
            NewDiagnostic {
                problem: problem.to_string(),
                brand: brand.map(str::to_string),
                solution: analysis.solution().to_string(),
                matched: analysis.is_known(),
            },
            technician,
        )?;

        Ok(Diagnosis {
            diagnostic,
            analysis,
            triage: triage(problem),
        })
    }

    /// Analyse a captured photo; shares the busy flag with [`Self::analyze`]
    pub async fn analyze_photo(&self, path: &Path) -> Result<String, AssistError> {
        let _token = self.guard.try_acquire().ok_or(AssistError::Busy)?;

        let frame = read_frame(path).await?;
        tracing::info!(path = %path.display(), bytes = frame.len(), "Analysing photo");

        tokio::time::sleep(Duration::from_millis(self.config.defaults.photo_delay_ms)).await;
        drop(frame);

        Ok(pick_analysis().to_string())
    }

    /// Persist a knowledge entry, then add it to the matcher
    pub fn learn(
        &self,
        problem: &str,
        solution: &str,
        success: bool,
        brand: Option<&str>,
    ) -> Result<KnowledgeEntry, AssistError> {
        let mut matcher = lock(&self.matcher);
        let entry = matcher.learn(problem, solution, success, brand, |entry| {
            lock(&self.db).record_learning(entry)
        })?;
        Ok(entry)
    }

    fn find_diagnostic(&self, id: u64) -> Result<Diagnostic, AssistError> {
        let diagnostic = lock(&self.db).get_diagnostic(id).cloned();
        Ok(diagnostic.ok_or(StoreError::NotFound {
            kind: "diagnostic",
            id,
        })?)
    }

    /// Learn a diagnostic's solution as successful, then mark it resolved
    pub fn resolve(&self, id: u64) -> Result<Resolution, AssistError> {
        let diagnostic = self.find_diagnostic(id)?;
        let learned = self.learn(
            &diagnostic.problem,
            &diagnostic.solution,
            true,
            diagnostic.brand.as_deref(),
        )?;
        let diagnostic = lock(&self.db).mark_resolved(id)?;
        Ok(Resolution {
            diagnostic,
            learned,
        })
    }

    /// Record what actually fixed a diagnostic; learned with low confidence
    pub fn correct(&self, id: u64, solution: &str) -> Result<Resolution, AssistError> {
        if solution.trim().is_empty() {
            return Err(StoreError::invalid("solution", "must not be empty").into());
        }

        let diagnostic = self.find_diagnostic(id)?;
        let learned = self.learn(
            &diagnostic.problem,
            solution,
            false,
            diagnostic.brand.as_deref(),
        )?;
        let diagnostic = lock(&self.db).correct_diagnostic(id, solution)?;
        Ok(Resolution {
            diagnostic,
            learned,
        })
    }

    pub fn search(&self, query: &str, brand: Option<&str>) -> Vec<KnowledgeEntry> {
        lock(&self.matcher)
            .search(query, brand)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        lock(&self.db).diagnostics().to_vec()
    }

    pub fn documents(&self, brand: Option<&str>) -> Vec<Document> {
        let db = lock(&self.db);
        match brand {
            Some(brand) => db.documents_by_brand(brand).into_iter().cloned().collect(),
            None => db.documents().to_vec(),
        }
    }

    pub fn add_document(&self, input: NewDocument) -> Result<Document, AssistError> {
        let admin = self.require_admin("adding a document")?;
        Ok(lock(&self.db).add_document(input, Some(admin.email.as_str()))?)
    }

    pub fn delete_document(&self, id: u64) -> Result<Document, AssistError> {
        self.require_admin("deleting a document")?;
        Ok(lock(&self.db).delete_document(id)?)
    }

    /// Every user, or only those holding `role`
    pub fn users(&self, role: Option<Role>) -> Result<Vec<PublicUser>, AssistError> {
        self.require_admin("listing users")?;
        let db = lock(&self.db);
        let users = match role {
            Some(role) => db.users_by_role(role),
            None => db.users().iter().collect(),
        };
        Ok(users.into_iter().map(User::public).collect())
    }

    pub fn add_user(&self, input: NewUser) -> Result<PublicUser, AssistError> {
        self.require_admin("adding a user")?;
        Ok(lock(&self.db).add_user(input)?.public())
    }

    pub fn delete_user(&self, id: u64) -> Result<PublicUser, AssistError> {
        let admin = self.require_admin("deleting a user")?;
        if admin.id == id {
            return Err(StoreError::invalid("user", "cannot delete the acting account").into());
        }
        Ok(lock(&self.db).delete_user(id)?.public())
    }

    /// Delete every stored collection
    pub fn wipe(&self) -> Result<usize, AssistError> {
        self.require_admin("wiping storage")?;
        let removed = lock(&self.db).wipe()?;
        lock(&self.matcher).set_history(0, 0);
        Ok(removed)
    }

    pub fn stats(&self) -> AssistantStats {
        let matcher = lock(&self.matcher).stats();
        let db = lock(&self.db);

        AssistantStats {
            matcher,
            users: db.users().len(),
            documents: db.documents().len(),
            diagnostics: db.diagnostics().len(),
            resolved_diagnostics: db.diagnostics().iter().filter(|d| d.resolved).count(),
            learned_entries: db.learned_knowledge().len(),
        }
    }

    pub fn config(&self) -> &AssistConfig {
        &self.config
    }

    pub fn stored_keys(&self) -> Result<Vec<String>, AssistError> {
        Ok(lock(&self.db).stored_keys()?)
    }
}

/// `(total, matched)` counts over logged diagnostics
fn history(diagnostics: &[Diagnostic]) -> (u64, u64) {
    let matched = diagnostics.iter().filter(|d| d.matched).count();
    (diagnostics.len() as u64, matched as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvStore, LEARNED_KNOWLEDGE_KEY};
    use tempfile::TempDir;

    fn config(delay_ms: u64) -> AssistConfig {
        let mut config = AssistConfig::default();
        config.defaults.analysis_delay_ms = delay_ms;
        config.defaults.photo_delay_ms = delay_ms;
        config
    }

    fn assistant(delay_ms: u64) -> Assistant {
        let db = Database::open(KvStore::open_in_memory().unwrap()).unwrap();
        Assistant::new(config(delay_ms), db)
    }

    #[tokio::test]
    async fn test_analyze_records_diagnostic() {
        let mut assistant = assistant(0);
        assistant.login("tech1@ascenseurs.com", "Tech123!").unwrap();

        let diagnosis = assistant
            .analyze("porte qui ne se ferme pas", Some("Kone"))
            .await
            .unwrap();

        assert!(diagnosis.analysis.is_known());
        assert_eq!(diagnosis.diagnostic.technician, "Technicien Kone");
        assert_eq!(diagnosis.diagnostic.brand.as_deref(), Some("Kone"));
        assert_eq!(diagnosis.diagnostic.solution, diagnosis.analysis.solution());
        assert!(!diagnosis.diagnostic.resolved);
        assert_eq!(assistant.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_diagnostic_keeps_expert_advice() {
        let assistant = assistant(0);
        let diagnosis = assistant
            .analyze("bruit de claquement au démarrage", None)
            .await
            .unwrap();

        assert!(!diagnosis.analysis.is_known());
        assert!(diagnosis.diagnostic.solution.starts_with("Bruits anormaux"));
        assert_eq!(diagnosis.diagnostic.technician, "unknown");
    }

    #[tokio::test]
    async fn test_overlapping_analysis_is_refused() {
        let assistant = assistant(50);

        let (first, second) = tokio::join!(
            assistant.analyze("ascenseur bloqué entre deux étages", None),
            assistant.analyze("porte qui ne se ferme pas", None),
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(AssistError::Busy)));
        assert!(!assistant.is_busy());

        // Only the accepted call was logged
        assert_eq!(assistant.diagnostics().len(), 1);
        assert!(assistant.analyze("porte qui ne se ferme pas", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_photo_shares_busy_flag() {
        let dir = TempDir::new().unwrap();
        let frame = dir.path().join("frame.jpg");
        std::fs::write(&frame, [1, 2, 3]).unwrap();

        let assistant = assistant(50);
        let (text, photo) = tokio::join!(
            assistant.analyze("alarme active en cabine", None),
            assistant.analyze_photo(&frame),
        );
        assert!(text.is_ok());
        assert!(matches!(photo, Err(AssistError::Busy)));

        let analysis = assistant.analyze_photo(&frame).await.unwrap();
        assert!(analysis.starts_with("Analyse"));
    }

    #[tokio::test]
    async fn test_empty_problem_rejected() {
        let assistant = assistant(0);
        assert!(matches!(
            assistant.analyze("   ", None).await,
            Err(AssistError::EmptyProblem)
        ));
        assert!(!assistant.is_busy());
    }

    #[tokio::test]
    async fn test_resolve_and_correct_teach_the_matcher() {
        let assistant = assistant(0);
        let diagnosis = assistant
            .analyze("contacteur principal grillé", Some("Otis"))
            .await
            .unwrap();
        assert!(!diagnosis.analysis.is_known());

        let corrected = assistant
            .correct(diagnosis.diagnostic.id, "Remplacer le contacteur principal")
            .unwrap();
        assert!(corrected.diagnostic.resolved);
        assert_eq!(corrected.learned.confidence, 0.6);
        assert_eq!(corrected.learned.brand, "Otis");

        let again = assistant
            .analyze("contacteur principal grillé", Some("Otis"))
            .await
            .unwrap();
        assert_eq!(again.analysis.solution(), "Remplacer le contacteur principal");

        let resolved = assistant.resolve(again.diagnostic.id).unwrap();
        assert_eq!(resolved.learned.confidence, 0.9);
        assert_eq!(assistant.stats().learned_entries, 2);
    }

    #[test]
    fn test_learning_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        {
            let db = Database::open(KvStore::open(&path).unwrap()).unwrap();
            let assistant = Assistant::new(config(0), db);
            assistant
                .learn("variateur en defaut", "Reset du variateur", true, None)
                .unwrap();
        }

        let db = Database::open(KvStore::open(&path).unwrap()).unwrap();
        let assistant = Assistant::new(config(0), db);
        assert_eq!(assistant.search("variateur", None).len(), 1);
        assert_eq!(assistant.stats().learned_entries, 1);
    }

    #[test]
    fn test_admin_operations_require_admin() {
        let mut assistant = assistant(0);

        assert!(matches!(
            assistant.users(None),
            Err(AssistError::NotAuthenticated)
        ));

        assistant.login("tech1@ascenseurs.com", "Tech123!").unwrap();
        assert!(matches!(
            assistant.delete_document(1),
            Err(AssistError::Forbidden { .. })
        ));

        assistant.login("admin@ascenseurs.com", "Admin2024!").unwrap();
        let user = assistant
            .add_user(NewUser {
                email: "tech3@ascenseurs.com".into(),
                password: "Tech123!".into(),
                name: "Technicien Otis".into(),
                role: Role::Technician,
                specialty: Some("Otis".into()),
            })
            .unwrap();
        assert_eq!(assistant.users(None).unwrap().len(), 4);
        assert_eq!(assistant.users(Some(Role::Admin)).unwrap().len(), 1);
        assert_eq!(assistant.users(Some(Role::Technician)).unwrap().len(), 3);

        let doc = assistant
            .add_document(NewDocument {
                name: "Manuel Otis Gen2".into(),
                brand: "Otis".into(),
                kind: "manuel".into(),
            })
            .unwrap();
        assert_eq!(doc.added_by, "admin@ascenseurs.com");
        assert_eq!(assistant.documents(Some("Otis")).len(), 1);

        assistant.delete_user(user.id).unwrap();
        assert!(assistant.delete_user(1).is_err());
    }

    #[test]
    fn test_bad_login() {
        let mut assistant = assistant(0);
        assert!(matches!(
            assistant.login("admin@ascenseurs.com", "nope"),
            Err(AssistError::InvalidCredentials)
        ));
        assert!(matches!(
            assistant.users(None),
            Err(AssistError::NotAuthenticated)
        ));
    }

    #[test]
    fn test_wipe() {
        let mut assistant = assistant(0);
        assistant.login("admin@ascenseurs.com", "Admin2024!").unwrap();
        assert_eq!(assistant.wipe().unwrap(), 4);
        assert!(assistant.stored_keys().unwrap().is_empty());
        assert_eq!(assistant.stats().users, 0);
        assert_eq!(assistant.stats().matcher.total_diagnostics, 0);
    }

    #[tokio::test]
    async fn test_stats_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.db");

        {
            let db = Database::open(KvStore::open(&path).unwrap()).unwrap();
            let assistant = Assistant::new(config(0), db);
            assistant.analyze("porte qui ne se ferme pas", None).await.unwrap();
            assistant.analyze("voyant inconnu clignote", None).await.unwrap();
        }

        let db = Database::open(KvStore::open(&path).unwrap()).unwrap();
        let assistant = Assistant::new(config(0), db);
        let stats = assistant.stats();
        assert_eq!(stats.matcher.total_diagnostics, 2);
        assert_eq!(stats.matcher.successful_diagnostics, 1);
        assert_eq!(stats.matcher.accuracy_percentage, 50);
        assert_eq!(stats.diagnostics, 2);
    }

    #[tokio::test]
    async fn test_corrupt_learned_knowledge_does_not_block_learning() {
        let kv = KvStore::open_in_memory().unwrap();
        kv.put_raw(LEARNED_KNOWLEDGE_KEY, "not json").unwrap();
        let assistant = Assistant::new(config(0), Database::open(kv).unwrap());

        let diagnosis = assistant
            .analyze("ascenseur bloqué entre deux étages", None)
            .await
            .unwrap();
        let resolution = assistant.resolve(diagnosis.diagnostic.id).unwrap();
        assert!(resolution.diagnostic.resolved);

        assistant.learn("frein usé", "Changer les garnitures", true, None).unwrap();
        assert_eq!(assistant.stats().learned_entries, 2);
        assert_eq!(assistant.stats().matcher.knowledge_base_size, 7);
    }

    #[test]
    fn test_resolve_unknown_diagnostic_learns_nothing() {
        let assistant = assistant(0);
        assert!(matches!(
            assistant.resolve(404),
            Err(AssistError::Store(StoreError::NotFound { .. }))
        ));
        assert!(assistant.correct(404, "   ").is_err());
        assert_eq!(assistant.stats().learned_entries, 0);
        assert_eq!(assistant.stats().matcher.knowledge_base_size, 5);
    }
}
