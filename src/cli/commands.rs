//! CLI command implementations
//!
//! Each command returns a process exit code. User-facing failures (busy,
//! bad credentials, missing records) are reported through the handler and
//! map to exit code 1; only unexpected failures propagate as errors.

use super::output::{
    OutputEvent, OutputHandler, format_diagnosis, format_diagnostics, format_documents,
    format_entries, format_resolution, format_stats, format_users,
};
use crate::assistant::{AssistError, Assistant};
use crate::store::{NewDocument, NewUser, Role};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Report an assistant failure and turn it into an exit code
fn fail(handler: &dyn OutputHandler, error: AssistError) -> Result<i32> {
    if matches!(&error, AssistError::Store(store) if is_internal(store)) {
        return Err(error.into());
    }

    handler.emit(OutputEvent::Error {
        error: error.to_string(),
    });
    Ok(1)
}

fn is_internal(error: &crate::store::StoreError) -> bool {
    use crate::store::StoreError;
    matches!(
        error,
        StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::Serialize { .. }
    )
}

fn emit_result<T: Serialize>(handler: &dyn OutputHandler, human: &str, value: &T) -> Result<i32> {
    handler.result(human, serde_json::to_value(value)?);
    Ok(0)
}

/// Analyse a problem description
pub async fn analyze(
    assistant: &Assistant,
    problem: &str,
    brand: Option<&str>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    handler.emit(OutputEvent::AnalysisStart {
        problem: problem.to_string(),
        brand: brand.map(str::to_string),
    });

    match assistant.analyze(problem, brand).await {
        Ok(diagnosis) => {
            if !diagnosis.analysis.is_known() {
                handler.emit(OutputEvent::Info {
                    message: format!(
                        "Once fixed, record the solution with `liftassist correct {} \"...\"`",
                        diagnosis.diagnostic.id
                    ),
                });
            }
            emit_result(handler, &format_diagnosis(&diagnosis), &diagnosis)
        }
        Err(e) => fail(handler, e),
    }
}

/// Analyse a captured photo
pub async fn photo(assistant: &Assistant, path: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    handler.emit(OutputEvent::PhotoStart {
        path: path.display().to_string(),
    });

    match assistant.analyze_photo(path).await {
        Ok(analysis) => {
            handler.result(&analysis, serde_json::json!({ "analysis": analysis }));
            Ok(0)
        }
        Err(e) => fail(handler, e),
    }
}

pub fn resolve(assistant: &Assistant, id: u64, handler: &dyn OutputHandler) -> Result<i32> {
    match assistant.resolve(id) {
        Ok(resolution) => emit_result(handler, &format_resolution(&resolution), &resolution),
        Err(e) => fail(handler, e),
    }
}

pub fn correct(
    assistant: &Assistant,
    id: u64,
    solution: &str,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.correct(id, solution) {
        Ok(resolution) => emit_result(handler, &format_resolution(&resolution), &resolution),
        Err(e) => fail(handler, e),
    }
}

pub fn learn(
    assistant: &Assistant,
    problem: &str,
    solution: &str,
    success: bool,
    brand: Option<&str>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.learn(problem, solution, success, brand) {
        Ok(entry) => {
            let human = format!(
                "Learned \"{}\" ({} steps, confidence {:.1})",
                entry.problem,
                entry.steps.len(),
                entry.confidence
            );
            emit_result(handler, &human, &entry)
        }
        Err(e) => fail(handler, e),
    }
}

pub fn search(
    assistant: &Assistant,
    query: &str,
    brand: Option<&str>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let entries = assistant.search(query, brand);
    emit_result(handler, &format_entries(&entries), &entries)
}

pub fn stats(assistant: &Assistant, handler: &dyn OutputHandler) -> Result<i32> {
    let stats = assistant.stats();
    emit_result(handler, &format_stats(&stats), &stats)
}

pub fn diagnostics(assistant: &Assistant, handler: &dyn OutputHandler) -> Result<i32> {
    let diagnostics = assistant.diagnostics();
    emit_result(handler, &format_diagnostics(&diagnostics), &diagnostics)
}

/// Check credentials without keeping a session
pub fn login(
    assistant: &mut Assistant,
    email: &str,
    password: &str,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.login(email, password) {
        Ok(user) => {
            let human = format!("Welcome {} ({})", user.name, user.role);
            emit_result(handler, &human, &user)
        }
        Err(e) => fail(handler, e),
    }
}

pub fn list_users(
    assistant: &Assistant,
    role: Option<Role>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.users(role) {
        Ok(users) => emit_result(handler, &format_users(&users), &users),
        Err(e) => fail(handler, e),
    }
}

pub fn add_user(
    assistant: &Assistant,
    input: NewUser,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.add_user(input) {
        Ok(user) => {
            let human = format!("Added {} <{}> as {}", user.name, user.email, user.role);
            emit_result(handler, &human, &user)
        }
        Err(e) => fail(handler, e),
    }
}

pub fn delete_user(assistant: &Assistant, id: u64, handler: &dyn OutputHandler) -> Result<i32> {
    match assistant.delete_user(id) {
        Ok(user) => emit_result(handler, &format!("Deleted {}", user.email), &user),
        Err(e) => fail(handler, e),
    }
}

pub fn list_documents(
    assistant: &Assistant,
    brand: Option<&str>,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    let documents = assistant.documents(brand);
    emit_result(handler, &format_documents(&documents), &documents)
}

pub fn add_document(
    assistant: &Assistant,
    input: NewDocument,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.add_document(input) {
        Ok(doc) => emit_result(handler, &format!("Added document #{} {}", doc.id, doc.name), &doc),
        Err(e) => fail(handler, e),
    }
}

pub fn delete_document(
    assistant: &Assistant,
    id: u64,
    handler: &dyn OutputHandler,
) -> Result<i32> {
    match assistant.delete_document(id) {
        Ok(doc) => emit_result(handler, &format!("Deleted document {}", doc.name), &doc),
        Err(e) => fail(handler, e),
    }
}

/// Delete every stored collection; refused without explicit confirmation
pub fn wipe(assistant: &Assistant, confirmed: bool, handler: &dyn OutputHandler) -> Result<i32> {
    if !confirmed {
        handler.emit(OutputEvent::Error {
            error: "refusing to wipe storage without --yes".to_string(),
        });
        return Ok(1);
    }

    match assistant.wipe() {
        Ok(removed) => {
            handler.result(
                &format!("Wiped {} collections", removed),
                serde_json::json!({ "removed": removed }),
            );
            Ok(0)
        }
        Err(e) => fail(handler, e),
    }
}

/// Report configuration, storage and integration status
pub fn doctor(assistant: &Assistant, database: &Path, handler: &dyn OutputHandler) -> Result<i32> {
    let config = assistant.config();
    let keys = match assistant.stored_keys() {
        Ok(keys) => keys,
        Err(e) => return fail(handler, e),
    };

    let mut human = format!("Database: {}\nStored keys: ", database.display());
    human.push_str(&if keys.is_empty() {
        "(none)".to_string()
    } else {
        keys.join(", ")
    });
    human.push_str(&format!(
        "\nAnalysis delay: {}ms, photo delay: {}ms",
        config.defaults.analysis_delay_ms, config.defaults.photo_delay_ms
    ));
    human.push_str(&format!(
        "\nMatcher: threshold {}, similar > {} (max {})",
        config.matcher.match_threshold,
        config.matcher.similar_threshold,
        config.matcher.similar_limit
    ));
    human.push_str("\nIntegrations:");
    for (name, integration) in config.integrations.iter() {
        human.push_str(&format!("\n  {} - {}", name, integration.status()));
    }

    handler.result(
        &human,
        serde_json::json!({
            "database": database.display().to_string(),
            "keys": keys,
            "defaults": config.defaults,
            "matcher": config.matcher,
            "integrations": config.integrations,
        }),
    );
    Ok(0)
}

/// Parse a role argument for `users add`
pub fn parse_role(value: &str) -> Result<Role, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistConfig;
    use crate::store::{Database, KvStore};
    use std::cell::RefCell;

    struct Capture {
        errors: RefCell<Vec<String>>,
        infos: RefCell<Vec<String>>,
        results: RefCell<Vec<serde_json::Value>>,
    }

    impl Capture {
        fn new() -> Self {
            Self {
                errors: RefCell::new(Vec::new()),
                infos: RefCell::new(Vec::new()),
                results: RefCell::new(Vec::new()),
            }
        }
    }

    impl OutputHandler for Capture {
        fn emit(&self, event: OutputEvent) {
            match event {
                OutputEvent::Error { error } => self.errors.borrow_mut().push(error),
                OutputEvent::Info { message } => self.infos.borrow_mut().push(message),
                _ => {}
            }
        }

        fn result(&self, _human: &str, data: serde_json::Value) {
            self.results.borrow_mut().push(data);
        }
    }

    fn assistant() -> Assistant {
        let mut config = AssistConfig::default();
        config.defaults.analysis_delay_ms = 0;
        let db = Database::open(KvStore::open_in_memory().unwrap()).unwrap();
        Assistant::new(config, db)
    }

    #[tokio::test]
    async fn test_analyze_emits_json_result() {
        let assistant = assistant();
        let handler = Capture::new();

        let code = analyze(&assistant, "porte qui ne se ferme pas", None, &handler)
            .await
            .unwrap();

        assert_eq!(code, 0);
        let results = handler.results.borrow();
        assert_eq!(results[0]["analysis"]["type"], "KNOWN_PROBLEM");
        assert_eq!(results[0]["diagnostic"]["resolved"], false);
        assert_eq!(results[0]["diagnostic"]["matched"], true);
        assert!(handler.infos.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_new_problem_suggests_correct() {
        let assistant = assistant();
        let handler = Capture::new();

        analyze(&assistant, "voyant inconnu clignote", Some("Otis"), &handler)
            .await
            .unwrap();

        let id = handler.results.borrow()[0]["diagnostic"]["id"].clone();
        let infos = handler.infos.borrow();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].contains(&format!("liftassist correct {}", id)));
    }

    #[test]
    fn test_list_users_by_role() {
        let mut assistant = assistant();
        let handler = Capture::new();
        assistant.login("admin@ascenseurs.com", "Admin2024!").unwrap();

        assert_eq!(list_users(&assistant, Some(Role::Technician), &handler).unwrap(), 0);
        let results = handler.results.borrow();
        assert_eq!(results[0].as_array().unwrap().len(), 2);
        assert!(
            results[0]
                .as_array()
                .unwrap()
                .iter()
                .all(|u| u["role"] == "technicien")
        );
    }

    #[test]
    fn test_missing_diagnostic_is_user_error() {
        let assistant = assistant();
        let handler = Capture::new();

        assert_eq!(resolve(&assistant, 404, &handler).unwrap(), 1);
        assert_eq!(
            handler.errors.borrow().as_slice(),
            ["diagnostic 404 not found".to_string()]
        );
    }

    #[test]
    fn test_admin_commands_report_forbidden() {
        let mut assistant = assistant();
        let handler = Capture::new();

        assert_eq!(list_users(&assistant, None, &handler).unwrap(), 1);
        assert_eq!(handler.errors.borrow()[0], "not logged in");

        assert_eq!(
            login(&mut assistant, "tech2@ascenseurs.com", "Tech123!", &handler).unwrap(),
            0
        );
        assert_eq!(delete_document(&assistant, 1, &handler).unwrap(), 1);
        assert!(handler.errors.borrow()[1].contains("administrator"));
    }

    #[test]
    fn test_wipe_requires_confirmation() {
        let mut assistant = assistant();
        let handler = Capture::new();
        assistant.login("admin@ascenseurs.com", "Admin2024!").unwrap();

        assert_eq!(wipe(&assistant, false, &handler).unwrap(), 1);
        assert_eq!(assistant.stats().users, 3);

        assert_eq!(wipe(&assistant, true, &handler).unwrap(), 0);
        assert_eq!(assistant.stats().users, 0);
    }

    #[test]
    fn test_doctor_lists_integrations() {
        let assistant = assistant();
        let handler = Capture::new();

        assert_eq!(doctor(&assistant, Path::new(":memory:"), &handler).unwrap(), 0);
        let results = handler.results.borrow();
        assert_eq!(results[0]["integrations"]["remote_db"]["enabled"], false);
        assert_eq!(results[0]["keys"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("admin"), Ok(Role::Admin));
        assert!(parse_role("boss").is_err());
    }
}
