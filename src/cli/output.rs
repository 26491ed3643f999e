//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::assistant::{AssistantStats, Diagnosis, Resolution};
use crate::matcher::{Analysis, KnowledgeEntry};
use crate::store::{Diagnostic, Document, PublicUser};
use serde::{Deserialize, Serialize};

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Console
        }
    }
}

/// Progress and status events emitted by commands
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    AnalysisStart {
        problem: String,
        brand: Option<String>,
    },
    PhotoStart {
        path: String,
    },
    Info {
        message: String,
    },
    Error {
        error: String,
    },
    Debug {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler {
    /// Emit a progress event
    fn emit(&self, event: OutputEvent);

    /// Write a command's final result: `human` for terminals, `data` for JSON
    fn result(&self, human: &str, data: serde_json::Value);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::AnalysisStart { problem, brand } => match brand {
                Some(brand) => eprintln!("Analysing \"{}\" ({})...", problem, brand),
                None => eprintln!("Analysing \"{}\"...", problem),
            },
            OutputEvent::PhotoStart { path } => {
                eprintln!("Analysing photo {}...", path);
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
            OutputEvent::Error { error } => {
                eprintln!("Error: {}", error);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
        }
    }

    fn result(&self, human: &str, _data: serde_json::Value) {
        println!("{}", human);
    }
}

/// JSON output handler, one pretty-printed document per result
pub struct JsonHandler;

fn print_json<T: Serialize>(value: &T) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{}", s);
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        // Progress stays off stdout so the result is the only JSON document
        if let OutputEvent::Error { .. } = event {
            print_json(&event);
        }
    }

    fn result(&self, _human: &str, data: serde_json::Value) {
        print_json(&data);
    }
}

/// Quiet handler: errors and final output only
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { error } = event {
            eprintln!("Error: {}", error);
        }
    }

    fn result(&self, human: &str, _data: serde_json::Value) {
        println!("{}", human);
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

fn push_steps(out: &mut String, steps: &[String]) {
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, step));
    }
}

pub fn format_diagnosis(diagnosis: &Diagnosis) -> String {
    let mut out = format!(
        "{}\nConfidence: {}%",
        diagnosis.analysis.message(),
        (diagnosis.analysis.confidence() * 100.0).round() as u32
    );

    if let Analysis::KnownProblem(known) = &diagnosis.analysis {
        out.push_str(&format!("\nSolution ({}): {}", known.brand, known.solution));
    }
    out.push_str("\nSteps:");
    push_steps(&mut out, diagnosis.analysis.recommended_steps());

    match &diagnosis.analysis {
        Analysis::KnownProblem(known) => {
            if !known.similar_problems.is_empty() {
                out.push_str("\nSimilar problems:");
                for similar in &known.similar_problems {
                    out.push_str(&format!(
                        "\n  - {} ({}%)",
                        similar.problem,
                        (similar.score * 100.0).round() as u32
                    ));
                }
            }
        }
        Analysis::NewProblem(new) => {
            out.push_str("\n\n");
            out.push_str(&new.suggested_solution);
        }
    }

    out.push_str(&format!(
        "\nUrgency: {:?}, category: {:?}",
        diagnosis.triage.urgency, diagnosis.triage.category
    ));
    out.push_str(&format!(
        "\nDiagnostic #{} recorded (resolve with `liftassist resolve {}`)",
        diagnosis.diagnostic.id, diagnosis.diagnostic.id
    ));
    out
}

pub fn format_resolution(resolution: &Resolution) -> String {
    format!(
        "Diagnostic #{} resolved\nLearned: \"{}\" -> {} (confidence {:.1})",
        resolution.diagnostic.id,
        resolution.learned.problem,
        resolution.learned.solution,
        resolution.learned.confidence
    )
}

pub fn format_entries(entries: &[KnowledgeEntry]) -> String {
    if entries.is_empty() {
        return "(no matching knowledge)".to_string();
    }
    entries
        .iter()
        .map(|e| format!("[{}] {} -> {}", e.brand, e.problem, e.solution))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "(no diagnostics)".to_string();
    }
    diagnostics
        .iter()
        .map(|d| {
            format!(
                "{} #{} {} [{}] {} - {}",
                if d.resolved { "✓" } else { "·" },
                d.id,
                d.date.format("%Y-%m-%d %H:%M"),
                d.brand.as_deref().unwrap_or("-"),
                d.problem,
                d.technician
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_documents(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "(no documents)".to_string();
    }
    documents
        .iter()
        .map(|d| {
            format!(
                "#{} {} [{}] ({}) added by {}",
                d.id, d.name, d.brand, d.kind, d.added_by
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_users(users: &[PublicUser]) -> String {
    if users.is_empty() {
        return "(no users)".to_string();
    }
    users
        .iter()
        .map(|u| match u.specialty {
            Some(ref specialty) => {
                format!("#{} {} <{}> {} ({})", u.id, u.name, u.email, u.role, specialty)
            }
            None => format!("#{} {} <{}> {}", u.id, u.name, u.email, u.role),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_stats(stats: &AssistantStats) -> String {
    format!(
        "Knowledge base: {} entries ({} learned)\nUsers: {}\nDocuments: {}\nDiagnostics: {} ({} resolved)\nAccuracy: {}% ({} of {} analyses matched)",
        stats.matcher.knowledge_base_size,
        stats.learned_entries,
        stats.users,
        stats.documents,
        stats.diagnostics,
        stats.resolved_diagnostics,
        stats.matcher.accuracy_percentage,
        stats.matcher.successful_diagnostics,
        stats.matcher.total_diagnostics
    )
}
