//! Problem matching - knowledge base lookup, expert advice and triage

mod engine;
mod expert;
mod knowledge;
mod tokenize;
mod triage;

pub use engine::{Analysis, MatcherStats, ProblemMatcher};
pub use knowledge::{KNOWN_BRANDS, KnowledgeEntry};
pub use triage::{Triage, triage};
