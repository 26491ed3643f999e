//! Problem matcher: scores descriptions against the knowledge base

use super::expert::expert_advice;
use super::knowledge::{KnowledgeEntry, seed_entries};
use super::tokenize::{jaccard, tokenize};
use crate::config::MatcherConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Steps proposed when nothing in the knowledge base matches
pub const FALLBACK_STEPS: &[&str] = &[
    "Documenter précisément le problème",
    "Prendre des photos du panneau de contrôle",
    "Vérifier les logs d'erreurs",
    "Contacter le support technique",
];

/// Result of analysing a problem description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Analysis {
    KnownProblem(KnownProblem),
    NewProblem(NewProblem),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownProblem {
    /// Match score of the selected entry
    pub confidence: f64,
    pub solution: String,
    pub recommended_steps: Vec<String>,
    /// Brand of the matched entry (may be "general")
    pub brand: String,
    pub similar_problems: Vec<SimilarProblem>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProblem {
    pub confidence: f64,
    pub recommended_steps: Vec<String>,
    /// Keyword-table advice to try while the problem is unknown
    pub suggested_solution: String,
    pub message: String,
    pub learning_opportunity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarProblem {
    pub problem: String,
    pub solution: String,
    pub score: f64,
}

impl Analysis {
    pub fn is_known(&self) -> bool {
        matches!(self, Analysis::KnownProblem(_))
    }

    pub fn confidence(&self) -> f64 {
        match self {
            Analysis::KnownProblem(known) => known.confidence,
            Analysis::NewProblem(new) => new.confidence,
        }
    }

    /// Solution text worth recording against a diagnostic
    pub fn solution(&self) -> &str {
        match self {
            Analysis::KnownProblem(known) => &known.solution,
            Analysis::NewProblem(new) => &new.suggested_solution,
        }
    }

    pub fn recommended_steps(&self) -> &[String] {
        match self {
            Analysis::KnownProblem(known) => &known.recommended_steps,
            Analysis::NewProblem(new) => &new.recommended_steps,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Analysis::KnownProblem(known) => &known.message,
            Analysis::NewProblem(new) => &new.message,
        }
    }
}

/// Running counters for the matcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatcherStats {
    pub total_diagnostics: u64,
    pub successful_diagnostics: u64,
    pub knowledge_base_size: usize,
    pub accuracy: f64,
    pub accuracy_percentage: u32,
}

/// Keyword-overlap matcher over an in-memory knowledge list
#[derive(Debug, Clone)]
pub struct ProblemMatcher {
    config: MatcherConfig,
    entries: Vec<KnowledgeEntry>,
    total_diagnostics: u64,
    successful_diagnostics: u64,
}

impl ProblemMatcher {
    pub fn new(config: MatcherConfig, entries: Vec<KnowledgeEntry>) -> Self {
        Self {
            config,
            entries,
            total_diagnostics: 0,
            successful_diagnostics: 0,
        }
    }

    /// Matcher over the built-in seed plus previously learned entries
    pub fn with_seed(config: MatcherConfig, learned: Vec<KnowledgeEntry>) -> Self {
        let mut entries = seed_entries();
        entries.extend(learned);
        tracing::debug!(entries = entries.len(), "Knowledge base loaded");
        Self::new(config, entries)
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    /// Restore counters from previously logged diagnostics
    pub fn set_history(&mut self, total: u64, successful: u64) {
        self.total_diagnostics = total;
        self.successful_diagnostics = successful.min(total);
    }

    fn tokens(&self, text: &str) -> HashSet<String> {
        tokenize(text, self.config.min_token_len)
    }

    /// Match a description against the knowledge base
    pub fn analyze(&mut self, problem: &str, brand: Option<&str>) -> Analysis {
        self.total_diagnostics += 1;

        let problem_tokens = self.tokens(problem);
        let mut best: Option<(usize, f64)> = None;

        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.applies_to(brand) {
                continue;
            }

            let score = jaccard(&problem_tokens, &self.tokens(&entry.problem));
            let beats_best = best.is_none_or(|(_, best_score)| score > best_score);
            if score > self.config.match_threshold && beats_best {
                best = Some((index, score));
            }
        }

        let Some((index, score)) = best else {
            tracing::info!(problem, brand, "No knowledge entry matched");
            return Analysis::NewProblem(NewProblem {
                confidence: self.config.fallback_confidence,
                recommended_steps: FALLBACK_STEPS.iter().map(|s| s.to_string()).collect(),
                suggested_solution: expert_advice(problem, brand),
                message: "Nouveau type de problème détecté - l'assistant apprendra de votre intervention"
                    .to_string(),
                learning_opportunity: true,
            });
        };

        self.successful_diagnostics += 1;
        let entry = &self.entries[index];
        tracing::info!(
            problem,
            matched = %entry.problem,
            score,
            "Knowledge entry matched"
        );

        Analysis::KnownProblem(KnownProblem {
            confidence: score,
            solution: entry.solution.clone(),
            recommended_steps: entry.steps.clone(),
            brand: entry.brand.clone(),
            similar_problems: self.similar_problems(&problem_tokens, Some(index)),
            message: format!(
                "Problème reconnu avec {}% de confiance",
                (score * 100.0).round() as u32
            ),
        })
    }

    /// Entries above the similarity threshold, best first, skipping `exclude`
    fn similar_problems(
        &self,
        problem_tokens: &HashSet<String>,
        exclude: Option<usize>,
    ) -> Vec<SimilarProblem> {
        let mut similar: Vec<SimilarProblem> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index) != exclude)
            .map(|(_, entry)| SimilarProblem {
                problem: entry.problem.clone(),
                solution: entry.solution.clone(),
                score: jaccard(problem_tokens, &self.tokens(&entry.problem)),
            })
            .filter(|candidate| candidate.score > self.config.similar_threshold)
            .collect();

        // Stable sort keeps knowledge-base order among equal scores
        similar.sort_by(|a, b| b.score.total_cmp(&a.score));
        similar.truncate(self.config.similar_limit);
        similar
    }

    /// Record a technician's resolution as a new knowledge entry
    ///
    /// `persist` sees the entry first; it is appended only once `persist`
    /// succeeds, so a failed save leaves the knowledge base untouched.
    pub fn learn<E, F>(
        &mut self,
        problem: &str,
        solution: &str,
        success: bool,
        brand: Option<&str>,
        persist: F,
    ) -> Result<KnowledgeEntry, E>
    where
        F: FnOnce(&KnowledgeEntry) -> Result<(), E>,
    {
        let entry = KnowledgeEntry::learned(problem, solution, success, brand);
        persist(&entry)?;

        tracing::info!(
            problem = %entry.problem,
            brand = %entry.brand,
            success,
            "Learned new knowledge entry"
        );

        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Substring search over problem and solution text
    pub fn search(&self, query: &str, brand: Option<&str>) -> Vec<&KnowledgeEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                let haystack = format!("{} {}", entry.problem, entry.solution).to_lowercase();
                haystack.contains(&query) && entry.applies_to(brand)
            })
            .collect()
    }

    pub fn stats(&self) -> MatcherStats {
        let accuracy = if self.total_diagnostics > 0 {
            self.successful_diagnostics as f64 / self.total_diagnostics as f64
        } else {
            0.0
        };

        MatcherStats {
            total_diagnostics: self.total_diagnostics,
            successful_diagnostics: self.successful_diagnostics,
            knowledge_base_size: self.entries.len(),
            accuracy,
            accuracy_percentage: (accuracy * 100.0).round() as u32,
        }
    }
}
