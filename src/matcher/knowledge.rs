//! Knowledge base entries and the built-in seed list

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Brand value meaning "applies to every manufacturer"
pub const GENERAL_BRAND: &str = "general";

/// Manufacturers offered by the diagnostic screen
pub const KNOWN_BRANDS: &[&str] = &["Kone", "Thyssen", "Otis", "Schindler"];

const LEARNED_CONFIDENCE_SUCCESS: f64 = 0.9;
const LEARNED_CONFIDENCE_FAILURE: f64 = 0.6;

/// Learned steps shorter than this are dropped
const MIN_STEP_LEN: usize = 10;

/// One stored problem/solution pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub problem: String,
    pub solution: String,
    pub brand: String,
    pub confidence: f64,
    #[serde(default)]
    pub steps: Vec<String>,

    /// Set on entries recorded from a technician's intervention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learned_at: Option<DateTime<Utc>>,

    /// Whether the learned intervention succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl KnowledgeEntry {
    /// True when the entry may be proposed for `brand`
    ///
    /// Without a brand filter every entry applies.
    pub fn applies_to(&self, brand: Option<&str>) -> bool {
        match brand {
            None => true,
            Some(wanted) => self.brand == GENERAL_BRAND || self.brand == wanted,
        }
    }

    /// Entry recorded from a technician's intervention
    ///
    /// The problem is lowercased, a missing brand becomes "general" and the
    /// solution is split into steps on sentence boundaries.
    pub fn learned(problem: &str, solution: &str, success: bool, brand: Option<&str>) -> Self {
        Self {
            problem: problem.to_lowercase(),
            solution: solution.to_string(),
            brand: brand.unwrap_or(GENERAL_BRAND).to_string(),
            confidence: if success {
                LEARNED_CONFIDENCE_SUCCESS
            } else {
                LEARNED_CONFIDENCE_FAILURE
            },
            steps: split_steps(solution),
            learned_at: Some(Utc::now()),
            success: Some(success),
        }
    }
}

fn split_steps(solution: &str) -> Vec<String> {
    solution
        .split(". ")
        .filter(|step| step.chars().count() > MIN_STEP_LEN)
        .map(str::to_string)
        .collect()
}

fn seed(problem: &str, solution: &str, brand: &str, confidence: f64, steps: &[&str]) -> KnowledgeEntry {
    KnowledgeEntry {
        problem: problem.to_string(),
        solution: solution.to_string(),
        brand: brand.to_string(),
        confidence,
        steps: steps.iter().map(|s| s.to_string()).collect(),
        learned_at: None,
        success: None,
    }
}

/// The literal knowledge the matcher starts with
pub fn seed_entries() -> Vec<KnowledgeEntry> {
    vec![
        seed(
            "ascenseur bloqué entre deux étages",
            "Vérifier le système de sécurité et le limiteur de vitesse",
            GENERAL_BRAND,
            0.9,
            &[
                "Couper l'alimentation générale",
                "Vérifier les capteurs de position",
                "Contrôler le câblage du limiteur de vitesse",
                "Redémarrer le système",
            ],
        ),
        seed(
            "portes qui ne se ferment pas",
            "Nettoyer et ajuster les capteurs de porte",
            "Kone",
            0.85,
            &[
                "Nettoyer les cellules photoélectriques",
                "Vérifier l'alignement des portes",
                "Contrôler les fins de course",
                "Ajuster la temporisation de fermeture",
            ],
        ),
        seed(
            "bruits anormaux en fonctionnement",
            "Vérifier les roulements et guidages",
            "Thyssen",
            0.8,
            &[
                "Inspecter les roulements du moteur",
                "Vérifier l'état des guides",
                "Contrôler la tension des câbles",
                "Lubrifier les parties mécaniques",
            ],
        ),
        seed(
            "porte qui ne se ferme pas",
            "Nettoyer les rails et contrôler l'entraînement de porte",
            GENERAL_BRAND,
            0.75,
            &[
                "Nettoyer les rails de guidage",
                "Ajuster les capteurs de sécurité",
                "Vérifier le moteur d'entraînement",
                "Contrôler la temporisation",
            ],
        ),
        seed(
            "alarme active en cabine",
            "Contrôler la chaîne d'alarme et la batterie de secours",
            GENERAL_BRAND,
            0.7,
            &[
                "Vérifier le bouton d'alarme",
                "Contrôler les capteurs de sécurité",
                "Tester la batterie de secours",
                "Inspecter le tableau de commande",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_well_formed() {
        let entries = seed_entries();
        assert_eq!(entries.len(), 5);
        for entry in &entries {
            assert!((0.0..=1.0).contains(&entry.confidence));
            assert!(!entry.steps.is_empty());
            assert!(entry.learned_at.is_none());
        }
    }

    #[test]
    fn test_applies_to() {
        let entries = seed_entries();
        let kone = &entries[1];
        let general = &entries[0];

        assert!(kone.applies_to(None));
        assert!(kone.applies_to(Some("Kone")));
        assert!(!kone.applies_to(Some("Otis")));
        assert!(general.applies_to(Some("Otis")));
    }

    #[test]
    fn test_learned_entry() {
        let learned = KnowledgeEntry::learned(
            "Moteur de Porte HS",
            "Remplacer le moteur de porte. Régler la vitesse de fermeture. Ok",
            true,
            Some("Otis"),
        );

        assert_eq!(learned.problem, "moteur de porte hs");
        assert_eq!(learned.brand, "Otis");
        assert_eq!(learned.confidence, 0.9);
        assert_eq!(
            learned.steps,
            vec![
                "Remplacer le moteur de porte".to_string(),
                "Régler la vitesse de fermeture".to_string(),
            ]
        );
        assert_eq!(learned.success, Some(true));
        assert!(learned.learned_at.is_some());

        let failed = KnowledgeEntry::learned("x", "short", false, None);
        assert_eq!(failed.confidence, 0.6);
        assert_eq!(failed.brand, GENERAL_BRAND);
        assert!(failed.steps.is_empty());
    }

    #[test]
    fn test_legacy_record_without_learning_fields() {
        let json = r#"{"problem":"p","solution":"s","brand":"general","confidence":0.5}"#;
        let entry: KnowledgeEntry = serde_json::from_str(json).unwrap();
        assert!(entry.steps.is_empty());
        assert!(entry.learned_at.is_none());
    }
}
