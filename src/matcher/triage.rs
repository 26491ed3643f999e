//! Local triage: entities, urgency and category from the raw description

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entity {
    Blocage,
    Bruit,
    Porte,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    SystemePortes,
    BlocageAscenseur,
    ProblemeMecanique,
    PanneElectrique,
    Autre,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triage {
    pub entities: Vec<Entity>,
    pub urgency: Urgency,
    pub category: Category,
}

const ENTITY_WORDS: &[(Entity, &[&str])] = &[
    (Entity::Blocage, &["bloqué", "arrêté", "immobile"]),
    (Entity::Bruit, &["bruit", "grincement", "vibration"]),
    (Entity::Porte, &["porte", "ouverture", "fermeture"]),
    (Entity::Position, &["étage", "niveau", "palier"]),
];

const URGENT_WORDS: &[&str] = &["bloqué", "urgence", "danger", "arrêt", "immobile"];

const CATEGORY_WORDS: &[(&str, Category)] = &[
    ("porte", Category::SystemePortes),
    ("bloqué", Category::BlocageAscenseur),
    ("bruit", Category::ProblemeMecanique),
    ("électrique", Category::PanneElectrique),
];

/// Classify a problem description
pub fn triage(text: &str) -> Triage {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();

    let entities = ENTITY_WORDS
        .iter()
        .filter(|(_, vocabulary)| words.iter().any(|w| vocabulary.contains(w)))
        .map(|(entity, _)| *entity)
        .collect();

    let urgency = if URGENT_WORDS.iter().any(|w| lowered.contains(w)) {
        Urgency::High
    } else {
        Urgency::Medium
    };

    let category = CATEGORY_WORDS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Autre);

    Triage {
        entities,
        urgency,
        category,
    }
}
