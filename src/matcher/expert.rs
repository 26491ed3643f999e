//! Keyword-table expert advice
//!
//! Used for problems the knowledge base does not recognise: the first
//! keyword found in the description picks a canned checklist.

struct Rule {
    keyword: &'static str,
    title: &'static str,
    checks: &'static [&'static str],
}

const RULES: &[Rule] = &[
    Rule {
        keyword: "bloque",
        title: "Ascenseur bloqué",
        checks: &[
            "Vérifier l'alimentation secteur",
            "Contrôler les limites de fin de course",
            "Inspecter le frein de sécurité",
            "Vérifier les capteurs de porte",
        ],
    },
    Rule {
        keyword: "porte",
        title: "Problème de porte",
        checks: &[
            "Nettoyer les rails de guidage",
            "Ajuster les capteurs de sécurité",
            "Vérifier le moteur d'entraînement",
            "Contrôler la temporisation",
        ],
    },
    Rule {
        keyword: "bruit",
        title: "Bruits anormaux",
        checks: &[
            "Serrer les fixations mécaniques",
            "Lubrifier les guides",
            "Vérifier les poulies et câbles",
            "Contrôler le groupe hydraulique",
        ],
    },
    Rule {
        keyword: "alarme",
        title: "Alarme active",
        checks: &[
            "Vérifier le bouton d'alarme",
            "Contrôler les capteurs de sécurité",
            "Tester la batterie de secours",
            "Inspecter le tableau de commande",
        ],
    },
];

const GENERAL_TITLE: &str = "Diagnostic général";

const GENERAL_CHECKS: &[&str] = &[
    "Vérifier l'alimentation électrique",
    "Contrôler le tableau de commande",
    "Inspecter les capteurs de sécurité",
    "Tester les fonctions de base",
    "Consulter le manuel technique spécifique",
];

/// Build the checklist and document recommendations for a problem
pub fn expert_advice(problem: &str, brand: Option<&str>) -> String {
    let lowered = problem.to_lowercase();
    let (title, checks) = RULES
        .iter()
        .find(|rule| lowered.contains(rule.keyword))
        .map(|rule| (rule.title, rule.checks))
        .unwrap_or((GENERAL_TITLE, GENERAL_CHECKS));

    let mut advice = format!("{} - {}", title, brand.unwrap_or("Marque"));
    for check in checks {
        advice.push_str("\n• ");
        advice.push_str(check);
    }

    advice.push_str("\n\nDocuments recommandés:");
    for doc in relevant_documents(problem, brand) {
        advice.push_str("\n• ");
        advice.push_str(&doc);
    }

    advice
}

/// Document titles worth opening for this problem
pub fn relevant_documents(problem: &str, brand: Option<&str>) -> Vec<String> {
    let lowered = problem.to_lowercase();
    let mut docs = Vec::new();

    if lowered.contains("electri") || lowered.contains("courant") {
        docs.push("Schéma électrique principal".to_string());
    }
    if lowered.contains("program") || lowered.contains("controle") {
        docs.push("Manuel de programmation".to_string());
    }
    if let Some(brand) = brand {
        docs.push(format!("Manuel technique {}", brand));
    }

    if docs.is_empty() {
        docs.push("Manuel d'entretien général".to_string());
    }
    docs
}
