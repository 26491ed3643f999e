//! Photo analysis
//!
//! There is no image model: a captured frame is checked for readability,
//! then one of a few canned analyses is returned and the frame is dropped.

use super::error::AssistError;
use rand::Rng;
use std::path::Path;

const PHOTO_ANALYSES: &[&str] = &[
    "Analyse photo terminée\n• Composants électriques détectés\n• Câblage apparemment correct\n• Vérifier les connexions marquées en rouge",
    "Analyse schéma\n• Schéma technique identifié\n• Points de test recommandés\n• Vérifier les relais K5 et K6",
    "Analyse mécanique\n• Usure normale détectée\n• Vérifier la tension des câbles\n• Contrôler l'alignement des guides",
];

/// Read a captured frame, refusing missing or empty files
pub async fn read_frame(path: &Path) -> Result<Vec<u8>, AssistError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| AssistError::Photo {
            path: path.to_path_buf(),
            source,
        })?;

    if bytes.is_empty() {
        return Err(AssistError::EmptyPhoto(path.to_path_buf()));
    }
    Ok(bytes)
}

pub fn pick_analysis() -> &'static str {
    let index = rand::rng().random_range(0..PHOTO_ANALYSES.len());
    PHOTO_ANALYSES[index]
}
