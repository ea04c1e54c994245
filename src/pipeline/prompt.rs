use crate::config::UNREADABLE_PLACEHOLDER;

/// Build the instruction sent with every package photo.
///
/// The reply format is a single JSON object with a `medications` array whose
/// entries use the keys read by `parse_extraction_response`.
pub fn build_extraction_prompt(max_detections: usize) -> String {
    format!(
        r#"Analyse cette image d'emballages pharmaceutiques et extrais les informations suivantes pour chaque médicament visible (au plus {max_detections}) :

1. Nom du médicament (avec dosage si visible)
2. Laboratoire pharmaceutique (fabricant)
3. Date de péremption (format DD/MM/YYYY)
4. Numéro de lot (cherche "LOT", "Lot", "BATCH", "N°" ou un code alphanumérique, ex: AB1234)
5. Nombre d'unités encore présentes (ignore les cases vides des plaquettes)

Pour chaque médicament, donne un score de confiance entre 0 et 1.

Retourne UNIQUEMENT un objet JSON valide, sans aucun texte autour, au format :
{{
    "medications": [
        {{
            "nom": "nom du médicament",
            "laboratoire": "nom du laboratoire",
            "date_peremption": "DD/MM/YYYY",
            "numero_lot": "numéro de lot",
            "nombre_unites": nombre_entier,
            "confiance": score_entre_0_et_1
        }}
    ]
}}

Si une information n'est pas lisible, mets "{UNREADABLE_PLACEHOLDER}" pour les textes et 0 pour les nombres."#
    )
}
