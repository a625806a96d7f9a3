// Prompt templates. The wording is part of the output contract: replies are
// inserted into bulletins verbatim.

pub const POSITIVE_CLASS: &str = "positif";
pub const NEGATIVE_CLASS: &str = "negatif";

/// Longest general comment the bulletin form accepts.
pub const GENERAL_COMMENT_MAX_CHARS: usize = 255;

const HIGHLIGHT_INSTRUCTIONS: &str = "Tu es un expert en analyse de commentaires pédagogiques.
Ta tâche est d'ajouter des balises HTML pour mettre en évidence les aspects positifs et négatifs.

Règles:
- Entoure les phrases/expressions POSITIVES avec <span class=\"positif\">texte</span>
- Entoure les phrases/expressions NÉGATIVES avec <span class=\"negatif\">texte</span>
- Ne modifie PAS le contenu du texte, ajoute seulement les balises
- Garde la ponctuation et la structure originale
- Ne balise que les parties vraiment positives ou négatives, pas les neutres

IMPORTANT: Réponds UNIQUEMENT par le texte traité avec les balises HTML, sans aucune explication, préambule ou formatage supplémentaire. Le texte sera inséré tel quel dans l'application.

Texte à traiter:
";

pub fn highlight_prompt(comment: &str) -> String {
    format!("{HIGHLIGHT_INSTRUCTIONS}{comment}")
}

pub fn general_comment_prompt<'a, I>(comments: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let listing = comments
        .into_iter()
        .map(|(subject, comment)| format!("- {subject}: {comment}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Tu es un professeur principal rédigeant l'appréciation générale pour un conseil de classe.

À partir des appréciations suivantes par matière, rédige une appréciation générale synthétique:

{listing}

Consignes:
- Style formel de conseil de classe
- Maximum {GENERAL_COMMENT_MAX_CHARS} caractères
- Synthèse globale des points forts et axes de progrès
- Encouragements constructifs
- Évite les répétitions
- Ton bienveillant mais objectif

IMPORTANT: Réponds UNIQUEMENT par l'appréciation générale rédigée, sans titre, préambule, explication ou formatage supplémentaire. Le texte sera inséré tel quel dans le bulletin.

Appréciation générale:"
    )
}

/// Minimal request used by the connection test.
pub const CONNECTION_TEST_PROMPT: &str = "Test";
