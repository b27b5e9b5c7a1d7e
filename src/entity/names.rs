//! Person-name extraction on top of the entity recognizer.
//!
//! Raw person hits are noisy on government correspondence: agency acronyms, greetings,
//! legal boilerplate and lab parameters are routinely tagged as people. Each hit is checked
//! against two substring denylists and a minimum token count before it counts as a name.
//! Matching is plain substring containment on the lowercased, trimmed span, so `"der"`
//! also rejects `"Anderson Souza"`.

use std::sync::Arc;
use tracing::{debug, trace};

use super::recognizer::{EntityRecognizer, RecognizerError};
use super::TARGET_ENTITY;

/// Agencies, salutations and technical/legal phrases tagged as persons by mistake.
pub const FALSE_POSITIVE_PHRASES: &[&str] = &[
    "caesb",
    "detran",
    "tcb",
    "der",
    "seduh",
    "seec",
    "pmdf",
    "cbmdf",
    "sicoob",
    "terracap",
    "adasa",
    "cgdf",
    "gdf",
    "setor público",
    "sociedade de transportes coletivos de brasília",
    "controladora-geral",
    "distrito federal",
    // Salutations and forms of address
    "vossa senhoria",
    "vossas senhorias",
    "excelência",
    "encaminho",
    "certidão",
    "ônus",
    "atenciosamente",
    "cordialmente",
    "prezados",
    "prezado",
    "prezada",
    "ilustríssimo",
    "ilustrissimo",
    // Technical and legal terms
    "gestão de integridade",
    "gestão de",
    "governança de tic",
    "administração de banco de dados",
    "letramento digital",
    "superior a15",
    "inciso xxxiii",
    "inciso ii",
    "inciso xv",
    "advogados associados",
    "setor público",
    "lei maria da penha",
    "moro de aluguel",
    // Water quality parameters
    "coliformes termotolerantes",
    "fósforo total",
    "nitrogênio amoniacal",
    "nitrogênio total",
    "oxigênio dissolvido",
    "sólidos totais",
    "letramento digital",
];

/// Single words that never appear in a real person's name in this corpus.
pub const INVALID_TOKENS: &[&str] = &[
    "ltda",
    "associados",
    "advogados",
    "inciso",
    "gestão",
    "administração",
    "setor",
    "lei",
    "sociedade",
    "coliformes",
    "fósforo",
    "nitrogênio",
    "oxigênio",
    "sólidos",
    "moro",
];

const MIN_NAME_TOKENS: usize = 2;

/// Why a person hit was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    FalsePositivePhrase(String),
    TooFewTokens(usize),
    InvalidToken(String),
}

#[derive(Debug, Clone)]
pub struct Denylists {
    false_positive_phrases: Vec<String>,
    invalid_tokens: Vec<String>,
}

impl Default for Denylists {
    fn default() -> Self {
        Self {
            false_positive_phrases: FALSE_POSITIVE_PHRASES.iter().map(|s| s.to_string()).collect(),
            invalid_tokens: INVALID_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Denylists {
    /// Append phrases; entries are trimmed and lowercased, blanks are ignored.
    pub fn with_extra_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.false_positive_phrases.extend(clean_entries(phrases));
        self
    }

    /// Append invalid tokens; entries are trimmed and lowercased, blanks are ignored.
    pub fn with_extra_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.invalid_tokens.extend(clean_entries(tokens));
        self
    }

    pub fn false_positive_phrases(&self) -> &[String] {
        &self.false_positive_phrases
    }

    pub fn invalid_tokens(&self) -> &[String] {
        &self.invalid_tokens
    }

    /// Check a person span, returning the first rule it breaks.
    pub fn check(&self, span: &str) -> Option<Rejection> {
        let lowered = span.to_lowercase();
        let lowered = lowered.trim();

        if let Some(phrase) = self
            .false_positive_phrases
            .iter()
            .find(|phrase| lowered.contains(phrase.as_str()))
        {
            return Some(Rejection::FalsePositivePhrase(phrase.clone()));
        }

        let token_count = span.split_whitespace().count();
        if token_count < MIN_NAME_TOKENS {
            return Some(Rejection::TooFewTokens(token_count));
        }

        self.invalid_tokens
            .iter()
            .find(|token| lowered.contains(token.as_str()))
            .map(|token| Rejection::InvalidToken(token.clone()))
    }

    pub fn is_plausible_name(&self, span: &str) -> bool {
        self.check(span).is_none()
    }
}

fn clean_entries<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .map(|entry| entry.as_ref().trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Extracts plausible person names from free text.
#[derive(Clone)]
pub struct PersonNameExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    denylists: Denylists,
}

impl PersonNameExtractor {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self::with_denylists(recognizer, Denylists::default())
    }

    pub fn with_denylists(recognizer: Arc<dyn EntityRecognizer>, denylists: Denylists) -> Self {
        Self {
            recognizer,
            denylists,
        }
    }

    pub fn denylists(&self) -> &Denylists {
        &self.denylists
    }

    /// Person spans surviving every filter, in recognizer order, duplicates kept.
    pub async fn extract_person_names(&self, text: &str) -> Result<Vec<String>, RecognizerError> {
        let hits = self.recognizer.recognize(text).await?;

        let mut names = Vec::new();
        for hit in hits.into_iter().filter(|hit| hit.is_person()) {
            match self.denylists.check(&hit.text) {
                None => {
                    trace!(target: TARGET_ENTITY, "Accepted person name: {}", hit.text);
                    names.push(hit.text);
                }
                Some(rejection) => {
                    trace!(target: TARGET_ENTITY, "Rejected person hit {}: {:?}", hit.text, rejection);
                }
            }
        }

        debug!(
            target: TARGET_ENTITY,
            "{} person names survived filtering via {}",
            names.len(),
            self.recognizer.name()
        );

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::recognizer::StaticRecognizer;
    use crate::entity::types::{EntityHit, EntityType};

    fn extractor(text: &str, hits: Vec<EntityHit>) -> PersonNameExtractor {
        PersonNameExtractor::new(Arc::new(StaticRecognizer::new().with_response(text, hits)))
    }

    #[test]
    fn test_single_token_rejected() {
        let denylists = Denylists::default();
        assert_eq!(denylists.check("Brasília"), Some(Rejection::TooFewTokens(1)));
        assert_eq!(denylists.check("   "), Some(Rejection::TooFewTokens(0)));
    }

    #[test]
    fn test_false_positive_phrases() {
        let denylists = Denylists::default();
        // "federal" already contains "der", which is listed first.
        assert_eq!(
            denylists.check("Distrito Federal"),
            Some(Rejection::FalsePositivePhrase("der".to_string()))
        );
        assert!(!Denylists {
            false_positive_phrases: vec!["distrito federal".to_string()],
            invalid_tokens: Vec::new(),
        }
        .is_plausible_name("Distrito Federal"));
        assert!(!denylists.is_plausible_name("Prezado Carlos Andrade"));
        assert!(!denylists.is_plausible_name("Vossa Senhoria"));
        assert!(!denylists.is_plausible_name("  GDF Saúde  "));
    }

    #[test]
    fn test_phrase_checked_before_token_count() {
        let denylists = Denylists::default();
        assert_eq!(
            denylists.check("GDF"),
            Some(Rejection::FalsePositivePhrase("gdf".to_string()))
        );
    }

    #[test]
    fn test_invalid_tokens() {
        let denylists = Denylists::default();
        assert_eq!(
            denylists.check("Silva Advogados"),
            Some(Rejection::InvalidToken("advogados".to_string()))
        );
        assert!(!denylists.is_plausible_name("Comercial Souza LTDA"));
    }

    #[test]
    fn test_substring_semantics_are_preserved() {
        let denylists = Denylists::default();
        // "der" and "lei" match inside ordinary names.
        assert_eq!(
            denylists.check("Anderson Souza"),
            Some(Rejection::FalsePositivePhrase("der".to_string()))
        );
        assert_eq!(
            denylists.check("Leila Costa"),
            Some(Rejection::InvalidToken("lei".to_string()))
        );
    }

    #[test]
    fn test_plausible_names() {
        let denylists = Denylists::default();
        assert!(denylists.is_plausible_name("João da Silva"));
        assert!(denylists.is_plausible_name("Maria Souza"));
        assert!(denylists.is_plausible_name("  Ana   Paula  "));
    }

    #[test]
    fn test_extra_entries_are_normalized() {
        let denylists = Denylists::default()
            .with_extra_phrases(["  Novacap ", ""])
            .with_extra_tokens(vec!["EIRELI".to_string()]);
        assert!(denylists.false_positive_phrases().contains(&"novacap".to_string()));
        assert!(!denylists.false_positive_phrases().contains(&String::new()));
        assert!(!denylists.is_plausible_name("Novacap Obras"));
        assert!(!denylists.is_plausible_name("Pedro Lima Eireli"));
        assert!(denylists.false_positive_phrases().len() > FALSE_POSITIVE_PHRASES.len());
        assert_eq!(denylists.invalid_tokens().len(), INVALID_TOKENS.len() + 1);
    }

    #[tokio::test]
    async fn test_extract_keeps_order_duplicates_and_original_case() {
        let text = "Maria Souza e João da Silva, de novo Maria Souza";
        let extractor = extractor(
            text,
            vec![
                EntityHit::person("Maria Souza"),
                EntityHit::person("João da Silva"),
                EntityHit::person("Maria Souza"),
            ],
        );

        let names = extractor.extract_person_names(text).await.unwrap();
        assert_eq!(names, vec!["Maria Souza", "João da Silva", "Maria Souza"]);
    }

    #[tokio::test]
    async fn test_extract_ignores_non_person_hits() {
        let text = "Secretaria de Estado de Saúde em Brasília";
        let extractor = extractor(
            text,
            vec![
                EntityHit::new("Secretaria de Estado de Saúde", EntityType::Organization),
                EntityHit::new("Região Administrativa", EntityType::Location),
            ],
        );

        assert!(extractor.extract_person_names(text).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_filters_noise() {
        let text = "GDF - Secretaria de Estado de Saúde, Distrito Federal, Brasília";
        let extractor = extractor(
            text,
            vec![
                EntityHit::person("GDF"),
                EntityHit::person("Distrito Federal"),
                EntityHit::person("Brasília"),
            ],
        );

        assert!(extractor.extract_person_names(text).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_extract_propagates_recognizer_failure() {
        let recognizer = StaticRecognizer::new().with_failure("texto", "modelo fora do ar");
        let extractor = PersonNameExtractor::new(Arc::new(recognizer));

        assert!(matches!(
            extractor.extract_person_names("texto").await,
            Err(RecognizerError::Unavailable(_))
        ));
    }
}
