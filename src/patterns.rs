//! Structured identifier detection.
//!
//! Each [`IdentifierKind`] owns one regular expression. A text is flagged as soon as any
//! expression matches anywhere inside it, so registry order only decides which kind gets
//! reported first, never whether the text is flagged.

use regex::Regex;
use std::fmt;
use tracing::{debug, trace};

use crate::error::{Result, TriageError};
use crate::TARGET_PATTERNS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Cpf,
    Email,
    Phone,
    RegistrationNumber,
    BarAssociationNumber,
    CompanyRegistrationNumber,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 6] = [
        IdentifierKind::Cpf,
        IdentifierKind::Email,
        IdentifierKind::Phone,
        IdentifierKind::RegistrationNumber,
        IdentifierKind::BarAssociationNumber,
        IdentifierKind::CompanyRegistrationNumber,
    ];

    /// Pattern used by the built-in Brazilian registry.
    pub fn default_pattern(&self) -> &'static str {
        match self {
            IdentifierKind::Cpf => r"\d{3}\.\d{3}\.\d{3}-\d{1,2}|\d{11}",
            IdentifierKind::Email => r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
            IdentifierKind::Phone => r"\(\d{2}\)\s?\d{4,5}-\d{4}|\d{2}\s\d{4,5}-?\d{4}",
            IdentifierKind::RegistrationNumber => {
                r"(?i:matr[ií]cula)[:\s]+[\d.-]+|\d{2}\.\d{3}-\d"
            }
            IdentifierKind::BarAssociationNumber => r"OAB[/-]?[A-Za-z]{2}[\s-]?\d{2,6}",
            IdentifierKind::CompanyRegistrationNumber => r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Cpf => write!(f, "CPF"),
            IdentifierKind::Email => write!(f, "E-mail"),
            IdentifierKind::Phone => write!(f, "Telefone"),
            IdentifierKind::RegistrationNumber => write!(f, "Matricula"),
            IdentifierKind::BarAssociationNumber => write!(f, "OAB"),
            IdentifierKind::CompanyRegistrationNumber => write!(f, "CNPJ"),
        }
    }
}

/// Ordered, compiled set of identifier patterns. Read-only once built.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<(IdentifierKind, Regex)>,
}

impl PatternRegistry {
    /// Compile the given `(kind, pattern)` pairs. A kind listed twice keeps its last pattern.
    pub fn new(definitions: &[(IdentifierKind, &str)]) -> Result<Self> {
        let mut patterns: Vec<(IdentifierKind, Regex)> = Vec::with_capacity(definitions.len());

        for (kind, pattern) in definitions {
            let regex = Regex::new(pattern).map_err(|source| TriageError::InvalidPattern {
                kind: *kind,
                source,
            })?;

            match patterns.iter_mut().find(|(existing, _)| existing == kind) {
                Some(slot) => slot.1 = regex,
                None => patterns.push((*kind, regex)),
            }
        }

        debug!(target: TARGET_PATTERNS, "Compiled {} identifier patterns", patterns.len());

        Ok(Self { patterns })
    }

    /// Registry covering every [`IdentifierKind`] with its default pattern.
    pub fn brazilian() -> Result<Self> {
        let definitions: Vec<(IdentifierKind, &str)> = IdentifierKind::ALL
            .iter()
            .map(|kind| (*kind, kind.default_pattern()))
            .collect();
        Self::new(&definitions)
    }

    pub fn kinds(&self) -> impl Iterator<Item = IdentifierKind> + '_ {
        self.patterns.iter().map(|(kind, _)| *kind)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First kind, in registry order, whose pattern occurs anywhere in `text`.
    pub fn find_match(&self, text: &str) -> Option<IdentifierKind> {
        let found = self
            .patterns
            .iter()
            .find(|(_, regex)| regex.is_match(text))
            .map(|(kind, _)| *kind);

        if let Some(kind) = found {
            trace!(target: TARGET_PATTERNS, "Structured identifier matched: {}", kind);
        }

        found
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.find_match(text).is_some()
    }

    /// Every kind whose pattern occurs in `text`, in registry order.
    pub fn matching_kinds(&self, text: &str) -> Vec<IdentifierKind> {
        self.patterns
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(kind, _)| *kind)
            .collect()
    }
}
