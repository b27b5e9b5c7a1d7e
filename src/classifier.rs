//! Binary personal-data classification of free-text records.
//!
//! A record is `NonPublic` when a structured identifier occurs in it or when at least one
//! plausible person name is extracted from it. Patterns are checked first and the
//! recognizer is only consulted when none matched; the label equals the OR of both signals.

use futures::stream::{self, StreamExt};
use std::fmt;
use tracing::{debug, info, warn};

use crate::dataset::{Dataset, Record};
use crate::entity::{PersonNameExtractor, RecognizerError};
use crate::error::Result;
use crate::patterns::PatternRegistry;
use crate::TARGET_CLASSIFIER;

pub const LABEL_PUBLIC: &str = "Público";
pub const LABEL_NON_PUBLIC: &str = "Não Público";
pub const LABEL_UNKNOWN: &str = "Indeterminado";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassificationLabel {
    Public,
    NonPublic,
}

impl ClassificationLabel {
    /// 1 for records containing personal data, 0 otherwise.
    pub fn code(&self) -> u8 {
        match self {
            ClassificationLabel::Public => 0,
            ClassificationLabel::NonPublic => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClassificationLabel::Public => LABEL_PUBLIC,
            ClassificationLabel::NonPublic => LABEL_NON_PUBLIC,
        }
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result for one record of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Classified(ClassificationLabel),
    /// The recognizer failed and no structured identifier was found.
    Unknown { reason: String },
}

impl RecordOutcome {
    pub fn label(&self) -> Option<ClassificationLabel> {
        match self {
            RecordOutcome::Classified(label) => Some(*label),
            RecordOutcome::Unknown { .. } => None,
        }
    }

    /// Reported code; undecided records are reported as 1 so they get redacted.
    pub fn code(&self) -> u8 {
        match self {
            RecordOutcome::Classified(label) => label.code(),
            RecordOutcome::Unknown { .. } => ClassificationLabel::NonPublic.code(),
        }
    }

    pub fn label_text(&self) -> &'static str {
        match self {
            RecordOutcome::Classified(label) => label.label(),
            RecordOutcome::Unknown { .. } => LABEL_UNKNOWN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, RecordOutcome::Unknown { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub id: String,
    pub outcome: RecordOutcome,
}

pub struct Classifier {
    patterns: PatternRegistry,
    names: PersonNameExtractor,
    concurrency: usize,
}

impl Classifier {
    pub fn new(patterns: PatternRegistry, names: PersonNameExtractor) -> Self {
        Self {
            patterns,
            names,
            concurrency: 1,
        }
    }

    /// Number of records classified at the same time within a batch (minimum 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn classify(
        &self,
        text: &str,
    ) -> std::result::Result<ClassificationLabel, RecognizerError> {
        if let Some(kind) = self.patterns.find_match(text) {
            debug!(target: TARGET_CLASSIFIER, "Structured identifier {} found", kind);
            return Ok(ClassificationLabel::NonPublic);
        }

        let names = self.names.extract_person_names(text).await?;
        if names.is_empty() {
            Ok(ClassificationLabel::Public)
        } else {
            debug!(target: TARGET_CLASSIFIER, "{} person names found", names.len());
            Ok(ClassificationLabel::NonPublic)
        }
    }

    pub async fn classify_record(&self, record: Record<'_>) -> ClassifiedRecord {
        let outcome = match self.classify(record.text).await {
            Ok(label) => RecordOutcome::Classified(label),
            Err(e) => {
                warn!(target: TARGET_CLASSIFIER, "Record {} left undecided: {}", record.id, e);
                RecordOutcome::Unknown {
                    reason: e.to_string(),
                }
            }
        };

        ClassifiedRecord {
            id: record.id.to_string(),
            outcome,
        }
    }

    /// Classify records in input order. Recognizer failures mark a record `Unknown` and do
    /// not abort the batch.
    pub async fn classify_records(&self, records: Vec<Record<'_>>) -> Vec<ClassifiedRecord> {
        info!(
            target: TARGET_CLASSIFIER,
            "Classifying {} records (concurrency {})",
            records.len(),
            self.concurrency
        );

        let results: Vec<ClassifiedRecord> = stream::iter(records)
            .map(|record| self.classify_record(record))
            .buffered(self.concurrency)
            .collect()
            .await;

        let non_public = results
            .iter()
            .filter(|r| r.outcome.label() == Some(ClassificationLabel::NonPublic))
            .count();
        let unknown = results.iter().filter(|r| r.outcome.is_unknown()).count();
        info!(
            target: TARGET_CLASSIFIER,
            "Classified {} records: {} non-public, {} undecided",
            results.len(),
            non_public,
            unknown
        );

        results
    }

    /// Classify every row of `dataset`. Both fields are validated before any row is processed.
    pub async fn classify_batch(
        &self,
        dataset: &Dataset,
        text_field: &str,
        id_field: &str,
    ) -> Result<Vec<ClassifiedRecord>> {
        let records = dataset.records(text_field, id_field)?;
        Ok(self.classify_records(records).await)
    }
}
