use prettytable::{Cell, Row, Table};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::classifier::{
    ClassificationLabel, ClassifiedRecord, LABEL_NON_PUBLIC, LABEL_PUBLIC, LABEL_UNKNOWN,
};
use crate::error::Result;

pub const OUTPUT_HEADERS: [&str; 3] = ["ID", "Classificacao", "Rotulo"];

/// Write one `ID,Classificacao,Rotulo` row per record, in the given order.
pub fn write_results<W: Write>(writer: W, records: &[ClassifiedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(OUTPUT_HEADERS)?;

    for record in records {
        let code = record.outcome.code().to_string();
        writer.write_record([
            record.id.as_str(),
            code.as_str(),
            record.outcome.label_text(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_results_to_path(path: &Path, records: &[ClassifiedRecord]) -> Result<()> {
    let file = File::create(path)?;
    write_results(file, records)
}

/// Label counts for a classified batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub public: usize,
    pub non_public: usize,
    pub unknown: usize,
}

impl BatchSummary {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let mut summary = BatchSummary {
            total: records.len(),
            ..Default::default()
        };

        for record in records {
            match record.outcome.label() {
                Some(ClassificationLabel::Public) => summary.public += 1,
                Some(ClassificationLabel::NonPublic) => summary.non_public += 1,
                None => summary.unknown += 1,
            }
        }

        summary
    }

    /// Share of `count` in the batch, 0.0 for an empty batch.
    pub fn ratio(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64
        }
    }

    pub fn format_percentage(&self, count: usize) -> String {
        format!("{:.1}%", self.ratio(count) * 100.0)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Rótulo"),
            Cell::new("Registros"),
            Cell::new("%"),
        ]));

        table.add_row(Row::new(vec![
            Cell::new("Total"),
            Cell::new(&self.total.to_string()),
            Cell::new(""),
        ]));

        let mut rows = vec![(LABEL_PUBLIC, self.public), (LABEL_NON_PUBLIC, self.non_public)];
        if self.unknown > 0 {
            rows.push((LABEL_UNKNOWN, self.unknown));
        }

        for (label, count) in rows {
            table.add_row(Row::new(vec![
                Cell::new(label),
                Cell::new(&count.to_string()),
                Cell::new(&self.format_percentage(count)),
            ]));
        }

        table
    }
}
