use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use pii_triage::dataset::Dataset;
use pii_triage::entity::{OllamaRecognizer, PersonNameExtractor};
use pii_triage::environment::{
    denylists_from_env, get_env_var_or, recognizer_config_from_env, CONCURRENCY_ENV,
    ID_COLUMN_ENV, OUTPUT_ENV, TEXT_COLUMN_ENV,
};
use pii_triage::logging::configure_logging;
use pii_triage::patterns::PatternRegistry;
use pii_triage::report::{write_results_to_path, BatchSummary};
use pii_triage::{Classifier, DEFAULT_ID_FIELD, DEFAULT_OUTPUT_FILE, DEFAULT_TEXT_FIELD};

/// Flag information-access requests that contain personal data.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input table (.xlsx, .xls, .ods, .csv, .tsv or .txt) with one request per row
    input: Option<PathBuf>,

    /// Column holding the request text
    #[arg(long)]
    text_column: Option<String>,

    /// Column holding the request identifier
    #[arg(long)]
    id_column: Option<String>,

    /// Where to write the ID,Classificacao,Rotulo table
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Field delimiter for text tables; detected from the header line when omitted
    #[arg(short, long)]
    delimiter: Option<char>,

    /// Records classified at the same time
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Ollama host, e.g. http://localhost
    #[arg(long)]
    ollama_host: Option<String>,

    /// Ollama port
    #[arg(long)]
    ollama_port: Option<u16>,

    /// Entity recognition model served by Ollama
    #[arg(short, long)]
    model: Option<String>,

    /// Per-request recognizer timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn print_usage() {
    println!("Uso: pii-triage <arquivo.xlsx> [--text-column <coluna>] [--id-column <coluna>]");
    println!("Execute 'pii-triage --help' para todas as opções.");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(input) = cli.input.clone() else {
        print_usage();
        return Ok(());
    };

    configure_logging();

    let text_column = cli
        .text_column
        .clone()
        .unwrap_or_else(|| get_env_var_or(TEXT_COLUMN_ENV, DEFAULT_TEXT_FIELD.to_string()));
    let id_column = cli
        .id_column
        .clone()
        .unwrap_or_else(|| get_env_var_or(ID_COLUMN_ENV, DEFAULT_ID_FIELD.to_string()));
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| get_env_var_or(OUTPUT_ENV, PathBuf::from(DEFAULT_OUTPUT_FILE)));
    let concurrency = cli
        .concurrency
        .unwrap_or_else(|| get_env_var_or(CONCURRENCY_ENV, 1));
    let delimiter = match cli.delimiter {
        Some(c) => match u8::try_from(c) {
            Ok(byte) => Some(byte),
            Err(_) => bail!("Delimiter must be a single ASCII character, got '{}'", c),
        },
        None => None,
    };

    println!("Processando: {}", input.display());

    let dataset = Dataset::from_path(&input, delimiter)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    // Fail on a wrong column before paying for the model connection.
    dataset.column_index(&text_column)?;
    dataset.column_index(&id_column)?;

    let patterns = PatternRegistry::brazilian()?;

    let mut recognizer_config = recognizer_config_from_env();
    if let Some(host) = cli.ollama_host {
        recognizer_config.host = host;
    }
    if let Some(port) = cli.ollama_port {
        recognizer_config.port = port;
    }
    if let Some(model) = cli.model {
        recognizer_config.model = model;
    }
    if let Some(secs) = cli.timeout_secs {
        recognizer_config.timeout = Duration::from_secs(secs);
    }

    let recognizer = OllamaRecognizer::connect(recognizer_config)
        .await
        .context("Failed to initialize the entity recognizer")?;
    let names = PersonNameExtractor::with_denylists(Arc::new(recognizer), denylists_from_env());
    let classifier = Classifier::new(patterns, names).with_concurrency(concurrency);

    let results = classifier
        .classify_batch(&dataset, &text_column, &id_column)
        .await?;

    write_results_to_path(&output, &results)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Resultado salvo em: {}", output.display());
    info!("Wrote {} classified records to {}", results.len(), output.display());

    let summary = BatchSummary::from_records(&results);
    println!();
    summary.to_table().printstd();

    if summary.unknown > 0 {
        println!(
            "{}",
            format!(
                "{} registros ficaram indeterminados (falha no reconhecimento de entidades) e foram marcados como Não Público.",
                summary.unknown
            )
            .bright_yellow()
        );
    }

    Ok(())
}
