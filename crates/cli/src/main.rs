use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ingredex_core::{AliasTable, PipelineConfig};
use ingredex_ocr::{ExtractionPipeline, TesseractCommand, TextExtractor, TextPipeline};
use tracing_subscriber::EnvFilter;

mod output;

/// Extract a normalized ingredient list from a photo of a cosmetic label.
#[derive(Debug, Parser)]
#[command(name = "ingredex", version)]
struct Cli {
    /// Label image. With --from-text, a file holding already recognized text.
    input: PathBuf,

    /// Where to write the JSON result. Existing files are replaced.
    #[arg(short, long, default_value = "output/ingredients.json")]
    output: PathBuf,

    /// Pipeline configuration (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra alias tables (TOML), applied in order over the built-in one.
    #[arg(short, long = "aliases", value_name = "FILE")]
    aliases: Vec<PathBuf>,

    /// Start from an empty alias table instead of the built-in one.
    #[arg(long)]
    no_builtin_aliases: bool,

    /// Tesseract executable; overrides `ocr.executable` from the config.
    #[arg(long, value_name = "PATH")]
    tesseract: Option<PathBuf>,

    /// OCR backend.
    #[arg(long, value_enum, default_value_t = Engine::Command)]
    engine: Engine,

    /// Treat INPUT as recognized text and skip image processing and OCR.
    #[arg(long)]
    from_text: bool,

    /// Do not print the ingredient summary.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Run the tesseract executable.
    Command,
    /// Link libtesseract in-process (requires the `tesseract` feature).
    Library,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let aliases = Arc::new(load_aliases(&cli)?);
    tracing::debug!(entries = aliases.len(), "Alias table loaded");

    let result = if cli.from_text {
        let text = std::fs::read_to_string(&cli.input)
            .with_context(|| format!("Failed to read text file {}", cli.input.display()))?;
        TextPipeline::new(aliases, &config).run(text)
    } else {
        let pipeline = ExtractionPipeline::new(build_extractor(&cli, &config)?, aliases, &config);
        pipeline
            .run(&cli.input)
            .with_context(|| format!("Failed to extract ingredients from {}", cli.input.display()))?
    };

    output::save_output(&result, &cli.output)?;
    if !cli.quiet {
        output::write_summary(&result, &mut std::io::stdout().lock())?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(exe) = &cli.tesseract {
        config.ocr.executable = exe.clone();
    }
    Ok(config)
}

fn load_aliases(cli: &Cli) -> Result<AliasTable> {
    let mut table = if cli.no_builtin_aliases {
        AliasTable::new()
    } else {
        AliasTable::builtin().context("Built-in alias table is malformed")?
    };
    for path in &cli.aliases {
        let extra = AliasTable::load(path)
            .with_context(|| format!("Failed to load alias table {}", path.display()))?;
        tracing::info!(entries = extra.len(), "Loaded aliases from {}", path.display());
        table.extend(extra);
    }
    Ok(table)
}

fn build_extractor(cli: &Cli, config: &PipelineConfig) -> Result<Box<dyn TextExtractor>> {
    match cli.engine {
        Engine::Command => Ok(Box::new(TesseractCommand::new(&config.ocr))),
        #[cfg(feature = "tesseract")]
        Engine::Library => Ok(Box::new(ingredex_ocr::TesseractRecognizer::new(&config.ocr))),
        #[cfg(not(feature = "tesseract"))]
        Engine::Library => {
            anyhow::bail!("--engine library needs a build with the `tesseract` feature")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["ingredex", "label.jpg"]);
        assert_eq!(cli.input, PathBuf::from("label.jpg"));
        assert_eq!(cli.output, PathBuf::from("output/ingredients.json"));
        assert_eq!(cli.engine, Engine::Command);
        assert!(cli.aliases.is_empty());
        assert!(!cli.from_text);
    }

    #[test]
    fn tesseract_flag_overrides_config() {
        let cli = Cli::parse_from(["ingredex", "label.jpg", "--tesseract", "/opt/bin/tesseract"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.ocr.executable, PathBuf::from("/opt/bin/tesseract"));
    }

    #[test]
    fn alias_files_layer_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.toml");
        std::fs::write(&path, "\"aqua\" = \"Eau\"\n\"shea\" = \"Shea Butter\"\n").unwrap();

        let cli = Cli::parse_from([
            "ingredex",
            "label.jpg",
            "--aliases",
            path.to_str().unwrap(),
        ]);
        let table = load_aliases(&cli).unwrap();
        assert_eq!(table.get("aqua"), Some("Eau"));
        assert_eq!(table.get("shea"), Some("Shea Butter"));
        assert_eq!(table.get("parfum"), Some("Fragrance"));
    }

    #[test]
    fn no_builtin_aliases_starts_empty() {
        let cli = Cli::parse_from(["ingredex", "label.jpg", "--no-builtin-aliases"]);
        assert!(load_aliases(&cli).unwrap().is_empty());
    }

    #[test]
    fn bad_config_path_is_reported() {
        let cli = Cli::parse_from(["ingredex", "label.jpg", "-c", "/nonexistent/ingredex.toml"]);
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/ingredex.toml"));
    }
}
