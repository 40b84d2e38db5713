//! Command-line shell for the form filling engine.
//!
//! Usage:
//!   pdf-formfill schema form.pdf
//!   pdf-formfill fill form.pdf --values values.json --output filled.pdf
//!   pdf-formfill fill-names form.pdf --output names.pdf
//!   pdf-formfill preview form.pdf
//!
//! Set `RUST_LOG=debug` for pipeline logging.

use clap::{Parser, Subcommand};
use pdf_formfill::{
    DocumentSession, Error, FieldValues, FillConfig, FormSchema, LogObserver, Result,
    ValidationMode,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Prefix for generated artifact file names
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Directory for generated artifacts (defaults to the system temp dir)
    #[arg(long, global = true)]
    artifact_dir: Option<PathBuf>,

    /// Validation mode: none, relaxed or strict
    #[arg(long, global = true, default_value_t = ValidationMode::Relaxed)]
    validation: ValidationMode,

    /// Keep unreferenced objects instead of pruning them
    #[arg(long, global = true)]
    no_optimize: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the form schema as JSON
    Schema {
        /// Source PDF
        pdf: PathBuf,
    },
    /// Fill the form with values from a JSON file
    Fill {
        /// Source PDF
        pdf: PathBuf,
        /// Schema JSON (`{"textFields":[...]}`) or a flat `{"name":"value"}` object
        #[arg(short, long)]
        values: PathBuf,
        /// Where to write the filled PDF
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Fill every field with its own name
    FillNames {
        /// Source PDF
        pdf: PathBuf,
        /// Where to write the filled PDF
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the document as base64
    Preview {
        /// Source PDF
        pdf: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = FillConfig::new()
        .with_validation(args.validation)
        .with_optimize(!args.no_optimize);
    if let Some(prefix) = args.prefix {
        config = config.with_artifact_prefix(prefix);
    }
    if let Some(dir) = args.artifact_dir {
        config = config.with_artifact_dir(dir);
    }
    let session = DocumentSession::new(config).with_observer(LogObserver);

    match args.command {
        Command::Schema { pdf } => {
            session.select_source(&pdf)?;
            let schema = session.extract_schema()?;
            println!("{}", serde_json::to_string_pretty(&schema)?);
        },
        Command::Fill {
            pdf,
            values,
            output,
        } => {
            let values = read_values(&values)?;
            session.select_source(&pdf)?;
            session.submit_values(&values)?;
            session.export_current(&output)?;
            println!("Wrote {}", output.display());
        },
        Command::FillNames { pdf, output } => {
            session.select_source(&pdf)?;
            session.submit_field_name_fill()?;
            session.export_current(&output)?;
            println!("Wrote {}", output.display());
        },
        Command::Preview { pdf } => {
            session.select_source(&pdf)?;
            println!("{}", session.preview_content()?);
        },
    }
    Ok(())
}

/// Read submitted values from either JSON shape.
fn read_values(path: &Path) -> Result<FieldValues> {
    let bytes = fs::read(path).map_err(|source| Error::NotFound {
        path: path.to_path_buf(),
        source,
    })?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    if json.get("textFields").is_some() {
        let schema: FormSchema = serde_json::from_value(json)?;
        Ok(FieldValues::from_schema(&schema))
    } else {
        Ok(serde_json::from_value(json)?)
    }
}
