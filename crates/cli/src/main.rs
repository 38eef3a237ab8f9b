//! oas-refs CLI
//!
//! Command-line interface over the resolution engine: parse, resolve,
//! dereference, bundle, or validate an OpenAPI/Swagger document.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use oas_refs_common::{CircularPolicy, ParserOptions};
use oas_refs_engine::{ApiParser, ResolvedApi};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oas-refs")]
#[command(version, about = "Resolve, dereference, and bundle $refs in OpenAPI documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the root document without resolving any $refs
    Parse {
        /// Path or URL of the API description
        spec: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Resolve every $ref and report the reference graph
    Resolve {
        /// Path or URL of the API description
        spec: String,
    },

    /// Replace every $ref with the value it points to
    #[command(after_help = "EXAMPLES:\n  \
        # Materialize circular references (default)\n  \
        oas-refs dereference api.yaml\n\n  \
        # Keep circular $refs, resolve everything else\n  \
        oas-refs dereference api.yaml --circular ignore\n\n  \
        # Fail if the API contains circular references\n  \
        oas-refs dereference api.yaml --circular forbid")]
    Dereference {
        /// Path or URL of the API description
        spec: String,

        /// Circular reference policy
        #[arg(long, value_enum, default_value_t = CircularArg::Allow)]
        circular: CircularArg,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inline external $refs into a single self-contained document
    Bundle {
        /// Path or URL of the API description
        spec: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Dereference and check the document against the meta-schema
    Validate {
        /// Path or URL of the API description
        spec: String,

        /// Circular reference policy
        #[arg(long, value_enum, default_value_t = CircularArg::Allow)]
        circular: CircularArg,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Write the result to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CircularArg {
    /// Materialize cycles as shared values
    Allow,
    /// Leave circular $refs untouched
    Ignore,
    /// Fail when the API contains circular references
    Forbid,
}

impl std::fmt::Display for CircularArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircularArg::Allow => write!(f, "allow"),
            CircularArg::Ignore => write!(f, "ignore"),
            CircularArg::Forbid => write!(f, "forbid"),
        }
    }
}

impl From<CircularArg> for CircularPolicy {
    fn from(arg: CircularArg) -> Self {
        match arg {
            CircularArg::Allow => CircularPolicy::Allow,
            CircularArg::Ignore => CircularPolicy::Ignore,
            CircularArg::Forbid => CircularPolicy::Forbid,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

fn options(circular: CircularArg) -> ParserOptions {
    let mut options = ParserOptions::default();
    options.dereference.circular = circular.into();
    options
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        println!("{} Verbose mode enabled", "→".cyan());
    }

    match cli.command {
        Commands::Parse { spec, output } => {
            println!("{} Parsing {}", "→".cyan(), spec);
            let api = ApiParser::new()
                .parse(&spec)
                .await
                .context("Failed to parse the API description")?;
            println!("{}", "✓ Parse successful!".green().bold());
            emit(&api, &output, cli.verbose)?;
        }

        Commands::Resolve { spec } => {
            println!("{} Resolving {}", "→".cyan(), spec);
            let api = ApiParser::new()
                .resolve(&spec)
                .await
                .context("Failed to resolve the API description")?;
            println!("{}", "✓ Resolve successful!".green().bold());
            println!("\n{}", "Documents:".bold());
            for path in api.paths() {
                println!("  • {}", path.cyan());
            }
            println!("\n  References: {}", api.graph().edges().len());
            let circular = api.circular_refs();
            if circular.is_empty() {
                println!("  Circular:   none");
            } else {
                println!("  Circular:   {}", circular.len().to_string().yellow());
                if cli.verbose {
                    for reference in circular {
                        println!("    • {}", reference.yellow());
                    }
                }
            }
        }

        Commands::Dereference {
            spec,
            circular,
            output,
        } => {
            println!("{} Dereferencing {}", "→".cyan(), spec);
            let api = ApiParser::new()
                .with_options(options(circular))
                .dereference(&spec)
                .await
                .context("Failed to dereference the API description")?;
            println!("{}", "✓ Dereference successful!".green().bold());
            if !api.circular_refs().is_empty() {
                println!(
                    "{} The API contains {} circular reference(s)",
                    "!".yellow(),
                    api.circular_refs().len()
                );
            }
            emit(&api, &output, cli.verbose)?;
        }

        Commands::Bundle { spec, output } => {
            println!("{} Bundling {}", "→".cyan(), spec);
            let api = ApiParser::new()
                .bundle(&spec)
                .await
                .context("Failed to bundle the API description")?;
            println!("{}", "✓ Bundle successful!".green().bold());
            emit(&api, &output, cli.verbose)?;
        }

        Commands::Validate { spec, circular } => {
            println!("{} Validating {}", "→".cyan(), spec);
            let api = oas_refs_validator::validate(&spec, options(circular))
                .await
                .context("Validation failed")?;
            println!("{}", "✓ API is valid!".green().bold());
            if cli.verbose {
                println!("  Documents:  {}", api.paths().len());
                println!("  References: {}", api.graph().edges().len());
                println!("  Circular:   {}", api.circular_refs().len());
            }
        }
    }

    Ok(())
}

/// Serialize a result document to stdout or a file.
///
/// Dereferenced trees can contain real cycles, so serialization goes
/// through the lossy exporter, which re-emits back-edges as internal
/// `$ref` pointers.
fn emit(api: &ResolvedApi, output: &OutputArgs, verbose: bool) -> Result<()> {
    let value = api.to_value_lossy();
    let rendered = match output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&value)?,
    };
    match &output.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if verbose {
                println!("{} Wrote {}", "→".cyan(), path.display());
            }
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
