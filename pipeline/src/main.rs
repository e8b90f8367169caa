//! lei-sdmx CLI - GLEIF LEI extract to a validated SDMX dataset
//!
//! ```bash
//! lei-sdmx run gleif.csv                  # Full pipeline (FMR + VTL)
//! lei-sdmx run gleif.csv --row-limit 500  # Only the first 500 rows
//! lei-sdmx convert gleif.csv              # Offline: CSV → SDMX-CSV
//! lei-sdmx columns                        # Show the column mapping
//! ```
//!
//! Defaults come from `LEI_SDMX_*` environment variables (or `.env`),
//! flags override them.

use clap::{Parser, Subcommand};
use lei_sdmx::logs::log_error;
use lei_sdmx::{convert, run_pipeline, PipelineConfig, PipelineOutput};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lei-sdmx")]
#[command(about = "Convert GLEIF LEI data to SDMX and validate it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: CSV → SDMX-CSV → structural and VTL validation
    Run {
        /// Input GLEIF CSV file
        input: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,

        /// SDMX REST endpoint of the registry
        #[arg(long)]
        endpoint: Option<String>,

        /// Transformation scheme id
        #[arg(long)]
        script_id: Option<String>,

        /// Transformation scheme agency
        #[arg(long)]
        script_agency: Option<String>,

        /// Transformation scheme version
        #[arg(long)]
        script_version: Option<String>,

        /// VTL engine URL (default: {endpoint}/vtl/run)
        #[arg(long)]
        engine: Option<String>,

        /// Folder for the validation logs
        #[arg(short, long)]
        logs: Option<PathBuf>,

        /// Do not fetch the DSD before uploading
        #[arg(long)]
        offline_structure: bool,
    },

    /// Offline conversion: CSV → SDMX-CSV, no network
    Convert {
        /// Input GLEIF CSV file
        input: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Show the GLEIF → LEI_DATA column mapping
    Columns,
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Maximum number of rows read from the input
    #[arg(short = 'n', long)]
    row_limit: Option<usize>,

    /// Output SDMX-CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Keep entities whose status is not ACTIVE
    #[arg(long)]
    include_inactive: bool,
}

impl CommonArgs {
    fn apply(self, input: Option<PathBuf>, config: &mut PipelineConfig) {
        if let Some(input) = input {
            config.input_path = input;
        }
        if let Some(limit) = self.row_limit {
            config.row_limit = limit;
        }
        if let Some(output) = self.output {
            config.output_path = Some(output);
        }
        if self.include_inactive {
            config.reshape.active_only = false;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli.command).await {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

async fn dispatch(command: Commands) -> CmdResult {
    match command {
        Commands::Run {
            input,
            common,
            endpoint,
            script_id,
            script_agency,
            script_version,
            engine,
            logs,
            offline_structure,
        } => {
            let mut config = PipelineConfig::from_env()?;
            common.apply(input, &mut config);
            if let Some(endpoint) = endpoint {
                config.script_query.api_endpoint = endpoint.clone();
                config.registry_endpoint = endpoint;
            }
            if let Some(id) = script_id {
                config.script_query.id = id;
            }
            if let Some(agency) = script_agency {
                config.script_query.agency = agency;
            }
            if let Some(version) = script_version {
                config.script_query.version = version;
            }
            if engine.is_some() {
                config.script_query.engine_endpoint = engine;
            }
            if logs.is_some() {
                config.logs_folder = logs;
            }
            if offline_structure {
                config.fetch_structure = false;
            }
            cmd_run(&config).await
        }

        Commands::Convert { input, common } => {
            let mut config = PipelineConfig::from_env()?;
            common.apply(input, &mut config);
            cmd_convert(&config)
        }

        Commands::Columns => {
            println!("{}", lei_sdmx::transform::reshape::mapping_description());
            Ok(())
        }
    }
}

async fn cmd_run(config: &PipelineConfig) -> CmdResult {
    eprintln!("📄 Processing: {}", config.input_path.display());
    let output = run_pipeline(config).await?;
    print_summary(config, &output);
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_convert(config: &PipelineConfig) -> CmdResult {
    eprintln!("📄 Converting: {}", config.input_path.display());
    let dataset = convert(config)?;
    eprintln!("\n✨ {} rows converted", dataset.table.len());
    Ok(())
}

fn print_summary(config: &PipelineConfig, output: &PipelineOutput) {
    eprintln!("\n📊 Summary:");
    eprintln!("   Encoding: {}", output.csv_info.encoding);
    eprintln!("   Rows: {} read, {} kept", output.csv_info.rows_read, output.csv_info.rows_kept);
    if let Some(ref path) = config.output_path {
        eprintln!("   Dataset: {}", path.display());
    }

    if output.structural.is_valid() {
        eprintln!("   ✅ Structurally valid");
    } else {
        eprintln!("   ❌ {} structural diagnostic(s)", output.structural.diagnostics.len());
    }

    let flagged = output.quality.rules_with_rows();
    if flagged.is_empty() {
        eprintln!("   ✅ All {} VTL result(s) empty", output.quality.results.len());
    } else {
        for rule in flagged {
            let rows = output.quality.get(rule).map(|t| t.len()).unwrap_or(0);
            eprintln!("   ⚠️  {}: {} row(s)", rule, rows);
        }
    }

    if let Some(ref logs) = config.logs_folder {
        eprintln!("   Logs: {}", logs.display());
    }
}
