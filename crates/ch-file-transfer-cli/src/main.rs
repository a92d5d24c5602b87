//! ch-file-transfer CLI - ClickHouse to delimited file transfers and back.

use ch_file_transfer::{
    preview_file, preview_table, ColumnSpec, ColumnType, Config, DbRowSink, DbRowSource, DbScope,
    FileRowSink, FileRowSource, RowSource, TableSelection, TransferCoordinator, TransferError,
    TransferReport,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "ch-file-transfer")]
#[command(about = "Transfer rows between ClickHouse tables and delimited files")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables in the configured database
    Tables,

    /// Show the column names and types of a table
    Columns {
        /// Table to describe
        table: String,
    },

    /// Preview up to 100 rows from a table or a delimited file
    Preview {
        /// Table to preview
        #[arg(long, conflicts_with = "file")]
        table: Option<String>,

        /// Delimited file to preview
        #[arg(long)]
        file: Option<PathBuf>,

        /// Comma-separated column list (table preview only; default: all columns)
        #[arg(long)]
        columns: Option<String>,

        /// Field delimiter for file preview
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
    },

    /// Export table rows to a delimited file
    Export {
        /// Source table
        table: String,

        /// Output file path
        output: PathBuf,

        /// Comma-separated column list (default: all columns)
        #[arg(long)]
        columns: Option<String>,

        /// Maximum number of rows to export
        #[arg(long)]
        limit: Option<u64>,

        /// Field delimiter for the output file
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
    },

    /// Import a delimited file into a table (created if missing)
    Import {
        /// Input file path
        file: PathBuf,

        /// Destination table
        table: String,

        /// Field delimiter of the input file
        #[arg(long, default_value = ",", value_parser = parse_delimiter)]
        delimiter: u8,
    },

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), TransferError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| TransferError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // Signal handling for graceful cancellation (SIGINT and SIGTERM)
    let cancel_token = setup_signal_handler().await?;

    match cli.command {
        Commands::Tables => {
            let scope = DbScope::connect(&config.connection).await?;
            let tables = scope.list_tables().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{}", table);
                }
            }
        }

        Commands::Columns { table } => {
            let scope = DbScope::connect(&config.connection).await?;
            let schema = scope.describe_table(&table).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                for col in &schema {
                    println!("{}\t{}", col.name, col.column_type);
                }
            }
        }

        Commands::Preview {
            table,
            file,
            columns,
            delimiter,
        } => match (table, file) {
            (Some(table), None) => {
                let scope = DbScope::connect(&config.connection).await?;
                let selection = selection_for(&scope, &table, columns.as_deref()).await?;
                let preview = preview_table(&scope, &selection).await?;

                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&preview)?);
                } else {
                    println!("{}", preview.columns.join("\t"));
                    for row in &preview.rows {
                        let fields: Vec<String> = row.iter().map(|v| v.to_field()).collect();
                        println!("{}", fields.join("\t"));
                    }
                }
            }
            (None, Some(path)) => {
                let reader = std::fs::File::open(&path)?;
                let preview = preview_file(reader, delimiter).await?;

                if cli.output_json {
                    println!("{}", serde_json::to_string_pretty(&preview)?);
                } else {
                    let header: Vec<String> = preview
                        .columns
                        .iter()
                        .map(|c| format!("{} ({})", c.name, c.column_type))
                        .collect();
                    println!("{}", header.join("\t"));
                    for row in &preview.rows {
                        let fields: Vec<String> = row.iter().map(|v| v.to_field()).collect();
                        println!("{}", fields.join("\t"));
                    }
                }
            }
            _ => {
                return Err(TransferError::Config(
                    "preview requires exactly one of --table or --file".to_string(),
                ));
            }
        },

        Commands::Export {
            table,
            output,
            columns,
            limit,
            delimiter,
        } => {
            let scope = DbScope::connect(&config.connection).await?;
            let selection = selection_for(&scope, &table, columns.as_deref()).await?;
            let schema: Vec<ColumnSpec> = selection
                .columns
                .iter()
                .map(|name| ColumnSpec::new(name.clone(), ColumnType::String))
                .collect();

            let mut source = DbRowSource::open(&scope, &selection, limit)?;
            let mut sink = FileRowSink::create_path(&output, delimiter)?;

            let report = TransferCoordinator::new(config.transfer.clone())
                .with_cancellation(cancel_token)
                .run(&schema, &mut source, &mut sink)
                .await?;

            print_report("Export", &report, cli.output_json)?;
        }

        Commands::Import {
            file,
            table,
            delimiter,
        } => {
            let mut source = FileRowSource::open_path(&file, delimiter, None)?;
            let schema: Vec<ColumnSpec> = source
                .columns()
                .iter()
                .map(|name| ColumnSpec::new(name.clone(), ColumnType::String))
                .collect();

            let scope = DbScope::connect(&config.connection).await?;
            let mut sink = DbRowSink::new(&scope, table);

            let report = TransferCoordinator::new(config.transfer.clone())
                .with_cancellation(cancel_token)
                .run(&schema, &mut source, &mut sink)
                .await?;

            print_report("Import", &report, cli.output_json)?;
        }

        Commands::HealthCheck => {
            let start = std::time::Instant::now();
            let scope = DbScope::connect(&config.connection).await?;
            let latency_ms = start.elapsed().as_millis() as u64;

            if cli.output_json {
                println!(
                    "{}",
                    serde_json::json!({
                        "connected": true,
                        "database": scope.database(),
                        "latency_ms": latency_ms,
                    })
                );
            } else {
                println!(
                    "Connection OK: database {} ({}ms)",
                    scope.database(),
                    latency_ms
                );
            }
        }
    }

    Ok(())
}

/// Build the column selection for a table, defaulting to every column in
/// table order when no explicit list is given.
async fn selection_for(
    scope: &DbScope,
    table: &str,
    columns: Option<&str>,
) -> Result<TableSelection, TransferError> {
    let schema = scope.describe_table(table).await?;

    let selected = match columns {
        Some(list) => {
            let names: Vec<String> = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            for name in &names {
                if !schema.iter().any(|c| c.name == *name) {
                    return Err(TransferError::schema(format!(
                        "column {} not found in table {}",
                        name, table
                    )));
                }
            }
            names
        }
        None => schema.into_iter().map(|c| c.name).collect(),
    };

    Ok(TableSelection::new(table, selected))
}

fn print_report(action: &str, report: &TransferReport, json: bool) -> Result<(), TransferError> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("\n{} completed!", action);
        println!("  Rows: {}", report.rows_transferred);
        println!("  Batches: {}", report.batches);
        println!("  Duration: {:.2}s", report.duration_seconds);
    }
    Ok(())
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    let s = match s {
        "\\t" | "tab" => "\t",
        other => other,
    };
    let bytes = s.as_bytes();
    if bytes.len() != 1 {
        return Err(format!("delimiter must be a single byte, got {:?}", s));
    }
    Ok(bytes[0])
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful cancellation.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that is cancelled when a signal is received.
#[cfg(unix)]
async fn setup_signal_handler() -> Result<CancellationToken, TransferError> {
    let cancel_token = CancellationToken::new();

    let token_int = cancel_token.clone();
    let token_term = cancel_token.clone();

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        sigint.recv().await;
        eprintln!("\nReceived SIGINT. Stopping after the current batch...");
        token_int.cancel();
    });

    tokio::spawn(async move {
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        sigterm.recv().await;
        eprintln!("\nReceived SIGTERM. Stopping after the current batch...");
        token_term.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C)
#[cfg(not(unix))]
async fn setup_signal_handler() -> Result<CancellationToken, TransferError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Stopping after the current batch...");
        token.cancel();
    });

    Ok(cancel_token)
}
