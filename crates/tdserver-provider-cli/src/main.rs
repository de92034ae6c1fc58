//! tdserver-admin - TdServer database administration and type mapping.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tdserver_provider::storage::MappingInfo;
use tdserver_provider::{ClrType, ProviderConfig, ProviderError, ProviderServices, TypeMappingSource};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "tdserver-admin")]
#[command(about = "TdServer database administration and type mapping")]
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
    /// Create the configured database and wait until it accepts connections
    Create {
        /// Succeed without changes when the database already exists
        #[arg(long)]
        if_not_exists: bool,
    },

    /// Drop the configured database
    Drop {
        /// Succeed without changes when the database does not exist
        #[arg(long)]
        if_exists: bool,
    },

    /// Check whether the configured database exists
    Exists,

    /// Check whether the configured database contains any tables
    HasTables,

    /// Resolve a semantic type and facets to a store type (no connection needed)
    MapType {
        /// Semantic type, e.g. int, string, DateTime, decimal
        #[arg(long = "type")]
        clr_type: Option<String>,

        /// Store type name, e.g. "varchar(20)" or "decimal(10,2)"
        #[arg(long)]
        store_type: Option<String>,

        /// Maximum length of text or binary data
        #[arg(long)]
        max_length: Option<i32>,

        /// Numeric precision
        #[arg(long)]
        precision: Option<i32>,

        /// Numeric scale
        #[arg(long)]
        scale: Option<i32>,

        /// Store text as unicode (true) or ANSI (false)
        #[arg(long)]
        unicode: Option<bool>,

        /// Fixed-length text or binary
        #[arg(long)]
        fixed_length: bool,

        /// Row version column
        #[arg(long)]
        row_version: bool,

        /// Column is part of a key or index
        #[arg(long)]
        key: bool,
    },
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

async fn run() -> Result<(), ProviderError> {
    let cli = Cli::parse();

    // Type mapping works offline and doesn't need a configuration file
    if let Commands::MapType {
        clr_type,
        store_type,
        max_length,
        precision,
        scale,
        unicode,
        fixed_length,
        row_version,
        key,
    } = cli.command
    {
        let clr_type = clr_type.as_deref().map(ClrType::from_str).transpose()?;
        let mut request = match store_type.as_deref() {
            Some(name) => MappingInfo::for_store_type(name, clr_type),
            None => MappingInfo {
                clr_type,
                ..Default::default()
            },
        };
        if request.clr_type.is_none() && request.store_type_name.is_none() {
            return Err(ProviderError::Config("map-type needs --type or --store-type".to_string()));
        }
        request.size = max_length.or(request.size);
        request.precision = precision.or(request.precision);
        request.scale = scale.or(request.scale);
        request.is_unicode = unicode.or(request.is_unicode);
        request.is_fixed_length = fixed_length.then_some(true).or(request.is_fixed_length);
        request.is_row_version = row_version.then_some(true);
        request.is_key_or_index = key;

        let source = TypeMappingSource::new();
        let mapping = source
            .find_mapping(&request)
            .ok_or_else(|| ProviderError::Config(format!("No store type mapping for {:?}", request)))?;
        source.validate_mapping(&mapping, None)?;

        if cli.output_json {
            let result = serde_json::json!({
                "store_type": mapping.store_type(),
                "clr_type": mapping.clr_type().to_string(),
                "size": mapping.size(),
                "precision": mapping.precision(),
                "scale": mapping.scale(),
                "unicode": mapping.is_unicode(),
                "fixed_length": mapping.is_fixed_length(),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", mapping.store_type());
        }
        return Ok(());
    }

    // Setup logging
    setup_logging(&cli.verbosity, &cli.log_format).map_err(ProviderError::Config)?;

    let config = ProviderConfig::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // Setup signal handling so long-running probes stop on SIGINT/SIGTERM
    let cancel_token = setup_signal_handler()?;

    let services = ProviderServices::new(config)?;
    let creator = services.database_creator();
    let database = services.config().connection.database.clone();

    match cli.command {
        Commands::MapType { .. } => unreachable!(), // Handled above
        Commands::Create { if_not_exists } => {
            let created = if if_not_exists {
                creator.ensure_created_async(&cancel_token).await?
            } else {
                creator.create_async(&cancel_token).await?;
                true
            };
            report(cli.output_json, "created", created, &database, "Created", "already exists")?;
        }
        Commands::Drop { if_exists } => {
            let dropped = if if_exists {
                creator.ensure_deleted_async(&cancel_token).await?
            } else {
                creator.delete_async(&cancel_token).await?;
                true
            };
            report(cli.output_json, "dropped", dropped, &database, "Dropped", "does not exist")?;
        }
        Commands::Exists => {
            let exists = creator.exists_async(&cancel_token).await?;
            report(cli.output_json, "exists", exists, &database, "Exists", "does not exist")?;
        }
        Commands::HasTables => {
            let has_tables = creator.has_tables_async(&cancel_token).await?;
            report(cli.output_json, "has_tables", has_tables, &database, "Has tables", "has no tables")?;
        }
    }

    Ok(())
}

/// Print a yes/no outcome for `database`.
fn report(json: bool, key: &str, value: bool, database: &str, yes: &str, no: &str) -> Result<(), ProviderError> {
    if json {
        let result = serde_json::json!({ "database": database, key: value });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if value {
        println!("{}: {}", yes, database);
    } else {
        println!("Database {} {}", database, no);
    }
    Ok(())
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
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> Result<CancellationToken, ProviderError> {
    let cancel_token = CancellationToken::new();
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => eprintln!("\nReceived SIGINT. Cancelling..."),
            _ = sigterm.recv() => eprintln!("\nReceived SIGTERM. Cancelling..."),
        }
        token.cancel();
    });

    Ok(cancel_token)
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> Result<CancellationToken, ProviderError> {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });

    Ok(cancel_token)
}
