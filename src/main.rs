mod cli;

use chorelog::{config, server, storage};
use chorelog_db::migrations;
use chorelog_db::pool::{get_conn, init_pool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting chorelog server");
    tracing::info!(
        "Storage: {:?} backend, bucket '{}'",
        config.storage.backend,
        config.storage.bucket
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "chorelog=trace,chorelog_db=debug,chorelog_common=debug,tower_http=debug".to_string()
        } else {
            "chorelog=debug,chorelog_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::EnsureBucket => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ensure_bucket(cli.config.as_deref()))
        }
        Commands::Migrate => migrate(cli.config.as_deref()),
        Commands::Version => {
            println!("chorelog {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::load_config_or_default(None)?
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.path.display());
    println!(
        "  Storage: {:?} at {} (bucket '{}')",
        config.storage.backend,
        config.storage.endpoint_url(),
        config.storage.bucket
    );
    println!(
        "  Images: normalize={}, max_dimension={}, jpeg_quality={}",
        config.images.normalize, config.images.max_dimension, config.images.jpeg_quality
    );
    println!(
        "  Pagination: default {}, max {}",
        config.pagination.default_page_size, config.pagination.max_page_size
    );

    Ok(())
}

async fn ensure_bucket(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let store = storage::build_store(&config.storage);
    server::ensure_bucket(store.as_ref(), &config.storage.bucket).await?;
    println!("Bucket '{}' is ready", config.storage.bucket);
    Ok(())
}

fn migrate(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let db_path = config.database.path.to_string_lossy().to_string();

    let pool = init_pool(&db_path).with_context(|| format!("Failed to open {}", db_path))?;
    let conn = get_conn(&pool)?;
    let version = migrations::current_version(&conn)
        .context("Failed to read schema version")?;

    println!(
        "Database {} is at schema version {} (latest {})",
        db_path,
        version,
        migrations::latest_version()
    );
    Ok(())
}
