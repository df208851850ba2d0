//! pricing-analytics CLI - serve the analytics API or inspect compiled SQL
//!
//! Usage:
//!   pricing-analytics serve [--config <file>] [--port <port>]
//!   pricing-analytics compile <request.json> [--dialect <dialect>] [--output <format>]
//!   pricing-analytics metrics
//!
//! Examples:
//!   pricing-analytics serve --config pricing.toml
//!   pricing-analytics compile query.json --dialect duckdb
//!   pricing-analytics metrics

use clap::{Parser, Subcommand, ValueEnum};
use pricing_analytics::catalog::Catalog;
use pricing_analytics::compile::{CompileOptions, QueryCompiler};
use pricing_analytics::config::Settings;
use pricing_analytics::model::AnalyticsQuery;
use pricing_analytics::sql::Dialect;
use pricing_analytics::{time, web};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pricing_analytics=info,tower_http=info";

#[derive(Parser)]
#[command(name = "pricing-analytics")]
#[command(about = "Pricing analytics API over order-item sales data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Compile an analytics query request to SQL without running it
    Compile {
        /// Path to a JSON AnalyticsQuery
        file: PathBuf,

        /// SQL dialect to generate
        #[arg(short, long, default_value = "postgres")]
        dialect: DialectArg,

        /// Fact table (`table` or `schema.table`)
        #[arg(short, long, default_value = "pedido_item")]
        table: String,

        /// Output format
        #[arg(short, long, default_value = "sql")]
        output: OutputFormat,
    },

    /// List metrics, fields and their aliases
    Metrics,
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Postgres,
    Duckdb,
    Ansi,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Ansi => Dialect::Ansi,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// SQL followed by the parameter list
    Sql,
    /// SQL with a comment header
    Verbose,
    /// JSON object with sql, params, start and end
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => cmd_serve(config, port).await,
        Commands::Compile {
            file,
            dialect,
            table,
            output,
        } => cmd_compile(file, dialect, table, output),
        Commands::Metrics => cmd_metrics(),
    }
}

async fn cmd_serve(config: Option<PathBuf>, port: Option<u16>) -> ExitCode {
    let settings = match &config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let mut settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = port {
        settings.server.port = port;
    }

    match web::serve(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_compile(file: PathBuf, dialect: DialectArg, table: String, output: OutputFormat) -> ExitCode {
    let source = match fs::read_to_string(&file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let query: AnalyticsQuery = match serde_json::from_str(&source) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("Invalid request in '{}': {}", file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let options = CompileOptions::default()
        .with_dialect(dialect.into())
        .with_table(&table);
    let compiler = QueryCompiler::new(Arc::new(Catalog::standard()), options);

    let compiled = match compiler.prepare(query, time::today()) {
        Ok(prepared) => prepared.compiled,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match output {
        OutputFormat::Sql => {
            println!("{}", compiled.sql);
            println!();
            for (i, param) in compiled.params.iter().enumerate() {
                println!("-- ${} = {} ({})", i + 1, json_text(param), param.type_name());
            }
        }
        OutputFormat::Verbose => {
            println!("-- Pricing Analytics Compiled SQL");
            println!("-- Source: {}", file.display());
            println!("-- Dialect: {}", compiled.dialect);
            println!("-- Window: {} .. {}", compiled.start, compiled.end);
            println!();
            println!("{}", compiled.sql);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&compiled) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn json_text<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn cmd_metrics() -> ExitCode {
    let catalog = Catalog::standard();

    println!("Metrics:");
    for metric in catalog.metrics.metrics() {
        println!("  - {}: {}", metric.name, metric.description);
        if let Some(sql) = catalog.metrics.expression_sql(metric.name, Dialect::Postgres) {
            println!("      {}", sql);
        }
    }
    println!();

    println!("Metric aliases:");
    for (alias, target) in catalog.metrics.aliases() {
        println!("  - {} -> {}", alias, target);
    }
    println!();

    println!("Fields:");
    for field in catalog.fields.fields() {
        println!("  - {} ({:?})", field.name, field.kind);
    }
    println!();

    println!("Field aliases:");
    for (alias, target) in catalog.fields.aliases() {
        println!("  - {} -> {}", alias, target);
    }

    ExitCode::SUCCESS
}
