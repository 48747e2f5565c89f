use clap::{Parser, Subcommand};
use resultmap::{BatchStatement, MapperConfig, ParamValue, ParsedQuery};
use serde::Serialize;

/// resultmap - Named parameter rewriting and result mapping utilities
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite named parameters into positional placeholders
    Rewrite {
        /// Query text containing :name references
        #[arg(long)]
        sql: String,

        /// Parameter values as a JSON object; arrays expand to lists
        #[arg(long, default_value = "{}")]
        params: String,

        /// Allow references without a value (batch template)
        #[arg(long)]
        template: bool,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
struct RewriteOutput<'a> {
    sql: &'a str,
    placeholder_count: usize,
    parameters: Vec<ParameterOutput<'a>>,
}

#[derive(Serialize)]
struct ParameterOutput<'a> {
    name: &'a str,
    replace_count: usize,
    positions: &'a [usize],
}

fn rewrite(sql: &str, params: &str, template: bool) -> Result<String, String> {
    let values: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(params).map_err(|e| format!("Invalid --params JSON: {}", e))?;
    let pairs = values.into_iter().map(|(k, v)| (k, ParamValue::from(v)));

    let parsed = if template {
        BatchStatement::parse(sql, pairs).map(|b| b.query().clone())
    } else {
        ParsedQuery::parse(sql, pairs)
    }
    .map_err(|e| e.to_string())?;

    let output = RewriteOutput {
        sql: parsed.sql(),
        placeholder_count: parsed.placeholder_count(),
        parameters: parsed
            .parameters()
            .iter()
            .map(|p| ParameterOutput {
                name: p.name(),
                replace_count: p.replace_count(),
                positions: p.positions(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&output).map_err(|e| e.to_string())
}

fn main() {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("Failed to load .env: {}", e);
        }
    }

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Rewrite {
            sql,
            params,
            template,
        } => rewrite(&sql, &params, template),
        Command::Config => MapperConfig::from_env()
            .map_err(|e| format!("Configuration error: {}", e))
            .and_then(|config| serde_json::to_string_pretty(&config).map_err(|e| e.to_string())),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
