use bson::{Bson, Document};
use clap::{Parser, Subcommand};
use merlin_mongo::{config, info, logger, translate};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "merlin-mongo", version, about = "Translate ORM filters, sorts and deltas into MongoDB syntax", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). If omitted, the usual locations are searched.")]
    config: Option<PathBuf>,
    /// Pretty-print JSON output
    #[arg(long, default_value_t = false)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Translate a filter tree (Extended JSON) into a native filter")]
    Filter {
        #[arg(help = "Filter as Extended JSON, e.g. '{\"age\":{\"$notIn\":[1,2]}}'")]
        json: String,
    },
    #[command(about = "Translate a sort specification into native sort pairs")]
    Sort {
        #[arg(help = "Sort as a JSON array, e.g. '[{\"name\":\"asc\"},{\"age\":\"desc\"}]'")]
        json: String,
    },
    #[command(about = "Translate a delta into a native update document")]
    Delta {
        #[arg(help = "Delta as Extended JSON, either '{\"diff\":{...}}' or the bare diff")]
        json: String,
    },
    #[command(about = "Show package version, compiled features and supported operators")]
    Info,
}

fn render(value: &serde_json::Value, pretty: bool) -> Result<String, Box<dyn std::error::Error>> {
    Ok(if pretty { serde_json::to_string_pretty(value)? } else { serde_json::to_string(value)? })
}

fn relaxed(doc: Document) -> serde_json::Value {
    Bson::Document(doc).into_relaxed_extjson()
}

fn run(cli: Cli) -> Result<String, Box<dyn std::error::Error>> {
    let cfg = config::load_config(cli.config.as_deref())?;
    if cfg.log_dir.is_some() || cfg.log_level.is_some() {
        logger::configure_logging(cfg.log_dir.as_deref(), cfg.log_level.as_deref(), cfg.log_retention)?;
    }
    let value = match cli.command {
        Commands::Filter { json } => {
            let filter = translate::parse_filter_json(&json)?;
            relaxed(translate::translate_filter(&filter)?)
        }
        Commands::Sort { json } => {
            let specs = translate::parse_sort_json(&json)?;
            match translate::translate_sort(Some(specs.as_slice())) {
                Some(native) => serde_json::Value::Array(
                    native
                        .into_pairs()
                        .into_iter()
                        .map(|(field, dir)| serde_json::json!([field, dir]))
                        .collect(),
                ),
                None => serde_json::Value::Null,
            }
        }
        Commands::Delta { json } => {
            let delta = translate::parse_delta_json(&json)?;
            relaxed(translate::translate_delta(&delta)?)
        }
        Commands::Info => serde_json::to_value(info::info())?,
    };
    render(&value, cli.pretty)
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
