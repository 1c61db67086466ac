//! exprnative CLI - inspect the declarations synthesized for native types
//!
//! Commands:
//!   exprnative inspect [TYPE...]        - Display registered types and fields
//!   exprnative new <TYPE> <JSON-FIELDS> - Construct an instance and print it

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use exprnative::{NativeTypeProvider, NativeTypes, NativeTypesConfig, TypeProvider, Value};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "exprnative")]
#[command(about = "Tools for working with native expression types", long_about = None)]
struct Cli {
    /// Registry configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the declarations of the sample native types
    Inspect {
        /// Only these fully qualified type names
        types: Vec<String>,

        /// Show type shape hashes
        #[arg(long, short = 'H')]
        hashes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Construct an instance from a JSON object of field values
    New {
        /// Fully qualified type name, e.g. identity.Account
        type_name: String,

        /// Field values, e.g. '{"ID": "a-1", "emails": ["a@example.com"]}'
        fields: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("exprnative=info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => NativeTypesConfig::from_file(path)?,
        None => NativeTypesConfig::default(),
    };
    let provider = NativeTypes::new()
        .register::<identity::Account>()
        .register::<identity::Profile>()
        .with_config(config)
        .build_with_base()?;
    debug!(types = provider.types().len(), "registry ready");

    match cli.command {
        Commands::Inspect { types, hashes, json } => inspect_command(&provider, &types, hashes, json),
        Commands::New { type_name, fields } => new_command(&provider, &type_name, &fields),
    }
}

fn inspect_command(
    provider: &NativeTypeProvider,
    filter: &[String],
    show_hashes: bool,
    json: bool,
) -> anyhow::Result<()> {
    let types: Vec<_> = provider
        .types()
        .into_iter()
        .filter(|ty| filter.is_empty() || filter.iter().any(|name| name == ty.type_name()))
        .collect();

    for name in filter {
        if provider.native_type(name).is_none() {
            anyhow::bail!("Unknown native type: {}", name);
        }
    }

    if json {
        let out: Vec<serde_json::Value> = types
            .iter()
            .map(|ty| {
                let fields: BTreeMap<&str, String> = ty
                    .fields()
                    .iter()
                    .map(|f| (f.name.as_str(), f.decl.to_string()))
                    .collect();
                let mut entry = serde_json::json!({
                    "name": ty.type_name(),
                    "fields": fields,
                });
                if show_hashes {
                    entry["shape"] = serde_json::Value::String(ty.shape_hash().to_hex());
                }
                entry
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for ty in types {
        if show_hashes {
            println!("{} [{}]", ty.type_name(), ty.shape_hash());
        } else {
            println!("{}", ty.type_name());
        }
        for field in ty.fields() {
            println!("  {}: {}", field.name, field.decl);
        }
    }
    Ok(())
}

fn new_command(provider: &NativeTypeProvider, type_name: &str, fields: &str) -> anyhow::Result<()> {
    if provider.find_type(type_name).is_none() {
        anyhow::bail!("Unknown type: {}", type_name);
    }

    let fields: serde_json::Map<String, serde_json::Value> = serde_json::from_str(fields)
        .map_err(|e| anyhow::anyhow!("Field values must be a JSON object: {}", e))?;
    let fields: Vec<(String, Value)> = fields
        .iter()
        .map(|(name, json)| (name.clone(), Value::from_json(json)))
        .collect();

    match provider.new_value(type_name, &fields) {
        Value::Error(err) => Err(anyhow::anyhow!("Failed to construct {}: {}", type_name, err)),
        value => {
            println!("{}", serde_json::to_string_pretty(&value.to_json()?)?);
            Ok(())
        }
    }
}

/// Sample types the CLI registers.
mod identity {
    use std::collections::HashMap;

    use chrono::{DateTime, Duration, Utc};
    use exprnative::{NativeType, Shared};

    #[derive(Debug, Clone, NativeType)]
    #[native(package = "identity")]
    pub struct Account {
        #[native(rename = "ID")]
        pub id: String,
        pub emails: Vec<String>,
        pub labels: HashMap<String, String>,
        pub created: DateTime<Utc>,
        pub session_ttl: Duration,
        pub profile: Option<Shared<Profile>>,
        pub on_change: Option<fn(String)>,
        #[allow(dead_code)]
        secret: String,
    }

    #[derive(Debug, Clone, NativeType)]
    #[native(package = "identity")]
    pub struct Profile {
        pub display_name: String,
        pub age: u32,
        pub avatar: Vec<u8>,
    }
}
