//! JiggleCast CLI
//!
//! Entry point for the `jigglecast` command-line tool.

use clap::{Parser, Subcommand};
use jigglecast::armor::{serialize_entry, ArmorCache, ValueRegistry};
use jigglecast::geometry::archive;
use jigglecast::{ContentSource, EffectiveSettings};
use serde_json::json;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "jigglecast")]
#[command(about = "Bone-cast collider cache and armor override tools", version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Override logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a bone-cast file and print its header and counts
    Inspect {
        file: PathBuf,
    },

    /// Print the cache file path for an actor and node
    Key {
        /// Full form id (hex)
        #[arg(long, value_parser = parse_hex)]
        form_id: u32,

        /// Owning plugin file name
        #[arg(long, requires = "local_id")]
        plugin: Option<String>,

        /// Form id local to the plugin (hex)
        #[arg(long, value_parser = parse_hex, requires = "plugin")]
        local_id: Option<u32>,

        /// Skeleton node name
        #[arg(long)]
        node: String,

        /// Override bonecast.data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Load an armor override file and print it sorted
    Armor {
        file: PathBuf,
    },

    /// Print the effective settings
    Settings,
}

fn main() {
    let cli = Cli::parse();

    let data_dir = match &cli.command {
        Commands::Key { data_dir, .. } => data_dir.clone(),
        _ => None,
    };

    let effective = match load_settings(cli.config.as_deref(), cli.log_level.as_deref(), data_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading settings: {}", e);
            process::exit(1);
        }
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(effective.settings.logging.level.as_str()),
    )
    .init();

    match cli.command {
        Commands::Inspect { file } => run_inspect(&file),
        Commands::Key {
            form_id,
            plugin,
            local_id,
            node,
            ..
        } => run_key(&effective, form_id, plugin, local_id, &node),
        Commands::Armor { file } => run_armor(&file),
        Commands::Settings => print_json(effective.to_json()),
    }
}

fn load_settings(
    config: Option<&Path>,
    log_level: Option<&str>,
    data_dir: Option<PathBuf>,
) -> Result<EffectiveSettings, jigglecast::SettingsError> {
    let mut overrides = serde_json::Map::new();
    if let Some(level) = log_level {
        overrides.insert("logging".to_string(), json!({ "level": level }));
    }
    if let Some(dir) = data_dir {
        overrides.insert("bonecast".to_string(), json!({ "data_dir": dir }));
    }

    let cli = if overrides.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(overrides))
    };

    EffectiveSettings::build(config, cli)
}

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex form id '{}': {}", s, e))
}

fn run_inspect(path: &Path) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Cannot open {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    match archive::inspect(BufReader::new(file)) {
        Ok(info) => print_json(serde_json::to_string_pretty(&info)),
        Err(e) => {
            eprintln!("Invalid bone-cast file {}: {}", path.display(), e);
            process::exit(1);
        }
    }
}

fn run_key(
    effective: &EffectiveSettings,
    form_id: u32,
    plugin: Option<String>,
    local_id: Option<u32>,
    node: &str,
) {
    let source = match (plugin, local_id) {
        (Some(name), Some(local_form_id)) => ContentSource::Plugin {
            name,
            local_form_id,
        },
        _ => ContentSource::Raw { form_id },
    };

    let root = &effective.settings.bonecast.data_dir;
    let output = json!({
        "key": source.key_string(node),
        "hash": source.cache_key(node),
        "path": root.join(source.relative_path(node)),
    });
    print_json(serde_json::to_string_pretty(&output));
}

fn run_armor(path: &Path) {
    let mut cache = ArmorCache::new(ValueRegistry::physics_defaults());

    let entry = match cache.try_load(path) {
        Ok(entry) => entry,
        Err(e) => {
            eprintln!("Error loading {}: {}", path.display(), e);
            process::exit(1);
        }
    };

    match serialize_entry(entry) {
        Ok(value) => print_json(serde_json::to_string_pretty(&value)),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}

fn print_json(result: Result<String, serde_json::Error>) {
    match result {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(1);
        }
    }
}
