mod config;

/// Version injected at compile time via REGIONCLOUD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("REGIONCLOUD_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use regioncloud::error::format_cloud_error;
use regioncloud::job::JobEndpoint;
use regioncloud::resource::{get_all_kind_keys, get_kind};
use regioncloud::tags::parse_tag_args;
use regioncloud::{CanonicalStatus, CloudError, HttpTransport, Region};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Region-scoped cloud resource operations
#[derive(Parser, Debug)]
#[command(name = "regioncloud", version, about, long_about = None)]
struct Args {
    /// Region to operate in
    #[arg(short, long, global = true, env = "REGIONCLOUD_REGION")]
    region: Option<String>,

    /// Project id
    #[arg(short, long, global = true, env = "REGIONCLOUD_PROJECT")]
    project: Option<String>,

    /// Endpoint template with {service} and {region} placeholders
    #[arg(long, global = true, env = "REGIONCLOUD_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "REGIONCLOUD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known resource kinds and what they support
    Kinds,
    /// List resources of a kind
    List {
        kind: String,
        /// Only the resource with this id
        #[arg(long, default_value = "")]
        id: String,
    },
    /// Show one resource
    Get { kind: String, id: String },
    /// Create a resource from a JSON spec and wait until it is usable
    Create {
        kind: String,
        /// Request body as JSON
        #[arg(long)]
        spec: String,
    },
    /// Delete a resource
    Delete {
        kind: String,
        id: String,
        /// Wait until the resource is gone
        #[arg(long)]
        wait: bool,
    },
    /// Wait for a resource to reach a canonical status
    Wait {
        kind: String,
        id: String,
        #[arg(long, value_parser = parse_status)]
        status: CanonicalStatus,
        /// Wait budget in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Set tags (key=value); merges unless --replace
    Tag {
        kind: String,
        id: String,
        #[arg(required = true)]
        tags: Vec<String>,
        /// Drop every existing tag first
        #[arg(long)]
        replace: bool,
    },
    /// Run a named action on a resource
    Action {
        kind: String,
        action: String,
        id: String,
        /// Extra request body as JSON, merged over the action defaults
        #[arg(long)]
        body: Option<String>,
    },
    /// List the instance types offered for a kind
    InstanceTypes { kind: String },
    /// Show a provider job
    Job {
        id: String,
        /// Read the job from this kind's job endpoint
        #[arg(long)]
        kind: Option<String>,
        /// Wait until the job finishes
        #[arg(long)]
        wait: bool,
    },
    /// Remember a default region
    UseRegion { region: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

fn parse_status(s: &str) -> std::result::Result<CanonicalStatus, String> {
    CanonicalStatus::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = CanonicalStatus::ALL.iter().map(|c| c.as_str()).collect();
        format!("unknown status '{}', expected one of: {}", s, names.join(", "))
    })
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("regioncloud {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("regioncloud").join("regioncloud.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".regioncloud").join("regioncloud.log");
    }
    PathBuf::from("regioncloud.log")
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn parse_json_arg(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("--{} is not valid JSON", what))
}

fn connect(args: &Args, config: &Config) -> Result<Region> {
    let region = config
        .effective_region(args.region.as_deref())
        .ok_or_else(|| anyhow!("No region configured. Use --region or REGIONCLOUD_REGION"))?;
    let project = config
        .effective_project(args.project.as_deref())
        .ok_or_else(|| anyhow!("No project configured. Use --project or REGIONCLOUD_PROJECT"))?;
    let endpoint = config.effective_endpoint(args.endpoint.as_deref());

    tracing::info!("Using region: {}, project: {}", region, project);

    let mut transport = HttpTransport::new(&endpoint, &region)?;
    if let Some(token) = &args.token {
        transport = transport.with_token(token.clone());
    }

    Ok(Region::new(&region, &project, Arc::new(transport)).with_options(config.region_options()))
}

fn describe_kinds() -> Vec<Value> {
    get_all_kind_keys()
        .into_iter()
        .filter_map(get_kind)
        .map(|def| {
            let actions: Vec<&str> = def.actions.iter().map(|a| a.key.as_str()).collect();
            json!({
                "kind": def.key,
                "name": def.display_name,
                "service": def.service,
                "create": def.create.is_some(),
                "delete": def.deletable,
                "tags": def.tags.is_some(),
                "instance_types": def.catalog.is_some(),
                "actions": actions,
            })
        })
        .collect()
}

async fn run(args: Args, mut config: Config) -> Result<()> {
    let output = args.output;

    match &args.command {
        Command::Kinds => return print_output(&describe_kinds(), output),
        Command::UseRegion { region } => {
            config.set_region(region)?;
            tracing::info!("Default region set to {}", region);
            return print_output(&json!({ "region": region }), output);
        },
        _ => {},
    }

    let region = connect(&args, &config)?;

    match &args.command {
        Command::Kinds | Command::UseRegion { .. } => Ok(()),
        Command::List { kind, id } => {
            let resources = region.adapter(kind)?.list(id).await?;
            print_output(&resources, output)
        },
        Command::Get { kind, id } => {
            let resource = region.adapter(kind)?.get(id).await?;
            print_output(&resource, output)
        },
        Command::Create { kind, spec } => {
            let spec = parse_json_arg(spec, "spec")?;
            let resource = region.adapter(kind)?.create(&spec).await?;
            print_output(&resource, output)
        },
        Command::Delete { kind, id, wait } => {
            let adapter = region.adapter(kind)?;
            if *wait {
                adapter.delete_and_wait(id).await?;
            } else {
                adapter.delete(id).await?;
            }
            print_output(&json!({ "kind": kind, "id": id, "deleted": true }), output)
        },
        Command::Wait {
            kind,
            id,
            status,
            timeout,
        } => {
            let mut opts = region.options().wait;
            if let Some(secs) = timeout {
                opts = opts.with_timeout(Duration::from_secs(*secs));
            }
            let resource = region
                .adapter(kind)?
                .wait_for_status(id, *status, &opts)
                .await?;
            print_output(&resource, output)
        },
        Command::Tag {
            kind,
            id,
            tags,
            replace,
        } => {
            let desired = parse_tag_args(tags.as_slice());
            let adapter = region.adapter(kind)?;
            adapter.set_tags(id, &desired, *replace).await?;
            print_output(&adapter.tags(id).await?, output)
        },
        Command::Action {
            kind,
            action,
            id,
            body,
        } => {
            let body = match body {
                Some(text) => parse_json_arg(text, "body")?,
                None => Value::Null,
            };
            let result = region.adapter(kind)?.perform(action, id, &body).await?;
            print_output(&result, output)
        },
        Command::InstanceTypes { kind } => {
            let types = region.instance_types(kind).await?;
            print_output(&types, output)
        },
        Command::Job { id, kind, wait } => {
            let endpoint = match kind {
                Some(kind) => get_kind(kind)
                    .map(|def| def.job_endpoint())
                    .ok_or_else(|| CloudError::not_supported(kind, "jobs"))?,
                None => JobEndpoint::default(),
            };
            let job = if *wait {
                region.wait_job(&endpoint, id).await?
            } else {
                region.job(&endpoint, id).await?
            };
            print_output(&job, output)
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let config = Config::load();

    if let Err(err) = run(args, config).await {
        match err.downcast_ref::<CloudError>() {
            Some(cloud) => {
                tracing::error!("{}", cloud);
                eprintln!("Error: {}", format_cloud_error(cloud));
            },
            None => eprintln!("Error: {err:#}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
