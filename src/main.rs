//! http-orchestrator CLI
//!
//! Issues calls through the full pipeline (prefixing, auth, shaping, dedup,
//! unwrapping) against a real HTTP endpoint.
//!
//! ```text
//! http-orchestrator --base-url http://localhost:3000 --token abc get /users -p id=1
//! http-orchestrator --config client.toml post /users --data '{"name":"ada"}'
//! http-orchestrator --config client.toml upload /files --file ./notes.txt -d folder=docs
//! http-orchestrator --config client.toml --watch --repeat 10 get /status
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use http_orchestrator::auth::StaticCredentials;
use http_orchestrator::config::{load_config, ClientConfig, ConfigWatcher};
use http_orchestrator::observability::{logging, metrics};
use http_orchestrator::pipeline::{ClassifiedError, HookSet, Orchestrator, StandardHooks};
use http_orchestrator::request::{CallOptions, Method, RequestDescriptor, UploadFile, UploadFileParams};
use http_orchestrator::transport::HttpTransport;

#[derive(Parser, Debug)]
#[command(name = "http-orchestrator", version, about = "Send requests through the orchestration pipeline")]
struct Cli {
    /// TOML config file with client defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL relative request URLs resolve against
    #[arg(long)]
    base_url: Option<String>,

    /// Token sent in the Authorization header
    #[arg(long)]
    token: Option<String>,

    /// Print the whole response envelope
    #[arg(long)]
    raw: bool,

    /// Print the payload without unwrapping the business envelope
    #[arg(long)]
    no_unwrap: bool,

    /// Issue the call this many times
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Pause between repeated calls
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Reload the config file when it changes (with --config)
    #[arg(long)]
    watch: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Get {
        url: String,
        /// Query parameter, KEY=VALUE (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Post {
        url: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Put {
        url: String,
        #[arg(long)]
        data: Option<String>,
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Delete {
        url: String,
        #[arg(short = 'p', long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    Upload {
        url: String,
        /// File to send
        #[arg(long)]
        file: PathBuf,
        /// Form field carrying the file
        #[arg(long)]
        field: Option<String>,
        /// Filename reported to the server
        #[arg(long)]
        filename: Option<String>,
        /// Extra form field, KEY=VALUE (repeatable)
        #[arg(short = 'd', long = "data", value_parser = parse_key_val)]
        data: Vec<(String, String)>,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

/// Numbers, booleans and JSON literals keep their type; anything else is a string.
fn to_fields(pairs: &[(String, String)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| {
            let parsed = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
            (key.clone(), parsed)
        })
        .collect()
}

fn with_body(mut descriptor: RequestDescriptor, data: Option<&str>) -> Result<RequestDescriptor, serde_json::Error> {
    if let Some(raw) = data {
        descriptor = descriptor.json(serde_json::from_str(raw)?);
    }
    Ok(descriptor)
}

async fn run_once(client: &Orchestrator, command: &Command, options: &CallOptions) -> Result<Value, ClassifiedError> {
    match command {
        Command::Get { url, params } => {
            let descriptor = RequestDescriptor::get(url.as_str()).params(to_fields(params));
            client.get(&descriptor, options).await
        }
        Command::Post { url, data, params } => {
            let descriptor = with_body(RequestDescriptor::post(url.as_str()).params(to_fields(params)), data.as_deref())
                .map_err(|e| ClassifiedError::transform(format!("invalid --data: {}", e)))?;
            client.post(&descriptor, options).await
        }
        Command::Put { url, data, params } => {
            let descriptor = with_body(RequestDescriptor::new(Method::Put, url.as_str()).params(to_fields(params)), data.as_deref())
                .map_err(|e| ClassifiedError::transform(format!("invalid --data: {}", e)))?;
            client.put(&descriptor, options).await
        }
        Command::Delete { url, params } => {
            let descriptor = RequestDescriptor::new(Method::Delete, url.as_str()).params(to_fields(params));
            client.delete(&descriptor, options).await
        }
        Command::Upload {
            url,
            file,
            field,
            filename,
            data,
        } => {
            let upload = UploadFile::from_path(file)
                .await
                .map_err(|e| ClassifiedError::transform(format!("cannot read {}: {}", file.display(), e)))?;
            let params = UploadFileParams {
                name: field.clone(),
                file: upload,
                filename: filename.clone(),
                data: to_fields(data),
            };
            client
                .upload_file(&RequestDescriptor::post(url.as_str()), params, options)
                .await
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "http-orchestrator starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let transport = HttpTransport::from_config(&config)?;
    let mut hooks = StandardHooks::new();
    if let Some(token) = &cli.token {
        hooks = hooks.with_credentials(Arc::new(StaticCredentials::new(token.clone())));
    }
    let client = Orchestrator::new(Arc::new(transport), config, HookSet::all(Arc::new(hooks)));

    // Keep the watcher handle alive for the whole run.
    let _watcher = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            client.watch_config(updates);
            Some(handle)
        }
        _ => None,
    };

    {
        let client = client.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let cancelled = client.cancel_all();
                tracing::info!(cancelled, "Interrupted, pending requests aborted");
            }
        });
    }

    let mut options = CallOptions::new();
    if cli.raw {
        options = options.return_raw_response(true);
    }
    if cli.no_unwrap {
        options = options.auto_unwrap(false);
    }

    let mut status = ExitCode::SUCCESS;
    for attempt in 0..cli.repeat.max(1) {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(cli.interval_ms)).await;
        }
        match run_once(&client, &cli.command, &options).await {
            Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            Err(error) => {
                eprintln!("{}", error);
                status = ExitCode::FAILURE;
                if error.is_cancelled() {
                    break;
                }
            }
        }
    }

    Ok(status)
}
