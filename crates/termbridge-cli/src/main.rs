//! termbridge: read and drive macOS Terminal.app / iTerm2 sessions.
//!
//! Each subcommand runs one operation and prints its JSON result on stdout.
//! `batch` keeps one engine alive and answers JSON-lines requests from
//! stdin, so the active session and scroll-back history persist between
//! requests.

mod request;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use request::Request;
use std::path::PathBuf;
use termbridge_core::health;
use termbridge_core::{Config, HostChoice, ScreenMode, ScriptRunner, TerminalService};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

/// termbridge: terminal session bridge
#[derive(Parser, Debug)]
#[command(name = "termbridge", version, about = "Read and drive macOS terminal sessions")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Host application (auto, terminal, iterm2)
    #[arg(long, global = true)]
    host: Option<HostChoice>,

    /// Per-script timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Refuse all input injection
    #[arg(long, global = true)]
    readonly: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List session ids
    List,

    /// Make a session the active one
    Activate { session_id: String },

    /// Print screen contents
    Screen {
        /// focus, recent-output or manual
        #[arg(long, default_value = "focus")]
        mode: ScreenMode,
        #[arg(long)]
        lines: Option<usize>,
    },

    /// Type text into a session
    Send {
        text: String,
        /// Type without pressing return
        #[arg(long)]
        no_execute: bool,
        #[arg(long)]
        session: Option<String>,
    },

    /// Press a key
    Key {
        key: String,
        /// Modifier (command, shift, option, control); repeatable
        #[arg(short, long = "modifier")]
        modifiers: Vec<String>,
        #[arg(long)]
        session: Option<String>,
    },

    /// Paste text through the clipboard
    Paste {
        text: String,
        #[arg(long)]
        session: Option<String>,
    },

    /// Print buffered history
    Scroll {
        #[arg(long, default_value_t = 1)]
        pages: u32,
        #[arg(long)]
        session: Option<String>,
    },

    /// Ids, contents and metadata of every session
    Info {
        #[arg(long)]
        lines: Option<usize>,
    },

    /// Recent screen text of one session
    Read { session_id: String },

    /// Summarize a session
    Summary {
        session_id: String,
        /// Append buffered history
        #[arg(long)]
        history: bool,
    },

    /// Suggest next commands for a session
    Suggest {
        session_id: String,
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Look for common problems in a session's output
    Diagnose { session_id: String },

    /// Explain how the operations fit together
    Guide,

    /// Check platform, interpreter and host availability
    Doctor,

    /// Answer JSON-lines requests from stdin
    Batch,
}

impl Command {
    fn into_request(self, default_lines: usize) -> Option<Request> {
        let request = match self {
            Command::List => Request::ListSessions,
            Command::Activate { session_id } => Request::SetActiveSession { session_id },
            Command::Screen { mode, lines } => Request::GetScreen {
                mode,
                lines: lines.unwrap_or(default_lines),
            },
            Command::Send {
                text,
                no_execute,
                session,
            } => Request::SendInput {
                text,
                execute: !no_execute,
                session_id: session,
            },
            Command::Key {
                key,
                modifiers,
                session,
            } => Request::SendKeypress {
                key,
                modifiers,
                session_id: session,
            },
            Command::Paste { text, session } => Request::PasteText {
                text,
                session_id: session,
            },
            Command::Scroll { pages, session } => Request::ScrollBack {
                pages,
                session_id: session,
            },
            Command::Info { lines } => Request::GetAllTerminalInfo {
                lines: lines.unwrap_or(default_lines),
            },
            Command::Read { session_id } => Request::ReadSession { session_id },
            Command::Summary {
                session_id,
                history,
            } => Request::SessionSummary {
                session_id,
                include_history: history,
            },
            Command::Suggest {
                session_id,
                context,
            } => Request::CommandSuggestion {
                session_id,
                context,
            },
            Command::Diagnose { session_id } => Request::Troubleshoot { session_id },
            Command::Guide => Request::WorkflowGuide,
            Command::Doctor | Command::Batch => return None,
        };
        Some(request)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    use tracing_subscriber::EnvFilter;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("termbridge: {e:#}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = load_config(&cli)?;
    debug!(?config, "resolved config");

    match cli.command {
        Command::Doctor => return doctor(&config).await,
        Command::Batch => {
            let service = termbridge_core::connect(&config).await;
            info!(host = %service.manager().host(), "batch mode");
            batch(&service).await?;
            return Ok(0);
        }
        _ => {}
    }

    let Some(request) = cli.command.into_request(config.default_lines) else {
        return Ok(0);
    };
    let service = termbridge_core::connect(&config).await;
    // A fresh process knows no sessions yet.
    if request.needs_registry() {
        service.manager().scan().await;
    }
    let value = request::execute(&service, request).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(0)
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(termbridge_core::config::default_config_path);
    let mut config = Config::load(Some(&path))
        .with_context(|| format!("failed to load config at {}", path.display()))?;

    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.readonly {
        config.readonly = true;
    }
    Ok(config)
}

async fn doctor(config: &Config) -> Result<i32> {
    let results = health::run_checks(config).await;
    let passed = results.iter().filter(|r| r.passed).count();
    for r in &results {
        let mark = if r.passed { "ok" } else { "FAIL" };
        println!("[{mark:>4}] {}: {}", r.name, r.detail);
    }
    println!("{passed}/{} checks passed", results.len());
    Ok(if passed == results.len() { 0 } else { 1 })
}

/// Read one JSON request per line and write one JSON response per line.
async fn batch<R: ScriptRunner>(service: &TerminalService<R>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => request::execute(service, request).await?,
            Err(e) => {
                warn!(error = %e, "rejected malformed request");
                serde_json::json!({ "error": format!("invalid request: {e}") })
            }
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
