use anyhow::{Context, Result};
use querydesk::backend::HttpBackend;
use querydesk::chat::{AskerProfile, ChatSession};
use querydesk::config::Config;
use querydesk::console;
use querydesk::email::EmailJsDispatcher;
use querydesk::inbox::QueryInbox;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "querydesk.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let mut args: Vec<String> = env::args().collect();
    let _bin = args.remove(0);
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    match args[0].as_str() {
        "chat" => run_chat(&args[1..]).await,
        "inbox" => run_inbox(&args[1..]).await,
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        other => {
            print_usage();
            Err(anyhow::anyhow!("unknown command: {other}"))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct CommonArgs {
    config: Option<PathBuf>,
    contact: Option<String>,
}

fn parse_common(args: &[String], allow_contact: bool) -> Result<Option<CommonArgs>> {
    let mut parsed = CommonArgs {
        config: None,
        contact: None,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let value = args.get(i + 1).context("--config requires a value")?;
                parsed.config = Some(PathBuf::from(value));
                i += 2;
            }
            "--contact" if allow_contact => {
                let value = args.get(i + 1).context("--contact requires a value")?;
                parsed.contact = Some(value.to_string());
                i += 2;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other => {
                return Err(anyhow::anyhow!("unknown argument: {other}"));
            }
        }
    }
    Ok(Some(parsed))
}

fn stdin_lines() -> LinesStream<BufReader<tokio::io::Stdin>> {
    LinesStream::new(BufReader::new(tokio::io::stdin()).lines())
}

async fn run_chat(args: &[String]) -> Result<()> {
    let Some(args) = parse_common(args, true)? else {
        return Ok(());
    };
    let cfg = Config::resolve(args.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH))?;

    let backend = HttpBackend::new(&cfg.backend).context("failed to build backend client")?;
    let mut profile = AskerProfile::from_config(&cfg.chat);
    if args.contact.is_some() {
        profile.contact = args.contact;
    }
    let session =
        ChatSession::new(Arc::new(backend), cfg.chat.fallback_message.clone()).with_profile(profile);

    info!(backend = %cfg.backend.base_url, "chat: session started");
    console::run_chat(&session, stdin_lines()).await
}

async fn run_inbox(args: &[String]) -> Result<()> {
    let Some(args) = parse_common(args, false)? else {
        return Ok(());
    };
    let cfg = Config::resolve(args.config.as_deref(), Path::new(DEFAULT_CONFIG_PATH))?;
    cfg.require_email()?;

    let store = HttpBackend::new(&cfg.backend).context("failed to build backend client")?;
    let mailer = EmailJsDispatcher::new(&cfg.email).context("failed to build email client")?;
    let inbox = QueryInbox::new(Arc::new(store), Arc::new(mailer));

    info!(backend = %cfg.backend.base_url, "inbox: started");
    console::run_inbox(&inbox, stdin_lines()).await
}

fn print_usage() {
    eprintln!(
        "querydesk usage:\n  querydesk chat [--config <path>] [--contact <email>]\n  querydesk inbox [--config <path>]\n\nconfig defaults to ./{DEFAULT_CONFIG_PATH} when present; QUERYDESK_* env vars override it"
    );
}
