mod api;
mod runtime;
mod state;

#[cfg(test)]
mod scenarios_test;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lg_domain::config::Config;
use lg_memory::{DialogMemory, TokenLedger};
use lg_providers::OpenAiCompatProvider;
use lg_skills::builtin::{register_builtin_skills, BuiltinContext};
use lg_skills::builtin::email::SendEmail;
use lg_skills::SkillRegistry;
use tracing_subscriber::EnvFilter;

use runtime::schedules::{run_daily_greeting, ScheduleRunner, ScheduleStore, StoreScheduleSink};
use runtime::{CancelMap, SessionLockMap, Transport};
use state::AppState;

#[derive(Parser)]
#[command(name = "lg-gateway", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP/WebSocket gateway (default when no subcommand is given).
    Serve,
    /// Load and validate the config, then exit with a non-zero status on failure.
    Doctor,
    /// Print the effective config (with secrets redacted) as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.observability);
            run_server(Arc::new(config)).await
        }
        Some(Command::Doctor) => {
            let config = load_config(&cli.config)?;
            if let Err(e) = config.validate() {
                eprintln!("config invalid: {e}");
                std::process::exit(1);
            }
            println!("config OK");
            Ok(())
        }
        Some(Command::Config) => {
            let mut config = load_config(&cli.config)?;
            config.llm.api_key = String::new();
            config.email.smtp_auth_code = None;
            println!("{}", toml::to_string_pretty(&config).context("serializing config")?);
            Ok(())
        }
    }
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(s) => Config::from_toml_str(&s).with_context(|| format!("parsing {}", path.display()))?,
        Err(_) => Config::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn init_tracing(cfg: &lg_domain::config::ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_filter.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("starting");

    config.validate().map_err(|e| anyhow::anyhow!(e)).context("config validation failed")?;

    std::fs::create_dir_all(&config.server.state_dir).context("creating state_dir")?;

    let llm = Arc::new(OpenAiCompatProvider::from_config(&config.llm).context("initializing LLM provider")?);
    tracing::info!(model = %config.llm.model, "LLM provider ready");

    let schedules = Arc::new(
        ScheduleStore::load(config.server.state_dir.join("email_tasks.json")).context("loading schedule store")?,
    );
    let email_sink = Arc::new(StoreScheduleSink::new(schedules.clone()));

    let mut registry = SkillRegistry::new();
    let builtin_ctx = BuiltinContext {
        state_dir: config.server.state_dir.clone(),
        email: config.email.clone(),
        email_sink,
        github_token: std::env::var("LG_GITHUB_TOKEN").ok(),
    };
    register_builtin_skills(&mut registry, &builtin_ctx);
    let skills = Arc::new(registry);
    tracing::info!(count = skills.list_brief().len(), "skills registered");

    let memory = Arc::new(DialogMemory::load(config.server.state_dir.join("dialog_memory.json"), config.memory.max_records));
    let ledger = Arc::new(TokenLedger::load(config.server.state_dir.join("token_usage.json"), config.token_rates.clone()));

    let transport = Arc::new(Transport::new(config.transport.subscriber_buffer));
    let cancel_map = Arc::new(CancelMap::new());
    let session_locks = Arc::new(SessionLockMap::new());

    let state = Arc::new(AppState {
        config: config.clone(),
        llm,
        skills,
        memory,
        ledger,
        schedules: schedules.clone(),
        transport,
        cancel_map,
        session_locks: session_locks.clone(),
    });

    // Realtime daily-first-start greeting: fire-and-forget so it never
    // delays the listener coming up.
    {
        let llm = state.llm.clone();
        let schedules = schedules.clone();
        let email_cfg = config.email.clone();
        tokio::spawn(async move {
            if let Some(prompt) = email_cfg.daily_prompt.clone() {
                let sender = SendEmail::new(email_cfg.clone());
                run_daily_greeting(&schedules, llm.as_ref(), &sender, &prompt, &email_cfg.default_recipient).await;
            }
        });
    }

    // Email scheduler: replay overdue tasks once on startup (skip one-shots,
    // advance recurrences), then wake every 30s and fire whatever's due.
    {
        let sender = SendEmail::new(config.email.clone());
        let runner = ScheduleRunner::new(schedules, sender);
        runner.replay_on_startup().await;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(30));
            loop {
                interval.tick().await;
                runner.tick().await;
            }
        });
    }
    tracing::info!("schedule runner started (30s tick)");

    // Session lock pruning: the same idle-permit GC the ancestor gateway runs.
    {
        let session_locks = session_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                session_locks.prune_idle();
            }
        });
    }

    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding to {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "listening");

    axum::serve(listener, app).await.context("axum server error")?;

    Ok(())
}
