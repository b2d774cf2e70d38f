use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clearpath_call::care::{CoverageReport, StakeholderRole};
use clearpath_call::content::CareContent;
use clearpath_call::session::{
    CallMode, CallSession, SessionConfig, SessionEvent, SessionHandle, SessionStatus,
};
use clearpath_call::speech::{NatsSpeechSource, SpeechRecognizer, SpeechSource};
use clearpath_call::{create_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "clearpath-call")]
#[command(about = "Return-to-work call assistant: C.A.R.E. coverage, red flags and demo calls")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/clearpath")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve,

    /// Play a simulated call in the terminal
    Demo {
        /// worker, employer, medical or legal
        #[arg(short, long, default_value = "worker")]
        role: StakeholderRole,

        /// Question to inject into the call
        #[arg(short, long)]
        inject: Option<String>,

        /// Seconds into the call before the question is injected
        #[arg(long, default_value = "10")]
        inject_after: u64,
    },

    /// Run a live call fed by the STT service until Ctrl-C
    Live {
        #[arg(short, long, default_value = "worker")]
        role: StakeholderRole,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    let content = Arc::new(cfg.load_content()?);

    info!("ClearPath call engine v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(&cfg, content).await,
        Command::Demo {
            role,
            inject,
            inject_after,
        } => demo(&cfg, content, role, inject, Duration::from_secs(inject_after)).await,
        Command::Live { role } => live(&cfg, content, role).await,
    }
}

async fn serve(cfg: &Config, content: Arc<CareContent>) -> Result<()> {
    let speech: Arc<dyn SpeechSource> = Arc::new(NatsSpeechSource::new(&cfg.speech.nats_url));
    let state = AppState::new(content, cfg.session_defaults()).with_speech_source(speech);
    let app = create_router(state);

    let addr = cfg.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server failed")
}

async fn demo(
    cfg: &Config,
    content: Arc<CareContent>,
    role: StakeholderRole,
    inject: Option<String>,
    inject_after: Duration,
) -> Result<()> {
    let config = SessionConfig {
        role,
        mode: CallMode::Demo,
        ..cfg.session_defaults()
    };

    info!("Demo call with {} ({})", role.label(), config.call_id);

    let (session, events) = start_and_subscribe(config, content, None).await;
    print_transcript(&session).await?;

    let injector = inject.map(|question| {
        let session = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inject_after).await;
            match session.inject(question.as_str()).await {
                Ok(outcome) => info!("Injected {:?}: {:?}", question, outcome),
                Err(e) => warn!("Injection failed: {}", e),
            }
        })
    });

    follow(events, true).await;

    if let Some(injector) = injector {
        injector.abort();
    }
    finish(&session).await
}

async fn live(
    cfg: &Config,
    content: Arc<CareContent>,
    role: StakeholderRole,
) -> Result<()> {
    let config = SessionConfig {
        role,
        mode: CallMode::Live,
        ..cfg.session_defaults()
    };

    info!(
        "Live call with {} ({}), transcripts from {}",
        role.label(),
        config.call_id,
        cfg.speech.nats_url
    );

    let recognizer = NatsSpeechSource::new(&cfg.speech.nats_url).recognizer(&config.call_id);
    let (session, events) = start_and_subscribe(config, content, Some(recognizer)).await;

    follow(events, false).await;
    finish(&session).await
}

async fn start_and_subscribe(
    config: SessionConfig,
    content: Arc<CareContent>,
    recognizer: Option<Box<dyn SpeechRecognizer>>,
) -> (SessionHandle, broadcast::Receiver<SessionEvent>) {
    let session = CallSession::start(config, content, recognizer).await;
    let events = session.subscribe();
    (session, events)
}

/// Lines appended before we subscribed (demo opening lines)
async fn print_transcript(session: &SessionHandle) -> Result<()> {
    for line in session.transcript().await? {
        println!("{:>10}: {}", line.speaker, line.text);
    }
    Ok(())
}

/// Print events until the script finishes (demo) or Ctrl-C
async fn follow(mut events: broadcast::Receiver<SessionEvent>, stop_on_script_end: bool) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::LineAppended { line, .. }) => {
                    println!("{:>10}: {}", line.speaker, line.text);
                }
                Ok(SessionEvent::InterimUpdated { line }) => {
                    println!("{:>10}… {}", line.speaker, line.text);
                }
                Ok(SessionEvent::RedFlagRaised { alert }) => {
                    println!("  ⚠ RED FLAG: {}", alert.message);
                }
                Ok(SessionEvent::ScriptFinished) if stop_on_script_end => break,
                Ok(SessionEvent::ScriptFinished) => {}
                Ok(SessionEvent::Ended { .. }) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Skipped {} session events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, ending call");
                break;
            }
        }
    }
}

async fn finish(session: &SessionHandle) -> Result<()> {
    let status = session.end().await?;
    print_summary(&status);
    Ok(())
}

fn print_summary(status: &SessionStatus) {
    println!();
    println!(
        "Call {} ended after {} ({} lines)",
        status.call_id, status.elapsed, status.transcript_lines
    );
    print_coverage(&status.coverage);
    println!("Completeness: {}%", status.completeness);
    println!("Suggested next pillar: {}", status.suggested_pillar);
    if !status.red_flags.is_empty() {
        println!("Red flags:");
        for alert in &status.red_flags {
            println!("  - {}", alert.message);
        }
    }
}

fn print_coverage(coverage: &CoverageReport) {
    for pillar in &coverage.pillars {
        println!(
            "  {} {:<12} {:>3.0}% {:?}",
            pillar.key,
            pillar.label,
            pillar.score * 100.0,
            pillar.state
        );
    }
}
