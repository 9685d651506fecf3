//! Terminal chat against a local orchestrator.
//!
//! Runs turns in-process with the same wiring as the server, keeping one
//! conversation id for the whole session. Type `/sair` to quit.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use juridico_core::common::document::extract_text;
use juridico_core::common::ConversationId;
use juridico_core::domains::audit::{AuditMode, AuditWorker, Judge};
use juridico_core::domains::workflow::{Orchestrator, TurnRequest, WorkflowSettings};
use juridico_core::kernel::ServerDeps;
use juridico_core::Config;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chat_cli")]
#[command(about = "Chat with the legal assistant from the terminal")]
struct Cli {
    /// Continue an existing conversation
    #[arg(long)]
    conversation_id: Option<ConversationId>,

    /// Attach a text document to the first question
    #[arg(long)]
    document: Option<PathBuf>,

    /// Audit each answer inline and revise failing drafts
    #[arg(long)]
    blocking_audit: bool,

    /// Ask a single question and exit
    #[arg(long, short)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,juridico_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = match &config.database_url {
        Some(url) => Some(
            PgPool::connect(url)
                .await
                .context("Failed to connect to database")?,
        ),
        None => None,
    };

    let deps = ServerDeps::from_config(&config, pool)?;
    let mut settings = WorkflowSettings::from(&config);
    if cli.blocking_audit {
        settings.audit_mode = AuditMode::Blocking;
    }

    let shutdown = CancellationToken::new();
    let judge = Arc::new(Judge::new(
        deps.ai.clone(),
        settings.audit_model.clone(),
        settings.model_timeout,
    ));
    let (dispatcher, _audit_handle) =
        AuditWorker::spawn(judge.clone(), deps.audit_sink.clone(), shutdown.clone());
    let orchestrator = Orchestrator::initialize(&deps, settings, judge, dispatcher).await;

    let mut document = match &cli.document {
        Some(path) => Some(read_document(path)?),
        None => None,
    };
    let conversation_id = cli.conversation_id.unwrap_or_default();
    println!("Conversa {}", conversation_id);

    if let Some(question) = cli.question {
        ask(&orchestrator, conversation_id, question, document.take()).await;
        shutdown.cancel();
        return Ok(());
    }

    let stdin = std::io::stdin();
    loop {
        print!("\nVocê: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "/sair" {
            break;
        }

        ask(&orchestrator, conversation_id, question.to_string(), document.take()).await;
    }

    shutdown.cancel();
    Ok(())
}

async fn ask(
    orchestrator: &Orchestrator,
    conversation_id: ConversationId,
    question: String,
    document: Option<String>,
) {
    let mut request = TurnRequest::new(question).in_conversation(conversation_id);
    request.document = document;

    match orchestrator.run_turn(request).await {
        Ok(outcome) => {
            println!("\n[{}]\n{}", outcome.label, outcome.response);
            if let Some(audit) = outcome.audit {
                println!(
                    "\n(auditoria: fundamentação {}, utilidade {}, protocolo visual {}, tom {}; revisões {})",
                    audit.grounding, audit.usefulness, audit.visual_protocol, audit.tone, outcome.revisions
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Turn failed");
            println!("\n{}", e.user_message());
        }
    }
}

fn read_document(path: &PathBuf) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    Ok(extract_text(&bytes).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Document is not readable text");
        e.sentinel().to_string()
    }))
}
