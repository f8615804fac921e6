//! `vaultmind chat` — single-message or interactive chat about the notes.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use vaultmind_agent::{ChatReply, ChatSession};
use vaultmind_config::{AppConfig, ChatMode};
use vaultmind_core::event::DomainEvent;
use vaultmind_core::message::{ContentPart, Message, MessageContent};
use vaultmind_vectors::ContentRetriever;

use super::{open_vault, resolve_notes_dir, tool_result_role_name};

pub async fn run(
    message: Option<String>,
    mode: Option<ChatMode>,
    notes: Option<PathBuf>,
    images: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let mode = mode.unwrap_or(config.agent.mode);
    let notes_dir = resolve_notes_dir(&config, notes)?;

    eprint!("  Indexing notes...");
    let vault = open_vault(&config, &notes_dir).await?;
    eprint!("\r                    \r");

    let retriever = Arc::new(
        ContentRetriever::new(vault.store.clone())
            .with_min_similarity_score(config.vectors.min_similarity_score)
            .with_max_k(config.vectors.max_k),
    );
    let tools = Arc::new(vaultmind_tools::default_registry(
        vault.adapter.clone(),
        config.llm.model.clone(),
        retriever.clone(),
        Some(vault.embedder.clone()),
    )?);
    let tool_names = tools.names().join(", ");
    tracing::debug!(?mode, tools = %tool_names, "Chat session configured");

    let mut session = ChatSession::from_config(
        &config,
        mode,
        vault.adapter.clone(),
        retriever,
        tools,
        Some(vault.events.clone()),
    );

    // Show tool activity as it happens
    let mut events = vault.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DomainEvent::ToolExecuted {
                tool_name,
                success,
                duration_ms,
                ..
            } = event.as_ref()
            {
                let status = if *success { "ok" } else { "failed" };
                eprintln!("  [{tool_name}] {status} ({duration_ms} ms)");
            }
        }
    });

    if let Some(text) = message {
        // Single message mode
        let input = user_message(&text, &images).await?;
        eprint!("  Thinking...");
        let reply = session.send_message(input, &CancellationToken::new()).await?;
        eprint!("\r              \r");
        print_reply(&reply);
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  VaultMind — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.llm.provider);
    println!("  Model:     {}", config.llm.model);
    println!("  Mode:      {mode:?}");
    println!("  Notes:     {} ({} passages)", notes_dir.display(), vault.passages);
    if mode == ChatMode::Agent {
        println!("  Tools:     {tool_names}");
        println!("  Results:   sent as the '{}' role", tool_result_role_name(&config));
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or press Ctrl+C to quit.");
    println!();

    let shutdown = CancellationToken::new();
    let on_ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut attach = images;

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        // Images go with the first message only
        let input = user_message(text, &std::mem::take(&mut attach)).await?;
        let cancel = shutdown.child_token();

        eprint!("  ...");
        let result = session.send_message(input, &cancel).await;
        eprint!("\r     \r");
        match result {
            Ok(reply) => {
                println!();
                print_reply(&reply);
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// A user message with `images` read from disk and attached.
async fn user_message(
    text: &str,
    images: &[PathBuf],
) -> Result<Message, Box<dyn std::error::Error>> {
    if images.is_empty() {
        return Ok(Message::user(text));
    }

    let mut parts = vec![ContentPart::text(text)];
    for path in images {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read image {}: {e}", path.display()))?;
        parts.push(ContentPart::image(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        ));
    }
    Ok(Message::user(MessageContent::Parts(parts)))
}

fn print_reply(reply: &ChatReply) {
    for line in reply.answer.lines() {
        println!("  Assistant > {line}");
    }
    if !reply.sources.is_empty() {
        println!();
        println!("  Sources:");
        for source in &reply.sources {
            println!("    - {source}");
        }
    }
}
