// SPDX-License-Identifier: MIT
//! The `agentx chat` client (spec §6.3): a thin terminal chat loop over the
//! gateway's HTTP control surface and WebSocket event channel. Grounded in
//! the teacher's `sven-node-client` WS-client stack (`tokio-tungstenite` +
//! `futures-util`), kept plain-text rather than a full `sven-p2p-client`-style
//! TUI since this binary's composition-root role carries no business logic
//! of its own.
use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use agentx_gateway::WsEnvelope;
use agentx_image::Image;
use agentx_types::Definition;
use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::tungstenite::Message;

fn next_request_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("cli-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Runs the interactive chat loop until the user quits or the connection
/// drops. `definition_name` must already be registered on the gateway
/// (`PUT /definitions`); this starts a fresh Image/Agent from it every run.
pub async fn run(http_base: &str, ws_url: &str, definition_name: &str, theme: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::new();

    let definition = fetch_definition(&client, http_base, definition_name).await?;
    let image = Image::from_definition(definition);
    let agent_id = start_agent(&client, http_base, &image).await?;

    println!("agentx chat — connected as {agent_id} (theme: {theme})");
    println!("Type a message and press Enter. Ctrl-D or \"exit\" to quit.\n");

    let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
        .await
        .with_context(|| format!("connecting to {ws_url}"))?;
    let (mut write, mut read) = ws_stream.split();

    let reader_agent_id = agent_id.clone();
    tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => print_event(text.as_ref(), &reader_agent_id),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();
        let Some(line) = stdin.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let frame = WsEnvelope::response(
            next_request_id(),
            "user_message_request",
            json!({ "agentId": agent_id, "content": line }),
        );
        let text = serde_json::to_string(&frame)?;
        write.send(Message::Text(text.into())).await?;
    }

    Ok(())
}

/// Prints one outbound event belonging to `agent_id`: streamed text as it
/// arrives, a newline on `message_stop`, and errors to stdout.
fn print_event(text: &str, agent_id: &str) {
    let Ok(envelope) = serde_json::from_str::<WsEnvelope>(text) else {
        return;
    };
    if envelope.agent_id.as_deref() != Some(agent_id) {
        return;
    }
    match envelope.event_type.as_str() {
        "text_delta" => {
            if let Some(delta) = envelope.data.get("text").and_then(|v| v.as_str()) {
                print!("{delta}");
                std::io::stdout().flush().ok();
            }
        }
        "message_stop" => println!(),
        "error" => {
            if let Some(message) = envelope.data.get("message").and_then(|v| v.as_str()) {
                println!("\n[error] {message}");
            }
        }
        _ => {}
    }
}

async fn fetch_definition(client: &reqwest::Client, http_base: &str, name: &str) -> anyhow::Result<Definition> {
    let url = format!("{http_base}/definitions/{name}");
    let response = client.get(&url).send().await.with_context(|| format!("GET {url}"))?;
    if !response.status().is_success() {
        bail!("definition {name:?} not found on {http_base} (register it with PUT /definitions first)");
    }
    Ok(response.json().await?)
}

async fn start_agent(client: &reqwest::Client, http_base: &str, image: &Image) -> anyhow::Result<String> {
    let put_url = format!("{http_base}/images");
    let created: Image = client
        .put(&put_url)
        .json(image)
        .send()
        .await
        .with_context(|| format!("PUT {put_url}"))?
        .json()
        .await?;

    let run_url = format!("{http_base}/images/{}/run", created.image_id.as_str());
    let body: serde_json::Value = client
        .post(&run_url)
        .json(&json!({}))
        .send()
        .await
        .with_context(|| format!("POST {run_url}"))?
        .json()
        .await?;

    body.get("agentId")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .context("run response missing agentId")
}
