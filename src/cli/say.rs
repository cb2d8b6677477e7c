//! TUI-less one-shot prompt: stream the answer straight to stdout.

use std::error::Error;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, SendMessageRequest};
use crate::core::chat_stream::{ChatStreamService, StreamEvent, StreamParams};
use crate::core::config::Config;
use crate::core::message::Message;

pub async fn run_say(
    prompt: String,
    model: Option<String>,
    provider: Option<String>,
    base_url: String,
    config: &Config,
) -> Result<(), Box<dyn Error>> {
    if prompt.trim().is_empty() {
        eprintln!("Usage: chatbowl say <prompt>");
        std::process::exit(2);
    }

    let client = ApiClient::new(base_url.clone());
    let model = match model.or_else(|| config.default_model.clone()) {
        Some(model) if !model.is_empty() => model,
        _ => client
            .models()
            .await?
            .into_iter()
            .next()
            .ok_or("no models installed on the backend")?,
    };

    let provider = provider.or_else(|| config.default_provider.clone());
    let api_key = provider
        .as_deref()
        .and_then(|id| config.api_key_for(id))
        .cloned();
    let request = SendMessageRequest {
        model_name: model,
        history: vec![Message::user(prompt)],
        provider,
        api_key,
        persona: config.persona.clone(),
    };

    let (service, mut rx) = ChatStreamService::new();
    service.spawn_stream(StreamParams {
        client: client.http().clone(),
        base_url,
        request,
        cancel_token: CancellationToken::new(),
        stream_id: 1,
    });

    let mut stdout = io::stdout();
    let mut failed = false;
    while let Some((event, _)) = rx.recv().await {
        match event {
            StreamEvent::Record(record) => {
                if let Some(content) = record.content {
                    print!("{content}");
                    stdout.flush()?;
                }
                if let Some(error) = record.error {
                    eprintln!("\nerror: {error}");
                    failed = true;
                }
                if record.done {
                    break;
                }
            }
            StreamEvent::TransportFailed(text) => {
                eprintln!("{text}");
                failed = true;
                break;
            }
            StreamEvent::Closed => break,
        }
    }
    println!();

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
