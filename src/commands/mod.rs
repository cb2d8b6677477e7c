//! Slash commands. Input that does not start with `/` (or names no known
//! command) is sent to the model as a message. Handlers are synchronous;
//! anything that must talk to the backend returns an `AsyncAction`, which the
//! event loop stages on a spawned task and folds back in when it lands.

mod registry;

pub use registry::{all_commands, CommandInvocation};

use std::io::Write;

use base64::Engine;
use chrono::Utc;
use tokio::sync::mpsc;

use crate::api::{
    ApiClient, ExecuteCodeRequest, GenerateImageRequest, PersonasResponse, ProvidersResponse,
};
use crate::core::app::App;
use crate::core::message::Message;
use crate::core::config::Config;
use crate::core::search::search_chats;
use crate::core::store::data_dir;
use crate::core::tokens::chat_stats;
use crate::ui::markdown::extract_code_blocks;
use crate::utils::clipboard::copy_to_clipboard;
use crate::utils::speech::{speak, speakable_text};

pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Exit,
    Async(AsyncAction),
}

/// Backend round-trips staged by a handler and awaited by the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncAction {
    ListModels,
    ListRunningModels,
    LoadModel(String),
    StopModel(String),
    ListProviders,
    ListPersonas,
    ListTemplates,
    ApplyTemplate(String),
    GenerateImage(String),
    RunCode(Option<usize>),
    SuggestReplies,
    Summarize,
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    if let Some(command) = registry::find_command(command_name) {
        let invocation = CommandInvocation {
            input: trimmed,
            args,
        };
        (command.handler)(app, invocation)
    } else {
        CommandResult::ProcessAsMessage(input.to_string())
    }
}

/// Inputs for one backend round-trip, captured from the app before the task
/// is spawned so the I/O runs without touching shared state.
pub enum PreparedAction {
    ListModels,
    ListRunningModels,
    LoadModel(String),
    StopModel(String),
    ListProviders,
    ListPersonas,
    ListTemplates,
    ApplyTemplate(String),
    GenerateImage(String),
    RunCode(ExecuteCodeRequest),
    SuggestReplies(String),
    Summarize(Vec<Message>),
}

/// What a round-trip produced. Applied to the app on the UI task once the
/// event loop drains it from the action channel.
pub enum ActionOutcome {
    Notice(String),
    Failure(String),
    Providers(ProvidersResponse),
    Personas(PersonasResponse),
    TemplateLoaded {
        name: String,
        prompt: String,
    },
    ImageReady {
        prompt: String,
        model: Option<String>,
        path: Option<String>,
        url: Option<String>,
        note: Option<String>,
    },
}

/// Stage a backend round-trip on a spawned task. The UI task returns
/// immediately; the outcome lands on `tx` and is folded back in by
/// `apply_action_outcome`, so drawing, the timer tick, and Esc stay live
/// while the call is in flight.
pub fn dispatch_async_action(
    app: &mut App,
    action: AsyncAction,
    tx: &mpsc::UnboundedSender<ActionOutcome>,
) {
    let Some(prepared) = prepare_action(app, action) else {
        return;
    };
    let client = app.client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(perform_action(&client, prepared).await);
    });
}

/// Capture everything the round-trip needs from the app. Returns `None`
/// (after surfacing the error) when the action cannot even be staged.
fn prepare_action(app: &mut App, action: AsyncAction) -> Option<PreparedAction> {
    let prepared = match action {
        AsyncAction::ListModels => PreparedAction::ListModels,
        AsyncAction::ListRunningModels => PreparedAction::ListRunningModels,
        AsyncAction::LoadModel(name) => PreparedAction::LoadModel(name),
        AsyncAction::StopModel(name) => PreparedAction::StopModel(name),
        AsyncAction::ListProviders => PreparedAction::ListProviders,
        AsyncAction::ListPersonas => PreparedAction::ListPersonas,
        AsyncAction::ListTemplates => PreparedAction::ListTemplates,
        AsyncAction::ApplyTemplate(id) => PreparedAction::ApplyTemplate(id),
        AsyncAction::GenerateImage(prompt) => PreparedAction::GenerateImage(prompt),
        AsyncAction::RunCode(index) => {
            let index = match app.session.resolve_message_index(index) {
                Ok(i) => i,
                Err(e) => {
                    app.notify_error(e);
                    return None;
                }
            };
            let blocks = extract_code_blocks(&app.session.chat.history[index].content);
            let Some((lang, code)) = blocks.into_iter().next() else {
                app.notify_error(format!("message {index} has no code block"));
                return None;
            };
            PreparedAction::RunCode(ExecuteCodeRequest {
                code,
                // Unlabeled fences are overwhelmingly Python in practice.
                language: if lang.is_empty() {
                    "python".to_string()
                } else {
                    lang
                },
            })
        }
        AsyncAction::SuggestReplies => {
            let Some(index) = app.session.last_assistant_index() else {
                app.notify_error("no assistant reply to suggest from");
                return None;
            };
            PreparedAction::SuggestReplies(app.session.chat.history[index].content.clone())
        }
        AsyncAction::Summarize => PreparedAction::Summarize(app.session.api_history()),
    };
    Some(prepared)
}

/// The I/O half: runs on a spawned task, no app access.
async fn perform_action(client: &ApiClient, action: PreparedAction) -> ActionOutcome {
    match action {
        PreparedAction::ListModels => match client.models().await {
            Ok(models) if models.is_empty() => {
                ActionOutcome::Notice("No models installed. Pull one with `ollama pull`.".into())
            }
            Ok(models) => {
                ActionOutcome::Notice(format!("Available models:\n{}", models.join("\n")))
            }
            Err(e) => ActionOutcome::Failure(format!("model list failed: {e}")),
        },
        PreparedAction::ListRunningModels => match client.running_models().await {
            Ok(response) if response.models.is_empty() => {
                ActionOutcome::Notice("No models loaded in memory.".into())
            }
            Ok(response) => {
                let mut out = String::from("Running models:");
                for model in &response.models {
                    out.push('\n');
                    out.push_str(&model.name);
                    if let Some(size) = model.size {
                        out.push_str(&format!(" ({:.1} GB)", size as f64 / 1e9));
                    }
                }
                ActionOutcome::Notice(out)
            }
            Err(e) => ActionOutcome::Failure(format!("running-model list failed: {e}")),
        },
        PreparedAction::LoadModel(name) => match client.load_model(&name).await {
            Ok(()) => ActionOutcome::Notice(format!("Model loaded: {name}")),
            Err(e) => ActionOutcome::Failure(format!("load failed: {e}")),
        },
        PreparedAction::StopModel(name) => match client.stop_model(&name).await {
            Ok(()) => ActionOutcome::Notice(format!("Model stopped: {name}")),
            Err(e) => ActionOutcome::Failure(format!("stop failed: {e}")),
        },
        PreparedAction::ListProviders => match client.providers().await {
            Ok(response) => ActionOutcome::Providers(response),
            Err(e) => ActionOutcome::Failure(format!("provider list failed: {e}")),
        },
        PreparedAction::ListPersonas => match client.personas().await {
            Ok(response) => ActionOutcome::Personas(response),
            Err(e) => ActionOutcome::Failure(format!("persona list failed: {e}")),
        },
        PreparedAction::ListTemplates => match client.templates().await {
            Ok(response) if response.templates.is_empty() => {
                ActionOutcome::Notice("The backend reports no templates.".into())
            }
            Ok(response) => {
                let mut out = String::from("Templates:");
                for template in &response.templates {
                    out.push_str(&format!("\n{} - {}", template.id, template.name));
                    if let Some(category) = &template.category {
                        out.push_str(&format!(" [{category}]"));
                    }
                }
                out.push_str("\nUse /template <id> to load one into the input box.");
                ActionOutcome::Notice(out)
            }
            Err(e) => ActionOutcome::Failure(format!("template list failed: {e}")),
        },
        PreparedAction::ApplyTemplate(id) => match client.templates().await {
            Ok(response) => {
                match response
                    .templates
                    .iter()
                    .find(|t| t.id.eq_ignore_ascii_case(&id))
                {
                    Some(template) => ActionOutcome::TemplateLoaded {
                        name: template.name.clone(),
                        prompt: template.prompt.clone(),
                    },
                    None => {
                        let available: Vec<&str> =
                            response.templates.iter().map(|t| t.id.as_str()).collect();
                        ActionOutcome::Failure(format!(
                            "Template '{}' not found. Available templates: {}",
                            id,
                            available.join(", ")
                        ))
                    }
                }
            }
            Err(e) => ActionOutcome::Failure(format!("template fetch failed: {e}")),
        },
        PreparedAction::GenerateImage(prompt) => {
            let request = GenerateImageRequest {
                prompt: prompt.clone(),
                model: None,
            };
            match client.generate_image(&request).await {
                Ok(response) => {
                    if let Some(error) = response.error {
                        if response.loading {
                            ActionOutcome::Notice(
                                "Image model is still loading; try again in a moment.".into(),
                            )
                        } else {
                            ActionOutcome::Failure(error)
                        }
                    } else if let Some(data) = response.image_base64 {
                        match save_generated_image(&data) {
                            Ok(path) => ActionOutcome::ImageReady {
                                prompt,
                                model: response.model,
                                path: Some(path),
                                url: None,
                                note: response.note,
                            },
                            Err(e) => ActionOutcome::Failure(e),
                        }
                    } else if let Some(url) = response.image_url {
                        ActionOutcome::ImageReady {
                            prompt,
                            model: response.model,
                            path: None,
                            url: Some(url),
                            note: response.note,
                        }
                    } else {
                        ActionOutcome::Failure("backend returned no image data".into())
                    }
                }
                Err(e) => ActionOutcome::Failure(format!("image generation failed: {e}")),
            }
        }
        PreparedAction::RunCode(request) => match client.execute_code(&request).await {
            Ok(result) => {
                if result.success {
                    ActionOutcome::Notice(format!("Output:\n{}", result.output.trim_end()))
                } else {
                    ActionOutcome::Failure(
                        result
                            .error
                            .unwrap_or_else(|| "execution failed".to_string()),
                    )
                }
            }
            Err(e) => ActionOutcome::Failure(format!("code execution failed: {e}")),
        },
        PreparedAction::SuggestReplies(content) => match client.suggest_replies(&content).await {
            Ok(suggestions) if suggestions.is_empty() => {
                ActionOutcome::Notice("No suggestions came back.".into())
            }
            Ok(suggestions) => {
                let mut out = String::from("Suggested replies:");
                for (i, suggestion) in suggestions.iter().take(3).enumerate() {
                    out.push_str(&format!("\n{}. {}", i + 1, suggestion));
                }
                ActionOutcome::Notice(out)
            }
            Err(e) => ActionOutcome::Failure(format!("suggestions failed: {e}")),
        },
        PreparedAction::Summarize(history) => match client.summarize(history).await {
            Ok(summary) => ActionOutcome::Notice(format!("Summary: {summary}")),
            Err(e) => ActionOutcome::Failure(format!("summarize failed: {e}")),
        },
    }
}

/// The mutation half: folds a finished round-trip back into the app.
pub fn apply_action_outcome(app: &mut App, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Notice(text) => app.notify(text),
        ActionOutcome::Failure(text) => app.notify_error(text),
        ActionOutcome::Providers(response) => {
            app.providers
                .set_providers(response.providers, response.current);
            if app.providers.list().is_empty() {
                app.notify("The backend reports no providers.");
                return;
            }
            let current = app.providers.current_id().map(str::to_string);
            let mut out = String::from("Providers:");
            for provider in app.providers.list() {
                out.push_str(&format!("\n{} - {}", provider.id, provider.name));
                if provider.needs_key {
                    out.push_str(" (needs API key)");
                }
                if current.as_deref() == Some(provider.id.as_str()) {
                    out.push_str(" [current]");
                }
            }
            app.notify(out);
        }
        ActionOutcome::Personas(response) => {
            app.personas.set_personas(response.personas);
            if app.personas.list().is_empty() {
                app.notify("The backend reports no personas.");
                return;
            }
            let mut out = String::from("Personas:");
            for persona in app.personas.list() {
                out.push_str(&format!("\n{} - {}", persona.id, persona.name));
                if let Some(style) = &persona.style {
                    out.push_str(&format!(" ({style})"));
                }
            }
            app.notify(out);
        }
        ActionOutcome::TemplateLoaded { name, prompt } => {
            app.set_input_text(&prompt);
            app.notify(format!("Template '{name}' loaded; edit and send."));
        }
        ActionOutcome::ImageReady {
            prompt,
            model,
            path,
            url,
            note,
        } => {
            let _ = app
                .images
                .record(&prompt, model.as_deref(), path.clone(), url.clone());
            let mut text = match (&path, &url) {
                (Some(path), _) => format!("Image saved to {path}"),
                (None, Some(url)) => format!("Image available at {url}"),
                (None, None) => "backend returned no image data".to_string(),
            };
            if let Some(note) = note {
                text.push_str(&format!("\n{note}"));
            }
            app.notify(text);
        }
    }
}

fn save_generated_image(data: &str) -> Result<String, String> {
    let bytes = base64::prelude::BASE64_STANDARD
        .decode(data)
        .map_err(|e| format!("invalid image data: {e}"))?;
    let dir = data_dir().join("images");
    std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let path = dir.join(format!(
        "chatbowl-image-{}.png",
        Utc::now().format("%Y%m%d-%H%M%S")
    ));
    std::fs::write(&path, bytes).map_err(|e| e.to_string())?;
    Ok(path.to_string_lossy().into_owned())
}

/// Apply a config change and try to persist it. Callers append "(unsaved)"
/// to their status text when the write failed.
fn persist_config(app: &mut App, change: impl FnOnce(&mut Config)) -> bool {
    change(&mut app.config);
    app.config.save().is_ok()
}

pub(super) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let mut out = String::from("Commands:");
    for command in all_commands() {
        out.push_str(&format!("\n/{} - {}", command.name, command.help));
    }
    out.push_str("\nAnything else is sent to the model.");
    app.notify(out);
    CommandResult::Continue
}

pub(super) fn handle_save(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if !invocation.args.is_empty() {
        app.session.chat.title = invocation.args.to_string();
    }
    app.save_current_chat(true);
    CommandResult::Continue
}

pub(super) fn handle_chats(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    match app.chat_store.load_all() {
        Ok(chats) if chats.is_empty() => app.notify("No saved chats."),
        Ok(chats) => {
            let mut out = String::from("Saved chats:");
            for chat in &chats {
                out.push_str(&format!(
                    "\n{}  {} ({} messages)",
                    chat.id,
                    chat.display_title(),
                    chat.history.len()
                ));
            }
            app.notify(out);
        }
        Err(e) => app.notify_error(format!("could not read chats: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_load(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /load <id>");
        return CommandResult::Continue;
    }
    match app.chat_store.find(invocation.args) {
        Ok(Some(chat)) => {
            let title = chat.display_title();
            app.open_chat(chat);
            app.notify(format!("Loaded: {title}"));
        }
        Ok(None) => app.notify_error(format!("no saved chat with id {}", invocation.args)),
        Err(e) => app.notify_error(format!("load failed: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_rename(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /rename <title>");
        return CommandResult::Continue;
    }
    let title = invocation.args.to_string();
    app.session.chat.title = title.clone();
    match app.chat_store.rename_chat(&app.session.chat.id, &title) {
        Ok(true) => app.notify(format!("Renamed to: {title}")),
        Ok(false) => {
            // Not in the store yet; the new title rides along on the next save.
            app.session.dirty = true;
            app.notify(format!("Renamed to: {title} (not saved yet)"));
        }
        Err(e) => app.notify_error(format!("rename failed: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_delchat(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /delchat <id>");
        return CommandResult::Continue;
    }
    match app.chat_store.delete_chat(invocation.args) {
        Ok(true) => app.notify(format!("Deleted chat {}", invocation.args)),
        Ok(false) => app.notify_error(format!("no saved chat with id {}", invocation.args)),
        Err(e) => app.notify_error(format!("delete failed: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_new(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.new_chat(false);
    app.notify("Started a new chat.");
    CommandResult::Continue
}

pub(super) fn handle_temp(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.new_chat(true);
    app.notify("Temporary chat: nothing will be saved.");
    CommandResult::Continue
}

pub(super) fn handle_export(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let (filename, overwrite) = if invocation.args.is_empty() {
        let timestamp = Utc::now().format("%Y-%m-%d").to_string();
        (format!("chatbowl-export-{timestamp}.json"), false)
    } else {
        (invocation.args.to_string(), true)
    };
    match write_export(app, &filename, overwrite) {
        Ok(()) => app.notify(format!("Exported to {filename}")),
        Err(e) => app.notify_error(format!("export failed: {e}")),
    }
    CommandResult::Continue
}

fn write_export(app: &App, filename: &str, overwrite: bool) -> Result<(), String> {
    let json = serde_json::to_string_pretty(&app.session.chat.to_export())
        .map_err(|e| e.to_string())?;
    let mut open = std::fs::OpenOptions::new();
    open.write(true);
    if overwrite {
        open.create(true).truncate(true);
    } else {
        // Default name: refuse to clobber an earlier export from the same day.
        open.create_new(true);
    }
    let mut file = open.open(filename).map_err(|e| e.to_string())?;
    file.write_all(json.as_bytes()).map_err(|e| e.to_string())?;
    Ok(())
}

pub(super) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.session.clear_history();
    app.notify("History cleared.");
    CommandResult::Continue
}

pub(super) fn handle_edit(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut parts = invocation.args.splitn(2, ' ');
    let index = match parts.next().unwrap_or("").parse::<usize>() {
        Ok(index) => index,
        Err(_) => {
            app.notify("Usage: /edit <index> [new text]");
            return CommandResult::Continue;
        }
    };
    match parts.next().map(str::trim).filter(|t| !t.is_empty()) {
        Some(text) => {
            let result = app.session.edit_message(index, text.to_string());
            match result {
                Ok(()) => {
                    let _ = app.log.rewrite_without(&app.session.chat.history, None);
                    app.notify(format!("Message {index} updated."));
                }
                Err(e) => app.notify_error(e),
            }
        }
        // Bare index: pull the user turn back into the input box for resending.
        None => {
            if let Err(e) = app.edit_into_input(index) {
                app.notify_error(e);
            }
        }
    }
    CommandResult::Continue
}

pub(super) fn handle_delete(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match invocation.args.parse::<usize>() {
        Ok(index) => match app.delete_message(index) {
            Ok(()) => app.notify(format!("Message {index} deleted.")),
            Err(e) => app.notify_error(e),
        },
        Err(_) => app.notify("Usage: /delete <index>"),
    }
    CommandResult::Continue
}

pub(super) fn handle_regen(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let index = if invocation.args.is_empty() {
        None
    } else {
        match invocation.args.parse::<usize>() {
            Ok(index) => Some(index),
            Err(_) => {
                app.notify("Usage: /regen [index]");
                return CommandResult::Continue;
            }
        }
    };
    if let Err(e) = app.regenerate(index) {
        app.notify_error(e);
    }
    CommandResult::Continue
}

pub(super) fn handle_continue(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.session.chat.history.is_empty() {
        app.notify_error("Nothing to continue yet.");
        return CommandResult::Continue;
    }
    app.continue_response();
    CommandResult::Continue
}

pub(super) fn handle_system(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        match app.system_prompt() {
            Some(prompt) => {
                let text = format!("System prompt: {prompt}");
                app.notify(text);
            }
            None => app.notify("No system prompt set. Use /system <prompt> or /preset <id>."),
        }
    } else {
        app.set_system_prompt(invocation.args.to_string());
        app.notify("System prompt set.");
    }
    CommandResult::Continue
}

pub(super) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = if app.session.chat.model.is_empty() {
            "none".to_string()
        } else {
            app.session.chat.model.clone()
        };
        app.notify(format!("Model: {current}"));
    } else {
        let model = invocation.args.to_string();
        app.session.chat.model = model.clone();
        app.session.dirty = true;
        app.notify(format!("Model set: {model}"));
    }
    CommandResult::Continue
}

pub(super) fn handle_models(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::ListModels)
}

pub(super) fn handle_running(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::ListRunningModels)
}

pub(super) fn handle_loadmodel(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /loadmodel <name>");
        return CommandResult::Continue;
    }
    CommandResult::Async(AsyncAction::LoadModel(invocation.args.to_string()))
}

pub(super) fn handle_stopmodel(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /stopmodel <name>");
        return CommandResult::Continue;
    }
    let name = invocation.args.to_string();
    // Stopping the model the session is streaming from also ends that stream;
    // the backend side would die mid-response anyway.
    if app.session.is_streaming && name == app.session.chat.model {
        app.session.interrupt_stream();
    }
    CommandResult::Async(AsyncAction::StopModel(name))
}

pub(super) fn handle_provider(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = app.providers.current_display();
        app.notify(format!("Provider: {current}"));
        return CommandResult::Continue;
    }
    let result = app
        .providers
        .set_current(invocation.args)
        .map(|p| p.name.clone());
    match result {
        Ok(name) => {
            let missing = app
                .providers
                .missing_key(&app.config)
                .map(|p| p.id.clone());
            app.notify(format!("Provider set: {name}"));
            if let Some(id) = missing {
                app.notify(format!("Note: this provider needs an API key. Use /apikey {id} <key>."));
            }
        }
        Err(e) => app.notify_error(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_providers(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::ListProviders)
}

pub(super) fn handle_apikey(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.args.split_whitespace().collect();
    match parts.as_slice() {
        [provider] => {
            if app.config.remove_api_key(provider) {
                let saved = persist_config(app, |_| {});
                if saved {
                    app.notify(format!("API key removed for {provider}."));
                } else {
                    app.notify(format!("API key removed for {provider} (unsaved)."));
                }
            } else {
                app.notify_error(format!("no stored key for {provider}"));
            }
        }
        [provider, key] => {
            let provider = provider.to_string();
            let key = key.to_string();
            let saved = persist_config(app, |c| c.set_api_key(&provider, key));
            if saved {
                app.notify(format!("API key stored for {provider}."));
            } else {
                app.notify(format!("API key stored for {provider} (unsaved)."));
            }
        }
        _ => app.notify("Usage: /apikey <provider> [key]"),
    }
    CommandResult::Continue
}

pub(super) fn handle_persona(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = app.personas.active_display();
        app.notify(format!("Persona: {current}"));
        return CommandResult::Continue;
    }
    if invocation.args.eq_ignore_ascii_case("none") {
        app.personas.clear_active();
        let saved = persist_config(app, |c| c.persona = None);
        if saved {
            app.notify("Persona cleared.");
        } else {
            app.notify("Persona cleared (unsaved).");
        }
        return CommandResult::Continue;
    }
    let result = app
        .personas
        .set_active(invocation.args)
        .map(|p| p.name.clone());
    match result {
        Ok(name) => {
            let canonical = app.personas.active_id().map(str::to_string);
            let saved = persist_config(app, |c| c.persona = canonical);
            if saved {
                app.notify(format!("Persona set: {name}"));
            } else {
                app.notify(format!("Persona set: {name} (unsaved)"));
            }
        }
        Err(e) => app.notify_error(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_personas(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::ListPersonas)
}

pub(super) fn handle_preset(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /preset <id> (see /presets)");
        return CommandResult::Continue;
    }
    let found = app
        .presets
        .find(invocation.args)
        .map(|p| (p.name.clone(), p.prompt.clone()));
    match found {
        Ok((name, prompt)) => {
            app.set_system_prompt(prompt);
            app.notify(format!("Preset applied: {name}"));
        }
        Err(e) => app.notify_error(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_presets(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.presets.list().is_empty() {
        app.notify("No presets defined.");
        return CommandResult::Continue;
    }
    let mut out = String::from("Presets:");
    for preset in app.presets.list() {
        out.push_str(&format!("\n{} - {}", preset.id, preset.name));
    }
    app.notify(out);
    CommandResult::Continue
}

pub(super) fn handle_template(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /template <id> (see /templates)");
        return CommandResult::Continue;
    }
    CommandResult::Async(AsyncAction::ApplyTemplate(invocation.args.to_string()))
}

pub(super) fn handle_templates(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::ListTemplates)
}

pub(super) fn handle_image(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /image <prompt>");
        return CommandResult::Continue;
    }
    CommandResult::Async(AsyncAction::GenerateImage(invocation.args.to_string()))
}

pub(super) fn handle_run(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        return CommandResult::Async(AsyncAction::RunCode(None));
    }
    match invocation.args.parse::<usize>() {
        Ok(index) => CommandResult::Async(AsyncAction::RunCode(Some(index))),
        Err(_) => {
            app.notify("Usage: /run [index]");
            CommandResult::Continue
        }
    }
}

pub(super) fn handle_suggest(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Async(AsyncAction::SuggestReplies)
}

pub(super) fn handle_summarize(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.session.api_history().is_empty() {
        app.notify_error("Nothing to summarize yet.");
        return CommandResult::Continue;
    }
    CommandResult::Async(AsyncAction::Summarize)
}

pub(super) fn handle_search(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /search <query>");
        return CommandResult::Continue;
    }
    let saved = match app.chat_store.load_all() {
        Ok(saved) => saved,
        Err(e) => {
            app.notify_error(format!("could not read chats: {e}"));
            return CommandResult::Continue;
        }
    };
    let hits = search_chats(invocation.args, &app.session.chat, saved.iter());
    if hits.is_empty() {
        app.notify(format!("No matches for '{}'.", invocation.args));
        return CommandResult::Continue;
    }
    let mut out = format!("{} match(es):", hits.len());
    for hit in &hits {
        out.push_str(&format!(
            "\n{} #{} [{}]: {}",
            hit.chat_title,
            hit.message_index,
            hit.role.as_str(),
            hit.snippet
        ));
    }
    app.notify(out);
    CommandResult::Continue
}

pub(super) fn handle_stats(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let stats = chat_stats(&app.session.chat);
    let model = if app.session.chat.model.is_empty() {
        "none".to_string()
    } else {
        app.session.chat.model.clone()
    };
    let text = format!(
        "Messages: {} ({} user, {} assistant, {} system)\nCharacters: {}\nEstimated tokens: {}\nModel: {}\nProvider: {}",
        stats.message_count,
        stats.user_messages,
        stats.assistant_messages,
        stats.system_messages,
        stats.total_chars,
        stats.estimated_tokens,
        model,
        app.providers.current_display()
    );
    app.notify(text);
    CommandResult::Continue
}

pub(super) fn handle_bookmark(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let index = if invocation.args.is_empty() {
        None
    } else {
        match invocation.args.parse::<usize>() {
            Ok(index) => Some(index),
            Err(_) => {
                app.notify("Usage: /bookmark [index]");
                return CommandResult::Continue;
            }
        }
    };
    let index = match app.session.resolve_message_index(index) {
        Ok(index) => index,
        Err(e) => {
            app.notify_error(e);
            return CommandResult::Continue;
        }
    };
    let (role, content) = {
        let message = &app.session.chat.history[index];
        (message.role, message.content.clone())
    };
    match app
        .bookmarks
        .add(&app.session.chat.id, index, role, &content)
    {
        Ok(bookmark) => app.notify(format!("Bookmarked message {index} ({})", bookmark.id)),
        Err(e) => app.notify_error(format!("bookmark failed: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_bookmarks(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    match app.bookmarks.load_all() {
        Ok(bookmarks) if bookmarks.is_empty() => app.notify("No bookmarks."),
        Ok(bookmarks) => {
            let mut out = String::from("Bookmarks:");
            for bookmark in &bookmarks {
                out.push_str(&format!(
                    "\n{}  [{}] {} (chat {} #{})",
                    bookmark.id,
                    bookmark.role.as_str(),
                    bookmark.content,
                    bookmark.chat_id,
                    bookmark.message_index
                ));
            }
            app.notify(out);
        }
        Err(e) => app.notify_error(format!("could not read bookmarks: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_delbook(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /delbook <id>");
        return CommandResult::Continue;
    }
    match app.bookmarks.remove(invocation.args) {
        Ok(true) => app.notify("Bookmark removed."),
        Ok(false) => app.notify_error(format!("no bookmark with id {}", invocation.args)),
        Err(e) => app.notify_error(format!("remove failed: {e}")),
    }
    CommandResult::Continue
}

pub(super) fn handle_react(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let mut parts = invocation.args.split_whitespace();
    let Some(index) = parts.next().and_then(|s| s.parse::<usize>().ok()) else {
        app.notify("Usage: /react <index> [emoji]");
        return CommandResult::Continue;
    };
    if index >= app.session.chat.history.len() {
        app.notify_error(format!("no message at index {index}"));
        return CommandResult::Continue;
    }
    let chat_id = app.session.chat.id.clone();
    match parts.next() {
        Some(emoji) => match app.reactions.toggle(&chat_id, index, emoji) {
            Ok(true) => app.notify(format!("Reacted {emoji} to message {index}.")),
            Ok(false) => app.notify(format!("Removed {emoji} from message {index}.")),
            Err(e) => app.notify_error(format!("reaction failed: {e}")),
        },
        None => match app.reactions.for_message(&chat_id, index) {
            Ok(reactions) if reactions.is_empty() => {
                app.notify(format!("Message {index} has no reactions."))
            }
            Ok(reactions) => {
                app.notify(format!("Message {index}: {}", reactions.join(" ")))
            }
            Err(e) => app.notify_error(format!("reaction lookup failed: {e}")),
        },
    }
    CommandResult::Continue
}

pub(super) fn handle_copy(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match message_at(app, invocation.args) {
        Ok((index, content)) => match copy_to_clipboard(&content) {
            Ok(()) => app.notify(format!("Copied message {index} to clipboard.")),
            Err(e) => app.notify_error(e),
        },
        Err(e) => app.notify_error(e),
    }
    CommandResult::Continue
}

pub(super) fn handle_speak(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    match message_at(app, invocation.args) {
        Ok((index, content)) => match speak(&speakable_text(&content)) {
            Ok(()) => app.notify(format!("Reading message {index} aloud.")),
            Err(e) => app.notify_error(e),
        },
        Err(e) => app.notify_error(e),
    }
    CommandResult::Continue
}

/// Shared index parsing for copy and speak: optional index argument, default
/// last assistant reply.
fn message_at(app: &App, args: &str) -> Result<(usize, String), String> {
    let index = if args.is_empty() {
        None
    } else {
        Some(args.parse::<usize>().map_err(|_| "expected a message index".to_string())?)
    };
    let index = app.session.resolve_message_index(index)?;
    Ok((index, app.session.chat.history[index].content.clone()))
}

pub(super) fn handle_attach(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        app.notify("Usage: /attach <image file>");
        return CommandResult::Continue;
    }
    match std::fs::read(invocation.args) {
        Ok(bytes) => {
            app.pending_images
                .push(base64::prelude::BASE64_STANDARD.encode(&bytes));
            app.notify(format!(
                "Attached {} ({} image(s) will ride the next message)",
                invocation.args,
                app.pending_images.len()
            ));
        }
        Err(e) => app.notify_error(format!("could not read {}: {e}", invocation.args)),
    }
    CommandResult::Continue
}

pub(super) fn handle_theme(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = app.config.theme.clone().unwrap_or_else(|| "dark".to_string());
        app.notify(format!("Theme: {current}"));
        return CommandResult::Continue;
    }
    let name = invocation.args.to_string();
    app.set_theme(&name);
    let saved = persist_config(app, |c| c.theme = Some(name.clone()));
    if saved {
        app.notify(format!("Theme set: {}", invocation.args));
    } else {
        app.notify(format!("Theme set: {} (unsaved)", invocation.args));
    }
    CommandResult::Continue
}

pub(super) fn handle_markdown(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let action = invocation.args.split_whitespace().next().unwrap_or("");
    let mut enabled = app.markdown_enabled;
    match action.to_ascii_lowercase().as_str() {
        "on" => enabled = true,
        "off" => enabled = false,
        "toggle" | "" => enabled = !enabled,
        _ => {
            app.notify("Usage: /markdown [on|off|toggle]");
            return CommandResult::Continue;
        }
    }
    app.markdown_enabled = enabled;
    let saved = persist_config(app, |c| c.markdown = Some(enabled));
    let state = if enabled { "enabled" } else { "disabled" };
    if saved {
        app.notify(format!("Markdown {state}"));
    } else {
        app.notify(format!("Markdown {state} (unsaved)"));
    }
    CommandResult::Continue
}

pub(super) fn handle_syntax(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let action = invocation.args.split_whitespace().next().unwrap_or("");
    let mut enabled = app.syntax_enabled;
    match action.to_ascii_lowercase().as_str() {
        "on" => enabled = true,
        "off" => enabled = false,
        "toggle" | "" => enabled = !enabled,
        _ => {
            app.notify("Usage: /syntax [on|off|toggle]");
            return CommandResult::Continue;
        }
    }
    app.syntax_enabled = enabled;
    let saved = persist_config(app, |c| c.syntax = Some(enabled));
    let state = if enabled { "enabled" } else { "disabled" };
    if saved {
        app.notify(format!("Syntax highlighting {state}"));
    } else {
        app.notify(format!("Syntax highlighting {state} (unsaved)"));
    }
    CommandResult::Continue
}

pub(super) fn handle_log(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let parts: Vec<&str> = invocation.input.split_whitespace().collect();
    match parts.len() {
        1 => {
            let result = app.log.toggle();
            match result {
                Ok(message) => app.notify(message),
                Err(e) => app.notify_error(format!("log error: {e}")),
            }
        }
        2 => {
            let result = app.log.set_log_file(parts[1].to_string());
            match result {
                Ok(message) => app.notify(message),
                Err(e) => app.notify_error(format!("logfile error: {e}")),
            }
        }
        _ => app.notify("Usage: /log [filename]"),
    }
    CommandResult::Continue
}

pub(super) fn handle_stop(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.session.is_streaming {
        app.session.interrupt_stream();
    } else {
        app.notify("No response is streaming.");
    }
    CommandResult::Continue
}

pub(super) fn handle_quit(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Exit
}
