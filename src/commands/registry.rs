use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Show available commands.",
        handler: super::handle_help,
    },
    Command {
        name: "save",
        help: "Save the current chat, optionally setting its title.",
        handler: super::handle_save,
    },
    Command {
        name: "chats",
        help: "List saved chats.",
        handler: super::handle_chats,
    },
    Command {
        name: "load",
        help: "Load a saved chat by id.",
        handler: super::handle_load,
    },
    Command {
        name: "rename",
        help: "Rename the current chat.",
        handler: super::handle_rename,
    },
    Command {
        name: "delchat",
        help: "Delete a saved chat by id.",
        handler: super::handle_delchat,
    },
    Command {
        name: "new",
        help: "Start a new chat.",
        handler: super::handle_new,
    },
    Command {
        name: "temp",
        help: "Start a temporary chat that is never saved.",
        handler: super::handle_temp,
    },
    Command {
        name: "export",
        help: "Export the current chat to a JSON file.",
        handler: super::handle_export,
    },
    Command {
        name: "clear",
        help: "Clear the current conversation history.",
        handler: super::handle_clear,
    },
    Command {
        name: "edit",
        help: "Edit a message in place, or pull a user turn back into the input.",
        handler: super::handle_edit,
    },
    Command {
        name: "delete",
        help: "Delete the message at an index.",
        handler: super::handle_delete,
    },
    Command {
        name: "regen",
        help: "Regenerate an assistant reply (default: the last one).",
        handler: super::handle_regen,
    },
    Command {
        name: "continue",
        help: "Ask the model to continue its last reply.",
        handler: super::handle_continue,
    },
    Command {
        name: "system",
        help: "Show or set the system prompt.",
        handler: super::handle_system,
    },
    Command {
        name: "model",
        help: "Show or switch the session model.",
        handler: super::handle_model,
    },
    Command {
        name: "models",
        help: "List models available on the backend.",
        handler: super::handle_models,
    },
    Command {
        name: "running",
        help: "List models currently loaded in memory.",
        handler: super::handle_running,
    },
    Command {
        name: "loadmodel",
        help: "Preload a model into memory.",
        handler: super::handle_loadmodel,
    },
    Command {
        name: "stopmodel",
        help: "Unload a model from memory.",
        handler: super::handle_stopmodel,
    },
    Command {
        name: "provider",
        help: "Show or switch the inference provider.",
        handler: super::handle_provider,
    },
    Command {
        name: "providers",
        help: "List providers known to the backend.",
        handler: super::handle_providers,
    },
    Command {
        name: "apikey",
        help: "Store or remove an API key for a provider.",
        handler: super::handle_apikey,
    },
    Command {
        name: "persona",
        help: "Show, set, or clear the active persona.",
        handler: super::handle_persona,
    },
    Command {
        name: "personas",
        help: "List personas the backend offers.",
        handler: super::handle_personas,
    },
    Command {
        name: "preset",
        help: "Apply a system-prompt preset.",
        handler: super::handle_preset,
    },
    Command {
        name: "presets",
        help: "List system-prompt presets.",
        handler: super::handle_presets,
    },
    Command {
        name: "template",
        help: "Load a prompt template into the input box.",
        handler: super::handle_template,
    },
    Command {
        name: "templates",
        help: "List prompt templates from the backend.",
        handler: super::handle_templates,
    },
    Command {
        name: "image",
        help: "Generate an image from a prompt.",
        handler: super::handle_image,
    },
    Command {
        name: "run",
        help: "Execute the first code block of a message on the backend.",
        handler: super::handle_run,
    },
    Command {
        name: "suggest",
        help: "Suggest replies to the last assistant message.",
        handler: super::handle_suggest,
    },
    Command {
        name: "summarize",
        help: "Summarize the current conversation.",
        handler: super::handle_summarize,
    },
    Command {
        name: "search",
        help: "Search the current and saved chats.",
        handler: super::handle_search,
    },
    Command {
        name: "stats",
        help: "Show message and token statistics for this chat.",
        handler: super::handle_stats,
    },
    Command {
        name: "bookmark",
        help: "Bookmark a message (default: the last assistant reply).",
        handler: super::handle_bookmark,
    },
    Command {
        name: "bookmarks",
        help: "List bookmarks.",
        handler: super::handle_bookmarks,
    },
    Command {
        name: "delbook",
        help: "Remove a bookmark by id.",
        handler: super::handle_delbook,
    },
    Command {
        name: "react",
        help: "Toggle an emoji reaction on a message, or show its reactions.",
        handler: super::handle_react,
    },
    Command {
        name: "copy",
        help: "Copy a message to the clipboard.",
        handler: super::handle_copy,
    },
    Command {
        name: "speak",
        help: "Read a message aloud.",
        handler: super::handle_speak,
    },
    Command {
        name: "attach",
        help: "Attach an image file to the next message.",
        handler: super::handle_attach,
    },
    Command {
        name: "theme",
        help: "Show or switch the color theme.",
        handler: super::handle_theme,
    },
    Command {
        name: "markdown",
        help: "Toggle markdown rendering for assistant responses.",
        handler: super::handle_markdown,
    },
    Command {
        name: "syntax",
        help: "Toggle syntax highlighting for code blocks.",
        handler: super::handle_syntax,
    },
    Command {
        name: "log",
        help: "Toggle transcript logging or set the log file path.",
        handler: super::handle_log,
    },
    Command {
        name: "stop",
        help: "Stop the in-flight response.",
        handler: super::handle_stop,
    },
    Command {
        name: "quit",
        help: "Exit chatbowl.",
        handler: super::handle_quit,
    },
];
