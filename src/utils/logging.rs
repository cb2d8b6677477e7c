use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::core::message::{Message, Role};

/// Transcript logging driven by `/log`. Independent of the tracing
/// subscriber; this is the user-facing "write my conversation to a file"
/// feature.
pub struct TranscriptLog {
    file_path: Option<String>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn new(log_file: Option<String>) -> Self {
        let is_active = log_file.is_some();
        Self {
            file_path: log_file,
            is_active,
        }
    }

    pub fn set_log_file(&mut self, path: String) -> Result<String, Box<dyn std::error::Error>> {
        self.test_file_access(&path)?;
        self.file_path = Some(path.clone());
        self.is_active = true;
        Ok(format!("Logging enabled to: {path}"))
    }

    pub fn toggle(&mut self) -> Result<String, Box<dyn std::error::Error>> {
        match &self.file_path {
            Some(path) => {
                if self.is_active {
                    self.is_active = false;
                    Ok(format!("Logging paused (file: {path})"))
                } else {
                    self.is_active = true;
                    Ok(format!("Logging resumed to: {path}"))
                }
            }
            None => {
                Err("No log file specified. Use /log <filename> to enable logging first.".into())
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn status(&self) -> String {
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), active) => {
                let name = Path::new(path)
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy();
                if active {
                    format!("active ({name})")
                } else {
                    format!("paused ({name})")
                }
            }
        }
    }

    /// Append one message in transcript format. No-op while paused.
    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };
        let Some(rendered) = render_entry(message) else {
            return Ok(());
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        writer.write_all(rendered.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Rewrite the whole log from `history`, dropping the entry at
    /// `skip_index`. Used when a response is regenerated so the discarded
    /// text does not linger in the file. Atomic: the original file is only
    /// replaced after the rewrite is fully on disk.
    pub fn rewrite_without(
        &self,
        history: &[Message],
        skip_index: Option<usize>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.is_active {
            return Ok(());
        }
        let Some(file_path) = &self.file_path else {
            return Ok(());
        };

        let target = Path::new(file_path);
        let parent = target.parent().unwrap_or_else(|| Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent)?;

        for (i, message) in history.iter().enumerate() {
            if Some(i) == skip_index {
                continue;
            }
            if let Some(rendered) = render_entry(message) {
                temp_file.write_all(rendered.as_bytes())?;
            }
        }

        temp_file.flush()?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(file_path)?;
        Ok(())
    }

    fn test_file_access(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.flush()?;
        Ok(())
    }
}

/// Transcript format: user turns carry a "You:" prefix, assistant turns are
/// written as-is, system prompts get a "##" marker. Local notices stay out of
/// the file. Entries end with a blank line for spacing.
fn render_entry(message: &Message) -> Option<String> {
    let mut out = String::new();
    match message.role {
        Role::User => {
            for line in format!("You: {}", message.content).lines() {
                out.push_str(line);
                out.push('\n');
            }
        }
        Role::Assistant => {
            if message.content.is_empty() {
                return None;
            }
            for line in message.content.lines() {
                out.push_str(line);
                out.push('\n');
            }
        }
        Role::System => {
            for line in format!("## {}", message.content).lines() {
                out.push_str(line);
                out.push('\n');
            }
        }
        Role::AppInfo | Role::AppError => return None,
    }
    out.push('\n');
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in_tempdir() -> (tempfile::TempDir, TranscriptLog, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("chat.log")
            .to_string_lossy()
            .into_owned();
        let mut log = TranscriptLog::new(None);
        log.set_log_file(path.clone()).unwrap();
        (dir, log, path)
    }

    #[test]
    fn messages_append_in_transcript_format() {
        let (_dir, log, path) = log_in_tempdir();
        log.log_message(&Message::user("hello")).unwrap();
        log.log_message(&Message::assistant("hi there")).unwrap();
        log.log_message(&Message::info("saved")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "You: hello\n\nhi there\n\n");
    }

    #[test]
    fn paused_log_drops_messages() {
        let (_dir, mut log, path) = log_in_tempdir();
        log.toggle().unwrap();
        assert!(!log.is_active());
        log.log_message(&Message::user("lost")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

        log.toggle().unwrap();
        log.log_message(&Message::user("kept")).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "You: kept\n\n");
    }

    #[test]
    fn rewrite_drops_the_skipped_entry() {
        let (_dir, log, path) = log_in_tempdir();
        let history = vec![
            Message::user("question"),
            Message::assistant("bad answer"),
            Message::user("followup"),
        ];
        for message in &history {
            log.log_message(message).unwrap();
        }

        log.rewrite_without(&history, Some(1)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "You: question\n\nYou: followup\n\n");
    }

    #[test]
    fn toggle_without_file_is_an_error() {
        let mut log = TranscriptLog::new(None);
        assert!(log.toggle().is_err());
    }
}
