use std::io::Write;
use std::process::{Command, Stdio};

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// Flatten markdown into text a speech synthesizer can read. Fenced code is
/// replaced by the phrase "Code block.", inline code keeps its text, and
/// emphasis and heading markers disappear with their content kept.
pub fn speakable_text(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut out = String::new();
    let mut in_code_block = false;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                push_boundary(&mut out);
                out.push_str("Code block.");
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                push_boundary(&mut out);
            }
            // Inline runs concatenate as-is; only block edges insert spaces.
            Event::Text(text) => {
                if !in_code_block {
                    out.push_str(&text);
                }
            }
            Event::Code(code) => {
                out.push_str(&code);
            }
            Event::SoftBreak | Event::HardBreak => {
                push_boundary(&mut out);
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                push_boundary(&mut out);
            }
            _ => {}
        }
    }

    out.trim().to_string()
}

fn push_boundary(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

enum Feed {
    Stdin,
    Arg,
}

#[cfg(target_os = "macos")]
fn speech_commands() -> &'static [(&'static str, &'static [&'static str], Feed)] {
    &[("say", &[], Feed::Stdin)]
}

#[cfg(target_os = "windows")]
fn speech_commands() -> &'static [(&'static str, &'static [&'static str], Feed)] {
    &[(
        "powershell",
        &[
            "-NoProfile",
            "-Command",
            "Add-Type -AssemblyName System.Speech; (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak([Console]::In.ReadToEnd())",
        ],
        Feed::Stdin,
    )]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn speech_commands() -> &'static [(&'static str, &'static [&'static str], Feed)] {
    &[
        ("spd-say", &[], Feed::Arg),
        ("espeak", &["--stdin"], Feed::Stdin),
    ]
}

/// Speak `text` through the first available platform speech command. Playback
/// runs detached; a reaper thread waits on the child since commands like
/// `say` block for the duration of the audio.
pub fn speak(text: &str) -> Result<(), String> {
    let mut last_err = "No speech command available".to_string();
    for (cmd, args, feed) in speech_commands() {
        match spawn_speaker(cmd, args, feed, text) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = e,
        }
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        last_err.push_str(" (install speech-dispatcher or espeak)");
    }
    Err(last_err)
}

fn spawn_speaker(cmd: &str, args: &[&str], feed: &Feed, text: &str) -> Result<(), String> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match feed {
        Feed::Stdin => {
            command.stdin(Stdio::piped());
        }
        Feed::Arg => {
            command.arg(text).stdin(Stdio::null());
        }
    }

    let mut child = command
        .spawn()
        .map_err(|_| format!("speech command `{cmd}` not available"))?;

    if let (Feed::Stdin, Some(mut stdin)) = (feed, child.stdin.take()) {
        let _ = stdin.write_all(text.as_bytes());
    }
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_code_becomes_a_placeholder() {
        let text = speakable_text("Look:\n\n```rust\nfn main() {}\n```\n\nNeat.");
        assert_eq!(text, "Look: Code block. Neat.");
    }

    #[test]
    fn inline_code_keeps_its_text() {
        let text = speakable_text("Run `cargo doc` first.");
        assert_eq!(text, "Run cargo doc first.");
    }

    #[test]
    fn emphasis_and_heading_markers_disappear() {
        let text = speakable_text("# Title\n\nThis is *really* **important**.");
        assert_eq!(text, "Title This is really important.");
    }

    #[test]
    fn soft_breaks_read_as_spaces() {
        let text = speakable_text("line one\nline two");
        assert_eq!(text, "line one line two");
    }
}
