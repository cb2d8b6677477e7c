use std::io::Write;
use std::process::{Command, Stdio};

/// Copy text to the system clipboard by piping it to the platform's
/// clipboard command. Tried in order; the first command that runs wins.
pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let mut last_err = "No clipboard command available".to_string();
    for (cmd, args) in clipboard_commands() {
        match pipe_to_command(cmd, args, text) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = e,
        }
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        last_err.push_str(" (install wl-copy, xclip, or xsel)");
    }
    Err(last_err)
}

#[cfg(target_os = "macos")]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(target_os = "windows")]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[("cmd", &["/C", "clip"])]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn clipboard_commands() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ]
}

fn pipe_to_command(cmd: &str, args: &[&str], input: &str) -> Result<(), String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| format!("clipboard command `{cmd}` not available"))?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes());
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(format!("clipboard command `{cmd}` failed")),
    }
}
