//! Slash commands typed at the prompt

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use cecy_core::messages::ChatMode;

/// One line of user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send
    Say(String),
    /// Send whatever is in the input buffer (e.g. a transcript)
    Send,
    /// Toggle sound output
    Sound,
    /// Switch presentation mode
    Mode(ChatMode),
    /// Read the n-th message aloud (1-based)
    Speak(usize),
    /// Stop speaking
    Stop,
    /// Transcribe a recorded clip
    Voice(PathBuf),
    /// Reset the remote conversation
    Reset,
    /// List help resources, optionally in one category
    Resources(Option<String>),
    /// List discover topics
    Topics,
    /// Simulate leaving the screen
    Blur,
    /// Simulate returning to the screen
    Focus,
    /// Store tokens from a sign-in callback URL
    Login(String),
    /// Forget stored tokens
    Logout,
    /// Show the command list
    Help,
    /// Exit
    Quit,
}

/// Text printed by `/help`
pub const HELP: &str = "\
Comandos:
  /send                 enviar el texto transcrito
  /sound                activar o silenciar la voz
  /mode chat|avatar     cambiar el modo de presentación
  /speak <n>            leer en voz alta el mensaje n
  /stop                 dejar de hablar
  /voice <archivo>      transcribir un audio grabado
  /reset                reiniciar la conversación
  /resources [categoría]  directorio de ayuda
  /topics               temas para descubrir
  /blur, /focus         salir y volver a la pantalla
  /login <url>, /logout  sesión
  /quit                 salir";

/// Parse one input line; `None` for a blank line
pub fn parse(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };

    let command = match name {
        "send" => Command::Send,
        "sound" | "mute" => Command::Sound,
        "mode" => {
            let arg = arg.ok_or_else(|| anyhow!("usage: /mode chat|avatar"))?;
            Command::Mode(arg.parse().map_err(|e: String| anyhow!(e))?)
        }
        "speak" => {
            let arg = arg.ok_or_else(|| anyhow!("usage: /speak <n>"))?;
            let n: usize = arg
                .parse()
                .with_context(|| format!("not a message number: {arg}"))?;
            if n == 0 {
                bail!("messages are numbered from 1");
            }
            Command::Speak(n)
        }
        "stop" => Command::Stop,
        "voice" => Command::Voice(PathBuf::from(
            arg.ok_or_else(|| anyhow!("usage: /voice <file>"))?,
        )),
        "reset" => Command::Reset,
        "resources" => Command::Resources(arg.map(str::to_string)),
        "topics" => Command::Topics,
        "blur" => Command::Blur,
        "focus" => Command::Focus,
        "login" => Command::Login(
            arg.ok_or_else(|| anyhow!("usage: /login <callback url>"))?
                .to_string(),
        ),
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command: /{other} (try /help)"),
    };
    Ok(Some(command))
}
