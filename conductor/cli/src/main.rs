//! Cecy Terminal Surface
//!
//! Chat with Cecy from a terminal. Lines typed at the prompt are sent as
//! messages; lines starting with `/` are commands (see `/help`).
//!
//! # Usage
//!
//! ```bash
//! # Plain chat against the hosted services
//! cecy
//!
//! # Avatar mode, muted, against a local service
//! cecy --mode avatar --mute --chat-url http://localhost:8000
//!
//! # With verbose logging
//! RUST_LOG=debug cecy
//! ```
//!
//! # Environment Variables
//!
//! - `CECY_CONFIG`: Config file path (default: `<config dir>/cecy/config.toml`)
//! - `CECY_CHAT_API_URL`, `CECY_TRANSCRIBE_API_URL`: Service base URLs
//! - `CECY_MODE`, `CECY_SOUND`, `CECY_REVEAL_MS`: Presentation
//! - `CECY_HISTORY_DIR`: Mirror conversations as JSON files here
//! - `CECY_TOKEN_FILE`: Session token file
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

mod commands;
mod render;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use cecy_core::{
    auth::{AuthCallback, NoToken, TokenProvider, TokenStore},
    config::{default_config_path, load_config_from_path, CecyConfig, ConfigOverrides},
    history::JsonFileHistoryStore,
    CaptureState, CecyApiClient, ChatMode, Conductor, ConductorMessage, FileMicrophone,
    SurfaceEvent, TimedUtterancePlayer,
};

use commands::{Command, HELP};
use render::Renderer;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "cecy", version, about = "Chat with Cecy from the terminal")]
struct Args {
    /// Config file
    #[arg(long, env = "CECY_CONFIG")]
    config: Option<PathBuf>,

    /// Chat service base URL
    #[arg(long)]
    chat_url: Option<String>,

    /// Transcription service base URL
    #[arg(long)]
    transcribe_url: Option<String>,

    /// Presentation mode (chat or avatar)
    #[arg(long)]
    mode: Option<ChatMode>,

    /// Start with sound off
    #[arg(long)]
    mute: bool,

    /// Reveal duration in milliseconds
    #[arg(long)]
    reveal_ms: Option<u64>,

    /// Mirror the conversation into this directory
    #[arg(long)]
    history_dir: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            chat_api_url: self.chat_url.clone(),
            transcribe_api_url: self.transcribe_url.clone(),
            mode: self.mode,
            mute: self.mute,
            reveal_ms: self.reveal_ms,
            history_dir: self.history_dir.clone(),
        }
    }
}

/// Token store for this run, if one can be located
fn token_store(config: &CecyConfig) -> Option<TokenStore> {
    match config.token_file {
        Some(ref path) => Some(TokenStore::new(path)),
        None => match TokenStore::open_default() {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(error = %e, "No token store available, continuing signed out");
                None
            }
        },
    }
}

/// Print conductor messages until the conductor goes away
async fn print_messages(mut rx: mpsc::Receiver<ConductorMessage>) {
    let mut renderer = Renderer::new();
    let mut stdout = std::io::stdout();
    while let Some(msg) = rx.recv().await {
        let out = renderer.render(&msg);
        if !out.is_empty() {
            let _ = stdout.write_all(out.as_bytes());
            let _ = stdout.flush();
        }
    }
}

/// Everything a command needs besides the conductor
struct Surface {
    microphone: Arc<FileMicrophone>,
    tokens: Option<TokenStore>,
}

/// Run one command; `false` to quit
async fn run_command(
    conductor: &mut Conductor<CecyApiClient>,
    surface: &Surface,
    command: Command,
) -> anyhow::Result<bool> {
    match command {
        Command::Say(text) => {
            conductor
                .handle_event(SurfaceEvent::InputChanged { text: text.clone() })
                .await?;
            conductor.handle_event(SurfaceEvent::Submit { text }).await?;
        }
        Command::Send => {
            let text = conductor.session().input().to_string();
            if text.is_empty() {
                println!("No hay texto para enviar");
            } else {
                conductor.handle_event(SurfaceEvent::Submit { text }).await?;
            }
        }
        Command::Sound => conductor.handle_event(SurfaceEvent::SoundToggled).await?,
        Command::Mode(mode) => {
            conductor
                .handle_event(SurfaceEvent::ModeChanged { mode })
                .await?;
        }
        Command::Speak(n) => {
            let Some(message) = conductor.session().messages().get(n - 1) else {
                println!("No existe el mensaje {n}");
                return Ok(true);
            };
            let message_id = message.id.clone();
            conductor
                .handle_event(SurfaceEvent::SpeakRequested { message_id })
                .await?;
        }
        Command::Stop => conductor.handle_event(SurfaceEvent::StopSpeaking).await?,
        Command::Voice(path) => {
            if conductor.capture_state() != CaptureState::Idle {
                println!("Espera a que termine la transcripción anterior");
                return Ok(true);
            }
            surface.microphone.select_clip(path);
            conductor
                .handle_event(SurfaceEvent::VoiceCaptureStart)
                .await?;
            conductor
                .handle_event(SurfaceEvent::VoiceCaptureStop)
                .await?;
        }
        Command::Reset => conductor.handle_event(SurfaceEvent::ResetRequested).await?,
        Command::Resources(category) => print!("{}", render::resource_listing(category.as_deref())),
        Command::Topics => print!("{}", render::topic_listing()),
        Command::Blur => conductor.handle_event(SurfaceEvent::FocusLost).await?,
        Command::Focus => conductor.handle_event(SurfaceEvent::FocusGained).await?,
        Command::Login(url) => {
            let Some(ref store) = surface.tokens else {
                println!("No hay dónde guardar la sesión");
                return Ok(true);
            };
            match AuthCallback::parse(&url)? {
                Some(tokens) => {
                    store.save(&tokens)?;
                    println!("Sesión iniciada");
                }
                None => println!("El enlace no contiene una sesión"),
            }
        }
        Command::Logout => {
            if let Some(ref store) = surface.tokens {
                store.clear()?;
            }
            println!("Sesión cerrada");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cecy=warn".parse()?)
                .add_directive("cecy_core=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))?;
    args.overrides().apply(&mut config);
    info!(source = ?config.source(), chat = %config.chat_api_url, "Configuration loaded");

    let tokens = token_store(&config);
    let provider: Arc<dyn TokenProvider> = match tokens {
        Some(ref store) => Arc::new(store.clone()),
        None => Arc::new(NoToken),
    };

    let client = CecyApiClient::new(config.api_config(provider))?;
    let transcriber = Arc::new(client.clone());
    let player = Arc::new(TimedUtterancePlayer::new(config.speech_ms_per_char));
    let microphone = Arc::new(FileMicrophone::new());

    let (msg_tx, msg_rx) = mpsc::channel::<ConductorMessage>(256);
    let printer = tokio::spawn(print_messages(msg_rx));

    let mut conductor = Conductor::new(client, player, config.conductor_config(), msg_tx)
        .with_voice(microphone.clone(), transcriber);
    if let Some(ref dir) = config.history_dir {
        conductor = conductor.with_history(Arc::new(JsonFileHistoryStore::new(dir)));
    }

    let surface = Surface { microphone, tokens };

    conductor.handle_event(SurfaceEvent::Mounted).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = match commands::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                match run_command(&mut conductor, &surface, command).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => println!("Error: {e:#}"),
                }
            }
            Some(activity) = conductor.next_activity() => {
                conductor.apply(activity).await;
            }
        }
    }

    conductor.dispose().await;
    conductor.flush_history().await;
    drop(conductor);

    if let Err(e) = printer.await {
        warn!(error = %e, "Printer task failed");
    }
    Ok(())
}
