#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::env;
use std::io;
use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Action;
use crate::domain::models::Backend;
use crate::domain::models::Event;
use crate::domain::models::Message;
use crate::domain::models::MessageType;
use crate::domain::services::actions::help_text;
use crate::domain::services::actions::ActionsService;
use crate::domain::services::SessionController;
use crate::infrastructure::backends::BackendManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

/// Directory the debug log is written to when `RUST_LOG` enables ragchat.
pub fn debug_log_dir() -> Result<path::PathBuf> {
    if let Ok(dir) = env::var("RAGCHAT_LOG_DIR") {
        return Ok(path::PathBuf::from(dir));
    }

    if let Some(cache_dir) = dirs::cache_dir() {
        return Ok(cache_dir.join("ragchat"));
    }

    bail!("Unable to find a cache directory for the debug log. Set RAGCHAT_LOG_DIR instead.");
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

/// Plain text rendering of a finished answer for the terminal.
fn format_answer(message: &Message) -> String {
    let mut res = message.text.to_string();

    if let Some(sources) = message.sources() {
        let formatted = sources
            .iter()
            .enumerate()
            .map(|(idx, source)| {
                return format!("[{}] {}", idx + 1, source.display());
            })
            .collect::<Vec<String>>()
            .join("\n");
        res = format!("{res}\n\nSources:\n{formatted}");
    }

    if let Some(elapsed) = message.elapsed() {
        res = format!("{res}\n\nanswered in {:.2}s", elapsed.as_secs_f64());
    }

    return res;
}

/// Asks a single question without the terminal UI, streaming it through the
/// same session controller and action worker the chat uses.
async fn ask_question(question: &str) -> Result<()> {
    let backend: Arc<dyn Backend + Send + Sync> = Arc::from(BackendManager::get()?);
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let worker = tokio::spawn(async move {
        return ActionsService::start(backend, event_tx, &mut action_rx).await;
    });

    let mut controller = SessionController::default();
    if !controller.send(question, &action_tx)? {
        bail!("The question can't be empty.");
    }

    while controller.is_streaming() {
        match event_rx.recv().await {
            Some(Event::Stream(session_id, event)) => {
                controller.handle_stream_event(session_id, event, &action_tx)?;
            }
            Some(_) => continue,
            None => break,
        }
    }

    drop(action_tx);
    worker.await??;

    let answer = match controller.conversation().last_answer() {
        Some(answer) => answer,
        None => bail!("The backend did not answer."),
    };

    if answer.message_type() == MessageType::Error {
        eprintln!("{}", Paint::red(&answer.text));
        std::process::exit(1);
    }

    println!("{}", format_answer(answer));
    return Ok(());
}

async fn health_check() -> Result<()> {
    let backend_url = Config::get(ConfigKey::BackendURL);
    if let Err(err) = BackendManager::get()?.health_check().await {
        eprintln!(
            "{}",
            Paint::red(format!("Backend at {backend_url} is not reachable: {err}"))
        );
        std::process::exit(1);
    }

    println!("{}", Paint::green(format!("Backend at {backend_url} is healthy.")));
    return Ok(());
}

fn subcommand_ask() -> Command {
    return Command::new("ask")
        .about("Ask a single question, print the answer with its sources, and exit.")
        .arg(
            Arg::new("question")
                .help("The question to ask. Multiple words are joined with spaces.")
                .num_args(1..)
                .required(true),
        );
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    let mut cmd = Command::new("debug");
    cmd = cmd.about("Debug helpers for RagChat")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running RagChat with environment variable RUST_LOG=ragchat")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );

    return cmd;
}

fn arg_backend_url() -> Arg {
    return Arg::new(ConfigKey::BackendURL.to_string())
        .short('u')
        .long(ConfigKey::BackendURL.to_string())
        .env("RAGCHAT_BACKEND_URL")
        .num_args(1)
        .help(format!(
            "Base URL of the RAG backend. [default: {}]",
            Config::default(ConfigKey::BackendURL)
        ))
        .global(true);
}

fn arg_backend_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::BackendHealthCheckTimeout.to_string())
        .long(ConfigKey::BackendHealthCheckTimeout.to_string())
        .env("RAGCHAT_BACKEND_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .help(
            format!("Time to wait in milliseconds before timing out when doing a healthcheck for the backend. [default: {}]", Config::default(ConfigKey::BackendHealthCheckTimeout)),
        )
        .global(true);
}

fn arg_stream_path() -> Arg {
    return Arg::new(ConfigKey::StreamPath.to_string())
        .long(ConfigKey::StreamPath.to_string())
        .env("RAGCHAT_STREAM_PATH")
        .num_args(1)
        .help(format!(
            "Path of the event-stream chat endpoint on the backend. [default: {}]",
            Config::default(ConfigKey::StreamPath)
        ))
        .global(true);
}

fn arg_config_file() -> Arg {
    return Arg::new(ConfigKey::ConfigFile.to_string())
        .short('c')
        .long(ConfigKey::ConfigFile.to_string())
        .env("RAGCHAT_CONFIG_FILE")
        .num_args(1)
        .help(format!(
            "Path to configuration file [default: {}]",
            Config::default(ConfigKey::ConfigFile)
        ))
        .global(true);
}

fn arg_username() -> Arg {
    return Arg::new(ConfigKey::Username.to_string())
        .long(ConfigKey::Username.to_string())
        .env("RAGCHAT_USERNAME")
        .num_args(1)
        .help("Your user name displayed in all chat bubbles. [default: $USER]")
        .global(true);
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") || line.starts_with("HOTKEYS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("ragchat")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(Command::new("chat").about("Start a new chat session."))
        .subcommand(subcommand_ask())
        .subcommand(Command::new("health").about("Checks whether the backend is reachable."))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .arg(arg_backend_url())
        .arg(arg_backend_health_check_timeout())
        .arg(arg_stream_path())
        .arg(arg_config_file())
        .arg(arg_username());
}

/// Returns true when the chat UI should start.
pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = debug_log_dir()?.join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("ask", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let question = subcmd_matches
                .get_many::<String>("question")
                .map(|words| {
                    return words.map(|word| return word.as_str()).collect::<Vec<&str>>();
                })
                .unwrap_or_default()
                .join(" ");

            ask_question(&question).await?;
            return Ok(false);
        }
        Some(("health", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            health_check().await?;
            return Ok(false);
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
