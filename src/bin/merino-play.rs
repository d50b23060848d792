use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::*;

use merino::{codec, CodecConfig, DialogueSession, LineEnding, SessionConfig, SuspendReason};

const DEFAULT_START_NODE_NAME: &str = "Start";

#[derive(Debug, Copy, Clone, ValueEnum)]
enum LineEndingArg {
    Unix,
    Windows,
    Native,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Unix => LineEnding::Unix,
            LineEndingArg::Windows => LineEnding::Windows,
            LineEndingArg::Native => LineEnding::Native,
        }
    }
}

/// Plays a Yarn file in the terminal.
#[derive(Debug, Parser)]
#[command(name = "merino-play", version)]
struct Args {
    /// The .yarn file to load.
    path: PathBuf,

    /// The node to start from.
    #[arg(default_value = DEFAULT_START_NODE_NAME)]
    start_node: String,

    /// Print the file back out in canonical form instead of playing it.
    #[arg(long)]
    reformat: bool,

    /// Line ending used by --reformat.
    #[arg(long, value_enum, default_value = "unix")]
    line_ending: LineEndingArg,

    /// Don't wait for Enter after each line.
    #[arg(long)]
    auto_advance: bool,

    /// Locale used for plural and ordinal format functions.
    #[arg(long, default_value = "en")]
    locale: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = Args::parse();

    let text = fs::read_to_string(&args.path)?;
    let nodes = codec::parse(&text)?;
    info!("Loaded {} nodes from {}", nodes.len(), args.path.display());

    if args.reformat {
        let config = CodecConfig {
            line_ending: args.line_ending.into(),
            ..CodecConfig::default()
        };
        print!("{}", codec::serialize(&nodes, &config));
        return Ok(());
    }

    let mut session = DialogueSession::new(SessionConfig {
        locale: args.locale.clone(),
        file_name: Some(args.path.display().to_string()),
        ..SessionConfig::default()
    });
    session.set_error_handler(|err| eprintln!("error: {}", err));
    session.start(&args.start_node, &nodes)?;

    let stdin = io::stdin();
    loop {
        match session.continue_dialogue()? {
            SuspendReason::Line(line) => {
                println!("{}", line.text);
                if !args.auto_advance {
                    let mut input = String::new();
                    stdin.read_line(&mut input)?;
                }
                session.acknowledge_line()?;
            }
            SuspendReason::Options(options) => {
                println!("== Choose option ==");
                for option in &options {
                    println!("{}: {}", option.id + 1, option.line.text);
                }

                // Block until the player picks something valid.
                loop {
                    print!("> ");
                    io::stdout().flush()?;

                    let mut selection = String::new();
                    if stdin.read_line(&mut selection)? == 0 {
                        session.stop();
                        return Ok(());
                    }
                    let choice = selection.trim().parse::<usize>().ok()
                        .and_then(|n| n.checked_sub(1));
                    match choice.map(|id| session.choose_option(id)) {
                        Some(Ok(())) => break,
                        Some(Err(err)) => eprintln!("{}", err),
                        None => eprintln!("Enter a number between 1 and {}", options.len()),
                    }
                }
            }
            SuspendReason::Command(command_text) => {
                println!("== Command: {} ==", command_text);
                session.acknowledge_command()?;
            }
            SuspendReason::NodeComplete { node, next } => {
                println!("== Node end: {} ==", node);
                if let Some(next) = next {
                    println!("== Node start: {} ==", next);
                }
            }
            SuspendReason::DialogueComplete(_) => {
                println!("== Dialogue complete ==");
                break;
            }
        }
    }

    Ok(())
}
