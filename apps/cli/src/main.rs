use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pinflash_core::gpio::{GpioController, SysfsPinDriver};
use pinflash_core::session::{FlashSession, REQUIRED_ENV, SessionConfig, SessionOutcome};
use pinflash_core::tool::{REQUIRED_TOOLS, SystemToolRunner, ToolRunner};
use pinflash_core::{BoardKind, check_environment, detect_connected_board, usb};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Flash firmware onto bench-attached boards", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Flash a firmware image onto a board
    Flash {
        /// Compiled firmware file to upload
        #[arg(short, long)]
        file: PathBuf,

        /// Target board name; omit to auto-detect over USB
        #[arg(short, long)]
        board: Option<String>,

        /// Declared artifact architecture (defaults to the board's)
        #[arg(long)]
        arch: Option<String>,

        /// Session config file (TOML); command-line options override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Free all harness pins when done
        #[arg(long)]
        free_pins: bool,

        /// Power the board down when done
        #[arg(long)]
        shutdown: bool,
    },
    /// Detect a connected board over USB
    Detect {
        /// Parse a captured `lsusb` listing instead of scanning live
        #[arg(long)]
        listing: Option<PathBuf>,
    },
    /// List the supported boards
    Boards,
    /// Check that required host tools and environment are present
    Tools,
}

fn main() {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if cli.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(cli.command) {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Flash {
            file,
            board,
            arch,
            config,
            free_pins,
            shutdown,
        } => {
            let mut session_config = match config {
                Some(path) => SessionConfig::load_from_file(path)?,
                None => SessionConfig::default(),
            };
            session_config.firmware = Some(file);
            if board.is_some() {
                session_config.board = board;
            }
            if arch.is_some() {
                session_config.arch = arch;
            }
            session_config.free_pins |= free_pins;
            session_config.shutdown |= shutdown;

            let gpio = GpioController::new(Arc::new(SysfsPinDriver::new()));
            let mut session = FlashSession::new(session_config, gpio);
            match session.run()? {
                SessionOutcome::Confirmed => {
                    info!("Flash confirmed by tool output");
                }
                SessionOutcome::Unconfirmed => {
                    warn!(
                        "Tool exited cleanly but did not confirm the write; \
                         verify the board before trusting it"
                    );
                }
            }
            Ok(())
        }
        Commands::Detect { listing } => {
            let devices = match listing {
                Some(path) => usb::parse_device_listing(&std::fs::read_to_string(path)?),
                None => usb::scan()?,
            };
            let entry = detect_connected_board(&devices)?;
            println!("{} ({})", entry.friendly_name, entry.key);
            if let Some(kind) = entry.board_kind() {
                println!("board: {kind}");
            }
            if let Some(config) = entry.tool_config {
                println!("tool config: {config}");
            }
            if let Some(argument) = entry.tool_argument {
                println!("tool argument: {argument}");
            }
            Ok(())
        }
        Commands::Boards => {
            for kind in BoardKind::ALL {
                let profile = kind.profile();
                println!(
                    "{} ({} / {}, {})",
                    kind.name(),
                    profile.arch,
                    profile.cpu,
                    profile.tool.program
                );
            }
            Ok(())
        }
        Commands::Tools => {
            let runner = SystemToolRunner;
            let mut missing = false;
            for tool in REQUIRED_TOOLS {
                match runner.resolve(tool) {
                    Ok(path) => println!("{tool}: {}", path.display()),
                    Err(_) => {
                        println!("{tool}: NOT FOUND");
                        missing = true;
                    }
                }
            }
            for name in check_environment(REQUIRED_ENV) {
                println!("{name}: not set");
            }
            if missing {
                anyhow::bail!("required tools are missing");
            }
            Ok(())
        }
    }
}
