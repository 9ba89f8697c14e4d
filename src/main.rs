//! winter CLI
//!
//! Widget demo, key inspector and key table listing.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use winter::demo::{Home, KeyInspector, SharedProfile};
use winter::keymap::Convention;
use winter::platform::install_panic_hook;
use winter::report::{OutputFormat, format_table};
use winter::{Error, Key, Program, ProgramConfig, ScreenBox};

#[derive(Parser)]
#[command(name = "winter")]
#[command(about = "Terminal UI micro-framework: widget demo and key tools")]
#[command(version)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to a file (default: <cache dir>/winter/winter.log)
    #[arg(long, global = true, value_name = "FILE", num_args = 0..=1, require_equals = true)]
    log: Option<Option<PathBuf>>,

    /// Frame interior width
    #[arg(long, global = true)]
    width: Option<u16>,

    /// Frame interior height
    #[arg(long, global = true)]
    height: Option<u16>,

    /// Title shown in the top border
    #[arg(long, global = true)]
    title: Option<String>,

    /// Key that ends the program, by name (e.g. escape, ctrl+q)
    #[arg(long, global = true)]
    kill_key: Option<Key>,

    /// Milliseconds each loop iteration waits for input
    #[arg(long, global = true)]
    tick_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through the menu, dialog and message widgets
    Demo,

    /// Show the symbolic name of every key pressed
    Keys,

    /// Print the byte-to-key table
    Table {
        /// Table convention (default: this platform's)
        #[arg(long, value_enum)]
        convention: Option<ConventionArg>,

        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormatArg,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ConventionArg {
    Vt100,
    Console,
}

impl From<ConventionArg> for Convention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Vt100 => Convention::Vt100,
            ConventionArg::Console => Convention::Console,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log.clone()) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match &cli.command {
        Commands::Demo => {
            load_config(&cli).and_then(|config| cmd_run(&config, Box::new(Home::new(SharedProfile::default()))))
        }
        Commands::Keys => load_config(&cli).and_then(|config| cmd_run(&config, Box::new(KeyInspector::new()))),
        Commands::Table { convention, format } => {
            let convention = (*convention).map(Convention::from).unwrap_or_else(Convention::native);
            cmd_table(convention, (*format).into())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        // Already written to the console by the program
        Err(Error::Fault(_)) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// SETUP
// ============================================================================

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("winter").join("winter.log"))
}

/// Install a file subscriber when `--log` was given. The console is in
/// raw mode while a program runs, so logs never go to it.
fn init_logging(log: Option<Option<PathBuf>>) -> Result<(), String> {
    let Some(path) = log else {
        return Ok(());
    };
    let path = path
        .or_else(default_log_path)
        .ok_or("no cache directory found; pass --log=FILE")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("{}: {}", parent.display(), e))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("{}: {}", path.display(), e))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("winter=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Configuration file (or defaults), then command-line overrides.
fn load_config(cli: &Cli) -> winter::Result<ProgramConfig> {
    let mut config = match &cli.config {
        Some(path) => ProgramConfig::load(path)?,
        None => ProgramConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if let Some(title) = &cli.title {
        config.title = Some(title.clone());
    }
    if let Some(kill_key) = cli.kill_key {
        config.kill_key = kill_key;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick_ms = tick_ms;
    }
    if config.title.is_none() {
        config.title = Some("Winter".to_string());
    }
    config.validate()?;
    Ok(config)
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn cmd_run(config: &ProgramConfig, initial: ScreenBox) -> winter::Result<()> {
    install_panic_hook();
    let mut program = Program::on_terminal(config)?;
    program.run(initial)
}

fn cmd_table(convention: Convention, format: OutputFormat) -> winter::Result<()> {
    print!("{}", format_table(convention, format)?);
    Ok(())
}
