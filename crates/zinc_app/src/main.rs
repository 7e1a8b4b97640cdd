mod platform;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use zinc_logging::LogDestination;

use platform::{Jobs, RunOptions};

#[derive(Debug, Parser)]
#[command(name = "zinc", version, about = "Download media and generate subtitles")]
struct Cli {
    /// Settings file (RON). Created with defaults on first run.
    #[arg(long, default_value = "zinc_settings.ron")]
    settings: PathBuf,

    #[arg(long, value_enum, default_value_t = LogTarget::Terminal)]
    log: LogTarget,

    #[arg(long)]
    verbose: bool,

    /// Estimate transcription times for CPU instead of GPU.
    #[arg(long)]
    cpu: bool,

    /// Remove finished tasks before exiting.
    #[arg(long)]
    clear_completed: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download one or more URLs.
    Download {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Generate subtitles after each download.
        #[arg(long)]
        subtitles: bool,
        /// `quality` or `quality:container`.
        #[arg(long, default_value = "best")]
        format: String,
    },
    /// Transcribe local media files.
    Transcribe {
        #[arg(required = true)]
        paths: Vec<String>,
        #[arg(long)]
        engine: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// `word` or `sentence`.
        #[arg(long)]
        style: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

impl Cli {
    fn into_options(self) -> RunOptions {
        let jobs = match self.command {
            Command::Download {
                urls,
                subtitles,
                format,
            } => Jobs::Downloads {
                urls,
                format,
                subtitles,
            },
            Command::Transcribe {
                paths,
                engine,
                model,
                style,
            } => Jobs::Transcriptions {
                paths,
                engine,
                model,
                style,
            },
        };
        RunOptions {
            settings_path: self.settings,
            use_cpu: self.cpu,
            clear_completed: self.clear_completed,
            jobs,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    zinc_logging::initialize(cli.log.into(), level);

    platform::run_app(cli.into_options()).await
}
