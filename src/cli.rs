#[allow(unused_imports)]
use std::path::PathBuf;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tablecourier")]
#[command(about = "Extract tables from .docx files into fixed-size batch documents", long_about = None)]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the Telegram bridge (long-polling).
    Bridge {
        /// Telegram bot token (env: TELEGRAM_BOT_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Directory for downloads, outputs, and logs (env: TABLECOURIER_WORK_DIR, default ./downloads)
        #[arg(long)]
        work_dir: Option<PathBuf>,
        /// Tables per output document
        #[arg(long, default_value_t = 30)]
        tables_per_file: usize,
        /// Long-poll timeout in seconds
        #[arg(long, default_value_t = 25)]
        poll_timeout: u64,
        /// Max updates per poll
        #[arg(long, default_value_t = 50)]
        poll_limit: usize,
    },

    /// Split local .docx files into table-batch documents.
    Split {
        /// Input files, read in order
        inputs: Vec<PathBuf>,
        /// Directory for the generated documents
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Tables per output document
        #[arg(long, default_value_t = 30)]
        tables_per_file: usize,
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },

    /// List the tables of a local .docx file.
    Inspect {
        input: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}
