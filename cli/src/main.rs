use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::commands;
use cli::input::TerminalPrompter;
use common::config::Config;
use common::logger::init_logger;
use log::{error, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use util::temp::TempStack;

#[derive(Parser)]
#[command(
    name = "pex-tool",
    about = "Prepares, grades and returns programming exercise submissions",
    version
)]
struct Cli {
    /// Log at debug level regardless of configuration.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out renamed submission copies for manual grading.
    Prepare {
        /// Roster file: one group per line, members comma-separated.
        #[arg(long)]
        groups: PathBuf,
        /// Downloaded submissions (archive or folder).
        #[arg(long)]
        submissions: PathBuf,
        /// Output folder for the renamed copies.
        #[arg(long, default_value = "./submissions")]
        out: PathBuf,
    },
    /// Run an interactive grading session against a grading package.
    Grade {
        /// Grading package (archive or folder) the Docker image is built from.
        #[arg(long)]
        grading_package: PathBuf,
        #[arg(long)]
        groups: PathBuf,
        #[arg(long)]
        submissions: PathBuf,
        #[arg(long)]
        grading_sheet: PathBuf,
        /// Where to save the updated sheet (defaults to in-place).
        #[arg(long)]
        out_grading_sheet: Option<PathBuf>,
    },
    /// Collect hand-written grades and bundle feedback for re-upload.
    Finish {
        #[arg(long)]
        groups: PathBuf,
        #[arg(long)]
        grading_sheet: PathBuf,
        /// Folder holding the graded submission copies.
        #[arg(long, default_value = "./submissions")]
        feedback: PathBuf,
        #[arg(long, default_value = "./_out_feedback.zip")]
        out_feedback: PathBuf,
        #[arg(long)]
        out_grading_sheet: Option<PathBuf>,
        /// Exercise name inserted into the feedback filenames.
        #[arg(long)]
        submission_name: Option<String>,
    },
    /// Edit one participant's stored feedback comment.
    EditFeedback {
        #[arg(long)]
        grading_sheet: PathBuf,
        /// (Part of) the participant's full name.
        student_name: String,
        /// Where to save the updated sheet (defaults to in-place).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn run(cli: Cli, temp: Arc<Mutex<TempStack>>) -> Result<()> {
    let mut prompter = TerminalPrompter;

    match cli.command {
        Commands::Prepare {
            groups,
            submissions,
            out,
        } => commands::prepare(&groups, &submissions, &out, &temp, &mut prompter),
        Commands::Grade {
            grading_package,
            groups,
            submissions,
            grading_sheet,
            out_grading_sheet,
        } => {
            let out = out_grading_sheet.unwrap_or_else(|| grading_sheet.clone());
            commands::grade(
                &grading_package,
                &groups,
                &submissions,
                &grading_sheet,
                &out,
                &temp,
                &mut prompter,
            )
        }
        Commands::Finish {
            groups,
            grading_sheet,
            feedback,
            out_feedback,
            out_grading_sheet,
            submission_name,
        } => {
            let out = out_grading_sheet.unwrap_or_else(|| grading_sheet.clone());
            commands::finish(
                &groups,
                &grading_sheet,
                &feedback,
                &out_feedback,
                &out,
                submission_name.as_deref(),
                &temp,
            )
        }
        Commands::EditFeedback {
            grading_sheet,
            student_name,
            out,
        } => {
            let out = out.unwrap_or_else(|| grading_sheet.clone());
            let mut open = |path: &Path| -> Result<()> { Ok(runner::open_path(path)?) };
            commands::edit_feedback(&grading_sheet, &student_name, &out, &mut prompter, &mut open)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::init();
    let level = if cli.verbose { "debug" } else { &config.log_level };
    init_logger(level, &config.log_file, config.log_to_stdout);

    // Shared across the worker and the interrupt handler: whichever path
    // ends the process removes the session's temporary folders first.
    let temp = Arc::new(Mutex::new(TempStack::new()));
    let worker_temp = Arc::clone(&temp);

    let worker = tokio::task::spawn_blocking(move || run(cli, worker_temp));

    tokio::select! {
        result = worker => {
            let failed = match result {
                Ok(Ok(())) => false,
                Ok(Err(e)) => {
                    error!("{e:#}");
                    true
                }
                Err(e) => {
                    error!("worker panicked: {e}");
                    true
                }
            };
            temp.lock().expect("temp stack lock").drain();
            if failed {
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; removing temporary folders before exiting.");
            temp.lock().expect("temp stack lock").drain();
            std::process::exit(130);
        }
    }
}
