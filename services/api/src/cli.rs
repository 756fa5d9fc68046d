use crate::commands::{run_assess, run_train, AssessArgs, TrainArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_risk::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Risk Service",
    about = "Score loan applicants for default risk and manage loan cases",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Fit the default model on a historical CSV and print the training report
    Train(TrainArgs),
    /// Score one applicant JSON file against a freshly trained model
    Assess(AssessArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the historical CSV used to fit the model
    #[arg(long)]
    pub(crate) training_data: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Train(args) => run_train(args),
        Command::Assess(args) => run_assess(args),
    }
}
