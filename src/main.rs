use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxrate::core::log::init_logging;
use fxrate::core::money::Amount;
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show conversion rates from BASE to each TARGET
    Rate {
        base: String,
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Convert an amount between currencies
    Convert {
        amount: Decimal,
        from: String,
        to: String,
    },
    /// Sum amounts given as VALUE:CURRENCY into one currency
    Total {
        #[arg(long)]
        to: String,
        #[arg(required = true)]
        amounts: Vec<Amount>,
    },
}

impl From<Commands> for fxrate::AppCommand {
    fn from(cmd: Commands) -> fxrate::AppCommand {
        match cmd {
            Commands::Rate { base, targets } => fxrate::AppCommand::Rate { base, targets },
            Commands::Convert { amount, from, to } => fxrate::AppCommand::Convert {
                amount: Amount::new(amount, &from),
                target: to,
            },
            Commands::Total { to, amounts } => fxrate::AppCommand::Total {
                amounts,
                target: to,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxrate::cli::setup::setup().map(|path| {
            println!("Created default configuration at {}", path.display());
        }),
        Some(cmd) => fxrate::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
