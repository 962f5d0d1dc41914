use anyhow::Result;
use clap::{CommandFactory, Parser};

use offchat::app::{run_check, run_repl_mode, run_web_server, setup_from_cli};
use offchat::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Some(shell) = cli.generate {
        clap_complete::generate(shell, &mut Cli::command(), "offchat", &mut std::io::stdout());
        return Ok(());
    }

    let config = setup_from_cli(&cli)?;

    match cli.command.clone().unwrap_or(Commands::Chat) {
        Commands::Chat => run_repl_mode(config, cli.verbose).await,
        Commands::Web {
            bind,
            port,
            static_dir,
            ..
        } => run_web_server(config, cli.verbose, &bind, port, static_dir).await,
        Commands::Check => {
            if !run_check(&config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
