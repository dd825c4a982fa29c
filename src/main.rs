use clap::Parser;
use hubspin::cli::{self, Cli, Commands, RunArgs};

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = cli.load_config()?;

    match &cli.command {
        Some(Commands::Run(args)) => {
            init_logging(&config.logging);
            args.apply(&mut config);
            cli::run_batch(&config, args.no_delay).await?;
        }
        None => {
            init_logging(&config.logging);
            let args = RunArgs::default();
            args.apply(&mut config);
            cli::run_batch(&config, args.no_delay).await?;
        }
        Some(Commands::CheckProxies { proxies }) => {
            init_logging_simple();
            if let Some(path) = proxies {
                config.files.proxies = path.clone();
            }
            cli::check_proxies(&config).await?;
        }
        Some(Commands::Message { address, nonce }) => {
            init_logging_simple();
            cli::print_message(&config, address, nonce);
        }
    }

    Ok(())
}
