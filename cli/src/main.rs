use clap::Parser;
use dotenv::dotenv;

mod cli_interface;
mod commands;
mod console;

use bulkcp::setup_info_logger;
use cli_interface::{Cli, Commands};
use commands::{check::handle_check_command, dump::handle_dump_command, load::handle_load_command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    setup_info_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load(args) => handle_load_command(args).await,
        Commands::Dump(args) => handle_dump_command(args).await,
        Commands::Check(args) => handle_check_command(args).await,
    }
}
