//! mlip-explore CLI entry point.

use clap::Parser;

use mlip_explore::cli::commands::{status, validate};
use mlip_explore::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Status(args) => status::execute(args, cli.json),
        Commands::Validate(args) => validate::execute(args, cli.json),
    };

    if let Err(err) = result {
        mlip_explore::cli::handle_error(err, cli.json);
    }
}
