use std::env;
use std::io;

use anyhow::Result;
use stakeledger::cli::CliHandler;

fn main() -> Result<()> {
    env_logger::init();

    let mut handler = CliHandler::new(io::stdout());
    handler.handle_command(env::args().collect())
}
