use clap::Parser;
use dayplan::cli::commands::Cli;
use dayplan::cli::handlers;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        log::error!("event=command_failed error={}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
