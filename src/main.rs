use clap::Parser;

use fire_input::cli::{Cli, run};

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("fire-input: {e}");
        std::process::exit(1);
    }
}
