use clap::Parser;
use repeat_cli::app::{run, Cli};

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(cli, &mut stdout) {
        eprintln!("repeat-review: {err:#}");
        std::process::exit(1);
    }
}
