// src/main.rs

use checkflow::{cli, end_session, logging, run};

fn main() {
    if let Err(err) = run_main() {
        eprintln!("checkflow error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let result = run(args);
    end_session();
    result
}
