//! pardu CLI: disk utilization calculator (parallel edition).

use anyhow::Result;
use clap::Parser;
use pardu::engine::arg_parser::Cli;
use pardu::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
