//! CLI command handler: walk the given paths, print sorted sizes, fail if anything was unreadable.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::aggregate::{Summary, aggregate};
use crate::engine::arg_parser::Cli;
use crate::engine::format::{format_row, format_size};
use crate::engine::progress::{create_counter, progress_callback, refresh_bar};
use crate::utils::pardu_toml::{apply_file_to_opts, load_pardu_toml};
use crate::utils::setup_logging;
use crate::{Opts, SizeUnit, WalkOpts, start_walk_with_cancel};

/// Config file first, then CLI flags on top.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    let file = std::env::current_dir()
        .ok()
        .and_then(|dir| load_pardu_toml(&dir));
    if let Some(file) = &file {
        apply_file_to_opts(file, &mut opts);
    }
    apply_cli_to_opts(cli, &mut opts);
    setup_logging(opts.verbose);
    if file.is_some() {
        debug!("Loaded settings from config file");
    }
    opts
}

pub(crate) fn apply_cli_to_opts(cli: &Cli, opts: &mut Opts) {
    opts.follow_links |= cli.follow_symlinks;
    opts.show_all |= cli.all;
    opts.one_filesystem |= cli.one_file_system;
    opts.total |= cli.total;
    opts.verbose |= cli.verbose;
    if cli.jobs.is_some() {
        opts.num_threads = cli.jobs;
    }
    if cli.human_size {
        opts.unit = SizeUnit::Human;
    } else if cli.kilo_byte {
        opts.unit = SizeUnit::Kilo;
    } else if cli.byte {
        opts.unit = SizeUnit::Bytes;
    }
}

/// Walk, print, and turn any per-path error into a failing exit after the output is written.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    let handles = start_walk_with_cancel(&cli.paths, &WalkOpts::from(&opts), cancel)?;

    let bar = opts.verbose.then(|| create_counter("Scanning"));
    let on_progress = progress_callback(&bar);
    let summary = aggregate(handles, &cli.paths, opts.show_all, on_progress.as_deref())?;
    if let Some(bar) = &bar {
        refresh_bar(bar);
        eprintln!();
    }
    debug!("Walk stats: {:?}", summary.stats);

    print_summary(&summary, &opts).context("write results")?;

    if !summary.errors.is_empty() {
        for err in &summary.errors {
            warn!("{}", err);
        }
        bail!("{} path(s) could not be read", summary.errors.len());
    }
    Ok(())
}

fn print_summary(summary: &Summary, opts: &Opts) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (path, size) in &summary.rows {
        writeln!(
            out,
            "{}",
            format_row(&format_size(*size, opts.unit), &path.display().to_string())
        )?;
    }
    if opts.total {
        writeln!(
            out,
            "{}",
            format_row(&format_size(summary.total, opts.unit), "TOTAL")
        )?;
    }
    out.flush()
}
