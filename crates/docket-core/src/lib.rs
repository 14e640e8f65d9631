pub mod backdrop;
pub mod cli;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod theme;
pub mod view;

use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{debug, info, warn};

#[tracing::instrument(skip_all)]
pub fn run(raw_args: Vec<OsString>) -> anyhow::Result<()> {
    let cli = cli::GlobalCli::parse_from(raw_args);

    cli::init_tracing(cli.verbose, cli.quiet)?;

    info!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        "starting docket session"
    );

    let mut cfg = config::Config::load(cli.config.as_deref())?;
    cfg.apply_overrides(
        cli.rc_overrides
            .into_iter()
            .map(|kv| (kv.key, kv.value)),
    );

    let data_dir = config::resolve_data_dir(&cfg, cli.data.as_deref())
        .context("failed to resolve data directory")?;

    let data = datastore::DataStore::open(&data_dir).with_context(|| {
        format!("failed to open datastore at {}", data_dir.display())
    })?;

    let store = store::TaskStore::open(data);
    let renderer = render::Renderer::new(&cfg)?;
    let mut session = session::Session::new(store, cfg);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    session.draw(&renderer, &mut stdout, Utc::now())?;

    loop {
        write!(stdout, "{}", session.prompt())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            debug!("stdin closed");
            break;
        }

        let now = Utc::now();
        match session.handle_line(&line, now) {
            Ok(session::Outcome::Quit) => break,
            Ok(session::Outcome::Continue) => {}
            Err(err) => {
                // the session keeps rendering with best-available data
                warn!(error = %err, "command failed");
                session.set_notice(format!("error: {err:#}"));
            }
        }

        session.draw(&renderer, &mut stdout, now)?;
    }

    info!("session closed");
    Ok(())
}
