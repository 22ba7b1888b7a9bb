use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result, bail};
use clap::Args;
use simple_bar::ProgressBar;
use stamping::{
    batch::{Batch, BatchEvent, BatchEvents, BatchReport, BatchSpec},
    source,
    template::Template,
};

use super::stampargs::StampArgs;

/// Stamps each name from a CSV file onto the certificate template, writing one PDF per name.
#[derive(Args, Debug)]
pub struct Command {
    /// Path to the certificate template PDF. Only its first page is used.
    template: PathBuf,

    /// Path to the CSV file of names. Names are read from the first column, or from a column
    /// headed "Name" if there is one.
    names: PathBuf,

    /// Directory to write the certificates into. It is created if it does not exist.
    output_dir: PathBuf,

    /// Options relating to how names are stamped and the certificates written.
    #[command(flatten)]
    stamp: StampArgs,

    /// Do not show a progress bar.
    #[arg(long)]
    no_progress: bool,
}

/// Runs the subcommand.
pub fn run(cmd: &Command, xdg_dirs: &xdg::BaseDirectories) -> Result<()> {
    let continue_intent = Arc::new(AtomicBool::new(true));
    let handler_intent = continue_intent.clone();
    ctrlc::set_handler(move || handler_intent.store(false, Ordering::SeqCst))?;

    let mut events = EventDisplayer::new(!cmd.no_progress, continue_intent);
    let report = generate(cmd, xdg_dirs, &mut events)?;

    if report.cancelled {
        bail!(
            "cancelled after writing {} certificate(s)",
            report.written.len()
        );
    }
    if !report.failed.is_empty() {
        bail!(
            "{} of {} certificate(s) could not be written",
            report.failed.len(),
            report.failed.len() + report.written.len()
        );
    }
    Ok(())
}

/// Validates the settings and inputs, then runs the batch.
fn generate(
    cmd: &Command,
    xdg_dirs: &xdg::BaseDirectories,
    events: &mut dyn BatchEvents,
) -> Result<BatchReport> {
    let settings = cmd.stamp.resolve_settings(xdg_dirs)?;
    let prepared = settings
        .prepare()
        .with_context(|| "validating settings")?;
    let template = Template::open(&cmd.template)?;
    let names = source::read_names(&cmd.names, &prepared.source)?;

    let batch = Batch::new(
        &template,
        &prepared.stamp,
        &prepared.name_format,
        &prepared.batch,
    );
    let spec = BatchSpec {
        source: &cmd.names,
        names: &names,
        output_dir: &cmd.output_dir,
    };
    Ok(batch.run(spec, events)?)
}

struct EventDisplayer {
    show_progress: bool,
    progress_bar: Option<ProgressBar>,
    continue_intent: Arc<AtomicBool>,
}

impl EventDisplayer {
    fn new(show_progress: bool, continue_intent: Arc<AtomicBool>) -> Self {
        EventDisplayer {
            show_progress,
            progress_bar: None,
            continue_intent,
        }
    }

    fn update_progress(&mut self, total: usize) {
        if !self.show_progress {
            return;
        }
        self.progress_bar
            .get_or_insert_with(|| ProgressBar::cargo_style(total as u32, 80, true))
            .update();
    }
}

impl BatchEvents for EventDisplayer {
    fn on_event(&mut self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Written { path, total, .. } => {
                log::info!("Wrote {path:?}.");
                self.update_progress(total);
            }
            BatchEvent::Failed { error, total, .. } => {
                eprintln!("Error (continuing): {error}.");
                self.update_progress(total);
            }
            BatchEvent::Completed => {
                eprintln!("Stamping complete.");
            }
            BatchEvent::Cancelled => {
                eprintln!("Stamping cancelled.");
            }
        }
    }

    fn do_continue(&self) -> bool {
        self.continue_intent.load(Ordering::Relaxed)
    }
}
