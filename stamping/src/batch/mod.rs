//! Runs a batch of stamping jobs: one output PDF per entry of a name list.


use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
};

use crate::{
    error::{JobError, Result, StampError},
    nameformat::NameFormat,
    naming::{CollisionPolicy, DEFAULT_PREFIX, OutputNamer, OutputNaming},
    output,
    stamp::{StampConfig, stamp},
    template::Template,
};

/// Options controlling how a batch names and writes its outputs.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOptions {
    pub naming: OutputNaming,
    pub collisions: CollisionPolicy,
    pub file_prefix: String,
    /// If `false`, an entry whose output file already exists fails rather than replacing it.
    pub overwrite_existing: bool,
    /// Number of jobs to run at once. `1` runs every job on the calling thread.
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            naming: OutputNaming::default(),
            collisions: CollisionPolicy::default(),
            file_prefix: DEFAULT_PREFIX.to_string(),
            overwrite_existing: true,
            jobs: 1,
        }
    }
}

/// Specifies the entries of a batch and where its outputs go, for [Batch::run].
pub struct BatchSpec<'a> {
    /// Path of the name source, to identify it in errors.
    pub source: &'a Path,
    pub names: &'a [String],
    /// Directory to write outputs into. Created if missing.
    pub output_dir: &'a Path,
}

/// Batch event emitted to track progress.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// An entry's output was written.
    Written {
        /// Zero-based position of the entry in the name source.
        index: usize,
        path: &'a Path,
        completed: usize,
        total: usize,
    },
    /// An entry failed. The batch continues with the remaining entries.
    Failed {
        error: &'a JobError,
        completed: usize,
        total: usize,
    },
    /// Indicates that the batch has completed and that no more events will follow.
    Completed,
    /// Indicates that the batch has been cancelled, and that no more events will follow.
    Cancelled,
}

/// Trait to implement to receive notifications about batch events, or to cancel the batch early.
pub trait BatchEvents {
    fn on_event(&mut self, event: BatchEvent<'_>);
    fn do_continue(&self) -> bool;
}

/// Outcome of a batch that was able to start.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Written outputs, in name source order.
    pub written: Vec<PathBuf>,
    /// Failed entries, in name source order.
    pub failed: Vec<JobError>,
    /// `true` if the batch was cancelled before every entry was attempted.
    pub cancelled: bool,
}

impl BatchReport {
    /// Returns `true` if every entry was written.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }
}

/// One entry of a batch, planned before any output is produced.
#[derive(Debug)]
struct Job<'a> {
    index: usize,
    input: &'a str,
    text: String,
    path: PathBuf,
}

impl Job<'_> {
    fn run(
        &self,
        template: &Template,
        config: &StampConfig,
        overwrite_existing: bool,
    ) -> Result<()> {
        log::debug!("Stamping {:?} into {:?}.", self.text, self.path);
        let pdf = stamp(template, &self.text, config)?;
        output::write_output(&self.path, &pdf, overwrite_existing)
    }

    fn failed(&self, error: StampError) -> JobError {
        JobError {
            index: self.index,
            input: self.input.to_string(),
            error,
        }
    }
}

/// Accumulates job outcomes into a [BatchReport], emitting an event for each.
struct Progress<'e> {
    events: &'e mut dyn BatchEvents,
    written: Vec<(usize, PathBuf)>,
    failed: Vec<JobError>,
    completed: usize,
    total: usize,
}

impl Progress<'_> {
    fn record(&mut self, job: &Job, outcome: Result<()>) {
        self.completed += 1;
        match outcome {
            Ok(()) => {
                self.written.push((job.index, job.path.clone()));
                self.events.on_event(BatchEvent::Written {
                    index: job.index,
                    path: &job.path,
                    completed: self.completed,
                    total: self.total,
                });
            }
            Err(error) => self.fail(job.failed(error)),
        }
    }

    fn fail(&mut self, error: JobError) {
        log::debug!("Failed {error}.");
        self.failed.push(error);
        if let Some(error) = self.failed.last() {
            self.events.on_event(BatchEvent::Failed {
                error,
                completed: self.completed,
                total: self.total,
            });
        }
    }

    fn finish(mut self, cancelled: bool) -> BatchReport {
        self.events.on_event(if cancelled {
            BatchEvent::Cancelled
        } else {
            BatchEvent::Completed
        });

        self.written.sort_by_key(|(index, _)| *index);
        self.failed.sort_by_key(|error| error.index);
        BatchReport {
            written: self.written.into_iter().map(|(_, path)| path).collect(),
            failed: self.failed,
            cancelled,
        }
    }
}

/// Encapsulates the prepared values shared by every job of a batch.
pub struct Batch<'a> {
    template: &'a Template,
    config: &'a StampConfig,
    name_format: &'a NameFormat,
    options: &'a BatchOptions,
}

impl<'a> Batch<'a> {
    pub fn new(
        template: &'a Template,
        config: &'a StampConfig,
        name_format: &'a NameFormat,
        options: &'a BatchOptions,
    ) -> Self {
        Self {
            template,
            config,
            name_format,
            options,
        }
    }

    /// Stamps every entry of `spec`, reporting each outcome to `events`.
    ///
    /// Returns an error only if the batch cannot start. Failures of individual entries are
    /// reported as events and in the returned [BatchReport], and do not stop the batch.
    pub fn run(&self, spec: BatchSpec, events: &mut dyn BatchEvents) -> Result<BatchReport> {
        if spec.names.is_empty() {
            return Err(StampError::SourceListEmpty {
                path: spec.source.to_owned(),
            });
        }
        output::create_output_dir(spec.output_dir)?;

        let mut progress = Progress {
            events,
            written: Vec::new(),
            failed: Vec::new(),
            completed: 0,
            total: spec.names.len(),
        };

        let jobs = self.plan(&spec, &mut progress);
        let workers = self.options.jobs.min(jobs.len());
        log::info!(
            "Stamping {} entries of {:?} into {:?} using {} worker(s).",
            jobs.len(),
            spec.source,
            spec.output_dir,
            workers.max(1),
        );

        let cancelled = if workers > 1 {
            self.run_parallel(&jobs, workers, &mut progress)
        } else {
            self.run_sequential(&jobs, &mut progress)
        };
        Ok(progress.finish(cancelled))
    }

    /// Formats every entry and assigns its output path. Entries that cannot be given a path are
    /// reported as failed immediately.
    fn plan<'n>(&self, spec: &BatchSpec<'n>, progress: &mut Progress) -> Vec<Job<'n>> {
        let mut namer = OutputNamer::new(
            spec.output_dir,
            &self.options.file_prefix,
            self.options.naming,
            self.options.collisions,
            spec.names.len(),
        );

        let mut jobs = Vec::with_capacity(spec.names.len());
        for (index, input) in spec.names.iter().enumerate() {
            let text = self.name_format.format_entry(input, index);
            match namer.assign(index, &text) {
                Ok(path) => jobs.push(Job {
                    index,
                    input,
                    text,
                    path,
                }),
                Err(error) => {
                    progress.completed += 1;
                    progress.fail(JobError {
                        index,
                        input: input.clone(),
                        error,
                    });
                }
            }
        }
        jobs
    }

    /// Runs `jobs` one at a time on the calling thread. Returns `true` if cancelled.
    fn run_sequential(&self, jobs: &[Job], progress: &mut Progress) -> bool {
        for (i, job) in jobs.iter().enumerate() {
            let outcome = job.run(self.template, self.config, self.options.overwrite_existing);
            progress.record(job, outcome);

            if !progress.events.do_continue() && i + 1 < jobs.len() {
                return true;
            }
        }
        false
    }

    /// Runs `jobs` on `workers` threads, each with its own copy of the template. Outcomes are
    /// reported on the calling thread as they arrive. Returns `true` if cancelled.
    fn run_parallel(&self, jobs: &[Job], workers: usize, progress: &mut Progress) -> bool {
        let next_job = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        let template_path = self.template.path();
        let template_bytes = self.template.bytes();
        let config = self.config;
        let overwrite_existing = self.options.overwrite_existing;

        std::thread::scope(|scope| {
            let (sender, receiver) = mpsc::channel::<(usize, Result<()>)>();
            for worker in 0..workers {
                let sender = sender.clone();
                let (next_job, stop) = (&next_job, &stop);
                scope.spawn(move || {
                    let template = Template::reparse(template_path, template_bytes);
                    loop {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        let i = next_job.fetch_add(1, Ordering::SeqCst);
                        let Some(job) = jobs.get(i) else {
                            break;
                        };
                        let outcome = match &template {
                            Ok(template) => job.run(template, config, overwrite_existing),
                            Err(err) => Err(StampError::Render {
                                text: job.text.clone(),
                                cause: format!("worker {worker} could not load template: {err}"),
                            }),
                        };
                        if sender.send((i, outcome)).is_err() {
                            log::warn!("Failed to send job outcome on channel.");
                            break;
                        }
                    }
                });
            }
            drop(sender);

            let mut cancelled = false;
            for (i, outcome) in receiver {
                progress.record(&jobs[i], outcome);
                if !cancelled && !progress.events.do_continue() {
                    log::debug!("Cancelling batch, waiting for running jobs.");
                    cancelled = true;
                    stop.store(true, Ordering::SeqCst);
                }
            }
            cancelled && progress.completed < progress.total
        })
    }
}
