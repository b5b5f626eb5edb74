use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use autoreport_core::{
    present, render_text, update, AppViewModel, Job, JobState, Msg, ResultView, StudyFile,
};
use clap::Parser;
use report_logging::{report_debug, report_info, report_warn};

use super::cli::CliArgs;
use super::config::{load_config, AppConfig};
use super::effects::{EffectRunner, Inbound};
use super::{logging, report};

const RECV_INTERVAL: Duration = Duration::from_millis(250);

pub fn run_app() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let mut config = load_config(&args.config_path(), args.config.is_some())?;
    apply_overrides(&mut config, &args);
    logging::initialize(config.log, config.verbose);
    report_info!("autoreport starting against {}", config.base_url);

    let runner = EffectRunner::new(config.engine_config()).context("starting engine")?;
    let mut driver = Driver::new(runner, config);
    driver.run(StudyFile::from_path(&args.study))
}

fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if args.no_download {
        config.download_artifacts = false;
    }
    if let Some(log) = args.log {
        config.log = log;
    }
    config.verbose |= args.verbose;
}

/// What the terminal driver does next, given the current view.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Step {
    Send(Msg),
    Wait,
    Finished,
    Fail(String),
}

/// Walks one study through upload, analysis and polling. A polling transport
/// error is resumed up to `resumes_left` more times before giving up.
pub(crate) fn next_step(view: &AppViewModel, resumes_left: u32) -> Step {
    if view.busy.is_some() {
        return Step::Wait;
    }
    let error = view.last_error.clone();
    match view.state {
        JobState::Unsubmitted => match error {
            Some(err) => Step::Fail(format!("upload failed: {err}")),
            None if view.can_upload => Step::Send(Msg::UploadClicked),
            None => Step::Fail("no study selected".to_string()),
        },
        JobState::Uploaded => match error {
            Some(err) => Step::Fail(format!("could not start analysis: {err}")),
            None => Step::Send(Msg::AnalyzeClicked),
        },
        JobState::Analyzing => match error {
            Some(err) if resumes_left == 0 => Step::Fail(format!("polling failed: {err}")),
            _ => Step::Send(Msg::ResumePolling),
        },
        JobState::Done => Step::Finished,
        JobState::Failed => Step::Fail(
            error.unwrap_or_else(|| "analysis failed".to_string()),
        ),
    }
}

struct Driver {
    job: Job,
    runner: EffectRunner,
    config: AppConfig,
    resumes_left: u32,
}

impl Driver {
    fn new(runner: EffectRunner, config: AppConfig) -> Self {
        Self {
            job: Job::new(),
            runner,
            resumes_left: config.max_poll_resumes,
            config,
        }
    }

    fn run(&mut self, study: StudyFile) -> anyhow::Result<()> {
        println!("Study: {}", study.path.display());
        self.dispatch(Msg::FileSelected(study))?;

        loop {
            match next_step(&self.job.view(), self.resumes_left) {
                Step::Send(msg) => {
                    if msg == Msg::ResumePolling {
                        self.resumes_left = self.resumes_left.saturating_sub(1);
                        report_warn!("Resuming polling ({} resumes left)", self.resumes_left);
                    }
                    self.dispatch(msg)?;
                }
                Step::Wait => self.pump()?,
                Step::Finished => return self.finish(),
                Step::Fail(reason) => bail!(reason),
            }
        }
    }

    fn pump(&mut self) -> anyhow::Result<()> {
        match self.runner.next(RECV_INTERVAL)? {
            Some(Inbound::Core(msg)) => {
                // Engine completions are never rejected.
                let _ = self.dispatch(msg);
            }
            Some(Inbound::Artifacts { ticket, .. }) => {
                report_debug!("Ignoring artifact event for {}", ticket);
            }
            None => {
                let _ = self.dispatch(Msg::Tick);
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, msg: Msg) -> anyhow::Result<()> {
        let job = std::mem::take(&mut self.job);
        let (mut job, outcome) = update(job, msg);
        if job.consume_dirty() {
            println!("{}", job.view().status_line());
        }
        self.job = job;
        let effects = outcome?;
        self.runner.enqueue(effects);
        Ok(())
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        let (Some(result), Some(job_id)) = (self.job.result(), self.job.id()) else {
            bail!("job finished without a result");
        };
        let view = present(result);
        let job_id = job_id.to_string();

        println!();
        print!("{}", render_text(&view));

        let output_dir = self.config.output_dir.clone();
        let report_path = report::save_report(&output_dir, &job_id, &view)?;
        println!("\nReport saved to {}", report_path.display());

        let artifacts = if self.config.download_artifacts {
            self.download(&view)?
        } else {
            Vec::new()
        };
        report::save_record(&output_dir, &job_id, &view, &artifacts)?;
        Ok(())
    }

    // Artifact failures leave the report in place and are only logged.
    fn download(&mut self, view: &ResultView) -> anyhow::Result<Vec<PathBuf>> {
        let mut hrefs: Vec<String> = view.downloads.iter().map(|l| l.href.clone()).collect();
        hrefs.extend(view.thumbnails.iter().cloned());

        let ticket = self.job.ticket();
        self.runner
            .download_artifacts(ticket, hrefs, self.config.output_dir.clone());
        loop {
            match self.runner.next(RECV_INTERVAL)? {
                Some(Inbound::Artifacts {
                    ticket: done,
                    result,
                }) if done == ticket => {
                    return Ok(match result {
                        Ok(paths) => {
                            for path in &paths {
                                println!("Saved {}", path.display());
                            }
                            paths
                        }
                        Err(err) => {
                            report_warn!("Artifact download failed: {}", err);
                            println!("Artifact download failed: {err}");
                            Vec::new()
                        }
                    });
                }
                Some(other) => report_debug!("Ignoring {:?} while downloading", other),
                None => {}
            }
        }
    }
}
