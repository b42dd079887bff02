//! Run driver.
//!
//! [`AnalysisManager`] reads the run keys from the steering store, prepares
//! the input and output streams, creates the configured selectors and then
//! loops over every record of every input file, running the selectors in
//! order. At the end it writes the output ntuple and the histograms.

use crate::config::{ConfigView, Store};
use crate::error::{AnalysisError, Result, ResultExt};
use crate::histogram::HistogramFile;
use crate::log::{Log, LogLevel};
use crate::stage::{SelectorRegistry, StageSlot, StageStats, Status};
use crate::stream::{RecordBackend, Service};
use std::time::{Duration, Instant};

/// Run settings read from the steering store.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// `inputFileNames`
    pub input_files: Vec<String>,
    /// `inputTreeName`
    pub tree_name: String,
    /// `nEventsMax`; `None` processes every record.
    pub max_events: Option<u64>,
    /// `fillOutputTree`
    pub fill_output: bool,
    /// `outputNtupleFileName`
    pub ntuple_path: String,
    /// `outputHistogramFileName`
    pub histogram_path: String,
    /// `selectors`
    pub selectors: Vec<String>,
    /// `loglevel`
    pub log_level: LogLevel,
}

impl RunConfig {
    pub fn from_store(store: &Store) -> Result<Self> {
        let input_files: Vec<String> = store.get("inputFileNames")?;
        if input_files.is_empty() {
            return Err(AnalysisError::Config("no input files specified".to_string()));
        }

        let max_events: i32 = store.get_or("nEventsMax", -1)?;
        let level_name: String = store.get_or("loglevel", "info".to_string())?;
        let log_level = LogLevel::parse(&level_name)
            .ok_or_else(|| AnalysisError::Config(format!("unknown log level '{}'", level_name)))?;

        Ok(Self {
            input_files,
            tree_name: store.get_or("inputTreeName", "tree".to_string())?,
            max_events: u64::try_from(max_events).ok(),
            fill_output: store.get_or("fillOutputTree", true)?,
            ntuple_path: store.get_or("outputNtupleFileName", "ntuple.json".to_string())?,
            histogram_path: store
                .get_or("outputHistogramFileName", "histograms.json".to_string())?,
            selectors: store.get_or("selectors", Vec::new())?,
            log_level,
        })
    }
}

/// Counters of one selector at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub name: String,
    pub stats: StageStats,
}

/// Outcome of [`AnalysisManager::run`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files: usize,
    pub processed: u64,
    pub accepted: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Entries written to the output ntuple; zero when filling is disabled.
    pub written: usize,
    pub elapsed: Duration,
    pub stages: Vec<StageSummary>,
}

impl RunSummary {
    /// Records per second over the whole run.
    pub fn frequency(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.processed as f64 / seconds
        } else {
            0.0
        }
    }
}

pub struct AnalysisManager {
    config: RunConfig,
    service: Service,
    stages: Vec<StageSlot>,
    log: Log,
}

impl AnalysisManager {
    /// Prepare the streams and create and initialise every selector.
    pub fn new(
        store: Store,
        backend: Box<dyn RecordBackend>,
        registry: &SelectorRegistry,
    ) -> Result<Self> {
        let config = RunConfig::from_store(&store)?;
        let log = Log::new("AnalysisManager").with_level(config.log_level);

        let mut service = Service::new(
            config.tree_name.clone(),
            backend,
            log.child("Service"),
        );
        service
            .configure_input(&config.input_files)
            .context("preparing input")?;
        service.create_output_stream()?;

        let view = ConfigView::new(store);
        let mut stages = Vec::with_capacity(config.selectors.len());
        for name in &config.selectors {
            let selector = registry.create(name).ok_or_else(|| {
                log.error(format!("Couldn't recognise selector '{}'", name));
                AnalysisError::UnknownSelector(name.clone())
            })?;
            log.info(format!("Adding selector '{}' to sequence", name));

            let mut stage = StageSlot::new(selector, view.clone())?;
            stage.initialise(&mut service)?;
            stages.push(stage);
        }
        if stages.is_empty() {
            log.warning("No selectors configured; every record is accepted");
        }

        Ok(Self {
            config,
            service,
            stages,
            log,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    pub fn stages(&self) -> &[StageSlot] {
        &self.stages
    }

    fn report_progress(&self, processed: u64, limit: u64, start: Instant) {
        let duration = start.elapsed().as_secs_f64();
        let frequency = if duration > 0.0 {
            processed as f64 / duration
        } else {
            0.0
        };
        let remaining = if frequency > 0.0 {
            limit.saturating_sub(processed) as f64 / frequency
        } else {
            0.0
        };
        self.log.info(format!(
            "Processed : {:>4}%  ---  frequency : {:>8.0} records/sec  ---  time : {:>4.0} sec  ---  remaining time : {:>4.0} sec",
            if limit > 0 { 100 * processed / limit } else { 100 },
            frequency,
            duration,
            remaining
        ));
    }

    /// Process every record and write the outputs.
    ///
    /// `Skip` and `Error` statuses stop the selector sequence for one record;
    /// any lifecycle failure aborts the run before outputs are written.
    pub fn run(mut self) -> Result<RunSummary> {
        let limit = self
            .config
            .max_events
            .map_or(self.service.n_events(), |max| max.min(self.service.n_events()));
        let report_every = (limit / 10).max(1);
        let start = Instant::now();
        let mut summary = RunSummary::default();

        self.log.info(format!("Starting analysis of {} records", limit));

        while self.service.has_next_input() && summary.processed < limit {
            let name = self.service.advance_to_next_input()?.to_string();
            summary.files += 1;

            for stage in &mut self.stages {
                stage.begin_input_file(&mut self.service).map_err(|e| {
                    self.log.error(format!("Couldn't bind columns: {}", e));
                    e
                })?;
            }

            let entries = self.service.input_tree().map_or(0, |tree| tree.entries());
            self.log
                .info(format!("Looping over {} records of '{}'", entries, name));

            for entry in 0..entries {
                if summary.processed >= limit {
                    break;
                }
                self.service.begin_record(entry)?;
                summary.processed += 1;

                let mut outcome = Status::Success;
                for stage in &mut self.stages {
                    let status = stage.execute_event(&mut self.service)?;
                    if status != Status::Success {
                        self.log.debug(format!(
                            "Record {} of '{}' stopped by '{}' ({})",
                            entry,
                            name,
                            stage.name(),
                            status
                        ));
                        outcome = status;
                        break;
                    }
                }

                match outcome {
                    Status::Success => {
                        summary.accepted += 1;
                        if self.config.fill_output {
                            self.service.fill_output()?;
                        }
                    }
                    Status::Skip => summary.skipped += 1,
                    Status::Error => summary.failed += 1,
                }

                if summary.processed % report_every == 0 {
                    self.report_progress(summary.processed, limit, start);
                }
            }

            for stage in &mut self.stages {
                stage.end_input_file(&mut self.service).map_err(|e| {
                    self.log.error(format!("Couldn't release columns: {}", e));
                    e
                })?;
            }
        }

        for stage in &mut self.stages {
            stage.finalise(&mut self.service).map_err(|e| {
                self.log.error(format!("Couldn't finalise selectors: {}", e));
                e
            })?;
        }

        if self.config.fill_output {
            summary.written = self
                .service
                .write_output(&self.config.ntuple_path)
                .with_context(|| format!("writing ntuple '{}'", self.config.ntuple_path))?;
        }

        let mut histograms = HistogramFile::new();
        for stage in &self.stages {
            histograms.insert(stage.histograms().clone());
        }
        self.service
            .write_histograms(&self.config.histogram_path, &histograms)
            .with_context(|| format!("writing histograms '{}'", self.config.histogram_path))?;

        summary.elapsed = start.elapsed();
        summary.stages = self
            .stages
            .iter()
            .map(|stage| StageSummary {
                name: stage.name().to_string(),
                stats: stage.stats(),
            })
            .collect();

        self.log.info(format!(
            "Processed {} records ({} accepted, {} skipped, {} failed) in {:.2} sec",
            summary.processed,
            summary.accepted,
            summary.skipped,
            summary.failed,
            summary.elapsed.as_secs_f64()
        ));
        Ok(summary)
    }
}
