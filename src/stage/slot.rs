//! Lifecycle state machine around one selector.

use crate::columns::ColumnRegistry;
use crate::config::ConfigView;
use crate::error::{AnalysisError, Result, ResultExt};
use crate::histogram::HistogramDir;
use crate::log::{Log, LogLevel};
use crate::stage::{Selector, StageContext, Status};
use crate::stream::Service;

/// Lifecycle state of a stage.
///
/// `Constructed -> Initialised -> {Bound <-> Unbound} -> Finalised`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Constructed,
    Initialised,
    Bound,
    Unbound,
    Finalised,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Constructed => "constructed",
            StageState::Initialised => "initialised",
            StageState::Bound => "bound",
            StageState::Unbound => "unbound",
            StageState::Finalised => "finalised",
        }
    }
}

/// Per-stage record counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub executed: u64,
    pub accepted: u64,
    pub skipped: u64,
    pub failed: u64,
    pub files: u64,
}

/// A selector plus the resources it owns during a run.
pub struct StageSlot {
    name: String,
    selector: Box<dyn Selector>,
    state: StageState,
    columns: ColumnRegistry,
    config: ConfigView,
    histograms: HistogramDir,
    log: Log,
    stats: StageStats,
}

/// Log level for stage `name`: `loglevel`, overridden by `<name>::loglevel`.
fn stage_level(config: &ConfigView, name: &str) -> Result<LogLevel> {
    let mut level = String::new();
    config.getif("loglevel", &mut level)?;
    config.getif(&ConfigView::param(name, "loglevel"), &mut level)?;
    if level.is_empty() {
        return Ok(LogLevel::default());
    }
    LogLevel::parse(&level)
        .ok_or_else(|| AnalysisError::Config(format!("unknown log level '{}' for '{}'", level, name)))
}

impl StageSlot {
    pub fn new(selector: Box<dyn Selector>, config: ConfigView) -> Result<Self> {
        let name = selector.name().to_string();
        let level = stage_level(&config, &name)?;
        let log = Log::new(name.clone()).with_level(level);
        Ok(Self {
            columns: ColumnRegistry::new(log.child(format!("{}::columns", name))),
            histograms: HistogramDir::new(name.clone()),
            name,
            selector,
            state: StageState::Constructed,
            config,
            log,
            stats: StageStats::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn stats(&self) -> StageStats {
        self.stats
    }

    pub fn columns(&self) -> &ColumnRegistry {
        &self.columns
    }

    pub fn histograms(&self) -> &HistogramDir {
        &self.histograms
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    fn expect_state(&self, operation: &'static str, allowed: &[StageState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        self.log.error(format!(
            "Cannot {} while {}",
            operation,
            self.state.as_str()
        ));
        Err(AnalysisError::InvalidTransition {
            stage: self.name.clone(),
            operation,
            state: self.state.as_str(),
        })
    }

    /// Run `hook` against the selector with a context over this slot.
    fn run<R>(
        &mut self,
        service: &mut Service,
        hook: impl FnOnce(&mut dyn Selector, &mut StageContext) -> R,
    ) -> R {
        let mut ctx = StageContext {
            name: &self.name,
            config: &self.config,
            columns: &mut self.columns,
            service,
            histograms: &mut self.histograms,
            log: &self.log,
        };
        hook(self.selector.as_mut(), &mut ctx)
    }

    pub fn initialise(&mut self, service: &mut Service) -> Result<()> {
        self.expect_state("initialise", &[StageState::Constructed])?;
        self.log.info("Initialising...");
        let name = self.name.clone();
        self.run(service, |selector, ctx| selector.initialise(ctx))
            .with_context(|| format!("initialising selector '{}'", name))?;
        self.state = StageState::Initialised;
        Ok(())
    }

    /// Bind columns against the input file the service just opened.
    pub fn begin_input_file(&mut self, service: &mut Service) -> Result<()> {
        self.expect_state(
            "begin an input file",
            &[StageState::Initialised, StageState::Unbound],
        )?;
        self.log.debug("Connecting columns");
        let name = self.name.clone();
        self.run(service, |selector, ctx| selector.begin_input_file(ctx))
            .with_context(|| format!("binding columns of selector '{}'", name))?;
        self.stats.files += 1;
        self.state = StageState::Bound;
        Ok(())
    }

    /// Run the selector on the current record.
    ///
    /// A failing selector yields [`Status::Error`]; only calling this outside
    /// the bound state is returned as an error.
    pub fn execute_event(&mut self, service: &mut Service) -> Result<Status> {
        self.expect_state("execute", &[StageState::Bound])?;

        let status = match self.run(service, |selector, ctx| selector.execute_event(ctx)) {
            Ok(status) => status,
            Err(e) => {
                self.log.error(format!("Record processing failed: {}", e));
                Status::Error
            }
        };

        self.stats.executed += 1;
        match status {
            Status::Success => self.stats.accepted += 1,
            Status::Skip => self.stats.skipped += 1,
            Status::Error => self.stats.failed += 1,
        }
        Ok(status)
    }

    /// Release all column bindings. Returns the number of bindings released.
    pub fn end_input_file(&mut self, service: &mut Service) -> Result<usize> {
        self.expect_state("end an input file", &[StageState::Bound])?;
        if self.columns.is_empty() {
            self.log.debug("No columns to release");
        } else {
            self.log
                .info(format!("Releasing {} column(s)...", self.columns.len()));
        }
        let released = self.columns.release(service).with_context(|| {
            format!("releasing columns of selector '{}'", self.name)
        })?;
        self.state = StageState::Unbound;
        Ok(released)
    }

    pub fn finalise(&mut self, service: &mut Service) -> Result<()> {
        self.expect_state(
            "finalise",
            &[StageState::Initialised, StageState::Unbound],
        )?;
        self.log.info("Finalising...");
        let name = self.name.clone();
        self.run(service, |selector, ctx| selector.finalise(ctx))
            .with_context(|| format!("finalising selector '{}'", name))?;
        self.state = StageState::Finalised;
        Ok(())
    }
}

impl std::fmt::Debug for StageSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSlot")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("columns", &self.columns.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{Column, ColumnData};
    use crate::config::Store;
    use crate::stream::{MemoryBackend, RecordFile, Tree};

    /// Skips odd values of `my_int`, fails on negative ones.
    struct ParitySelector {
        my_int: Option<Column<i32>>,
    }

    impl Selector for ParitySelector {
        fn name(&self) -> &str {
            "Parity"
        }

        fn initialise(&mut self, _ctx: &mut StageContext) -> Result<()> {
            Ok(())
        }

        fn begin_input_file(&mut self, ctx: &mut StageContext) -> Result<()> {
            ctx.bind("my_int", &mut self.my_int)?;
            Ok(())
        }

        fn execute_event(&mut self, ctx: &mut StageContext) -> Result<Status> {
            let column = self
                .my_int
                .ok_or_else(|| AnalysisError::stage("Parity", "my_int not bound"))?;
            let value = *ctx.value(&column)?;
            if value < 0 {
                return Err(AnalysisError::stage("Parity", "negative"));
            }
            Ok(if value % 2 == 0 {
                Status::Success
            } else {
                Status::Skip
            })
        }
    }

    fn service() -> Service {
        let backend = MemoryBackend::new();
        backend.insert(
            "in",
            RecordFile::with_tree(
                Tree::from_columns(
                    "tree",
                    vec![(
                        "my_int".to_string(),
                        ColumnData::from_values(vec![2i32, 3, -1]),
                    )],
                )
                .unwrap(),
            ),
        );
        let mut service = Service::new("tree", Box::new(backend), Log::new("service"));
        service.configure_input(&["in".to_string()]).unwrap();
        service.create_output_stream().unwrap();
        service
    }

    fn slot(config: &str) -> StageSlot {
        StageSlot::new(
            Box::new(ParitySelector { my_int: None }),
            ConfigView::new(Store::parse(config).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_full_lifecycle() {
        let mut service = service();
        let mut slot = slot("");

        slot.initialise(&mut service).unwrap();
        service.advance_to_next_input().unwrap();
        slot.begin_input_file(&mut service).unwrap();
        assert_eq!(slot.state(), StageState::Bound);

        let mut statuses = Vec::new();
        for entry in 0..3 {
            service.begin_record(entry).unwrap();
            statuses.push(slot.execute_event(&mut service).unwrap());
        }
        assert_eq!(statuses, vec![Status::Success, Status::Skip, Status::Error]);

        assert_eq!(slot.end_input_file(&mut service).unwrap(), 1);
        slot.finalise(&mut service).unwrap();
        assert_eq!(slot.state(), StageState::Finalised);

        let stats = slot.stats();
        assert_eq!(
            (stats.executed, stats.accepted, stats.skipped, stats.failed, stats.files),
            (3, 1, 1, 1, 1)
        );
    }

    #[test]
    fn test_illegal_transitions() {
        let mut service = service();
        let mut slot = slot("");

        assert!(matches!(
            slot.execute_event(&mut service),
            Err(AnalysisError::InvalidTransition { state: "constructed", .. })
        ));
        assert!(slot.begin_input_file(&mut service).is_err());

        slot.initialise(&mut service).unwrap();
        assert!(slot.initialise(&mut service).is_err());
        assert!(slot.end_input_file(&mut service).is_err());

        slot.finalise(&mut service).unwrap();
        assert!(slot.finalise(&mut service).is_err());
        assert!(slot.begin_input_file(&mut service).is_err());
    }

    #[test]
    fn test_bound_twice_is_rejected() {
        let mut service = service();
        let mut slot = slot("");
        slot.initialise(&mut service).unwrap();
        service.advance_to_next_input().unwrap();
        slot.begin_input_file(&mut service).unwrap();
        assert!(matches!(
            slot.begin_input_file(&mut service),
            Err(AnalysisError::InvalidTransition { state: "bound", .. })
        ));
        assert!(matches!(
            slot.finalise(&mut service),
            Err(AnalysisError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_log_level_from_config() {
        assert_eq!(slot("").log().level(), LogLevel::Info);
        assert_eq!(
            slot("string loglevel = WARNING\n").log().level(),
            LogLevel::Warning
        );
        assert_eq!(
            slot("string loglevel = error\nstring Parity::loglevel = debug\n")
                .log()
                .level(),
            LogLevel::Debug
        );

        let err = StageSlot::new(
            Box::new(ParitySelector { my_int: None }),
            ConfigView::new(Store::parse("string loglevel = loud\n").unwrap()),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
