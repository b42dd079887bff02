//! Column binding registry.
//!
//! Every stage owns one [`ColumnRegistry`]. Binding a column by name records
//! a slot in the stage's table and attaches the column to the active record
//! stream: input columns are enabled on the input tree, output columns are
//! declared on the output tree. The value buffer itself lives in the
//! service's [`ColumnTable`], one per column name, so stages binding the same
//! name read and write the same value.
//!
//! Slots live until [`ColumnRegistry::release`], which the stage lifecycle
//! calls at the end of every input file. Release bumps the registry
//! generation, so any [`Column`] handle from the previous file is stale and
//! the next bind allocates a fresh slot.
//!
//! [`ColumnTable`]: crate::columns::ColumnTable

use crate::columns::buffer::{ColumnBuffer, ColumnValue};
use crate::columns::kind::ColumnType;
use crate::columns::table::Direction;
use crate::error::{AnalysisError, Result};
use crate::log::Log;
use crate::stream::Service;
use std::fmt;
use std::marker::PhantomData;

/// Index into `ColumnRegistry::slots`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

impl SlotId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a bind chooses its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindMode {
    /// Input if the column exists in the current input tree, else output.
    #[default]
    Auto,
    Input,
    Output,
}

/// One column bound by a stage.
#[derive(Debug)]
pub struct ColumnSlot {
    pub name: String,
    pub column_type: ColumnType,
    pub direction: Direction,
    entry: usize,
}

/// Handle to a slot, valid for one registry generation.
///
/// `Column<T>` for a [`ColumnValue`] gives typed access;
/// `Column<ColumnBuffer>` comes from [`ColumnRegistry::bind_dynamic`] and gives
/// access to the type-erased buffer.
pub struct Column<T> {
    slot: SlotId,
    generation: u64,
    _marker: PhantomData<fn() -> T>,
}

/// Handle returned by [`ColumnRegistry::bind_dynamic`].
pub type DynamicColumn = Column<ColumnBuffer>;

impl<T> Column<T> {
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({:?}, gen {})", self.slot, self.generation)
    }
}

/// Slot table of the columns bound by one stage.
#[derive(Debug)]
pub struct ColumnRegistry {
    slots: Vec<ColumnSlot>,
    generation: u64,
    log: Log,
}

impl ColumnRegistry {
    pub fn new(log: Log) -> Self {
        Self {
            slots: Vec::new(),
            generation: 0,
            log,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bind column `name` as `T`.
    ///
    /// A handle from the current generation is re-attached without a new
    /// allocation. An empty or stale handle is replaced by a fresh slot.
    pub fn bind<T: ColumnValue>(
        &mut self,
        service: &mut Service,
        name: &str,
        handle: &mut Option<Column<T>>,
        mode: BindMode,
    ) -> Result<Column<T>> {
        if let Some(existing) = *handle {
            if let Some(slot) = self.current_slot(&existing) {
                if slot.name == name {
                    let (column_type, direction) = (slot.column_type, slot.direction);
                    self.attach(service, name, column_type, direction)?;
                    self.log
                        .debug(format!("Re-attached {} column '{}'", direction.as_str(), name));
                    return Ok(existing);
                }
            }
        }

        let column = self.allocate(service, name, T::COLUMN_TYPE, mode)?;
        *handle = Some(column);
        Ok(column)
    }

    /// Bind column `name` with a type chosen at runtime from `descriptor`.
    ///
    /// An unsupported descriptor fails before anything is allocated.
    pub fn bind_dynamic(
        &mut self,
        service: &mut Service,
        name: &str,
        descriptor: &str,
        mode: BindMode,
    ) -> Result<DynamicColumn> {
        let column_type = ColumnType::parse(descriptor).map_err(|e| {
            self.log.error(format!(
                "Cannot bind column '{}': unsupported type '{}'",
                name, descriptor
            ));
            e
        })?;
        self.allocate(service, name, column_type, mode)
    }

    fn current_slot<T>(&self, handle: &Column<T>) -> Option<&ColumnSlot> {
        if handle.generation != self.generation {
            return None;
        }
        self.slots.get(handle.slot.index())
    }

    fn resolve_direction(&self, service: &Service, name: &str, mode: BindMode) -> Result<Direction> {
        let input = service.input_tree().ok_or_else(|| {
            self.log
                .error(format!("Cannot bind column '{}': no input file loaded", name));
            AnalysisError::StreamConfiguration("no input file loaded".to_string())
        })?;

        match mode {
            BindMode::Auto if input.has_column(name) => Ok(Direction::Input),
            BindMode::Auto | BindMode::Output => Ok(Direction::Output),
            BindMode::Input if input.has_column(name) => Ok(Direction::Input),
            BindMode::Input => {
                self.log.error(format!(
                    "Input column '{}' not found in tree '{}'",
                    name,
                    input.name()
                ));
                Err(AnalysisError::ColumnMissing {
                    column: name.to_string(),
                    tree: input.name().to_string(),
                })
            }
        }
    }

    /// Record a new slot for `name`, sharing the service's buffer when an
    /// earlier binding already created one.
    fn allocate<T>(
        &mut self,
        service: &mut Service,
        name: &str,
        column_type: ColumnType,
        mode: BindMode,
    ) -> Result<Column<T>> {
        let shared = service
            .columns()
            .get(name)
            .map(|shared| (shared.column_type, shared.direction));
        let direction = match shared {
            Some((stored, _)) if stored != column_type => {
                self.log.error(format!(
                    "Column '{}' is already bound as {}, requested {}",
                    name, stored, column_type
                ));
                return Err(AnalysisError::BindingTypeMismatch {
                    column: name.to_string(),
                    stored: stored.tag(),
                    requested: column_type.tag(),
                });
            }
            Some((_, direction)) => direction,
            None => {
                let direction = self.resolve_direction(service, name, mode)?;
                self.attach(service, name, column_type, direction)?;
                direction
            }
        };

        let entry = service.columns_mut().acquire(name, column_type, direction);
        let slot = SlotId(self.slots.len() as u32);
        self.slots.push(ColumnSlot {
            name: name.to_string(),
            column_type,
            direction,
            entry,
        });
        self.log.debug(format!(
            "Bound {} column '{}' as {} in {}",
            direction.as_str(),
            name,
            column_type,
            slot
        ));
        Ok(Column {
            slot,
            generation: self.generation,
            _marker: PhantomData,
        })
    }

    /// Connect a column to the active trees.
    ///
    /// Every check runs before either tree is changed.
    fn attach(
        &self,
        service: &mut Service,
        name: &str,
        column_type: ColumnType,
        direction: Direction,
    ) -> Result<()> {
        if direction == Direction::Input {
            let input = service.input_tree().ok_or_else(|| {
                AnalysisError::StreamConfiguration("no input file loaded".to_string())
            })?;
            let stored = input
                .column_type(name)
                .ok_or_else(|| AnalysisError::ColumnMissing {
                    column: name.to_string(),
                    tree: input.name().to_string(),
                })?;
            if stored != column_type {
                self.log.error(format!(
                    "Column '{}' is stored as {}, bound as {}",
                    name, stored, column_type
                ));
                return Err(AnalysisError::BindingTypeMismatch {
                    column: name.to_string(),
                    stored: stored.tag(),
                    requested: column_type.tag(),
                });
            }
        }

        // Input columns are mirrored into the output schema
        match service.output_tree_mut() {
            Some(output) => output.declare(name, column_type).map_err(|e| {
                self.log
                    .error(format!("Cannot declare output column '{}': {}", name, e));
                e
            })?,
            None if direction == Direction::Output => {
                self.log.error(format!(
                    "Cannot bind output column '{}': output stream not initialised",
                    name
                ));
                return Err(AnalysisError::StreamConfiguration(
                    "output stream not initialised".to_string(),
                ));
            }
            None => {}
        }

        if direction == Direction::Input {
            if let Some(input) = service.input_tree_mut() {
                input.set_enabled(name, true);
            }
        }
        Ok(())
    }

    fn stale<T>(&self, handle: &Column<T>) -> AnalysisError {
        AnalysisError::StaleColumn(format!(
            "{:?} from generation {} (registry at {})",
            handle.slot, handle.generation, self.generation
        ))
    }

    /// Slot of a current handle, or [`AnalysisError::StaleColumn`].
    fn live_slot<T>(&self, handle: &Column<T>) -> Result<&ColumnSlot> {
        self.current_slot(handle).ok_or_else(|| self.stale(handle))
    }

    pub fn get<'s, T: ColumnValue>(
        &self,
        service: &'s Service,
        handle: &Column<T>,
    ) -> Result<&'s T> {
        let slot = self.live_slot(handle)?;
        let buffer = service
            .columns()
            .entry(slot.entry)
            .map(|shared| shared.buffer())
            .ok_or_else(|| self.stale(handle))?;
        buffer
            .get::<T>()
            .ok_or_else(|| AnalysisError::BindingTypeMismatch {
                column: slot.name.clone(),
                stored: buffer.column_type().tag(),
                requested: T::COLUMN_TYPE.tag(),
            })
    }

    pub fn get_mut<'s, T: ColumnValue>(
        &self,
        service: &'s mut Service,
        handle: &Column<T>,
    ) -> Result<&'s mut T> {
        let slot = self.live_slot(handle)?;
        let buffer = service
            .columns_mut()
            .buffer_mut(slot.entry)
            .ok_or_else(|| self.stale(handle))?;
        let stored = buffer.column_type();
        match buffer.get_mut::<T>() {
            Some(value) => Ok(value),
            None => Err(AnalysisError::BindingTypeMismatch {
                column: slot.name.clone(),
                stored: stored.tag(),
                requested: T::COLUMN_TYPE.tag(),
            }),
        }
    }

    /// Type-erased access to a dynamically bound column.
    pub fn buffer<'s>(&self, service: &'s Service, handle: &DynamicColumn) -> Result<&'s ColumnBuffer> {
        let slot = self.live_slot(handle)?;
        service
            .columns()
            .entry(slot.entry)
            .map(|shared| shared.buffer())
            .ok_or_else(|| self.stale(handle))
    }

    pub fn buffer_mut<'s>(
        &self,
        service: &'s mut Service,
        handle: &DynamicColumn,
    ) -> Result<&'s mut ColumnBuffer> {
        let slot = self.live_slot(handle)?;
        service
            .columns_mut()
            .buffer_mut(slot.entry)
            .ok_or_else(|| self.stale(handle))
    }

    /// Drop every slot. Returns the number of bindings released.
    ///
    /// All slots are checked against their buffers before any is released:
    /// on [`AnalysisError::BindingReleaseUnmatched`] the table is left
    /// intact. A buffer is freed once the last slot bound to it is released.
    pub fn release(&mut self, service: &mut Service) -> Result<usize> {
        for slot in &self.slots {
            let actual = service
                .columns()
                .entry(slot.entry)
                .filter(|shared| shared.name == slot.name)
                .map(|shared| shared.buffer().column_type());
            if actual != Some(slot.column_type) {
                let actual = actual.map_or_else(|| "nothing".to_string(), |t| t.tag());
                self.log.error(format!(
                    "Cannot release column '{}': recorded as {}, buffer holds {}",
                    slot.name, slot.column_type, actual
                ));
                return Err(AnalysisError::BindingReleaseUnmatched {
                    column: slot.name.clone(),
                    recorded: slot.column_type.tag(),
                    actual,
                });
            }
        }

        let count = self.slots.len();
        let columns = service.columns_mut();
        for slot in self.slots.drain(..) {
            match columns.release(slot.entry) {
                Some(freed) => self
                    .log
                    .debug(format!("Released column '{}' ({})", slot.name, freed)),
                None => self
                    .log
                    .debug(format!("Detached from shared column '{}'", slot.name)),
            }
        }
        self.generation += 1;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnData;
    use crate::stream::{MemoryBackend, RecordFile, Tree};
    use proptest::prelude::*;

    fn input_file() -> RecordFile {
        RecordFile::with_tree(
            Tree::from_columns(
                "tree",
                vec![
                    ("my_int".to_string(), ColumnData::from_values(vec![4i32, 9])),
                    (
                        "my_vector_float".to_string(),
                        ColumnData::from_values(vec![vec![1.0f32, 2.0], vec![3.0]]),
                    ),
                    ("unused".to_string(), ColumnData::from_values(vec![0u8, 1])),
                ],
            )
            .unwrap(),
        )
    }

    fn loaded_service() -> Service {
        let backend = MemoryBackend::new();
        backend.insert("a", input_file());
        backend.insert("b", input_file());
        let mut service = Service::new("tree", Box::new(backend), Log::new("service"));
        service
            .configure_input(&["a".to_string(), "b".to_string()])
            .unwrap();
        service.create_output_stream().unwrap();
        service.advance_to_next_input().unwrap();
        service
    }

    fn registry() -> ColumnRegistry {
        ColumnRegistry::new(Log::new("registry"))
    }

    #[test]
    fn test_bind_requires_loaded_input() {
        let backend = MemoryBackend::new();
        let mut service = Service::new("tree", Box::new(backend), Log::new("service"));
        let mut handle: Option<Column<i32>> = None;
        assert!(matches!(
            registry().bind(&mut service, "my_int", &mut handle, BindMode::Auto),
            Err(AnalysisError::StreamConfiguration(_))
        ));
        assert!(handle.is_none());
    }

    #[test]
    fn test_bind_input_enables_and_loads() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<Vec<f32>>> = None;

        let column = registry
            .bind(&mut service, "my_vector_float", &mut handle, BindMode::Auto)
            .unwrap();
        assert_eq!(registry.slots()[0].direction, Direction::Input);

        let input = service.input_tree().unwrap();
        assert!(input.is_enabled("my_vector_float"));
        assert!(!input.is_enabled("unused"));
        // Mirrored into the output schema
        assert!(service.output_tree().unwrap().has_column("my_vector_float"));

        service.begin_record(1).unwrap();
        assert_eq!(registry.get(&service, &column).unwrap(), &vec![3.0f32]);
    }

    #[test]
    fn test_bind_output_declares_column() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<f32>> = None;

        let column = registry
            .bind(&mut service, "new_float", &mut handle, BindMode::Auto)
            .unwrap();
        assert_eq!(registry.slots()[0].direction, Direction::Output);
        *registry.get_mut(&mut service, &column).unwrap() = 2.5;

        service.fill_output().unwrap();
        let output = service.output_tree().unwrap();
        assert_eq!(
            output.column_data("new_float").unwrap().values::<f32>().unwrap().to_vec(),
            vec![2.5f32]
        );
    }

    #[test]
    fn test_forced_input_on_missing_column() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<f32>> = None;
        assert!(matches!(
            registry.bind(&mut service, "nope", &mut handle, BindMode::Input),
            Err(AnalysisError::ColumnMissing { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bind_with_wrong_type_allocates_nothing() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<f64>> = None;
        assert!(matches!(
            registry.bind(&mut service, "my_int", &mut handle, BindMode::Auto),
            Err(AnalysisError::BindingTypeMismatch { .. })
        ));
        assert!(registry.is_empty());
        assert!(service.columns().is_empty());
        assert!(!service.input_tree().unwrap().is_enabled("my_int"));
    }

    #[test]
    fn test_failed_output_mirror_leaves_input_disabled() {
        let mut service = loaded_service();
        service
            .output_tree_mut()
            .unwrap()
            .declare("my_int", f32::COLUMN_TYPE)
            .unwrap();

        let mut registry = registry();
        let mut handle: Option<Column<i32>> = None;
        assert!(matches!(
            registry.bind(&mut service, "my_int", &mut handle, BindMode::Auto),
            Err(AnalysisError::BindingTypeMismatch { .. })
        ));
        assert!(registry.is_empty());
        assert!(!service.input_tree().unwrap().is_enabled("my_int"));
    }

    #[test]
    fn test_rebind_in_same_generation_reuses_slot() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<i32>> = None;

        let first = registry
            .bind(&mut service, "my_int", &mut handle, BindMode::Auto)
            .unwrap();
        let second = registry
            .bind(&mut service, "my_int", &mut handle, BindMode::Auto)
            .unwrap();
        assert_eq!(first.slot(), second.slot());
        assert_eq!(registry.len(), 1);
        assert_eq!(service.columns().get("my_int").unwrap().refs(), 1);
    }

    #[test]
    fn test_stages_share_column_buffer() {
        let mut service = loaded_service();
        let mut producer = registry();
        let mut consumer = registry();

        let mut producer_handle: Option<Column<f32>> = None;
        let written = producer
            .bind(&mut service, "new_float", &mut producer_handle, BindMode::Output)
            .unwrap();
        let mut consumer_handle: Option<Column<f32>> = None;
        let read = consumer
            .bind(&mut service, "new_float", &mut consumer_handle, BindMode::Auto)
            .unwrap();
        assert_eq!(consumer.slots()[0].direction, Direction::Output);
        assert_eq!(service.columns().len(), 1);
        assert_eq!(service.columns().get("new_float").unwrap().refs(), 2);

        service.begin_record(0).unwrap();
        *producer.get_mut(&mut service, &written).unwrap() = 7.0;
        assert_eq!(consumer.get(&service, &read).unwrap(), &7.0);

        // The buffer lives until the last stage releases it
        assert_eq!(producer.release(&mut service).unwrap(), 1);
        assert_eq!(consumer.get(&service, &read).unwrap(), &7.0);
        assert_eq!(consumer.release(&mut service).unwrap(), 1);
        assert!(service.columns().is_empty());
    }

    #[test]
    fn test_shared_column_type_conflict() {
        let mut service = loaded_service();
        let mut first = registry();
        let mut second = registry();

        first
            .bind_dynamic(&mut service, "weights", "vector<double>", BindMode::Output)
            .unwrap();
        let mut handle: Option<Column<Vec<f32>>> = None;
        assert!(matches!(
            second.bind(&mut service, "weights", &mut handle, BindMode::Auto),
            Err(AnalysisError::BindingTypeMismatch { .. })
        ));
        assert!(second.is_empty());
        assert_eq!(service.columns().get("weights").unwrap().refs(), 1);
    }

    #[test]
    fn test_release_makes_handles_stale() {
        let mut service = loaded_service();
        let mut registry = registry();
        let mut handle: Option<Column<i32>> = None;

        let old = registry
            .bind(&mut service, "my_int", &mut handle, BindMode::Auto)
            .unwrap();
        assert_eq!(registry.release(&mut service).unwrap(), 1);
        assert!(matches!(
            registry.get(&service, &old),
            Err(AnalysisError::StaleColumn(_))
        ));

        service.advance_to_next_input().unwrap();
        let fresh = registry
            .bind(&mut service, "my_int", &mut handle, BindMode::Auto)
            .unwrap();
        assert_eq!(fresh.generation(), old.generation() + 1);
        assert!(registry.get(&service, &fresh).is_ok());
        assert!(service.input_tree().unwrap().is_enabled("my_int"));
    }

    #[test]
    fn test_dynamic_handle_goes_stale_after_release() {
        let mut service = loaded_service();
        let mut registry = registry();

        let old = registry
            .bind_dynamic(&mut service, "weights", "vector<double>", BindMode::Auto)
            .unwrap();
        registry.release(&mut service).unwrap();
        service.advance_to_next_input().unwrap();

        let fresh = registry
            .bind_dynamic(&mut service, "my_int", "int", BindMode::Auto)
            .unwrap();
        assert_eq!(fresh.slot(), old.slot());
        assert!(matches!(
            registry.buffer(&service, &old),
            Err(AnalysisError::StaleColumn(_))
        ));
        assert!(matches!(
            registry.buffer_mut(&mut service, &old),
            Err(AnalysisError::StaleColumn(_))
        ));
        assert_eq!(
            registry.buffer(&service, &fresh).unwrap().column_type(),
            i32::COLUMN_TYPE
        );
    }

    #[test]
    fn test_release_is_atomic() {
        let mut service = loaded_service();
        let mut registry = registry();
        let a = registry
            .bind_dynamic(&mut service, "a", "int", BindMode::Output)
            .unwrap();
        let b = registry
            .bind_dynamic(&mut service, "b", "float", BindMode::Output)
            .unwrap();

        *registry.buffer_mut(&mut service, &b).unwrap() = 1.0f64.into_buffer();
        assert!(matches!(
            registry.release(&mut service),
            Err(AnalysisError::BindingReleaseUnmatched { .. })
        ));
        assert_eq!(registry.len(), 2);
        assert_eq!(service.columns().len(), 2);
        assert!(registry.buffer(&service, &a).is_ok());
        assert_eq!(registry.generation(), 0);
    }

    #[test]
    fn test_bind_dynamic_unsupported_descriptor() {
        let mut service = loaded_service();
        let mut registry = registry();
        for descriptor in ["string", "vector<vector<vector<int> > >", "vector<float"] {
            assert!(matches!(
                registry.bind_dynamic(&mut service, "x", descriptor, BindMode::Output),
                Err(AnalysisError::BindingTypeUnsupported(_))
            ));
        }
        assert!(registry.is_empty());
        assert!(!service.output_tree().unwrap().has_column("x"));
    }

    #[test]
    fn test_bind_release_every_type() {
        let mut service = loaded_service();
        let mut registry = registry();
        for (index, column_type) in ColumnType::all().enumerate() {
            let column = registry
                .bind_dynamic(
                    &mut service,
                    &format!("col_{}", index),
                    &column_type.tag(),
                    BindMode::Output,
                )
                .unwrap();
            assert_eq!(
                registry.buffer(&service, &column).unwrap().column_type(),
                column_type
            );
        }
        assert_eq!(registry.len(), 30);
        assert_eq!(registry.release(&mut service).unwrap(), 30);
        assert!(registry.is_empty());
        assert!(service.columns().is_empty());
    }

    proptest! {
        #[test]
        fn prop_release_count_matches_binds(count in 0usize..20) {
            let mut service = loaded_service();
            let mut registry = registry();
            for i in 0..count {
                registry
                    .bind_dynamic(&mut service, &format!("c{}", i), "vector<double>", BindMode::Output)
                    .unwrap();
            }
            prop_assert_eq!(registry.release(&mut service).unwrap(), count);
            prop_assert!(registry.is_empty());
            prop_assert!(service.columns().is_empty());
            prop_assert_eq!(registry.generation(), 1);
        }
    }
}
