//! External sorter.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::arena::Arena;
use crate::block::BlockFile;
use crate::config::{SortConfig, DEFAULT_BLOCK_SIZE, DEFAULT_FAN_IN, DEFAULT_MEMORY_BUDGET};
use crate::generator::{RunCatalog, RunGenerator};
use crate::heap::HeapError;
use crate::merger::RunMerger;
use crate::record::RECORD_SIZE;

/// Sorting stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening the input file.
    Open,
    /// Replacement selection run generation.
    RunGeneration,
    /// Merge pass with the given number.
    Merge(usize),
    /// Copying the final run back to the input file.
    CopyBack,
    /// Diagnostic dump.
    Dump,
}

impl Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "open"),
            Phase::RunGeneration => write!(f, "run generation"),
            Phase::Merge(pass) => write!(f, "merge pass {}", pass),
            Phase::CopyBack => write!(f, "copy-back"),
            Phase::Dump => write!(f, "dump"),
        }
    }
}

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary storage area creation error.
    TempFile(io::Error),
    /// Read, write or seek failure.
    IO { phase: Phase, offset: u64, source: io::Error },
    /// Input file length is not a multiple of the record size.
    MalformedInput { len: u64 },
    /// Heap invariant violation.
    Heap(HeapError),
    /// Sorter configuration error.
    InvalidConfig(String),
}

impl SortError {
    pub(crate) fn io(phase: Phase, offset: u64, source: io::Error) -> Self {
        SortError::IO { phase, offset, source }
    }
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempFile(err) => Some(err),
            SortError::IO { source, .. } => Some(source),
            SortError::Heap(err) => Some(err),
            SortError::MalformedInput { .. } | SortError::InvalidConfig(_) => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempFile(err) => write!(f, "temporary file not created: {}", err),
            SortError::IO { phase, offset, source } => {
                write!(f, "I/O operation failed during {} at offset {}: {}", phase, offset, source)
            }
            SortError::MalformedInput { len } => write!(
                f,
                "malformed input: length {} is not a multiple of the record size {}",
                len, RECORD_SIZE
            ),
            SortError::Heap(err) => write!(f, "internal error: {}", err),
            SortError::InvalidConfig(reason) => write!(f, "invalid sorter configuration: {}", reason),
        }
    }
}

/// Statistics of a completed sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of records sorted.
    pub records: u64,
    /// Number of runs produced by replacement selection.
    pub initial_runs: usize,
    /// Number of merge passes.
    pub passes: usize,
    /// Run catalog produced by every merge pass.
    pub pass_catalogs: Vec<RunCatalog>,
    /// Whether the final run had to be copied back from the temporary storage area.
    pub copied_back: bool,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone, Default)]
pub struct ExternalSorterBuilder {
    /// I/O block size in bytes.
    block_size: Option<usize>,
    /// Number of runs merged at once.
    fan_in: Option<usize>,
    /// Heap memory budget in bytes.
    memory_budget: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
}

impl ExternalSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter, SortError> {
        let config = SortConfig::new(
            self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE),
            self.fan_in.unwrap_or(DEFAULT_FAN_IN),
            self.memory_budget.unwrap_or(DEFAULT_MEMORY_BUDGET),
        )
        .map_err(SortError::InvalidConfig)?;

        return Ok(ExternalSorter::new(config, self.tmp_dir.as_deref()));
    }

    /// Sets I/O block size in bytes.
    pub fn with_block_size(mut self, block_size: usize) -> ExternalSorterBuilder {
        self.block_size = Some(block_size);
        return self;
    }

    /// Sets number of runs merged together in one merge group.
    pub fn with_fan_in(mut self, fan_in: usize) -> ExternalSorterBuilder {
        self.fan_in = Some(fan_in);
        return self;
    }

    /// Sets heap memory budget in bytes.
    pub fn with_memory_budget(mut self, memory_budget: usize) -> ExternalSorterBuilder {
        self.memory_budget = Some(memory_budget);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }
}

/// External sorter. Sorts files of fixed-width records in place.
pub struct ExternalSorter {
    config: SortConfig,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
}

impl ExternalSorter {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `config` - Validated sorting parameters
    /// * `tmp_dir` - Directory to be used to store temporary data. If the parameter is [`None`] default OS temporary
    ///   directory will be used.
    pub fn new(config: SortConfig, tmp_dir: Option<&Path>) -> Self {
        ExternalSorter {
            config,
            tmp_dir: tmp_dir.map(Into::into),
        }
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Sorts the file at `path` in place in ascending key order.
    pub fn sort(&self, path: &Path) -> Result<SortSummary, SortError> {
        log::info!("sorting {}", path.display());
        let mut primary =
            BlockFile::open(path, self.config.block_size()).map_err(|err| SortError::io(Phase::Open, 0, err))?;

        return self.sort_file(&mut primary);
    }

    /// Sorts an opened block file in place in ascending key order.
    pub fn sort_file(&self, primary: &mut BlockFile) -> Result<SortSummary, SortError> {
        let len = primary.len();
        if len % RECORD_SIZE as u64 != 0 {
            return Err(SortError::MalformedInput { len });
        }

        let mut summary = SortSummary {
            records: len / RECORD_SIZE as u64,
            ..SortSummary::default()
        };
        if summary.records == 0 {
            log::info!("input is empty, nothing to sort");
            return Ok(summary);
        }

        let mut secondary = self.init_secondary_area()?;
        let mut arena = Arena::new(&self.config);

        let catalog = RunGenerator::new(&self.config).generate(&mut arena, primary, &mut secondary)?;
        summary.initial_runs = catalog.len();
        log::info!(
            "run generation done (records: {}, runs: {})",
            catalog.total(),
            catalog.len()
        );

        let mut areas = StorageAreas::new(primary, secondary, Area::Secondary);
        self.merge_runs(&mut arena, catalog, &mut areas, &mut summary)?;

        if areas.current() == Area::Secondary {
            log::info!("copying sorted data back to the input file");
            areas.copy_back(&mut arena.input, len)?;
            summary.copied_back = true;
        }
        areas
            .primary()
            .sync()
            .map_err(|err| SortError::io(Phase::CopyBack, len, err))?;

        log::info!(
            "sorting done (records: {}, initial runs: {}, merge passes: {})",
            summary.records,
            summary.initial_runs,
            summary.passes
        );

        return Ok(summary);
    }

    /// Merges runs until a single run is left. Every pass reads the current storage area and writes the other.
    pub(crate) fn merge_runs(
        &self,
        arena: &mut Arena,
        mut catalog: RunCatalog,
        areas: &mut StorageAreas<'_>,
        summary: &mut SortSummary,
    ) -> Result<RunCatalog, SortError> {
        let merger = RunMerger::new(&self.config);

        while catalog.len() > 1 {
            let pass = summary.passes;
            let (src, dst) = areas.split();
            catalog = merger.merge_pass(arena, &catalog, src, dst, pass)?;
            areas.flip();

            log::info!(
                "merge pass {} done (runs: {}, stored in {} area)",
                pass,
                catalog.len(),
                areas.current()
            );
            summary.passes += 1;
            summary.pass_catalogs.push(catalog.clone());
        }

        return Ok(catalog);
    }

    fn init_secondary_area(&self) -> Result<BlockFile, SortError> {
        let file = if let Some(tmp_dir) = &self.tmp_dir {
            log::info!("using {} as a temporary directory", tmp_dir.display());
            tempfile::tempfile_in(tmp_dir)
        } else {
            tempfile::tempfile()
        }
        .map_err(SortError::TempFile)?;

        return BlockFile::from_file(file, self.config.block_size()).map_err(SortError::TempFile);
    }
}

/// Storage area holding the current run catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Area {
    Primary,
    Secondary,
}

impl Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Primary => write!(f, "primary"),
            Area::Secondary => write!(f, "secondary"),
        }
    }
}

/// The input file and the temporary file, used alternately as merge source and destination.
pub(crate) struct StorageAreas<'a> {
    primary: &'a mut BlockFile,
    secondary: BlockFile,
    current: Area,
}

impl<'a> StorageAreas<'a> {
    pub(crate) fn new(primary: &'a mut BlockFile, secondary: BlockFile, current: Area) -> Self {
        StorageAreas {
            primary,
            secondary,
            current,
        }
    }

    pub(crate) fn current(&self) -> Area {
        self.current
    }

    pub(crate) fn primary(&mut self) -> &mut BlockFile {
        &mut *self.primary
    }

    /// Returns the current area as the source and the other one as the destination.
    pub(crate) fn split(&mut self) -> (&mut BlockFile, &mut BlockFile) {
        match self.current {
            Area::Primary => (&mut *self.primary, &mut self.secondary),
            Area::Secondary => (&mut self.secondary, &mut *self.primary),
        }
    }

    pub(crate) fn flip(&mut self) {
        self.current = match self.current {
            Area::Primary => Area::Secondary,
            Area::Secondary => Area::Primary,
        };
    }

    /// Copies the first `len` bytes of the secondary area to the primary one block by block.
    pub(crate) fn copy_back(&mut self, buf: &mut [u8], len: u64) -> Result<(), SortError> {
        let mut offset = 0;
        while offset < len {
            let count = (len - offset).min(buf.len() as u64) as usize;
            self.secondary
                .read_exact_at(offset, &mut buf[..count])
                .map_err(|err| SortError::io(Phase::CopyBack, offset, err))?;
            self.primary
                .write_at(offset, &buf[..count])
                .map_err(|err| SortError::io(Phase::CopyBack, offset, err))?;
            offset += count as u64;
        }
        self.current = Area::Primary;

        return Ok(());
    }
}
