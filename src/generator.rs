//! Run generation by replacement selection.
//!
//! Records are streamed through a heap window. Each extracted minimum is appended to the current run
//! and replaced by the next input record. An input record smaller than the record just emitted cannot
//! extend the current run, so it is inserted and immediately hidden at the capacity boundary where it
//! waits for the next run. Once every slot is hidden the current run is closed and the heap is rebuilt
//! over the whole window. On random input this yields runs about twice as long as the heap.

use crate::arena::{Arena, Slot};
use crate::block::{BlockFile, RecordReader, RecordWriter};
use crate::config::SortConfig;
use crate::heap::MinHeap;
use crate::record::RECORD_SIZE;
use crate::sort::{Phase, SortError};

/// Ordered lengths (in records) of the sorted runs stored back to back in a storage area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCatalog {
    runs: Vec<u64>,
}

impl RunCatalog {
    pub fn new() -> Self {
        RunCatalog::default()
    }

    /// Appends a run of `len` records.
    pub fn push(&mut self, len: u64) {
        self.runs.push(len);
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Run lengths in storage order.
    pub fn runs(&self) -> &[u64] {
        &self.runs
    }

    /// Total number of records over all runs.
    pub fn total(&self) -> u64 {
        self.runs.iter().sum()
    }

    /// Record offset of every run start.
    pub fn starts(&self) -> impl Iterator<Item = u64> + '_ {
        self.runs.iter().scan(0, |offset, len| {
            let start = *offset;
            *offset += len;
            Some(start)
        })
    }
}

impl From<Vec<u64>> for RunCatalog {
    fn from(runs: Vec<u64>) -> Self {
        RunCatalog { runs }
    }
}

/// Replacement selection run generator.
pub struct RunGenerator {
    heap_capacity: usize,
}

impl RunGenerator {
    pub fn new(config: &SortConfig) -> Self {
        RunGenerator {
            heap_capacity: config.heap_capacity(),
        }
    }

    /// Reads every record of `input` and writes sorted runs back to back into `output`, starting at offset 0.
    /// Returns the catalog of generated runs.
    pub fn generate(
        &self,
        arena: &mut Arena,
        input: &mut BlockFile,
        output: &mut BlockFile,
    ) -> Result<RunCatalog, SortError> {
        let Arena {
            slots,
            input: input_buf,
            output: output_buf,
            ..
        } = arena;

        let total_len = input.len();
        let mut reader = RecordReader::new(input_buf, Phase::RunGeneration, 0, total_len);
        let mut writer = RecordWriter::new(output_buf, Phase::RunGeneration, 0);
        let mut catalog = RunCatalog::new();

        let window = self.heap_capacity.min((total_len / RECORD_SIZE as u64) as usize);
        if window == 0 {
            return Ok(catalog);
        }
        let slots = &mut slots[..window];
        for slot in slots.iter_mut() {
            match reader.next_record(input)? {
                Some(record) => *slot = Slot::new(record, 0),
                None => break,
            }
        }
        let mut heap = MinHeap::with_window(slots, window, window);
        log::debug!("replacement selection heap filled (records: {})", window);

        let mut run_len: u64 = 0;
        loop {
            if heap.capacity() == 0 {
                log::debug!("run {} generated (records: {})", catalog.len(), run_len);
                catalog.push(run_len);
                run_len = 0;
                heap.rewindow(window, window);
            }

            let next = match reader.next_record(input)? {
                Some(record) => Slot::new(record, 0),
                None => break,
            };

            let min = heap.extract_min().map_err(SortError::Heap)?;
            writer.push(output, &min.record)?;
            run_len += 1;

            heap.insert(next).map_err(SortError::Heap)?;
            if next < min {
                heap.hide_min().map_err(SortError::Heap)?;
            }
        }

        let hidden = heap.hidden();
        while !heap.is_empty() {
            let min = heap.extract_min().map_err(SortError::Heap)?;
            writer.push(output, &min.record)?;
            run_len += 1;
            heap.shrink_capacity();
        }
        if run_len > 0 {
            log::debug!("run {} generated (records: {})", catalog.len(), run_len);
            catalog.push(run_len);
        }

        if hidden > 0 {
            heap.repartition_hidden(hidden);
            heap.rewindow(hidden, hidden);
            while !heap.is_empty() {
                let min = heap.extract_min().map_err(SortError::Heap)?;
                writer.push(output, &min.record)?;
            }
            log::debug!("run {} generated (records: {})", catalog.len(), hidden);
            catalog.push(hidden as u64);
        }

        writer.flush(output)?;
        debug_assert_eq!(writer.written(), catalog.total());

        return Ok(catalog);
    }
}
