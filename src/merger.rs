//! Bounded fan-in multi-way run merger.

use crate::arena::{Arena, Slot};
use crate::block::{BlockFile, RecordWriter};
use crate::config::SortConfig;
use crate::generator::RunCatalog;
use crate::heap::MinHeap;
use crate::record::{Record, RECORD_SIZE};
use crate::sort::{Phase, SortError};

/// Read position within one input run of a merge group.
#[derive(Debug)]
pub struct MergeCursor {
    /// Index of the run in the catalog.
    run: usize,
    /// Byte offset of the run start within the storage area.
    start: u64,
    /// Run length in bytes.
    len: u64,
    /// Bytes of the run read into the buffer so far.
    consumed: u64,
    pos: usize,
    filled: usize,
    exhausted: bool,
}

impl MergeCursor {
    /// Creates a cursor over a run of `len` records starting at record offset `start`.
    pub fn new(run: usize, start: u64, len: u64) -> Self {
        MergeCursor {
            run,
            start: start * RECORD_SIZE as u64,
            len: len * RECORD_SIZE as u64,
            consumed: 0,
            pos: 0,
            filled: 0,
            exhausted: false,
        }
    }

    pub fn run(&self) -> usize {
        self.run
    }

    /// Number of records read into the buffer but not consumed yet.
    pub fn buffered(&self) -> usize {
        (self.filled - self.pos) / RECORD_SIZE
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Reads the next block of the run into `buf`, or marks the cursor exhausted if the run is fully consumed.
    pub fn refill(&mut self, src: &mut BlockFile, buf: &mut [u8], phase: Phase) -> Result<(), SortError> {
        if self.consumed >= self.len {
            self.exhausted = true;
            self.pos = 0;
            self.filled = 0;
            return Ok(());
        }

        let offset = self.start + self.consumed;
        let count = (self.len - self.consumed).min(buf.len() as u64) as usize;
        src.read_exact_at(offset, &mut buf[..count])
            .map_err(|err| SortError::io(phase, offset, err))?;

        self.consumed += count as u64;
        self.pos = 0;
        self.filled = count;
        return Ok(());
    }

    /// Takes the next buffered record.
    pub fn next_buffered(&mut self, buf: &[u8]) -> Option<Record> {
        if self.pos == self.filled {
            return None;
        }

        let record = Record::decode_slice(&buf[self.pos..self.filled]);
        self.pos += RECORD_SIZE;
        Some(record)
    }
}

/// Merges groups of at most `fan_in` adjacent runs into single runs.
///
/// Every cursor keeps one block of its run in the heap and one block in its buffer,
/// so the heap never holds more than `fan_in` blocks of records.
pub struct RunMerger {
    fan_in: usize,
    heap_capacity: usize,
}

impl RunMerger {
    pub fn new(config: &SortConfig) -> Self {
        RunMerger {
            fan_in: config.fan_in(),
            heap_capacity: config.merge_heap_capacity(),
        }
    }

    /// Performs one merge pass: runs of `catalog` stored in `src` are merged in groups of `fan_in`
    /// and written back to back into `dst`. Returns the catalog of merged runs.
    pub fn merge_pass(
        &self,
        arena: &mut Arena,
        catalog: &RunCatalog,
        src: &mut BlockFile,
        dst: &mut BlockFile,
        pass: usize,
    ) -> Result<RunCatalog, SortError> {
        let Arena {
            slots,
            output,
            cursor_buffers,
            ..
        } = arena;

        let phase = Phase::Merge(pass);
        let mut writer = RecordWriter::new(output, phase, 0);
        let mut merged = RunCatalog::new();
        let mut cursors = Vec::with_capacity(self.fan_in);
        let mut starts = catalog.starts();

        for (group, runs) in catalog.runs().chunks(self.fan_in).enumerate() {
            cursors.clear();
            for (idx, len) in runs.iter().enumerate() {
                let start = starts.next().unwrap_or_default();
                cursors.push(MergeCursor::new(group * self.fan_in + idx, start, *len));
            }

            let heap = MinHeap::new(&mut slots[..self.heap_capacity]);
            let len = merge_group(heap, &mut cursors, cursor_buffers, src, dst, &mut writer, phase)?;
            log::debug!("{}: group {} merged (runs: {}, records: {})", phase, group, runs.len(), len);

            merged.push(len);
        }
        writer.flush(dst)?;

        return Ok(merged);
    }
}

fn merge_group(
    mut heap: MinHeap<'_, Slot>,
    cursors: &mut [MergeCursor],
    buffers: &mut [Vec<u8>],
    src: &mut BlockFile,
    dst: &mut BlockFile,
    writer: &mut RecordWriter<'_>,
    phase: Phase,
) -> Result<u64, SortError> {
    for (origin, (cursor, buf)) in cursors.iter_mut().zip(buffers.iter_mut()).enumerate() {
        cursor.refill(src, buf, phase)?;
        while let Some(record) = cursor.next_buffered(buf) {
            heap.insert(Slot::new(record, origin)).map_err(SortError::Heap)?;
        }
    }

    let mut len = 0;
    while !heap.is_empty() {
        let min = heap.extract_min().map_err(SortError::Heap)?;
        writer.push(dst, &min.record)?;
        len += 1;

        let cursor = &mut cursors[min.origin];
        let buf = &mut buffers[min.origin];
        if cursor.buffered() == 0 && !cursor.is_exhausted() {
            cursor.refill(src, buf, phase)?;
        }
        if let Some(record) = cursor.next_buffered(buf) {
            heap.insert(Slot::new(record, min.origin)).map_err(SortError::Heap)?;
        }
    }

    return Ok(len);
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use super::RunMerger;
    use crate::arena::Arena;
    use crate::block::test::{read_records, scratch, write_records};
    use crate::config::SortConfig;
    use crate::generator::RunCatalog;
    use crate::record::Record;

    fn sorted_runs(rng: &mut StdRng, lens: &[u64]) -> Vec<Record> {
        let mut records = Vec::new();
        let mut id = 0;
        for len in lens {
            let mut run = Vec::from_iter((0..*len).map(|_| {
                id += 1;
                Record::with_id(id, f32::from(rng.gen_range(0u8..50)))
            }));
            run.sort();
            records.extend(run);
        }
        records
    }

    #[rstest]
    #[case(vec![3, 3, 3, 3, 3], vec![12, 3])]
    #[case(vec![100, 1, 70, 33], vec![204])]
    #[case(vec![40, 40, 40, 40, 40, 40, 40, 40, 40], vec![160, 160, 40])]
    #[case(vec![5], vec![5])]
    fn test_merge_pass(#[case] lens: Vec<u64>, #[case] expected_lens: Vec<u64>) {
        let config = SortConfig::new(64, 4, 512).unwrap();
        let mut arena = Arena::new(&config);
        let mut rng = StdRng::seed_from_u64(11);
        let input = sorted_runs(&mut rng, &lens);

        let mut src = scratch(64);
        let mut dst = scratch(64);
        write_records(&mut src, &input);

        let catalog = RunCatalog::from(lens.clone());
        let merged = RunMerger::new(&config)
            .merge_pass(&mut arena, &catalog, &mut src, &mut dst, 0)
            .unwrap();

        assert_eq!(merged.runs(), expected_lens.as_slice());
        let output = read_records(&mut dst);
        assert_eq!(output.len(), input.len());

        let mut input_start = 0;
        for (start, len) in merged.starts().zip(merged.runs()) {
            let (start, len) = (start as usize, *len as usize);
            let mut expected = input[input_start..input_start + len].to_vec();
            expected.sort();
            assert_eq!(&output[start..start + len], expected.as_slice());
            input_start += len;
        }
    }

    #[test]
    fn test_merge_pass_reports_truncated_source() {
        let config = SortConfig::new(64, 4, 512).unwrap();
        let mut arena = Arena::new(&config);

        let mut src = scratch(64);
        let mut dst = scratch(64);
        write_records(&mut src, &[Record::with_id(1, 1.0), Record::with_id(2, 2.0)]);

        let catalog = RunCatalog::from(vec![2, 2]);
        let err = RunMerger::new(&config)
            .merge_pass(&mut arena, &catalog, &mut src, &mut dst, 3)
            .unwrap_err();

        assert!(err.to_string().contains("merge pass 3"), "{}", err);
    }
}
