//! Block-level file access.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::io::SeekFrom;
use std::path::Path;

use crate::record::{Record, RECORD_SIZE};
use crate::sort::{Phase, SortError};

/// Random-access file read and written in fixed-size blocks.
pub struct BlockFile {
    file: fs::File,
    block_size: usize,
    len: u64,
    position: u64,
}

impl BlockFile {
    /// Opens an existing file for reading and writing.
    pub fn open(path: &Path, block_size: usize) -> io::Result<Self> {
        let file = fs::OpenOptions::new().read(true).write(true).open(path)?;
        return BlockFile::from_file(file, block_size);
    }

    /// Wraps an already opened file.
    pub fn from_file(file: fs::File, block_size: usize) -> io::Result<Self> {
        let len = file.metadata()?.len();
        return Ok(BlockFile {
            file,
            block_size,
            len,
            position: 0,
        });
    }

    /// File length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of whole blocks in the file.
    pub fn block_count(&self) -> u64 {
        self.len / self.block_size as u64
    }

    /// Current byte offset.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn seek(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        return Ok(());
    }

    /// Reads from the current offset until `buf` is full or the end of file is reached.
    /// Returns the number of bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        self.position += filled as u64;

        return Ok(filled);
    }

    /// Reads exactly `buf.len()` bytes at `offset`.
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek(offset)?;
        let read = self.read(buf)?;
        if read < buf.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes at offset {}, got {}", buf.len(), offset, read),
            ));
        }
        return Ok(());
    }

    /// Writes the whole buffer at the current offset.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)?;
        self.position += buf.len() as u64;
        self.len = self.len.max(self.position);
        return Ok(());
    }

    /// Writes the whole buffer at `offset`.
    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        self.seek(offset)?;
        return self.write(buf);
    }

    /// Flushes written data to the storage device.
    pub fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        return self.file.sync_data();
    }
}

/// Sequential reader of the records stored in `[start, end)` of a block file.
/// Reads one block at a time into a borrowed buffer.
pub struct RecordReader<'a> {
    buf: &'a mut [u8],
    phase: Phase,
    next_offset: u64,
    end: u64,
    pos: usize,
    filled: usize,
}

impl<'a> RecordReader<'a> {
    pub fn new(buf: &'a mut [u8], phase: Phase, start: u64, end: u64) -> Self {
        RecordReader {
            buf,
            phase,
            next_offset: start,
            end,
            pos: 0,
            filled: 0,
        }
    }

    /// Returns the next record or [`None`] once the region is consumed.
    pub fn next_record(&mut self, file: &mut BlockFile) -> Result<Option<Record>, SortError> {
        if self.pos == self.filled {
            if self.next_offset >= self.end {
                return Ok(None);
            }
            let len = (self.end - self.next_offset).min(self.buf.len() as u64) as usize;
            file.read_exact_at(self.next_offset, &mut self.buf[..len])
                .map_err(|err| SortError::io(self.phase, self.next_offset, err))?;
            log::trace!("{}: read {} bytes at offset {}", self.phase, len, self.next_offset);

            self.next_offset += len as u64;
            self.pos = 0;
            self.filled = len;
        }

        let record = Record::decode_slice(&self.buf[self.pos..self.filled]);
        self.pos += RECORD_SIZE;

        return Ok(Some(record));
    }
}

/// Sequential block-buffered record writer.
pub struct RecordWriter<'a> {
    buf: &'a mut [u8],
    phase: Phase,
    offset: u64,
    fill: usize,
    written: u64,
}

impl<'a> RecordWriter<'a> {
    pub fn new(buf: &'a mut [u8], phase: Phase, offset: u64) -> Self {
        RecordWriter {
            buf,
            phase,
            offset,
            fill: 0,
            written: 0,
        }
    }

    /// Appends a record, flushing the buffer to `file` once a whole block is filled.
    pub fn push(&mut self, file: &mut BlockFile, record: &Record) -> Result<(), SortError> {
        record.encode_into(&mut self.buf[self.fill..self.fill + RECORD_SIZE]);
        self.fill += RECORD_SIZE;
        self.written += 1;

        if self.fill == self.buf.len() {
            self.flush(file)?;
        }
        return Ok(());
    }

    /// Writes buffered records to `file`.
    pub fn flush(&mut self, file: &mut BlockFile) -> Result<(), SortError> {
        if self.fill == 0 {
            return Ok(());
        }

        file.write_at(self.offset, &self.buf[..self.fill])
            .map_err(|err| SortError::io(self.phase, self.offset, err))?;
        log::trace!("{}: wrote {} bytes at offset {}", self.phase, self.fill, self.offset);

        self.offset += self.fill as u64;
        self.fill = 0;
        return Ok(());
    }

    /// Number of records pushed so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
pub(crate) mod test {
    use rstest::*;

    use super::{BlockFile, RecordReader, RecordWriter};
    use crate::record::{Record, RECORD_SIZE};
    use crate::sort::Phase;

    pub(crate) fn scratch(block_size: usize) -> BlockFile {
        BlockFile::from_file(tempfile::tempfile().unwrap(), block_size).unwrap()
    }

    pub(crate) fn write_records(file: &mut BlockFile, records: &[Record]) {
        let bytes: Vec<u8> = records.iter().flat_map(|r| r.encode()).collect();
        file.write_at(0, &bytes).unwrap();
    }

    pub(crate) fn read_records(file: &mut BlockFile) -> Vec<Record> {
        let mut bytes = vec![0; file.len() as usize];
        file.read_exact_at(0, &mut bytes).unwrap();
        bytes.chunks(RECORD_SIZE).map(Record::decode_slice).collect()
    }

    #[test]
    fn test_block_file() {
        let mut file = scratch(16);
        assert!(file.is_empty());

        file.write(&[1; 40]).unwrap();
        assert_eq!(file.len(), 40);
        assert_eq!(file.block_count(), 2);

        let mut buf = [0; 16];
        file.seek(32).unwrap();
        assert_eq!(file.read(&mut buf).unwrap(), 8);
        assert_eq!(file.position(), 40);
        assert_eq!(file.read(&mut buf).unwrap(), 0);

        let err = file.read_exact_at(32, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[rstest]
    #[case(0, 10)]
    #[case(0, 4)]
    #[case(3, 7)]
    #[case(5, 5)]
    fn test_record_reader(#[case] first: usize, #[case] last: usize) {
        let records = Vec::from_iter((0..10).map(|i| Record::with_id(i, i as f32)));
        let mut file = scratch(24);
        write_records(&mut file, &records);

        let mut buf = vec![0; 24];
        let mut reader = RecordReader::new(
            &mut buf,
            Phase::RunGeneration,
            (first * RECORD_SIZE) as u64,
            (last * RECORD_SIZE) as u64,
        );
        let mut actual = Vec::new();
        while let Some(record) = reader.next_record(&mut file).unwrap() {
            actual.push(record);
        }

        assert_eq!(actual, records[first..last].to_vec());
    }

    #[test]
    fn test_record_writer() {
        let records = Vec::from_iter((0..5).map(|i| Record::with_id(i, -(i as f32))));
        let mut file = scratch(16);

        let mut buf = vec![0; 16];
        let mut writer = RecordWriter::new(&mut buf, Phase::RunGeneration, 0);
        for record in records.iter() {
            writer.push(&mut file, record).unwrap();
        }
        assert_eq!(file.len(), 32);
        writer.flush(&mut file).unwrap();
        assert_eq!(writer.written(), 5);

        assert_eq!(read_records(&mut file), records);
    }
}
