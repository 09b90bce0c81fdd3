//! Human-readable rendering of record files.

use std::io;
use std::io::prelude::*;

use crate::block::{BlockFile, RecordReader};
use crate::record::{Record, RECORD_SIZE};
use crate::sort::{Phase, SortError};

/// Number of records per line used by the command line tool.
pub const DEFAULT_PER_LINE: usize = 5;

/// Writes the first record of every block, `per_line` records per line.
/// A trailing partial block is included.
pub fn dump_blocks<W: Write>(file: &mut BlockFile, writer: &mut W, per_line: usize) -> Result<(), SortError> {
    let block_size = file.block_size() as u64;
    let mut raw = [0u8; RECORD_SIZE];
    let mut printed = 0;

    let mut offset = 0;
    while offset < file.len() {
        file.read_exact_at(offset, &mut raw)
            .map_err(|err| SortError::io(Phase::Dump, offset, err))?;
        write_record(writer, &Record::decode(&raw), printed, per_line).map_err(|err| dump_error(offset, err))?;

        printed += 1;
        offset += block_size;
    }
    finish(writer, printed).map_err(|err| dump_error(offset, err))
}

/// Writes every record of the file, `per_line` records per line.
pub fn dump_records<W: Write>(file: &mut BlockFile, writer: &mut W, per_line: usize) -> Result<(), SortError> {
    let mut buf = vec![0; file.block_size()];
    let end = file.len();
    let mut reader = RecordReader::new(&mut buf, Phase::Dump, 0, end);

    let mut printed = 0;
    while let Some(record) = reader.next_record(file)? {
        let offset = (printed * RECORD_SIZE) as u64;
        write_record(writer, &record, printed, per_line).map_err(|err| dump_error(offset, err))?;
        printed += 1;
    }
    finish(writer, printed).map_err(|err| dump_error(end, err))
}

fn write_record<W: Write>(writer: &mut W, record: &Record, idx: usize, per_line: usize) -> io::Result<()> {
    if idx > 0 {
        if per_line > 0 && idx % per_line == 0 {
            writeln!(writer)?;
        } else {
            write!(writer, " ")?;
        }
    }
    write!(writer, "{}", record)
}

fn finish<W: Write>(writer: &mut W, printed: usize) -> io::Result<()> {
    if printed > 0 {
        writeln!(writer)?;
    }
    writer.flush()
}

fn dump_error(offset: u64, err: io::Error) -> SortError {
    SortError::io(Phase::Dump, offset, err)
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::{dump_blocks, dump_records};
    use crate::block::test::{scratch, write_records};
    use crate::record::Record;

    #[rstest]
    #[case(0, "")]
    #[case(2, "0 0\n")]
    #[case(12, "0 0 2 2 4 4\n6 6 8 8 10 10\n")]
    #[case(13, "0 0 2 2 4 4\n6 6 8 8 10 10\n12 12\n")]
    fn test_dump_blocks(#[case] count: i32, #[case] expected: &str) {
        let mut file = scratch(16);
        let records = Vec::from_iter((0..count).map(|i| Record::with_id(i, i as f32)));
        write_records(&mut file, &records);

        let mut out = Vec::new();
        dump_blocks(&mut file, &mut out, 3).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn test_dump_records() {
        let mut file = scratch(16);
        let records = Vec::from_iter((0..5).map(|i| Record::with_id(i, i as f32 / 2.0)));
        write_records(&mut file, &records);

        let mut out = Vec::new();
        dump_records(&mut file, &mut out, 2).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "0 0 1 0.5\n2 1 3 1.5\n4 2\n");
    }
}
