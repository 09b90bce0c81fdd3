use std::fs;
use std::io;
use std::path;

use env_logger;
use log;
use rand::Rng;

use runsort::dump::dump_blocks;
use runsort::{BlockFile, ExternalSorterBuilder, Record};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let path = path::Path::new("input.bin");
    let mut rng = rand::thread_rng();
    let data: Vec<u8> = (0..64 * 1024)
        .flat_map(|id| Record::with_id(id, rng.gen_range(-1000.0..1000.0)).encode())
        .collect();
    fs::write(path, data).unwrap();

    let sorter = ExternalSorterBuilder::new()
        .with_block_size(8192)
        .with_fan_in(4)
        .with_memory_budget(4 * 8192)
        .with_tmp_dir(path::Path::new("./"))
        .build()
        .unwrap();

    let summary = sorter.sort(path).unwrap();
    log::info!("{:?}", summary);

    let mut file = BlockFile::open(path, 8192).unwrap();
    dump_blocks(&mut file, &mut io::stdout(), 5).unwrap();
}
