use std::io;
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use runsort::dump::{dump_blocks, DEFAULT_PER_LINE};
use runsort::{BlockFile, ExternalSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let fan_in: usize = arg_parser.value_of_t_or_exit("fan_in");
    let block_size = parse_size(arg_parser.value_of("block_size").expect("value is defaulted"));
    let memory = parse_size(arg_parser.value_of("memory").expect("value is defaulted"));
    let input = path::Path::new(arg_parser.value_of("input").expect("value is required"));

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_block_size(block_size)
        .with_fan_in(fan_in)
        .with_memory_budget(memory);

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let summary = match sorter.sort(input) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };
    log::info!(
        "{} records sorted (initial runs: {}, merge passes: {})",
        summary.records,
        summary.initial_runs,
        summary.passes
    );

    if arg_parser.is_present("dump") {
        let mut file = match BlockFile::open(input, block_size) {
            Ok(file) => file,
            Err(err) => {
                log::error!("sorted file opening error: {}", err);
                process::exit(1);
            }
        };
        let mut stdout = io::stdout().lock();
        if let Err(err) = dump_blocks(&mut file, &mut stdout, DEFAULT_PER_LINE) {
            log::error!("data dumping error: {}", err);
            process::exit(1);
        }
    }
}

fn parse_size(value: &str) -> usize {
    value.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn validate_size(value: &str) -> Result<(), String> {
    match value.parse::<ByteSize>() {
        Ok(_) => Ok(()),
        Err(err) => Err(format!("size format incorrect: {}", err)),
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("runsort")
        .about("in-place external sorter for fixed-width binary records")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted in place")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("block_size")
                .short('b')
                .long("block-size")
                .help("I/O block size")
                .takes_value(true)
                .default_value("8KiB")
                .validator(validate_size),
        )
        .arg(
            clap::Arg::new("fan_in")
                .short('f')
                .long("fan-in")
                .help("number of runs merged at once")
                .takes_value(true)
                .default_value("4"),
        )
        .arg(
            clap::Arg::new("memory")
                .short('m')
                .long("memory")
                .help("heap memory budget")
                .takes_value(true)
                .default_value("128KiB")
                .validator(validate_size),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("dump")
                .long("dump")
                .help("print the first record of every block after sorting"),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
