use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_line_sort::{LineSorter, LineSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let rw_buf_size: Option<&str> = arg_parser.value_of("rw_buf_size");
    let threads: Option<usize> = arg_parser
        .is_present("threads")
        .then(|| arg_parser.value_of_t_or_exit("threads"));
    let segment_size_mb: Option<u64> = arg_parser
        .is_present("segment_size")
        .then(|| arg_parser.value_of_t_or_exit("segment_size"));

    let mut sorter_builder = LineSorterBuilder::new();
    if let Some(threads) = threads {
        sorter_builder = sorter_builder.with_threads_number(threads);
    }

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(segment_size_mb) = segment_size_mb {
        let segment_size = match segment_size_bytes(segment_size_mb) {
            Some(segment_size) => segment_size,
            None => {
                log::error!("segment size of {} MiB is too large", segment_size_mb);
                process::exit(1);
            }
        };
        sorter_builder = sorter_builder.with_segment_size(segment_size);
    }

    if let Some(rw_buf_size) = rw_buf_size {
        sorter_builder = sorter_builder.with_rw_buf_size(
            rw_buf_size.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize,
        );
    }

    let sorter: LineSorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = sorter.sort(path::Path::new(input), path::Path::new(output)) {
        log::error!("data sorting error: {}", err);
        process::exit(1);
    }
}

/// Converts a segment size in MiB to bytes, [`None`] on overflow.
fn segment_size_bytes(segment_size_mb: u64) -> Option<u64> {
    segment_size_mb.checked_mul(bytesize::MIB)
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

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-line-sort")
        .about("external line sorter")
        .arg(
            clap::Arg::new("input")
                .help("file to be sorted")
                .index(1)
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .help("result file")
                .index(2)
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("threads")
                .help("maximum number of threads to use for parallel sorting")
                .index(3)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("segment_size")
                .help("maximum in-memory segment size in megabytes")
                .index(4)
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
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("temporary files read/write buffer size")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Buffer size format incorrect: {}", err)),
                }),
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
