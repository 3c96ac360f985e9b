use std::path;
use std::process;

use env_logger;
use log;

use ext_line_sort::LineGenerator;

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    let arg_parser = build_arg_parser();

    let num_lines: u64 = arg_parser.value_of_t_or_exit("num_lines");
    let max_line_len: usize = arg_parser.value_of_t_or_exit("max_line_len");
    let min_length: usize = arg_parser.value_of_t_or_exit("min_length");
    let output = arg_parser.value_of("output").expect("value is required");

    let mut generator = LineGenerator::new().with_min_length(min_length);
    if let Err(err) = generator.generate(path::Path::new(output), num_lines, max_line_len) {
        log::error!("data generation error: {}", err);
        process::exit(1);
    }

    log::info!("{} lines written to {}", num_lines, output);
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("gen")
        .about("random line file generator")
        .arg(
            clap::Arg::new("num_lines")
                .help("number of lines to generate")
                .index(1)
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("max_line_len")
                .help("maximum line length (exclusive)")
                .index(2)
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .help("file to write lines to")
                .index(3)
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("min_length")
                .short('m')
                .long("min-length")
                .help("minimum line length (inclusive)")
                .takes_value(true)
                .default_value("1"),
        )
        .get_matches()
}
