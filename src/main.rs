extern crate clap;

mod commands;
mod gnuplot;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;

use clap::{crate_version, AppSettings, Arg, ArgMatches, Command, ErrorKind};
use commands::{Annotate, AnnotateError, DEFAULT_REGION_CAPACITY};
use fern::colors::ColoredLevelConfig;
use log::trace;

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new();

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{}] {}",
                colors.color(record.level()),
                message,
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn app() -> Command<'static> {
    Command::new("genwindows")
        .version(crate_version!())
        .about("Write gnuplot rectangles and labels for experiment plan windows")
        .setting(AppSettings::DeriveDisplayOrder)
        .allow_negative_numbers(true)
        .arg(
            Arg::new("in-file")
                .help("Timestamp file, one value per line after a header line")
                .index(1)
                .required(true),
        )
        .arg(
            Arg::new("experiment-time")
                .help("Experiment duration; every window extends to it")
                .index(2)
                .required(true),
        )
        .arg(
            Arg::new("region-capacity")
                .help("Baseline height of the window labels [default: 20]")
                .index(3),
        )
        .arg(
            Arg::new("json")
                .help("Also write the computed windows to <in-file>-win.json")
                .takes_value(false)
                .short('j')
                .long("json"),
        )
        .arg(
            Arg::new("log-level")
                .help("can be one of [error|warn|info|debug|trace]")
                .short('l')
                .long("log-level")
                .default_value("info")
                .takes_value(true),
        )
}

fn program_name() -> String {
    std::env::args().next().unwrap_or_else(|| "genwindows".to_owned())
}

fn write_usage(out: &mut impl Write, program: &str) -> io::Result<()> {
    writeln!(
        out,
        "{} <in-file> <experiment-time> [region-capacity]",
        program
    )
}

/// Prints a failed run and returns the process exit code.
fn report(out: &mut impl Write, err: &AnnotateError, program: &str) -> io::Result<i32> {
    writeln!(out, "{}", err)?;
    if let AnnotateError::InvalidArguments { .. } = err {
        write_usage(out, program)?;
    }
    Ok(err.exit_code())
}

/// Argument errors from clap print only the usage line.
fn reject_arguments(out: &mut impl Write, program: &str) -> io::Result<i32> {
    write_usage(out, program)?;
    Ok(1)
}

fn parse_int(m: &ArgMatches, name: &str) -> commands::Result<i64> {
    let raw = m
        .value_of(name)
        .ok_or_else(|| AnnotateError::invalid_arguments(format!("missing <{}>", name)))?;
    raw.trim().parse().map_err(|_| {
        AnnotateError::invalid_arguments(format!("<{}> must be an integer, got `{}`", name, raw))
    })
}

fn annotate_from(m: &ArgMatches) -> commands::Result<Annotate> {
    let input = m
        .value_of("in-file")
        .map(PathBuf::from)
        .ok_or_else(|| AnnotateError::invalid_arguments("missing <in-file>"))?;
    let max_bound = parse_int(m, "experiment-time")?;
    let region_capacity = if m.is_present("region-capacity") {
        parse_int(m, "region-capacity")?
    } else {
        DEFAULT_REGION_CAPACITY
    };

    Ok(Annotate::new(
        input,
        max_bound,
        region_capacity,
        m.is_present("json"),
    ))
}

fn main() {
    let m = match app().try_get_matches() {
        Ok(m) => m,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => exit(reject_arguments(&mut io::stdout(), &program_name()).unwrap_or(1)),
        },
    };

    let level = match m.value_of("log-level") {
        Some("error") => log::LevelFilter::Error,
        Some("warn") => log::LevelFilter::Warn,
        Some("debug") => log::LevelFilter::Debug,
        Some("trace") => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };
    if let Err(err) = setup_logger(level) {
        eprintln!("failed to set up logging: {}", err);
    }

    trace!("genwindows running");

    let result = annotate_from(&m).and_then(|annotate| annotate.execute());

    if let Err(err) = result {
        exit(report(&mut io::stdout(), &err, &program_name()).unwrap_or(1));
    }
}
