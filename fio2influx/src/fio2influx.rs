// `fio2influx` -- Convert `fio` JSON reports to InfluxDB line protocol
//
// Usage: fio2influx [--measurement NAME] [--tags K=V,...] FILE...
//
// One line is written to stdout for every client or job entry in each report that has at least one
// interesting field.  Files that cannot be read or parsed are reported on stderr and skipped; that
// does not change the exit status.  Pipe the output to `influx write` or similar.
//
// Run with -v (or more) or set RUST_LOG to see what's going on; logging always goes to stderr.
//
// Quirks
//
// The timestamp is fio's seconds-resolution `timestamp` with nine zeroes appended.  Every line from
// one report has the same timestamp, so lines from several runs of the same job in the same second
// will overwrite each other in the database unless they are told apart by a tag (the filename tag
// helps here, --tags can be used for the rest).

use anyhow::Result;
use clap::Parser;
use fiolog::{Config, DEFAULT_MEASUREMENT};
use std::io::{self, BufWriter};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Measurement name for the output lines
    #[arg(long, short, default_value = DEFAULT_MEASUREMENT)]
    measurement: String,

    /// Extra tags for every line, comma-separated key=value pairs (entries without `=` are
    /// ignored) [default: none]
    #[arg(long, short)]
    tags: Option<String>,

    /// Log more to stderr (repeatable)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// fio JSON report files
    #[arg(required = true)]
    filenames: Vec<String>,
}

fn main() {
    match fio2influx() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {}", msg);
            process::exit(1);
        }
    }
}

fn fio2influx() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    debug!(?cli, "parsed arguments");

    let config = Config::new(&cli.measurement, cli.tags.as_deref());

    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    let lines = fiolog::convert_files(&cli.filenames, &config, &mut output, |e| {
        eprintln!("{}", e);
    })?;
    debug!("{} lines written", lines);
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[test]
fn test_cli() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["fio2influx", "a.json"]).unwrap();
    assert!(cli.measurement == "fio");
    assert!(cli.tags.is_none());
    assert!(cli.verbose == 0);
    assert!(cli.filenames == vec!["a.json"]);
}

#[test]
fn test_cli_options() {
    let cli = Cli::try_parse_from([
        "fio2influx",
        "--measurement",
        "disk",
        "-t",
        "env=prod,dc=west",
        "-vv",
        "a.json",
        "b.json",
    ])
    .unwrap();
    assert!(cli.measurement == "disk");
    assert!(cli.tags.as_deref() == Some("env=prod,dc=west"));
    assert!(cli.verbose == 2);
    assert!(cli.filenames == vec!["a.json", "b.json"]);
}

#[test]
fn test_cli_needs_files() {
    assert!(Cli::try_parse_from(["fio2influx"]).is_err());
    assert!(Cli::try_parse_from(["fio2influx", "-m", "x"]).is_err());
}
