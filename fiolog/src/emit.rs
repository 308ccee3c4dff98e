// Drive the conversion of a batch of files and write the lines.
//
// Files are processed one at a time in the order given.  A file that cannot be read or parsed is
// handed to the caller's error function and then skipped; it never stops the batch.  Errors writing
// the output do stop the batch, since there is nowhere left to put anything.

use crate::extract::convert_report;
use crate::report::{parse_report, read_report};
use crate::{Config, LoadError, Record, Report};
use anyhow::Result;
use std::io::Write;
use tracing::{debug, trace};

/// Write the rendered records to `output`, one per line, skipping records without fields.  Returns
/// the number of lines written.

pub fn write_records(output: &mut dyn Write, records: &[Record]) -> Result<usize> {
    let mut n = 0;
    for line in records.iter().filter_map(Record::render) {
        trace!("{}", line);
        output.write_all(line.as_bytes())?;
        output.write_all(b"\n")?;
        n += 1;
    }
    Ok(n)
}

/// Convert report text that has already been read.  `file_name` is used for the `filename` tag and
/// for error messages.  A load failure comes back as a LoadError inside the anyhow error.

pub fn convert_text(
    file_name: &str,
    text: &str,
    config: &Config,
    output: &mut dyn Write,
) -> Result<usize> {
    let report = parse_report(file_name, text)?;
    emit_report(file_name, &report, config, output)
}

/// Convert the named files in order, writing lines to `output`.  `on_error` is called for every
/// file that fails to load.  Returns the total number of lines written.

pub fn convert_files<F>(
    file_names: &[String],
    config: &Config,
    output: &mut dyn Write,
    mut on_error: F,
) -> Result<usize>
where
    F: FnMut(&LoadError),
{
    let mut total = 0;
    for file_name in file_names {
        debug!("Reading {}", file_name);
        match read_report(file_name) {
            Ok(report) => {
                total += emit_report(file_name, &report, config, output)?;
            }
            Err(e) => {
                on_error(&e);
            }
        }
    }
    output.flush()?;
    Ok(total)
}

fn emit_report(
    file_name: &str,
    report: &Report,
    config: &Config,
    output: &mut dyn Write,
) -> Result<usize> {
    let records = convert_report(report, &config.measurement, &config.tags_for_file(file_name));
    let n = write_records(output, &records)?;
    debug!("{}: {} records, {} lines", file_name, records.len(), n);
    Ok(n)
}

#[cfg(test)]
fn run(files: &[&str], config: &Config) -> (String, Vec<String>) {
    let names = files.iter().map(|x| x.to_string()).collect::<Vec<String>>();
    let mut out: Vec<u8> = vec![];
    let mut failed = vec![];
    convert_files(&names, config, &mut out, |e| failed.push(e.file().to_string())).unwrap();
    (String::from_utf8(out).unwrap(), failed)
}

#[test]
fn test_write_records() {
    let records = vec![
        Record {
            measurement: "fio".to_string(),
            tags: vec!["jobname=a".to_string()],
            fields: vec![],
            timestamp: 1,
        },
        Record {
            measurement: "fio".to_string(),
            tags: vec!["jobname=b".to_string()],
            fields: vec!["bw=3".to_string()],
            timestamp: 1,
        },
    ];
    let mut out: Vec<u8> = vec![];
    assert!(write_records(&mut out, &records).unwrap() == 1);
    assert!(out == b"fio,jobname=b bw=3 1000000000\n");
}

#[test]
fn test_convert_text() {
    let config = Config::new("fio", Some("env=prod,dc=west"));
    let mut out: Vec<u8> = vec![];
    let n = convert_text(
        "r.json",
        r#"{"timestamp": 1000, "jobs": [{"jobname": "job0", "read": {"iops": 500, "bw": 2000}}]}"#,
        &config,
        &mut out,
    )
    .unwrap();
    assert!(n == 1);
    assert!(
        String::from_utf8(out).unwrap()
            == "fio,dc=west,env=prod,filename=r.json,jobname=job0 read.bw=2000,read.iops=500 1000000000000\n"
    );

    let mut out: Vec<u8> = vec![];
    let e = convert_text("bad.json", "not json", &config, &mut out).unwrap_err();
    assert!(e.downcast_ref::<LoadError>().is_some());
    assert!(out.is_empty());
}

#[test]
fn test_convert_files() {
    // The bad file and the missing file are reported, and the files after them are still done.
    let (out, failed) = run(
        &[
            "testdata/invalid.json",
            "testdata/preamble.json",
            "testdata/no_such_file.json",
            "testdata/no_timestamp.json",
            "testdata/client_and_jobs.json",
        ],
        &Config::default(),
    );
    assert!(failed == vec!["testdata/invalid.json", "testdata/no_such_file.json"]);

    let lines = out.lines().collect::<Vec<&str>>();
    assert!(lines.len() == 4);
    assert!(
        lines[0]
            == "fio,bs=4k,filename=testdata/preamble.json,iodepth=16,ioengine=libaio,jobname=seqread,\
                numjobs=1,rw=randread,size=1G \
                read.bw=409600,read.io_bytes=4294967296,read.iops=102400.5,read.runtime=10000,\
                sys_cpu=12.25,usr_cpu=3.5 1700000000000000000"
    );

    // Two clients (one without fields) and two jobs, clients first.
    assert!(lines[1].starts_with("fio,filename=testdata/client_and_jobs.json,job_hostname=node1,jobname=All\\ clients "));
    assert!(lines[2].contains(",jobname=writer "));
    assert!(lines[2].contains(" usr_cpu=0.75,write.bw=1024,write.iops=256 "));
    assert!(lines[3].contains("cpus_allowed=0-3,filename=/dev/nvme0n1"));
    for l in &lines[1..] {
        assert!(l.ends_with(" 1699999999000000000"));
    }
}

#[test]
fn test_empty_batch() {
    let (out, failed) = run(&[], &Config::default());
    assert!(out.is_empty());
    assert!(failed.is_empty());
}
