// Turn a parsed report into records: one per client_stats entry, then one per jobs entry, in
// document order.  Both sections are processed if both are present.
//
// Tags come from the caller's base tags, a few of the global options, the job name and host name
// and (for jobs) a few of the job options.  Fields are the cpu times and a few of the read/write
// statistics.  Only these allow-listed keys are looked at; everything else in the report is
// ignored.

use crate::lineproto::{token, Record};
use crate::report::{scalar_text, Entry, IoStats, Report};
use serde_json::{Map, Value};
use tracing::debug;

/// Global options that become tags on every record from the report.

const GLOBAL_OPTION_TAGS: [&str; 7] = ["numjobs", "rw", "name", "size", "bs", "iodepth", "ioengine"];

/// Job options that become tags on the job's record.

const JOB_OPTION_TAGS: [&str; 2] = ["cpus_allowed", "filename"];

/// Per-entry cpu fields.

const CPU_FIELDS: [&str; 2] = ["usr_cpu", "sys_cpu"];

/// Statistics taken from the `read` and `write` sections, reported as `read.bw` etc.

const IO_FIELDS: [&str; 4] = ["io_bytes", "bw", "iops", "runtime"];

/// Placeholder for a cpu value that is present but not a scalar.

const PARSE_ERROR: &str = "parse_error";

/// Produce the records for `report`.  `base_tags` are complete `key=value` tokens that are added
/// to every record.  A report without a timestamp produces nothing.  Records with no fields are
/// included here; they are dropped when rendered.

pub fn convert_report(report: &Report, measurement: &str, base_tags: &[String]) -> Vec<Record> {
    let timestamp = match report.timestamp {
        Some(t) => t,
        None => {
            debug!("No timestamp, skipping report");
            return vec![];
        }
    };

    let mut report_tags = base_tags.to_vec();
    if let Some(ref opts) = report.global_options {
        report_tags.extend(option_tags(opts, &GLOBAL_OPTION_TAGS));
    }

    let mut records = vec![];
    let mut add = |entry: &Entry, extra: Vec<String>| {
        let mut tags = report_tags.clone();
        tags.extend(basic_tags(entry));
        tags.extend(extra);
        records.push(Record {
            measurement: measurement.to_string(),
            tags,
            fields: interesting_fields(entry),
            timestamp,
        });
    };

    if let Some(ref clients) = report.client_stats {
        for entry in clients {
            add(entry, vec![]);
        }
    }
    if let Some(ref jobs) = report.jobs {
        for entry in jobs {
            let extra = match entry.job_options {
                Some(ref opts) => option_tags(opts, &JOB_OPTION_TAGS),
                None => vec![],
            };
            add(entry, extra);
        }
    }
    records
}

/// Tags for the allow-listed keys that are present in `opts` with a scalar value, in allow-list
/// order.

fn option_tags(opts: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| {
            let v = scalar_text(opts.get(*k)?)?;
            Some(token(k, &v))
        })
        .collect()
}

fn basic_tags(entry: &Entry) -> Vec<String> {
    let jobname = entry
        .jobname
        .as_ref()
        .and_then(scalar_text)
        .unwrap_or_else(|| "unknown".to_string());
    let mut tags = vec![token("jobname", &jobname)];
    if let Some(hostname) = entry.hostname.as_ref().and_then(scalar_text) {
        tags.push(token("job_hostname", &hostname));
    }
    tags
}

fn interesting_fields(entry: &Entry) -> Vec<String> {
    let mut fields = vec![];
    for (name, value) in CPU_FIELDS.iter().zip([&entry.usr_cpu, &entry.sys_cpu]) {
        if let Some(v) = value {
            let text = scalar_text(v).unwrap_or_else(|| PARSE_ERROR.to_string());
            fields.push(token(name, &text));
        }
    }
    for (section, stats) in [("read", &entry.read), ("write", &entry.write)] {
        if let Some(stats) = stats {
            fields.extend(io_fields(section, stats));
        }
    }
    fields
}

fn io_fields(section: &str, stats: &IoStats) -> Vec<String> {
    IO_FIELDS
        .iter()
        .zip([&stats.io_bytes, &stats.bw, &stats.iops, &stats.runtime])
        .filter_map(|(name, value)| {
            let v = scalar_text(value.as_ref()?)?;
            Some(token(&format!("{}.{}", section, name), &v))
        })
        .collect()
}

#[cfg(test)]
use crate::report::parse_report;

#[cfg(test)]
fn lines(text: &str, base_tags: &[String]) -> Vec<String> {
    let report = parse_report("test", text).unwrap();
    convert_report(&report, "fio", base_tags)
        .iter()
        .filter_map(|r| r.render())
        .collect()
}

#[test]
fn test_single_job() {
    let x = lines(
        r#"{"timestamp": 1000, "jobs": [{"jobname": "job0", "read": {"iops": 500, "bw": 2000}}]}"#,
        &[],
    );
    assert!(x == vec!["fio,jobname=job0 read.bw=2000,read.iops=500 1000000000000".to_string()]);
}

#[test]
fn test_no_timestamp() {
    let x = lines(
        r#"{"jobs": [{"jobname": "job0", "read": {"iops": 500}}], "client_stats": [{"usr_cpu": 1}]}"#,
        &["env=prod".to_string()],
    );
    assert!(x.is_empty());
}

#[test]
fn test_no_fields() {
    let report = parse_report(
        "test",
        r#"{"timestamp": 1000, "jobs": [{"jobname": "job0", "hostname": "h", "job options": {"filename": "f"}}]}"#,
    )
    .unwrap();
    let records = convert_report(&report, "fio", &[]);
    assert!(records.len() == 1);
    assert!(records[0].tags.len() == 3);
    assert!(records[0].fields.is_empty());
    assert!(records[0].render().is_none());
}

#[test]
fn test_extra_tags() {
    let base = vec!["env=prod".to_string(), "dc=west".to_string()];
    let x = lines(
        r#"{"timestamp": 5, "jobs": [{"jobname": "j", "write": {"iops": 1}}]}"#,
        &base,
    );
    assert!(x == vec!["fio,dc=west,env=prod,jobname=j write.iops=1 5000000000".to_string()]);
}

#[test]
fn test_defaults_and_escaping() {
    let x = lines(
        r#"{"timestamp": 1,
            "global options": {"rw": "randrw", "bs": "4k", "name": "my test", "direct": "1", "iodepth": 32},
            "client_stats": [{"hostname": "node 1", "usr_cpu": 1.5, "sys_cpu": {"odd": true}}]}"#,
        &[],
    );
    assert!(x.len() == 1);
    assert!(
        x[0] == "fio,bs=4k,iodepth=32,job_hostname=node\\ 1,jobname=unknown,name=my\\ test,rw=randrw \
                 sys_cpu=parse_error,usr_cpu=1.5 1000000000"
    );
}

#[test]
fn test_clients_then_jobs() {
    let report = parse_report(
        "test",
        r#"{"timestamp": 10,
            "client_stats": [{"jobname": "c0", "usr_cpu": 1}, {"jobname": "c1"}],
            "jobs": [{"jobname": "j0", "read": {"runtime": 100, "io_bytes": 4096}},
                     {"jobname": "j1", "sys_cpu": 2, "job options": {"cpus_allowed": "0-3", "bs": "8k"}}]}"#,
    )
    .unwrap();
    let records = convert_report(&report, "m", &[]);
    let names = records.iter().map(|r| r.tags[0].clone()).collect::<Vec<String>>();
    assert!(names == vec!["jobname=c0", "jobname=c1", "jobname=j0", "jobname=j1"]);

    let x = records.iter().filter_map(|r| r.render()).collect::<Vec<String>>();
    assert!(x.len() == 3);
    assert!(x[0] == "m,jobname=c0 usr_cpu=1 10000000000");
    assert!(x[1] == "m,jobname=j0 read.io_bytes=4096,read.runtime=100 10000000000");
    assert!(x[2] == "m,cpus_allowed=0-3,jobname=j1 sys_cpu=2 10000000000");
}

#[test]
fn test_wrong_shaped_sections() {
    // Sections of the wrong type are skipped, the rest of the entry is still used.
    let x = lines(
        r#"{"timestamp": 1, "global options": "x",
            "jobs": [{"jobname": "a", "usr_cpu": 1, "read": "n/a", "job options": []}]}"#,
        &[],
    );
    assert!(x == vec!["fio,jobname=a usr_cpu=1 1000000000".to_string()]);
}
