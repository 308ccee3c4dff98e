// Rendering of records in the InfluxDB line protocol.
//
// A line has the shape
//
//   measurement,tag=value,tag=value field=value,field=value timestamp
//
// with exactly one space before the field block and one before the timestamp.  Tag and field
// values are escaped so that none of `"`, `,`, `=` or space appear unescaped in them.  Keys are
// produced by us from a fixed vocabulary and are never escaped; measurement names and extra tags
// from the command line are taken verbatim.
//
// NOTE:
//
// - The report timestamp is in whole seconds and the line protocol wants nanoseconds.  The scaling
//   is done by appending nine zeroes to the decimal text, not by multiplying.  A timestamp that is
//   already in milliseconds would come out as nonsense, but fio has only ever emitted seconds in
//   this field (the millisecond value is in `timestamp_ms`, which we ignore).

use itertools::Itertools;

/// Escape a tag or field value for the line protocol.

pub fn escape(value: &str) -> String {
    let mut s = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | ',' | '=' | ' ' => {
                s.push('\\');
                s.push(c);
            }
            _ => s.push(c),
        }
    }
    s
}

/// Make a `key=value` token with the value escaped.

pub fn token(key: &str, value: &str) -> String {
    format!("{}={}", key, escape(value))
}

/// One output point.  Tags and fields are complete `key=value` tokens with the values already
/// escaped; they are kept in the order they were produced and sorted only when rendered.

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub measurement: String,
    pub tags: Vec<String>,
    pub fields: Vec<String>,

    /// Seconds since the epoch, straight from the report.
    pub timestamp: i64,
}

impl Record {
    /// Render the record as one line (without the terminating newline), or None if there are no
    /// fields: a point without fields is not a point.

    pub fn render(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }
        let mut line = self.measurement.clone();
        if !self.tags.is_empty() {
            line.push(',');
            line.push_str(&self.tags.iter().sorted().join(","));
        }
        line.push(' ');
        line.push_str(&self.fields.iter().sorted().join(","));
        line.push(' ');
        line.push_str(&self.timestamp.to_string());
        line.push_str("000000000");
        Some(line)
    }
}

#[cfg(test)]
fn record(tags: &[&str], fields: &[&str]) -> Record {
    Record {
        measurement: "fio".to_string(),
        tags: tags.iter().map(|x| x.to_string()).collect(),
        fields: fields.iter().map(|x| x.to_string()).collect(),
        timestamp: 1000,
    }
}

#[test]
fn test_escape() {
    assert!(escape("plain") == "plain");
    assert!(escape("a b") == "a\\ b");
    assert!(escape("k=v,w") == "k\\=v\\,w");
    assert!(escape("\"quoted\"") == "\\\"quoted\\\"");
    assert!(escape("") == "");

    // Nothing special is left unescaped.
    let e = escape("x \"y\",z=w");
    let bytes = e.as_bytes();
    for i in 0..bytes.len() {
        if b"\", =".contains(&bytes[i]) {
            assert!(i > 0 && bytes[i - 1] == b'\\');
        }
    }
}

#[test]
fn test_token() {
    assert!(token("rw", "randread") == "rw=randread");
    assert!(token("filename", "/tmp/my file") == "filename=/tmp/my\\ file");
}

#[test]
fn test_render() {
    let r = record(&["jobname=job0"], &["read.iops=500", "read.bw=2000"]);
    assert!(r.render().unwrap() == "fio,jobname=job0 read.bw=2000,read.iops=500 1000000000000");

    // Sorting is on the whole token, not the key.
    let r = record(&["jobname=b", "env=prod", "dc=west"], &["usr_cpu=1.5", "sys_cpu=0.5"]);
    assert!(r.render().unwrap() == "fio,dc=west,env=prod,jobname=b sys_cpu=0.5,usr_cpu=1.5 1000000000000");

    // Duplicate tag keys are not merged.
    let r = record(&["jobname=b", "jobname=a"], &["bw=1"]);
    assert!(r.render().unwrap() == "fio,jobname=a,jobname=b bw=1 1000000000000");

    // No tags at all.
    let r = record(&[], &["bw=1"]);
    assert!(r.render().unwrap() == "fio bw=1 1000000000000");
}

#[test]
fn test_render_no_fields() {
    let r = record(&["jobname=job0", "job_hostname=h1"], &[]);
    assert!(r.render().is_none());
}
