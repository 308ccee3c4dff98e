// Reader for fio JSON reports (`fio --output-format=json`, and the client/server variant).
//
// The parts of the report we care about look like this:
//
//   {
//     "timestamp" : 1700000000,
//     "global options" : { "rw" : "randread", "bs" : "4k", ... },
//     "client_stats" : [ <entry>, ... ],
//     "jobs" : [ <entry>, ... ]
//   }
//
// where an entry is
//
//   {
//     "jobname" : "job0",
//     "hostname" : "node1",                      (client_stats only, usually)
//     "job options" : { "filename" : ..., ... }  (jobs only)
//     "read" : { "io_bytes" : ..., "bw" : ..., "iops" : ..., "runtime" : ..., ... },
//     "write" : { ... },
//     "usr_cpu" : 1.5,
//     "sys_cpu" : 0.5,
//     ...
//   }
//
// Every member is optional.  Absence is not an error, it just means there is nothing to extract,
// and a section that is not the expected map or array counts as absent.
// Leaf values are kept as generic JSON values because fio is not consistent about whether it
// prints numbers or strings, and we only ever render them as text anyway.
//
// NOTE:
//
// - fio may print log lines or other chatter before the JSON body, so we have to find where the
//   JSON starts.  We look for the first `{` that ends a line, which is how fio's own pretty printer
//   opens the document.  If there is no such thing, we take the first line that starts with `{`,
//   which handles reports that have been compacted onto a single line.  This is a heuristic: a
//   preamble line that ends in `{` will fool it.
//
// - Anything after the JSON document (fio sometimes appends warnings) is ignored.

use crate::LoadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fs;

/// The report.  `timestamp` must be an integer if it is present, anything else makes the file fail
/// to load.  The sections are looked at only if they have the right shape: a section of the wrong
/// type is treated as absent.

#[derive(Debug, Default, Deserialize)]
pub struct Report {
    /// Seconds since the epoch.  Without it, the report produces no output.
    pub timestamp: Option<i64>,

    #[serde(rename = "global options", default, deserialize_with = "lenient")]
    pub global_options: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "lenient")]
    pub client_stats: Option<Vec<Entry>>,

    #[serde(default, deserialize_with = "lenient")]
    pub jobs: Option<Vec<Entry>>,
}

/// One job or client result.

#[derive(Debug, Default, Deserialize)]
pub struct Entry {
    pub jobname: Option<Value>,
    pub hostname: Option<Value>,

    #[serde(rename = "job options", default, deserialize_with = "lenient")]
    pub job_options: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "lenient")]
    pub read: Option<IoStats>,

    #[serde(default, deserialize_with = "lenient")]
    pub write: Option<IoStats>,

    pub usr_cpu: Option<Value>,
    pub sys_cpu: Option<Value>,
}

/// The subset of the per-direction statistics that we report.  fio has many more.

#[derive(Debug, Default, Deserialize)]
pub struct IoStats {
    pub io_bytes: Option<Value>,
    pub bw: Option<Value>,
    pub iops: Option<Value>,
    pub runtime: Option<Value>,
}

// Take any JSON value and keep it only if it converts to T.  Malformed JSON is still an error, a
// well-formed value of the wrong shape becomes None.

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(v).ok())
}

/// Text of a scalar value: strings verbatim, numbers as serde_json prints them, booleans as
/// `true`/`false`.  Null, arrays and objects are not scalars.

pub fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Find the byte offset where the JSON document starts, see the file comment.

pub fn find_json_start(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        if bytes[i] == b'{' {
            match bytes.get(i + 1) {
                Some(b'\n') => return Some(i),
                Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => return Some(i),
                _ => {}
            }
        }
    }

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('{') {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Parse the report text from `file_name`.  The name is used only for error messages.

pub fn parse_report(file_name: &str, text: &str) -> Result<Report, LoadError> {
    let start = find_json_start(text).ok_or_else(|| LoadError::NoJson {
        file: file_name.to_string(),
    })?;

    // Take the first value and leave whatever follows it alone.
    let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Report>();
    match values.next() {
        Some(Ok(report)) => Ok(report),
        Some(Err(source)) => Err(LoadError::Json {
            file: file_name.to_string(),
            source,
        }),
        None => Err(LoadError::NoJson {
            file: file_name.to_string(),
        }),
    }
}

/// Read and parse the report in the named file.

pub fn read_report(file_name: &str) -> Result<Report, LoadError> {
    let text = fs::read_to_string(file_name).map_err(|source| LoadError::Read {
        file: file_name.to_string(),
        source,
    })?;
    parse_report(file_name, &text)
}

#[test]
fn test_find_json_start() {
    assert!(find_json_start("{\n}") == Some(0));
    assert!(find_json_start("fio-3.35\nstarting\n{\n \"a\": 1\n}\n") == Some(18));
    assert!(find_json_start("x\r\n{\r\n}") == Some(3));

    // A brace that does not end its line is skipped by the first scan.
    assert!(find_json_start("note: {x}\n{\n}") == Some(10));

    // Single-line documents are found by the second scan.
    assert!(find_json_start("banner\n  {\"timestamp\": 1}") == Some(9));
    assert!(find_json_start("{\"timestamp\": 1}") == Some(0));

    assert!(find_json_start("no json here\n").is_none());
    assert!(find_json_start("").is_none());
}

#[test]
fn test_scalar_text() {
    assert!(scalar_text(&serde_json::json!("4k")) == Some("4k".to_string()));
    assert!(scalar_text(&serde_json::json!(500)) == Some("500".to_string()));
    assert!(scalar_text(&serde_json::json!(1.25)) == Some("1.25".to_string()));
    assert!(scalar_text(&serde_json::json!(true)) == Some("true".to_string()));
    assert!(scalar_text(&serde_json::json!(null)).is_none());
    assert!(scalar_text(&serde_json::json!([1])).is_none());
    assert!(scalar_text(&serde_json::json!({"a": 1})).is_none());
}

#[test]
fn test_parse_report() {
    let r = parse_report(
        "inline",
        "{\"timestamp\": 1000, \"jobs\": [{\"jobname\": \"job0\", \"read\": {\"iops\": 500}}]}",
    )
    .unwrap();
    assert!(r.timestamp == Some(1000));
    assert!(r.global_options.is_none());
    assert!(r.client_stats.is_none());
    let jobs = r.jobs.unwrap();
    assert!(jobs.len() == 1);
    assert!(jobs[0].jobname == Some(serde_json::json!("job0")));
    assert!(jobs[0].write.is_none());
    let read = jobs[0].read.as_ref().unwrap();
    assert!(read.iops == Some(serde_json::json!(500)));
    assert!(read.bw.is_none());

    // Trailing chatter is ignored.
    let r = parse_report("inline", "{\n\"timestamp\": 7\n}\nfio: some warning\n").unwrap();
    assert!(r.timestamp == Some(7));
}

#[test]
fn test_parse_report_errors() {
    match parse_report("bad", "nothing to see") {
        Err(LoadError::NoJson { file }) => assert!(file == "bad"),
        _ => panic!("expected NoJson"),
    }
    match parse_report("bad", "{\n\"timestamp\": \n") {
        Err(LoadError::Json { file, .. }) => assert!(file == "bad"),
        _ => panic!("expected Json"),
    }
    // A timestamp that is not an integer fails the file.
    assert!(parse_report("bad", "{\n\"timestamp\": \"soon\"\n}").is_err());
}

#[test]
fn test_parse_report_wrong_shapes() {
    let r = parse_report(
        "odd",
        r#"{"timestamp": 1, "global options": "x", "client_stats": {"a": 1},
            "jobs": [{"jobname": "a", "usr_cpu": 1, "read": "n/a", "write": null, "job options": []}]}"#,
    )
    .unwrap();
    assert!(r.timestamp == Some(1));
    assert!(r.global_options.is_none());
    assert!(r.client_stats.is_none());
    let jobs = r.jobs.unwrap();
    assert!(jobs.len() == 1);
    assert!(jobs[0].read.is_none());
    assert!(jobs[0].write.is_none());
    assert!(jobs[0].job_options.is_none());
    assert!(jobs[0].usr_cpu == Some(serde_json::json!(1)));

    // Not a list of entries at all.
    let r = parse_report("odd", "{\n\"timestamp\": 1, \"jobs\": 3\n}").unwrap();
    assert!(r.jobs.is_none());
}

#[test]
fn test_read_report() {
    // No such file
    match read_report("testdata/no_such_file.json") {
        Err(LoadError::Read { .. }) => {}
        _ => panic!("expected Read"),
    }

    // This file has several lines of fio chatter before the JSON, one of which contains braces.
    let r = read_report("testdata/preamble.json").unwrap();
    assert!(r.timestamp == Some(1700000000));
    assert!(r.jobs.unwrap().len() == 1);
    let opts = r.global_options.unwrap();
    assert!(opts.get("rw") == Some(&serde_json::json!("randread")));
}
