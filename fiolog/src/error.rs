// Errors from loading a report file.  These are always per-file: the caller reports them and moves
// on to the next file.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot parse json from file {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse json from file {file}: no start of json object found")]
    NoJson { file: String },

    #[error("cannot parse json from file {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl LoadError {
    /// The name of the file that failed to load.

    pub fn file(&self) -> &str {
        match self {
            LoadError::Read { file, .. } => file,
            LoadError::NoJson { file } => file,
            LoadError::Json { file, .. } => file,
        }
    }
}

#[test]
fn test_messages() {
    let e = LoadError::NoJson { file: "x.json".to_string() };
    assert!(e.file() == "x.json");
    assert!(e.to_string().starts_with("cannot parse json from file x.json: "));

    let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let e = LoadError::Json { file: "y.json".to_string(), source };
    assert!(e.to_string().starts_with("cannot parse json from file y.json: "));

    let source = io::Error::new(io::ErrorKind::NotFound, "gone");
    let e = LoadError::Read { file: "z.json".to_string(), source };
    assert!(e.to_string() == "cannot parse json from file z.json: gone");
}
