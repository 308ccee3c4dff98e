// Run configuration: what the caller decides once for the whole batch.  It is read-only while files
// are being processed.

use crate::lineproto::token;

pub const DEFAULT_MEASUREMENT: &str = "fio";

#[derive(Debug, Clone)]
pub struct Config {
    /// Measurement name for every line.
    pub measurement: String,

    /// Tags added to every record, as complete `key=value` tokens.
    pub base_tags: Vec<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            measurement: DEFAULT_MEASUREMENT.to_string(),
            base_tags: vec![],
        }
    }
}

impl Config {
    /// `tags` is the comma-separated `key=value` list from the command line, if any.

    pub fn new(measurement: &str, tags: Option<&str>) -> Config {
        Config {
            measurement: measurement.to_string(),
            base_tags: tags.map(parse_tags).unwrap_or_default(),
        }
    }

    /// The tags for records from one file: the base tags plus `filename=<file_name>`.

    pub fn tags_for_file(&self, file_name: &str) -> Vec<String> {
        let mut tags = self.base_tags.clone();
        tags.push(token("filename", file_name));
        tags
    }
}

/// Split a comma-separated tag list.  Entries without `=` are dropped silently; the others are
/// kept verbatim and in order.

pub fn parse_tags(spec: &str) -> Vec<String> {
    spec.split(',')
        .filter(|t| t.contains('='))
        .map(|t| t.to_string())
        .collect()
}

#[test]
fn test_parse_tags() {
    assert!(parse_tags("env=prod,dc=west") == vec!["env=prod", "dc=west"]);
    assert!(parse_tags("env=prod,,junk,dc=west,") == vec!["env=prod", "dc=west"]);
    assert!(parse_tags("").is_empty());
    assert!(parse_tags("a=b=c") == vec!["a=b=c"]);
}

#[test]
fn test_config() {
    let c = Config::default();
    assert!(c.measurement == "fio");
    assert!(c.base_tags.is_empty());

    let c = Config::new("disk", Some("env=prod,oops"));
    assert!(c.measurement == "disk");
    assert!(c.base_tags == vec!["env=prod"]);

    let tags = c.tags_for_file("runs/a b.json");
    assert!(tags == vec!["env=prod", "filename=runs/a\\ b.json"]);

    // The base list is not touched.
    assert!(c.base_tags.len() == 1);
}
