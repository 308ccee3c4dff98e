// This library reads fio JSON reports and turns them into InfluxDB line protocol.  Each file is
// handled on its own: it is loaded, the interesting tags and fields are pulled out of each client
// and job entry, and every entry that has at least one field becomes one line.

mod config;
mod emit;
mod error;
mod extract;
mod lineproto;
mod report;

// Run configuration: measurement name and the tags added to every line.

pub use config::Config;
pub use config::parse_tags;
pub use config::DEFAULT_MEASUREMENT;

// Per-file load failure.  Never fatal to a batch.

pub use error::LoadError;

// The typed view of a report.  Every member is optional.

pub use report::Entry;
pub use report::IoStats;
pub use report::Report;

// Locate the JSON in a report file and parse it.

pub use report::find_json_start;
pub use report::parse_report;
pub use report::read_report;

// Extract records from a report.

pub use extract::convert_report;

// Line protocol escaping and rendering.

pub use lineproto::escape;
pub use lineproto::Record;

// Convert a batch of files, or some text, and write the lines.

pub use emit::convert_files;
pub use emit::convert_text;
pub use emit::write_records;
