use const_format::concatcp;
use regex::Regex;
use rusqlite::params;
use rusqlite::Connection as Database;
use rusqlite::Error as DatabaseError;

/// Schema version of a SQLite-backed file system.
#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq)]
pub(crate) struct MetaData(u32);

/// The availability of a file system in a SQLite database.
#[derive(Debug)]
pub(crate) enum Availability {
    /// There is a file system available.
    Available(MetaData),
    /// There is no file system available.
    Missing,
    /// During querying, there was an SQLite error.
    Error(DatabaseError),
}

impl MetaData {
    /// The prefix of the versioned table listing all files.
    pub const TABLE_PREFIX: &'static str = "Resource_Meta_";

    pub const fn from_version(version: u32) -> Self {
        MetaData(version)
    }

    /// Queries a database for the most recent schema version available.
    pub fn from_database(database: &Database) -> Availability {
        let mut statement = match database
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE ?")
        {
            Ok(statement) => statement,
            Err(error) => return Availability::Error(error),
        };

        let pattern = concatcp!(MetaData::TABLE_PREFIX, "%");
        let tables = match statement.query_map(params![pattern], |row| row.get::<_, String>(0)) {
            Ok(tables) => tables,
            Err(error) => return Availability::Error(error),
        };

        let extractor = VersionExtractor::default();
        let last_version = tables
            .filter_map(|table| table.ok())
            .filter_map(|table| extractor.extract(table))
            .map(MetaData)
            .max();

        match last_version {
            Some(meta_data) => Availability::Available(meta_data),
            None => Availability::Missing,
        }
    }

    pub fn version(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct VersionExtractor(Regex);

impl Default for VersionExtractor {
    fn default() -> Self {
        VersionExtractor(
            Regex::new(concatcp!("^", MetaData::TABLE_PREFIX, "([0-9]+)$"))
                .expect("Encountered invalid version RegEx"),
        )
    }
}

impl VersionExtractor {
    fn extract<T: AsRef<str>>(&self, value: T) -> Option<u32> {
        self.0
            .captures(value.as_ref())
            .and_then(|captures| captures.get(1))
            .and_then(|version| version.as_str().parse().ok())
    }
}
