//! The capability interface shared by every resource backend.
//!
//! Backends implement [`Resource::description`] and [`Resource::input_stream`]; every other
//! accessor has a default built on top of those two and may be overridden when the backend can
//! answer more directly.
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use url::Url;

use crate::channel::{ReadableChannel, StreamChannel, WritableChannel};
use crate::errors::{ResourceError, ResourceResult};

/// A stream reading the content of a resource.
pub type InputStream = Box<dyn Read + Send>;

/// A stream writing the content of a resource.
pub type OutputStream = Box<dyn Write + Send>;

/// What a resource is compared and hashed by when handled as a trait object.
///
/// Identities of different kinds never compare equal, so a file never equals a buffer holding
/// the same bytes as its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Identified by the human-readable description.
    Description(String),
    /// Identified by a cleaned path string.
    Path(String),
    /// Identified by the content itself.
    Content(Arc<[u8]>),
}

/// Milliseconds since the Unix epoch, zero for earlier points in time.
pub(crate) fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

/// A byte-bearing entity which can be read from and queried for metadata.
///
/// Handles are immutable. Streams and channels are opened anew on each call and belong to the
/// caller; flags are recomputed on each query.
pub trait Resource: Debug + Send + Sync {
    /// A human-readable identifier, used for logging.
    fn description(&self) -> String;

    /// What trait objects of this resource are compared and hashed by, the description unless
    /// the backend knows better.
    fn identity(&self) -> Identity {
        Identity::Description(self.description())
    }

    /// Opens a fresh stream over the content.
    fn input_stream(&self) -> ResourceResult<InputStream>;

    /// Checks whether the resource physically exists.
    ///
    /// Resources resolvable to a file check the file, all others try to open a stream. Failures
    /// are logged and reported as `false`.
    fn exists(&self) -> bool {
        if self.is_file() {
            match self.file() {
                Ok(file) => return file.exists(),
                Err(error) => log::debug!(
                    "Could not retrieve file for existence check of {}: {}",
                    self.description(),
                    error
                ),
            }
        }

        match self.input_stream() {
            Ok(stream) => {
                drop(stream);
                true
            }
            Err(error) => {
                log::debug!(
                    "Could not retrieve input stream for existence check of {}: {}",
                    self.description(),
                    error
                );
                false
            }
        }
    }

    /// Checks whether the content can be read.
    fn is_readable(&self) -> bool {
        self.exists()
    }

    /// Checks whether the resource represents an already opened stream which can be read once only.
    fn is_open(&self) -> bool {
        false
    }

    /// Checks whether the resource is a file on the host file system.
    fn is_file(&self) -> bool {
        false
    }

    /// The URL identifying the resource.
    fn url(&self) -> ResourceResult<Url> {
        Err(ResourceError::NotFound(format!(
            "{} cannot be resolved to URL",
            self.description()
        )))
    }

    /// The URI identifying the resource, derived from its URL.
    fn uri(&self) -> ResourceResult<Url> {
        let url = self.url()?;
        let uri = url.as_str().replace(' ', "%20");
        Url::parse(&uri).map_err(|source| ResourceError::InvalidUri { uri, source })
    }

    /// The path of the resource on the host file system.
    fn file(&self) -> ResourceResult<PathBuf> {
        Err(ResourceError::NotFound(format!(
            "{} cannot be resolved to absolute file path",
            self.description()
        )))
    }

    /// Opens a channel over the content, by default wrapping [`Resource::input_stream`].
    fn readable_channel(&self) -> ResourceResult<Box<dyn ReadableChannel>> {
        Ok(Box::new(StreamChannel::reader(self.input_stream()?)))
    }

    /// The size of the content in bytes.
    ///
    /// By default the whole stream is consumed, so backends knowing the size should override it.
    fn content_length(&self) -> ResourceResult<u64> {
        let mut stream = self.input_stream()?;
        let mut buffer = [0u8; 256];
        let mut size = 0u64;
        loop {
            match stream.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => size += read as u64,
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => return Err(error.into()),
            }
        }
        Ok(size)
    }

    /// Time of the last modification in milliseconds since the Unix epoch.
    fn last_modified(&self) -> ResourceResult<u64> {
        let file = self.file_for_last_modified_check()?;
        let missing = || {
            ResourceError::NotFound(format!(
                "{} cannot be resolved in the file system for checking its last-modified timestamp",
                self.description()
            ))
        };

        let metadata = fs::metadata(&file).map_err(|error| match error.kind() {
            ErrorKind::NotFound => missing(),
            _ => error.into(),
        })?;
        let last_modified = metadata.modified().map(epoch_millis)?;
        if last_modified == 0 && !file.exists() {
            return Err(missing());
        }
        Ok(last_modified)
    }

    /// The file [`Resource::last_modified`] checks.
    fn file_for_last_modified_check(&self) -> ResourceResult<PathBuf> {
        self.file()
    }

    /// Resolves a path relative to this resource.
    fn create_relative(&self, _relative_path: &str) -> ResourceResult<Box<dyn Resource>> {
        Err(ResourceError::NotFound(format!(
            "Cannot create a relative resource for {}",
            self.description()
        )))
    }

    /// The last segment of the resource's path, if the backend has a notion of file names.
    fn filename(&self) -> Option<String> {
        None
    }
}

/// A resource whose content can be replaced.
pub trait WritableResource: Resource {
    /// Checks whether the content can be written.
    fn is_writable(&self) -> bool {
        true
    }

    /// Opens a fresh stream replacing the content.
    fn output_stream(&self) -> ResourceResult<OutputStream>;

    /// Opens a channel for writing, by default wrapping [`WritableResource::output_stream`].
    fn writable_channel(&self) -> ResourceResult<Box<dyn WritableChannel>> {
        Ok(Box::new(StreamChannel::writer(self.output_stream()?)))
    }
}

impl Display for dyn Resource + '_ {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.description())
    }
}

impl PartialEq for dyn Resource + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for dyn Resource + '_ {}

impl Hash for dyn Resource + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::{Error as IoError, ErrorKind, Read};
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::{Identity, InputStream, Resource};
    use crate::channel::Channel;
    use crate::errors::{ResourceError, ResourceResult};

    /// Resource exercising nothing but the defaults.
    #[derive(Debug)]
    struct Probe {
        name: &'static str,
        content: Option<&'static [u8]>,
        file: Option<PathBuf>,
    }

    impl Probe {
        fn new(name: &'static str, content: Option<&'static [u8]>) -> Self {
            Probe {
                name,
                content,
                file: None,
            }
        }
    }

    impl Resource for Probe {
        fn description(&self) -> String {
            format!("probe [{}]", self.name)
        }

        fn input_stream(&self) -> ResourceResult<InputStream> {
            match self.content {
                Some(content) => Ok(Box::new(content)),
                None => Err(IoError::new(ErrorKind::PermissionDenied, "refused").into()),
            }
        }

        fn is_file(&self) -> bool {
            self.file.is_some()
        }

        fn file(&self) -> ResourceResult<PathBuf> {
            self.file
                .clone()
                .ok_or_else(|| ResourceError::NotFound(String::from("no file")))
        }
    }

    #[test]
    fn test_exists_swallows_stream_failures() {
        let broken = Probe::new("broken", None);
        assert!(!broken.exists());
        assert!(!broken.is_readable());

        let working = Probe::new("working", Some(b"data"));
        assert!(working.exists());
        assert!(working.is_readable());
    }

    #[test]
    fn test_exists_prefers_file() {
        let directory = TempDir::new().expect("Creating temporary directory failed");
        let probe = Probe {
            name: "file",
            content: Some(b"data"),
            file: Some(directory.path().join("missing.txt")),
        };
        assert!(!probe.exists());

        std::fs::write(directory.path().join("missing.txt"), b"").expect("Writing failed");
        assert!(probe.exists());
    }

    #[test]
    fn test_content_length_drains_stream() {
        let content: &'static [u8] = &[7u8; 1000];
        assert_eq!(
            Probe::new("long", Some(content))
                .content_length()
                .expect("Content length failed"),
            1000
        );
        assert_eq!(
            Probe::new("broken", None)
                .content_length()
                .expect_err("Content length of broken stream")
                .kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_unresolvable_locations() {
        let probe = Probe::new("plain", Some(b""));
        assert!(probe.url().expect_err("URL of probe").is_not_found());
        assert!(probe.uri().expect_err("URI of probe").is_not_found());
        assert!(probe.file().expect_err("File of probe").is_not_found());
        assert!(probe
            .last_modified()
            .expect_err("Timestamp of probe")
            .is_not_found());
        assert!(probe
            .create_relative("other")
            .expect_err("Relative of probe")
            .is_not_found());
        assert_eq!(probe.filename(), None);
        assert!(!probe.is_open());
        assert_eq!(
            probe.url().expect_err("URL of probe").to_string(),
            "probe [plain] cannot be resolved to URL"
        );
    }

    #[test]
    fn test_last_modified_of_file() {
        let directory = TempDir::new().expect("Creating temporary directory failed");
        let file = directory.path().join("file.txt");
        let probe = Probe {
            name: "file",
            content: None,
            file: Some(file.clone()),
        };
        assert!(probe
            .last_modified()
            .expect_err("Timestamp of missing file")
            .is_not_found());

        std::fs::write(&file, b"data").expect("Writing failed");
        assert!(probe.last_modified().expect("Timestamp failed") > 0);
    }

    #[test]
    fn test_readable_channel_wraps_stream() {
        let mut channel = Probe::new("channel", Some(b"abc"))
            .readable_channel()
            .expect("Channel failed");
        let mut content = String::new();
        channel
            .read_to_string(&mut content)
            .expect("Reading failed");
        assert_eq!(content, "abc");
        assert!(channel.is_open());
        channel.close().expect("Close failed");
        assert!(!channel.is_open());
    }

    #[test]
    fn test_identity_by_description() {
        let first: Box<dyn Resource> = Box::new(Probe::new("same", Some(b"1")));
        let second: Box<dyn Resource> = Box::new(Probe::new("same", Some(b"2")));
        let third: Box<dyn Resource> = Box::new(Probe::new("other", Some(b"1")));
        assert!(*first == *second);
        assert!(*first != *third);
        assert_eq!(first.to_string(), "probe [same]");
        assert_eq!(
            first.identity(),
            Identity::Description(String::from("probe [same]"))
        );

        let unique: HashSet<&Box<dyn Resource>> =
            vec![&first, &second, &third].into_iter().collect();
        assert_eq!(unique.len(), 2);
    }
}
