use std::io::{Cursor, Error as IoError, ErrorKind, Result as IoResult, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rusqlite::{params, Connection as Database, Error as DatabaseError, OptionalExtension};
use url::Url;

use super::{FileSystem, Metadata, OpenMode, SeekRead, SeekWrite};
use crate::errors::{FileSystemError, ResourceError, ResourceResult};
use crate::util::{Availability, MetaData, VirtualPath};

mod constants {
    use const_format::formatcp;

    pub const CURRENT_VERSION: u32 = 0;
    pub const META_TABLE: &str = "Resource_Meta_0";
    pub const DATA_TABLE: &str = "Resource_Data";

    pub const DEFAULT_CHUNK_SIZE: usize = 33554432; // 32MB

    pub const URL_SCHEME: &str = "sqlite";

    pub const SQL_CREATE_META: &str = formatcp!(
        "CREATE TABLE {} (id INTEGER PRIMARY KEY, path TEXT UNIQUE NOT NULL, modified INTEGER NOT NULL)",
        META_TABLE
    );
    pub const SQL_CREATE_DATA: &str = formatcp!(
        "CREATE TABLE IF NOT EXISTS {} (chunk_id INTEGER PRIMARY KEY, file_id INTEGER NOT NULL, chunk_num INTEGER NOT NULL, data BLOB NOT NULL, CONSTRAINT unq UNIQUE (file_id, chunk_num), FOREIGN KEY(file_id) REFERENCES {} (id) ON DELETE CASCADE ON UPDATE CASCADE)",
        DATA_TABLE,
        META_TABLE
    );
    pub const SQL_GET_FILE: &str =
        formatcp!("SELECT id, modified FROM {} WHERE path = ?", META_TABLE);
    pub const SQL_HAS_CHILDREN: &str = formatcp!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE substr(path, 1, ?) = ?)",
        META_TABLE
    );
    pub const SQL_CREATE_FILE: &str =
        formatcp!("INSERT INTO {} (path, modified) VALUES (?, ?)", META_TABLE);
    pub const SQL_TOUCH_FILE: &str =
        formatcp!("UPDATE {} SET modified = ? WHERE id = ?", META_TABLE);
    pub const SQL_SIZE: &str = formatcp!(
        "SELECT COALESCE(SUM(LENGTH(data)), 0) FROM {} WHERE file_id = ?",
        DATA_TABLE
    );
    pub const SQL_GET_CHUNKS: &str = formatcp!(
        "SELECT data FROM {} WHERE file_id = ? ORDER BY chunk_num ASC",
        DATA_TABLE
    );
    pub const SQL_DELETE_CHUNKS: &str = formatcp!("DELETE FROM {} WHERE file_id = ?", DATA_TABLE);
    pub const SQL_CREATE_CHUNK: &str = formatcp!(
        "INSERT INTO {} (file_id, chunk_num, data) VALUES (?, ?, ?)",
        DATA_TABLE
    );
}

/// A file system whose files are stored as chunked blobs in a SQLite database.
///
/// Directories are implicit: a path is a directory as long as any file is stored below it.
/// Cloning is cheap; all clones share the same connection.
#[derive(Debug, Clone)]
pub struct SqliteFileSystem {
    database: Arc<Mutex<Database>>,
    meta_data: MetaData,
    read_only: bool,
    chunk_size: usize,
}

/// A stored file: its row id and modification time in milliseconds since the epoch.
#[derive(Debug, Clone, Copy)]
struct StoredFile {
    id: i64,
    modified: i64,
}

fn database_error(error: DatabaseError) -> IoError {
    IoError::new(ErrorKind::Other, error)
}

fn not_found(path: &VirtualPath) -> IoError {
    IoError::new(ErrorKind::NotFound, format!("/{}", path))
}

fn is_directory(path: &VirtualPath) -> IoError {
    IoError::new(ErrorKind::Other, format!("/{} is a directory", path))
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

impl SqliteFileSystem {
    /// Load the file system from an SQLite database, creating it if requested.
    pub fn load(mut database: Database, create: bool) -> Result<Self, FileSystemError> {
        let meta_data = match MetaData::from_database(&database) {
            Availability::Available(meta_data)
                if meta_data.version() == constants::CURRENT_VERSION =>
            {
                Ok(meta_data)
            }
            Availability::Available(meta_data) => {
                Err(FileSystemError::UnsupportedVersion(meta_data.version()))
            }
            Availability::Missing if create => {
                let transaction = database.transaction()?;
                transaction.execute(constants::SQL_CREATE_META, params![])?;
                transaction.execute(constants::SQL_CREATE_DATA, params![])?;
                transaction.commit()?;
                log::trace!(
                    "Created file system version {}",
                    constants::CURRENT_VERSION
                );
                Ok(MetaData::from_version(constants::CURRENT_VERSION))
            }
            Availability::Missing => Err(FileSystemError::NoFileSystem),
            Availability::Error(error) => Err(error.into()),
        }?;

        // Pre-compile the primary SQL commands
        const PRECOMPILED_COMMANDS: [&str; 8] = [
            constants::SQL_GET_FILE,
            constants::SQL_HAS_CHILDREN,
            constants::SQL_CREATE_FILE,
            constants::SQL_TOUCH_FILE,
            constants::SQL_SIZE,
            constants::SQL_GET_CHUNKS,
            constants::SQL_DELETE_CHUNKS,
            constants::SQL_CREATE_CHUNK,
        ];

        database.set_prepared_statement_cache_capacity(PRECOMPILED_COMMANDS.len());
        for statement in PRECOMPILED_COMMANDS {
            database
                .prepare_cached(statement)
                .map_err(|error| FileSystemError::InvalidBaseCommand(statement, error))?;
        }

        Ok(SqliteFileSystem {
            database: Arc::new(Mutex::new(database)),
            meta_data,
            read_only: false,
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
        })
    }

    /// Refuse any write access through this handle.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Size of the blobs content is split into. Zero selects the default of 32MB.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = match chunk_size {
            0 => constants::DEFAULT_CHUNK_SIZE,
            value => value,
        };
        self
    }

    /// The schema version of the stored file system.
    pub fn version(&self) -> u32 {
        self.meta_data.version()
    }

    fn lookup(
        database: &Database,
        path: &VirtualPath,
    ) -> Result<Option<StoredFile>, DatabaseError> {
        database
            .prepare_cached(constants::SQL_GET_FILE)?
            .query_row(params![path.as_str()], |row| {
                Ok(StoredFile {
                    id: row.get(0)?,
                    modified: row.get(1)?,
                })
            })
            .optional()
    }

    fn has_children(database: &Database, path: &VirtualPath) -> Result<bool, DatabaseError> {
        let prefix = path.child_prefix();
        database
            .prepare_cached(constants::SQL_HAS_CHILDREN)?
            .query_row(
                params![prefix.chars().count() as i64, prefix],
                |row| row.get(0),
            )
    }

    fn read_content(&self, path: &VirtualPath) -> IoResult<Vec<u8>> {
        let database = self.database.lock();
        let file = match Self::lookup(&database, path).map_err(database_error)? {
            Some(file) => file,
            None if path.is_root() => return Err(is_directory(path)),
            None => match Self::has_children(&database, path).map_err(database_error)? {
                true => return Err(is_directory(path)),
                false => return Err(not_found(path)),
            },
        };

        let mut statement = database
            .prepare_cached(constants::SQL_GET_CHUNKS)
            .map_err(database_error)?;
        let chunks = statement
            .query_map(params![file.id], |row| row.get::<_, Vec<u8>>(0))
            .map_err(database_error)?;

        let mut content = Vec::new();
        for chunk in chunks {
            content.extend_from_slice(&chunk.map_err(database_error)?);
        }
        Ok(content)
    }

    /// The closest ancestor of `path` stored as a file, if any.
    fn stored_ancestor(&self, path: &VirtualPath) -> Result<Option<VirtualPath>, DatabaseError> {
        let database = self.database.lock();
        let mut current = path.parent();
        while let Some(ancestor) = current.filter(|ancestor| !ancestor.is_root()) {
            if Self::lookup(&database, &ancestor)?.is_some() {
                return Ok(Some(ancestor));
            }
            current = ancestor.parent();
        }
        Ok(None)
    }

    /// Replace the content of the file at `path`, creating it if missing.
    fn store(&self, path: &VirtualPath, content: &[u8]) -> Result<(), DatabaseError> {
        let mut database = self.database.lock();
        let transaction = database.transaction()?;
        {
            let modified = now();
            let id = match Self::lookup(&transaction, path)? {
                Some(file) => {
                    transaction
                        .prepare_cached(constants::SQL_TOUCH_FILE)?
                        .execute(params![modified, file.id])?;
                    file.id
                }
                None => {
                    transaction
                        .prepare_cached(constants::SQL_CREATE_FILE)?
                        .insert(params![path.as_str(), modified])?
                }
            };

            transaction
                .prepare_cached(constants::SQL_DELETE_CHUNKS)?
                .execute(params![id])?;
            let mut create_chunk = transaction.prepare_cached(constants::SQL_CREATE_CHUNK)?;
            for (chunk_num, chunk) in content.chunks(self.chunk_size).enumerate() {
                create_chunk.execute(params![id, chunk_num as i64, chunk])?;
            }
        }
        transaction.commit()?;

        log::trace!("Stored {} bytes at /{}", content.len(), path);
        Ok(())
    }
}

impl FileSystem for SqliteFileSystem {
    fn normalize(&self, path: &str) -> PathBuf {
        self.absolute(Path::new(path))
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        PathBuf::from(format!("/{}", VirtualPath::from(path)))
    }

    fn to_url(&self, path: &Path) -> ResourceResult<Url> {
        let uri = format!(
            "{}:{}",
            constants::URL_SCHEME,
            self.absolute(path).to_string_lossy()
        );
        Url::parse(&uri).map_err(|source| ResourceError::InvalidUri { uri, source })
    }

    fn metadata(&self, path: &Path) -> IoResult<Metadata> {
        let path = VirtualPath::from(path);
        let database = self.database.lock();

        if let Some(file) = Self::lookup(&database, &path).map_err(database_error)? {
            let len: i64 = database
                .prepare_cached(constants::SQL_SIZE)
                .and_then(|mut statement| statement.query_row(params![file.id], |row| row.get(0)))
                .map_err(database_error)?;
            return Ok(Metadata {
                len: len as u64,
                modified: Some(UNIX_EPOCH + Duration::from_millis(file.modified.max(0) as u64)),
                is_dir: false,
            });
        }

        match path.is_root() || Self::has_children(&database, &path).map_err(database_error)? {
            true => Ok(Metadata {
                len: 0,
                modified: None,
                is_dir: true,
            }),
            false => Err(not_found(&path)),
        }
    }

    fn is_readable(&self, path: &Path) -> bool {
        self.exists(path)
    }

    fn is_writable(&self, path: &Path) -> bool {
        !self.read_only
            && self
                .metadata(path)
                .map(|metadata| !metadata.is_dir)
                .unwrap_or(false)
    }

    fn open_read(&self, path: &Path) -> IoResult<Box<dyn SeekRead>> {
        let content = self.read_content(&VirtualPath::from(path))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn open_write(&self, path: &Path, mode: OpenMode) -> IoResult<Box<dyn SeekWrite>> {
        let virtual_path = VirtualPath::from(path);
        if self.read_only {
            return Err(IoError::new(
                ErrorKind::PermissionDenied,
                format!("/{} is stored in a read-only file system", virtual_path),
            ));
        }

        let content = match mode {
            OpenMode::Existing => self.read_content(&virtual_path)?,
            OpenMode::Truncate => {
                let is_dir = self
                    .metadata(path)
                    .map(|metadata| metadata.is_dir)
                    .unwrap_or(false);
                if is_dir {
                    return Err(is_directory(&virtual_path));
                }
                if let Some(ancestor) = self
                    .stored_ancestor(&virtual_path)
                    .map_err(database_error)?
                {
                    return Err(IoError::new(
                        ErrorKind::Other,
                        format!("/{} is a file and cannot contain /{}", ancestor, virtual_path),
                    ));
                }
                self.store(&virtual_path, &[]).map_err(database_error)?;
                Vec::new()
            }
        };

        Ok(Box::new(SqliteWriter {
            file_system: self.clone(),
            path: virtual_path,
            content: Cursor::new(content),
            dirty: false,
        }))
    }
}

/// Buffers writes to a stored file until it is flushed or dropped.
struct SqliteWriter {
    file_system: SqliteFileSystem,
    path: VirtualPath,
    content: Cursor<Vec<u8>>,
    dirty: bool,
}

impl Write for SqliteWriter {
    fn write(&mut self, buf: &[u8]) -> IoResult<usize> {
        self.dirty = true;
        self.content.write(buf)
    }

    fn flush(&mut self) -> IoResult<()> {
        if self.dirty {
            self.file_system
                .store(&self.path, self.content.get_ref())
                .map_err(database_error)?;
            self.dirty = false;
        }
        Ok(())
    }
}

impl Seek for SqliteWriter {
    fn seek(&mut self, pos: SeekFrom) -> IoResult<u64> {
        self.content.seek(pos)
    }
}

impl Drop for SqliteWriter {
    fn drop(&mut self) {
        if let Err(error) = self.flush() {
            log::warn!("Could not persist /{} on close: {}", self.path, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
    use std::path::Path;

    use test_case::test_case;

    use super::{params, Database, FileSystem, FileSystemError, OpenMode, SqliteFileSystem};

    fn file_system() -> SqliteFileSystem {
        let database = Database::open_in_memory().expect("Open in-memory database failed");
        SqliteFileSystem::load(database, true).expect("Creating file system failed")
    }

    fn write(file_system: &SqliteFileSystem, path: &str, data: &[u8]) {
        let mut writer = file_system
            .open_write(Path::new(path), OpenMode::Truncate)
            .expect("Opening for write failed");
        writer.write_all(data).expect("Writing failed");
        writer.flush().expect("Flushing failed");
    }

    fn read(file_system: &SqliteFileSystem, path: &str) -> Vec<u8> {
        let mut content = Vec::new();
        file_system
            .open_read(Path::new(path))
            .expect("Opening for read failed")
            .read_to_end(&mut content)
            .expect("Reading failed");
        content
    }

    #[test]
    fn test_loading() {
        let database = Database::open_in_memory().expect("Open in-memory database failed");
        assert!(matches!(
            SqliteFileSystem::load(database, false),
            Err(FileSystemError::NoFileSystem)
        ));

        let file_system = file_system();
        assert_eq!(file_system.version(), 0);
    }

    #[test]
    fn test_unsupported_version() {
        let database = Database::open_in_memory().expect("Open in-memory database failed");
        database
            .execute("CREATE TABLE Resource_Meta_7 (example TEXT)", params![])
            .expect("Create table failed");
        assert!(matches!(
            SqliteFileSystem::load(database, true),
            Err(FileSystemError::UnsupportedVersion(7))
        ));
    }

    #[test_case(0, 0; "empty file, default chunks")]
    #[test_case(3, 0; "small file, default chunks")]
    #[test_case(3, 1; "chunk per byte")]
    #[test_case(7, 3; "partial last chunk")]
    #[test_case(6, 3; "exact chunks")]
    #[test_case(3, 4; "chunk larger than file")]
    fn test_file_handling(file_size: u8, chunk_size: usize) {
        let data: Vec<_> = (0..file_size).collect();
        let file_system = file_system().with_chunk_size(chunk_size);

        write(&file_system, "dir/file", &data);
        assert_eq!(read(&file_system, "/dir/file"), data);

        let metadata = file_system
            .metadata(Path::new("dir/./file"))
            .expect("Metadata failed");
        assert_eq!(metadata.len, data.len() as u64);
        assert!(!metadata.is_dir);
        assert!(metadata.modified.is_some());
    }

    #[test]
    fn test_directories_are_implicit() {
        let file_system = file_system();
        write(&file_system, "a/b/c.txt", b"c");

        for directory in &["/", "a", "/a/b"] {
            let metadata = file_system
                .metadata(Path::new(directory))
                .expect("Metadata failed");
            assert!(metadata.is_dir, "{} is no directory", directory);
        }
        assert!(!file_system.exists(Path::new("a/b/c")));
        assert!(!file_system.exists(Path::new("a/bc.txt")));
        assert!(!file_system.is_writable(Path::new("a/b")));
        assert!(file_system.open_read(Path::new("a")).is_err());
    }

    #[test]
    fn test_files_cannot_contain_files() {
        let file_system = file_system();
        write(&file_system, "a", b"a");

        for path in &["a/b", "a/b/c.txt"] {
            assert_eq!(
                file_system
                    .open_write(Path::new(path), OpenMode::Truncate)
                    .err()
                    .map(|error| error.kind()),
                Some(ErrorKind::Other),
                "{} was writable",
                path
            );
        }
        assert!(!file_system
            .metadata(Path::new("a"))
            .expect("Metadata failed")
            .is_dir);
        assert!(!file_system.exists(Path::new("a/b")));

        write(&file_system, "ab/c", b"c");
        assert_eq!(read(&file_system, "ab/c"), b"c");
    }

    #[test]
    fn test_database_failures_are_not_missing_files() {
        let file_system = file_system();
        write(&file_system, "a/b", b"b");
        assert_eq!(
            file_system
                .open_read(Path::new("a"))
                .err()
                .map(|error| error.kind()),
            Some(ErrorKind::Other)
        );

        file_system
            .database
            .lock()
            .execute("DROP TABLE Resource_Data", params![])
            .expect("Drop table failed");
        file_system
            .database
            .lock()
            .execute("DROP TABLE Resource_Meta_0", params![])
            .expect("Drop table failed");
        for path in &["a", "missing"] {
            let error = file_system
                .open_read(Path::new(path))
                .err()
                .expect("Reading without tables succeeded");
            assert_ne!(error.kind(), ErrorKind::NotFound);
        }
    }

    #[test]
    fn test_missing_files() {
        let file_system = file_system();
        assert_eq!(
            file_system
                .metadata(Path::new("missing"))
                .expect_err("Metadata of missing file")
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            file_system
                .open_read(Path::new("missing"))
                .err()
                .map(|error| error.kind()),
            Some(ErrorKind::NotFound)
        );
        assert_eq!(
            file_system
                .open_write(Path::new("missing"), OpenMode::Existing)
                .err()
                .map(|error| error.kind()),
            Some(ErrorKind::NotFound)
        );
        assert!(!file_system.is_writable(Path::new("missing")));
    }

    #[test]
    fn test_write_existing_keeps_tail() {
        let file_system = file_system();
        write(&file_system, "file", b"abcdef");

        {
            let mut writer = file_system
                .open_write(Path::new("file"), OpenMode::Existing)
                .expect("Opening for write failed");
            writer.seek(SeekFrom::Start(2)).expect("Seek failed");
            writer.write_all(b"XY").expect("Writing failed");
            // Dropping persists the content.
        }
        assert_eq!(read(&file_system, "file"), b"abXYef");
    }

    #[test]
    fn test_truncate_creates_file_immediately() {
        let file_system = file_system();
        write(&file_system, "file", b"abcdef");

        let _writer = file_system
            .open_write(Path::new("file"), OpenMode::Truncate)
            .expect("Opening for write failed");
        assert!(file_system.exists(Path::new("file")));
        assert_eq!(read(&file_system, "file"), b"");
    }

    #[test]
    fn test_read_only() {
        let file_system = file_system();
        write(&file_system, "file", b"data");

        let read_only = file_system.clone().read_only(true);
        assert!(!read_only.is_writable(Path::new("file")));
        assert_eq!(
            read_only
                .open_write(Path::new("file"), OpenMode::Truncate)
                .err()
                .map(|error| error.kind()),
            Some(ErrorKind::PermissionDenied)
        );
        assert_eq!(read(&read_only, "file"), b"data");
        assert!(file_system.is_writable(Path::new("file")));
    }

    #[test]
    fn test_urls() {
        let file_system = file_system();
        let url = file_system
            .to_url(Path::new("a/../b/my file.txt"))
            .expect("URL failed");
        assert_eq!(url.as_str(), "sqlite:/b/my%20file.txt");
    }
}
