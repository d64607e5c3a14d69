use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufReader, Seek},
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use log::{debug, error, warn};
use sluice_protocol::{
    ProtocolError, Record,
    codec::{read_message, write_message},
};

use crate::FailoverPolicy;

/// Persists failed records to an append-only spool file.
///
/// Each record is one checksummed frame. The file is opened lazily and
/// reopened after a write error; every open cuts a torn or corrupt tail back
/// to the last intact frame, so a crash mid-write loses at most the record
/// being written and later appends stay readable.
#[derive(Debug)]
pub struct SpoolFailoverPolicy {
    path: PathBuf,
    file: Mutex<Option<File>>,
    written: AtomicU64,
    lost: AtomicU64,
}

impl SpoolFailoverPolicy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            written: AtomicU64::new(0),
            lost: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Records that could not be written.
    pub fn lost(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }

    fn open(&self) -> io::Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let len = file.metadata()?.len();
        let intact = intact_len(&file)?;
        if intact < len {
            warn!(
                "[spool] truncating {} damaged bytes at the end of {}",
                len - intact,
                self.path.display()
            );
            file.set_len(intact)?;
        }
        Ok(file)
    }

    fn append(&self, record: &Record) -> Result<(), ProtocolError> {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);

        let mut file = match guard.take() {
            Some(f) => f,
            None => self.open()?,
        };

        // A handle that failed a write is dropped and reopened next time.
        write_message(&mut file, record)?;
        *guard = Some(file);
        Ok(())
    }
}

/// Byte length of the leading run of intact frames in `file`.
fn intact_len(file: &File) -> io::Result<u64> {
    let mut reader = BufReader::new(file);
    let mut intact = 0;

    loop {
        match read_message::<_, Record>(&mut reader) {
            Ok(Some(_)) => intact = reader.stream_position()?,
            Ok(None) => break,
            Err(ProtocolError::Io(e)) => return Err(e),
            Err(_) => break,
        }
    }
    Ok(intact)
}

impl FailoverPolicy for SpoolFailoverPolicy {
    fn deliver(&self, record: Record) {
        match self.append(&record) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.lost.fetch_add(1, Ordering::Relaxed);
                error!(
                    "[spool] failed to persist record to {}: {e}",
                    self.path.display()
                );
            }
        }
    }
}

/// Everything readable from a spool file.
#[derive(Debug, Default)]
pub struct SpoolContents {
    pub records: Vec<Record>,
    /// The file ended in a partial or corrupt frame that was skipped.
    pub corrupt_tail: bool,
}

pub struct SpoolReader {
    path: PathBuf,
}

impl SpoolReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every intact frame. A missing spool reads as empty.
    pub fn read_all(&self) -> io::Result<SpoolContents> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SpoolContents::default()),
            Err(e) => return Err(e),
        };

        let mut reader = BufReader::new(file);
        let mut contents = SpoolContents::default();

        loop {
            match read_message::<_, Record>(&mut reader) {
                Ok(Some(record)) => contents.records.push(record),
                Ok(None) => break,
                Err(ProtocolError::Io(e)) => return Err(e),
                Err(e) => {
                    warn!(
                        "[spool] stopping at damaged frame in {} after {} records: {e}",
                        self.path.display(),
                        contents.records.len()
                    );
                    contents.corrupt_tail = true;
                    break;
                }
            }
        }

        debug!(
            "[spool] read {} records from {}",
            contents.records.len(),
            self.path.display()
        );
        Ok(contents)
    }

    pub fn count(&self) -> io::Result<usize> {
        self.read_all().map(|c| c.records.len())
    }
}

/// Remove the spool file; a missing file is not an error.
pub fn clear_spool(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
