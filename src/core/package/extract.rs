// ─── Archive Extractor ───
// Writes a zip archive entry by entry into a destination tree. Progress is
// measured on the compressed bytes pulled from the archive file.

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::core::error::{LauncherError, LauncherResult};

use super::protected::ProtectedPaths;

const COPY_BUFFER_SIZE: usize = 8 * 1024;
/// Minimum fraction advance between two progress callbacks.
const PROGRESS_STEP: f64 = 0.01;

/// Counters describing what a single extraction run did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files_written: usize,
    pub directories_created: usize,
    pub protected_skipped: usize,
    pub unsafe_skipped: usize,
}

/// Turns a running byte count into sparse fraction updates.
#[derive(Debug)]
pub(crate) struct ProgressThrottle {
    total: u64,
    last_reported: f64,
    completed: bool,
}

impl ProgressThrottle {
    pub(crate) fn new(total: u64) -> Self {
        Self {
            total,
            last_reported: 0.0,
            completed: false,
        }
    }

    /// Returns the fraction to report, or `None` while the advance since the
    /// last report is below one percentage point.
    pub(crate) fn advance(&mut self, consumed: u64) -> Option<f64> {
        if self.completed {
            return None;
        }

        let fraction = if self.total == 0 {
            1.0
        } else {
            (consumed as f64 / self.total as f64).min(1.0)
        };

        if fraction >= 1.0 {
            self.completed = true;
            self.last_reported = 1.0;
            return Some(1.0);
        }

        if fraction - self.last_reported >= PROGRESS_STEP {
            self.last_reported = fraction;
            return Some(fraction);
        }

        None
    }

    /// Forces the terminal 100% event if the byte count never reached the
    /// size recorded up front.
    pub(crate) fn finish(&mut self) -> Option<f64> {
        if self.completed {
            return None;
        }
        self.completed = true;
        self.last_reported = 1.0;
        Some(1.0)
    }
}

/// Counts bytes pulled from the archive file. Seeks are not counted, so the
/// total tracks compressed data actually read.
struct CountingReader<R> {
    inner: R,
    consumed: Rc<Cell<u64>>,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> (Self, Rc<Cell<u64>>) {
        let consumed = Rc::new(Cell::new(0));
        (
            Self {
                inner,
                consumed: Rc::clone(&consumed),
            },
            consumed,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.set(self.consumed.get() + n as u64);
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Progress over the entry data: bytes read while opening the central
/// directory are excluded from both sides of the fraction.
struct ArchiveProgress<'a> {
    consumed: Rc<Cell<u64>>,
    baseline: u64,
    throttle: ProgressThrottle,
    on_progress: &'a mut dyn FnMut(f64),
}

impl ArchiveProgress<'_> {
    fn update(&mut self) {
        let read = self.consumed.get().saturating_sub(self.baseline);
        if let Some(fraction) = self.throttle.advance(read) {
            (self.on_progress)(fraction);
        }
    }

    fn finish(&mut self) {
        if let Some(fraction) = self.throttle.finish() {
            (self.on_progress)(fraction);
        }
    }
}

/// Extract `archive_path` into `destination`, leaving existing protected
/// files untouched. Entries are written in archive order.
///
/// The run is not atomic: on error, everything written so far stays on disk.
pub fn extract_archive(
    archive_path: &Path,
    destination: &Path,
    policy: &ProtectedPaths,
    on_progress: &mut dyn FnMut(f64),
) -> LauncherResult<ExtractStats> {
    let to_archive_error = |source: ZipError| LauncherError::Archive {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let file_len = file
        .metadata()
        .map_err(|e| LauncherError::io(archive_path, e))?
        .len();

    let (counting, consumed) = CountingReader::new(file);
    let mut archive = ZipArchive::new(BufReader::new(counting)).map_err(to_archive_error)?;

    std::fs::create_dir_all(destination).map_err(|source| LauncherError::Extraction {
        path: destination.to_path_buf(),
        source,
    })?;

    info!(
        "Extracting {:?} ({} bytes, {} entries) into {:?}",
        archive_path,
        file_len,
        archive.len(),
        destination
    );

    let baseline = consumed.get();
    let mut progress = ArchiveProgress {
        consumed,
        baseline,
        throttle: ProgressThrottle::new(file_len.saturating_sub(baseline)),
        on_progress,
    };
    let mut stats = ExtractStats::default();
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(to_archive_error)?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive entry outside destination: {}", entry.name());
            stats.unsafe_skipped += 1;
            continue;
        };
        let out_path = destination.join(&relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|source| LauncherError::Extraction {
                path: out_path.clone(),
                source,
            })?;
            stats.directories_created += 1;
            continue;
        }

        if policy.should_preserve(&out_path) {
            info!("Keeping protected file: {:?}", relative);
            stats.protected_skipped += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LauncherError::Extraction {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write_entry(&mut entry, &out_path, &mut buffer, &mut progress)?;
        stats.files_written += 1;
    }

    progress.finish();
    debug!("Extraction finished: {:?}", stats);
    Ok(stats)
}

fn write_entry(
    entry: &mut impl Read,
    out_path: &Path,
    buffer: &mut [u8],
    progress: &mut ArchiveProgress<'_>,
) -> LauncherResult<()> {
    let to_extraction = |source: io::Error| LauncherError::Extraction {
        path: out_path.to_path_buf(),
        source,
    };

    let mut out = File::create(out_path).map_err(to_extraction)?;
    loop {
        let n = entry.read(buffer).map_err(to_extraction)?;
        if n == 0 {
            break;
        }
        out.write_all(&buffer[..n]).map_err(to_extraction)?;
        progress.update();
    }
    out.flush().map_err(to_extraction)?;
    Ok(())
}
