//! Transactional file session: lazy parsing with pass-through rewriting

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};

use crate::error::{ConfigError, ConfigResult};
use crate::lines::{clean, LineReader};
use crate::object::ObjectDefinition;
use crate::parser::{read_object, DirectiveSource};
use crate::registry::TypeRegistry;

/// Suffix of a transaction file holding proposed edits pending promotion
pub const TRANSACTION_SUFFIX: &str = ".naconew";

/// Suffix the original file is renamed under by the backup strategy
pub const BACKUP_SUFFIX: &str = ".nacoold";

/// How an edited file is promoted when the session finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Replace the original file in place
    Overwrite,
    /// Rename the original under [`BACKUP_SUFFIX`], then install the edit
    Backup,
    /// Install the edit next to the original under [`TRANSACTION_SUFFIX`],
    /// leaving the original untouched until a later commit
    Transaction,
}

/// An open configuration file emitting object definitions lazily.
///
/// In update mode every raw line read is buffered, and the caller submits
/// one decision per parsed record: [`keep`](ConfigFile::keep) copies the
/// buffered block verbatim, [`replace`](ConfigFile::replace) writes the
/// record's canonical form instead, [`delete`](ConfigFile::delete) writes
/// nothing. Text between blocks is always copied verbatim. The edited copy
/// accumulates in a temporary file beside the original and is promoted by
/// [`finish`](ConfigFile::finish); a session dropped before finishing
/// removes the temporary file.
pub struct ConfigFile {
    source: FileSource,
    registry: TypeRegistry,
    path: PathBuf,
}

struct FileSource {
    lines: LineReader<BufReader<File>>,
    read_path: PathBuf,
    copy: Option<CopyState>,
}

struct CopyState {
    sink: NamedTempFile,
    buffer: Vec<String>,
    strategy: WriteStrategy,
    updated: bool,
}

impl CopyState {
    /// Flush everything buffered except the most recently read line. Called
    /// at the block-start boundary so commentary ahead of a block survives
    /// even when the block itself is replaced or deleted.
    fn flush_prefix(&mut self) -> ConfigResult<()> {
        if self.buffer.len() > 1 {
            let keep = self.buffer.pop();
            self.write_buffer()?;
            self.buffer.extend(keep);
        }
        Ok(())
    }

    fn flush_all(&mut self) -> ConfigResult<()> {
        self.write_buffer()
    }

    fn write_buffer(&mut self) -> ConfigResult<()> {
        for line in self.buffer.drain(..) {
            self.sink.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}

impl DirectiveSource for FileSource {
    fn next_data_line(&mut self) -> ConfigResult<Option<(usize, String)>> {
        while let Some((linenum, raw)) = self.lines.next_raw()? {
            if let Some(copy) = self.copy.as_mut() {
                copy.buffer.push(raw.clone());
            }
            let data = clean(&raw);
            if !data.is_empty() {
                return Ok(Some((linenum, data.to_string())));
            }
        }
        Ok(None)
    }

    fn mark_block_start(&mut self) -> ConfigResult<()> {
        if let Some(copy) = self.copy.as_mut() {
            copy.flush_prefix()?;
        }
        Ok(())
    }

    fn source_path(&self) -> Option<&Path> {
        Some(&self.read_path)
    }
}

impl ConfigFile {
    /// Open `path` for querying only; no copy is made and the decision
    /// methods are no-ops.
    ///
    /// # Errors
    /// Propagates open failures.
    pub fn open(path: impl AsRef<Path>, registry: TypeRegistry) -> ConfigResult<Self> {
        Self::build(path.as_ref(), registry, None)
    }

    /// Open `path` for editing under `strategy`.
    ///
    /// With the transaction strategy, a pending `.naconew` file for `path`
    /// is read instead of the pristine original, so edits compose across
    /// repeated invocations.
    ///
    /// # Errors
    /// Propagates open failures and side-file creation failures.
    pub fn open_update(
        path: impl AsRef<Path>,
        registry: TypeRegistry,
        strategy: WriteStrategy,
    ) -> ConfigResult<Self> {
        Self::build(path.as_ref(), registry, Some(strategy))
    }

    fn build(
        path: &Path,
        registry: TypeRegistry,
        strategy: Option<WriteStrategy>,
    ) -> ConfigResult<Self> {
        let mut read_path = path.to_path_buf();
        if strategy == Some(WriteStrategy::Transaction) {
            let transaction = with_suffix(path, TRANSACTION_SUFFIX);
            if transaction.is_file() {
                read_path = transaction;
            }
        }
        let reader = BufReader::new(File::open(&read_path)?);
        let copy = strategy
            .map(|strategy| {
                let sink = Builder::new()
                    .prefix(".naco-")
                    .tempfile_in(parent_dir(path))?;
                Ok::<_, ConfigError>(CopyState {
                    sink,
                    buffer: Vec::new(),
                    strategy,
                    updated: false,
                })
            })
            .transpose()?;
        Ok(ConfigFile {
            source: FileSource {
                lines: LineReader::new(reader),
                read_path,
                copy,
            },
            registry,
            path: path.to_path_buf(),
        })
    }

    /// The file this session edits (not the transaction file it may be
    /// reading from)
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any replace or delete decision has been made
    #[must_use]
    pub fn updated(&self) -> bool {
        self.source.copy.as_ref().is_some_and(|copy| copy.updated)
    }

    /// Parse the next object definition, or `None` at end of file
    ///
    /// # Errors
    /// Propagates parse and read failures.
    pub fn read_object(&mut self) -> ConfigResult<Option<ObjectDefinition>> {
        read_object(&mut self.source, &self.registry)
    }

    /// Decision: the last parsed block is unchanged; copy it verbatim
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn keep(&mut self) -> ConfigResult<()> {
        if let Some(copy) = self.source.copy.as_mut() {
            copy.flush_all()?;
        }
        Ok(())
    }

    /// Decision: replace the last parsed block with the canonical
    /// rendering of `objdef`
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn replace(&mut self, objdef: &ObjectDefinition) -> ConfigResult<()> {
        if let Some(copy) = self.source.copy.as_mut() {
            copy.buffer.clear();
            copy.sink.write_all(objdef.render().as_bytes())?;
            copy.updated = true;
        }
        Ok(())
    }

    /// Decision: drop the last parsed block from the output
    ///
    /// # Errors
    /// Never fails today; kept fallible for symmetry with the other
    /// decisions.
    pub fn delete(&mut self) -> ConfigResult<()> {
        if let Some(copy) = self.source.copy.as_mut() {
            copy.buffer.clear();
            copy.updated = true;
        }
        Ok(())
    }

    /// Finalize the session. Flushes any trailing buffered text and, when
    /// at least one edit was made, promotes the side file per the session
    /// strategy. Returns the path written, or `None` when the filesystem
    /// was left untouched.
    ///
    /// # Errors
    /// Propagates write, rename, and persist failures.
    pub fn finish(mut self) -> ConfigResult<Option<PathBuf>> {
        let Some(mut copy) = self.source.copy.take() else {
            return Ok(None);
        };
        copy.flush_all()?;
        if !copy.updated {
            return Ok(None);
        }
        copy.sink.flush()?;
        match copy.strategy {
            WriteStrategy::Overwrite => {
                persist(copy.sink, &self.path)?;
                Ok(Some(self.path.clone()))
            }
            WriteStrategy::Backup => {
                fs::rename(&self.path, with_suffix(&self.path, BACKUP_SUFFIX))?;
                persist(copy.sink, &self.path)?;
                Ok(Some(self.path.clone()))
            }
            WriteStrategy::Transaction => {
                let target = with_suffix(&self.path, TRANSACTION_SUFFIX);
                persist(copy.sink, &target)?;
                Ok(Some(target))
            }
        }
    }
}

fn persist(sink: NamedTempFile, target: &Path) -> ConfigResult<()> {
    sink.persist(target).map_err(|e| ConfigError::Io(e.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Append `suffix` to the file name of `path`
#[must_use]
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
