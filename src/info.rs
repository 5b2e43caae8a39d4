//! Cluster info persistence.
//!
//! The cluster info document is the durable JSON handle to a provisioned
//! cluster: provider identity plus whatever state the provider needs to
//! resume managing it. Once written by `create` it is the single source of
//! truth for every later command, so serialization is canonical — sorted
//! keys, two-space indent, `:` with no trailing space, no trailing newline —
//! making repeated writes byte-identical and the file diff-friendly for the
//! tooling that reviews it.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;
use thiserror::Error;

/// Durable handle to a provisioned (or in-progress) cluster.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClusterInfo {
    value: Value,
}

impl ClusterInfo {
    /// Wraps an arbitrary JSON document as cluster info.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self { value }
    }

    /// Provider identity recorded in the document, when present.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        self.value.get("provider").and_then(Value::as_str)
    }

    /// Borrows the underlying JSON document.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.value
    }

    /// Consumes the handle, returning the JSON document.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Renders the document in the canonical on-disk form.
    ///
    /// # Errors
    ///
    /// Returns [`InfoStoreError::Serialize`] when serialization fails.
    pub fn to_canonical_string(&self) -> Result<String, InfoStoreError> {
        to_canonical_json(&self.value)
    }
}

/// Errors raised by the cluster info store.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum InfoStoreError {
    /// Raised when no file exists at the info path.
    #[error("no cluster info found at {path}")]
    Missing {
        /// Path that was probed.
        path: Utf8PathBuf,
    },
    /// Raised when the file content is not valid JSON.
    #[error("Invalid JSON in {path}: {message}")]
    Parse {
        /// Path with the unparseable content.
        path: Utf8PathBuf,
        /// Diagnostic from the JSON parser.
        message: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when rendering the document fails.
    #[error("failed to serialize cluster info: {message}")]
    Serialize {
        /// Human-readable error message.
        message: String,
    },
}

/// Returns whether a file already exists at `path`.
///
/// Used by the dispatcher for the `create` precondition; the store itself is
/// a generic JSON reader/writer and performs no conflict checks.
///
/// # Errors
///
/// Returns [`InfoStoreError::Io`] when the containing directory cannot be
/// probed.
pub fn exists(path: &Utf8Path) -> Result<bool, InfoStoreError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let Some(file_name) = path.file_name() else {
        return Ok(false);
    };

    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| InfoStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(InfoStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Reads and parses the cluster info document at `path`.
///
/// # Errors
///
/// Returns [`InfoStoreError::Missing`] when the file does not exist,
/// [`InfoStoreError::Parse`] when it is not valid JSON, and
/// [`InfoStoreError::Io`] for other read failures.
pub fn read(path: &Utf8Path) -> Result<ClusterInfo, InfoStoreError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| InfoStoreError::Missing {
        path: path.to_path_buf(),
    })?;

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(InfoStoreError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(err) => {
            return Err(InfoStoreError::Io {
                path: parent.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    let contents = match dir.read_to_string(file_name) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(InfoStoreError::Missing {
                path: path.to_path_buf(),
            });
        }
        Err(err) => {
            return Err(InfoStoreError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    let value: Value = serde_json::from_str(&contents).map_err(|err| InfoStoreError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(ClusterInfo::from_value(value))
}

/// Writes the cluster info document to `path` in canonical form.
///
/// Overwrites whatever is at `path`; the `create` conflict check happens in
/// the dispatcher before this call.
///
/// # Errors
///
/// Returns [`InfoStoreError::Serialize`] when rendering fails and
/// [`InfoStoreError::Io`] when the file cannot be written.
pub fn write(path: &Utf8Path, info: &ClusterInfo) -> Result<(), InfoStoreError> {
    let rendered = info.to_canonical_string()?;

    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| InfoStoreError::Io {
        path: path.to_path_buf(),
        message: String::from("info path is missing a filename"),
    })?;

    Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|err| InfoStoreError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| InfoStoreError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;

    dir.write(file_name, rendered)
        .map_err(|err| InfoStoreError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

/// Renders a JSON value in the canonical on-disk form.
///
/// # Errors
///
/// Returns [`InfoStoreError::Serialize`] when serialization fails.
pub fn to_canonical_json(value: &Value) -> Result<String, InfoStoreError> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, CanonicalFormatter::default());
    value
        .serialize(&mut serializer)
        .map_err(|err| InfoStoreError::Serialize {
            message: err.to_string(),
        })?;
    String::from_utf8(buffer).map_err(|err| InfoStoreError::Serialize {
        message: err.to_string(),
    })
}

/// Pretty formatter matching the original tooling byte-for-byte: two-space
/// indent, `,` item separator, and `:` with no space after it.
#[derive(Clone, Debug, Default)]
struct CanonicalFormatter {
    current_indent: usize,
    has_value: bool,
}

impl CanonicalFormatter {
    fn write_indent<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        for _ in 0..self.current_indent {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl Formatter for CanonicalFormatter {
    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"[")
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            self.write_indent(writer)?;
        }
        writer.write_all(b"]")
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            writer.write_all(b"\n")?;
        } else {
            writer.write_all(b",\n")?;
        }
        self.write_indent(writer)
    }

    fn end_array_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.current_indent -= 1;
        if self.has_value {
            writer.write_all(b"\n")?;
            self.write_indent(writer)?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            writer.write_all(b"\n")?;
        } else {
            writer.write_all(b",\n")?;
        }
        self.write_indent(writer)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b":")
    }

    fn end_object_value<W>(&mut self, _writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.has_value = true;
        Ok(())
    }
}
