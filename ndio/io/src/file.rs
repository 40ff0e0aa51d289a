/*!
    File handles over format sessions.
*/

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use ndio_types::{Array, Error, Mode, Result, Session, Shape};

use crate::registry::Registry;

/**
    An open file.

    Operations report failure as `false` or `None`; the cause is logged and
    kept in the file's error log, see [`File::errors`]. Operations on a
    closed file fail with [`Error::Closed`].

    Dropping a file without closing it releases the session, which
    finalizes files opened for writing on a best-effort basis.
*/
pub struct File {
    session: Option<Box<dyn Session>>,
    path: PathBuf,
    format: &'static str,
    mode: Mode,
    errors: Vec<Error>,
}

impl File {
    /**
        Open `path` with the named format, or the first registered format
        that claims the file when `format` is `None`.

        Only the first character of `mode` matters: `r` reads, `w` writes.
        Returns `None` on failure, after logging the cause.
    */
    pub fn open(
        registry: &Registry,
        path: impl AsRef<Path>,
        format: Option<&str>,
        mode: &str,
    ) -> Option<Self> {
        let path = path.as_ref();
        match Self::try_open(registry, path, format, mode) {
            Ok(file) => Some(file),
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to open file");
                None
            }
        }
    }

    /**
        Like [`File::open`], but returns the cause of a failure.
    */
    pub fn try_open(
        registry: &Registry,
        path: impl AsRef<Path>,
        format: Option<&str>,
        mode: &str,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mode = Mode::parse(mode)?;

        let format = match format {
            Some(name) => registry
                .get(name)
                .ok_or_else(|| Error::open_failed(path, format!("no format named {name}")))?,
            None => registry
                .find(path, mode)
                .ok_or_else(|| Error::open_failed(path, "no format claims the file"))?,
        };

        let session = format.open(path, mode)?;
        debug!(path = %path.display(), format = format.name(), %mode, "opened file");

        Ok(Self {
            session: Some(session),
            path: path.to_path_buf(),
            format: format.name(),
            mode,
            errors: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        Name of the format the file was opened with.
    */
    pub fn format(&self) -> &'static str {
        self.format
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /**
        Shape of the file's contents, with unit dimensions removed.
    */
    pub fn shape(&mut self) -> Option<Shape> {
        let result = self.session_mut().and_then(|s| s.shape());
        self.check("shape", result)
    }

    /**
        Read the whole file into `dest`.
    */
    pub fn read(&mut self, dest: &mut Array) -> bool {
        let result = self.session_mut().and_then(|s| s.read(dest));
        self.check("read", result).is_some()
    }

    /**
        Append `src` to the file.
    */
    pub fn write(&mut self, src: &Array) -> bool {
        let result = self.session_mut().and_then(|s| s.write(src));
        self.check("write", result).is_some()
    }

    pub fn can_seek(&self, dim: usize) -> bool {
        self.session.as_ref().is_some_and(|s| s.can_seek(dim))
    }

    /**
        Read the slice at `pos` into `dest`. Only seekable dimensions of
        `pos` are used.
    */
    pub fn seek_and_read(&mut self, dest: &mut Array, pos: &[i64]) -> bool {
        let result = self
            .session_mut()
            .and_then(|s| s.seek_and_read(dest, pos));
        self.check("seek_and_read", result).is_some()
    }

    /**
        Number of frames, or 0 if unknown or closed.
    */
    pub fn frame_count(&self) -> u64 {
        self.session.as_ref().map_or(0, |s| s.frame_count())
    }

    /**
        Close the file. Closing a closed file does nothing and succeeds.
    */
    pub fn close(&mut self) -> bool {
        let Some(session) = self.session.take() else {
            return true;
        };
        let result = session.close();
        if result.is_ok() {
            debug!(path = %self.path.display(), "closed file");
        }
        self.check("close", result).is_some()
    }

    /**
        Errors recorded since the file was opened, oldest first.
    */
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    fn session_mut(&mut self) -> Result<&mut Box<dyn Session>> {
        self.session.as_mut().ok_or(Error::Closed)
    }

    fn check<T>(&mut self, operation: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    format = self.format,
                    operation,
                    error = %e,
                    "operation failed"
                );
                self.errors.push(e);
                None
            }
        }
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("mode", &self.mode)
            .field("closed", &self.is_closed())
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use ndio_types::ElementType;

    use super::*;
    use crate::registry::tests::MockFormat;

    fn registry() -> (Registry, crate::registry::tests::Calls) {
        let format = MockFormat::new("mock");
        let calls = format.calls.clone();
        let mut registry = Registry::new();
        registry.register(format);
        (registry, calls)
    }

    #[test]
    fn open_by_extension_and_by_name() {
        let (registry, _) = registry();

        let file = File::open(&registry, "a.mock", None, "r").unwrap();
        assert_eq!(file.format(), "mock");
        assert_eq!(file.mode(), Mode::Read);

        let file = File::open(&registry, "a.other", Some("mock"), "wb").unwrap();
        assert_eq!(file.mode(), Mode::Write);
    }

    #[test]
    fn open_failures() {
        let (registry, _) = registry();
        assert!(File::open(&registry, "a.other", None, "r").is_none());
        assert!(File::open(&registry, "a.mock", Some("missing"), "r").is_none());
        assert!(matches!(
            File::try_open(&registry, "a.mock", None, "x"),
            Err(Error::UnsupportedMode(_))
        ));

        let mut failing = MockFormat::new("mock");
        failing.fail_open = true;
        let mut registry = Registry::new();
        registry.register(failing);
        assert!(matches!(
            File::try_open(&registry, "a.mock", None, "r"),
            Err(Error::OpenFailed { .. })
        ));
    }

    #[test]
    fn operations_forward_to_the_session() {
        let (registry, calls) = registry();
        let mut file = File::open(&registry, "a.mock", None, "r").unwrap();

        let shape = file.shape().unwrap();
        assert_eq!(shape.dims(), &[2, 2, 4]);
        let mut dest = Array::zeros(shape);
        assert!(file.read(&mut dest));
        assert!(dest.as_bytes().iter().all(|&b| b == 1));
        assert!(file.can_seek(2));
        assert!(!file.can_seek(0));
        assert_eq!(file.frame_count(), 4);
        assert!(file.seek_and_read(&mut dest, &[0, 0, 3]));
        assert!(file.close());

        assert_eq!(
            calls.lock().unwrap().as_slice(),
            ["open r", "shape", "read", "seek_and_read", "close"]
        );
        assert!(file.errors().is_empty());
    }

    #[test]
    fn failures_are_logged_per_file() {
        let (registry, _) = registry();
        let mut file = File::open(&registry, "a.mock", None, "w").unwrap();

        let mut dest = Array::zeros(Shape::new([2, 2, 1], ElementType::U8));
        assert!(!file.seek_and_read(&mut dest, &[0, 0, 4]));
        let rank5 = Array::zeros(Shape::new([1, 1, 1, 1, 1], ElementType::U8));
        assert!(!file.write(&rank5));

        assert_eq!(
            file.errors(),
            [
                Error::OutOfRange { index: 4, count: 4 },
                Error::UnsupportedRank(5)
            ]
        );
        file.clear_errors();
        assert!(file.errors().is_empty());
    }

    #[test]
    fn close_is_idempotent() {
        let (registry, calls) = registry();
        let mut file = File::open(&registry, "a.mock", None, "r").unwrap();

        assert!(file.close());
        assert!(file.close());
        assert!(file.is_closed());
        assert_eq!(
            calls.lock().unwrap().iter().filter(|c| *c == "close").count(),
            1
        );

        assert!(file.shape().is_none());
        assert!(!file.can_seek(2));
        assert_eq!(file.frame_count(), 0);
        assert_eq!(file.errors(), [Error::Closed]);
    }
}
