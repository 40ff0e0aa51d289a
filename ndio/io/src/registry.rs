/*!
    Name-keyed registry of file formats.
*/

use std::fmt;
use std::path::Path;

use tracing::{debug, trace};

use ndio_ffmpeg::FfmpegFormat;
use ndio_types::{Format, Mode};

/**
    Registered file formats, in registration order.

    Lookup by path tries formats in the order they were registered and
    returns the first one that claims the file.
*/
#[derive(Default)]
pub struct Registry {
    formats: Vec<Box<dyn Format>>,
}

impl Registry {
    /**
        Create an empty registry.
    */
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Create a registry with every built-in format.
    */
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FfmpegFormat::default());
        registry
    }

    /**
        Register a format, replacing any format registered under the same name.

        A replaced format keeps its position in the lookup order.
    */
    pub fn register(&mut self, format: impl Format + 'static) {
        let name = format.name();
        match self.formats.iter_mut().find(|f| f.name() == name) {
            Some(existing) => {
                *existing = Box::new(format);
                debug!(name, "replaced format");
            }
            None => {
                self.formats.push(Box::new(format));
                debug!(name, "registered format");
            }
        }
    }

    /**
        Look up a format by name.
    */
    pub fn get(&self, name: &str) -> Option<&dyn Format> {
        self.formats
            .iter()
            .find(|f| f.name() == name)
            .map(|f| f.as_ref())
    }

    /**
        Find the first format that can handle `path` in the given mode.
    */
    pub fn find(&self, path: &Path, mode: Mode) -> Option<&dyn Format> {
        let found = self
            .formats
            .iter()
            .find(|f| f.is_applicable(path, mode))
            .map(|f| f.as_ref());
        trace!(
            path = %path.display(),
            ?mode,
            format = found.map(|f| f.name()),
            "format lookup"
        );
        found
    }

    /**
        Names of the registered formats, in lookup order.
    */
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.iter().map(|f| f.name())
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use ndio_types::{Array, Error, Result, Session, Shape};

    use super::*;

    /// Operations seen by a [`MockSession`].
    pub(crate) type Calls = Arc<Mutex<Vec<String>>>;

    /**
        A format that claims files with its own name as extension and
        records the calls made on its sessions.
    */
    pub(crate) struct MockFormat {
        pub name: &'static str,
        pub calls: Calls,
        pub fail_open: bool,
    }

    impl MockFormat {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Calls::default(),
                fail_open: false,
            }
        }
    }

    impl Format for MockFormat {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_applicable(&self, path: &Path, _mode: Mode) -> bool {
            path.extension().is_some_and(|e| e == self.name)
        }

        fn open(&self, path: &Path, mode: Mode) -> Result<Box<dyn Session>> {
            if self.fail_open {
                return Err(Error::open_failed(path, "mock failure"));
            }
            self.calls.lock().unwrap().push(format!("open {mode}"));
            Ok(Box::new(MockSession {
                calls: self.calls.clone(),
                frames: 4,
            }))
        }
    }

    pub(crate) struct MockSession {
        calls: Calls,
        frames: u64,
    }

    impl MockSession {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    impl Session for MockSession {
        fn shape(&mut self) -> Result<Shape> {
            self.record("shape");
            Ok(Shape::new([2, 2, self.frames as usize], ndio_types::ElementType::U8))
        }

        fn read(&mut self, dest: &mut Array) -> Result<()> {
            self.record("read");
            dest.as_bytes_mut().fill(1);
            Ok(())
        }

        fn write(&mut self, src: &Array) -> Result<()> {
            self.record("write");
            if src.ndim() > 4 {
                return Err(Error::UnsupportedRank(src.ndim()));
            }
            Ok(())
        }

        fn can_seek(&self, dim: usize) -> bool {
            dim == 2
        }

        fn seek_and_read(&mut self, _dest: &mut Array, pos: &[i64]) -> Result<()> {
            self.record("seek_and_read");
            let index = pos.get(2).copied().unwrap_or(0);
            if index < 0 || index as u64 >= self.frames {
                return Err(Error::OutOfRange {
                    index,
                    count: self.frames,
                });
            }
            Ok(())
        }

        fn frame_count(&self) -> u64 {
            self.frames
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.record("close");
            Ok(())
        }
    }

    #[test]
    fn defaults_include_ffmpeg() {
        let registry = Registry::with_defaults();
        assert_eq!(registry.names().collect::<Vec<_>>(), ["ffmpeg"]);
        assert!(registry.get("ffmpeg").is_some());
        assert!(registry.get("tiff").is_none());
    }

    #[test]
    fn find_uses_registration_order() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register(MockFormat::new("aaa"));
        registry.register(MockFormat::new("bbb"));
        assert_eq!(registry.len(), 2);

        let found = registry.find(Path::new("x.bbb"), Mode::Read).unwrap();
        assert_eq!(found.name(), "bbb");
        assert!(registry.find(Path::new("x.ccc"), Mode::Read).is_none());
    }

    #[test]
    fn register_replaces_by_name() {
        let mut registry = Registry::new();
        registry.register(MockFormat::new("aaa"));
        registry.register(MockFormat::new("bbb"));

        let replacement = MockFormat::new("aaa");
        let calls = replacement.calls.clone();
        registry.register(replacement);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["aaa", "bbb"]);

        let format = registry.get("aaa").unwrap();
        format.open(Path::new("x.aaa"), Mode::Read).unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), ["open r"]);
    }

    #[test]
    fn debug_lists_names() {
        let mut registry = Registry::new();
        registry.register(MockFormat::new("aaa"));
        assert_eq!(format!("{registry:?}"), r#"["aaa"]"#);
    }
}
