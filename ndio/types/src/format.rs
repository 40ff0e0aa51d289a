/*!
    The plugin contract between a host and a file format.
*/

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::shape::Shape;

/**
    Mode a file is opened in.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Read,
    Write,
}

impl Mode {
    /**
        Parse a mode string, looking only at its first character.

        `"r"`, `"rb"` and `"read"` are all read mode; anything that does
        not start with `r` or `w` is rejected with [`Error::UnsupportedMode`].
    */
    pub fn parse(mode: &str) -> Result<Self> {
        match mode.chars().next() {
            Some('r') => Ok(Self::Read),
            Some('w') => Ok(Self::Write),
            _ => Err(Error::UnsupportedMode(mode.to_string())),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("r"),
            Self::Write => f.write_str("w"),
        }
    }
}

/**
    A file format that a host can register and dispatch to.
*/
pub trait Format: Send + Sync {
    /**
        Short, unique name of the format.
    */
    fn name(&self) -> &'static str;

    /**
        Returns true if this format can handle `path` in the given mode,
        judging by the path alone.
    */
    fn is_applicable(&self, path: &Path, mode: Mode) -> bool;

    /**
        Open `path`, producing a session that owns every resource for the file.
    */
    fn open(&self, path: &Path, mode: Mode) -> Result<Box<dyn Session>>;
}

/**
    An open file produced by a [`Format`].

    Operations that make no sense for the session's mode return
    [`Error::UnsupportedMode`].
*/
pub trait Session: Send {
    /**
        Shape of the whole file as an array, with unit dimensions removed.
    */
    fn shape(&mut self) -> Result<Shape>;

    /**
        Read the whole file into `dest`, which must have the shape
        returned by [`Session::shape`].
    */
    fn read(&mut self, dest: &mut Array) -> Result<()>;

    /**
        Append the contents of `src` to the file.
    */
    fn write(&mut self, src: &Array) -> Result<()>;

    /**
        Returns true if dimension `dim` of the file's shape can be addressed
        by [`Session::seek_and_read`].
    */
    fn can_seek(&self, dim: usize) -> bool;

    /**
        Read the slice at position `pos` into `dest`.

        Only the components of `pos` for seekable dimensions are used.
    */
    fn seek_and_read(&mut self, dest: &mut Array, pos: &[i64]) -> Result<()>;

    /**
        Number of addressable positions along the seekable dimension, or 0
        if unknown.
    */
    fn frame_count(&self) -> u64;

    /**
        Finalize and release the session.
    */
    fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_uses_first_character() {
        assert_eq!(Mode::parse("r").unwrap(), Mode::Read);
        assert_eq!(Mode::parse("rb").unwrap(), Mode::Read);
        assert_eq!(Mode::parse("write").unwrap(), Mode::Write);
        assert_eq!("w".parse::<Mode>().unwrap(), Mode::Write);
    }

    #[test]
    fn mode_rejects_unknown() {
        assert!(matches!(Mode::parse("a"), Err(Error::UnsupportedMode(_))));
        assert!(matches!(Mode::parse(""), Err(Error::UnsupportedMode(_))));
        assert!(matches!(Mode::parse("R"), Err(Error::UnsupportedMode(_))));
    }
}
