/*!
    Shared types for the ndio crate ecosystem.

    This crate defines the vocabulary that crosses crate boundaries: the
    array model that format plugins read into and write from, and
    the plugin contract itself. It has no dependency on any media backend,
    so hosts can depend on it without pulling in FFmpeg bindings.

    # Array Model

    - [`ElementType`] - Element type of an array
    - [`Shape`] - Dimensions plus element type, with no backing data
    - [`Array`] - Shape plus owned storage, backed by [`ndarray`]

    # Plugin Contract

    - [`Format`] - A registered file format (name, sniffing, open)
    - [`Session`] - An open file handle produced by a format
    - [`Mode`] - Read or write

    # Error Handling

    - [`Error`] and [`Result`] - Common error types
*/

mod array;
mod element;
mod error;
mod format;
mod shape;

pub use array::Array;
pub use element::ElementType;
pub use error::{Error, Result};
pub use format::{Format, Mode, Session};
pub use shape::{Shape, pack_dims};

pub use ndarray;
