/*!
    N-dimensional array I/O.

    Files are opened through a [`Registry`] of formats, either by format
    name or by letting each registered format inspect the path. The
    resulting [`File`] reads and writes [`Array`]s and keeps a log of the
    errors it ran into.

    ```ignore
    use ndio::{Array, File, Registry};

    let registry = Registry::with_defaults();
    let mut video = File::open(&registry, "clip.mp4", None, "r").expect("open failed");
    let shape = video.shape().expect("no shape");
    let mut frames = Array::zeros(shape);
    if !video.read(&mut frames) {
        eprintln!("{:?}", video.errors());
    }
    video.close();
    ```

    # Formats

    - `ffmpeg` - video files, see [`ndio_ffmpeg`]
*/

mod file;
mod registry;

pub use file::File;
pub use registry::Registry;

pub use ndio_types::{Array, ElementType, Error, Format, Mode, Result, Session, Shape};

pub use ndio_ffmpeg;
pub use ndio_types;
