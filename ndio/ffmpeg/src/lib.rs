/*!
    FFmpeg-backed video reader and writer for the ndio crate ecosystem.

    This crate exposes video files as N-dimensional arrays. A video with
    `d` frames of `w` by `h` pixels and `c` color channels reads as a
    `(w, h, d, c)` array with unit dimensions removed, so a grayscale
    video is `(w, h, d)` and a single color image is `(w, h, c)`.

    # Reading

    ```ignore
    use ndio_ffmpeg::{ReaderConfig, ReaderSession};
    use ndio_types::{Array, Session};

    let mut video = ReaderSession::open("clip.mp4".as_ref(), ReaderConfig::default())?;
    let shape = video.shape()?;
    let mut frames = Array::zeros(shape);
    video.read(&mut frames)?;
    ```

    Single frames are read with [`Session::seek_and_read`], which only
    honors the frame dimension. Consecutive frames are decoded without
    seeking.

    # Writing

    ```ignore
    use ndio_ffmpeg::{WriterConfig, WriterSession};
    use ndio_types::Session;

    let config = WriterConfig::default().with_encoder("ffv1");
    let mut video = Box::new(WriterSession::open("out.mkv".as_ref(), config)?);
    video.write(&frames)?;
    video.close()?;
    ```

    Arrays are written as `(w, h)`, `(w, h, d)`, or four dimensional arrays
    whose color dimension is the smallest one with one to four elements.
    Two channels are written as RGB with a zero blue channel.

    # Pixel Formats

    Arrays map to gray, RGB and RGBA with 8 or 16 bits per channel. Decoded
    frames in any other format are converted to the closest of those.

    [`Session::seek_and_read`]: ndio_types::Session::seek_and_read
*/

mod config;
mod convert;
mod dims;
mod format;
mod init;
mod pixel;
mod reader;
mod scale;
mod transfer;
mod writer;

pub use config::{ReaderConfig, WriterConfig};
pub use format::FfmpegFormat;
pub use init::{InitConfig, init, init_with};
pub use pixel::{output_layout, output_pixel_format, pixel_format_for, pixel_layout};
pub use reader::ReaderSession;
pub use scale::Interpolation;
pub use writer::WriterSession;

pub use ffmpeg_next::format::Pixel;
pub use ffmpeg_next::util::log::Level as LogLevel;
