/*!
    The FFmpeg file format.
*/

use std::ffi::{CStr, c_char, c_void};
use std::path::Path;

use ffmpeg_next::ffi;
use tracing::trace;

use ndio_types::{Format, Mode, Result, Session};

use crate::config::{ReaderConfig, WriterConfig};
use crate::convert::name_list_contains;
use crate::init::init;
use crate::reader::ReaderSession;
use crate::writer::WriterSession;

/**
    Video files in any container and codec FFmpeg can demux and decode, or
    mux and encode.

    # Example

    ```ignore
    use ndio_ffmpeg::FfmpegFormat;
    use ndio_types::{Array, Format, Mode};

    let format = FfmpegFormat::default();
    let mut session = format.open("clip.mp4".as_ref(), Mode::Read)?;
    let mut frames = Array::zeros(session.shape()?);
    session.read(&mut frames)?;
    session.close()?;
    ```
*/
#[derive(Clone, Debug, Default)]
pub struct FfmpegFormat {
    reader: ReaderConfig,
    writer: WriterConfig,
}

impl FfmpegFormat {
    pub const NAME: &'static str = "ffmpeg";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader_config(mut self, config: ReaderConfig) -> Self {
        self.reader = config;
        self
    }

    pub fn with_writer_config(mut self, config: WriterConfig) -> Self {
        self.writer = config;
        self
    }

    pub fn reader_config(&self) -> &ReaderConfig {
        &self.reader
    }

    pub fn writer_config(&self) -> &WriterConfig {
        &self.writer
    }
}

impl Format for FfmpegFormat {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    /**
        Matches the file extension against the short names and extension
        lists of FFmpeg's demuxers (reading) or muxers (writing). Writing
        additionally requires the first matching muxer to have a default
        video codec.
    */
    fn is_applicable(&self, path: &Path, mode: Mode) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if init().is_err() {
            return false;
        }

        let applicable = match mode {
            Mode::Read => find_container(&demuxers(), extension).is_some(),
            Mode::Write => find_container(&muxers(), extension).is_some_and(|m| m.has_video),
        };
        trace!(extension, ?mode, applicable, "checked applicability");
        applicable
    }

    fn open(&self, path: &Path, mode: Mode) -> Result<Box<dyn Session>> {
        match mode {
            Mode::Read => Ok(Box::new(ReaderSession::open(path, self.reader.clone())?)),
            Mode::Write => Ok(Box::new(WriterSession::open(path, self.writer.clone())?)),
        }
    }
}

/**
    Names of a registered demuxer or muxer.
*/
#[derive(Clone, Debug)]
struct ContainerEntry {
    name: String,
    extensions: String,
    has_video: bool,
}

impl ContainerEntry {
    fn is_named(&self, extension: &str) -> bool {
        name_list_contains(&self.name, extension)
    }

    fn lists_extension(&self, extension: &str) -> bool {
        name_list_contains(&self.extensions, extension)
    }
}

/**
    Container for a file extension: the first one with the extension among
    its short names, otherwise the first one listing it as an extension.

    The fallback lets extensions such as `mkv` resolve even though no
    container is named after them.
*/
fn find_container<'a>(
    entries: &'a [ContainerEntry],
    extension: &str,
) -> Option<&'a ContainerEntry> {
    entries
        .iter()
        .find(|entry| entry.is_named(extension))
        .or_else(|| entries.iter().find(|entry| entry.lists_extension(extension)))
}

/**
    Lossy copy of a possibly null C string.
*/
fn c_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: FFmpeg format names and extension lists are static,
    // NUL-terminated strings.
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn demuxers() -> Vec<ContainerEntry> {
    let mut entries = Vec::new();
    let mut opaque: *mut c_void = std::ptr::null_mut();
    loop {
        // SAFETY: `opaque` is the iteration state FFmpeg expects, starting null.
        let demuxer = unsafe { ffi::av_demuxer_iterate(&mut opaque) };
        if demuxer.is_null() {
            break;
        }
        // SAFETY: non-null demuxers point into FFmpeg's static registry.
        let (name, extensions) = unsafe { ((*demuxer).name, (*demuxer).extensions) };
        entries.push(ContainerEntry {
            name: c_string(name),
            extensions: c_string(extensions),
            has_video: true,
        });
    }
    entries
}

fn muxers() -> Vec<ContainerEntry> {
    let mut entries = Vec::new();
    let mut opaque: *mut c_void = std::ptr::null_mut();
    loop {
        // SAFETY: `opaque` is the iteration state FFmpeg expects, starting null.
        let muxer = unsafe { ffi::av_muxer_iterate(&mut opaque) };
        if muxer.is_null() {
            break;
        }
        // SAFETY: non-null muxers point into FFmpeg's static registry.
        let (name, extensions, video_codec) =
            unsafe { ((*muxer).name, (*muxer).extensions, (*muxer).video_codec) };
        entries.push(ContainerEntry {
            name: c_string(name),
            extensions: c_string(extensions),
            has_video: video_codec != ffi::AVCodecID::AV_CODEC_ID_NONE,
        });
    }
    entries
}
