/*!
    Writing arrays as video files.
*/

use std::fmt;
use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Dictionary, Packet as PacketFFmpeg, Rational,
    codec::{self, encoder::Video as VideoEncoderFFmpeg},
    ffi,
    format::{self, Pixel, context::Output as OutputContext},
    media::Type,
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::{debug, trace, warn};

use ndio_types::{Array, Error, Result, Session, Shape};

use crate::config::WriterConfig;
use crate::dims::{FrameSource, infer_frame_source};
use crate::init::init;
use crate::pixel::{best_encoder_format, pixel_format_for};
use crate::scale::{FrameScaler, ScaleTarget};
use crate::transfer::{PackedGeometry, gather_packed};

/**
    Geometry of the arrays an encoder was opened for.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SourceGeometry {
    width: u32,
    height: u32,
    format: Pixel,
}

impl fmt::Display for SourceGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.format)
    }
}

/**
    Encoder and conversion state, created on the first write.
*/
struct EncoderState {
    scaler: FrameScaler,
    /// Encoder input, in the encoder's pixel format at even dimensions.
    converted: VideoFrameFFmpeg,
    /// One frame of the array, in the source pixel format.
    staging: VideoFrameFFmpeg,
    encoder: VideoEncoderFFmpeg,
    geometry: SourceGeometry,
    target: ScaleTarget,
    time_base: Rational,
    next_pts: i64,
}

/**
    A video file opened for writing.

    The encoder is opened on the first write, which fixes the width, height
    and pixel format of the stream. Later writes append frames and must
    match that geometry. Closing flushes delayed frames and writes the
    container trailer; dropping an unclosed session does the same on a
    best-effort basis.
*/
pub struct WriterSession {
    encoder: Option<EncoderState>,
    /// Encoder context configured at open, consumed by the first write.
    setup: Option<codec::encoder::video::Video>,
    output: OutputContext,
    path: PathBuf,
    config: WriterConfig,
    supported_formats: Option<Vec<Pixel>>,
    delayed: bool,
    global_header: bool,
    frames_written: u64,
    finished: bool,
}

impl WriterSession {
    /**
        Create a video file for writing.

        The container is chosen from the file extension and must have a
        default video codec, which is used unless the configuration names
        an encoder.
    */
    pub fn open(path: &Path, config: WriterConfig) -> Result<Self> {
        init()?;

        let mut output =
            ffmpeg_next::format::output(&path).map_err(|e| Error::open_failed(path, e))?;

        let id = output.format().codec(&path, Type::Video);
        if id == codec::Id::None {
            return Err(Error::open_failed(
                path,
                "container has no default video codec",
            ));
        }

        let codec = match config.encoder.as_deref() {
            Some(name) => ffmpeg_next::encoder::find_by_name(name)
                .ok_or_else(|| Error::open_failed(path, format!("encoder {name} not found")))?,
            None => ffmpeg_next::encoder::find(id)
                .ok_or_else(|| Error::open_failed(path, format!("no encoder for {id:?}")))?,
        };

        let delayed = codec.capabilities().contains(codec::Capabilities::DELAY);
        let supported_formats = codec
            .video()
            .ok()
            .and_then(|video| video.formats().map(|formats| formats.collect::<Vec<_>>()));
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        output
            .add_stream(codec)
            .map_err(|e| Error::open_failed(path, format!("failed to add video stream: {e}")))?;

        let setup = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| Error::open_failed(path, e))?;

        debug!(
            path = %path.display(),
            encoder = codec.name(),
            delayed,
            "opened video for writing"
        );

        Ok(Self {
            encoder: None,
            setup: Some(setup),
            output,
            path: path.to_path_buf(),
            config,
            supported_formats,
            delayed,
            global_header,
            frames_written: 0,
            finished: false,
        })
    }

    /**
        Path the session was opened with.
    */
    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        Open the encoder for the first array written, or check that a later
        array has the geometry the encoder was opened for.
    */
    fn maybe_init_encoder(
        &mut self,
        width: u32,
        height: u32,
        fps: u32,
        src_format: Pixel,
    ) -> Result<()> {
        let geometry = SourceGeometry {
            width,
            height,
            format: src_format,
        };

        if let Some(state) = &self.encoder {
            if state.geometry != geometry {
                return Err(Error::GeometryMismatch {
                    expected: state.geometry.to_string(),
                    actual: geometry.to_string(),
                });
            }
            return Ok(());
        }

        let Some(mut encoder) = self.setup.take() else {
            return Err(Error::encode("encoder could not be opened"));
        };

        // Most encoders require even dimensions
        let target = ScaleTarget {
            format: best_encoder_format(self.supported_formats.as_deref(), src_format),
            width: width.next_multiple_of(2),
            height: height.next_multiple_of(2),
        };
        let fps = fps.max(1) as i32;
        let time_base = Rational::new(1, fps);
        let frame_rate = Rational::new(fps, 1);

        encoder.set_width(target.width);
        encoder.set_height(target.height);
        encoder.set_format(target.format);
        encoder.set_time_base(time_base);
        encoder.set_frame_rate(Some(frame_rate));
        encoder.set_gop(self.config.gop_size);
        if self.global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let mut options = Dictionary::new();
        for (key, value) in &self.config.options {
            options.set(key, value);
        }

        let encoder = encoder
            .open_with(options)
            .map_err(|e| Error::encode(format!("failed to open encoder: {e}")))?;

        let mut stream = self
            .output
            .stream_mut(0)
            .ok_or_else(|| Error::write("output stream missing"))?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);
        stream.set_rate(frame_rate);
        stream.set_avg_frame_rate(frame_rate);

        self.output
            .write_header()
            .map_err(|e| Error::write(format!("failed to write header: {e}")))?;

        debug!(
            source = %geometry,
            width = target.width,
            height = target.height,
            format = ?target.format,
            fps,
            "opened encoder"
        );

        self.encoder = Some(EncoderState {
            scaler: FrameScaler::new(self.config.interpolation),
            converted: VideoFrameFFmpeg::new(target.format, target.width, target.height),
            staging: VideoFrameFFmpeg::new(src_format, width, height),
            encoder,
            geometry,
            target,
            time_base,
            next_pts: 0,
        });

        Ok(())
    }

    /**
        Encode the frame of `source` that starts at byte `offset`.
    */
    fn encode_frame(&mut self, source: &FrameSource<'_>, offset: usize) -> Result<()> {
        let Some(state) = self.encoder.as_mut() else {
            return Err(Error::encode("encoder is not open"));
        };

        let geometry = PackedGeometry {
            width: source.width,
            height: source.height,
            channels: source.channels,
            element_size: source.element.size(),
        };
        let linesize = state.staging.stride(0);
        gather_packed(
            source.array.as_bytes(),
            offset,
            source.strides,
            geometry,
            state.staging.data_mut(0),
            linesize,
        )?;

        // The encoder may still reference the previous frame's buffers.
        // SAFETY: `converted` is an allocated frame owned by this state.
        let ret = unsafe { ffi::av_frame_make_writable(state.converted.as_mut_ptr()) };
        if ret < 0 {
            return Err(Error::encode(ffmpeg_next::Error::from(ret)));
        }

        state
            .scaler
            .run(&state.staging, state.target, &mut state.converted)?;
        state.converted.set_pts(Some(state.next_pts));
        state.next_pts += 1;

        state
            .encoder
            .send_frame(&state.converted)
            .map_err(Error::encode)?;
        let packets = drain_packets(&mut state.encoder, &mut self.output, state.time_base)?;
        trace!(pts = state.next_pts - 1, packets, "encoded frame");

        self.frames_written += 1;
        Ok(())
    }

    /**
        Flush the encoder and write the trailer. Does nothing after the
        first call, and writes nothing if no frame was ever written.
    */
    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let Some(state) = self.encoder.as_mut() else {
            debug!(path = %self.path.display(), "closed video without frames");
            return Ok(());
        };

        if self.delayed {
            state.encoder.send_eof().map_err(Error::encode)?;
            let flushed = drain_packets(&mut state.encoder, &mut self.output, state.time_base)?;
            debug!(flushed, "flushed encoder");
        }

        self.output
            .write_trailer()
            .map_err(|e| Error::write(format!("failed to write trailer: {e}")))?;

        debug!(
            path = %self.path.display(),
            frames = self.frames_written,
            "finalized video"
        );
        Ok(())
    }
}

/**
    Write every packet the encoder has ready to the first output stream.

    Returns the number of packets written.
*/
fn drain_packets(
    encoder: &mut VideoEncoderFFmpeg,
    output: &mut OutputContext,
    time_base: Rational,
) -> Result<u64> {
    let stream_time_base = output
        .stream(0)
        .map(|stream| stream.time_base())
        .unwrap_or(time_base);

    let mut written = 0;
    loop {
        let mut packet = PacketFFmpeg::empty();
        match encoder.receive_packet(&mut packet) {
            Ok(()) => {
                packet.set_stream(0);
                if packet.duration() == 0 {
                    packet.set_duration(1);
                }
                packet.rescale_ts(time_base, stream_time_base);
                packet
                    .write_interleaved(output)
                    .map_err(|e| Error::write(format!("failed to write packet: {e}")))?;
                written += 1;
            }
            Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => break,
            Err(ffmpeg_next::Error::Eof) => break,
            Err(e) => return Err(Error::encode(e)),
        }
    }
    Ok(written)
}

impl Session for WriterSession {
    fn shape(&mut self) -> Result<Shape> {
        Err(Error::UnsupportedMode(
            "shape of a file opened for writing".to_string(),
        ))
    }

    fn read(&mut self, _dest: &mut Array) -> Result<()> {
        Err(Error::UnsupportedMode(
            "cannot read from a file opened for writing".to_string(),
        ))
    }

    /**
        Append every frame of `src`.

        Signed integer arrays are encoded as their unsigned counterparts of
        the same width, without touching the caller's data.
    */
    fn write(&mut self, src: &Array) -> Result<()> {
        if self.finished {
            return Err(Error::Closed);
        }

        let source = infer_frame_source(src)?;
        let format = pixel_format_for(source.element.size(), source.channels).ok_or_else(|| {
            Error::unsupported_format(format!(
                "{} channels of {}",
                source.channels, source.element
            ))
        })?;

        self.maybe_init_encoder(
            source.width as u32,
            source.height as u32,
            self.config.frame_rate,
            format,
        )?;

        for index in 0..source.frames {
            self.encode_frame(&source, index * source.frame_stride)?;
        }
        Ok(())
    }

    fn can_seek(&self, _dim: usize) -> bool {
        false
    }

    fn seek_and_read(&mut self, _dest: &mut Array, _pos: &[i64]) -> Result<()> {
        Err(Error::UnsupportedMode(
            "cannot seek in a file opened for writing".to_string(),
        ))
    }

    /**
        Number of frames written so far.
    */
    fn frame_count(&self) -> u64 {
        self.frames_written
    }

    fn close(mut self: Box<Self>) -> Result<()> {
        self.finish()
    }
}

impl Drop for WriterSession {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to finalize video"
            );
        }
    }
}

impl fmt::Debug for WriterSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterSession")
            .field("path", &self.path)
            .field("encoder_open", &self.encoder.is_some())
            .field("frames_written", &self.frames_written)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
