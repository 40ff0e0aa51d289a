/*!
    Reading video files as arrays.
*/

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    Packet as PacketFFmpeg,
    codec::{self, Id as CodecId, decoder::Video as VideoDecoderFFmpeg},
    ffi,
    format::context::Input as InputContext,
    media::Type,
    util::frame::video::Video as VideoFrameFFmpeg,
};
use tracing::{debug, trace, warn};

use ndio_types::{Array, ElementType, Error, Result, Session, Shape};

use crate::config::ReaderConfig;
use crate::convert::{FrameTiming, frames_from_duration};
use crate::dims::ReadLayout;
use crate::init::init;
use crate::pixel::{check_decoded_format, output_layout, pixel_format_for};
use crate::scale::{FrameScaler, ScaleTarget};
use crate::transfer::{PackedGeometry, scatter_packed};

/**
    A video file opened for reading.

    The file is presented as a `(width, height, frames, channels)` array
    with unit dimensions removed. Only the frame dimension is seekable;
    seeking lands on the nearest keyframe at or before the requested frame
    and decodes forward from there.
*/
pub struct ReaderSession {
    // Drop order: scaler and frames, then decoder, then container.
    scaler: FrameScaler,
    converted: VideoFrameFFmpeg,
    pending: VideoFrameFFmpeg,
    frame: VideoFrameFFmpeg,
    decoder: VideoDecoderFFmpeg,
    input: InputContext,
    path: PathBuf,
    stream_index: usize,
    timing: FrameTiming,
    is_raw: bool,
    frame_count: u64,
    frame_axis: Option<usize>,
    layout: Option<ReadLayout>,
    /// Index of the last frame positioned by `advance_to`, -1 before any.
    last_frame: i64,
    /// Frame index of the frame in `frame`, if one was decoded since the last seek.
    decoded: Option<i64>,
    eof_sent: bool,
    at_start: bool,
}

impl ReaderSession {
    /**
        Open a video file for reading.

        Locates the best video stream and opens a decoder for it. The frame
        count is derived from the container duration and the stream frame
        rate, falling back to the stream's own frame count.
    */
    pub fn open(path: &Path, config: ReaderConfig) -> Result<Self> {
        init()?;

        let input = ffmpeg_next::format::input(&path).map_err(|e| Error::open_failed(path, e))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| Error::open_failed(path, "no video stream"))?;

        let stream_index = stream.index();
        let start_time = match stream.start_time() {
            ffi::AV_NOPTS_VALUE => 0,
            start => start,
        };
        let mut frame_rate = stream.rate();
        if frame_rate.numerator() <= 0 || frame_rate.denominator() <= 0 {
            frame_rate = stream.avg_frame_rate();
        }
        let timing = FrameTiming {
            time_base: stream.time_base(),
            start_time,
            frame_rate,
        };

        let mut frame_count = frames_from_duration(input.duration(), frame_rate);
        if frame_count == 0 && stream.frames() > 0 {
            frame_count = stream.frames() as u64;
        }

        let decoder = codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| Error::open_failed(path, e))?
            .decoder()
            .video()
            .map_err(|e| Error::open_failed(path, e))?;
        check_decoded_format(decoder.format()).map_err(|e| Error::open_failed(path, e))?;

        let is_raw = decoder.id() == CodecId::RAWVIDEO;
        let frame_axis = ReadLayout::new(
            decoder.width() as usize,
            decoder.height() as usize,
            frame_count as usize,
            1,
            ElementType::U8,
        )
        .frame_axis();

        debug!(
            path = %path.display(),
            stream_index,
            codec = ?decoder.id(),
            frame_count,
            "opened video for reading"
        );

        Ok(Self {
            scaler: FrameScaler::new(config.interpolation),
            converted: VideoFrameFFmpeg::empty(),
            pending: VideoFrameFFmpeg::empty(),
            frame: VideoFrameFFmpeg::empty(),
            decoder,
            input,
            path: path.to_path_buf(),
            stream_index,
            timing,
            is_raw,
            frame_count,
            frame_axis,
            layout: None,
            last_frame: -1,
            decoded: None,
            eof_sent: false,
            at_start: true,
        })
    }

    /**
        Path the session was opened with.
    */
    pub fn path(&self) -> &Path {
        &self.path
    }

    /**
        Read the next packet of the selected stream, skipping all others.
    */
    fn next_packet(&mut self) -> Result<Option<PacketFFmpeg>> {
        loop {
            let mut packet = PacketFFmpeg::empty();
            match packet.read(&mut self.input) {
                Ok(()) if packet.stream() == self.stream_index => {
                    self.at_start = false;
                    return Ok(Some(packet));
                }
                Ok(()) => {
                    trace!(stream = packet.stream(), "skipping packet of another stream");
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(e) => return Err(Error::decode(format!("failed to read packet: {e}"))),
            }
        }
    }

    /**
        Make the frame in `pending` current and check it against `target`.
    */
    fn accept_pending(&mut self, target: i64) -> bool {
        std::mem::swap(&mut self.frame, &mut self.pending);
        let index = match self.frame.timestamp().or_else(|| self.frame.pts()) {
            Some(pts) => self.timing.frame_index(pts),
            None => self.decoded.map_or(0, |i| i + 1),
        };
        trace!(index, target, "decoded frame");
        self.decoded = Some(index);
        index >= target
    }

    /**
        Decode forward until the current frame is at or after `target`.

        At end of stream the last decoded frame stays current.
    */
    fn advance_to(&mut self, target: i64) -> Result<()> {
        loop {
            match self.decoder.receive_frame(&mut self.pending) {
                Ok(()) => {
                    if self.accept_pending(target) {
                        break;
                    }
                    continue;
                }
                Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {}
                Err(ffmpeg_next::Error::Eof) => break,
                Err(e) => return Err(Error::decode(e)),
            }

            if self.eof_sent {
                break;
            }

            let Some(packet) = self.next_packet()? else {
                self.decoder.send_eof().map_err(Error::decode)?;
                self.eof_sent = true;
                continue;
            };

            self.decoder.send_packet(&packet).map_err(Error::decode)?;

            if self.is_raw {
                match self.decoder.receive_frame(&mut self.pending) {
                    Ok(()) => {}
                    Err(ffmpeg_next::Error::Other { errno }) if errno == ffi::EAGAIN => {
                        warn!(pts = ?packet.pts(), "raw packet produced no frame, using a blank frame");
                        self.pending = self.blank_frame(packet.pts());
                    }
                    Err(e) => return Err(Error::decode(e)),
                }
                if self.accept_pending(target) {
                    break;
                }
            }
        }

        if self.decoded.is_none() {
            return Err(Error::decode(format!(
                "no frame could be decoded for frame {target}"
            )));
        }

        self.last_frame = target;
        Ok(())
    }

    fn blank_frame(&self, pts: Option<i64>) -> VideoFrameFFmpeg {
        let mut frame = VideoFrameFFmpeg::new(
            self.decoder.format(),
            self.decoder.width(),
            self.decoder.height(),
        );
        for plane in 0..frame.planes() {
            frame.data_mut(plane).fill(0);
        }
        frame.set_pts(pts);
        frame
    }

    /**
        Coarse seek to the keyframe at or before frame `target`.
    */
    fn seek(&mut self, target: i64) -> Result<()> {
        if target < 0 || target as u64 >= self.frame_count {
            return Err(Error::OutOfRange {
                index: target,
                count: self.frame_count,
            });
        }
        self.seek_unchecked(target)
    }

    fn seek_unchecked(&mut self, target: i64) -> Result<()> {
        let timestamp = self.timing.micros(target);
        self.input
            .seek(timestamp, ..timestamp)
            .map_err(|e| Error::seek(format!("frame {target}: {e}")))?;
        self.decoder.flush();
        self.decoded = None;
        self.eof_sent = false;
        self.at_start = target == 0;
        debug!(target, timestamp, "seeked");
        Ok(())
    }

    /**
        Return to the start of the stream, unless nothing was read yet.
    */
    fn rewind(&mut self) -> Result<()> {
        if !self.at_start {
            self.seek_unchecked(0)?;
        }
        self.last_frame = -1;
        Ok(())
    }

    /**
        Layout of the array, resolved from the first decoded frame.
    */
    fn layout(&mut self) -> Result<ReadLayout> {
        if let Some(layout) = &self.layout {
            return Ok(layout.clone());
        }
        if self.decoded.is_none() {
            self.rewind()?;
            self.advance_to(0)?;
        }
        let (element, channels) = output_layout(self.frame.format())?;
        let layout = ReadLayout::new(
            self.frame.width() as usize,
            self.frame.height() as usize,
            self.frame_count as usize,
            channels,
            element,
        );
        self.frame_axis = layout.frame_axis();
        self.layout = Some(layout.clone());
        Ok(layout)
    }

    /**
        Convert the current frame and copy it into `dest` at byte `offset`.
    */
    fn copy_out(&mut self, layout: &ReadLayout, dest: &mut Array, offset: usize) -> Result<()> {
        let format = pixel_format_for(layout.element.size(), layout.channels).ok_or_else(|| {
            Error::unsupported_format(format!(
                "{} channels of {}",
                layout.channels, layout.element
            ))
        })?;
        let target = ScaleTarget {
            format,
            width: layout.width as u32,
            height: layout.height as u32,
        };
        self.scaler.run(&self.frame, target, &mut self.converted)?;

        let geometry = PackedGeometry {
            width: layout.width,
            height: layout.height,
            channels: layout.channels,
            element_size: layout.element.size(),
        };
        let strides = layout.plane_strides(dest);
        scatter_packed(
            self.converted.data(0),
            self.converted.stride(0),
            geometry,
            dest.as_bytes_mut(),
            offset,
            strides,
        )
    }
}

impl Session for ReaderSession {
    /**
        Decodes the first frame to learn the true geometry, then rewinds.
    */
    fn shape(&mut self) -> Result<Shape> {
        let layout = self.layout()?;
        self.rewind()?;
        Ok(layout.shape())
    }

    fn read(&mut self, dest: &mut Array) -> Result<()> {
        if self.frame_count == 0 {
            return Err(Error::OutOfRange { index: 0, count: 0 });
        }
        let layout = self.layout()?;
        layout.check_full(dest)?;
        self.rewind()?;

        let frame_stride = layout.frame_stride(dest);
        for index in 0..self.frame_count {
            self.advance_to(index as i64)?;
            self.copy_out(&layout, dest, index as usize * frame_stride)?;
        }
        Ok(())
    }

    fn write(&mut self, _src: &Array) -> Result<()> {
        Err(Error::UnsupportedMode(
            "cannot write to a file opened for reading".to_string(),
        ))
    }

    fn can_seek(&self, dim: usize) -> bool {
        self.frame_axis == Some(dim)
    }

    fn seek_and_read(&mut self, dest: &mut Array, pos: &[i64]) -> Result<()> {
        let target = self
            .frame_axis
            .and_then(|axis| pos.get(axis).copied())
            .unwrap_or(0);
        if target < 0 || target as u64 >= self.frame_count {
            return Err(Error::OutOfRange {
                index: target,
                count: self.frame_count,
            });
        }

        let layout = self.layout()?;
        layout.check_frame(dest)?;

        if target != self.last_frame + 1 {
            self.seek(target)?;
        }
        self.advance_to(target)?;
        self.copy_out(&layout, dest, 0)
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn close(self: Box<Self>) -> Result<()> {
        debug!(path = %self.path.display(), "closed video");
        Ok(())
    }
}

impl std::fmt::Debug for ReaderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderSession")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("frame_count", &self.frame_count)
            .field("last_frame", &self.last_frame)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::WriterConfig;
    use crate::writer::WriterSession;

    #[test]
    fn blank_frames_are_zeroed_at_decoder_geometry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.nut");
        let src = Array::from_bytes(Shape::new([8, 6, 2], ElementType::U8), vec![200; 96]).unwrap();
        let config = WriterConfig::default().with_encoder("rawvideo");
        let mut writer = Box::new(WriterSession::open(&path, config).unwrap());
        writer.write(&src).unwrap();
        writer.close().unwrap();

        let session = ReaderSession::open(&path, ReaderConfig::default()).unwrap();
        assert!(session.is_raw);

        let frame = session.blank_frame(Some(1));
        assert_eq!(frame.format(), session.decoder.format());
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.pts(), Some(1));
        for plane in 0..frame.planes() {
            assert!(frame.data(plane).iter().all(|&b| b == 0));
        }
    }
}
