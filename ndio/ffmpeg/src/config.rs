/*!
    Reader and writer configuration types.
*/

use crate::scale::Interpolation;

/**
    Configuration for reading video files.
*/
#[derive(Clone, Debug, Default)]
pub struct ReaderConfig {
    /// Interpolation used when converting decoded frames.
    pub interpolation: Interpolation,
}

impl ReaderConfig {
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/**
    Configuration for writing video files.

    By default the container's default video codec is used at 24 frames
    per second with a keyframe every 12 frames.
*/
#[derive(Clone, Debug)]
pub struct WriterConfig {
    /// Frames per second of the written stream.
    pub frame_rate: u32,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    /// Encoder to use by name, instead of the container's default video codec.
    pub encoder: Option<String>,
    /// Private options passed to the encoder when it is opened.
    pub options: Vec<(String, String)>,
    /// Interpolation used when odd frame sizes are rounded up to even ones.
    pub interpolation: Interpolation,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            frame_rate: 24,
            gop_size: 12,
            encoder: None,
            options: Vec::new(),
            interpolation: Interpolation::default(),
        }
    }
}

impl WriterConfig {
    /**
        Set the frame rate. Zero is treated as one frame per second.
    */
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate.max(1);
        self
    }

    pub fn with_gop_size(mut self, gop_size: u32) -> Self {
        self.gop_size = gop_size;
        self
    }

    /**
        Use the encoder with the given name, for example `"ffv1"` or `"libx264"`.
    */
    pub fn with_encoder(mut self, name: impl Into<String>) -> Self {
        self.encoder = Some(name.into());
        self
    }

    /**
        Add an encoder option, for example `("crf", "18")`.
    */
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}
