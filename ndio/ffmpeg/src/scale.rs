/*!
    Pixel format conversion between decoded frames and array planes.
*/

use ffmpeg_next::{
    format::Pixel,
    software::scaling::{context::Context as ScalerContext, flag::Flags as ScalerFlags},
    util::frame::video::Video as VideoFrameFFmpeg,
};

use ndio_types::{Error, Result};

/**
    Interpolation used by conversions that change the frame size, such as
    the writer rounding odd frame sizes up to even ones.

    Conversions that keep the frame size copy samples exactly either way.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Repeat the nearest sample.
    Nearest,
    #[default]
    Bicubic,
}

impl Interpolation {
    fn flags(self) -> ScalerFlags {
        match self {
            Self::Nearest => ScalerFlags::POINT,
            Self::Bicubic => ScalerFlags::BICUBIC,
        }
    }
}

/**
    Target of a frame conversion.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScaleTarget {
    pub format: Pixel,
    pub width: u32,
    pub height: u32,
}

/**
    Lazily created scaling context.

    The context is created on first use and recreated whenever the source
    geometry, source format or target changes.
*/
pub(crate) struct FrameScaler {
    interpolation: Interpolation,
    state: Option<ScalerState>,
}

struct ScalerState {
    context: ScalerContext,
    src_width: u32,
    src_height: u32,
    src_format: Pixel,
    target: ScaleTarget,
}

// SAFETY: the swscale context is owned exclusively by this value and is only
// used through `&mut self`, so moving it to another thread is sound.
unsafe impl Send for FrameScaler {}

impl FrameScaler {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            state: None,
        }
    }

    /**
        Convert `src` into `dst` at the given target.

        `dst` is reallocated when it does not match the target.
    */
    pub fn run(
        &mut self,
        src: &VideoFrameFFmpeg,
        target: ScaleTarget,
        dst: &mut VideoFrameFFmpeg,
    ) -> Result<()> {
        if src.width() == 0 || src.height() == 0 {
            return Err(Error::decode("frame has zero dimensions"));
        }

        let needs_init = match &self.state {
            None => true,
            Some(state) => {
                state.src_width != src.width()
                    || state.src_height != src.height()
                    || state.src_format != src.format()
                    || state.target != target
            }
        };

        if needs_init {
            self.init(src.width(), src.height(), src.format(), target)?;
        }

        if dst.format() != target.format
            || dst.width() != target.width
            || dst.height() != target.height
        {
            *dst = VideoFrameFFmpeg::new(target.format, target.width, target.height);
        }

        let Some(state) = self.state.as_mut() else {
            return Err(Error::decode("scaler not initialized"));
        };
        state
            .context
            .run(src, dst)
            .map_err(|e| Error::decode(format!("pixel conversion failed: {e}")))
    }

    fn init(
        &mut self,
        src_width: u32,
        src_height: u32,
        src_format: Pixel,
        target: ScaleTarget,
    ) -> Result<()> {
        let context = ScalerContext::get(
            src_format,
            src_width,
            src_height,
            target.format,
            target.width,
            target.height,
            self.interpolation.flags(),
        )
        .map_err(|e| {
            Error::unsupported_format(format!(
                "no conversion from {src_format:?} to {:?}: {e}",
                target.format
            ))
        })?;

        tracing::debug!(
            src_width,
            src_height,
            ?src_format,
            dst_width = target.width,
            dst_height = target.height,
            dst_format = ?target.format,
            "created scaler"
        );

        self.state = Some(ScalerState {
            context,
            src_width,
            src_height,
            src_format,
            target,
        });

        Ok(())
    }
}

impl std::fmt::Debug for FrameScaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScaler")
            .field("interpolation", &self.interpolation)
            .field("initialized", &self.state.is_some())
            .finish_non_exhaustive()
    }
}
