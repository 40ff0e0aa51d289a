/*!
    Translation between FFmpeg pixel formats and array element layouts.

    The mapping is deliberately partial: every pixel format is described by
    an element width and a channel count, but only gray, RGB and RGBA with
    8 or 16 bits per channel can be produced from an array.
*/

use ffmpeg_next::{ffi, format::Pixel};

use ndio_types::{ElementType, Error, Result};

#[cfg(target_endian = "little")]
mod native {
    use ffmpeg_next::format::Pixel;

    pub const GRAY16: Pixel = Pixel::GRAY16LE;
    pub const RGB48: Pixel = Pixel::RGB48LE;
    pub const RGBA64: Pixel = Pixel::RGBA64LE;
}

#[cfg(target_endian = "big")]
mod native {
    use ffmpeg_next::format::Pixel;

    pub const GRAY16: Pixel = Pixel::GRAY16BE;
    pub const RGB48: Pixel = Pixel::RGB48BE;
    pub const RGBA64: Pixel = Pixel::RGBA64BE;
}

/**
    Element type and channel count of a pixel format.

    The element width is the average number of bits per component, rounded
    up to whole bytes, so subsampled formats such as YUV 4:2:0 map to one
    byte per channel.
*/
pub fn pixel_layout(format: Pixel) -> Result<(ElementType, usize)> {
    let descriptor = format
        .descriptor()
        .ok_or_else(|| Error::unsupported_format(format!("{format:?} has no descriptor")))?;

    let components = descriptor.nb_components() as usize;
    if components == 0 {
        return Err(Error::unsupported_format(format!(
            "{format:?} has no components"
        )));
    }

    // SAFETY: the descriptor pointer comes from FFmpeg's static descriptor table.
    let bits = unsafe { ffi::av_get_bits_per_pixel(descriptor.as_ptr()) };
    let bits = usize::try_from(bits).unwrap_or(0);
    let bytes = (bits / components).div_ceil(8);

    let element = ElementType::unsigned_of_size(bytes).ok_or_else(|| {
        Error::unsupported_format(format!(
            "{format:?} has {bytes} bytes per component"
        ))
    })?;

    Ok((element, components))
}

/**
    Pixel format holding `channels` interleaved components of `bytes` each.

    Two channels map to RGB, the missing third channel being zero.
*/
pub fn pixel_format_for(bytes: usize, channels: usize) -> Option<Pixel> {
    match (channels, bytes) {
        (1, 1) => Some(Pixel::GRAY8),
        (1, 2) => Some(native::GRAY16),
        (2 | 3, 1) => Some(Pixel::RGB24),
        (2 | 3, 2) => Some(native::RGB48),
        (4, 1) => Some(Pixel::RGBA),
        (4, 2) => Some(native::RGBA64),
        _ => None,
    }
}

/**
    Format that frames decoded as `format` are converted to before they are
    copied into an array.

    Palette formats expand to RGB; every other format keeps its element
    width and channel count.
*/
pub fn output_pixel_format(format: Pixel) -> Result<Pixel> {
    if is_palette(format) {
        return Ok(Pixel::RGB24);
    }
    let (element, channels) = pixel_layout(format)?;
    pixel_format_for(element.size(), channels).ok_or_else(|| {
        Error::unsupported_format(format!(
            "{format:?} ({channels} channels of {element}) has no array equivalent"
        ))
    })
}

fn is_palette(format: Pixel) -> bool {
    format.descriptor().is_some_and(|descriptor| {
        // SAFETY: the descriptor pointer comes from FFmpeg's static descriptor table.
        let flags = unsafe { (*descriptor.as_ptr()).flags };
        flags as u64 & ffi::AV_PIX_FMT_FLAG_PAL as u64 != 0
    })
}

/**
    Checks that frames decoded as `format` can be read into an array.

    `Pixel::None` passes, since some decoders only settle on a format once
    the first frame is decoded; that frame is checked again.
*/
pub(crate) fn check_decoded_format(format: Pixel) -> Result<()> {
    if format == Pixel::None {
        return Ok(());
    }
    output_pixel_format(format).map(|_| ())
}

/**
    Layout of the frames an array is read into for a decoded format.
*/
pub fn output_layout(format: Pixel) -> Result<(ElementType, usize)> {
    pixel_layout(output_pixel_format(format)?)
}

/**
    Best format among `supported` to encode frames of `source` without loss.

    Falls back to `source` itself when the encoder does not list formats.
*/
pub(crate) fn best_encoder_format(supported: Option<&[Pixel]>, source: Pixel) -> Pixel {
    let Some(supported) = supported.filter(|s| !s.is_empty()) else {
        return source;
    };
    if supported.contains(&source) {
        return source;
    }

    let has_alpha = source
        .descriptor()
        .map(|d| d.nb_components() == 2 || d.nb_components() == 4)
        .unwrap_or(false);

    let mut list: Vec<ffi::AVPixelFormat> = supported.iter().map(|&p| p.into()).collect();
    list.push(ffi::AVPixelFormat::AV_PIX_FMT_NONE);

    // SAFETY: `list` is terminated with AV_PIX_FMT_NONE and outlives the call;
    // the loss pointer may be null.
    let best = unsafe {
        ffi::avcodec_find_best_pix_fmt_of_list(
            list.as_ptr(),
            source.into(),
            i32::from(has_alpha),
            std::ptr::null_mut(),
        )
    };

    match Pixel::from(best) {
        Pixel::None => supported[0],
        best => best,
    }
}
