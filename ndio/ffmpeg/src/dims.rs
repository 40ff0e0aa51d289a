/*!
    Mapping between array dimensions and video geometry.

    Reading produces arrays in `(width, height, frames, channels)` order with
    unit dimensions removed. Writing accepts `(width, height)`,
    `(width, height, frames)` or four dimensional arrays whose color channel
    dimension is inferred.
*/

use std::borrow::Cow;

use ndio_types::{Array, ElementType, Error, Result, Shape, pack_dims};

use crate::transfer::PlaneStrides;

/**
    Logical axes of a video read as an array.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Axis {
    Width = 0,
    Height = 1,
    Frame = 2,
    Channel = 3,
}

/**
    Packed array layout of a video on the read side.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ReadLayout {
    pub width: usize,
    pub height: usize,
    pub frames: usize,
    pub channels: usize,
    pub element: ElementType,
    dims: Vec<usize>,
    positions: Vec<Option<usize>>,
}

impl ReadLayout {
    pub fn new(
        width: usize,
        height: usize,
        frames: usize,
        channels: usize,
        element: ElementType,
    ) -> Self {
        let (dims, positions) = pack_dims(&[width, height, frames, channels]);
        Self {
            width,
            height,
            frames,
            channels,
            element,
            dims,
            positions,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.dims.clone(), self.element)
    }

    /**
        Position of a logical axis in the packed shape, if it was kept.
    */
    pub fn position(&self, axis: Axis) -> Option<usize> {
        self.positions[axis as usize]
    }

    pub fn frame_axis(&self) -> Option<usize> {
        self.position(Axis::Frame)
    }

    /**
        Byte stride of `axis` in `array`, or 0 when the axis was packed away.
    */
    fn stride_of(&self, array: &Array, axis: Axis) -> usize {
        self.position(axis)
            .and_then(|p| array.strides().get(p).copied())
            .unwrap_or(0)
    }

    /**
        Plane strides for copying one frame into `dest`.
    */
    pub fn plane_strides(&self, dest: &Array) -> PlaneStrides {
        PlaneStrides {
            x: self.stride_of(dest, Axis::Width),
            y: self.stride_of(dest, Axis::Height),
            channel: self.stride_of(dest, Axis::Channel),
        }
    }

    pub fn frame_stride(&self, dest: &Array) -> usize {
        self.stride_of(dest, Axis::Frame)
    }

    /**
        Checks that `dest` can receive every frame of the video.
    */
    pub fn check_full(&self, dest: &Array) -> Result<()> {
        self.check_element(dest)?;
        if dest.dims() != self.dims.as_slice() {
            return Err(Error::shape_mismatch(format!(
                "destination {} does not match file shape {}",
                dest.shape(),
                self.shape()
            )));
        }
        Ok(())
    }

    /**
        Checks that `dest` can receive one frame at its origin.

        The destination has the packed rank; every dimension but the frame
        dimension must match, the frame dimension may have any non-zero size.
    */
    pub fn check_frame(&self, dest: &Array) -> Result<()> {
        self.check_element(dest)?;
        let frame_axis = self.frame_axis();
        let matches = dest.ndim() == self.dims.len()
            && dest
                .dims()
                .iter()
                .zip(&self.dims)
                .enumerate()
                .all(|(i, (&have, &want))| {
                    if Some(i) == frame_axis {
                        have > 0
                    } else {
                        have == want
                    }
                });
        if !matches {
            return Err(Error::shape_mismatch(format!(
                "destination {} cannot hold a frame of {}",
                dest.shape(),
                self.shape()
            )));
        }
        Ok(())
    }

    fn check_element(&self, dest: &Array) -> Result<()> {
        if dest.element().to_unsigned() != Some(self.element) {
            return Err(Error::shape_mismatch(format!(
                "destination element type {} does not match {}",
                dest.element(),
                self.element
            )));
        }
        Ok(())
    }
}

/**
    Frames to encode, in `(channels, width, height, frames)` terms.
*/
#[derive(Debug)]
pub(crate) struct FrameSource<'a> {
    /// The caller's array, or a transposed and padded copy of it.
    pub array: Cow<'a, Array>,
    /// Unsigned element type the bytes are encoded as.
    pub element: ElementType,
    pub channels: usize,
    pub width: usize,
    pub height: usize,
    pub frames: usize,
    pub strides: PlaneStrides,
    pub frame_stride: usize,
}

/**
    Infer how `src` maps onto frames.

    For four dimensional arrays the color channel dimension is the
    smallest dimension with 1 to 4 elements, the first one winning ties.
    It is rotated to the front and two channels are padded to three; both
    operations produce a new array and leave `src` untouched.
*/
pub(crate) fn infer_frame_source(src: &Array) -> Result<FrameSource<'_>> {
    let element = src.element().to_unsigned().ok_or_else(|| {
        Error::unsupported_format(format!("cannot encode {} elements", src.element()))
    })?;

    let dims = src.dims();
    let strides = src.strides();
    match src.ndim() {
        2 => Ok(FrameSource {
            array: Cow::Borrowed(src),
            element,
            channels: 1,
            width: dims[0],
            height: dims[1],
            frames: 1,
            strides: PlaneStrides {
                x: strides[0],
                y: strides[1],
                channel: 0,
            },
            frame_stride: 0,
        }),
        3 => Ok(FrameSource {
            array: Cow::Borrowed(src),
            element,
            channels: 1,
            width: dims[0],
            height: dims[1],
            frames: dims[2],
            strides: PlaneStrides {
                x: strides[0],
                y: strides[1],
                channel: 0,
            },
            frame_stride: strides[2],
        }),
        4 => {
            let (channel_dim, channels) = channel_dimension(dims)?;

            let mut array = Cow::Borrowed(src);
            if channel_dim != 0 {
                array = Cow::Owned(array.shift_dims(channel_dim));
            }
            if channels == 2 {
                array = Cow::Owned(array.padded(0, 3)?);
            }

            let dims = array.dims().to_vec();
            let strides = array.strides().to_vec();
            Ok(FrameSource {
                element,
                channels: dims[0],
                width: dims[1],
                height: dims[2],
                frames: dims[3],
                strides: PlaneStrides {
                    x: strides[1],
                    y: strides[2],
                    channel: strides[0],
                },
                frame_stride: strides[3],
                array,
            })
        }
        rank => Err(Error::UnsupportedRank(rank)),
    }
}

/**
    Index and size of the color channel dimension of a 4D shape.
*/
fn channel_dimension(dims: &[usize]) -> Result<(usize, usize)> {
    dims.iter()
        .copied()
        .enumerate()
        .filter(|&(_, n)| (1..=4).contains(&n))
        .min_by_key(|&(i, n)| (n, i))
        .ok_or_else(|| {
            Error::UnsupportedChannelCount(dims.iter().copied().min().unwrap_or(0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(dims: &[usize], element: ElementType) -> Array {
        Array::zeros(Shape::new(dims, element))
    }

    #[test]
    fn read_layout_packs_gray_video() {
        let layout = ReadLayout::new(64, 48, 10, 1, ElementType::U8);
        assert_eq!(layout.shape().dims(), &[64, 48, 10]);
        assert_eq!(layout.frame_axis(), Some(2));
        assert_eq!(layout.position(Axis::Channel), None);
    }

    #[test]
    fn read_layout_single_frame() {
        let layout = ReadLayout::new(64, 48, 1, 3, ElementType::U8);
        assert_eq!(layout.shape().dims(), &[64, 48, 3]);
        assert_eq!(layout.frame_axis(), None);
        assert_eq!(layout.position(Axis::Channel), Some(2));
    }

    #[test]
    fn read_layout_strides() {
        let layout = ReadLayout::new(4, 3, 5, 3, ElementType::U16);
        let dest = Array::zeros(layout.shape());
        let strides = layout.plane_strides(&dest);
        assert_eq!(strides.x, 2);
        assert_eq!(strides.y, 8);
        assert_eq!(strides.channel, 2 * 4 * 3 * 5);
        assert_eq!(layout.frame_stride(&dest), 2 * 4 * 3);
    }

    #[test]
    fn read_layout_checks_destination() {
        let layout = ReadLayout::new(4, 3, 5, 1, ElementType::U8);
        assert!(layout.check_full(&array(&[4, 3, 5], ElementType::U8)).is_ok());
        assert!(layout.check_full(&array(&[4, 3, 5], ElementType::I8)).is_ok());
        assert!(layout.check_full(&array(&[4, 3, 4], ElementType::U8)).is_err());
        assert!(layout.check_full(&array(&[4, 3, 5], ElementType::U16)).is_err());

        assert!(layout.check_frame(&array(&[4, 3, 1], ElementType::U8)).is_ok());
        assert!(layout.check_frame(&array(&[4, 3, 5], ElementType::U8)).is_ok());
        assert!(layout.check_frame(&array(&[4, 3], ElementType::U8)).is_err());
        assert!(layout.check_frame(&array(&[4, 2, 1], ElementType::U8)).is_err());
    }

    #[test]
    fn two_and_three_dimensional_sources() {
        let src = array(&[8, 6], ElementType::U8);
        let source = infer_frame_source(&src).unwrap();
        assert_eq!(
            (source.channels, source.width, source.height, source.frames),
            (1, 8, 6, 1)
        );
        assert!(matches!(source.array, Cow::Borrowed(_)));

        let src = array(&[8, 6, 5], ElementType::U16);
        let source = infer_frame_source(&src).unwrap();
        assert_eq!(
            (source.channels, source.width, source.height, source.frames),
            (1, 8, 6, 5)
        );
        assert_eq!(source.frame_stride, 2 * 8 * 6);
    }

    #[test]
    fn channel_first_is_borrowed() {
        let src = array(&[3, 8, 6, 5], ElementType::U8);
        let source = infer_frame_source(&src).unwrap();
        assert!(matches!(source.array, Cow::Borrowed(_)));
        assert_eq!(
            (source.channels, source.width, source.height, source.frames),
            (3, 8, 6, 5)
        );
        assert_eq!(source.strides.channel, 1);
        assert_eq!(source.strides.x, 3);
    }

    #[test]
    fn two_channels_are_padded() {
        let src = array(&[2, 5, 6, 7], ElementType::U8);
        let source = infer_frame_source(&src).unwrap();
        assert_eq!(source.channels, 3);
        assert_eq!((source.width, source.height, source.frames), (5, 6, 7));
        assert_eq!(src.dims(), &[2, 5, 6, 7]);
    }

    #[test]
    fn channel_dimension_is_rotated_to_front() {
        let mut src = array(&[5, 2, 6, 7], ElementType::U8);
        src.set_u8(&[4, 1, 0, 0], 9);
        let source = infer_frame_source(&src).unwrap();
        assert_eq!(source.channels, 3);
        assert_eq!(source.array.dims(), &[3, 6, 7, 5]);
        assert_eq!(source.array.get_u8(&[1, 0, 0, 4]), Some(9));
        assert_eq!(source.array.get_u8(&[2, 0, 0, 4]), Some(0));
    }

    #[test]
    fn smallest_channel_dimension_wins() {
        assert_eq!(channel_dimension(&[4, 3, 3, 9]).unwrap(), (1, 3));
        assert_eq!(channel_dimension(&[64, 48, 10, 4]).unwrap(), (3, 4));
        assert_eq!(channel_dimension(&[64, 1, 10, 3]).unwrap(), (1, 1));
    }

    #[test]
    fn unsupported_sources() {
        assert!(matches!(
            infer_frame_source(&array(&[5, 6, 7, 8], ElementType::U8)),
            Err(Error::UnsupportedChannelCount(5))
        ));
        assert!(matches!(
            infer_frame_source(&array(&[5], ElementType::U8)),
            Err(Error::UnsupportedRank(1))
        ));
        assert!(matches!(
            infer_frame_source(&array(&[2, 2, 2, 2, 2], ElementType::U8)),
            Err(Error::UnsupportedRank(5))
        ));
        assert!(matches!(
            infer_frame_source(&array(&[8, 6], ElementType::F32)),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn signed_elements_are_encoded_unsigned() {
        let src = array(&[8, 6], ElementType::I16);
        let source = infer_frame_source(&src).unwrap();
        assert_eq!(source.element, ElementType::U16);
        assert_eq!(source.array.element(), ElementType::I16);
    }
}
