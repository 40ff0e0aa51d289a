/*!
    Arrays with owned storage, backed by [`ndarray`].
*/

use std::fmt;

use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, IxDyn, ShapeBuilder, Slice};

use crate::element::ElementType;
use crate::error::{Error, Result};
use crate::shape::Shape;

/**
    An N-dimensional array of elements of any [`ElementType`].

    Storage is an `ArrayD<u8>` in column-major order whose axis 0 walks
    the bytes of one element and whose remaining axes are the array
    dimensions, so dimension 0 is the fastest varying one and element
    values are stored in native byte order.
*/
#[derive(Clone, PartialEq, Eq)]
pub struct Array {
    shape: Shape,
    bytes: ArrayD<u8>,
}

impl Array {
    /**
        Create a zero-filled array.
    */
    pub fn zeros(shape: Shape) -> Self {
        let bytes = ArrayD::zeros(byte_dims(&shape).f());
        Self { shape, bytes }
    }

    /**
        Create an array from existing bytes laid out with dimension 0
        fastest.

        Fails with [`Error::ShapeMismatch`] if `data` is not exactly
        `shape.nbytes()` long.
    */
    pub fn from_bytes(shape: Shape, data: Vec<u8>) -> Result<Self> {
        if data.len() != shape.nbytes() {
            return Err(Error::shape_mismatch(format!(
                "{} bytes provided for shape {} ({} bytes)",
                data.len(),
                shape,
                shape.nbytes()
            )));
        }
        let bytes =
            ArrayD::from_shape_vec(byte_dims(&shape).f(), data).map_err(Error::shape_mismatch)?;
        Ok(Self { shape, bytes })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn element(&self) -> ElementType {
        self.shape.element()
    }

    /**
        Byte strides, one per dimension.
    */
    pub fn strides(&self) -> Vec<usize> {
        self.bytes.strides()[1..]
            .iter()
            .map(|&stride| stride.unsigned_abs())
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8] {
        // Storage is always contiguous.
        self.bytes.as_slice_memory_order().unwrap_or_default()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.bytes.as_slice_memory_order_mut().unwrap_or_default()
    }

    /**
        View of an array of one-byte elements, indexed by array dimensions.
    */
    pub fn view_u8(&self) -> Option<ArrayViewD<'_, u8>> {
        (self.element().size() == 1).then(|| self.bytes.index_axis(Axis(0), 0))
    }

    pub fn view_u8_mut(&mut self) -> Option<ArrayViewMutD<'_, u8>> {
        (self.element().size() == 1).then(|| self.bytes.index_axis_mut(Axis(0), 0))
    }

    pub fn get_u8(&self, index: &[usize]) -> Option<u8> {
        self.byte(index, 1, 0)
    }

    /**
        Set a one-byte element.

        # Panics

        Panics if the element type is not one byte wide or `index` is out of bounds.
    */
    pub fn set_u8(&mut self, index: &[usize], value: u8) {
        self.set_bytes(index, &[value]);
    }

    pub fn get_u16(&self, index: &[usize]) -> Option<u16> {
        let low = self.byte(index, 2, 0)?;
        let high = self.byte(index, 2, 1)?;
        Some(u16::from_ne_bytes([low, high]))
    }

    /**
        Set a two-byte element.

        # Panics

        Panics if the element type is not two bytes wide or `index` is out of bounds.
    */
    pub fn set_u16(&mut self, index: &[usize], value: u16) {
        self.set_bytes(index, &value.to_ne_bytes());
    }

    fn byte(&self, index: &[usize], width: usize, byte: usize) -> Option<u8> {
        if self.element().size() != width || index.len() != self.ndim() {
            return None;
        }
        self.bytes.get(byte_index(byte, index)).copied()
    }

    fn set_bytes(&mut self, index: &[usize], value: &[u8]) {
        assert_eq!(
            self.element().size(),
            value.len(),
            "element type {} is not {} bytes wide",
            self.element(),
            value.len()
        );
        assert_eq!(
            index.len(),
            self.ndim(),
            "index {index:?} has the wrong rank for {}",
            self.shape
        );
        for (byte, &b) in value.iter().enumerate() {
            self.bytes[byte_index(byte, index)] = b;
        }
    }

    /**
        Retag the elements with another type of the same width.

        The bytes are left untouched, so for example `I16` data read as
        `U16` keeps its two's complement bit patterns.
    */
    pub fn reinterpret(mut self, element: ElementType) -> Result<Self> {
        if element.size() != self.element().size() {
            return Err(Error::shape_mismatch(format!(
                "cannot reinterpret {} as {}",
                self.element(),
                element
            )));
        }
        self.shape = self.shape.with_element(element);
        Ok(self)
    }

    /**
        Returns a new array whose dimensions are rotated so that dimension
        `n` becomes dimension 0.

        The rotation is cyclic: dimensions `n..` come first, followed by
        `..n`, so `(a, b, c, d).shift_dims(2)` has shape `(c, d, a, b)`.

        # Panics

        Panics if `n` is not a valid dimension.
    */
    pub fn shift_dims(&self, n: usize) -> Self {
        let rank = self.ndim();
        assert!(n < rank, "dimension {n} out of range for rank {rank}");

        let axes: Vec<usize> = std::iter::once(0)
            .chain((n..rank).chain(0..n).map(|axis| axis + 1))
            .collect();
        let rotated = self.bytes.view().permuted_axes(axes);

        let mut out = Self::zeros(Shape::new(&rotated.shape()[1..], self.element()));
        out.bytes.assign(&rotated);
        out
    }

    /**
        Returns a new array with dimension `dim` grown to `len`.

        Existing elements keep their indices; new elements are zero.
    */
    pub fn padded(&self, dim: usize, len: usize) -> Result<Self> {
        if dim >= self.ndim() {
            return Err(Error::shape_mismatch(format!(
                "dimension {dim} out of range for {}",
                self.shape
            )));
        }
        let current = self.dims()[dim];
        if len < current {
            return Err(Error::shape_mismatch(format!(
                "cannot pad dimension {dim} of {} down to {len}",
                self.shape
            )));
        }

        let mut dims = self.dims().to_vec();
        dims[dim] = len;

        let mut out = Self::zeros(Shape::new(dims, self.element()));
        out.bytes
            .slice_axis_mut(Axis(dim + 1), Slice::from(..current))
            .assign(&self.bytes);
        Ok(out)
    }
}

impl From<ArrayD<u8>> for Array {
    fn from(values: ArrayD<u8>) -> Self {
        let mut array = Self::zeros(Shape::new(values.shape(), ElementType::U8));
        array.bytes.index_axis_mut(Axis(0), 0).assign(&values);
        array
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape)
            .field("strides", &self.strides())
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

fn byte_dims(shape: &Shape) -> IxDyn {
    let mut dims = Vec::with_capacity(shape.ndim() + 1);
    dims.push(shape.element().size());
    dims.extend_from_slice(shape.dims());
    IxDyn(&dims)
}

fn byte_index(byte: usize, index: &[usize]) -> IxDyn {
    let mut full = Vec::with_capacity(index.len() + 1);
    full.push(byte);
    full.extend_from_slice(index);
    IxDyn(&full)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, s};

    use super::*;

    fn counting(dims: &[usize]) -> Array {
        let shape = Shape::new(dims, ElementType::U8);
        let data = (0..shape.nbytes()).map(|i| i as u8).collect();
        Array::from_bytes(shape, data).unwrap()
    }

    #[test]
    fn from_bytes_checks_length() {
        let shape = Shape::new([2, 2], ElementType::U16);
        assert!(Array::from_bytes(shape.clone(), vec![0; 8]).is_ok());
        assert!(matches!(
            Array::from_bytes(shape, vec![0; 7]),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn strides_are_bytes_with_dimension_zero_fastest() {
        let a = Array::zeros(Shape::new([3, 4, 5], ElementType::U16));
        assert_eq!(a.strides(), vec![2, 6, 24]);
        assert_eq!(a.as_bytes().len(), 120);

        let b = counting(&[3, 4]);
        assert_eq!(b.get_u8(&[1, 2]), Some(7));
        assert_eq!(b.as_bytes()[7], 7);
    }

    #[test]
    fn typed_access() {
        let mut a = Array::zeros(Shape::new([3, 2], ElementType::U16));
        a.set_u16(&[2, 1], 0xBEEF);
        assert_eq!(a.get_u16(&[2, 1]), Some(0xBEEF));
        assert_eq!(a.get_u16(&[0, 0]), Some(0));
        assert_eq!(a.get_u16(&[3, 0]), None);
        assert_eq!(a.get_u16(&[2]), None);
        assert_eq!(a.get_u8(&[0, 0]), None);
        assert_eq!(&a.as_bytes()[10..], &0xBEEFu16.to_ne_bytes());
    }

    #[test]
    #[should_panic(expected = "not 1 bytes wide")]
    fn set_rejects_the_wrong_width() {
        let mut a = Array::zeros(Shape::new([2], ElementType::U16));
        a.set_u8(&[0], 1);
    }

    #[test]
    fn views_index_by_dimension() {
        let mut a = counting(&[2, 3]);
        let view = a.view_u8().unwrap();
        assert_eq!(view.shape(), &[2, 3]);
        assert_eq!(view[[1, 2]], 5);

        a.view_u8_mut().unwrap().slice_mut(s![.., 0]).fill(9);
        assert_eq!(a.as_bytes(), &[9, 9, 2, 3, 4, 5]);

        assert!(Array::zeros(Shape::new([2], ElementType::I16)).view_u8().is_none());
    }

    #[test]
    fn from_ndarray_keeps_indices() {
        let values = Array3::from_shape_fn((2, 3, 4), |(i, j, k)| (i + 10 * j + 50 * k) as u8);
        let a = Array::from(values.into_dyn());
        assert_eq!(a.dims(), &[2, 3, 4]);
        assert_eq!(a.get_u8(&[1, 2, 3]), Some(171));
        assert_eq!(a.as_bytes()[1], 1);
        assert_eq!(a.as_bytes()[2], 10);
    }

    #[test]
    fn shift_dims_rotates_cyclically() {
        let a = counting(&[2, 3, 4]);
        let b = a.shift_dims(1);
        assert_eq!(b.dims(), &[3, 4, 2]);
        assert_eq!(b.strides(), vec![1, 3, 12]);
        for ((i, j, k), _) in Array3::<u8>::zeros((2, 3, 4)).indexed_iter() {
            assert_eq!(a.get_u8(&[i, j, k]), b.get_u8(&[j, k, i]));
        }
    }

    #[test]
    fn shift_dims_keeps_wide_elements_whole() {
        let mut a = Array::zeros(Shape::new([2, 3], ElementType::U16));
        a.set_u16(&[1, 2], 0x1234);
        let b = a.shift_dims(1);
        assert_eq!(b.get_u16(&[2, 1]), Some(0x1234));
    }

    #[test]
    fn shift_dims_zero_is_copy() {
        let a = counting(&[2, 3]);
        assert_eq!(a.shift_dims(0), a);
    }

    #[test]
    fn padded_zero_fills() {
        let a = counting(&[2, 3]);
        let b = a.padded(0, 3).unwrap();
        assert_eq!(b.dims(), &[3, 3]);
        for j in 0..3 {
            assert_eq!(b.get_u8(&[0, j]), a.get_u8(&[0, j]));
            assert_eq!(b.get_u8(&[1, j]), a.get_u8(&[1, j]));
            assert_eq!(b.get_u8(&[2, j]), Some(0));
        }
    }

    #[test]
    fn padded_rejects_shrinking() {
        let a = counting(&[4, 3]);
        assert!(a.padded(0, 2).is_err());
        assert!(a.padded(2, 5).is_err());
    }

    #[test]
    fn reinterpret_same_width_only() {
        let a = Array::zeros(Shape::new([4], ElementType::I16));
        let b = a.clone().reinterpret(ElementType::U16).unwrap();
        assert_eq!(b.element(), ElementType::U16);
        assert_eq!(b.as_bytes(), a.as_bytes());
        assert!(a.reinterpret(ElementType::U8).is_err());
    }
}
