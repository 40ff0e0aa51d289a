/*!
    Array shapes.
*/

use std::fmt;

use crate::element::ElementType;

/**
    Dimensions plus element type, without any backing data.

    Dimension 0 is the fastest varying one.
*/
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
    element: ElementType,
}

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>, element: ElementType) -> Self {
        Self {
            dims: dims.into(),
            element,
        }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    /**
        Returns the number of elements, which is the product of all dimensions.
    */
    pub fn nelem(&self) -> usize {
        self.dims.iter().product()
    }

    /**
        Returns the size in bytes of a dense array with this shape.
    */
    pub fn nbytes(&self) -> usize {
        self.nelem() * self.element.size()
    }

    /**
        Returns a copy of this shape with all unit dimensions removed.
    */
    pub fn packed(&self) -> Self {
        let (dims, _) = pack_dims(&self.dims);
        Self::new(dims, self.element)
    }

    /**
        Returns a copy of this shape with a different element type.
    */
    pub fn with_element(&self, element: ElementType) -> Self {
        Self::new(self.dims.clone(), element)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, ") {}", self.element)
    }
}

/**
    Drops unit dimensions from `dims`, preserving order.

    Returns the packed dimensions together with, for each input dimension,
    its position in the packed list (`None` when it was dropped).
*/
pub fn pack_dims(dims: &[usize]) -> (Vec<usize>, Vec<Option<usize>>) {
    let mut packed = Vec::with_capacity(dims.len());
    let mut positions = Vec::with_capacity(dims.len());
    for &dim in dims {
        if dim == 1 {
            positions.push(None);
        } else {
            positions.push(Some(packed.len()));
            packed.push(dim);
        }
    }
    (packed, positions)
}
