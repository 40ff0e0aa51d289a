/*!
    Array element types.
*/

use std::fmt;

/**
    Element type of an array.

    Integer types map onto pixel channels; floating point types exist so
    that arrays produced elsewhere can be described, but no video pixel
    format carries them.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ElementType {
    /**
        Returns the number of bytes per element.
    */
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /**
        Returns true if this is a signed integer type.
    */
    pub const fn is_signed_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /**
        Returns true if this is a floating point type.
    */
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /**
        Returns the unsigned integer type of the same width, or `None`
        for floating point types.

        Unsigned types map to themselves.
    */
    pub const fn to_unsigned(self) -> Option<Self> {
        match self {
            Self::U8 | Self::I8 => Some(Self::U8),
            Self::U16 | Self::I16 => Some(Self::U16),
            Self::U32 | Self::I32 => Some(Self::U32),
            Self::U64 | Self::I64 => Some(Self::U64),
            Self::F32 | Self::F64 => None,
        }
    }

    /**
        Returns the unsigned integer type that is `bytes` wide.
    */
    pub const fn unsigned_of_size(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            8 => Some(Self::U64),
            _ => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_size() {
        assert_eq!(ElementType::U8.size(), 1);
        assert_eq!(ElementType::I16.size(), 2);
        assert_eq!(ElementType::F32.size(), 4);
        assert_eq!(ElementType::U64.size(), 8);
    }

    #[test]
    fn signed_maps_to_unsigned_of_same_width() {
        assert_eq!(ElementType::I8.to_unsigned(), Some(ElementType::U8));
        assert_eq!(ElementType::I16.to_unsigned(), Some(ElementType::U16));
        assert_eq!(ElementType::I64.to_unsigned(), Some(ElementType::U64));
        assert_eq!(ElementType::U32.to_unsigned(), Some(ElementType::U32));
        assert_eq!(ElementType::F64.to_unsigned(), None);
    }

    #[test]
    fn unsigned_of_size() {
        assert_eq!(ElementType::unsigned_of_size(1), Some(ElementType::U8));
        assert_eq!(ElementType::unsigned_of_size(8), Some(ElementType::U64));
        assert_eq!(ElementType::unsigned_of_size(3), None);
        assert_eq!(ElementType::unsigned_of_size(0), None);
    }

    #[test]
    fn classification() {
        assert!(ElementType::I32.is_signed_integer());
        assert!(!ElementType::U32.is_signed_integer());
        assert!(ElementType::F32.is_float());
        assert!(!ElementType::I8.is_float());
    }
}
