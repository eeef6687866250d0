//! Endian-aware, bounds-checked reads of primitive values from byte buffers.
//!
//! Everything in the metadata format is little-endian, so only the little-endian direction is
//! provided. The [`CilIO`] trait abstracts over the primitive types that appear in headers,
//! table rows and CIL operands; [`read_le_at`] reads one of them at a cursor and advances it.
//!
//! # Example
//!
//! ```rust,ignore
//! use clrscope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! let third: u32 = read_le_at(&data, &mut offset)?;
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! assert_eq!(offset, 8);
//! # Ok::<(), clrscope::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] if there are not enough bytes left in
//! the buffer. Callers map this to their domain specific error where it matters (signature
//! decoding, method bodies).

use crate::Result;

/// Primitive values that can be decoded from a fixed number of little-endian bytes.
pub trait CilIO: Sized {
    /// The byte array representation of this type
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Build the value from its little-endian representation
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_cil_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_cil_io!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a `T` from the start of `data`
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Read a `T` at `offset`, and advance `offset` by the size of `T`
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };

    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Read a 2 or 4 byte wide index at `offset`, widened to `u32`
///
/// Metadata columns that reference heaps or other tables are either 2 or 4 bytes wide
/// depending on the sizes of the referenced structures.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the read would exceed `data`
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_primitives() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<u16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_le::<i8>(&[0xFF]).unwrap(), -1);
        assert_eq!(read_le::<f32>(&1.5f32.to_le_bytes()).unwrap(), 1.5);
    }

    #[test]
    fn read_advances_offset() {
        let mut offset = 1;
        let value = read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap();
        assert_eq!(value, 0x0302);
        assert_eq!(offset, 3);
    }

    #[test]
    fn read_dyn() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn errors() {
        assert!(matches!(read_le::<u64>(&[0x01, 0x02]), Err(crate::Error::OutOfBounds)));

        let mut offset = 7;
        assert!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).is_err());
        assert_eq!(offset, 7);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }
}
