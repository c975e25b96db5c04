//! Fixed-width binary codec for numeric arrays.
//!
//! Arrays of any dimension are written element by element in logical
//! row-major order as `f64` little-endian, with no shape prefix. The reader
//! fills a container that the caller has already sized.

use std::io::{Read, Write};

use ndarray::{ArrayBase, Data, DataMut, Dimension};

/// Write every element of `array` in row-major order.
pub fn write_array<S, D>(writer: &mut dyn Write, array: &ArrayBase<S, D>) -> std::io::Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    for value in array.iter() {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

/// Fill a pre-sized `array` in row-major order.
///
/// Fails with `UnexpectedEof` if the stream holds fewer elements than the array.
pub fn read_array_into<S, D>(reader: &mut dyn Read, array: &mut ArrayBase<S, D>) -> std::io::Result<()>
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    let mut buf = [0u8; 8];
    for value in array.iter_mut() {
        reader.read_exact(&mut buf)?;
        *value = f64::from_le_bytes(buf);
    }
    Ok(())
}
