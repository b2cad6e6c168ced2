//! Compressed integer coding.
//!
//! Crate files store index tables as delta-coded integer streams: a common
//! delta value, two code bits per integer selecting the delta width, then
//! the per-integer deltas.
//!
//! See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/integerCoding.cpp#L40>

use std::{io, mem};

use anyhow::{bail, Result};
use num_traits::{AsPrimitive, PrimInt};

use super::reader::ReadExt;

const COMMON: u8 = 0;
const SMALL: u8 = 1;
const MEDIUM: u8 = 2;
const LARGE: u8 = 3;

/// Worst-case size of an encoded buffer holding `count` integers.
pub fn encoded_buffer_size<T: PrimInt>(count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let sz = mem::size_of::<T>();
    sz + (count * 2).div_ceil(8) + sz * count
}

/// Decode `count` delta-coded integers from `data`.
pub fn decode_ints<T: PrimInt + 'static>(data: &[u8], count: usize) -> Result<Vec<T>>
where
    i64: AsPrimitive<T>,
{
    let is_64_bit = mem::size_of::<T>() == 8;
    let num_code_bytes = (count * 2).div_ceil(8);

    let mut codes_reader = io::Cursor::new(data);

    let common_value = if is_64_bit {
        codes_reader.read_pod::<i64>()?
    } else {
        codes_reader.read_pod::<i32>()? as i64
    };

    let mut deltas_reader = {
        let offset = mem::size_of::<T>() + num_code_bytes;
        io::Cursor::new(&data[offset..])
    };

    let mut prev = 0_i64;
    let mut output = Vec::with_capacity(count);

    while output.len() < count {
        // One code byte covers the next (up to) 4 integers.
        let code_byte = codes_reader.read_pod::<u8>()?;
        let n = (count - output.len()).min(4);

        for i in 0..n {
            let ty = (code_byte >> (2 * i)) & 3;
            let delta = match ty {
                COMMON => common_value,

                // 64 bit targets
                SMALL if is_64_bit => deltas_reader.read_pod::<i16>()? as i64,
                MEDIUM if is_64_bit => deltas_reader.read_pod::<i32>()? as i64,
                LARGE if is_64_bit => deltas_reader.read_pod::<i64>()?,

                // 32 bit
                SMALL => deltas_reader.read_pod::<i8>()? as i64,
                MEDIUM => deltas_reader.read_pod::<i16>()? as i64,
                LARGE => deltas_reader.read_pod::<i32>()?.into(),

                _ => bail!("Unexpected integer code: {}", ty),
            };

            prev += delta;
            output.push(prev.as_());
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirror of the worked example in pxr's integerCoding.cpp:
    ///
    /// input  = [123, 124, 125, 100125, 100125, 100126, 100126]
    /// output = [int32(1) 01 00 00 11 01 00 01 XX int8(123) int32(100000) int8(0) int8(0)]
    fn example_buffer() -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&1_i32.to_le_bytes());

        // Two code bytes for 7 integers; big-endian write swaps into the
        // little-endian bit stream.
        let codes: u16 = 0b1100_0001_0001_0001;
        buffer.extend_from_slice(&codes.to_be_bytes());

        buffer.extend_from_slice(&123_i8.to_le_bytes());
        buffer.extend_from_slice(&100000_i32.to_le_bytes());
        buffer.extend_from_slice(&0_i16.to_le_bytes());

        buffer
    }

    #[test]
    fn test_decode() {
        let decoded = decode_ints::<u32>(&example_buffer(), 7).expect("Failed to decode integers");

        assert_eq!(decoded.as_slice(), &[123_u32, 124, 125, 100125, 100125, 100126, 100126]);
    }

    #[test]
    fn test_decode_empty() {
        let buffer = 0_i32.to_le_bytes();
        let decoded = decode_ints::<u32>(&buffer, 0).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_buffer_size() {
        assert_eq!(encoded_buffer_size::<u32>(0), 0);
        // 4 (common) + 1 (code byte) + 4 * 4 (worst case deltas)
        assert_eq!(encoded_buffer_size::<u32>(4), 21);
    }
}
