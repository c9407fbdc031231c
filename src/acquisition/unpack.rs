// src/acquisition/unpack.rs
//! Conversion from link-level transfer formats to output pixels
//!
//! Drivers advertise the layout in which they deliver frames. When it differs
//! from the advertised output bit depth, the engine grabs into a scratch
//! buffer and unpacks into the ring buffer slot with [`unpack_into`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Layout of the bytes a driver delivers for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferFormat {
    /// Bytes are already in output layout
    #[default]
    Native,
    /// Two 10-bit pixels in three bytes (GenICam `Mono10Packed`)
    Mono10Packed,
    /// Two 12-bit pixels in three bytes (GenICam `Mono12Packed`)
    Mono12Packed,
}

/// Unpacking errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnpackError {
    /// Input too short for the number of pixels
    #[error("packed input holds {actual} bytes, {required} required")]
    ShortInput {
        /// Bytes needed
        required: usize,
        /// Bytes supplied
        actual: usize,
    },
    /// Output too short for the number of pixels
    #[error("output holds {actual} bytes, {required} required")]
    ShortOutput {
        /// Bytes needed
        required: usize,
        /// Bytes supplied
        actual: usize,
    },
}

impl TransferFormat {
    /// Whether frames can be grabbed directly into a slot
    pub fn is_native(self) -> bool {
        self == TransferFormat::Native
    }

    /// Bytes on the wire for `pixels` pixels at `bytes_per_pixel` output size
    pub fn transfer_size(self, pixels: usize, bytes_per_pixel: usize) -> usize {
        match self {
            TransferFormat::Native => pixels * bytes_per_pixel,
            TransferFormat::Mono10Packed | TransferFormat::Mono12Packed => pixels.div_ceil(2) * 3,
        }
    }

    /// Significant bits per pixel after unpacking, `None` for native data
    pub fn pixel_bits(self) -> Option<u8> {
        match self {
            TransferFormat::Native => None,
            TransferFormat::Mono10Packed => Some(10),
            TransferFormat::Mono12Packed => Some(12),
        }
    }
}

/// Unpack `pixels` pixels from `input` into little-endian 16-bit `output`
pub fn unpack_into(
    format: TransferFormat,
    input: &[u8],
    output: &mut [u8],
    pixels: usize,
) -> Result<(), UnpackError> {
    let required_out = pixels * 2;
    if output.len() < required_out {
        return Err(UnpackError::ShortOutput {
            required: required_out,
            actual: output.len(),
        });
    }

    let required_in = format.transfer_size(pixels, 2);
    if input.len() < required_in {
        return Err(UnpackError::ShortInput {
            required: required_in,
            actual: input.len(),
        });
    }

    match format {
        TransferFormat::Native => {
            output[..required_out].copy_from_slice(&input[..required_out]);
        }
        TransferFormat::Mono10Packed => unpack_pairs(input, output, pixels, |b0, b1, b2| {
            let first = (u16::from(b0) << 2) | u16::from(b1 & 0x03);
            let second = (u16::from(b2) << 2) | u16::from((b1 >> 4) & 0x03);
            (first, second)
        }),
        TransferFormat::Mono12Packed => unpack_pairs(input, output, pixels, |b0, b1, b2| {
            let first = (u16::from(b0) << 4) | u16::from(b1 & 0x0F);
            let second = (u16::from(b2) << 4) | u16::from(b1 >> 4);
            (first, second)
        }),
    }

    Ok(())
}

/// Pack 16-bit pixels into a transfer format; inverse of [`unpack_into`]
///
/// Used by simulated drivers that emulate packed links.
pub fn pack_pixels(format: TransferFormat, pixels: &[u16], output: &mut [u8]) {
    match format {
        TransferFormat::Native => {
            for (chunk, pixel) in output.chunks_exact_mut(2).zip(pixels) {
                chunk.copy_from_slice(&pixel.to_le_bytes());
            }
        }
        TransferFormat::Mono10Packed | TransferFormat::Mono12Packed => {
            let low_bits = if format == TransferFormat::Mono10Packed { 2 } else { 4 };
            let low_mask = (1u16 << low_bits) - 1;

            for (chunk, pair) in output.chunks_exact_mut(3).zip(pixels.chunks(2)) {
                let first = pair[0];
                let second = pair.get(1).copied().unwrap_or(0);
                chunk[0] = (first >> low_bits) as u8;
                chunk[1] = ((first & low_mask) | ((second & low_mask) << 4)) as u8;
                chunk[2] = (second >> low_bits) as u8;
            }
        }
    }
}

fn unpack_pairs<F>(input: &[u8], output: &mut [u8], pixels: usize, decode: F)
where
    F: Fn(u8, u8, u8) -> (u16, u16),
{
    for (pair, packed) in input.chunks_exact(3).enumerate() {
        let (first, second) = decode(packed[0], packed[1], packed[2]);
        let base = pair * 2;

        if base < pixels {
            output[base * 2..base * 2 + 2].copy_from_slice(&first.to_le_bytes());
        }
        if base + 1 < pixels {
            output[base * 2 + 2..base * 2 + 4].copy_from_slice(&second.to_le_bytes());
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u16(buf: &[u8], index: usize) -> u16 {
        u16::from_le_bytes([buf[index * 2], buf[index * 2 + 1]])
    }

    #[test]
    fn test_mono12_known_layout() {
        // 0xABC and 0x123
        let input = [0xAB, 0x3C, 0x12];
        let mut output = [0u8; 4];
        unpack_into(TransferFormat::Mono12Packed, &input, &mut output, 2).unwrap();
        assert_eq!(read_u16(&output, 0), 0xABC);
        assert_eq!(read_u16(&output, 1), 0x123);
    }

    #[test]
    fn test_mono10_known_layout() {
        // 0x3FF and 0x001
        let input = [0xFF, 0x13, 0x00];
        let mut output = [0u8; 4];
        unpack_into(TransferFormat::Mono10Packed, &input, &mut output, 2).unwrap();
        assert_eq!(read_u16(&output, 0), 0x3FF);
        assert_eq!(read_u16(&output, 1), 0x001);
    }

    #[test]
    fn test_odd_pixel_count() {
        let pixels = [0x0FFFu16, 0x0800, 0x0123];
        let mut packed = vec![0u8; TransferFormat::Mono12Packed.transfer_size(3, 2)];
        assert_eq!(packed.len(), 6);
        pack_pixels(TransferFormat::Mono12Packed, &pixels, &mut packed);

        let mut output = [0u8; 6];
        unpack_into(TransferFormat::Mono12Packed, &packed, &mut output, 3).unwrap();
        for (i, &expected) in pixels.iter().enumerate() {
            assert_eq!(read_u16(&output, i), expected);
        }
    }

    #[test]
    fn test_short_buffers() {
        let mut output = [0u8; 2];
        assert!(matches!(
            unpack_into(TransferFormat::Mono12Packed, &[0u8; 3], &mut output, 2),
            Err(UnpackError::ShortOutput { required: 4, .. })
        ));

        let mut output = [0u8; 8];
        assert!(matches!(
            unpack_into(TransferFormat::Mono10Packed, &[0u8; 3], &mut output, 4),
            Err(UnpackError::ShortInput { required: 6, actual: 3 })
        ));
    }
}
