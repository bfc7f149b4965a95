//! Minimal reader for the legacy Windows bitmap container.
//!
//! Only uncompressed 24-bit and 32-bit images are supported. Header fields are read at their fixed
//! little-endian offsets:
//!
//! | offset | size | field                      |
//! |-------:|-----:|----------------------------|
//! | 0      | 2    | type tag (`BM`)            |
//! | 2      | 4    | file size                  |
//! | 6      | 4    | reserved                   |
//! | 10     | 4    | pixel data offset          |
//! | 14     | 4    | info header size           |
//! | 18     | 4    | width (signed)             |
//! | 22     | 4    | height (signed, <0 = top-down) |
//! | 26     | 2    | colour planes              |
//! | 28     | 2    | bits per pixel             |
//! | 30     | 4    | compression                |
//! | 34     | 4    | image size                 |
//!
//! 32-bit images using `BI_BITFIELDS` compression carry red, green and blue masks at offset 54
//! (plus an alpha mask at 66 for headers of 56 bytes or more). Only the BGRA layout is accepted.

use crate::assets::decode::{DecodedImage, PixelOrder};
use crate::foundation::error::{AssetError, AssetResult};

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_MIN_LEN: usize = 40;
const TYPE_TAG: [u8; 2] = *b"BM";

const COMPRESSION_RGB: u32 = 0;
const COMPRESSION_BITFIELDS: u32 = 3;

const MASKS_OFFSET: usize = FILE_HEADER_LEN + INFO_HEADER_MIN_LEN;
const ALPHA_MASK_MIN_INFO_LEN: u32 = 56;
const BGRA_MASKS: [u32; 3] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF];
const BGRA_ALPHA_MASK: u32 = 0xFF00_0000;

/// Parsed file and info headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapHeader {
    pub file_size: u32,
    pub reserved: u32,
    pub data_offset: u32,
    pub info_size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bits_per_pixel: u16,
    pub compression: u32,
    pub image_size: u32,
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_i32(bytes: &[u8], at: usize) -> i32 {
    read_u32(bytes, at) as i32
}

impl BitmapHeader {
    /// Read both headers. Fails only when the buffer is too short or the type tag is wrong.
    pub fn parse(bytes: &[u8]) -> AssetResult<Self> {
        if bytes.len() < FILE_HEADER_LEN + INFO_HEADER_MIN_LEN {
            return Err(AssetError::decode(format!(
                "bitmap truncated: {} bytes is shorter than its headers",
                bytes.len()
            )));
        }
        if bytes[..2] != TYPE_TAG {
            return Err(AssetError::decode("bitmap type tag is not 'BM'"));
        }

        Ok(Self {
            file_size: read_u32(bytes, 2),
            reserved: read_u32(bytes, 6),
            data_offset: read_u32(bytes, 10),
            info_size: read_u32(bytes, 14),
            width: read_i32(bytes, 18),
            height: read_i32(bytes, 22),
            planes: read_u16(bytes, 26),
            bits_per_pixel: read_u16(bytes, 28),
            compression: read_u32(bytes, 30),
            image_size: read_u32(bytes, 34),
        })
    }

    /// Bytes per stored row, padded to 4 bytes.
    pub fn row_stride(&self) -> usize {
        (self.width.unsigned_abs() as usize * self.bits_per_pixel as usize).div_ceil(32) * 4
    }

    /// Rows are stored bottom-up unless the height is negative.
    pub fn is_bottom_up(&self) -> bool {
        self.height > 0
    }
}

/// Check that the `BI_BITFIELDS` channel masks describe plain BGRA bytes.
fn check_bgra_masks(header: &BitmapHeader, bytes: &[u8]) -> AssetResult<()> {
    let has_alpha = header.info_size >= ALPHA_MASK_MIN_INFO_LEN;
    let masks_end = MASKS_OFFSET + if has_alpha { 16 } else { 12 };
    if bytes.len() < masks_end || (header.data_offset as usize) < masks_end {
        return Err(AssetError::decode("bitmap channel masks are missing"));
    }

    let rgb = [
        read_u32(bytes, MASKS_OFFSET),
        read_u32(bytes, MASKS_OFFSET + 4),
        read_u32(bytes, MASKS_OFFSET + 8),
    ];
    let alpha = if has_alpha {
        read_u32(bytes, MASKS_OFFSET + 12)
    } else {
        0
    };
    if rgb != BGRA_MASKS || (alpha != 0 && alpha != BGRA_ALPHA_MASK) {
        return Err(AssetError::decode(format!(
            "unsupported bitmap channel masks r={:#010x} g={:#010x} b={:#010x} a={alpha:#010x}",
            rgb[0], rgb[1], rgb[2]
        )));
    }
    Ok(())
}

/// Decode an uncompressed bitmap into top-down BGRA8.
///
/// 24-bit rows gain an opaque alpha byte; 32-bit rows are copied as stored.
pub fn decode_bitmap(bytes: &[u8]) -> AssetResult<DecodedImage> {
    let header = BitmapHeader::parse(bytes)?;

    if header.width <= 0 || header.height == 0 {
        return Err(AssetError::decode(format!(
            "bitmap has invalid dimensions {}x{}",
            header.width, header.height
        )));
    }
    let bytes_per_src_px = match (header.bits_per_pixel, header.compression) {
        (24, COMPRESSION_RGB) => 3,
        (32, COMPRESSION_RGB) => 4,
        (32, COMPRESSION_BITFIELDS) => {
            check_bgra_masks(&header, bytes)?;
            4
        }
        (bits, compression) => {
            return Err(AssetError::decode(format!(
                "unsupported bitmap layout: {bits} bpp, compression {compression}"
            )));
        }
    };

    let width = header.width as u32;
    let height = header.height.unsigned_abs();
    let stride = header.row_stride();
    let start = header.data_offset as usize;
    let end = stride
        .checked_mul(height as usize)
        .and_then(|len| len.checked_add(start))
        .ok_or_else(|| AssetError::decode("bitmap pixel data size overflows"))?;
    if start < FILE_HEADER_LEN + INFO_HEADER_MIN_LEN || end > bytes.len() {
        return Err(AssetError::decode(format!(
            "bitmap pixel data [{start}, {end}) lies outside the {}-byte file",
            bytes.len()
        )));
    }

    let data = &bytes[start..end];
    let row_len = width as usize * bytes_per_src_px;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height as usize {
        let src_row = if header.is_bottom_up() {
            height as usize - 1 - y
        } else {
            y
        };
        let row = &data[src_row * stride..src_row * stride + row_len];
        if bytes_per_src_px == 4 {
            pixels.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(3) {
                pixels.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
            }
        }
    }

    Ok(DecodedImage {
        width,
        height,
        channels: 4,
        order: PixelOrder::Bgra,
        pixels,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/assets/bitmap.rs"]
mod tests;
