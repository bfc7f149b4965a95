use std::io::Cursor;

use super::*;

/// Hand-built 54-byte-header bitmap with the given signed height and raw rows.
fn build_bitmap(width: i32, height: i32, bits: u16, rows: &[Vec<u8>]) -> Vec<u8> {
    let data: Vec<u8> = rows.concat();
    let offset = 54u32;
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + data.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 16]);
    assert_eq!(out.len(), 54);
    out.extend_from_slice(&data);
    out
}

#[test]
fn header_fields_are_read_at_fixed_offsets() {
    let bmp = build_bitmap(1, 1, 32, &[vec![1, 2, 3, 4]]);
    let header = BitmapHeader::parse(&bmp).unwrap();
    assert_eq!(header.file_size, 58);
    assert_eq!(header.reserved, 0);
    assert_eq!(header.data_offset, 54);
    assert_eq!(header.info_size, 40);
    assert_eq!((header.width, header.height), (1, 1));
    assert_eq!(header.planes, 1);
    assert_eq!(header.bits_per_pixel, 32);
    assert_eq!(header.compression, 0);
    assert_eq!(header.image_size, 4);
}

#[test]
fn bottom_up_24bit_rows_are_flipped_and_padded_rows_skipped() {
    // 2x2, 24 bpp: 6 bytes per row padded to 8. First stored row is the bottom one.
    let bottom = vec![10, 11, 12, 13, 14, 15, 0, 0];
    let top = vec![20, 21, 22, 23, 24, 25, 0, 0];
    let bmp = build_bitmap(2, 2, 24, &[bottom, top]);

    let img = decode_bitmap(&bmp).unwrap();
    assert_eq!((img.width, img.height, img.channels), (2, 2, 4));
    assert_eq!(img.order, PixelOrder::Bgra);
    assert_eq!(
        img.pixels,
        vec![
            20, 21, 22, 255, 23, 24, 25, 255, //
            10, 11, 12, 255, 13, 14, 15, 255,
        ]
    );
}

#[test]
fn top_down_32bit_rows_are_copied_verbatim() {
    let bmp = build_bitmap(1, -2, 32, &[vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    let img = decode_bitmap(&bmp).unwrap();
    assert_eq!(img.pixels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn truncated_pixel_data_is_a_decode_error() {
    let bmp = build_bitmap(2, 2, 32, &[vec![0; 8], vec![0; 8]]);
    let err = decode_bitmap(&bmp[..bmp.len() - 1]).unwrap_err();
    assert!(err.to_string().contains("decode error:"));

    assert!(decode_bitmap(&bmp[..20]).is_err());
    assert!(decode_bitmap(&[]).is_err());
}

#[test]
fn wrong_tag_and_unsupported_depths_are_rejected() {
    let mut bmp = build_bitmap(1, 1, 32, &[vec![0; 4]]);
    bmp[0] = b'X';
    assert!(decode_bitmap(&bmp).is_err());

    let bmp = build_bitmap(1, 1, 8, &[vec![0; 4]]);
    assert!(decode_bitmap(&bmp).is_err());
}

#[test]
fn reads_bitmaps_written_by_the_image_crate() {
    let img = image::RgbImage::from_raw(3, 2, (0u8..18).collect()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Bmp)
        .unwrap();

    let decoded = decode_bitmap(&buf).unwrap();
    assert_eq!((decoded.width, decoded.height), (3, 2));
    // Top-left source pixel is RGB (0, 1, 2) -> BGRA (2, 1, 0, 255).
    assert_eq!(&decoded.pixels[..4], &[2, 1, 0, 255]);
}

/// 32 bpp `BI_BITFIELDS` bitmap with a 40-byte info header followed by three channel masks.
fn build_bitfields_bitmap(masks: [u32; 3], rows: &[Vec<u8>]) -> Vec<u8> {
    let mut out = build_bitmap(1, -(rows.len() as i32), 32, rows);
    let data = out.split_off(54);
    let offset = 66u32;
    out[2..6].copy_from_slice(&(offset + data.len() as u32).to_le_bytes());
    out[10..14].copy_from_slice(&offset.to_le_bytes());
    out[30..34].copy_from_slice(&COMPRESSION_BITFIELDS.to_le_bytes());
    for mask in masks {
        out.extend_from_slice(&mask.to_le_bytes());
    }
    out.extend_from_slice(&data);
    out
}

#[test]
fn bitfields_with_bgra_masks_decode_as_stored() {
    let bmp = build_bitfields_bitmap(BGRA_MASKS, &[vec![1, 2, 3, 4]]);
    let img = decode_bitmap(&bmp).unwrap();
    assert_eq!(img.order, PixelOrder::Bgra);
    assert_eq!(img.pixels, vec![1, 2, 3, 4]);
}

#[test]
fn bitfields_with_other_channel_masks_are_rejected() {
    let rgba = [0x0000_00FF, 0x0000_FF00, 0x00FF_0000];
    let err = decode_bitmap(&build_bitfields_bitmap(rgba, &[vec![1, 2, 3, 4]])).unwrap_err();
    assert!(err.to_string().contains("channel masks"));

    // Masks overlapping the pixel data are not masks at all.
    let mut bmp = build_bitfields_bitmap(BGRA_MASKS, &[vec![1, 2, 3, 4]]);
    bmp[10..14].copy_from_slice(&54u32.to_le_bytes());
    assert!(decode_bitmap(&bmp).is_err());
}

#[test]
fn reads_rgba_bitmaps_written_by_the_image_crate() {
    let img = image::RgbaImage::from_raw(2, 1, vec![10, 20, 30, 40, 50, 60, 70, 80]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Bmp)
        .unwrap();

    let header = BitmapHeader::parse(&buf).unwrap();
    assert_eq!(header.bits_per_pixel, 32);
    let decoded = decode_bitmap(&buf).unwrap();
    assert_eq!(decoded.pixels, vec![30, 20, 10, 40, 70, 60, 50, 80]);
}
