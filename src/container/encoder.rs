//! Container encoder: wraps a payload in a bitmap-shaped file.

use crate::config::{
    BITMAP_MAGIC, BITS_PER_PIXEL, INFO_HEADER_SIZE, PIXEL_DATA_OFFSET, PRINT_RESOLUTION,
};

/// Encode a payload into a bitmap container.
///
/// Each 32-bit pixel carries four payload bytes. The image is shaped as close
/// to square as possible: `width = floor(sqrt(pixels))`, rounded up to one so
/// the empty payload still produces a well-formed (zero-pixel) container,
/// and `height = ceil(pixels / width)`. The four-byte field a bitmap header
/// conventionally reserves is repurposed to record the true payload length,
/// so [`decode`](super::decode) can strip the padding again.
///
/// All header fields are little-endian. The result is always
/// `54 + width * height * 4` bytes.
///
/// # Example
///
/// ```
/// use picshard::container::{decode, encode};
///
/// let container = encode(b"not a multiple of four");
/// assert_eq!(decode(&container).unwrap(), b"not a multiple of four");
/// ```
pub fn encode(payload: &[u8]) -> Vec<u8> {
    let pixels = (payload.len() as u64 + 3) / 4;
    let width = ((pixels as f64).sqrt() as u32).max(1);
    let height = (pixels as u32 + width - 1) / width;
    let area = width * height * 4;

    let mut out = Vec::with_capacity(PIXEL_DATA_OFFSET as usize + area as usize);

    // File header
    out.extend_from_slice(&BITMAP_MAGIC.to_le_bytes());
    out.extend_from_slice(&(PIXEL_DATA_OFFSET + area).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes()); // reserved field, repurposed
    out.extend_from_slice(&PIXEL_DATA_OFFSET.to_le_bytes());

    // Info header
    out.extend_from_slice(&INFO_HEADER_SIZE.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // color planes
    out.extend_from_slice(&BITS_PER_PIXEL.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // no compression
    out.extend_from_slice(&area.to_le_bytes());
    out.extend_from_slice(&PRINT_RESOLUTION.to_le_bytes());
    out.extend_from_slice(&PRINT_RESOLUTION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // palette colors
    out.extend_from_slice(&0u32.to_le_bytes()); // important colors

    // Pixel data: payload plus zero padding to the full rectangle
    out.extend_from_slice(payload);
    out.resize(PIXEL_DATA_OFFSET as usize + area as usize, 0);

    out
}
