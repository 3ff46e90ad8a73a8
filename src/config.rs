//! Configuration constants for picshard.

/// Reserved filename of the index container in every synchronized directory.
pub const INDEX_FILENAME: &str = "__index.bmp";

/// Extension used for all container files.
pub const CONTAINER_EXTENSION: &str = "bmp";

/// Maximum payload carried by a single chunk container (16 MiB).
pub const CHUNK_CEILING: u64 = 2048 * 2048 * 4;

/// Bitmap magic ("BM", little-endian).
pub const BITMAP_MAGIC: u16 = 0x4D42;

/// Byte offset of the pixel data in every container (14-byte file header
/// plus 40-byte info header).
pub const PIXEL_DATA_OFFSET: u32 = 54;

/// Size of the info header in bytes.
pub const INFO_HEADER_SIZE: u32 = 40;

/// Bits per pixel; each pixel carries four payload bytes.
pub const BITS_PER_PIXEL: u16 = 32;

/// Print resolution written into both axes of the info header
/// (2835 pixels/metre = 72 DPI).
pub const PRINT_RESOLUTION: u32 = 2835;

/// Attempts at picking a random chunk name before giving up.
pub const CHUNK_NAME_ATTEMPTS: u32 = 64;
