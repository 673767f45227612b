//! Shared constants for end-to-end tests

/// Timeout for the spawned server to answer its first request
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout applied to every request made by the test client
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Page size the test server is configured with
pub const TEST_PAGE_SIZE: usize = 10;

/// Item whose stock image exists in the test frontend directory
pub const ITEM_WITH_IMAGE: u32 = 1;

/// Item whose stock image is absent from the test frontend directory
pub const ITEM_WITHOUT_IMAGE: u32 = 2;

/// Smallest byte sequence recognized as a PNG
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Smallest byte sequence recognized as a JPEG
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];
