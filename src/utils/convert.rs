use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use crate::ConvertError;
use crate::Result;

/// Stable hash used for partition assignment. The same entity id must map
/// to the same value across restarts on the same build.
pub fn str_to_u64(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Converts a `u64` to an 8-byte array in big-endian byte order.
///
/// Big-endian keys keep sled range scans in sequence order.
///
/// # Examples
/// ```
/// use metasync::convert::safe_kv;
///
/// let bytes = safe_kv(0x1234_5678_9ABC_DEF0);
/// assert_eq!(bytes, [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0]);
/// ```
pub const fn safe_kv(num: u64) -> [u8; 8] {
    num.to_be_bytes()
}

/// Converts an 8-byte big-endian slice back to a `u64`.
pub fn safe_vk<K: AsRef<[u8]>>(bytes: K) -> Result<u64> {
    let bytes = bytes.as_ref();
    let expected_len = 8;

    if bytes.len() != expected_len {
        return Err(ConvertError::InvalidLength(bytes.len()).into());
    }
    let array: [u8; 8] = bytes.try_into().expect("Guaranteed safe after length check");
    Ok(u64::from_be_bytes(array))
}
