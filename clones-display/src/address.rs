//! Address abbreviation.

use clones_core::constants::{
    ADDRESS_STRING_LEN, SHORT_ADDRESS_PREFIX_LEN, SHORT_ADDRESS_SEPARATOR,
    SHORT_ADDRESS_SUFFIX_OFFSET,
};

/// Abbreviates a `0x`-prefixed address to its first six and last four
/// characters, e.g. `0x49cF...A28B`.
///
/// An empty input yields an empty string. Anything that is not exactly 42
/// ASCII characters is returned unchanged.
pub fn short_address(address: &str) -> String {
    if address.len() != ADDRESS_STRING_LEN || !address.is_ascii() {
        return address.to_string();
    }

    format!(
        "{}{}{}",
        &address[..SHORT_ADDRESS_PREFIX_LEN],
        SHORT_ADDRESS_SEPARATOR,
        &address[SHORT_ADDRESS_SUFFIX_OFFSET..]
    )
}
