//! Big-endian field conversion
//!
//! UBI headers and FAT metadata the C readers parse are stored big-endian.
//! These swap on a little-endian CPU (the JZ47xx runs mipsel) and are the
//! identity otherwise.

/// Convert a big-endian 32-bit value to native order
pub const fn bswap32(val: u32) -> u32 {
    if cfg!(target_endian = "little") {
        val.swap_bytes()
    } else {
        val
    }
}

/// Convert a big-endian 64-bit value to native order
pub const fn bswap64(val: u64) -> u64 {
    if cfg!(target_endian = "little") {
        val.swap_bytes()
    } else {
        val
    }
}

#[cfg(target_arch = "mips")]
mod c_abi {
    #[unsafe(no_mangle)]
    extern "C" fn __bswap32(val: u32) -> u32 {
        super::bswap32(val)
    }

    #[unsafe(no_mangle)]
    extern "C" fn __bswap64(val: u64) -> u64 {
        super::bswap64(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_big_endian_fields() {
        // UBI EC header magic "UBI#" as it sits in flash
        let raw = u32::from_ne_bytes(*b"UBI#");
        assert_eq!(bswap32(raw), 0x5542_4923);

        let raw = u64::from_ne_bytes([0, 0, 0, 0, 0, 0, 0x12, 0x34]);
        assert_eq!(bswap64(raw), 0x1234);
    }

    #[cfg(target_endian = "little")]
    #[test]
    fn swaps_on_little_endian() {
        assert_eq!(bswap32(0x1122_3344), 0x4433_2211);
        assert_eq!(bswap64(0x0102_0304_0506_0708), 0x0807_0605_0403_0201);
    }

    #[cfg(target_endian = "big")]
    #[test]
    fn identity_on_big_endian() {
        assert_eq!(bswap32(0x1122_3344), 0x1122_3344);
        assert_eq!(bswap64(0x0102_0304_0506_0708), 0x0102_0304_0506_0708);
    }

    proptest! {
        #[test]
        fn bswap32_is_an_involution(x in any::<u32>()) {
            prop_assert_eq!(bswap32(bswap32(x)), x);
        }

        #[test]
        fn bswap64_is_an_involution(x in any::<u64>()) {
            prop_assert_eq!(bswap64(bswap64(x)), x);
        }
    }
}
