//! In-place hex digit writer
//!
//! Used to patch a counter into a fixed-width `0x0000…` field of an existing
//! token without any formatting machinery.

/// Marker that bounds a hex field on the left (`0x` prefix)
pub const FIELD_MARKER: u8 = b'x';

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Write `value` as lowercase hex, right to left, ending at `field[last_digit]`
///
/// At least one digit is always written. Writing stops once every significant
/// digit is out, when the next cursor position holds [`FIELD_MARKER`], or at
/// the start of the slice. Digits to the left that are not significant are
/// left untouched, so the field is expected to be pre-filled with `0`.
///
/// Returns the number of digits written.
pub fn write_hex_digits(value: u32, field: &mut [u8], last_digit: usize) -> usize {
    let mut value = value;
    let mut cursor = last_digit;
    let mut written = 0;

    loop {
        let Some(slot) = field.get_mut(cursor) else {
            break;
        };
        *slot = DIGITS[(value & 0xf) as usize];
        written += 1;
        value >>= 4;

        if value == 0 || cursor == 0 {
            break;
        }
        cursor -= 1;
        if field.get(cursor) == Some(&FIELD_MARKER) {
            break;
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode(digits: &[u8]) -> u32 {
        let text = core::str::from_utf8(digits).unwrap();
        u32::from_str_radix(text, 16).unwrap()
    }

    #[test]
    fn zero_writes_single_digit() {
        let mut field = *b"0xffff";
        assert_eq!(write_hex_digits(0, &mut field, 5), 1);
        assert_eq!(&field, b"0xfff0");
    }

    #[test]
    fn stops_at_marker_when_value_is_wider_than_field() {
        let mut field = *b"0x000";
        assert_eq!(write_hex_digits(0xdead_beef, &mut field, 4), 3);
        assert_eq!(&field, b"0xeef");
    }

    #[test]
    fn stops_at_slice_start_without_marker() {
        let mut field = *b"00";
        assert_eq!(write_hex_digits(0x1234, &mut field, 1), 2);
        assert_eq!(&field, b"34");
    }

    #[test]
    fn out_of_range_cursor_writes_nothing() {
        let mut field = *b"0x00";
        assert_eq!(write_hex_digits(0x12, &mut field, 9), 0);
        assert_eq!(&field, b"0x00");
    }

    #[test]
    fn two_words_fill_a_64_bit_field() {
        let mut field = *b"bootbench=0x0000000000000000";
        write_hex_digits(0x89ab_cdef, &mut field, 27);
        write_hex_digits(0x0123_4567, &mut field, 27 - 8);
        assert_eq!(&field, b"bootbench=0x0123456789abcdef");
    }

    proptest! {
        #[test]
        fn round_trips_through_eight_digit_field(value in any::<u32>()) {
            let mut field = *b"0x00000000";
            write_hex_digits(value, &mut field, 9);
            prop_assert_eq!(decode(&field[2..]), value);
        }

        #[test]
        fn never_writes_left_of_marker(value in any::<u32>(), width in 1usize..8) {
            let mut field = vec![b'#'; 2];
            field.push(FIELD_MARKER);
            field.extend(std::iter::repeat_n(b'0', width));
            let last = field.len() - 1;
            let written = write_hex_digits(value, &mut field, last);
            prop_assert!(written <= width);
            prop_assert_eq!(&field[..3], b"##x");
            let mask = if width >= 8 { u32::MAX } else { (1u32 << (4 * width)) - 1 };
            prop_assert_eq!(decode(&field[3..]), value & mask);
        }
    }
}
