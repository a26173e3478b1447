// kernel/src/keyboard/ascii.rs
//
// Fixed US layout: resolved scancode -> printable byte (0 = none).
//
// Two tables indexed by set-1 code.  An entry is a letter iff its base
// byte is `a..=z`; CapsLock only flips those entries, so the digit and
// punctuation rows stay unaffected.

use super::modifiers::Modifiers;

/// Unshifted map.  Zeros cover modifiers, function keys and anything
/// without a printable representation.
static BASE_MAP: [u8; 128] = [
    // 0x00: esc, digit row
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    // 0x10: top letter row, enter, left ctrl
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    // 0x20: home row, left shift
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    // 0x30: bottom row, right shift, keypad *, alt, space, caps, F1-F5
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
    // 0x40: F6-F10, num lock, scroll lock, keypad
    0, 0, 0, 0, 0, 0, 0, b'7', b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1',
    // 0x50: keypad tail
    b'2', b'3', b'0', b'.', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x60
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x70
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Shifted map, same indexing.
static SHIFT_MAP: [u8; 128] = [
    // 0x00
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    // 0x10
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S',
    // 0x20
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    // 0x30
    b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
    // 0x40
    0, 0, 0, 0, 0, 0, 0, b'7', b'8', b'9', b'-', b'4', b'5', b'6', b'+', b'1',
    // 0x50
    b'2', b'3', b'0', b'.', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x60
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x70
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Resolve a scancode under the given modifier state.  Out-of-range and
/// unmapped codes yield 0, as do any ctrl/alt combinations.
pub fn translate(code: u8, modifiers: Modifiers) -> u8 {
    if modifiers.ctrl() || modifiers.alt() {
        return 0;
    }

    let Some(&base) = BASE_MAP.get(code as usize) else {
        return 0;
    };

    let letter = base.is_ascii_lowercase();
    let shifted = modifiers.shift() ^ (letter && modifiers.caps_lock());

    if shifted {
        SHIFT_MAP[code as usize]
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SC_A: u8 = 0x1E;
    const SC_1: u8 = 0x02;

    #[test_case]
    fn letter_shift_caps_truth_table() {
        assert_eq!(translate(SC_A, Modifiers::empty()), b'a');
        assert_eq!(translate(SC_A, Modifiers::LEFT_SHIFT), b'A');
        assert_eq!(translate(SC_A, Modifiers::CAPS_LOCK), b'A');
        // shift and caps cancel for letters
        assert_eq!(translate(SC_A, Modifiers::LEFT_SHIFT | Modifiers::CAPS_LOCK), b'a');
    }

    #[test_case]
    fn caps_lock_ignores_digit_row() {
        assert_eq!(translate(SC_1, Modifiers::CAPS_LOCK), b'1');
        assert_eq!(translate(SC_1, Modifiers::RIGHT_SHIFT), b'!');
        assert_eq!(translate(SC_1, Modifiers::RIGHT_SHIFT | Modifiers::CAPS_LOCK), b'!');
    }

    #[test_case]
    fn ctrl_and_alt_are_non_printable() {
        assert_eq!(translate(SC_A, Modifiers::LEFT_CTRL), 0);
        assert_eq!(translate(SC_A, Modifiers::RIGHT_ALT), 0);
        assert_eq!(translate(SC_A, Modifiers::LEFT_CTRL | Modifiers::LEFT_SHIFT), 0);
    }

    #[test_case]
    fn unmapped_and_out_of_range_yield_zero() {
        assert_eq!(translate(0x3B, Modifiers::empty()), 0); // F1
        assert_eq!(translate(0x7F, Modifiers::empty()), 0);
        assert_eq!(translate(0xE1, Modifiers::empty()), 0); // pause
        assert_eq!(translate(0xFF, Modifiers::empty()), 0);
    }
}
