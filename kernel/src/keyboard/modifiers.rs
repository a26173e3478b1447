// kernel/src/keyboard/modifiers.rs
//
// Live modifier bitmask.  Shift/ctrl/alt follow the key level
// (press sets, release clears); CapsLock and NumLock toggle on press,
// like the physical LEDs.

use bitflags::bitflags;

use super::decoder::RawTransition;

// Set-1 codes for the modifier keys.  Ctrl and alt reuse one code each;
// the extended flag distinguishes right from left.
const SC_LEFT_SHIFT: u8 = 0x2A;
const SC_RIGHT_SHIFT: u8 = 0x36;
const SC_CTRL: u8 = 0x1D;
const SC_ALT: u8 = 0x38;
const SC_CAPS_LOCK: u8 = 0x3A;
const SC_NUM_LOCK: u8 = 0x45;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const LEFT_SHIFT = 1 << 0;
        const RIGHT_SHIFT = 1 << 1;
        const LEFT_CTRL = 1 << 2;
        const RIGHT_CTRL = 1 << 3;
        const LEFT_ALT = 1 << 4;
        const RIGHT_ALT = 1 << 5;
        const CAPS_LOCK = 1 << 6;
        const NUM_LOCK = 1 << 7;
    }
}

impl Modifiers {
    pub fn shift(self) -> bool {
        self.intersects(Self::LEFT_SHIFT | Self::RIGHT_SHIFT)
    }

    pub fn ctrl(self) -> bool {
        self.intersects(Self::LEFT_CTRL | Self::RIGHT_CTRL)
    }

    pub fn alt(self) -> bool {
        self.intersects(Self::LEFT_ALT | Self::RIGHT_ALT)
    }

    pub fn caps_lock(self) -> bool {
        self.contains(Self::CAPS_LOCK)
    }

    pub fn num_lock(self) -> bool {
        self.contains(Self::NUM_LOCK)
    }

    /// Apply one decoded transition and return the updated mask.
    pub fn apply(self, transition: &RawTransition) -> Modifiers {
        let mut mods = self;
        let pressed = !transition.released;

        match (transition.code, transition.extended) {
            (SC_LEFT_SHIFT, false) => mods.set(Self::LEFT_SHIFT, pressed),
            (SC_RIGHT_SHIFT, false) => mods.set(Self::RIGHT_SHIFT, pressed),
            (SC_CTRL, false) => mods.set(Self::LEFT_CTRL, pressed),
            (SC_CTRL, true) => mods.set(Self::RIGHT_CTRL, pressed),
            (SC_ALT, false) => mods.set(Self::LEFT_ALT, pressed),
            (SC_ALT, true) => mods.set(Self::RIGHT_ALT, pressed),
            // lock keys: only the press edge counts
            (SC_CAPS_LOCK, false) if pressed => mods.toggle(Self::CAPS_LOCK),
            (SC_NUM_LOCK, false) if pressed => mods.toggle(Self::NUM_LOCK),
            _ => {}
        }

        mods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: u8) -> RawTransition {
        RawTransition { code, extended: false, released: false }
    }

    fn release(code: u8) -> RawTransition {
        RawTransition { code, extended: false, released: true }
    }

    #[test_case]
    fn shift_press_release_round_trip() {
        let start = Modifiers::CAPS_LOCK;
        let held = start.apply(&press(SC_LEFT_SHIFT));
        assert!(held.shift());
        let end = held.apply(&release(SC_LEFT_SHIFT));
        assert_eq!(end, start);
    }

    #[test_case]
    fn caps_lock_toggles_on_press_only() {
        let mods = Modifiers::empty().apply(&press(SC_CAPS_LOCK));
        assert!(mods.caps_lock());
        let mods = mods.apply(&release(SC_CAPS_LOCK));
        assert!(mods.caps_lock());
        let mods = mods.apply(&press(SC_CAPS_LOCK));
        assert!(!mods.caps_lock());
    }

    #[test_case]
    fn num_lock_toggles_on_press_only() {
        let mods = Modifiers::empty().apply(&press(SC_NUM_LOCK));
        assert!(mods.num_lock());
        let mods = mods.apply(&release(SC_NUM_LOCK));
        assert!(mods.num_lock());
    }

    #[test_case]
    fn extended_flag_selects_right_side() {
        let t = RawTransition { code: SC_CTRL, extended: true, released: false };
        let mods = Modifiers::empty().apply(&t);
        assert!(mods.contains(Modifiers::RIGHT_CTRL));
        assert!(!mods.contains(Modifiers::LEFT_CTRL));

        let t = RawTransition { code: SC_ALT, extended: true, released: false };
        let mods = Modifiers::empty().apply(&t);
        assert!(mods.contains(Modifiers::RIGHT_ALT));
    }

    #[test_case]
    fn non_modifier_codes_leave_mask_unchanged() {
        let start = Modifiers::LEFT_SHIFT | Modifiers::NUM_LOCK;
        assert_eq!(start.apply(&press(0x1E)), start);
        assert_eq!(start.apply(&release(0x1E)), start);
    }
}
