// kernel/src/keyboard/decoder.rs
//
// Scancode decoder: raw bytes from the controller -> key transitions.
//
// Pure state machine.  No I/O, never blocks; the state persists across
// interrupts so the hardware may split one logical key over several IRQs.
// Release transitions arrive either as the 0x80 break bit (set 1) or as
// an 0xF0 prefix (set 2); both are accepted.

/// Marks the next code as an extended key (right-ctrl, arrows, ...).
pub const EXTENDED_PREFIX: u8 = 0xE0;
/// Marks the next code as a key release.
pub const RELEASE_PREFIX: u8 = 0xF0;
/// Starts the Pause/Break sequence: two more bytes follow.
pub const PAUSE_PREFIX: u8 = 0xE1;

/// Logical code reported for the whole Pause/Break sequence.  Reusing the
/// prefix value keeps it outside the 7-bit range of every one-byte code,
/// so Pause can never alias NumLock (0x45 appears inside the raw
/// sequence).
pub const PAUSE_CODE: u8 = 0xE1;

const PAUSE_SEQUENCE_BYTES: u8 = 2;

/// One resolved key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTransition {
    /// Resolved single logical code (prefixes already folded in).
    pub code: u8,
    /// The 0xE0 prefix preceded this code.
    pub extended: bool,
    /// Key-up rather than key-down.
    pub released: bool,
}

/// Decoder context.  Invariant: at most one pending prefix at a time; a
/// newer prefix byte always wins and restarts sequence accumulation.
#[derive(Debug)]
pub struct ScancodeDecoder {
    extended: bool,
    release: bool,
    pause_remaining: u8,
}

impl ScancodeDecoder {
    pub const fn new() -> Self {
        Self {
            extended: false,
            release: false,
            pause_remaining: 0,
        }
    }

    pub fn reset(&mut self) {
        self.extended = false;
        self.release = false;
        self.pause_remaining = 0;
    }

    /// Feed one raw byte.  Returns a transition once a sequence resolves.
    pub fn decode(&mut self, byte: u8) -> Option<RawTransition> {
        // Mid-Pause bytes are absorbed, unless a new prefix aborts the
        // sequence (newest prefix is authoritative).
        if self.pause_remaining > 0 && !is_prefix(byte) {
            self.pause_remaining -= 1;
            if self.pause_remaining > 0 {
                return None;
            }
            let released = byte & 0x80 != 0;
            self.reset();
            return Some(RawTransition {
                code: PAUSE_CODE,
                extended: false,
                released,
            });
        }

        match byte {
            EXTENDED_PREFIX => {
                self.reset();
                self.extended = true;
                None
            }
            RELEASE_PREFIX => {
                self.reset();
                self.release = true;
                None
            }
            PAUSE_PREFIX => {
                self.reset();
                self.pause_remaining = PAUSE_SEQUENCE_BYTES;
                None
            }
            _ => {
                let transition = RawTransition {
                    code: byte & 0x7F,
                    extended: self.extended,
                    released: self.release || byte & 0x80 != 0,
                };
                self.reset();
                Some(transition)
            }
        }
    }
}

fn is_prefix(byte: u8) -> bool {
    matches!(byte, EXTENDED_PREFIX | RELEASE_PREFIX | PAUSE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn plain_byte_emits_one_transition() {
        let mut dec = ScancodeDecoder::new();
        let t = dec.decode(0x1E).unwrap();
        assert_eq!(t.code, 0x1E);
        assert!(!t.extended);
        assert!(!t.released);
    }

    #[test_case]
    fn break_bit_marks_release() {
        let mut dec = ScancodeDecoder::new();
        let t = dec.decode(0x9E).unwrap();
        assert_eq!(t.code, 0x1E);
        assert!(t.released);
    }

    #[test_case]
    fn release_prefix_marks_release() {
        let mut dec = ScancodeDecoder::new();
        assert!(dec.decode(RELEASE_PREFIX).is_none());
        let t = dec.decode(0x1E).unwrap();
        assert_eq!(t.code, 0x1E);
        assert!(t.released);
        // flag cleared for the next sequence
        assert!(!dec.decode(0x1E).unwrap().released);
    }

    #[test_case]
    fn extended_prefix_sets_flag_once() {
        let mut dec = ScancodeDecoder::new();
        assert!(dec.decode(EXTENDED_PREFIX).is_none());
        let t = dec.decode(0x48).unwrap();
        assert!(t.extended);
        assert!(!dec.decode(0x48).unwrap().extended);
    }

    #[test_case]
    fn emission_count_matches_terminal_bytes() {
        let mut dec = ScancodeDecoder::new();
        let stream = [0x1E, 0xE0, 0x48, 0x9E, 0xF0, 0x2A, 0xE0, 0xB8];
        let emitted = stream.iter().filter(|&&b| dec.decode(b).is_some()).count();
        // 5 terminal bytes, 3 prefixes
        assert_eq!(emitted, 5);
    }

    #[test_case]
    fn pause_sequence_absorbs_two_bytes() {
        let mut dec = ScancodeDecoder::new();
        assert!(dec.decode(PAUSE_PREFIX).is_none());
        assert!(dec.decode(0x1D).is_none());
        let t = dec.decode(0x45).unwrap();
        assert_eq!(t.code, PAUSE_CODE);
        assert!(!t.released);

        assert!(dec.decode(PAUSE_PREFIX).is_none());
        assert!(dec.decode(0x9D).is_none());
        assert!(dec.decode(0xC5).unwrap().released);
    }

    #[test_case]
    fn newest_prefix_wins() {
        let mut dec = ScancodeDecoder::new();
        // doubled extended prefix
        assert!(dec.decode(EXTENDED_PREFIX).is_none());
        assert!(dec.decode(EXTENDED_PREFIX).is_none());
        assert!(dec.decode(0x48).unwrap().extended);

        // release then extended: extended is authoritative
        assert!(dec.decode(RELEASE_PREFIX).is_none());
        assert!(dec.decode(EXTENDED_PREFIX).is_none());
        let t = dec.decode(0x48).unwrap();
        assert!(t.extended);
        assert!(!t.released);

        // a prefix aborts a pending Pause countdown
        assert!(dec.decode(PAUSE_PREFIX).is_none());
        assert!(dec.decode(EXTENDED_PREFIX).is_none());
        let t = dec.decode(0x48).unwrap();
        assert!(t.extended);
        assert_eq!(t.code, 0x48);
    }
}
