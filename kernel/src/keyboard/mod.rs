// kernel/src/keyboard/mod.rs
//
// PS/2 keyboard driver (device side of the i8042).
//
// IRQ 1 feeds raw bytes through the decoder; resolved transitions update
// the modifier mask, get an ASCII translation and land as KeyEvents in a
// fixed ring.  Kernel code consumes them with read_key/getchar.
//
// The command path (enable/disable scanning, LEDs) talks to the device
// through the data port with the keyboard IRQ masked, so the handler
// cannot steal ACK bytes.  Every command waits for 0xFA with a bounded
// RESEND budget; on exhaustion the driver keeps its previous state.

pub mod ascii;
pub mod buffer;
pub mod decoder;
pub mod modifiers;

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use spin::Mutex;
use x86_64::instructions::interrupts;
use x86_64::instructions::port::{Port, PortReadOnly};

use crate::interrupts::pic;

use buffer::EventQueue;
use decoder::ScancodeDecoder;
use modifiers::Modifiers;

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;

// Status register bits
const STATUS_OUTPUT_FULL: u8 = 1 << 0;
const STATUS_INPUT_FULL: u8 = 1 << 1;

// Device commands
const CMD_SET_LEDS: u8 = 0xED;
const CMD_ENABLE_SCAN: u8 = 0xF4;
const CMD_DISABLE_SCAN: u8 = 0xF5;

// Device responses
const RESP_ACK: u8 = 0xFA;
const RESP_RESEND: u8 = 0xFE;
const RESP_ERROR: u8 = 0xFC;

/// Re-sends per command before giving up.
const MAX_RESENDS: u8 = 3;
/// Status poll iterations before a controller wait counts as timed out.
const POLL_BUDGET: u32 = 100_000;

/// One key transition, as seen by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Resolved logical scancode.
    pub scancode: u8,
    /// Printable byte, 0 if none.
    pub ascii: u8,
    /// Modifier snapshot at the moment of the event.
    pub modifiers: Modifiers,
    /// true = key-down, false = key-up.
    pub pressed: bool,
}

impl KeyEvent {
    const NONE: KeyEvent = KeyEvent {
        scancode: 0,
        ascii: 0,
        modifiers: Modifiers::empty(),
        pressed: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardError {
    NotInitialized,
    AlreadyInitialized,
    /// Device replied with an error, or the RESEND budget ran out.
    CommandFailed,
    /// Controller never became ready for a read/write.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum DriverState {
    Uninitialized = 0,
    Disabled = 1,
    Enabled = 2,
}

pub static KEYBOARD: Ps2Keyboard = Ps2Keyboard::new();

/// Controller data/status ports.  The Mutex serializes the command path;
/// the IRQ handler reads the data port directly (it never competes: the
/// command path runs with the keyboard IRQ masked).
static PORTS: Mutex<ControllerPorts> = Mutex::new(ControllerPorts::new());

struct ControllerPorts {
    data: Port<u8>,
    status: PortReadOnly<u8>,
}

impl ControllerPorts {
    const fn new() -> Self {
        Self {
            data: Port::new(DATA_PORT),
            status: PortReadOnly::new(STATUS_PORT),
        }
    }

    fn status(&mut self) -> u8 {
        unsafe { self.status.read() }
    }

    /// Poll until the device has a byte for us.
    fn wait_read_ready(&mut self) -> Result<(), KeyboardError> {
        for _ in 0..POLL_BUDGET {
            if self.status() & STATUS_OUTPUT_FULL != 0 {
                return Ok(());
            }
        }
        Err(KeyboardError::Timeout)
    }

    /// Poll until the controller accepts another byte from us.
    fn wait_write_ready(&mut self) -> Result<(), KeyboardError> {
        for _ in 0..POLL_BUDGET {
            if self.status() & STATUS_INPUT_FULL == 0 {
                return Ok(());
            }
        }
        Err(KeyboardError::Timeout)
    }

    fn read_data(&mut self) -> Result<u8, KeyboardError> {
        self.wait_read_ready()?;
        Ok(unsafe { self.data.read() })
    }

    fn write_data(&mut self, byte: u8) -> Result<(), KeyboardError> {
        self.wait_write_ready()?;
        unsafe { self.data.write(byte) };
        Ok(())
    }

    /// Non-blocking read, used to drain stale controller output.
    fn try_read_data(&mut self) -> Option<u8> {
        if self.status() & STATUS_OUTPUT_FULL != 0 {
            Some(unsafe { self.data.read() })
        } else {
            None
        }
    }

    /// Send one byte to the device and wait for its acknowledgment,
    /// honoring a bounded number of RESEND requests.
    fn send_expect_ack(&mut self, byte: u8) -> Result<(), KeyboardError> {
        for _ in 0..=MAX_RESENDS {
            self.write_data(byte)?;
            match self.read_data()? {
                RESP_ACK => return Ok(()),
                RESP_RESEND => continue,
                RESP_ERROR => return Err(KeyboardError::CommandFailed),
                // garbled response
                _ => return Err(KeyboardError::CommandFailed),
            }
        }
        Err(KeyboardError::CommandFailed)
    }
}

/// Driver context: decoder + modifier mask + event ring + lifecycle
/// state.  One instance for the one keyboard.
pub struct Ps2Keyboard {
    state: AtomicU8,
    /// Live modifier bitmask.  Written only by the interrupt path;
    /// consumers read snapshots.
    modifiers: AtomicU8,
    /// Events rejected because the ring was full.
    dropped: AtomicUsize,
    /// Decoder state, touched exclusively by the interrupt path.
    decoder: UnsafeCell<ScancodeDecoder>,
    queue: EventQueue,
}

// SAFETY: `decoder` is only accessed from the (non-reentrant) keyboard
// IRQ handler or while that IRQ is off; everything else is atomic or
// internally guarded.
unsafe impl Sync for Ps2Keyboard {}

impl Ps2Keyboard {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(DriverState::Uninitialized as u8),
            modifiers: AtomicU8::new(0),
            dropped: AtomicUsize::new(0),
            decoder: UnsafeCell::new(ScancodeDecoder::new()),
            queue: EventQueue::new(),
        }
    }

    fn state(&self) -> DriverState {
        match self.state.load(Ordering::Relaxed) {
            1 => DriverState::Disabled,
            2 => DriverState::Enabled,
            _ => DriverState::Uninitialized,
        }
    }

    /// One-time bring-up: drain stale controller output and clear all
    /// driver state.  The IRQ line must still be masked at this point;
    /// wiring the vector and unmasking stay with the kernel entry.
    pub fn init(&self) -> Result<(), KeyboardError> {
        let from = DriverState::Uninitialized as u8;
        let to = DriverState::Disabled as u8;
        if self
            .state
            .compare_exchange(from, to, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return Err(KeyboardError::AlreadyInitialized);
        }

        {
            let mut ports = PORTS.lock();
            while ports.try_read_data().is_some() {}
        }

        self.queue.clear();
        self.modifiers.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        // SAFETY: the keyboard IRQ is not delivered yet
        unsafe { (*self.decoder.get()).reset() };
        Ok(())
    }

    /// Ask the device to start scanning.  No command is sent when the
    /// driver is already enabled.
    pub fn enable(&self) -> Result<(), KeyboardError> {
        match self.state() {
            DriverState::Uninitialized => Err(KeyboardError::NotInitialized),
            DriverState::Enabled => Ok(()),
            DriverState::Disabled => {
                self.send_command(CMD_ENABLE_SCAN)?;
                self.state.store(DriverState::Enabled as u8, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Ask the device to stop scanning.  Idempotent like `enable`; on a
    /// failed command the driver stays enabled.
    pub fn disable(&self) -> Result<(), KeyboardError> {
        match self.state() {
            DriverState::Uninitialized => Err(KeyboardError::NotInitialized),
            DriverState::Disabled => Ok(()),
            DriverState::Enabled => {
                self.send_command(CMD_DISABLE_SCAN)?;
                self.state.store(DriverState::Disabled as u8, Ordering::Relaxed);
                Ok(())
            }
        }
    }

    /// Set the three lock LEDs.  Fails observably (never hangs) when the
    /// device does not acknowledge.
    pub fn set_leds(&self, caps: bool, num: bool, scroll: bool) -> Result<(), KeyboardError> {
        if self.state() == DriverState::Uninitialized {
            return Err(KeyboardError::NotInitialized);
        }
        let mask = (scroll as u8) | (num as u8) << 1 | (caps as u8) << 2;
        pic::with_keyboard_irq_masked(|| {
            let mut ports = PORTS.lock();
            ports.send_expect_ack(CMD_SET_LEDS)?;
            ports.send_expect_ack(mask)
        })
    }

    fn send_command(&self, command: u8) -> Result<(), KeyboardError> {
        // Masked so the IRQ handler cannot consume the ACK byte.
        pic::with_keyboard_irq_masked(|| {
            let mut ports = PORTS.lock();
            ports.send_expect_ack(command)
        })
    }

    /// IRQ 1 entry point.  Reads at most one byte and never blocks; the
    /// EOI stays with the caller.
    pub fn interrupt_handler(&self) {
        let status = unsafe { PortReadOnly::<u8>::new(STATUS_PORT).read() };
        if status & STATUS_OUTPUT_FULL == 0 {
            // spurious: nothing to read
            return;
        }
        let byte = unsafe { PortReadOnly::<u8>::new(DATA_PORT).read() };

        // Not enabled: the byte is drained (controller hygiene) but
        // produces no event.
        if self.state() != DriverState::Enabled {
            return;
        }
        self.handle_scancode(byte);
    }

    /// Decode pipeline: byte -> transition -> modifiers -> ASCII -> ring.
    fn handle_scancode(&self, byte: u8) {
        // SAFETY: interrupt path is the sole decoder user
        let transition = unsafe { (*self.decoder.get()).decode(byte) };
        let Some(transition) = transition else {
            return;
        };

        let mods = self.get_modifiers().apply(&transition);
        self.modifiers.store(mods.bits(), Ordering::Relaxed);

        let ascii = if transition.extended {
            0
        } else {
            ascii::translate(transition.code, mods)
        };

        let event = KeyEvent {
            scancode: transition.code,
            ascii,
            modifiers: mods,
            pressed: !transition.released,
        };

        if !self.queue.push(event) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Non-blocking: is at least one event buffered?
    pub fn has_key(&self) -> bool {
        self.queue.len() > 0
    }

    /// Non-blocking pop of the oldest event.
    pub fn read_key(&self) -> Option<KeyEvent> {
        self.queue.pop()
    }

    /// Block until a printable key-down arrives, discarding everything
    /// else.  Waits with sti+hlt between polls, so the IRQ path always
    /// gets to run; there is deliberately no timeout.
    pub fn getchar(&self) -> u8 {
        loop {
            interrupts::disable();
            match self.read_key() {
                Some(event) => {
                    interrupts::enable();
                    if event.pressed && event.ascii != 0 {
                        return event.ascii;
                    }
                }
                None => {
                    // The sti;hlt pair is atomic: an IRQ between the
                    // empty check and the halt still wakes us.
                    interrupts::enable_and_hlt();
                }
            }
        }
    }

    /// Snapshot of the live modifier mask.
    pub fn get_modifiers(&self) -> Modifiers {
        Modifiers::from_bits_retain(self.modifiers.load(Ordering::Relaxed))
    }

    pub fn buffer_count(&self) -> usize {
        self.queue.len()
    }

    /// Discard all buffered events.
    pub fn flush(&self) {
        self.queue.clear();
    }

    /// Events lost to ring overflow since init.
    pub fn dropped_events(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Test hook: run a byte through the decode pipeline without the
    /// hardware in the loop.
    #[cfg(test)]
    pub(crate) fn inject(&self, byte: u8) {
        self.handle_scancode(byte);
    }

    /// Test hook: clean slate for decoder, modifiers and ring.
    #[cfg(test)]
    pub(crate) fn reset_input_state(&self) {
        self.flush();
        self.modifiers.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        // SAFETY: the keyboard IRQ is never unmasked under the test harness
        unsafe { (*self.decoder.get()).reset() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_case]
    fn press_a_reaches_getchar() {
        KEYBOARD.reset_input_state();
        KEYBOARD.inject(0x1E);
        assert_eq!(KEYBOARD.getchar(), b'a');
        assert!(!KEYBOARD.has_key());
    }

    #[test_case]
    fn extended_key_has_no_ascii_but_is_readable() {
        KEYBOARD.reset_input_state();
        KEYBOARD.inject(0xE0);
        KEYBOARD.inject(0x48); // up arrow
        let event = KEYBOARD.read_key().unwrap();
        assert_eq!(event.scancode, 0x48);
        assert_eq!(event.ascii, 0);
        assert!(event.pressed);
    }

    #[test_case]
    fn getchar_skips_non_printable_events() {
        KEYBOARD.reset_input_state();
        KEYBOARD.inject(0xE0);
        KEYBOARD.inject(0x48); // arrow press, ascii 0
        KEYBOARD.inject(0xE0);
        KEYBOARD.inject(0xC8); // arrow release
        KEYBOARD.inject(0x1E); // 'a'
        assert_eq!(KEYBOARD.getchar(), b'a');
    }

    #[test_case]
    fn shift_is_reflected_in_event_snapshot() {
        KEYBOARD.reset_input_state();
        KEYBOARD.inject(0x2A); // left shift down
        KEYBOARD.inject(0x1E);
        KEYBOARD.inject(0xAA); // left shift up
        KEYBOARD.inject(0x1E);

        let shift_down = KEYBOARD.read_key().unwrap();
        assert!(shift_down.modifiers.shift());
        assert_eq!(shift_down.ascii, 0);

        let upper = KEYBOARD.read_key().unwrap();
        assert_eq!(upper.ascii, b'A');
        assert!(upper.modifiers.shift());

        let shift_up = KEYBOARD.read_key().unwrap();
        assert!(!shift_up.modifiers.shift());

        let lower = KEYBOARD.read_key().unwrap();
        assert_eq!(lower.ascii, b'a');
        assert_eq!(KEYBOARD.get_modifiers(), Modifiers::empty());
    }

    #[test_case]
    fn overflow_is_counted_and_oldest_survives() {
        KEYBOARD.reset_input_state();
        // alternate press/release so each byte emits one event
        for i in 0..=buffer::CAPACITY {
            let byte = if i % 2 == 0 { 0x1E } else { 0x9E };
            KEYBOARD.inject(byte);
        }
        assert_eq!(KEYBOARD.buffer_count(), buffer::CAPACITY);
        assert_eq!(KEYBOARD.dropped_events(), 1);
        let first = KEYBOARD.read_key().unwrap();
        assert!(first.pressed);
        assert_eq!(first.ascii, b'a');
        KEYBOARD.reset_input_state();
    }

    #[test_case]
    fn lifecycle_commands_are_idempotent() {
        // first and only init
        assert_eq!(KEYBOARD.init(), Ok(()));
        assert_eq!(KEYBOARD.init(), Err(KeyboardError::AlreadyInitialized));

        assert_eq!(KEYBOARD.enable(), Ok(()));
        assert_eq!(KEYBOARD.enable(), Ok(()));

        assert_eq!(KEYBOARD.disable(), Ok(()));
        // second disable: no command issued, still Ok
        assert_eq!(KEYBOARD.disable(), Ok(()));

        assert_eq!(KEYBOARD.set_leds(true, false, false), Ok(()));
        assert_eq!(KEYBOARD.set_leds(false, false, false), Ok(()));
    }
}
