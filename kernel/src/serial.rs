// kernel/src/serial.rs
//
// COM1 (0x3F8) debug output, two flavors:
//
//   1. `Serial` behind a Mutex, used by serial_print!/serial_println!.
//      For general kernel code.  Do NOT use inside interrupt handlers
//      (deadlock if the interrupted code holds the lock).
//
//   2. `RawSerialWriter`: no lock, no allocation, full format_args!
//      support.  Usable from interrupt handlers and the panic path.
//      Concurrent writers may interleave bytes; acceptable for debug
//      output.

use core::fmt;
use spin::Mutex;
use x86_64::instructions::port::Port;

const COM1: u16 = 0x3F8;

static SERIAL: Mutex<Serial> = Mutex::new(Serial::new());

struct Serial {
    port: Port<u8>,
}

impl Serial {
    const fn new() -> Self {
        Self { port: Port::new(COM1) }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            unsafe {
                self.port.write(byte);
            }
        }
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    let _ = SERIAL.lock().write_fmt(args);
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

/// Lock-free serial writer for contexts where `SERIAL` may already be
/// held: interrupt handlers and panic.  `format_args!` is fully
/// stack-based, so this path never allocates.
pub struct RawSerialWriter;

impl fmt::Write for RawSerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            unsafe {
                Port::<u8>::new(COM1).write(byte);
            }
        }
        Ok(())
    }
}

/// Lock-free print with full formatting support.
#[macro_export]
macro_rules! serial_print_raw {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::serial::RawSerialWriter, $($arg)*);
    }};
}

/// Lock-free println with full formatting support.
#[macro_export]
macro_rules! serial_println_raw {
    () => ($crate::serial_print_raw!("\n"));
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = writeln!($crate::serial::RawSerialWriter, $($arg)*);
    }};
}
