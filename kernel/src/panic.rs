// kernel/src/panic.rs

use core::panic::PanicInfo;

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    use core::fmt::Write;

    use crate::framebuffer::{Color, FRAMEBUFFER};

    x86_64::instructions::interrupts::disable();

    // Serial primero: funciona aunque el framebuffer esté tomado
    crate::serial_println_raw!("KERNEL PANIC: {}", info);

    // try_lock: el panic pudo ocurrir con el lock tomado
    if let Some(mut fb_lock) = FRAMEBUFFER.try_lock() {
        if let Some(fb) = fb_lock.as_mut() {
            fb.clear(Color::rgb(0, 0, 170));

            let mut writer = FramebufferWriter::new(fb, 10, 10);

            let _ = writeln!(writer, "KERNEL PANIC!");
            let _ = writeln!(writer, "========================================");
            let _ = writeln!(writer);

            if let Some(location) = info.location() {
                let _ = writeln!(writer, "Location:");
                let _ = writeln!(writer, "  File: {}", location.file());
                let _ = writeln!(writer, "  Line: {}", location.line());
                let _ = writeln!(writer);
            }

            let _ = writeln!(writer, "Message:");
            let _ = writeln!(writer, "  {}", info.message());
        }
    }

    loop {
        x86_64::instructions::hlt();
    }
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    crate::serial_println_raw!("[failed]");
    crate::serial_println_raw!("{}", info);
    crate::testing::exit_qemu(crate::testing::QemuExitCode::Failed)
}

// Escritor línea por línea para la pantalla de panic
#[cfg(not(test))]
struct FramebufferWriter<'a, 'b> {
    fb: &'a mut crate::framebuffer::Framebuffer<'b>,
    x: usize,
    y: usize,
    line_height: usize,
}

#[cfg(not(test))]
impl<'a, 'b> FramebufferWriter<'a, 'b> {
    fn new(fb: &'a mut crate::framebuffer::Framebuffer<'b>, x: usize, y: usize) -> Self {
        Self { fb, x, y, line_height: 10 }
    }
}

#[cfg(not(test))]
impl<'a, 'b> core::fmt::Write for FramebufferWriter<'a, 'b> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        use crate::framebuffer::Color;

        for line in s.lines() {
            self.fb
                .draw_text(self.x, self.y, line, Color::rgb(255, 255, 255), Color::rgb(0, 0, 170), 1);
            self.y += self.line_height;
        }
        if s.ends_with('\n') {
            self.y += self.line_height;
        }
        Ok(())
    }
}
