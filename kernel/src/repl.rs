// kernel/src/repl.rs
//
// Línea de comandos sobre el framebuffer.  Sin heap: la línea vive en un
// buffer fijo.  Consume el driver de teclado vía getchar.

use core::fmt::{self, Write};

use crate::framebuffer::{Color, FRAMEBUFFER};
use crate::keyboard::modifiers::Modifiers;
use crate::keyboard::KEYBOARD;

const LINE_CAPACITY: usize = 64;
const SCALE: usize = 2;
const CHAR_WIDTH: usize = 8 * SCALE;
const LINE_HEIGHT: usize = 20;

pub struct Repl {
    line: [u8; LINE_CAPACITY],
    len: usize,
    x: usize,
    y: usize,
    prompt: &'static str,
}

impl Repl {
    pub fn new(x: usize, y: usize) -> Self {
        Self {
            line: [0; LINE_CAPACITY],
            len: 0,
            x,
            y,
            prompt: "> ",
        }
    }

    pub fn handle_char(&mut self, c: u8) {
        match c {
            b'\n' => {
                self.newline();
                self.execute_command();
                self.show_prompt();
            }
            0x08 => {
                if self.len > 0 {
                    self.len -= 1;
                    self.redraw_line();
                }
            }
            0x20..=0x7E if self.len < LINE_CAPACITY => {
                self.line[self.len] = c;
                self.len += 1;
                self.draw_char(c);
            }
            _ => {}
        }
    }

    fn execute_command(&mut self) {
        // Copia local: los métodos de dibujo necesitan &mut self
        let mut line = [0u8; LINE_CAPACITY];
        line[..self.len].copy_from_slice(&self.line[..self.len]);
        let cmd = core::str::from_utf8(&line[..self.len]).unwrap_or("").trim();
        self.len = 0;

        match cmd {
            "help" => self.cmd_help(),
            "clear" => self.cmd_clear(),
            "mods" => self.cmd_mods(),
            "leds" => self.cmd_leds(),
            "flush" => {
                KEYBOARD.flush();
                self.println("Keyboard buffer flushed");
            }
            "keys" => self.cmd_keys(),
            "count" => self.cmd_count(),
            "panic" => panic!("User requested panic"),
            "" => {}
            _ if cmd.starts_with("echo ") => {
                let text = &cmd[5..];
                self.println(text);
            }
            _ => {
                self.println("Unknown command. Type 'help' for list.");
            }
        }
    }

    fn cmd_help(&mut self) {
        self.println("Available commands:");
        self.println("  help  - Show this message");
        self.println("  clear - Clear screen");
        self.println("  echo <text> - Print text");
        self.println("  mods  - Show live modifier state");
        self.println("  leds  - Sync lock LEDs to modifier state");
        self.println("  flush - Drop buffered key events");
        self.println("  keys  - Dump buffered key events");
        self.println("  count - Buffered/dropped event counters");
        self.println("  panic - Test panic handler");
    }

    fn cmd_clear(&mut self) {
        let mut fb = FRAMEBUFFER.lock();
        if let Some(fb) = fb.as_mut() {
            fb.clear(Color::rgb(0, 0, 0));
        }
        self.x = 10;
        self.y = 10;
    }

    fn cmd_mods(&mut self) {
        let mods = KEYBOARD.get_modifiers();
        self.print_fmt(format_args!("mods: {:#010b}", mods.bits()));

        const NAMES: [(Modifiers, &str); 8] = [
            (Modifiers::LEFT_SHIFT, "shift-left"),
            (Modifiers::RIGHT_SHIFT, "shift-right"),
            (Modifiers::LEFT_CTRL, "ctrl-left"),
            (Modifiers::RIGHT_CTRL, "ctrl-right"),
            (Modifiers::LEFT_ALT, "alt-left"),
            (Modifiers::RIGHT_ALT, "alt-right"),
            (Modifiers::CAPS_LOCK, "caps-lock"),
            (Modifiers::NUM_LOCK, "num-lock"),
        ];
        for (flag, name) in NAMES {
            if mods.contains(flag) {
                self.print_fmt(format_args!("  {}", name));
            }
        }
    }

    fn cmd_leds(&mut self) {
        let mods = KEYBOARD.get_modifiers();
        match KEYBOARD.set_leds(mods.caps_lock(), mods.num_lock(), false) {
            Ok(()) => self.println("LEDs synced to lock state"),
            Err(e) => self.print_fmt(format_args!("leds failed: {:?}", e)),
        }
    }

    fn cmd_keys(&mut self) {
        // Eventos que getchar no consumió (releases, teclas sin ASCII)
        let mut drained = 0;
        while let Some(event) = KEYBOARD.read_key() {
            self.print_fmt(format_args!(
                "sc={:#04x} ascii={:#04x} mods={:#04x} {}",
                event.scancode,
                event.ascii,
                event.modifiers.bits(),
                if event.pressed { "down" } else { "up" },
            ));
            drained += 1;
            if drained == 8 {
                break;
            }
        }
        if drained == 0 {
            self.println("no buffered events");
        }
    }

    fn cmd_count(&mut self) {
        self.print_fmt(format_args!(
            "buffered: {}  dropped: {}",
            KEYBOARD.buffer_count(),
            KEYBOARD.dropped_events()
        ));
    }

    fn print_fmt(&mut self, args: fmt::Arguments) {
        let mut out = FixedWriter::new();
        let _ = out.write_fmt(args);
        self.println(out.as_str());
    }

    fn println(&mut self, text: &str) {
        {
            let mut fb = FRAMEBUFFER.lock();
            if let Some(fb) = fb.as_mut() {
                fb.draw_text(
                    self.x,
                    self.y,
                    text,
                    Color::rgb(255, 255, 255),
                    Color::rgb(0, 0, 0),
                    SCALE,
                );
            }
        }
        self.newline();
    }

    fn draw_char(&mut self, c: u8) {
        let mut fb = FRAMEBUFFER.lock();
        if let Some(fb) = fb.as_mut() {
            fb.draw_char(
                self.x,
                self.y,
                c,
                Color::rgb(255, 255, 255),
                Color::rgb(0, 0, 0),
                SCALE,
            );
            self.x += CHAR_WIDTH;
        }
    }

    pub fn show_prompt(&mut self) {
        let mut fb = FRAMEBUFFER.lock();
        if let Some(fb) = fb.as_mut() {
            fb.draw_text(
                self.x,
                self.y,
                self.prompt,
                Color::rgb(0, 255, 0),
                Color::rgb(0, 0, 0),
                SCALE,
            );
            self.x += CHAR_WIDTH * self.prompt.len();
        }
    }

    fn newline(&mut self) {
        self.x = 10;
        self.y += LINE_HEIGHT;

        let mut fb = FRAMEBUFFER.lock();
        if let Some(fb) = fb.as_mut() {
            let (_, height) = fb.dimensions();
            if self.y + LINE_HEIGHT > height {
                // sin scroll: volvemos arriba
                fb.clear(Color::rgb(0, 0, 0));
                self.y = 10;
            }
        }
    }

    fn redraw_line(&mut self) {
        self.x = 10;
        {
            let mut fb = FRAMEBUFFER.lock();
            if let Some(fb) = fb.as_mut() {
                // Borrar la línea entera
                for i in 0..(LINE_CAPACITY + self.prompt.len()) {
                    fb.draw_char(
                        10 + i * CHAR_WIDTH,
                        self.y,
                        b' ',
                        Color::rgb(0, 0, 0),
                        Color::rgb(0, 0, 0),
                        SCALE,
                    );
                }
                fb.draw_text(
                    self.x,
                    self.y,
                    self.prompt,
                    Color::rgb(0, 255, 0),
                    Color::rgb(0, 0, 0),
                    SCALE,
                );
            }
        }
        self.x += CHAR_WIDTH * self.prompt.len();

        for i in 0..self.len {
            let c = self.line[i];
            self.draw_char(c);
        }
    }
}

/// fmt::Write sobre un buffer fijo; trunca en vez de fallar.
struct FixedWriter {
    buf: [u8; 80],
    len: usize,
}

impl FixedWriter {
    fn new() -> Self {
        Self { buf: [0; 80], len: 0 }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl fmt::Write for FixedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if self.len == self.buf.len() {
                break;
            }
            self.buf[self.len] = byte;
            self.len += 1;
        }
        Ok(())
    }
}
