// kernel/src/framebuffer.rs

use font8x8::legacy::BASIC_LEGACY;
use spin::Mutex;

/// Framebuffer global. `None` hasta que el bootloader nos entrega el buffer.
pub static FRAMEBUFFER: Mutex<Option<Framebuffer<'static>>> = Mutex::new(None);

pub fn init_global_framebuffer(fb: Framebuffer<'static>) {
    *FRAMEBUFFER.lock() = Some(fb);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

pub struct Framebuffer<'a> {
    buffer: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
    bytes_per_pixel: usize,
}

impl<'a> Framebuffer<'a> {
    pub fn new(
        buffer: &'a mut [u8],
        width: usize,
        height: usize,
        stride: usize,
        bytes_per_pixel: usize,
    ) -> Self {
        Self {
            buffer,
            width,
            height,
            stride,
            bytes_per_pixel,
        }
    }

    /// Limpia toda la pantalla con el color especificado
    pub fn clear(&mut self, color: Color) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.draw_pixel(x, y, color);
            }
        }
    }

    /// Dibuja un píxel. Fuera de rango: ignorado.
    pub fn draw_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }

        // Layout BGRx del bootloader
        let idx = (y * self.stride + x) * self.bytes_per_pixel;
        if idx + 3 < self.buffer.len() {
            self.buffer[idx] = color.b;
            self.buffer[idx + 1] = color.g;
            self.buffer[idx + 2] = color.r;
            self.buffer[idx + 3] = 0x00;
        }
    }

    /// Dibuja un carácter ASCII con la fuente 8x8, escalado
    pub fn draw_char(&mut self, x: usize, y: usize, ascii: u8, fg: Color, bg: Color, scale: usize) {
        let glyph: [u8; 8] = if (ascii as usize) < BASIC_LEGACY.len() {
            BASIC_LEGACY[ascii as usize]
        } else {
            BASIC_LEGACY[b'?' as usize]
        };

        for (row, &bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                let bit_set = (bits >> col) & 1 != 0;
                let color = if bit_set { fg } else { bg };

                for sy in 0..scale {
                    for sx in 0..scale {
                        self.draw_pixel(x + col * scale + sx, y + row * scale + sy, color);
                    }
                }
            }
        }
    }

    /// Dibuja texto a partir de (x, y)
    pub fn draw_text(&mut self, x: usize, y: usize, text: &str, fg: Color, bg: Color, scale: usize) {
        let char_width = 8 * scale;

        for (i, &byte) in text.as_bytes().iter().enumerate() {
            self.draw_char(x + i * char_width, y, byte, fg, bg, scale);
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
