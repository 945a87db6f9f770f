pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// colour channels stored per pixel (RGBA), so hosts can blit it as-is
pub const BYTES_PER_PIXEL: usize = 4;
pub const FRAME_SIZE_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * BYTES_PER_PIXEL;

const PIXEL_ON: [u8; BYTES_PER_PIXEL] = [0xff; BYTES_PER_PIXEL];
const PIXEL_OFF: [u8; BYTES_PER_PIXEL] = [0x00; BYTES_PER_PIXEL];

/// The 64x32 monochrome screen. Pixels are stored wide but are only ever
/// fully on or fully off.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Box<[u8]>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: vec![0; FRAME_SIZE_BYTES].into_boxed_slice(),
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// XOR one 8-pixel row onto the screen with its left edge at `(x, y)`,
    /// MSB first. Pixels past the right edge are dropped, as is a row below
    /// the bottom edge. Returns true if any lit pixel was switched off.
    pub fn draw_row(&mut self, x: usize, y: usize, bits: u8) -> bool {
        if y >= SCREEN_HEIGHT {
            return false;
        }
        let mut collision = false;
        for col in 0..8 {
            let px = x + col;
            if px >= SCREEN_WIDTH {
                break;
            }
            if bits & (0x80 >> col) == 0 {
                continue;
            }
            // collision is judged on the state before this pixel flips
            let was_set = self.is_set(px, y);
            collision |= was_set;
            self.set(px, y, !was_set);
        }
        collision
    }

    /// XOR a sprite onto the screen one row per byte, starting at `(x, y)`
    /// and going down. Returns true if any row collided.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut collision = false;
        for (row, &bits) in rows.iter().enumerate() {
            collision |= self.draw_row(x, y + row, bits);
        }
        collision
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.pixels[Self::offset(x, y)] != 0
    }

    /// every lit pixel as `(x, y)`
    pub fn lit_pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..SCREEN_WIDTH * SCREEN_HEIGHT)
            .map(|p| (p % SCREEN_WIDTH, p / SCREEN_WIDTH))
            .filter(move |&(x, y)| self.is_set(x, y))
    }

    /// raw RGBA rows, top to bottom
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    fn set(&mut self, x: usize, y: usize, on: bool) {
        let start = Self::offset(x, y);
        self.pixels[start..start + BYTES_PER_PIXEL].copy_from_slice(if on {
            &PIXEL_ON
        } else {
            &PIXEL_OFF
        });
    }

    fn offset(x: usize, y: usize) -> usize {
        (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..SCREEN_HEIGHT {
            let row: String = (0..SCREEN_WIDTH)
                .map(|x| if self.is_set(x, y) { '#' } else { '.' })
                .collect();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
