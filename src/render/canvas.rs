use crate::source::Frame;

/// Where an image landed on the canvas: canvas = offset + image * scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Placement {
    pub fn map(&self, px: f32, py: f32) -> (i32, i32) {
        ((self.x + px * self.scale).round() as i32, (self.y + py * self.scale).round() as i32)
    }
}

/// `0xRRGGBB` pixel buffer, the layout minifb displays directly.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub width: usize,
    pub height: usize,
    pub buffer: Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, background: u32) -> Self {
        Self { width, height, buffer: vec![background; width * height] }
    }

    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.buffer[y * self.width + x]
    }

    /// Sets one pixel; coordinates off the canvas are dropped.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }

    /// Draws a one-pixel line with Bresenham's algorithm, endpoints included.
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Draws a filled disc used for joint markers.
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Outline only.
    pub fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let (x1, y1) = (x + w, y + h);
        self.draw_line(x, y, x1, y, color);
        self.draw_line(x1, y, x1, y1, color);
        self.draw_line(x1, y1, x, y1, color);
        self.draw_line(x, y1, x, y, color);
    }

    /// Scales `frame` to fit the `w x h` region at `(x, y)`, keeping its aspect
    /// ratio and centring it. Nearest-neighbour sampling.
    pub fn blit_fit(&mut self, frame: &Frame, x: usize, y: usize, w: usize, h: usize) -> Placement {
        let fw = frame.width() as usize;
        let fh = frame.height() as usize;
        if fw == 0 || fh == 0 || w == 0 || h == 0 {
            return Placement { x: x as f32, y: y as f32, scale: 1.0 };
        }

        let scale = (w as f32 / fw as f32).min(h as f32 / fh as f32);
        let out_w = ((fw as f32 * scale) as usize).clamp(1, w);
        let out_h = ((fh as f32 * scale) as usize).clamp(1, h);
        let ox = x + (w - out_w) / 2;
        let oy = y + (h - out_h) / 2;

        for cy in 0..out_h {
            let sy = ((cy as f32 / scale) as usize).min(fh - 1);
            for cx in 0..out_w {
                let sx = ((cx as f32 / scale) as usize).min(fw - 1);
                self.set_pixel((ox + cx) as i32, (oy + cy) as i32, frame.rgb(sx, sy));
            }
        }

        Placement { x: ox as f32, y: oy as f32, scale }
    }
}
