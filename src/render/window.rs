use anyhow::Result;
use minifb::{Key, Window, WindowOptions};

use super::canvas::Canvas;

/// minifb window showing a finished figure.
pub struct PlotWindow {
    window: Window,
}

impl PlotWindow {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(30);
        Ok(Self { window })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Blocks until the window is closed or Escape is pressed.
    pub fn show(&mut self, canvas: &Canvas) -> Result<()> {
        while self.is_open() {
            self.window
                .update_with_buffer(&canvas.buffer, canvas.width, canvas.height)?;
        }
        Ok(())
    }
}
