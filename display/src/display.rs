use std::io::{self, Stdout, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::Print;
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use chip8_core::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, PIXEL_OFF};
use chip8_core::FrameBuffer;

const LIT: char = '█';
const DARK: char = ' ';

/// # Display
/// The Chip-8 display is composed of 64x32 black/white pixels.
/// This paints them into a terminal, one block character per lit cell.
///
/// Terminal cells are about twice as tall as they are wide, so each pixel takes
/// `2 * scale` columns and `scale` rows.
/// The display only gets a call to `render` when the Chip-8 FrameBuffer is updated.
pub struct Display {
    out: Stdout,
    scale: usize,
}

impl Display {
    /// Takes over the terminal: raw mode, alternate screen, hidden cursor.
    ///
    /// # Arguments
    /// * `scale` the size multiplier for each pixel
    pub fn new(scale: usize) -> crossterm::Result<Self> {
        let mut out = io::stdout();
        enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(Display {
            out,
            scale: scale.max(1),
        })
    }

    /// Whether the terminal can show the whole frame at this scale
    pub fn fits(&self) -> crossterm::Result<bool> {
        let (columns, rows) = terminal::size()?;
        Ok(usize::from(columns) >= DISPLAY_WIDTH * 2 * self.scale
            && usize::from(rows) >= DISPLAY_HEIGHT * self.scale)
    }

    /// Formats the Chip-8 FrameBuffer as terminal rows and paints them.
    ///
    /// # Arguments
    /// * `frame` a Chip-8 FrameBuffer
    pub fn render(&mut self, frame: &FrameBuffer) -> crossterm::Result<()> {
        for (y, row) in frame_to_rows(frame, self.scale).iter().enumerate() {
            queue!(self.out, MoveTo(0, y as u16), Print(row))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        // Nothing sensible to do if the terminal can't be restored
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Expands a Chip-8 FrameBuffer into the text rows that draw it.
///
/// # Arguments
/// * `frame` a Chip-8 FrameBuffer
/// * `scale` the size multiplier for each pixel
pub fn frame_to_rows(frame: &FrameBuffer, scale: usize) -> Vec<String> {
    let scale = scale.max(1);
    frame
        .iter()
        .map(|pixels| {
            pixels
                .iter()
                .flat_map(|&px| {
                    let cell = if px == PIXEL_OFF { DARK } else { LIT };
                    std::iter::repeat(cell).take(2 * scale)
                })
                .collect::<String>()
        })
        .flat_map(|row| std::iter::repeat(row).take(scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chip8_core::constants::PIXEL_ON;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frame_to_rows() {
        let mut frame: FrameBuffer = [[PIXEL_OFF; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        frame[0][1] = PIXEL_ON;
        frame[1][0] = PIXEL_ON;
        let rows = frame_to_rows(&frame, 1);

        assert_eq!(rows.len(), 32);
        assert!(rows.iter().all(|row| row.chars().count() == 128));
        assert_eq!(rows[0].chars().take(4).collect::<String>(), "  ██");
        assert_eq!(rows[1].chars().take(4).collect::<String>(), "██  ");
        assert_eq!(rows[2], " ".repeat(128));
    }

    #[test]
    fn test_frame_to_rows_scales() {
        let mut frame: FrameBuffer = [[PIXEL_OFF; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        frame[0][0] = PIXEL_ON;
        let rows = frame_to_rows(&frame, 3);

        assert_eq!(rows.len(), 96);
        assert!(rows.iter().all(|row| row.chars().count() == 384));
        for row in &rows[..3] {
            assert_eq!(row.chars().take(7).collect::<String>(), "██████ ");
        }
        assert_eq!(rows[3], " ".repeat(384));
    }

    #[test]
    fn test_frame_to_rows_zero_scale_is_one() {
        let frame: FrameBuffer = [[PIXEL_ON; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        let rows = frame_to_rows(&frame, 0);
        assert_eq!(rows.len(), 32);
        assert_eq!(rows[0], "█".repeat(128));
    }
}
