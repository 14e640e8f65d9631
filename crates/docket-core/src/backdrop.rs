use std::io::Write;

use anyhow::anyhow;
use tracing::debug;

use crate::theme::{Palette, Rgb};

const DEFAULT_WIDTH: usize = 64;
const MIN_WIDTH: usize = 16;
const MAX_WIDTH: usize = 100;

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const WAVE: [usize; 16] = [1, 2, 3, 5, 6, 7, 7, 6, 5, 3, 2, 1, 0, 0, 0, 0];

/// Decorative banner drawn above the task list. Purely cosmetic: it is
/// rebuilt from scratch on every theme change and the session must keep
/// working when construction fails.
#[derive(Debug, Clone)]
pub struct Backdrop {
    palette: Palette,
    width: usize,
}

impl Backdrop {
    pub fn new(palette: Palette) -> anyhow::Result<Self> {
        let width = match std::env::var("COLUMNS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("COLUMNS is not a number: {raw}"))?,
            Err(_) => DEFAULT_WIDTH,
        };

        if width < MIN_WIDTH {
            return Err(anyhow!("terminal too narrow for backdrop: {width} columns"));
        }

        let width = width.min(MAX_WIDTH);
        debug!(width, "backdrop ready");
        Ok(Self { palette, width })
    }

    pub fn write_into<W: Write>(&self, out: &mut W, color: bool) -> std::io::Result<()> {
        self.write_ribbon(out, color, 0, self.palette.accent)?;
        self.write_ribbon(out, color, WAVE.len() / 2, self.palette.accent2)?;
        Ok(())
    }

    fn write_ribbon<W: Write>(
        &self,
        out: &mut W,
        color: bool,
        phase: usize,
        tint: Rgb,
    ) -> std::io::Result<()> {
        if color {
            let bg = self.palette.background;
            write!(
                out,
                "\x1b[38;2;{};{};{}m\x1b[48;2;{};{};{}m",
                tint.r, tint.g, tint.b, bg.r, bg.g, bg.b
            )?;
        }

        for x in 0..self.width {
            let level = WAVE[(x + phase) % WAVE.len()];
            write!(out, "{}", GLYPHS[level])?;
        }

        if color {
            write!(out, "\x1b[0m")?;
        }
        writeln!(out)
    }
}
