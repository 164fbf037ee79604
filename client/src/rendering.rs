use log::error;
use shared::Grid;
use std::io::Write;

/// Scalar state shown next to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderMeta {
    pub score: u64,
    pub over: bool,
    pub won: bool,
    pub best_score: u64,
    pub terminated: bool,
}

/// Presentation collaborator of the game controller.
pub trait Renderer: Send + 'static {
    fn render(&mut self, grid: &Grid, meta: &RenderMeta);

    /// Shows a message the user has to acknowledge.
    fn notify(&mut self, notice: &str);
}

/// Writes the board as tab-separated rows followed by the score lines.
pub struct TextRenderer<W> {
    out: W,
}

impl<W: Write + Send + 'static> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_frame(&mut self, grid: &Grid, meta: &RenderMeta) -> std::io::Result<()> {
        write!(self.out, "{}", grid)?;
        writeln!(self.out, "Score: {}", meta.score)?;
        writeln!(self.out, "Best: {}", meta.best_score)?;
        if meta.won {
            writeln!(self.out, "You win!")?;
        } else if meta.over {
            writeln!(self.out, "Game over!")?;
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl TextRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> Renderer for TextRenderer<W> {
    fn render(&mut self, grid: &Grid, meta: &RenderMeta) {
        if let Err(e) = self.write_frame(grid, meta) {
            error!("Failed to draw board: {}", e);
        }
    }

    fn notify(&mut self, notice: &str) {
        if let Err(e) = writeln!(self.out, "!! {}", notice) {
            error!("Failed to show notice: {}", e);
        }
    }
}
