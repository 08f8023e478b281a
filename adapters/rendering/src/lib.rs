#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Wayfinder adapters.
//!
//! Renderers consume immutable [`SceneSnapshot`] values and never touch the
//! simulation directly.

use anyhow::Result as AnyResult;
use std::{error::Error, fmt, io::Write};
use wayfinder_core::{Cell, CellCoord, DisplayColor, ObjectRegistry, SceneSnapshot};

const ANSI_RESET: &str = "\x1b[0m";

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Byte RGB channels, rounded to the nearest value.
    #[must_use]
    pub fn to_rgb_u8(self) -> (u8, u8, u8) {
        (
            channel_to_u8(self.red),
            channel_to_u8(self.green),
            channel_to_u8(self.blue),
        )
    }
}

impl From<DisplayColor> for Color {
    fn from(color: DisplayColor) -> Self {
        Self::from_rgb_u8(color.red(), color.green(), color.blue())
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Glyphs for everything that is not an obstacle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Glyphs {
    /// Cell the agent occupies.
    pub agent: char,
    /// Goal cell.
    pub goal: char,
    /// Previously visited cell.
    pub trail: char,
    /// Empty cell.
    pub empty: char,
}

impl Glyphs {
    fn reserved(&self) -> [char; 4] {
        [self.agent, self.goal, self.trail, self.empty]
    }
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            agent: 'U',
            goal: 'X',
            trail: '+',
            empty: '.',
        }
    }
}

/// Colors for the agent, goal and trail when drawing with ANSI escapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    /// Agent color.
    pub agent: Color,
    /// Goal color.
    pub goal: Color,
    /// Trail color.
    pub trail: Color,
}

impl Default for Palette {
    fn default() -> Self {
        let agent = Color::from_rgb_u8(0x00, 0x80, 0x00);
        Self {
            agent,
            goal: Color::from_rgb_u8(0xff, 0x00, 0x00),
            trail: agent.lighten(0.5),
        }
    }
}

/// Consumer of simulation snapshots.
pub trait Renderer {
    /// Presents one snapshot.
    fn draw(&mut self, snapshot: &SceneSnapshot) -> AnyResult<()>;
}

/// Errors that can occur when constructing renderers.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// A registry key is also used for the agent, goal, trail or empty glyph.
    GlyphCollision {
        /// Key claimed twice.
        key: char,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlyphCollision { key } => {
                write!(f, "display key '{key}' is already used by a scene glyph")
            }
        }
    }
}

impl Error for RenderingError {}

/// Renders snapshots as text rows.
#[derive(Debug)]
pub struct TextRenderer<W> {
    writer: W,
    registry: ObjectRegistry,
    glyphs: Glyphs,
    palette: Option<Palette>,
}

impl<W> TextRenderer<W>
where
    W: Write,
{
    /// Creates a plain text renderer writing to `writer`.
    pub fn new(writer: W, registry: ObjectRegistry) -> Result<Self, RenderingError> {
        Self::with_glyphs(writer, registry, Glyphs::default())
    }

    /// Creates a renderer with custom scene glyphs.
    pub fn with_glyphs(
        writer: W,
        registry: ObjectRegistry,
        glyphs: Glyphs,
    ) -> Result<Self, RenderingError> {
        let reserved = glyphs.reserved();
        if let Some((_, display)) = registry
            .iter()
            .find(|(_, display)| reserved.contains(&display.key))
        {
            return Err(RenderingError::GlyphCollision { key: display.key });
        }

        Ok(Self {
            writer,
            registry,
            glyphs,
            palette: None,
        })
    }

    /// Enables truecolor ANSI output using the provided palette.
    #[must_use]
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn paint(&self, glyph: char, color: Option<Color>) -> String {
        match (self.palette, color) {
            (Some(_), Some(color)) => {
                let (red, green, blue) = color.to_rgb_u8();
                format!("\x1b[38;2;{red};{green};{blue}m{glyph}{ANSI_RESET}")
            }
            _ => glyph.to_string(),
        }
    }

    fn cell_glyph(&self, snapshot: &SceneSnapshot, cell: CellCoord) -> String {
        let palette = self.palette.unwrap_or_default();
        if cell == snapshot.agent {
            return self.paint(self.glyphs.agent, Some(palette.agent));
        }
        if cell == snapshot.goal {
            return self.paint(self.glyphs.goal, Some(palette.goal));
        }
        match snapshot.occupant(cell) {
            Some(occupant @ (Cell::StaticObstacle(_) | Cell::MobileObstacle(..))) => {
                let display = occupant.kind().and_then(|kind| self.registry.display(kind));
                match display {
                    Some(display) => self.paint(display.key, Some(display.color.into())),
                    None => self.paint('?', None),
                }
            }
            _ if snapshot.trail.contains(&cell) => {
                self.paint(self.glyphs.trail, Some(palette.trail))
            }
            _ => self.paint(self.glyphs.empty, None),
        }
    }

    /// Text rows for `snapshot`, top row first.
    #[must_use]
    pub fn frame(&self, snapshot: &SceneSnapshot) -> Vec<String> {
        (0..snapshot.rows)
            .map(|row| {
                (0..snapshot.columns)
                    .map(|column| {
                        self.cell_glyph(snapshot, CellCoord::new(column, row))
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }
}

impl<W> Renderer for TextRenderer<W>
where
    W: Write,
{
    fn draw(&mut self, snapshot: &SceneSnapshot) -> AnyResult<()> {
        for line in self.frame(snapshot) {
            writeln!(self.writer, "{line}")?;
        }
        writeln!(
            self.writer,
            "tick {} | {:?} | trail {}",
            snapshot.tick,
            snapshot.state,
            snapshot.trail.len()
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Legend lines describing every glyph a [`TextRenderer`] may draw.
#[must_use]
pub fn legend(registry: &ObjectRegistry) -> Vec<String> {
    legend_with(registry, Glyphs::default())
}

/// Legend lines for custom scene glyphs.
#[must_use]
pub fn legend_with(registry: &ObjectRegistry, glyphs: Glyphs) -> Vec<String> {
    registry
        .iter()
        .map(|(kind, display)| format!("{} = {}", display.key, kind.name()))
        .chain([
            format!("{} = Agent", glyphs.agent),
            format!("{} = Goal", glyphs.goal),
            format!("{} = Trail", glyphs.trail),
        ])
        .collect()
}
