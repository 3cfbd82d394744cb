//! The output sink of layout: a list of placement commands in container coordinates
//! (origin at the container's top left, y growing downwards).

use crate::{colour::Colour, image::ImageId, metrics::FontId, Pt};

/// A glyph as placed on a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub id: u16,
    /// The advance the font itself applies after this glyph
    pub advance: Pt,
    /// Extra horizontal displacement after this glyph (kerning, justification)
    pub offset: Pt,
}

/// A run of glyphs sharing one font, size and colour, drawn from a single origin
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub x: Pt,
    pub baseline: Pt,
    pub font: FontId,
    pub size: Pt,
    pub colour: Colour,
    pub glyphs: Vec<PlacedGlyph>,
    /// The characters the glyphs were shaped from
    pub text: String,
}

impl GlyphRun {
    pub fn width(&self) -> Pt {
        self.glyphs.iter().map(|g| g.advance + g.offset).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasItem {
    Glyphs(GlyphRun),
    Rule {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        thickness: Pt,
        colour: Colour,
    },
    Image {
        image: ImageId,
        x: Pt,
        top: Pt,
        width: Pt,
        height: Pt,
    },
    /// A clickable area jumping to the destination called `target`
    Link {
        target: String,
        x: Pt,
        top: Pt,
        width: Pt,
        height: Pt,
    },
    /// A named position that links and outline entries can point to
    Destination { name: String, x: Pt, top: Pt },
}

impl CanvasItem {
    fn translate(&mut self, dx: Pt, dy: Pt) {
        match self {
            CanvasItem::Glyphs(run) => {
                run.x += dx;
                run.baseline += dy;
            }
            CanvasItem::Rule { x1, y1, x2, y2, .. } => {
                *x1 += dx;
                *x2 += dx;
                *y1 += dy;
                *y2 += dy;
            }
            CanvasItem::Image { x, top, .. }
            | CanvasItem::Link { x, top, .. }
            | CanvasItem::Destination { x, top, .. } => {
                *x += dx;
                *top += dy;
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    items: Vec<CanvasItem>,
}

impl Canvas {
    pub fn new() -> Canvas {
        Canvas::default()
    }

    pub fn push(&mut self, item: CanvasItem) {
        self.items.push(item);
    }

    /// Move every item of `other` by (`dx`, `dy`) and append it
    pub fn append(&mut self, other: Canvas, dx: Pt, dy: Pt) {
        self.items.extend(other.items.into_iter().map(|mut item| {
            item.translate(dx, dy);
            item
        }));
    }

    pub fn items(&self) -> &[CanvasItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every glyph run, in placement order
    pub fn glyph_runs(&self) -> impl Iterator<Item = &GlyphRun> {
        self.items.iter().filter_map(|item| match item {
            CanvasItem::Glyphs(run) => Some(run),
            _ => None,
        })
    }

    /// The text on the canvas, one entry per distinct baseline, top to bottom
    pub fn lines(&self) -> Vec<String> {
        let mut runs: Vec<&GlyphRun> = self.glyph_runs().collect();
        runs.sort_by(|a, b| {
            a.baseline
                .partial_cmp(&b.baseline)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut lines: Vec<(Pt, String)> = Vec::new();
        for run in runs {
            match lines.last_mut() {
                Some((baseline, text)) if baseline.approx_eq(run.baseline) => {
                    text.push_str(&run.text)
                }
                _ => lines.push((run.baseline, run.text.clone())),
            }
        }
        lines.into_iter().map(|(_, text)| text).collect()
    }
}
