//! Turns a page [Canvas] into a PDF content stream.

use crate::{
    canvas::{Canvas, CanvasItem, GlyphRun},
    colour::Colour,
    metrics::{FontId, FontSet},
    Pt,
};
use std::io::Write;

/// Renders the drawable items of a canvas (glyphs, rules and images) as content
/// stream operators. Canvas coordinates run down from the top of the page, so every
/// y coordinate is flipped against `page_height`.
#[allow(clippy::write_with_newline)]
pub(crate) fn render_canvas(
    canvas: &Canvas,
    page_height: Pt,
    fonts: &FontSet,
) -> Result<Vec<u8>, std::io::Error> {
    let mut content: Vec<u8> = Vec::default();
    let mut text_state = TextState::default();

    for item in canvas.items() {
        match item {
            CanvasItem::Glyphs(run) => {
                render_glyph_run(&mut content, &mut text_state, run, page_height, fonts)?;
            }
            CanvasItem::Rule {
                x1,
                y1,
                x2,
                y2,
                thickness,
                colour,
            } => {
                write!(&mut content, "q\n")?;
                colour.write_stroke(&mut content)?;
                write!(&mut content, "{thickness} w\n")?;
                write!(&mut content, "{x1} {} m\n", page_height - *y1)?;
                write!(&mut content, "{x2} {} l\n", page_height - *y2)?;
                write!(&mut content, "S\nQ\n")?;
            }
            CanvasItem::Image {
                image,
                x,
                top,
                width,
                height,
            } => {
                write!(&mut content, "q\n")?;
                write!(
                    &mut content,
                    "{width} 0 0 {height} {x} {} cm\n",
                    page_height - *top - *height
                )?;
                write!(&mut content, "/I{} Do\n", image.index())?;
                write!(&mut content, "Q\n")?;
            }
            CanvasItem::Link { .. } | CanvasItem::Destination { .. } => {}
        }
    }

    Ok(content)
}

/// Graphics state already set in the stream, so runs only emit what changed
#[derive(Default)]
struct TextState {
    font: Option<(FontId, Pt)>,
    colour: Option<Colour>,
}

#[allow(clippy::write_with_newline)]
fn render_glyph_run(
    content: &mut Vec<u8>,
    state: &mut TextState,
    run: &GlyphRun,
    page_height: Pt,
    fonts: &FontSet,
) -> Result<(), std::io::Error> {
    if run.glyphs.is_empty() {
        return Ok(());
    }
    let face = fonts.get(run.font);

    if state.colour != Some(run.colour) {
        run.colour.write_fill(content)?;
        state.colour = Some(run.colour);
    }

    write!(content, "BT\n")?;
    // Tf is part of the text state, which outlives BT/ET; only emit it on change
    if state.font != Some((run.font, run.size)) {
        write!(content, "/F{} {} Tf\n", run.font.index(), run.size)?;
        state.font = Some((run.font, run.size));
    }
    write!(content, "{} {} Td\n", run.x, page_height - run.baseline)?;

    // glyphs are grouped into strings, split wherever a displacement is needed
    let mut bytes = Vec::new();
    write!(content, "[<")?;
    for glyph in run.glyphs.iter() {
        bytes.clear();
        face.encode(glyph.id, &mut bytes);
        for byte in bytes.iter() {
            write!(content, "{byte:02x}")?;
        }
        if !glyph.offset.approx_eq(Pt(0.0)) {
            let adjustment = -*glyph.offset / *run.size * 1000.0;
            write!(content, "> {adjustment} <")?;
        }
    }
    write!(content, ">] TJ\n")?;
    write!(content, "ET\n")?;
    Ok(())
}
