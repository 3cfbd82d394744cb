//! Words: the units that line breaking works with, shaped into glyphs up front.

use super::{Flowable, LayoutContext};
use crate::{
    canvas::PlacedGlyph,
    metrics::Glyph,
    structure::Note,
    style::TextStyle,
    text::{Span, SpanContent},
    Pt,
};
use std::{fmt, rc::Rc};

/// Lower-case letters in small caps are drawn as capitals scaled by this much
const SMALL_CAPS_SCALE: f32 = 0.8;

#[derive(Clone)]
pub(crate) enum WordKind {
    Text,
    Space,
    Tab,
    Newline,
    Inline(Rc<dyn Flowable>),
}

impl fmt::Debug for WordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordKind::Text => f.write_str("Text"),
            WordKind::Space => f.write_str("Space"),
            WordKind::Tab => f.write_str("Tab"),
            WordKind::Newline => f.write_str("Newline"),
            WordKind::Inline(flowable) => write!(f, "Inline({})", flowable.name()),
        }
    }
}

/// Glyphs shaped from one run of characters in a single style
#[derive(Debug, Clone)]
pub(crate) struct WordPart {
    pub style: Rc<TextStyle>,
    /// The size the glyphs are drawn at, which small caps reduce
    pub size: Pt,
    /// The source characters
    pub text: String,
    pub glyphs: Vec<PlacedGlyph>,
    pub width: Pt,
    pub link: Option<String>,
    pub note: Option<Rc<Note>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Word {
    pub kind: WordKind,
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn width(&self) -> Pt {
        self.parts.iter().map(|part| part.width).sum()
    }

    pub fn text(&self) -> String {
        self.parts.iter().map(|part| part.text.as_str()).collect()
    }

    pub fn is_space(&self) -> bool {
        matches!(self.kind, WordKind::Space)
    }

    /// Split a text word after `chars` characters, reshaping the halves so kerning
    /// and ligatures are right on both sides of the break, and ending the first half
    /// with a hyphen
    pub fn split(&self, chars: usize, ctx: &mut LayoutContext<'_>) -> (Word, Word) {
        let mut first = Vec::new();
        let mut second = Vec::new();
        let mut remaining = chars;
        for part in self.parts.iter() {
            let count = part.text.chars().count();
            if remaining >= count {
                first.push(part.clone());
                remaining -= count;
            } else if remaining == 0 {
                second.push(part.clone());
            } else {
                let (byte, _) = part
                    .text
                    .char_indices()
                    .nth(remaining)
                    .unwrap_or((part.text.len(), ' '));
                let (head, tail) = part.text.split_at(byte);
                first.extend(shape(&part.style, head, part.link.clone(), None, ctx));
                second.extend(shape(
                    &part.style,
                    tail,
                    part.link.clone(),
                    part.note.clone(),
                    ctx,
                ));
                remaining = 0;
            }
        }

        if let Some(last) = first.last() {
            let style = last.style.clone();
            first.extend(shape(&style, "-", None, None, ctx));
        }
        (
            Word {
                kind: WordKind::Text,
                parts: first,
            },
            Word {
                kind: WordKind::Text,
                parts: second,
            },
        )
    }
}

/// Break spans into words. Runs of non-whitespace become one text word, even when
/// they cross span boundaries; every space, tab and line break is a word of its own.
pub(crate) fn words(spans: Vec<Span>, ctx: &mut LayoutContext<'_>) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Vec<WordPart> = Vec::new();

    fn finish(current: &mut Vec<WordPart>, words: &mut Vec<Word>) {
        if !current.is_empty() {
            words.push(Word {
                kind: WordKind::Text,
                parts: std::mem::take(current),
            });
        }
    }

    for span in spans {
        let whitespace = |kind: WordKind, text: &str, ctx: &mut LayoutContext<'_>| Word {
            kind,
            parts: shape(&span.style, text, span.link.clone(), None, ctx),
        };
        match &span.content {
            SpanContent::Text(text) => {
                let mut run = String::new();
                for ch in text.chars() {
                    let kind = match ch {
                        ' ' => WordKind::Space,
                        '\t' => WordKind::Tab,
                        '\n' => WordKind::Newline,
                        '\r' => continue,
                        _ => {
                            run.push(ch);
                            continue;
                        }
                    };
                    if !run.is_empty() {
                        let parts = shape(
                            &span.style,
                            &run,
                            span.link.clone(),
                            span.note.clone(),
                            ctx,
                        );
                        join(&mut current, parts, ctx);
                        run.clear();
                    }
                    finish(&mut current, &mut words);
                    let glyph = if ch == '\n' { "" } else { " " };
                    words.push(whitespace(kind, glyph, ctx));
                }
                if !run.is_empty() {
                    let parts = shape(
                        &span.style,
                        &run,
                        span.link.clone(),
                        span.note.clone(),
                        ctx,
                    );
                    join(&mut current, parts, ctx);
                }
            }
            SpanContent::Tab => {
                finish(&mut current, &mut words);
                words.push(whitespace(WordKind::Tab, " ", ctx));
            }
            SpanContent::Newline => {
                finish(&mut current, &mut words);
                words.push(whitespace(WordKind::Newline, "", ctx));
            }
            SpanContent::Inline(flowable) => {
                finish(&mut current, &mut words);
                words.push(Word {
                    kind: WordKind::Inline(flowable.clone()),
                    parts: Vec::new(),
                });
            }
        }
    }
    finish(&mut current, &mut words);
    words
}

/// Append the parts of a word shaped from the next span, kerning the last glyph before
/// the style change against the first one after it. Only parts drawn in the same font
/// at the same size are kerned.
fn join(current: &mut Vec<WordPart>, parts: Vec<WordPart>, ctx: &LayoutContext<'_>) {
    if let (Some(last), Some(next)) = (current.last_mut(), parts.first()) {
        let same_face = last.style.font == next.style.font && last.size == next.size;
        if same_face && last.style.kerning && next.style.kerning {
            if let (Some(left), Some(right)) = (last.glyphs.last_mut(), next.glyphs.first()) {
                let face = ctx.fonts.get(last.style.font);
                let kerning = Pt(face.kerning(left.id, right.id) as f32 * face.scale(last.size));
                left.offset += kerning;
                last.width += kerning;
            }
        }
    }
    current.extend(parts);
}

/// Shape `text` in `style`, producing one part per run of equally sized glyphs
pub(crate) fn shape(
    style: &Rc<TextStyle>,
    text: &str,
    link: Option<String>,
    note: Option<Rc<Note>>,
    ctx: &mut LayoutContext<'_>,
) -> Vec<WordPart> {
    let part = |text: &str, size: Pt, shaped: &str, ctx: &mut LayoutContext<'_>| {
        let glyphs = shape_glyphs(style, shaped, size, ctx);
        WordPart {
            style: style.clone(),
            size,
            text: text.to_string(),
            width: glyphs.iter().map(|g| g.advance + g.offset).sum(),
            glyphs,
            link: link.clone(),
            note: note.clone(),
        }
    };

    if !style.small_caps {
        return vec![part(text, style.size, text, ctx)];
    }

    let mut parts = Vec::new();
    let mut start = 0;
    let mut lower = None;
    for (index, ch) in text.char_indices() {
        let is_lower = ch.is_lowercase();
        if lower.is_some_and(|l| l != is_lower) {
            parts.push((&text[start..index], lower == Some(true)));
            start = index;
        }
        lower = Some(is_lower);
    }
    parts.push((&text[start..], lower == Some(true)));

    parts
        .into_iter()
        .map(|(run, is_lower)| {
            if is_lower {
                let upper = run.to_uppercase();
                part(run, style.size * SMALL_CAPS_SCALE, &upper, ctx)
            } else {
                part(run, style.size, run, ctx)
            }
        })
        .collect()
}

fn shape_glyphs(
    style: &TextStyle,
    text: &str,
    size: Pt,
    ctx: &mut LayoutContext<'_>,
) -> Vec<PlacedGlyph> {
    let face = ctx.fonts.get(style.font);
    let mut glyphs: Vec<Glyph> = Vec::with_capacity(text.len());
    let mut missing = Vec::new();
    for ch in text.chars() {
        let glyph = match face.glyph(ch) {
            Some(glyph) => glyph,
            None => {
                missing.push(ch);
                face.replacement_glyph()
            }
        };
        if style.ligatures {
            if let Some(last) = glyphs.last_mut() {
                if let Some(ligature) = face.ligature(last.id, glyph.id) {
                    *last = ligature;
                    continue;
                }
            }
        }
        glyphs.push(glyph);
    }

    let scale = face.scale(size);
    let placed = glyphs
        .iter()
        .enumerate()
        .map(|(i, glyph)| {
            let kerning = match glyphs.get(i + 1) {
                Some(next) if style.kerning => face.kerning(glyph.id, next.id),
                _ => 0,
            };
            PlacedGlyph {
                id: glyph.id,
                advance: Pt(glyph.advance as f32 * scale),
                offset: Pt(kerning as f32 * scale),
            }
        })
        .collect();

    let name = face.name().to_string();
    for ch in missing {
        ctx.warn(format!("font `{name}` has no glyph for {ch:?}"));
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        layout::context::testing::Harness,
        style::{Attribute, Style, StyleChain, StyleSheet},
        text::Text,
    };

    fn shaped(text: Text, sheet: &StyleSheet, harness: &mut Harness) -> Vec<Word> {
        let styles = StyleChain::root(sheet);
        let mut ctx = harness.ctx();
        let spans = text.spans(&styles, &mut ctx).unwrap();
        words(spans, &mut ctx)
    }

    #[test]
    fn splits_on_whitespace_only() {
        let sheet = StyleSheet::empty().with("em", Style::new());
        let mut harness = Harness::new();
        let text = Text::concat(vec![
            "The qu".into(),
            Text::styled("em", vec!["ick".into()]),
            "\tfox\n".into(),
        ]);
        let words = shaped(text, &sheet, &mut harness);
        let kinds: Vec<String> = words.iter().map(|w| format!("{:?}", w.kind)).collect();
        assert_eq!(kinds, vec!["Text", "Space", "Text", "Tab", "Text", "Newline"]);
        assert_eq!(words[2].text(), "quick");
        assert_eq!(words[2].parts.len(), 2);
        assert_eq!(words[2].width(), Pt(50.0));
    }

    #[test]
    fn applies_kerning_and_ligatures() {
        let sheet = StyleSheet::empty().with(
            "plain",
            Style::new()
                .set(Attribute::Kerning, false)
                .set(Attribute::Ligatures, false),
        );
        let mut harness = Harness::new();
        let kerned = shaped("AV off".into(), &sheet, &mut harness);
        assert_eq!(kerned[0].width(), Pt(19.0));
        assert_eq!(kerned[2].width(), Pt(25.0));
        assert_eq!(kerned[2].parts[0].glyphs.len(), 2);

        let plain = shaped(
            Text::styled("plain", vec!["AV off".into()]),
            &sheet,
            &mut harness,
        );
        assert_eq!(plain[0].width(), Pt(20.0));
        assert_eq!(plain[2].width(), Pt(30.0));
    }

    #[test]
    fn kerns_across_style_changes_within_a_word() {
        let sheet = StyleSheet::empty()
            .with("em", Style::new())
            .with("big", Style::new().set(Attribute::FontSize, Pt(20.0)));
        let mut harness = Harness::new();
        let words = shaped(
            Text::concat(vec!["A".into(), Text::styled("em", vec!["V".into()])]),
            &sheet,
            &mut harness,
        );
        assert_eq!(words[0].parts.len(), 2);
        assert_eq!(words[0].parts[0].width, Pt(9.0));
        assert_eq!(words[0].width(), Pt(19.0));

        // a size change leaves the pair unkerned
        let words = shaped(
            Text::concat(vec!["A".into(), Text::styled("big", vec!["V".into()])]),
            &sheet,
            &mut harness,
        );
        assert_eq!(words[0].width(), Pt(30.0));
    }

    #[test]
    fn small_caps_shrink_lower_case_runs() {
        let sheet =
            StyleSheet::empty().with("sc", Style::new().set(Attribute::SmallCaps, true));
        let mut harness = Harness::new();
        let words = shaped(
            Text::styled("sc", vec!["Small".into()]),
            &sheet,
            &mut harness,
        );
        let parts = &words[0].parts;
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].text, "mall");
        assert_eq!(parts[1].size, Pt(8.0));
        assert_eq!(parts[1].glyphs[0].id, 'M' as u16);
        assert_eq!(words[0].width(), Pt(10.0 + 4.0 * 8.0));
    }

    #[test]
    fn hyphenation_splits_round_trip() {
        let sheet = StyleSheet::empty().with("em", Style::new());
        let mut harness = Harness::new();
        let words = shaped(
            Text::concat(vec!["exten".into(), Text::styled("em", vec!["sive".into()])]),
            &sheet,
            &mut harness,
        );
        let mut ctx = harness.ctx();
        for at in 1..9 {
            let (first, second) = words[0].split(at, &mut ctx);
            let head = first.text();
            assert!(head.ends_with('-'));
            assert_eq!(format!("{}{}", &head[..head.len() - 1], second.text()), "extensive");
            assert_eq!(first.width(), Pt(10.0 * (at + 1) as f32));
        }
    }

    #[test]
    fn missing_glyphs_are_replaced_with_a_warning() {
        let sheet = StyleSheet::empty();
        let mut harness = Harness::new();
        let words = shaped("a\u{fffd}".into(), &sheet, &mut harness);
        assert_eq!(words[0].parts[0].glyphs[1].id, b'?' as u16);
        assert_eq!(harness.pass.warnings.len(), 1);
    }
}
