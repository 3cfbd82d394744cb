//! Glyph metrics: the narrow interface the layout engine uses to talk to fonts.

use crate::{
    refs::{ObjectReferences, RefType},
    PDFError, Pt,
};
use id_arena::{Arena, Id};
use pdf_writer::{Name, Pdf};
use std::collections::HashMap;

/// A single glyph as the layout engine sees it
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Glyph {
    /// The font-specific glyph code, fed back to [Typeface::encode]
    pub id: u16,
    /// Horizontal advance, in font units
    pub advance: u16,
}

/// Anything that can measure and encode glyphs. Metrics are reported in font units;
/// the provided methods scale them to a font size.
///
/// Implementations must be deterministic: the same character always maps to the same
/// glyph, otherwise document passes will never converge.
pub trait Typeface {
    /// The PostScript name of the face
    fn name(&self) -> &str;
    fn units_per_em(&self) -> u16;
    fn ascender(&self) -> i16;
    /// Usually negative
    fn descender(&self) -> i16;
    fn line_gap(&self) -> i16;

    /// Look up the glyph for a character, returning [None] if the face lacks it
    fn glyph(&self, ch: char) -> Option<Glyph>;

    /// The glyph drawn in place of characters the face doesn't have
    fn replacement_glyph(&self) -> Glyph;

    /// Kerning adjustment (font units) between two adjacent glyphs
    fn kerning(&self, _left: u16, _right: u16) -> i16 {
        0
    }

    /// A glyph that replaces the pair `left`, `right`
    fn ligature(&self, _left: u16, _right: u16) -> Option<Glyph> {
        None
    }

    /// Append the content stream bytes that select `glyph`
    fn encode(&self, glyph: u16, out: &mut Vec<u8>);

    /// Write the font objects into the PDF, registering them as `RefType::Font(index)`
    fn write(
        &self,
        refs: &mut ObjectReferences,
        index: usize,
        writer: &mut Pdf,
    ) -> Result<(), PDFError>;

    /// Points per font unit at the given size
    fn scale(&self, size: Pt) -> f32 {
        *size / self.units_per_em() as f32
    }

    /// Distance from the baseline to the top of the font at the given size
    fn ascent(&self, size: Pt) -> Pt {
        Pt(self.ascender() as f32 * self.scale(size))
    }

    /// Distance from the baseline to the bottom of the font. Note: this is usually negative
    fn descent(&self, size: Pt) -> Pt {
        Pt(self.descender() as f32 * self.scale(size))
    }

    /// Extra space the font designer wants between lines
    fn leading(&self, size: Pt) -> Pt {
        Pt(self.line_gap() as f32 * self.scale(size))
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FontSlant {
    #[default]
    Upright,
    Italic,
}

/// The faces making up one family, waiting to be added to a [FontSet]
#[derive(Default)]
pub struct FontFamily {
    faces: Vec<(FontWeight, FontSlant, Box<dyn Typeface>)>,
}

impl FontFamily {
    pub fn new() -> FontFamily {
        FontFamily::default()
    }

    pub fn face<T: Typeface + 'static>(
        mut self,
        weight: FontWeight,
        slant: FontSlant,
        face: T,
    ) -> FontFamily {
        self.faces.push((weight, slant, Box::new(face)));
        self
    }
}

impl<T: Typeface + 'static> From<T> for FontFamily {
    fn from(face: T) -> Self {
        FontFamily::new().face(FontWeight::Regular, FontSlant::Upright, face)
    }
}

pub type FontId = Id<Box<dyn Typeface>>;

/// All typefaces available to a document, addressed by family name, weight and slant
#[derive(Default)]
pub struct FontSet {
    faces: Arena<Box<dyn Typeface>>,
    families: HashMap<String, Vec<(FontWeight, FontSlant, FontId)>>,
}

impl FontSet {
    pub fn new() -> FontSet {
        FontSet::default()
    }

    /// Register a family. Adding a family under an existing name adds its faces to it.
    pub fn add<F: Into<FontFamily>>(&mut self, family: &str, faces: F) {
        let entry = self.families.entry(family.to_string()).or_default();
        for (weight, slant, face) in faces.into().faces {
            let id = self.faces.alloc(face);
            entry.push((weight, slant, id));
        }
    }

    /// Find the best face in a family. Missing bold or italic variants fall back to
    /// the regular face of the family.
    pub fn lookup(
        &self,
        family: &str,
        weight: FontWeight,
        slant: FontSlant,
    ) -> Result<FontId, PDFError> {
        let faces = self
            .families
            .get(family)
            .filter(|faces| !faces.is_empty())
            .ok_or_else(|| PDFError::FontNotFound {
                family: family.to_string(),
            })?;

        let exact = faces.iter().find(|(w, s, _)| *w == weight && *s == slant);
        let upright = faces
            .iter()
            .find(|(w, s, _)| *w == weight && *s == FontSlant::Upright);
        let regular = faces
            .iter()
            .find(|(w, s, _)| *w == FontWeight::Regular && *s == FontSlant::Upright);
        let (_, _, id) = exact.or(upright).or(regular).unwrap_or(&faces[0]);
        if exact.is_none() {
            log::debug!("no {weight:?} {slant:?} face in `{family}`, substituting");
        }
        Ok(*id)
    }

    pub fn get(&self, id: FontId) -> &dyn Typeface {
        self.faces[id].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FontId, &dyn Typeface)> {
        self.faces.iter().map(|(id, face)| (id, face.as_ref()))
    }
}

/// One of the base-14 faces every PDF reader provides. These are referenced by name
/// rather than embedded, and use WinAnsi single-byte encoding.
pub struct StandardFont {
    base_font: &'static str,
}

impl StandardFont {
    /// The four Courier faces: every glyph is 600 units wide
    pub fn courier() -> FontFamily {
        FontFamily::new()
            .face(
                FontWeight::Regular,
                FontSlant::Upright,
                StandardFont {
                    base_font: "Courier",
                },
            )
            .face(
                FontWeight::Bold,
                FontSlant::Upright,
                StandardFont {
                    base_font: "Courier-Bold",
                },
            )
            .face(
                FontWeight::Regular,
                FontSlant::Italic,
                StandardFont {
                    base_font: "Courier-Oblique",
                },
            )
            .face(
                FontWeight::Bold,
                FontSlant::Italic,
                StandardFont {
                    base_font: "Courier-BoldOblique",
                },
            )
    }
}

const COURIER_ADVANCE: u16 = 600;

impl Typeface for StandardFont {
    fn name(&self) -> &str {
        self.base_font
    }

    fn units_per_em(&self) -> u16 {
        1000
    }

    fn ascender(&self) -> i16 {
        629
    }

    fn descender(&self) -> i16 {
        -157
    }

    fn line_gap(&self) -> i16 {
        0
    }

    fn glyph(&self, ch: char) -> Option<Glyph> {
        win_ansi(ch).map(|code| Glyph {
            id: code as u16,
            advance: COURIER_ADVANCE,
        })
    }

    fn replacement_glyph(&self) -> Glyph {
        Glyph {
            id: b'?' as u16,
            advance: COURIER_ADVANCE,
        }
    }

    fn encode(&self, glyph: u16, out: &mut Vec<u8>) {
        out.push(glyph as u8);
    }

    fn write(
        &self,
        refs: &mut ObjectReferences,
        index: usize,
        writer: &mut Pdf,
    ) -> Result<(), PDFError> {
        let id = refs.gen(RefType::Font(index));
        writer
            .type1_font(id)
            .base_font(Name(self.base_font.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        Ok(())
    }
}

/// Map a character to its WinAnsiEncoding code
fn win_ansi(ch: char) -> Option<u8> {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) || (0xa0..=0xff).contains(&code) {
        return Some(code as u8);
    }
    let code = match ch {
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(code)
}

/// Typefaces with exact, easy to reason about metrics for unit tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Every glyph is exactly one em wide, so 10pt text advances 10pt per character
    pub(crate) struct FixedFace;

    impl Typeface for FixedFace {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn units_per_em(&self) -> u16 {
            1000
        }

        fn ascender(&self) -> i16 {
            800
        }

        fn descender(&self) -> i16 {
            -200
        }

        fn line_gap(&self) -> i16 {
            0
        }

        fn glyph(&self, ch: char) -> Option<Glyph> {
            (ch != '\u{fffd}' && (ch as u32) < 0x2000).then_some(Glyph {
                id: ch as u16,
                advance: 1000,
            })
        }

        fn replacement_glyph(&self) -> Glyph {
            Glyph {
                id: b'?' as u16,
                advance: 1000,
            }
        }

        fn kerning(&self, left: u16, right: u16) -> i16 {
            // a single pair, so kerning can be tested without disturbing other tests
            if left == 'A' as u16 && right == 'V' as u16 {
                -100
            } else {
                0
            }
        }

        fn ligature(&self, left: u16, right: u16) -> Option<Glyph> {
            (left == 'f' as u16 && right == 'f' as u16).then_some(Glyph {
                id: 0xfb00,
                advance: 1500,
            })
        }

        fn encode(&self, glyph: u16, out: &mut Vec<u8>) {
            out.extend_from_slice(&glyph.to_be_bytes());
        }

        fn write(
            &self,
            refs: &mut ObjectReferences,
            index: usize,
            writer: &mut Pdf,
        ) -> Result<(), PDFError> {
            let id = refs.gen(RefType::Font(index));
            writer.type1_font(id).base_font(Name(b"Helvetica"));
            Ok(())
        }
    }

    /// A font set whose default family ("Courier") is the fixed test face
    pub(crate) fn fonts() -> FontSet {
        let mut fonts = FontSet::new();
        fonts.add(
            "Courier",
            FontFamily::new()
                .face(FontWeight::Regular, FontSlant::Upright, FixedFace)
                .face(FontWeight::Bold, FontSlant::Upright, FixedFace),
        );
        fonts
    }
}
