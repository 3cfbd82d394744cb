use crate::{
    metrics::{Glyph, Typeface},
    refs::{ObjectReferences, RefType},
    PDFError,
};
use owned_ttf_parser::{
    gsub::SubstitutionSubtable, name_id, AsFaceRef, Face, GlyphId, OwnedFace, Tag,
};
use pdf_writer::{
    types::{CidFontType, FontFlags, SystemInfo},
    Finish, Name, Pdf, Ref, Str,
};
use std::collections::{BTreeMap, HashMap};

/// A parsed TrueType / OpenType font. Fonts are embedded in their entirety in the
/// generated PDF as Identity-H encoded CID fonts, so large fonts may dramatically
/// increase the size of the output.
///
/// Kerning comes from the `kern` table and ligatures from the GSUB `liga` feature;
/// no other shaping is performed.
pub struct Font {
    pub face: OwnedFace,
    name: String,
    /// first glyph of a pair -> (second glyph, ligature glyph)
    ligatures: HashMap<u16, Vec<(u16, u16)>>,
}

impl Font {
    /// Load a font from raw bytes, parsing the font and returning an error if the font
    /// could not be parsed
    pub fn load(bytes: Vec<u8>) -> Result<Font, PDFError> {
        let face = OwnedFace::from_vec(bytes, 0)?;
        let name = face_name(face.as_face_ref(), name_id::POST_SCRIPT_NAME)
            .or_else(|| face_name(face.as_face_ref(), name_id::FULL_NAME))
            .unwrap_or_else(|| "Unnamed".to_string());
        let ligatures = pair_ligatures(face.as_face_ref());

        Ok(Font {
            face,
            name,
            ligatures,
        })
    }

    /// Obtain the family name of the font, if it has one
    pub fn family(&self) -> Option<String> {
        face_name(self.face.as_face_ref(), name_id::FAMILY)
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    fn write_cid(&self, refs: &mut ObjectReferences, font_index: usize, writer: &mut Pdf) -> Ref {
        let font_descriptor_id = self.write_descriptor(refs, font_index, writer);

        let id = refs.gen(RefType::CidFont(font_index));

        let mut cid_font = writer.cid_font(id);
        cid_font.subtype(CidFontType::Type2);
        cid_font.base_font(Name(self.name.as_bytes()));
        cid_font.system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        });
        cid_font.font_descriptor(font_descriptor_id);

        let scaling = 1000.0 / self.face().units_per_em() as f32;
        let advances = self.advances();

        // find the most popular width to use as the default
        let mut width_counts: HashMap<u16, usize> = HashMap::new();
        for width in advances.values() {
            *width_counts.entry(*width).or_insert(0) += 1;
        }
        let most_common_width = width_counts
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&width, _)| width as f32 * scaling)
            .unwrap_or(1000.0);

        // runs of consecutive glyph ids share a single widths entry
        let mut widths = cid_font.widths();
        let mut run: Option<(u16, Vec<f32>)> = None;
        for (&gid, &advance) in advances.iter() {
            let width = advance as f32 * scaling;
            match &mut run {
                Some((start, run_widths)) if *start as usize + run_widths.len() == gid as usize => {
                    run_widths.push(width);
                }
                _ => {
                    if let Some((start, run_widths)) = run.take() {
                        widths.consecutive(start, run_widths);
                    }
                    run = Some((gid, vec![width]));
                }
            }
        }
        if let Some((start, run_widths)) = run {
            widths.consecutive(start, run_widths);
        }
        widths.finish();

        cid_font.default_width(most_common_width);
        cid_font.cid_to_gid_map_predefined(Name(b"Identity"));

        id
    }

    fn write_font_data(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        writer: &mut Pdf,
    ) -> Ref {
        let id = refs.gen(RefType::FontData(font_index));
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(self.face.as_slice(), 6);

        writer
            .stream(id, compressed.as_slice())
            .filter(pdf_writer::Filter::FlateDecode)
            .pair(Name(b"Length1"), self.face.as_slice().len() as i32);

        id
    }

    fn write_descriptor(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        writer: &mut Pdf,
    ) -> Ref {
        let font_data_stream_id = self.write_font_data(refs, font_index, writer);
        let face = self.face();
        let scaling = 1000.0 / face.units_per_em() as f32;

        let advances = self.advances();
        let max_width = advances.values().copied().max().unwrap_or_default();
        let avg_width = if advances.is_empty() {
            0.0
        } else {
            advances.values().map(|&w| w as f32).sum::<f32>() / advances.len() as f32
        };

        let id = refs.gen(RefType::FontDescriptor(font_index));

        let mut descriptor = writer.font_descriptor(id);
        descriptor.name(Name(self.name.as_bytes()));
        if let Some(family) = self.family() {
            descriptor.family(Str(family.as_bytes()));
        }
        descriptor.weight(face.weight().to_number());

        let mut flags = FontFlags::NON_SYMBOLIC;
        if face.is_monospaced() {
            flags.insert(FontFlags::FIXED_PITCH);
        }
        if face.is_italic() {
            flags.insert(FontFlags::ITALIC);
        }
        descriptor.flags(flags);

        let bbox = face.global_bounding_box();
        descriptor.bbox(pdf_writer::Rect {
            x1: bbox.x_min as f32 * scaling,
            y1: bbox.y_min as f32 * scaling,
            x2: bbox.x_max as f32 * scaling,
            y2: bbox.y_max as f32 * scaling,
        });
        descriptor.italic_angle(face.italic_angle());
        descriptor.ascent(face.ascender() as f32 * scaling);
        descriptor.descent(face.descender() as f32 * scaling);
        descriptor.leading(face.line_gap() as f32 * scaling);
        let cap_height = face.capital_height().unwrap_or(face.ascender());
        descriptor.cap_height(cap_height as f32 * scaling);
        descriptor.x_height(face.x_height().unwrap_or(cap_height) as f32 * scaling);
        // not recorded in TrueType fonts; a typical regular weight value
        descriptor.stem_v(80.0);
        descriptor.avg_width(avg_width * scaling);
        descriptor.max_width(max_width as f32 * scaling);
        descriptor.missing_width(max_width as f32 * scaling);

        descriptor.font_file2(font_data_stream_id);

        id
    }

    /// Glyph id -> the character it was first reached from in the unicode cmaps
    fn glyph_chars(&self) -> BTreeMap<u16, char> {
        let mut map: BTreeMap<u16, char> = BTreeMap::new();
        let Some(cmap) = self.face().tables().cmap else {
            return map;
        };

        for subtable in cmap.subtables.into_iter().filter(|table| table.is_unicode()) {
            subtable.codepoints(|codepoint: u32| {
                if let Ok(ch) = char::try_from(codepoint) {
                    if let Some(index) = subtable.glyph_index(codepoint).filter(|index| index.0 > 0)
                    {
                        map.entry(index.0).or_insert(ch);
                    }
                }
            });
        }

        map
    }

    /// Horizontal advance of every glyph reachable from the cmap or a ligature
    fn advances(&self) -> BTreeMap<u16, u16> {
        let mut ids: Vec<u16> = self.glyph_chars().into_keys().collect();
        ids.extend(self.ligatures.values().flatten().map(|&(_, lig)| lig));
        ids.into_iter()
            .filter_map(|gid| {
                let advance = self.face().glyph_hor_advance(GlyphId(gid))?;
                Some((gid, advance))
            })
            .collect()
    }

    fn write_to_unicode(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        writer: &mut Pdf,
    ) -> Ref {
        let id = refs.gen(RefType::ToUnicode(font_index));

        let mut map = String::from(
            "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
",
        );

        // bfchar blocks hold at most 100 entries
        let ids: Vec<(u16, char)> = self.glyph_chars().into_iter().collect();
        for block in ids.chunks(100) {
            map.push_str(&format!("{} beginbfchar\n", block.len()));
            for &(id, ch) in block {
                let mut utf16 = [0u16; 2];
                let units: String = ch
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|unit| format!("{unit:04x}"))
                    .collect();
                map.push_str(&format!("<{id:04x}> <{units}>\n"));
            }
            map.push_str("endbfchar\n");
        }

        map.push_str("endcmap CMapName currentdict /CMap defineresource pop end end\n");

        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(map.as_bytes(), 6);
        writer
            .stream(id, compressed.as_slice())
            .filter(pdf_writer::Filter::FlateDecode);

        id
    }
}

impl Typeface for Font {
    fn name(&self) -> &str {
        &self.name
    }

    fn units_per_em(&self) -> u16 {
        self.face().units_per_em()
    }

    fn ascender(&self) -> i16 {
        self.face().ascender()
    }

    fn descender(&self) -> i16 {
        self.face().descender()
    }

    fn line_gap(&self) -> i16 {
        self.face().line_gap()
    }

    fn glyph(&self, ch: char) -> Option<Glyph> {
        let id = self.face().glyph_index(ch)?;
        Some(Glyph {
            id: id.0,
            advance: self.face().glyph_hor_advance(id).unwrap_or_default(),
        })
    }

    fn replacement_glyph(&self) -> Glyph {
        self.glyph('\u{FFFD}')
            .or_else(|| self.glyph('?'))
            .unwrap_or(Glyph {
                id: 0,
                advance: self.face().glyph_hor_advance(GlyphId(0)).unwrap_or_default(),
            })
    }

    fn kerning(&self, left: u16, right: u16) -> i16 {
        let Some(kern) = self.face().tables().kern else {
            return 0;
        };
        kern.subtables
            .into_iter()
            .filter(|subtable| subtable.horizontal && !subtable.variable)
            .find_map(|subtable| subtable.glyphs_kerning(GlyphId(left), GlyphId(right)))
            .unwrap_or(0)
    }

    fn ligature(&self, left: u16, right: u16) -> Option<Glyph> {
        let (_, id) = self
            .ligatures
            .get(&left)?
            .iter()
            .find(|(second, _)| *second == right)?;
        Some(Glyph {
            id: *id,
            advance: self
                .face()
                .glyph_hor_advance(GlyphId(*id))
                .unwrap_or_default(),
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
        let font_id = refs.gen(RefType::Font(index));
        let cid_font_id = self.write_cid(refs, index, writer);
        let to_unicode_id = self.write_to_unicode(refs, index, writer);

        let mut font = writer.type0_font(font_id);
        font.base_font(Name(self.name.as_bytes()));
        font.encoding_predefined(Name(b"Identity-H"));
        font.descendant_font(cid_font_id);
        font.to_unicode(to_unicode_id);
        Ok(())
    }
}

fn face_name(face: &Face<'_>, id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .find(|name| name.name_id == id && name.is_unicode())
        .and_then(|name| name.to_string())
}

/// Collect the two-glyph ligatures of the GSUB `liga` feature
fn pair_ligatures(face: &Face<'_>) -> HashMap<u16, Vec<(u16, u16)>> {
    let mut pairs: HashMap<u16, Vec<(u16, u16)>> = HashMap::new();
    let Some(gsub) = face.tables().gsub else {
        return pairs;
    };
    let liga = Tag::from_bytes(b"liga");

    let lookups = gsub
        .features
        .into_iter()
        .filter(|feature| feature.tag == liga)
        .flat_map(|feature| feature.lookup_indices.into_iter())
        .filter_map(|index| gsub.lookups.get(index));

    for lookup in lookups {
        for subtable in lookup.subtables.into_iter::<SubstitutionSubtable>() {
            let SubstitutionSubtable::Ligature(substitution) = subtable else {
                continue;
            };
            // walk every covered first glyph; coverage indices are dense
            for gid in 0..face.number_of_glyphs() {
                let Some(set_index) = substitution.coverage.get(GlyphId(gid)) else {
                    continue;
                };
                let Some(set) = substitution.ligature_sets.get(set_index) else {
                    continue;
                };
                for ligature in set {
                    if ligature.components.len() == 1 {
                        if let Some(second) = ligature.components.get(0) {
                            pairs
                                .entry(gid)
                                .or_default()
                                .push((second.0, ligature.glyph.0));
                        }
                    }
                }
            }
        }
    }

    pairs
}
