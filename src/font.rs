use crate::{
    refs::{ObjectReferences, RefType},
    Pt, Result,
};
use id_arena::Id;
use owned_ttf_parser::{AsFaceRef, OwnedFace};
use pdf_writer::{
    types::{FontFlags, SystemInfo},
    Finish, Name, Pdf, Ref, Str,
};
use std::collections::HashMap;

/// A font that text can be drawn with.
///
/// Certificates are drawn with one of two families: the PDF base-14 Helvetica pair,
/// which every reader provides and which only covers the WinAnsi character set, or a
/// TrueType pair embedded in full (e.g. Roboto) which can render symbols such as
/// `Ω`, `²` and `°`.
///
/// Fonts are referred to throughout the crate by their [Id] within the document
pub enum Font {
    Builtin(BuiltinFont),
    Embedded(EmbeddedFont),
}

/// The built-in (non-embedded) fonts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
}

/// A parsed TrueType / OpenType font, embedded in its entirety in the generated PDF
pub struct EmbeddedFont {
    pub face: OwnedFace,
}

impl Font {
    /// Load a font from raw bytes, parsing the font and returning an error if the font
    /// could not be parsed
    pub fn load(bytes: Vec<u8>) -> Result<Font> {
        let face = OwnedFace::from_vec(bytes, 0)?;
        Ok(Font::Embedded(EmbeddedFont { face }))
    }

    /// Whether the font can draw characters outside of WinAnsi
    pub fn is_unicode(&self) -> bool {
        matches!(self, Font::Embedded(_))
    }

    /// Calculate the ascent (distance from the baseline to the top of the font) for the given font size
    pub fn ascent(&self, size: Pt) -> Pt {
        match self {
            Font::Builtin(_) => size * (HELVETICA_ASCENT / 1000.0),
            Font::Embedded(font) => font.scaling(size) * font.face().ascender() as f32,
        }
    }

    /// Calculate the descent (distance from the baseline to the bottom of the font) for the given font size.
    /// Note: this is usually negative
    pub fn descent(&self, size: Pt) -> Pt {
        match self {
            Font::Builtin(_) => size * (HELVETICA_DESCENT / 1000.0),
            Font::Embedded(font) => font.scaling(size) * font.face().descender() as f32,
        }
    }

    /// Calculate the default line height of the font for the given size. The returned value is
    /// how much to vertically offset a second row of text below a first row of text.
    pub fn line_height(&self, size: Pt) -> Pt {
        match self {
            // matches the 1.15 line height factor the certificate layouts were tuned with
            Font::Builtin(_) => size * 1.15,
            Font::Embedded(font) => {
                let face = font.face();
                let scaling = font.scaling(size);
                let leading: Pt = scaling * face.line_gap() as f32;
                let ascent: Pt = scaling * face.ascender() as f32;
                let descent: Pt = scaling * face.descender() as f32;
                leading + ascent - descent
            }
        }
    }

    /// The horizontal advance of a single character
    pub fn advance(&self, ch: char, size: Pt) -> Pt {
        match self {
            Font::Builtin(font) => size * (font.width(ch) as f32 / 1000.0),
            Font::Embedded(font) => {
                let gid = font.glyph_or_replacement(ch);
                font.scaling(size)
                    * font
                        .face()
                        .glyph_hor_advance(owned_ttf_parser::GlyphId(gid))
                        .unwrap_or_default() as f32
            }
        }
    }

    /// Encode text into the bytes that are shown by the `Tj` operator for this font:
    /// single WinAnsi bytes for the built-in fonts, big-endian glyph ids for embedded fonts
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Font::Builtin(_) => text.chars().map(win_ansi_byte).collect(),
            Font::Embedded(font) => text
                .chars()
                .flat_map(|ch| font.glyph_or_replacement(ch).to_be_bytes())
                .collect(),
        }
    }

    pub(crate) fn write(&self, refs: &mut ObjectReferences, id: Id<Font>, writer: &mut Pdf) {
        let font_index = id.index();
        let font_id = refs.gen(RefType::Font(font_index));
        match self {
            Font::Builtin(builtin) => {
                writer
                    .type1_font(font_id)
                    .base_font(Name(builtin.base_font_name()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            Font::Embedded(font) => {
                let cid_font_id = font.write_cid(refs, font_index, writer);
                let to_unicode_id = font.write_to_unicode(refs, font_index, writer);

                let mut type0 = writer.type0_font(font_id);
                type0.base_font(Name(format!("F{font_index}").as_bytes()));
                type0.encoding_predefined(Name(b"Identity-H"));
                type0.descendant_font(cid_font_id);
                type0.to_unicode(to_unicode_id);
            }
        }
    }
}

const HELVETICA_ASCENT: f32 = 718.0;
const HELVETICA_DESCENT: f32 = -207.0;

/// Advance widths (1/1000 em) of the printable ASCII range, `' '..='~'`
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

impl BuiltinFont {
    fn base_font_name(&self) -> &'static [u8] {
        match self {
            BuiltinFont::Helvetica => b"Helvetica",
            BuiltinFont::HelveticaBold => b"Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            BuiltinFont::Helvetica => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Width in 1/1000 em of the glyph that will actually be drawn for `ch`
    fn width(&self, ch: char) -> u16 {
        match win_ansi_byte(ch) {
            b @ 0x20..=0x7e => self.widths()[(b - 0x20) as usize],
            0xb0 => 400,
            0xb2 | 0xb3 | 0xb9 => 333,
            0xb7 | 0x95 => 350,
            0x96 => 556,
            0x97 => 1000,
            0x85 => 1000,
            0x91..=0x94 => 333,
            _ => 556,
        }
    }
}

/// Map a character to its WinAnsiEncoding byte, substituting `?` for anything the
/// encoding can't represent
fn win_ansi_byte(ch: char) -> u8 {
    match ch {
        ' '..='~' => ch as u8,
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '€' => 0x80,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '\t' => b' ',
        _ => b'?',
    }
}

impl EmbeddedFont {
    fn face(&self) -> &owned_ttf_parser::Face<'_> {
        self.face.as_face_ref()
    }

    fn scaling(&self, size: Pt) -> Pt {
        size / self.face().units_per_em() as f32
    }

    fn name(&self, name_id: u16) -> Option<String> {
        self.face()
            .names()
            .into_iter()
            .find(|name| name.name_id == name_id && name.is_unicode())
            .and_then(|name| name.to_string())
    }

    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.face().glyph_index(ch).map(|i| i.0)
    }

    /// The glyph drawn for `ch`: its own glyph, else the replacement character, else `?`,
    /// else `.notdef`
    fn glyph_or_replacement(&self, ch: char) -> u16 {
        self.glyph_id(ch)
            .or_else(|| self.glyph_id('\u{FFFD}'))
            .or_else(|| self.glyph_id('?'))
            .unwrap_or(0)
    }

    fn write_cid(&self, refs: &mut ObjectReferences, font_index: usize, writer: &mut Pdf) -> Ref {
        let font_descriptor_id = self.write_descriptor(refs, font_index, writer);

        let id = refs.gen(RefType::CidFont(font_index));

        let mut cid_font = writer.cid_font(id);
        cid_font.subtype(pdf_writer::types::CidFontType::Type2);
        cid_font.base_font(Name(format!("F{font_index}").as_bytes()));
        cid_font.system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        });
        cid_font.font_descriptor(font_descriptor_id);

        let ids = self.glyph_ids();
        let ids_augmented = self.glyphs_sizing(&ids);

        let scaling = 1000.0 / self.face().units_per_em() as f32;

        // the most common advance becomes the default width
        let mut widths_counts: HashMap<u16, usize> = HashMap::new();
        for (_, (width, _)) in ids_augmented.values() {
            *widths_counts.entry(*width).or_insert(0) += 1;
        }
        let most_common_width = widths_counts
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&width, _)| width as f32 * scaling)
            .unwrap_or(1000.0);

        let mut id_widths: Vec<(u16, f32)> = ids_augmented
            .iter()
            .map(|(&cid, &(_, (width, _)))| (cid, width as f32 * scaling))
            .collect();
        id_widths.sort_by_key(|(id, _)| *id);

        let mut widths = cid_font.widths();
        widths.consecutive(0, [1000.0]);

        // group runs of consecutive glyph ids into blocks
        let mut runs: Vec<(u16, Vec<f32>)> = Vec::new();
        for (cid, width) in id_widths.into_iter() {
            match runs.last_mut() {
                Some((start, run)) if (cid - *start) as usize == run.len() => run.push(width),
                _ => runs.push((cid, vec![width])),
            }
        }
        for (start, run) in runs.into_iter() {
            widths.consecutive(start, run);
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

        writer
            .stream(id, self.face.as_slice())
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

        let gids = self.glyph_ids();
        let gids_augmented = self.glyphs_sizing(&gids);

        let max_width = gids_augmented
            .values()
            .map(|&(_, (w, _))| w)
            .max()
            .unwrap_or_default();
        let max_height = gids_augmented
            .values()
            .map(|&(_, (_, h))| h)
            .max()
            .unwrap_or_default();
        let sum_width: usize = gids_augmented.values().map(|&(_, (w, _))| w as usize).sum();
        let avg_width = sum_width as f32 / gids_augmented.len().max(1) as f32;

        let id = refs.gen(RefType::FontDescriptor(font_index));
        let face = self.face();
        let full_name = self
            .name(owned_ttf_parser::name_id::FULL_NAME)
            .unwrap_or_else(|| format!("F{font_index}"));
        let family = self
            .name(owned_ttf_parser::name_id::FAMILY)
            .unwrap_or_else(|| full_name.clone());

        let mut descriptor = writer.font_descriptor(id);
        descriptor.name(Name(full_name.as_bytes()));
        descriptor.family(Str(family.as_bytes()));
        descriptor.weight(face.weight().to_number());

        let mut flags: FontFlags = FontFlags::empty();
        if face.is_monospaced() {
            flags.set(FontFlags::FIXED_PITCH, true);
        }
        if face.is_italic() {
            flags.set(FontFlags::ITALIC, true);
        }
        flags.set(FontFlags::NON_SYMBOLIC, true);
        descriptor.flags(flags);

        let scaling = 1000.0 / face.units_per_em() as f32;
        descriptor.bbox(pdf_writer::Rect {
            x1: 0.0,
            y1: 0.0,
            x2: max_width as f32 * scaling,
            y2: max_height as f32 * scaling,
        });
        descriptor.italic_angle(face.italic_angle());
        descriptor.ascent(face.ascender() as f32 * scaling);
        descriptor.descent(face.descender() as f32 * scaling);
        descriptor.leading(face.line_gap() as f32 * scaling);
        descriptor.cap_height(
            face.capital_height()
                .map(|h| h as f32 * scaling)
                .unwrap_or(1000.0),
        );
        descriptor.x_height(
            face.x_height()
                .unwrap_or_else(|| face.capital_height().unwrap_or_default()) as f32
                * scaling,
        );
        // TrueType has no stem width; 80 is what most producers emit for regular weights
        descriptor.stem_v(80.0);
        descriptor.avg_width(avg_width * scaling);
        descriptor.max_width(max_width as f32 * scaling);
        descriptor.missing_width(max_width as f32 * scaling);

        descriptor.font_file2(font_data_stream_id);

        id
    }

    /// Every (glyph id, character) pair reachable through the font's unicode cmaps
    fn glyph_ids(&self) -> HashMap<u16, char> {
        let mut map: HashMap<u16, char> = HashMap::new();

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

    fn glyphs_sizing(&self, ids: &HashMap<u16, char>) -> HashMap<u16, (char, (u16, i16))> {
        let face = self.face();
        let mut ids_augmented: HashMap<u16, (char, (u16, i16))> = HashMap::new();
        for (&id, &ch) in ids.iter() {
            if let Some(gid) = face.glyph_index(ch) {
                if let Some(h_advance) = face.glyph_hor_advance(gid) {
                    let height = face
                        .glyph_bounding_box(gid)
                        .map(|bbox| bbox.y_max - bbox.y_min - face.descender())
                        .unwrap_or(1000);
                    ids_augmented.insert(id, (ch, (h_advance, height)));
                }
            }
        }
        ids_augmented
    }

    fn write_to_unicode(
        &self,
        refs: &mut ObjectReferences,
        font_index: usize,
        writer: &mut Pdf,
    ) -> Ref {
        let id = refs.gen(RefType::ToUnicode(font_index));

        let mut map: String = r#"/CIDInit /ProcSet findresource begin
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
"#
        .replace("\r\n", "\n");

        let mut ids: Vec<(u16, char)> = self.glyph_ids().into_iter().collect();
        ids.sort_by_key(|&(id, _)| id);

        // bfchar blocks hold at most 100 entries sharing a common high byte
        let mut cmap_blocks: Vec<Vec<(u16, char)>> = Vec::new();
        let mut current_block: Vec<(u16, char)> = Vec::new();
        let mut high_byte: u8 = 0;
        for &(id, ch) in ids.iter() {
            if (id >> 8) as u8 != high_byte || current_block.len() >= 100 {
                if !current_block.is_empty() {
                    cmap_blocks.push(std::mem::take(&mut current_block));
                }
                high_byte = (id >> 8) as u8;
            }
            current_block.push((id, ch));
        }
        if !current_block.is_empty() {
            cmap_blocks.push(current_block);
        }

        for block in cmap_blocks.into_iter() {
            map.push_str(&format!("{} beginbfchar\n", block.len()));
            for (id, ch) in block.into_iter() {
                let mut utf16 = [0u16; 2];
                let hex: String = ch
                    .encode_utf16(&mut utf16)
                    .iter()
                    .map(|unit| format!("{unit:04x}"))
                    .collect();
                map.push_str(&format!("<{id:04x}> <{hex}>\n"));
            }
            map.push_str("endbfchar\n");
        }

        map.push_str("endcmap CMapName currentdict /CMap defineresource pop end end\n");

        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(
            map.as_bytes(),
            miniz_oxide::deflate::CompressionLevel::DefaultCompression as u8,
        );
        let mut stream = writer.stream(id, compressed.as_slice());
        stream.filter(pdf_writer::Filter::FlateDecode);

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_metrics() {
        let font = Font::Builtin(BuiltinFont::Helvetica);
        assert!((font.advance('A', Pt(10.0)).0 - 6.67).abs() < 1e-4);
        assert!((font.advance(' ', Pt(1000.0)).0 - 278.0).abs() < 1e-3);
        let bold = Font::Builtin(BuiltinFont::HelveticaBold);
        assert!(bold.advance('a', Pt(10.0)) >= font.advance('a', Pt(10.0)));
        assert!(!font.is_unicode());
    }

    #[test]
    fn win_ansi_encoding_substitutes_unknown_characters() {
        let font = Font::Builtin(BuiltinFont::Helvetica);
        assert_eq!(font.encode("Ab 1"), b"Ab 1".to_vec());
        assert_eq!(font.encode("16mm²"), vec![b'1', b'6', b'm', b'm', 0xb2]);
        assert_eq!(font.encode("0.5Ω"), b"0.5?".to_vec());
        assert_eq!(font.encode("£"), vec![0xa3]);
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(Font::load(vec![0, 1, 2, 3]).is_err());
    }
}
