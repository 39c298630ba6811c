//! `cmap` character-to-glyph mapping tables.
//!
//! Decoding covers the encoding-record directory plus subtable formats 0, 4,
//! and 6. The remaining registered formats (2, 8, 10, 12, 13, 14) are
//! recognised but rejected with [`ParseError::UnsupportedFormat`]; adding one
//! means registering a new match arm and decoder, never changing an existing
//! one. Encoding always produces a format 4 subtable, built in
//! [`build`](self::build) from a [`SortedMapping`].

use crate::binary::read::{ReadArray, ReadBinary, ReadCtxt, ReadFrom, ReadScope};
use crate::binary::write::{WriteBinary, WriteContext};
use crate::binary::{I16Be, U16Be, U32Be, U8};
use crate::error::{ParseError, WriteError};
use crate::mapping::SortedMapping;
use crate::size;

pub mod build;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlatformId(pub u16);

impl PlatformId {
    pub const UNICODE: PlatformId = PlatformId(0);
    pub const MACINTOSH: PlatformId = PlatformId(1);
    pub const WINDOWS: PlatformId = PlatformId(3);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EncodingId(pub u16);

impl EncodingId {
    pub const UNICODE_BMP: EncodingId = EncodingId(3);

    pub const WINDOWS_SYMBOL: EncodingId = EncodingId(0);
    pub const WINDOWS_UNICODE_BMP: EncodingId = EncodingId(1);

    pub const MACINTOSH_APPLE_ROMAN: EncodingId = EncodingId(0);
}

/// The table header: a directory of encoding records pointing at subtables.
pub struct Cmap<'a> {
    pub scope: ReadScope<'a>,
    encoding_records: ReadArray<'a, EncodingRecord>,
}

pub struct EncodingRecord {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub offset: u32,
}

pub enum CmapSubtable<'a> {
    Format0 {
        language: u16,
        glyph_id_array: ReadArray<'a, U8>,
    },
    Format4 {
        language: u16,
        end_codes: ReadArray<'a, U16Be>,
        start_codes: ReadArray<'a, U16Be>,
        id_deltas: ReadArray<'a, I16Be>,
        id_range_offsets: ReadArray<'a, U16Be>,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
    Format6 {
        language: u16,
        first_code: u16,
        glyph_id_array: ReadArray<'a, U16Be>,
    },
}

#[derive(Copy, Clone)]
pub(crate) struct Format4Calculator {
    pub seg_count: u16,
}

impl ReadBinary for Cmap<'_> {
    type HostType<'a> = Cmap<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<Cmap<'a>, ParseError> {
        let scope = ctxt.scope();
        let version = ctxt.read_u16be()?;
        ctxt.check(version == 0)?;
        let num_tables = usize::from(ctxt.read_u16be()?);
        let encoding_records = ctxt.read_array::<EncodingRecord>(num_tables)?;
        Ok(Cmap {
            scope,
            encoding_records,
        })
    }
}

impl ReadFrom for EncodingRecord {
    type ReadType = (U16Be, U16Be, U32Be);
    fn read_from((platform_id, encoding_id, offset): (u16, u16, u32)) -> Self {
        EncodingRecord {
            platform_id,
            encoding_id,
            offset,
        }
    }
}

impl ReadBinary for CmapSubtable<'_> {
    type HostType<'a> = CmapSubtable<'a>;

    fn read<'a>(ctxt: &mut ReadCtxt<'a>) -> Result<CmapSubtable<'a>, ParseError> {
        let subtable_format = ctxt.read_u16be()?;
        match subtable_format {
            0 => {
                let length = usize::from(ctxt.read_u16be()?);
                ctxt.check(length >= 3 * size::U16 + 256)?;
                let language = ctxt.read_u16be()?;
                let glyph_id_array = ctxt.read_array::<U8>(256)?;
                Ok(CmapSubtable::Format0 {
                    language,
                    glyph_id_array,
                })
            }
            4 => {
                let length = usize::from(ctxt.read_u16be()?);
                let language = ctxt.read_u16be()?;
                let seg_count_x2 = usize::from(ctxt.read_u16be()?);
                ctxt.check((seg_count_x2 & 1) == 0)?;
                let seg_count = seg_count_x2 >> 1;
                let _search_range = ctxt.read_u16be()?;
                let _entry_selector = ctxt.read_u16be()?;
                let _range_shift = ctxt.read_u16be()?;
                let end_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let _reserved_pad = ctxt.read_u16be()?;
                let start_codes = ctxt.read_array::<U16Be>(seg_count)?;
                let id_deltas = ctxt.read_array::<I16Be>(seg_count)?;
                let id_range_offsets = ctxt.read_array::<U16Be>(seg_count)?;
                ctxt.check(length >= (8 + (4 * seg_count)) * size::U16)?;
                let remaining = length - ((8 + (4 * seg_count)) * size::U16);
                ctxt.check((remaining & 1) == 0)?;
                let num_indices = remaining >> 1;
                let glyph_id_array = ctxt.read_array::<U16Be>(num_indices)?;

                // Segments must be ascending and disjoint
                let mut prev_end = None;
                for (start, end) in start_codes.iter().zip(end_codes.iter()) {
                    ctxt.check_ordered(start <= end)?;
                    if let Some(prev_end) = prev_end {
                        ctxt.check_ordered(start > prev_end)?;
                    }
                    prev_end = Some(end);
                }

                Ok(CmapSubtable::Format4 {
                    language,
                    end_codes,
                    start_codes,
                    id_deltas,
                    id_range_offsets,
                    glyph_id_array,
                })
            }
            6 => {
                let _length = ctxt.read_u16be()?;
                let language = ctxt.read_u16be()?;
                let first_code = ctxt.read_u16be()?;
                let entry_count = usize::from(ctxt.read_u16be()?);
                let glyph_id_array = ctxt.read_array::<U16Be>(entry_count)?;
                Ok(CmapSubtable::Format6 {
                    language,
                    first_code,
                    glyph_id_array,
                })
            }
            format => Err(ParseError::UnsupportedFormat(format)),
        }
    }
}

impl<'a> Cmap<'a> {
    /// Find the first encoding record for the given `platform_id`
    pub fn find_subtable_for_platform(&self, platform_id: PlatformId) -> Option<EncodingRecord> {
        self.encoding_records
            .iter()
            .find(|record| record.platform_id == platform_id.0)
    }

    /// Find the first encoding record for the given `platform_id` and `encoding_id`
    pub fn find_subtable(
        &self,
        platform_id: PlatformId,
        encoding_id: EncodingId,
    ) -> Option<EncodingRecord> {
        self.encoding_records.iter().find(|record| {
            record.platform_id == platform_id.0 && record.encoding_id == encoding_id.0
        })
    }

    pub fn encoding_records(&self) -> impl Iterator<Item = EncodingRecord> + 'a {
        self.encoding_records.iter()
    }
}

impl<'a> CmapSubtable<'a> {
    /// Look up the glyph id for character code `ch`.
    ///
    /// Returns `Ok(None)` when the subtable holds no mapping for `ch`.
    pub fn map_glyph(&self, ch: u32) -> Result<Option<u16>, ParseError> {
        match *self {
            CmapSubtable::Format0 {
                ref glyph_id_array, ..
            } => {
                let index = usize::try_from(ch)?;
                match glyph_id_array.get_item(index) {
                    Some(0) | None => Ok(None),
                    Some(glyph_id) => Ok(Some(u16::from(glyph_id))),
                }
            }
            CmapSubtable::Format4 {
                ref end_codes,
                ref start_codes,
                ref id_deltas,
                ref id_range_offsets,
                ref glyph_id_array,
                ..
            } => {
                for i in 0..end_codes.len() {
                    // NOTE(unwrap): i < len for all four parallel arrays
                    let end_code = u32::from(end_codes.get_item(i).unwrap());
                    let start_code = u32::from(start_codes.get_item(i).unwrap());
                    if start_code <= ch && ch <= end_code {
                        let id_delta = i32::from(id_deltas.get_item(i).unwrap());
                        let id_range_offset = usize::from(id_range_offsets.get_item(i).unwrap());
                        let glyph_id = if id_range_offset == 0 {
                            (((ch as i32) + id_delta) as u32 & 0xFFFF) as u16
                        } else {
                            match glyph_in_range(
                                ch,
                                start_code,
                                i,
                                id_delta,
                                id_range_offset,
                                id_range_offsets.len(),
                                glyph_id_array,
                            ) {
                                Ok(glyph_id) => glyph_id,
                                // Real-world fonts store junk offsets in the final
                                // 0xFFFF segment. Treat as unmapped rather than
                                // rejecting the whole table, but only there.
                                Err(_) if start_code == 0xFFFF => return Ok(None),
                                Err(err) => return Err(err),
                            }
                        };
                        return Ok(if glyph_id != 0 { Some(glyph_id) } else { None });
                    }
                }
                Ok(None)
            }
            CmapSubtable::Format6 {
                first_code,
                ref glyph_id_array,
                ..
            } => {
                let first_code = u32::from(first_code);
                if first_code <= ch {
                    let index = usize::try_from(ch - first_code)?;
                    match glyph_id_array.get_item(index) {
                        Some(0) | None => Ok(None),
                        Some(glyph_id) => Ok(Some(glyph_id)),
                    }
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Reconstruct the full mapping held by this subtable.
    ///
    /// Codes mapped to glyph 0 are absent from the result.
    pub fn mappings(&self) -> Result<SortedMapping, ParseError> {
        let mut pairs = Vec::new();
        match *self {
            CmapSubtable::Format0 {
                ref glyph_id_array, ..
            } => {
                for (code, glyph_id) in glyph_id_array.iter().enumerate() {
                    if glyph_id != 0 {
                        pairs.push((code as u32, u32::from(glyph_id)));
                    }
                }
            }
            CmapSubtable::Format4 {
                ref end_codes,
                ref start_codes,
                ref id_deltas,
                ref id_range_offsets,
                ref glyph_id_array,
                ..
            } => {
                for i in 0..end_codes.len() {
                    // NOTE(unwrap): i < len for all four parallel arrays
                    let end_code = u32::from(end_codes.get_item(i).unwrap());
                    let start_code = u32::from(start_codes.get_item(i).unwrap());
                    let id_delta = i32::from(id_deltas.get_item(i).unwrap());
                    let id_range_offset = usize::from(id_range_offsets.get_item(i).unwrap());
                    for ch in start_code..=end_code {
                        let glyph_id = if id_range_offset == 0 {
                            (((ch as i32) + id_delta) as u32 & 0xFFFF) as u16
                        } else {
                            match glyph_in_range(
                                ch,
                                start_code,
                                i,
                                id_delta,
                                id_range_offset,
                                id_range_offsets.len(),
                                glyph_id_array,
                            ) {
                                Ok(glyph_id) => glyph_id,
                                // lenient final segment, as in map_glyph
                                Err(_) if start_code == 0xFFFF => break,
                                Err(err) => return Err(err),
                            }
                        };
                        if glyph_id != 0 {
                            pairs.push((ch, u32::from(glyph_id)));
                        }
                    }
                }
            }
            CmapSubtable::Format6 {
                first_code,
                ref glyph_id_array,
                ..
            } => {
                for (index, glyph_id) in glyph_id_array.iter().enumerate() {
                    if glyph_id != 0 {
                        pairs.push((u32::from(first_code) + index as u32, u32::from(glyph_id)));
                    }
                }
            }
        }
        Ok(SortedMapping::from_pairs(pairs))
    }
}

/// Resolve a format 4 glyph id through the explicit glyph id array.
///
/// `id_range_offset` is a byte offset from the segment's own slot in the
/// idRangeOffset array to the entry for `start_code` in the glyph id array.
fn glyph_in_range(
    ch: u32,
    start_code: u32,
    segment: usize,
    id_delta: i32,
    id_range_offset: usize,
    seg_count: usize,
    glyph_id_array: &ReadArray<'_, U16Be>,
) -> Result<u16, ParseError> {
    let glyph_id_offset = id_range_offset + segment * 2 + ((ch - start_code) as usize) * 2;
    if glyph_id_offset >= seg_count * 2 && (glyph_id_offset & 1) == 0 {
        let index = (glyph_id_offset >> 1) - seg_count;
        let raw = glyph_id_array
            .get_item(index)
            .ok_or(ParseError::MalformedHeader)?;
        if raw != 0 {
            Ok(((i32::from(raw) + id_delta) as u32 & 0xFFFF) as u16)
        } else {
            Ok(0)
        }
    } else {
        Err(ParseError::MalformedHeader)
    }
}

impl Format4Calculator {
    pub fn seg_count_x2(self) -> u16 {
        2 * self.seg_count
    }

    pub fn search_range(self) -> u16 {
        2 * (2u16.pow((self.seg_count as f64).log2().floor() as u32))
    }

    pub fn entry_selector(self) -> u16 {
        (self.search_range() as f64 / 2.).log2() as u16
    }

    pub fn range_shift(self) -> u16 {
        2 * self.seg_count - self.search_range()
    }
}

pub mod owned {
    use super::{size, Format4Calculator, I16Be, U16Be, U32Be, WriteBinary, WriteContext, WriteError};

    pub struct Cmap {
        pub encoding_records: Vec<EncodingRecord>,
    }

    pub struct EncodingRecord {
        pub platform_id: u16,
        pub encoding_id: u16,
        pub sub_table: CmapSubtableFormat4,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct CmapSubtableFormat4 {
        pub language: u16,
        pub end_codes: Vec<u16>,
        pub start_codes: Vec<u16>,
        pub id_deltas: Vec<i16>,
        pub id_range_offsets: Vec<u16>,
        pub glyph_id_array: Vec<u16>,
    }

    impl WriteBinary<Self> for Cmap {
        type Output = ();

        fn write<C: WriteContext>(ctxt: &mut C, table: Cmap) -> Result<(), WriteError> {
            let start = ctxt.bytes_written();
            U16Be::write(ctxt, 0u16)?; // version
            U16Be::write(ctxt, u16::try_from(table.encoding_records.len())?)?;

            // encoding records
            let mut offsets = Vec::with_capacity(table.encoding_records.len());
            for record in &table.encoding_records {
                U16Be::write(ctxt, record.platform_id)?;
                U16Be::write(ctxt, record.encoding_id)?;
                let offset = ctxt.placeholder::<U32Be, u32>()?;
                offsets.push(offset);
            }

            // sub-tables
            for (record, placeholder) in table.encoding_records.iter().zip(offsets.into_iter()) {
                let offset = u32::try_from(ctxt.bytes_written() - start)?;
                CmapSubtableFormat4::write(ctxt, &record.sub_table)?;
                ctxt.write_placeholder(placeholder, offset)?;
            }

            Ok(())
        }
    }

    impl WriteBinary<&Self> for CmapSubtableFormat4 {
        type Output = ();

        fn write<C: WriteContext>(
            ctxt: &mut C,
            table: &CmapSubtableFormat4,
        ) -> Result<(), WriteError> {
            // the format mandates at least the final 0xFFFF segment
            if table.start_codes.is_empty() {
                return Err(WriteError::BadValue);
            }

            let start = ctxt.bytes_written();
            let calc = Format4Calculator {
                seg_count: u16::try_from(table.start_codes.len())?,
            };

            U16Be::write(ctxt, 4u16)?; // format
            let length = ctxt.placeholder::<U16Be, u16>()?;
            U16Be::write(ctxt, table.language)?;
            U16Be::write(ctxt, calc.seg_count_x2())?;
            U16Be::write(ctxt, calc.search_range())?;
            U16Be::write(ctxt, calc.entry_selector())?;
            U16Be::write(ctxt, calc.range_shift())?;
            for &end_code in &table.end_codes {
                U16Be::write(ctxt, end_code)?;
            }
            U16Be::write(ctxt, 0u16)?; // reserved_pad
            for &start_code in &table.start_codes {
                U16Be::write(ctxt, start_code)?;
            }
            for &id_delta in &table.id_deltas {
                I16Be::write(ctxt, id_delta)?;
            }
            for &id_range_offset in &table.id_range_offsets {
                U16Be::write(ctxt, id_range_offset)?;
            }
            for &glyph_id in &table.glyph_id_array {
                U16Be::write(ctxt, glyph_id)?;
            }
            ctxt.write_placeholder(length, u16::try_from(ctxt.bytes_written() - start)?)?;

            Ok(())
        }
    }

    impl CmapSubtableFormat4 {
        pub(crate) fn new() -> Self {
            CmapSubtableFormat4 {
                language: 0,
                end_codes: Vec::new(),
                start_codes: Vec::new(),
                id_deltas: Vec::new(),
                id_range_offsets: Vec::new(),
                glyph_id_array: Vec::new(),
            }
        }

        /// The encoded subtable size in bytes.
        pub fn encoded_len(&self) -> usize {
            (8 + 4 * self.start_codes.len() + self.glyph_id_array.len()) * size::U16
        }
    }
}
