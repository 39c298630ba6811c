//! Building format 4 subtables from a sorted mapping.
//!
//! Candidate runs starting at each entry are fed to the shortest-path
//! segmenter, which picks the cheapest mix of delta segments (4 words each,
//! any length) and explicit segments (4 words plus one word per covered
//! code). A greedy scan is not enough here: a string of short delta runs can
//! cost more than one explicit block that swallows them all.

use log::debug;

use crate::cmap::owned;
use crate::error::WriteError;
use crate::mapping::{Entry, SortedMapping};
use crate::segment::{min_cost_partition, Candidate};

/// Per-segment overhead: one word in each of the four parallel arrays.
const SEGMENT_WORDS: u64 = 4;

/// An explicit segment bridges unmapped codes with .notdef entries, one word
/// each. A gap wider than the per-segment overhead is never worth bridging.
const MAX_GAP: u32 = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum SegmentMode {
    /// Glyph id minus code is constant over the run; stored as one idDelta.
    Delta,
    /// Glyph ids stored individually in the glyph id array.
    Explicit,
}

fn candidates(entries: &[Entry], start: usize, out: &mut Vec<Candidate<SegmentMode>>) {
    let first = entries[start];

    // Maximal delta run: contiguous codes, constant glyph-minus-code.
    let base = first.value.wrapping_sub(first.key);
    let mut end = start + 1;
    while end < entries.len()
        && entries[end].key == entries[end - 1].key + 1
        && entries[end].value.wrapping_sub(entries[end].key) == base
    {
        end += 1;
    }
    out.push(Candidate {
        end,
        cost: SEGMENT_WORDS,
        mode: SegmentMode::Delta,
    });

    // Explicit runs of every length, until a gap too wide to bridge.
    for end in start + 1..=entries.len() {
        let span = u64::from(entries[end - 1].key - first.key) + 1;
        out.push(Candidate {
            end,
            cost: SEGMENT_WORDS + span,
            mode: SegmentMode::Explicit,
        });
        if end < entries.len() && entries[end].key - entries[end - 1].key - 1 > MAX_GAP {
            break;
        }
    }
}

impl owned::CmapSubtableFormat4 {
    /// Build a format 4 subtable covering `mapping`.
    ///
    /// Keys and values must fit the 16-bit code and glyph spaces. Entries
    /// mapped to glyph 0 carry no information (glyph 0 means "no mapping")
    /// and are skipped. The mandatory final 0xFFFF segment is appended after
    /// segmentation; a mapping for code 0xFFFF itself rides along in that
    /// segment's idDelta.
    pub fn from_mapping(mapping: &SortedMapping) -> Result<Self, WriteError> {
        let mut sentinel_glyph = 0u32;
        let mut entries = Vec::with_capacity(mapping.len());
        for &entry in mapping.entries() {
            if entry.key > 0xFFFF || entry.value > 0xFFFF {
                return Err(WriteError::BadValue);
            }
            if entry.value == 0 {
                continue;
            }
            if entry.key == 0xFFFF {
                sentinel_glyph = entry.value;
                continue;
            }
            entries.push(entry);
        }

        let runs = min_cost_partition(entries.len(), |start, out| {
            candidates(&entries, start, out)
        })?;

        let mut table = owned::CmapSubtableFormat4::new();
        let mut fixups = Vec::new();
        for run in &runs {
            table.add_segment(&entries[run.start..run.end], run.mode, &mut fixups);
        }

        // Final start and end codes must be 0xFFFF; the segment must be
        // present even when it maps nothing.
        table.start_codes.push(0xFFFF);
        table.end_codes.push(0xFFFF);
        table
            .id_deltas
            .push(if sentinel_glyph == 0 {
                1 // 0xFFFF + 1 wraps to glyph 0
            } else {
                (sentinel_glyph as i32 - 0xFFFF) as i16
            });
        table.id_range_offsets.push(0);

        // segCountX2 must fit a 16-bit field
        let num_segments = table.end_codes.len();
        if num_segments > usize::from(u16::MAX / 2) {
            return Err(WriteError::CapacityExceeded);
        }

        // Fix up idRangeOffsets now that the segment count is known: each is
        // a byte offset from its own slot to the run's block in the glyph id
        // array.
        for index in fixups {
            let id_range_offset = &mut table.id_range_offsets[index];
            let count = num_segments - index + usize::from(*id_range_offset);
            *id_range_offset = u16::try_from(2 * count)?;
        }

        debug!(
            "cmap format 4: {} entries in {} segments, {} explicit words",
            entries.len(),
            num_segments,
            table.glyph_id_array.len()
        );

        Ok(table)
    }

    fn add_segment(&mut self, entries: &[Entry], mode: SegmentMode, fixups: &mut Vec<usize>) {
        // NOTE: runs are never empty and all keys/values fit u16, checked in
        // from_mapping
        let first = entries[0];
        let last = entries[entries.len() - 1];
        self.start_codes.push(first.key as u16);
        self.end_codes.push(last.key as u16);

        match mode {
            SegmentMode::Delta => {
                self.id_deltas
                    .push((first.value as i32 - first.key as i32) as i16);
                self.id_range_offsets.push(0);
            }
            SegmentMode::Explicit => {
                self.id_deltas.push(0);
                // provisional value is the glyph id array index; rewritten in
                // the fix-up pass above
                fixups.push(self.id_range_offsets.len());
                self.id_range_offsets.push(self.glyph_id_array.len() as u16);
                let mut next_code = first.key;
                for entry in entries {
                    // unmapped codes inside the run become .notdef
                    for _ in next_code..entry.key {
                        self.glyph_id_array.push(0);
                    }
                    self.glyph_id_array.push(entry.value as u16);
                    next_code = entry.key + 1;
                }
            }
        }
    }
}
