//! PDF CID-keyed font width tables, the `W` array and `DW` scalar.
//!
//! Widths enter in font design units and leave in the PDF convention of
//! 1000 units per em. Segmentation runs on the unscaled values so that
//! rounding cannot merge or split runs; scaling happens once, after the
//! partition is chosen.
//!
//! The `W` array alternates between `first last width` triples for constant
//! runs and `first [w1 w2 ...]` pairs for varying runs. Entries whose width
//! equals `DW` are left out entirely. Costs are counted in tokens with a
//! fixed width per integer, which keeps the comparison simple at the price
//! of occasionally picking a slightly longer (but still correct) rendering.

use std::cmp::Reverse;
use std::fmt::Write as _;

use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::{ParseError, WriteError};
use crate::mapping::{Entry, SortedMapping};
use crate::segment::{min_cost_partition, Candidate};

/// A `first last width` triple costs three tokens.
const RANGE_TOKENS: u64 = 3;

/// A `first [ ... ]` run costs two tokens of overhead plus one per width.
const ARRAY_TOKENS: u64 = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum WidthMode {
    /// Width equals `DW`; no `W` entry at all.
    Omitted,
    /// Contiguous CIDs, constant width.
    Range,
    /// Contiguous CIDs, widths listed individually.
    Array,
}

/// One entry of the `W` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidthRun {
    Range { first: u32, last: u32, width: u32 },
    Array { first: u32, widths: Vec<u32> },
}

impl WidthRun {
    fn first(&self) -> u32 {
        match *self {
            WidthRun::Range { first, .. } | WidthRun::Array { first, .. } => first,
        }
    }

    fn last(&self) -> u32 {
        match *self {
            WidthRun::Range { last, .. } => last,
            WidthRun::Array { first, ref widths } => first + (widths.len() as u32 - 1),
        }
    }
}

/// A complete width table: the default width plus the explicit runs,
/// ascending and disjoint by CID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidWidths {
    default_width: u32,
    runs: Vec<WidthRun>,
}

fn candidates(
    entries: &[Entry],
    default_width: u32,
    start: usize,
    out: &mut Vec<Candidate<WidthMode>>,
) {
    let first = entries[start];

    // Maximal omitted run. CIDs need not be contiguous since absent CIDs
    // take the default width anyway.
    if first.value == default_width {
        let mut end = start + 1;
        while end < entries.len() && entries[end].value == default_width {
            end += 1;
        }
        out.push(Candidate {
            end,
            cost: 0,
            mode: WidthMode::Omitted,
        });
    }

    // Maximal constant-width range.
    let mut end = start + 1;
    while end < entries.len()
        && entries[end].key == entries[end - 1].key + 1
        && entries[end].value == first.value
    {
        end += 1;
    }
    out.push(Candidate {
        end,
        cost: RANGE_TOKENS,
        mode: WidthMode::Range,
    });

    // Arrays of every length while the CIDs stay contiguous. An array may
    // absorb default-width entries when that beats splitting the run.
    for end in start + 1..=entries.len() {
        out.push(Candidate {
            end,
            cost: ARRAY_TOKENS + (end - start) as u64,
            mode: WidthMode::Array,
        });
        if end < entries.len() && entries[end].key != entries[end - 1].key + 1 {
            break;
        }
    }
}

/// The most frequent width across all entries, smallest on a tie. An empty
/// mapping falls back to the PDF default of 1000.
fn choose_default_width(entries: &[Entry]) -> u32 {
    let mut counts: FxHashMap<u32, usize> = FxHashMap::default();
    for entry in entries {
        *counts.entry(entry.value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(width, count)| (count, Reverse(width)))
        .map(|(width, _)| width)
        .unwrap_or(1000)
}

fn scale_width(width: u32, units_per_em: u16) -> Result<u32, WriteError> {
    let units_per_em = u64::from(units_per_em);
    let scaled = (u64::from(width) * 1000 + units_per_em / 2) / units_per_em;
    Ok(u32::try_from(scaled)?)
}

impl CidWidths {
    /// Build a width table covering `mapping`, scaling widths from
    /// `units_per_em` design units to thousandths of an em.
    pub fn from_mapping(mapping: &SortedMapping, units_per_em: u16) -> Result<Self, WriteError> {
        if units_per_em == 0 {
            return Err(WriteError::BadValue);
        }

        let entries = mapping.entries();
        let default_width = choose_default_width(entries);
        let partition = min_cost_partition(entries.len(), |start, out| {
            candidates(entries, default_width, start, out)
        })?;

        let mut runs = Vec::new();
        for run in &partition {
            let slice = &entries[run.start..run.end];
            match run.mode {
                WidthMode::Omitted => {}
                WidthMode::Range => runs.push(WidthRun::Range {
                    first: slice[0].key,
                    last: slice[slice.len() - 1].key,
                    width: scale_width(slice[0].value, units_per_em)?,
                }),
                WidthMode::Array => runs.push(WidthRun::Array {
                    first: slice[0].key,
                    widths: slice
                        .iter()
                        .map(|entry| scale_width(entry.value, units_per_em))
                        .collect::<Result<_, _>>()?,
                }),
            }
        }

        debug!(
            "cid widths: {} entries in {} W runs, DW {}",
            entries.len(),
            runs.len(),
            default_width
        );

        Ok(CidWidths {
            default_width: scale_width(default_width, units_per_em)?,
            runs,
        })
    }

    /// The `DW` value in thousandths of an em.
    pub fn default_width(&self) -> u32 {
        self.default_width
    }

    /// The `W` runs, ascending and disjoint by CID.
    pub fn runs(&self) -> &[WidthRun] {
        &self.runs
    }

    /// Look up the advance width for `cid`.
    pub fn width(&self, cid: u32) -> u32 {
        for run in &self.runs {
            match *run {
                WidthRun::Range { first, last, width } => {
                    if first <= cid && cid <= last {
                        return width;
                    }
                }
                WidthRun::Array { first, ref widths } => {
                    if first <= cid && cid - first < widths.len() as u32 {
                        return widths[(cid - first) as usize];
                    }
                }
            }
        }
        self.default_width
    }

    /// Render the `W` array in PDF syntax, e.g. `[30 30 7 40 [1 2 3]]`.
    pub fn to_pdf_array(&self) -> String {
        let mut out = String::from("[");
        for (i, run) in self.runs.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match *run {
                WidthRun::Range { first, last, width } => {
                    // NOTE(unwrap): writing to a String cannot fail
                    write!(out, "{} {} {}", first, last, width).unwrap();
                }
                WidthRun::Array { first, ref widths } => {
                    write!(out, "{} [{}]", first, widths.iter().join(" ")).unwrap();
                }
            }
        }
        out.push(']');
        out
    }

    /// Parse a `W` array back into a width table.
    ///
    /// `default_width` supplies the accompanying `DW` value, which the `W`
    /// syntax does not carry. Runs must be ascending and disjoint.
    pub fn parse(text: &str, default_width: u32) -> Result<Self, ParseError> {
        let tokens = lex(text)?;
        let tokens = strip_outer_brackets(&tokens)?;

        let mut runs: Vec<WidthRun> = Vec::new();
        let mut pos = 0;
        while pos < tokens.len() {
            let first = match tokens[pos] {
                Token::Number(first) => first,
                _ => return Err(ParseError::MalformedHeader),
            };
            pos += 1;
            let run = match tokens.get(pos) {
                Some(Token::Open) => {
                    pos += 1;
                    let mut widths = Vec::new();
                    loop {
                        match tokens.get(pos) {
                            Some(&Token::Number(width)) => {
                                widths.push(width);
                                pos += 1;
                            }
                            Some(Token::Close) => {
                                pos += 1;
                                break;
                            }
                            _ => return Err(ParseError::MalformedHeader),
                        }
                    }
                    if widths.is_empty() {
                        return Err(ParseError::MalformedHeader);
                    }
                    first
                        .checked_add(widths.len() as u32 - 1)
                        .ok_or(ParseError::MalformedHeader)?;
                    WidthRun::Array { first, widths }
                }
                Some(&Token::Number(last)) => {
                    pos += 1;
                    let width = match tokens.get(pos) {
                        Some(&Token::Number(width)) => width,
                        _ => return Err(ParseError::MalformedHeader),
                    };
                    pos += 1;
                    if last < first {
                        return Err(ParseError::InconsistentSegment);
                    }
                    WidthRun::Range { first, last, width }
                }
                _ => return Err(ParseError::MalformedHeader),
            };
            if let Some(prev) = runs.last() {
                if run.first() <= prev.last() {
                    return Err(ParseError::InconsistentSegment);
                }
            }
            runs.push(run);
        }

        Ok(CidWidths {
            default_width,
            runs,
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Number(u32),
}

fn lex(text: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b']' => {
                tokens.push(Token::Close);
                i += 1;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let value = text[start..i]
                    .parse::<u32>()
                    .map_err(|_| ParseError::MalformedHeader)?;
                tokens.push(Token::Number(value));
            }
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            _ => return Err(ParseError::MalformedHeader),
        }
    }
    Ok(tokens)
}

/// Drop the enclosing `[ ]` of the `W` array when present. The outer
/// bracket is unambiguous since every run starts with a number. A trailing
/// `]` alone is fine (the final run may be an array); stray closers are
/// rejected by the run parser.
fn strip_outer_brackets(tokens: &[Token]) -> Result<&[Token], ParseError> {
    match tokens {
        [Token::Open, inner @ .., Token::Close] => Ok(inner),
        [Token::Open, ..] => Err(ParseError::MalformedHeader),
        _ => Ok(tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_list(pairs: &[(u32, u32)]) -> SortedMapping {
        SortedMapping::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_default_width_most_frequent() {
        let mapping = entry_list(&[(1, 500), (2, 600), (3, 500), (4, 500)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        assert_eq!(widths.default_width(), 500);
    }

    #[test]
    fn test_default_width_tie_prefers_smallest() {
        let mapping = entry_list(&[(1, 600), (2, 500)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        assert_eq!(widths.default_width(), 500);
    }

    #[test]
    fn test_default_width_empty_mapping() {
        let widths = CidWidths::from_mapping(&SortedMapping::default(), 1000).unwrap();
        assert_eq!(widths.default_width(), 1000);
        assert!(widths.runs().is_empty());
        assert_eq!(widths.to_pdf_array(), "[]");
    }

    #[test]
    fn test_default_width_entries_omitted() {
        // 10 and 20 carry the default width and produce no W entry
        let mapping = entry_list(&[(10, 5), (20, 5), (30, 7)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        assert_eq!(widths.default_width(), 5);
        assert_eq!(widths.to_pdf_array(), "[30 30 7]");
        assert_eq!(widths.width(10), 5);
        assert_eq!(widths.width(20), 5);
        assert_eq!(widths.width(30), 7);
        assert_eq!(widths.width(999), 5);
    }

    #[test]
    fn test_constant_run_becomes_range() {
        let mapping = entry_list(&[
            (1, 400),
            (2, 400),
            (3, 400),
            (10, 500),
            (20, 500),
            (30, 500),
            (40, 500),
        ]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        // 500 wins as DW; the contiguous 400s compress to one range
        assert_eq!(widths.default_width(), 500);
        assert_eq!(widths.to_pdf_array(), "[1 3 400]");
        assert_eq!(widths.width(2), 400);
        assert_eq!(widths.width(20), 500);
    }

    #[test]
    fn test_varying_run_becomes_array() {
        let mapping = entry_list(&[(4, 10), (5, 11), (6, 12), (100, 10)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        // 10 wins as DW, so CIDs 4 and 100 are omitted and the varying
        // remainder is listed as one array
        assert_eq!(widths.default_width(), 10);
        assert_eq!(widths.to_pdf_array(), "[5 [11 12]]");
        assert_eq!(widths.width(4), 10);
        assert_eq!(widths.width(5), 11);
        assert_eq!(widths.width(100), 10);
    }

    #[test]
    fn test_array_absorbs_default_width_entry() {
        // Splitting around the default-width CID 11 would cost two ranges
        // (6 tokens); one array costs 5.
        let mapping = entry_list(&[(10, 8), (11, 5), (12, 9)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        assert_eq!(widths.default_width(), 5);
        assert_eq!(widths.to_pdf_array(), "[10 [8 5 9]]");
    }

    #[test]
    fn test_scaling_units_per_em() {
        let mapping = entry_list(&[(1, 1024), (2, 600)]);
        let widths = CidWidths::from_mapping(&mapping, 2048).unwrap();
        // round(1024 * 1000 / 2048) = 500, round(600 * 1000 / 2048) = 293
        assert_eq!(widths.width(1), 500);
        assert_eq!(widths.width(2), 293);
    }

    #[test]
    fn test_zero_units_per_em_rejected() {
        let mapping = entry_list(&[(1, 500)]);
        assert_eq!(
            CidWidths::from_mapping(&mapping, 0),
            Err(WriteError::BadValue)
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let mapping = entry_list(&[(1, 500), (2, 501), (3, 502), (10, 250), (11, 250), (40, 500)]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        let parsed =
            CidWidths::parse(&widths.to_pdf_array(), widths.default_width()).expect("parse failed");
        assert_eq!(parsed, widths);
        for (cid, width) in mapping.iter() {
            assert_eq!(parsed.width(cid), width);
        }
    }

    #[test]
    fn test_parse_without_outer_brackets() {
        let widths = CidWidths::parse("30 30 7 40 [1 2 3]", 5).expect("parse failed");
        assert_eq!(widths.width(30), 7);
        assert_eq!(widths.width(41), 2);
        assert_eq!(widths.width(50), 5);
    }

    #[test]
    fn test_parse_malformed() {
        for text in [
            "30 30",
            "30 [5",
            "30 []",
            "[30 30 7",
            "30 30 7]",
            "30 x 7",
            "]30 30 7[",
        ] {
            assert_eq!(
                CidWidths::parse(text, 0),
                Err(ParseError::MalformedHeader),
                "input {:?}",
                text
            );
        }
    }

    #[test]
    fn test_parse_inconsistent_runs() {
        // reversed range
        assert_eq!(
            CidWidths::parse("30 20 7", 0),
            Err(ParseError::InconsistentSegment)
        );
        // second run starts inside the first
        assert_eq!(
            CidWidths::parse("10 20 7 15 [1]", 0),
            Err(ParseError::InconsistentSegment)
        );
    }

    #[test]
    fn test_cost_no_worse_than_all_arrays() {
        let mapping = entry_list(&[
            (1, 500),
            (2, 500),
            (3, 500),
            (4, 501),
            (9, 250),
            (10, 251),
            (11, 250),
            (40, 500),
        ]);
        let widths = CidWidths::from_mapping(&mapping, 1000).unwrap();
        // naive: one array per maximal contiguous CID block, nothing omitted
        let naive = CidWidths {
            default_width: widths.default_width(),
            runs: vec![
                WidthRun::Array {
                    first: 1,
                    widths: vec![500, 500, 500, 501],
                },
                WidthRun::Array {
                    first: 9,
                    widths: vec![250, 251, 250],
                },
                WidthRun::Array {
                    first: 40,
                    widths: vec![500],
                },
            ],
        };
        let token_count = |widths: &CidWidths| {
            widths
                .to_pdf_array()
                .split_whitespace()
                .count()
        };
        assert!(token_count(&widths) <= token_count(&naive));
        for (cid, width) in mapping.iter() {
            assert_eq!(widths.width(cid), width);
            assert_eq!(naive.width(cid), width);
        }
    }
}
