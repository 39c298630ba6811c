//! End-to-end round trips through both codecs.

use runmap::binary::read::ReadScope;
use runmap::binary::write;
use runmap::cmap::owned::CmapSubtableFormat4;
use runmap::cmap::CmapSubtable;
use runmap::error::{ParseError, ReadWriteError};
use runmap::mapping::SortedMapping;
use runmap::widths::CidWidths;

fn encode_subtable(mapping: &SortedMapping) -> Result<Vec<u8>, ReadWriteError> {
    let table = CmapSubtableFormat4::from_mapping(mapping)?;
    let (_, buffer) = write::buffer::<_, CmapSubtableFormat4>(&table)?;
    Ok(buffer.into_inner())
}

fn decode_subtable(data: &[u8]) -> Result<SortedMapping, ReadWriteError> {
    let subtable = ReadScope::new(data).read::<CmapSubtable<'_>>()?;
    Ok(subtable.mappings()?)
}

#[test]
fn cmap_roundtrip_ascii_font() -> Result<(), ReadWriteError> {
    // a small latin font: ascii block mapped densely, a few extras sparse
    let mut pairs: Vec<(u32, u32)> = (0x20..0x7F).map(|code| (code, code - 0x1F)).collect();
    pairs.extend([(0xA9, 96), (0x2013, 97), (0x2014, 98), (0xFB01, 99)]);
    let mapping = SortedMapping::from_pairs(pairs);

    let data = encode_subtable(&mapping)?;
    assert_eq!(decode_subtable(&data)?, mapping);
    Ok(())
}

#[test]
fn cmap_roundtrip_shuffled_glyph_order() -> Result<(), ReadWriteError> {
    // glyph ids assigned by usage frequency, so no delta run survives long
    let pairs: Vec<(u32, u32)> = (0..200u32)
        .map(|i| (0x400 + i * 3, (i * 7919 % 1000) + 1))
        .collect();
    let mapping = SortedMapping::from_pairs(pairs);

    let data = encode_subtable(&mapping)?;
    assert_eq!(decode_subtable(&data)?, mapping);
    Ok(())
}

#[test]
fn cmap_reencode_is_idempotent() -> Result<(), ReadWriteError> {
    let mapping = SortedMapping::from_pairs(vec![
        (97, 1),
        (98, 2),
        (105, 4),
        (106, 3),
        (0x3B1, 5),
        (0x3B2, 6),
        (0x3B3, 7),
    ]);

    let decoded = decode_subtable(&encode_subtable(&mapping)?)?;
    let again = decode_subtable(&encode_subtable(&decoded)?)?;
    assert_eq!(again, decoded);
    assert_eq!(decoded, mapping);
    Ok(())
}

#[test]
fn cmap_absent_codes_decode_to_no_mapping() -> Result<(), ReadWriteError> {
    let mapping = SortedMapping::from_pairs(vec![(100, 1), (102, 2)]);
    let data = encode_subtable(&mapping)?;
    let subtable = ReadScope::new(&data).read::<CmapSubtable<'_>>()?;

    assert_eq!(subtable.map_glyph(100)?, Some(1));
    assert_eq!(subtable.map_glyph(101)?, None); // bridged by .notdef
    assert_eq!(subtable.map_glyph(102)?, Some(2));
    assert_eq!(subtable.map_glyph(103)?, None);
    assert_eq!(subtable.map_glyph(0xFFFF)?, None);
    Ok(())
}

#[test]
fn cmap_encoding_no_larger_than_all_explicit() -> Result<(), ReadWriteError> {
    let pairs: Vec<(u32, u32)> = (0..500u32).map(|i| (i * 2, i + 1)).collect();
    let mapping = SortedMapping::from_pairs(pairs);
    let table = CmapSubtableFormat4::from_mapping(&mapping)?;

    // every entry in its own explicit segment, plus the sentinel
    let naive_len = (8 + 4 * (mapping.len() + 1) + mapping.len()) * 2;
    assert!(table.encoded_len() <= naive_len);
    Ok(())
}

#[test]
fn cmap_truncated_buffer_is_an_error() {
    let mapping = SortedMapping::from_pairs(vec![(65, 1), (66, 2)]);
    let data = encode_subtable(&mapping).expect("encode failed");
    for len in 0..data.len() {
        match decode_subtable(&data[..len]) {
            Err(ReadWriteError::Read(ParseError::MalformedHeader)) => {}
            other => panic!("truncation to {} bytes: {:?}", len, other),
        }
    }
}

#[test]
fn widths_roundtrip_mixed_runs() {
    let mapping = SortedMapping::from_pairs(vec![
        (1, 600),
        (2, 600),
        (3, 600),
        (4, 333),
        (5, 334),
        (6, 333),
        (17, 600),
        (18, 722),
        (40, 600),
    ]);
    let widths = CidWidths::from_mapping(&mapping, 1000).expect("encode failed");
    let parsed =
        CidWidths::parse(&widths.to_pdf_array(), widths.default_width()).expect("parse failed");

    for (cid, width) in mapping.iter() {
        assert_eq!(parsed.width(cid), width, "cid {}", cid);
    }
    // absent CIDs take the default
    assert_eq!(parsed.width(1000), widths.default_width());
}

#[test]
fn widths_reencode_is_idempotent() {
    let mapping = SortedMapping::from_pairs(vec![(10, 5), (20, 5), (30, 7)]);
    let widths = CidWidths::from_mapping(&mapping, 1000).expect("encode failed");
    let parsed =
        CidWidths::parse(&widths.to_pdf_array(), widths.default_width()).expect("parse failed");

    // rebuild a mapping from the decoded table and encode again
    let rebuilt = SortedMapping::from_pairs(mapping.iter().map(|(cid, _)| (cid, parsed.width(cid))));
    let again = CidWidths::from_mapping(&rebuilt, 1000).expect("encode failed");
    assert_eq!(again.to_pdf_array(), widths.to_pdf_array());
    assert_eq!(again.default_width(), widths.default_width());
}

#[test]
fn widths_scaled_roundtrip() {
    // upem 2048 design units scale to thousandths of an em on encode
    let mapping = SortedMapping::from_pairs(vec![(7, 1024), (8, 1229), (9, 2048)]);
    let widths = CidWidths::from_mapping(&mapping, 2048).expect("encode failed");
    let parsed =
        CidWidths::parse(&widths.to_pdf_array(), widths.default_width()).expect("parse failed");

    assert_eq!(parsed.width(7), 500);
    assert_eq!(parsed.width(8), 600);
    assert_eq!(parsed.width(9), 1000);
}
