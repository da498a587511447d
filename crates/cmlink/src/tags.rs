//! Byte-level ICC tag table editing.
//!
//! The engine emits a finished device-link byte stream; the provenance
//! tags the serializer adds on top (`psid`, `Info`, a default `cprt`) are
//! appended here by rewriting the tag table directly. Only appending is
//! supported, never general tag-table editing.
//!
//! An ICC stream is a 128-byte header, a `u32` tag count, a table of
//! 12-byte entries (signature, offset, size) and the tag data. All
//! integers are big-endian and tag data is 4-byte aligned.

use cmlink_core::{Error, Result};

/// Tag table entry size in bytes.
const ENTRY_SIZE: usize = 12;

/// Offset of the tag count word.
const TABLE_OFFSET: usize = 128;

/// Profile sequence identifier tag.
pub const TAG_PSID: u32 = u32::from_be_bytes(*b"psid");

/// Free-form build information tag.
pub const TAG_INFO: u32 = u32::from_be_bytes(*b"Info");

/// Copyright tag.
pub const TAG_COPYRIGHT: u32 = u32::from_be_bytes(*b"cprt");

/// Whether the stream's tag table contains `signature`.
pub fn has_tag(bytes: &[u8], signature: u32) -> bool {
    tag_entries(bytes)
        .map(|entries| entries.iter().any(|e| e.signature == signature))
        .unwrap_or(false)
}

/// Returns the raw data of `signature`, when present.
pub fn tag_data(bytes: &[u8], signature: u32) -> Option<Vec<u8>> {
    let entries = tag_entries(bytes).ok()?;
    let entry = entries.iter().find(|e| e.signature == signature)?;
    bytes
        .get(entry.offset..entry.offset + entry.size)
        .map(|data| data.to_vec())
}

/// Rebuilds the stream with `extra` tags appended.
///
/// Every existing tag keeps its data verbatim at a new offset. The header
/// size field is updated and the embedded profile ID at bytes 84..100 is
/// zeroed, since the checksum no longer matches the content.
pub fn append_tags(bytes: &[u8], extra: &[(u32, Vec<u8>)]) -> Result<Vec<u8>> {
    let entries = tag_entries(bytes)?;
    let mut tags: Vec<(u32, Vec<u8>)> = Vec::with_capacity(entries.len() + extra.len());
    for entry in &entries {
        let data = bytes
            .get(entry.offset..entry.offset + entry.size)
            .ok_or(Error::ProfileSizeMismatch {
                declared: entry.offset + entry.size,
                actual: bytes.len(),
            })?;
        tags.push((entry.signature, data.to_vec()));
    }
    for (signature, data) in extra {
        tags.push((*signature, data.clone()));
    }

    let table_bytes = 4 + tags.len() * ENTRY_SIZE;
    let mut data_offset = TABLE_OFFSET + table_bytes;
    let mut table = Vec::with_capacity(table_bytes);
    let mut data = Vec::new();
    table.extend_from_slice(&(tags.len() as u32).to_be_bytes());
    for (signature, payload) in &tags {
        data_offset = align4(data_offset);
        table.extend_from_slice(&signature.to_be_bytes());
        table.extend_from_slice(&(data_offset as u32).to_be_bytes());
        table.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        while data.len() < data_offset - TABLE_OFFSET - table_bytes {
            data.push(0);
        }
        data.extend_from_slice(payload);
        data_offset += payload.len();
    }

    let mut out = Vec::with_capacity(TABLE_OFFSET + table_bytes + data.len());
    out.extend_from_slice(&bytes[..TABLE_OFFSET]);
    out.extend_from_slice(&table);
    out.extend_from_slice(&data);
    let total = out.len() as u32;
    out[..4].copy_from_slice(&total.to_be_bytes());
    // Stale checksum.
    out[84..100].fill(0);
    Ok(out)
}

/// Encodes ASCII text as a `text` type tag.
pub fn text_tag(text: &str) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 + text.len() + 1);
    data.extend_from_slice(b"text");
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(text.as_bytes());
    data.push(0);
    data
}

/// Encodes text as a single-record en/US `mluc` type tag.
pub fn mluc_tag(text: &str) -> Vec<u8> {
    let utf16: Vec<u8> = text
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect();
    let mut data = Vec::with_capacity(28 + utf16.len());
    data.extend_from_slice(b"mluc");
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&12u32.to_be_bytes());
    data.extend_from_slice(b"enUS");
    data.extend_from_slice(&(utf16.len() as u32).to_be_bytes());
    data.extend_from_slice(&28u32.to_be_bytes());
    data.extend_from_slice(&utf16);
    data
}

/// Encodes a profile sequence identifier (`psid`) type tag: per chain
/// profile its 16-byte ID and an `mluc` description.
pub fn psid_tag(sequence: &[([u8; 16], String)]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = sequence
        .iter()
        .map(|(hash, description)| {
            let mut record = Vec::with_capacity(16 + 28 + description.len() * 2);
            record.extend_from_slice(hash);
            record.extend_from_slice(&mluc_tag(description));
            record
        })
        .collect();

    let positions_offset = 12;
    let mut record_offset = positions_offset + records.len() * 8;
    let mut data = Vec::new();
    data.extend_from_slice(b"psid");
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&(records.len() as u32).to_be_bytes());
    for record in &records {
        data.extend_from_slice(&(record_offset as u32).to_be_bytes());
        data.extend_from_slice(&(record.len() as u32).to_be_bytes());
        record_offset += record.len();
    }
    for record in &records {
        data.extend_from_slice(record);
    }
    data
}

/// Decodes a `text` type tag back into a string, for inspection.
pub fn read_text_tag(bytes: &[u8], signature: u32) -> Option<String> {
    let data = tag_data(bytes, signature)?;
    if data.len() < 8 || &data[..4] != b"text" {
        return None;
    }
    let body = &data[8..];
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    String::from_utf8(body[..end].to_vec()).ok()
}

struct TagEntry {
    signature: u32,
    offset: usize,
    size: usize,
}

fn tag_entries(bytes: &[u8]) -> Result<Vec<TagEntry>> {
    if bytes.len() < TABLE_OFFSET + 4 {
        return Err(Error::ProfileTooShort { len: bytes.len() });
    }
    let count = u32::from_be_bytes([bytes[128], bytes[129], bytes[130], bytes[131]]) as usize;
    let table_end = TABLE_OFFSET + 4 + count * ENTRY_SIZE;
    if bytes.len() < table_end {
        return Err(Error::ProfileSizeMismatch {
            declared: table_end,
            actual: bytes.len(),
        });
    }
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let at = TABLE_OFFSET + 4 + i * ENTRY_SIZE;
        let word = |o: usize| {
            u32::from_be_bytes([bytes[at + o], bytes[at + o + 1], bytes[at + o + 2], bytes[at + o + 3]])
        };
        entries.push(TagEntry {
            signature: word(0),
            offset: word(4) as usize,
            size: word(8) as usize,
        });
    }
    Ok(entries)
}

const fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmlink_engine::stub_profile_bytes;

    #[test]
    fn test_append_and_read_text() {
        let base = stub_profile_bytes(b"link", b"RGB ");
        let out = append_tags(&base, &[(TAG_INFO, text_tag("built by hand"))]).unwrap();

        assert!(has_tag(&out, TAG_INFO));
        assert_eq!(read_text_tag(&out, TAG_INFO).as_deref(), Some("built by hand"));
        // Header size tracks the grown stream.
        let declared = u32::from_be_bytes([out[0], out[1], out[2], out[3]]) as usize;
        assert_eq!(declared, out.len());
        assert!(out[84..100].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_append_preserves_existing_tags() {
        let base = stub_profile_bytes(b"link", b"RGB ");
        let first = append_tags(&base, &[(TAG_COPYRIGHT, text_tag("no copyright; use freely"))])
            .unwrap();
        let second = append_tags(&first, &[(TAG_INFO, text_tag("info"))]).unwrap();

        assert!(has_tag(&second, TAG_COPYRIGHT));
        assert!(has_tag(&second, TAG_INFO));
        assert_eq!(
            read_text_tag(&second, TAG_COPYRIGHT).as_deref(),
            Some("no copyright; use freely")
        );
    }

    #[test]
    fn test_tag_offsets_are_aligned() {
        let base = stub_profile_bytes(b"link", b"RGB ");
        let out = append_tags(
            &base,
            &[
                (TAG_INFO, text_tag("odd")),
                (TAG_COPYRIGHT, text_tag("also odd")),
            ],
        )
        .unwrap();
        for i in 0..2 {
            let at = 132 + i * 12;
            let offset = u32::from_be_bytes([out[at + 4], out[at + 5], out[at + 6], out[at + 7]]);
            assert_eq!(offset % 4, 0);
        }
    }

    #[test]
    fn test_psid_layout() {
        let data = psid_tag(&[
            ([0xAA; 16], "first".to_string()),
            ([0xBB; 16], "second".to_string()),
        ]);
        assert_eq!(&data[..4], b"psid");
        let count = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
        assert_eq!(count, 2);
        let first_offset =
            u32::from_be_bytes([data[12], data[13], data[14], data[15]]) as usize;
        assert_eq!(&data[first_offset..first_offset + 16], &[0xAA; 16]);
        assert_eq!(&data[first_offset + 16..first_offset + 20], b"mluc");
    }

    #[test]
    fn test_mluc_utf16() {
        let data = mluc_tag("ab");
        assert_eq!(&data[..4], b"mluc");
        assert_eq!(&data[16..20], b"enUS");
        assert_eq!(&data[28..32], &[0, b'a', 0, b'b']);
    }

    #[test]
    fn test_truncated_stream_rejected() {
        assert!(append_tags(&[0u8; 100], &[]).is_err());
        assert!(!has_tag(&[0u8; 100], TAG_INFO));
    }
}
