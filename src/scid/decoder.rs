//! Pure decoding of `.scid` intraday records and offset arithmetic.
//!
//! Layout per record (little-endian):
//!
//! | bytes  | field        | type |
//! |--------|--------------|------|
//! | 0..8   | scdatetime   | u64  |
//! | 8..24  | open..close  | f32  |
//! | 24..40 | numtrades, totalvolume, bidvolume, askvolume | u32 |

use crate::config::{SCID_HEADER_SIZE, SCID_RECORD_SIZE};
use crate::error::{AppError, Result};
use crate::types::RawRecord;

const RECORD_LEN: usize = SCID_RECORD_SIZE as usize;

/// Decode a buffer holding only whole records.
pub fn decode_records(buf: &[u8]) -> Result<Vec<RawRecord>> {
    if buf.len() % RECORD_LEN != 0 {
        return Err(AppError::Misaligned(buf.len()));
    }
    Ok(buf.chunks_exact(RECORD_LEN).map(decode_one).collect())
}

fn decode_one(b: &[u8]) -> RawRecord {
    let read_u64 = |o: usize| -> u64 {
        let mut tmp = [0u8; 8];
        tmp.copy_from_slice(&b[o..o + 8]);
        u64::from_le_bytes(tmp)
    };
    let read_u32 = |o: usize| -> u32 {
        let mut tmp = [0u8; 4];
        tmp.copy_from_slice(&b[o..o + 4]);
        u32::from_le_bytes(tmp)
    };
    let read_f32 = |o: usize| -> f32 { f32::from_bits(read_u32(o)) };

    RawRecord {
        scdatetime: read_u64(0),
        open: read_f32(8),
        high: read_f32(12),
        low: read_f32(16),
        close: read_f32(20),
        numtrades: read_u32(24),
        totalvolume: read_u32(28),
        bidvolume: read_u32(32),
        askvolume: read_u32(36),
    }
}

/// Largest record boundary (`56 + 40·k`) at or below `pos`. Anything inside the
/// header maps to the first boundary.
pub fn align_down(pos: u64) -> u64 {
    if pos < SCID_HEADER_SIZE {
        return SCID_HEADER_SIZE;
    }
    SCID_HEADER_SIZE + (pos - SCID_HEADER_SIZE) / SCID_RECORD_SIZE * SCID_RECORD_SIZE
}

/// Offset a read actually starts at, given the caller's requested offset and the
/// current file size. Never fails: out-of-range requests are clamped.
pub fn resume_offset(requested: u64, file_size: u64) -> u64 {
    if requested >= file_size {
        align_down(file_size)
    } else {
        align_down(requested)
    }
}

#[cfg(test)]
pub(crate) fn encode_record(r: &RawRecord) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..8].copy_from_slice(&r.scdatetime.to_le_bytes());
    out[8..12].copy_from_slice(&r.open.to_le_bytes());
    out[12..16].copy_from_slice(&r.high.to_le_bytes());
    out[16..20].copy_from_slice(&r.low.to_le_bytes());
    out[20..24].copy_from_slice(&r.close.to_le_bytes());
    out[24..28].copy_from_slice(&r.numtrades.to_le_bytes());
    out[28..32].copy_from_slice(&r.totalvolume.to_le_bytes());
    out[32..36].copy_from_slice(&r.bidvolume.to_le_bytes());
    out[36..40].copy_from_slice(&r.askvolume.to_le_bytes());
    out
}

#[cfg(test)]
pub(crate) fn sample_record(seq: u32, bidvolume: u32, askvolume: u32) -> RawRecord {
    RawRecord {
        scdatetime: 3_900_000_000_000_000 + u64::from(seq) * 1_000,
        open: 5_000.0 + seq as f32,
        high: 5_000.25 + seq as f32,
        low: 4_999.75 + seq as f32,
        close: 5_000.5 + seq as f32,
        numtrades: 1,
        totalvolume: bidvolume + askvolume,
        bidvolume,
        askvolume,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_fields_at_fixed_offsets() {
        let rec = sample_record(7, 3, 9);
        let decoded = decode_records(&encode_record(&rec)).unwrap();
        assert_eq!(decoded, vec![rec]);
    }

    #[test]
    fn decodes_hand_built_bytes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&42u64.to_le_bytes());
        for p in [1.5f32, 2.0, 1.0, 1.75] {
            buf.extend_from_slice(&p.to_le_bytes());
        }
        for v in [4u32, 10, 6, 4] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        let recs = decode_records(&buf).unwrap();
        assert_eq!(recs.len(), 1);
        let r = recs[0];
        assert_eq!(r.scdatetime, 42);
        assert_eq!(r.close, 1.75);
        assert_eq!((r.numtrades, r.totalvolume, r.bidvolume, r.askvolume), (4, 10, 6, 4));
    }

    #[test]
    fn rejects_partial_record() {
        let buf = vec![0u8; 41];
        assert!(matches!(decode_records(&buf), Err(AppError::Misaligned(41))));
    }

    #[test]
    fn empty_buffer_is_empty_sequence() {
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn offsets_below_header_clamp_to_header() {
        assert_eq!(resume_offset(0, 500), 56);
        assert_eq!(resume_offset(55, 500), 56);
        assert_eq!(resume_offset(0, 0), 56);
        assert_eq!(resume_offset(0, 30), 56);
    }

    #[test]
    fn offsets_past_eof_clamp_to_last_whole_record() {
        // header + 2 records + 15 stray bytes
        let size = 56 + 80 + 15;
        assert_eq!(resume_offset(size, size), 136);
        assert_eq!(resume_offset(10_000, size), 136);
    }

    #[test]
    fn misaligned_offsets_snap_back_to_a_boundary() {
        assert_eq!(resume_offset(60, 500), 56);
        assert_eq!(resume_offset(135, 500), 96);
        assert_eq!(resume_offset(136, 500), 136);
    }

    #[test]
    fn every_resume_offset_is_a_record_boundary() {
        for size in 0..400u64 {
            for req in (0..450u64).step_by(7) {
                let off = resume_offset(req, size);
                assert!(off >= 56);
                assert_eq!((off - 56) % 40, 0, "req={req} size={size} off={off}");
            }
        }
    }
}
