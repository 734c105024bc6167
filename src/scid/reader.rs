use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::{AppError, Result};
use crate::scid::decoder::{align_down, decode_records, resume_offset};
use crate::types::RawRecord;

/// Whole records read from `[start, end)` of a `.scid` file.
#[derive(Debug, Clone)]
pub struct ScidChunk {
    pub records: Vec<RawRecord>,
    /// Offset the read actually started at after clamping.
    pub start: u64,
    /// Offset just past the last whole record. Next pass resumes here.
    pub end: u64,
}

/// Read every whole record from `offset` to the current end of file.
///
/// The requested offset is clamped onto a record boundary first, and a trailing
/// partial record is left for a later pass.
pub async fn read_from(path: &Path, offset: u64) -> Result<ScidChunk> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let file_size = file.metadata().await?.len();
    let start = resume_offset(offset, file_size);
    let end = align_down(file_size).max(start);

    let mut buf = vec![0u8; (end - start) as usize];
    if !buf.is_empty() {
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut buf).await?;
    }

    Ok(ScidChunk {
        records: decode_records(&buf)?,
        start,
        end,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::scid::decoder::sample_record;

    fn records(range: std::ops::Range<u32>) -> Vec<RawRecord> {
        range.map(|i| sample_record(i, i, 10)).collect()
    }

    #[tokio::test]
    async fn missing_file_is_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_from(&dir.path().join("nope.scid"), 0).await.unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn empty_file_yields_nothing_at_header_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.scid");
        std::fs::File::create(&path).unwrap();

        let chunk = read_from(&path, 0).await.unwrap();
        assert!(chunk.records.is_empty());
        assert_eq!(chunk.end, 56);
    }

    #[tokio::test]
    async fn truncated_header_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.scid");
        std::fs::write(&path, [0u8; 20]).unwrap();

        let chunk = read_from(&path, 0).await.unwrap();
        assert!(chunk.records.is_empty());
        assert_eq!((chunk.start, chunk.end), (56, 56));
    }

    #[tokio::test]
    async fn reads_all_records_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("es.scid");
        let recs = records(0..5);
        write_scid(&path, &recs);

        let chunk = read_from(&path, 0).await.unwrap();
        assert_eq!(chunk.records, recs);
        assert_eq!(chunk.start, 56);
        assert_eq!(chunk.end, 56 + 5 * 40);
    }

    #[tokio::test]
    async fn partial_tail_waits_for_the_next_pass() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("es.scid");
        let recs = records(0..3);
        write_scid(&path, &recs[..2]);
        let tail = crate::scid::decoder::encode_record(&recs[2]);
        append_bytes(&path, &tail[..17]);

        let first = read_from(&path, 0).await.unwrap();
        assert_eq!(first.records, recs[..2].to_vec());
        assert_eq!(first.end, 56 + 80);

        append_bytes(&path, &tail[17..]);
        let second = read_from(&path, first.end).await.unwrap();
        assert_eq!(second.records, vec![recs[2]]);
        assert_eq!(second.end, 56 + 120);
    }

    #[tokio::test]
    async fn unchanged_file_rereads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("es.scid");
        write_scid(&path, &records(0..4));

        let first = read_from(&path, 0).await.unwrap();
        let again = read_from(&path, first.end).await.unwrap();
        assert!(again.records.is_empty());
        assert_eq!(again.end, first.end);
    }

    #[tokio::test]
    async fn split_reads_match_a_single_read() {
        let dir = tempfile::tempdir().unwrap();
        let split_path = dir.path().join("split.scid");
        let whole_path = dir.path().join("whole.scid");
        let all = records(0..9);

        write_scid(&split_path, &all[..4]);
        let first = read_from(&split_path, 0).await.unwrap();
        append_records(&split_path, &all[4..]);
        let second = read_from(&split_path, first.end).await.unwrap();

        write_scid(&whole_path, &all);
        let whole = read_from(&whole_path, 0).await.unwrap();

        let mut joined = first.records.clone();
        joined.extend(second.records);
        assert_eq!(joined, whole.records);
        assert_eq!(second.end, whole.end);
    }

    #[tokio::test]
    async fn offset_past_eof_is_clamped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("es.scid");
        write_scid(&path, &records(0..2));

        let chunk = read_from(&path, 9_999).await.unwrap();
        assert!(chunk.records.is_empty());
        assert_eq!(chunk.end, 56 + 80);
    }
}
