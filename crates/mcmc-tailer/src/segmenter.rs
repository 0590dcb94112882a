use std::borrow::Cow;
use std::io::SeekFrom;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::warn;

use crate::Result;

/// Complete lines read past a byte offset.
///
/// `text` always ends with `\n` unless it is empty; `bytes_consumed` is the
/// raw byte length `text` was decoded from, so `offset + bytes_consumed`
/// lands right after a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineChunk {
    pub text: String,
    pub bytes_consumed: u64,
}

impl LineChunk {
    pub fn is_empty(&self) -> bool {
        self.bytes_consumed == 0
    }
}

/// Length of the prefix of `buf` that ends with its last `\n` (0 if none).
pub fn complete_line_boundary(buf: &[u8]) -> usize {
    buf.iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Decode the complete-line prefix of `buf`, dropping any trailing partial
/// line. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_complete_lines(buf: &[u8], path: &Path) -> LineChunk {
    let end = complete_line_boundary(buf);
    if end == 0 {
        return LineChunk::default();
    }

    let text = match String::from_utf8_lossy(&buf[..end]) {
        Cow::Borrowed(text) => text.to_string(),
        Cow::Owned(text) => {
            warn!(
                path = %path.display(),
                bytes = end,
                decoded_len = text.len(),
                "Text length does not match data byte length"
            );
            text
        }
    };

    LineChunk {
        text,
        bytes_consumed: end as u64,
    }
}

/// Read everything from `offset` to the current end of the file at `path`
/// and return the complete lines in it.
///
/// The file is opened and closed on each call, so truncation or replacement
/// by the writer is seen on the next read. An offset past the end of the
/// file yields an empty chunk.
pub async fn read_new_lines(path: &Path, offset: u64) -> Result<LineChunk> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).await?;

    Ok(decode_complete_lines(&buf, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_boundary_drops_partial_line() {
        assert_eq!(complete_line_boundary(b""), 0);
        assert_eq!(complete_line_boundary(b"a,b"), 0);
        assert_eq!(complete_line_boundary(b"a,b\n"), 4);
        assert_eq!(complete_line_boundary(b"a,b\n1,2"), 4);
        assert_eq!(complete_line_boundary(b"a,b\n1,2\n3"), 8);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_but_byte_count_kept() {
        let chunk = decode_complete_lines(b"x\xff\n", Path::new("chain.csv"));
        assert_eq!(chunk.bytes_consumed, 3);
        assert!(chunk.text.ends_with('\n'));
        assert!(chunk.text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn test_read_resumes_from_offset() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "a,b\n1,2\n3,")?;
        file.flush()?;

        let first = read_new_lines(file.path(), 0).await?;
        assert_eq!(first.text, "a,b\n1,2\n");
        assert_eq!(first.bytes_consumed, 8);

        write!(file, "4\n")?;
        file.flush()?;

        let second = read_new_lines(file.path(), first.bytes_consumed).await?;
        assert_eq!(second.text, "3,4\n");
        assert_eq!(second.bytes_consumed, 4);

        let third = read_new_lines(file.path(), 12).await?;
        assert!(third.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "a\n")?;
        file.flush()?;

        let chunk = read_new_lines(file.path(), 100).await?;
        assert!(chunk.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = read_new_lines(Path::new("/nonexistent/chain.csv"), 0).await;
        assert!(result.is_err());
    }
}
