// src/reader.rs
use std::{collections::VecDeque, path::Path};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};
use tokio_stream::{wrappers::SplitStream, StreamExt};
use tracing::{debug, instrument};

use crate::{error::ReadError, record::Record};

/// How the header line is chosen once the stream is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HeaderMode {
    /// Keep only the last two non-empty lines and pair them.
    /// With three or more non-empty lines the "header" is the second-to-last line.
    #[default]
    Windowed,
    /// True first non-empty line as header, true last non-empty line as data.
    FirstLine,
}

impl std::str::FromStr for HeaderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windowed" => Ok(HeaderMode::Windowed),
            "first-line" | "first_line" | "firstline" => Ok(HeaderMode::FirstLine),
            other => Err(format!(
                "unknown header mode {:?} (expected \"windowed\" or \"first-line\")",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    pub header_mode: HeaderMode,
}

/// Tracks the lines needed to build a record while streaming.
#[derive(Debug)]
enum LineTracker {
    Window(VecDeque<String>),
    Ends {
        first: Option<String>,
        last: Option<String>,
        seen: usize,
    },
}

impl LineTracker {
    fn new(mode: HeaderMode) -> Self {
        match mode {
            HeaderMode::Windowed => LineTracker::Window(VecDeque::with_capacity(2)),
            HeaderMode::FirstLine => LineTracker::Ends {
                first: None,
                last: None,
                seen: 0,
            },
        }
    }

    fn push(&mut self, line: String) {
        match self {
            LineTracker::Window(buf) => {
                if buf.len() == 2 {
                    buf.pop_front();
                }
                buf.push_back(line);
            }
            LineTracker::Ends { first, last, seen } => {
                *seen += 1;
                if first.is_none() {
                    *first = Some(line);
                } else {
                    *last = Some(line);
                }
            }
        }
    }

    /// `(header, data)` if at least two non-empty lines were seen.
    fn finish(self) -> Option<(String, String)> {
        match self {
            LineTracker::Window(mut buf) => {
                if buf.len() < 2 {
                    return None;
                }
                let header = buf.pop_front()?;
                let last = buf.pop_front()?;
                Some((header, last))
            }
            LineTracker::Ends { first, last, seen } => {
                debug!(non_empty_lines = seen, "finished line scan");
                first.zip(last)
            }
        }
    }
}

/// Split one `\n`-terminated chunk into lines, treating `\r\n` and a lone `\r`
/// as breaks too. Invalid UTF-8 is replaced rather than rejected.
fn split_lines(chunk: &[u8]) -> Vec<String> {
    let chunk = chunk.strip_suffix(b"\r").unwrap_or(chunk);
    String::from_utf8_lossy(chunk)
        .split('\r')
        .map(str::to_string)
        .collect()
}

/// Read the last non-empty line of a CSV file and pair it with a header,
/// using the default (windowed) header mode.
pub async fn read_last_record(path: impl AsRef<Path>) -> Result<Record, ReadError> {
    read_last_record_with(path, &ReaderOptions::default()).await
}

/// Read the last record of `path` with explicit options.
///
/// Fields are split on `,` with no quoting support; values are kept as raw strings.
#[instrument(level = "debug", skip(path, opts), fields(path = %path.as_ref().display(), mode = ?opts.header_mode))]
pub async fn read_last_record_with(
    path: impl AsRef<Path>,
    opts: &ReaderOptions,
) -> Result<Record, ReadError> {
    let path = path.as_ref();
    let file = File::open(path)
        .await
        .map_err(|e| ReadError::io(path, e))?;
    let mut chunks = SplitStream::new(BufReader::new(file).split(b'\n'));

    let mut tracker = LineTracker::new(opts.header_mode);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| ReadError::io(path, e))?;
        for line in split_lines(&chunk) {
            if !line.trim().is_empty() {
                tracker.push(line);
            }
        }
    }

    let (header, last) = tracker.finish().ok_or_else(|| ReadError::NotEnoughLines {
        path: path.to_path_buf(),
    })?;
    let record = Record::zip(header.split(','), last.split(','));
    debug!(columns = record.len(), "parsed last record");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        path
    }

    #[tokio::test]
    async fn test_single_data_line() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "a.csv", "a,b,c\n1,2,3\n");

        let rec = read_last_record(&path).await?;
        assert_eq!(rec, Record::zip(["a", "b", "c"], ["1", "2", "3"]));
        Ok(())
    }

    #[tokio::test]
    async fn test_header_only_is_parse_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "h.csv", "a,b,c\n\n   \n");

        let err = read_last_record(&path).await.unwrap_err();
        assert!(err.is_parse());
        assert_eq!(err.to_string(), "Not enough lines in file");
        assert_eq!(err.path(), &path);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_file_is_parse_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "e.csv", "");
        assert!(read_last_record(&path).await.unwrap_err().is_parse());
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_lines_ignored() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let plain = write_csv(&dir, "p.csv", "a,b,c\n1,2,3\n");
        let blanks = write_csv(&dir, "b.csv", "a,b,c\n\n \t\n1,2,3\n\n");

        assert_eq!(
            read_last_record(&plain).await?,
            read_last_record(&blanks).await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_crlf_line_endings() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "w.csv", "a,b\r\n1,2\r\n");

        let rec = read_last_record(&path).await?;
        assert_eq!(rec.get("b"), Some(Some("2")));
        Ok(())
    }

    /// Three non-empty lines: the windowed reader pairs d1 with d2, not h with d2.
    #[tokio::test]
    async fn test_windowed_mode_uses_second_to_last_line_as_header_not_true_header(
    ) -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "w.csv", "h1,h2\nx1,x2\ny1,y2\n");

        let rec = read_last_record(&path).await?;
        assert_eq!(rec, Record::zip(["x1", "x2"], ["y1", "y2"]));
        assert_eq!(rec.get("h1"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_first_line_mode_uses_true_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "f.csv", "h1,h2\n\nx1,x2\ny1,y2\n\n");
        let opts = ReaderOptions {
            header_mode: HeaderMode::FirstLine,
        };

        let rec = read_last_record_with(&path, &opts).await?;
        assert_eq!(rec, Record::zip(["h1", "h2"], ["y1", "y2"]));

        let single = write_csv(&dir, "s.csv", "h1,h2\n");
        assert!(read_last_record_with(&single, &opts)
            .await
            .unwrap_err()
            .is_parse());
        Ok(())
    }

    #[tokio::test]
    async fn test_values_are_not_trimmed_or_coerced() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = write_csv(&dir, "r.csv", "ts, pm\n0017 , 2.50\n");

        let rec = read_last_record(&path).await?;
        assert_eq!(rec.get("ts"), Some(Some("0017 ")));
        assert_eq!(rec.get(" pm"), Some(Some(" 2.50")));
        Ok(())
    }

    #[tokio::test]
    async fn test_non_utf8_bytes_are_decoded_lossily() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("latin1.csv");
        fs::write(&path, b"t,pm (\xB5g)\n1,2\n3,4\n")?;

        let rec = read_last_record(&path).await?;
        assert_eq!(rec, Record::zip(["1", "2"], ["3", "4"]));

        let opts = ReaderOptions {
            header_mode: HeaderMode::FirstLine,
        };
        let rec = read_last_record_with(&path, &opts).await?;
        assert_eq!(rec.get("pm (\u{FFFD}g)"), Some(Some("4")));
        Ok(())
    }

    #[tokio::test]
    async fn test_lone_carriage_return_line_endings() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("mac.csv");
        fs::write(&path, b"a,b\r1,2\r")?;

        let rec = read_last_record(&path).await?;
        assert_eq!(rec, Record::zip(["a", "b"], ["1", "2"]));

        let mixed = write_csv(&dir, "mixed.csv", "a,b\r\n\r\n0,0\r9,8\n");
        let rec = read_last_record(&mixed).await?;
        assert_eq!(rec, Record::zip(["0", "0"], ["9", "8"]));
        Ok(())
    }

    #[test]
    fn test_split_lines() {
        assert_eq!(split_lines(b"a,b\r"), vec!["a,b"]);
        assert_eq!(split_lines(b"a\rb"), vec!["a", "b"]);
        assert_eq!(split_lines(b""), vec![""]);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = read_last_record("/definitely/not/here.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, ReadError::Io { .. }));
        assert!(!err.is_parse());
    }

    #[test]
    fn test_header_mode_from_str() {
        assert_eq!("windowed".parse::<HeaderMode>(), Ok(HeaderMode::Windowed));
        assert_eq!(
            " First-Line ".parse::<HeaderMode>(),
            Ok(HeaderMode::FirstLine)
        );
        assert!("bogus".parse::<HeaderMode>().is_err());
    }
}
