use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::data::Pair;
use crate::errors::PairsError;
use crate::types::FlatLine;

/// Open `path` for buffered reading, attaching the path to any failure.
pub fn open_reader(path: &Path) -> Result<BufReader<File>, PairsError> {
    let file = File::open(path).map_err(|err| PairsError::at_path(path, err))?;
    Ok(BufReader::new(file))
}

/// Create (or truncate) `path` for buffered writing, creating parent directories.
pub fn create_writer(path: &Path) -> Result<BufWriter<File>, PairsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| PairsError::at_path(parent, err))?;
    }
    let file = File::create(path).map_err(|err| PairsError::at_path(path, err))?;
    Ok(BufWriter::new(file))
}

/// Write one JSON object per line.
pub fn write_jsonl<'a, T, W, I>(mut writer: W, items: I) -> Result<usize, PairsError>
where
    T: Serialize + 'a,
    W: Write,
    I: IntoIterator<Item = &'a T>,
{
    let mut written = 0;
    for item in items {
        serde_json::to_writer(&mut writer, item)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write pairs in JSON form to `path`.
pub fn write_pairs_jsonl(path: &Path, pairs: &[Pair]) -> Result<usize, PairsError> {
    write_jsonl(create_writer(path)?, pairs)
}

/// Flat lines for pairs whose members both carry a func id.
pub fn flat_lines(pairs: &[Pair]) -> Vec<FlatLine> {
    pairs.iter().filter_map(Pair::flat_line).collect()
}

/// Write pairs in flat form to `path`; pairs lacking a func id are omitted.
pub fn write_pairs_flat(path: &Path, pairs: &[Pair]) -> Result<usize, PairsError> {
    write_lines(path, &flat_lines(pairs))
}

/// Read non-blank lines with trailing newline characters removed.
pub fn read_nonblank_lines(path: &Path) -> Result<Vec<FlatLine>, PairsError> {
    let reader = open_reader(path)?;
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|err| PairsError::at_path(path, err))?;
        if line.trim().is_empty() {
            continue;
        }
        lines.push(line.trim_end_matches('\r').to_string());
    }
    Ok(lines)
}

/// Write each line followed by `\n`.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<usize, PairsError> {
    let mut writer = create_writer(path)?;
    for line in lines {
        writer.write_all(line.as_ref().as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(lines.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_lines_creates_parent_dirs_and_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        let written = write_lines(&path, &["a\tb\t1", "c\td\t0"]).unwrap();
        assert_eq!(written, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\tb\t1\nc\td\t0\n");
        assert_eq!(
            read_nonblank_lines(&path).unwrap(),
            vec!["a\tb\t1".to_string(), "c\td\t0".to_string()]
        );
    }

    #[test]
    fn read_skips_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.txt");
        fs::write(&path, "x\n\n   \ny\r\n").unwrap();
        assert_eq!(
            read_nonblank_lines(&path).unwrap(),
            vec!["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn missing_input_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.jsonl");
        match open_reader(&path) {
            Err(PairsError::Path { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected path error, got {other:?}"),
        }
    }
}
