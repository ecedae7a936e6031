// CSV/TSV import/export

use std::io::Read;
use std::path::{Path, PathBuf};

use dealsheet_normalize::model::Table;

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: malformed CSV: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: file has no header line", .path.display())]
    EmptyInput { path: PathBuf },
}

impl TableError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), source }
    }
}

/// Read a header + rows file, sniffing the delimiter.
pub fn import(path: &Path) -> Result<Table, TableError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    log::debug!("{}: delimiter {:?}", path.display(), delimiter as char);
    parse_table(&content, delimiter, path)
}

/// Field names from the first line of a comma-delimited file. Later lines are
/// never parsed.
pub fn read_header_line(path: &Path) -> Result<Vec<String>, TableError> {
    let content = read_file_as_utf8(path)?;
    let first = content.lines().next().unwrap_or("");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(first.as_bytes());
    match reader.records().next() {
        Some(record) => {
            let record = record.map_err(|e| TableError::csv(path, e))?;
            Ok(record.iter().map(String::from).collect())
        }
        None => Err(TableError::EmptyInput { path: path.to_path_buf() }),
    }
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
///
/// A leading byte-order mark is dropped.
pub fn read_file_as_utf8(path: &Path) -> Result<String, TableError> {
    let mut file = std::fs::File::open(path).map_err(|e| TableError::io(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| TableError::io(path, e))?;

    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are often Windows-1252
            log::debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// Parse CSV text whose first record is the header. Header names are kept
/// verbatim (no trimming). Short rows are padded with empty cells; cells past
/// the header width are dropped.
pub fn parse_table(content: &str, delimiter: u8, origin: &Path) -> Result<Table, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record
            .map_err(|e| TableError::csv(origin, e))?
            .iter()
            .map(String::from)
            .collect(),
        None => return Err(TableError::EmptyInput { path: origin.to_path_buf() }),
    };
    let width = headers.len();

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| TableError::csv(origin, e))?;
        let mut row: Vec<String> = record.iter().map(String::from).collect();
        if row.len() > width {
            log::warn!(
                "{}: line {} has {} fields, header has {width}; extra fields ignored",
                origin.display(),
                rows.len() + 2,
                row.len()
            );
        }
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

/// Write header + rows as comma-delimited CSV.
///
/// Atomic: the data is written to a `.tmp` sibling and renamed over `path`
/// only after every row has been flushed.
pub fn export(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<(), TableError> {
    let tmp_path = path.with_extension("csv.tmp");

    let write = || -> Result<(), TableError> {
        let mut writer = csv::WriterBuilder::new()
            .from_path(&tmp_path)
            .map_err(|e| TableError::csv(path, e))?;
        writer
            .write_record(headers)
            .map_err(|e| TableError::csv(path, e))?;
        for row in rows {
            writer.write_record(row).map_err(|e| TableError::csv(path, e))?;
        }
        writer.flush().map_err(|e| TableError::io(path, e))?;
        Ok(())
    };

    if let Err(e) = write() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, path).map_err(|e| TableError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_import_keeps_header_whitespace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deals.csv");
        fs::write(&path, "Agent name,Building ,Deal ID\nAlice,Tower A,101\nBob\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.headers, vec!["Agent name", "Building ", "Deal ID"]);
        assert_eq!(table.rows[0], vec!["Alice", "Tower A", "101"]);
        assert_eq!(table.rows[1], vec!["Bob", "", ""]);
    }

    #[test]
    fn test_import_drops_extra_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        fs::write(&path, "a,b\n1,2,3\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Café" with 0xE9 for é
        fs::write(&path, b"Name,City\nJos\xe9,Caf\xe9\n").unwrap();

        let table = import(&path).unwrap();
        assert_eq!(table.rows[0], vec!["José", "Café"]);
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}ID,Agent Card\n1,a@x.com\n").unwrap();

        assert_eq!(import(&path).unwrap().headers[0], "ID");
        assert_eq!(read_header_line(&path).unwrap(), vec!["ID", "Agent Card"]);
    }

    #[test]
    fn test_header_line_ignores_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("target.csv");
        fs::write(&path, "ID,\"Total to House\",Notes\n\"unterminated\n").unwrap();

        assert_eq!(read_header_line(&path).unwrap(), vec!["ID", "Total to House", "Notes"]);
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        assert!(matches!(import(&path), Err(TableError::EmptyInput { .. })));
        assert!(matches!(read_header_line(&path), Err(TableError::EmptyInput { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = import(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn test_export_atomic_and_quoted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Deal Sheet Ready for Upload 2024-05-01.csv");

        let headers = vec!["Agent Name - Legacy".to_string(), "GCI".to_string()];
        let rows = vec![
            vec!["Smith, Alice".to_string(), "250.00".to_string()],
            vec!["Bob".to_string(), String::new()],
        ];
        export(&path, &headers, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Agent Name - Legacy,GCI\n\"Smith, Alice\",250.00\nBob,\n");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp file left behind: {leftovers:?}");
    }

    #[test]
    fn test_export_failure_leaves_no_output() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.csv");

        let headers = vec!["a".to_string()];
        assert!(export(&path, &headers, &[]).is_err());
        assert!(!path.exists());
    }
}
