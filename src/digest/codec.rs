// Manifest codec module
// Reads and writes the flat-text digest format, independent of hashing

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use super::error::{DigestError, FormatErrorKind};
use super::hash::ContentHash;
use super::record::{parse_timestamp, FileRecord, TIMESTAMP_FORMAT};

/// Comment marker opening the header and metadata lines
pub const COMMENT_CHAR: char = ';';

/// Default extension for saved digests
pub const DIGEST_EXTENSION: &str = "ddxxh3";

/// Timestamp format used for digest file names
const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

const HEADER_PREFIX: &str = "; Directory digest saved at ";
const SIZE_PREFIX: &str = "; Size: ";
const MODIFIED_MARKER: &str = ", Last modified: ";
const PATH_SEPARATOR: &str = " *";

/// A parsed digest manifest: entry order is whatever the file carried,
/// consumers treat entries as a path-keyed set
#[derive(Debug)]
pub struct DigestManifest {
    pub files: Vec<FileRecord>,
    pub hashes: Vec<ContentHash>,
    pub generated_at: DateTime<Local>,
}

/// Read a digest file. Any malformed line rejects the whole manifest;
/// there is no partial load.
pub fn read_digest(path: &Path) -> Result<DigestManifest, DigestError> {
    if !path.exists() {
        return Err(DigestError::ManifestNotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path)
        .map_err(|e| DigestError::from_io_error(e, "opening digest", Some(path.to_path_buf())))?;
    let reader = BufReader::new(file);

    let mut lines = reader.lines().enumerate();

    let (_, header) = lines
        .next()
        .ok_or_else(|| DigestError::format(1, FormatErrorKind::MissingHeader))?;
    let header = header
        .map_err(|e| DigestError::from_io_error(e, "reading digest", Some(path.to_path_buf())))?;

    if !header.starts_with(HEADER_PREFIX) {
        return Err(DigestError::format(1, FormatErrorKind::MissingHeader));
    }

    // Header tail: `<yyyy-MM-dd HH:mm:ss> containing <N> entries`;
    // the date spans the first two whitespace-separated fields
    let mut fields = header[HEADER_PREFIX.len()..].splitn(3, ' ');
    let date_text = match (fields.next(), fields.next()) {
        (Some(day), Some(time)) => format!("{} {}", day, time),
        _ => return Err(DigestError::format(1, FormatErrorKind::UnparseableGenerationDate)),
    };
    let generated_at = parse_timestamp(&date_text)
        .ok_or_else(|| DigestError::format(1, FormatErrorKind::UnparseableGenerationDate))?;

    let mut files = Vec::new();
    let mut hashes = Vec::new();

    while let Some((idx, info_line)) = lines.next() {
        let info_line = info_line
            .map_err(|e| DigestError::from_io_error(e, "reading digest", Some(path.to_path_buf())))?;

        // Blank separator lines between entries are tolerated
        if info_line.trim().is_empty() {
            continue;
        }

        let info_line_no = idx + 1;

        let (_, hash_line) = lines
            .next()
            .ok_or_else(|| DigestError::format(info_line_no, FormatErrorKind::IncompleteEntry))?;
        let hash_line = hash_line
            .map_err(|e| DigestError::from_io_error(e, "reading digest", Some(path.to_path_buf())))?;
        let hash_line_no = info_line_no + 1;

        if !info_line.starts_with(SIZE_PREFIX) {
            return Err(DigestError::format(info_line_no, FormatErrorKind::MissingSizeMarker));
        }

        let modified_index = info_line
            .find(MODIFIED_MARKER)
            .ok_or_else(|| DigestError::format(info_line_no, FormatErrorKind::MissingModifiedMarker))?;

        let size_text = &info_line[SIZE_PREFIX.len()..modified_index];
        let modified_text = &info_line[modified_index + MODIFIED_MARKER.len()..];

        let separator_index = hash_line
            .find(PATH_SEPARATOR)
            .ok_or_else(|| DigestError::format(hash_line_no, FormatErrorKind::MissingPathSeparator))?;

        let hash_text = &hash_line[..separator_index];
        let path_text = &hash_line[separator_index + PATH_SEPARATOR.len()..];

        let record = FileRecord::from_text(path_text, size_text, modified_text, info_line_no)?;
        let hash = ContentHash::parse(hash_text, hash_line_no)?;

        files.push(record);
        hashes.push(hash);
    }

    Ok(DigestManifest { files, hashes, generated_at })
}

/// Compose the output filename for a digest saved now
pub fn digest_file_name(prefix: Option<&str>) -> String {
    format!(
        "{}{}.{}",
        prefix.unwrap_or(""),
        Local::now().format(FILENAME_TIMESTAMP_FORMAT),
        DIGEST_EXTENSION
    )
}

/// Write a digest to a fresh timestamped file in `dest_dir` (current
/// directory if `None`).
///
/// Returns `Ok(Some(path))` on success and `Ok(None)` when the write failed
/// for environmental reasons (destination directory missing, disk error) so
/// the caller can retry another destination without losing computed hashes.
/// A mismatch between `declared_count` and the entries actually written is a
/// `Consistency` fault: the count was computed by the engine that produced
/// the entries, so disagreement means a logic defect.
pub fn write_digest<'a, I>(
    dest_dir: Option<&Path>,
    prefix: Option<&str>,
    entries: I,
    declared_count: usize,
) -> Result<Option<PathBuf>, DigestError>
where
    I: IntoIterator<Item = (&'a FileRecord, ContentHash)>,
{
    let dir = match dest_dir {
        Some(d) => d.to_path_buf(),
        None => match std::env::current_dir() {
            Ok(d) => d,
            Err(_) => return Ok(None),
        },
    };

    if !dir.is_dir() {
        return Ok(None);
    }

    let full_path = dir.join(digest_file_name(prefix));

    let file = match File::create(&full_path) {
        Ok(f) => f,
        Err(_) => return Ok(None),
    };
    let mut writer = BufWriter::new(file);

    let header = format!(
        "{} Directory digest saved at {} containing {} entries",
        COMMENT_CHAR,
        Local::now().format(TIMESTAMP_FORMAT),
        declared_count
    );
    if writeln!(writer, "{}", header).is_err() {
        return Ok(None);
    }

    let mut count = 0usize;
    for (record, hash) in entries {
        let written = writeln!(
            writer,
            "{} Size: {}, Last modified: {}",
            COMMENT_CHAR,
            record.size(),
            record.modified_to_string()
        )
        .and_then(|_| writeln!(writer, "{} *{}", hash.to_hex(), record.path().display()));

        if written.is_err() {
            return Ok(None);
        }
        count += 1;
    }

    if count != declared_count {
        return Err(DigestError::consistency(
            "the number of entries written does not match the declared total",
        ));
    }

    if writer.flush().is_err() {
        return Ok(None);
    }

    Ok(Some(full_path))
}
