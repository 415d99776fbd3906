//! FASTA reference sequence provider
//!
//! Random access to contig intervals in an uncompressed FASTA file, using a
//! `.fai` index when one sits next to the file and scanning the file to
//! build one otherwise.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::FerroError;
use crate::interval::Interval;
use crate::reference::provider::{check_interval, ReferenceProvider};

/// Index entry for a sequence in a FASTA file
#[derive(Debug, Clone, PartialEq, Eq)]
struct FastaIndexEntry {
    length: u64,
    /// Byte offset to the start of sequence data
    offset: u64,
    line_bases: u64,
    /// Bytes per line including the line terminator
    line_bytes: u64,
}

/// FASTA-based reference sequence provider
///
/// Contig names resolve directly, then with the `chr` prefix added or
/// removed, so `1` and `chr1` address the same record.
#[derive(Debug, Clone)]
pub struct FastaProvider {
    path: PathBuf,
    index: HashMap<String, FastaIndexEntry>,
}

impl FastaProvider {
    /// Open a FASTA file, loading or building its index
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened
    /// - The file is gzip-compressed (not supported)
    /// - The `.fai` index is malformed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, FerroError> {
        let path = path.as_ref().to_path_buf();

        if is_gzip_file(&path)? {
            return Err(FerroError::Io {
                msg: format!(
                    "FASTA file appears to be gzip-compressed: {}. Decompress it first.",
                    path.display()
                ),
            });
        }

        let fai_path = PathBuf::from(format!("{}.fai", path.display()));
        let index = if fai_path.exists() {
            log::debug!("Loading FASTA index {}", fai_path.display());
            load_fai_index(&fai_path)?
        } else {
            log::debug!("No index for {}, scanning", path.display());
            build_fasta_index(&path)?
        };

        Ok(Self { path, index })
    }

    /// Resolve a contig name to an indexed name
    fn resolve_name<'a>(&'a self, name: &str) -> Option<(&'a str, &'a FastaIndexEntry)> {
        if let Some((key, entry)) = self.index.get_key_value(name) {
            return Some((key.as_str(), entry));
        }
        let alt_name = match name.strip_prefix("chr") {
            Some(bare) => bare.to_string(),
            None => format!("chr{}", name),
        };
        self.index
            .get_key_value(&alt_name)
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Get all sequence names
    pub fn sequence_names(&self) -> impl Iterator<Item = &String> {
        self.index.keys()
    }

    fn read_interval(&self, entry: &FastaIndexEntry, interval: Interval) -> Result<String, FerroError> {
        if interval.is_empty() {
            return Ok(String::new());
        }

        let start = interval.lower();
        let line_start = start / entry.line_bases;
        let byte_offset = start % entry.line_bases;
        let file_offset = entry.offset + line_start * entry.line_bytes + byte_offset;

        let seq_len = interval.size();
        let num_lines = (seq_len + byte_offset).div_ceil(entry.line_bases);
        let terminator = entry.line_bytes - entry.line_bases;
        let bytes_to_read = seq_len + num_lines * terminator;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(file_offset))?;

        // The last line may be shorter than a full line, so read what is there
        let mut buffer = Vec::with_capacity(bytes_to_read as usize);
        file.take(bytes_to_read).read_to_end(&mut buffer)?;

        let sequence: Vec<u8> = buffer
            .into_iter()
            .filter(|&b| b != b'\n' && b != b'\r')
            .take(seq_len as usize)
            .map(|b| b.to_ascii_uppercase())
            .collect();

        if sequence.len() as u64 != seq_len {
            return Err(FerroError::Io {
                msg: format!(
                    "FASTA {} is shorter than its index claims at {}",
                    self.path.display(),
                    interval
                ),
            });
        }
        Ok(String::from_utf8_lossy(&sequence).into_owned())
    }
}

impl ReferenceProvider for FastaProvider {
    fn sequence(&self, contig: &str, interval: Interval) -> Result<String, FerroError> {
        let (_, entry) = self
            .resolve_name(contig)
            .ok_or_else(|| FerroError::ReferenceNotFound {
                id: contig.to_string(),
            })?;
        check_interval(contig, interval, entry.length)?;
        self.read_interval(entry, interval)
    }

    fn contig_length(&self, contig: &str) -> Option<u64> {
        self.resolve_name(contig).map(|(_, e)| e.length)
    }
}

/// Load a FASTA index (.fai) file
fn load_fai_index<P: AsRef<Path>>(path: P) -> Result<HashMap<String, FastaIndexEntry>, FerroError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut index = HashMap::new();

    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            continue;
        }

        let name = fields[0];
        let parse = |i: usize, what: &str| -> Result<u64, FerroError> {
            fields[i].parse().map_err(|_| FerroError::Io {
                msg: format!("Invalid {} '{}' in FAI for sequence '{}'", what, fields[i], name),
            })
        };
        let entry = FastaIndexEntry {
            length: parse(1, "length")?,
            offset: parse(2, "offset")?,
            line_bases: parse(3, "line_bases")?,
            line_bytes: parse(4, "line_bytes")?,
        };

        if entry.line_bases == 0 || entry.line_bytes < entry.line_bases {
            return Err(FerroError::Io {
                msg: format!(
                    "Invalid FAI entry for '{}': line_bases={}, line_bytes={}",
                    name, entry.line_bases, entry.line_bytes
                ),
            });
        }

        index.insert(name.to_string(), entry);
    }

    Ok(index)
}

/// Build a FASTA index by scanning the file
fn build_fasta_index<P: AsRef<Path>>(path: P) -> Result<HashMap<String, FastaIndexEntry>, FerroError> {
    let mut reader = BufReader::new(File::open(path.as_ref())?);

    let mut index = HashMap::new();
    let mut current: Option<(String, FastaIndexEntry)> = None;
    let mut byte_position = 0u64;
    let mut first_seq_line = true;

    let mut line = String::new();
    loop {
        let line_start = byte_position;
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        byte_position += bytes_read as u64;

        if let Some(header) = line.strip_prefix('>') {
            if let Some((name, entry)) = current.take() {
                index.insert(name, entry);
            }
            let name = header.split_whitespace().next().unwrap_or_default().to_string();
            current = Some((
                name,
                FastaIndexEntry {
                    length: 0,
                    offset: byte_position,
                    line_bases: 0,
                    line_bytes: 0,
                },
            ));
            first_seq_line = true;
        } else if let Some((_, ref mut entry)) = current {
            let seq_len = line.trim_end().len() as u64;
            entry.length += seq_len;

            if first_seq_line && seq_len > 0 {
                entry.offset = line_start;
                entry.line_bases = seq_len;
                entry.line_bytes = bytes_read as u64;
                first_seq_line = false;
            }
        }
    }

    if let Some((name, entry)) = current {
        index.insert(name, entry);
    }

    // Records with no sequence lines cannot be read from
    index.retain(|_, e| e.line_bases > 0);
    Ok(index)
}

/// Check if a file is gzip-compressed by reading its magic bytes
fn is_gzip_file<P: AsRef<Path>>(path: P) -> Result<bool, FerroError> {
    let mut file = File::open(path.as_ref())?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    const LINE1: &str = "ATGCATGCATGCATGCATGCATGCATGCATGCATGCATGCATGCATGCAT";
    const LINE2: &str = "GCATGCATGCATGCATGCATGCATGCATGCATGCATGCATGCATGCATGC";

    fn write_fasta(dir: &Path, with_fai: bool) -> PathBuf {
        let fasta_path = dir.join("test.fa");
        let mut fasta = File::create(&fasta_path).unwrap();
        writeln!(fasta, ">chr1 test contig").unwrap();
        writeln!(fasta, "{}", LINE1).unwrap();
        writeln!(fasta, "{}", LINE2).unwrap();
        writeln!(fasta, ">chr2").unwrap();
        writeln!(fasta, "acgtacgt").unwrap();

        if with_fai {
            let mut fai = File::create(dir.join("test.fa.fai")).unwrap();
            writeln!(fai, "chr1\t100\t18\t50\t51").unwrap();
            writeln!(fai, "chr2\t8\t126\t8\t9").unwrap();
        }
        fasta_path
    }

    #[test]
    fn test_build_fasta_index() {
        let dir = tempdir().unwrap();
        let path = write_fasta(dir.path(), false);
        let index = build_fasta_index(&path).unwrap();
        assert_eq!(
            index["chr1"],
            FastaIndexEntry {
                length: 100,
                offset: 18,
                line_bases: 50,
                line_bytes: 51
            }
        );
        assert_eq!(index["chr2"].length, 8);
        assert_eq!(index["chr2"].offset, 126);
    }

    #[test]
    fn test_load_fai_index_invalid_lines() {
        let dir = tempdir().unwrap();
        let fai_path = dir.path().join("x.fai");
        let mut fai = File::create(&fai_path).unwrap();
        writeln!(fai, "chr1\t100\t0\t50\t51").unwrap();
        writeln!(fai, "short\tline").unwrap();
        let index = load_fai_index(&fai_path).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_load_fai_index_bad_number() {
        let dir = tempdir().unwrap();
        let fai_path = dir.path().join("x.fai");
        let mut fai = File::create(&fai_path).unwrap();
        writeln!(fai, "chr1\tlots\t0\t50\t51").unwrap();
        assert!(load_fai_index(&fai_path).is_err());
    }

    #[test]
    fn test_sequence_with_and_without_fai() {
        for with_fai in [true, false] {
            let dir = tempdir().unwrap();
            let provider = FastaProvider::new(write_fasta(dir.path(), with_fai)).unwrap();
            assert_eq!(provider.contig_length("chr1"), Some(100));
            assert_eq!(provider.sequence("chr1", Interval::new(0, 10)).unwrap(), "ATGCATGCAT");
            assert_eq!(
                provider.sequence("chr1", Interval::new(45, 55)).unwrap(),
                "TGCATGCATG"
            );
            assert_eq!(provider.sequence("chr1", Interval::new(95, 100)).unwrap(), &LINE2[45..50]);
            assert_eq!(provider.sequence("chr2", Interval::new(2, 6)).unwrap(), "GTAC");
        }
    }

    #[test]
    fn test_chr_prefix_resolution() {
        let dir = tempdir().unwrap();
        let provider = FastaProvider::new(write_fasta(dir.path(), true)).unwrap();
        assert!(provider.has_contig("2"));
        assert_eq!(provider.sequence("2", Interval::new(0, 4)).unwrap(), "ACGT");
        assert!(!provider.has_contig("chr3"));
    }

    #[test]
    fn test_errors() {
        let dir = tempdir().unwrap();
        let provider = FastaProvider::new(write_fasta(dir.path(), true)).unwrap();
        assert!(matches!(
            provider.sequence("chrZ", Interval::new(0, 1)),
            Err(FerroError::ReferenceNotFound { .. })
        ));
        assert!(matches!(
            provider.sequence("chr1", Interval::new(95, 101)),
            Err(FerroError::OutOfBounds { .. })
        ));
        assert_eq!(provider.sequence("chr1", Interval::new(5, 5)).unwrap(), "");
    }

    #[test]
    fn test_gzip_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.fa.gz");
        File::create(&path).unwrap().write_all(&[0x1f, 0x8b, 0x08, 0x00]).unwrap();
        assert!(matches!(FastaProvider::new(&path), Err(FerroError::Io { .. })));
    }
}
