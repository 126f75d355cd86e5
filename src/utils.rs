//! Utility functions for files and read names.

use crate::error::Result;

use std::fs::{self, File};
use std::path::Path;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

//-----------------------------------------------------------------------------

// Utilities for working with files.

const SIZE_UNITS: [(f64, &str); 6] = [
    (1.0, "B"),
    (1024.0, "KiB"),
    (1024.0 * 1024.0, "MiB"),
    (1024.0 * 1024.0 * 1024.0, "GiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0 * 1024.0, "PiB"),
];

/// Returns a human-readable representation of the given number of bytes.
pub fn human_readable_size(bytes: usize) -> String {
    let mut unit = 0;
    let value = bytes as f64;
    while unit + 1 < SIZE_UNITS.len() && value >= SIZE_UNITS[unit + 1].0 {
        unit += 1;
    }
    format!("{:.3} {}", value / SIZE_UNITS[unit].0, SIZE_UNITS[unit].1)
}

/// Returns a human-readable size of the file.
pub fn file_size<P: AsRef<Path>>(filename: P) -> Option<String> {
    fs::metadata(filename).ok().map(|metadata| human_readable_size(metadata.len() as usize))
}

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let file = match File::open(filename) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> Result<Box<dyn BufRead>> {
    let file = File::open(&filename)?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

/// Returns `true` if the file name ends with `.gz`.
pub fn has_gz_extension<P: AsRef<Path>>(filename: P) -> bool {
    filename.as_ref().extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// A buffered writer for a plain or a gzip-compressed file.
///
/// Call [`FileWriter::finish`] when done.
/// Dropping the writer also completes the file, but errors are then lost.
pub enum FileWriter {
    /// Uncompressed output.
    Plain(BufWriter<File>),
    /// Gzip-compressed output.
    Gzip(BufWriter<GzEncoder<File>>),
}

impl FileWriter {
    /// Flushes the buffers and writes the gzip footer if the output is compressed.
    pub fn finish(self) -> Result<()> {
        match self {
            FileWriter::Plain(mut writer) => {
                writer.flush()?;
            },
            FileWriter::Gzip(writer) => {
                let encoder = writer.into_inner().map_err(|err| err.into_error())?;
                encoder.finish()?;
            },
        }
        Ok(())
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileWriter::Plain(writer) => writer.write(buf),
            FileWriter::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileWriter::Plain(writer) => writer.flush(),
            FileWriter::Gzip(writer) => writer.flush(),
        }
    }
}

/// Creates a buffered writer for the file.
///
/// The output is gzip-compressed if the file name ends with `.gz`.
pub fn create_file<P: AsRef<Path>>(filename: P) -> Result<FileWriter> {
    let file = File::create(&filename)?;
    if has_gz_extension(&filename) {
        let inner = GzEncoder::new(file, Compression::default());
        Ok(FileWriter::Gzip(BufWriter::new(inner)))
    } else {
        Ok(FileWriter::Plain(BufWriter::new(file)))
    }
}

//-----------------------------------------------------------------------------

/// Removes a trailing `/1` or `/2` from a read name.
pub fn strip_mate_suffix(name: &str) -> &str {
    name.strip_suffix("/1").or_else(|| name.strip_suffix("/2")).unwrap_or(name)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::internal;

    #[test]
    fn sizes() {
        assert_eq!(human_readable_size(0), "0.000 B", "Wrong size for 0 bytes");
        assert_eq!(human_readable_size(1536), "1.500 KiB", "Wrong size for 1536 bytes");
        assert_eq!(human_readable_size(3 * 1024 * 1024), "3.000 MiB", "Wrong size for 3 MiB");
    }

    #[test]
    fn plain_and_compressed_files() {
        for name_part in ["plain", "compressed"] {
            let mut filename = internal::temp_file("linked-dbg-utils");
            if name_part == "compressed" {
                filename.set_extension("gz");
            }

            let mut writer = match create_file(&filename) {
                Ok(writer) => writer,
                Err(err) => panic!("Failed to create a {} file: {}", name_part, err),
            };
            writer.write_all(b"first\nsecond\n").unwrap();
            let result = writer.finish();
            assert!(result.is_ok(), "Failed to finish a {} file: {}", name_part, result.unwrap_err());

            assert_eq!(is_gzipped(&filename), name_part == "compressed", "Wrong compression for a {} file", name_part);
            let reader = match open_file(&filename) {
                Ok(reader) => reader,
                Err(err) => panic!("Failed to open a {} file: {}", name_part, err),
            };
            let lines: Vec<String> = reader.lines().map(|line| line.unwrap()).collect();
            assert_eq!(lines, vec!["first", "second"], "Wrong content in a {} file", name_part);
            assert!(file_size(&filename).is_some(), "No size for a {} file", name_part);

            internal::remove_file(&filename);
        }
        assert!(open_file("this-file-does-not-exist").is_err(), "Opened a nonexistent file");
    }

    #[test]
    fn finished_gzip_file() {
        let mut filename = internal::temp_file("linked-dbg-utils");
        filename.set_extension("gz");
        let mut writer = create_file(&filename).unwrap();
        writer.write_all(b"content\n").unwrap();
        writer.finish().unwrap();

        // A strict single-member decoder fails on a missing footer.
        let mut decoder = flate2::read::GzDecoder::new(File::open(&filename).unwrap());
        let mut content = String::new();
        let result = decoder.read_to_string(&mut content);
        assert!(result.is_ok(), "Incomplete gzip file: {}", result.unwrap_err());
        assert_eq!(content, "content\n", "Wrong content in a finished gzip file");

        internal::remove_file(&filename);
    }

    #[test]
    fn read_names() {
        assert_eq!(strip_mate_suffix("read1/1"), "read1", "Suffix /1 was not removed");
        assert_eq!(strip_mate_suffix("read1/2"), "read1", "Suffix /2 was not removed");
        assert_eq!(strip_mate_suffix("read1"), "read1", "Name without a suffix was changed");
        assert_eq!(strip_mate_suffix("read1/3"), "read1/3", "Unknown suffix was removed");
    }
}

//-----------------------------------------------------------------------------
