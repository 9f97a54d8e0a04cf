//! Word list input: one word-form per line, optionally bzip2-compressed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bzip2::read::BzDecoder;
use unicode_normalization::UnicodeNormalization;

/// Read every non-blank line of `path` as a trimmed, NFC-normalized word.
pub fn read_word_list(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.to_string_lossy().ends_with(".bz2") {
        Box::new(BufReader::with_capacity(256 * 1024, BzDecoder::new(file)))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    };
    parse_word_list(reader)
}

pub fn parse_word_list(reader: impl BufRead) -> std::io::Result<Vec<String>> {
    let mut words = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let word = line.trim();
        if word.is_empty() {
            continue;
        }
        words.push(word.nfc().collect());
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::{Cursor, Write};

    #[test]
    fn blank_lines_are_skipped_and_words_trimmed() {
        let words = parse_word_list(Cursor::new("  amo \n\n\t\nrosa\r\n")).unwrap();
        assert_eq!(words, vec!["amo", "rosa"]);
    }

    #[test]
    fn words_are_nfc_normalized() {
        // "ā" written as "a" + combining macron
        let words = parse_word_list(Cursor::new("ama\u{0304}re\n")).unwrap();
        assert_eq!(words, vec!["am\u{0101}re"]);
    }

    #[test]
    fn reads_plain_and_compressed_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("words.txt");
        std::fs::write(&plain, "amo\nrosa\n").unwrap();
        assert_eq!(read_word_list(&plain).unwrap(), vec!["amo", "rosa"]);

        let compressed = dir.path().join("words.txt.bz2");
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"est\nsum\n").unwrap();
        std::fs::write(&compressed, encoder.finish().unwrap()).unwrap();
        assert_eq!(read_word_list(&compressed).unwrap(), vec!["est", "sum"]);
    }
}
