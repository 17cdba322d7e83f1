//! Splits an enrollment blob into per-course tokens.
//!
//! Older writers sometimes glued records together with `;` (or with nothing at
//! all) instead of `|`. The recovering tokenizer finds those merges by looking
//! for more than one `CODE123:teacher` start inside a segment and re-cuts the
//! whole blob at every start. The strict tokenizer refuses such input.

use crate::error::EnrollmentError;
use regex::Regex;
use std::sync::LazyLock;

pub const RECORD_SEPARATOR: char = '|';
pub const FIELD_SEPARATOR: char = ';';

static RECORD_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[A-Z]{2,5}[0-9]{3}:[0-9]+").expect("record start pattern compiles")
});

pub trait Tokenizer {
    fn tokenize<'a>(&self, blob: &'a str) -> Result<Vec<&'a str>, EnrollmentError>;
}

/// Best-effort recovery. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoveringTokenizer;

/// Splits on `|` only and rejects segments that hold merged records.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictTokenizer;

impl Tokenizer for RecoveringTokenizer {
    fn tokenize<'a>(&self, blob: &'a str) -> Result<Vec<&'a str>, EnrollmentError> {
        Ok(tokenize(blob))
    }
}

impl Tokenizer for StrictTokenizer {
    fn tokenize<'a>(&self, blob: &'a str) -> Result<Vec<&'a str>, EnrollmentError> {
        let mut tokens = Vec::new();
        for piece in blob.split(RECORD_SEPARATOR) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            if count_record_starts(piece) > 1 {
                return Err(EnrollmentError::MergedRecords {
                    segment: piece.to_string(),
                });
            }
            tokens.push(piece);
        }
        Ok(tokens)
    }
}

pub fn count_record_starts(s: &str) -> usize {
    RECORD_START.find_iter(s).count()
}

/// Recovering split of one blob into record tokens.
pub fn tokenize(blob: &str) -> Vec<&str> {
    let blob = blob.trim();
    if blob.is_empty() {
        return Vec::new();
    }

    let pieces: Vec<&str> = blob.split(RECORD_SEPARATOR).map(str::trim).collect();
    let suspicious = pieces.iter().any(|p| count_record_starts(p) > 1);
    if !suspicious {
        return pieces.into_iter().filter(|p| !p.is_empty()).collect();
    }

    tracing::debug!(blob = %blob, "merged enrollment records detected, re-scanning");
    split_at_record_starts(blob)
}

/// Cuts `s` at every record start, then at any `|` left inside a chunk, so a
/// neighbour whose code does not look like a record start stays separate.
/// Text before the first start is discarded; separator leftovers at either
/// end of a chunk are stripped. A string with no start at all comes back whole.
pub fn split_at_record_starts(s: &str) -> Vec<&str> {
    let starts: Vec<usize> = RECORD_START.find_iter(s).map(|m| m.start()).collect();
    if starts.is_empty() {
        let whole = strip_artifacts(s);
        return if whole.is_empty() { Vec::new() } else { vec![whole] };
    }

    let mut chunks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(s.len());
        for piece in s[start..end].split(RECORD_SEPARATOR) {
            let chunk = strip_artifacts(piece);
            if !chunk.is_empty() {
                chunks.push(chunk);
            }
        }
    }
    chunks
}

fn strip_artifacts(s: &str) -> &str {
    s.trim_matches(|c: char| c == RECORD_SEPARATOR || c == FIELD_SEPARATOR || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_blob_takes_fast_path() {
        let blob = "MAT101:1:vize=-;final=-;not=-;dev=-;prog=| CMP203:2:not=90;dev=0 ||";
        assert_eq!(
            tokenize(blob),
            vec!["MAT101:1:vize=-;final=-;not=-;dev=-;prog=", "CMP203:2:not=90;dev=0"]
        );
    }

    #[test]
    fn missing_separator_is_recovered() {
        let blob = "MAT101:1:not=-;dev=-CMP203:2:not=90;dev=0";
        let tokens = tokenize(blob);
        assert_eq!(tokens, vec!["MAT101:1:not=-;dev=-", "CMP203:2:not=90;dev=0"]);
    }

    #[test]
    fn semicolon_merge_is_recovered_without_trailing_artifacts() {
        let blob = "MAT101:1:not=80;dev=1;FIZ201:4:not=-;dev=-|KIM101:5";
        let tokens = tokenize(blob);
        assert_eq!(
            tokens,
            vec!["MAT101:1:not=80;dev=1", "FIZ201:4:not=-;dev=-", "KIM101:5"]
        );
    }

    #[test]
    fn legacy_two_field_blob() {
        assert_eq!(tokenize("MAT101:1|FIZ201:2"), vec!["MAT101:1", "FIZ201:2"]);
    }

    #[test]
    fn empty_blob_has_no_tokens() {
        assert!(tokenize("   ").is_empty());
        assert!(tokenize("||").is_empty());
    }

    #[test]
    fn strict_rejects_merged_segment() {
        let err = StrictTokenizer
            .tokenize("MAT101:1:dev=-CMP203:2:dev=0")
            .unwrap_err();
        assert!(matches!(err, EnrollmentError::MergedRecords { .. }));
        assert_eq!(
            StrictTokenizer.tokenize("MAT101:1|CMP203:2").unwrap(),
            vec!["MAT101:1", "CMP203:2"]
        );
    }

    #[test]
    fn pipe_inside_recovered_chunk_still_separates() {
        assert_eq!(
            tokenize("MAT101:1;CMP203:2|IT10:5:dev=3"),
            vec!["MAT101:1", "CMP203:2", "IT10:5:dev=3"]
        );
    }

    #[test]
    fn record_start_is_case_insensitive() {
        assert_eq!(count_record_starts("mat101:1;cmp203:2"), 2);
    }
}
