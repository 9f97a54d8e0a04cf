//! Line-oriented parser for analyzer output.
//!
//! The analyzer prints, for every reading of a word, one or more header
//! lines (`<form>  <POS>  <grammar codes>`) followed by the English glosses.
//! Nothing delimits one record from the next, so records are recovered from
//! the order in which headers and gloss lines appear:
//!
//! ```text
//! am.o             V      1 1 PRES  ACTIVE  IND  1 S      header, opens V
//! amo, amare, amavi, amatus  V (1st)   [XXXAO]           header, same V
//! love, like; fall in love with; be fond of;              gloss, closes entry
//! ```
//!
//! A header whose category differs from the open one closes an entry
//! immediately. Gloss lines are appended to every entry collected so far,
//! because homonyms listed together share the block of definitions that
//! follows them.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;
use crate::speech::PartOfSpeech;

/// Annotations the analyzer prints for forms it declines to break down.
/// Matched case-insensitively as substrings.
const BENIGN_PHRASES: [&str; 10] = [
    "syncop",
    "word mod",
    "an internal",
    "an initial",
    "two words",
    "may be",
    "slur",
    "bad roman numeral",
    "it is very",
    "a terminal",
];

/// Marker that tags an attached particle on a header line.
const TACKON_MARKER: &str = "TACKON";

lazy_static! {
    static ref UNKNOWN_MARKER: Regex = Regex::new(r"^([A-Za-z]+)\s+={3,}").unwrap();
    static ref HEADER_PATTERN: Regex = {
        let tokens: Vec<&str> = PartOfSpeech::ALL.iter().map(|p| p.as_str()).collect();
        Regex::new(&format!(
            r"^([A-Za-z,.()\- ]+)\s+({})(?:\s|$)",
            tokens.join("|")
        ))
        .unwrap()
    };
}

/// One reading of a query word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalEntry {
    pub inflection: String,
    #[serde(rename = "pos")]
    pub part_of_speech: PartOfSpeech,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub glosses: Vec<String>,
}

impl fmt::Display for LexicalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.glosses.is_empty() {
            write!(f, "{{{}, inflection: '{}'}}", self.part_of_speech, self.inflection)
        } else {
            write!(
                f,
                "{{{}, inflection: '{}', glosses: {:?}}}",
                self.part_of_speech, self.inflection, self.glosses
            )
        }
    }
}

/// Everything the analyzer reported for one query word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub word: String,
    pub entries: Vec<LexicalEntry>,
    pub unknown: Vec<String>,
}

/// Shape of a single trimmed output line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Skip,
    Unknown(&'a str),
    Header {
        inflection: String,
        part_of_speech: PartOfSpeech,
    },
    Text(&'a str),
}

fn classify(line: &str) -> Result<Line<'_>, ParseError> {
    if line.is_empty() || line == "*" {
        return Ok(Line::Skip);
    }
    if let Some(cap) = UNKNOWN_MARKER.captures(line) {
        let token = cap.get(1).map_or("", |m| m.as_str());
        return Ok(Line::Unknown(token));
    }
    if let Some(cap) = HEADER_PATTERN.captures(line) {
        let part_of_speech = cap[2].parse::<PartOfSpeech>()?;
        return Ok(Line::Header {
            inflection: stem(&cap[1]),
            part_of_speech,
        });
    }
    Ok(Line::Text(line))
}

/// Drop the inflectional ending the analyzer separates with a period
/// (`am.o` -> `am`).
fn stem(prefix: &str) -> String {
    let stem = match prefix.find('.') {
        Some(idx) => &prefix[..idx],
        None => prefix,
    };
    stem.trim().to_string()
}

fn is_benign(line: &str) -> bool {
    let lower = line.to_lowercase();
    BENIGN_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Cursor over one analyzer response. Each call to [`ParserState::step`]
/// consumes exactly one line.
#[derive(Debug)]
pub struct ParserState<'a> {
    word: &'a str,
    lines: Vec<&'a str>,
    pos: usize,
    pending: Option<PartOfSpeech>,
    previous_inflection: String,
    entries: Vec<LexicalEntry>,
    unknown: Vec<String>,
}

impl<'a> ParserState<'a> {
    pub fn new(word: &'a str, raw: &'a str) -> Self {
        ParserState {
            word,
            lines: raw.trim().split('\n').map(str::trim).collect(),
            pos: 0,
            pending: None,
            previous_inflection: String::new(),
            entries: Vec::new(),
            unknown: Vec::new(),
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    /// Consume the line under the cursor. Returns `Ok(false)` once the input
    /// is exhausted.
    pub fn step(&mut self) -> Result<bool, ParseError> {
        if self.at_end() {
            return Ok(false);
        }
        let line = self.lines[self.pos];

        match classify(line)? {
            Line::Skip => {}
            Line::Unknown(token) => self.unknown.push(token.to_string()),
            Line::Header {
                inflection,
                part_of_speech,
            } => self.header(inflection, part_of_speech),
            Line::Text(text) => self.text(text)?,
        }

        self.pos += 1;
        Ok(true)
    }

    fn header(&mut self, inflection: String, part_of_speech: PartOfSpeech) {
        let before = std::mem::replace(&mut self.previous_inflection, inflection);

        let Some(open) = self.pending else {
            self.pending = Some(part_of_speech);
            return;
        };
        if open == part_of_speech {
            return;
        }

        // A change of category closes the open record. When the closing
        // header is a tackon, the record belongs to the form and category
        // seen before it.
        let mut closing = part_of_speech;
        if self.previous_inflection.contains(TACKON_MARKER) {
            self.previous_inflection = before;
            closing = open;
        }
        self.entries.push(LexicalEntry {
            inflection: self.previous_inflection.clone(),
            part_of_speech: closing,
            glosses: Vec::new(),
        });
        self.pending = None;
    }

    fn text(&mut self, line: &str) -> Result<(), ParseError> {
        for entry in &mut self.entries {
            entry.glosses.push(line.to_string());
        }

        if let Some(part_of_speech) = self.pending.take() {
            self.entries.push(LexicalEntry {
                inflection: self.previous_inflection.clone(),
                part_of_speech,
                glosses: vec![line.to_string()],
            });
            return Ok(());
        }

        if !self.entries.is_empty() || is_benign(line) {
            return Ok(());
        }

        Err(ParseError::UnrecognizedLine {
            word: self.word.to_string(),
            line: line.to_string(),
        })
    }

    pub fn finish(self) -> QueryResult {
        QueryResult {
            word: self.word.to_string(),
            entries: self.entries,
            unknown: self.unknown,
        }
    }
}

/// Parse the complete analyzer response for `word`.
pub fn parse_output(word: &str, raw: &str) -> Result<QueryResult, ParseError> {
    let mut state = ParserState::new(word, raw);
    while state.step()? {}
    Ok(state.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(inflection: &str, part_of_speech: PartOfSpeech, glosses: &[&str]) -> LexicalEntry {
        LexicalEntry {
            inflection: inflection.to_string(),
            part_of_speech,
            glosses: glosses.iter().map(|g| g.to_string()).collect(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Line classification
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn blank_and_asterisk_lines_are_skipped() {
        assert_eq!(classify("").unwrap(), Line::Skip);
        assert_eq!(classify("*").unwrap(), Line::Skip);
    }

    #[test]
    fn unknown_marker_needs_three_equals() {
        assert_eq!(
            classify("xyzzy ===========").unwrap(),
            Line::Unknown("xyzzy")
        );
        assert_eq!(
            classify("xyzzy         ========   UNKNOWN").unwrap(),
            Line::Unknown("xyzzy")
        );
        assert_eq!(classify("a == b").unwrap(), Line::Text("a == b"));
    }

    #[test]
    fn header_strips_ending_after_period() {
        let line = "am.o             V      1 1 PRES  ACTIVE  IND  1 S";
        assert_eq!(
            classify(line).unwrap(),
            Line::Header {
                inflection: "am".to_string(),
                part_of_speech: PartOfSpeech::V,
            }
        );
    }

    #[test]
    fn header_cuts_dictionary_form_at_first_period() {
        // abbreviated forms lose everything from their first period on
        let line = "Aug., Augusti  N (2nd) M   [XXXDX]";
        assert_eq!(
            classify(line).unwrap(),
            Line::Header {
                inflection: "Aug".to_string(),
                part_of_speech: PartOfSpeech::N,
            }
        );
        assert_eq!(stem("ex.tra, pro.pe "), "ex");
        assert_eq!(stem(" rosa "), "rosa");
    }

    #[test]
    fn header_distinguishes_v_from_vpar() {
        let line = "amat.us          VPAR   1 1 NOM S M PERF PASSIVE PPL";
        assert_eq!(
            classify(line).unwrap(),
            Line::Header {
                inflection: "amat".to_string(),
                part_of_speech: PartOfSpeech::Vpar,
            }
        );
    }

    #[test]
    fn dictionary_header_keeps_principal_parts() {
        let line = "amo, amare, amavi, amatus  V (1st)   [XXXAO]";
        assert_eq!(
            classify(line).unwrap(),
            Line::Header {
                inflection: "amo, amare, amavi, amatus".to_string(),
                part_of_speech: PartOfSpeech::V,
            }
        );
    }

    #[test]
    fn header_token_must_stand_alone() {
        assert_eq!(classify("Nota bene").unwrap(), Line::Text("Nota bene"));
        assert_eq!(classify("love, like; V").unwrap(), Line::Text("love, like; V"));
    }

    #[test]
    fn header_takes_rightmost_category_token() {
        let line = "que TACKON           N";
        assert_eq!(
            classify(line).unwrap(),
            Line::Header {
                inflection: "que TACKON".to_string(),
                part_of_speech: PartOfSpeech::N,
            }
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Whole responses
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn amo_yields_single_verb_entry() {
        let raw = "\
am.o             V      1 1 PRES  ACTIVE  IND  1 S
am.o             V      1 1 PRES  ACTIVE  IND  1 S
love, like; fall in love with; be fond of; have a tendency to;
";
        let result = parse_output("amo", raw).unwrap();
        assert_eq!(result.word, "amo");
        assert_eq!(
            result.entries,
            vec![entry(
                "am",
                PartOfSpeech::V,
                &["love, like; fall in love with; be fond of; have a tendency to;"]
            )]
        );
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn unknown_marker_yields_no_entries() {
        let result = parse_output("xyzzy", "xyzzy ===========\n").unwrap();
        assert!(result.entries.is_empty());
        assert_eq!(result.unknown, vec!["xyzzy"]);
    }

    #[test]
    fn category_transition_closes_entry_with_new_header() {
        let raw = "\
amat.us          VPAR   1 1 NOM S M PERF PASSIVE PPL
amo, amare, amavi, amatus  V (1st)   [XXXAO]
love, like;
";
        let result = parse_output("amatus", raw).unwrap();
        assert_eq!(
            result.entries,
            vec![entry("amo, amare, amavi, amatus", PartOfSpeech::V, &["love, like;"])]
        );
    }

    #[test]
    fn tackon_header_restores_earlier_form_and_category() {
        let raw = "\
con              PREFIX
con              PREFIX
que TACKON       N
with, together;
";
        let result = parse_output("conque", raw).unwrap();
        assert_eq!(
            result.entries,
            vec![entry("con", PartOfSpeech::Prefix, &["with, together;"])]
        );
    }

    #[test]
    fn gloss_lines_are_shared_by_all_collected_entries() {
        let raw = "\
est              V      5 1 PRES ACTIVE  IND 3 S
sum, esse, fui, futurus  V   [XXXAX]
to be, exist;
edo, edere, edi, esus  V   [XXXAO]
eat, consume, devour;
";
        let result = parse_output("est", raw).unwrap();
        assert_eq!(
            result.entries,
            vec![
                entry(
                    "sum, esse, fui, futurus",
                    PartOfSpeech::V,
                    &["to be, exist;", "eat, consume, devour;"]
                ),
                entry("edo, edere, edi, esus", PartOfSpeech::V, &["eat, consume, devour;"]),
            ]
        );
    }

    #[test]
    fn every_gloss_grows_each_entry_by_one_line() {
        let raw = "\
amat.us          VPAR   1 1 NOM S M PERF PASSIVE PPL
amo, amare, amavi, amatus  V (1st)   [XXXAO]
first;
second;
third;
";
        let result = parse_output("amatus", raw).unwrap();
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].glosses, vec!["first;", "second;", "third;"]);
    }

    #[test]
    fn benign_annotation_before_any_entry_is_ignored() {
        let raw = "\
Syncopated perfect ivi can drop 'v' without contracting vowel
am.o             V      1 1 PRES  ACTIVE  IND  1 S
love;
";
        let result = parse_output("amo", raw).unwrap();
        assert_eq!(result.entries, vec![entry("am", PartOfSpeech::V, &["love;"])]);
    }

    #[test]
    fn stray_prose_before_any_entry_is_an_error() {
        let err = parse_output("amo", "this line means nothing\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::UnrecognizedLine {
                word: "amo".to_string(),
                line: "this line means nothing".to_string(),
            }
        );
    }

    #[test]
    fn unknown_tokens_and_entries_do_not_mix() {
        let raw = "\
foo ========   UNKNOWN
am.o             V      1 1 PRES  ACTIVE  IND  1 S
love;
bar ========   UNKNOWN
";
        let result = parse_output("fooamo", raw).unwrap();
        assert_eq!(result.unknown, vec!["foo", "bar"]);
        assert_eq!(result.entries, vec![entry("am", PartOfSpeech::V, &["love;"])]);
    }

    #[test]
    fn empty_output_yields_empty_result() {
        let result = parse_output("nihil", "   \n").unwrap();
        assert!(result.entries.is_empty());
        assert!(result.unknown.is_empty());
    }

    #[test]
    fn parsing_is_repeatable() {
        let raw = "\
est              V      5 1 PRES ACTIVE  IND 3 S
sum, esse, fui, futurus  V   [XXXAX]
to be, exist;
*
edo, edere, edi, esus  V   [XXXAO]
eat, consume, devour;
";
        assert_eq!(parse_output("est", raw), parse_output("est", raw));
    }

    // ─────────────────────────────────────────────────────────────
    // Single transitions
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn step_consumes_one_line_at_a_time() {
        let raw = "am.o  V  1\nam.o  V  1\nlove;";
        let mut state = ParserState::new("amo", raw);

        assert!(state.step().unwrap());
        assert_eq!(state.pending, Some(PartOfSpeech::V));
        assert_eq!(state.previous_inflection, "am");
        assert!(state.entries.is_empty());

        assert!(state.step().unwrap());
        assert_eq!(state.pending, Some(PartOfSpeech::V));
        assert!(state.entries.is_empty());

        assert!(state.step().unwrap());
        assert_eq!(state.pending, None);
        assert_eq!(state.entries.len(), 1);

        assert!(state.at_end());
        assert!(!state.step().unwrap());
    }

    #[test]
    fn display_matches_debug_listing_format() {
        let bare = entry("am", PartOfSpeech::V, &[]);
        assert_eq!(bare.to_string(), "{V, inflection: 'am'}");
        let glossed = entry("am", PartOfSpeech::V, &["love"]);
        assert_eq!(glossed.to_string(), "{V, inflection: 'am', glosses: [\"love\"]}");
    }
}
