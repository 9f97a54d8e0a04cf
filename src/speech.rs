//! Parts of speech reported by the analyzer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Grammatical category of an analyzer record.
///
/// `Pack`, `Tackon`, `Prefix` and `Suffix` are not real parts of speech;
/// the analyzer uses them to tag attached particles and affixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartOfSpeech {
    /// all, none, or unknown
    X,
    N,
    Pron,
    Pack,
    Adj,
    Num,
    Adv,
    V,
    Vpar,
    Supine,
    Prep,
    Conj,
    Interj,
    Tackon,
    Prefix,
    Suffix,
}

impl PartOfSpeech {
    pub const ALL: [PartOfSpeech; 16] = [
        PartOfSpeech::X,
        PartOfSpeech::N,
        PartOfSpeech::Pron,
        PartOfSpeech::Pack,
        PartOfSpeech::Adj,
        PartOfSpeech::Num,
        PartOfSpeech::Adv,
        PartOfSpeech::V,
        PartOfSpeech::Vpar,
        PartOfSpeech::Supine,
        PartOfSpeech::Prep,
        PartOfSpeech::Conj,
        PartOfSpeech::Interj,
        PartOfSpeech::Tackon,
        PartOfSpeech::Prefix,
        PartOfSpeech::Suffix,
    ];

    /// Token the analyzer prints for this category.
    pub fn as_str(self) -> &'static str {
        match self {
            PartOfSpeech::X => "X",
            PartOfSpeech::N => "N",
            PartOfSpeech::Pron => "PRON",
            PartOfSpeech::Pack => "PACK",
            PartOfSpeech::Adj => "ADJ",
            PartOfSpeech::Num => "NUM",
            PartOfSpeech::Adv => "ADV",
            PartOfSpeech::V => "V",
            PartOfSpeech::Vpar => "VPAR",
            PartOfSpeech::Supine => "SUPINE",
            PartOfSpeech::Prep => "PREP",
            PartOfSpeech::Conj => "CONJ",
            PartOfSpeech::Interj => "INTERJ",
            PartOfSpeech::Tackon => "TACKON",
            PartOfSpeech::Prefix => "PREFIX",
            PartOfSpeech::Suffix => "SUFFIX",
        }
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartOfSpeech {
    type Err = ParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        PartOfSpeech::ALL
            .into_iter()
            .find(|pos| pos.as_str() == token)
            .ok_or_else(|| ParseError::UnknownPartOfSpeech(token.to_string()))
    }
}
