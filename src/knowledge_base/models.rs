use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the seven natural scale degrees a category is anchored to.
///
/// The declaration order is the priority order used when ranking traits
/// (C lowest, B highest), so the derived `Ord` can be used directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RootNote {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl RootNote {
    pub const ALL: [RootNote; 7] = [
        RootNote::C,
        RootNote::D,
        RootNote::E,
        RootNote::F,
        RootNote::G,
        RootNote::A,
        RootNote::B,
    ];

    /// Scale degree, Do = 1 through Si = 7.
    pub fn degree(self) -> u8 {
        match self {
            RootNote::C => 1,
            RootNote::D => 2,
            RootNote::E => 3,
            RootNote::F => 4,
            RootNote::G => 5,
            RootNote::A => 6,
            RootNote::B => 7,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RootNote::C => "C",
            RootNote::D => "D",
            RootNote::E => "E",
            RootNote::F => "F",
            RootNote::G => "G",
            RootNote::A => "A",
            RootNote::B => "B",
        }
    }

    pub fn solfege(self) -> &'static str {
        match self {
            RootNote::C => "Do",
            RootNote::D => "Re",
            RootNote::E => "Mi",
            RootNote::F => "Fa",
            RootNote::G => "Sol",
            RootNote::A => "La",
            RootNote::B => "Si",
        }
    }

    /// Parses a solfège syllable ("Do", "re", "SOL", ...).
    pub fn from_solfege(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|note| note.solfege().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RootNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootNote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|note| note.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("Not a natural note: {:?}", s))
    }
}

/// A named personality trait and its sound keywords.
///
/// `keywords[0]` is the instrument descriptor, the rest are mood/texture words.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charm {
    pub charm_name: String,
    pub keywords: Vec<String>,
}

impl Charm {
    pub fn instrument(&self) -> Option<&str> {
        self.keywords.first().map(String::as_str)
    }

    pub fn moods(&self) -> &[String] {
        self.keywords.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub category_name: String,
    pub root_note: RootNote,
    pub charms: Vec<Charm>,
}
