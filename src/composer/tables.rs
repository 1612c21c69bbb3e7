//! Fixed lookup tables used by the spec builder.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RhythmBand {
    /// Stages 1-2.
    Lively,
    /// Stages 3-4.
    Walking,
    /// Stage 5.
    Lyrical,
    /// Stage 6.
    Breathing,
}

impl RhythmBand {
    pub fn for_stage(stage: u8) -> Self {
        match stage {
            0..=2 => RhythmBand::Lively,
            3 | 4 => RhythmBand::Walking,
            5 => RhythmBand::Lyrical,
            _ => RhythmBand::Breathing,
        }
    }

    pub fn keyword_text(self) -> &'static str {
        match self {
            RhythmBand::Lively => "short, rhythmic and lively",
            RhythmBand::Walking => "stable, walking, moderate tempo",
            RhythmBand::Lyrical | RhythmBand::Breathing => "long, relaxed, lyrical breath",
        }
    }

    pub fn detail_text(self) -> &'static str {
        match self {
            RhythmBand::Lively => "eighth-note based, short and lively rhythm",
            RhythmBand::Walking => "quarter-note centered, stable rhythm",
            RhythmBand::Lyrical => "dotted quarter-note centered, unhurried rhythm",
            RhythmBand::Breathing => "half-note centered, with a longer breath",
        }
    }
}

/// Average scale degree used when no trait resolves to a root note.
pub const DEFAULT_AVERAGE_DEGREE: f64 = 4.0;

/// Tempo label and BPM for an average scale degree. Bands are half-open
/// on the upper bound.
pub fn tempo_for_average_degree(average: f64) -> (&'static str, u16) {
    if average < 2.0 {
        ("Adagio", 65)
    } else if average < 3.0 {
        ("Andante", 84)
    } else if average < 4.0 {
        ("Andantino", 96)
    } else if average < 5.0 {
        ("Moderato", 108)
    } else if average < 6.0 {
        ("Allegretto", 116)
    } else {
        ("Allegro", 128)
    }
}

pub const SHORT_MODE_TEMPO_LABEL: &str = "Andantino-Allegretto";
pub const SHORT_MODE_MIN_BPM: u16 = 96;
pub const SHORT_MODE_MAX_BPM: u16 = 116;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DynamicMark {
    #[serde(rename = "pp")]
    Pianissimo,
    #[serde(rename = "p")]
    Piano,
    #[serde(rename = "mp")]
    MezzoPiano,
    #[serde(rename = "mf")]
    MezzoForte,
    #[serde(rename = "f")]
    Forte,
    #[serde(rename = "ff")]
    Fortissimo,
}

impl DynamicMark {
    /// Anything outside 1..=6 maps to mp.
    pub fn for_stage(stage: u8) -> Self {
        match stage {
            1 => DynamicMark::Pianissimo,
            2 => DynamicMark::Piano,
            3 => DynamicMark::MezzoPiano,
            4 => DynamicMark::MezzoForte,
            5 => DynamicMark::Forte,
            6 => DynamicMark::Fortissimo,
            _ => DynamicMark::MezzoPiano,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DynamicMark::Pianissimo => "pp",
            DynamicMark::Piano => "p",
            DynamicMark::MezzoPiano => "mp",
            DynamicMark::MezzoForte => "mf",
            DynamicMark::Forte => "f",
            DynamicMark::Fortissimo => "ff",
        }
    }
}

impl fmt::Display for DynamicMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest dynamics stage allowed in short and standard mode.
pub const SHORT_MODE_DYNAMICS_CAP: u8 = 4;
pub const STANDARD_MODE_DYNAMICS_CAP: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Lofi,
    Cinematic,
    Ambient,
}

impl Genre {
    /// Priority order used when emitting tags.
    pub const ALL: [Genre; 3] = [Genre::Lofi, Genre::Cinematic, Genre::Ambient];

    pub fn as_str(self) -> &'static str {
        match self {
            Genre::Lofi => "lofi",
            Genre::Cinematic => "cinematic",
            Genre::Ambient => "ambient",
        }
    }

    fn markers(self) -> &'static [&'static str] {
        match self {
            Genre::Lofi => &["piano", "guitar", "nylon", "rhodes", "wurlitzer", "lofi"],
            Genre::Cinematic => &["orchestral", "horn", "strings", "cinematic", "timpani", "fanfare"],
            Genre::Ambient => &["synth", "ambient", "pad", "theremin", "arpeggiator"],
        }
    }

    /// Matches genre markers against the lowercase text blob.
    pub fn infer<'a, I>(texts: I) -> Vec<Genre>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let blob = texts
            .into_iter()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        let genres: Vec<Genre> = Self::ALL
            .into_iter()
            .filter(|genre| genre.markers().iter().any(|m| blob.contains(m)))
            .collect();

        if genres.is_empty() {
            vec![Genre::Lofi, Genre::Ambient]
        } else {
            genres
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const FALLBACK_LEAD_INSTRUMENT: &str = "felt piano";
pub const TIME_SIGNATURE: &str = "4/4";
pub const AVOIDED_MOODS: [&str; 2] = ["sad", "melancholic"];
pub const MAX_CORE_NOTES: usize = 3;
pub const MAX_KEYWORDS: usize = 6;

/// Text before the first "(" of an instrument descriptor, trimmed.
pub fn instrument_name(descriptor: &str) -> &str {
    descriptor
        .split_once('(')
        .map_or(descriptor, |(name, _)| name)
        .trim()
}
