//! Spec builder: ranks resolved traits into roles and derives the musical
//! fields of a [`MusicSpecification`].

use super::models::{
    ComposeContext, ComposeError, Dynamics, DurationMode, InputTrait, Instrumentation, Melody,
    MusicSpecification, PromptBlocks, RoleTrait, Roles, Tempo, MAX_STAGE, MIN_STAGE,
};
use super::tables::{
    instrument_name, tempo_for_average_degree, DynamicMark, Genre, RhythmBand,
    AVOIDED_MOODS, DEFAULT_AVERAGE_DEGREE, FALLBACK_LEAD_INSTRUMENT, MAX_CORE_NOTES,
    MAX_KEYWORDS, SHORT_MODE_DYNAMICS_CAP, SHORT_MODE_MAX_BPM, SHORT_MODE_MIN_BPM,
    SHORT_MODE_TEMPO_LABEL, STANDARD_MODE_DYNAMICS_CAP, TIME_SIGNATURE,
};
use crate::knowledge_base::{KnowledgeBase, Resolution, RootNote};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

pub const DEFAULT_DURATION_SECONDS: u32 = 60;

const SUPPORT_SLOTS: usize = 2;
const FX_SLOTS: usize = 2;

/// An input trait joined with its knowledge base entry. Lives for one call.
#[derive(Debug, Clone, Copy)]
struct EnrichedTrait<'a> {
    idx: usize,
    charm_name: &'a str,
    stage: u8,
    resolution: Resolution<'a>,
}

impl<'a> EnrichedTrait<'a> {
    fn root_note(&self) -> Option<RootNote> {
        self.resolution.root_note
    }

    fn moods(&self) -> &'a [String] {
        self.resolution.moods()
    }

    fn instrument_name(&self) -> Option<&'a str> {
        self.resolution
            .instrument()
            .map(instrument_name)
            .filter(|name| !name.is_empty())
    }

    fn to_role_trait(self) -> RoleTrait {
        RoleTrait {
            charm_name: self.charm_name.to_string(),
            stage: self.stage,
            category: self.resolution.category.map(str::to_string),
            root_note: self.resolution.root_note,
            instrument: self.resolution.instrument().map(str::to_string),
        }
    }
}

/// Higher stage first, then higher root note, then input order.
fn rank(a: &EnrichedTrait, b: &EnrichedTrait) -> Ordering {
    b.stage
        .cmp(&a.stage)
        .then_with(|| b.root_note().cmp(&a.root_note()))
        .then_with(|| a.idx.cmp(&b.idx))
}

struct RoleSlices<'s, 'a> {
    lead: &'s EnrichedTrait<'a>,
    support: &'s [EnrichedTrait<'a>],
    fx: &'s [EnrichedTrait<'a>],
    ambience: &'s [EnrichedTrait<'a>],
}

impl<'s, 'a> RoleSlices<'s, 'a> {
    fn partition(ranked: &'s [EnrichedTrait<'a>]) -> Option<Self> {
        let (lead, rest) = ranked.split_first()?;
        let (support, rest) = rest.split_at(rest.len().min(SUPPORT_SLOTS));
        let (fx, ambience) = rest.split_at(rest.len().min(FX_SLOTS));
        Some(Self {
            lead,
            support,
            fx,
            ambience,
        })
    }

    fn lead_and_support(&self) -> impl Iterator<Item = &'s EnrichedTrait<'a>> {
        let support: &'s [EnrichedTrait<'a>] = self.support;
        std::iter::once(self.lead).chain(support.iter())
    }

    fn voiced(&self) -> impl Iterator<Item = &'s EnrichedTrait<'a>> {
        let fx: &'s [EnrichedTrait<'a>] = self.fx;
        self.lead_and_support().chain(fx.iter())
    }

    fn to_roles(&self) -> Roles {
        let collect = |traits: &[EnrichedTrait]| -> Vec<RoleTrait> {
            traits.iter().map(|t| t.to_role_trait()).collect()
        };
        Roles {
            lead: vec![self.lead.to_role_trait()],
            support: collect(self.support),
            fx: collect(self.fx),
            ambience: collect(self.ambience),
        }
    }
}

/// Builds the specification for one request.
///
/// Fails only when `traits` is empty; unknown names, odd stages and a
/// missing duration fall back to defaults.
pub fn build_specification(
    knowledge_base: &KnowledgeBase,
    traits: &[InputTrait],
    context: ComposeContext,
) -> Result<MusicSpecification, ComposeError> {
    let duration_seconds = context
        .duration_seconds
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_DURATION_SECONDS);
    let mode = DurationMode::for_duration(duration_seconds);

    let mut ranked: Vec<EnrichedTrait> = traits
        .iter()
        .enumerate()
        .map(|(idx, input)| EnrichedTrait {
            idx,
            charm_name: input.charm_name.as_str(),
            stage: input.effective_stage(),
            resolution: knowledge_base.resolve(&input.charm_name),
        })
        .collect();
    ranked.sort_by(rank);

    let roles = RoleSlices::partition(&ranked).ok_or(ComposeError::EmptyInput)?;

    let core_notes = core_notes(&roles);
    let rhythm = RhythmBand::for_stage(representative_stage(&roles));
    let tempo = tempo(&ranked, mode);
    let dynamics = dynamics(&roles, mode);
    let instruments = instrumentation(&roles);

    let all_moods = ranked.iter().flat_map(|t| t.moods().iter().map(String::as_str));
    let genres = Genre::infer(
        std::iter::once(instruments.lead.as_str())
            .chain(instruments.support.iter().map(String::as_str))
            .chain(instruments.fx.iter().map(String::as_str))
            .chain(all_moods.clone()),
    );

    let mut seen = HashSet::new();
    let keywords: Vec<String> = all_moods
        .filter(|mood| seen.insert(*mood))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect();

    let key = match core_notes.first() {
        Some(note) => format!("{} major", note),
        None => format!("{} major", RootNote::C),
    };

    let melody = Melody {
        notes_text: join_notes(&core_notes),
        core_notes,
        rhythm_text: rhythm.keyword_text().to_string(),
        rhythm_detail: rhythm.detail_text().to_string(),
    };

    let blocks = PromptBlocks {
        identity: identity_block(&instruments.lead, roles.lead.moods()),
        core_notes: core_notes_block(&melody.core_notes),
        form: form_block(mode, duration_seconds),
        instrumentation: instrumentation_block(mode, &instruments),
        harmony: harmony_block(mode).to_string(),
        rhythm_tempo: format!(
            "{} ({}); {}, ~{} BPM.",
            rhythm.detail_text(),
            rhythm.keyword_text(),
            tempo.label,
            tempo.bpm
        ),
        dynamics: dynamics_block(mode, dynamics, duration_seconds),
        mix: mix_block(mode).to_string(),
        constraints: constraints_block(mode).to_string(),
    };

    Ok(MusicSpecification {
        duration_seconds,
        mode,
        roles: roles.to_roles(),
        melody,
        instruments,
        genres,
        tempo,
        key,
        time_signature: TIME_SIGNATURE.to_string(),
        dynamics,
        keywords,
        avoid: AVOIDED_MOODS.iter().map(|s| s.to_string()).collect(),
        blocks,
    })
}

fn core_notes(roles: &RoleSlices) -> Vec<RootNote> {
    let mut notes = Vec::with_capacity(MAX_CORE_NOTES);
    for note in roles.lead_and_support().filter_map(|t| t.root_note()) {
        if !notes.contains(&note) {
            notes.push(note);
        }
    }
    notes.truncate(MAX_CORE_NOTES);
    notes
}

fn representative_stage(roles: &RoleSlices) -> u8 {
    let stages: Vec<f64> = roles.lead_and_support().map(|t| t.stage as f64).collect();
    let mean = stages.iter().sum::<f64>() / stages.len() as f64;
    (mean.round() as u8).clamp(MIN_STAGE, MAX_STAGE)
}

fn tempo(ranked: &[EnrichedTrait], mode: DurationMode) -> Tempo {
    let degrees: Vec<f64> = ranked
        .iter()
        .filter_map(|t| t.root_note())
        .map(|note| note.degree() as f64)
        .collect();
    let average = if degrees.is_empty() {
        DEFAULT_AVERAGE_DEGREE
    } else {
        degrees.iter().sum::<f64>() / degrees.len() as f64
    };

    let (label, bpm) = tempo_for_average_degree(average);
    match mode {
        DurationMode::Short => Tempo {
            label: SHORT_MODE_TEMPO_LABEL.to_string(),
            bpm: bpm.clamp(SHORT_MODE_MIN_BPM, SHORT_MODE_MAX_BPM),
        },
        DurationMode::Standard => Tempo {
            label: label.to_string(),
            bpm,
        },
    }
}

fn dynamics(roles: &RoleSlices, mode: DurationMode) -> Dynamics {
    let mut histogram: BTreeMap<u8, usize> = BTreeMap::new();
    for t in roles.voiced() {
        *histogram.entry(t.stage).or_default() += 1;
    }

    let lead_stage = roles.lead.stage;
    let mut ranked_stages: Vec<(u8, usize)> = histogram.into_iter().collect();
    ranked_stages.sort_by(|(stage_a, count_a), (stage_b, count_b)| {
        count_b
            .cmp(count_a)
            .then_with(|| (*stage_b == lead_stage).cmp(&(*stage_a == lead_stage)))
            .then_with(|| stage_b.cmp(stage_a))
    });

    let first = ranked_stages.first().map(|(s, _)| *s).unwrap_or(3);
    let second = ranked_stages.get(1).map(|(s, _)| *s).unwrap_or(first);

    let cap = match mode {
        DurationMode::Short => SHORT_MODE_DYNAMICS_CAP,
        DurationMode::Standard => STANDARD_MODE_DYNAMICS_CAP,
    };
    let high = first.max(second).min(cap);
    let low = first.min(second).min(high);

    Dynamics {
        low: DynamicMark::for_stage(low),
        high: DynamicMark::for_stage(high),
    }
}

fn instrumentation(roles: &RoleSlices) -> Instrumentation {
    let names = |traits: &[EnrichedTrait]| -> Vec<String> {
        traits
            .iter()
            .filter_map(|t| t.instrument_name())
            .map(str::to_string)
            .collect()
    };
    Instrumentation {
        lead: roles
            .lead
            .instrument_name()
            .unwrap_or(FALLBACK_LEAD_INSTRUMENT)
            .to_string(),
        support: names(roles.support),
        fx: names(roles.fx),
    }
}

fn join_notes(notes: &[RootNote]) -> String {
    notes
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn identity_block(lead_instrument: &str, moods: &[String]) -> String {
    if moods.is_empty() {
        format!("Lead is {}.", lead_instrument)
    } else {
        format!("Lead is {}: {}.", lead_instrument, moods.join(", "))
    }
}

/// The literal sentence naming the core notes. Empty when none resolved.
pub fn core_notes_block(notes: &[RootNote]) -> String {
    if notes.is_empty() {
        String::new()
    } else {
        format!("The core notes of the melody should be {}.", join_notes(notes))
    }
}

fn form_block(mode: DurationMode, duration_seconds: u32) -> String {
    match mode {
        DurationMode::Short => "A-A'-B-A form (approx. 8-12 bars), single clear motif with slight variation, loop-compatible.".to_string(),
        DurationMode::Standard => {
            let intro_end = fraction_of(duration_seconds, 1, 4);
            let development_end = fraction_of(duration_seconds, 3, 4);
            format!(
                "A-A'-B-A or AABA form (approx. 16-32 bars), with gradual development. \
                 0-{intro_end}s intro, {intro_end}-{development_end}s development with soft climax, \
                 {development_end}-{duration_seconds}s outro with loop-friendly tail."
            )
        }
    }
}

fn instrumentation_block(mode: DurationMode, instruments: &Instrumentation) -> String {
    let mut text = match mode {
        DurationMode::Short => "2-3 layers max (Lead + thin Pad/Arp + very subtle FX). Lead instrument should have a clear, fast attack (e.g., Glockenspiel, Celesta, Sine Bell, Marimba).",
        DurationMode::Standard => "3-5 layers (Lead + Warm Pad/Soft Strings + Light Arpeggiator + subtle FX). Starts thin, builds in the middle section.",
    }
    .to_string();
    if !instruments.support.is_empty() {
        text.push_str(&format!(
            " Supporting instruments: {}.",
            instruments.support.join(", ")
        ));
    }
    if !instruments.fx.is_empty() {
        text.push_str(&format!(
            " Accent instruments: {}.",
            instruments.fx.join(", ")
        ));
    }
    text
}

fn harmony_block(mode: DurationMode) -> &'static str {
    match mode {
        DurationMode::Short => "Simple 2-4 chord loop (e.g., I-V-vi-IV progression), no complex voicings or modulation.",
        DurationMode::Standard => "4-8 bar chord progression, with slightly different voicings or a counter-melody in the B section.",
    }
}

fn mix_block(mode: DurationMode) -> &'static str {
    match mode {
        DurationMode::Short => "Short reverb, short decay tail, focused on mid-high frequencies, mono-compatible narrow stereo image.",
        DurationMode::Standard => "Medium reverb, wider stereo image, soft compression (1.5:1 to 2:1 ratio).",
    }
}

fn constraints_block(mode: DurationMode) -> &'static str {
    match mode {
        DurationMode::Short => "no lyrics, no heavy kick drum, no long reverb.",
        DurationMode::Standard => "no lyrics, instrumental only.",
    }
}

fn dynamics_block(mode: DurationMode, dynamics: Dynamics, duration_seconds: u32) -> String {
    match mode {
        DurationMode::Short => format!(
            "Consistent dynamics at {}, with one brief accent to {}. No drastic volume changes.",
            dynamics.low, dynamics.high
        ),
        DurationMode::Standard => {
            let peak = fraction_of(duration_seconds, 35, 60);
            format!(
                "Starts at {}, gradual crescendo to {} by {}:{:02}, brief peak, then decrescendo to {} for the tail.",
                dynamics.low,
                dynamics.high,
                peak / 60,
                peak % 60,
                dynamics.low
            )
        }
    }
}

/// `duration * numerator / denominator`, rounded to the nearest second.
fn fraction_of(duration_seconds: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = u64::from(duration_seconds) * u64::from(numerator) + u64::from(denominator / 2);
    (scaled / u64::from(denominator)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::{Category, Charm};

    fn kb() -> KnowledgeBase {
        KnowledgeBase::embedded().unwrap()
    }

    fn compose(traits: &[InputTrait], duration: u32) -> MusicSpecification {
        build_specification(&kb(), traits, ComposeContext::with_duration(duration)).unwrap()
    }

    fn names(traits: &[RoleTrait]) -> Vec<&str> {
        traits.iter().map(|t| t.charm_name.as_str()).collect()
    }

    fn tiny_kb() -> KnowledgeBase {
        let category = |name: &str, root: RootNote, charms: &[&str]| Category {
            category_name: name.to_string(),
            root_note: root,
            charms: charms
                .iter()
                .map(|c| Charm {
                    charm_name: c.to_string(),
                    keywords: vec![format!("{} Bell", c), "Soft".to_string()],
                })
                .collect(),
        };
        KnowledgeBase::new(vec![
            category("low", RootNote::C, &["c1", "c2"]),
            category("mid", RootNote::D, &["d1"]),
            category("high", RootNote::B, &["b1", "b2"]),
            category("upper", RootNote::A, &["a1"]),
            category("sixth", RootNote::A, &["a2"]),
        ])
    }

    #[test]
    fn empty_input_fails() {
        let result = build_specification(&kb(), &[], ComposeContext::default());
        assert_eq!(result, Err(ComposeError::EmptyInput));
    }

    #[test]
    fn end_to_end_example() {
        let spec = compose(
            &[InputTrait::new("성실함", 6), InputTrait::new("다정함", 4)],
            60,
        );

        assert_eq!(names(&spec.roles.lead), vec!["성실함"]);
        assert_eq!(names(&spec.roles.support), vec!["다정함"]);
        assert!(spec.roles.fx.is_empty());
        assert_eq!(spec.melody.core_notes, vec![RootNote::D, RootNote::E]);
        assert_eq!(spec.melody.notes_text, "D, E");
        assert_eq!(spec.melody.rhythm_text, "long, relaxed, lyrical breath");
        assert_eq!(spec.tempo, Tempo { label: "Andante".to_string(), bpm: 84 });
        assert_eq!(spec.instruments.lead, "Harpsichord");
        assert_eq!(spec.instruments.support, vec!["Nylon String Guitar"]);
        assert_eq!(spec.genres, vec![Genre::Lofi]);
        assert_eq!(spec.key, "D major");
        assert_eq!(spec.time_signature, "4/4");
        assert_eq!(spec.mode, DurationMode::Standard);
        assert_eq!(
            spec.keywords,
            vec!["Structured", "Precise", "Gentle", "Affectionate"]
        );
        assert_eq!(spec.avoid, vec!["sad", "melancholic"]);
        assert_eq!(
            spec.blocks.core_notes,
            "The core notes of the melody should be D, E."
        );
        assert_eq!(spec.blocks.identity, "Lead is Harpsichord: Structured, Precise.");
    }

    #[test]
    fn role_partition_accounts_for_every_trait() {
        let all: Vec<InputTrait> = kb()
            .categories()
            .iter()
            .flat_map(|c| c.charms.iter())
            .enumerate()
            .map(|(i, c)| InputTrait::new(c.charm_name.clone(), (i % 6) as i64 + 1))
            .collect();

        for n in 1..=all.len() {
            let spec = compose(&all[..n], 60);
            assert_eq!(spec.roles.lead.len(), 1);
            assert!(spec.roles.support.len() <= 2);
            assert!(spec.roles.fx.len() <= 2);
            assert_eq!(spec.roles.len(), n);

            assert!(spec.melody.core_notes.len() <= 3);
            let unique: HashSet<_> = spec.melody.core_notes.iter().collect();
            assert_eq!(unique.len(), spec.melody.core_notes.len());

            assert!(!spec.genres.is_empty() && spec.genres.len() <= 3);
            assert!(spec.keywords.len() <= 6);
        }
    }

    #[test]
    fn ties_keep_input_order() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("c1", 3),
                InputTrait::new("b1", 5),
                InputTrait::new("c2", 3),
            ],
            ComposeContext::default(),
        )
        .unwrap();

        assert_eq!(names(&spec.roles.lead), vec!["b1"]);
        assert_eq!(names(&spec.roles.support), vec!["c1", "c2"]);
    }

    #[test]
    fn equal_stages_rank_by_root_note() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("c1", 4),
                InputTrait::new("unknown", 4),
                InputTrait::new("d1", 4),
                InputTrait::new("b1", 4),
            ],
            ComposeContext::default(),
        )
        .unwrap();

        assert_eq!(names(&spec.roles.lead), vec!["b1"]);
        assert_eq!(names(&spec.roles.support), vec!["d1", "c1"]);
        assert_eq!(names(&spec.roles.fx), vec!["unknown"]);
    }

    #[test]
    fn core_notes_are_unique_and_capped() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("b1", 6),
                InputTrait::new("b2", 5),
                InputTrait::new("a1", 4),
                InputTrait::new("d1", 3),
            ],
            ComposeContext::default(),
        )
        .unwrap();

        assert_eq!(spec.melody.core_notes, vec![RootNote::B, RootNote::A]);
    }

    #[test]
    fn unknown_traits_do_not_contribute_roots() {
        let spec = compose(
            &[InputTrait::new("없는매력", 6), InputTrait::new("성실함", 2)],
            60,
        );

        assert_eq!(names(&spec.roles.lead), vec!["없는매력"]);
        assert_eq!(spec.roles.lead[0].category, None);
        assert_eq!(spec.roles.lead[0].root_note, None);
        assert_eq!(spec.melody.core_notes, vec![RootNote::D]);
        // Only D resolves, so the average degree is 2.0.
        assert_eq!(spec.tempo.label, "Andante");
        assert_eq!(spec.instruments.lead, FALLBACK_LEAD_INSTRUMENT);
        assert_eq!(spec.blocks.identity, "Lead is felt piano.");
    }

    #[test]
    fn nothing_resolves_uses_defaults() {
        let spec = compose(&[InputTrait::new("nope", 3)], 60);

        assert!(spec.melody.core_notes.is_empty());
        assert_eq!(spec.tempo, Tempo { label: "Moderato".to_string(), bpm: 108 });
        assert_eq!(spec.key, "C major");
        // The fallback lead instrument still reads as piano.
        assert_eq!(spec.genres, vec![Genre::Lofi]);
        assert!(spec.keywords.is_empty());
        assert_eq!(spec.blocks.core_notes, "");
    }

    #[test]
    fn tempo_from_average_degree() {
        // 침착함 is in the C category, 정직함 in G and 목표의식 in B.
        let spec = compose(&[InputTrait::new("침착함", 3)], 60);
        assert_eq!(spec.tempo, Tempo { label: "Adagio".to_string(), bpm: 65 });

        let spec = compose(
            &[InputTrait::new("침착함", 3), InputTrait::new("목표의식", 3)],
            60,
        );
        assert_eq!(spec.tempo, Tempo { label: "Moderato".to_string(), bpm: 108 });

        let spec = compose(
            &[InputTrait::new("정직함", 3), InputTrait::new("목표의식", 3)],
            60,
        );
        assert_eq!(spec.tempo, Tempo { label: "Allegro".to_string(), bpm: 128 });
    }

    #[test]
    fn duration_mode_boundary() {
        let traits = [InputTrait::new("침착함", 3)];

        let short = compose(&traits, 30);
        assert_eq!(short.mode, DurationMode::Short);
        assert_eq!(short.tempo.label, "Andantino-Allegretto");
        assert_eq!(short.tempo.bpm, 96);
        assert!(short.blocks.constraints.contains("no heavy kick drum"));
        assert!(short.blocks.form.contains("8-12 bars"));

        let standard = compose(&traits, 31);
        assert_eq!(standard.mode, DurationMode::Standard);
        assert_eq!(standard.tempo.bpm, 65);
        assert_eq!(standard.blocks.constraints, "no lyrics, instrumental only.");
        assert!(standard.blocks.form.contains("16-32 bars"));
    }

    #[test]
    fn short_mode_clamps_fast_tempo() {
        let spec = compose(&[InputTrait::new("목표의식", 3)], 20);
        assert_eq!(spec.tempo.bpm, 116);
    }

    #[test]
    fn missing_or_zero_duration_defaults_to_sixty() {
        let traits = [InputTrait::new("침착함", 3)];
        let missing = build_specification(&kb(), &traits, ComposeContext::default()).unwrap();
        let zero = compose(&traits, 0);
        assert_eq!(missing.duration_seconds, 60);
        assert_eq!(zero.duration_seconds, 60);
        assert_eq!(missing.mode, DurationMode::Standard);
    }

    #[test]
    fn standard_form_timing() {
        let spec = compose(&[InputTrait::new("침착함", 3)], 60);
        assert!(spec
            .blocks
            .form
            .contains("0-15s intro, 15-45s development with soft climax, 45-60s outro"));
        assert!(spec.blocks.dynamics.contains("by 0:35"));

        let spec = compose(&[InputTrait::new("침착함", 3)], 120);
        assert!(spec.blocks.form.contains("0-30s intro, 30-90s development"));
        assert!(spec.blocks.dynamics.contains("by 1:10"));
    }

    #[test]
    fn dynamics_prefer_most_frequent_stages() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("c1", 2),
                InputTrait::new("c2", 2),
                InputTrait::new("d1", 4),
                InputTrait::new("b1", 5),
            ],
            ComposeContext::default(),
        )
        .unwrap();

        // Lead stage 5 wins the count tie against 4.
        assert_eq!(spec.dynamics.low, DynamicMark::Piano);
        assert_eq!(spec.dynamics.high, DynamicMark::Forte);
        assert!(spec
            .blocks
            .dynamics
            .starts_with("Starts at p, gradual crescendo to f"));
    }

    #[test]
    fn dynamics_are_capped_per_mode() {
        let kb = tiny_kb();
        let traits = [InputTrait::new("b1", 6), InputTrait::new("c1", 2)];

        let standard = build_specification(&kb, &traits, ComposeContext::with_duration(60)).unwrap();
        assert_eq!(standard.dynamics.high, DynamicMark::Forte);

        let short = build_specification(&kb, &traits, ComposeContext::with_duration(15)).unwrap();
        assert_eq!(short.dynamics.low, DynamicMark::Piano);
        assert_eq!(short.dynamics.high, DynamicMark::MezzoForte);
        assert!(short.blocks.dynamics.starts_with("Consistent dynamics at p"));

        let single = build_specification(&kb, &traits[..1], ComposeContext::with_duration(15)).unwrap();
        assert!(single.dynamics.low <= single.dynamics.high);
    }

    #[test]
    fn dynamics_low_never_exceeds_capped_high() {
        let kb = tiny_kb();
        let traits = [InputTrait::new("b1", 6), InputTrait::new("c1", 6)];

        let standard = build_specification(&kb, &traits, ComposeContext::with_duration(60)).unwrap();
        assert_eq!(standard.dynamics.low, DynamicMark::Forte);
        assert_eq!(standard.dynamics.high, DynamicMark::Forte);

        let short = build_specification(&kb, &traits, ComposeContext::with_duration(20)).unwrap();
        assert_eq!(short.dynamics.low, DynamicMark::MezzoForte);
        assert_eq!(short.dynamics.high, DynamicMark::MezzoForte);
    }

    #[test]
    fn rhythm_uses_rounded_mean_of_lead_and_support() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("b1", 6),
                InputTrait::new("c1", 3),
                InputTrait::new("c2", 3),
                InputTrait::new("d1", 1),
            ],
            ComposeContext::default(),
        )
        .unwrap();
        assert_eq!(spec.melody.rhythm_detail, RhythmBand::Walking.detail_text());
    }

    #[test]
    fn out_of_range_stage_counts_as_one() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[InputTrait::new("c1", 42), InputTrait::new("d1", 2)],
            ComposeContext::default(),
        )
        .unwrap();
        assert_eq!(names(&spec.roles.lead), vec!["d1"]);
        assert_eq!(spec.roles.support[0].stage, 1);
    }

    #[test]
    fn supporting_and_accent_instruments_are_listed() {
        let kb = tiny_kb();
        let spec = build_specification(
            &kb,
            &[
                InputTrait::new("b1", 6),
                InputTrait::new("a1", 5),
                InputTrait::new("d1", 4),
                InputTrait::new("c1", 3),
            ],
            ComposeContext::default(),
        )
        .unwrap();
        assert!(spec
            .blocks
            .instrumentation
            .ends_with("Supporting instruments: a1 Bell, d1 Bell. Accent instruments: c1 Bell."));
    }

    #[test]
    fn composition_is_deterministic() {
        let traits = [
            InputTrait::new("유머감각", 4),
            InputTrait::new("호기심", 4),
            InputTrait::new("약자보호", 2),
            InputTrait::new("모험심", 5),
        ];
        assert_eq!(compose(&traits, 45), compose(&traits, 45));
    }
}
