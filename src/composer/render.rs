//! Prompt rendering: turns a [`MusicSpecification`] into prompt text.

use super::models::MusicSpecification;

const QUALITY_CLAUSES: [&str; 2] = [
    "high quality, clear, professional ringtone",
    "well-balanced mix, pleasant for phone notifications",
];

/// Trims a clause and drops its trailing periods so clauses can be joined.
fn clause(text: &str) -> &str {
    text.trim().trim_end_matches('.').trim_end()
}

fn join_clauses<'a, I>(parts: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let clauses: Vec<&str> = parts
        .into_iter()
        .map(clause)
        .filter(|c| !c.is_empty())
        .collect();
    if clauses.is_empty() {
        return String::new();
    }
    format!("{}.", clauses.join(". "))
}

fn labelled(label: &str, items: &[String]) -> String {
    if items.is_empty() {
        String::new()
    } else {
        format!("{}: {}", label, items.join(", "))
    }
}

/// The draft prompt, blocks in a fixed order. Empty blocks are skipped.
pub fn render_prompt(spec: &MusicSpecification) -> String {
    let genres: Vec<String> = spec.genres.iter().map(|g| g.to_string()).collect();
    let genres = labelled("Genres", &genres);
    let keywords = labelled("Overall mood keywords", &spec.keywords);
    let avoid = labelled("Avoid moods", &spec.avoid);

    let blocks = &spec.blocks;
    join_clauses([
        blocks.identity.as_str(),
        blocks.core_notes.as_str(),
        blocks.form.as_str(),
        blocks.instrumentation.as_str(),
        blocks.harmony.as_str(),
        blocks.rhythm_tempo.as_str(),
        blocks.dynamics.as_str(),
        blocks.mix.as_str(),
        genres.as_str(),
        keywords.as_str(),
        avoid.as_str(),
        blocks.constraints.as_str(),
    ])
}

/// Extends a (possibly refined) prompt with summary clauses for the audio model.
pub fn render_generation_prompt(prompt: &str, spec: &MusicSpecification) -> String {
    let genres: Vec<String> = spec.genres.iter().map(|g| g.to_string()).collect();
    let genres = labelled("Genres", &genres);

    let mut instrumentation = format!("Instrumentation: lead {}", spec.instruments.lead);
    if !spec.instruments.support.is_empty() {
        instrumentation.push_str(&format!(", support {}", spec.instruments.support.join("/")));
    }

    let tempo = format!("Tempo: {}, {} BPM", spec.tempo.label, spec.tempo.bpm);
    let key = format!("Key: {}, {} time", spec.key, spec.time_signature);

    let names = |traits: &[super::models::RoleTrait]| -> Vec<String> {
        traits.iter().map(|t| t.charm_name.clone()).collect()
    };
    let lead_traits = labelled("Lead traits", &names(&spec.roles.lead));
    let support_traits = labelled("Supporting traits", &names(&spec.roles.support));

    join_clauses(
        [
            prompt,
            genres.as_str(),
            instrumentation.as_str(),
            tempo.as_str(),
            key.as_str(),
            lead_traits.as_str(),
            support_traits.as_str(),
        ]
        .into_iter()
        .chain(QUALITY_CLAUSES),
    )
}
