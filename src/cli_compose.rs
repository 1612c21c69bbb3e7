use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use charm_ringtone_server::composer::{ComposeContext, Composer, InputTrait, MAX_STAGE, MIN_STAGE};
use charm_ringtone_server::knowledge_base::KnowledgeBase;

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

/// Parses `NAME:STAGE`. A missing stage means 1; stages are clamped.
fn parse_trait(s: &str) -> Result<InputTrait, String> {
    let (name, stage) = match s.rsplit_once(':') {
        Some((name, stage)) => {
            let stage = stage
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid stage in '{}'", s))?;
            (name, stage)
        }
        None => (s, MIN_STAGE as i64),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Missing charm name in '{}'", s));
    }
    Ok(InputTrait::new(name, stage).clamped())
}

/// Composes a ringtone prompt offline, without calling any external service.
#[derive(Parser, Debug)]
#[command(styles = get_styles())]
struct CliArgs {
    /// Selected charms as NAME:STAGE, stage between 1 and 6.
    #[clap(value_parser = parse_trait)]
    pub traits: Vec<InputTrait>,

    /// Clip duration in seconds.
    #[clap(short, long)]
    pub duration: Option<u32>,

    /// Print the full specification as JSON instead of the prompt.
    #[clap(long)]
    pub json: bool,

    /// Sound map JSON file. The bundled sound map is used when omitted.
    #[clap(long)]
    pub knowledge_base: Option<PathBuf>,

    /// List the available charms and exit.
    #[clap(long)]
    pub list: bool,
}

fn print_charms(knowledge_base: &KnowledgeBase) {
    for category in knowledge_base.categories() {
        println!(
            "{} ({} / {})",
            category.category_name,
            category.root_note.as_str(),
            category.root_note.solfege()
        );
        for charm in &category.charms {
            println!(
                "  {:<12} {}",
                charm.charm_name,
                charm.instrument().unwrap_or("-")
            );
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let knowledge_base = match &cli_args.knowledge_base {
        Some(path) => KnowledgeBase::load(path)
            .with_context(|| format!("Failed to load knowledge base {:?}", path))?,
        None => KnowledgeBase::embedded()?,
    };

    if cli_args.list {
        print_charms(&knowledge_base);
        return Ok(());
    }

    if cli_args.traits.is_empty() {
        bail!(
            "Select at least one charm, e.g. `cli-compose 성실함:{} 다정함:4`",
            MAX_STAGE
        );
    }

    let composer = Composer::new(Arc::new(knowledge_base));
    let context = ComposeContext {
        duration_seconds: cli_args.duration,
    };
    let spec = composer.compose(&cli_args.traits, context)?;

    if cli_args.json {
        println!("{}", serde_json::to_string_pretty(&spec)?);
    } else {
        println!("{}", composer.render(&spec));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_stage() {
        assert_eq!(parse_trait("성실함:6").unwrap(), InputTrait::new("성실함", 6));
        assert_eq!(parse_trait("다정함").unwrap(), InputTrait::new("다정함", 1));
        assert_eq!(parse_trait("다정함:12").unwrap(), InputTrait::new("다정함", 6));
        assert!(parse_trait("다정함:high").is_err());
        assert!(parse_trait(":3").is_err());
    }
}
