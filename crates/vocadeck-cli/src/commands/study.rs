//! The `vocadeck study` command.
//!
//! A line-based drill loop: Enter reveals the answer, then one of `a s d f`
//! rates it. `q` or end of input stops; progress is already on disk.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vocadeck_core::config::VocadeckConfig;
use vocadeck_core::error::DeckError;
use vocadeck_core::model::{Direction, Rating};
use vocadeck_core::scheduler::Presentation;
use vocadeck_core::session::{Clock, StudySession, SystemClock};

use super::{report_load, sync_if_empty};

pub fn execute(config: &VocadeckConfig, seed: Option<u64>) -> Result<()> {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut session = StudySession::open_with(&config.store_path, rng, SystemClock)?;
    report_load(&session);

    if !sync_if_empty(&mut session, config)? {
        return Ok(());
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    drill(&mut session, &mut stdin.lock(), &mut stdout.lock())
}

enum Step {
    Continue,
    Quit,
}

fn drill<R: Rng, C: Clock>(
    session: &mut StudySession<R, C>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    loop {
        let pick = session.pick_presentation()?;
        for id in &pick.retired {
            writeln!(out, "{id} is already mastered, moved to review.")?;
        }

        match pick.presentation {
            Presentation::SessionOver => {
                writeln!(out, "Study session complete!")?;
                return Ok(());
            }
            Presentation::Card { id, direction } => {
                if let Step::Quit = present(session, &id, direction, input, out)? {
                    writeln!(out, "Stopped. Progress is saved.")?;
                    return Ok(());
                }
            }
        }
    }
}

fn present<R: Rng, C: Clock>(
    session: &mut StudySession<R, C>,
    id: &str,
    direction: Direction,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Step> {
    let Some(card) = session.store().cards.get(id) else {
        return Ok(Step::Continue);
    };
    let remaining = session.store().study_deck.len();

    writeln!(out)?;
    writeln!(out, "[{direction}] {}   ({remaining} left)", card.prompt(direction))?;
    write!(out, "Enter to reveal, q to stop: ")?;
    out.flush()?;
    match next_line(input)? {
        Some(line) if !line.eq_ignore_ascii_case("q") => {}
        _ => return Ok(Step::Quit),
    }

    let mut reveal = card.answer(direction).to_string();
    if let Some(pron) = &card.pronunciation {
        reveal.push_str(&format!(" [{pron}]"));
    }
    if let Some(aid) = &card.orthographic_aid {
        reveal.push_str(&format!(" [{aid}]"));
    }
    writeln!(out, "  {reveal}")?;

    loop {
        let choices: Vec<String> = [Rating::A, Rating::S, Rating::D, Rating::F]
            .iter()
            .map(|r| format!("{}={}", r.to_string().to_lowercase(), r.label()))
            .collect();
        write!(out, "Rate {}: ", choices.join(" "))?;
        out.flush()?;
        let Some(symbol) = next_line(input)? else {
            return Ok(Step::Quit);
        };
        if symbol.eq_ignore_ascii_case("q") {
            return Ok(Step::Quit);
        }

        match session.apply_rating_symbol(id, direction, &symbol) {
            Ok(outcome) => {
                if outcome.promoted {
                    writeln!(out, "Mastered! {id} moved to review.")?;
                }
                return Ok(Step::Continue);
            }
            Err(e)
                if matches!(
                    e.downcast_ref::<DeckError>(),
                    Some(DeckError::InvalidRating(_))
                ) =>
            {
                writeln!(out, "Unknown rating {symbol:?}, use a, s, d or f.")?;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Next trimmed line, or `None` at end of input.
fn next_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
