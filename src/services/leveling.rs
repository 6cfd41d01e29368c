//! The word lifecycle: adding words, dropping them during review and
//! advancing the level once a review round is done.
//!
//! Every step is awaited in order. A failing step aborts the rest of the
//! operation and earlier steps stay applied.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::{DictionaryWord, Level, NewWord, Word};
use crate::services::achievements::Achievement;
use crate::services::{dictionary, levels, statistics, words, ServiceContext, ServiceError};
use crate::session::Session;

#[derive(Debug, Clone, Serialize)]
pub struct AddWordOutcome {
    pub word: Word,
    pub dictionary_entry: Option<DictionaryWord>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DropOutcome {
    pub round_complete: bool,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    pub level: u8,
    pub cycle_complete: bool,
    pub purged_words: usize,
    pub achievements: Vec<Achievement>,
}

pub async fn add_word(
    ctx: &ServiceContext,
    session: &Session,
    new_word: &NewWord,
) -> Result<AddWordOutcome, ServiceError> {
    let word = words::insert_word(ctx, session, new_word).await?;
    let dictionary_entry = dictionary::add_if_absent(ctx, session, new_word).await?;

    statistics::increase_words_learned(ctx, session).await?;
    statistics::update_day_streak(ctx, session).await?;

    let mut achievements = Vec::new();
    achievements.extend(statistics::check_day_achievement(ctx, session).await?);
    achievements.extend(statistics::check_words_achievement(ctx, session).await?);

    tracing::debug!(
        user_id = %session.user_id,
        word_id = %word.id,
        new_dictionary_entry = dictionary_entry.is_some(),
        "word added"
    );
    Ok(AddWordOutcome {
        word,
        dictionary_entry,
        achievements,
    })
}

/// `total` is the number of active words the caller saw before dropping.
/// Dropping exactly the last of them completes the round and brings every
/// inactive word back. A stale `total` smaller than `ids` never does.
pub async fn drop_words(
    ctx: &ServiceContext,
    session: &Session,
    ids: &HashSet<String>,
    total: usize,
) -> Result<DropOutcome, ServiceError> {
    words::deactivate_words(ctx, session, ids).await?;

    let round_complete = if ids.len() == total {
        words::reactivate_inactive_words(ctx, session).await?
    } else {
        false
    };

    statistics::update_day_streak(ctx, session).await?;
    let achievements: Vec<Achievement> = statistics::check_day_achievement(ctx, session)
        .await?
        .into_iter()
        .collect();

    Ok(DropOutcome {
        round_complete,
        achievements,
    })
}

/// Moves `current` one level up. Leaving the last level closes a cycle: the
/// level goes back to the first, active words are purged and the cycle is
/// counted.
pub async fn advance_level(
    ctx: &ServiceContext,
    session: &Session,
    current: &Level,
) -> Result<AdvanceOutcome, ServiceError> {
    if current.user_id != session.user_id || current.language_id != session.language()? {
        return Err(ServiceError::Forbidden { what: "level" });
    }

    let (next, cycle_complete) = levels::next_level(current.level);
    levels::set_level(ctx, &current.id, next).await?;

    let mut outcome = AdvanceOutcome {
        level: next,
        cycle_complete,
        purged_words: 0,
        achievements: Vec::new(),
    };
    if !cycle_complete {
        return Ok(outcome);
    }

    outcome.purged_words = words::delete_all_active_words(ctx, session).await?;
    statistics::increase_cycles(ctx, session).await?;
    outcome
        .achievements
        .extend(statistics::check_cycles_achievement(ctx, session).await?);

    tracing::info!(
        user_id = %session.user_id,
        purged = outcome.purged_words,
        "cycle completed"
    );
    Ok(outcome)
}
