use chrono::{DateTime, FixedOffset, Utc};
use serde_json::{json, Value};

use crate::db::{Fields, Query, WriteBatch, LANGUAGE_ID_FIELD, STATISTICS, USER_ID_FIELD};
use crate::models::{decode, Statistics};
use crate::services::achievements::{Achievement, Ladder, CYCLES_LADDER, DAYS_LADDER, WORDS_LADDER};
use crate::services::{ServiceContext, ServiceError};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// Activity was already credited today.
    Unchanged,
    /// Last activity was yesterday.
    Extended,
    /// No prior activity, or a gap of more than one day.
    Reset,
}

/// Compares the calendar day of the last activity with today's, both taken at
/// local midnight for `offset`.
pub fn streak_transition(
    last_activity: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> StreakTransition {
    let Some(last) = last_activity else {
        return StreakTransition::Reset;
    };

    let today = now.with_timezone(&offset).date_naive();
    let last_day = last.with_timezone(&offset).date_naive();

    match (today - last_day).num_days() {
        0 => StreakTransition::Unchanged,
        1 => StreakTransition::Extended,
        _ => StreakTransition::Reset,
    }
}

/// Applies a streak update to `stats` in place; returns the fields to persist.
pub fn apply_streak(
    stats: &mut Statistics,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<Fields> {
    let days = match streak_transition(stats.last_activity, now, offset) {
        StreakTransition::Unchanged => return None,
        StreakTransition::Extended => stats.days.saturating_add(1),
        StreakTransition::Reset => 0,
    };

    stats.days = days;
    stats.last_activity = Some(now);

    let mut fields = Fields::new();
    fields.insert("days".to_string(), json!(days));
    fields.insert("last_activity".to_string(), json!(now));
    Some(fields)
}

/// Appends `achievement` unless it is already recorded. Returns whether it was new.
pub fn record_advancement(stats: &mut Statistics, achievement: Achievement) -> bool {
    if stats.has_advancement(achievement.as_str()) {
        return false;
    }
    stats.advancements.push(achievement.as_str().to_string());
    true
}

fn statistics_query(user_id: &str, language_id: &str) -> Query {
    Query::collection(STATISTICS)
        .where_eq(USER_ID_FIELD, user_id)
        .where_eq(LANGUAGE_ID_FIELD, language_id)
}

pub async fn find_statistics_for(
    ctx: &ServiceContext,
    user_id: &str,
    language_id: &str,
) -> Result<Option<Statistics>, ServiceError> {
    let docs = ctx
        .store()
        .query(&statistics_query(user_id, language_id))
        .await?;
    match docs.first() {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn find_statistics(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Statistics>, ServiceError> {
    find_statistics_for(ctx, &session.user_id, session.language()?).await
}

/// Creates the zeroed statistics document for a user/language pair if it is missing.
pub async fn ensure_statistics(
    ctx: &ServiceContext,
    user_id: &str,
    language_id: &str,
) -> Result<Statistics, ServiceError> {
    if let Some(existing) = find_statistics_for(ctx, user_id, language_id).await? {
        return Ok(existing);
    }

    let mut fields = Fields::new();
    fields.insert("words_learned".to_string(), json!(0));
    fields.insert("cycles".to_string(), json!(0));
    fields.insert("days".to_string(), json!(0));
    fields.insert("advancements".to_string(), Value::Array(Vec::new()));
    fields.insert("last_activity".to_string(), json!(ctx.clock.now()));
    fields.insert(USER_ID_FIELD.to_string(), json!(user_id));
    fields.insert(LANGUAGE_ID_FIELD.to_string(), json!(language_id));

    let doc = ctx.store().add(STATISTICS, fields).await?;
    tracing::debug!(user_id, language_id, statistics_id = %doc.id, "statistics created");
    Ok(decode(&doc)?)
}

async fn adjust_counter(
    ctx: &ServiceContext,
    session: &Session,
    field: &'static str,
    adjust: impl FnOnce(&mut Statistics) -> u32,
) -> Result<Option<Statistics>, ServiceError> {
    let Some(mut stats) = find_statistics(ctx, session).await? else {
        return Ok(None);
    };

    let value = adjust(&mut stats);
    let mut fields = Fields::new();
    fields.insert(field.to_string(), json!(value));
    ctx.store().update(STATISTICS, &stats.id, fields).await?;
    Ok(Some(stats))
}

pub async fn increase_words_learned(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Statistics>, ServiceError> {
    adjust_counter(ctx, session, "words_learned", |stats| {
        stats.words_learned = stats.words_learned.saturating_add(1);
        stats.words_learned
    })
    .await
}

pub async fn increase_cycles(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Statistics>, ServiceError> {
    adjust_counter(ctx, session, "cycles", |stats| {
        stats.cycles = stats.cycles.saturating_add(1);
        stats.cycles
    })
    .await
}

/// Credits today's activity. A missing statistics document is a no-op.
pub async fn update_day_streak(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Statistics>, ServiceError> {
    let Some(mut stats) = find_statistics(ctx, session).await? else {
        return Ok(None);
    };

    if let Some(fields) = apply_streak(&mut stats, ctx.clock.now(), ctx.day_offset) {
        ctx.store().update(STATISTICS, &stats.id, fields).await?;
        tracing::debug!(user_id = %session.user_id, days = stats.days, "day streak updated");
    }
    Ok(Some(stats))
}

/// Looks up the ladder's counter in the current statistics and records the
/// matching achievement if it is not already unlocked.
async fn check_ladder(
    ctx: &ServiceContext,
    session: &Session,
    ladder: &Ladder,
) -> Result<Option<Achievement>, ServiceError> {
    let Some(mut stats) = find_statistics(ctx, session).await? else {
        return Ok(None);
    };

    let Some(achievement) = ladder.lookup(ladder.kind.counter(&stats)) else {
        return Ok(None);
    };
    if !record_advancement(&mut stats, achievement) {
        return Ok(None);
    }

    let mut batch = WriteBatch::new();
    let mut fields = Fields::new();
    fields.insert("advancements".to_string(), json!(stats.advancements));
    batch.update(STATISTICS, &stats.id, fields);
    ctx.store().commit(batch).await?;

    tracing::info!(
        user_id = %session.user_id,
        achievement = achievement.as_str(),
        "achievement unlocked"
    );
    Ok(Some(achievement))
}

pub async fn check_day_achievement(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Achievement>, ServiceError> {
    check_ladder(ctx, session, &DAYS_LADDER).await
}

pub async fn check_words_achievement(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Achievement>, ServiceError> {
    check_ladder(ctx, session, &WORDS_LADDER).await
}

/// Expects `cycles` to already hold the just-completed cycle.
pub async fn check_cycles_achievement(
    ctx: &ServiceContext,
    session: &Session,
) -> Result<Option<Achievement>, ServiceError> {
    check_ladder(ctx, session, &CYCLES_LADDER).await
}

pub async fn stage_language_deletion(
    ctx: &ServiceContext,
    batch: &mut WriteBatch,
    user_id: &str,
    language_id: &str,
) -> Result<(), ServiceError> {
    let docs = ctx
        .store()
        .query(&statistics_query(user_id, language_id))
        .await?;
    for doc in &docs {
        batch.delete(STATISTICS, &doc.id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::Clock;
    use crate::services::testing::{at, harness};
    use chrono::Duration;
    use proptest::prelude::*;

    fn offset_hours(h: i32) -> FixedOffset {
        FixedOffset::east_opt(h * 3600).unwrap()
    }

    #[test]
    fn no_prior_activity_resets() {
        let now = at(2024, 3, 10, 12);
        assert_eq!(
            streak_transition(None, now, offset_hours(0)),
            StreakTransition::Reset
        );
    }

    #[test]
    fn transition_uses_calendar_days_not_elapsed_time() {
        let offset = offset_hours(0);
        let late = at(2024, 3, 9, 23);
        let early = at(2024, 3, 10, 1);
        assert_eq!(
            streak_transition(Some(late), early, offset),
            StreakTransition::Extended
        );
        assert_eq!(
            streak_transition(Some(at(2024, 3, 10, 0)), at(2024, 3, 10, 23), offset),
            StreakTransition::Unchanged
        );
        assert_eq!(
            streak_transition(Some(at(2024, 3, 8, 23)), early, offset),
            StreakTransition::Reset
        );
    }

    #[test]
    fn transition_respects_local_midnight() {
        // 22:00 UTC on the 9th is already the 10th at UTC+3.
        let last = at(2024, 3, 9, 22);
        let now = at(2024, 3, 10, 12);
        assert_eq!(
            streak_transition(Some(last), now, offset_hours(3)),
            StreakTransition::Unchanged
        );
        assert_eq!(
            streak_transition(Some(last), now, offset_hours(0)),
            StreakTransition::Extended
        );
    }

    #[tokio::test]
    async fn same_day_twice_counts_once() {
        let h = harness().await;
        h.clock.advance(Duration::days(1));
        let first = update_day_streak(&h.ctx, &h.session).await.unwrap().unwrap();
        assert_eq!(first.days, 1);
        let second = update_day_streak(&h.ctx, &h.session).await.unwrap().unwrap();
        assert_eq!(second.days, 1);
    }

    #[tokio::test]
    async fn skipping_two_days_resets_streak() {
        let h = harness().await;
        for _ in 0..3 {
            h.clock.advance(Duration::days(1));
            update_day_streak(&h.ctx, &h.session).await.unwrap();
        }
        let stats = find_statistics(&h.ctx, &h.session).await.unwrap().unwrap();
        assert_eq!(stats.days, 3);

        h.clock.advance(Duration::days(2));
        let stats = update_day_streak(&h.ctx, &h.session).await.unwrap().unwrap();
        assert_eq!(stats.days, 0);
        assert_eq!(stats.last_activity, Some(h.clock.now()));
    }

    #[tokio::test]
    async fn missing_statistics_is_not_an_error() {
        let h = harness().await;
        let stranger = Session::new("nobody").with_language("lang-de");
        assert!(update_day_streak(&h.ctx, &stranger).await.unwrap().is_none());
        assert!(check_day_achievement(&h.ctx, &stranger).await.unwrap().is_none());
        assert!(increase_cycles(&h.ctx, &stranger).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn day_achievement_is_recorded_once() {
        let h = harness().await;
        h.clock.advance(Duration::days(1));
        update_day_streak(&h.ctx, &h.session).await.unwrap();

        let first = check_day_achievement(&h.ctx, &h.session).await.unwrap();
        assert_eq!(first, Some(Achievement::OneDayStreak));
        let again = check_day_achievement(&h.ctx, &h.session).await.unwrap();
        assert_eq!(again, None);

        let stats = find_statistics(&h.ctx, &h.session).await.unwrap().unwrap();
        assert_eq!(stats.advancements, vec![Achievement::OneDayStreak.as_str()]);
    }

    #[tokio::test]
    async fn zero_day_streak_has_no_achievement() {
        let h = harness().await;
        assert_eq!(check_day_achievement(&h.ctx, &h.session).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ensure_statistics_is_idempotent() {
        let h = harness().await;
        ensure_statistics(&h.ctx, "user-1", "lang-de").await.unwrap();
        assert_eq!(h.store.len(STATISTICS), 1);
    }

    fn blank_stats() -> Statistics {
        Statistics {
            id: "s".into(),
            words_learned: 0,
            cycles: 0,
            days: 0,
            advancements: Vec::new(),
            last_activity: None,
            user_id: "u".into(),
            language_id: "l".into(),
        }
    }

    proptest! {
        #[test]
        fn streak_follows_day_gaps(gaps in proptest::collection::vec(0i64..4, 1..40)) {
            let offset = offset_hours(0);
            let mut now = at(2024, 1, 1, 9);
            let mut stats = blank_stats();
            apply_streak(&mut stats, now, offset);
            let mut expected = 0u32;

            for gap in gaps {
                now += Duration::days(gap);
                apply_streak(&mut stats, now, offset);
                expected = match gap {
                    0 => expected,
                    1 => expected + 1,
                    _ => 0,
                };
                prop_assert_eq!(stats.days, expected);
            }
        }

        #[test]
        fn recording_is_idempotent(repeats in 1usize..6, days in 0u32..400) {
            let mut stats = blank_stats();
            stats.days = days;
            for _ in 0..repeats {
                if let Some(a) = DAYS_LADDER.lookup(stats.days) {
                    record_advancement(&mut stats, a);
                }
            }
            let expected = usize::from(DAYS_LADDER.lookup(days).is_some());
            prop_assert_eq!(stats.advancements.len(), expected);
        }
    }
}
