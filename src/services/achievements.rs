//! Milestone catalog.
//!
//! Each ladder is an ordered table of `(threshold, achievement)` pairs and a
//! counter unlocks an achievement only when it equals a threshold exactly.
//! A counter that jumps over a threshold does not unlock it.

use serde::{Serialize, Serializer};

use crate::models::Statistics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Achievement {
    TenWords,
    FiftyWords,
    HundredWords,
    ThreeHundredWords,
    FiveHundredWords,
    SevenHundredWords,
    ThousandWords,
    ThreeThousandWords,
    FiveThousandWords,
    OneCycle,
    FiveCycles,
    TenCycles,
    TwentyCycles,
    ThirtyCycles,
    FiftyCycles,
    OneDayStreak,
    ThreeDayStreak,
    WeekStreak,
    TwoWeekStreak,
    ThreeWeekStreak,
    MonthStreak,
    TwoMonthStreak,
    SixMonthStreak,
    OneYearStreak,
}

impl Achievement {
    /// The identifier recorded in a statistics document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TenWords => "The First Step (Learn 10 words)",
            Self::FiftyWords => "Word Collector (Learn 50 words)",
            Self::HundredWords => "Century (Learn 100 words)",
            Self::ThreeHundredWords => "Vocabulary Builder (Learn 300 words)",
            Self::FiveHundredWords => "Wordsmith (Learn 500 words)",
            Self::SevenHundredWords => "Lexicon Explorer (Learn 700 words)",
            Self::ThousandWords => "A Thousand Words (Learn 1000 words)",
            Self::ThreeThousandWords => "Polyglot in the Making (Learn 3000 words)",
            Self::FiveThousandWords => "Living Dictionary (Learn 5000 words)",
            Self::OneCycle => "Full Circle (Complete 1 cycle)",
            Self::FiveCycles => "Going Round (Complete 5 cycles)",
            Self::TenCycles => "Spin Cycle (Complete 10 cycles)",
            Self::TwentyCycles => "Perpetual Motion (Complete 20 cycles)",
            Self::ThirtyCycles => "Orbit Master (Complete 30 cycles)",
            Self::FiftyCycles => "Revolutionary (Complete 50 cycles)",
            Self::OneDayStreak => "Day One (1 day streak)",
            Self::ThreeDayStreak => "Warming Up (3 day streak)",
            Self::WeekStreak => "Week Warrior (7 day streak)",
            Self::TwoWeekStreak => "Fortnight Focus (14 day streak)",
            Self::ThreeWeekStreak => "Habit Formed (21 day streak)",
            Self::MonthStreak => "Monthly Devotion (30 day streak)",
            Self::TwoMonthStreak => "Unstoppable (60 day streak)",
            Self::SixMonthStreak => "Half a Year Strong (180 day streak)",
            Self::OneYearStreak => "Year of Words (365 day streak)",
        }
    }

    pub fn ladder(&self) -> LadderKind {
        match self {
            Self::OneCycle
            | Self::FiveCycles
            | Self::TenCycles
            | Self::TwentyCycles
            | Self::ThirtyCycles
            | Self::FiftyCycles => LadderKind::Cycles,
            Self::OneDayStreak
            | Self::ThreeDayStreak
            | Self::WeekStreak
            | Self::TwoWeekStreak
            | Self::ThreeWeekStreak
            | Self::MonthStreak
            | Self::TwoMonthStreak
            | Self::SixMonthStreak
            | Self::OneYearStreak => LadderKind::Days,
            _ => LadderKind::Words,
        }
    }
}

impl Serialize for Achievement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderKind {
    Words,
    Cycles,
    Days,
}

impl LadderKind {
    /// The counter this ladder is keyed on.
    pub fn counter(&self, stats: &Statistics) -> u32 {
        match self {
            Self::Words => stats.words_learned,
            Self::Cycles => stats.cycles,
            Self::Days => stats.days,
        }
    }
}

#[derive(Debug)]
pub struct Ladder {
    pub kind: LadderKind,
    pub steps: &'static [(u32, Achievement)],
}

impl Ladder {
    pub fn lookup(&self, value: u32) -> Option<Achievement> {
        self.steps
            .iter()
            .find(|(threshold, _)| *threshold == value)
            .map(|(_, achievement)| *achievement)
    }
}

pub const WORDS_LADDER: Ladder = Ladder {
    kind: LadderKind::Words,
    steps: &[
        (10, Achievement::TenWords),
        (50, Achievement::FiftyWords),
        (100, Achievement::HundredWords),
        (300, Achievement::ThreeHundredWords),
        (500, Achievement::FiveHundredWords),
        (700, Achievement::SevenHundredWords),
        (1000, Achievement::ThousandWords),
        (3000, Achievement::ThreeThousandWords),
        (5000, Achievement::FiveThousandWords),
    ],
};

pub const CYCLES_LADDER: Ladder = Ladder {
    kind: LadderKind::Cycles,
    steps: &[
        (1, Achievement::OneCycle),
        (5, Achievement::FiveCycles),
        (10, Achievement::TenCycles),
        (20, Achievement::TwentyCycles),
        (30, Achievement::ThirtyCycles),
        (50, Achievement::FiftyCycles),
    ],
};

pub const DAYS_LADDER: Ladder = Ladder {
    kind: LadderKind::Days,
    steps: &[
        (1, Achievement::OneDayStreak),
        (3, Achievement::ThreeDayStreak),
        (7, Achievement::WeekStreak),
        (14, Achievement::TwoWeekStreak),
        (21, Achievement::ThreeWeekStreak),
        (30, Achievement::MonthStreak),
        (60, Achievement::TwoMonthStreak),
        (180, Achievement::SixMonthStreak),
        (365, Achievement::OneYearStreak),
    ],
};

pub const LADDERS: [&Ladder; 3] = [&WORDS_LADDER, &CYCLES_LADDER, &DAYS_LADDER];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: Achievement,
    pub ladder: LadderKind,
    pub threshold: u32,
    pub unlocked: bool,
}

/// Every achievement with its unlock state for the given statistics.
pub fn catalog(stats: Option<&Statistics>) -> Vec<CatalogEntry> {
    LADDERS
        .iter()
        .flat_map(|ladder| {
            ladder.steps.iter().map(move |(threshold, achievement)| CatalogEntry {
                id: *achievement,
                ladder: ladder.kind,
                threshold: *threshold,
                unlocked: stats.is_some_and(|s| s.has_advancement(achievement.as_str())),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_words_is_the_first_step() {
        assert_eq!(WORDS_LADDER.lookup(10), Some(Achievement::TenWords));
        assert_eq!(
            Achievement::TenWords.as_str(),
            "The First Step (Learn 10 words)"
        );
    }

    #[test]
    fn lookup_is_exact_match_only() {
        assert_eq!(WORDS_LADDER.lookup(11), None);
        assert_eq!(WORDS_LADDER.lookup(9), None);
        assert_eq!(DAYS_LADDER.lookup(0), None);
        assert_eq!(DAYS_LADDER.lookup(8), None);
        assert_eq!(CYCLES_LADDER.lookup(2), None);
    }

    #[test]
    fn ladders_strictly_increase() {
        for ladder in LADDERS {
            assert!(ladder.steps.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }

    #[test]
    fn identifiers_are_unique() {
        let all: Vec<_> = catalog(None).into_iter().map(|e| e.id).collect();
        assert_eq!(all.len(), 24);
        let mut names: Vec<_> = all.iter().map(|a| a.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn every_achievement_belongs_to_its_ladder() {
        for ladder in LADDERS {
            for (_, achievement) in ladder.steps {
                assert_eq!(achievement.ladder(), ladder.kind);
            }
        }
    }
}
