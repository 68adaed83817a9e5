//! Link suggestion scoring
//!
//! Ranks candidate breeding plans for an orphan group. A heuristic, not
//! a guarantee: ties and near-ties are expected, and the caller shows the
//! ranked list to a human who makes the final call.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::db::groups::OffspringGroup;
use crate::db::plans::BreedingPlan;

/// Suggestions returned when the caller doesn't ask for a count
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

const BASE_SCORE: i32 = 10;
const SPECIES_MATCH: i32 = 25;
const DAM_MATCH: i32 = 40;
const BIRTH_DATE_PROXIMITY: i32 = 20;
const SIRE_MATCH: i32 = 5;

/// Days of slack allowed between the group's and the plan's birth dates
const BIRTH_DATE_WINDOW_DAYS: i64 = 7;

/// One ranked candidate
#[derive(Debug, Clone, Serialize)]
pub struct PlanSuggestion {
    pub plan_id: Uuid,
    pub plan_name: Option<String>,
    pub expected_birth_date: Option<NaiveDate>,
    pub dam_name: Option<String>,
    pub sire_name: Option<String>,
    pub match_score: i32,
}

fn score_plan(group: &OffspringGroup, plan: &BreedingPlan) -> i32 {
    let mut score = BASE_SCORE;

    // Species codes compare case-sensitively as stored
    if let (Some(g), Some(p)) = (group.species.as_deref(), plan.species.as_deref()) {
        if g == p {
            score += SPECIES_MATCH;
        }
    }

    if let (Some(g), Some(p)) = (group.dam_id, plan.dam_id) {
        if g == p {
            score += DAM_MATCH;
        }
    }

    // Date-only comparison: plan datetimes are truncated to their UTC
    // date before the window check.
    let group_date = group.best_known_birth();
    let plan_date = plan.resolved_expected_birth().map(|dt| dt.date_naive());
    if let (Some(g), Some(p)) = (group_date, plan_date) {
        if (g - p).num_days().abs() <= BIRTH_DATE_WINDOW_DAYS {
            score += BIRTH_DATE_PROXIMITY;
        }
    }

    if let (Some(g), Some(p)) = (group.sire_id, plan.sire_id) {
        if g == p {
            score += SIRE_MATCH;
        }
    }

    score
}

/// Score and rank candidate plans for a group. Descending by score;
/// stable sort keeps the candidates' original order on ties; truncated
/// to `limit`.
pub fn suggest_plans(
    group: &OffspringGroup,
    plans: &[BreedingPlan],
    limit: usize,
) -> Vec<PlanSuggestion> {
    let mut suggestions: Vec<PlanSuggestion> = plans
        .iter()
        .map(|plan| PlanSuggestion {
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            expected_birth_date: plan.resolved_expected_birth().map(|dt| dt.date_naive()),
            dam_name: plan.dam_name.clone(),
            sire_name: plan.sire_name.clone(),
            match_score: score_plan(group, plan),
        })
        .collect();

    suggestions.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    suggestions.truncate(limit);
    suggestions
}
