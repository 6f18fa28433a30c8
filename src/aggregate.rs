use std::collections::HashSet;

use crate::apis::{PaperSource, SearchQuery};
use crate::history::History;
use crate::paper::PaperRecord;

/// Inputs for one aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct AggregatePlan<'a> {
    pub keywords: &'a [String],
    pub venues: &'a str,
    pub year_window: &'a str,
    pub fetch_limit: u32,
    pub max_per_keyword: usize,
    pub max_total: usize,
    /// Year shown for papers the API returns without any date.
    pub current_year: i32,
}

/// Year range covering last year and this year, e.g. `2025-2026`.
pub fn year_window(current_year: i32) -> String {
    format!("{}-{}", current_year - 1, current_year)
}

/// Search every keyword in order and merge the hits into one list that is
/// unique by raw title, excludes `history`, gives each keyword at most
/// `max_per_keyword` slots, and holds at most `max_total` papers.
///
/// A keyword whose search fails contributes nothing; the others still run.
pub async fn aggregate(
    source: &dyn PaperSource,
    plan: &AggregatePlan<'_>,
    history: &History,
) -> Vec<PaperRecord> {
    let mut accepted: Vec<PaperRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for keyword in plan.keywords {
        tracing::info!("Searching {} for keyword {:?}", source.name(), keyword);
        let query = SearchQuery {
            keyword: keyword.as_str(),
            venues: plan.venues,
            year_window: plan.year_window,
            fetch_limit: plan.fetch_limit,
        };
        let candidates = match source.search(query).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Search for keyword {:?} failed: {}", keyword, e);
                continue;
            }
        };

        let returned = candidates.len();
        let mut taken = 0usize;
        for candidate in candidates {
            if taken >= plan.max_per_keyword {
                break;
            }
            if seen.contains(&candidate.title) || history.contains(&candidate.title) {
                continue;
            }
            let Some(paper) = PaperRecord::from_candidate(candidate, plan.current_year) else {
                continue;
            };
            seen.insert(paper.raw_title.clone());
            accepted.push(paper);
            taken += 1;
        }
        tracing::debug!(
            "Keyword {:?}: {} returned, {} accepted",
            keyword,
            returned,
            taken
        );
    }

    if accepted.len() > plan.max_total {
        tracing::info!(
            "Capping {} new papers to max_total={}",
            accepted.len(),
            plan.max_total
        );
        accepted.truncate(plan.max_total);
    }
    accepted
}
