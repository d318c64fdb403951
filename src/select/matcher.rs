//! Fuzzy application search.
//!
//! Fields searched: name, charm URL, base name, base channel. The query is
//! split on whitespace and every term must land on some field; term order is
//! irrelevant. A term scores against a field as the best `rapidfuzz` ratio
//! over same-length windows of the field, so "wrod" still finds "wordpress".
//! An exact substring scores 1.0.
//!
//! A blank query returns every application in inventory order.

use crate::juju::model::Application;

/// Minimum per-term similarity (0..=1) for an application to match.
pub const MIN_SIMILARITY: f64 = 0.6;

/// An application with its match quality.
#[derive(Debug, Clone, Copy)]
pub struct Ranked<'a> {
    pub score: f64,
    pub application: &'a Application,
}

/// Applications matching `query`, best first, ties in inventory order.
pub fn search(applications: &[Application], query: &str) -> Vec<Application> {
    rank(applications, query)
        .into_iter()
        .map(|r| r.application.clone())
        .collect()
}

pub fn rank<'a>(applications: &'a [Application], query: &str) -> Vec<Ranked<'a>> {
    let terms: Vec<Vec<char>> = query
        .split_whitespace()
        .map(|t| t.to_lowercase().chars().collect())
        .collect();

    if terms.is_empty() {
        return applications
            .iter()
            .map(|application| Ranked {
                score: 1.0,
                application,
            })
            .collect();
    }

    let mut ranked: Vec<Ranked<'a>> = applications
        .iter()
        .filter_map(|application| {
            score_application(application, &terms).map(|score| Ranked { score, application })
        })
        .collect();

    // stable: equal scores keep inventory order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn score_application(application: &Application, terms: &[Vec<char>]) -> Option<f64> {
    let fields: Vec<Vec<char>> = [
        application.name.as_str(),
        application.charm.as_str(),
        application.base.name.as_str(),
        application.base.channel.as_str(),
    ]
    .iter()
    .filter(|f| !f.is_empty())
    .map(|f| f.to_lowercase().chars().collect())
    .collect();

    let mut total = 0.0;
    for term in terms {
        let best = fields
            .iter()
            .map(|field| term_similarity(term, field))
            .fold(0.0_f64, f64::max);
        if best < MIN_SIMILARITY {
            return None;
        }
        total += best;
    }
    Some(total / terms.len() as f64)
}

fn term_similarity(term: &[char], field: &[char]) -> f64 {
    if term.is_empty() || field.is_empty() {
        return 0.0;
    }
    if field.len() <= term.len() {
        return rapidfuzz::fuzz::ratio(term.iter().copied(), field.iter().copied());
    }
    if field.windows(term.len()).any(|w| w == term) {
        return 1.0;
    }
    field
        .windows(term.len())
        .map(|w| rapidfuzz::fuzz::ratio(term.iter().copied(), w.iter().copied()))
        .fold(0.0_f64, f64::max)
}
