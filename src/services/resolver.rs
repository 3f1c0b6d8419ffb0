use crate::models::{Catalog, Recommendation};
use ndarray::ArrayView1;
use std::{cmp::Ordering, collections::HashSet};

pub const MAX_SUGGESTIONS: usize = 5;

/// Which resolution tier matched a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Substring,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched { index: usize, tier: MatchTier },
    NotFound { suggestions: Vec<String> },
}

/// Maps free-text app names to catalog rows and ranks their neighbours.
///
/// Lowercased names are computed once so per-request work is a scan plus a sort.
#[derive(Debug, Clone)]
pub struct QueryResolver {
    lowered: Vec<String>,
}

impl QueryResolver {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            lowered: catalog.iter().map(|row| row.name.to_lowercase()).collect(),
        }
    }

    /// Exact, then case-insensitive, then substring; the first hit in catalog order wins.
    pub fn resolve(&self, catalog: &Catalog, query: &str) -> Resolution {
        if let Some(index) = catalog.iter().position(|row| row.name == query) {
            return Resolution::Matched {
                index,
                tier: MatchTier::Exact,
            };
        }

        let query_lower = query.to_lowercase();
        if let Some(index) = self.lowered.iter().position(|name| *name == query_lower) {
            return Resolution::Matched {
                index,
                tier: MatchTier::CaseInsensitive,
            };
        }

        if let Some(index) = self
            .lowered
            .iter()
            .position(|name| name.contains(&query_lower))
        {
            return Resolution::Matched {
                index,
                tier: MatchTier::Substring,
            };
        }

        Resolution::NotFound {
            suggestions: self.suggest(catalog, &query_lower),
        }
    }

    /// Names sharing text with the query, or failing that, apps from a category
    /// named in the query.
    fn suggest(&self, catalog: &Catalog, query_lower: &str) -> Vec<String> {
        let tokens: Vec<&str> = query_lower.split_whitespace().collect();

        let by_name = catalog
            .iter()
            .zip(&self.lowered)
            .filter(|(_, name)| {
                name.contains(query_lower) || tokens.iter().any(|token| name.contains(token))
            })
            .map(|(row, _)| row.name.as_str());
        let suggestions = distinct(by_name);
        if !suggestions.is_empty() {
            return suggestions;
        }

        let mut categories: Vec<&str> = Vec::new();
        for row in catalog.iter() {
            if !categories.contains(&row.category.as_str()) {
                categories.push(&row.category);
            }
        }

        categories
            .into_iter()
            .filter(|category| !category.trim().is_empty())
            .find(|category| query_lower.contains(&category.to_lowercase()))
            .map(|category| {
                distinct(
                    catalog
                        .iter()
                        .filter(|row| row.category == category)
                        .map(|row| row.name.as_str()),
                )
            })
            .unwrap_or_default()
    }

    /// Top `k` neighbours of row `index`, best first, one entry per case-insensitive name.
    ///
    /// Ties keep catalog order. The query row and every listing sharing its name are skipped.
    pub fn rank(
        &self,
        catalog: &Catalog,
        scores: ArrayView1<'_, f64>,
        index: usize,
        k: usize,
    ) -> Vec<Recommendation> {
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));

        let mut seen: HashSet<&str> = HashSet::new();
        if let Some(name) = self.lowered.get(index) {
            seen.insert(name);
        }

        let mut recommendations = Vec::with_capacity(k);
        for j in order {
            if recommendations.len() >= k {
                break;
            }
            if j == index {
                continue;
            }
            let (Some(row), Some(name)) = (catalog.get(j), self.lowered.get(j)) else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            recommendations.push(Recommendation {
                name: row.name.clone(),
                category: row.category.clone(),
                rating: row.rating,
            });
        }

        recommendations
    }
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if out.len() >= MAX_SUGGESTIONS {
            break;
        }
        if !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}
