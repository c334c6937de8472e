use crate::models::{Category, CategorySummary, Judgement, Outcome, ReportSummary};

/// Running per-category sums
#[derive(Debug, Clone, Default, PartialEq)]
struct CategoryTotals {
    sum_a: f64,
    sum_b: f64,
    count: usize,
}

/// Folds judgements into win/tie counts and optional per-category totals
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    wins_a: usize,
    wins_b: usize,
    ties: usize,
    breakdown: bool,
    /// First-seen order
    categories: Vec<(Category, CategoryTotals)>,
}

impl Aggregator {
    pub fn new(breakdown: bool) -> Self {
        Self {
            breakdown,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.wins_a + self.wins_b + self.ties
    }

    pub fn record(&mut self, category: &Category, judgement: &Judgement) {
        match judgement.outcome() {
            Outcome::AWins => self.wins_a += 1,
            Outcome::BWins => self.wins_b += 1,
            Outcome::Tie => self.ties += 1,
        }

        if !self.breakdown {
            return;
        }

        let (score_a, score_b) = judgement.scores().unwrap_or((0.0, 0.0));
        let totals = match self.categories.iter().position(|(c, _)| c == category) {
            Some(idx) => &mut self.categories[idx].1,
            None => {
                self.categories.push((category.clone(), CategoryTotals::default()));
                let last = self.categories.len() - 1;
                &mut self.categories[last].1
            }
        };
        totals.sum_a += score_a;
        totals.sum_b += score_b;
        totals.count += 1;
    }

    /// Final counts with per-category means
    pub fn finish(&self) -> ReportSummary {
        let categories = self
            .categories
            .iter()
            .map(|(category, totals)| CategorySummary {
                category: category.clone(),
                count: totals.count,
                mean_a: totals.sum_a / totals.count as f64,
                mean_b: totals.sum_b / totals.count as f64,
            })
            .collect();

        ReportSummary {
            total: self.total(),
            wins_a: self.wins_a,
            wins_b: self.wins_b,
            ties: self.ties,
            categories,
        }
    }
}
