use crate::ingest::article::Article;
use crate::ingest::similarity::{char_ratio, fold, quick_ratio};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupThresholds {
    pub title: f64,
    pub content: f64,
}

impl Default for DedupThresholds {
    fn default() -> Self {
        Self {
            title: 0.95,
            content: 0.90,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    /// Index into the reference set, store articles first.
    pub position: usize,
    pub existing_id: String,
    pub existing_title: String,
    pub title_ratio: f64,
    pub content_ratio: f64,
}

#[derive(Debug, Clone)]
struct Folded {
    id: String,
    title_raw: String,
    title: Vec<char>,
    content: Vec<char>,
}

impl Folded {
    fn from_article(article: &Article) -> Self {
        Self {
            id: article.id.clone(),
            title_raw: article.title.clone(),
            title: fold(&article.title),
            content: fold(&article.content),
        }
    }
}

/// Exact ratio only when it can still beat `threshold`. Two empty fields
/// carry no signal, so they never match (a plain ratio would score them 1.0).
fn ratio_above(a: &[char], b: &[char], threshold: f64) -> Option<f64> {
    if a.is_empty() && b.is_empty() {
        return None;
    }
    if quick_ratio(a, b) <= threshold {
        return None;
    }
    let ratio = char_ratio(a, b);
    (ratio > threshold).then_some(ratio)
}

fn reported_ratio(a: &[char], b: &[char]) -> f64 {
    if a.is_empty() && b.is_empty() {
        0.0
    } else {
        char_ratio(a, b)
    }
}

/// Reference articles case-folded once per run; scanned front to back.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    thresholds: DedupThresholds,
    reference: Vec<Folded>,
}

impl DuplicateDetector {
    pub fn new(existing: &[Article], thresholds: DedupThresholds) -> Self {
        Self {
            thresholds,
            reference: existing.iter().map(Folded::from_article).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.reference.len()
    }

    /// Add an accepted article to the reference set (within-batch mode).
    pub fn remember(&mut self, article: &Article) {
        self.reference.push(Folded::from_article(article));
    }

    pub fn find(&self, candidate: &Article) -> Option<DuplicateMatch> {
        let candidate = Folded::from_article(candidate);
        for (position, existing) in self.reference.iter().enumerate() {
            let (title_ratio, content_ratio) = if let Some(title_ratio) =
                ratio_above(&candidate.title, &existing.title, self.thresholds.title)
            {
                (title_ratio, reported_ratio(&candidate.content, &existing.content))
            } else if let Some(content_ratio) =
                ratio_above(&candidate.content, &existing.content, self.thresholds.content)
            {
                (reported_ratio(&candidate.title, &existing.title), content_ratio)
            } else {
                continue;
            };
            return Some(DuplicateMatch {
                position,
                existing_id: existing.id.clone(),
                existing_title: existing.title_raw.clone(),
                title_ratio,
                content_ratio,
            });
        }
        None
    }
}

pub fn find_duplicate(
    candidate: &Article,
    existing: &[Article],
    thresholds: DedupThresholds,
) -> Option<DuplicateMatch> {
    DuplicateDetector::new(existing, thresholds).find(candidate)
}

pub fn is_duplicate(candidate: &Article, existing: &[Article], thresholds: DedupThresholds) -> bool {
    find_duplicate(candidate, existing, thresholds).is_some()
}
