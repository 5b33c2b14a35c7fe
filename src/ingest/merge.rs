use crate::ingest::article::{Article, Store};
use crate::ingest::config::{IdCollisionPolicy, IngestConfig};
use crate::ingest::dedup::{DuplicateDetector, DuplicateMatch};
use crate::ingest::normalize::{Rejection, normalize_all};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub seen: usize,
    pub invalid: usize,
    pub duplicates: usize,
    pub id_collisions: usize,
    pub rekeyed: usize,
    pub merged: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Duplicate(DuplicateMatch),
    IdCollision(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    pub id: String,
    pub title: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub store: Store,
    pub stats: MergeStats,
    pub rejected: Vec<Rejection>,
    pub skipped: Vec<Skipped>,
}

impl MergeOutcome {
    /// False when nothing was accepted; the store must then not be rewritten.
    pub fn changed(&self) -> bool {
        self.stats.merged > 0
    }
}

/// Normalize `new_records`, drop duplicates of the pre-merge store and
/// prepend the survivors, in input order, ahead of the existing articles.
pub fn merge(new_records: &[Value], store: Store, config: &IngestConfig) -> MergeOutcome {
    let batch = normalize_all(new_records, &config.normalize);
    let mut stats = MergeStats {
        seen: new_records.len(),
        invalid: batch.rejected.len(),
        ..MergeStats::default()
    };

    let limit = config.dedup.scan_warn_limit;
    if limit > 0 && store.articles.len() > limit {
        warn!(
            store_articles = store.articles.len(),
            limit, "store is large; duplicate scan is linear in store size"
        );
    }

    let mut detector = DuplicateDetector::new(&store.articles, config.dedup.thresholds());
    let mut taken_ids: HashSet<String> = store.articles.iter().map(|a| a.id.clone()).collect();
    let mut accepted: Vec<Article> = Vec::new();
    let mut skipped = Vec::new();

    for article in batch.articles {
        if let Some(found) = detector.find(&article) {
            info!(
                id = %article.id,
                title = %article.title,
                matched_id = %found.existing_id,
                title_ratio = found.title_ratio,
                content_ratio = found.content_ratio,
                "skipping duplicate"
            );
            stats.duplicates += 1;
            skipped.push(Skipped {
                id: article.id.clone(),
                title: article.title.clone(),
                reason: SkipReason::Duplicate(found),
            });
            continue;
        }

        let article = if taken_ids.contains(&article.id) {
            stats.id_collisions += 1;
            match config.dedup.id_collision {
                IdCollisionPolicy::Skip => {
                    info!(id = %article.id, title = %article.title, "skipping id collision");
                    skipped.push(Skipped {
                        id: article.id.clone(),
                        title: article.title.clone(),
                        reason: SkipReason::IdCollision(article.id.clone()),
                    });
                    continue;
                }
                IdCollisionPolicy::Rekey => {
                    let fresh = Uuid::new_v4().to_string();
                    warn!(old_id = %article.id, new_id = %fresh, "id already in use; re-keyed");
                    stats.rekeyed += 1;
                    article.with_id(fresh)
                }
                IdCollisionPolicy::Keep => {
                    warn!(id = %article.id, "id already in use; keeping duplicate id");
                    article
                }
            }
        } else {
            article
        };

        if config.dedup.within_batch {
            detector.remember(&article);
        }
        taken_ids.insert(article.id.clone());
        accepted.push(article);
    }

    stats.merged = accepted.len();
    let Store {
        articles: existing,
        extra,
    } = store;
    accepted.extend(existing);

    MergeOutcome {
        store: Store {
            articles: accepted,
            extra,
        },
        stats,
        rejected: batch.rejected,
        skipped,
    }
}
