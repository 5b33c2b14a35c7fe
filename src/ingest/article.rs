use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CATEGORY_FINANCIAL: &str = "Financial";
pub const CATEGORY_BUSINESS: &str = "Business";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Source {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Quote {
    pub text: String,
    pub speaker: String,
}

/// Field order matches the store files the site already serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub category: String,
    pub id: String,
    pub date: String,
    pub lead: String,
    pub image: String,
    pub dot_points: Vec<String>,
    pub sources: Vec<Source>,
    pub quotes: Vec<Quote>,
}

impl Article {
    /// Same article under a different id.
    pub fn with_id(self, id: String) -> Self {
        Self { id, ..self }
    }
}

/// `{ "articles": [...] }`: the store and the normalized intermediate.
/// Top-level keys other than `articles` survive a rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ArticleDocument {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub type Store = ArticleDocument;

impl ArticleDocument {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            extra: Map::new(),
        }
    }
}
