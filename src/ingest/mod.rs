pub mod article;
pub mod audit;
pub mod config;
pub mod dedup;
pub mod merge;
pub mod normalize;
pub mod paths;
pub mod payload;
pub mod salvage;
pub mod similarity;
pub mod store;
pub mod text;
pub mod util;
