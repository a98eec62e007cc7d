use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;

use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;

const SIMPLE_PATTERN_THRESHOLD: usize = 32;

static PATTERN_CACHE: Lazy<DashMap<String, MatchStrategy>> = Lazy::new(DashMap::new);

/// Case-insensitive "does this text contain this keyword" capability
pub trait Matcher: Send + Sync {
    /// The keyword set, in the order results are reported
    fn keywords(&self) -> &[String];

    /// Every keyword occurring at least once in `text`
    fn matching_keywords<'a>(&'a self, text: &str) -> Vec<&'a str>;
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    /// Escaped literal; the regex engine takes its literal fast path
    Simple(Arc<Regex>),
    Regex(Arc<Regex>),
}

/// Handles pattern matching operations
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    keywords: Vec<String>,
    strategies: Vec<MatchStrategy>,
    metrics: Arc<SearchMetrics>,
}

impl PatternMatcher {
    /// Creates a new PatternMatcher for the given keywords
    pub fn new(keywords: Vec<String>) -> SearchResult<Self> {
        Self::with_metrics(keywords, Arc::new(SearchMetrics::new()))
    }

    /// Creates a new PatternMatcher with the specified metrics
    pub fn with_metrics(keywords: Vec<String>, metrics: Arc<SearchMetrics>) -> SearchResult<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            if keyword.is_empty() {
                return Err(SearchError::invalid_pattern("keywords must not be empty"));
            }
            if !unique.contains(&keyword) {
                unique.push(keyword);
            }
        }

        let mut strategies = Vec::with_capacity(unique.len());
        for keyword in &unique {
            let strategy = if let Some(entry) = PATTERN_CACHE.get(keyword) {
                metrics.record_cache_operation(true);
                entry.clone()
            } else {
                let strategy = Self::compile(keyword)?;
                metrics.record_cache_operation(false);
                PATTERN_CACHE.insert(keyword.clone(), strategy.clone());
                strategy
            };
            strategies.push(strategy);
        }

        Ok(Self {
            keywords: unique,
            strategies,
            metrics,
        })
    }

    /// Gets the metrics this matcher reports cache lookups to
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    fn compile(keyword: &str) -> SearchResult<MatchStrategy> {
        let simple = Self::is_simple_pattern(keyword);
        let pattern = if simple {
            regex::escape(keyword)
        } else {
            keyword.to_string()
        };

        // Case folding, not lowercasing: final sigma and friends must still match
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| SearchError::invalid_pattern(format!("{}: {}", keyword, e)))?;

        Ok(if simple {
            MatchStrategy::Simple(Arc::new(regex))
        } else {
            MatchStrategy::Regex(Arc::new(regex))
        })
    }

    /// Determines if a pattern can use simple string matching
    fn is_simple_pattern(pattern: &str) -> bool {
        pattern.len() < SIMPLE_PATTERN_THRESHOLD
            && !pattern.contains(|c: char| c.is_ascii_punctuation() && c != '_' && c != '-')
    }
}

impl Matcher for PatternMatcher {
    fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn matching_keywords<'a>(&'a self, text: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .zip(&self.strategies)
            .filter(|(_, strategy)| match strategy {
                MatchStrategy::Simple(regex) | MatchStrategy::Regex(regex) => {
                    regex.is_match(text)
                }
            })
            .map(|(keyword, _)| keyword.as_str())
            .collect()
    }
}
