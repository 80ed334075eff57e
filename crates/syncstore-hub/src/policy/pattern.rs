//! Origin pattern compilation and matching.
//!
//! Every pattern matches the whole origin string. Regex sources are wrapped in
//! `^(?:...)$`, globs are translated into anchored regexes, so a rule written
//! for `https://example.com` can never match `https://evil-example.com`.

use regex::Regex;

use syncstore_core::error::{Result, SyncStoreError};

use crate::config::schema::{OriginPatternSpec, TaggedPattern};

/// Compiled origin matcher.
#[derive(Debug, Clone)]
pub enum OriginPattern {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

impl OriginPattern {
    pub fn exact(origin: impl Into<String>) -> Self {
        OriginPattern::Exact(origin.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        OriginPattern::Prefix(prefix.into())
    }

    /// `*` matches any run of characters; everything else is literal.
    pub fn glob(src: &str) -> Result<Self> {
        if !src.contains('*') {
            return Ok(OriginPattern::exact(src));
        }
        let body = src
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Self::anchored(&body, src)
    }

    pub fn regex(src: &str) -> Result<Self> {
        Self::anchored(src, src)
    }

    fn anchored(body: &str, src: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{body})$"))
            .map(OriginPattern::Regex)
            .map_err(|e| SyncStoreError::BadRequest(format!("invalid origin pattern {src:?}: {e}")))
    }

    pub fn compile(spec: &OriginPatternSpec) -> Result<Self> {
        match spec {
            OriginPatternSpec::Glob(s) | OriginPatternSpec::Tagged(TaggedPattern::Glob(s)) => {
                Self::glob(s)
            }
            OriginPatternSpec::Tagged(TaggedPattern::Exact(s)) => Ok(Self::exact(s.as_str())),
            OriginPatternSpec::Tagged(TaggedPattern::Prefix(s)) => Ok(Self::prefix(s.as_str())),
            OriginPatternSpec::Tagged(TaggedPattern::Regex(s)) => Self::regex(s),
        }
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginPattern::Exact(o) => o == origin,
            OriginPattern::Prefix(p) => origin.starts_with(p.as_str()),
            OriginPattern::Regex(r) => r.is_match(origin),
        }
    }
}
