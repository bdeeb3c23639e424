//! Subjects and the agents their feed URLs are resolved against.

use regex::Regex;
use std::collections::HashMap;
use url::form_urlencoded;

use crate::config::{AgentConfig, SubjectConfig};
use crate::error::{Error, Result};

/// A subject resolved against its agent: a concrete feed URL plus an optional
/// title predicate. Immutable once resolved; the scanner re-resolves per tick.
#[derive(Debug, Clone)]
pub struct Subject {
  pub name: String,
  pub url: String,
  pattern: Option<Regex>,
}

impl Subject {
  /// Build a subject directly. Used by tests and ad-hoc callers; config-driven
  /// resolution goes through [`resolve_subjects`].
  pub fn new(name: impl Into<String>, url: impl Into<String>, pattern: Option<Regex>) -> Self {
    Self {
      name: name.into(),
      url: url.into(),
      pattern,
    }
  }

  /// A subject without a pattern accepts every title
  pub fn matches(&self, title: &str) -> bool {
    match &self.pattern {
      Some(re) => re.is_match(title),
      None => true,
    }
  }
}

fn query_escape(raw: &str) -> String {
  form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Resolve configured subjects against their agents.
///
/// The agent's `query_format` template has `{base}` replaced with the agent's
/// base URL and `{query}` with the query-escaped search term.
pub fn resolve_subjects(subjects: &[SubjectConfig], agents: &[AgentConfig]) -> Result<Vec<Subject>> {
  let by_name: HashMap<&str, &AgentConfig> = agents.iter().map(|a| (a.name.as_str(), a)).collect();

  let mut resolved = Vec::with_capacity(subjects.len());
  for subject in subjects {
    let agent = by_name
      .get(subject.agent.as_str())
      .ok_or_else(|| Error::UnknownAgent(subject.agent.clone()))?;

    let pattern = subject.pattern.as_deref().map(Regex::new).transpose()?;

    let url = agent
      .query_format
      .replace("{base}", &agent.base_url)
      .replace("{query}", &query_escape(&subject.search));

    resolved.push(Subject {
      name: subject.name.clone(),
      url,
      pattern,
    });
  }

  Ok(resolved)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn agent() -> AgentConfig {
    AgentConfig {
      name: "nyaa".to_string(),
      base_url: "https://nyaa.example".to_string(),
      query_format: "{base}/?page=rss&q={query}".to_string(),
    }
  }

  fn subject(pattern: Option<&str>) -> SubjectConfig {
    SubjectConfig {
      name: "golumpa".to_string(),
      agent: "nyaa".to_string(),
      search: "golumpa dub".to_string(),
      pattern: pattern.map(String::from),
    }
  }

  #[test]
  fn test_resolves_url_with_escaped_query() {
    let resolved = resolve_subjects(&[subject(None)], &[agent()]).unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].url, "https://nyaa.example/?page=rss&q=golumpa+dub");
  }

  #[test]
  fn test_unknown_agent_is_error() {
    let mut cfg = subject(None);
    cfg.agent = "missing".to_string();
    let err = resolve_subjects(&[cfg], &[agent()]).unwrap_err();
    assert!(matches!(err, Error::UnknownAgent(name) if name == "missing"));
  }

  #[test]
  fn test_invalid_pattern_is_error() {
    let err = resolve_subjects(&[subject(Some("["))], &[agent()]).unwrap_err();
    assert!(matches!(err, Error::Pattern(_)));
  }

  #[test]
  fn test_no_pattern_matches_everything() {
    let resolved = resolve_subjects(&[subject(None)], &[agent()]).unwrap();
    assert!(resolved[0].matches("Anything At All"));
  }

  #[test]
  fn test_pattern_filters_titles() {
    let resolved = resolve_subjects(&[subject(Some("(?i)golumpa dub"))], &[agent()]).unwrap();
    assert!(resolved[0].matches("Golumpa Dub 1080p"));
    assert!(!resolved[0].matches("Unrelated Show"));
  }
}
