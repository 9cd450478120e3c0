//! Label selectors for `-l/--selector`.
//!
//! Comma separated requirements, all of which must hold:
//! `app=web`, `app==web`, `tier!=cache`, `canary` (key present), `!canary`
//! (key absent). An empty selector matches everything.

use anyhow::bail;
use regex::Regex;
use std::collections::BTreeMap;

/// Optional `prefix/` (DNS subdomain) followed by a name segment.
const KEY_RE: &str = r"^([a-z0-9]([-a-z0-9.]*[a-z0-9])?/)?[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$";
const VALUE_RE: &str = r"^([A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?)?$";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    Exists(String),
    NotExists(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals(k, v) => labels.get(k) == Some(v),
            Self::NotEquals(k, v) => labels.get(k) != Some(v),
            Self::Exists(k) => labels.contains_key(k),
            Self::NotExists(k) => !labels.contains_key(k),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn parse(arg: &str) -> anyhow::Result<Self> {
        let key_re = Regex::new(KEY_RE)?;
        let value_re = Regex::new(VALUE_RE)?;
        let check = |key: &str, value: Option<&str>| -> anyhow::Result<()> {
            if !key_re.is_match(key) {
                bail!("invalid label key {:?} in selector {:?}", key, arg);
            }
            if let Some(value) = value {
                if !value_re.is_match(value) {
                    bail!("invalid label value {:?} in selector {:?}", value, arg);
                }
            }
            Ok(())
        };

        let mut requirements = Vec::new();
        for term in arg.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let requirement = if let Some(key) = term.strip_prefix('!') {
                let key = key.trim();
                check(key, None)?;
                Requirement::NotExists(key.to_string())
            } else if let Some((key, value)) = term.split_once("!=") {
                let (key, value) = (key.trim(), value.trim());
                check(key, Some(value))?;
                Requirement::NotEquals(key.to_string(), value.to_string())
            } else if let Some((key, value)) =
                term.split_once("==").or_else(|| term.split_once('='))
            {
                let (key, value) = (key.trim(), value.trim());
                check(key, Some(value))?;
                Requirement::Equals(key.to_string(), value.to_string())
            } else {
                check(term, None)?;
                Requirement::Exists(term.to_string())
            };
            requirements.push(requirement);
        }
        Ok(Self { requirements })
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }
}
