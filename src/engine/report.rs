//! Run reports and freshness plans

use crate::cache::record::Scope;
use crate::core::hash::Digest;
use crate::core::model::{ItemError, ResultItem, ResultSet, Status};
use crate::error::DocError;

/// Key reported for the codebase entity
pub const CODEBASE_KEY: &str = "(codebase)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Cached summary reused, no backend call
    Reused,
    /// Summary regenerated and stored
    Generated,
}

/// A successfully summarized entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub scope: Scope,
    pub key: String,
    pub digest: Digest,
    pub action: Action,
    pub summary: String,
}

/// An entity that could not be summarized
#[derive(Debug)]
pub struct EntityFailure {
    pub scope: Scope,
    pub key: String,
    pub error: DocError,
}

/// Everything one run did, in bottom-up order
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<EntityOutcome>,
    pub failures: Vec<EntityFailure>,
    /// Backend calls made during the run
    pub calls: usize,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_keys(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.key.clone()).collect()
    }

    pub fn codebase_summary(&self) -> Option<&str> {
        self.outcomes
            .iter()
            .find(|o| o.scope == Scope::Codebase)
            .map(|o| o.summary.as_str())
    }

    pub fn count(&self, action: Action) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }

    pub fn outcome(&self, scope: Scope, key: &str) -> Option<&EntityOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.scope == scope && (scope == Scope::Codebase || o.key == key))
    }

    pub fn to_result_set(&self) -> ResultSet {
        let mut set = ResultSet::new();
        for outcome in &self.outcomes {
            let status = match outcome.action {
                Action::Reused => Status::Reused,
                Action::Generated => Status::Generated,
            };
            set.push(
                entity_item(outcome.scope, &outcome.key)
                    .with_status(status)
                    .with_digest(outcome.digest.as_str())
                    .with_excerpt(outcome.summary.clone()),
            );
        }
        for failure in &self.failures {
            set.push(
                entity_item(failure.scope, &failure.key)
                    .with_status(Status::Failed)
                    .with_error(ItemError::from(&failure.error)),
            );
        }
        set.sort();
        set
    }
}

/// Freshness of one entity without regenerating anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStatus {
    pub scope: Scope,
    pub key: String,
    /// `None` when the digest could not be computed
    pub digest: Option<Digest>,
    pub fresh: bool,
    pub error: Option<String>,
}

impl EntityStatus {
    pub fn to_result_item(&self) -> ResultItem {
        let mut item = entity_item(self.scope, &self.key).with_status(if self.fresh {
            Status::Fresh
        } else if self.error.is_some() {
            Status::Failed
        } else {
            Status::Stale
        });
        if let Some(digest) = &self.digest {
            item = item.with_digest(digest.as_str());
        }
        if let Some(error) = &self.error {
            item = item.with_error(ItemError::new("IO", error.clone()));
        }
        item
    }
}

pub fn plan_result_set(statuses: &[EntityStatus]) -> ResultSet {
    let mut set: ResultSet = statuses.iter().map(EntityStatus::to_result_item).collect();
    set.sort();
    set
}

fn entity_item(scope: Scope, key: &str) -> ResultItem {
    match scope {
        Scope::File => ResultItem::file(key),
        Scope::Directory => ResultItem::directory(key),
        Scope::Codebase => ResultItem::codebase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::digest;
    use crate::core::model::Kind;

    fn outcome(scope: Scope, key: &str, action: Action) -> EntityOutcome {
        EntityOutcome {
            scope,
            key: key.to_string(),
            digest: digest(key.as_bytes()),
            action,
            summary: format!("summary of {}", key),
        }
    }

    #[test]
    fn test_report_counts_and_lookup() {
        let report = RunReport {
            outcomes: vec![
                outcome(Scope::File, "a.py", Action::Reused),
                outcome(Scope::File, "b.py", Action::Generated),
                outcome(Scope::Directory, ".", Action::Generated),
                outcome(Scope::Codebase, CODEBASE_KEY, Action::Generated),
            ],
            failures: Vec::new(),
            calls: 3,
        };
        assert!(report.is_complete());
        assert_eq!(report.count(Action::Generated), 3);
        assert_eq!(report.count(Action::Reused), 1);
        assert_eq!(report.codebase_summary(), Some("summary of (codebase)"));
        assert_eq!(
            report.outcome(Scope::File, "a.py").unwrap().action,
            Action::Reused
        );
    }

    #[test]
    fn test_report_result_set() {
        let report = RunReport {
            outcomes: vec![outcome(Scope::File, "a.py", Action::Generated)],
            failures: vec![EntityFailure {
                scope: Scope::Directory,
                key: ".".to_string(),
                error: DocError::ChildrenFailed {
                    entity: ".".to_string(),
                    failed: 1,
                },
            }],
            calls: 1,
        };
        assert!(!report.is_complete());
        assert_eq!(report.failed_keys(), vec![".".to_string()]);

        let set = report.to_result_set();
        assert_eq!(set.items[0].kind, Kind::File);
        assert_eq!(set.items[1].status, Some(Status::Failed));
        assert_eq!(set.items[1].errors[0].code, "CHILDREN_FAILED");
    }

    #[test]
    fn test_entity_status_item() {
        let status = EntityStatus {
            scope: Scope::File,
            key: "a.py".to_string(),
            digest: None,
            fresh: false,
            error: Some("permission denied".to_string()),
        };
        let item = status.to_result_item();
        assert_eq!(item.status, Some(Status::Failed));
        assert_eq!(item.errors[0].message, "permission denied");
    }
}
