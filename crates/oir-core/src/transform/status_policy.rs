//! What happens to a `default` response.
//!
//! A pure table over (behavior, whether a main 2xx response was found).

use indexmap::IndexMap;

use crate::config::DefaultStatusBehavior;
use crate::ir::{IrResponse, StatusKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultOutcome {
    Ignore,
    PromoteToMain,
    AddAsError,
}

pub fn default_outcome(behavior: DefaultStatusBehavior, has_main: bool) -> DefaultOutcome {
    match (behavior, has_main) {
        (DefaultStatusBehavior::SpecCompliant, _) => DefaultOutcome::Ignore,
        (DefaultStatusBehavior::AutoCorrect, false) => DefaultOutcome::PromoteToMain,
        (DefaultStatusBehavior::AutoCorrect, true) => DefaultOutcome::AddAsError,
    }
}

/// The main response: the lowest 2xx code with a schema, else a `2XX` range
/// with a schema.
pub fn main_status(all: &IndexMap<StatusKey, IrResponse>) -> Option<StatusKey> {
    let mut codes: Vec<StatusKey> = all
        .iter()
        .filter(|(key, response)| key.is_success() && response.schema.is_some())
        .map(|(key, _)| *key)
        .collect();
    codes.sort();
    codes.first().copied()
}

/// Error entries: 4xx/5xx codes and ranges with a schema, ascending.
pub fn error_statuses(all: &IndexMap<StatusKey, IrResponse>) -> IndexMap<String, StatusKey> {
    let mut keys: Vec<StatusKey> = all
        .iter()
        .filter(|(key, response)| key.is_error() && response.schema.is_some())
        .map(|(key, _)| *key)
        .collect();
    keys.sort();
    keys.into_iter().map(|key| (key.to_string(), key)).collect()
}

/// Categorize responses, applying the `default` policy.
pub fn categorize(
    all: &IndexMap<StatusKey, IrResponse>,
    behavior: DefaultStatusBehavior,
) -> (Option<StatusKey>, IndexMap<String, StatusKey>) {
    let mut main = main_status(all);
    let mut errors = error_statuses(all);

    let default_has_schema = all
        .get(&StatusKey::Default)
        .is_some_and(|response| response.schema.is_some());
    if default_has_schema {
        match default_outcome(behavior, main.is_some()) {
            DefaultOutcome::Ignore => {}
            DefaultOutcome::PromoteToMain => main = Some(StatusKey::Default),
            DefaultOutcome::AddAsError => {
                errors.insert(StatusKey::Default.to_string(), StatusKey::Default);
            }
        }
    }
    (main, errors)
}
