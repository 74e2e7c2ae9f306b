//! Maps placeholder condition references to stored conditions.
//!
//! The detection model invents ids for `update` actions. Resolution tries,
//! in order: the reference as a real UUID of one of the user's conditions,
//! then the action's condition name (trimmed, case-insensitive), preferring
//! an active condition over a resolved one. Anything else is not found.

use uuid::Uuid;

use medconsult_types::condition::Condition;
use medconsult_types::error::ConsultError;
use medconsult_types::memory::{ConditionAction, ConditionRef};

/// Resolver over a snapshot of one user's conditions.
pub struct ConditionResolver {
    known: Vec<Condition>,
}

impl ConditionResolver {
    pub fn new(known: Vec<Condition>) -> Self {
        Self { known }
    }

    /// Find the stored condition an `update` action refers to.
    pub fn resolve(&self, action: &ConditionAction) -> Result<&Condition, ConsultError> {
        if let Some(ConditionRef::Text(text)) = &action.condition_id {
            if let Ok(id) = Uuid::parse_str(text.trim()) {
                if let Some(found) = self.known.iter().find(|c| c.id == id) {
                    return Ok(found);
                }
            }
        }

        let wanted = normalize(&action.condition_name);
        if !wanted.is_empty() {
            let named: Vec<&Condition> = self
                .known
                .iter()
                .filter(|c| normalize(&c.condition_name) == wanted)
                .collect();
            if let Some(found) = named.iter().find(|c| c.is_active).or(named.first()) {
                return Ok(*found);
            }
        }

        let reference = action
            .condition_id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| action.condition_name.clone());
        Err(ConsultError::not_found("condition", reference))
    }

    /// Record a condition created or changed during the current batch.
    pub fn remember(&mut self, condition: Condition) {
        match self.known.iter_mut().find(|c| c.id == condition.id) {
            Some(slot) => *slot = condition,
            None => self.known.push(condition),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use medconsult_types::memory::ConditionMode;

    fn update(name: &str, id: Option<ConditionRef>) -> ConditionAction {
        ConditionAction {
            mode: ConditionMode::Update,
            condition_name: name.to_string(),
            condition_type: None,
            condition_id: id,
            icd_code_estimate: None,
            is_active: false,
            notes: "resolved".to_string(),
            certainty_level: 0.9,
        }
    }

    #[test]
    fn test_real_uuid_resolves_directly() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        let target = store.seed_condition(user.id, "Migraine", true, None);
        let resolver = ConditionResolver::new(store.conditions_of(user.id));

        let action = update("something else", Some(ConditionRef::Text(target.id.to_string())));
        assert_eq!(resolver.resolve(&action).unwrap().id, target.id);
    }

    #[test]
    fn test_placeholder_falls_back_to_name_preferring_active() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        store.seed_condition(user.id, "Hypertension", false, None);
        let active = store.seed_condition(user.id, "Hypertension", true, None);
        let resolver = ConditionResolver::new(store.conditions_of(user.id));

        let action = update("  hypertension ", Some(ConditionRef::Number(101)));
        assert_eq!(resolver.resolve(&action).unwrap().id, active.id);
    }

    #[test]
    fn test_inactive_match_used_when_no_active() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        let old = store.seed_condition(user.id, "Gout", false, None);
        let resolver = ConditionResolver::new(store.conditions_of(user.id));
        assert_eq!(resolver.resolve(&update("GOUT", Some(ConditionRef::Number(7)))).unwrap().id, old.id);
    }

    #[test]
    fn test_unknown_reference_is_not_found() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        store.seed_condition(user.id, "Asthma", true, None);
        let resolver = ConditionResolver::new(store.conditions_of(user.id));

        let err = resolver
            .resolve(&update("Psoriasis", Some(ConditionRef::Number(999))))
            .unwrap_err();
        match err {
            ConsultError::RecordNotFound { kind, id } => {
                assert_eq!(kind, "condition");
                assert_eq!(id, "999");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_remember_makes_new_conditions_resolvable() {
        let store = MemoryStore::new();
        let user = store.seed_user();
        let mut resolver = ConditionResolver::new(Vec::new());
        let added = store.seed_condition(user.id, "Tinnitus", true, None);
        resolver.remember(added.clone());
        assert_eq!(resolver.resolve(&update("tinnitus", Some(ConditionRef::Number(1)))).unwrap().id, added.id);
    }
}
