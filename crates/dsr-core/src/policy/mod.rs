//! Políticas: reglas de acceso/borrado por categoría de datos y webhooks
//! previos a la ejecución.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use dsr_masking::{MaskingError, MaskingStrategy, MaskingStrategyRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;
use crate::graph::Field;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Access,
    Erasure,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
                        Self::Access => "access",
                        Self::Erasure => "erasure",
                    })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTarget {
    pub key: String,
    pub data_category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingStrategySpec {
    pub strategy: String,
    #[serde(default)]
    pub configuration: Value,
}

impl MaskingStrategySpec {
    pub fn new(strategy: impl Into<String>, configuration: Value) -> Self {
        Self { strategy: strategy.into(),
               configuration }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub key: String,
    pub name: String,
    pub action_type: ActionType,
    #[serde(default)]
    pub targets: Vec<RuleTarget>,
    #[serde(default)]
    pub masking_strategy: Option<MaskingStrategySpec>,
}

impl Rule {
    pub fn access(key: impl Into<String>, categories: &[&str]) -> Self {
        Self::with_targets(key.into(), ActionType::Access, categories, None)
    }

    pub fn erasure(key: impl Into<String>, categories: &[&str], strategy: MaskingStrategySpec) -> Self {
        Self::with_targets(key.into(), ActionType::Erasure, categories, Some(strategy))
    }

    fn with_targets(key: String, action_type: ActionType, categories: &[&str], masking_strategy: Option<MaskingStrategySpec>) -> Self {
        let targets = categories.iter()
                                .enumerate()
                                .map(|(i, c)| RuleTarget { key: format!("{key}_target_{i}"),
                                                           data_category: c.to_string() })
                                .collect();
        Self { name: key.clone(),
               key,
               action_type,
               targets,
               masking_strategy }
    }

    /// Algún target cubre la categoría `category`.
    pub fn matches_category(&self, category: &str) -> bool {
        self.targets.iter().any(|t| category_matches(&t.data_category, category))
    }

    /// Algún target cubre alguna categoría del campo.
    pub fn applies_to(&self, field: &Field) -> bool {
        field.data_categories.iter().any(|c| self.matches_category(c))
    }
}

/// `target` cubre `category` si son iguales o `category` cuelga de `target`
/// (`user.contact` cubre `user.contact.email`).
pub fn category_matches(target: &str, category: &str) -> bool {
    category == target || category.strip_prefix(target).is_some_and(|rest| rest.starts_with('.'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPreWebhook {
    pub key: String,
    pub name: String,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub pre_webhooks: Vec<PolicyPreWebhook>,
}

impl Policy {
    pub fn new(key: impl Into<String>, rules: Vec<Rule>) -> Self {
        let key = key.into();
        Self { name: key.clone(),
               key,
               rules,
               pre_webhooks: vec![] }
    }

    pub fn with_pre_webhook(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        let order = self.pre_webhooks.len() as u32;
        self.pre_webhooks.push(PolicyPreWebhook { name: key.clone(),
                                                  key,
                                                  order });
        self
    }

    pub fn rules_for(&self, action: ActionType) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.action_type == action)
    }

    pub fn has_action(&self, action: ActionType) -> bool {
        self.rules_for(action).next().is_some()
    }

    /// Webhooks ordenados por `order`.
    pub fn ordered_pre_webhooks(&self) -> Vec<&PolicyPreWebhook> {
        let mut hooks: Vec<&PolicyPreWebhook> = self.pre_webhooks.iter().collect();
        hooks.sort_by_key(|w| w.order);
        hooks
    }

    /// Valida la política contra el registro de estrategias:
    /// - toda regla de borrado declara una estrategia conocida y configurable;
    /// - ningún par de targets de borrado se solapa en categoría.
    pub fn validate(&self, registry: &MaskingStrategyRegistry) -> Result<(), ValidationError> {
        for rule in self.rules_for(ActionType::Erasure) {
            let spec = rule.masking_strategy
                           .as_ref()
                           .ok_or_else(|| ValidationError::MissingMaskingStrategy(rule.key.clone()))?;
            match registry.get_strategy(&spec.strategy, &spec.configuration) {
                Ok(_) => {}
                Err(MaskingError::UnknownStrategy(strategy)) => {
                    return Err(ValidationError::UnknownMaskingStrategy { rule: rule.key.clone(),
                                                                         strategy })
                }
                Err(e) => {
                    return Err(ValidationError::InvalidMaskingConfiguration { rule: rule.key.clone(),
                                                                              reason: e.to_string() })
                }
            }
        }

        let categories: Vec<&str> = self.rules_for(ActionType::Erasure)
                                        .flat_map(|r| r.targets.iter().map(|t| t.data_category.as_str()))
                                        .collect();
        for (i, first) in categories.iter().enumerate() {
            for second in &categories[i + 1..] {
                if category_matches(first, second) || category_matches(second, first) {
                    return Err(ValidationError::ActionConflict { first: first.to_string(),
                                                                 second: second.to_string() });
                }
            }
        }
        Ok(())
    }

    /// Instancias de las estrategias de borrado, una por nombre distinto.
    pub fn masking_strategies(&self, registry: &MaskingStrategyRegistry) -> Result<Vec<Arc<dyn MaskingStrategy>>, MaskingError> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for rule in self.rules_for(ActionType::Erasure) {
            if let Some(spec) = &rule.masking_strategy {
                if seen.insert(spec.strategy.clone()) {
                    out.push(registry.get_strategy(&spec.strategy, &spec.configuration)?);
                }
            }
        }
        Ok(out)
    }
}
