//! Function properties: which function to run and how to enrich its input
//!
//! Configuration shape (TOML):
//!
//! ```toml
//! [function]
//! definition = "echo|foo"
//!
//! # unindexed rules land in stage "0"
//! [function.configuration.echofoo.input-header-mapping-expression]
//! key1 = "'hello1'"
//!
//! # or, indexed
//! [function.configuration.split.input-header-mapping-expression.0]
//! key1 = "headers.path.split('/')[0]"
//! ```
//!
//! Configuration keys are definitions with their composition separators
//! removed, so `echo|foo` is configured under `echofoo`. Keys compare
//! case-insensitively: layered configuration sources lowercase table keys, so
//! `toUpper` may arrive as `toupper`.

use crate::enricher::{HeaderMappingRules, DEFAULT_STAGE};
use crate::registry::SEPARATORS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Properties of the function being served
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionProperties {
    /// Function definition to look up (a name or an `a|b` pipeline)
    #[serde(default)]
    pub definition: String,

    /// Per-function configuration, keyed by configuration key
    #[serde(default)]
    pub configuration: BTreeMap<String, FunctionConfiguration>,
}

/// Configuration for one function
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FunctionConfiguration {
    /// Header name → expression, optionally grouped under a stage index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_header_mapping_expression: Option<HeaderMappingExpression>,
}

/// Header mapping expressions as written in configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderMappingExpression {
    /// `field = "expr"`, implicitly stage "0"
    Flat(BTreeMap<String, String>),
    /// `index.field = "expr"`
    Indexed(BTreeMap<String, BTreeMap<String, String>>),
}

impl HeaderMappingExpression {
    /// Convert to rules, placing unindexed entries in the default stage
    pub fn to_rules(&self) -> HeaderMappingRules {
        match self {
            HeaderMappingExpression::Flat(fields) => fields
                .iter()
                .fold(HeaderMappingRules::new(), |rules, (field, expr)| {
                    rules.with_indexed_rule(DEFAULT_STAGE, field, expr)
                }),
            HeaderMappingExpression::Indexed(stages) => {
                stages
                    .iter()
                    .fold(HeaderMappingRules::new(), |rules, (index, fields)| {
                        fields.iter().fold(rules, |rules, (field, expr)| {
                            rules.with_indexed_rule(index, field, expr)
                        })
                    })
            }
        }
    }
}

impl FunctionProperties {
    /// Properties selecting `definition`
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
            configuration: BTreeMap::new(),
        }
    }

    /// Configuration key for a definition: the definition without separators,
    /// lowercased
    pub fn configuration_key(definition: &str) -> String {
        definition
            .chars()
            .filter(|c| !SEPARATORS.contains(c) && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Configuration for `definition`, matching keys case-insensitively
    pub fn configuration_for(&self, definition: &str) -> Option<&FunctionConfiguration> {
        let key = Self::configuration_key(definition);
        self.configuration
            .iter()
            .find(|(candidate, _)| Self::configuration_key(candidate) == key)
            .map(|(_, config)| config)
    }

    /// Set the configuration stored under `key`, replacing any entry whose key
    /// differs only in case
    pub fn set_configuration(&mut self, key: impl Into<String>, config: FunctionConfiguration) {
        let key = key.into();
        let normalized = Self::configuration_key(&key);
        self.configuration
            .retain(|candidate, _| Self::configuration_key(candidate) != normalized);
        self.configuration.insert(key, config);
    }

    /// Add an unindexed header mapping rule for `definition`
    pub fn with_header_mapping(
        mut self,
        definition: &str,
        field: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        let key = Self::configuration_key(definition);
        let key = self
            .configuration
            .keys()
            .find(|candidate| Self::configuration_key(candidate) == key)
            .cloned()
            .unwrap_or(key);
        let config = self.configuration.entry(key).or_default();
        let mapping = config
            .input_header_mapping_expression
            .get_or_insert_with(|| HeaderMappingExpression::Flat(BTreeMap::new()));

        match mapping {
            HeaderMappingExpression::Flat(fields) => {
                fields.insert(field.into(), expression.into());
            }
            HeaderMappingExpression::Indexed(stages) => {
                stages
                    .entry(DEFAULT_STAGE.to_string())
                    .or_default()
                    .insert(field.into(), expression.into());
            }
        }
        self
    }

    /// Header mapping rules configured for `definition`, if any
    pub fn header_mapping_rules(&self, definition: &str) -> Option<HeaderMappingRules> {
        self.configuration_for(definition)
            .and_then(|config| config.input_header_mapping_expression.as_ref())
            .map(HeaderMappingExpression::to_rules)
    }
}
