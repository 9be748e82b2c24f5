//! Linter rulesets
//!
//! A ruleset file, and the `[rulesets]` table of a project's `cmc.toml`,
//! holds optional configuration per linter tool:
//!
//! ```toml
//! [rulesets.eslint.rules]
//! no-var = "error"
//!
//! [rulesets.ruff]
//! line-length = 100
//!
//! [rulesets.ruff.lint]
//! select = ["E", "F"]
//!
//! [rulesets.tsc]
//! strict = true
//! ```

pub mod equal;
pub mod merge;

pub use equal::deep_equal;
pub use merge::{merge, merge_eslint, merge_ruff, merge_tsc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Boolean compiler options checked by the tsc integration
pub const TSC_BOOLEAN_OPTIONS: &[&str] = &[
    "strict",
    "noImplicitAny",
    "strictNullChecks",
    "strictFunctionTypes",
    "strictBindCallApply",
    "strictPropertyInitialization",
    "noImplicitThis",
    "useUnknownInCatchVariables",
    "alwaysStrict",
    "noUnusedLocals",
    "noUnusedParameters",
    "exactOptionalPropertyTypes",
    "noImplicitReturns",
    "noFallthroughCasesInSwitch",
    "noUncheckedIndexedAccess",
    "noImplicitOverride",
    "noPropertyAccessFromIndexSignature",
    "allowUnusedLabels",
    "allowUnreachableCode",
];

/// Supported linter tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Eslint,
    Ruff,
    Tsc,
}

impl Tool {
    pub fn all() -> &'static [Self] {
        &[Self::Eslint, Self::Ruff, Self::Tsc]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eslint => "eslint",
            Self::Ruff => "ruff",
            Self::Tsc => "tsc",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tool '{}' (expected eslint, ruff or tsc)", s))
    }
}

/// ESLint configuration: rule name to rule setting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EslintConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, Value>,
}

/// Ruff configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuffConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<RuffLint>,

    /// Options cmc does not compare
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `[ruff.lint]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuffLint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// tsc boolean compiler options, restricted to [`TSC_BOOLEAN_OPTIONS`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, bool>",
    into = "BTreeMap<String, bool>"
)]
pub struct TscConfig {
    options: BTreeMap<String, bool>,
}

impl TscConfig {
    pub fn options(&self) -> &BTreeMap<String, bool> {
        &self.options
    }

    pub fn get(&self, option: &str) -> Option<bool> {
        self.options.get(option).copied()
    }
}

impl TryFrom<BTreeMap<String, bool>> for TscConfig {
    type Error = String;

    fn try_from(options: BTreeMap<String, bool>) -> Result<Self, Self::Error> {
        if let Some(unknown) = options
            .keys()
            .find(|k| !TSC_BOOLEAN_OPTIONS.contains(&k.as_str()))
        {
            return Err(format!("unsupported tsc option '{}'", unknown));
        }
        Ok(Self { options })
    }
}

impl From<TscConfig> for BTreeMap<String, bool> {
    fn from(config: TscConfig) -> Self {
        config.options
    }
}

/// Per-tool configuration, as found under `[rulesets]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesetsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eslint: Option<EslintConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruff: Option<RuffConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tsc: Option<TscConfig>,
}

impl RulesetsConfig {
    /// The configuration for one tool, if present
    pub fn payload(&self, tool: Tool) -> Option<RulesetPayload> {
        match tool {
            Tool::Eslint => self.eslint.clone().map(RulesetPayload::Eslint),
            Tool::Ruff => self.ruff.clone().map(RulesetPayload::Ruff),
            Tool::Tsc => self.tsc.clone().map(RulesetPayload::Tsc),
        }
    }

    /// Tools with configuration present
    pub fn tools(&self) -> Vec<Tool> {
        Tool::all()
            .iter()
            .copied()
            .filter(|t| match t {
                Tool::Eslint => self.eslint.is_some(),
                Tool::Ruff => self.ruff.is_some(),
                Tool::Tsc => self.tsc.is_some(),
            })
            .collect()
    }
}

/// Tool configuration tagged by tool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "tool", content = "config", rename_all = "lowercase")]
pub enum RulesetPayload {
    Eslint(EslintConfig),
    Ruff(RuffConfig),
    Tsc(TscConfig),
}

impl RulesetPayload {
    pub fn tool(&self) -> Tool {
        match self {
            Self::Eslint(_) => Tool::Eslint,
            Self::Ruff(_) => Tool::Ruff,
            Self::Tsc(_) => Tool::Tsc,
        }
    }
}

/// A ruleset fetched from a remote reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRuleset {
    /// The reference string the ruleset was resolved from
    pub source: String,
    pub payload: RulesetPayload,
}

impl ResolvedRuleset {
    pub fn tool(&self) -> Tool {
        self.payload.tool()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedEslint {
    pub source: String,
    pub rules: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedRuff {
    pub source: String,
    pub config: RuffConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritedTsc {
    pub source: String,
    pub config: TscConfig,
}

/// Remote baseline per tool, before local overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InheritedRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eslint: Option<InheritedEslint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruff: Option<InheritedRuff>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsc: Option<InheritedTsc>,
}

impl InheritedRules {
    /// Record a resolved ruleset as the baseline for its tool
    pub fn insert(&mut self, resolved: ResolvedRuleset) {
        let source = resolved.source;
        match resolved.payload {
            RulesetPayload::Eslint(config) => {
                self.eslint = Some(InheritedEslint {
                    source,
                    rules: config.rules,
                })
            }
            RulesetPayload::Ruff(config) => self.ruff = Some(InheritedRuff { source, config }),
            RulesetPayload::Tsc(config) => self.tsc = Some(InheritedTsc { source, config }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.eslint.is_none() && self.ruff.is_none() && self.tsc.is_none()
    }
}

/// Local and inherited configuration disagree on a shared setting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeConflict {
    pub tool: Tool,
    pub rule: String,
    pub inherited_value: Value,
    pub local_value: Value,
    /// Reference the inherited value came from
    pub source: String,
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Conflicting {} setting '{}': {} sets {}, local config sets {}",
            self.tool, self.rule, self.source, self.inherited_value, self.local_value
        )
    }
}
