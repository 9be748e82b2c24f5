//! Merging inherited rulesets with local overrides
//!
//! A setting present on only one side passes through. A setting present on
//! both sides must be deep-equal; otherwise the merge fails with a
//! [`MergeConflict`]. Neither side is ever silently preferred for the
//! compared settings.

use crate::error::{CmcError, CmcResult};
use crate::rules::equal::deep_equal;
use crate::rules::{
    EslintConfig, InheritedEslint, InheritedRuff, InheritedRules, InheritedTsc, MergeConflict,
    RuffConfig, RuffLint, RulesetsConfig, Tool, TscConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Merge every inherited tool with the local `[rulesets]` table
pub fn merge(
    inherited: &InheritedRules,
    local: Option<&RulesetsConfig>,
) -> CmcResult<RulesetsConfig> {
    let local_eslint = local.and_then(|l| l.eslint.as_ref());
    let local_ruff = local.and_then(|l| l.ruff.as_ref());
    let local_tsc = local.and_then(|l| l.tsc.as_ref());

    Ok(RulesetsConfig {
        eslint: match inherited.eslint {
            Some(ref base) => Some(merge_eslint(base, local_eslint)?),
            None => local_eslint.cloned(),
        },
        ruff: match inherited.ruff {
            Some(ref base) => Some(merge_ruff(base, local_ruff)?),
            None => local_ruff.cloned(),
        },
        tsc: match inherited.tsc {
            Some(ref base) => Some(merge_tsc(base, local_tsc)?),
            None => local_tsc.cloned(),
        },
    })
}

/// Union of rule names; shared rules must agree
pub fn merge_eslint(
    inherited: &InheritedEslint,
    local: Option<&EslintConfig>,
) -> CmcResult<EslintConfig> {
    let mut rules = inherited.rules.clone();

    if let Some(local) = local {
        for (rule, local_value) in &local.rules {
            match inherited.rules.get(rule) {
                Some(inherited_value) if !deep_equal(inherited_value, local_value) => {
                    return Err(conflict(
                        Tool::Eslint,
                        rule,
                        inherited_value.clone(),
                        local_value.clone(),
                        &inherited.source,
                    ));
                }
                Some(_) => {}
                None => {
                    rules.insert(rule.clone(), local_value.clone());
                }
            }
        }
    }

    Ok(EslintConfig { rules })
}

/// `line-length`, `lint.select` and `lint.ignore` are compared; other
/// options pass through, local entries replacing inherited ones
pub fn merge_ruff(inherited: &InheritedRuff, local: Option<&RuffConfig>) -> CmcResult<RuffConfig> {
    let Some(local) = local else {
        return Ok(inherited.config.clone());
    };
    let base = &inherited.config;
    let source = inherited.source.as_str();

    let line_length = merge_option(
        "line-length",
        source,
        base.line_length.as_ref(),
        local.line_length.as_ref(),
    )?;

    let lint = match (base.lint.as_ref(), local.lint.as_ref()) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(base_lint), Some(local_lint)) => Some(RuffLint {
            select: merge_option(
                "lint.select",
                source,
                base_lint.select.as_ref(),
                local_lint.select.as_ref(),
            )?,
            ignore: merge_option(
                "lint.ignore",
                source,
                base_lint.ignore.as_ref(),
                local_lint.ignore.as_ref(),
            )?,
            extra: pass_through(&base_lint.extra, &local_lint.extra),
        }),
    };

    Ok(RuffConfig {
        line_length,
        lint,
        extra: pass_through(&base.extra, &local.extra),
    })
}

/// Each boolean compiler option follows the shared-must-agree rule
pub fn merge_tsc(inherited: &InheritedTsc, local: Option<&TscConfig>) -> CmcResult<TscConfig> {
    let Some(local) = local else {
        return Ok(inherited.config.clone());
    };

    let mut options = inherited.config.options().clone();
    for (option, &mine) in local.options() {
        match options.get(option) {
            Some(&base) if base != mine => {
                return Err(conflict(
                    Tool::Tsc,
                    option,
                    Value::Bool(base),
                    Value::Bool(mine),
                    &inherited.source,
                ));
            }
            _ => {
                options.insert(option.clone(), mine);
            }
        }
    }

    // Every key is drawn from the allowed set, so this cannot fail
    TscConfig::try_from(options).map_err(CmcError::Internal)
}

fn merge_option<T: Serialize + Clone>(
    rule: &str,
    source: &str,
    inherited: Option<&T>,
    local: Option<&T>,
) -> CmcResult<Option<T>> {
    match (inherited, local) {
        (Some(base), Some(mine)) => {
            let base_value = serde_json::to_value(base)?;
            let local_value = serde_json::to_value(mine)?;
            if deep_equal(&base_value, &local_value) {
                Ok(Some(base.clone()))
            } else {
                Err(conflict(Tool::Ruff, rule, base_value, local_value, source))
            }
        }
        (Some(only), None) | (None, Some(only)) => Ok(Some(only.clone())),
        (None, None) => Ok(None),
    }
}

fn pass_through(
    inherited: &BTreeMap<String, Value>,
    local: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut merged = inherited.clone();
    merged.extend(local.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn conflict(tool: Tool, rule: &str, inherited: Value, local: Value, source: &str) -> CmcError {
    CmcError::MergeConflict(Box::new(MergeConflict {
        tool,
        rule: rule.to_string(),
        inherited_value: inherited,
        local_value: local,
        source: source.to_string(),
    }))
}
