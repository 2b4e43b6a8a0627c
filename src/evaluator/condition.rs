//! Condition evaluation against accumulated run state.

use serde_json::{Map, Value};

use crate::definition::schema::{ComparisonOperator, ConditionBranch, ConditionSpec};

use super::{operators, type_coercion};

/// Evaluate the branches of a conditional edge in declaration order and
/// return the target of the first matching condition, or `None` when no
/// branch matches (the caller takes the mandatory else target).
pub fn select_branch<'a>(
    branches: &'a [ConditionBranch],
    state: &Map<String, Value>,
) -> Option<&'a str> {
    branches
        .iter()
        .find(|b| evaluate_condition(&b.condition, state))
        .map(|b| b.target.as_str())
}

/// Evaluate a single condition. A missing variable evaluates as Null, so
/// `is_empty` can route around absent state keys.
pub fn evaluate_condition(cond: &ConditionSpec, state: &Map<String, Value>) -> bool {
    let actual = state.get(&cond.variable).unwrap_or(&Value::Null);
    let expected = &cond.value;

    match cond.operator {
        ComparisonOperator::Eq => operators::equal(actual, expected),
        ComparisonOperator::Ne => !operators::equal(actual, expected),
        ComparisonOperator::Gt => type_coercion::compare_numeric(actual, expected, |a, b| a > b),
        ComparisonOperator::Ge => type_coercion::compare_numeric(actual, expected, |a, b| a >= b),
        ComparisonOperator::Lt => type_coercion::compare_numeric(actual, expected, |a, b| a < b),
        ComparisonOperator::Le => type_coercion::compare_numeric(actual, expected, |a, b| a <= b),
        ComparisonOperator::Contains => operators::contains(actual, expected),
        ComparisonOperator::StartsWith => operators::starts_with(actual, expected),
        ComparisonOperator::EndsWith => operators::ends_with(actual, expected),
        ComparisonOperator::IsEmpty => operators::is_empty(actual),
        ComparisonOperator::IsNotEmpty => !operators::is_empty(actual),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn cond(variable: &str, operator: ComparisonOperator, value: Value) -> ConditionSpec {
        ConditionSpec {
            variable: variable.to_string(),
            operator,
            value,
        }
    }

    #[test]
    fn test_numeric_comparisons() {
        let s = state(&[("score", json!(80))]);
        assert!(evaluate_condition(&cond("score", ComparisonOperator::Ge, json!(70)), &s));
        assert!(!evaluate_condition(&cond("score", ComparisonOperator::Lt, json!(70)), &s));
        assert!(evaluate_condition(&cond("score", ComparisonOperator::Le, json!(80)), &s));
    }

    #[test]
    fn test_missing_variable_is_null() {
        let s = state(&[]);
        assert!(evaluate_condition(&cond("absent", ComparisonOperator::IsEmpty, json!(null)), &s));
        assert!(!evaluate_condition(&cond("absent", ComparisonOperator::Eq, json!("x")), &s));
    }

    #[test]
    fn test_string_operators() {
        let s = state(&[("status", json!("approved_final"))]);
        assert!(evaluate_condition(
            &cond("status", ComparisonOperator::StartsWith, json!("approved")),
            &s
        ));
        assert!(evaluate_condition(
            &cond("status", ComparisonOperator::EndsWith, json!("final")),
            &s
        ));
        assert!(evaluate_condition(
            &cond("status", ComparisonOperator::Contains, json!("_")),
            &s
        ));
    }

    #[test]
    fn test_select_branch_first_match_wins() {
        let branches = vec![
            ConditionBranch {
                condition: cond("n", ComparisonOperator::Gt, json!(10)),
                target: "high".to_string(),
            },
            ConditionBranch {
                condition: cond("n", ComparisonOperator::Gt, json!(5)),
                target: "mid".to_string(),
            },
        ];

        let s = state(&[("n", json!(20))]);
        assert_eq!(select_branch(&branches, &s), Some("high"));

        let s = state(&[("n", json!(7))]);
        assert_eq!(select_branch(&branches, &s), Some("mid"));

        let s = state(&[("n", json!(1))]);
        assert_eq!(select_branch(&branches, &s), None);
    }
}
