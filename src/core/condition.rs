//! Condition model and the condition step

use crate::core::{step::Step, value::{JsonGet, PipelineValue}};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConditionError {
    #[error("JSON path '{0}' not found in property file")]
    PathNotFound(String),

    #[error("Value at '{path}' is not a number: {value}")]
    NotANumber { path: String, value: String },

    #[error("Operand {0} cannot be resolved outside the orchestrator")]
    Unresolvable(String),

    #[error("Invalid JSON path '{0}'")]
    InvalidPath(String),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Equals => "Equals",
            Comparison::GreaterThan => "GreaterThan",
            Comparison::GreaterThanOrEqualTo => "GreaterThanOrEqualTo",
            Comparison::LessThan => "LessThan",
            Comparison::LessThanOrEqualTo => "LessThanOrEqualTo",
        }
    }

    fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Equals => left == right,
            Comparison::GreaterThan => left > right,
            Comparison::GreaterThanOrEqualTo => left >= right,
            Comparison::LessThan => left < right,
            Comparison::LessThanOrEqualTo => left <= right,
        }
    }
}

/// A comparison between two values, typically a metric and a threshold
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub comparison: Comparison,
    pub left: PipelineValue,
    pub right: PipelineValue,
}

impl Condition {
    pub fn new(comparison: Comparison, left: PipelineValue, right: PipelineValue) -> Self {
        Self {
            comparison,
            left,
            right,
        }
    }

    pub fn greater_than_or_equal_to(left: PipelineValue, right: PipelineValue) -> Self {
        Self::new(Comparison::GreaterThanOrEqualTo, left, right)
    }

    pub fn to_definition(&self) -> Value {
        json!({
            "Type": self.comparison.as_str(),
            "LeftValue": self.left.to_definition(),
            "RightValue": self.right.to_definition(),
        })
    }

    /// Evaluate against a property file document
    ///
    /// Every `JsonGet` operand is looked up in `report`.
    pub fn evaluate(&self, report: &Value) -> Result<bool, ConditionError> {
        let left = resolve(&self.left, report)?;
        let right = resolve(&self.right, report)?;

        match (left.as_f64(), right.as_f64()) {
            (Some(l), Some(r)) => Ok(self.comparison.holds(l, r)),
            _ if self.comparison == Comparison::Equals => Ok(left == right),
            (None, _) => Err(not_a_number(&self.left, &left)),
            (_, None) => Err(not_a_number(&self.right, &right)),
        }
    }
}

fn resolve(value: &PipelineValue, report: &Value) -> Result<Value, ConditionError> {
    match value {
        PipelineValue::Literal(literal) => Ok(literal.clone()),
        PipelineValue::JsonGet(get) => lookup(report, &get.json_path).cloned(),
        other => Err(ConditionError::Unresolvable(other.to_string())),
    }
}

fn not_a_number(operand: &PipelineValue, value: &Value) -> ConditionError {
    ConditionError::NotANumber {
        path: operand.to_string(),
        value: value.to_string(),
    }
}

/// Walk a dotted JSON path such as `metrics.accuracy.value` or `items[0].score`
pub fn lookup<'a>(document: &'a Value, path: &str) -> Result<&'a Value, ConditionError> {
    let segments = path
        .split('.')
        .map(|segment| split_indices(segment, path))
        .collect::<Result<Vec<_>, _>>()?;

    let not_found = || ConditionError::PathNotFound(path.to_string());
    let mut current = document;
    for (key, indices) in segments {
        if !key.is_empty() {
            current = current.get(key).ok_or_else(not_found)?;
        }
        for index in indices {
            current = current.get(index).ok_or_else(not_found)?;
        }
    }
    Ok(current)
}

fn split_indices<'s>(segment: &'s str, path: &str) -> Result<(&'s str, Vec<usize>), ConditionError> {
    let Some(open) = segment.find('[') else {
        if segment.is_empty() {
            return Err(ConditionError::InvalidPath(path.to_string()));
        }
        return Ok((segment, Vec::new()));
    };

    if !segment.ends_with(']') {
        return Err(ConditionError::InvalidPath(path.to_string()));
    }

    let key = &segment[..open];
    let mut indices = Vec::new();
    for part in segment[open..].split_terminator(']') {
        let index = part
            .strip_prefix('[')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| ConditionError::InvalidPath(path.to_string()))?;
        indices.push(index);
    }
    Ok((key, indices))
}

/// Which side of a condition step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    If,
    Else,
}

/// Runs `if_steps` when every condition holds, `else_steps` otherwise
#[derive(Debug, Clone)]
pub struct ConditionStep {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub if_steps: Vec<Step>,
    pub else_steps: Vec<Step>,
}

impl ConditionStep {
    pub fn new(name: &str, conditions: Vec<Condition>) -> Self {
        Self {
            name: name.to_string(),
            conditions,
            if_steps: Vec::new(),
            else_steps: Vec::new(),
        }
    }

    pub fn with_if_steps(mut self, steps: Vec<Step>) -> Self {
        self.if_steps = steps;
        self
    }

    pub fn with_else_steps(mut self, steps: Vec<Step>) -> Self {
        self.else_steps = steps;
        self
    }

    /// Decide the branch for a given property file document
    pub fn select_branch(&self, report: &Value) -> Result<Branch, ConditionError> {
        for condition in &self.conditions {
            if !condition.evaluate(report)? {
                return Ok(Branch::Else);
            }
        }
        Ok(Branch::If)
    }

    pub fn steps_for(&self, branch: Branch) -> &[Step] {
        match branch {
            Branch::If => &self.if_steps,
            Branch::Else => &self.else_steps,
        }
    }

    /// Property file lookups the conditions depend on
    pub fn json_gets(&self) -> Vec<&JsonGet> {
        self.conditions
            .iter()
            .flat_map(|c| [&c.left, &c.right])
            .filter_map(|value| match value {
                PipelineValue::JsonGet(get) => Some(get),
                _ => None,
            })
            .collect()
    }

    pub fn to_definition(&self) -> Value {
        let conditions: Vec<Value> = self.conditions.iter().map(Condition::to_definition).collect();
        let if_steps: Vec<Value> = self.if_steps.iter().map(Step::to_definition).collect();
        let else_steps: Vec<Value> = self.else_steps.iter().map(Step::to_definition).collect();
        json!({
            "Name": self.name,
            "Type": "Condition",
            "Arguments": {
                "Conditions": conditions,
                "IfSteps": if_steps,
                "ElseSteps": else_steps,
            }
        })
    }
}
