//! CLI output formatting

use crate::core::{Branch, KnownIssue, Parameter, Step};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ARROW: Emoji<'_, '_> = Emoji("➡️  ", "> ");

/// Format a parameter with its type and default
pub fn format_parameter(parameter: &Parameter) -> String {
    format!(
        "{} ({}) = {}",
        style(&parameter.name).bold(),
        style(parameter.parameter_type().as_str()).dim(),
        style(parameter.default_value()).cyan()
    )
}

/// Format a step and any steps nested in its branches
pub fn format_step(step: &Step, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    let mut line = format!(
        "{}{} {}",
        indent,
        style(step.name()).bold(),
        style(format!("[{}]", step.kind())).dim()
    );

    if let Some(condition) = step.as_condition() {
        for (label, steps) in [("if", &condition.if_steps), ("else", &condition.else_steps)] {
            line.push_str(&format!("\n{}  {}:", indent, style(label).yellow()));
            if steps.is_empty() {
                line.push_str(&format!(" {}", style("(stop)").dim()));
            }
            for nested in steps {
                line.push('\n');
                line.push_str(&format_step(nested, depth + 2));
            }
        }
    }

    line
}

pub fn format_issue(issue: &KnownIssue) -> String {
    format!("{}{}", WARN, style(issue).yellow())
}

/// Format the branch decision for an evaluation report
pub fn format_branch(branch: Branch, steps: &[Step]) -> String {
    match branch {
        Branch::If => {
            let names: Vec<&str> = steps.iter().map(Step::name).collect();
            format!(
                "{}Condition holds {}{}",
                CHECK,
                ARROW,
                style(names.join(", ")).green()
            )
        }
        Branch::Else if steps.is_empty() => {
            format!("{}Condition fails {}{}", CROSS, ARROW, style("pipeline stops").red())
        }
        Branch::Else => {
            let names: Vec<&str> = steps.iter().map(Step::name).collect();
            format!("{}Condition fails {}{}", CROSS, ARROW, style(names.join(", ")).red())
        }
    }
}
