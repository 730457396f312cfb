use crate::config::{EngineConfig, MissingReferencePolicy, ResolutionOrder};
use crate::core::expression::{self, EvalError};
use crate::core::resolver::forward_references;
use crate::core::{DiagnosticKind, EvalContext, RecalcEngine};
use crate::error::{LabcalcError, LabcalcResult};
use crate::parser;
use crate::types::{Case, Indicator, Parameter, Test};
use crate::writer;
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};

/// Engine settings given on the command line; they override the case file
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOverrides {
    pub strict: bool,
    pub order: Option<ResolutionOrder>,
    pub precision: Option<u32>,
}

impl EngineOverrides {
    pub fn apply(&self, base: EngineConfig) -> EngineConfig {
        let mut config = base;
        if self.strict {
            config.missing_reference = MissingReferencePolicy::Error;
        }
        if let Some(order) = self.order {
            config.resolution = order;
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        config
    }
}

fn engine_for(case: &Case, overrides: &EngineOverrides) -> RecalcEngine {
    RecalcEngine::new(overrides.apply(case.settings.unwrap_or_default()))
}

fn colored_indicator(indicator: Indicator) -> ColoredString {
    match indicator {
        Indicator::None => "".normal(),
        Indicator::Low => "Low".bold().blue(),
        Indicator::Normal => "Normal".green(),
        Indicator::High => "High".bold().red(),
    }
}

fn format_range(param: &Parameter) -> String {
    match (param.range_min.as_deref(), param.range_max.as_deref()) {
        (Some(min), Some(max)) => format!("{} - {}", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => String::new(),
    }
}

fn print_test(test: &Test) {
    println!(
        "   🧪 {} {}",
        test.test_name.bright_blue().bold(),
        format!("[{}]", test.id).dimmed()
    );
    for param in &test.parameters {
        let marker = if param.is_calculated { "ƒ" } else { " " };
        let unit = param.unit.as_deref().unwrap_or("");
        println!(
            "      {} {:<28} {:>10} {:<8} {:<16} {}",
            marker.cyan(),
            param.name,
            param.value.as_deref().unwrap_or("-").bold(),
            unit,
            format_range(param).dimmed(),
            colored_indicator(param.indicator)
        );
    }
}

/// Execute the calculate command
pub fn calculate(
    file: PathBuf,
    dry_run: bool,
    verbose: bool,
    overrides: EngineOverrides,
) -> LabcalcResult<()> {
    println!("{}", "🧮 labcalc - Recalculating case".bold().green());
    println!("   File: {}\n", file.display());

    if dry_run {
        println!("{}", "📋 DRY RUN MODE - No changes will be written\n".yellow());
    }

    let mut case = parser::parse_case(&file)?;
    let engine = engine_for(&case, &overrides);

    if verbose {
        let config = engine.config();
        println!("   Found {} tests", case.tests.len());
        println!(
            "   Missing references: {:?}, order: {:?}, precision: {}\n",
            config.missing_reference, config.resolution, config.precision
        );
    }

    let report = engine.recalculate_with_report(&case.tests);

    println!("{}", "✅ Results:".bold().green());
    for test in &report.tests {
        print_test(test);
    }
    println!();

    if !report.diagnostics.is_empty() {
        println!("{}", "⚠️  Diagnostics:".bold().yellow());
        for diagnostic in &report.diagnostics {
            println!("   {}", diagnostic.to_string().yellow());
        }
        println!();
    }

    case.tests = report.tests;

    if dry_run {
        println!("{}", "📋 Dry run complete - no changes written".yellow());
    } else {
        writer::write_case(&file, &case)?;
        println!("{} {}", "💾 Written:".bold().green(), file.display());
        if verbose {
            println!("   Backup: {}", writer::backup_path(&file).display());
        }
    }

    Ok(())
}

/// One stored field that no longer matches its recomputed value
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    pub test_id: String,
    pub parameter: String,
    pub field: &'static str,
    pub stored: String,
    pub expected: String,
}

/// Compare stored values and indicators against a fresh recalculation
pub fn find_mismatches(stored: &[Test], recalculated: &[Test]) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    for (before, after) in stored.iter().zip(recalculated) {
        for (old, new) in before.parameters.iter().zip(&after.parameters) {
            if old.is_calculated && old.value != new.value {
                mismatches.push(Mismatch {
                    test_id: before.id.clone(),
                    parameter: old.name.clone(),
                    field: "value",
                    stored: old.value.clone().unwrap_or_default(),
                    expected: new.value.clone().unwrap_or_default(),
                });
            }
            if old.indicator != new.indicator {
                mismatches.push(Mismatch {
                    test_id: before.id.clone(),
                    parameter: old.name.clone(),
                    field: "indicator",
                    stored: format!("{:?}", old.indicator),
                    expected: format!("{:?}", new.indicator),
                });
            }
        }
    }

    mismatches
}

/// Execute the validate command
pub fn validate(files: Vec<PathBuf>, overrides: EngineOverrides) -> LabcalcResult<()> {
    let mut failed_files = 0;

    for file in &files {
        if files.len() > 1 {
            println!("{}", "─".repeat(60).dimmed());
        }
        if let Err(e) = validate_file(file, &overrides) {
            println!("{}", format!("❌ {}", e).bold().red());
            failed_files += 1;
        }
    }

    if failed_files > 0 {
        return Err(LabcalcError::Validation(format!(
            "{} of {} file(s) failed validation",
            failed_files,
            files.len()
        )));
    }

    Ok(())
}

fn validate_file(file: &Path, overrides: &EngineOverrides) -> LabcalcResult<()> {
    println!("{}", "✅ Validating case".bold().green());
    println!("   File: {}\n", file.display());

    let case = parser::parse_case(file)?;
    let engine = engine_for(&case, overrides);

    for warning in parser::lint_case(&case) {
        println!("   {} {}", "⚠️".yellow(), warning.yellow());
    }

    if engine.config().resolution == ResolutionOrder::ListOrder {
        for test in &case.tests {
            for (index, name) in forward_references(&test.parameters) {
                println!(
                    "   {} {}: '{}' reads [{}], which is calculated later in the list",
                    "⚠️".yellow(),
                    test.id,
                    test.parameters[index].name,
                    name
                );
            }
        }
    }

    let report = engine.recalculate_with_report(&case.tests);

    // Broken templates: formulas that can never evaluate, and cycles
    let broken: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| match &d.kind {
            DiagnosticKind::Formula(e) => is_template_error(e),
            DiagnosticKind::Cycle { .. } => true,
            _ => false,
        })
        .collect();
    for diagnostic in &broken {
        println!("   {} {}", "❌".red(), diagnostic.to_string().red());
    }

    let mismatches = find_mismatches(&case.tests, &report.tests);
    for m in &mismatches {
        println!(
            "   {} {} / {} {}: stored {}, expected {}",
            "❌".red(),
            m.test_id,
            m.parameter.bright_blue(),
            m.field,
            m.stored.red(),
            m.expected.green()
        );
    }

    if broken.is_empty() && mismatches.is_empty() {
        println!("{}", "✅ All calculated values and indicators are current".green());
        Ok(())
    } else {
        Err(LabcalcError::Validation(format!(
            "{}: {} broken formula(s), {} stale field(s)",
            file.display(),
            broken.len(),
            mismatches.len()
        )))
    }
}

/// Errors that come from the formula text itself rather than from data
fn is_template_error(e: &EvalError) -> bool {
    matches!(
        e,
        EvalError::Empty | EvalError::UnbalancedParentheses | EvalError::Syntax { .. }
    )
}

/// A node in an audit dependency tree
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDependency {
    pub name: String,
    pub formula: Option<String>,
    pub value: Option<String>,
    /// Set when the name is not a parameter of the test
    pub missing: bool,
    /// Set when following this reference would loop
    pub circular: bool,
    pub children: Vec<AuditDependency>,
}

/// Build the `[Name]` dependency tree of `formula` within `test`
pub fn build_dependency_tree(
    test: &Test,
    formula: &str,
    path: &mut Vec<String>,
) -> Vec<AuditDependency> {
    let names = expression::references(formula).unwrap_or_default();

    names
        .into_iter()
        .map(|name| {
            let param = test.parameter(&name);
            let circular = path.contains(&name);
            let dep_formula = param.and_then(|p| p.active_formula()).map(str::to_string);

            let children = match (&dep_formula, circular) {
                (Some(f), false) => {
                    path.push(name.clone());
                    let children = build_dependency_tree(test, f, path);
                    path.pop();
                    children
                }
                _ => Vec::new(),
            };

            AuditDependency {
                value: param.and_then(|p| p.value.clone()),
                missing: param.is_none(),
                circular,
                formula: dep_formula,
                children,
                name,
            }
        })
        .collect()
}

fn print_dependency(dep: &AuditDependency, depth: usize) {
    let indent = "   ".repeat(depth);
    let mut line = format!("{}└─ {}", indent, dep.name.bright_blue());
    if let Some(value) = &dep.value {
        line.push_str(&format!(" = {}", value.bold()));
    }
    if let Some(formula) = &dep.formula {
        line.push_str(&format!("  {}", formula.bright_yellow()));
    }
    if dep.missing {
        line.push_str(&format!("  {}", "(not in test, reads as 0)".red()));
    }
    if dep.circular {
        line.push_str(&format!("  {}", "(circular)".red()));
    }
    println!("{}", line);
    for child in &dep.children {
        print_dependency(child, depth + 1);
    }
}

/// Execute the audit command - show a parameter's dependency chain
pub fn audit(
    file: PathBuf,
    test_id: String,
    parameter: String,
    overrides: EngineOverrides,
) -> LabcalcResult<()> {
    println!("{}", "🔍 labcalc - Audit Trail".bold().green());
    println!("   File: {}", file.display());
    println!("   Parameter: {}\n", parameter.bright_blue().bold());

    let case = parser::parse_case(&file)?;
    let test = case
        .test(&test_id)
        .ok_or_else(|| LabcalcError::Validation(format!("Test '{}' not found", test_id)))?;
    let param = test.parameter(&parameter).ok_or_else(|| {
        LabcalcError::Validation(format!(
            "Parameter '{}' not found in test '{}'",
            parameter, test.id
        ))
    })?;

    println!("{}", "📋 Parameter Information:".bold().cyan());
    println!("   Test: {} [{}]", test.test_name, test.id);
    println!(
        "   Type: {}",
        if param.is_calculated { "calculated" } else { "entered" }.cyan()
    );
    if let Some(value) = &param.value {
        println!("   Stored Value: {}", value.bold());
    }
    if let Some(formula) = param.active_formula() {
        println!("   Formula: {}", formula.bright_yellow());
    }
    if param.has_range() {
        println!("   Range: {}", format_range(param));
    }
    println!();

    if let Some(formula) = param.active_formula() {
        println!("{}", "🌳 Dependency Tree:".bold().cyan());
        let mut path = vec![param.name.clone()];
        let deps = build_dependency_tree(test, formula, &mut path);
        if deps.is_empty() {
            println!("   No dependencies (constant formula)");
        } else {
            for dep in &deps {
                print_dependency(dep, 1);
            }
        }
        println!();
    }

    println!("{}", "🧮 Recalculated:".bold().cyan());
    let engine = engine_for(&case, &overrides);
    let (updated, diagnostics) = engine.recalculate_test(test);
    if let Some(new) = updated.parameter(&parameter) {
        println!(
            "   Value: {}  {}",
            new.value.as_deref().unwrap_or("-").bold().green(),
            colored_indicator(new.indicator)
        );
        if param.is_calculated && new.value != param.value {
            println!(
                "   {} Stored value is stale ({} -> {})",
                "⚠️".yellow(),
                param.value.as_deref().unwrap_or("-").red(),
                new.value.as_deref().unwrap_or("-").green()
            );
        }
    }
    for diagnostic in diagnostics.iter().filter(|d| d.parameter == parameter) {
        println!("   {} {}", "❌".red(), diagnostic.kind.to_string().red());
    }

    println!();
    println!("{}", "✅ Audit complete".bold().green());
    Ok(())
}

/// Parse `Name=value` bindings into a context
pub fn parse_bindings(bindings: &[String]) -> LabcalcResult<EvalContext> {
    let mut ctx = EvalContext::new();
    for binding in bindings {
        let (name, value) = binding.rsplit_once('=').ok_or_else(|| {
            LabcalcError::Parse(format!("Expected Name=value, got '{}'", binding))
        })?;
        let number = crate::types::parse_numeric(value).ok_or_else(|| {
            LabcalcError::Parse(format!("Value for '{}' is not a number: '{}'", name, value))
        })?;
        ctx.set(name.trim(), number);
    }
    Ok(ctx)
}

/// Execute the eval command - evaluate one expression
pub fn eval(
    expression: String,
    bindings: Vec<String>,
    overrides: EngineOverrides,
) -> LabcalcResult<()> {
    let config = overrides.apply(EngineConfig::default());
    let ctx = parse_bindings(&bindings)?;

    let value = expression::evaluate_str(&expression, &ctx, config.missing_reference)?;
    println!("{}", config.format_value(value).bold().green());
    Ok(())
}
