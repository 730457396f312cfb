use clap::{Parser, Subcommand};
use labcalc::cli::{self, EngineOverrides};
use labcalc::config::ResolutionOrder;
use labcalc::error::LabcalcResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labcalc")]
#[command(about = "Recalculate lab test parameters, formulas and reference-range indicators")]
#[command(long_about = "labcalc - lab test result calculation engine

Derives calculated parameters from [Name] formulas, evaluates
reference-range bounds and flags every value Low / Normal / High.

COMMANDS:
  calculate   - Recalculate a case file and write it back
  validate    - Check that stored values and indicators are current
  audit       - Show a parameter's dependency chain
  eval        - Evaluate one expression

EXAMPLES:
  labcalc calculate case.yaml                    # Recalculate in place
  labcalc calculate case.yaml --order dependency # Topological order
  labcalc validate case1.yaml case2.yaml
  labcalc audit case.yaml lipid LDL
  labcalc eval \"[TC] - [HDL]\" -s TC=200 -s HDL=50")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Engine flags shared by the commands that recalculate
#[derive(clap::Args, Debug, Clone, Copy)]
struct EngineArgs {
    /// Fail formulas that reference a missing or non-numeric parameter
    #[arg(long)]
    strict: bool,

    /// Evaluation order of calculated parameters
    #[arg(long, value_enum)]
    order: Option<ResolutionOrder>,

    /// Decimal places of calculated values
    #[arg(long)]
    precision: Option<u32>,
}

impl From<EngineArgs> for EngineOverrides {
    fn from(args: EngineArgs) -> Self {
        EngineOverrides {
            strict: args.strict,
            order: args.order,
            precision: args.precision,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Recalculate every test in a case file.

Calculated parameters are re-derived from their formulas, range bounds
are evaluated and every indicator is refreshed. The file is written
back in its own format (YAML or JSON) and the previous version is kept
as <file>.bak.

Settings from the case file's 'settings:' block apply unless overridden
by --strict, --order or --precision.

Use --dry-run to preview changes without modifying the file.")]
    /// Recalculate a case file
    Calculate {
        /// Path to case file (.yaml or .json)
        file: PathBuf,

        /// Preview changes without writing to file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show settings and backup location
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    #[command(long_about = "Validate case files without modifying them.

Fails when a stored calculated value or a stored indicator differs from
a fresh recalculation, or when a formula cannot be parsed. Formulas
that read a calculated parameter listed after them are reported as
warnings, since list-order evaluation sees that parameter's previous
value.

BATCH VALIDATION:
  labcalc validate case1.yaml case2.yaml case3.json")]
    /// Check that stored values are current
    Validate {
        /// Path to case file(s) to validate
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Show audit trail for a parameter
    Audit {
        /// Path to case file
        file: PathBuf,

        /// Test id or test name
        test: String,

        /// Parameter name to audit
        parameter: String,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Evaluate a single expression
    Eval {
        /// Expression, e.g. "[Weight] / ([Height] * [Height])"
        #[arg(allow_hyphen_values = true)]
        expression: String,

        /// Binding for a [Name] reference (repeatable)
        #[arg(short = 's', long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Fail on references without a binding
        #[arg(long)]
        strict: bool,

        /// Decimal places of the result
        #[arg(long)]
        precision: Option<u32>,
    },
}

fn main() -> LabcalcResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "labcalc=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Calculate {
            file,
            dry_run,
            verbose,
            engine,
        } => cli::calculate(file, dry_run, verbose, engine.into()),

        Commands::Validate { files, engine } => cli::validate(files, engine.into()),

        Commands::Audit {
            file,
            test,
            parameter,
            engine,
        } => cli::audit(file, test, parameter, engine.into()),

        Commands::Eval {
            expression,
            set,
            strict,
            precision,
        } => cli::eval(
            expression,
            set,
            EngineOverrides {
                strict,
                order: None,
                precision,
            },
        ),
    }
}
