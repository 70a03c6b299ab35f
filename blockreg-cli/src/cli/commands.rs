//! Command implementations and argument parsing for the blockreg CLI.

use std::io::{self, Write};

use blockreg_core::{
    BlockregError, DenseArray, Dtype, ExecutionMode, Executor, LazyArray, LocalExecutor,
    LowRankConfig, MemoryOrder, RandomState, RegressionConfig, make_low_rank_matrix,
    make_regression,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

const DEFAULT_SAMPLES: usize = 100;
const DEFAULT_FEATURES: usize = 100;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "blockreg",
    about = "Synthesize block-partitioned regression and low-rank datasets."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Build and materialize a random regression problem.
    Regression(RegressionCommand),
    /// Build and materialize a low-rank matrix.
    LowRank(LowRankCommand),
}

/// Options shared by every command.
#[derive(Debug, Args, Clone)]
pub struct ExecutionArgs {
    /// Unsigned integer seed, or `none` to seed from entropy.
    #[arg(long = "random-state", default_value = "none")]
    pub random_state: String,

    /// How the local executor schedules block work.
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    pub mode: ModeArg,

    /// Output layout: `C` for row-major or `F` for column-major.
    #[arg(long, default_value = "F")]
    pub order: MemoryOrder,

    /// Element precision: `float32` or `float64`.
    #[arg(long, default_value = "float32")]
    pub dtype: Dtype,
}

/// Executor scheduling modes exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Parallel when the build supports it.
    Auto,
    /// One block at a time.
    Serial,
    /// Blocks on the rayon pool.
    Parallel,
}

impl From<ModeArg> for ExecutionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => Self::Auto,
            ModeArg::Serial => Self::Serial,
            ModeArg::Parallel => Self::Parallel,
        }
    }
}

/// Options accepted by the `regression` command.
#[derive(Debug, Args, Clone)]
pub struct RegressionCommand {
    /// Number of samples (rows).
    #[arg(long = "n-samples", default_value_t = DEFAULT_SAMPLES)]
    pub n_samples: usize,

    /// Number of features (columns).
    #[arg(long = "n-features", default_value_t = DEFAULT_FEATURES)]
    pub n_features: usize,

    /// Number of features used to build the targets.
    #[arg(long = "n-informative", default_value_t = 10)]
    pub n_informative: usize,

    /// Number of regression targets.
    #[arg(long = "n-targets", default_value_t = 1)]
    pub n_targets: usize,

    /// Constant added to every target.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub bias: f64,

    /// Approximate rank of the design; omitted for a well-conditioned design.
    #[arg(long = "effective-rank")]
    pub effective_rank: Option<usize>,

    /// Weight of the singular-value tail when `--effective-rank` is set.
    #[arg(long = "tail-strength", default_value_t = 0.5)]
    pub tail_strength: f64,

    /// Standard deviation of Gaussian noise added to the targets.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Permute samples and features.
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for the permutation stream.
    #[arg(long = "shuffle-seed")]
    pub shuffle_seed: Option<u64>,

    /// Also materialize the ground-truth coefficients.
    #[arg(long)]
    pub coef: bool,

    /// Number of row blocks.
    #[arg(long = "n-parts", default_value_t = 1)]
    pub n_parts: usize,

    /// Rows per block; overrides the size derived from `--n-parts`.
    #[arg(long = "n-samples-per-part")]
    pub n_samples_per_part: Option<usize>,

    /// Shared execution options.
    #[command(flatten)]
    pub execution: ExecutionArgs,
}

/// Options accepted by the `low-rank` command.
#[derive(Debug, Args, Clone)]
pub struct LowRankCommand {
    /// Number of rows.
    #[arg(long = "n-samples", default_value_t = DEFAULT_SAMPLES)]
    pub n_samples: usize,

    /// Number of columns.
    #[arg(long = "n-features", default_value_t = DEFAULT_FEATURES)]
    pub n_features: usize,

    /// Approximate number of dominant singular values.
    #[arg(long = "effective-rank", default_value_t = 10)]
    pub effective_rank: usize,

    /// Weight of the singular-value tail.
    #[arg(long = "tail-strength", default_value_t = 0.5)]
    pub tail_strength: f64,

    /// Number of row blocks.
    #[arg(long = "n-parts", default_value_t = 1)]
    pub n_parts: usize,

    /// Rows per block; overrides the size derived from `--n-parts`.
    #[arg(long = "n-samples-per-part")]
    pub n_samples_per_part: Option<usize>,

    /// Shared execution options.
    #[command(flatten)]
    pub execution: ExecutionArgs,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Graph construction or materialization failed.
    #[error(transparent)]
    Core(#[from] BlockregError),
}

/// Layout and value summary of one materialized array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySummary {
    /// Role of the array in the command's output, such as `X` or `y`.
    pub name: &'static str,
    /// Materialized shape.
    pub shape: Vec<usize>,
    /// Row block sizes of the lazy description.
    pub row_chunks: Vec<usize>,
    /// Column block sizes of the lazy description.
    pub col_chunks: Vec<usize>,
    /// Element precision.
    pub dtype: Dtype,
    /// Whether the values are stored column-major.
    pub column_major: bool,
    /// Frobenius norm of the values.
    pub frobenius_norm: f64,
}

impl ArraySummary {
    fn describe(name: &'static str, lazy: &LazyArray, dense: &DenseArray) -> Self {
        Self {
            name,
            shape: dense.shape().to_vec(),
            row_chunks: lazy.row_chunks().blocks().to_vec(),
            col_chunks: lazy.col_chunks().blocks().to_vec(),
            dtype: dense.dtype(),
            column_major: dense.ndim() == 2 && dense.is_column_major(),
            frobenius_norm: dense.frobenius_norm(),
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSummary {
    /// Name of the command that produced the arrays.
    pub command: &'static str,
    /// Materialized arrays in output order.
    pub arrays: Vec<ArraySummary>,
}

impl ExecutionSummary {
    /// Summary of the array called `name`, if the command produced one.
    #[must_use]
    pub fn array(&self, name: &str) -> Option<&ArraySummary> {
        self.arrays.iter().find(|array| array.name == name)
    }
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the random state cannot be parsed, the
/// configuration is invalid, or materialization fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use blockreg_cli::cli::{Cli, run_cli};
/// # use clap::Parser;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let cli = Cli::try_parse_from([
///     "blockreg", "regression", "--n-samples", "12", "--n-features", "4",
///     "--n-parts", "3", "--random-state", "7",
/// ])?;
/// let summary = run_cli(cli)?;
/// let x = summary.array("X").expect("design matrix");
/// assert_eq!(x.shape, vec![12, 4]);
/// assert_eq!(x.row_chunks, vec![4, 4, 4]);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Regression(command) => {
            Span::current().record("command", field::display("regression"));
            run_regression(command)
        }
        Command::LowRank(command) => {
            Span::current().record("command", field::display("low-rank"));
            run_low_rank(command)
        }
    }
}

fn executor_for(args: &ExecutionArgs) -> LocalExecutor {
    LocalExecutor::new()
        .with_mode(args.mode.into())
        .with_order(args.order)
}

#[instrument(
    name = "cli.regression",
    err,
    skip(command),
    fields(
        n_samples = command.n_samples,
        n_features = command.n_features,
        n_parts = command.n_parts,
        random_state = %command.execution.random_state,
    ),
)]
pub(super) fn run_regression(command: RegressionCommand) -> Result<ExecutionSummary, CliError> {
    let random_state: RandomState = command.execution.random_state.parse()?;
    let config = RegressionConfig::new()
        .with_shape(command.n_samples, command.n_features)
        .with_n_informative(command.n_informative)
        .with_n_targets(command.n_targets)
        .with_bias(command.bias)
        .with_effective_rank(command.effective_rank)
        .with_tail_strength(command.tail_strength)
        .with_noise(command.noise)
        .with_shuffle(command.shuffle)
        .with_shuffle_seed(command.shuffle_seed)
        .with_coefficients(command.coef)
        .with_n_parts(command.n_parts)
        .with_n_samples_per_part(command.n_samples_per_part)
        .with_order(command.execution.order)
        .with_dtype(command.execution.dtype);

    let dataset = make_regression(&config, random_state)?;
    let dense = dataset.materialize(&executor_for(&command.execution))?;

    let mut arrays = vec![
        ArraySummary::describe("X", dataset.x(), &dense.x),
        ArraySummary::describe("y", dataset.y(), &dense.y),
    ];
    if let (Some(lazy), Some(values)) = (dataset.coefficients(), dense.coefficients.as_ref()) {
        arrays.push(ArraySummary::describe("coef", lazy, values));
    }

    info!(
        arrays = arrays.len(),
        n_informative = dataset.n_informative(),
        shuffled = dataset.shuffle().is_some(),
        "regression dataset materialized"
    );
    Ok(ExecutionSummary {
        command: "regression",
        arrays,
    })
}

#[instrument(
    name = "cli.low_rank",
    err,
    skip(command),
    fields(
        n_samples = command.n_samples,
        n_features = command.n_features,
        effective_rank = command.effective_rank,
        random_state = %command.execution.random_state,
    ),
)]
pub(super) fn run_low_rank(command: LowRankCommand) -> Result<ExecutionSummary, CliError> {
    let random_state: RandomState = command.execution.random_state.parse()?;
    let config = LowRankConfig::new()
        .with_shape(command.n_samples, command.n_features)
        .with_effective_rank(command.effective_rank)
        .with_tail_strength(command.tail_strength)
        .with_n_parts(command.n_parts)
        .with_n_samples_per_part(command.n_samples_per_part)
        .with_dtype(command.execution.dtype);

    let matrix = make_low_rank_matrix(&config, random_state)?;
    let dense = executor_for(&command.execution).compute(&matrix)?;
    let summary = ArraySummary::describe("X", &matrix, &dense);

    info!(
        norm = summary.frobenius_norm,
        nodes = matrix.node_count(),
        "low-rank matrix materialized"
    );
    Ok(ExecutionSummary {
        command: "low-rank",
        arrays: vec![summary],
    })
}

fn join_sizes(sizes: &[usize]) -> String {
    sizes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders `summary` to `writer`, one tab-separated line per array.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use blockreg_cli::cli::{ArraySummary, ExecutionSummary, render_summary};
/// # use blockreg_core::Dtype;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let summary = ExecutionSummary {
///     command: "low-rank",
///     arrays: vec![ArraySummary {
///         name: "X",
///         shape: vec![4, 2],
///         row_chunks: vec![2, 2],
///         col_chunks: vec![2],
///         dtype: Dtype::F64,
///         column_major: true,
///         frobenius_norm: 1.5,
///     }],
/// };
/// let mut buffer = Vec::new();
/// render_summary(&summary, &mut buffer)?;
/// let text = String::from_utf8(buffer)?;
/// assert_eq!(
///     text,
///     "command: low-rank\nX\tshape=4x2\trows=2,2\tcols=2\tdtype=float64\torder=F\tnorm=1.500000\n",
/// );
/// # Ok(())
/// # }
/// ```
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    writeln!(writer, "command: {}", summary.command)?;
    for array in &summary.arrays {
        let shape = array
            .shape
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("x");
        let order = if array.column_major { "F" } else { "C" };
        writeln!(
            writer,
            "{}\tshape={shape}\trows={}\tcols={}\tdtype={}\torder={order}\tnorm={:.6}",
            array.name,
            join_sizes(&array.row_chunks),
            join_sizes(&array.col_chunks),
            array.dtype,
            array.frobenius_norm,
        )?;
    }
    Ok(())
}
