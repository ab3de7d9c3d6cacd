//! gradelens CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gradelens", version, about = "Syllabus and answer-sheet understanding analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs the analysis pipeline.
#[derive(clap::Args)]
struct PipelineArgs {
    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the heuristic score jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Never call the remote inference service
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an answer sheet against a syllabus
    Analyze {
        /// Syllabus text file
        #[arg(long)]
        syllabus: PathBuf,

        /// Answer sheet text file
        #[arg(long)]
        answers: PathBuf,

        /// Save the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Extract topics from a syllabus
    Topics {
        /// Syllabus text file
        #[arg(long)]
        syllabus: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Split an answer sheet into question/answer pairs
    Segment {
        /// Answer sheet text file
        #[arg(long)]
        answers: PathBuf,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Store a syllabus or an answer sheet in a gradebook
    Ingest {
        #[command(subcommand)]
        kind: IngestKind,
    },

    /// Dashboard statistics over a gradebook
    Stats {
        #[command(subcommand)]
        view: StatsView,
    },

    /// Compare two analysis reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Score change (in points) below which a topic is unchanged
        #[arg(long, default_value = "5.0")]
        threshold: f64,

        /// Exit code 1 if any topic regressed
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check a gradebook for common issues
    Validate {
        /// Gradebook JSON file
        #[arg(long)]
        gradebook: PathBuf,
    },

    /// Create a starter config and gradebook
    Init,
}

#[derive(Subcommand)]
enum IngestKind {
    /// Extract a syllabus's topics and store it for a teacher
    Syllabus {
        #[arg(long)]
        gradebook: PathBuf,

        #[arg(long)]
        teacher: u64,

        /// Syllabus text file
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Segment and score a student's answer sheet against the latest syllabus
    Answers {
        #[arg(long)]
        gradebook: PathBuf,

        #[arg(long)]
        student: u64,

        /// Answer sheet text file
        #[arg(long)]
        file: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}

#[derive(Subcommand)]
enum StatsView {
    /// Teacher dashboard for the teacher's latest syllabus
    Overview {
        #[arg(long)]
        gradebook: PathBuf,

        #[arg(long)]
        teacher: u64,

        /// Number of recent uploads to list (default from config, else 10)
        #[arg(long)]
        recent: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// One student's topic means against the class
    Student {
        #[arg(long)]
        gradebook: PathBuf,

        #[arg(long)]
        student: u64,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Per-topic, per-student chart data
    Comparison {
        #[arg(long)]
        gradebook: PathBuf,

        #[arg(long)]
        teacher: u64,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gradelens=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            syllabus,
            answers,
            output,
            format,
            pipeline,
        } => {
            commands::analyze::execute(syllabus, answers, output, format, pipeline.into()).await
        }
        Commands::Topics {
            syllabus,
            format,
            pipeline,
        } => commands::analyze::topics(syllabus, format, pipeline.into()).await,
        Commands::Segment {
            answers,
            format,
            pipeline,
        } => commands::analyze::segment(answers, format, pipeline.into()).await,
        Commands::Ingest { kind } => match kind {
            IngestKind::Syllabus {
                gradebook,
                teacher,
                file,
                pipeline,
            } => commands::ingest::syllabus(gradebook, teacher, file, pipeline.into()).await,
            IngestKind::Answers {
                gradebook,
                student,
                file,
                pipeline,
            } => commands::ingest::answers(gradebook, student, file, pipeline.into()).await,
        },
        Commands::Stats { view } => match view {
            StatsView::Overview {
                gradebook,
                teacher,
                recent,
                config,
                format,
            } => commands::stats::overview(gradebook, teacher, recent, config, format),
            StatsView::Student {
                gradebook,
                student,
                format,
            } => commands::stats::student(gradebook, student, format),
            StatsView::Comparison {
                gradebook,
                teacher,
                format,
            } => commands::stats::comparison(gradebook, teacher, format),
        },
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate { gradebook } => commands::validate::execute(gradebook),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

impl From<PipelineArgs> for commands::PipelineOptions {
    fn from(args: PipelineArgs) -> Self {
        Self {
            config: args.config,
            seed: args.seed,
            offline: args.offline,
        }
    }
}
