//! CLI argument definitions for the report lifecycle tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "crf",
    version,
    about = "Clinical report lifecycle - drive drafts through review to published snapshots",
    long_about = "Drive structured clinical reports through their lifecycle:\n\
                  draft editing with conditional field visibility, submit/verify review,\n\
                  and confirmed publication into immutable, checksummed snapshots."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory of JSON report templates.
    #[arg(
        long = "templates-dir",
        value_name = "DIR",
        default_value = "templates",
        global = true
    )]
    pub templates_dir: PathBuf,

    /// State file holding drafts and published snapshots.
    #[arg(
        long = "state",
        value_name = "PATH",
        default_value = "reports.json",
        global = true
    )]
    pub state_file: PathBuf,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the templates the registry loaded.
    Templates,

    /// Associate a work item with a template.
    Register(RegisterArgs),

    /// Show a work item's status, values, and hidden fields.
    Show(WorkItemArgs),

    /// Set draft field values (key=value pairs, parsed by field kind).
    Set(SetArgs),

    /// Submit a draft for review.
    Submit(WorkItemArgs),

    /// Mark a submitted report as verified.
    Verify(WorkItemArgs),

    /// Return a submitted or verified report to draft.
    Return(ReturnArgs),

    /// Publish the verified report as the next immutable snapshot.
    Publish(PublishArgs),

    /// List the publish history of a work item.
    History(WorkItemArgs),

    /// Verify the checksum of a published snapshot.
    Check(CheckArgs),

    /// Render the published document for a version.
    Artifact(ArtifactArgs),
}

#[derive(Parser)]
pub struct RegisterArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Template code from the registry.
    pub template: String,
}

#[derive(Parser)]
pub struct WorkItemArgs {
    /// Work item identifier.
    pub work_item: String,
}

#[derive(Parser)]
pub struct SetArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Field assignments as key=value. Booleans take true/false; an empty
    /// value clears the field.
    #[arg(required = true, value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,
}

#[derive(Parser)]
pub struct ReturnArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Reason recorded for audit; must not be empty.
    #[arg(long)]
    pub reason: String,
    /// Acting user recorded on the correction entry.
    #[arg(long, default_value = "cli")]
    pub actor: String,
}

#[derive(Parser)]
pub struct PublishArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Free-text notes stored on the snapshot.
    #[arg(long, default_value = "")]
    pub notes: String,
    /// Confirmation token; publication requires the exact literal PUBLISH.
    #[arg(long)]
    pub confirm: String,
    /// Acting user recorded as publisher.
    #[arg(long, default_value = "cli")]
    pub actor: String,
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Published version to verify.
    pub version: u32,
}

#[derive(Parser)]
pub struct ArtifactArgs {
    /// Work item identifier.
    pub work_item: String,
    /// Published version to render.
    pub version: u32,
    /// Write the document here instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
