use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use glyphpipe_rpc::{LaunchMode, RoleKind};

use crate::drawlist::{HintingArg, MaskArg};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod info;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a renderer/rasterizer session over a pair of pipes.
    Run(RunArgs),
    /// Print the wire layout and protocol limits.
    Info(InfoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Info(args) => info::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ModeArg {
    /// Fork the second role into a child process.
    #[default]
    Process,
    /// Run the second role on a thread.
    Thread,
}

impl ModeArg {
    pub fn name(self) -> &'static str {
        match self {
            ModeArg::Process => "process",
            ModeArg::Thread => "thread",
        }
    }
}

impl From<ModeArg> for LaunchMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Process => LaunchMode::Process,
            ModeArg::Thread => LaunchMode::Thread,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ParentArg {
    /// The calling process renders; the rasterizer is started separately.
    #[default]
    Producer,
    /// The calling process rasterizes; the renderer is started separately.
    Consumer,
}

impl From<ParentArg> for RoleKind {
    fn from(value: ParentArg) -> Self {
        match value {
            ParentArg::Producer => RoleKind::Producer,
            ParentArg::Consumer => RoleKind::Consumer,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// How the second role is started.
    #[arg(long, value_enum, default_value = "process")]
    pub mode: ModeArg,
    /// Role run by the invoking process.
    #[arg(long, value_enum, default_value = "producer")]
    pub parent: ParentArg,
    /// Text to draw when no draw list is given.
    #[arg(long, default_value = "Hello, glyphpipe!", conflicts_with = "draw_list")]
    pub text: String,
    /// Text size in pixels.
    #[arg(long, default_value_t = 16.0, conflicts_with = "draw_list")]
    pub size: f32,
    /// Font id for the text run.
    #[arg(long, default_value_t = 1, conflicts_with = "draw_list")]
    pub font: u32,
    /// Glyph image format.
    #[arg(long, value_enum, default_value = "a8", conflicts_with = "draw_list")]
    pub mask: MaskArg,
    /// Outline hinting.
    #[arg(long, value_enum, default_value = "normal", conflicts_with = "draw_list")]
    pub hinting: HintingArg,
    /// JSON draw list to replay instead of --text.
    #[arg(long, value_name = "FILE")]
    pub draw_list: Option<PathBuf>,
    /// Replay the draw list in-process too and require identical results.
    #[arg(long)]
    pub verify: bool,
    /// Number of timed replay passes over the pipes.
    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub repeat: u32,
}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
