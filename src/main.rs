use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use docker_save::notifier::{logger_builder, VerbosityLevel};
use docker_save::{
    Destination, DockerSource, ImageProcessor, NerdctlSource, Notifier, RetentionPolicy,
    SaveOptions, Source, StatsOptions, TarSource, WorkdirOptions,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Engine {
    Docker,
    Nerdctl,
    /// A `docker save` archive given with --archive
    Tar,
}

#[derive(Parser)]
#[command(author, version, about = "Save container images with only the layers you need", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(
        short,
        long,
        value_enum,
        global = true,
        default_value = "docker",
        help = "Container engine to use"
    )]
    engine: Engine,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Image archive to read when the engine is 'tar'"
    )]
    archive: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Verbose mode (-v for info, -vv for debug, -vvv for trace). Also switches to text-based progress"
    )]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Save one or more images to a tar archive (streamed to stdout by default)
    Save {
        #[arg(required = true, help = "Images to save (e.g., app:1.2 base:latest)")]
        images: Vec<String>,

        #[arg(short, long, help = "Write to a file, instead of stdout")]
        output: Option<PathBuf>,

        #[command(flatten)]
        workdir: WorkdirArgs,

        #[arg(
            short,
            long,
            value_name = "N|N,M,...",
            value_parser = clap::value_parser!(RetentionPolicy),
            help = "Keep only the last N layers of each image; a comma separated list gives one value per image"
        )]
        last: Option<RetentionPolicy>,

        #[arg(
            short = 'L',
            long,
            conflicts_with = "last",
            help = "Keep only the newest layer of each image"
        )]
        latest: bool,
    },

    /// Compare the layers of two images position by position
    Diff {
        #[arg(num_args = 2, required = true, value_names = ["IMAGE", "IMAGE"])]
        images: Vec<String>,
    },

    /// Show size and build command of every layer
    Stats {
        #[arg(help = "Images to analyze; may be omitted with --cache-from")]
        images: Vec<String>,

        #[command(flatten)]
        workdir: WorkdirArgs,

        #[arg(long, help = "Print one JSON object per layer")]
        json: bool,
    },
}

#[derive(Args)]
struct WorkdirArgs {
    #[arg(
        short,
        long,
        default_value = ".",
        help = "Directory for the temporary export directory"
    )]
    workdir: PathBuf,

    #[arg(short, long, help = "Keep the temporary export directory")]
    keep: bool,

    #[arg(
        short,
        long = "cache-from",
        value_name = "DIR",
        help = "Use an already extracted export directory instead of exporting"
    )]
    cache_from: Option<PathBuf>,
}

impl From<WorkdirArgs> for WorkdirOptions {
    fn from(args: WorkdirArgs) -> Self {
        WorkdirOptions {
            workdir: args.workdir,
            keep_temp_dir: args.keep,
            cache_dir: args.cache_from,
        }
    }
}

fn open_source(engine: Engine, archive: Option<PathBuf>) -> Result<Box<dyn Source>> {
    debug!("Engine: {:?}", engine);
    let source: Box<dyn Source> = match engine {
        Engine::Docker => Box::new(
            DockerSource::new().map_err(|e| anyhow!("Failed to initialize Docker engine: {}", e))?,
        ),
        Engine::Nerdctl => Box::new(
            NerdctlSource::new()
                .map_err(|e| anyhow!("Failed to initialize nerdctl engine: {}", e))?,
        ),
        Engine::Tar => {
            let archive = archive.ok_or_else(|| anyhow!("--archive is required with --engine tar"))?;
            Box::new(
                TarSource::new(&archive)
                    .with_context(|| format!("Failed to open archive {}", archive.display()))?,
            )
        }
    };
    Ok(source)
}

fn run(cli: Cli) -> Result<()> {
    let source = open_source(cli.engine, cli.archive)?;
    let processor = ImageProcessor::new(source, Notifier::new(cli.verbose));

    match cli.command {
        Command::Save {
            images,
            output,
            workdir,
            last,
            latest,
        } => {
            let options = SaveOptions {
                images,
                output,
                workdir: workdir.into(),
                retention: RetentionPolicy::from_flags(last, latest),
            };
            debug!("Save options: {:?}", options);

            let destination = Destination::from_output(options.output.as_deref())?;
            processor
                .save(&options, destination)
                .context("Failed to save images")?;
        }
        Command::Diff { images } => {
            let mut stdout = io::stdout().lock();
            processor
                .diff(&images[0], &images[1], &mut stdout)
                .context("Failed to compare images")?;
            stdout.flush()?;
        }
        Command::Stats {
            images,
            workdir,
            json,
        } => {
            let options = StatsOptions {
                images,
                workdir: workdir.into(),
                json,
            };
            debug!("Stats options: {:?}", options);
            processor
                .stats(&options, &mut io::stdout().lock())
                .context("Failed to collect layer stats")?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = VerbosityLevel::from(cli.verbose);
    // The global logger backs `log::` calls made inside the library.
    let _ = logger_builder(verbosity).try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
