use anyhow::{Context, Error};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;

use dnabc::config::Config;
use dnabc::demux;
use dnabc::filenames::find_input_fastqs;
use dnabc::make_index::make_index;
use dnabc::read_pair_iter::InputFastqs;
use dnabc::sample::{write_sample_names, Sample};
use dnabc::sample_sheet::split_lanes;
use dnabc::summary::RunSummary;
use dnabc::utils;

#[derive(Parser, Debug)]
#[command(
    name = "dnabc",
    version,
    about = "Demultiplex paired-end DNA sequencing reads by barcode"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split paired FASTQ reads into per-sample files.
    Demux(DemuxArgs),
    /// Write the sample names of a barcode file, one per line.
    SampleNames(SampleNamesArgs),
    /// Build an index-read FASTQ from the barcodes in read descriptions.
    MakeIndex(MakeIndexArgs),
    /// Extract the barcode manifest for one lane of an Illumina sample sheet.
    SplitLanes(SplitLanesArgs),
}

#[derive(Args, Debug)]
struct DemuxArgs {
    /// Forward reads file (FASTQ format).
    #[arg(long, required_unless_present = "fastq_dir", requires = "reverse_reads")]
    forward_reads: Option<PathBuf>,

    /// Reverse reads file (FASTQ format).
    #[arg(long, requires = "forward_reads")]
    reverse_reads: Option<PathBuf>,

    /// Index reads file (FASTQ format). Without it, barcodes are taken from
    /// the description lines of the forward reads.
    #[arg(long, requires = "forward_reads")]
    index_reads: Option<PathBuf>,

    /// Directory of bcl2fastq-named FASTQ files to demultiplex.
    #[arg(long, conflicts_with = "forward_reads")]
    fastq_dir: Option<PathBuf>,

    /// Only use files in --fastq-dir with this sample prefix.
    #[arg(long, requires = "fastq_dir")]
    fastq_prefix: Option<String>,

    /// Barcode information file.
    #[arg(long)]
    barcode_file: PathBuf,

    /// Output sequence data directory.
    #[arg(long)]
    output_dir: PathBuf,

    /// Summary file path.
    #[arg(long)]
    summary_file: PathBuf,

    /// Configuration file (JSON format).
    #[arg(long)]
    config_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SampleNamesArgs {
    /// Barcode information file.
    #[arg(long)]
    barcode_file: PathBuf,

    /// Output file of sample names, standard output if omitted.
    #[arg(long)]
    output_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MakeIndexArgs {
    /// Forward reads file (FASTQ format) with barcodes in the descriptions.
    reads: PathBuf,

    /// Output index FASTQ file, standard output if omitted.
    #[arg(long)]
    output_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SplitLanesArgs {
    /// Illumina sample sheet (CSV format).
    sample_sheet: PathBuf,

    /// Lane to extract.
    #[arg(long)]
    lane: String,

    /// Output barcode file, standard output if omitted.
    #[arg(long)]
    output_file: Option<PathBuf>,
}

fn output(path: Option<&PathBuf>) -> Result<Box<dyn Write>, Error> {
    Ok(match path {
        Some(p) => Box::new(utils::create_buffered(p)?),
        None => Box::new(io::BufWriter::new(io::stdout())),
    })
}

fn run_demux(args: &DemuxArgs) -> Result<(), Error> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let config = Config::resolve(args.config_file.as_deref(), home.as_deref())?;
    let samples = Sample::load_path(&args.barcode_file)?;

    let inputs = match (&args.fastq_dir, &args.forward_reads, &args.reverse_reads) {
        (Some(dir), _, _) => find_input_fastqs(dir, args.fastq_prefix.as_deref())?,
        (None, Some(fwd), Some(rev)) => vec![InputFastqs {
            forward: fwd.to_string_lossy().into_owned(),
            reverse: rev.to_string_lossy().into_owned(),
            index: args
                .index_reads
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
        }],
        _ => anyhow::bail!("--fastq-dir or both --forward-reads and --reverse-reads are required"),
    };

    let counts = demux::run(&inputs, samples, &config, &args.output_dir)?;
    info!(
        "assigned {} of {} read pairs",
        counts.total() - counts.unassigned(),
        counts.total()
    );

    RunSummary::new(&config, &counts).write_path(&args.summary_file)
}

fn run_command(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Demux(args) => run_demux(&args),
        Command::SampleNames(args) => {
            let samples = Sample::load_path(&args.barcode_file)?;
            write_sample_names(&samples, output(args.output_file.as_ref())?)
        }
        Command::MakeIndex(args) => {
            let reads = utils::open_with_gz(&args.reads)?;
            let n = make_index(reads, output(args.output_file.as_ref())?)
                .with_context(|| format!("error building index reads from {:?}", args.reads))?;
            info!("wrote {} index reads", n);
            Ok(())
        }
        Command::SplitLanes(args) => {
            let sheet = utils::open_with_gz(&args.sample_sheet)?;
            split_lanes(sheet, output(args.output_file.as_ref())?, &args.lane)
                .with_context(|| format!("error reading sample sheet {:?}", args.sample_sheet))?;
            Ok(())
        }
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run_command(Cli::parse())
}
