//! Route `ReadPair` objects to per-sample FASTA or FASTQ files.

use anyhow::{Context, Error};
use log::debug;
use serde_derive::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::read_pair::{ReadPair, WhichRead};
use crate::sample::Sample;
use crate::utils;

/// Output file layout for demultiplexed reads.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum OutputFormat {
    /// One FASTA file per sample holding the forward read of each pair.
    #[serde(rename = "fasta")]
    Fasta,
    /// Two FASTQ files per sample, one for forward and one for reverse reads.
    #[default]
    #[serde(rename = "fastq", alias = "fastq-paired")]
    FastqPaired,
}

impl OutputFormat {
    /// Create the router writing this format into `output_dir`.
    pub fn router(self, output_dir: impl AsRef<Path>) -> OutputRouter {
        OutputRouter::new(self, output_dir)
    }

    /// Output paths for `sample`, in the order the streams are opened.
    pub fn sample_paths(self, output_dir: &Path, sample_name: &str) -> Vec<PathBuf> {
        match self {
            OutputFormat::Fasta => vec![output_dir.join(fasta_name(sample_name))],
            OutputFormat::FastqPaired => {
                let (r1, r2) = fastq_paired_names(sample_name);
                vec![output_dir.join(r1), output_dir.join(r2)]
            }
        }
    }
}

fn fasta_name(sample_name: &str) -> String {
    format!("PCMP{}.fasta", sample_name)
}

fn fastq_paired_names(sample_name: &str) -> (String, String) {
    (
        format!("PCMP_{}_R1.fastq", sample_name),
        format!("PCMP_{}_R2.fastq", sample_name),
    )
}

type Stream = (PathBuf, BufWriter<File>);

enum SampleStreams {
    Fasta(Stream),
    FastqPaired(Stream, Stream),
}

impl SampleStreams {
    fn open(format: OutputFormat, output_dir: &Path, sample_name: &str) -> Result<Self, Error> {
        let open = |path: PathBuf| -> Result<Stream, Error> {
            let w = utils::create_buffered(&path)?;
            debug!("opened output file {:?}", path);
            Ok((path, w))
        };
        Ok(match format {
            OutputFormat::Fasta => {
                SampleStreams::Fasta(open(output_dir.join(fasta_name(sample_name)))?)
            }
            OutputFormat::FastqPaired => {
                let (r1, r2) = fastq_paired_names(sample_name);
                SampleStreams::FastqPaired(open(output_dir.join(r1))?, open(output_dir.join(r2))?)
            }
        })
    }

    fn write(&mut self, rec: &ReadPair) -> Result<(), Error> {
        match self {
            SampleStreams::Fasta((p, w)) => rec
                .write_fasta(WhichRead::R1, w)
                .with_context(|| format!("error writing fasta record to file: {:?}", p)),
            SampleStreams::FastqPaired((p1, w1), (p2, w2)) => {
                rec.write_fastq(WhichRead::R1, w1)
                    .with_context(|| format!("error writing fastq record to file: {:?}", p1))?;
                rec.write_fastq(WhichRead::R2, w2)
                    .with_context(|| format!("error writing fastq record to file: {:?}", p2))
            }
        }
    }

    fn close(self) -> Result<(), Error> {
        let streams = match self {
            SampleStreams::Fasta(s) => vec![s],
            SampleStreams::FastqPaired(s1, s2) => vec![s1, s2],
        };
        let mut res = Ok(());
        for (p, mut w) in streams {
            let flushed = w
                .flush()
                .with_context(|| format!("error closing output file: {:?}", p));
            if res.is_ok() {
                res = flushed;
            }
        }
        res
    }
}

/// Writes each read pair to the output files of its sample.
///
/// Files are opened lazily on the first pair written for a sample, so a
/// sample without reads never gets a file. `close` flushes and releases
/// every opened file exactly once; dropping the router without closing it
/// still releases the file handles.
pub struct OutputRouter {
    format: OutputFormat,
    output_dir: PathBuf,
    open_files: HashMap<String, SampleStreams>,
    // sample names in the order their files were opened
    open_order: Vec<String>,
}

impl OutputRouter {
    pub fn new(format: OutputFormat, output_dir: impl AsRef<Path>) -> OutputRouter {
        OutputRouter {
            format,
            output_dir: output_dir.as_ref().to_path_buf(),
            open_files: HashMap::new(),
            open_order: Vec::new(),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Output paths for `sample`, whether or not they have been opened.
    pub fn sample_paths(&self, sample: &Sample) -> Vec<PathBuf> {
        self.format.sample_paths(&self.output_dir, &sample.name)
    }

    /// Write `rec` to the files of `sample`. Pairs without a sample are dropped.
    pub fn write(&mut self, rec: &ReadPair, sample: Option<&Sample>) -> Result<(), Error> {
        let sample = match sample {
            Some(s) => s,
            None => return Ok(()),
        };

        let streams = match self.open_files.entry(sample.name.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let streams = SampleStreams::open(self.format, &self.output_dir, &sample.name)?;
                self.open_order.push(sample.name.clone());
                e.insert(streams)
            }
        };
        streams.write(rec)
    }

    /// Flush and close every opened file, in the order they were opened.
    /// All files are closed even if one of them fails; the first error is
    /// returned.
    pub fn close(mut self) -> Result<(), Error> {
        let mut res = Ok(());
        for name in std::mem::take(&mut self.open_order) {
            if let Some(streams) = self.open_files.remove(&name) {
                let closed = streams.close();
                if res.is_ok() {
                    res = closed;
                }
            }
        }
        res
    }
}
