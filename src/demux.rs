//! Drive a demultiplexing run: pull read pairs from a paired read source,
//! assign each to a sample by barcode, and route it to that sample's output.

use anyhow::{bail, Context, Error};
use log::{error, info};
use std::path::Path;

use crate::barcode::{BarcodeAssigner, ReadCounts};
use crate::config::Config;
use crate::read_pair_iter::{InputFastqs, PairedReadSource};
use crate::read_pair_writer::OutputRouter;
use crate::sample::Sample;

/// Owns the assigner and the output router for the duration of a run.
/// Read pairs are processed strictly in order, one at a time.
pub struct Demultiplexer {
    assigner: BarcodeAssigner,
    router: OutputRouter,
}

impl Demultiplexer {
    pub fn new(assigner: BarcodeAssigner, router: OutputRouter) -> Demultiplexer {
        Demultiplexer { assigner, router }
    }

    /// Demultiplex every read pair of `source`. Returns the number of pairs
    /// processed. Counts accumulate across calls.
    pub fn process<S: PairedReadSource + ?Sized>(&mut self, source: &mut S) -> Result<u64, Error> {
        let mut n = 0;
        while let Some((read_pair, barcode)) = source.next_pair()? {
            let sample = self.assigner.assign(&barcode);
            self.router.write(&read_pair, sample)?;
            n += 1;
        }
        Ok(n)
    }

    pub fn read_counts(&self) -> &ReadCounts {
        self.assigner.read_counts()
    }

    /// Close all output files and return the final read counts.
    pub fn finish(self) -> Result<ReadCounts, Error> {
        self.router.close()?;
        Ok(self.assigner.into_read_counts())
    }

    /// Close all output files after a failed run, keeping the original error.
    fn abort(self, err: Error) -> Error {
        if let Err(close_err) = self.router.close() {
            error!("error closing output files: {:#}", close_err);
        }
        err
    }
}

/// Demultiplex a single paired read source. The router is closed on every
/// exit path.
pub fn demultiplex<S: PairedReadSource + ?Sized>(
    source: &mut S,
    assigner: BarcodeAssigner,
    router: OutputRouter,
) -> Result<ReadCounts, Error> {
    let mut demux = Demultiplexer::new(assigner, router);
    match demux.process(source) {
        Ok(_) => demux.finish(),
        Err(e) => Err(demux.abort(e)),
    }
}

/// Demultiplex one or more sets of input FASTQs into `output_dir`.
///
/// All input sets must share a layout, since the layout decides whether
/// sample barcodes are reverse complemented. The barcode index is built, and
/// any configuration error reported, before the output directory is created
/// or any read is processed.
pub fn run(
    inputs: &[InputFastqs],
    samples: Vec<Sample>,
    config: &Config,
    output_dir: impl AsRef<Path>,
) -> Result<ReadCounts, Error> {
    let output_dir = output_dir.as_ref();

    let revcomp = match inputs.first() {
        Some(f) => f.revcomp(),
        None => bail!("no input FASTQ files given"),
    };
    if inputs.iter().any(|f| f.revcomp() != revcomp) {
        bail!("input FASTQ sets mix runs with and without index read files");
    }

    config.validate()?;
    info!("demultiplexing {} samples", samples.len());
    let assigner = BarcodeAssigner::new(samples, config.mismatches, revcomp)?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("error creating output directory {:?}", output_dir))?;
    let router = config.output_format.router(output_dir);

    let mut demux = Demultiplexer::new(assigner, router);
    for fastqs in inputs {
        info!("processing {:?}", fastqs);
        let processed = fastqs
            .open()
            .and_then(|mut source| demux.process(&mut source));
        match processed {
            Ok(n) => info!("processed {} read pairs", n),
            Err(e) => return Err(demux.abort(e)),
        }
    }

    let counts = demux.finish()?;
    for (name, count) in counts.iter() {
        info!("{}: {} read pairs", name, count);
    }
    Ok(counts)
}
