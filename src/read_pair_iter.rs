// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Read a set of FASTQs, convert into an Iterator over ReadPairs and the
//! barcode sequence used to classify each of them.

use anyhow::{Context, Error};
use fastq::{self, RecordRefIter};
use log::warn;
use serde_derive::{Deserialize, Serialize};
use std::io::{BufRead, Read};
use std::path::Path;

use crate::read_pair::{ReadPair, ReadPart, WhichRead};
use crate::utils;

/// A set of corresponding FASTQ files: forward and reverse reads, and
/// optionally a separate index read file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct InputFastqs {
    pub forward: String,
    pub reverse: String,
    pub index: Option<String>,
}

impl InputFastqs {
    /// Barcodes read from a separate index file are the reverse complement
    /// of the sample barcodes; barcodes parsed from description lines are not.
    pub fn revcomp(&self) -> bool {
        self.index.is_some()
    }

    /// Open the paired read source matching the layout of these files.
    pub fn open(&self) -> Result<Box<dyn PairedReadSource>, Error> {
        match self.index {
            Some(ref index) => Ok(Box::new(IndexReadPairIter::from_paths(
                &self.forward,
                &self.reverse,
                index,
            )?)),
            None => Ok(Box::new(DescriptionReadPairIter::from_paths(
                &self.forward,
                &self.reverse,
            )?)),
        }
    }
}

/// A finite, non-restartable stream of read pairs, each paired with the
/// barcode sequence that decides its sample.
pub trait PairedReadSource {
    /// The next read pair and its barcode sequence, or `None` once any of
    /// the underlying streams is exhausted.
    fn next_pair(&mut self) -> Result<Option<(ReadPair, Vec<u8>)>, Error>;
}

impl<S: PairedReadSource + ?Sized> PairedReadSource for Box<S> {
    fn next_pair(&mut self) -> Result<Option<(ReadPair, Vec<u8>)>, Error> {
        (**self).next_pair()
    }
}

struct FastqStream<R: Read> {
    which: WhichRead,
    name: String,
    iter: RecordRefIter<R>,
}

/// Pulls one record from each FASTQ stream per step.
/// Iteration stops as soon as any stream is exhausted.
struct LockStepFastqs<R: Read> {
    streams: Vec<FastqStream<R>>,
    done: bool,
}

impl<R: Read> LockStepFastqs<R> {
    fn new(inputs: Vec<(WhichRead, String, R)>) -> LockStepFastqs<R> {
        let streams = inputs
            .into_iter()
            .map(|(which, name, rdr)| FastqStream {
                which,
                name,
                iter: fastq::Parser::new(rdr).ref_iter(),
            })
            .collect();
        LockStepFastqs {
            streams,
            done: false,
        }
    }

    fn get_next(&mut self) -> Result<Option<ReadPair>, Error> {
        if self.done {
            return Ok(None);
        }

        let mut rp = ReadPair::empty();
        let mut ended = Vec::new();

        for stream in self.streams.iter_mut() {
            stream
                .iter
                .advance()
                .with_context(|| format!("error reading FASTQ record from {}", stream.name))?;
            match stream.iter.get() {
                Some(record) => rp.push_read(&record, stream.which),
                None => ended.push(stream.name.clone()),
            }
        }

        if !ended.is_empty() {
            if ended.len() < self.streams.len() {
                // Unequal inputs are truncated to the shortest one
                warn!(
                    "FASTQ input ended early in {:?}, ignoring the remaining records",
                    ended
                );
            }
            self.done = true;
            return Ok(None);
        }

        Ok(Some(rp))
    }
}

/// Three-file layout (forward, reverse, index): the barcode of each pair
/// is the sequence of the corresponding index read.
pub struct IndexReadPairIter<R: Read = Box<dyn BufRead>> {
    streams: LockStepFastqs<R>,
}

impl<R: Read> IndexReadPairIter<R> {
    pub fn new(forward: R, reverse: R, index: R) -> IndexReadPairIter<R> {
        IndexReadPairIter {
            streams: LockStepFastqs::new(vec![
                (WhichRead::I1, "index reads".to_string(), index),
                (WhichRead::R1, "forward reads".to_string(), forward),
                (WhichRead::R2, "reverse reads".to_string(), reverse),
            ]),
        }
    }
}

impl IndexReadPairIter {
    /// Open a (possibly compressed) set of FASTQ files.
    pub fn from_paths(
        forward: impl AsRef<Path>,
        reverse: impl AsRef<Path>,
        index: impl AsRef<Path>,
    ) -> Result<IndexReadPairIter, Error> {
        Ok(IndexReadPairIter {
            streams: LockStepFastqs::new(vec![
                named_stream(WhichRead::I1, index)?,
                named_stream(WhichRead::R1, forward)?,
                named_stream(WhichRead::R2, reverse)?,
            ]),
        })
    }
}

impl<R: Read> PairedReadSource for IndexReadPairIter<R> {
    fn next_pair(&mut self) -> Result<Option<(ReadPair, Vec<u8>)>, Error> {
        Ok(self.streams.get_next()?.map(|rp| {
            let barcode = rp
                .get(WhichRead::I1, ReadPart::Seq)
                .map(|s| s.to_vec())
                .unwrap_or_default();
            (rp, barcode)
        }))
    }
}

/// Two-file layout (forward, reverse): the barcode of each pair is parsed
/// from the description line of the forward read.
pub struct DescriptionReadPairIter<R: Read = Box<dyn BufRead>> {
    streams: LockStepFastqs<R>,
}

impl<R: Read> DescriptionReadPairIter<R> {
    pub fn new(forward: R, reverse: R) -> DescriptionReadPairIter<R> {
        DescriptionReadPairIter {
            streams: LockStepFastqs::new(vec![
                (WhichRead::R1, "forward reads".to_string(), forward),
                (WhichRead::R2, "reverse reads".to_string(), reverse),
            ]),
        }
    }
}

impl DescriptionReadPairIter {
    /// Open a (possibly compressed) pair of FASTQ files.
    pub fn from_paths(
        forward: impl AsRef<Path>,
        reverse: impl AsRef<Path>,
    ) -> Result<DescriptionReadPairIter, Error> {
        Ok(DescriptionReadPairIter {
            streams: LockStepFastqs::new(vec![
                named_stream(WhichRead::R1, forward)?,
                named_stream(WhichRead::R2, reverse)?,
            ]),
        })
    }
}

impl<R: Read> PairedReadSource for DescriptionReadPairIter<R> {
    fn next_pair(&mut self) -> Result<Option<(ReadPair, Vec<u8>)>, Error> {
        Ok(self.streams.get_next()?.map(|rp| {
            let barcode = rp
                .get(WhichRead::R1, ReadPart::Header)
                .map(barcode_from_description)
                .unwrap_or_default();
            (rp, barcode)
        }))
    }
}

fn named_stream(
    which: WhichRead,
    path: impl AsRef<Path>,
) -> Result<(WhichRead, String, Box<dyn BufRead>), Error> {
    let path = path.as_ref();
    Ok((which, path.display().to_string(), utils::open_with_gz(path)?))
}

/// Parse the barcode sequence from a read description line.
///
/// bcl2fastq writes sequence identifiers of the form
/// `<instrument>:<run>:<flowcell>:<lane>:<tile>:<x>:<y> <read>:<filtered>:<control>:<barcode>`,
/// where a dual-index barcode is written as `<i7>+<i5>`. Everything after the
/// final colon is taken, with `+` and `-` separators removed. A description
/// without a colon is used whole; it will simply fail to match any sample.
pub fn barcode_from_description(desc: &[u8]) -> Vec<u8> {
    let tail = match desc.iter().rposition(|&c| c == b':') {
        Some(i) => &desc[i + 1..],
        None => desc,
    };
    tail.iter()
        .copied()
        .filter(|&c| c != b'+' && c != b'-')
        .collect()
}

macro_rules! impl_read_pair_iterator {
    ($t:ident) => {
        impl<R: Read> Iterator for $t<R> {
            type Item = Result<(ReadPair, Vec<u8>), Error>;

            fn next(&mut self) -> Option<Self::Item> {
                // Convert Result<Option<_>, Error> to Option<Result<_, Error>>
                self.next_pair().transpose()
            }
        }
    };
}

impl_read_pair_iterator!(IndexReadPairIter);
impl_read_pair_iterator!(DescriptionReadPairIter);
