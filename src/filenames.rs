//! Find sets of paired FASTQ files on disk, using the Illumina `bcl2fastq`
//! naming conventions.

use anyhow::Error;
use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::read_pair_iter::InputFastqs;
use crate::DnabcError;

lazy_static! {
    static ref BCL2FASTQ_REGEX: Regex = Regex::new(
        r"^([A-Za-z0-9_-]+)_S([0-9]+)_L([0-9]+)_([RI][12])_([0-9]+)\.fastq(\.gz)?$"
    )
    .unwrap();
    static ref BCL2FASTQ_NO_LANE_SPLIT_REGEX: Regex =
        Regex::new(r"^([A-Za-z0-9_-]+)_S([0-9]+)_([RI][12])_([0-9]+)\.fastq(\.gz)?$").unwrap();
}

#[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LaneMode {
    NoLaneSplitting,
    SingleLane(usize),
}

/// A parsed representation of a FASTQ file name produced by bcl2fastq,
/// e.g. `Undetermined_S0_L001_R1_001.fastq.gz`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IlmnFastqFile {
    pub sample: String,
    pub s: usize,
    pub lane_mode: LaneMode,
    pub chunk: usize,
    pub read: String,
    pub path: PathBuf,
}

impl IlmnFastqFile {
    /// Attempt to parse `path` as a bcl2fastq FASTQ file name.
    pub fn new(path: impl AsRef<Path>) -> Option<IlmnFastqFile> {
        let path = path.as_ref();
        let f = path.file_name()?.to_str()?;

        if let Some(cap) = BCL2FASTQ_REGEX.captures(f) {
            return Some(IlmnFastqFile {
                sample: cap.get(1)?.as_str().to_string(),
                s: cap.get(2)?.as_str().parse().ok()?,
                lane_mode: LaneMode::SingleLane(cap.get(3)?.as_str().parse().ok()?),
                read: cap.get(4)?.as_str().to_string(),
                chunk: cap.get(5)?.as_str().parse().ok()?,
                path: path.into(),
            });
        }

        let cap = BCL2FASTQ_NO_LANE_SPLIT_REGEX.captures(f)?;
        Some(IlmnFastqFile {
            sample: cap.get(1)?.as_str().to_string(),
            s: cap.get(2)?.as_str().parse().ok()?,
            lane_mode: LaneMode::NoLaneSplitting,
            read: cap.get(3)?.as_str().to_string(),
            chunk: cap.get(4)?.as_str().parse().ok()?,
            path: path.into(),
        })
    }

    fn group_key(&self) -> (String, usize, LaneMode, usize) {
        (self.sample.clone(), self.s, self.lane_mode, self.chunk)
    }
}

fn get_bcl2fastq_files(path: &Path) -> Result<Vec<IlmnFastqFile>, Error> {
    let mut res = Vec::new();
    for entry in std::fs::read_dir(path)? {
        if let Some(parsed) = IlmnFastqFile::new(entry?.path()) {
            res.push(parsed);
        }
    }
    Ok(res)
}

/// Find the sets of bcl2fastq FASTQ files in `dir`. Matching R1, R2 and I1
/// files are grouped into one `InputFastqs` per sample, lane and chunk. When
/// `prefix` is given, only files whose sample part equals it are used.
///
/// Groups lacking an R1 or R2 file are skipped with a warning. The result is
/// sorted by sample, lane and chunk; it is an error if it would be empty.
pub fn find_input_fastqs(
    dir: impl AsRef<Path>,
    prefix: Option<&str>,
) -> Result<Vec<InputFastqs>, Error> {
    let dir = dir.as_ref();
    let mut files: Vec<_> = get_bcl2fastq_files(dir)?
        .into_iter()
        .filter(|f| prefix.map_or(true, |p| f.sample == p))
        .collect();
    files.sort();

    let mut res = Vec::new();
    for (key, group) in &files.iter().group_by(|f| f.group_key()) {
        let group: Vec<_> = group.collect();
        let find = |read: &str| {
            group
                .iter()
                .find(|f| f.read == read)
                .map(|f| f.path.to_string_lossy().into_owned())
        };

        match (find("R1"), find("R2")) {
            (Some(forward), Some(reverse)) => {
                let fastqs = InputFastqs {
                    forward,
                    reverse,
                    index: find("I1"),
                };
                debug!("found input fastqs {:?}", fastqs);
                res.push(fastqs);
            }
            _ => warn!("skipping incomplete set of FASTQ files for {:?}", key),
        }
    }

    if res.is_empty() {
        return Err(DnabcError::NoFastqsFound {
            dir: dir.to_string_lossy().into_owned(),
            prefix: prefix.unwrap_or("").to_string(),
        }
        .into());
    }
    Ok(res)
}
