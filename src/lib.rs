// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Demultiplex pooled, paired-end DNA sequencing data.
//!
//! Each sample in a run is identified by a short DNA barcode. Read pairs are
//! pulled in lock-step from a set of FASTQ files, the barcode of each pair is
//! looked up in a pre-expanded `BarcodeIndex`, and the pair is routed to the
//! output files of the matching sample. Pairs whose barcode matches no sample
//! are counted as `unassigned` and dropped.

use thiserror::Error;

pub mod barcode;
pub mod config;
pub mod demux;
pub mod filenames;
pub mod iupac;
pub mod make_index;
pub mod read_pair;
pub mod read_pair_iter;
pub mod read_pair_writer;
pub mod sample;
pub mod sample_sheet;
pub mod summary;
pub mod utils;

pub use barcode::{BarcodeAssigner, BarcodeIndex, ReadCounts};
pub use config::Config;
pub use read_pair::{ReadPair, ReadPart, WhichRead};
pub use read_pair_iter::{InputFastqs, PairedReadSource};
pub use read_pair_writer::{OutputFormat, OutputRouter};
pub use sample::Sample;

/// Name under which reads that match no sample are counted.
pub const UNASSIGNED: &str = "unassigned";

/// Configuration and setup failures. All of these are raised before the first
/// read pair is classified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnabcError {
    #[error("invalid base '{base}' at position {position} in sequence {sequence}")]
    InvalidBase {
        base: char,
        position: usize,
        sequence: String,
    },

    #[error("invalid nucleotide code '{code}' at position {position} in sequence {sequence}")]
    InvalidCode {
        code: char,
        position: usize,
        sequence: String,
    },

    #[error("{}", duplicate_barcode_message(.barcode, .sample, .existing, .mismatches))]
    DuplicateBarcode {
        barcode: String,
        sample: String,
        existing: String,
        mismatches: usize,
    },

    #[error("duplicate sample names: {0:?}")]
    DuplicateSampleNames(Vec<String>),

    #[error("duplicate barcodes: {0:?}")]
    DuplicateManifestBarcodes(Vec<String>),

    #[error("a sample can not be called {}", UNASSIGNED)]
    ReservedSampleName,

    #[error("empty sample name in barcode file (line {line})")]
    EmptySampleName { line: usize },

    #[error("empty barcode in barcode file (line {line})")]
    EmptyBarcode { line: usize },

    #[error("sample {0} has an empty barcode")]
    EmptySampleBarcode(String),

    #[error("not enough fields in barcode file (line {line}): {fields:?}")]
    ManifestFields { line: usize, fields: Vec<String> },

    #[error("only 0 mismatches allowed (got {0})")]
    UnsupportedMismatches(usize),

    #[error("no FASTQ files with prefix {prefix:?} found in {dir}")]
    NoFastqsFound { dir: String, prefix: String },
}

fn duplicate_barcode_message(
    barcode: &str,
    sample: &str,
    existing: &str,
    mismatches: &usize,
) -> String {
    if *mismatches == 0 {
        format!(
            "barcode {} for sample {} is already used by sample {}",
            barcode, sample, existing
        )
    } else {
        format!(
            "barcode {} for sample {} matches barcode for sample {} with {} mismatches",
            barcode, sample, existing, mismatches
        )
    }
}
