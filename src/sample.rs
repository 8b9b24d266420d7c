// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Samples to demultiplex, and the tab-separated barcode file (manifest)
//! that defines them.

use anyhow::{Context, Error};
use itertools::Itertools;
use serde_derive::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::Path;

use crate::utils;
use crate::{DnabcError, UNASSIGNED};

/// One demultiplexable unit: a sample name and its barcode sequence.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Sample {
    pub name: String,
    pub barcode: String,
}

impl Sample {
    /// Barcodes are stored in upper case.
    pub fn new(name: impl Into<String>, barcode: impl AsRef<str>) -> Sample {
        Sample {
            name: name.into(),
            barcode: barcode.as_ref().to_uppercase(),
        }
    }

    /// Load and validate the samples of a barcode file. Sample names and
    /// barcodes must be unique, and no sample may use the reserved name
    /// `unassigned`.
    pub fn load<R: BufRead>(reader: R) -> Result<Vec<Sample>, Error> {
        let records = parse_barcode_file(reader)?;

        let dup_names: Vec<String> = records
            .iter()
            .map(|(n, _)| n)
            .duplicates()
            .cloned()
            .collect();
        if !dup_names.is_empty() {
            return Err(DnabcError::DuplicateSampleNames(dup_names).into());
        }

        let dup_bcs: Vec<String> = records
            .iter()
            .map(|(_, bc)| bc.to_uppercase())
            .duplicates()
            .collect();
        if !dup_bcs.is_empty() {
            return Err(DnabcError::DuplicateManifestBarcodes(dup_bcs).into());
        }

        if records.iter().any(|(n, _)| n == UNASSIGNED) {
            return Err(DnabcError::ReservedSampleName.into());
        }

        Ok(records
            .into_iter()
            .map(|(name, bc)| Sample::new(name, bc))
            .collect())
    }

    /// Load the samples from a (possibly compressed) barcode file on disk.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Vec<Sample>, Error> {
        let path = path.as_ref();
        let reader = utils::open_with_gz(path)?;
        Sample::load(reader).with_context(|| format!("error loading barcode file {:?}", path))
    }
}

/// Parse the (name, barcode) columns of a barcode file. Comment lines
/// starting with `#` and blank lines are skipped; extra columns are ignored.
pub fn parse_barcode_file<R: BufRead>(reader: R) -> Result<Vec<(String, String)>, Error> {
    let mut records = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let line_num = n + 1;
        let toks: Vec<&str> = line.split('\t').collect();
        if toks.len() < 2 {
            return Err(DnabcError::ManifestFields {
                line: line_num,
                fields: toks.iter().map(|t| t.to_string()).collect(),
            }
            .into());
        }
        if toks[0].is_empty() {
            return Err(DnabcError::EmptySampleName { line: line_num }.into());
        }
        if toks[1].is_empty() {
            return Err(DnabcError::EmptyBarcode { line: line_num }.into());
        }

        records.push((toks[0].to_string(), toks[1].to_string()));
    }

    Ok(records)
}

/// Write the name of each sample on its own line.
pub fn write_sample_names<W: Write>(samples: &[Sample], mut writer: W) -> Result<(), Error> {
    for s in samples {
        writeln!(writer, "{}", s.name)?;
    }
    writer.flush()?;
    Ok(())
}
