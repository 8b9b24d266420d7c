// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Match observed barcode sequences to samples. The `BarcodeIndex` is built
//! once per run and maps every accepted barcode sequence (the sample barcode
//! itself plus, optionally, all of its mismatch variants) to a sample. The
//! `BarcodeAssigner` looks observed sequences up in the index and keeps the
//! per-sample read counts.

use itertools::Itertools;
use log::{debug, info, warn};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use crate::iupac;
use crate::sample::Sample;
use crate::{DnabcError, UNASSIGNED};

/// All sequences that differ from `barcode` at exactly `mismatches` positions.
///
/// For each combination of `mismatches` positions, the bases at those
/// positions are replaced by the ambiguity code for "any base but this one",
/// and the masked sequence is expanded into its concrete sequences.
/// `barcode` must consist of `ACGT` only.
pub fn error_barcodes(barcode: &[u8], mismatches: usize) -> Result<Vec<Vec<u8>>, DnabcError> {
    if mismatches == 0 {
        return Ok(Vec::new());
    }
    iupac::ensure_upper_case_acgt(barcode)?;

    let mut res = Vec::new();
    for idx_set in (0..barcode.len()).combinations(mismatches) {
        let mut masked = barcode.to_vec();
        for idx in idx_set {
            // checked above, every position holds A, C, G or T
            if let Some(code) = iupac::any_base_except(masked[idx]) {
                masked[idx] = code;
            }
        }
        res.extend(iupac::deambiguate(&masked)?);
    }
    Ok(res)
}

/// Lookup table from barcode sequences to samples.
///
/// The key for each sample is its barcode, reverse complemented when
/// `revcomp` is set. With `mismatches > 0` every sequence at exactly that
/// Hamming distance from a key is added as well. No two samples may share a
/// key: any collision is reported when the index is built.
#[derive(Debug)]
pub struct BarcodeIndex {
    samples: Vec<Sample>,
    // sample index, and distance of the key from that sample's barcode
    barcodes: HashMap<Vec<u8>, (usize, usize)>,
    mismatches: usize,
    revcomp: bool,
}

impl BarcodeIndex {
    pub fn new(
        samples: Vec<Sample>,
        mismatches: usize,
        revcomp: bool,
    ) -> Result<BarcodeIndex, DnabcError> {
        let mut index = BarcodeIndex {
            samples: Vec::with_capacity(samples.len()),
            barcodes: HashMap::new(),
            mismatches,
            revcomp,
        };

        for sample in samples {
            index.add_sample(sample)?;
        }

        if index
            .samples
            .iter()
            .map(|s| s.barcode.len())
            .unique()
            .nth(1)
            .is_some()
        {
            warn!("sample barcodes do not all have the same length");
        }

        info!(
            "built barcode index: {} samples, {} barcode sequences ({} mismatches, revcomp: {})",
            index.samples.len(),
            index.barcodes.len(),
            mismatches,
            revcomp
        );
        Ok(index)
    }

    fn add_sample(&mut self, sample: Sample) -> Result<(), DnabcError> {
        let barcode = sample.barcode.as_bytes();
        if barcode.is_empty() {
            return Err(DnabcError::EmptySampleBarcode(sample.name));
        }
        iupac::ensure_upper_case_acgt(barcode)?;
        let key = if self.revcomp {
            iupac::reverse_complement(barcode)?
        } else {
            barcode.to_vec()
        };

        let sample_idx = self.samples.len();
        let variants = error_barcodes(&key, self.mismatches)?;
        debug!(
            "sample {}: key {}, {} mismatch variants",
            sample.name,
            String::from_utf8_lossy(&key),
            variants.len()
        );

        self.samples.push(sample);
        self.insert(key, sample_idx, 0)?;
        for variant in variants {
            self.insert(variant, sample_idx, self.mismatches)?;
        }
        Ok(())
    }

    /// Add `key` for a sample, at `distance` mismatches from its barcode.
    /// A collision is reported as a mismatch collision unless both keys are
    /// literal barcodes.
    fn insert(
        &mut self,
        key: Vec<u8>,
        sample_idx: usize,
        distance: usize,
    ) -> Result<(), DnabcError> {
        if let Some(&(existing, existing_distance)) = self.barcodes.get(&key) {
            return Err(DnabcError::DuplicateBarcode {
                barcode: String::from_utf8_lossy(&key).into_owned(),
                sample: self.samples[sample_idx].name.clone(),
                existing: self.samples[existing].name.clone(),
                mismatches: distance.max(existing_distance),
            });
        }
        self.barcodes.insert(key, (sample_idx, distance));
        Ok(())
    }

    /// Index of the sample whose barcode set contains `seq`, if any.
    /// The lookup is verbatim: no case folding or trimming.
    #[inline]
    pub fn get(&self, seq: &[u8]) -> Option<usize> {
        self.barcodes.get(seq).map(|&(i, _)| i)
    }

    /// The sample for `seq`, if any.
    pub fn get_sample(&self, seq: &[u8]) -> Option<&Sample> {
        self.get(seq).map(|i| &self.samples[i])
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of barcode sequences in the index.
    pub fn len(&self) -> usize {
        self.barcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.barcodes.is_empty()
    }

    pub fn mismatches(&self) -> usize {
        self.mismatches
    }

    pub fn revcomp(&self) -> bool {
        self.revcomp
    }
}

/// Number of read pairs assigned to each sample, plus the `unassigned` count.
/// Iteration and serialization follow sample order, with `unassigned` last.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadCounts {
    names: Vec<String>,
    // one slot per sample, followed by the unassigned slot
    counts: Vec<u64>,
}

impl ReadCounts {
    pub fn new(samples: &[Sample]) -> ReadCounts {
        ReadCounts {
            names: samples.iter().map(|s| s.name.clone()).collect(),
            counts: vec![0; samples.len() + 1],
        }
    }

    #[inline]
    fn increment(&mut self, sample_idx: Option<usize>) {
        let slot = sample_idx.unwrap_or(self.names.len());
        self.counts[slot] += 1;
    }

    /// Count for a sample name, or for `unassigned`.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }

    pub fn unassigned(&self) -> u64 {
        self.counts[self.names.len()]
    }

    /// Total number of read pairs seen.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(UNASSIGNED))
            .zip(self.counts.iter().copied())
    }
}

impl Serialize for ReadCounts {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (name, count) in self.iter() {
            map.serialize_entry(name, &count)?;
        }
        map.end()
    }
}

/// Assign observed barcode sequences to samples, counting every read pair
/// seen. Mismatch tolerance is entirely a property of the index, so each
/// assignment is a single hash lookup.
pub struct BarcodeAssigner {
    index: BarcodeIndex,
    read_counts: ReadCounts,
}

impl BarcodeAssigner {
    pub fn new(
        samples: Vec<Sample>,
        mismatches: usize,
        revcomp: bool,
    ) -> Result<BarcodeAssigner, DnabcError> {
        Ok(BarcodeAssigner::from_index(BarcodeIndex::new(
            samples, mismatches, revcomp,
        )?))
    }

    pub fn from_index(index: BarcodeIndex) -> BarcodeAssigner {
        let read_counts = ReadCounts::new(index.samples());
        BarcodeAssigner { index, read_counts }
    }

    /// Look up `seq` and count the outcome: the matching sample, or
    /// `unassigned` when there is no match.
    pub fn assign(&mut self, seq: &[u8]) -> Option<&Sample> {
        let hit = self.index.get(seq);
        self.read_counts.increment(hit);
        let samples = &self.index.samples;
        hit.map(|i| &samples[i])
    }

    pub fn index(&self) -> &BarcodeIndex {
        &self.index
    }

    pub fn read_counts(&self) -> &ReadCounts {
        &self.read_counts
    }

    pub fn into_read_counts(self) -> ReadCounts {
        self.read_counts
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::assert_equal;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert_eq, proptest};
    use std::collections::HashSet;

    fn counts(a: &BarcodeAssigner) -> Vec<(String, u64)> {
        a.read_counts()
            .iter()
            .map(|(n, c)| (n.to_string(), c))
            .collect()
    }

    fn expected(v: &[(&str, u64)]) -> Vec<(String, u64)> {
        v.iter().map(|(n, c)| (n.to_string(), *c)).collect()
    }

    #[test]
    fn test_error_barcodes() {
        let obs: HashSet<Vec<u8>> = error_barcodes(b"AGG", 1).unwrap().into_iter().collect();
        let exp: HashSet<Vec<u8>> = [
            b"CGG", b"GGG", b"TGG", b"AAG", b"ACG", b"ATG", b"AGA", b"AGC", b"AGT",
        ]
        .iter()
        .map(|s| s.to_vec())
        .collect();
        assert_eq!(obs, exp);
    }

    #[test]
    fn test_error_barcodes_edge_cases() {
        assert!(error_barcodes(b"AGG", 0).unwrap().is_empty());
        // more mismatches than positions: no combinations to enumerate
        assert!(error_barcodes(b"AG", 3).unwrap().is_empty());
        assert_eq!(error_barcodes(b"AG", 2).unwrap().len(), 9);
        assert!(error_barcodes(b"ANG", 1).is_err());
    }

    #[test]
    fn test_one_mismatch() {
        let s = Sample::new("Abc", "ACCTGAC");
        let mut a = BarcodeAssigner::new(vec![s.clone()], 1, true).unwrap();
        assert_eq!(counts(&a), expected(&[("Abc", 0), ("unassigned", 0)]));

        // 0 mismatches
        assert_eq!(a.assign(b"GTCAGGT"), Some(&s));
        assert_eq!(counts(&a), expected(&[("Abc", 1), ("unassigned", 0)]));

        // 1 mismatch
        assert_eq!(a.assign(b"GTCAAGT"), Some(&s));
        assert_eq!(counts(&a), expected(&[("Abc", 2), ("unassigned", 0)]));

        // 2 mismatches
        assert_eq!(a.assign(b"GTCAAAT"), None);
        assert_eq!(counts(&a), expected(&[("Abc", 2), ("unassigned", 1)]));
    }

    #[test]
    fn test_exact_match() {
        let samples = vec![Sample::new("a", "AAGGAAGG"), Sample::new("b", "ACGTACGC")];
        let index = BarcodeIndex::new(samples.clone(), 0, false).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get_sample(b"AAGGAAGG"), Some(&samples[0]));
        assert_eq!(index.get_sample(b"ACGTACGC"), Some(&samples[1]));
        assert_eq!(index.get_sample(b"aaggaagg"), None);
        assert_eq!(index.get_sample(b"AAGGAAGT"), None);

        let rc = BarcodeIndex::new(samples.clone(), 0, true).unwrap();
        assert_eq!(rc.get_sample(b"CCTTCCTT"), Some(&samples[0]));
        assert_eq!(rc.get_sample(b"GCGTACGT"), Some(&samples[1]));
        assert_eq!(rc.get_sample(b"AAGGAAGG"), None);
    }

    #[test]
    fn test_duplicate_barcode() {
        let samples = vec![Sample::new("a", "ACGT"), Sample::new("b", "ACGT")];
        assert_eq!(
            BarcodeIndex::new(samples, 0, false).unwrap_err(),
            DnabcError::DuplicateBarcode {
                barcode: "ACGT".to_string(),
                sample: "b".to_string(),
                existing: "a".to_string(),
                mismatches: 0,
            }
        );
    }

    #[test]
    fn test_mismatch_collision() {
        // AAAA and AAAT are one substitution apart
        let samples = vec![Sample::new("a", "AAAA"), Sample::new("b", "AAAT")];
        assert!(BarcodeIndex::new(samples.clone(), 0, false).is_ok());

        // the literal barcode of b is a 1-mismatch variant of a
        let err = BarcodeIndex::new(samples, 1, false).unwrap_err();
        assert_eq!(
            err,
            DnabcError::DuplicateBarcode {
                barcode: "AAAT".to_string(),
                sample: "b".to_string(),
                existing: "a".to_string(),
                mismatches: 1,
            }
        );
        assert_eq!(
            err.to_string(),
            "barcode AAAT for sample b matches barcode for sample a with 1 mismatches"
        );

        // two substitutions apart: the 1-mismatch neighbourhoods overlap
        let samples = vec![Sample::new("a", "AAAA"), Sample::new("b", "AATT")];
        assert!(matches!(
            BarcodeIndex::new(samples, 1, false),
            Err(DnabcError::DuplicateBarcode { mismatches: 1, .. })
        ));
    }

    #[test]
    fn test_literal_collision_message() {
        let samples = vec![Sample::new("a", "ACGT"), Sample::new("b", "ACGT")];
        assert_eq!(
            BarcodeIndex::new(samples, 1, true).unwrap_err().to_string(),
            "barcode ACGT for sample b is already used by sample a"
        );
    }

    #[test]
    fn test_empty_sample_barcode() {
        let samples = vec![Sample::new("a", ""), Sample::new("b", "ACGT")];
        for revcomp in [false, true] {
            assert_eq!(
                BarcodeIndex::new(samples.clone(), 0, revcomp).unwrap_err(),
                DnabcError::EmptySampleBarcode("a".to_string())
            );
        }
    }

    #[test]
    fn test_invalid_base_position() {
        // the first offending position is reported for either layout
        for revcomp in [false, true] {
            assert!(matches!(
                BarcodeIndex::new(vec![Sample::new("a", "ANNT")], 0, revcomp),
                Err(DnabcError::InvalidBase { base: 'N', position: 1, .. })
            ));
        }
    }

    #[test]
    fn test_invalid_base() {
        let samples = vec![Sample::new("a", "ACNT")];
        assert!(matches!(
            BarcodeIndex::new(samples.clone(), 0, true),
            Err(DnabcError::InvalidBase { base: 'N', position: 2, .. })
        ));
        assert!(matches!(
            BarcodeIndex::new(samples, 0, false),
            Err(DnabcError::InvalidBase { base: 'N', position: 2, .. })
        ));
    }

    #[test]
    fn test_empty_observed_barcode() {
        let mut a = BarcodeAssigner::new(vec![Sample::new("a", "ACGT")], 0, false).unwrap();
        assert_eq!(a.assign(b""), None);
        assert_eq!(a.read_counts().unassigned(), 1);
        assert_eq!(a.read_counts().get("a"), Some(0));
        assert_eq!(a.read_counts().total(), 1);
    }

    #[test]
    fn test_counts_json() {
        let samples = vec![Sample::new("b", "ACGT"), Sample::new("a", "TTTT")];
        let mut a = BarcodeAssigner::new(samples, 0, false).unwrap();
        a.assign(b"TTTT");
        a.assign(b"TTTT");
        a.assign(b"GGGG");
        assert_eq!(
            serde_json::to_string(a.read_counts()).unwrap(),
            r#"{"b":0,"a":2,"unassigned":1}"#
        );
    }

    fn n_choose_k(n: usize, k: usize) -> usize {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    proptest! {
        #[test]
        fn prop_test_error_barcodes(
            seq in "[ACGT]{1, 8}",
            k in 1usize..=3,
        ) {
            let variants = error_barcodes(seq.as_bytes(), k).unwrap();
            let expected = if k > seq.len() {
                0
            } else {
                n_choose_k(seq.len(), k) * 3usize.pow(k as u32)
            };
            prop_assert_eq!(variants.len(), expected);

            let distinct: HashSet<_> = variants.iter().collect();
            prop_assert_eq!(distinct.len(), expected);

            for v in &variants {
                let dist = seq
                    .bytes()
                    .zip_eq(v.iter().copied())
                    .filter(|(a, b)| a != b)
                    .count();
                prop_assert_eq!(dist, k);
            }
        }
    }

    #[test]
    fn test_error_barcode_order() {
        assert_equal(
            error_barcodes(b"GA", 1).unwrap(),
            vec![b"TA", b"CA", b"AA", b"GT", b"GC", b"GG"]
                .into_iter()
                .map(|s| s.to_vec()),
        );
    }
}
