// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! IUPAC nucleotide ambiguity codes, and the sequence transforms built on them:
//! reverse complementation of concrete sequences and expansion of ambiguous
//! sequences into every concrete sequence they represent.

use itertools::Itertools;

use crate::DnabcError;

const UPPER_ACGT: &[u8; 4] = b"ACGT";

/// The set of unambiguous bases represented by an IUPAC code, or `None` if
/// `code` is not an (upper case) IUPAC nucleotide code.
pub fn bases(code: u8) -> Option<&'static [u8]> {
    let b: &'static [u8] = match code {
        b'T' => b"T",
        b'C' => b"C",
        b'A' => b"A",
        b'G' => b"G",
        b'R' => b"AG",
        b'Y' => b"TC",
        b'M' => b"CA",
        b'K' => b"TG",
        b'S' => b"CG",
        b'W' => b"TA",
        b'H' => b"TCA",
        b'B' => b"TCG",
        b'V' => b"CAG",
        b'D' => b"TAG",
        b'N' => b"TCAG",
        _ => return None,
    };
    Some(b)
}

/// The IUPAC code covering every base *except* `base`.
/// `A -> B`, `C -> D`, `G -> H`, `T -> V`.
pub fn any_base_except(base: u8) -> Option<u8> {
    match base {
        b'T' => Some(b'V'),
        b'C' => Some(b'D'),
        b'A' => Some(b'B'),
        b'G' => Some(b'H'),
        _ => None,
    }
}

/// Watson-Crick complement of an unambiguous base.
pub fn complement(base: u8) -> Option<u8> {
    match base {
        b'T' => Some(b'A'),
        b'C' => Some(b'G'),
        b'A' => Some(b'T'),
        b'G' => Some(b'C'),
        _ => None,
    }
}

fn invalid_base(seq: &[u8], position: usize) -> DnabcError {
    DnabcError::InvalidBase {
        base: seq[position] as char,
        position,
        sequence: String::from_utf8_lossy(seq).into_owned(),
    }
}

/// Make sure that the input contains only upper case "ACGT" characters.
/// The error describes the position of the first offending character.
pub fn ensure_upper_case_acgt(seq: &[u8]) -> Result<(), DnabcError> {
    match seq.iter().position(|c| !UPPER_ACGT.contains(c)) {
        Some(i) => Err(invalid_base(seq, i)),
        None => Ok(()),
    }
}

/// Reverse complement of a sequence over `{A,C,G,T}`. Ambiguity codes are
/// rejected with `DnabcError::InvalidBase`, reporting the first one.
pub fn reverse_complement(seq: &[u8]) -> Result<Vec<u8>, DnabcError> {
    seq.iter()
        .enumerate()
        .map(|(i, &b)| complement(b).ok_or_else(|| invalid_base(seq, i)))
        .collect::<Result<Vec<u8>, _>>()
        .map(|mut rc| {
            rc.reverse();
            rc
        })
}

/// Expand a sequence of IUPAC codes into all concrete sequences it represents:
/// the cartesian product of the base sets at each position. Positions holding
/// unambiguous bases contribute a single choice, so the output never contains
/// duplicates.
pub fn deambiguate(seq: &[u8]) -> Result<Vec<Vec<u8>>, DnabcError> {
    let choices = seq
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            bases(c).ok_or_else(|| DnabcError::InvalidCode {
                code: c as char,
                position: i,
                sequence: String::from_utf8_lossy(seq).into_owned(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // the product over zero positions is the single empty sequence
    if choices.is_empty() {
        return Ok(vec![Vec::new()]);
    }

    Ok(choices
        .into_iter()
        .map(|c| c.iter().copied())
        .multi_cartesian_product()
        .collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::{prop_assert, prop_assert_eq, proptest};
    use std::collections::HashSet;

    fn expand_set(seq: &[u8]) -> HashSet<Vec<u8>> {
        deambiguate(seq).unwrap().into_iter().collect()
    }

    fn set_of(seqs: &[&[u8]]) -> HashSet<Vec<u8>> {
        seqs.iter().map(|s| s.to_vec()).collect()
    }

    #[test]
    fn test_deambiguate() {
        assert_eq!(
            expand_set(b"AYGR"),
            set_of(&[b"ACGA", b"ACGG", b"ATGA", b"ATGG"])
        );
        assert_eq!(
            expand_set(b"AGN"),
            set_of(&[b"AGA", b"AGC", b"AGG", b"AGT"])
        );
    }

    #[test]
    fn test_deambiguate_plain() {
        assert_eq!(deambiguate(b"ACGT").unwrap(), vec![b"ACGT".to_vec()]);
        assert_eq!(deambiguate(b"").unwrap(), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_deambiguate_invalid() {
        assert_eq!(
            deambiguate(b"ACXT"),
            Err(DnabcError::InvalidCode {
                code: 'X',
                position: 2,
                sequence: "ACXT".to_string()
            })
        );
        assert!(deambiguate(b"acgt").is_err());
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AGATC").unwrap(), b"GATCT".to_vec());
        assert_eq!(reverse_complement(b"").unwrap(), Vec::<u8>::new());
        assert_eq!(
            reverse_complement(b"ANCC"),
            Err(DnabcError::InvalidBase {
                base: 'N',
                position: 1,
                sequence: "ANCC".to_string()
            })
        );
        assert!(matches!(
            reverse_complement(b"ANNT"),
            Err(DnabcError::InvalidBase { position: 1, .. })
        ));
    }

    #[test]
    fn test_any_base_except() {
        for &b in UPPER_ACGT {
            let code = any_base_except(b).unwrap();
            let expected: HashSet<u8> = UPPER_ACGT.iter().copied().filter(|&x| x != b).collect();
            assert_eq!(bases(code).unwrap().iter().copied().collect::<HashSet<_>>(), expected);
        }
        assert_eq!(any_base_except(b'N'), None);
    }

    #[test]
    fn test_ensure_acgt() {
        assert!(ensure_upper_case_acgt(b"ACGTTGCA").is_ok());
        assert!(ensure_upper_case_acgt(b"ACgT").is_err());
        assert!(ensure_upper_case_acgt(b"ACNT").is_err());
    }

    proptest! {
        #[test]
        fn prop_test_deambiguate_count(
            seq in "[ACGTRYMKSWHBVDN]{0, 8}",
        ) {
            let expected: usize = seq
                .bytes()
                .map(|c| bases(c).unwrap().len())
                .product();
            let expanded = deambiguate(seq.as_bytes()).unwrap();
            prop_assert_eq!(expanded.len(), expected);

            let distinct: HashSet<_> = expanded.iter().collect();
            prop_assert_eq!(distinct.len(), expected);

            for s in &expanded {
                prop_assert_eq!(s.len(), seq.len());
                prop_assert!(ensure_upper_case_acgt(s).is_ok());
            }
        }

        #[test]
        fn prop_test_revcomp_involution(
            seq in "[ACGT]{0, 40}",
        ) {
            let rc = reverse_complement(seq.as_bytes()).unwrap();
            prop_assert_eq!(reverse_complement(&rc).unwrap(), seq.as_bytes().to_vec());
        }

        #[test]
        fn prop_test_revcomp_rejects_ambiguous(
            prefix in "[ACGT]{0, 10}",
            code in "[RYMKSWHBVDN]",
            suffix in "[ACGT]{0, 10}",
        ) {
            let seq = format!("{}{}{}", prefix, code, suffix);
            prop_assert!(reverse_complement(seq.as_bytes()).is_err());
        }
    }
}
