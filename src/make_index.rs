//! Rebuild an index-read FASTQ from the barcodes bcl2fastq writes into the
//! description lines of a forward-read FASTQ, so runs demultiplexed without
//! index files can be processed as if the index reads had been kept.

use anyhow::{Context, Error};
use fastq::{Parser, Record};
use std::io::{Read, Write};

use crate::iupac;
use crate::read_pair_iter::barcode_from_description;
use crate::DnabcError;

/// Quality character written for every synthetic index base.
pub const INDEX_QUAL: u8 = b'E';

/// Reverse complement of a barcode as written by the sequencer: uncalled
/// bases (`N`) stay uncalled.
fn reverse_complement_called(barcode: &[u8]) -> Result<Vec<u8>, DnabcError> {
    barcode
        .iter()
        .enumerate()
        .rev()
        .map(|(i, &b)| match b {
            b'N' => Ok(b'N'),
            _ => iupac::complement(b).ok_or_else(|| DnabcError::InvalidBase {
                base: b as char,
                position: i,
                sequence: String::from_utf8_lossy(barcode).into_owned(),
            }),
        })
        .collect()
}

/// Write one index record per record of `reads`. Returns the number of
/// records written.
pub fn make_index<R: Read, W: Write>(reads: R, mut writer: W) -> Result<u64, Error> {
    let mut iter = Parser::new(reads).ref_iter();
    let mut n = 0;

    loop {
        iter.advance().context("error reading FASTQ record")?;
        let rec = match iter.get() {
            Some(rec) => rec,
            None => break,
        };

        let barcode = barcode_from_description(rec.head());
        let seq = reverse_complement_called(&barcode).with_context(|| {
            format!("bad barcode in read {}", String::from_utf8_lossy(rec.head()))
        })?;

        writer.write_all(b"@")?;
        writer.write_all(rec.head())?;
        writer.write_all(b"\n")?;
        writer.write_all(&seq)?;
        writer.write_all(b"\n+\n")?;
        writer.write_all(&vec![INDEX_QUAL; seq.len()])?;
        writer.write_all(b"\n")?;
        n += 1;
    }

    writer.flush()?;
    Ok(n)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_make_index() {
        let reads = "@r1 1:N:0:AAGG+ACGN\nGACTG\n+\nIIIII\n@r2 1:N:0:GGCT\nTT\n+\nII\n";
        let mut out = Vec::new();
        assert_eq!(make_index(reads.as_bytes(), &mut out).unwrap(), 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "@r1 1:N:0:AAGG+ACGN\nNCGTCCTT\n+\nEEEEEEEE\n@r2 1:N:0:GGCT\nAGCC\n+\nEEEE\n"
        );
    }

    #[test]
    fn test_make_index_empty() {
        let mut out = Vec::new();
        assert_eq!(make_index("".as_bytes(), &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_make_index_bad_barcode() {
        let reads = "@r1 1:N:0:ACGR\nGACTG\n+\nIIIII\n";
        assert!(make_index(reads.as_bytes(), Vec::new()).is_err());
    }

    #[test]
    fn test_called_bases() {
        assert_eq!(reverse_complement_called(b"ANCG").unwrap(), b"CGNT".to_vec());
        assert!(reverse_complement_called(b"AYCG").is_err());
    }
}
