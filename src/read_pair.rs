// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Container for the FASTQ data from a single sequencing 'cluster':
//! the forward 'R1' and reverse 'R2' reads, and the 'I1' index read when
//! the run has a separate index file.

use fastq::{OwnedRecord, Record};
use serde_derive::{Deserialize, Serialize};
use std::io::{self, Write};

/// Pointers into a buffer that identify the positions of lines from a FASTQ record
/// header exists at buf[start .. head], seq exists at buf[head .. seq], etc.
#[derive(Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct ReadOffset {
    exists: bool,
    start: u32,
    head: u32,
    seq: u32,
    qual: u32,
}

/// The reads of a cluster. R1 and R2 are the forward and reverse reads,
/// I1 is the sample index read.
#[derive(Serialize, Deserialize, Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum WhichRead {
    R1 = 0,
    R2 = 1,
    I1 = 2,
}

impl WhichRead {
    pub fn read_types() -> [WhichRead; 3] {
        [WhichRead::R1, WhichRead::R2, WhichRead::I1]
    }
}

/// Components of a FASTQ record.
#[derive(Debug, Copy, Clone)]
pub enum ReadPart {
    Header,
    Seq,
    Qual,
}

/// Container for all read data from a single cluster. Faithfully represents
/// the FASTQ data from all available reads. Headers are stored without the
/// leading `@`. Generally should be created by a paired read source.
#[derive(Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub struct ReadPair {
    offsets: [ReadOffset; 3],

    // Single vector with all the raw FASTQ data
    data: Vec<u8>,
}

impl ReadPair {
    // Make space for the full read pair in one allocation
    const RP_CAPACITY: usize = 1024;

    pub(crate) fn empty() -> ReadPair {
        ReadPair {
            offsets: [ReadOffset::default(); 3],
            data: Vec::with_capacity(Self::RP_CAPACITY),
        }
    }

    pub fn new_by_part<R: Record>(r1: Option<R>, r2: Option<R>, i1: Option<R>) -> ReadPair {
        let mut rp = ReadPair::empty();
        for (rec, which) in [r1, r2, i1].iter().zip(WhichRead::read_types().iter()) {
            if let Some(ref rec) = *rec {
                rp.push_read(rec, *which);
            }
        }
        rp
    }

    pub(crate) fn push_read<R: Record>(&mut self, rec: &R, which: WhichRead) {
        let buf = &mut self.data;

        let start = buf.len() as u32;
        buf.extend_from_slice(rec.head());
        let head = buf.len() as u32;
        buf.extend_from_slice(rec.seq());
        let seq = buf.len() as u32;
        buf.extend_from_slice(rec.qual());
        let qual = buf.len() as u32;
        self.offsets[which as usize] = ReadOffset {
            exists: true,
            start,
            head,
            seq,
            qual,
        };
    }

    #[inline]
    /// Get a ReadPart `part` from a read `which` in this cluster
    pub fn get(&self, which: WhichRead, part: ReadPart) -> Option<&[u8]> {
        let w = self.offsets[which as usize];
        if w.exists {
            match part {
                ReadPart::Header => Some(&self.data[w.start as usize..w.head as usize]),
                ReadPart::Seq => Some(&self.data[w.head as usize..w.seq as usize]),
                ReadPart::Qual => Some(&self.data[w.seq as usize..w.qual as usize]),
            }
        } else {
            None
        }
    }

    /// Copy read `which` out into a standalone record.
    pub fn to_owned_record(&self, which: WhichRead) -> Option<OwnedRecord> {
        Some(OwnedRecord {
            head: self.get(which, ReadPart::Header)?.to_vec(),
            seq: self.get(which, ReadPart::Seq)?.to_vec(),
            sep: None,
            qual: self.get(which, ReadPart::Qual)?.to_vec(),
        })
    }

    /// Write read `which` as a four-line FASTQ record. Absent reads write nothing.
    pub fn write_fastq<W: Write>(&self, which: WhichRead, writer: &mut W) -> io::Result<()> {
        if let (Some(head), Some(seq), Some(qual)) = (
            self.get(which, ReadPart::Header),
            self.get(which, ReadPart::Seq),
            self.get(which, ReadPart::Qual),
        ) {
            writer.write_all(b"@")?;
            writer.write_all(head)?;
            writer.write_all(b"\n")?;
            writer.write_all(seq)?;
            writer.write_all(b"\n+\n")?;
            writer.write_all(qual)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write read `which` as a two-line FASTA record. Absent reads write nothing.
    pub fn write_fasta<W: Write>(&self, which: WhichRead, writer: &mut W) -> io::Result<()> {
        if let (Some(head), Some(seq)) = (
            self.get(which, ReadPart::Header),
            self.get(which, ReadPart::Seq),
        ) {
            writer.write_all(b">")?;
            writer.write_all(head)?;
            writer.write_all(b"\n")?;
            writer.write_all(seq)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}
