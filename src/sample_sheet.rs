//! Convert one lane of an Illumina sample sheet into a barcode manifest.

use anyhow::Error;
use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use std::io::{Read, Write};

const LANE_COL: usize = 1;
const SAMPLE_COL: usize = 2;
const BARCODE_COL: usize = 4;

/// Read the sample sheet CSV from `reader` and write a tab-separated manifest
/// for the samples on `lane`: the sample name with spaces removed, and the
/// barcode with `-` separators removed. Rows too short to hold a barcode,
/// such as the section headers of the sheet, are skipped. Returns the number
/// of samples written.
pub fn split_lanes<R: Read, W: Write>(reader: R, writer: W, lane: &str) -> Result<usize, Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    let mut n = 0;
    for record in rdr.records() {
        let record = record?;
        if record.len() <= BARCODE_COL || &record[LANE_COL] != lane {
            continue;
        }

        let name = record[SAMPLE_COL].replace(' ', "");
        let barcode = record[BARCODE_COL].replace('-', "");
        wtr.write_record([name.as_str(), barcode.as_str()])?;
        n += 1;
    }

    wtr.flush()?;
    info!("wrote {} samples for lane {}", n, lane);
    Ok(n)
}
