// Copyright (c) 2018 10x Genomics, Inc. All rights reserved.

//! Utility methods.

use std::boxed::Box;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Error};
use flate2::read::MultiGzDecoder;

const GZ_BUF_SIZE: usize = 1 << 22;
const PLAIN_BUF_SIZE: usize = 32 * 1024;

/// Open a (possibly gzipped or lz4-compressed) file into a BufReader.
/// The compression is detected from the filename extension.
pub fn open_with_gz<P: AsRef<Path>>(p: P) -> Result<Box<dyn BufRead>, Error> {
    let path = p.as_ref();
    let r = File::open(path).with_context(|| format!("error opening file {:?}", path))?;

    let ext = path.extension().and_then(|e| e.to_str());

    if ext == Some("gz") {
        let gz = MultiGzDecoder::new(r);
        let buf_reader = BufReader::with_capacity(GZ_BUF_SIZE, gz);
        Ok(Box::new(buf_reader))
    } else if ext == Some("lz4") {
        let lz = lz4::Decoder::new(r)
            .with_context(|| format!("error opening lz4 stream {:?}", path))?;
        let buf_reader = BufReader::with_capacity(GZ_BUF_SIZE, lz);
        Ok(Box::new(buf_reader))
    } else {
        let buf_reader = BufReader::with_capacity(PLAIN_BUF_SIZE, r);
        Ok(Box::new(buf_reader))
    }
}

/// Create (or truncate) a plain file for buffered writing.
pub fn create_buffered<P: AsRef<Path>>(p: P) -> Result<BufWriter<File>, Error> {
    let path = p.as_ref();
    let f = File::create(path).with_context(|| format!("error creating file {:?}", path))?;
    Ok(BufWriter::new(f))
}
