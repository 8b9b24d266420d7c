//! Run summary: the configuration of the run and the final read counts,
//! written as JSON alongside the demultiplexed output.

use anyhow::{Context, Error};
use serde_derive::Serialize;
use std::io::Write;
use std::path::Path;

use crate::barcode::ReadCounts;
use crate::config::Config;
use crate::utils;

pub const PROGRAM: &str = "dnabc";

#[derive(Serialize, Debug)]
pub struct RunSummary<'a> {
    pub program: &'static str,
    pub version: &'static str,
    pub config: &'a Config,
    pub data: &'a ReadCounts,
}

impl<'a> RunSummary<'a> {
    pub fn new(config: &'a Config, data: &'a ReadCounts) -> RunSummary<'a> {
        RunSummary {
            program: PROGRAM,
            version: env!("CARGO_PKG_VERSION"),
            config,
            data,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let writer = utils::create_buffered(path)?;
        self.write(writer)
            .with_context(|| format!("error writing summary file {:?}", path))
    }
}
