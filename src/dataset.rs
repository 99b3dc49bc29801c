//! Tabular observations read from (optionally gzip compressed) csv files.

use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use flate2::read::MultiGzDecoder;
use itertools::Itertools;

use crate::error::{Result, SamplerError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Rows of string cells under named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Table {
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| SamplerError::MissingColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
            .collect())
    }

    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        self.column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.trim().parse().map_err(|_| SamplerError::ParseValue {
                    column: name.to_string(),
                    row,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// A table with only the given columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let idx = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<usize>>>()?;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                idx.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Table {
            columns: names.iter().map(|name| name.to_string()).collect(),
            rows,
        })
    }
}

/// Observations available to a sampler.
///
/// `data` holds the selected observation columns truncated to the cutoff,
/// `original` the full table as read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetView {
    data: Table,
    original: Table,
}

impl DatasetView {
    pub fn from_table(table: Table, obs_vars: &[&str], cutoff: Option<usize>) -> Result<Self> {
        let truncated = match cutoff {
            Some(cutoff) => table.head(cutoff),
            None => table.clone(),
        };
        let data = truncated.select(obs_vars)?;
        Ok(DatasetView {
            data,
            original: table,
        })
    }

    /// Read a csv file, decompressing it if it is gzip compressed.
    ///
    /// All members of a multi-member gzip file (concatenated archives or
    /// bgzip output) are read.
    ///
    /// Compression is detected from a `.gz` extension or from the gzip magic
    /// bytes. Without a header row the columns are named `"0"`, `"1"`, ...
    pub fn read_csv(
        path: impl AsRef<Path>,
        obs_vars: &[&str],
        header: bool,
        cutoff: Option<usize>,
    ) -> Result<Self> {
        let table = read_table(path.as_ref(), header)?;
        Self::from_table(table, obs_vars, cutoff)
    }

    /// Number of observations after the cutoff.
    pub fn n(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Table {
        &self.data
    }

    pub fn original(&self) -> &Table {
        &self.original
    }

    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>> {
        self.data.column_f64(name)
    }
}

fn is_gzip(path: &Path, reader: &mut BufReader<File>) -> Result<bool> {
    if path.extension().is_some_and(|ext| ext == "gz") {
        return Ok(true);
    }
    Ok(reader.fill_buf()?.starts_with(&GZIP_MAGIC))
}

fn read_table(path: &Path, header: bool) -> Result<Table> {
    let mut file = BufReader::new(File::open(path)?);
    let input: Box<dyn Read> = if is_gzip(path, &mut file)? {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(header)
        .flexible(true)
        .from_reader(input);

    let rows = reader
        .records()
        .map_ok(|record| record.iter().map(str::to_string).collect::<Vec<_>>())
        .collect::<std::result::Result<Vec<_>, csv::Error>>()?;

    let columns = if header {
        reader.headers()?.iter().map(str::to_string).collect()
    } else {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        (0..width).map(|i| i.to_string()).collect()
    };

    Ok(Table { columns, rows })
}
