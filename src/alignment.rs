use crate::error::{TcResult, TreeClimbError};
use crate::tree::TaxaMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

const GAP: u8 = b'-';

/// A multiple sequence alignment: one row per taxon, in file order.
///
/// Symbols are stored lowercase; gaps are missing data (`None`).
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    names: Vec<String>,
    sequences: Vec<Vec<Option<u8>>>,
}

fn parse_symbols(line: &str) -> impl Iterator<Item = Option<u8>> + '_ {
    line.bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .map(|b| match b {
            GAP => None,
            other => Some(other.to_ascii_lowercase()),
        })
}

impl Alignment {
    pub fn from_reader<R: BufRead>(reader: R) -> TcResult<Self> {
        let mut names: Vec<String> = Vec::new();
        let mut sequences: Vec<Vec<Option<u8>>> = Vec::new();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('>') {
                names.push(header.trim().to_string());
                sequences.push(Vec::new());
                continue;
            }
            let Some(current) = sequences.last_mut() else {
                return Err(TreeClimbError::Alignment(format!(
                    "line {}: sequence data before the first '>' header",
                    number + 1
                )));
            };
            current.extend(parse_symbols(line));
        }

        let alignment = Self { names, sequences };
        alignment.check()?;
        debug!(
            "Alignment: {} taxa, {} sites",
            alignment.taxon_count(),
            alignment.site_count()
        );
        Ok(alignment)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> TcResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    fn check(&self) -> TcResult<()> {
        if self.names.is_empty() {
            return Err(TreeClimbError::Alignment("no sequences found".into()));
        }
        let mut seen = HashSet::new();
        for name in &self.names {
            if !seen.insert(name.as_str()) {
                return Err(TreeClimbError::Alignment(format!(
                    "taxon '{}' appears more than once",
                    name
                )));
            }
        }
        let sites = self.sequences[0].len();
        for (name, seq) in self.names.iter().zip(&self.sequences) {
            if seq.len() != sites {
                return Err(TreeClimbError::Alignment(format!(
                    "taxon '{}' has {} sites, expected {}",
                    name,
                    seq.len(),
                    sites
                )));
            }
        }
        Ok(())
    }

    /// Initial taxa mapping: identifier `i` is the `i`-th record.
    pub fn taxa(&self) -> TcResult<TaxaMap> {
        Ok(TaxaMap::initial(&self.names)?)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn taxon_count(&self) -> usize {
        self.names.len()
    }

    pub fn site_count(&self) -> usize {
        self.sequences.first().map_or(0, Vec::len)
    }

    pub fn sequence(&self, taxon: usize) -> Option<&[Option<u8>]> {
        self.sequences.get(taxon).map(Vec::as_slice)
    }

    /// The symbols of every taxon at one site.
    pub fn site(&self, index: usize) -> Option<Vec<Option<u8>>> {
        if index >= self.site_count() {
            return None;
        }
        Some(self.sequences.iter().map(|s| s[index]).collect())
    }

    pub fn write_fasta<W: Write>(&self, mut writer: W) -> TcResult<()> {
        for (name, seq) in self.names.iter().zip(&self.sequences) {
            let row: Vec<u8> = seq.iter().map(|s| s.unwrap_or(GAP)).collect();
            writeln!(writer, ">{}", name)?;
            writer.write_all(&row)?;
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> TcResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_fasta(&mut out)?;
        out.flush()?;
        Ok(())
    }
}
