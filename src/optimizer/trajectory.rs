use crate::error::TcResult;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TrajectoryFormat {
    Csv,
    Json,
}

impl TrajectoryFormat {
    /// The format named by a file extension, if any.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::iter().find(|f| ext.eq_ignore_ascii_case(&f.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct Row {
    iteration: usize,
    loss: f64,
}

/// Best loss after each outer iteration; entry 0 is the initial score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LossTrajectory {
    losses: Vec<f64>,
}

impl LossTrajectory {
    pub fn starting_at(loss: f64) -> Self {
        Self { losses: vec![loss] }
    }

    pub fn push(&mut self, loss: f64) {
        self.losses.push(loss);
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.losses.last().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.losses
    }

    pub fn is_non_increasing(&self) -> bool {
        self.losses.windows(2).all(|w| w[1] <= w[0])
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> TcResult<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for (iteration, &loss) in self.losses.iter().enumerate() {
            wtr.serialize(Row { iteration, loss })?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, writer: W) -> TcResult<()> {
        serde_json::to_writer_pretty(writer, &self.losses)?;
        Ok(())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P, format: TrajectoryFormat) -> TcResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        match format {
            TrajectoryFormat::Csv => self.write_csv(&mut out)?,
            TrajectoryFormat::Json => self.write_json(&mut out)?,
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_csv_has_header_and_rows() {
        let mut t = LossTrajectory::starting_at(10.5);
        t.push(9.25);
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "iteration,loss\n0,10.5\n1,9.25\n");
    }

    #[test]
    fn test_format_parses_case_insensitively() {
        assert_eq!(TrajectoryFormat::from_str("JSON").unwrap(), TrajectoryFormat::Json);
        assert_eq!(TrajectoryFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TrajectoryFormat::from_path("run/loss.JSON"), Some(TrajectoryFormat::Json));
        assert_eq!(TrajectoryFormat::from_path("loss.csv"), Some(TrajectoryFormat::Csv));
        assert_eq!(TrajectoryFormat::from_path("loss.txt"), None);
        assert_eq!(TrajectoryFormat::from_path("loss"), None);
    }
}
