use super::{Oracle, OracleError, ScoreRequest};
use crate::config::OracleParams;
use crate::error::TcResult;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const OUTPUT_TAIL: usize = 2_000;

fn log_likelihood_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"(?m)^Final LogLikelihood:\s*(-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)").ok()
        })
        .as_ref()
}

/// Pulls the value of the `Final LogLikelihood:` line out of RAxML-NG's stdout.
pub fn parse_log_likelihood(stdout: &str) -> Option<f64> {
    log_likelihood_pattern()?
        .captures(stdout)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

fn tail(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= OUTPUT_TAIL {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - OUTPUT_TAIL;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &trimmed[start..])
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut source) = source {
            let _ = source.read_to_string(&mut buf);
        }
        buf
    })
}

/// Branch-length and model optimisation on a fixed topology, via the `raxml-ng` binary.
///
/// Every call writes its tree to a private scratch file, runs the binary with a timeout and
/// returns the negated final log-likelihood.
pub struct RaxmlOracle {
    binary: PathBuf,
    msa: PathBuf,
    model: String,
    scratch_dir: PathBuf,
    timeout: Duration,
    keep_scratch: bool,
    // Owns the default scratch directory; removed on drop.
    _scratch_guard: Option<TempDir>,
}

impl RaxmlOracle {
    pub fn new<B, M, S>(binary: B, msa: M, model: &str, scratch_dir: S) -> Self
    where
        B: Into<PathBuf>,
        M: Into<PathBuf>,
        S: Into<PathBuf>,
    {
        Self {
            binary: binary.into(),
            msa: msa.into(),
            model: model.to_string(),
            scratch_dir: scratch_dir.into(),
            timeout: Duration::from_secs(600),
            keep_scratch: false,
            _scratch_guard: None,
        }
    }

    /// Builds the oracle from configuration. Without a configured scratch directory a
    /// temporary one is created and removed when the oracle is dropped.
    pub fn from_params<P: AsRef<Path>>(params: &OracleParams, msa: P) -> TcResult<Self> {
        let msa = msa.as_ref().to_path_buf();
        let (scratch_dir, guard) = match &params.scratch_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                (PathBuf::from(dir), None)
            }
            None => {
                let dir = tempfile::Builder::new().prefix("treeclimb-").tempdir()?;
                if params.keep_scratch {
                    warn!("keep_scratch has no lasting effect without scratch_dir");
                }
                (dir.path().to_path_buf(), Some(dir))
            }
        };

        let mut oracle = Self::new(
            &params.raxml_binary,
            msa,
            &params.substitution_model,
            scratch_dir,
        )
        .with_timeout(params.timeout())
        .keep_scratch(params.keep_scratch);
        oracle._scratch_guard = guard;
        Ok(oracle)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    fn command(&self, tree: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--evaluate")
            .arg("--msa")
            .arg(&self.msa)
            .arg("--tree")
            .arg(tree)
            .arg("--model")
            .arg(&self.model)
            .args(["--brlen", "scaled", "--log", "RESULT", "--threads", "1", "--nofiles"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn wait(&self, child: &mut Child) -> Result<std::process::ExitStatus, OracleError> {
        let started = Instant::now();
        loop {
            match child.try_wait().map_err(OracleError::Wait)? {
                Some(status) => return Ok(status),
                None if started.elapsed() >= self.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(OracleError::Timeout(self.timeout));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    fn evaluate(&self, tree: &Path) -> Result<f64, OracleError> {
        let mut child = self
            .command(tree)
            .spawn()
            .map_err(|source| OracleError::Spawn {
                program: self.binary.display().to_string(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if !status.success() {
            return Err(OracleError::Failed {
                status: status.to_string(),
                stderr: tail(if stderr.trim().is_empty() { &stdout } else { &stderr }),
            });
        }

        let log_likelihood = parse_log_likelihood(&stdout).ok_or_else(|| OracleError::Unparsable {
            output: tail(&stdout),
        })?;
        Ok(-log_likelihood)
    }
}

impl Oracle for RaxmlOracle {
    fn score(&self, request: &ScoreRequest) -> Result<f64, OracleError> {
        let path = self.scratch_dir.join(request.scratch.file_name());
        fs::write(&path, &request.newick).map_err(|source| OracleError::Scratch {
            path: path.clone(),
            source,
        })?;

        let result = self.evaluate(&path);

        if !self.keep_scratch {
            if let Err(e) = fs::remove_file(&path) {
                debug!("could not remove {:?}: {}", path, e);
            }
        }

        let loss = result?;
        if !loss.is_finite() {
            return Err(OracleError::NonFinite(loss));
        }
        debug!("{} -> {:.3}", request.scratch.file_name(), loss);
        Ok(loss)
    }
}
