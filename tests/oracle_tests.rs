#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;
use treeclimb::config::OracleParams;
use treeclimb::oracle::{Oracle, OracleError, RaxmlOracle, ScoreRequest, ScratchId};

const TREE: &str = "((human,chimp),gorilla,orang);";

/// Fake `raxml-ng` executables, all written before any test spawns a process.
struct Scripts {
    dir: TempDir,
}

impl Scripts {
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn scripts() -> &'static Scripts {
    static SCRIPTS: OnceLock<Scripts> = OnceLock::new();
    SCRIPTS.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        write_script(
            dir.path(),
            "ok.sh",
            r#"[ "$1" = "--evaluate" ] || exit 9
test -f "$5" || exit 3
echo "RAxML-NG v. 1.2.0"
echo "Final LogLikelihood: -123.456"
echo "Elapsed time: 0.01s""#,
        );
        write_script(
            dir.path(),
            "fail.sh",
            r#"echo "ERROR: unknown model" >&2
exit 2"#,
        );
        write_script(dir.path(), "garbage.sh", r#"echo "nothing to see""#);
        write_script(dir.path(), "slow.sh", "exec sleep 5");
        Scripts { dir }
    })
}

fn request(session: &str) -> ScoreRequest {
    ScoreRequest {
        newick: TREE.to_string(),
        scratch: ScratchId::candidate(session, 2, 1),
    }
}

fn oracle(script: &str, scratch: &Path) -> RaxmlOracle {
    RaxmlOracle::new(scripts().path(script), "alignment.fasta", "GTR+G", scratch)
}

#[test]
fn test_score_is_negated_log_likelihood() {
    let scratch = TempDir::new().unwrap();
    let loss = oracle("ok.sh", scratch.path()).score(&request("s1")).unwrap();
    assert!((loss - 123.456).abs() < 1e-9);
}

#[test]
fn test_scratch_file_is_removed() {
    let scratch = TempDir::new().unwrap();
    oracle("ok.sh", scratch.path()).score(&request("s2")).unwrap();
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_scratch_file_can_be_kept() {
    let scratch = TempDir::new().unwrap();
    let req = request("s3");
    oracle("ok.sh", scratch.path())
        .keep_scratch(true)
        .score(&req)
        .unwrap();
    let kept = scratch.path().join(req.scratch.file_name());
    assert_eq!(fs::read_to_string(kept).unwrap(), TREE);
}

#[test]
fn test_nonzero_exit_reports_stderr() {
    let scratch = TempDir::new().unwrap();
    match oracle("fail.sh", scratch.path()).score(&request("s4")) {
        Err(OracleError::Failed { stderr, .. }) => assert_eq!(stderr, "ERROR: unknown model"),
        other => panic!("expected a failed run, got {:?}", other),
    }
    // Failures clean up too.
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_output_without_likelihood() {
    let scratch = TempDir::new().unwrap();
    match oracle("garbage.sh", scratch.path()).score(&request("s5")) {
        Err(OracleError::Unparsable { output }) => assert_eq!(output, "nothing to see"),
        other => panic!("expected unparsable output, got {:?}", other),
    }
}

#[test]
fn test_slow_oracle_times_out() {
    let scratch = TempDir::new().unwrap();
    let result = oracle("slow.sh", scratch.path())
        .with_timeout(Duration::from_millis(200))
        .score(&request("s6"));
    assert!(matches!(result, Err(OracleError::Timeout(_))));
}

#[test]
fn test_missing_binary() {
    scripts();
    let scratch = TempDir::new().unwrap();
    let missing = RaxmlOracle::new(
        scratch.path().join("no-such-raxml"),
        "alignment.fasta",
        "GTR+G",
        scratch.path(),
    );
    assert!(matches!(
        missing.score(&request("s7")),
        Err(OracleError::Spawn { .. })
    ));
}

#[test]
fn test_from_params_creates_scratch_dir() {
    let root = TempDir::new().unwrap();
    let wanted = root.path().join("nested").join("scratch");
    let params = OracleParams {
        raxml_binary: scripts().path("ok.sh").display().to_string(),
        scratch_dir: Some(wanted.display().to_string()),
        ..OracleParams::default()
    };
    let oracle = RaxmlOracle::from_params(&params, "alignment.fasta").unwrap();
    assert_eq!(oracle.scratch_dir(), wanted.as_path());
    assert!(wanted.is_dir());
    assert!(oracle.score(&request("s8")).is_ok());
}

#[test]
fn test_default_scratch_dir_is_temporary() {
    let params = OracleParams {
        raxml_binary: scripts().path("ok.sh").display().to_string(),
        ..OracleParams::default()
    };
    let oracle = RaxmlOracle::from_params(&params, "alignment.fasta").unwrap();
    let dir = oracle.scratch_dir().to_path_buf();
    assert!(dir.is_dir());
    drop(oracle);
    assert!(!dir.exists());
}
