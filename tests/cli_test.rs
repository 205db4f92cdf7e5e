//! Runs the `batchpost` binary against a local server.

mod common;

use common::TestServer;
use std::fs;
use tempfile::TempDir;
use tokio::process::Command;

fn batchpost_bin() -> &'static str {
    env!("CARGO_BIN_EXE_batchpost")
}

fn write_files(dir: &TempDir) -> (String, Vec<String>) {
    let doc = dir.path().join("form.xml");
    fs::write(&doc, "<data/>").unwrap();

    let mut attachments = Vec::new();
    for (name, len) in [("a.jpg", 40), ("b.jpg", 40), ("c.wav", 40)] {
        let path = dir.path().join(name);
        fs::write(&path, vec![b'x'; len]).unwrap();
        attachments.push(path.display().to_string());
    }
    (doc.display().to_string(), attachments)
}

#[tokio::test]
async fn test_cli_submits_in_batches() {
    let server = TestServer::start(vec![]).await;
    let dir = TempDir::new().unwrap();
    let (doc, attachments) = write_files(&dir);

    let mut cmd = Command::new(batchpost_bin());
    cmd.arg(&server.url)
        .args(["-d", &doc])
        .args(["--ceiling", "100", "--json"])
        .args(["-H", "Cookie: session=1"]);
    for a in &attachments {
        cmd.args(["-a", a]);
    }
    let output = cmd.output().await.unwrap();

    assert!(
        output.status.success(),
        "batchpost failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["result"], "success");
    assert_eq!(value["batches"], 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("cookie"), Some("session=1"));
    let names: Vec<_> = requests[1]
        .parts()
        .into_iter()
        .filter_map(|p| p.file_name)
        .collect();
    assert_eq!(names, vec!["form.xml", "c.wav"]);
}

#[tokio::test]
async fn test_cli_failure_exit_code_and_resume_point() {
    let server = TestServer::start(vec![(201, ""), (500, "<body>disk full</body>")]).await;
    let dir = TempDir::new().unwrap();
    let (doc, attachments) = write_files(&dir);

    let mut cmd = Command::new(batchpost_bin());
    cmd.arg(&server.url)
        .args(["-d", &doc, "--ceiling", "100", "--json"]);
    for a in &attachments {
        cmd.args(["-a", a]);
    }
    let output = cmd.output().await.unwrap();

    assert!(!output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["result"], "failure");
    assert_eq!(value["message"], "disk full");
    assert_eq!(value["confirmed"], 2);

    // Resume after the confirmed attachments.
    let mut cmd = Command::new(batchpost_bin());
    cmd.arg(&server.url)
        .args(["-d", &doc, "--ceiling", "100", "--json", "--resume-from", "2"]);
    for a in &attachments {
        cmd.args(["-a", a]);
    }
    let output = cmd.output().await.unwrap();
    assert!(output.status.success());
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn test_cli_rejects_zero_ceiling() {
    let dir = TempDir::new().unwrap();
    let (doc, _) = write_files(&dir);

    let output = Command::new(batchpost_bin())
        .args(["http://127.0.0.1:9/submission", "-d", &doc, "--ceiling", "0"])
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ceiling"));
}
