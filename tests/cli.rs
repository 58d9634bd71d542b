//! Integration tests for the tabula binary

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

const TEMPLATE: &str = r#"# Report
[Report]
A1: "Report for {{= $.owner}}" style=1
A2: "{{#each $.items as $it i=$i}}"
A3: "{{= $i+1}}"
B3: "{{= $it.name}}"
C3: "{{= iif($it.done, 'yes', 'no')}}"
A4: "{{/each}}"
A5: "Done: {{= len($.items)}}"
"#;

fn run(args: &[&str], stdin: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tabula"))
        .args(args)
        // Keep the user's config file and RUST_LOG out of the picture.
        .arg("--config")
        .arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/config.toml"))
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute command");

    if let Some(input) = stdin {
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input.as_bytes())
            .expect("Failed to write stdin");
    } else {
        drop(child.stdin.take());
    }

    let output = child.wait_with_output().expect("Failed to wait for command");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code().unwrap_or(-1))
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_render_to_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "report.grid", TEMPLATE);
    let data = write(
        dir.path(),
        "data.json",
        r#"{"owner": "ops", "items": [{"name": "a", "done": true}, {"name": "b"}]}"#,
    );
    let output = dir.path().join("out.md");

    let (stdout, stderr, code) = run(
        &["render", &template, "-d", &data, "-o", output.to_str().unwrap()],
        None,
    );
    assert_eq!(code, 0, "stderr: {}", stderr);
    assert!(stdout.contains("Wrote"));

    let md = std::fs::read_to_string(&output).unwrap();
    assert!(md.contains("| 1 | Report for ops |  |  |"));
    assert!(md.contains("| 2 | 1 | a | yes |"));
    assert!(md.contains("| 3 | 2 | b | no |"));
    assert!(md.contains("| 4 | Done: 2 |  |  |"));
}

#[test]
fn test_render_grid_from_stdin_keeps_styles() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "report.grid", TEMPLATE);
    let output = dir.path().join("out.grid");

    let (_, stderr, code) = run(
        &["render", &template, "-d", "-", "-o", output.to_str().unwrap()],
        Some("```json\n{\"owner\": \"x\", \"items\": []}\n```"),
    );
    assert_eq!(code, 0, "stderr: {}", stderr);

    let grid = std::fs::read_to_string(&output).unwrap();
    assert!(grid.contains("A1: \"Report for x\" style=1"));
    assert!(grid.contains("A2: \"Done: 0\""));
    assert!(!grid.contains("{{"));
}

#[test]
fn test_render_error_exits_nonzero_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "bad.grid", "A1: \"{{= $.items}}\"\n");
    let data = write(dir.path(), "data.json", r#"{"items": [1, 2]}"#);
    let output = dir.path().join("out.grid");

    let (_, stderr, code) = run(
        &["render", &template, "-d", &data, "-o", output.to_str().unwrap()],
        None,
    );
    assert_eq!(code, 1);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("collection"));
    assert!(!output.exists());
}

#[test]
fn test_check_reports_structure() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "report.grid", TEMPLATE);

    let (stdout, _, code) = run(&["check", &template], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "Report: 1 blocks, 3 template rows, rows 1-5");
}

#[test]
fn test_check_rejects_unbalanced() {
    let dir = tempfile::tempdir().unwrap();
    let template = write(dir.path(), "open.grid", "A1: \"{{#if $.x}}\"\nA2: \"x\"\n");

    let (_, stderr, code) = run(&["check", &template], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("unbalanced"));
}

#[test]
fn test_missing_data_argument_is_usage_error() {
    let (_, stderr, code) = run(&["render", "t.grid", "-o", "out.grid"], None);
    assert_eq!(code, 2);
    assert!(stderr.contains("--data"));
}
