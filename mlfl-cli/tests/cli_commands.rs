use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mlfl(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mlfl"))
        .arg("--config-dir")
        .arg(config_dir)
        .args(args)
        .env("MLFL__LOGGING__DIR", config_dir.join("logs"))
        .env_remove("MLFL_API_BASE")
        .env_remove("MLFL_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mlfl")
}

#[test]
fn test_init_writes_default_config() {
    let temp_dir = TempDir::new().unwrap();

    let output = mlfl(temp_dir.path(), &["init"]);
    assert!(output.status.success(), "{:?}", output);

    let content = std::fs::read_to_string(temp_dir.path().join("config.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["backend"]["api_base"], "http://localhost:8000");
    assert_eq!(value["session"]["history_window"], 6);

    // Existing config is replaced without prompting when forced
    let output = mlfl(temp_dir.path(), &["init", "--force"]);
    assert!(output.status.success(), "{:?}", output);
}

#[test]
fn test_ask_prints_answer_and_exports() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "response": "La prescription de droit commun est de cinq ans.",
                "sources": [{"content": "Article 2224 du Code civil", "metadata": {"source": "Legifrance"}}]
            }"#,
        )
        .create();

    let temp_dir = TempDir::new().unwrap();
    let transcript = temp_dir.path().join("consultation.txt");
    let output = Command::new(env!("CARGO_BIN_EXE_mlfl"))
        .arg("--config-dir")
        .arg(temp_dir.path())
        .args(["ask", "--message", "Délai de prescription", "--export"])
        .arg(&transcript)
        .env("MLFL__LOGGING__DIR", temp_dir.path().join("logs"))
        .env("MLFL_API_BASE", server.url())
        .output()
        .expect("failed to run mlfl");

    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("La prescription de droit commun est de cinq ans."));
    assert!(stdout.contains("Legifrance"));

    let content = std::fs::read_to_string(&transcript).unwrap();
    assert!(content.starts_with("Conversation transcript"));
    assert!(content.contains("[User]"));
    assert!(content.contains("Délai de prescription"));
    assert!(content.contains("Article 2224 du Code civil"));
}

#[test]
fn test_ask_reports_backend_failure() {
    let mut server = mockito::Server::new();
    server
        .mock("POST", "/chat")
        .with_status(500)
        .with_body("index not loaded")
        .create();

    let temp_dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_mlfl"))
        .arg("--config-dir")
        .arg(temp_dir.path())
        .args(["ask", "--message", "Expliquez l'article 1240"])
        .env("MLFL__LOGGING__DIR", temp_dir.path().join("logs"))
        .env("MLFL_API_BASE", server.url())
        .output()
        .expect("failed to run mlfl");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("index not loaded"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("config.json"),
        r#"{"backend":{"api_base":"ftp://nowhere"}}"#,
    )
    .unwrap();

    let output = mlfl(temp_dir.path(), &["status"]);
    assert!(!output.status.success());
}
