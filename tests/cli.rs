//! End-to-end tests for the popdata binary

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

const EXPORT: &str = "\u{feff}数据库：分省年度数据\n\
指标：年末常住人口(万人)\n\
时间：最近3年\n\
地区,2023年,2022年,2021年\n\
北京市,2185,2184,2189\n\
天津市,1364,1363,1373\n\
浙江省,6627,6577,6540\n\
\n\
注：年末常住人口数据来源于人口抽样调查。\n\
数据来源：国家统计局\n";

/// Binary with configuration lookups confined to the temp directory
fn popdata(home: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("popdata");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_no_command_shows_help() {
    let temp_dir = TempDir::new().unwrap();
    popdata(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("EXAMPLES:"));
}

#[test]
fn test_extract_writes_cleaned_csv() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("年末常住人口.txt");
    fs::write(&source, EXPORT).unwrap();

    popdata(temp_dir.path())
        .arg("extract")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned data saved to"));

    let output = temp_dir.path().join("年末常住人口_cleaned.csv");
    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(
        text,
        "\u{feff}地区,2023年,2022年,2021年\n北京市,2185,2184,2189\n\
         天津市,1364,1363,1373\n浙江省,6627,6577,6540\n"
    );
}

#[test]
fn test_extract_region_policy_without_bom() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("pop.txt");
    let output = temp_dir.path().join("out.csv");
    fs::write(&source, EXPORT).unwrap();

    popdata(temp_dir.path())
        .args(["extract", "--policy", "region", "--no-bom", "-o"])
        .arg(&output)
        .arg(&source)
        .assert()
        .success();

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("地区,2023年"));
    assert!(!text.contains('注'));
}

#[test]
fn test_extract_missing_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    popdata(temp_dir.path())
        .arg("extract")
        .arg(temp_dir.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_extract_without_header_reports_empty() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("plain.txt");
    fs::write(&source, "name,value\nfoo,1\n").unwrap();

    popdata(temp_dir.path())
        .arg("extract")
        .arg(&source)
        .assert()
        .failure();

    assert!(!temp_dir.path().join("plain_cleaned.csv").exists());
}

#[test]
fn test_stats_after_extract() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("pop.txt");
    fs::write(&source, EXPORT).unwrap();

    popdata(temp_dir.path())
        .arg("extract")
        .arg(&source)
        .assert()
        .success();

    popdata(temp_dir.path())
        .arg("stats")
        .arg(temp_dir.path().join("pop_cleaned.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Statistics saved to"));

    let stats = fs::read_to_string(temp_dir.path().join("pop_cleaned_stats.csv")).unwrap();
    assert!(stats.contains("均值"));
    assert!(stats.contains("最大值"));
    assert!(stats.contains("最小值"));
}

#[test]
fn test_trend_json() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("pop.txt");
    fs::write(&source, EXPORT).unwrap();

    popdata(temp_dir.path())
        .arg("extract")
        .arg(&source)
        .assert()
        .success();

    popdata(temp_dir.path())
        .arg("trend")
        .arg(temp_dir.path().join("pop_cleaned.csv"))
        .args(["浙江省", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"column\": \"2023年\""))
        .stdout(predicate::str::contains("6627"));
}

#[test]
fn test_tools_lists_catalog() {
    let temp_dir = TempDir::new().unwrap();
    popdata(temp_dir.path())
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("write_csv_from_text"))
        .stdout(predicate::str::contains("visualize_population_trend"));
}

#[test]
fn test_dispatch_from_stdin() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("pop.txt"), EXPORT).unwrap();

    let response = r#"{"response": "{\"tools\": [{\"tool\": \"write_csv_from_text\", \"tool_input\": {\"file_name\": \"pop.txt\"}}, {\"tool\": \"delete_everything\", \"tool_input\": {}}]}", "total_duration": 2500000000}"#;

    popdata(temp_dir.path())
        .arg("dispatch")
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .write_stdin(response)
        .assert()
        .success()
        .stdout(predicate::str::contains("write_csv_from_text: cleaned data saved to"))
        .stdout(predicate::str::contains("Unknown function: delete_everything"))
        .stdout(predicate::str::contains("Total duration"));

    assert!(temp_dir.path().join("pop_cleaned.csv").exists());
}

/// Local generate endpoint that answers one request with `body` and hands
/// back the prompt it was sent
fn generate_endpoint(body: &'static str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/generate", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut content_length = 0;
        let mut line = String::new();
        loop {
            line.clear();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut request = vec![0; content_length];
        reader.read_exact(&mut request).unwrap();

        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .unwrap();

        let sent: serde_json::Value = serde_json::from_slice(&request).unwrap();
        sent["prompt"].as_str().unwrap().to_string()
    });

    (url, handle)
}

#[test]
fn test_dispatch_query_calls_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("pop.txt"), EXPORT).unwrap();

    let (url, server) = generate_endpoint(
        r#"{"response": "{\"tools\": {\"tool\": \"write_csv_from_text\", \"tool_input\": {\"file_name\": \"pop.txt\"}}}", "total_duration": 1000000000}"#,
    );

    popdata(temp_dir.path())
        .arg("dispatch")
        .arg("--query")
        .arg("clean up pop.txt")
        .arg("--endpoint")
        .arg(&url)
        .arg("--assets-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("write_csv_from_text: cleaned data saved to"))
        .stdout(predicate::str::contains("Total duration: 1 seconds"));

    let prompt = server.join().unwrap();
    assert!(prompt.contains("clean up pop.txt"));
    assert!(prompt.contains("write_csv_from_text"));
    assert!(temp_dir.path().join("pop_cleaned.csv").exists());
}

#[test]
fn test_dispatch_query_unreachable_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    popdata(temp_dir.path())
        .arg("dispatch")
        .arg("--query")
        .arg("anything")
        .arg("--endpoint")
        .arg(format!("http://127.0.0.1:{}/api/generate", port))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to query"));
}

#[test]
fn test_dispatch_without_calls() {
    let temp_dir = TempDir::new().unwrap();
    popdata(temp_dir.path())
        .arg("dispatch")
        .write_stdin("{}")
        .assert()
        .success()
        .stdout(predicate::str::contains("No tools found."));
}
