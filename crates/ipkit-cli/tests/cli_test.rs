//! Integration tests for the ipkit binary
//!
//! Only the offline commands are exercised here; lookups are covered by the
//! client crate against a local server.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn ipkit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ipkit"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run ipkit")
}

fn json(args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--output", "json"];
    full.extend_from_slice(args);
    let output = ipkit(&full);
    assert!(
        output.status.success(),
        "ipkit {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_analyze_private_address() {
    let value = json(&["analyze", "192.168.1.1"]);
    assert_eq!(value["address"], "192.168.1.1");
    assert_eq!(value["address_class"], "C");
    assert_eq!(value["address_type"], "Private-C");
    assert_eq!(value["hexadecimal"], "C0:A8:01:01");
    assert_eq!(value["decimal"], "3,232,235,777");
}

#[test]
fn test_analyze_rejects_leading_zero() {
    let output = ipkit(&["analyze", "192.168.01.1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid format"), "{}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_convert_round_trip() {
    let value = json(&["convert", "to-ipv6", "192.168.1.1"]);
    assert_eq!(value["output"], "::ffff:c0a8:0101");

    let value = json(&["convert", "to-ipv4", "::ffff:c0a8:0101"]);
    assert_eq!(value["output"], "192.168.1.1");
}

#[test]
fn test_convert_not_mapped() {
    let output = ipkit(&["convert", "to-ipv4", "2001:db8::1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Not an IPv4-mapped"));
}

#[test]
fn test_subnet_descriptor() {
    let value = json(&["subnet", "192.168.1.0/24"]);
    let d = &value["descriptor"];
    assert_eq!(d["network"], "192.168.1.0");
    assert_eq!(d["netmask"], "255.255.255.0");
    assert_eq!(d["broadcast"], "192.168.1.255");
    assert_eq!(d["first_host"], "192.168.1.1");
    assert_eq!(d["last_host"], "192.168.1.254");
    assert_eq!(d["host_count"], 254);
    assert!(value.get("subnets").is_none());
}

#[test]
fn test_subnet_subdivide_by_prefix() {
    let value = json(&["subnet", "192.168.0.0/24", "--prefix", "26"]);
    let subnets = value["subnets"].as_array().unwrap();
    let networks: Vec<&str> = subnets
        .iter()
        .map(|s| s["network"].as_str().unwrap())
        .collect();
    assert_eq!(
        networks,
        ["192.168.0.0", "192.168.0.64", "192.168.0.128", "192.168.0.192"]
    );
    assert!(subnets.iter().all(|s| s["host_count"] == 62));
}

#[test]
fn test_subnet_subdivide_overflow() {
    let output = ipkit(&["subnet", "10.0.0.0/31", "--count", "4"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Prefix overflow"));
}

#[test]
fn test_subnet_csv() {
    let output = ipkit(&["--output", "csv", "subnet", "10.0.0.0/30", "--count", "2"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines[0],
        "cidr,network,netmask,broadcast,first_host,last_host,host_count,prefix_len"
    );
    assert_eq!(
        lines[1],
        "10.0.0.0/31,10.0.0.0,255.255.255.254,10.0.0.1,10.0.0.0,10.0.0.1,2,31"
    );
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_batch_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ipkit"))
        .args(["--output", "json-compact", "batch", "--workers", "2"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run ipkit");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"# sample\n10.1.2.3\n172.20.0.1/16\nnot-an-ip\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = value.as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["kind"], "address");
    assert_eq!(results[0]["address_type"], "Private-A");
    assert_eq!(results[1]["kind"], "subnet");
    assert_eq!(results[1]["network"], "172.20.0.0");
    assert_eq!(results[2]["kind"], "error");
}
