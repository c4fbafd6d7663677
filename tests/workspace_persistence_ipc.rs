use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_registrard");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn registrard");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn enroll_sample_student(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) {
    let course = request_ok(
        stdin,
        reader,
        "e1",
        "courses.create",
        json!({
            "courseCode": "BBA",
            "courseName": "Bachelor of Business Administration",
            "durationYears": 3,
            "department": "Management"
        }),
    );
    let course_id = course["courseId"].as_str().expect("courseId").to_string();
    let _ = request_ok(
        stdin,
        reader,
        "e2",
        "students.create",
        json!({
            "username": "nisha.m",
            "password": "pass1234",
            "rollNumber": "BBA2025-001",
            "name": "Nisha Mehta",
            "email": "nisha@college.edu",
            "phone": "9876500010",
            "courseId": course_id,
            "semester": 1
        }),
    );
}

fn roster_rolls(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>, id: &str) -> Vec<String> {
    let listed = request_ok(stdin, reader, id, "students.list", json!({}));
    listed
        .get("students")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.get("rollNumber").and_then(|v| v.as_str()))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn records_survive_a_daemon_restart() {
    let workspace = temp_dir("registrar-persist-restart");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        enroll_sample_student(&mut stdin, &mut reader);
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(
        roster_rolls(&mut stdin, &mut reader, "3"),
        vec!["BBA2025-001".to_string()]
    );

    // The login created before the restart still works.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "username": "nisha.m", "password": "pass1234", "role": "student" }),
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn exported_bundles_move_a_workspace_between_machines() {
    let workspace_a = temp_dir("registrar-persist-a");
    let workspace_b = temp_dir("registrar-persist-b");
    let bundle = workspace_a.join("transfer.regbackup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace_a.to_string_lossy() }),
    );
    enroll_sample_student(&mut stdin, &mut reader);

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backup.exportBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(
        exported.get("bundleFormat").and_then(|v| v.as_str()),
        Some("registrar-workspace-v1")
    );
    assert_eq!(
        exported
            .get("dbSha256")
            .and_then(|v| v.as_str())
            .map(|s| s.len()),
        Some(64)
    );

    // Restoring into a second workspace switches the live connection there.
    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "backup.importBundle",
        json!({
            "workspacePath": workspace_b.to_string_lossy(),
            "inPath": bundle.to_string_lossy()
        }),
    );
    assert_eq!(
        imported.get("workspacePath").and_then(|v| v.as_str()),
        Some(workspace_b.to_string_lossy().as_ref())
    );

    assert_eq!(
        roster_rolls(&mut stdin, &mut reader, "4"),
        vec!["BBA2025-001".to_string()]
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "5",
        "backup.importBundle",
        json!({ "inPath": workspace_a.join("nowhere.zip").to_string_lossy() }),
    );
    assert_eq!(missing["ok"].as_bool(), Some(false));
    assert_eq!(missing["error"]["code"].as_str(), Some("not_found"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace_a);
    let _ = std::fs::remove_dir_all(workspace_b);
}
