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

struct Register {
    student_id: String,
    subject_id: String,
    faculty_id: String,
}

fn seed_register(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Register {
    let course = request_ok(
        stdin,
        reader,
        "s1",
        "courses.create",
        json!({
            "courseCode": "BCA",
            "courseName": "Bachelor of Computer Applications",
            "durationYears": 3,
            "department": "Computer Science"
        }),
    );
    let course_id = course["courseId"].as_str().expect("courseId").to_string();

    let subject = request_ok(
        stdin,
        reader,
        "s2",
        "subjects.create",
        json!({
            "subjectCode": "BCA103",
            "subjectName": "Database Systems",
            "courseId": course_id,
            "credits": 4,
            "semester": 1
        }),
    );
    let faculty = request_ok(
        stdin,
        reader,
        "s3",
        "faculty.create",
        json!({
            "username": "prof.dsouza",
            "password": "teach123",
            "facultyCode": "FAC03",
            "name": "Prof. D'Souza",
            "email": "dsouza@college.edu",
            "phone": "9876500003",
            "department": "Computer Science",
            "designation": "Associate Professor"
        }),
    );
    let student = request_ok(
        stdin,
        reader,
        "s4",
        "students.create",
        json!({
            "username": "kavya.r",
            "password": "pass1234",
            "rollNumber": "BCA2025-011",
            "name": "Kavya Reddy",
            "email": "kavya@college.edu",
            "phone": "9876500004",
            "courseId": course_id,
            "semester": 1
        }),
    );

    Register {
        student_id: student["studentId"].as_str().expect("studentId").to_string(),
        subject_id: subject["subjectId"].as_str().expect("subjectId").to_string(),
        faculty_id: faculty["facultyId"].as_str().expect("facultyId").to_string(),
    }
}

fn add_mark(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    reg: &Register,
    exam_type: &str,
    obtained: f64,
    max: f64,
) -> serde_json::Value {
    request(
        stdin,
        reader,
        id,
        "marks.add",
        json!({
            "studentId": reg.student_id,
            "subjectId": reg.subject_id,
            "examType": exam_type,
            "marksObtained": obtained,
            "maxMarks": max,
            "enteredBy": reg.faculty_id
        }),
    )
}

#[test]
fn grades_assign_from_the_percentage_bands() {
    let workspace = temp_dir("registrar-marks-bands");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let reg = seed_register(&mut stdin, &mut reader);

    // Thresholds are inclusive at the bottom of each band, and the scale
    // normalizes before banding: 45/50 sits exactly on 90.
    let cases: Vec<(&str, f64, f64, &str)> = vec![
        ("Final", 90.0, 100.0, "A+"),
        ("Final", 89.5, 100.0, "A"),
        ("Midterm", 45.0, 50.0, "A+"),
        ("Midterm", 42.0, 50.0, "A"),
        ("Quiz", 79.5, 100.0, "B+"),
        ("Quiz", 70.0, 100.0, "B+"),
        ("Quiz", 60.0, 100.0, "B"),
        ("Quiz", 50.0, 100.0, "C"),
        ("Internal", 20.0, 50.0, "D"),
        ("Internal", 19.5, 50.0, "F"),
        ("Internal", 0.0, 100.0, "F"),
    ];
    for (i, (exam, obtained, max, want)) in cases.iter().enumerate() {
        let resp = add_mark(
            &mut stdin,
            &mut reader,
            &format!("m{}", i),
            &reg,
            exam,
            *obtained,
            *max,
        );
        assert_eq!(
            resp.pointer("/result/grade").and_then(|v| v.as_str()),
            Some(*want),
            "{}/{} should grade {}: {}",
            obtained,
            max,
            want,
            resp
        );
    }

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn the_ledger_is_append_only_and_keeps_entry_order() {
    let workspace = temp_dir("registrar-marks-append");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let reg = seed_register(&mut stdin, &mut reader);

    let first = add_mark(&mut stdin, &mut reader, "2", &reg, "Midterm", 31.0, 50.0);
    assert_eq!(first["ok"].as_bool(), Some(true));
    // A second Midterm entry is a retest row, not a correction of the first.
    let second = add_mark(&mut stdin, &mut reader, "3", &reg, "Midterm", 44.0, 50.0);
    assert_eq!(second["ok"].as_bool(), Some(true));
    let third = add_mark(&mut stdin, &mut reader, "4", &reg, "Final", 72.0, 100.0);
    assert_eq!(third["ok"].as_bool(), Some(true));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "marks.list",
        json!({ "studentId": reg.student_id }),
    );
    let marks = listed
        .get("marks")
        .and_then(|v| v.as_array())
        .expect("marks array");
    assert_eq!(marks.len(), 3);
    let obtained: Vec<f64> = marks
        .iter()
        .filter_map(|m| m.get("marksObtained").and_then(|v| v.as_f64()))
        .collect();
    assert_eq!(obtained, vec![31.0, 44.0, 72.0]);
    assert_eq!(
        marks[0].get("examType").and_then(|v| v.as_str()),
        Some("Midterm")
    );
    assert_eq!(
        marks[0].get("grade").and_then(|v| v.as_str()),
        Some("B")
    );
    assert_eq!(
        marks[0].get("subjectName").and_then(|v| v.as_str()),
        Some("Database Systems")
    );

    let filtered = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "marks.list",
        json!({ "studentId": reg.student_id, "subjectId": reg.subject_id }),
    );
    assert_eq!(
        filtered
            .get("marks")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(3)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn entry_validation_rejects_impossible_scores() {
    let workspace = temp_dir("registrar-marks-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let reg = seed_register(&mut stdin, &mut reader);

    let zero_max = add_mark(&mut stdin, &mut reader, "2", &reg, "Quiz", 0.0, 0.0);
    assert_eq!(zero_max["error"]["code"].as_str(), Some("validation"));
    assert_eq!(
        zero_max["error"]["message"].as_str(),
        Some("maxMarks must be greater than zero")
    );

    let negative = add_mark(&mut stdin, &mut reader, "3", &reg, "Quiz", -1.0, 50.0);
    assert_eq!(negative["error"]["code"].as_str(), Some("validation"));
    assert_eq!(
        negative["error"]["message"].as_str(),
        Some("negative marks are not allowed")
    );

    let over = add_mark(&mut stdin, &mut reader, "4", &reg, "Quiz", 51.0, 50.0);
    assert_eq!(over["error"]["code"].as_str(), Some("validation"));
    assert_eq!(
        over["error"]["message"].as_str(),
        Some("marksObtained cannot exceed maxMarks")
    );

    let ghost_entered_by = request(
        &mut stdin,
        &mut reader,
        "5",
        "marks.add",
        json!({
            "studentId": reg.student_id,
            "subjectId": reg.subject_id,
            "examType": "Quiz",
            "marksObtained": 10,
            "maxMarks": 50,
            "enteredBy": "no-such-faculty"
        }),
    );
    assert_eq!(ghost_entered_by["error"]["code"].as_str(), Some("not_found"));

    // The exam type is free text by design; unusual labels pass through.
    let odd_exam = add_mark(
        &mut stdin,
        &mut reader,
        "6",
        &reg,
        "Supplementary Retest (Aug)",
        25.0,
        50.0,
    );
    assert_eq!(odd_exam["ok"].as_bool(), Some(true));

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "marks.list",
        json!({ "studentId": reg.student_id }),
    );
    assert_eq!(
        listed
            .get("marks")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1),
        "rejected entries must not reach the ledger"
    );

    let _ = std::fs::remove_dir_all(workspace);
}
