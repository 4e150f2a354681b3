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
    let exe = env!("CARGO_BIN_EXE_successiond");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn successiond");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

/// Sends one request and returns its response, skipping progress lines.
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

    loop {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        if value.get("event").is_some() {
            continue;
        }
        return value;
    }
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_default()
}

fn find_position_id(rows: &serde_json::Value, number: &str) -> String {
    rows.as_array()
        .expect("rows array")
        .iter()
        .find(|r| r.get("positionNumber").and_then(|v| v.as_str()) == Some(number))
        .and_then(|r| r.get("id"))
        .and_then(|v| v.as_str())
        .expect("row id")
        .to_string()
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("successiond-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    // Before a workspace exists, data methods refuse politely.
    let early = request(&mut stdin, &mut reader, "0", "stats.succession", json!({ "year": 2568 }));
    assert_eq!(early["error"]["code"], "no_workspace");

    let _ = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "poscodes.upsert",
        json!({ "posCodeId": 4, "posCodeName": "สารวัตร" }),
    );
    let codes = request_ok(&mut stdin, &mut reader, "4", "poscodes.list", json!({}));
    assert_eq!(codes["posCodes"][0]["posCodeName"], "สารวัตร");

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "personnel.import",
        json!({
            "year": 2568,
            "rows": [
                { "positionNumber": "0105 07443 0257", "unit": "U1", "posCodeId": 4, "position": "สว." },
                { "positionNumber": "0105 07443 0258", "unit": "U1", "posCodeId": 4, "fullName": "ว่าง (กันตำแหน่ง)" },
                { "positionNumber": "0105 07443 0259", "unit": "U1", "posCodeId": 4,
                  "fullName": "สมหญิง", "rank": "พ.ต.ท.", "nationalId": "111" },
                { "positionNumber": "0105 07443 0260", "unit": "U1", "posCodeId": 4,
                  "fullName": "สมปอง", "rank": "พ.ต.ท.", "nationalId": "222" }
            ]
        }),
    );
    assert_eq!(imported["imported"], 4);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "personnel.list",
        json!({ "year": 2568 }),
    );
    let vacant_id = find_position_id(&listed["personnel"], "0105 07443 0257");
    let holder_c = find_position_id(&listed["personnel"], "0105 07443 0259");
    let holder_d = find_position_id(&listed["personnel"], "0105 07443 0260");

    let _ = request_ok(&mut stdin, &mut reader, "7", "personnel.get", json!({ "id": vacant_id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "personnel.update",
        json!({ "id": vacant_id, "patch": { "notes": "รอคำสั่ง" } }),
    );

    let synced = request_ok(&mut stdin, &mut reader, "9", "vacancies.sync", json!({ "year": 2568 }));
    assert_eq!(synced["synced"], 2);
    let _ = request_ok(&mut stdin, &mut reader, "10", "vacancies.list", json!({ "year": 2568 }));
    let _ = request_ok(&mut stdin, &mut reader, "11", "vacancies.reconcile", json!({ "year": 2568 }));

    let applicant = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "applicants.create",
        json!({
            "year": 2568,
            "nationalId": "999",
            "fullName": "สมชาย",
            "rank": "ร.ต.อ.",
            "requestedPositionId": 4,
            "nominator": "ผกก."
        }),
    );
    let applicant_id = applicant["applicant"]["id"].as_str().expect("applicant id").to_string();
    let _ = request_ok(&mut stdin, &mut reader, "13", "applicants.list", json!({ "year": 2568 }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "applicants.reorder",
        json!({ "year": 2568, "ids": [applicant_id] }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "assignment.assign",
        json!({ "applicantId": applicant_id, "personnelId": vacant_id }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "16", "stats.succession", json!({ "year": 2568 }));
    let _ = request_ok(&mut stdin, &mut reader, "17", "positions.reconcile", json!({ "year": 2568 }));
    let _ = request_ok(&mut stdin, &mut reader, "18", "transactions.list", json!({ "year": 2568 }));

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "transactions.create",
        json!({
            "year": 2568,
            "swapType": "two-way",
            "details": [
                { "sequence": 1, "personnelId": holder_c, "nationalId": "111", "fullName": "สมหญิง",
                  "fromPositionNumber": "0105 07443 0259", "toPositionNumber": "0105 07443 0260" },
                { "sequence": 2, "personnelId": holder_d, "nationalId": "222", "fullName": "สมปอง",
                  "fromPositionNumber": "0105 07443 0260", "toPositionNumber": "0105 07443 0259" }
            ]
        }),
    );
    let tx_id = created["transaction"]["id"].as_str().expect("tx id").to_string();
    let _ = request_ok(&mut stdin, &mut reader, "20", "transactions.get", json!({ "id": tx_id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "21",
        "transactions.replaceDetails",
        json!({
            "id": tx_id,
            "details": [
                { "sequence": 1, "personnelId": holder_d, "nationalId": "222", "fullName": "สมปอง",
                  "fromPositionNumber": "0105 07443 0260", "toPositionNumber": "0105 07443 0259" },
                { "sequence": 2, "personnelId": holder_c, "nationalId": "111", "fullName": "สมหญิง",
                  "fromPositionNumber": "0105 07443 0259", "toPositionNumber": "0105 07443 0260" }
            ]
        }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "22", "transactions.complete", json!({ "id": tx_id }));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "23",
        "transactions.cancel",
        json!({ "id": tx_id, "reason": "ทดสอบ" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "24", "transactions.delete", json!({ "id": tx_id }));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "25",
        "assignment.unassign",
        json!({ "applicantId": applicant_id }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "26", "applicants.delete", json!({ "id": applicant_id }));
    let _ = request_ok(&mut stdin, &mut reader, "27", "personnel.delete", json!({ "id": holder_d }));

    let unknown = request(&mut stdin, &mut reader, "28", "nope.nothing", json!({}));
    assert_eq!(unknown["error"]["code"], "not_implemented");

    drop(stdin);
    let _ = child.wait();
}
