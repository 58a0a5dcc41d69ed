mod test_support;

use serde_json::json;
use test_support::{
    create_student, create_subject, request_err, request_ok, select_workspace, spawn_sidecar,
};

#[test]
fn duplicate_create_is_rejected_and_upsert_updates_in_place() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "recordbook-marks-dup");
    let student = create_student(&mut stdin, &mut reader, "Ada Lovelace", "S001");
    let subject = create_subject(&mut stdin, &mut reader, "MA101", 4, 1);

    let mark = json!({
        "studentId": student,
        "subjectId": subject,
        "marksObtained": 58,
        "maxMarks": 100,
        "examType": "midterm",
        "semester": 1,
        "academicYear": "2023-2024",
        "enteredBy": "faculty-7"
    });
    let created = request_ok(&mut stdin, &mut reader, "1", "marks.create", mark.clone());
    let mark_id = created["markId"].as_str().expect("markId").to_string();
    assert_eq!(created["outcome"], "created");
    assert_eq!(created["grade"], "C+");
    assert_eq!(created["gradePoint"], 6);

    let dup = request_err(&mut stdin, &mut reader, "2", "marks.create", mark.clone());
    assert_eq!(dup["code"], "duplicate_mark");
    assert_eq!(dup["details"]["existingId"], mark_id.as_str());

    let mut upsert = mark.clone();
    upsert["marksObtained"] = json!(90);
    let updated = request_ok(&mut stdin, &mut reader, "3", "marks.upsert", upsert);
    assert_eq!(updated["outcome"], "updated");
    assert_eq!(updated["markId"], mark_id.as_str());
    assert_eq!(updated["grade"], "A+");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "marks.list",
        json!({ "studentId": student }),
    );
    let marks = listed["marks"].as_array().expect("marks");
    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0]["marksObtained"].as_f64(), Some(90.0));
    assert_eq!(marks[0]["enteredBy"], "faculty-7");

    let mut final_exam = mark;
    final_exam["examType"] = json!("final");
    let other = request_ok(&mut stdin, &mut reader, "5", "marks.upsert", final_exam);
    assert_eq!(other["outcome"], "created");
    assert_ne!(other["markId"], mark_id.as_str());
}

#[test]
fn update_rederives_grade_and_delete_removes_record() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "recordbook-marks-update");
    let student = create_student(&mut stdin, &mut reader, "Alan Turing", "S002");
    let subject = create_subject(&mut stdin, &mut reader, "CS101", 3, 2);

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "marks.create",
        json!({
            "studentId": student,
            "subjectId": subject,
            "marksObtained": 36,
            "maxMarks": 50,
            "semester": 2,
            "academicYear": "2024-2025",
            "remarks": "late submission"
        }),
    );
    let mark_id = created["markId"].as_str().expect("markId").to_string();
    assert_eq!(created["percentage"].as_f64(), Some(72.0));
    assert_eq!(created["grade"], "B+");

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "marks.update",
        json!({ "markId": mark_id, "marksObtained": 17, "remarks": null }),
    );
    assert_eq!(updated["percentage"].as_f64(), Some(34.0));
    assert_eq!(updated["grade"], "F");
    assert_eq!(updated["gradePoint"], 0);

    let too_high = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "marks.update",
        json!({ "markId": mark_id, "marksObtained": 51 }),
    );
    assert_eq!(too_high["code"], "bad_params");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "marks.list",
        json!({ "studentId": student }),
    );
    assert!(listed["marks"][0]["remarks"].is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "marks.delete",
        json!({ "markId": mark_id }),
    );
    let gone = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "marks.delete",
        json!({ "markId": mark_id }),
    );
    assert_eq!(gone["code"], "not_found");
    let missing = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "marks.update",
        json!({ "markId": mark_id, "marksObtained": 10 }),
    );
    assert_eq!(missing["code"], "not_found");
}

#[test]
fn writes_are_validated() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = select_workspace(&mut stdin, &mut reader, "recordbook-marks-validation");
    let student = create_student(&mut stdin, &mut reader, "Grace Hopper", "S003");
    let subject = create_subject(&mut stdin, &mut reader, "EE101", 3, 1);

    let base = json!({
        "studentId": student,
        "subjectId": subject,
        "marksObtained": 40,
        "semester": 1,
        "academicYear": "2023-2024"
    });

    let cases = [
        ("marksObtained", json!(120)),
        ("marksObtained", json!(-1)),
        ("maxMarks", json!(0)),
        ("semester", json!(9)),
        ("academicYear", json!("2023/24")),
        ("examType", json!("oral")),
        ("remarks", json!("x".repeat(501))),
    ];
    for (i, (key, value)) in cases.into_iter().enumerate() {
        let mut params = base.clone();
        params[key] = value;
        let e = request_err(
            &mut stdin,
            &mut reader,
            &format!("v{}", i),
            "marks.create",
            params,
        );
        assert_eq!(e["code"], "bad_params", "case {}", key);
    }

    let mut params = base.clone();
    params["subjectId"] = json!("missing");
    let e = request_err(&mut stdin, &mut reader, "sub", "marks.create", params);
    assert_eq!(e["code"], "not_found");

    let mut params = base;
    params.as_object_mut().expect("object").remove("semester");
    let e = request_err(&mut stdin, &mut reader, "req", "marks.create", params);
    assert_eq!(e["code"], "bad_params");
}
