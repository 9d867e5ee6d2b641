use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn insert_then_select_reads_back_the_new_row() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("insert_query.csv"),
        "column1,column2\n1,str1\n2,str2\n3,str3\n",
    )
    .unwrap();
    let script = dir.path().join("script.sql");
    fs::write(
        &script,
        "INSERT INTO insert_query VALUES (4,'str4'),(5,'str5');\nSELECT * FROM insert_query;\n",
    )
    .unwrap();

    let output = Command::cargo_bin("tabsql")
        .unwrap()
        .arg(&script)
        .arg("--base-dir")
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("str5"));

    let contents = fs::read_to_string(dir.path().join("insert_query.csv")).unwrap();
    assert_eq!(contents.lines().count(), 6);
}

#[test]
fn create_table_writes_header_only_file() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.sql");
    fs::write(&script, "CREATE TABLE create_table (column1, column2);\n").unwrap();

    Command::cargo_bin("tabsql")
        .unwrap()
        .arg(&script)
        .arg("--base-dir")
        .arg(dir.path())
        .assert()
        .success();

    let contents = fs::read_to_string(dir.path().join("create_table.csv")).unwrap();
    assert_eq!(contents.trim(), "column1,column2");
}

#[test]
fn select_one_from_dual_renders_a_single_row() {
    let dir = tempdir().unwrap();
    let script = dir.path().join("script.sql");
    fs::write(&script, "SELECT 1 FROM dual;\n").unwrap();

    Command::cargo_bin("tabsql")
        .unwrap()
        .arg(&script)
        .arg("--base-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout("1\n1\n");
}
