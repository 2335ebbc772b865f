use std::fs;
use std::path::Path;

use predicates::prelude::*;

fn txtshelf(data_dir: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("txtshelf");
    cmd.env_remove("TXTSHELF_DATA_DIR")
        .env_remove("TXTSHELF_MAX_CHAPTERS_PER_CHUNK")
        .env_remove("TXTSHELF_SPLIT_LINES")
        .env_remove("TXTSHELF_UPPERCASE_HEADINGS")
        .env_remove("TXTSHELF_CAPTURE_INTERVAL_SECS")
        .env_remove("TXTSHELF_TOC_TITLE_CHARS")
        .arg("--data-dir")
        .arg(data_dir);
    cmd
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> anyhow::Result<serde_json::Value> {
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

fn book(chapters: usize) -> String {
    let mut text = String::from("Title page\n\n");
    for n in 1..=chapters {
        text.push_str(&format!("Chapter {n}\nIt was day {n}.\n\n"));
    }
    text
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = temp.path().join("novel.txt");
    fs::write(&file, book(2))?;

    txtshelf(&temp.path().join("data"))
        .env("RUST_LOG", "debug")
        .args(["toc", "--file", file.to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}

#[test]
fn toc_prints_chinese_headings_as_yaml() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = temp.path().join("story.txt");
    fs::write(&file, "第十章 风起\n天色渐暗。\n第十一章 云涌\n雨落下来。\n")?;

    txtshelf(&temp.path().join("data"))
        .args(["toc", "--file", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("风起"))
        .stdout(predicate::str::contains("anchor_id: chapter-2"));
    Ok(())
}

#[test]
fn render_writes_anchor_before_heading() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let file = temp.path().join("story.txt");
    let out = temp.path().join("story.html");
    fs::write(&file, "Chapter 1\nFish & chips <hot>\n")?;

    txtshelf(&temp.path().join("data"))
        .args([
            "render",
            "--file",
            file.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let html = fs::read_to_string(out)?;
    assert!(html.starts_with(
        "<a class=\"chapter-anchor\" id=\"chapter-1\"></a>\n<h2 class=\"chapter-title\">Chapter 1</h2>"
    ));
    assert!(html.contains("Fish &amp; chips &lt;hot&gt;\n"));
    Ok(())
}

#[test]
fn import_open_progress_round_trip() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let data = temp.path().join("data");
    let file = temp.path().join("novel.txt");
    fs::write(&file, book(3))?;

    let outcome =
        json_stdout(txtshelf(&data).args(["import", "--file", file.to_str().unwrap()]))?;
    assert_eq!(outcome["display_name"], "novel");
    let documents = outcome["documents"].as_array().expect("documents");
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["chapters"], 3);
    let id = documents[0]["id"].as_str().expect("id").to_owned();

    let opened = json_stdout(txtshelf(&data).args(["open", "--id", id.as_str()]))?;
    assert_eq!(opened["scroll_target"], serde_json::Value::Null);
    assert_eq!(opened["chapter_target"]["anchor_id"], "chapter-1");
    assert_eq!(opened["toc"].as_array().map(Vec::len), Some(3));

    let saved = json_stdout(txtshelf(&data).args([
        "progress",
        "--id",
        id.as_str(),
        "--scroll",
        "450",
        "--chapter",
        "2",
    ]))?;
    assert_eq!(saved["saved"], true);

    let reopened = json_stdout(txtshelf(&data).args(["open", "--id", id.as_str()]))?;
    assert_eq!(reopened["scroll_target"], 450.0);
    assert_eq!(reopened["chapter_target"]["title"], "Chapter 2");

    txtshelf(&data)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("novel"))
        .stdout(predicate::str::contains("3 chapters"));
    Ok(())
}

#[test]
fn import_splits_large_books_into_numbered_chunks() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let data = temp.path().join("data");
    let file = temp.path().join("saga.txt");
    fs::write(&file, book(120))?;

    let outcome = json_stdout(txtshelf(&data).args([
        "import",
        "--file",
        file.to_str().unwrap(),
        "--max-chapters-per-chunk",
        "50",
    ]))?;
    let titles = outcome["documents"]
        .as_array()
        .expect("documents")
        .iter()
        .map(|d| d["title"].as_str().unwrap_or_default().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["saga_001", "saga_002", "saga_003"]);

    let middle = outcome["documents"][1]["id"]
        .as_str()
        .expect("id")
        .to_owned();
    let opened = json_stdout(txtshelf(&data).args(["open", "--id", middle.as_str()]))?;
    assert_eq!(opened["toc"][0]["display_title"], "Chapter 51");
    assert_eq!(opened["neighbors"]["next"]["title"], "saga_003");
    Ok(())
}

#[test]
fn import_reads_pasted_text_from_stdin() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let outcome = json_stdout(
        txtshelf(&temp.path().join("data"))
            .args(["import", "--stdin"])
            .write_stdin("A short note without headings.\nSecond line.\n"),
    )?;
    assert_eq!(outcome["display_name"], "A short note without headings.");
    assert_eq!(outcome["documents"][0]["chapters"], 1);
    Ok(())
}

#[test]
fn open_unknown_document_fails() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    txtshelf(&temp.path().join("data"))
        .args(["open", "--id", "00000000-0000-0000-0000-000000000001"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("document not found"));
    Ok(())
}

#[test]
fn read_session_saves_last_position_on_eof() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let data = temp.path().join("data");
    let file = temp.path().join("novel.txt");
    fs::write(&file, book(3))?;

    let outcome =
        json_stdout(txtshelf(&data).args(["import", "--file", file.to_str().unwrap()]))?;
    let id = outcome["documents"][0]["id"]
        .as_str()
        .expect("id")
        .to_owned();

    let summary = json_stdout(
        txtshelf(&data)
            .args(["--capture-interval-secs", "1", "read", "--id", id.as_str()])
            .write_stdin("120\nnot a position\n450 2\n"),
    )?;
    assert_eq!(summary["updates"], 2);
    assert_eq!(summary["saved"], true);
    assert_eq!(summary["chapter"]["anchor_id"], "chapter-2");

    let reopened = json_stdout(txtshelf(&data).args(["open", "--id", id.as_str()]))?;
    assert_eq!(reopened["scroll_target"], 450.0);
    assert_eq!(reopened["chapter_target"]["title"], "Chapter 2");
    Ok(())
}

#[test]
fn delete_removes_document() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let data = temp.path().join("data");
    let file = temp.path().join("novel.txt");
    fs::write(&file, book(1))?;

    let outcome =
        json_stdout(txtshelf(&data).args(["import", "--file", file.to_str().unwrap()]))?;
    let id = outcome["documents"][0]["id"]
        .as_str()
        .expect("id")
        .to_owned();

    txtshelf(&data)
        .args(["delete", "--id", id.as_str()])
        .assert()
        .success();
    txtshelf(&data)
        .args(["open", "--id", id.as_str()])
        .assert()
        .failure();
    Ok(())
}
