use assert_cmd::cargo::cargo_bin_cmd;
use doc_model::SignatureImage;
use pdf_engine::testing::{sample_pdf, sample_png};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const A4: (f32, f32) = (595.28, 841.89);
const A4_LANDSCAPE: (f32, f32) = (841.89, 595.28);

fn fixture(dir: &TempDir, name: &str, pages: &[(f32, f32)]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, sample_pdf(pages)).expect("fixture should be written");
    path
}

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_vec(value).expect("json")).expect("manifest written");
    path
}

fn page_count(path: &Path) -> usize {
    lopdf::Document::load(path).expect("output should parse").get_pages().len()
}

#[test]
fn info_emits_stable_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "two-pages.pdf", &[A4, A4_LANDSCAPE]);

    let output = cargo_bin_cmd!("paperstamp")
        .arg("info")
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mut value: Value =
        serde_json::from_slice(&output).expect("stdout should contain valid json");
    value["path"] = Value::String("<FIXTURE>".to_owned());

    insta::assert_json_snapshot!("cli_info_two_pages", value);
}

#[test]
fn render_writes_png_scaled_by_zoom() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "letter.pdf", &[(612.0, 792.0), (612.0, 792.0)]);
    let output_path = temp.path().join("out/page.png");

    cargo_bin_cmd!("paperstamp")
        .arg("render")
        .arg(&file)
        .arg("--page")
        .arg("2")
        .arg("--zoom")
        .arg("1.5")
        .arg("--output")
        .arg(&output_path)
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .success()
        .stdout(predicate::str::contains("page.png"));

    let image = image::open(&output_path).expect("render should be readable image");
    assert_eq!((image.width(), image.height()), (918, 1188));
}

#[test]
fn render_clamps_zoom_to_configured_range() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "letter.pdf", &[(612.0, 792.0)]);
    let settings = temp.path().join("settings");
    fs::create_dir_all(&settings).expect("settings dir");
    fs::write(
        settings.join("settings.json"),
        r#"{ "version": 1, "config": { "zoom": { "max": 1.0 } } }"#,
    )
    .expect("settings written");
    let output_path = temp.path().join("page.png");

    cargo_bin_cmd!("paperstamp")
        .arg("render")
        .arg(&file)
        .arg("--zoom")
        .arg("1.5")
        .arg("--output")
        .arg(&output_path)
        .arg("--config-dir")
        .arg(&settings)
        .assert()
        .success();

    let image = image::open(&output_path).expect("render should be readable image");
    assert_eq!((image.width(), image.height()), (612, 792));
}

#[test]
fn render_rejects_page_past_the_end() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "one.pdf", &[(612.0, 792.0)]);

    cargo_bin_cmd!("paperstamp")
        .arg("render")
        .arg(&file)
        .arg("--page")
        .arg("4")
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn stamp_writes_edited_copy_next_to_input() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "lease.pdf", &[(612.0, 792.0), (612.0, 792.0)]);
    let signature = SignatureImage::from_png_bytes(sample_png(16, 8)).expect("png");
    let manifest = write_json(
        &temp,
        "annotations.json",
        &json!({
            "texts": [
                { "position": { "x": 50.0, "y": 80.0 }, "text": "Approved", "page": 1 }
            ],
            "signatures": [
                {
                    "position": { "x": 300.0, "y": 600.0 },
                    "image": signature.to_data_url(),
                    "width": 200.0,
                    "height": 100.0,
                    "page": 2
                }
            ]
        }),
    );

    let expected = temp.path().join("edited_lease.pdf");

    cargo_bin_cmd!("paperstamp")
        .arg("stamp")
        .arg(&file)
        .arg("--annotations")
        .arg(&manifest)
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .success()
        .stdout(predicate::str::contains("edited_lease.pdf"));

    let bytes = fs::read(&expected).expect("edited copy should exist");
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(page_count(&expected), 2);
}

#[test]
fn stamp_honors_configured_prefix() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "deed.pdf", &[(612.0, 792.0)]);
    let settings = temp.path().join("settings");
    fs::create_dir_all(&settings).expect("settings dir");
    fs::write(
        settings.join("settings.json"),
        r#"{ "version": 1, "config": { "export_prefix": "signed_" } }"#,
    )
    .expect("settings written");
    let manifest = write_json(&temp, "empty.json", &json!({}));

    cargo_bin_cmd!("paperstamp")
        .arg("stamp")
        .arg(&file)
        .arg("--annotations")
        .arg(&manifest)
        .arg("--config-dir")
        .arg(&settings)
        .assert()
        .success();

    assert!(temp.path().join("signed_deed.pdf").exists());
}

#[test]
fn stamp_fails_when_annotation_targets_missing_page() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "short.pdf", &[(612.0, 792.0)]);
    let manifest = write_json(
        &temp,
        "annotations.json",
        &json!({
            "texts": [ { "position": { "x": 1.0, "y": 1.0 }, "text": "lost", "page": 3 } ]
        }),
    );

    cargo_bin_cmd!("paperstamp")
        .arg("stamp")
        .arg(&file)
        .arg("--annotations")
        .arg(&manifest)
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("export failed"));

    assert!(!temp.path().join("edited_short.pdf").exists());
}

#[test]
fn stamp_rejects_blank_text() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "blank.pdf", &[(612.0, 792.0)]);
    let manifest = write_json(
        &temp,
        "annotations.json",
        &json!({
            "texts": [ { "position": { "x": 1.0, "y": 1.0 }, "text": "  ", "page": 1 } ]
        }),
    );

    cargo_bin_cmd!("paperstamp")
        .arg("stamp")
        .arg(&file)
        .arg("--annotations")
        .arg(&manifest)
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is empty"));
}

fn assert_stamp_rejects(manifest: Value, message: &str) {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let file = fixture(&temp, "form.pdf", &[(612.0, 792.0)]);
    let manifest = write_json(&temp, "annotations.json", &manifest);

    cargo_bin_cmd!("paperstamp")
        .arg("stamp")
        .arg(&file)
        .arg("--annotations")
        .arg(&manifest)
        .arg("--config-dir")
        .arg(temp.path().join("settings"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid annotation manifest"))
        .stderr(predicate::str::contains(message));

    assert!(!temp.path().join("edited_form.pdf").exists());
}

#[test]
fn stamp_rejects_font_size_below_floor() {
    assert_stamp_rejects(
        json!({
            "texts": [
                { "position": { "x": 1.0, "y": 1.0 }, "text": "tiny", "page": 1, "font_size": 0 }
            ]
        }),
        "font size 0, below the floor 8",
    );
}

#[test]
fn stamp_rejects_signature_below_floor() {
    let signature = SignatureImage::from_png_bytes(sample_png(16, 8)).expect("png");
    assert_stamp_rejects(
        json!({
            "signatures": [
                {
                    "position": { "x": 10.0, "y": 10.0 },
                    "image": signature.to_data_url(),
                    "width": 40.0,
                    "height": 100.0,
                    "page": 1
                }
            ]
        }),
        "signature annotation 0 has size 40x100",
    );
}

#[test]
fn stamp_rejects_page_zero() {
    assert_stamp_rejects(
        json!({
            "texts": [ { "position": { "x": 1.0, "y": 1.0 }, "text": "nowhere", "page": 0 } ]
        }),
        "targets page 0",
    );
}

#[test]
fn config_init_writes_defaults() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let settings = temp.path().join("settings");

    let output = cargo_bin_cmd!("paperstamp")
        .arg("config")
        .arg("--config-dir")
        .arg(&settings)
        .arg("--init")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert!(settings.join("settings.json").exists());

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain json");
    assert_eq!(value["config"]["export_prefix"], "edited_");
    assert_eq!(value["config"]["text"]["default_font_size"], 11);
    assert_eq!(value["config"]["text"]["min_font_size"], 8);
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    cargo_bin_cmd!("paperstamp")
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_non_pdf_extension() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("notes.txt");
    fs::write(&path, "hello").expect("text file written");

    cargo_bin_cmd!("paperstamp")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a PDF file"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("invalid.pdf");
    fs::write(&path, "definitely not a pdf").expect("file written");

    cargo_bin_cmd!("paperstamp")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_marker_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("encrypted.pdf");
    fs::write(&path, "%PDF-1.7\n1 0 obj << /Encrypt 2 0 R >> endobj\n%%EOF\n")
        .expect("file written");

    cargo_bin_cmd!("paperstamp")
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("paperstamp")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
