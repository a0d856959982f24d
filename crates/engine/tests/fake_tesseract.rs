#![cfg(unix)]

use ocr_engine::{EngineOptions, OcrEngine, TesseractEngine};
use ocr_models::{Config, EngineConfig, OcrError};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

const SCRIPT: &str = r#"#!/bin/sh
dir=$(dirname "$0")
case "$1" in
  --version) echo "tesseract 5.3.0"; echo " leptonica-1.82.0"; exit 0 ;;
  --list-langs) echo 'List of available languages in "/fake/tessdata/" (2):'; echo eng; echo deu; exit 0 ;;
esac
echo "$@" > "$dir/args.txt"
wc -c > "$dir/stdin_bytes"
lang=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-l" ]; then lang="$a"; fi
  prev="$a"
done
if [ "$lang" = "xyz" ]; then
  echo "Error opening data file /fake/tessdata/xyz.traineddata" >&2
  echo "Failed loading language 'xyz'" >&2
  exit 1
fi
if [ "$lang" = "crash" ]; then
  echo "Error in pixReadMem: Unknown format" >&2
  exit 1
fi
printf 'level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n'
printf '1\t1\t0\t0\t0\t0\t0\t0\t200\t60\t-1\t\n'
printf '5\t1\t1\t1\t1\t1\t10\t12\t70\t20\t96\tHELLO\n'
printf '5\t1\t1\t1\t1\t2\t90\t12\t70\t20\t90\tWORLD\n'
"#;

fn install(dir: &Path, body: &str) -> String {
    let path = dir.join("tesseract");
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn engine_config(binary: String) -> EngineConfig {
    EngineConfig {
        binary,
        tessdata_dir: Some("/fake/tessdata".to_string()),
        engine_mode: Some(1),
        ..Config::default().engine
    }
}

fn options(language: &str) -> EngineOptions {
    EngineOptions {
        language: language.to_string(),
        page_segmentation_mode: 6,
    }
}

#[tokio::test]
async fn recognize_parses_words_and_builds_command_line() {
    let dir = TempDir::new().unwrap();
    let engine = TesseractEngine::new(&engine_config(install(dir.path(), SCRIPT)));

    let input = vec![7u8; 1234];
    let words = engine.recognize(&input, &options("eng")).await.unwrap();
    assert_eq!(words.len(), 2);
    assert_eq!(words[0].text, "HELLO");
    assert_eq!(words[1].bbox.x, 90);

    let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
    assert_eq!(
        args.trim(),
        "stdin stdout -l eng --psm 6 --oem 1 --tessdata-dir /fake/tessdata tsv"
    );
    let fed = std::fs::read_to_string(dir.path().join("stdin_bytes")).unwrap();
    assert_eq!(fed.trim(), "1234");
}

#[tokio::test]
async fn missing_language_pack_is_reported() {
    let dir = TempDir::new().unwrap();
    let engine = TesseractEngine::new(&engine_config(install(dir.path(), SCRIPT)));

    let err = engine.recognize(b"png", &options("xyz")).await.unwrap_err();
    assert!(matches!(err, OcrError::MissingLanguage { ref language } if language == "xyz"));
    assert_eq!(err.http_status(), 502);
}

#[tokio::test]
async fn engine_failure_carries_stderr() {
    let dir = TempDir::new().unwrap();
    let engine = TesseractEngine::new(&engine_config(install(dir.path(), SCRIPT)));

    let err = engine.recognize(b"png", &options("crash")).await.unwrap_err();
    match err {
        OcrError::EngineFailure { reason } => assert!(reason.contains("pixReadMem")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_binary_is_unavailable() {
    let engine = TesseractEngine::new(&engine_config(
        "/definitely/not/here/tesseract".to_string(),
    ));
    let err = engine.recognize(b"png", &options("eng")).await.unwrap_err();
    assert!(matches!(err, OcrError::EngineUnavailable { .. }));
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn lists_languages_and_version() {
    let dir = TempDir::new().unwrap();
    let engine = TesseractEngine::new(&engine_config(install(dir.path(), SCRIPT)));

    assert_eq!(engine.languages().await.unwrap(), vec!["eng", "deu"]);
    assert_eq!(engine.version().await.unwrap(), "tesseract 5.3.0");
    assert_eq!(engine.name(), "tesseract");
}

#[tokio::test]
async fn garbage_output_is_an_engine_failure() {
    let dir = TempDir::new().unwrap();
    let script = "#!/bin/sh\ncat > /dev/null\necho 'not tsv at all'\n";
    let engine = TesseractEngine::new(&engine_config(install(dir.path(), script)));

    let err = engine.recognize(b"png", &options("eng")).await.unwrap_err();
    assert!(matches!(err, OcrError::EngineFailure { .. }));
}
