#![cfg(feature = "tesseract_tests")]

use ocr_testsupport::*;

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn bad_payloads_are_rejected_and_server_survives() -> anyhow::Result<()> {
    if !tesseract_installed() {
        eprintln!("skipping: tesseract is not installed");
        return Ok(());
    }
    let mut daemon = spawn_daemon(None).await?;
    let client = daemon.client();

    for (payload, content_type) in [
        (Vec::new(), "image/png"),
        (not_an_image(), "application/octet-stream"),
        (truncated_png(), "image/png"),
    ] {
        let reply = client
            .ocr_raw(payload, content_type, &OcrOptions::default())
            .await?;
        assert_eq!(reply.status, 400, "{}", reply.body);
        let error = reply.error()?;
        assert_eq!(error.error_type, "ValidationError");
        assert_eq!(error.request_id, reply.request_id);
    }

    // Still serving after the failures above.
    assert!(client.health().await?);
    let ok = client
        .ocr_raw(text_png("OCR"), "image/png", &OcrOptions::default())
        .await?;
    assert!(ok.is_success());

    let metrics = prom_parse(&client.metrics_text().await?)?;
    assert_eq!(
        metrics.value(r#"ocr_errors_total{error_type="ValidationError"}"#),
        3.0
    );

    daemon.kill().await?;
    Ok(())
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_language_is_an_engine_error() -> anyhow::Result<()> {
    if !tesseract_installed() {
        eprintln!("skipping: tesseract is not installed");
        return Ok(());
    }
    let mut daemon = spawn_daemon(None).await?;
    let client = daemon.client();

    let options = OcrOptions {
        language: Some("zzz".to_string()),
        ..OcrOptions::default()
    };
    let reply = client.ocr_raw(text_png("HELLO"), "image/png", &options).await?;
    assert_eq!(reply.status, 502, "{}", reply.body);
    assert_eq!(reply.error()?.error_type, "OcrEngineError");

    daemon.kill().await?;
    Ok(())
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn missing_engine_binary_is_reported_per_request() -> anyhow::Result<()> {
    let mut daemon = spawn_daemon(Some(ConfigOverride {
        tesseract_binary: Some("/nonexistent/tesseract".to_string()),
        ..ConfigOverride::default()
    }))
    .await?;
    let client = daemon.client();

    let reply = client
        .ocr_raw(text_png("HELLO"), "image/png", &OcrOptions::default())
        .await?;
    assert_eq!(reply.status, 500, "{}", reply.body);
    assert_eq!(reply.error()?.error_type, "OcrEngineError");
    assert!(client.health().await?);

    daemon.kill().await?;
    Ok(())
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn cooldown_throttles_repeat_clients() -> anyhow::Result<()> {
    if !tesseract_installed() {
        eprintln!("skipping: tesseract is not installed");
        return Ok(());
    }
    let mut daemon = spawn_daemon(Some(ConfigOverride {
        cooldown_seconds: Some(30),
        ..ConfigOverride::default()
    }))
    .await?;
    let client = daemon.client();
    let options = OcrOptions {
        client_id: Some("chat-1".to_string()),
        ..OcrOptions::default()
    };

    let first = client.ocr_raw(blank_png(32, 32), "image/png", &options).await?;
    assert!(first.is_success());

    let second = client.ocr_raw(blank_png(32, 32), "image/png", &options).await?;
    assert_eq!(second.status, 429);
    assert!(second.retry_after.is_some_and(|s| s > 0 && s <= 30));

    daemon.kill().await?;
    Ok(())
}
