use clap::{Parser, Subcommand};
use ocr_models::{ErrorShape, LanguagesResponse, OcrResponse};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ocr-cli")]
#[command(about = "CLI tool for OCR@Home")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "http://localhost:10000")]
    endpoint: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from an image file
    Recognize {
        /// Image file path
        file: PathBuf,
        /// Tesseract language, e.g. eng or eng+deu
        #[arg(long)]
        language: Option<String>,
        /// Only read this part of the image: x,y,width,height
        #[arg(long)]
        region: Option<String>,
        /// Block granularity: word, line, paragraph or block
        #[arg(long)]
        level: Option<String>,
        /// Identifier sent for per-client cooldown
        #[arg(long)]
        client_id: Option<String>,
        /// Header carrying the client id; must match the server's cooldown.client_header
        #[arg(long, default_value = "x-client-id")]
        client_header: String,
        /// Print the full JSON response
        #[arg(long)]
        json: bool,
    },
    /// List languages installed on the server
    Languages,
    /// Health check
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = Client::new();

    match cli.command {
        Commands::Recognize {
            file,
            language,
            region,
            level,
            client_id,
            client_header,
            json,
        } => {
            recognize(
                &client,
                &cli.endpoint,
                RecognizeParams {
                    file,
                    language,
                    region,
                    level,
                    client_id,
                    client_header,
                    json,
                },
            )
            .await?;
        }
        Commands::Languages => {
            list_languages(&client, &cli.endpoint).await?;
        }
        Commands::Health => {
            health(&client, &cli.endpoint).await?;
        }
    }

    Ok(())
}

#[derive(Debug)]
struct RecognizeParams {
    file: PathBuf,
    language: Option<String>,
    region: Option<String>,
    level: Option<String>,
    client_id: Option<String>,
    client_header: String,
    json: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

async fn recognize(
    client: &Client,
    endpoint: &str,
    params: RecognizeParams,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Recognizing {}", params.file.display());

    let image = std::fs::read(&params.file)?;
    let mut form = Form::new().part("image", Part::bytes(image).file_name(file_name(&params.file)));
    if let Some(language) = params.language {
        form = form.text("language", language);
    }
    if let Some(region) = params.region {
        form = form.text("region", region);
    }
    if let Some(level) = params.level {
        form = form.text("level", level);
    }

    let mut request = client.post(format!("{endpoint}/ocr")).multipart(form);
    if let Some(client_id) = &params.client_id {
        request = request.header(params.client_header.as_str(), client_id);
    }
    let response = request.send().await?;

    if response.status().is_success() {
        let result: OcrResponse = response.json().await?;
        if params.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", result.text);
            info!(
                "confidence {:.2}, {} blocks, {} ms",
                result.confidence,
                result.blocks.len(),
                result.duration_ms
            );
        }
    } else {
        let status = response.status();
        let error_text = response.text().await?;
        let message = match serde_json::from_str::<ErrorShape>(&error_text) {
            Ok(shape) => format!("{}: {}", shape.error_type, shape.error_message),
            Err(_) => error_text,
        };
        error!("OCR failed ({}): {}", status, message);
        return Err(message.into());
    }

    Ok(())
}

async fn list_languages(client: &Client, endpoint: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.get(format!("{endpoint}/languages")).send().await?;

    if response.status().is_success() {
        let languages: LanguagesResponse = response.json().await?;
        for language in languages.languages {
            println!("{language}");
        }
    } else {
        let error_text = response.text().await?;
        error!("Failed to list languages: {}", error_text);
        return Err(error_text.into());
    }

    Ok(())
}

async fn health(client: &Client, endpoint: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = client.get(format!("{endpoint}/healthz")).send().await?;
    let status = response.status();
    let body = response.text().await?;
    println!("{body}");

    if !status.is_success() {
        return Err(format!("health check returned {status}").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognize_args(args: &[&str]) -> (Option<String>, String) {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Recognize {
                client_id,
                client_header,
                ..
            } => (client_id, client_header),
            _ => panic!("expected recognize"),
        }
    }

    #[test]
    fn client_header_defaults_to_x_client_id() {
        let (client_id, header) =
            recognize_args(&["ocr-cli", "recognize", "page.png", "--client-id", "alice"]);
        assert_eq!(client_id.as_deref(), Some("alice"));
        assert_eq!(header, "x-client-id");
    }

    #[test]
    fn client_header_can_be_overridden() {
        let (_, header) = recognize_args(&[
            "ocr-cli",
            "recognize",
            "page.png",
            "--client-id",
            "alice",
            "--client-header",
            "x-user",
        ]);
        assert_eq!(header, "x-user");
    }
}
