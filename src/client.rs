use anyhow::{Result, anyhow};
use futures_util::TryStreamExt;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::config::ClientConfig;

fn guess_mime_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        _ => "application/octet-stream",
    }
}

pub async fn send_transcription_request(config: &ClientConfig) -> Result<()> {
    let client = reqwest::Client::new();

    if !Path::new(&config.media_file).exists() {
        return Err(anyhow!("Media file not found: {}", config.media_file));
    }
    let media_data =
        fs::read(&config.media_file).map_err(|e| anyhow!("Failed to read media file: {}", e))?;

    println!(
        "📁 Media source: {} ({} bytes)",
        config.media_file,
        media_data.len()
    );

    let mime_type = guess_mime_type(&config.media_file);
    let form = reqwest::multipart::Form::new()
        .part(
            "file",
            reqwest::multipart::Part::bytes(media_data)
                .file_name(config.media_file.clone())
                .mime_str(mime_type)?,
        )
        .text("language", config.language.clone());

    println!(
        "🚀 Sending transcription request to: {}/api/v1/transcribe",
        config.server_url
    );
    println!("   Language: {}, MIME type: {}", config.language, mime_type);

    let response = client
        .post(format!("{}/api/v1/transcribe", config.server_url))
        .multipart(form)
        .send()
        .await
        .map_err(|e| anyhow!("Failed to send request: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response: {}", e))?;
        return Err(anyhow!("Server returned error {}: {}", status, message));
    }

    // The transcript arrives as a chunked stream; print it as it lands.
    let mut stream = Box::pin(response.bytes_stream());
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|e| anyhow!("Transcript stream interrupted: {}", e))?
    {
        stdout.write_all(&chunk)?;
        stdout.flush()?;
    }
    println!();

    Ok(())
}

pub async fn check_server_health(server_url: &str) -> Result<()> {
    let client = reqwest::Client::new();

    println!("🔍 Checking server health at: {server_url}/api/v1/health");

    let response = client
        .get(format!("{server_url}/api/v1/health"))
        .send()
        .await
        .map_err(|e| anyhow!("Failed to connect to server: {}", e))?;

    if response.status().is_success() {
        println!("✅ Server is healthy");
        Ok(())
    } else {
        Err(anyhow!("Server health check failed: {}", response.status()))
    }
}

pub async fn run_client(config: ClientConfig) -> Result<()> {
    println!("🎵 Transcribe Gateway Client");
    println!("============================");
    println!("📁 File: {}", config.media_file);
    println!();

    if let Err(e) = check_server_health(&config.server_url).await {
        eprintln!("❌ {e}");
        eprintln!("💡 Make sure the server is running: transcribe-gateway serve");
        return Err(e);
    }

    match send_transcription_request(&config).await {
        Ok(()) => {
            println!("\n✅ Transcription completed!");
        }
        Err(e) => {
            eprintln!("❌ Transcription failed: {e}");
            return Err(e);
        }
    }

    Ok(())
}
