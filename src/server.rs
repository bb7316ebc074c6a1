use actix_cors::Cors;
use actix_multipart::{Field, Multipart};
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, post, web};
use futures_util::{StreamExt, TryStreamExt};
use log::{debug, error, info, warn};

use crate::config::{GeminiConfig, PollConfig};
use crate::dto::{PlainTextRequest, SrtRequest};
use crate::gemini::{
    FileProvider, GeminiClient, RemoteJobPoller, TranscribeError, transcript_prompt,
};
use crate::subtitle;

pub struct AppState {
    pub gemini: GeminiClient,
    pub poll: PollConfig,
}

#[get("/api/v1/health")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Transcription gateway is running"
    }))
}

#[post("/api/v1/transcribe")]
pub async fn transcribe_upload(data: web::Data<AppState>, mut payload: Multipart) -> HttpResponse {
    debug!("Transcription request received");

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::from("upload");
    let mut mime_type = String::from("application/octet-stream");
    let mut language = String::from("English");

    // Process multipart fields
    while let Some(field) = payload.try_next().await.unwrap_or(None) {
        match field.name() {
            Some("file") => {
                if let Some(name) = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                {
                    filename = name.to_string();
                }
                if let Some(mime) = field.content_type() {
                    mime_type = mime.to_string();
                }
                match read_field_data(field).await {
                    Ok(bytes) => {
                        debug!("Media data received: {} bytes", bytes.len());
                        file_data = Some(bytes);
                    }
                    Err(e) => {
                        error!("Failed to read media data: {e}");
                        return HttpResponse::BadRequest().json(serde_json::json!({
                            "error": "Failed to read media data"
                        }));
                    }
                }
            }
            Some("language") => {
                if let Ok(field_data) = read_field_data(field).await {
                    if let Ok(text) = String::from_utf8(field_data) {
                        let text = text.trim().to_string();
                        if !text.is_empty() {
                            language = text;
                            debug!("Language set to: {language}");
                        }
                    }
                }
            }
            _ => continue,
        }
    }

    let file_bytes = match file_data {
        Some(bytes) => bytes,
        None => {
            warn!("No media file provided in transcription request");
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": "No media file provided"
            }));
        }
    };

    info!(
        "Processing upload: {filename} ({} bytes, {mime_type}), language={language}",
        file_bytes.len()
    );

    let poller = RemoteJobPoller::new(&data.gemini, data.poll.clone());

    let uploaded = match poller.upload(&file_bytes, &filename, &mime_type).await {
        Ok(file) => file,
        Err(e) => return error_response(e),
    };

    let ready = match poller.await_ready(&uploaded).await {
        Ok(file) => file,
        Err(e) => return error_response(e),
    };

    match data
        .gemini
        .generate_stream(&ready, &mime_type, &transcript_prompt(&language))
        .await
    {
        Ok(chunks) => {
            info!("Relaying transcript stream for {}", ready.name);
            HttpResponse::Ok()
                .content_type("text/plain")
                .insert_header(("X-Content-Type-Options", "nosniff"))
                .streaming(chunks.map(|chunk| {
                    chunk.map(web::Bytes::from).inspect_err(|e| {
                        error!("Transcript stream interrupted: {e}");
                    })
                }))
        }
        Err(e) => error_response(TranscribeError::Provider(e)),
    }
}

#[post("/api/v1/srt")]
pub async fn transcript_to_srt(body: web::Bytes) -> HttpResponse {
    let request: SrtRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed SRT request body: {e}");
            return HttpResponse::BadRequest().body("Invalid JSON body.");
        }
    };

    let blocks = subtitle::synthesize(&request.transcript);
    info!(
        "Synthesized {} subtitle blocks from {} transcript entries",
        blocks.len(),
        request.transcript.len()
    );

    HttpResponse::Ok()
        .content_type("text/srt; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"transcript.srt\"",
        ))
        .body(subtitle::render_srt(&blocks))
}

#[post("/api/v1/download")]
pub async fn transcript_to_plain_text(body: web::Bytes) -> HttpResponse {
    let request: PlainTextRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed download request body: {e}");
            return HttpResponse::BadRequest().body("Invalid JSON body.");
        }
    };

    let formatted = request
        .transcript
        .iter()
        .map(|entry| {
            if request.timestamps {
                format!("[{}]\n[{}]\n{}", entry.timestamp, entry.speaker, entry.text)
            } else {
                format!("[{}]\n{}", entry.speaker, entry.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    HttpResponse::Ok()
        .content_type("text/plain")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"transcript.txt\"",
        ))
        .body(formatted)
}

async fn read_field_data(mut field: Field) -> Result<Vec<u8>, actix_web::Error> {
    let mut data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        data.extend_from_slice(&chunk);
    }
    debug!("Read field data: {} bytes", data.len());
    Ok(data)
}

/// Maps a request-level failure to the user-facing status and message.
/// Internal detail is logged server-side only.
fn error_response(err: TranscribeError) -> HttpResponse {
    error!("Transcription request failed: {err}");
    match err {
        TranscribeError::Upload(_) => {
            HttpResponse::InternalServerError().body("Error uploading file")
        }
        TranscribeError::ServiceUnavailable => HttpResponse::InternalServerError()
            .body("Transcription API is currently unavailable. Please try again later."),
        TranscribeError::ProcessingFailed => HttpResponse::InternalServerError().body(
            "Unfortunately this file couldn't be processed. The file may be corrupt or in an unsupported format.",
        ),
        TranscribeError::Provider(_) => HttpResponse::InternalServerError()
            .body("Sorry, something went wrong generating the transcript. Please try again later."),
    }
}

pub async fn run_server(host: String, port: u16) -> std::io::Result<()> {
    info!("Starting transcription gateway");

    let config = match GeminiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load provider configuration: {e}");
            std::process::exit(1);
        }
    };
    info!(
        "Using configuration: base_url={}, model={}",
        config.base_url, config.model
    );

    let app_state = web::Data::new(AppState {
        gemini: GeminiClient::new(config),
        poll: PollConfig::default(),
    });

    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(50 * 1024 * 1024)) // 50MB
            .app_data(
                actix_multipart::form::MultipartFormConfig::default()
                    .total_limit(100 * 1024 * 1024), // 100MB
            )
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health_check)
            .service(transcribe_upload)
            .service(transcript_to_srt)
            .service(transcript_to_plain_text)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
