use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "transcribe-gateway",
    about = "Transcribe Gateway - Gemini-backed media transcription service",
    long_about = "An HTTP gateway that uploads media files to the Gemini file API, waits for remote processing, and streams back a transcript, with SRT and plain-text conversion endpoints.",
    after_help = "EXAMPLES:\n    # Start the gateway (requires GEMINI_API_KEY)\n    transcribe-gateway serve\n\n    # Transcribe a media file through a running gateway\n    transcribe-gateway file interview.mp3\n\n    # Ask for a Spanish transcript from a remote gateway\n    transcribe-gateway file talk.mp4 --language Spanish --server-url http://my-server:8080"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(name = "serve")]
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },
    #[command(name = "file")]
    TranscribeFile {
        media_file: String,

        #[arg(long, default_value = "http://localhost:8080")]
        server_url: String,

        #[arg(long, default_value = "English")]
        language: String,
    },
}
