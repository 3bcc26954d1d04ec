use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tubescribe::config::{self, AppConfig};
use tubescribe::ner;
use tubescribe::server::{self, AppState};
use tubescribe::service::{Captioner, ModelLoader};
use tubescribe::source::YtDlp;
use tubescribe::subtitle::OutputFormat;
use tubescribe::transcribe::SpeechModel;
use tubescribe::transcribe::whisper_cpp::Whisper;
use tubescribe::translate::HttpTranslator;

#[derive(Parser)]
#[command(name = "tubescribe")]
#[command(about = "YouTube video transcription with Whisper", long_about = None)]
struct Cli {
    /// Config file (default: ~/.tubescribe/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web application
    Serve {
        /// Address to listen on, overrides the config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Transcribe one video and write a captions file
    Run {
        /// YouTube URL
        url: String,

        /// Output format: txt or srt
        #[arg(short, long, default_value = "txt")]
        format: OutputFormat,

        /// Output file (default: captions.<format>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also translate and tag entities, sentence by sentence
        #[arg(long)]
        annotate: bool,
    },
}

fn build_captioner(app_config: &AppConfig) -> anyhow::Result<Captioner> {
    let model_path = app_config.transcription.resolve_model_path()?;
    let transcription = app_config.transcription.clone();

    let loader: ModelLoader = Arc::new(move || -> anyhow::Result<Arc<dyn SpeechModel>> {
        let whisper = Whisper::load(
            &transcription.model,
            &model_path,
            transcription.use_gpu,
            transcription.threads,
        )?;
        Ok(Arc::new(whisper))
    });

    Ok(Captioner::new(
        app_config.transcription.model.clone(),
        loader,
        Arc::new(YtDlp::new(app_config.source.clone())),
        Arc::new(HttpTranslator::new(app_config.translation.clone())),
        ner::from_config(app_config.ner.as_ref()),
        app_config.cache.capacity,
        app_config.source.max_video_length,
    ))
}

fn spinner(msg: &'static str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let app_config =
        config::load_app_config(cli.config.as_deref()).context("Failed to load app config")?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| app_config.server.bind.clone());
            let captioner = build_captioner(&app_config)?;
            info!(
                "Model '{}', max video length {}s, cache capacity {}",
                captioner.model_name(),
                captioner.max_video_length(),
                app_config.cache.capacity
            );

            let state = Arc::new(AppState {
                captioner,
                samples: app_config.samples(),
            });
            server::run(&bind, state).await?;
        }
        Commands::Run {
            url,
            format,
            output,
            annotate,
        } => {
            let captioner = build_captioner(&app_config)?;

            // 1. Check
            let video = captioner.check(&url).await?;
            println!("Video is {}s long", video.duration);

            // 2. Transcribe
            let pb = spinner("Transcribing audio...")?;
            let result = captioner.transcribe(&url).await;
            pb.finish_and_clear();
            let result = result?;
            println!("Detected language: {}", result.language);

            // 3. Annotate (optional)
            if annotate {
                let pb = spinner("Translating...")?;
                let sentences = captioner.annotate(result.text.trim()).await;
                pb.finish_and_clear();

                for sentence in sentences? {
                    let tagged: String = sentence
                        .entities
                        .iter()
                        .map(|span| match &span.label {
                            Some(label) => format!("[{} {}]", span.text, label),
                            None => span.text.clone(),
                        })
                        .collect();
                    println!("{}", tagged.trim_end());
                    println!("  -> {}", sentence.translation);
                }
            }

            // 4. Save
            let output_path = output.unwrap_or_else(|| PathBuf::from(format.file_name()));
            std::fs::write(&output_path, format.render(&result))
                .with_context(|| format!("Failed to write {:?}", output_path))?;
            println!("Saved {} to {:?}", format, output_path);
        }
    }

    Ok(())
}
