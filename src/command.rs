//! Argument lists for the external downloader.

use std::path::{Path, PathBuf};

use crate::config::VideoConfig;
use crate::model::{Job, MediaFormat};

pub fn ytdlp_binary_name() -> &'static str {
    if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" }
}

fn ffmpeg_binary_name() -> &'static str {
    if cfg!(target_os = "windows") { "ffmpeg.exe" } else { "ffmpeg" }
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe().ok()?.parent().map(Path::to_path_buf)
}

/// Configured path first, then a copy shipped next to our executable,
/// then whatever `yt-dlp` resolves to on PATH.
pub fn locate_ytdlp(config: &VideoConfig) -> PathBuf {
    if let Some(path) = &config.yt_dlp_path {
        return path.clone();
    }
    if let Some(dir) = exe_dir() {
        let bundled = dir.join(ytdlp_binary_name());
        if bundled.is_file() {
            return bundled;
        }
    }
    PathBuf::from(ytdlp_binary_name())
}

/// An ffmpeg binary shipped alongside the executable, if any
pub fn bundled_ffmpeg() -> Option<PathBuf> {
    let path = exe_dir()?.join(ffmpeg_binary_name());
    path.is_file().then_some(path)
}

/// A fully built downloader invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The `-o` template; used as the file name when the tool never reports one
    pub output_template: String,
}

impl DownloadCommand {
    pub fn build(
        program: &Path,
        config: &VideoConfig,
        job: &Job,
        output_dir: &Path,
        ffmpeg: Option<&Path>,
    ) -> Self {
        // one progress update per line instead of `\r` redraws
        let mut args = vec![
            "--newline".to_owned(),
            "--no-part".to_owned(),
            "--no-continue".to_owned(),
            "--fragment-retries".to_owned(),
            config.fragment_retries.to_string(),
            "--concurrent-fragments".to_owned(),
            config.concurrent_fragments.to_string(),
        ];
        if let Some(ffmpeg) = ffmpeg {
            args.push("--ffmpeg-location".to_owned());
            args.push(ffmpeg.display().to_string());
        }

        let output_template = match job.format {
            MediaFormat::Audio => {
                let template = output_dir.join("%(title)s.%(ext)s").display().to_string();
                args.extend([
                    "-f".to_owned(),
                    "bestaudio/best".to_owned(),
                    "--extract-audio".to_owned(),
                    "--audio-format".to_owned(),
                    "mp3".to_owned(),
                    "--audio-quality".to_owned(),
                    "0".to_owned(),
                ]);
                template
            }
            MediaFormat::Video => {
                let res = job.resolution.as_deref().unwrap_or("best");
                let template = output_dir
                    .join(format!("%(title)s_{res}.%(ext)s"))
                    .display()
                    .to_string();
                args.extend([
                    "--merge-output-format".to_owned(),
                    config.merge_format.clone(),
                    "--format".to_owned(),
                    config.format_map.selector_for(res).to_owned(),
                ]);
                template
            }
        };

        args.push("-o".to_owned());
        args.push(output_template.clone());
        args.push(job.url.clone());

        Self {
            program: program.to_path_buf(),
            args,
            output_template,
        }
    }
}

/// Arguments for a single-video JSON metadata dump
pub fn metadata_args(url: &str) -> Vec<String> {
    vec![
        "--dump-json".to_owned(),
        "--no-playlist".to_owned(),
        url.to_owned(),
    ]
}
