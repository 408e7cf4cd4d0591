use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Interactive 3D cassette player showcase", version)]
pub struct Args {
    /// Cassette player model manifest JSON
    #[arg(long, default_value = "assets/walkman.json")]
    pub model: PathBuf,

    /// Playlist JSON: an array of {url, label} stream entries
    #[arg(long, default_value = "assets/playlist.json")]
    pub playlist: PathBuf,

    /// Directory stream urls are resolved against
    #[arg(long, default_value = "assets/streams")]
    pub media_dir: PathBuf,

    /// Optional equirectangular environment map for reflections (.hdr or LDR)
    #[arg(long)]
    pub environment: Option<PathBuf>,

    /// TrueType font for the HUD panels
    #[arg(long, default_value = "assets/hud_font.ttf")]
    pub hud_font: PathBuf,

    /// Downloadable audio archive offered by the download hotspot
    #[arg(long, default_value = "assets/walkman_audio.zip")]
    pub archive: PathBuf,

    /// Directory the download hotspot copies the archive into
    #[arg(long, default_value = "downloads")]
    pub download_dir: PathBuf,

    /// Load the model and playlist, print a summary, and exit without a window
    #[arg(long)]
    pub headless: bool,
}
