//! Media info command.

use console::style;

use vidscout::config::Settings;
use vidscout::services::YtDlp;

/// Print title, duration and formats for a media URL.
pub async fn cmd_info(settings: &Settings, url: &str) -> anyhow::Result<()> {
    let ytdlp = YtDlp::locate(settings.ytdlp_path.as_deref())?;
    tracing::debug!("Using yt-dlp at {}", ytdlp.binary().display());

    let info = ytdlp.fetch_info(url).await?;

    println!("{} {}", style("Title:").bold(), info.title);
    if let Some(duration) = info.duration {
        println!("{} {}", style("Duration:").bold(), format_duration(duration));
    }
    if let Some(ref thumbnail) = info.thumbnail {
        println!("{} {}", style("Thumbnail:").bold(), thumbnail);
    }

    println!("{} {}", style("Formats:").bold(), info.formats.len());
    for format in &info.formats {
        println!(
            "  {:<12} {:<6} {:<12} {}",
            style(&format.format_id).cyan(),
            format.ext.as_deref().unwrap_or("-"),
            format.resolution.as_deref().unwrap_or("-"),
            format.format_note.as_deref().unwrap_or("")
        );
    }

    Ok(())
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
