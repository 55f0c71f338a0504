//! Web server command.

use console::style;

use vidscout::config::Settings;

/// Port used when the bind address names only a host.
const DEFAULT_PORT: u16 = 4000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    println!(
        "{} Downloads directory: {}",
        style("→").cyan(),
        settings.downloads_dir.display()
    );
    println!(
        "{} Starting vidscout server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    vidscout::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "4000" -> 127.0.0.1:4000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:4000
/// - Host and port: "0.0.0.0:8080" -> 0.0.0.0:8080
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    let bind = bind.trim();
    if bind.is_empty() {
        anyhow::bail!("Empty bind address");
    }

    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
    }

    // Must be just a host, use default port
    Ok((bind.to_string(), DEFAULT_PORT))
}
