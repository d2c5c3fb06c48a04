//! Loading of external resources.
//!
//! `http(s)://` sources are fetched with `reqwest`. Anything else is read from
//! the filesystem, with an optional `file://` prefix. On the web every source is
//! fetched relative to the page origin unless it is an absolute URL.

use crate::data_structures::texture::Texture;

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(target_arch = "wasm32")]
fn format_url(source: &str) -> anyhow::Result<reqwest::Url> {
    if is_remote(source) {
        return Ok(reqwest::Url::parse(source)?);
    }
    let origin = web_sys::window()
        .ok_or_else(|| anyhow::anyhow!("no window"))?
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("{:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(source)?)
}

pub async fn load_binary(source: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(source)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = if is_remote(source) {
        reqwest::get(source)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    } else {
        let path = source.strip_prefix("file://").unwrap_or(source);
        tokio::fs::read(path).await?
    };
    Ok(data)
}

/// Fetch and decode a texture. The image format is detected from its content.
pub async fn load_texture(source: &str) -> anyhow::Result<Texture> {
    let data = load_binary(source).await?;
    log::debug!("Fetched {} bytes from {}", data.len(), source);
    Texture::from_bytes(&data, source, None)
}
