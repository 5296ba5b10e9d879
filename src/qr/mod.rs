//! Guest QR identity: minting the unique identifier and rendering it
//! into a stored image artifact.
//!
//! An identifier is `<token>-<name-slug>` where the token is a 10-char
//! URL-safe nanoid. Rendering prefers SVG and falls back to PNG; when
//! both renderers fail the guest is left with the `qr-pending` sentinel
//! instead of failing the surrounding operation.

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;

use qrcode::render::svg;
use qrcode::QrCode;

use crate::{
    domain::QR_PENDING,
    error::{AppError, Result},
    repository::GuestRepository,
    storage::ContentStore,
};

/// Length of the random token half of an identifier.
pub const TOKEN_LENGTH: usize = 10;

/// The token space is large enough that collisions are vanishingly rare;
/// hitting this bound means the store's existence check is broken.
const MAX_MINT_ATTEMPTS: usize = 256;

const QR_DIMENSIONS: u32 = 240;

/// Directory inside the content store; the public reference adds the
/// `storage/` URL prefix on top.
const ARTIFACT_DIR: &str = "qr/guests";

#[derive(Debug, Clone)]
pub struct GuestQrData {
    pub identifier: String,
    pub artifact: String,
}

#[derive(Debug, Clone, Copy)]
pub enum ArtifactFormat {
    Svg,
    Png,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "svg",
            ArtifactFormat::Png => "png",
        }
    }
}

/// Slug half of an identifier: symbols removed, lowercased, spaces to
/// hyphens.
pub fn name_slug(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .map(|c| {
            if c == ' ' {
                '-'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Mint a candidate identifier and re-roll the token until the injected
/// existence check clears it. The slug is stable across attempts.
pub async fn mint_unique_identifier<F, Fut>(display_name: &str, exists: F) -> Result<String>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let slug = name_slug(display_name);

    for _ in 0..MAX_MINT_ATTEMPTS {
        let token = nanoid::nanoid!(TOKEN_LENGTH);
        let candidate = format!("{}-{}", token, slug);
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal(format!(
        "QR identifier minting exhausted {} attempts; existence check is likely broken",
        MAX_MINT_ATTEMPTS
    )))
}

type RenderFn = fn(&str) -> Result<Vec<u8>>;

/// Renderers tried in order; the first success wins.
const RENDERERS: &[(ArtifactFormat, RenderFn)] = &[
    (ArtifactFormat::Svg, render_svg),
    (ArtifactFormat::Png, render_png),
];

fn render_svg(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let rendered = code
        .render::<svg::Color>()
        .min_dimensions(QR_DIMENSIONS, QR_DIMENSIONS)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    Ok(rendered.into_bytes())
}

fn render_png(data: &str) -> Result<Vec<u8>> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let rendered = code
        .render::<image::Luma<u8>>()
        .min_dimensions(QR_DIMENSIONS, QR_DIMENSIONS)
        .build();

    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(rendered)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

pub struct QrCodeService {
    guests: Arc<dyn GuestRepository>,
    store: Arc<dyn ContentStore>,
}

impl QrCodeService {
    pub fn new(guests: Arc<dyn GuestRepository>, store: Arc<dyn ContentStore>) -> Self {
        Self { guests, store }
    }

    /// Mint an identifier that is unique across all stored guests.
    pub async fn mint_identifier(&self, display_name: &str) -> Result<String> {
        let guests = self.guests.clone();
        mint_unique_identifier(display_name, move |candidate| {
            let guests = guests.clone();
            async move { guests.qr_identifier_exists(&candidate).await }
        })
        .await
    }

    /// Mint identifier and artifact for a new (or renamed) guest.
    pub async fn issue(&self, display_name: &str) -> Result<GuestQrData> {
        let identifier = self.mint_identifier(display_name).await?;
        let artifact = self.generate_artifact(&identifier).await;
        Ok(GuestQrData { identifier, artifact })
    }

    /// Render and persist the artifact for an identifier. Rendering or
    /// storage failure degrades to [`QR_PENDING`]; guest creation never
    /// fails on the artifact alone.
    pub async fn generate_artifact(&self, identifier: &str) -> String {
        for (format, render) in RENDERERS {
            let bytes = match render(identifier) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        "QR {} rendering failed for {}: {}",
                        format.extension(),
                        identifier,
                        e
                    );
                    continue;
                }
            };

            let path = format!("{}/{}.{}", ARTIFACT_DIR, identifier, format.extension());
            match self.store.put(&path, &bytes).await {
                Ok(()) => return format!("storage/{}", path),
                Err(e) => {
                    tracing::warn!("Failed to store QR artifact {}: {}", path, e);
                }
            }
        }

        tracing::error!("All QR renderers failed for {}; marking pending", identifier);
        QR_PENDING.to_string()
    }

    /// Best-effort artifact removal. The pending sentinel is a no-op
    /// success; failures are logged and reported, never raised.
    pub async fn delete_artifact(&self, reference: &str) -> bool {
        if reference.is_empty() || reference == QR_PENDING {
            return true;
        }

        let path = reference.strip_prefix("storage/").unwrap_or(reference);
        match self.store.delete(path).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("QR artifact deletion failed for {}: {}", reference, e);
                false
            }
        }
    }

    /// Delete-then-generate. The steps are sequential, not transactional:
    /// if generation fails after the delete, the caller ends up holding
    /// the pending sentinel and can repair later via regenerate.
    pub async fn regenerate(&self, old_reference: &str, new_name: &str) -> Result<GuestQrData> {
        self.delete_artifact(old_reference).await;
        self.issue(new_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[test]
    fn slug_strips_symbols_and_hyphenates() {
        assert_eq!(name_slug("Jane Doe"), "jane-doe");
        assert_eq!(name_slug("Ir. H. Joko, S.T."), "ir-h-joko-st");
        assert_eq!(name_slug("Ayu"), "ayu");
    }

    #[tokio::test]
    async fn minted_identifier_has_token_and_slug() -> anyhow::Result<()> {
        let id = mint_unique_identifier("Jane Doe", |_| async { Ok(false) }).await?;
        // The token itself may contain hyphens, so split by position.
        assert_eq!(id.len(), TOKEN_LENGTH + 1 + "jane-doe".len());
        assert_eq!(&id[TOKEN_LENGTH..TOKEN_LENGTH + 1], "-");
        assert!(id.ends_with("-jane-doe"));
        Ok(())
    }

    #[tokio::test]
    async fn minting_rerolls_on_collision() -> anyhow::Result<()> {
        // Report the first three candidates as taken.
        let seen = Mutex::new(HashSet::new());
        let id = mint_unique_identifier("Budi", |candidate| {
            let mut seen = seen.lock().unwrap();
            seen.insert(candidate);
            let collide = seen.len() <= 3;
            async move { Ok(collide) }
        })
        .await?;

        assert!(id.ends_with("-budi"));
        assert!(seen.lock().unwrap().len() >= 4);
        Ok(())
    }

    #[tokio::test]
    async fn minting_gives_up_when_everything_collides() {
        let result = mint_unique_identifier("Budi", |_| async { Ok(true) }).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn svg_renderer_produces_svg_markup() {
        let bytes = render_svg("abc123XYZ-_-jane-doe").unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("<svg"));
    }

    #[test]
    fn png_renderer_produces_png_magic() {
        let bytes = render_png("abc123XYZ-_-jane-doe").unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
