//! Icon surface and the file-backed indicator host.
//!
//! An [`IconSurface`] converts a rendered bitmap into the resource the
//! indicator host displays. The resource is an owned value: dropping it is
//! what releases it, so the motion engine can guarantee that at most one is
//! alive by dropping the old icon before asking for a new one.
//!
//! [`FileIndicator`] is the host used by the binary. It keeps the current icon
//! as `icon.png` and the tooltip as `tooltip.txt` inside one directory, both
//! replaced atomically, which status bars can poll or watch. PNG encoding and
//! the icon file writes run on the blocking pool, off the runtime workers.

use std::fs;
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use carousel_shared::{CarouselError, CarouselResult, TooltipSink};
use image::{ImageFormat, RgbaImage};
use tracing::{debug, trace};

pub const ICON_FILE: &str = "icon.png";
pub const TOOLTIP_FILE: &str = "tooltip.txt";

/// Turns bitmaps into displayable icon resources.
pub trait IconSurface: Send {
    /// Owned icon resource; dropping it releases it
    type Icon: Send + Sync;

    fn create_icon(
        &mut self,
        bitmap: RgbaImage,
    ) -> impl Future<Output = CarouselResult<Self::Icon>> + Send;

    /// Make `icon` the displayed icon
    fn install_icon(
        &mut self,
        icon: &Self::Icon,
    ) -> impl Future<Output = CarouselResult<()>> + Send;
}

/// PNG-encoded icon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PngIcon {
    bytes: Arc<[u8]>,
}

impl PngIcon {
    pub fn encode(bitmap: &RgbaImage) -> CarouselResult<Self> {
        let mut bytes = Vec::new();
        bitmap
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(CarouselError::icon_surface)?;
        Ok(Self {
            bytes: bytes.into(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Indicator host that publishes icon and tooltip as files.
#[derive(Debug, Clone)]
pub struct FileIndicator {
    dir: PathBuf,
}

impl FileIndicator {
    /// Use `dir`, creating it if needed
    pub fn create(dir: impl Into<PathBuf>) -> CarouselResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn icon_path(&self) -> PathBuf {
        self.dir.join(ICON_FILE)
    }

    pub fn tooltip_path(&self) -> PathBuf {
        self.dir.join(TOOLTIP_FILE)
    }

    /// Remove the published files, hiding the indicator
    pub fn clear(&self) -> CarouselResult<()> {
        for path in [self.icon_path(), self.tooltip_path()] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Write through a temporary sibling and rename, so readers never see a partial file
fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Run `f` on the blocking pool
async fn run_blocking<T, F>(f: F) -> CarouselResult<T>
where
    F: FnOnce() -> CarouselResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CarouselError::IndicatorHost {
            message: format!("Blocking task failed: {}", e),
        })?
}

impl IconSurface for FileIndicator {
    type Icon = PngIcon;

    async fn create_icon(&mut self, bitmap: RgbaImage) -> CarouselResult<PngIcon> {
        run_blocking(move || PngIcon::encode(&bitmap)).await
    }

    async fn install_icon(&mut self, icon: &PngIcon) -> CarouselResult<()> {
        let path = self.icon_path();
        let bytes = icon.bytes.clone();
        run_blocking(move || {
            write_atomic(&path, &bytes).map_err(|e| CarouselError::IndicatorHost {
                message: format!("{}: {}", path.display(), e),
            })
        })
        .await?;
        trace!("Installed icon ({} bytes)", icon.as_bytes().len());
        Ok(())
    }
}

impl TooltipSink for FileIndicator {
    fn set_tooltip(&self, text: &str) -> CarouselResult<()> {
        let path = self.tooltip_path();
        write_atomic(&path, text.as_bytes()).map_err(|e| CarouselError::IndicatorHost {
            message: format!("{}: {}", path.display(), e),
        })
    }
}
