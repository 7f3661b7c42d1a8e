//! Out-of-band image load checks.

use log::debug;
use std::path::{Component, Path, PathBuf};

/// Natural pixel size of a loaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Width over height, `None` for degenerate images.
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.width > 0 && self.height > 0).then(|| f64::from(self.width) / f64::from(self.height))
    }
}

/// Result of one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Loaded(Option<Dimensions>),
    Failed,
}

/// Performs the load check for one candidate path.
pub trait ImageProbe {
    fn probe(&mut self, path: &str) -> ProbeOutcome;
}

impl<F> ImageProbe for F
where
    F: FnMut(&str) -> ProbeOutcome,
{
    fn probe(&mut self, path: &str) -> ProbeOutcome {
        self(path)
    }
}

/// Probe reading image headers from a public asset directory.
///
/// Candidate `/thumbnails/a.gif` maps to `<public_dir>/thumbnails/a.gif`.
#[derive(Debug, Clone)]
pub struct FsImageProbe {
    public_dir: PathBuf,
}

impl FsImageProbe {
    pub fn new(public_dir: impl Into<PathBuf>) -> Self {
        Self {
            public_dir: public_dir.into(),
        }
    }

    /// Maps a URL path onto the asset directory. Rejects parent traversal.
    pub fn local_path(&self, url_path: &str) -> Option<PathBuf> {
        let relative = Path::new(url_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if escapes || relative.as_os_str().is_empty() {
            return None;
        }
        Some(self.public_dir.join(relative))
    }
}

impl ImageProbe for FsImageProbe {
    fn probe(&mut self, path: &str) -> ProbeOutcome {
        let Some(local) = self.local_path(path) else {
            return ProbeOutcome::Failed;
        };

        match image::image_dimensions(&local) {
            Ok((width, height)) => ProbeOutcome::Loaded(Some(Dimensions { width, height })),
            Err(err) => {
                debug!("event=thumbnail_probe module=thumbnail status=miss error={err}");
                ProbeOutcome::Failed
            }
        }
    }
}
