//! Candidate thumbnail path generation.

use crate::model::item::{Item, ItemId};
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_THUMBNAIL_ROOT: &str = "/thumbnails";
pub const DEFAULT_FALLBACK_IMAGE: &str = "/placeholder.png";

const EXTENSIONS: [&str; 2] = ["gif", "png"];

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Item fields that drive candidate generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSource<'a> {
    pub id: Option<ItemId>,
    pub archetype: Option<&'a str>,
    /// Explicit filename relative to the thumbnail root.
    pub image: Option<&'a str>,
}

impl<'a> From<&'a Item> for ImageSource<'a> {
    fn from(item: &'a Item) -> Self {
        Self {
            id: Some(item.id),
            archetype: item.archetype.as_deref(),
            image: item.image.as_deref(),
        }
    }
}

/// Builds the ordered, deduplicated candidate list for one item.
///
/// Order: explicit filename, underscore form, spaced form, bare id,
/// whitespace-stripped form, lower-cased underscore form, lower-cased
/// stripped form. Each archetype form is tried as `.gif` then `.png`.
pub fn candidate_paths(thumbnail_root: &str, source: &ImageSource<'_>) -> Vec<String> {
    let root = thumbnail_root.trim().trim_end_matches('/');
    let mut candidates = CandidateList::default();

    if let Some(image) = source
        .image
        .map(|name| name.trim().trim_start_matches('/'))
        .filter(|name| !name.is_empty())
    {
        candidates.push(format!("{root}/{image}"));
    }

    let Some(id) = source.id else {
        return candidates.into_paths();
    };

    let archetype = source
        .archetype
        .map(str::trim)
        .filter(|name| !name.is_empty());

    if let Some(archetype) = archetype {
        let underscored = WHITESPACE_RE.replace_all(archetype, "_");
        candidates.push_named(root, &underscored, id);
        if WHITESPACE_RE.is_match(archetype) {
            candidates.push_named(root, archetype, id);
        }
    }

    for extension in EXTENSIONS {
        candidates.push(format!("{root}/{id}.{extension}"));
    }

    if let Some(archetype) = archetype {
        let stripped = WHITESPACE_RE.replace_all(archetype, "");
        candidates.push_named(root, &stripped, id);
        let underscored = WHITESPACE_RE.replace_all(archetype, "_");
        candidates.push_named(root, &underscored.to_lowercase(), id);
        candidates.push_named(root, &stripped.to_lowercase(), id);
    }

    candidates.into_paths()
}

#[derive(Default)]
struct CandidateList {
    paths: Vec<String>,
}

impl CandidateList {
    fn push(&mut self, path: String) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    fn push_named(&mut self, root: &str, name: &str, id: ItemId) {
        for extension in EXTENSIONS {
            self.push(format!("{root}/{name}_{id}.{extension}"));
        }
    }

    fn into_paths(self) -> Vec<String> {
        self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::{candidate_paths, ImageSource, DEFAULT_THUMBNAIL_ROOT};

    fn source(id: i64, archetype: Option<&str>) -> ImageSource<'_> {
        ImageSource {
            id: Some(id),
            archetype,
            image: None,
        }
    }

    #[test]
    fn spaced_archetype_produces_every_form_in_order() {
        let paths = candidate_paths(DEFAULT_THUMBNAIL_ROOT, &source(42, Some("Black Star")));
        assert_eq!(
            paths,
            vec![
                "/thumbnails/Black_Star_42.gif",
                "/thumbnails/Black_Star_42.png",
                "/thumbnails/Black Star_42.gif",
                "/thumbnails/Black Star_42.png",
                "/thumbnails/42.gif",
                "/thumbnails/42.png",
                "/thumbnails/BlackStar_42.gif",
                "/thumbnails/BlackStar_42.png",
                "/thumbnails/black_star_42.gif",
                "/thumbnails/black_star_42.png",
                "/thumbnails/blackstar_42.gif",
                "/thumbnails/blackstar_42.png",
            ]
        );
    }

    #[test]
    fn single_word_archetype_collapses_duplicate_forms() {
        let paths = candidate_paths(DEFAULT_THUMBNAIL_ROOT, &source(7, Some("Monk")));
        assert_eq!(
            paths,
            vec![
                "/thumbnails/Monk_7.gif",
                "/thumbnails/Monk_7.png",
                "/thumbnails/7.gif",
                "/thumbnails/7.png",
                "/thumbnails/monk_7.gif",
                "/thumbnails/monk_7.png",
            ]
        );
    }

    #[test]
    fn lowercase_archetype_keeps_first_occurrence_only() {
        let paths = candidate_paths(DEFAULT_THUMBNAIL_ROOT, &source(5, Some("sun")));
        assert_eq!(
            paths,
            vec![
                "/thumbnails/sun_5.gif",
                "/thumbnails/sun_5.png",
                "/thumbnails/5.gif",
                "/thumbnails/5.png",
            ]
        );
    }

    #[test]
    fn explicit_filename_comes_first_and_is_not_repeated() {
        let source = ImageSource {
            id: Some(3),
            archetype: Some("Moon"),
            image: Some("Moon_3.png"),
        };
        let paths = candidate_paths("/thumbnails/", &source);
        assert_eq!(paths[0], "/thumbnails/Moon_3.png");
        assert_eq!(paths[1], "/thumbnails/Moon_3.gif");
        assert_eq!(
            paths
                .iter()
                .filter(|path| path.as_str() == "/thumbnails/Moon_3.png")
                .count(),
            1
        );
    }

    #[test]
    fn missing_archetype_falls_back_to_bare_id_forms() {
        let paths = candidate_paths(DEFAULT_THUMBNAIL_ROOT, &source(9, Some("   ")));
        assert_eq!(paths, vec!["/thumbnails/9.gif", "/thumbnails/9.png"]);
    }

    #[test]
    fn nothing_to_go_on_yields_empty_list() {
        assert!(candidate_paths(DEFAULT_THUMBNAIL_ROOT, &ImageSource::default()).is_empty());
    }
}
