use gallery_core::thumbnail::resolver::Transition;
use gallery_core::{
    FsImageProbe, GalleryConfig, ImageResolverRegistry, Item, ProbeOutcome, ResolveState,
};
use std::cell::Cell;
use std::fs;
use std::rc::Rc;

fn black_star_42() -> Item {
    Item::new(42, Some("Black Star".to_string()))
}

#[test]
fn resolves_first_candidate_present_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let thumbnails = dir.path().join("thumbnails");
    fs::create_dir_all(&thumbnails).unwrap();
    image::RgbaImage::new(6, 3)
        .save(thumbnails.join("42.png"))
        .unwrap();

    let config = GalleryConfig::default();
    let mut registry = ImageResolverRegistry::from_config(&config);
    let mut probe = FsImageProbe::new(dir.path());

    let state = registry.resolve_with(&black_star_42(), &mut probe);
    match state {
        ResolveState::Resolved { path, dimensions } => {
            assert_eq!(path, "/thumbnails/42.png");
            let dimensions = dimensions.unwrap();
            assert_eq!((dimensions.width, dimensions.height), (6, 3));
        }
        other => panic!("unexpected state: {other:?}"),
    }
}

#[test]
fn missing_assets_fall_back_and_notify_observer() {
    let dir = tempfile::tempdir().unwrap();
    let config = GalleryConfig {
        fallback_image: "/img/none.png".to_string(),
        ..GalleryConfig::default()
    };
    let mut registry = ImageResolverRegistry::from_config(&config);
    let fallbacks = Rc::new(Cell::new(0usize));
    let seen = Rc::clone(&fallbacks);
    registry.set_fallback_observer(move |item_id, tried| {
        assert_eq!(item_id, 42);
        seen.set(tried);
    });

    let state = registry.resolve_with(&black_star_42(), &mut FsImageProbe::new(dir.path()));
    assert_eq!(
        state,
        ResolveState::Fallback {
            path: "/img/none.png".to_string()
        }
    );
    assert_eq!(fallbacks.get(), 12);
}

#[test]
fn discarded_item_ignores_late_outcome() {
    let mut registry = ImageResolverRegistry::default();
    registry.track(&black_star_42());
    let request = registry.start_probe(42).unwrap();
    assert_eq!(request.path, "/thumbnails/Black_Star_42.gif");
    assert!(registry.start_probe(42).is_none());

    assert!(registry.discard(42));
    let transition = registry.complete_probe(request.ticket, ProbeOutcome::Loaded(None));
    assert_eq!(transition, Transition::Ignored);
    assert!(registry.is_empty());
}

#[test]
fn closure_probe_drives_resolution_in_candidate_order() {
    let mut registry = ImageResolverRegistry::default();
    let mut attempts = Vec::new();
    let state = registry.resolve_with(&Item::new(7, Some("Monk".to_string())), &mut |path: &str| {
        attempts.push(path.to_string());
        if path.ends_with("7.png") && !path.contains("Monk") {
            ProbeOutcome::Loaded(None)
        } else {
            ProbeOutcome::Failed
        }
    });

    assert_eq!(
        attempts,
        vec![
            "/thumbnails/Monk_7.gif",
            "/thumbnails/Monk_7.png",
            "/thumbnails/7.gif",
            "/thumbnails/7.png",
        ]
    );
    assert_eq!(
        state,
        ResolveState::Resolved {
            path: "/thumbnails/7.png".to_string(),
            dimensions: None
        }
    );
}
