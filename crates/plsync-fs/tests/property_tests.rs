use plsync_fs::{LibraryRoot, NormalizedPath, verify_library_path};
use proptest::prelude::*;

/// Strategy for paths that follow `Artist - Album (Year)/NN Artist - Title.ext`.
fn library_key() -> impl Strategy<Value = String> {
    (
        "[A-Za-z][A-Za-z0-9 ]{0,12}[A-Za-z0-9]",
        "[A-Za-z][A-Za-z0-9 ]{0,12}[A-Za-z0-9]",
        1950u32..2030,
        1u32..99,
        "[A-Za-z][A-Za-z0-9 ]{0,12}[A-Za-z0-9]",
        prop::sample::select(vec!["mp3", "flac", "m4a"]),
    )
        .prop_map(|(artist, album, year, track, title, ext)| {
            format!(
                "{artist} - {album} ({year})/{track:02} {artist} - {title}.{ext}"
            )
        })
}

proptest! {
    #[test]
    fn test_normalization_invariants(s in "\\PC*") {
        let path = NormalizedPath::new(&s);
        let as_str = path.as_str();

        // No backslashes and no repeated separators
        prop_assert!(!as_str.contains('\\'));
        prop_assert!(!as_str.contains("//"));

        // Idempotent
        prop_assert_eq!(NormalizedPath::new(as_str), path.clone());
    }

    #[test]
    fn test_root_normalize_is_idempotent(s in "\\PC*") {
        let root = LibraryRoot::new(r"E:\Albums");
        let once = root.normalize(&s);
        let twice = root.normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_denormalize_roundtrip_windows_root(key in library_key()) {
        let root = LibraryRoot::new(r"E:\Albums");
        let normalized = root.normalize(&key);
        let absolute = root.denormalize(&normalized);
        prop_assert_eq!(root.normalize(&absolute.to_string_lossy()), normalized);
    }

    #[test]
    fn test_denormalize_roundtrip_posix_root(key in library_key()) {
        let root = LibraryRoot::new("/srv/music");
        let normalized = root.normalize(&key);
        let absolute = root.denormalize(&normalized);
        prop_assert_eq!(root.normalize(&absolute.to_string_lossy()), normalized);
    }

    #[test]
    fn test_generated_library_keys_conform(key in library_key()) {
        prop_assert_eq!(verify_library_path(&key), None);
    }
}
