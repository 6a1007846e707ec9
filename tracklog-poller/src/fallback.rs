//! Deterministic placeholder selection
//!
//! When no real artwork resolves, a placeholder is picked from the
//! fallback catalog as a pure function of (artist, album, previous
//! placeholder). Consecutive fallback tracks never share a logo or color
//! unless the catalog offers no such alternative.

use tracklog_common::models::FallbackImage;

const HASH_SEED: u32 = 5381;
const HASH_MULTIPLIER: u32 = 33;

/// 32-bit djb2-xor hash over UTF-16 code units
pub fn fallback_hash(input: &str) -> u32 {
    input.encode_utf16().fold(HASH_SEED, |hash, unit| {
        hash.wrapping_mul(HASH_MULTIPLIER) ^ u32::from(unit)
    })
}

/// Pick a placeholder for a track
///
/// `previous` is the placeholder of the most recently played track, when
/// that track used one. Returns `None` only for an empty catalog.
pub fn select_fallback<'a>(
    artist: &str,
    album: &str,
    catalog: &'a [FallbackImage],
    previous: Option<&FallbackImage>,
) -> Option<&'a FallbackImage> {
    if catalog.is_empty() {
        return None;
    }

    let hash = fallback_hash(&format!("{}|{}", artist, album));

    let filtered: Vec<&FallbackImage> = match previous {
        Some(prev) => catalog
            .iter()
            .filter(|image| image.color != prev.color && image.logo != prev.logo)
            .collect(),
        None => Vec::new(),
    };

    let candidates: Vec<&FallbackImage> = if filtered.is_empty() {
        catalog.iter().collect()
    } else {
        filtered
    };

    Some(candidates[hash as usize % candidates.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklog_common::models::{ColorVariant, LogoVariant};

    fn catalog() -> Vec<FallbackImage> {
        let mut images = Vec::new();
        let mut id = 1;
        for logo in LogoVariant::ALL {
            for color in ColorVariant::ALL {
                images.push(FallbackImage {
                    id,
                    url: format!("https://cdn.example/{}-{}.jpg", logo, color),
                    logo,
                    color,
                });
                id += 1;
            }
        }
        images
    }

    #[test]
    fn test_hash_known_values() {
        assert_eq!(fallback_hash(""), 5381);
        // (5381 * 33) ^ 'a'
        assert_eq!(fallback_hash("a"), (5381 * 33) ^ 97);
        assert_eq!(fallback_hash("ab"), (((5381 * 33) ^ 97) * 33) ^ 98);
    }

    #[test]
    fn test_hash_wraps_instead_of_overflowing() {
        let long = "Yankee Hotel Foxtrot".repeat(50);
        // must not panic in debug builds
        let _ = fallback_hash(&long);
    }

    #[test]
    fn test_selection_is_pure() {
        let images = catalog();
        let prev = images[4].clone();
        for (artist, album) in [("Wilco", "Summerteeth"), ("Low", ""), ("", "")] {
            let first = select_fallback(artist, album, &images, Some(&prev));
            let second = select_fallback(artist, album, &images, Some(&prev));
            assert_eq!(first, second);
            assert_eq!(
                select_fallback(artist, album, &images, None),
                select_fallback(artist, album, &images, None)
            );
        }
    }

    #[test]
    fn test_without_previous_indexes_full_catalog() {
        let images = catalog();
        let expected = fallback_hash("Wilco|Summerteeth") as usize % images.len();
        let picked = select_fallback("Wilco", "Summerteeth", &images, None).unwrap();
        assert_eq!(picked.id, images[expected].id);
    }

    #[test]
    fn test_never_repeats_logo_or_color_of_previous() {
        let images = catalog();
        let artists = ["Wilco", "Low", "Tortoise", "Califone", "Andrew Bird", "Jeff Tweedy"];
        for prev in &images {
            for artist in artists {
                let picked = select_fallback(artist, "Some Album", &images, Some(prev)).unwrap();
                assert_ne!(picked.color, prev.color);
                assert_ne!(picked.logo, prev.logo);
            }
        }
    }

    #[test]
    fn test_falls_back_to_full_catalog_when_filter_empties() {
        let images: Vec<FallbackImage> = catalog()
            .into_iter()
            .filter(|image| image.logo == LogoVariant::Primary)
            .collect();
        let prev = images[0].clone();

        let picked = select_fallback("Wilco", "A Ghost Is Born", &images, Some(&prev)).unwrap();
        let expected = fallback_hash("Wilco|A Ghost Is Born") as usize % images.len();
        assert_eq!(picked.id, images[expected].id);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_fallback("Wilco", "Being There", &[], None).is_none());
    }
}
