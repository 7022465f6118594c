//! Preserved-copy naming
//!
//! Generates unique file names for preserved copies, following the pattern:
//! `stem.ext` -> `stem_1.ext` -> `stem_2.ext` -> ...
//!
//! A name that already carries a numeric suffix is bumped rather than
//! stacked: `trip_3.kml` becomes `trip_4.kml`, never `trip_3_1.kml`.

/// Generates unique preserved-copy file names
pub struct CopyNamer;

impl CopyNamer {
    /// Splits `name` into stem and extension (including the dot)
    ///
    /// A dot at position zero marks a hidden file, not an extension.
    fn split(name: &str) -> (&str, &str) {
        match name.rfind('.') {
            Some(0) | None => (name, ""),
            Some(pos) => (&name[..pos], &name[pos..]),
        }
    }

    /// Strips a trailing `_N` suffix, returning the base and the next counter
    fn numbered_stem(stem: &str) -> (&str, u64) {
        if let Some(pos) = stem.rfind('_') {
            let digits = &stem[pos + 1..];
            if !digits.is_empty() {
                if let Ok(n) = digits.parse::<u64>() {
                    return (&stem[..pos], n.saturating_add(1));
                }
            }
        }
        (stem, 1)
    }

    /// Infinite iterator of candidate copy names for `name`
    ///
    /// Given "trip.kml" yields "trip_1.kml", "trip_2.kml", ...; given
    /// "trip_3.kml" starts at "trip_4.kml". Callers probe candidates
    /// against their store until one is unused.
    pub fn candidates(name: &str) -> impl Iterator<Item = String> {
        let (stem, ext) = Self::split(name);
        let (base, start) = Self::numbered_stem(stem);
        let base = base.to_string();
        let ext = ext.to_string();
        (start..).map(move |n| format!("{base}_{n}{ext}"))
    }

    /// Returns the first candidate for which `exists` reports false
    ///
    /// Probing continues until an unused name is found.
    pub fn next_available<F>(name: &str, mut exists: F) -> String
    where
        F: FnMut(&str) -> bool,
    {
        let (stem, ext) = Self::split(name);
        let (base, mut n) = Self::numbered_stem(stem);
        loop {
            let candidate = format!("{base}_{n}{ext}");
            if !exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_copy_with_extension() {
        let name = CopyNamer::next_available("trip.kml", |_| false);
        assert_eq!(name, "trip_1.kml");
    }

    #[test]
    fn test_first_copy_without_extension() {
        let name = CopyNamer::next_available("Makefile", |_| false);
        assert_eq!(name, "Makefile_1");
    }

    #[test]
    fn test_hidden_file_has_no_extension() {
        let name = CopyNamer::next_available(".config", |_| false);
        assert_eq!(name, ".config_1");
    }

    #[test]
    fn test_multiple_dots_split_on_last() {
        let name = CopyNamer::next_available("archive.tar.gz", |_| false);
        assert_eq!(name, "archive.tar_1.gz");
    }

    #[test]
    fn test_numbered_input_increments() {
        let name = CopyNamer::next_available("trip_3.kml", |_| false);
        assert_eq!(name, "trip_4.kml");
    }

    #[test]
    fn test_non_numeric_suffix_is_kept() {
        let name = CopyNamer::next_available("a_b.kml", |_| false);
        assert_eq!(name, "a_b_1.kml");
    }

    #[test]
    fn test_probing_skips_taken_names() {
        let taken = ["trip_1.kml", "trip_2.kml"];
        let name = CopyNamer::next_available("trip.kml", |c| taken.contains(&c));
        assert_eq!(name, "trip_3.kml");
    }

    #[test]
    fn test_probing_from_numbered_input() {
        let taken = ["trip_4.kml"];
        let name = CopyNamer::next_available("trip_3.kml", |c| taken.contains(&c));
        assert_eq!(name, "trip_5.kml");
    }

    #[test]
    fn test_candidates_sequence() {
        let first: Vec<String> = CopyNamer::candidates("a.kml").take(3).collect();
        assert_eq!(first, vec!["a_1.kml", "a_2.kml", "a_3.kml"]);
    }
}
