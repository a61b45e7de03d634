//! Output file naming.

use std::collections::HashSet;

use super::classify::classify;

/// Extension given to every converted file.
pub const OUTPUT_EXTENSION: &str = "mp3";

/// Derives the output file name for an input display name.
///
/// A supported source extension is replaced with `.mp3`. Anything else is
/// kept as part of the stem, since unsupported files never produce output.
/// Directory components are discarded so the result always lands directly in
/// the output directory.
pub fn output_file_name(display_name: &str) -> String {
    let base = display_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(display_name);

    let stem = if classify(base).supported {
        base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base)
    } else {
        base
    };

    let stem = stem.trim();
    if stem.is_empty() {
        format!("output.{}", OUTPUT_EXTENSION)
    } else {
        format!("{}.{}", stem, OUTPUT_EXTENSION)
    }
}

/// Assigns a unique output file name to every input, in list order.
///
/// Inputs keep their natural name (`a.wav` -> `a.mp3`) when nothing earlier
/// in the list claimed it. Later duplicates get a numeric suffix
/// (`a (2).mp3`, `a (3).mp3`, ...) that skips names claimed by any other
/// input. Uniqueness is case-insensitive.
pub fn assign_output_names<S: AsRef<str>>(display_names: &[S]) -> Vec<String> {
    let natural: Vec<String> = display_names
        .iter()
        .map(|n| output_file_name(n.as_ref()))
        .collect();

    let mut taken: HashSet<String> = HashSet::with_capacity(natural.len());
    let mut assigned: Vec<Option<String>> = natural
        .iter()
        .map(|name| taken.insert(name.to_lowercase()).then(|| name.clone()))
        .collect();

    let suffix = format!(".{}", OUTPUT_EXTENSION);
    for (slot, name) in assigned.iter_mut().zip(&natural) {
        if slot.is_some() {
            continue;
        }
        let stem = name.strip_suffix(&suffix).unwrap_or(name);
        let mut n = 2u32;
        loop {
            let candidate = format!("{} ({}){}", stem, n, suffix);
            if taken.insert(candidate.to_lowercase()) {
                *slot = Some(candidate);
                break;
            }
            n += 1;
        }
    }

    assigned.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name_replaces_known_extension() {
        assert_eq!(output_file_name("a.wav"), "a.mp3");
        assert_eq!(output_file_name("Live Set.AIFF"), "Live Set.mp3");
        assert_eq!(output_file_name("only.ogg"), "only.mp3");
        assert_eq!(output_file_name("mix.v2.flac"), "mix.v2.mp3");
    }

    #[test]
    fn test_output_file_name_keeps_unknown_extension() {
        assert_eq!(output_file_name("c.txt"), "c.txt.mp3");
        assert_eq!(output_file_name("noext"), "noext.mp3");
    }

    #[test]
    fn test_output_file_name_strips_directories() {
        assert_eq!(output_file_name("../../etc/evil.wav"), "evil.mp3");
        assert_eq!(output_file_name("dir\\song.flac"), "song.mp3");
    }

    #[test]
    fn test_output_file_name_empty_stem() {
        assert_eq!(output_file_name(".wav"), "output.mp3");
        assert_eq!(output_file_name(""), "output.mp3");
    }

    #[test]
    fn test_assign_output_names_no_collisions() {
        let names = assign_output_names(&["a.wav", "b.flac", "c.txt"]);
        assert_eq!(names, vec!["a.mp3", "b.mp3", "c.txt.mp3"]);
    }

    #[test]
    fn test_assign_output_names_disambiguates_in_list_order() {
        let names = assign_output_names(&["a.wav", "a.flac", "a.ogg"]);
        assert_eq!(names, vec!["a.mp3", "a (2).mp3", "a (3).mp3"]);
    }

    #[test]
    fn test_assign_output_names_skips_claimed_names() {
        // "a (2).ogg" naturally claims "a (2).mp3", so the duplicate "a" skips it
        let names = assign_output_names(&["a.wav", "a.flac", "a (2).ogg"]);
        assert_eq!(names, vec!["a.mp3", "a (3).mp3", "a (2).mp3"]);
    }

    #[test]
    fn test_assign_output_names_case_insensitive() {
        let names = assign_output_names(&["Song.wav", "song.FLAC"]);
        assert_eq!(names, vec!["Song.mp3", "song (2).mp3"]);
    }
}
