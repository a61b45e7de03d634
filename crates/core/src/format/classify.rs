//! Extension-based classification of source audio files.

use serde::{Deserialize, Serialize};

/// Priority assigned to files with no extension or an unsupported one.
pub const UNKNOWN_PRIORITY: u8 = 99;

/// Source formats accepted by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// WAVE (uncompressed PCM)
    Wav,
    /// Audio Interchange File Format
    Aiff,
    /// Free Lossless Audio Codec
    Flac,
    /// MPEG-4 audio container
    M4a,
    /// Raw Advanced Audio Coding stream
    Aac,
    /// Ogg Vorbis
    Ogg,
}

impl SourceFormat {
    /// All supported formats in priority order.
    pub const ALL: [SourceFormat; 6] = [
        Self::Wav,
        Self::Aiff,
        Self::Flac,
        Self::M4a,
        Self::Aac,
        Self::Ogg,
    ];

    /// Resolves a format from a file extension (without the dot).
    ///
    /// Matching is case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "aiff" | "aif" => Some(Self::Aiff),
            "flac" => Some(Self::Flac),
            "m4a" => Some(Self::M4a),
            "aac" => Some(Self::Aac),
            "ogg" => Some(Self::Ogg),
            _ => None,
        }
    }

    /// Processing rank, lower goes first.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Wav => 1,
            Self::Aiff => 2,
            Self::Flac => 3,
            Self::M4a => 4,
            Self::Aac => 5,
            Self::Ogg => 6,
        }
    }

    /// Extensions recognised for this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Wav => &["wav"],
            Self::Aiff => &["aiff", "aif"],
            Self::Flac => &["flac"],
            Self::M4a => &["m4a"],
            Self::Aac => &["aac"],
            Self::Ogg => &["ogg"],
        }
    }

    /// Every supported extension, flattened.
    pub fn all_extensions() -> Vec<&'static str> {
        Self::ALL.iter().flat_map(|f| f.extensions()).copied().collect()
    }
}

/// Result of classifying a file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatClass {
    /// Whether the extension is in the supported set.
    pub supported: bool,
    /// Lowercased extension, empty when the name has none.
    pub extension: String,
    /// Sort rank; [`UNKNOWN_PRIORITY`] for unsupported files.
    pub priority: u8,
}

impl FormatClass {
    /// The recognised source format, if any.
    pub fn format(&self) -> Option<SourceFormat> {
        SourceFormat::from_extension(&self.extension)
    }
}

/// Classifies a file name (or path) by the text after its last `.`.
pub fn classify(filename: &str) -> FormatClass {
    // Only the final path component can carry the extension.
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let extension = base
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match SourceFormat::from_extension(&extension) {
        Some(format) => FormatClass {
            supported: true,
            extension,
            priority: format.priority(),
        },
        None => FormatClass {
            supported: false,
            extension,
            priority: UNKNOWN_PRIORITY,
        },
    }
}

/// Returns the indices of `names` ordered by ascending priority.
///
/// The sort is stable: equal priorities keep their original order.
pub fn priority_order<S: AsRef<str>>(names: &[S]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by_key(|&i| classify(names[i].as_ref()).priority);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_supported() {
        let class = classify("song.wav");
        assert!(class.supported);
        assert_eq!(class.extension, "wav");
        assert_eq!(class.priority, 1);

        assert_eq!(classify("a.aif").priority, 2);
        assert_eq!(classify("a.aiff").priority, 2);
        assert_eq!(classify("a.flac").priority, 3);
        assert_eq!(classify("a.m4a").priority, 4);
        assert_eq!(classify("a.aac").priority, 5);
        assert_eq!(classify("a.ogg").priority, 6);
    }

    #[test]
    fn test_classify_case_insensitive() {
        let class = classify("LOUD.FLAC");
        assert!(class.supported);
        assert_eq!(class.extension, "flac");
        assert_eq!(class.format(), Some(SourceFormat::Flac));
    }

    #[test]
    fn test_classify_unsupported() {
        let class = classify("notes.txt");
        assert!(!class.supported);
        assert_eq!(class.extension, "txt");
        assert_eq!(class.priority, UNKNOWN_PRIORITY);

        // mp3 is an output, not an accepted source
        assert!(!classify("already.mp3").supported);
    }

    #[test]
    fn test_classify_no_extension() {
        let class = classify("README");
        assert!(!class.supported);
        assert_eq!(class.extension, "");
        assert_eq!(class.priority, UNKNOWN_PRIORITY);

        assert!(!classify("trailing.").supported);
    }

    #[test]
    fn test_classify_uses_last_dot_of_base_name() {
        assert!(classify("my.mix.v2.ogg").supported);
        assert!(!classify("archive.wav.zip").supported);
        // A dotted directory must not leak an extension into the file name
        assert!(!classify("/music/album.flac/cover").supported);
        assert!(classify("C:\\rips\\track.Wav").supported);
    }

    #[test]
    fn test_priority_order_is_stable() {
        let names = ["b.ogg", "x.txt", "a.wav", "c.flac", "d.wav", "e"];
        let order = priority_order(&names);
        assert_eq!(order, vec![2, 4, 3, 0, 1, 5]);
    }

    #[test]
    fn test_all_extensions() {
        let exts = SourceFormat::all_extensions();
        assert_eq!(exts.len(), 7);
        assert!(exts.contains(&"aif"));
        assert!(exts.contains(&"ogg"));
    }
}
