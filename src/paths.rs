//! Path handling: turning caller-supplied paths into local filesystem paths,
//! and naming the translated output file.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::config::PathsConfig;

/// `<stem>.<xx>(.<qualifier>)?.srt`, case-insensitive
static LANGUAGE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.([a-z]{2})(\.[^.]+)?\.srt$").expect("valid language suffix pattern")
});

/// Resolves absolute, remote-share and relative paths. Performs no I/O.
#[derive(Debug, Clone)]
pub struct PathResolver {
    media_root: String,
    share_markers: Vec<String>,
    share_base: String,
    base_dir: PathBuf,
}

impl PathResolver {
    /// `base_dir` anchors relative paths, normally the current directory.
    pub fn new(config: &PathsConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            media_root: config.media_root.trim_end_matches('/').to_string(),
            share_markers: config.share_markers.clone(),
            share_base: config.share_base.clone(),
            base_dir: base_dir.into(),
        }
    }

    pub fn resolve(&self, raw_path: &str) -> PathBuf {
        debug!("Input path: {}", raw_path);

        if (!self.media_root.is_empty() && raw_path.starts_with(&self.media_root)) || raw_path.starts_with('/') {
            debug!("Already an absolute path, using as-is");
            return PathBuf::from(raw_path);
        }

        if self.is_remote_share(raw_path) {
            let relative = self.strip_share_prefix(raw_path);
            let full_path = format!("{}/{}", self.media_root, relative);
            debug!("Converted network path: {}", full_path);
            return PathBuf::from(full_path);
        }

        let full_path = normalize(&self.base_dir.join(raw_path));
        debug!("Resolved relative path: {}", full_path.display());
        full_path
    }

    fn is_remote_share(&self, raw_path: &str) -> bool {
        self.share_markers
            .iter()
            .any(|marker| !marker.is_empty() && raw_path.contains(marker.as_str()))
    }

    fn strip_share_prefix(&self, raw_path: &str) -> String {
        let mut rest = raw_path.trim_start_matches(['\\', '/']);
        if !self.share_base.is_empty() {
            if let Some((_, after)) = rest.split_once(self.share_base.as_str()) {
                rest = after.trim_start_matches(['\\', '/']);
            }
        }
        rest.replace('\\', "/")
    }
}

/// Lexically fold `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Language code embedded in a subtitle filename (`movie.en.srt` -> `en`)
pub fn extract_source_language(filename: &str) -> Option<String> {
    LANGUAGE_SUFFIX
        .captures(filename)
        .map(|caps| caps[1].to_lowercase())
}

/// Name of the translated file for `filename`.
///
/// An existing language code is replaced, keeping any qualifier after it;
/// otherwise `.{lang}` goes in front of the first `.srt`.
pub fn derive_output_name(filename: &str, target_language: &str) -> String {
    if let Some(code) = LANGUAGE_SUFFIX.captures(filename).and_then(|caps| caps.get(1)) {
        return format!("{}{}{}", &filename[..code.start()], target_language, &filename[code.end()..]);
    }

    match filename.to_ascii_lowercase().find(".srt") {
        Some(pos) => format!("{}.{}{}", &filename[..pos], target_language, &filename[pos..]),
        None => format!("{}.{}.srt", filename, target_language),
    }
}

/// Output path next to the source file
pub fn derive_output_path(source: &Path, target_language: &str) -> PathBuf {
    let filename = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(derive_output_name(&filename, target_language))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(&PathsConfig::default(), "/home/user/subs")
    }

    #[test]
    fn test_absolute_paths_unchanged() {
        let r = resolver();
        assert_eq!(r.resolve("/mnt/media/Series/a.en.srt"), PathBuf::from("/mnt/media/Series/a.en.srt"));
        assert_eq!(r.resolve("/tmp/b.srt"), PathBuf::from("/tmp/b.srt"));
    }

    #[test]
    fn test_unc_share_path() {
        let r = resolver();
        assert_eq!(
            r.resolve("\\\\192.168.0.2\\Media\\Series\\Show S01\\ep1.en.srt"),
            PathBuf::from("/mnt/media/Series/Show S01/ep1.en.srt")
        );
        assert_eq!(
            r.resolve("192.168.0.2/Media/Movies/film.srt"),
            PathBuf::from("/mnt/media/Movies/film.srt")
        );
    }

    #[test]
    fn test_relative_path() {
        let r = resolver();
        assert_eq!(r.resolve("ep1.srt"), PathBuf::from("/home/user/subs/ep1.srt"));
        assert_eq!(r.resolve("./x/../ep2.srt"), PathBuf::from("/home/user/subs/ep2.srt"));
        assert_eq!(r.resolve("../other/ep3.srt"), PathBuf::from("/home/user/other/ep3.srt"));
    }

    #[test]
    fn test_derive_output_name() {
        assert_eq!(derive_output_name("show.en.srt", "ja"), "show.ja.srt");
        assert_eq!(derive_output_name("show.en.web.srt", "ja"), "show.ja.web.srt");
        assert_eq!(derive_output_name("clip.srt", "fr"), "clip.fr.srt");
        assert_eq!(derive_output_name("Show.EN.SRT", "es"), "Show.es.SRT");
        assert_eq!(derive_output_name("notes", "de"), "notes.de.srt");
    }

    #[test]
    fn test_derive_output_name_is_stable() {
        let once = derive_output_name("show.en.srt", "ja");
        assert_eq!(derive_output_name(&once, "ja"), once);
        let clip = derive_output_name("clip.srt", "fr");
        assert_eq!(derive_output_name(&clip, "fr"), clip);
    }

    #[test]
    fn test_derive_output_path() {
        let path = derive_output_path(Path::new("/mnt/media/Series/ep1.en.srt"), "ja");
        assert_eq!(path, PathBuf::from("/mnt/media/Series/ep1.ja.srt"));
    }

    #[test]
    fn test_extract_source_language() {
        assert_eq!(extract_source_language("movie.EN.srt").as_deref(), Some("en"));
        assert_eq!(extract_source_language("movie.es.forced.srt").as_deref(), Some("es"));
        assert_eq!(extract_source_language("movie.srt"), None);
    }
}
