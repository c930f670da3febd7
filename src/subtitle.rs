use std::fs::Permissions;
use std::io::Write;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Result, SubtranslateError};

/// A single timed caption.
///
/// `time_range` is carried verbatim (`HH:MM:SS,mmm --> HH:MM:SS,mmm` in well
/// formed files) and is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub index: u32,
    pub time_range: String,
    pub lines: Vec<String>,
}

impl Entry {
    pub fn new(index: u32, time_range: impl Into<String>, text: &str) -> Self {
        Self {
            index,
            time_range: time_range.into(),
            // a blank line would end the SRT block early
            lines: text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Entry text with its line breaks restored
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Same index and time range, new text
    pub fn with_text(&self, text: &str) -> Self {
        Self::new(self.index, self.time_range.clone(), text)
    }
}

/// Entries in source-file order. Indices are kept as found, even when they
/// repeat or go backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub entries: Vec<Entry>,
}

impl Document {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the first `limit` entries
    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
    }
}

/// Parse SRT content. Malformed blocks are skipped rather than reported.
pub fn parse(content: &str) -> Document {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut entries = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut skipped = 0usize;

    for line in normalized.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line);
            continue;
        }
        if block.is_empty() {
            continue;
        }
        match parse_block(&block) {
            Some(entry) => entries.push(entry),
            None => skipped += 1,
        }
        block.clear();
    }

    if skipped > 0 {
        debug!("Skipped {} malformed subtitle blocks", skipped);
    }
    debug!("Parsed {} subtitle entries", entries.len());
    Document::new(entries)
}

fn parse_block(block: &[&str]) -> Option<Entry> {
    if block.len() < 3 {
        return None;
    }

    let index = block[0].trim().trim_start_matches('\u{feff}').parse::<u32>().ok()?;
    let time_range = block[1].trim();

    Some(Entry {
        index,
        time_range: time_range.to_string(),
        lines: block[2..].iter().map(|line| line.to_string()).collect(),
    })
}

/// Render a document as SRT: one block per entry, blocks separated by a
/// single blank line.
pub fn serialize(document: &Document) -> String {
    let mut srt_content = String::new();

    for entry in &document.entries {
        srt_content.push_str(&format!(
            "{}\n{}\n{}\n\n",
            entry.index,
            entry.time_range,
            entry.text()
        ));
    }

    srt_content
}

/// Decode raw subtitle bytes. UTF-8 (with or without BOM) is preferred;
/// anything else is read as Windows-1252, which covers the Latin-1 files
/// commonly found next to older releases.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            warn!("Subtitle file is not valid UTF-8, decoding as windows-1252");
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

/// Read and parse a subtitle file
pub async fn read_document<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    let bytes = fs::read(path).await?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(parse(&decode(&bytes)))
}

/// Write a document as UTF-8 SRT. The content goes to a temporary file in
/// the destination directory first and is renamed into place, so readers
/// never observe a partial file.
pub fn write_document<P: AsRef<Path>>(document: &Document, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Writing SRT file: {}", output_path.display());

    let dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| SubtranslateError::Write(format!("{}: {}", dir.display(), e)))?;
    temp.write_all(serialize(document).as_bytes())
        .and_then(|_| match output_permissions(output_path) {
            Some(permissions) => temp.as_file().set_permissions(permissions),
            None => Ok(()),
        })
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| SubtranslateError::Write(format!("{}: {}", output_path.display(), e)))?;
    temp.persist(output_path)
        .map_err(|e| SubtranslateError::Write(format!("{}: {}", output_path.display(), e.error)))?;

    Ok(())
}

/// Mode for the output file: an existing target keeps its own, a new one
/// gets 0644 instead of the 0600 of temporary files.
fn output_permissions(output_path: &Path) -> Option<Permissions> {
    if let Ok(metadata) = std::fs::metadata(output_path) {
        return Some(metadata.permissions());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}
