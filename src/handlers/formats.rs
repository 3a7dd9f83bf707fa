//! Format list normalization shared by every platform handler

use serde::{Deserialize, Serialize};

use crate::humanize::ByteSize;

/// Format entry as reported by the extraction engine
///
/// Every field is optional because engines omit whatever they do not know.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFormat {
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub resolution: Option<String>,
    pub fps: Option<f64>,
    pub vcodec: Option<String>,
    pub acodec: Option<String>,
    pub filesize: Option<u64>,
    pub format_note: Option<String>,
    pub quality: Option<f64>,
    pub tbr: Option<f64>,
}

/// One selectable quality/codec variant of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub ext: Option<String>,
    pub resolution: String,
    pub fps: Option<f64>,
    pub vcodec: String,
    pub acodec: String,
    pub filesize: Option<u64>,
    pub format_note: String,
    pub quality: f64,
    pub tbr: Option<f64>,
    pub description: String,
}

/// Turn raw engine formats into the canonical, best-first list
///
/// Entries without a format id are dropped. Ties on quality keep their
/// input order.
pub fn process_formats(raw: Vec<RawFormat>) -> Vec<FormatDescriptor> {
    let mut formats: Vec<FormatDescriptor> = raw
        .into_iter()
        .filter(|f| f.format_id.as_deref().is_some_and(|id| !id.is_empty()))
        .map(canonicalize)
        .collect();

    // sort_by is stable
    formats.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    formats
}

fn canonicalize(raw: RawFormat) -> FormatDescriptor {
    let description = describe(&raw);

    FormatDescriptor {
        format_id: raw.format_id.unwrap_or_default(),
        ext: raw.ext,
        resolution: raw.resolution.unwrap_or_else(|| "unknown".to_string()),
        fps: raw.fps,
        vcodec: raw.vcodec.unwrap_or_else(|| "none".to_string()),
        acodec: raw.acodec.unwrap_or_else(|| "none".to_string()),
        filesize: raw.filesize,
        format_note: raw.format_note.unwrap_or_default(),
        quality: raw.quality.unwrap_or(0.0),
        tbr: raw.tbr,
        description,
    }
}

/// Human-readable label, e.g. `1920x1080 - 1080p - Video: avc1 - .mp4 - 12.5 MB`
pub fn describe(raw: &RawFormat) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(resolution) = present(&raw.resolution).filter(|r| *r != "audio only") {
        parts.push(resolution.to_string());
    }

    if let Some(note) = present(&raw.format_note).filter(|n| *n != "Default") {
        parts.push(note.to_string());
    }

    if let Some(vcodec) = present(&raw.vcodec).filter(|c| *c != "none") {
        parts.push(format!("Video: {vcodec}"));
    }

    if let Some(acodec) = present(&raw.acodec).filter(|c| *c != "none") {
        parts.push(format!("Audio: {acodec}"));
    }

    if let Some(ext) = present(&raw.ext) {
        parts.push(format!(".{ext}"));
    }

    if let Some(size) = raw.filesize.filter(|s| *s > 0) {
        parts.push(format!("{:.1} MB", ByteSize(size).as_mib()));
    }

    parts.join(" - ")
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str, quality: f64) -> RawFormat {
        RawFormat {
            format_id: Some(id.to_string()),
            quality: Some(quality),
            ..Default::default()
        }
    }

    #[test]
    fn test_sorts_descending_and_stable() {
        let formats = process_formats(vec![raw("a", 5.0), raw("b", 10.0), raw("c", 10.0)]);
        let ids: Vec<&str> = formats.iter().map(|f| f.format_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_drops_entries_without_id() {
        let formats = process_formats(vec![
            RawFormat::default(),
            RawFormat {
                format_id: Some(String::new()),
                ..Default::default()
            },
            raw("18", 1.0),
        ]);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].format_id, "18");
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let formats = process_formats(vec![RawFormat {
            format_id: Some("x".to_string()),
            ..Default::default()
        }]);
        let f = &formats[0];
        assert_eq!(f.resolution, "unknown");
        assert_eq!(f.vcodec, "none");
        assert_eq!(f.acodec, "none");
        assert_eq!(f.quality, 0.0);
        assert_eq!(f.description, "");
    }

    #[test]
    fn test_description_full() {
        let f = RawFormat {
            format_id: Some("137".to_string()),
            ext: Some("mp4".to_string()),
            resolution: Some("1920x1080".to_string()),
            vcodec: Some("avc1.640028".to_string()),
            acodec: Some("none".to_string()),
            filesize: Some(13_107_200),
            format_note: Some("1080p".to_string()),
            ..Default::default()
        };
        assert_eq!(
            describe(&f),
            "1920x1080 - 1080p - Video: avc1.640028 - .mp4 - 12.5 MB"
        );
    }

    #[test]
    fn test_description_audio_only() {
        let f = RawFormat {
            format_id: Some("140".to_string()),
            ext: Some("m4a".to_string()),
            resolution: Some("audio only".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            format_note: Some("Default".to_string()),
            ..Default::default()
        };
        assert_eq!(describe(&f), "Audio: mp4a.40.2 - .m4a");
    }

    #[test]
    fn test_deserializes_engine_json() {
        let json = r#"[
            {"format_id": "22", "ext": "mp4", "quality": 7, "filesize": null, "unknown_field": 1},
            {"ext": "webm"}
        ]"#;
        let raw: Vec<RawFormat> = serde_json::from_str(json).unwrap();
        let formats = process_formats(raw);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].quality, 7.0);
    }
}
