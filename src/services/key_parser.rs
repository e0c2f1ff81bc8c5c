//! Object key grammar for the catalog bucket.
//!
//! ```text
//! Model/cover.jpg              -> model thumbnail candidate
//! Model/profile/icon.webp      -> profile image (icon.webp, banner.webp)
//! Model/Post/file.ext          -> post media (nested paths allowed below Post/)
//! ```
//!
//! Everything else, including directory markers, is ignored.

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm", "m4v", "mkv", "avi", "wmv", "flv"];

pub const PROFILE_SEGMENT: &str = "profile";
pub const PROFILE_ICON: &str = "icon.webp";
pub const PROFILE_BANNER: &str = "banner.webp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn from_file_name(file_name: &str) -> Self {
        match extension(file_name) {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedKey<'a> {
    /// `Model/<image>` at the top level of a model folder
    Model {
        model_name: &'a str,
        file_name: &'a str,
    },
    /// `Model/profile/...`
    ProfileMedia {
        model_name: &'a str,
        file_name: &'a str,
    },
    /// `Model/Post/...`
    Media {
        model_name: &'a str,
        post_name: &'a str,
        file_name: &'a str,
        kind: MediaKind,
    },
    Unknown,
}

impl<'a> ParsedKey<'a> {
    pub fn model_name(&self) -> Option<&'a str> {
        match self {
            ParsedKey::Model { model_name, .. }
            | ParsedKey::ProfileMedia { model_name, .. }
            | ParsedKey::Media { model_name, .. } => Some(*model_name),
            ParsedKey::Unknown => None,
        }
    }
}

/// Classifies a single object key. Borrows from the key, never allocates.
pub fn parse(key: &str) -> ParsedKey<'_> {
    if key.is_empty() || key.ends_with('/') {
        return ParsedKey::Unknown;
    }

    let mut parts = key.splitn(3, '/');
    let model_name = parts.next().unwrap_or_default();
    if model_name.is_empty() {
        return ParsedKey::Unknown;
    }

    let (Some(second), rest) = (parts.next(), parts.next()) else {
        return ParsedKey::Unknown;
    };

    match rest {
        None => {
            let is_image = extension(second)
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
                .unwrap_or(false);
            if is_image {
                ParsedKey::Model {
                    model_name,
                    file_name: second,
                }
            } else {
                ParsedKey::Unknown
            }
        }
        Some(remainder) if second == PROFILE_SEGMENT => ParsedKey::ProfileMedia {
            model_name,
            file_name: remainder,
        },
        Some(remainder) if !second.is_empty() => ParsedKey::Media {
            model_name,
            post_name: second,
            file_name: remainder,
            kind: MediaKind::from_file_name(remainder),
        },
        Some(_) => ParsedKey::Unknown,
    }
}

fn extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit('/').next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() && ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_image_is_model_thumbnail() {
        assert_eq!(
            parse("ModelA/cover.jpg"),
            ParsedKey::Model {
                model_name: "ModelA",
                file_name: "cover.jpg"
            }
        );
        assert!(matches!(parse("ModelA/Cover.PNG"), ParsedKey::Model { .. }));
    }

    #[test]
    fn test_top_level_non_image_is_unknown() {
        assert_eq!(parse("ModelA/notes.txt"), ParsedKey::Unknown);
        assert_eq!(parse("ModelA/README"), ParsedKey::Unknown);
    }

    #[test]
    fn test_post_video() {
        let parsed = parse("ModelA/Post1/video.mp4");
        assert_eq!(
            parsed,
            ParsedKey::Media {
                model_name: "ModelA",
                post_name: "Post1",
                file_name: "video.mp4",
                kind: MediaKind::Video,
            }
        );
    }

    #[test]
    fn test_post_media_defaults_to_image() {
        let parsed = parse("ModelA/Post1/scan.tiff");
        assert!(matches!(
            parsed,
            ParsedKey::Media {
                kind: MediaKind::Image,
                ..
            }
        ));
    }

    #[test]
    fn test_nested_file_name_is_joined() {
        assert_eq!(
            parse("ModelA/Post1/extras/clip.MOV"),
            ParsedKey::Media {
                model_name: "ModelA",
                post_name: "Post1",
                file_name: "extras/clip.MOV",
                kind: MediaKind::Video,
            }
        );
    }

    #[test]
    fn test_profile_media() {
        assert_eq!(
            parse("ModelA/profile/icon.webp"),
            ParsedKey::ProfileMedia {
                model_name: "ModelA",
                file_name: "icon.webp"
            }
        );
        assert_eq!(
            parse("ModelA/profile/old/banner.webp"),
            ParsedKey::ProfileMedia {
                model_name: "ModelA",
                file_name: "old/banner.webp"
            }
        );
    }

    #[test]
    fn test_directory_markers_and_malformed_keys() {
        assert_eq!(parse("ModelA/"), ParsedKey::Unknown);
        assert_eq!(parse("ModelA/Post1/"), ParsedKey::Unknown);
        assert_eq!(parse("ModelA"), ParsedKey::Unknown);
        assert_eq!(parse("/Post1/a.jpg"), ParsedKey::Unknown);
        assert_eq!(parse("ModelA//a.jpg"), ParsedKey::Unknown);
        assert_eq!(parse(""), ParsedKey::Unknown);
    }

    #[test]
    fn test_model_name_accessor() {
        assert_eq!(parse("ModelB/P/x.jpg").model_name(), Some("ModelB"));
        assert_eq!(parse("ModelB/profile/icon.webp").model_name(), Some("ModelB"));
        assert_eq!(parse("ModelB/").model_name(), None);
    }
}
