//! Content type helpers.

/// MIME type for HLS manifests.
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
/// MIME type for MPEG transport stream segments.
pub const SEGMENT_CONTENT_TYPE: &str = "video/MP2T";
/// Fallback for anything else.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Segment extension written by the encoder.
const SEGMENT_EXTENSION: &str = "ts";

/// Determine content type from a file name's extension. `manifest_extension`
/// is the configured playlist extension, without the dot.
pub fn content_type_for(name: &str, manifest_extension: &str) -> &'static str {
    if is_manifest(name, manifest_extension) {
        MANIFEST_CONTENT_TYPE
    } else if has_extension(name, SEGMENT_EXTENSION) {
        SEGMENT_CONTENT_TYPE
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

/// Whether `name` is an HLS manifest under the configured extension.
pub fn is_manifest(name: &str, manifest_extension: &str) -> bool {
    has_extension(name, manifest_extension)
}

/// `name` is `<non-empty stem>.<ext>`.
fn has_extension(name: &str, ext: &str) -> bool {
    !ext.is_empty()
        && name
            .strip_suffix(ext)
            .and_then(|rest| rest.strip_suffix('.'))
            .is_some_and(|stem| !stem.is_empty())
}
