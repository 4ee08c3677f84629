//! Object key naming
//!
//! Keys have the form `[project_prefix/][folder/]{millis}-{random}{.ext}` so two
//! uploads of the same file never collide.

use std::path::Path;

use rand::Rng;

/// Generate a collision-resistant file name keeping the source extension
pub fn unique_file_name(original_name: &str) -> String {
    let millis = jiff::Timestamp::now().as_millisecond();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{millis}-{suffix}{}", extension_of(original_name))
}

/// Join prefix, folder and file name, skipping empty segments
pub fn object_key(project_prefix: Option<&str>, folder: Option<&str>, file_name: &str) -> String {
    [project_prefix, folder, Some(file_name)]
        .into_iter()
        .flatten()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Dot-prefixed extension of `name`, or an empty string
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Content type for `name`, guessed from its extension
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
