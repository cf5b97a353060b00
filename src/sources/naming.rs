/// Adds the implicit `latest` tag to a reference that carries neither a tag
/// nor a digest, the way runtimes record it in `RepoTags`.
pub fn with_default_tag(reference: &str) -> String {
    let name = reference.rsplit('/').next().unwrap_or(reference);
    if name.contains(':') || reference.contains('@') {
        reference.to_string()
    } else {
        format!("{}:latest", reference)
    }
}

/// Turns a reference into something usable inside a file name.
pub fn sanitize_reference(reference: &str) -> String {
    reference
        .chars()
        .map(|c| match c {
            '/' | ':' | '@' | ' ' => '-',
            c => c,
        })
        .collect()
}

/// Prefix for the temporary export directory of a set of references.
pub fn images_prefix(images: &[String]) -> String {
    let joined = images
        .iter()
        .map(|image| sanitize_reference(image))
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        "docker-save-".to_string()
    } else {
        format!("{}-", joined)
    }
}
