use serde::Serialize;

const FALLBACK_MIME_TYPES: &[&str] = &["audio/mpeg", "audio/ogg", "audio/wav"];

/// One `<source>`-style candidate for the fallback transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCandidate {
    pub url: String,
    pub mime: &'static str,
}

/// Guesses the MIME type browsers expect from the URL's extension.
/// Unknown extensions default to `audio/mpeg`.
pub fn mime_for_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "ogg" | "oga" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "audio/mpeg",
    }
}

/// Every encoding worth offering to a fallback player: the guessed type
/// first, then the remaining well-known audio types.
pub fn fallback_sources(url: &str) -> Vec<SourceCandidate> {
    let primary = mime_for_url(url);
    std::iter::once(primary)
        .chain(FALLBACK_MIME_TYPES.iter().copied().filter(|m| *m != primary))
        .map(|mime| SourceCandidate {
            url: url.to_string(),
            mime,
        })
        .collect()
}
