#![allow(dead_code)]

use pagesmith_proto::*;

/// A document shaped like what a first generation produces
pub const SAMPLE_DOCUMENT: &str = "<!DOCTYPE html>
<html lang=\"en\">
<head>
    <meta charset=\"utf-8\">
    <title>Bakery</title>
</head>
<body>
    <h1>Old</h1>
    <p class=\"lead\">Fresh bread daily.</p>
    <footer><p>Old</p></footer>
</body>
</html>";

/// Upstream chat-completion chunks, one SSE event each
pub fn sample_upstream_lines() -> Vec<String> {
    vec![
        "data: {\"choices\":[{\"delta\":{\"reasoning\":\"Planning the hero.\"}}]}\n\n".to_string(),
        ": OPENROUTER PROCESSING\n\n".to_string(),
        "data: {\"choices\":[{\"delta\":{\"content\":\"<!DOCTYPE html>\"}}]}\n\n".to_string(),
        "data: {\"choices\":[{\"delta\":{\"content\":\"<html><body>Hi</body>\"}}]}\n\n".to_string(),
        "data: {\"choices\":[{\"delta\":{\"content\":\"</html>\"}}]}\n\n".to_string(),
        "data: [DONE]\n\n".to_string(),
    ]
}

/// The events [`sample_upstream_lines`] should decode to
pub fn sample_events() -> Vec<GenerationEvent> {
    vec![
        GenerationEvent::thinking("Planning the hero."),
        GenerationEvent::content("<!DOCTYPE html>"),
        GenerationEvent::content("<html><body>Hi</body>"),
        GenerationEvent::content("</html>"),
        GenerationEvent::Done,
    ]
}

/// Split `bytes` into chunks of at most `size` bytes
pub fn chunked(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(|c| c.to_vec()).collect()
}
