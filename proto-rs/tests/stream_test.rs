use futures::StreamExt;
use futures::stream;
use pagesmith_proto::*;

mod common;
use common::{chunked, sample_events, sample_upstream_lines};

fn decode_all(chunks: &[Vec<u8>]) -> (Vec<GenerationEvent>, UpstreamDecoder) {
    let mut decoder = SseDecoder::upstream();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.feed(chunk));
    }
    events.extend(decoder.finish());
    (events, decoder)
}

#[test]
fn single_content_delta_then_done() {
    let input = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
    let (events, decoder) = decode_all(&[input.to_vec()]);

    assert_eq!(
        events,
        vec![GenerationEvent::content("Hi"), GenerationEvent::Done]
    );
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, GenerationEvent::Thinking { .. }))
    );
    assert_eq!(decoder.content(), "Hi");
    assert_eq!(decoder.reasoning(), "");
}

#[test]
fn chunk_boundaries_do_not_change_the_result() {
    let bytes = sample_upstream_lines().concat().into_bytes();

    for size in [1, 2, 3, 7, 16, 64, bytes.len()] {
        let (events, decoder) = decode_all(&chunked(&bytes, size));
        assert_eq!(events, sample_events(), "chunk size {}", size);
        assert_eq!(
            decoder.content(),
            "<!DOCTYPE html><html><body>Hi</body></html>"
        );
        assert_eq!(decoder.reasoning(), "Planning the hero.");
    }
}

#[test]
fn nothing_follows_done() {
    let input = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n";
    let (events, decoder) = decode_all(&[input.as_bytes().to_vec()]);
    assert_eq!(
        events,
        vec![GenerationEvent::content("a"), GenerationEvent::Done]
    );
    assert_eq!(decoder.content(), "a");
}

#[tokio::test]
async fn decode_stream_reports_transport_errors_once() {
    let chunks: Vec<Result<Vec<u8>, String>> = vec![
        Ok(b"data: {\"choices\":[{\"delta\":{\"content\":\"par".to_vec()),
        Ok(b"tial\"}}]}\n\n".to_vec()),
        Err("connection reset".to_string()),
        Ok(b"data: [DONE]\n\n".to_vec()),
    ];

    let events: Vec<GenerationEvent> = decode_stream(SseDecoder::upstream(), stream::iter(chunks))
        .collect()
        .await;

    assert_eq!(
        events,
        vec![
            GenerationEvent::content("partial"),
            GenerationEvent::error("connection reset")
        ]
    );
}

#[tokio::test]
async fn decode_stream_ends_with_done_when_source_closes() {
    let chunks: Vec<Result<&[u8], String>> =
        vec![Ok(b"data: {\"type\":\"content\",\"data\":\"<p>\"}\n\n".as_slice())];

    let events: Vec<GenerationEvent> =
        decode_stream(SseDecoder::normalized(), stream::iter(chunks))
            .collect()
            .await;

    assert_eq!(
        events,
        vec![GenerationEvent::content("<p>"), GenerationEvent::Done]
    );
}

#[test]
fn normalized_stream_round_trips_through_writer() {
    let mut writer = EventWriter::new(Vec::new());
    for event in sample_events() {
        writer.write_event(&event).unwrap();
    }
    let bytes = writer.into_inner();

    let mut reader = EventReader::new(bytes.as_slice(), NormalizedSchema);
    let events = reader.read_all_events().unwrap();

    // the normalized stream has no done frame; the reader synthesizes it at EOF
    assert_eq!(events, sample_events());
}

#[test]
fn normalized_error_frame_is_terminal() {
    let mut decoder = SseDecoder::normalized();
    let events = decoder.feed(
        b"data: {\"type\":\"content\",\"data\":\"<h1>\"}\n\ndata: {\"error\":\"Upstream stream failed\"}\n\n",
    );
    assert_eq!(
        events,
        vec![
            GenerationEvent::content("<h1>"),
            GenerationEvent::error("Upstream stream failed")
        ]
    );
    assert!(decoder.finish().is_empty());
}
