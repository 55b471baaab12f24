use pagesmith_proto::patch::*;

mod common;
use common::SAMPLE_DOCUMENT;

fn block(search: &str, replace: &str) -> String {
    format!("<<<<<<< SEARCH\n{search}\n=======\n{replace}\n>>>>>>> REPLACE")
}

#[test]
fn matching_block_replaces_first_occurrence_only() {
    let raw = format!("I updated the heading.\n\n{}\n", block("<h1>Old</h1>", "<h1>New</h1>"));
    let outcome = apply_patch_response(SAMPLE_DOCUMENT, &raw);

    assert_eq!(
        outcome.kind,
        MergeKind::Patched {
            applied: 1,
            skipped: 0
        }
    );
    assert!(outcome.document.contains("<h1>New</h1>"));
    assert_eq!(
        outcome.document,
        SAMPLE_DOCUMENT.replacen("<h1>Old</h1>", "<h1>New</h1>", 1)
    );
    // the footer's "Old" is untouched
    assert!(outcome.document.contains("<footer><p>Old</p></footer>"));
}

#[test]
fn non_matching_prose_wrapped_blocks_leave_document_identical() {
    let raw = format!(
        "Here is the change you asked for:\n\n{}\n\nLet me know!",
        block("<h2>Missing</h2>", "<h2>Found</h2>")
    );
    let outcome = apply_patch_response(SAMPLE_DOCUMENT, &raw);
    assert_eq!(outcome.kind, MergeKind::Unchanged);
    assert_eq!(outcome.document, SAMPLE_DOCUMENT);
}

#[test]
fn partial_application_is_tolerated() {
    let raw = [
        block("<h1>Old</h1>", "<h1>New</h1>"),
        block("<nav></nav>", "<nav>menu</nav>"),
    ]
    .join("\n");
    let outcome = apply_patch_response(SAMPLE_DOCUMENT, &raw);
    assert_eq!(
        outcome.kind,
        MergeKind::Patched {
            applied: 1,
            skipped: 1
        }
    );
}

#[test]
fn reapplying_a_patch_never_errors() {
    let patches = vec![Patch::new("<h1>Old</h1>", "<h1>New</h1>")];
    let once = apply_patches(SAMPLE_DOCUMENT, &patches);
    let twice = apply_patches(&once.document, &patches);
    assert_eq!(twice.document, once.document);
    assert_eq!(twice.skipped, 1);

    // search text still present after the first pass: applies again
    let repeated = vec![Patch::new("Old", "New")];
    let first = apply_patches(SAMPLE_DOCUMENT, &repeated);
    let second = apply_patches(&first.document, &repeated);
    assert_eq!(second.applied, 1);
    assert!(second.document.contains("<footer><p>New</p></footer>"));
}

#[test]
fn first_generation_returns_bare_document_verbatim() {
    let raw = "<!DOCTYPE html><html><head></head><body><main>Hi</main></body></html>";
    let outcome = merge_response("", raw, false);
    assert_eq!(outcome.document, raw);
}

#[test]
fn follow_up_with_whole_document_replaces() {
    let raw = "<html><body>rewritten</body></html>";
    let outcome = merge_response(SAMPLE_DOCUMENT, raw, true);
    assert_eq!(outcome.kind, MergeKind::Replaced);
    assert_eq!(outcome.document, raw);
}

#[test]
fn patch_crlf_line_endings() {
    let raw = "<<<<<<< SEARCH\r\n<h1>Old</h1>\r\n=======\r\n<h1>Win</h1>\r\n>>>>>>> REPLACE\r\n";
    assert_eq!(parse_patches(raw), vec![Patch::new("<h1>Old</h1>", "<h1>Win</h1>")]);
}
