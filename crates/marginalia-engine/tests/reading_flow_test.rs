//! End-to-end reading flow through the public API: import an article,
//! select text, highlight it, annotate it, and lay the cards out.

use marginalia_engine::{
    ArticleId, ArticleStore, CardMetrics, MemoryStore, NewArticle, Node, ReadingSession,
    RenderTree, SelectionRange, SpanKind, UserId,
};

const SAMPLE: &str = "Hello world.\n\nSecond paragraph here.";

fn reader_with_sample() -> (MemoryStore, ArticleId) {
    let mut store = MemoryStore::new();
    store.sign_in(UserId::new("reader"));
    let article = store
        .create_article(NewArticle {
            title: "Sample".to_string(),
            url: Some("https://www.example.com/sample".to_string()),
            description: None,
            authors: Vec::new(),
            content: SAMPLE.to_string(),
        })
        .expect("create article");
    (store, article.id)
}

fn selection_for(session: &ReadingSession, start: usize, end: usize) -> SelectionRange {
    let (start_node, start_offset) = session.tree().caret_at(start).expect("start caret");
    let (end_node, end_offset) = session.tree().caret_at(end).expect("end caret");
    SelectionRange {
        start_node,
        start_offset,
        end_node,
        end_offset,
    }
}

fn marker_texts(tree: &RenderTree, wanted: SpanKind) -> Vec<String> {
    fn walk(nodes: &[Node], wanted: SpanKind, out: &mut Vec<String>) {
        for node in nodes {
            match node {
                Node::Marker { kind, text, .. } if *kind == wanted => out.push(text.clone()),
                Node::Element { children, .. } => walk(children, wanted, out),
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    walk(tree.children(), wanted, &mut out);
    out
}

#[test]
fn test_selection_becomes_a_painted_saved_highlight() {
    // Given a signed-in reader with one saved article
    let (mut store, article) = reader_with_sample();
    let mut session = ReadingSession::open(&store, article).expect("open");

    // When selecting characters 6..11 the way a frontend would, by
    // rendered leaf and inner offset
    let range = selection_for(&session, 6, 11);
    let selection = session.select(&range).expect("selection resolves").clone();
    assert_eq!(selection.range, 6..11);
    assert_eq!(selection.text, "world");

    // And saving it as a highlight
    session.add_highlight(&mut store).expect("highlight saves");

    // Then the marker wraps exactly the selected word
    assert_eq!(
        marker_texts(session.tree(), SpanKind::Highlight),
        vec!["world".to_string()]
    );
    // And the stored record carries the same offsets
    let saved = &store.highlights(article).expect("list")[0];
    assert_eq!((saved.start_offset, saved.end_offset), (6, 11));
    assert_eq!(saved.text, "world");
}

#[test]
fn test_reopening_repaints_saved_spans() {
    let (mut store, article) = reader_with_sample();
    {
        let mut session = ReadingSession::open(&store, article).expect("open");
        let range = selection_for(&session, 6, 11);
        session.select(&range).expect("selection resolves");
        session.add_highlight(&mut store).expect("highlight saves");
    }

    // A fresh session over the same article paints the stored span
    // without any interaction.
    let reopened = ReadingSession::open(&store, article).expect("reopen");
    assert_eq!(
        marker_texts(reopened.tree(), SpanKind::Highlight),
        vec!["world".to_string()]
    );
}

#[test]
fn test_annotation_wins_over_overlapping_highlight() {
    let (mut store, article) = reader_with_sample();
    let mut session = ReadingSession::open(&store, article).expect("open");

    // Given a saved highlight over "world."
    let range = selection_for(&session, 6, 12);
    session.select(&range).expect("selection resolves");
    let highlight = session.add_highlight(&mut store).expect("highlight saves");

    // When an annotation lands across "Hello world"
    let range = selection_for(&session, 0, 11);
    session.select(&range).expect("selection resolves");
    session.start_annotation(None).expect("compose");
    session
        .commit_annotation(&mut store, "opening line")
        .expect("annotation saves");

    // Then only the annotation paints and the highlight is reported
    // suppressed, not lost
    assert_eq!(
        marker_texts(session.tree(), SpanKind::Annotation),
        vec!["Hello world".to_string()]
    );
    assert!(marker_texts(session.tree(), SpanKind::Highlight).is_empty());
    assert_eq!(session.overlay().suppressed, vec![highlight]);

    // And deleting the annotation brings the highlight back
    let annotation = session.annotations()[0].id;
    session
        .delete_annotation(&mut store, annotation)
        .expect("delete");
    assert_eq!(
        marker_texts(session.tree(), SpanKind::Highlight),
        vec!["world.".to_string()]
    );
}

#[test]
fn test_cards_never_overlap_after_layout() {
    let (mut store, article) = reader_with_sample();
    let mut session = ReadingSession::open(&store, article).expect("open");

    // Three annotations whose ideal positions collide
    let mut spans = Vec::new();
    for (start, end) in [(0, 5), (6, 11), (14, 20)] {
        let range = selection_for(&session, start, end);
        session.select(&range).expect("selection resolves");
        session.start_annotation(None).expect("compose");
        spans.push(
            session
                .commit_annotation(&mut store, "note")
                .expect("annotation saves"),
        );
    }

    let ideals = [0.0_f32, 5.0, 200.0];
    let height = 50.0;
    session.handle_resize(|span| {
        spans.iter().position(|s| *s == span).map(|i| CardMetrics {
            anchor_top: ideals[i],
            card_height: Some(height),
        })
    });

    let tops: Vec<f32> = spans
        .iter()
        .map(|span| session.card_top(*span).expect("card placed"))
        .collect();
    assert_eq!(tops, vec![0.0, 60.0, 200.0]);
    // Consecutive cards keep at least the minimum gap.
    for pair in tops.windows(2) {
        assert!(pair[1] >= pair[0] + height + 10.0);
    }
}
