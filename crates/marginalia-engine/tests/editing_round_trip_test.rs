//! Block-level edits survive the full loop: load an article file, edit
//! one paragraph, save through the session, write back to disk, reload.

use relative_path::RelativePath;

use marginalia_engine::{
    ArticleStore, BlockEditor, MemoryStore, NewArticle, Node, ReadingSession, SpanKind, UserId, io,
};

const SOURCE: &str = "# Causal Trees\n\nHello world.\n\nSecond paragraph here.";

fn highlight_marker_texts(session: &ReadingSession) -> Vec<String> {
    fn walk(nodes: &[Node], out: &mut Vec<String>) {
        for node in nodes {
            match node {
                Node::Marker { kind: SpanKind::Highlight, text, .. } => out.push(text.clone()),
                Node::Element { children, .. } => walk(children, out),
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    walk(session.tree().children(), &mut out);
    out
}

#[test]
fn test_edit_one_block_without_touching_the_rest() {
    // Given an article file on disk
    let library = tempfile::tempdir().expect("temp dir");
    let rel = RelativePath::new("causal-trees.md");
    io::write_file(rel, library.path(), SOURCE).expect("seed file");

    // And a store seeded from that file
    let mut store = MemoryStore::new();
    store.sign_in(UserId::new("reader"));
    let content = io::read_file(rel, library.path()).expect("read");
    let title = io::article_title(&content, &rel.to_path(library.path()));
    assert_eq!(title, "Causal Trees");
    let article = store
        .create_article(NewArticle {
            title,
            url: None,
            description: None,
            authors: Vec::new(),
            content,
        })
        .expect("create");

    // When editing only the middle paragraph through the block editor
    let mut session = ReadingSession::open(&store, article.id).expect("open");
    let mut editor = BlockEditor::from_content(&session.article().content);
    editor.set_editing_mode(true);
    assert_eq!(editor.len(), 3);
    assert!(editor.begin_edit(1));
    assert!(editor.update_draft(1, "Hello brave new world."));
    let committed = editor.commit(1).expect("content changed");
    assert_eq!(
        committed,
        "# Causal Trees\n\nHello brave new world.\n\nSecond paragraph here."
    );

    // And saving the reassembled document through the session
    session.save_content(&mut store, &committed).expect("save");
    io::write_file(rel, library.path(), &session.article().content).expect("write back");

    // Then the other blocks come back byte-identical from disk
    let reloaded = io::read_file(rel, library.path()).expect("reload");
    assert_eq!(
        reloaded,
        "# Causal Trees\n\nHello brave new world.\n\nSecond paragraph here."
    );
    let editor = BlockEditor::from_content(&reloaded);
    let blocks: Vec<&str> = editor.blocks().iter().map(|b| b.text()).collect();
    assert_eq!(
        blocks,
        vec!["# Causal Trees", "Hello brave new world.", "Second paragraph here."]
    );
}

#[test]
fn test_highlights_repaint_against_edited_content() {
    let mut store = MemoryStore::new();
    store.sign_in(UserId::new("reader"));
    let article = store
        .create_article(NewArticle {
            title: "Sample".to_string(),
            url: None,
            description: None,
            authors: Vec::new(),
            content: "Hello world.\n\nSecond paragraph here.".to_string(),
        })
        .expect("create");

    // Given a highlight over "world"
    let mut session = ReadingSession::open(&store, article.id).expect("open");
    let (start_node, start_offset) = session.tree().caret_at(6).expect("caret");
    let (end_node, end_offset) = session.tree().caret_at(11).expect("caret");
    session
        .select(&marginalia_engine::SelectionRange {
            start_node,
            start_offset,
            end_node,
            end_offset,
        })
        .expect("selection resolves");
    session.add_highlight(&mut store).expect("highlight");

    // When an edit keeps the highlighted bytes in place
    let mut editor = BlockEditor::from_content(&session.article().content);
    editor.set_editing_mode(true);
    assert!(editor.begin_edit(1));
    assert!(editor.update_draft(1, "Second paragraph, revised."));
    let committed = editor.commit(1).expect("content changed");
    session.save_content(&mut store, &committed).expect("save");

    // Then the marker still wraps the same word in the new tree
    assert_eq!(highlight_marker_texts(&session), vec!["world".to_string()]);

    // But an edit that shifts those bytes leaves the marker pointing at
    // whatever now occupies the range; offsets are not re-anchored.
    session
        .save_content(&mut store, "Goodbye world.\n\nSecond paragraph, revised.")
        .expect("save");
    assert_eq!(highlight_marker_texts(&session), vec!["e wor".to_string()]);
}
