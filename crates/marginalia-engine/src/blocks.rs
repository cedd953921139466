/*!
Block-splitting live editor.

The article body is edited one paragraph-like block at a time: the
document splits on blank-line runs, a block under edit exposes its raw
markdown, and committing a change reassembles the whole document with a
canonical `\n\n` separator. Blocks keep no memory of the original
separator width, so runs of three or more newlines collapse to two on
the first save.
*/

use std::sync::OnceLock;

use regex::Regex;

static SEPARATOR: OnceLock<Regex> = OnceLock::new();

fn separator() -> &'static Regex {
    SEPARATOR.get_or_init(|| Regex::new(r"\n{2,}").expect("separator pattern is valid"))
}

#[derive(Debug, Clone, PartialEq)]
enum BlockState {
    Viewing,
    Editing { draft: String },
}

/// One independently editable run of markdown between blank lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    text: String,
    state: BlockState,
}

impl Block {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            state: BlockState::Viewing,
        }
    }

    /// The block's committed markdown source.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, BlockState::Editing { .. })
    }

    /// The in-progress raw text while this block is being edited.
    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            BlockState::Editing { draft } => Some(draft),
            BlockState::Viewing => None,
        }
    }
}

/// Editor session over one document's blocks.
///
/// Blocks are rebuilt wholesale whenever a document is loaded; nothing
/// here survives a reload. Entering edit on a block requires the session
/// to be in editing mode, mirroring the reading view's explicit
/// view/edit toggle.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEditor {
    blocks: Vec<Block>,
    editing_mode: bool,
}

impl BlockEditor {
    /// Split a document into blocks. An empty document still yields one
    /// empty block so there is always something to focus.
    pub fn from_content(content: &str) -> Self {
        Self {
            blocks: split_blocks(content),
            editing_mode: false,
        }
    }

    /// Replace all blocks from a newly loaded document, discarding any
    /// in-progress edit.
    pub fn load(&mut self, content: &str) {
        self.blocks = split_blocks(content);
    }

    pub fn set_editing_mode(&mut self, enabled: bool) {
        self.editing_mode = enabled;
    }

    pub fn is_editing_mode(&self) -> bool {
        self.editing_mode
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Index of the block currently under edit, if any.
    pub fn active_block(&self) -> Option<usize> {
        self.blocks.iter().position(Block::is_editing)
    }

    /// Start editing a block, seeding the draft with its current text.
    ///
    /// Refused outside editing mode, for an out-of-range index, or while
    /// another block is still under edit (the host commits that one on
    /// blur first).
    pub fn begin_edit(&mut self, index: usize) -> bool {
        if !self.editing_mode || index >= self.blocks.len() {
            return false;
        }
        if self.active_block().is_some_and(|active| active != index) {
            return false;
        }
        let block = &mut self.blocks[index];
        if !block.is_editing() {
            block.state = BlockState::Editing {
                draft: block.text.clone(),
            };
        }
        true
    }

    /// Replace the draft text of a block under edit.
    pub fn update_draft(&mut self, index: usize, text: &str) -> bool {
        match self.blocks.get_mut(index) {
            Some(Block {
                state: BlockState::Editing { draft },
                ..
            }) => {
                draft.clear();
                draft.push_str(text);
                true
            }
            _ => false,
        }
    }

    /// Blur: leave edit state and, if the draft differs from the
    /// committed text, adopt it and return the reassembled document for
    /// the caller to propagate. An unchanged draft returns `None` and
    /// nothing propagates.
    pub fn commit(&mut self, index: usize) -> Option<String> {
        let block = self.blocks.get_mut(index)?;
        let BlockState::Editing { draft } = std::mem::replace(&mut block.state, BlockState::Viewing)
        else {
            return None;
        };
        if draft == block.text {
            return None;
        }
        block.text = draft;
        Some(self.content())
    }

    /// Append an empty block at the end, the editing-mode affordance for
    /// growing the document. Returns its index.
    pub fn append_block(&mut self) -> Option<usize> {
        if !self.editing_mode {
            return None;
        }
        self.blocks.push(Block::new(""));
        Some(self.blocks.len() - 1)
    }

    /// The document as currently assembled: blocks joined by the
    /// canonical two-newline separator.
    pub fn content(&self) -> String {
        let texts: Vec<&str> = self.blocks.iter().map(Block::text).collect();
        texts.join("\n\n")
    }
}

fn split_blocks(content: &str) -> Vec<Block> {
    if content.is_empty() {
        return vec![Block::new("")];
    }
    separator().split(content).map(Block::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn texts(editor: &BlockEditor) -> Vec<&str> {
        editor.blocks().iter().map(Block::text).collect()
    }

    // ============ splitting and reassembly tests ============

    #[rstest]
    #[case("# Title\n\nFirst paragraph.\n\n- a\n- b", vec!["# Title", "First paragraph.", "- a\n- b"])]
    #[case("one\n\n\n\ntwo\n\n\nthree", vec!["one", "two", "three"])]
    #[case("line one\nline two", vec!["line one\nline two"])]
    fn test_split_on_blank_line_runs(#[case] source: &str, #[case] expected: Vec<&str>) {
        assert_eq!(texts(&BlockEditor::from_content(source)), expected);
    }

    #[test]
    fn test_reassembly_is_exact_without_edits() {
        let source = "# Title\n\nFirst paragraph.\n\nSecond one.";
        let editor = BlockEditor::from_content(source);
        assert_eq!(editor.content(), source);
    }

    #[test]
    fn test_wide_separators_collapse_to_canonical_join() {
        let editor = BlockEditor::from_content("one\n\n\n\ntwo\n\n\nthree");
        assert_eq!(editor.content(), "one\n\ntwo\n\nthree");
    }

    #[test]
    fn test_empty_document_yields_one_empty_block() {
        let editor = BlockEditor::from_content("");
        assert_eq!(texts(&editor), vec![""]);
        assert_eq!(editor.content(), "");
    }

    #[test]
    fn test_load_replaces_blocks_wholesale() {
        let mut editor = BlockEditor::from_content("old");
        editor.set_editing_mode(true);
        assert!(editor.begin_edit(0));

        editor.load("new one\n\nnew two");

        assert_eq!(texts(&editor), vec!["new one", "new two"]);
        assert_eq!(editor.active_block(), None);
    }

    // ============ edit state machine tests ============

    #[test]
    fn test_begin_edit_requires_editing_mode() {
        let mut editor = BlockEditor::from_content("a\n\nb");
        assert!(!editor.begin_edit(0));

        editor.set_editing_mode(true);
        assert!(editor.begin_edit(0));
        assert_eq!(editor.active_block(), Some(0));
        assert_eq!(editor.blocks()[0].draft(), Some("a"));
    }

    #[test]
    fn test_begin_edit_refuses_second_concurrent_block() {
        let mut editor = BlockEditor::from_content("a\n\nb");
        editor.set_editing_mode(true);
        assert!(editor.begin_edit(0));
        assert!(!editor.begin_edit(1));
        // Re-entering the already active block is fine.
        assert!(editor.begin_edit(0));
    }

    #[test]
    fn test_begin_edit_out_of_range_is_refused() {
        let mut editor = BlockEditor::from_content("a");
        editor.set_editing_mode(true);
        assert!(!editor.begin_edit(5));
    }

    #[test]
    fn test_commit_without_change_propagates_nothing() {
        let mut editor = BlockEditor::from_content("a\n\nb");
        editor.set_editing_mode(true);
        editor.begin_edit(1);

        assert_eq!(editor.commit(1), None);
        assert_eq!(editor.active_block(), None);
        assert_eq!(editor.content(), "a\n\nb");
    }

    #[test]
    fn test_commit_with_change_returns_reassembled_document() {
        let mut editor = BlockEditor::from_content("a\n\nb\n\nc");
        editor.set_editing_mode(true);
        editor.begin_edit(1);
        editor.update_draft(1, "B edited");

        assert_eq!(editor.commit(1), Some("a\n\nB edited\n\nc".to_string()));
        assert!(!editor.blocks()[1].is_editing());
    }

    #[test]
    fn test_editing_one_block_leaves_the_others_byte_identical() {
        let mut editor =
            BlockEditor::from_content("# Title\n\nmiddle *text* here\n\n```\ncode\n```");
        editor.set_editing_mode(true);
        editor.begin_edit(1);
        editor.update_draft(1, "replaced");
        let reassembled = editor.commit(1).expect("changed block propagates");

        assert_eq!(reassembled, "# Title\n\nreplaced\n\n```\ncode\n```");
    }

    #[test]
    fn test_update_draft_requires_active_edit() {
        let mut editor = BlockEditor::from_content("a");
        assert!(!editor.update_draft(0, "x"));
        editor.set_editing_mode(true);
        editor.begin_edit(0);
        assert!(editor.update_draft(0, "x"));
    }

    #[test]
    fn test_commit_on_viewing_block_is_a_no_op() {
        let mut editor = BlockEditor::from_content("a\n\nb");
        assert_eq!(editor.commit(0), None);
        assert_eq!(editor.content(), "a\n\nb");
    }

    // ============ append affordance tests ============

    #[test]
    fn test_append_block_requires_editing_mode() {
        let mut editor = BlockEditor::from_content("a");
        assert_eq!(editor.append_block(), None);

        editor.set_editing_mode(true);
        assert_eq!(editor.append_block(), Some(1));
        assert_eq!(texts(&editor), vec!["a", ""]);
    }

    #[test]
    fn test_appended_block_can_be_edited_and_committed() {
        let mut editor = BlockEditor::from_content("a");
        editor.set_editing_mode(true);
        let index = editor.append_block().expect("editing mode is on");
        editor.begin_edit(index);
        editor.update_draft(index, "tail");

        assert_eq!(editor.commit(index), Some("a\n\ntail".to_string()));
    }
}
