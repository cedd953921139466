use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use marginalia_config::Config;
use marginalia_engine::{
    Article, ArticleStore, CardMetrics, MemoryStore, NewArticle, Node, NotesPanel, ReadingSession,
    RenderTree, SelectionRange, SpanId, SpanKind, Tag, UserId, VerbatimKind, io,
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use relative_path::RelativePathBuf;
use std::{
    collections::HashMap,
    env,
    io::stdout,
    ops::Range,
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

enum Mode {
    /// Choosing an article in the left pane.
    Browse,
    /// Moving the block cursor through the open article.
    Read,
    /// Typing the comment for the annotation being composed.
    Annotate { input: String },
    /// Editing the article's free-form notes.
    Notes,
}

struct App {
    store: MemoryStore,
    articles: Vec<Article>,
    list_state: ListState,
    session: Option<ReadingSession>,
    notes: Option<NotesPanel>,
    mode: Mode,
    block_cursor: usize,
    scroll: u16,
    status: String,
    /// Line number of each span's first marker in the last drawn frame,
    /// fed back into the layout pass as card anchors.
    marker_rows: HashMap<SpanId, f32>,
    block_rows: Vec<usize>,
}

impl App {
    fn new(library_path: &Path, reader: &str) -> Result<Self> {
        let (store, articles) = seed_store(library_path, reader)?;

        let mut app = Self {
            store,
            articles,
            list_state: ListState::default(),
            session: None,
            notes: None,
            mode: Mode::Browse,
            block_cursor: 0,
            scroll: 0,
            status: String::new(),
            marker_rows: HashMap::new(),
            block_rows: Vec::new(),
        };

        // Select first article if available
        if !app.articles.is_empty() {
            app.list_state.select(Some(0));
            app.open_selected();
        }

        Ok(app)
    }

    fn next_article(&mut self) {
        if self.articles.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.articles.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.open_selected();
    }

    fn previous_article(&mut self) {
        if self.articles.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.articles.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
        self.open_selected();
    }

    fn open_selected(&mut self) {
        let Some(index) = self.list_state.selected() else {
            return;
        };
        let Some(article) = self.articles.get(index) else {
            return;
        };
        match ReadingSession::open(&self.store, article.id) {
            Ok(session) => {
                self.notes = Some(NotesPanel::new(article.id));
                self.session = Some(session);
                self.block_cursor = 0;
                self.scroll = 0;
                self.marker_rows.clear();
            }
            Err(e) => {
                self.report(format!("Error opening article: {e}"));
                self.session = None;
                self.notes = None;
            }
        }
    }

    fn report(&mut self, message: String) {
        log::warn!("{message}");
        self.status = message;
    }

    fn block_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.tree().children().len())
    }

    fn move_block_cursor(&mut self, delta: isize) {
        let count = self.block_count();
        if count == 0 {
            return;
        }
        let cursor = self.block_cursor as isize + delta;
        self.block_cursor = cursor.clamp(0, count as isize - 1) as usize;
        if let Some(row) = self.block_rows.get(self.block_cursor) {
            self.scroll = row.saturating_sub(3) as u16;
        }
    }

    /// Select the whole block under the cursor, the way a pointer
    /// selection would hand over anchored carets.
    fn select_cursor_block(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(range) = block_range(session.tree(), self.block_cursor) else {
            return false;
        };
        if range.is_empty() {
            self.status = "Nothing selectable in this block".to_string();
            return false;
        }
        let anchors = {
            let tree = session.tree();
            let start = tree.caret_at(range.start);
            let end = tree.caret_at(range.end);
            match (start, end) {
                (Some((start_node, start_offset)), Some((end_node, end_offset))) => {
                    SelectionRange { start_node, start_offset, end_node, end_offset }
                }
                _ => return false,
            }
        };
        if session.select(&anchors).is_none() {
            self.status = "Selection did not resolve".to_string();
            return false;
        }
        true
    }

    fn highlight_block(&mut self) {
        if !self.select_cursor_block() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.add_highlight(&mut self.store) {
            Ok(_) => self.status = "Highlighted".to_string(),
            Err(e) => self.report(format!("Highlight failed: {e}")),
        }
    }

    fn start_block_annotation(&mut self) {
        if !self.select_cursor_block() {
            return;
        }
        let anchor_top = self
            .block_rows
            .get(self.block_cursor)
            .map(|row| *row as f32);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.start_annotation(anchor_top) {
            Ok(_) => {
                self.mode = Mode::Annotate { input: String::new() };
                self.status = "Type the comment, Enter saves, Esc discards".to_string();
            }
            Err(e) => self.report(format!("Annotation failed: {e}")),
        }
    }

    fn commit_annotation(&mut self, input: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.commit_annotation(&mut self.store, input) {
            Ok(_) => {
                self.mode = Mode::Read;
                self.status = "Annotation saved".to_string();
            }
            Err(e) => self.report(format!("Could not save annotation: {e}")),
        }
    }

    fn cancel_annotation(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.cancel_annotation();
        }
        self.mode = Mode::Read;
        self.status.clear();
    }

    /// Remove the first highlight overlapping the cursor block.
    fn remove_block_highlight(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(range) = block_range(session.tree(), self.block_cursor) else {
            return;
        };
        let Some(id) = session
            .highlights()
            .iter()
            .find(|h| h.start_offset < range.end && range.start < h.end_offset)
            .map(|h| h.id)
        else {
            self.status = "No highlight under cursor".to_string();
            return;
        };
        match session.remove_highlight(&mut self.store, id) {
            Ok(()) => self.status = "Highlight removed".to_string(),
            Err(e) => self.report(format!("Removal failed: {e}")),
        }
    }

    /// Delete the first annotation overlapping the cursor block.
    fn delete_block_annotation(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(range) = block_range(session.tree(), self.block_cursor) else {
            return;
        };
        let Some(id) = session
            .annotations()
            .iter()
            .find(|a| a.start_offset < range.end && range.start < a.end_offset)
            .map(|a| a.id)
        else {
            self.status = "No annotation under cursor".to_string();
            return;
        };
        match session.delete_annotation(&mut self.store, id) {
            Ok(()) => self.status = "Annotation deleted".to_string(),
            Err(e) => self.report(format!("Deletion failed: {e}")),
        }
    }

    fn open_notes(&mut self) {
        let Some(notes) = self.notes.as_mut() else {
            return;
        };
        match notes.load(&self.store) {
            Ok(()) => {
                self.mode = Mode::Notes;
                self.status = "Editing notes, Esc saves and closes".to_string();
            }
            Err(e) => self.report(format!("Could not load notes: {e}")),
        }
    }

    fn close_notes(&mut self) {
        if let Some(notes) = self.notes.as_mut()
            && let Err(e) = notes.flush(&mut self.store)
        {
            self.report(format!("Could not save notes: {e}"));
        }
        self.mode = Mode::Read;
    }

    fn edit_note_draft(&mut self, edit: impl FnOnce(&mut String)) {
        let Some(notes) = self.notes.as_mut() else {
            return;
        };
        let mut draft = notes.draft().to_string();
        edit(&mut draft);
        notes.set_draft(draft, Instant::now());
    }

    /// Drive pending debounced work: the card layout pass and the note
    /// autosave.
    fn tick(&mut self) {
        let now = Instant::now();
        if let Some(session) = self.session.as_mut()
            && session.layout_pending()
        {
            let mut metrics: HashMap<SpanId, CardMetrics> = HashMap::new();
            for annotation in session.annotations() {
                if let Some(row) = self.marker_rows.get(&annotation.id) {
                    metrics.insert(
                        annotation.id,
                        CardMetrics {
                            anchor_top: *row,
                            card_height: Some(card_height(&annotation.comment)),
                        },
                    );
                }
            }
            if let Some(pending) = session.pending()
                && let Some(row) = self.marker_rows.get(&pending.id)
            {
                metrics.insert(
                    pending.id,
                    CardMetrics { anchor_top: *row, card_height: Some(card_height("")) },
                );
            }
            session.tick(now, |span| metrics.get(&span).copied());
        }
        if let Some(notes) = self.notes.as_mut()
            && let Err(e) = notes.tick(&mut self.store, now)
        {
            self.report(format!("Note autosave failed: {e}"));
        }
    }

    fn handle_resize(&mut self) {
        let marker_rows = &self.marker_rows;
        if let Some(session) = self.session.as_mut() {
            session.handle_resize(|span| {
                marker_rows
                    .get(&span)
                    .map(|row| CardMetrics { anchor_top: *row, card_height: None })
            });
        }
    }
}

/// Card height in terminal rows: quote line, comment lines, separator.
fn card_height(comment: &str) -> f32 {
    (comment.lines().count().max(1) + 2) as f32
}

/// Projection byte range covered by the n-th root block.
fn block_range(tree: &RenderTree, index: usize) -> Option<Range<usize>> {
    let mut pos = 0;
    for (i, node) in tree.children().iter().enumerate() {
        let len = node.flat_len();
        if i == index {
            return Some(pos..pos + len);
        }
        pos += len;
    }
    None
}

fn seed_store(library_path: &Path, reader: &str) -> Result<(MemoryStore, Vec<Article>)> {
    let mut store = MemoryStore::new();
    store.sign_in(UserId::new(reader));

    for path in io::scan_article_files(library_path)? {
        let relative = RelativePathBuf::from_path(path.strip_prefix(library_path)?)?;
        let content = io::read_file(&relative, library_path)?;
        let title = io::article_title(&content, &path);
        store.create_article(NewArticle {
            title,
            url: None,
            description: None,
            authors: Vec::new(),
            content,
        })?;
    }

    let articles = store.list_articles()?;
    Ok((store, articles))
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    // Determine library path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let library_path;
    let reader;
    let from_config;

    if args.len() == 2 {
        // CLI argument provided - use it
        library_path = PathBuf::from(&args[1]);
        reader = "local".to_string();
        from_config = false;
    } else if args.len() == 1 {
        // No CLI argument - try config file
        match Config::load() {
            Ok(Some(config)) => {
                library_path = config.library_path;
                reader = config.reader.unwrap_or_else(|| "local".to_string());
                from_config = true;
            }
            Ok(None) => {
                eprintln!("Error: No library path provided and no config file found");
                eprintln!("Usage: {} <article-library-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <article-library-path>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [article-library-path]", args[0]);
        process::exit(1);
    };

    // Validate library directory using engine
    if let Err(e) = io::validate_library_dir(&library_path) {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Library path '{}'{} is invalid: {e}",
            library_path.display(),
            source
        );
        process::exit(1);
    }

    // Remember an explicitly given path for next time
    if !from_config && !config_path.exists() {
        let config = Config { library_path: library_path.clone(), reader: None };
        if let Err(e) = config.save() {
            log::warn!("could not write config file: {e}");
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(&library_path, &reader)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => match &mut app.mode {
                    Mode::Browse => match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Down | KeyCode::Char('j') => app.next_article(),
                        KeyCode::Up | KeyCode::Char('k') => app.previous_article(),
                        KeyCode::Enter => {
                            if app.session.is_some() {
                                app.mode = Mode::Read;
                                app.status.clear();
                            }
                        }
                        _ => {}
                    },
                    Mode::Read => match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Esc => {
                            app.mode = Mode::Browse;
                            app.status.clear();
                        }
                        KeyCode::Down | KeyCode::Char('j') => app.move_block_cursor(1),
                        KeyCode::Up | KeyCode::Char('k') => app.move_block_cursor(-1),
                        KeyCode::Char('h') => app.highlight_block(),
                        KeyCode::Char('a') => app.start_block_annotation(),
                        KeyCode::Char('d') => app.remove_block_highlight(),
                        KeyCode::Char('x') => app.delete_block_annotation(),
                        KeyCode::Char('n') => app.open_notes(),
                        _ => {}
                    },
                    Mode::Annotate { input } => match key.code {
                        KeyCode::Enter => {
                            let input = input.clone();
                            app.commit_annotation(&input);
                        }
                        KeyCode::Esc => app.cancel_annotation(),
                        KeyCode::Backspace => {
                            input.pop();
                        }
                        KeyCode::Char(c) => input.push(c),
                        _ => {}
                    },
                    Mode::Notes => match key.code {
                        KeyCode::Esc => app.close_notes(),
                        KeyCode::Backspace => app.edit_note_draft(|draft| {
                            draft.pop();
                        }),
                        KeyCode::Enter => app.edit_note_draft(|draft| draft.push('\n')),
                        KeyCode::Char(c) => app.edit_note_draft(|draft| draft.push(c)),
                        _ => {}
                    },
                },
                Event::Resize(_, _) => app.handle_resize(),
                _ => {}
            }
        }

        app.tick();
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(f.area());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints(
            [
                Constraint::Percentage(24),
                Constraint::Percentage(50),
                Constraint::Percentage(26),
            ]
            .as_ref(),
        )
        .split(rows[0]);

    // Article list panel
    let article_items: Vec<ListItem> = app
        .articles
        .iter()
        .map(|article| {
            let mut spans = vec![Span::raw(article.title.clone())];
            if let Some(host) = article.source_host() {
                spans.push(Span::styled(
                    format!("  {host}"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(vec![Line::from(spans)])
        })
        .collect();

    let articles_list = List::new(article_items)
        .block(Block::default().borders(Borders::ALL).title("Articles"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(articles_list, chunks[0], &mut app.list_state);

    // Reading panel
    let (mut lines, marker_rows, block_rows) = match &app.session {
        Some(session) => render_article(session),
        None => (
            vec![Line::from("Select an article to start reading")],
            HashMap::new(),
            Vec::new(),
        ),
    };
    if matches!(app.mode, Mode::Read | Mode::Annotate { .. })
        && let Some(row) = block_rows.get(app.block_cursor)
        && let Some(line) = lines.get_mut(*row)
    {
        line.style = Style::default().bg(Color::DarkGray);
    }
    app.marker_rows = marker_rows;
    app.block_rows = block_rows;

    let title = app
        .session
        .as_ref()
        .map(|s| s.article().title.clone())
        .unwrap_or_else(|| "Reading".to_string());
    let content = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((app.scroll, 0))
        .wrap(ratatui::widgets::Wrap { trim: false });

    f.render_widget(content, chunks[1]);

    // Margin panel: annotation cards at their solved positions, or the
    // notes editor while it is open
    let margin = match (&app.mode, &app.notes) {
        (Mode::Notes, Some(notes)) => {
            let mut lines: Vec<Line> = notes
                .draft()
                .split('\n')
                .map(|l| Line::from(l.to_string()))
                .collect();
            lines.push(Line::from(Span::styled(
                "▏",
                Style::default().add_modifier(Modifier::SLOW_BLINK),
            )));
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Notes"))
                .wrap(ratatui::widgets::Wrap { trim: false })
        }
        _ => Paragraph::new(margin_lines(app))
            .block(Block::default().borders(Borders::ALL).title("Margin"))
            .scroll((app.scroll, 0))
            .wrap(ratatui::widgets::Wrap { trim: false }),
    };
    f.render_widget(margin, chunks[2]);

    // Instructions + status
    let help = match &app.mode {
        Mode::Browse => "q: Quit | ↑/k ↓/j: Articles | Enter: Read",
        Mode::Read => {
            "Esc: Back | j/k: Blocks | h: Highlight | d: Unhighlight | a: Annotate | x: Delete note | n: Notes | q: Quit"
        }
        Mode::Annotate { .. } => "Enter: Save annotation | Esc: Discard",
        Mode::Notes => "Esc: Save and close notes",
    };
    let footer = if app.status.is_empty() {
        Line::from(help)
    } else {
        Line::from(vec![
            Span::raw(help),
            Span::styled(
                format!("   {}", app.status),
                Style::default().fg(Color::Yellow),
            ),
        ])
    };
    f.render_widget(Paragraph::new(vec![footer]), rows[1]);
}

fn margin_lines(app: &App) -> Vec<Line<'static>> {
    let Some(session) = &app.session else {
        return Vec::new();
    };

    struct Card {
        top: usize,
        quote: String,
        comment: String,
        active: bool,
    }

    let mut cards: Vec<Card> = Vec::new();
    for annotation in session.annotations() {
        let top = session
            .card_top(annotation.id)
            .or_else(|| app.marker_rows.get(&annotation.id).copied())
            .unwrap_or(0.0);
        cards.push(Card {
            top: top.max(0.0).round() as usize,
            quote: annotation.text.clone(),
            comment: annotation.comment.clone(),
            active: session.active_annotation() == Some(annotation.id),
        });
    }
    if let Some(pending) = session.pending() {
        let draft = match &app.mode {
            Mode::Annotate { input } => format!("{input}▏"),
            _ => "…".to_string(),
        };
        let top = session
            .card_top(pending.id)
            .or_else(|| app.marker_rows.get(&pending.id).copied())
            .unwrap_or(0.0);
        cards.push(Card {
            top: top.max(0.0).round() as usize,
            quote: pending.text.clone(),
            comment: draft,
            active: true,
        });
    }
    cards.sort_by_key(|card| card.top);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for card in cards {
        while lines.len() < card.top {
            lines.push(Line::from(""));
        }
        let quote_style = if card.active {
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let mut quote = card.quote.replace('\n', " ");
        if quote.chars().count() > 40 {
            quote = quote.chars().take(39).collect::<String>() + "…";
        }
        lines.push(Line::from(Span::styled(format!("▎\u{201c}{quote}\u{201d}"), quote_style)));
        for comment_line in card.comment.split('\n') {
            lines.push(Line::from(format!("▎{comment_line}")));
        }
        lines.push(Line::from(""));
    }
    lines
}

type RenderedLines = (Vec<Line<'static>>, HashMap<SpanId, f32>, Vec<usize>);

/// Flatten the rendered tree into styled terminal lines, recording where
/// each span's first marker and each root block start.
fn render_article(session: &ReadingSession) -> RenderedLines {
    let mut r = LineRenderer {
        lines: Vec::new(),
        current: Vec::new(),
        marker_rows: HashMap::new(),
        block_rows: Vec::new(),
        active: session.active_annotation(),
    };
    for node in session.tree().children() {
        r.block_rows.push(r.lines.len());
        r.render_block(node);
        r.flush_line();
        r.lines.push(Line::from(""));
    }
    r.flush_line();
    (r.lines, r.marker_rows, r.block_rows)
}

struct LineRenderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    marker_rows: HashMap<SpanId, f32>,
    block_rows: Vec<usize>,
    active: Option<SpanId>,
}

impl LineRenderer {
    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        let mut first = true;
        for segment in text.split('\n') {
            if !first {
                self.flush_line();
            }
            if !segment.is_empty() {
                self.current.push(Span::styled(segment.to_string(), style));
            }
            first = false;
        }
    }

    fn render_block(&mut self, node: &Node) {
        match node {
            Node::Element { tag: Tag::Heading { level }, children, .. } => {
                let style = Style::default().add_modifier(Modifier::BOLD);
                self.current.push(Span::styled(
                    format!("{} ", "#".repeat(*level as usize)),
                    style.fg(Color::Blue),
                ));
                for child in children {
                    self.render_inline(child, style);
                }
            }
            Node::Element { tag: Tag::List { ordered }, children, .. } => {
                self.render_list(*ordered, children, 0);
            }
            Node::Element { tag: Tag::BlockQuote, children, .. } => {
                for child in children {
                    self.current
                        .push(Span::styled("▌ ", Style::default().fg(Color::DarkGray)));
                    self.render_inline(child, Style::default().fg(Color::Gray));
                    self.flush_line();
                }
            }
            Node::Element { tag: Tag::Table, children, .. } => {
                for section in children {
                    self.render_table_section(section);
                }
            }
            Node::Element { tag: Tag::ThematicBreak, .. } => {
                self.push_text("────────", Style::default().fg(Color::DarkGray));
            }
            Node::Verbatim { kind: VerbatimKind::CodeBlock { lang }, literal, .. } => {
                let fence = Style::default().fg(Color::DarkGray);
                self.push_text(&format!("```{}", lang.as_deref().unwrap_or("")), fence);
                self.flush_line();
                self.push_text(literal.trim_end_matches('\n'), Style::default().fg(Color::Green));
                self.flush_line();
                self.push_text("```", fence);
            }
            Node::Verbatim { literal, .. } => {
                self.push_text(literal.trim_end_matches('\n'), Style::default().fg(Color::DarkGray));
            }
            other => self.render_inline(other, Style::default()),
        }
    }

    fn render_list(&mut self, ordered: bool, items: &[Node], depth: usize) {
        for (index, item) in items.iter().enumerate() {
            let Node::Element { tag: Tag::ListItem, children, .. } = item else {
                continue;
            };
            self.flush_line();
            let marker = if ordered {
                format!("{}. ", index + 1)
            } else {
                "• ".to_string()
            };
            self.current.push(Span::styled(
                format!("{}{marker}", "  ".repeat(depth + 1)),
                Style::default().fg(Color::Yellow),
            ));
            let mut nested: Vec<&Node> = Vec::new();
            for child in children {
                if matches!(child, Node::Element { tag: Tag::List { .. }, .. }) {
                    nested.push(child);
                } else {
                    self.render_inline(child, Style::default());
                }
            }
            self.flush_line();
            for child in nested {
                if let Node::Element { tag: Tag::List { ordered }, children, .. } = child {
                    self.render_list(*ordered, children, depth + 1);
                }
            }
        }
    }

    fn render_table_section(&mut self, section: &Node) {
        match section {
            Node::Element { tag: Tag::TableHead | Tag::TableRow, children, .. } => {
                for (i, cell) in children.iter().enumerate() {
                    if i > 0 {
                        self.current
                            .push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
                    }
                    self.render_inline(cell, Style::default());
                }
                self.flush_line();
            }
            other => {
                self.render_inline(other, Style::default());
                self.flush_line();
            }
        }
    }

    fn render_inline(&mut self, node: &Node, style: Style) {
        match node {
            Node::Text { text, .. } => self.push_text(text, style),
            Node::Verbatim { kind: VerbatimKind::InlineCode, literal, .. } => {
                self.push_text(literal, style.fg(Color::Green));
            }
            Node::Verbatim { literal, .. } => {
                self.push_text(literal, style.fg(Color::DarkGray));
            }
            Node::Marker { span_id, kind, text, .. } => {
                self.marker_rows
                    .entry(*span_id)
                    .or_insert(self.lines.len() as f32);
                let marker_style = match kind {
                    SpanKind::Highlight => Style::default().bg(Color::Yellow).fg(Color::Black),
                    SpanKind::Annotation if self.active == Some(*span_id) => {
                        Style::default().bg(Color::Magenta).fg(Color::Black)
                    }
                    SpanKind::Annotation => Style::default().bg(Color::Cyan).fg(Color::Black),
                };
                self.push_text(text, marker_style);
            }
            Node::Element { tag, children, .. } => {
                let style = match tag {
                    Tag::Emphasis => style.add_modifier(Modifier::ITALIC),
                    Tag::Strong => style.add_modifier(Modifier::BOLD),
                    Tag::Strikethrough => style.add_modifier(Modifier::CROSSED_OUT),
                    Tag::Link { .. } => style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                    Tag::TaskMarker { checked } => {
                        let mark = if *checked { "[x] " } else { "[ ] " };
                        self.current
                            .push(Span::styled(mark.to_string(), Style::default().fg(Color::Yellow)));
                        return;
                    }
                    Tag::HardBreak => {
                        self.flush_line();
                        return;
                    }
                    _ => style,
                };
                for child in children {
                    self.render_inline(child, style);
                }
            }
        }
    }
}
