use std::io::Write;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::backdrop::Backdrop;
use crate::config::Config;
use crate::datetime;
use crate::render::{Frame, Renderer};
use crate::store::TaskStore;
use crate::theme::{Palette, Theme};
use crate::view::{self, SortMode, StatusFilter, ViewState};

const NO_SUCH_TASK: &str = "No such task.";
const HELP: &str = "Commands: add <title> due:YYYY-MM-DD · toggle <row> · edit <row> · \
                    delete <row> · filter all|active|completed · search [text] · \
                    sort created|due · theme · list · reset · quit";

/// Per-row edit lifecycle: viewing → editing (or confirming a delete)
/// → back to viewing. The next input line is interpreted by the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Editing { id: Uuid },
    ConfirmDelete { id: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormError {
    Title,
    DueDate,
}

impl FormError {
    pub fn message(self) -> &'static str {
        match self {
            Self::Title => "Task title is required.",
            Self::DueDate => "Valid due date required.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { title: String, due: Option<String> },
    Toggle(usize),
    Edit(usize),
    Delete(usize),
    Filter(StatusFilter),
    Search(String),
    Sort(SortMode),
    Theme,
    List,
    Reset,
    Help,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "delete", "edit", "exit", "filter", "help", "list", "quit", "reset", "search",
        "sort", "theme", "toggle",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((head, rest)) = tokens.split_first() else {
        return Ok(Command::List);
    };

    let head = head.to_ascii_lowercase();
    let known = known_command_names();
    let Some(name) = expand_command_abbrev(&head, &known) else {
        return Err(format!("Unknown command: {head} (try 'help')"));
    };

    match name {
        "add" => {
            let mut due = None;
            let mut words = Vec::new();
            for token in rest {
                if due.is_none()
                    && let Some(value) = token.strip_prefix("due:")
                {
                    due = Some(value.to_string());
                } else {
                    words.push(*token);
                }
            }
            Ok(Command::Add {
                title: words.join(" "),
                due,
            })
        }
        "toggle" | "edit" | "delete" => {
            let row = rest
                .first()
                .and_then(|tok| tok.parse::<usize>().ok())
                .ok_or_else(|| format!("{name} needs a row number"))?;
            Ok(match name {
                "toggle" => Command::Toggle(row),
                "edit" => Command::Edit(row),
                _ => Command::Delete(row),
            })
        }
        "filter" => rest
            .first()
            .and_then(|tok| tok.parse::<StatusFilter>().ok())
            .map(Command::Filter)
            .ok_or_else(|| "filter must be all, active, or completed".to_string()),
        "search" => Ok(Command::Search(rest.join(" "))),
        "sort" => rest
            .first()
            .and_then(|tok| tok.parse::<SortMode>().ok())
            .map(Command::Sort)
            .ok_or_else(|| "sort must be created or due".to_string()),
        "theme" => Ok(Command::Theme),
        "list" => Ok(Command::List),
        "reset" => Ok(Command::Reset),
        "help" => Ok(Command::Help),
        _ => Ok(Command::Quit),
    }
}

/// One interactive session: the task store, the session-only view
/// state, the current input mode, and the decorative backdrop.
#[derive(Debug)]
pub struct Session {
    store: TaskStore,
    cfg: Config,
    view: ViewState,
    mode: Mode,
    theme: Theme,
    palette: Palette,
    backdrop: Option<Backdrop>,
    backdrop_enabled: bool,
    row_ids: Vec<Uuid>,
    form_error: Option<FormError>,
    notice: Option<String>,
}

impl Session {
    pub fn new(store: TaskStore, cfg: Config) -> Self {
        let theme = store.data().load_theme();
        let backdrop_enabled = cfg.get_bool("backdrop").unwrap_or(true);

        let mut session = Self {
            store,
            cfg,
            view: ViewState::default(),
            mode: Mode::Command,
            theme,
            palette: Palette::for_theme(theme),
            backdrop: None,
            backdrop_enabled,
            row_ids: Vec::new(),
            form_error: None,
            notice: None,
        };
        session.palette = session.resolve_palette(theme);
        session.init_backdrop();
        session
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn form_error(&self) -> Option<FormError> {
        self.form_error
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, message: String) {
        self.notice = Some(message);
    }

    pub fn prompt(&self) -> &'static str {
        match self.mode {
            Mode::Command => "docket> ",
            Mode::Editing { .. } => "new title> ",
            Mode::ConfirmDelete { .. } => "Delete this task? (y/N) ",
        }
    }

    /// Handles one input line to completion: mutate, persist, and leave
    /// the session ready for the next repaint.
    #[instrument(skip(self, line, now))]
    pub fn handle_line(&mut self, line: &str, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        self.notice = None;

        match self.mode {
            Mode::Editing { id } => {
                self.finish_edit(id, line)?;
                Ok(Outcome::Continue)
            }
            Mode::ConfirmDelete { id } => {
                self.finish_delete(id, line)?;
                Ok(Outcome::Continue)
            }
            Mode::Command => self.handle_command(line, now),
        }
    }

    /// Recomputes the view and repaints. Row numbers handed back by the
    /// user refer to the frame drawn here.
    pub fn draw<W: Write>(
        &mut self,
        renderer: &Renderer,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let model = view::build(self.store.tasks(), &self.view, now);
        self.row_ids = model.rows.iter().map(|row| row.task.id).collect();

        let frame = Frame {
            view: &model,
            state: &self.view,
            theme: self.theme,
            palette: self.palette,
            backdrop: self.backdrop.as_ref(),
            error: self.form_error.map(FormError::message),
            notice: self.notice.as_deref(),
        };
        renderer.write_frame(out, &frame)
    }

    fn handle_command(&mut self, line: &str, now: DateTime<Utc>) -> anyhow::Result<Outcome> {
        let command = match parse_command(line) {
            Ok(command) => command,
            Err(message) => {
                debug!(%message, "rejected input");
                self.notice = Some(message);
                return Ok(Outcome::Continue);
            }
        };

        match command {
            Command::Add { title, due } => self.run_add(&title, due.as_deref(), now)?,
            Command::Toggle(row) => self.run_toggle(row)?,
            Command::Edit(row) => self.begin_edit(row),
            Command::Delete(row) => self.begin_delete(row),
            Command::Filter(filter) => {
                info!(filter = filter.as_str(), "filter changed");
                self.view.filter = filter;
            }
            Command::Search(text) => {
                debug!(search = %text, "search changed");
                self.view.search = text;
            }
            Command::Sort(sort) => {
                info!(sort = sort.as_str(), "sort changed");
                self.view.sort = sort;
            }
            Command::Theme => self.toggle_theme()?,
            Command::List => {}
            Command::Reset => {
                self.form_error = None;
                self.notice = Some("Form cleared.".to_string());
            }
            Command::Help => self.notice = Some(HELP.to_string()),
            Command::Quit => return Ok(Outcome::Quit),
        }

        Ok(Outcome::Continue)
    }

    fn run_add(&mut self, title: &str, due: Option<&str>, now: DateTime<Utc>) -> anyhow::Result<()> {
        if title.trim().is_empty() {
            debug!("add rejected: blank title");
            self.form_error = Some(FormError::Title);
            return Ok(());
        }

        let Some(due) = due.filter(|raw| datetime::is_valid_due_date(raw)) else {
            debug!("add rejected: missing or invalid due date");
            self.form_error = Some(FormError::DueDate);
            return Ok(());
        };

        self.store.add(title, due, now)?;
        self.form_error = None;
        self.notice = Some("Task created.".to_string());
        Ok(())
    }

    fn run_toggle(&mut self, row: usize) -> anyhow::Result<()> {
        let Some(id) = self.resolve_row(row) else {
            self.notice = Some(NO_SUCH_TASK.to_string());
            return Ok(());
        };

        let changed = self.store.toggle_complete(id)?;
        self.notice = Some(if changed { "Task updated." } else { NO_SUCH_TASK }.to_string());
        Ok(())
    }

    fn begin_edit(&mut self, row: usize) {
        match self.resolve_row(row) {
            Some(id) => {
                debug!(%id, "editing task title");
                self.mode = Mode::Editing { id };
            }
            None => self.notice = Some(NO_SUCH_TASK.to_string()),
        }
    }

    fn finish_edit(&mut self, id: Uuid, line: &str) -> anyhow::Result<()> {
        self.mode = Mode::Command;

        if line.trim().is_empty() {
            debug!(%id, "edit discarded");
            self.notice = Some("Edit discarded.".to_string());
            return Ok(());
        }

        let renamed = self.store.rename(id, line)?;
        self.notice = Some(if renamed { "Task renamed." } else { NO_SUCH_TASK }.to_string());
        Ok(())
    }

    fn begin_delete(&mut self, row: usize) {
        match self.resolve_row(row) {
            Some(id) => {
                debug!(%id, "delete pending confirmation");
                self.mode = Mode::ConfirmDelete { id };
            }
            None => self.notice = Some(NO_SUCH_TASK.to_string()),
        }
    }

    fn finish_delete(&mut self, id: Uuid, line: &str) -> anyhow::Result<()> {
        self.mode = Mode::Command;

        let answer = line.trim().to_ascii_lowercase();
        if answer != "y" && answer != "yes" {
            debug!(%id, "delete cancelled");
            self.notice = Some("Delete cancelled.".to_string());
            return Ok(());
        }

        let removed = self.store.remove(id)?;
        self.notice = Some(if removed { "Task deleted." } else { NO_SUCH_TASK }.to_string());
        Ok(())
    }

    fn toggle_theme(&mut self) -> anyhow::Result<()> {
        self.theme = self.theme.toggled();
        self.store.data().save_theme(self.theme)?;
        info!(theme = %self.theme, "theme switched");

        self.palette = self.resolve_palette(self.theme);
        // destroy-then-recreate: the old backdrop never survives a
        // palette change
        self.init_backdrop();
        self.notice = Some(format!("Switched to {} theme.", self.theme));
        Ok(())
    }

    fn resolve_palette(&self, theme: Theme) -> Palette {
        match Palette::resolve(theme, &self.cfg) {
            Ok(palette) => palette,
            Err(err) => {
                warn!(error = %err, "invalid backdrop colors; using theme defaults");
                Palette::for_theme(theme)
            }
        }
    }

    fn init_backdrop(&mut self) {
        self.backdrop = None;
        if !self.backdrop_enabled {
            return;
        }

        match Backdrop::new(self.palette) {
            Ok(backdrop) => self.backdrop = Some(backdrop),
            Err(err) => {
                warn!(error = %err, "backdrop unavailable; tasks render without it");
            }
        }
    }

    /// Row numbers are 1-based positions in the last drawn frame.
    fn resolve_row(&self, row: usize) -> Option<Uuid> {
        if row == 0 {
            return None;
        }
        self.row_ids.get(row - 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use chrono::{DateTime, TimeZone, Utc};

    use super::{Command, FormError, Mode, Outcome, Session, parse_command};
    use crate::config::Config;
    use crate::datastore::DataStore;
    use crate::render::Renderer;
    use crate::store::TaskStore;
    use crate::theme::Theme;
    use crate::view::{SortMode, StatusFilter};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn test_fixture(dir: &Path) -> (Session, Renderer) {
        let rc = dir.join("docketrc");
        std::fs::write(&rc, "color = off\nbackdrop = off\n").expect("write rc");
        let cfg = Config::load(Some(&rc)).expect("load config");

        let data = DataStore::open(&dir.join("data")).expect("open datastore");
        let renderer = Renderer::new(&cfg).expect("renderer");
        (Session::new(TaskStore::open(data), cfg), renderer)
    }

    fn drive(session: &mut Session, renderer: &Renderer, line: &str) -> Outcome {
        let now = fixed_now();
        let outcome = session.handle_line(line, now).expect("handle line");
        session
            .draw(renderer, &mut Vec::new(), now)
            .expect("draw frame");
        outcome
    }

    #[test]
    fn command_parsing_covers_abbreviations_and_modifiers() {
        assert_eq!(
            parse_command("add Pay rent due:2026-09-01").expect("parse"),
            Command::Add {
                title: "Pay rent".to_string(),
                due: Some("2026-09-01".to_string()),
            }
        );
        assert_eq!(parse_command("to 2").expect("parse"), Command::Toggle(2));
        assert_eq!(
            parse_command("fil active").expect("parse"),
            Command::Filter(StatusFilter::Active)
        );
        assert_eq!(
            parse_command("sort due").expect("parse"),
            Command::Sort(SortMode::Due)
        );
        assert_eq!(parse_command("").expect("parse"), Command::List);
        assert_eq!(
            parse_command("search").expect("parse"),
            Command::Search(String::new())
        );

        assert!(parse_command("t 1").is_err(), "toggle/theme is ambiguous");
        assert!(parse_command("toggle one").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn add_form_validates_title_then_due_date() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "add due:2026-09-01");
        assert_eq!(session.form_error(), Some(FormError::Title));
        assert!(session.store().tasks().is_empty());

        drive(&mut session, &renderer, "add Pay rent");
        assert_eq!(session.form_error(), Some(FormError::DueDate));

        drive(&mut session, &renderer, "add Pay rent due:2026-13-40");
        assert_eq!(session.form_error(), Some(FormError::DueDate));
        assert!(session.store().tasks().is_empty());

        drive(&mut session, &renderer, "add Pay rent due:2026-09-01");
        assert_eq!(session.form_error(), None);
        assert_eq!(session.store().tasks().len(), 1);
        assert_eq!(session.store().tasks()[0].title, "Pay rent");
        assert_eq!(session.notice(), Some("Task created."));
    }

    #[test]
    fn reset_clears_field_errors_without_touching_the_store() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "add due:2026-09-01");
        assert_eq!(session.form_error(), Some(FormError::Title));

        drive(&mut session, &renderer, "reset");
        assert_eq!(session.form_error(), None);
        assert!(session.store().tasks().is_empty());
    }

    #[test]
    fn edit_mode_commits_or_discards_the_next_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "add Old name due:2026-09-01");
        drive(&mut session, &renderer, "edit 1");
        assert!(matches!(session.mode(), Mode::Editing { .. }));
        assert_eq!(session.prompt(), "new title> ");

        drive(&mut session, &renderer, "   ");
        assert_eq!(session.mode(), Mode::Command);
        assert_eq!(session.store().tasks()[0].title, "Old name");

        drive(&mut session, &renderer, "edit 1");
        drive(&mut session, &renderer, "  New name  ");
        assert_eq!(session.store().tasks()[0].title, "New name");
        assert_eq!(session.notice(), Some("Task renamed."));
    }

    #[test]
    fn delete_requires_an_explicit_yes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "add Keep me due:2026-09-01");
        drive(&mut session, &renderer, "delete 1");
        assert!(matches!(session.mode(), Mode::ConfirmDelete { .. }));
        assert_eq!(session.prompt(), "Delete this task? (y/N) ");

        drive(&mut session, &renderer, "n");
        assert_eq!(session.mode(), Mode::Command);
        assert_eq!(session.store().tasks().len(), 1);
        assert_eq!(session.notice(), Some("Delete cancelled."));

        drive(&mut session, &renderer, "delete 1");
        drive(&mut session, &renderer, "YES");
        assert!(session.store().tasks().is_empty());
        assert_eq!(session.notice(), Some("Task deleted."));
    }

    #[test]
    fn row_numbers_resolve_against_the_last_frame() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "add Solo due:2026-09-01");
        drive(&mut session, &renderer, "toggle 5");
        assert_eq!(session.notice(), Some("No such task."));
        assert!(!session.store().tasks()[0].completed);

        drive(&mut session, &renderer, "toggle 1");
        assert!(session.store().tasks()[0].completed);
        drive(&mut session, &renderer, "toggle 1");
        assert!(!session.store().tasks()[0].completed);
    }

    #[test]
    fn view_state_commands_stay_session_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        drive(&mut session, &renderer, "filter completed");
        drive(&mut session, &renderer, "search milk run");
        drive(&mut session, &renderer, "sort due");

        assert_eq!(session.view_state().filter, StatusFilter::Completed);
        assert_eq!(session.view_state().search, "milk run");
        assert_eq!(session.view_state().sort, SortMode::Due);

        // nothing about the view lands in the data directory
        let entries: Vec<_> = std::fs::read_dir(temp.path().join("data"))
            .expect("read data dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(entries.iter().all(|name| name == "tasks.json" || name == "theme.data"));
    }

    #[test]
    fn theme_toggle_flips_and_persists() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        assert_eq!(session.theme(), Theme::Light);
        drive(&mut session, &renderer, "theme");
        assert_eq!(session.theme(), Theme::Dark);
        assert_eq!(session.notice(), Some("Switched to dark theme."));

        // a fresh session picks the saved theme back up
        let (session2, _) = test_fixture(temp.path());
        assert_eq!(session2.theme(), Theme::Dark);
    }

    #[test]
    fn quit_ends_the_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (mut session, renderer) = test_fixture(temp.path());

        assert_eq!(drive(&mut session, &renderer, "list"), Outcome::Continue);
        assert_eq!(drive(&mut session, &renderer, "quit"), Outcome::Quit);
        assert_eq!(drive(&mut session, &renderer, "ex"), Outcome::Quit);
    }
}
