use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::backdrop::Backdrop;
use crate::config::Config;
use crate::datetime;
use crate::theme::{Palette, Rgb, Theme};
use crate::view::{ViewModel, ViewState};

const PROGRESS_WIDTH: usize = 24;
const TITLE_WIDTH_CAP: usize = 48;

/// Everything one repaint needs, borrowed from the session.
pub struct Frame<'a> {
    pub view: &'a ViewModel,
    pub state: &'a ViewState,
    pub theme: Theme,
    pub palette: Palette,
    pub backdrop: Option<&'a Backdrop>,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    pub fn print_frame(&self, frame: &Frame<'_>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_frame(&mut out, frame)
    }

    pub fn write_frame<W: Write>(&self, out: &mut W, frame: &Frame<'_>) -> anyhow::Result<()> {
        let color = self.color && io::stdout().is_terminal();

        if let Some(backdrop) = frame.backdrop {
            backdrop.write_into(out, color)?;
        }

        let mut header = format!(
            "docket · {} theme · filter {} · sort {}",
            frame.theme,
            frame.state.filter.as_str(),
            frame.state.sort.as_str()
        );
        if !frame.state.search.trim().is_empty() {
            header.push_str(&format!(" · search \"{}\"", frame.state.search.trim()));
        }
        writeln!(out, "{header}")?;
        writeln!(out)?;

        writeln!(
            out,
            "{} task(s) · {}",
            frame.view.shown,
            progress_bar(frame.view.percent, frame.palette.accent, color)
        )?;
        writeln!(out)?;

        if frame.view.rows.is_empty() {
            writeln!(out, "  No tasks found")?;
        } else {
            let title_width = frame
                .view
                .rows
                .iter()
                .map(|row| UnicodeWidthStr::width(row.task.title.as_str()))
                .max()
                .unwrap_or(0)
                .min(TITLE_WIDTH_CAP);

            for (idx, row) in frame.view.rows.iter().enumerate() {
                let index = paint(&format!("{:>2}", idx + 1), "33", color);
                let mark = if row.task.completed { "[x]" } else { "[ ]" };

                let title = pad_cell(&row.task.title, title_width);
                let title = if row.task.completed {
                    paint(&title, "2", color)
                } else {
                    title
                };

                let mut due = format!("due {}", datetime::format_due_label(&row.task.due_date));
                if row.overdue {
                    due.push_str("  overdue");
                    due = paint(&due, "31", color);
                }

                writeln!(out, "{index} {mark} {title}  {due}")?;
            }
        }

        if let Some(message) = frame.error {
            writeln!(out)?;
            writeln!(out, "{}", paint(&format!("! {message}"), "31", color))?;
        }

        if let Some(notice) = frame.notice {
            writeln!(out)?;
            writeln!(out, "{notice}")?;
        }

        Ok(())
    }
}

fn progress_bar(percent: u8, accent: Rgb, color: bool) -> String {
    let filled = (usize::from(percent) * PROGRESS_WIDTH) / 100;
    let fill = paint_rgb(&"#".repeat(filled), accent, color);
    let rest = "-".repeat(PROGRESS_WIDTH - filled);
    format!("[{fill}{rest}] {percent}%")
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
}

fn paint_rgb(text: &str, tint: Rgb, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", tint.r, tint.g, tint.b)
}

fn pad_cell(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(text);
    let padding = width.saturating_sub(visible);
    format!("{}{}", text, " ".repeat(padding))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Frame, Renderer, progress_bar};
    use crate::task::Task;
    use crate::theme::{Palette, Theme};
    use crate::view::{self, ViewState};

    fn plain_renderer() -> Renderer {
        Renderer { color: false }
    }

    fn render_to_string(frame: &Frame<'_>) -> String {
        let mut buf = Vec::new();
        plain_renderer()
            .write_frame(&mut buf, frame)
            .expect("write frame");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn empty_visible_list_renders_the_placeholder_row() {
        let now = Utc
            .with_ymd_and_hms(2026, 8, 8, 12, 0, 0)
            .single()
            .expect("valid now");
        let mut task = Task::new("Done already".to_string(), "2026-08-10".to_string(), now);
        task.completed = true;

        let state = ViewState {
            filter: crate::view::StatusFilter::Active,
            search: String::new(),
            sort: crate::view::SortMode::Created,
        };
        let model = view::build(&[task], &state, now);

        let text = render_to_string(&Frame {
            view: &model,
            state: &state,
            theme: Theme::Light,
            palette: Palette::for_theme(Theme::Light),
            backdrop: None,
            error: None,
            notice: None,
        });

        // placeholder never feeds the progress number
        assert!(text.contains("No tasks found"));
        assert!(text.contains("0 task(s)"));
        assert!(text.contains("100%"));
    }

    #[test]
    fn rows_show_marks_due_labels_and_overdue_tags() {
        let now = Utc
            .with_ymd_and_hms(2026, 8, 8, 12, 0, 0)
            .single()
            .expect("valid now");
        let tasks = vec![
            Task::new("Late task".to_string(), "2020-01-01".to_string(), now),
            Task::new("Future task".to_string(), "2099-12-31".to_string(), now),
        ];

        let state = ViewState::default();
        let model = view::build(&tasks, &state, now);
        let text = render_to_string(&Frame {
            view: &model,
            state: &state,
            theme: Theme::Dark,
            palette: Palette::for_theme(Theme::Dark),
            backdrop: None,
            error: Some("Task title is required."),
            notice: Some("Task created."),
        });

        assert!(text.contains("2 task(s)"));
        assert!(text.contains("[ ] Late task"));
        assert!(text.contains("due Jan 1, 2020  overdue"));
        assert!(text.contains("due Dec 31, 2099"));
        assert!(!text.contains("Future task  overdue"));
        assert!(text.contains("! Task title is required."));
        assert!(text.contains("Task created."));
        assert!(text.contains("dark theme"));
    }

    #[test]
    fn progress_bar_scales_with_the_percentage() {
        assert_eq!(progress_bar(0, Palette::for_theme(Theme::Light).accent, false).matches('#').count(), 0);
        assert_eq!(progress_bar(50, Palette::for_theme(Theme::Light).accent, false).matches('#').count(), 12);
        assert_eq!(progress_bar(100, Palette::for_theme(Theme::Light).accent, false).matches('#').count(), 24);
        assert!(progress_bar(25, Palette::for_theme(Theme::Light).accent, false).ends_with("25%"));
    }
}
