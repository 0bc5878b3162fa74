use std::io::{Stdout, stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ember_core::FlamegraphWidget;
use ember_core::canvas::Viewport;
use ember_core::interaction::SessionEvent;
use ember_core::model::FlamegraphView;
use ember_core::provider::TreeProvider;
use ember_core::tooltip::TooltipAction;
use ember_protocol::{Point, RenderCommand, TextAlign, ThemeToken};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};

/// Two clicks on the same cell within this window form a double click.
const DOUBLE_CLICK: Duration = Duration::from_millis(400);
const HELP: &str = " / filter | v view | 0 reset zoom | z zoom to pinned | ↑↓ scroll | q quit ";

fn theme_to_color(token: ThemeToken) -> Color {
    match token {
        ThemeToken::NodeLabel => Color::Black,
        ThemeToken::SelectionOutline => Color::LightBlue,
        ThemeToken::TextPrimary | ThemeToken::ToolbarText | ThemeToken::TagText => Color::White,
        ThemeToken::TextMuted => Color::Gray,
        ThemeToken::Background | ThemeToken::Surface | ThemeToken::TooltipBackground => {
            Color::Black
        }
        ThemeToken::Border | ThemeToken::TooltipBorder => Color::DarkGray,
        ThemeToken::ToolbarBackground => Color::DarkGray,
        ThemeToken::TagBackground => Color::Rgb(55, 71, 79),
    }
}

/// Maps the content area's cells onto canvas pixels: one column is one
/// label character wide and one row is one node tall.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellGrid {
    area: Rect,
    cell_width: f64,
    cell_height: f64,
}

impl CellGrid {
    fn viewport(&self, scroll_top: f64) -> Viewport {
        Viewport::new(
            f64::from(self.area.width) * self.cell_width,
            f64::from(self.area.height) * self.cell_height,
        )
        .scrolled_to(scroll_top)
    }

    /// Canvas point at the centre of a terminal cell, if the cell lies in
    /// the content area.
    fn point(&self, column: u16, row: u16, scroll_top: f64) -> Option<Point> {
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        inside.then(|| {
            Point::new(
                (f64::from(column - self.area.x) + 0.5) * self.cell_width,
                scroll_top + (f64::from(row - self.area.y) + 0.5) * self.cell_height,
            )
        })
    }

    /// Terminal row showing canvas `y`.
    fn row(&self, y: f64, scroll_top: f64) -> Option<u16> {
        let row = ((y - scroll_top) / self.cell_height).floor();
        (row >= 0.0 && row < f64::from(self.area.height)).then(|| self.area.y + row as u16)
    }

    /// Terminal columns `[start, end)` covering canvas `[x, x + w)`; at
    /// least one column wide.
    fn columns(&self, x: f64, w: f64) -> (u16, u16) {
        let width = f64::from(self.area.width);
        let start = (x / self.cell_width).floor().clamp(0.0, width);
        let end = ((x + w) / self.cell_width).ceil().clamp(start + 1.0, width.max(start + 1.0));
        (
            self.area.x + start as u16,
            self.area.x + (end as u16).min(self.area.width),
        )
    }
}

#[derive(Debug, Default)]
struct ClickTracker {
    last: Option<(u16, u16, Instant)>,
}

impl ClickTracker {
    /// Record a click; returns whether it completes a double click.
    fn register(&mut self, column: u16, row: u16, now: Instant) -> bool {
        let double = self.last.is_some_and(|(c, r, at)| {
            c == column && r == row && now.duration_since(at) <= DOUBLE_CLICK
        });
        self.last = if double { None } else { Some((column, row, now)) };
        double
    }
}

struct TerminalApp<'a> {
    widget: FlamegraphWidget,
    provider: &'a dyn TreeProvider,
    grid: CellGrid,
    scroll_top: f64,
    content_height: f64,
    /// Filter text being typed after `/`.
    prompt: Option<String>,
    clicks: ClickTracker,
    quit: bool,
}

pub fn run(widget: FlamegraphWidget, provider: &dyn TreeProvider) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let config = *widget.config();
    let mut app = TerminalApp {
        widget,
        provider,
        grid: CellGrid {
            area: Rect::default(),
            cell_width: config.label_char_width,
            cell_height: config.node_height,
        },
        scroll_top: 0.0,
        content_height: 0.0,
        prompt: None,
        clicks: ClickTracker::default(),
        quit: false,
    };
    let result = app.event_loop(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

impl TerminalApp<'_> {
    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.quit {
            self.widget.refresh(self.provider);
            terminal.draw(|frame| self.draw(frame))?;

            if event::poll(Duration::from_millis(100))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.on_key(key.code),
                    Event::Mouse(mouse) => self.on_mouse(mouse),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let header = Rect::new(area.x, area.y, area.width, 1.min(area.height));
        let content = Rect::new(area.x, area.y + 1, area.width, area.height.saturating_sub(2));
        let footer = Rect::new(area.x, area.bottom().saturating_sub(1), area.width, 1.min(area.height));

        self.grid.area = content;
        self.scroll(0.0);
        let canvas = self.widget.paint(&self.grid.viewport(self.scroll_top));
        self.content_height = canvas.content_height;

        frame.render_widget(
            Block::default().style(Style::default().bg(theme_to_color(ThemeToken::Background))),
            content,
        );
        self.draw_commands(frame.buffer_mut(), &canvas.commands);
        frame.render_widget(Paragraph::new(self.header_line()), header);

        let footer_text = match &self.prompt {
            Some(text) => format!(" filter> {text}_"),
            None => HELP.to_string(),
        };
        frame.render_widget(
            Paragraph::new(footer_text).style(
                Style::default()
                    .fg(theme_to_color(ThemeToken::ToolbarText))
                    .bg(theme_to_color(ThemeToken::ToolbarBackground)),
            ),
            footer,
        );

        self.draw_tooltip(frame, content);
    }

    fn header_line(&self) -> Line<'static> {
        let state = self.widget.state();
        let toolbar = Style::default()
            .fg(theme_to_color(ThemeToken::ToolbarText))
            .bg(theme_to_color(ThemeToken::ToolbarBackground));
        let view = match &state.view {
            FlamegraphView::TopDown => "Top Down",
            FlamegraphView::BottomUp => "Bottom Up",
            FlamegraphView::Pivot { .. } => "Pivot",
        };
        let mut spans = vec![Span::styled(
            format!(" ember | {} | {view} ", state.selected_metric_name),
            toolbar.add_modifier(Modifier::BOLD),
        )];
        for tag in state.tags() {
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format!(" {tag} "),
                Style::default()
                    .fg(theme_to_color(ThemeToken::TagText))
                    .bg(theme_to_color(ThemeToken::TagBackground)),
            ));
        }
        Line::from(spans)
    }

    fn draw_commands(&self, buf: &mut Buffer, commands: &[RenderCommand]) {
        for cmd in commands {
            match cmd {
                RenderCommand::DrawRect {
                    rect,
                    fill,
                    border_color,
                    ..
                } => {
                    let Some(row) = self.grid.row(rect.y, self.scroll_top) else {
                        continue;
                    };
                    let [r, g, b, _] = fill.to_rgba8();
                    let mut style = Style::default().bg(Color::Rgb(r, g, b));
                    if let Some(token) = border_color {
                        style = style
                            .fg(theme_to_color(*token))
                            .add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
                    }
                    let (start, end) = self.grid.columns(rect.x, rect.w);
                    for column in start..end {
                        if let Some(cell) = buf.cell_mut((column, row)) {
                            cell.set_char(' ').set_style(style);
                        }
                    }
                }
                RenderCommand::DrawText {
                    text,
                    position,
                    color,
                    align,
                    ..
                } => {
                    let Some(row) = self.grid.row(position.y, self.scroll_top) else {
                        continue;
                    };
                    let len = text.chars().count() as f64 * self.grid.cell_width;
                    let x = match align {
                        TextAlign::Left => position.x,
                        TextAlign::Center => position.x - len / 2.0,
                        TextAlign::Right => position.x - len,
                    };
                    let (start, _) = self.grid.columns(x.max(0.0), 0.0);
                    for (column, ch) in (start..self.grid.area.right()).zip(text.chars()) {
                        if let Some(cell) = buf.cell_mut((column, row)) {
                            cell.set_char(ch).set_fg(theme_to_color(*color));
                        }
                    }
                }
                RenderCommand::DrawLine { .. }
                | RenderCommand::SetClip { .. }
                | RenderCommand::ClearClip
                | RenderCommand::BeginGroup { .. }
                | RenderCommand::EndGroup => {}
            }
        }
    }

    fn draw_tooltip(&self, frame: &mut Frame, content: Rect) {
        let Some((tooltip, text)) = self.widget.tooltip() else {
            return;
        };
        let mut lines = vec![Line::styled(
            text.title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )];
        lines.extend(text.lines.iter().map(|l| Line::raw(l.clone())));
        lines.extend(text.properties.iter().map(|(k, v)| Line::raw(format!("{k}: {v}"))));
        if tooltip.is_pinned() && text.actions.contains(&TooltipAction::Zoom) {
            lines.push(Line::styled(
                "z zoom",
                Style::default().fg(theme_to_color(ThemeToken::TextMuted)),
            ));
        }

        let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 2;
        let height = lines.len() as u16 + 2;
        let width = width.min(content.width);
        let height = height.min(content.height);
        let column = self
            .grid
            .columns(tooltip.anchor.x, 0.0)
            .0
            .saturating_add(1)
            .min(content.right().saturating_sub(width));
        let row = self
            .grid
            .row(tooltip.anchor.y, self.scroll_top)
            .unwrap_or(content.y)
            .saturating_add(1)
            .min(content.bottom().saturating_sub(height));
        let popup = Rect::new(column, row, width, height);

        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::bordered()
                    .border_style(Style::default().fg(theme_to_color(ThemeToken::TooltipBorder)))
                    .style(Style::default().bg(theme_to_color(ThemeToken::TooltipBackground))),
            ),
            popup,
        );
    }

    fn scroll(&mut self, delta: f64) {
        let visible = f64::from(self.grid.area.height) * self.grid.cell_height;
        let max = (self.content_height - visible).max(0.0);
        self.scroll_top = (self.scroll_top + delta).clamp(0.0, max);
    }

    fn remove_last_tag(&mut self) {
        if let Some(last) = self.widget.state().tags().len().checked_sub(1) {
            self.widget.remove_tag(last);
        }
    }

    fn on_key(&mut self, code: KeyCode) {
        if let Some(prompt) = self.prompt.as_mut() {
            match code {
                KeyCode::Enter => {
                    let text = std::mem::take(prompt);
                    self.prompt = None;
                    self.widget.add_filter_text(&text);
                }
                KeyCode::Esc => self.prompt = None,
                KeyCode::Backspace => {
                    let emptied = prompt.pop().is_none();
                    if emptied {
                        self.remove_last_tag();
                    }
                }
                KeyCode::Char(c) => prompt.push(c),
                _ => {}
            }
            return;
        }

        let row = self.grid.cell_height;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('/') => self.prompt = Some(String::new()),
            KeyCode::Char('v') => {
                let next = match self.widget.state().view {
                    FlamegraphView::TopDown => FlamegraphView::BottomUp,
                    _ => FlamegraphView::TopDown,
                };
                self.widget.select_view(next);
            }
            KeyCode::Char('0') => self.widget.reset_zoom(),
            KeyCode::Char('z') => {
                self.widget
                    .handle(SessionEvent::Action(TooltipAction::Zoom));
            }
            KeyCode::Up => self.scroll(-row),
            KeyCode::Down => self.scroll(row),
            KeyCode::PageUp => self.scroll(-f64::from(self.grid.area.height) * row),
            KeyCode::PageDown => self.scroll(f64::from(self.grid.area.height) * row),
            _ => {}
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let point = self.grid.point(mouse.column, mouse.row, self.scroll_top);
        match (mouse.kind, point) {
            (MouseEventKind::Moved, Some(p)) => {
                self.widget.handle(SessionEvent::PointerMoved(p));
            }
            (MouseEventKind::Moved, None) => {
                self.widget.handle(SessionEvent::PointerLeft);
            }
            (MouseEventKind::Down(MouseButton::Left), Some(p)) => {
                self.widget.handle(SessionEvent::Clicked(p));
                if self.clicks.register(mouse.column, mouse.row, Instant::now()) {
                    self.widget.handle(SessionEvent::DoubleClicked(p));
                }
            }
            (MouseEventKind::ScrollDown, _) => self.scroll(self.grid.cell_height),
            (MouseEventKind::ScrollUp, _) => self.scroll(-self.grid.cell_height),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CellGrid {
        CellGrid {
            area: Rect::new(0, 1, 40, 10),
            cell_width: 7.0,
            cell_height: 20.0,
        }
    }

    #[test]
    fn cells_map_to_pixel_centres() {
        let grid = grid();
        assert_eq!(grid.point(0, 1, 0.0), Some(Point::new(3.5, 10.0)));
        assert_eq!(grid.point(2, 3, 40.0), Some(Point::new(17.5, 90.0)));
        assert_eq!(grid.point(0, 0, 0.0), None);
        assert_eq!(grid.point(40, 5, 0.0), None);
        assert_eq!(grid.viewport(0.0), Viewport::new(280.0, 200.0));
    }

    #[test]
    fn rects_cover_whole_columns() {
        let grid = grid();
        assert_eq!(grid.columns(0.0, 13.0), (0, 2));
        assert_eq!(grid.columns(14.0, 2.0), (2, 3));
        // Narrower than a column still gets one.
        assert_eq!(grid.columns(15.0, 0.0), (2, 3));
        assert_eq!(grid.columns(270.0, 50.0), (38, 40));
        assert_eq!(grid.row(45.0, 0.0), Some(3));
        assert_eq!(grid.row(45.0, 60.0), None);
    }

    #[test]
    fn double_click_needs_same_cell_in_time() {
        let mut clicks = ClickTracker::default();
        let t0 = Instant::now();
        assert!(!clicks.register(3, 4, t0));
        assert!(clicks.register(3, 4, t0 + Duration::from_millis(200)));
        // A third click starts over.
        assert!(!clicks.register(3, 4, t0 + Duration::from_millis(300)));
        assert!(!clicks.register(5, 4, t0 + Duration::from_millis(350)));
        assert!(!clicks.register(5, 4, t0 + Duration::from_millis(900)));
    }
}
