//! Frame layout and widgets for the LS-8 debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use crate::cpu::{MEMORY_SIZE, STACK_BASE};
use super::app::{DebuggerApp, MEMORY_ROW};

const CURRENT: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
const ZERO: Style = Style::new().fg(Color::DarkGray);
const NONZERO: Style = Style::new().fg(Color::White);

fn panel(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::new().fg(color))
}

fn value_style(value: u8) -> Style {
    if value == 0 { ZERO } else { NONZERO }
}

/// Lay out and render every panel.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let [code, machine] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(frame.area());

    let [listing, registers, status] = Layout::vertical([
        Constraint::Min(8),
        Constraint::Length(7),
        Constraint::Length(3),
    ])
    .areas(code);

    let [memory, output, help] = Layout::vertical([
        Constraint::Length((MEMORY_SIZE / MEMORY_ROW) as u16 + 2),
        Constraint::Min(4),
        Constraint::Length(4),
    ])
    .areas(machine);

    draw_disassembly(frame, listing, app);
    draw_registers(frame, registers, app);
    frame.render_widget(
        Paragraph::new(app.status.as_str()).block(panel("Status", Color::White)),
        status,
    );
    draw_memory(frame, memory, app);
    draw_output(frame, output, app);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
            Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
        ])
        .style(ZERO)
        .block(panel("Keys", Color::DarkGray)),
        help,
    );
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows = (area.height as usize).saturating_sub(2);

    let items: Vec<ListItem> = app
        .get_disassembly(rows)
        .into_iter()
        .map(|(addr, text, is_pc)| {
            let marker = match (is_pc, app.breakpoints.contains(&addr)) {
                (true, true) => "●▶",
                (true, false) => " ▶",
                (false, true) => "● ",
                (false, false) => "  ",
            };
            let style = if is_pc {
                CURRENT
            } else if app.breakpoints.contains(&addr) {
                Style::new().fg(Color::Red)
            } else {
                Style::new()
            };
            ListItem::new(format!("{} {:03}: {}", marker, addr, text)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(panel("Program", Color::Cyan)), area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let cpu = &app.cpu;
    let regs = cpu.regs.values();

    let mut lines: Vec<Line> = regs
        .chunks(4)
        .enumerate()
        .map(|(row, values)| {
            Line::from(
                values
                    .iter()
                    .enumerate()
                    .flat_map(|(col, &value)| {
                        [
                            Span::raw(format!("R{}=", row * 4 + col)),
                            Span::styled(format!("{:3} ", value), value_style(value)),
                        ]
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    lines.push(Line::from(vec![
        Span::raw("PC="),
        Span::styled(format!("{:3}", cpu.pc), Style::new().fg(Color::Yellow)),
        Span::raw("  SP="),
        Span::styled(format!("{:3}", cpu.regs.sp()), Style::new().fg(Color::Magenta)),
        Span::raw(format!(" [{} deep]", cpu.regs.stack_depth())),
        Span::raw("  FL="),
        Span::styled(cpu.flags.to_string(), Style::new().fg(Color::Cyan)),
    ]));

    let state_style = if cpu.is_running() {
        Style::new().fg(Color::Green)
    } else {
        Style::new().fg(Color::Red)
    };
    lines.push(Line::from(vec![
        Span::raw(format!("{} cycle(s)  ", cpu.cycles)),
        Span::styled(format!("{:?}", cpu.state), state_style),
    ]));

    frame.render_widget(Paragraph::new(lines).block(panel("CPU", Color::Green)), area);
}

/// Memory in rows of [`MEMORY_ROW`] bytes; PC and live stack slots are highlighted.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows = (area.height as usize).saturating_sub(2);
    let cells = app.cpu.mem.as_slice();
    let pc = app.cpu.pc as usize;
    let stack = app.cpu.regs.sp() as usize..STACK_BASE as usize;

    let items: Vec<ListItem> = cells
        .chunks(MEMORY_ROW)
        .enumerate()
        .skip(app.mem_scroll)
        .take(rows)
        .map(|(row, chunk)| {
            let base = row * MEMORY_ROW;
            let mut spans = vec![Span::styled(format!("{:03} ", base), ZERO)];
            spans.extend(chunk.iter().enumerate().map(|(i, &value)| {
                let addr = base + i;
                let style = if addr == pc {
                    CURRENT
                } else if stack.contains(&addr) {
                    Style::new().fg(Color::Magenta)
                } else {
                    value_style(value)
                };
                Span::styled(format!("{:02X} ", value), style)
            }));
            ListItem::new(Line::from(spans))
        })
        .collect();

    frame.render_widget(List::new(items).block(panel("Memory", Color::Magenta)), area);
}

/// Tail of the PRN output.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let rows = (area.height as usize).saturating_sub(2);
    let tail = &app.output[app.output.len().saturating_sub(rows)..];
    let lines: Vec<Line> = tail.iter().map(|line| Line::from(line.as_str())).collect();

    frame.render_widget(
        Paragraph::new(lines).style(NONZERO).block(panel("Output", Color::White)),
        area,
    );
}
