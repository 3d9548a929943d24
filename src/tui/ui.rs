//! UI rendering for the debugger.

use super::app::DebuggerApp;
use crate::cpu::Reg;
use crate::devices::display::{DISPLAY_COLS, DISPLAY_ROWS};
use crate::devices::ROW_WORDS;
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(7), Constraint::Length(3)])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: display, memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(DISPLAY_ROWS as u16 + 2),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_display(frame, right_chunks[0], app);
    draw_memory(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2], app);
}

fn draw_disassembly(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let disasm = app.get_disassembly((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = disasm
        .iter()
        .map(|(addr, instr, is_current)| {
            let prefix = if *is_current { "▶ " } else { "  " };
            let style = if *is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{:04x}: {}", prefix, addr, instr)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let line = |names: &[Reg]| {
        let mut spans = Vec::new();
        for reg in names {
            spans.push(Span::raw(format!("{:>2}: ", reg.name())));
            let value = regs.get(*reg);
            let style = if value == 0 {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            spans.push(Span::styled(format!("{:04x}  ", value), style));
        }
        Line::from(spans)
    };

    let state = if app.running {
        Span::styled("running", Style::default().fg(Color::Green))
    } else {
        Span::styled("paused", Style::default().fg(Color::Red))
    };

    let content = vec![
        line(&[Reg::A, Reg::B, Reg::C, Reg::X]),
        line(&[Reg::Y, Reg::Z, Reg::I, Reg::J]),
        line(&[Reg::Sp, Reg::Pc, Reg::O]),
        Line::from(vec![
            Span::raw("Steps: "),
            Span::styled(format!("{}", app.cpu.steps()), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            state,
            Span::raw(if app.cpu.skip_pending() { "   skip" } else { "" }),
        ]),
        Line::from(vec![
            Span::raw("Sent: "),
            Span::styled(format!("{}", app.sent_total), Style::default().fg(Color::Cyan)),
            Span::raw(match app.last_sent {
                Some(packet) => format!("   last → hub {}: {:04x}", packet.peer, packet.data),
                None => String::new(),
            }),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

fn draw_display(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let display = &app.cpu.mem.observer().display;
    let lines: Vec<Line> = (0..DISPLAY_ROWS)
        .map(|row| Line::from(display.row_text(row).unwrap_or_default()))
        .collect();

    let paragraph = Paragraph::new(lines).style(Style::default().fg(Color::Green)).block(
        Block::default()
            .title(format!(" Display {}x{} ", DISPLAY_ROWS, DISPLAY_COLS))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );

    frame.render_widget(paragraph, area);
}

fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let pc = app.cpu.regs.pc;

    let items: Vec<ListItem> = app
        .memory_rows()
        .into_iter()
        .skip(app.mem_scroll)
        .take(visible_rows)
        .map(|row| {
            let mut spans = vec![Span::styled(format!("{:04x}:", row), Style::default().fg(Color::DarkGray))];
            for offset in 0..ROW_WORDS {
                let addr = row.wrapping_add(offset);
                let value = app.cpu.mem.peek(usize::from(addr)).unwrap_or(0);
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if value != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!(" {:04x}", value), style));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let lines = if app.capture {
        vec![Line::from("Typing goes to the guest keyboard"), Line::from("Esc/Tab: Release")]
    } else {
        vec![
            Line::from("s: Step  r: Run  p: Pause  x: Reset"),
            Line::from("Tab: Capture keys  ↑↓: Scroll memory  q: Quit"),
        ]
    };
    let help = Paragraph::new(lines)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}
