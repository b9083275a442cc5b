//! Frame drawing: header, active page, help footer and overlays.

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::{
    events::{PageId, ShellState},
    layout,
    shortcuts::{Shortcuts, format_keys},
};

use super::App;

pub fn draw(f: &mut Frame, app: &App) {
    if app.state == ShellState::Start {
        draw_splash(f);
        return;
    }

    let shell = layout::shell_layout(f.area(), app.footer_height());
    draw_header(f, app, shell.header);

    match app.active {
        PageId::Selection => app.selection.render(f, shell.body),
        PageId::Vars => app.vars.render(f, shell.body),
        PageId::Hosts => app.hosts.render(f, shell.body),
        PageId::Deploy => app.deploy.render(f, shell.body),
    }

    let legend = if app.show_full_help {
        full_help(app.active, &app.shortcuts)
    } else {
        vec![short_help(app.active, &app.shortcuts)]
    };
    f.render_widget(
        Paragraph::new(legend.join("\n")).style(Style::default().fg(Color::DarkGray)),
        shell.footer,
    );

    if let ShellState::Error(message) = &app.state {
        draw_error(f, message);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            " wdeploy ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Rgb(255, 140, 0))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(
            app.active.title(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn draw_splash(f: &mut Frame) {
    let area = layout::centered_rect(f.area(), 40, 3);
    let text = vec![
        Line::from(Span::styled(
            "wdeploy",
            Style::default()
                .fg(Color::Rgb(255, 140, 0))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Loading..."),
    ];
    f.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

fn draw_error(f: &mut Frame, message: &str) {
    let area = layout::centered_rect(f.area(), 70, 9);
    f.render_widget(Clear, area);
    let panel = Paragraph::new(format!("{message}\n\nPress Esc to continue."))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Bummer ")
                .border_style(Style::default().fg(Color::Red)),
        )
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true });
    f.render_widget(panel, area);
}

/// One-line legend for the active page.
fn short_help(page: PageId, sc: &Shortcuts) -> String {
    let g = &sc.global;
    let p = &sc.page;
    let main = match page {
        PageId::Selection => format!(
            "{} choose • {} filter",
            format_keys(&sc.selection.select),
            format_keys(&sc.selection.filter)
        ),
        PageId::Vars | PageId::Hosts => format!(
            "{} edit • {} line numbers • {} back",
            format_keys(&p.edit),
            format_keys(&p.line_numbers),
            format_keys(&g.back)
        ),
        PageId::Deploy => format!(
            "{} tabs • {} deploy • {} back",
            format_keys(&p.next_tab),
            format_keys(&p.deploy),
            format_keys(&g.back)
        ),
    };
    format!(
        "{main} • {} more • {} quit",
        format_keys(&g.help),
        format_keys(&g.quit)
    )
}

/// Full legend, one line per group, exactly `FULL_HELP_ROWS` lines.
fn full_help(page: PageId, sc: &Shortcuts) -> Vec<String> {
    let g = &sc.global;
    let p = &sc.page;
    let scrolling = format!(
        "{} up • {} down • {}/{} page • {}/{} half page • {} top • {} bottom",
        format_keys(&p.up),
        format_keys(&p.down),
        format_keys(&p.page_up),
        format_keys(&p.page_down),
        format_keys(&p.half_page_up),
        format_keys(&p.half_page_down),
        format_keys(&p.top),
        format_keys(&p.bottom)
    );
    let shell = format!(
        "{} help • {}/Ctrl+c quit",
        format_keys(&g.help),
        format_keys(&g.quit)
    );

    match page {
        PageId::Selection => {
            let s = &sc.selection;
            let i = &sc.filter;
            vec![
                format!(
                    "{} up • {} down • {} choose",
                    format_keys(&s.up),
                    format_keys(&s.down),
                    format_keys(&s.select)
                ),
                format!(
                    "{} filter • {} apply filter • {} clear filter",
                    format_keys(&s.filter),
                    format_keys(&i.confirm),
                    format_keys(&i.cancel)
                ),
                format!(
                    "{} clear line • {}/{} move cursor",
                    format_keys(&i.clear_line),
                    format_keys(&i.left),
                    format_keys(&i.right)
                ),
                shell,
            ]
        }
        PageId::Vars | PageId::Hosts => vec![
            scrolling,
            format!(
                "{} edit in $EDITOR • {} line numbers",
                format_keys(&p.edit),
                format_keys(&p.line_numbers)
            ),
            format!(
                "{}/{} switch tab • {} back",
                format_keys(&p.next_tab),
                format_keys(&p.prev_tab),
                format_keys(&g.back)
            ),
            shell,
        ],
        PageId::Deploy => {
            let d = &sc.dialog;
            vec![
                scrolling,
                format!(
                    "{}/{} summary/log • {} deploy again • {} line numbers",
                    format_keys(&p.next_tab),
                    format_keys(&p.prev_tab),
                    format_keys(&p.deploy),
                    format_keys(&p.line_numbers)
                ),
                format!(
                    "{}/{} choose button • {} confirm • {} back",
                    format_keys(&d.left),
                    format_keys(&d.right),
                    format_keys(&d.select),
                    format_keys(&g.back)
                ),
                shell,
            ]
        }
    }
}
