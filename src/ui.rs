pub mod charting;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};

use catwalk::session::WalkState;
use catwalk::summary::{format_distance, format_duration, format_pace};

use crate::{ui::charting::compute_route_bounds, ui::charting::format_coord, App};

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;
/// Smallest map window, in degrees
const MIN_MAP_SPAN: f64 = 0.002;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let tracker = &self.tracker;

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let yellow_bold_style = Style::default().patch(bold_style).fg(Color::Yellow);
        let magenta_style = Style::default().fg(Color::Magenta);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1),
                    Constraint::Length(3),
                    Constraint::Min(6),
                    Constraint::Length(2),
                    Constraint::Length(1),
                ]
                .as_ref(),
            )
            .split(area);

        // status line
        let state = tracker.state();
        let (state_label, state_style) = match state {
            WalkState::NotStarted => ("READY", dim_style),
            WalkState::Active => ("WALKING", green_bold_style),
            WalkState::Paused => ("PAUSED", yellow_bold_style),
            WalkState::Ended => ("FINISHED", bold_style),
        };
        let source = if tracker.is_manual_mode() {
            "manual"
        } else {
            "live"
        };
        Paragraph::new(Line::from(vec![
            Span::styled(state_label, state_style),
            Span::styled(format!("  source: {source}"), dim_style),
            Span::styled(format!("  cats met: {}", self.cats_met.len()), magenta_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        // numbers
        let distance = tracker.total_distance();
        let elapsed = tracker.elapsed_millis().unwrap_or(0);
        let pace = match &self.summary {
            Some(summary) if state == WalkState::Ended => summary.average_pace_sec_per_km,
            _ if distance > 0.0 => Some((elapsed as f64 / 1000.0) / (distance / 1000.0)),
            _ => None,
        };
        let here = tracker.current_position();
        Paragraph::new(vec![
            Line::from(vec![
                Span::styled(format_distance(distance), bold_style),
                Span::raw("   "),
                Span::styled(format_duration(elapsed), bold_style),
                Span::raw("   "),
                Span::styled(format_pace(pace), bold_style),
            ]),
            Line::from(Span::styled(
                format!("{}, {}", format_coord(here.latitude), format_coord(here.longitude)),
                dim_style,
            )),
        ])
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        // map
        let coords: Vec<(f64, f64)> = tracker
            .session()
            .map(|s| s.route.points().map(|p| (p.longitude, p.latitude)).collect())
            .unwrap_or_default();
        let here_coords = [(here.longitude, here.latitude)];
        let mut framed = coords.clone();
        framed.push(here_coords[0]);
        let (x_bounds, y_bounds) = compute_route_bounds(&framed, MIN_MAP_SPAN);

        let datasets = vec![
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Cyan))
                .data(&coords),
            Dataset::default()
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(Color::Magenta))
                .data(&here_coords),
        ];

        Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title("route"))
            .x_axis(
                Axis::default()
                    .title("lng")
                    .bounds(x_bounds)
                    .labels(vec![
                        Span::styled(format_coord(x_bounds[0]), dim_style),
                        Span::styled(format_coord(x_bounds[1]), dim_style),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("lat")
                    .bounds(y_bounds)
                    .labels(vec![
                        Span::styled(format_coord(y_bounds[0]), dim_style),
                        Span::styled(format_coord(y_bounds[1]), dim_style),
                    ]),
            )
            .render(chunks[2], buf);

        // encounter / message banner
        let banner = if let Some(event) = &self.last_discovery {
            Line::from(vec![
                Span::styled("You met ", magenta_style),
                Span::styled(event.cat.name.clone(), magenta_style.add_modifier(Modifier::BOLD)),
                Span::styled(format!(" ({})", event.cat.rarity), magenta_style),
            ])
        } else if let Some(message) = &self.message {
            Line::from(Span::styled(message.clone(), yellow_bold_style))
        } else {
            Line::default()
        };
        Paragraph::new(banner)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        // help
        let help = match state {
            WalkState::NotStarted | WalkState::Ended => "(n)ew walk / (m)anual toggle / (esc)ape",
            WalkState::Active | WalkState::Paused if tracker.is_manual_mode() => {
                "arrows/wasd move / (space) pause / (f)inish / (m)anual toggle / (esc)ape"
            }
            WalkState::Active | WalkState::Paused => {
                "(space) pause / (f)inish / (m)anual toggle / (esc)ape"
            }
        };
        Paragraph::new(Span::styled(help, dim_style.add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
    }
}
