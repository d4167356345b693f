//! Console rendering of grids, standings and results.

use stanza::style::{Bold, HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Cell, Col, Row, Table};
use tinyrand::Rand;

use crate::data::{RaceProgramEntry, RaceResult, WeatherInfo};
use crate::grid::{GridCell, GridRow, OddsGrid};
use crate::sim::RaceSimulation;

pub fn tabulate_grid(grid: &OddsGrid) -> Table {
    let mut table = Table::default()
        .with_cols({
            let mut cols = vec![Col::new(
                Styles::default()
                    .with(Separator(true))
                    .with(MinWidth(4))
                    .with(HAlign::Centred),
            )];
            for _ in grid.columns() {
                cols.push(Col::new(
                    Styles::default().with(MinWidth(12)).with(HAlign::Right),
                ));
            }
            cols
        })
        .with_row({
            let mut header_cells: Vec<Cell> = vec!["".into()];
            for label in grid.columns() {
                header_cells.push(label.clone().into());
            }
            Row::new(
                Styles::default().with(Header(true)).with(Separator(true)),
                header_cells,
            )
        });

    for (_, row) in grid.visible_rows() {
        let mut row_cells: Vec<Cell> = vec![marker(row).into()];
        for cell in &row.cells {
            row_cells.push(format_cell(cell).into());
        }
        let styles = if row.is_favorite {
            Styles::default().with(Bold(true))
        } else {
            Styles::default()
        };
        table.push_row(Row::new(styles, row_cells));
    }

    table
}

/// `*` for the favourite, `K` for a non-runner, followed by any stable-partner tag.
fn marker(row: &GridRow) -> String {
    let mut marker = String::new();
    if row.is_favorite {
        marker.push('*');
    }
    if row.is_non_runner {
        marker.push('K');
    }
    if let Some(group_tag) = &row.group_tag {
        if !marker.is_empty() {
            marker.push(' ');
        }
        marker.push_str(group_tag);
    }
    marker
}

fn format_cell(cell: &GridCell) -> String {
    if cell.is_blank() {
        String::new()
    } else {
        format!("{} | {}", cell.label, cell.odds)
    }
}

pub fn tabulate_standings<R: Rand>(sim: &RaceSimulation<R>) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(4)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(16)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Rank".into(),
                "No".into(),
                "Runner".into(),
                "Jockey".into(),
                "Silks".into(),
                "Progress".into(),
            ],
        ));

    let winner = sim.winner().map(|runner| runner.id.as_str());
    for (rank, runner) in sim.ranking().enumerate() {
        let progress = sim.progress(&runner.id).unwrap_or_default();
        let styles = if Some(runner.id.as_str()) == winner {
            Styles::default().with(Bold(true))
        } else {
            Styles::default()
        };
        table.push_row(Row::new(
            styles,
            vec![
                format!("{}", rank + 1).into(),
                runner.number.clone().into(),
                runner.name.clone().into(),
                runner.jockey.clone().into(),
                runner.colour().to_owned().into(),
                format!("{:.1}%", f64::min(progress, 1.0) * 100.0).into(),
            ],
        ));
    }

    table
}

pub fn tabulate_card(race: &RaceProgramEntry) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(4)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(16)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "No".into(),
                "Runner".into(),
                "Jockey".into(),
                "AGF".into(),
                "HP".into(),
            ],
        ));
    for runner in &race.runners {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                runner.number.clone().into(),
                runner.name.clone().into(),
                runner.jockey.clone().into(),
                runner.favoritism_percent.as_deref().unwrap_or("-").to_owned().into(),
                runner.handicap.as_deref().unwrap_or("-").to_owned().into(),
            ],
        ));
    }
    table
}

pub fn tabulate_result(result: &RaceResult) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(4)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(4)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(16)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(9)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(7)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Pos".into(),
                "No".into(),
                "Runner".into(),
                "Jockey".into(),
                "Time".into(),
                "Win".into(),
            ],
        ));
    for finisher in &result.finishers {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                finisher.position.as_deref().unwrap_or("-").to_owned().into(),
                finisher.number.clone().into(),
                finisher.name.clone().into(),
                finisher.jockey.clone().into(),
                finisher.time.as_deref().unwrap_or("-").to_owned().into(),
                finisher.odds.as_deref().unwrap_or("-").to_owned().into(),
            ],
        ));
    }
    table
}

pub fn describe_weather(weather: Option<&WeatherInfo>) -> String {
    match weather {
        None => "no weather data".into(),
        Some(weather) => format!(
            "{}, {}°C, humidity {}, {}, {}",
            weather.condition,
            weather.temperature,
            weather.humidity,
            weather.track_turf,
            weather.track_dirt
        ),
    }
}

#[cfg(test)]
mod tests {
    use stanza::renderer::console::Console;
    use stanza::renderer::Renderer;
    use tinyrand::{Seeded, StdRand};

    use super::*;
    use crate::data::{BetEntry, BetType, Runner};
    use crate::sim::SimConfig;

    #[test]
    fn grid_table_skips_blank_rows() {
        let bet_types = vec![
            BetType {
                label: Some("GANYAN".into()),
                entries: vec![
                    Some(BetEntry::runner("1", "2.5").with_favorite(true).with_group("1")),
                    None,
                    Some(BetEntry::runner("3", "4.0").with_non_runner(true)),
                ],
            },
            BetType::new("PLASE", vec![BetEntry::runner("1", "1.3")]),
        ];
        let grid = OddsGrid::build(&bet_types);
        let table = tabulate_grid(&grid);
        assert_eq!(3, table.num_cols());
        // header plus two visible rows
        assert_eq!(3, table.num_rows());

        let rendered = Console::default().render(&table).to_string();
        assert!(rendered.contains("GANYAN"));
        assert!(rendered.contains("1 | 2.5"));
        assert!(rendered.contains("3 | K"));
    }

    #[test]
    fn markers() {
        let row = GridRow {
            is_favorite: true,
            is_non_runner: false,
            group_tag: Some("e2".into()),
            cells: vec![],
        };
        assert_eq!("* e2", marker(&row));
        assert_eq!("K", marker(&GridRow { is_non_runner: true, ..GridRow::default() }));
        assert_eq!("", marker(&GridRow::default()));
    }

    #[test]
    fn standings_table() {
        let runners = vec![Runner::new("A", "1", "ARION"), Runner::new("B", "2", "BAYARD")];
        let sim = RaceSimulation::new(SimConfig::planar(), runners, StdRand::seed(1)).unwrap();
        let table = tabulate_standings(&sim);
        assert_eq!(6, table.num_cols());
        assert_eq!(3, table.num_rows());
    }

    #[test]
    fn weather_description() {
        assert_eq!("no weather data", describe_weather(None));
        let weather = WeatherInfo {
            condition: "Açık".into(),
            temperature: "21".into(),
            humidity: "%40".into(),
            track_turf: "Çim: Normal".into(),
            track_dirt: "Kum: Normal".into(),
        };
        assert_eq!(
            "Açık, 21°C, humidity %40, Çim: Normal, Kum: Normal",
            describe_weather(Some(&weather))
        );
    }
}
