use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use horizon_cli::pipeline::{ExtractResult, PrepareResult, SplitResult};
use horizon_model::OutcomeKind;

pub fn print_extract_summary(result: &ExtractResult) {
    println!(
        "Encounters: {} ({} first visits, {} outcome events)",
        result.encounters, result.first_visits, result.outcome_events
    );
    let mut header = vec![header_cell("Horizon"), header_cell("Rows"), header_cell("Columns")];
    header.extend(
        OutcomeKind::ALL
            .iter()
            .map(|kind| header_cell(&format!("At risk: {kind}"))),
    );
    header.push(header_cell("File"));

    let mut table = Table::new();
    table.set_header(header);
    apply_table_style(&mut table);
    for index in 1..=5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for output in &result.outputs {
        let mut row = vec![
            Cell::new(output.horizon)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(output.rows),
            Cell::new(output.columns),
        ];
        row.extend(output.at_risk.iter().map(|count| count_cell(*count, output.rows)));
        row.push(Cell::new(output.path.display()));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_split_summary(result: &SplitResult) {
    println!("Input rows: {}", result.input_rows);
    if result.filtered > 0 {
        println!("Dropped by age filter: {}", result.filtered);
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Partition"), header_cell("Rows"), header_cell("File")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (name, path, rows) in &result.outputs {
        table.add_row(vec![
            Cell::new(name).fg(Color::Blue),
            Cell::new(rows),
            Cell::new(path.display()),
        ]);
    }
    println!("{table}");
}

pub fn print_prepare_summary(result: &PrepareResult) {
    let bundle = &result.bundle;
    println!("Bundle: {}", result.path.display());
    println!(
        "Source: {}",
        if result.cached { "cache" } else { "computed" }
    );
    println!(
        "Schema: {} columns, imputer {:?}",
        bundle.pipeline.schema().len(),
        bundle.imputer().strategy()
    );

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Partition"),
        header_cell("Rows"),
        header_cell("Columns"),
        header_cell("Events"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);

    for partition in std::iter::once(&bundle.train).chain(&bundle.held_out) {
        table.add_row(vec![
            Cell::new(&partition.name).fg(Color::Blue),
            Cell::new(partition.x.height()),
            Cell::new(partition.x.width()),
            Cell::new(partition.y.events()),
            Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold),
        ]);
    }
    for failure in &bundle.failures {
        table.add_row(vec![
            Cell::new(&failure.name).fg(Color::Blue),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
            Cell::new("FAILED").fg(Color::Red).add_attribute(Attribute::Bold),
        ]);
    }
    println!("{table}");

    if !bundle.failures.is_empty() {
        eprintln!("Errors:");
        for failure in &bundle.failures {
            eprintln!("- {}: {}", failure.name, failure.message);
        }
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

/// Highlights outcomes where no encounter is left at risk.
fn count_cell(count: usize, rows: usize) -> Cell {
    if count == 0 && rows > 0 {
        Cell::new(count).fg(Color::Yellow).add_attribute(Attribute::Bold)
    } else {
        Cell::new(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
