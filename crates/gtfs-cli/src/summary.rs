use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use gtfs_model::Severity;
use gtfs_standards::DoctorReport;

use crate::commands::ValidateRun;
use crate::report::NoticeGroup;

pub fn print_summary(run: &ValidateRun) {
    let report = &run.report;
    println!("Feed: {}", report.feed);
    println!("Schema: {} ({})", report.feed_schema.source, short_hash(&report.feed_schema.sha256));
    if let Some(path) = &run.report_path {
        println!("Report: {}", path.display());
    }
    println!("{}", file_table(run));
    if !report.notices.is_empty() {
        println!();
        println!("Notices:");
        println!("{}", notice_table(&report.notices));
    }
    println!(
        "{} errors, {} warnings, {} infos",
        report.summary.errors, report.summary.warnings, report.summary.infos
    );
    if !report.summary.rules.skipped.is_empty() {
        println!(
            "Skipped rules (input files not loaded): {}",
            report.summary.rules.skipped.join(", ")
        );
    }
}

pub fn file_table(run: &ValidateRun) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Rows"),
        header_cell("Entities"),
        header_cell("Notices"),
        header_cell("Loaded"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);

    let mut total_rows = 0usize;
    let mut total_notices = 0usize;
    for stats in &run.report.summary.files {
        total_rows += stats.rows;
        total_notices += stats.notices;
        table.add_row(vec![
            Cell::new(&stats.filename)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(stats.rows),
            Cell::new(stats.entities),
            count_cell(stats.notices, Color::Yellow),
            loaded_cell(stats.loaded),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total_rows).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total_notices, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table
}

pub fn notice_table(groups: &[NoticeGroup]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Code"),
        header_cell("Count"),
        header_cell("Example"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for group in groups {
        table.add_row(vec![
            severity_cell(group.severity),
            Cell::new(&group.code),
            Cell::new(group.count).fg(severity_color(group.severity)),
            example_cell(group),
        ]);
    }
    table
}

pub fn print_schema(report: &DoctorReport) {
    println!("Schema: {}", report.source);
    if let Some(name) = &report.name {
        match &report.version {
            Some(version) => println!("Name: {name} {version}"),
            None => println!("Name: {name}"),
        }
    }
    println!("SHA-256: {}", report.sha256);
    println!(
        "{} files ({} required), {} fields ({} required), {} references",
        report.counts.files,
        report.counts.required_files,
        report.counts.fields,
        report.counts.required_fields,
        report.counts.references
    );
    println!("{}", schema_table(report));
}

pub fn schema_table(report: &DoctorReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Required"),
        header_cell("Fields"),
        header_cell("Key"),
        header_cell("Depends on"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for filename in &report.dependency_order {
        let Some(file) = report.files.iter().find(|file| &file.filename == filename) else {
            continue;
        };
        table.add_row(vec![
            Cell::new(&file.filename),
            if file.required {
                Cell::new("yes").fg(Color::Green)
            } else {
                dim_cell("no")
            },
            Cell::new(format!("{}/{}", file.required_fields, file.fields)),
            list_cell(&file.key),
            list_cell(&file.depends_on),
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
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

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
        Severity::Info => Cell::new("INFO").fg(Color::Blue),
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Blue,
    }
}

fn example_cell(group: &NoticeGroup) -> Cell {
    let Some(sample) = group.samples.first() else {
        return dim_cell("-");
    };
    let text = sample
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ");
    Cell::new(text)
}

fn loaded_cell(loaded: bool) -> Cell {
    if loaded {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn list_cell(values: &[String]) -> Cell {
    if values.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(values.join(", "))
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

fn short_hash(sha256: &str) -> &str {
    sha256.get(..12).unwrap_or(sha256)
}
