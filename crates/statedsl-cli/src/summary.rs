use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use statedsl_model::{HighState, ModuleDecl, RequisiteKind, StateDecl, StateId};

/// Print the document summary to stdout.
pub fn print_summary(sls: &str, high: &HighState) {
    println!("Document: {sls}");
    if !high.include.is_empty() {
        println!("Include: {}", high.include.join(", "));
    }
    println!("{}", summary_table(high));
}

/// One row per module declaration: main states first, then extend overrides.
pub fn summary_table(high: &HighState) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("State"),
        header_cell("Section"),
        header_cell("Module"),
        header_cell("Function"),
        header_cell("Args"),
        header_cell("Requisites"),
    ]);
    apply_table_style(&mut table);
    if let Some(column) = table.column_mut(4) {
        column.set_cell_alignment(CellAlignment::Right);
    }
    add_rows(&mut table, &high.states, "state");
    add_rows(&mut table, &high.extend, "extend");
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn add_rows(table: &mut Table, states: &[(StateId, StateDecl)], section: &str) {
    for (id, decl) in states {
        if decl.is_empty() {
            table.add_row(vec![
                Cell::new(id.as_str()),
                section_cell(section),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]);
            continue;
        }
        for (module, module_decl) in decl.iter() {
            let (plain, requisites) = split_args(module_decl);
            table.add_row(vec![
                Cell::new(id.as_str()),
                section_cell(section),
                Cell::new(module.as_str()),
                function_cell(module_decl.function.as_deref()),
                Cell::new(plain),
                requisite_cell(&requisites),
            ]);
        }
    }
}

/// Count plain arguments and the targets of each requisite kind.
fn split_args(decl: &ModuleDecl) -> (usize, Vec<(RequisiteKind, usize)>) {
    let mut plain = 0;
    let mut requisites: Vec<(RequisiteKind, usize)> = Vec::new();
    for arg in &decl.args {
        let Some(kind) = RequisiteKind::from_name(&arg.key) else {
            plain += 1;
            continue;
        };
        let count = arg.value.as_array().map_or(1, Vec::len);
        match requisites.iter_mut().find(|(existing, _)| *existing == kind) {
            Some((_, total)) => *total += count,
            None => requisites.push((kind, count)),
        }
    }
    (plain, requisites)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn section_cell(section: &str) -> Cell {
    match section {
        "extend" => Cell::new(section).fg(Color::Yellow),
        _ => dim_cell(section),
    }
}

fn function_cell(function: Option<&str>) -> Cell {
    match function {
        Some(function) => Cell::new(function).fg(Color::Green),
        None => dim_cell("-"),
    }
}

fn requisite_cell(requisites: &[(RequisiteKind, usize)]) -> Cell {
    if requisites.is_empty() {
        return dim_cell("-");
    }
    let text = requisites
        .iter()
        .map(|(kind, count)| format!("{} {count}", kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    Cell::new(text)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
