use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use treeclimb::optimizer::ClimbResult;
use treeclimb::tree::{Equivalent, TaxaMap};

fn join(v: &[usize]) -> String {
    v.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_result(title: &str, result: &ClimbResult, newick: &str) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new(title).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Loss"),
        Cell::new(format!("{:.3}", result.loss)).fg(Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new("Start loss"),
        Cell::new(format!(
            "{:.3}",
            result.trajectory.as_slice().first().copied().unwrap_or(result.loss)
        )),
    ]);
    table.add_row(vec![
        Cell::new("Iterations"),
        Cell::new(result.iterations),
    ]);
    table.add_row(vec![Cell::new("v"), Cell::new(join(&result.v))]);
    table.add_row(vec![Cell::new("Tree"), Cell::new(newick)]);
    println!("\n{}", table);
}

pub fn print_taxa(taxa: &TaxaMap) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("Leaf").add_attribute(Attribute::Bold),
        Cell::new("Taxon").add_attribute(Attribute::Bold),
    ]);
    if let Some(col) = table.column_mut(0) {
        col.set_cell_alignment(CellAlignment::Right);
    }
    for (id, name) in taxa.iter() {
        table.add_row(vec![Cell::new(id), Cell::new(name)]);
    }
    println!("\n{}", table);
}

pub fn print_score(v: &[usize], newick: &str, loss: f64) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("v").add_attribute(Attribute::Bold),
        Cell::new("Tree").add_attribute(Attribute::Bold),
        Cell::new("Loss").fg(Color::Cyan),
    ]);
    table.add_row(vec![
        Cell::new(join(v)),
        Cell::new(newick),
        Cell::new(format!("{:.3}", loss)).fg(Color::Cyan),
    ]);
    if let Some(col) = table.column_mut(2) {
        col.set_cell_alignment(CellAlignment::Right);
    }
    println!("\n{}", table);
}

pub fn print_equivalents(v: &[usize], equivalents: &[Equivalent]) {
    let mut table = new_table();
    table.add_row(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("v").add_attribute(Attribute::Bold),
        Cell::new("Leaf permutation"),
    ]);
    table.add_row(vec![
        Cell::new("input"),
        Cell::new(join(v)).fg(Color::Cyan),
        Cell::new(""),
    ]);
    for (i, eq) in equivalents.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(join(&eq.v)),
            Cell::new(join(eq.permutation.as_slice())),
        ]);
    }
    println!("\n{}", table);
    println!("{} equivalent encodings", equivalents.len());
}
