use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use queryplay::catalog::TableSchema;
use queryplay::projection::{GenericTable, Scalar, TypeTag};

pub fn display_results(table: &GenericTable, max_rows: usize) {
    if table.columns.is_empty() {
        println!("Statement returned no columns.");
        return;
    }

    let mut grid = Table::new();
    grid.set_content_arrangement(ContentArrangement::Dynamic);

    let headers: Vec<Cell> = table
        .columns
        .iter()
        .zip(&table.types)
        .map(|(name, tag)| {
            Cell::new(format!("{}\n{}", name, type_label(*tag))).add_attribute(Attribute::Bold)
        })
        .collect();
    grid.set_header(headers);

    for row in table.rows.iter().take(max_rows) {
        let cells: Vec<Cell> = row
            .iter()
            .map(|value| match value {
                Scalar::Null => Cell::new("NULL").add_attribute(Attribute::Dim),
                Scalar::Integer(_) | Scalar::Float(_) => {
                    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
                }
                other => Cell::new(other.to_string()),
            })
            .collect();
        grid.add_row(cells);
    }

    println!("{grid}");
    if table.row_count() > max_rows {
        println!(
            "... {} more rows not shown (display.max_display_rows = {})",
            table.row_count() - max_rows,
            max_rows
        );
    }
    println!("{} rows returned", table.row_count());
}

pub fn display_schema(schemas: &[TableSchema]) {
    if schemas.is_empty() {
        println!("No tables loaded. Use \\load <file> to add one.");
        return;
    }

    for schema in schemas {
        let mut grid = Table::new();
        grid.set_content_arrangement(ContentArrangement::Dynamic);
        grid.set_header(vec![
            Cell::new("column").add_attribute(Attribute::Bold),
            Cell::new("type").add_attribute(Attribute::Bold),
            Cell::new("nullable").add_attribute(Attribute::Bold),
            Cell::new("original label").add_attribute(Attribute::Bold),
        ]);
        for column in &schema.columns {
            grid.add_row(vec![
                Cell::new(&column.normalized_name),
                Cell::new(column.inferred_type.as_str()),
                Cell::new(if column.nullable { "yes" } else { "no" }),
                Cell::new(&column.original_label),
            ]);
        }
        println!("{} ({} rows)", schema.name, schema.row_count);
        println!("{grid}");
    }
}

fn type_label(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Integer => "integer",
        TypeTag::Float => "float",
        TypeTag::Date => "date",
        TypeTag::Text => "text",
    }
}
