//! Fixture schemas and raw data.

use tabdat_core::{
    FieldType, ForeignKey, RawRow, RawTables, SchemaDescriptor, TableSchema, Value,
};

/// Zip each positional row with `fields` into a named raw row.
pub fn raw_rows(fields: &[&str], rows: Vec<Vec<Value>>) -> Vec<RawRow> {
    rows.into_iter()
        .map(|row| {
            assert_eq!(row.len(), fields.len(), "fixture row width");
            fields.iter().map(|f| f.to_string()).zip(row).collect()
        })
        .collect()
}

fn v(value: impl Into<Value>) -> Value {
    value.into()
}

// =============================================================================
// DIET
// =============================================================================

pub fn diet_schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .with_table(
            "categories",
            TableSchema::new(["name"], ["minNutrition", "maxNutrition"])
                .with_type("minNutrition", FieldType::Float)
                .with_type("maxNutrition", FieldType::Float),
        )
        .with_table("foods", TableSchema::new(["name"], ["cost"]))
        .with_table(
            "nutritionQuantities",
            TableSchema::new(["food", "category"], ["qty"]),
        )
        .with_foreign_key(ForeignKey::new(
            "nutritionQuantities",
            "foods",
            &[("food", "name")],
        ))
        .with_foreign_key(ForeignKey::new(
            "nutritionQuantities",
            "categories",
            &[("category", "name")],
        ))
}

pub fn diet_data() -> RawTables {
    let mut raw = RawTables::new();
    raw.insert(
        "categories".into(),
        raw_rows(
            &["name", "minNutrition", "maxNutrition"],
            vec![
                vec![v("calories"), v(1800.0), v(2200.0)],
                vec![v("protein"), v(91.0), v(f64::INFINITY)],
                vec![v("fat"), v(0.0), v(65.0)],
                vec![v("sodium"), v(0.0), v(1779.0)],
            ],
        ),
    );
    raw.insert(
        "foods".into(),
        raw_rows(
            &["name", "cost"],
            vec![
                vec![v("hamburger"), v(2.49)],
                vec![v("chicken"), v(2.89)],
                vec![v("hot dog"), v(1.50)],
                vec![v("fries"), v(1.89)],
                vec![v("macaroni"), v(2.09)],
                vec![v("pizza"), v(1.99)],
                vec![v("salad"), v(2.49)],
                vec![v("milk"), v(0.89)],
                vec![v("ice cream"), v(1.59)],
            ],
        ),
    );

    let quantities: [(&str, [f64; 4]); 9] = [
        ("hamburger", [410.0, 24.0, 26.0, 730.0]),
        ("chicken", [420.0, 32.0, 10.0, 1190.0]),
        ("hot dog", [560.0, 20.0, 32.0, 1800.0]),
        ("fries", [380.0, 4.0, 19.0, 270.0]),
        ("macaroni", [320.0, 12.0, 10.0, 930.0]),
        ("pizza", [320.0, 15.0, 12.0, 820.0]),
        ("salad", [320.0, 31.0, 12.0, 1230.0]),
        ("milk", [100.0, 8.0, 2.5, 125.0]),
        ("ice cream", [330.0, 8.0, 10.0, 180.0]),
    ];
    let categories = ["calories", "protein", "fat", "sodium"];
    let rows = quantities
        .iter()
        .flat_map(|(food, amounts)| {
            categories
                .iter()
                .zip(amounts.iter())
                .map(move |(category, qty)| vec![v(*food), v(*category), v(*qty)])
        })
        .collect();
    raw.insert(
        "nutritionQuantities".into(),
        raw_rows(&["food", "category", "qty"], rows),
    );
    raw
}

// =============================================================================
// NETFLOW
// =============================================================================

pub fn netflow_schema() -> SchemaDescriptor {
    let no_data = Vec::<String>::new;
    SchemaDescriptor::new()
        .with_table("commodities", TableSchema::new(["name"], no_data()))
        .with_table("nodes", TableSchema::new(["name"], no_data()))
        .with_table(
            "arcs",
            TableSchema::new(["source", "destination"], ["capacity"]),
        )
        .with_table(
            "cost",
            TableSchema::new(["commodity", "source", "destination"], ["cost"]),
        )
        .with_table(
            "inflow",
            TableSchema::new(["commodity", "node"], ["quantity"]),
        )
        .with_foreign_key(ForeignKey::new("arcs", "nodes", &[("source", "name")]))
        .with_foreign_key(ForeignKey::new("arcs", "nodes", &[("destination", "name")]))
        .with_foreign_key(ForeignKey::new("cost", "commodities", &[("commodity", "name")]))
        .with_foreign_key(ForeignKey::new("cost", "nodes", &[("source", "name")]))
        .with_foreign_key(ForeignKey::new("cost", "nodes", &[("destination", "name")]))
        .with_foreign_key(ForeignKey::new("inflow", "commodities", &[("commodity", "name")]))
        .with_foreign_key(ForeignKey::new("inflow", "nodes", &[("node", "name")]))
}

pub fn netflow_data() -> RawTables {
    let mut raw = RawTables::new();
    raw.insert(
        "commodities".into(),
        raw_rows(&["name"], vec![vec![v("Pencils")], vec![v("Pens")]]),
    );
    raw.insert(
        "nodes".into(),
        raw_rows(
            &["name"],
            ["Detroit", "Denver", "Boston", "New York", "Seattle"]
                .iter()
                .map(|n| vec![v(*n)])
                .collect(),
        ),
    );
    raw.insert(
        "arcs".into(),
        raw_rows(
            &["source", "destination", "capacity"],
            vec![
                vec![v("Detroit"), v("Boston"), v(100)],
                vec![v("Detroit"), v("New York"), v(80)],
                vec![v("Detroit"), v("Seattle"), v(120)],
                vec![v("Denver"), v("Boston"), v(120)],
                vec![v("Denver"), v("New York"), v(120)],
                vec![v("Denver"), v("Seattle"), v(120)],
            ],
        ),
    );
    raw.insert(
        "cost".into(),
        raw_rows(
            &["commodity", "source", "destination", "cost"],
            vec![
                vec![v("Pencils"), v("Detroit"), v("Boston"), v(10)],
                vec![v("Pencils"), v("Detroit"), v("New York"), v(20)],
                vec![v("Pencils"), v("Detroit"), v("Seattle"), v(60)],
                vec![v("Pencils"), v("Denver"), v("Boston"), v(40)],
                vec![v("Pencils"), v("Denver"), v("New York"), v(40)],
                vec![v("Pencils"), v("Denver"), v("Seattle"), v(30)],
                vec![v("Pens"), v("Detroit"), v("Boston"), v(20)],
                vec![v("Pens"), v("Detroit"), v("New York"), v(20)],
                vec![v("Pens"), v("Detroit"), v("Seattle"), v(80)],
                vec![v("Pens"), v("Denver"), v("Boston"), v(60)],
                vec![v("Pens"), v("Denver"), v("New York"), v(70)],
                vec![v("Pens"), v("Denver"), v("Seattle"), v(30)],
            ],
        ),
    );
    raw.insert(
        "inflow".into(),
        raw_rows(
            &["commodity", "node", "quantity"],
            vec![
                vec![v("Pencils"), v("Detroit"), v(50)],
                vec![v("Pencils"), v("Denver"), v(60)],
                vec![v("Pencils"), v("Boston"), v(-50)],
                vec![v("Pencils"), v("New York"), v(-50)],
                vec![v("Pencils"), v("Seattle"), v(-10)],
                vec![v("Pens"), v("Detroit"), v(60)],
                vec![v("Pens"), v("Denver"), v(40)],
                vec![v("Pens"), v("Boston"), v(-40)],
                vec![v("Pens"), v("New York"), v(-30)],
                vec![v("Pens"), v("Seattle"), v(-30)],
            ],
        ),
    );
    raw
}

// =============================================================================
// SILLY
// =============================================================================

/// `a` keyed by one field, `b` by three, `c` a keyless row table.
pub fn silly_schema() -> SchemaDescriptor {
    SchemaDescriptor::new()
        .with_table(
            "a",
            TableSchema::new(["aField"], ["aData1", "aData2", "aData3"]),
        )
        .with_table(
            "b",
            TableSchema::new(["bField1", "bField2", "bField3"], ["bData"]),
        )
        .with_table(
            "c",
            TableSchema::new(
                Vec::<String>::new(),
                ["cData1", "cData2", "cData3", "cData4"],
            ),
        )
}

pub fn silly_data() -> RawTables {
    let mut raw = RawTables::new();
    raw.insert(
        "a".into(),
        raw_rows(
            &["aField", "aData1", "aData2", "aData3"],
            vec![
                vec![v(1), v(1), v(2), v(3)],
                vec![v("b"), v("b"), v("d"), v(12)],
                vec![v(0.23), v(11), v(12), v("thirt")],
            ],
        ),
    );
    raw.insert(
        "b".into(),
        raw_rows(
            &["bField1", "bField2", "bField3", "bData"],
            vec![
                vec![v(1), v(2), v("3"), v(1)],
                vec![v("a"), v("b"), v("b"), v(12)],
            ],
        ),
    );
    raw.insert(
        "c".into(),
        raw_rows(
            &["cData1", "cData2", "cData3", "cData4"],
            vec![
                vec![v(1), v("2"), v(3), v(4)],
                vec![v(0.1), v("b"), v("c"), v(5)],
                vec![v(1), v("2"), v(3), v(4)],
                vec![v("a"), v("b"), v("c"), v(4)],
            ],
        ),
    );
    raw
}
