use std::env::args;

use anyhow::{Context, Result};
use flatdb::{Cell, ColumnType, Database};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = args().nth(1).context("usage: flatdb <path>")?;
    let db = Database::open(&path).context("failed to open database")?;

    if db.select("crashes", &["*".to_owned()], &flatdb::AcceptAll).is_err() {
        db.create_table(
            "crashes",
            &[
                ("id".to_owned(), ColumnType::Int),
                ("severity".to_owned(), ColumnType::Int),
                ("borough".to_owned(), ColumnType::Str),
            ],
        )
        .context("failed to create the demo table")?;
    }

    db.insert(
        "crashes",
        &[Cell::Int(1), Cell::Int(3), Cell::Str("brooklyn".into())],
    )?;

    let (columns, rows) = db.select("crashes", &["*".to_owned()], &flatdb::AcceptAll)?;
    dbg!(&columns);
    for row in rows.iter().take(5) {
        dbg!(row);
    }

    Ok(())
}
