use flatdb::ast::{ComparisonOp, Expr, Select, Statement};
use flatdb::*;

fn main() -> Result<()> {
    println!("Flat-file Database Demo\n");

    let dir = std::env::temp_dir().join("flatdb-demo");
    if dir.exists() {
        std::fs::remove_dir_all(&dir)?;
    }
    let mut db = Database::open(&dir)?;
    println!("Opened database in {}", db.data_dir().display());

    db.execute("CREATE TABLE users (id INT PRIMARY KEY, name TEXT, age INT)")?;
    db.execute("CREATE TABLE orders (id INT PRIMARY KEY, uid INT, item TEXT)")?;
    println!("Created tables {:?}", db.list_tables());

    println!("Inserting data...");
    db.execute("INSERT INTO users VALUES (1, 'Alice', 30)")?;
    db.execute("INSERT INTO users (id, name) VALUES (2, 'Bob')")?; // Bob's age is unknown
    db.execute("INSERT INTO users VALUES (3, 'Charlie', 25)")?;
    db.execute("INSERT INTO orders VALUES (10, 1, 'Laptop')")?;
    db.execute("INSERT INTO orders VALUES (11, 3, 'Mouse')")?;
    db.execute("INSERT INTO orders VALUES (12, 1, 'Screen')")?;

    if let Err(e) = db.execute("INSERT INTO users VALUES (1, 'Eve', 40)") {
        println!("Rejected duplicate key: {e}");
    }

    println!("\n{:<5} {:<10} {:<5}", "ID", "NAME", "AGE");
    println!("{}", "-".repeat(25));

    let result = db.query("SELECT id, name, age FROM users ORDER BY age DESC")?;
    for row in &result.rows {
        let cell = |column: &str| {
            row.get(column)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "NULL".into())
        };
        println!("{:<5} {:<10} {:<5}", cell("id"), cell("name"), cell("age"));
    }

    println!("\nOrders with their buyer:");
    let result = db.query(
        "SELECT item, u.name FROM orders INNER JOIN users u ON uid = u.id ORDER BY item",
    )?;
    for row in &result.rows {
        println!("  {row}");
    }

    // Lookup by id without going through SQL text.
    let by_id = Select::all_from("users").with_where(Expr::compare("id", ComparisonOp::Eq, 3i64));
    if let Outcome::Rows(result) = db.run(Statement::Select(by_id))? {
        println!("\nUser 3: {}", result.rows[0]);
    }

    db.execute("UPDATE users SET age = 31 WHERE name = 'Alice'")?;
    db.execute("DELETE FROM orders WHERE id = 11")?;

    let reopened = Database::open(&dir)?;
    let result = reopened.query("SELECT * FROM orders")?;
    println!("\nAfter reopening, {} order(s) remain", result.rows.len());

    Ok(())
}
