use clickhouse_http::{Conn, Statement, Value};

fn main() -> anyhow::Result<()> {
    let conn = Conn::from_env().map_err(anyhow::Error::msg)?;
    conn.ping()?;

    conn.exec(Statement::new(
        "CREATE TABLE IF NOT EXISTS users (id UInt32, name String) ENGINE = Memory",
        (),
    ))?;

    conn.exec(Statement::new(
        "INSERT INTO users VALUES (?, ?), (?, ?)",
        [Value::from(1u32), Value::text("Kit"), Value::from(2u32), Value::text("Mo")],
    ))?;

    let mut iter = conn.iter(Statement::new(
        "SELECT id, name FROM users WHERE id IN ? ORDER BY id",
        [Value::from(vec![1u32, 2])],
    ));
    println!("{:?}", iter.columns());

    let (mut id, mut name) = (0u32, String::new());
    while iter.scan(&mut [&mut id, &mut name]) {
        println!("{id}\t{name}");
    }
    if let Some(err) = iter.into_error() {
        return Err(err.into());
    }

    Ok(())
}
