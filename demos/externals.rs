use std::io::Cursor;

use clickhouse_http::{Conn, Statement};

fn main() -> anyhow::Result<()> {
    let conn = Conn::from_env().map_err(anyhow::Error::msg)?;

    conn.exec(Statement::new(
        "CREATE TABLE IF NOT EXISTS visits (user_id UInt32, url String) ENGINE = Memory",
        (),
    ))?;

    let rows = "1\t/home\n1\t/docs\n2\t/home\n";
    conn.exec(
        Statement::new("INSERT INTO visits FORMAT TabSeparated", ())
            .with_body(Cursor::new(rows.as_bytes().to_vec())),
    )?;

    let mut iter = conn.iter(
        Statement::new(
            "SELECT user_id, count() FROM visits WHERE user_id IN (SELECT id FROM wanted) GROUP BY user_id",
            (),
        )
        .with_external("wanted", "id UInt32", "1\n"),
    );

    let (mut user_id, mut hits) = (0u32, 0u64);
    while iter.scan(&mut [&mut user_id, &mut hits]) {
        println!("user {user_id}: {hits} visit(s)");
    }
    if let Some(err) = iter.into_error() {
        return Err(err.into());
    }

    Ok(())
}
