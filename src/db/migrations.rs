use anyhow::{bail, Context, Result};
use rusqlite::Connection;

/// Schema steps; entry `i` brings `user_version` from `i` to `i + 1`.
const STEPS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn latest() -> i32 {
    STEPS.len() as i32
}

pub fn migrate(conn: &mut Connection) -> Result<()> {
    let current: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read user_version")?;

    if current < 0 {
        bail!("segment store reports invalid schema {current}");
    }
    if current > latest() {
        bail!(
            "segment store is at schema {current}, newer than supported schema {}",
            latest()
        );
    }

    let pending = &STEPS[current as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (offset, sql) in pending.iter().enumerate() {
        let target = current + offset as i32 + 1;
        tx.execute_batch(sql)
            .with_context(|| format!("schema step {target} failed"))?;
    }
    tx.pragma_update(None, "user_version", latest())?;
    tx.commit().context("failed to commit schema upgrade")?;

    Ok(())
}
