use sqlx::SqliteConnection;

use crate::db_types::ShopSession;

pub async fn fetch_offline_session(
    shop: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ShopSession>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT * FROM sessions WHERE shop = $1 AND is_online = FALSE
        ORDER BY expires IS NULL DESC, expires DESC
        LIMIT 1"#,
    )
    .bind(shop)
    .fetch_optional(conn)
    .await
}

pub async fn save_session(session: ShopSession, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO sessions (id, shop, state, is_online, scope, expires, access_token)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (id) DO UPDATE SET
            shop = excluded.shop,
            state = excluded.state,
            is_online = excluded.is_online,
            scope = excluded.scope,
            expires = excluded.expires,
            access_token = excluded.access_token"#,
    )
    .bind(session.id)
    .bind(session.shop)
    .bind(session.state)
    .bind(session.is_online)
    .bind(session.scope)
    .bind(session.expires)
    .bind(session.access_token)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_for_shop(shop: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE shop = $1").bind(shop).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn update_scope(session_id: &str, scope: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE sessions SET scope = $1 WHERE id = $2").bind(scope).bind(session_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
