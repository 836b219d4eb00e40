// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashMap};

use canvas_core::{Block, BlockId, BlockPatch, NewBlock, UserId, timestamp};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Sqlite, query, query_as};
use tracing::trace;

use crate::blocks::{BlockStore, WritableBlockStore};
use crate::sqlite::{DecodeError, SqliteError, SqliteStore};

/// A single block row as it is inserted in the database.
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
struct BlockRow {
    id: i64,
    creator_id: i64,
    access_type: String,
    children_position: Option<String>,
    class_list: Option<String>,
    content_class_list: Option<String>,
    layout: String,
    color: Option<String>,
    text: Option<String>,
    properties: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<BlockRow> for Block {
    type Error = SqliteError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        Ok(Block {
            id: BlockId::new(row.id),
            creator_id: UserId::new(row.creator_id),
            access_type: row
                .access_type
                .parse()
                .map_err(|err| SqliteError::Decode("access_type".into(), DecodeError::from(err)))?,
            visible_user_ids: BTreeSet::new(),
            editable_user_ids: BTreeSet::new(),
            children: Vec::new(),
            children_position: row.children_position,
            class_list: row.class_list,
            content_class_list: row.content_class_list,
            layout: row
                .layout
                .parse()
                .map_err(|err| SqliteError::Decode("layout".into(), DecodeError::from(err)))?,
            color: row.color,
            text: row.text,
            properties: row.properties,
            created_at: decode_timestamp("created_at", row.created_at)?,
            updated_at: decode_timestamp("updated_at", row.updated_at)?,
        })
    }
}

fn decode_timestamp(field: &str, value: i64) -> Result<u64, SqliteError> {
    u64::try_from(value)
        .map_err(|_| SqliteError::Decode(field.into(), DecodeError::OutOfRange(value)))
}

fn encode_timestamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Upper bound of ids bound in one `IN (...)` clause, below SQLite's limit of host parameters.
const MAX_IDS_PER_QUERY: usize = 10_000;

/// Start a query ending with an `IN (...)` clause binding all given ids.
fn in_clause<'a>(sql: &str, ids: &'a [i64], suffix: &str) -> QueryBuilder<'a, Sqlite> {
    let mut builder = QueryBuilder::new(sql);
    builder.push(" IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
    builder.push(suffix);
    builder
}

/// Run a query ending with an `IN (...)` clause over all given ids.
///
/// Ids are split into chunks of at most [`MAX_IDS_PER_QUERY`], the rows of all chunks are returned
/// in chunk order.
async fn fetch_in<T>(
    conn: &mut SqliteConnection,
    sql: &str,
    ids: &[i64],
    suffix: &str,
) -> Result<Vec<T>, SqliteError>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    let mut rows = Vec::new();
    for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
        let mut chunk_rows: Vec<T> = in_clause(sql, chunk, suffix)
            .build_query_as()
            .fetch_all(&mut *conn)
            .await?;
        rows.append(&mut chunk_rows);
    }
    Ok(rows)
}

/// Load all given blocks including their grants and outgoing edges.
///
/// Blocks which do not exist are missing in the result.
async fn load_blocks(
    conn: &mut SqliteConnection,
    ids: &[i64],
) -> Result<HashMap<BlockId, Block>, SqliteError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<BlockRow> = fetch_in(
        &mut *conn,
        "
        SELECT
            id,
            creator_id,
            access_type,
            children_position,
            class_list,
            content_class_list,
            layout,
            color,
            text,
            properties,
            created_at,
            updated_at
        FROM
            blocks_v1
        WHERE
            id
        ",
        ids,
        "",
    )
    .await?;

    let mut blocks = HashMap::with_capacity(rows.len());
    for row in rows {
        let block = Block::try_from(row)?;
        blocks.insert(block.id, block);
    }

    let edges: Vec<(i64, i64)> = fetch_in(
        &mut *conn,
        "
        SELECT
            from_block_id,
            to_block_id
        FROM
            block_children_v1
        WHERE
            from_block_id
        ",
        ids,
        "
        ORDER BY
            from_block_id,
            position
        ",
    )
    .await?;

    for (from, to) in edges {
        if let Some(block) = blocks.get_mut(&BlockId::new(from)) {
            block.children.push(BlockId::new(to));
        }
    }

    let visible: Vec<(i64, i64)> = fetch_in(
        &mut *conn,
        "
        SELECT
            block_id,
            user_id
        FROM
            block_visible_to_users_v1
        WHERE
            block_id
        ",
        ids,
        "",
    )
    .await?;

    for (block_id, user_id) in visible {
        if let Some(block) = blocks.get_mut(&BlockId::new(block_id)) {
            block.visible_user_ids.insert(UserId::new(user_id));
        }
    }

    let editable: Vec<(i64, i64)> = fetch_in(
        &mut *conn,
        "
        SELECT
            block_id,
            user_id
        FROM
            block_editable_by_users_v1
        WHERE
            block_id
        ",
        ids,
        "",
    )
    .await?;

    for (block_id, user_id) in editable {
        if let Some(block) = blocks.get_mut(&BlockId::new(block_id)) {
            block.editable_user_ids.insert(UserId::new(user_id));
        }
    }

    Ok(blocks)
}

async fn insert_grant(
    conn: &mut SqliteConnection,
    table: &str,
    id: &BlockId,
    user: &UserId,
) -> Result<bool, SqliteError> {
    // Ignore insertion when grant already exists (PRIMARY KEY constraint) or the block is gone.
    let sql = format!(
        "
        INSERT OR IGNORE
        INTO
            {table} (
                block_id,
                user_id
            )
        SELECT
            ?, ?
        WHERE
            EXISTS (SELECT 1 FROM blocks_v1 WHERE id = ?)
        "
    );

    let result = query(&sql)
        .bind(id.as_i64())
        .bind(user.as_i64())
        .bind(id.as_i64())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

impl BlockStore for SqliteStore {
    type Error = SqliteError;

    async fn get_block(&self, id: &BlockId) -> Result<Option<Block>, SqliteError> {
        let mut conn = self.pool.acquire().await?;
        let mut blocks = load_blocks(&mut conn, &[id.as_i64()]).await?;
        Ok(blocks.remove(id))
    }

    async fn fetch_children_batch(
        &self,
        ids: &[BlockId],
    ) -> Result<HashMap<BlockId, Vec<Block>>, SqliteError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.pool.acquire().await?;
        let ids: Vec<i64> = ids.iter().map(BlockId::as_i64).collect();

        let parents: Vec<(i64,)> = fetch_in(
            &mut *conn,
            "
            SELECT
                id
            FROM
                blocks_v1
            WHERE
                id
            ",
            &ids,
            "",
        )
        .await?;

        let edges: Vec<(i64, i64)> = fetch_in(
            &mut *conn,
            "
            SELECT
                from_block_id,
                to_block_id
            FROM
                block_children_v1
            WHERE
                from_block_id
            ",
            &ids,
            "
            ORDER BY
                from_block_id,
                position
            ",
        )
        .await?;

        let child_ids: Vec<i64> = edges
            .iter()
            .map(|(_, to)| *to)
            .collect::<BTreeSet<i64>>()
            .into_iter()
            .collect();
        let children = load_blocks(&mut conn, &child_ids).await?;

        let mut result: HashMap<BlockId, Vec<Block>> = parents
            .into_iter()
            .map(|(id,)| (BlockId::new(id), Vec::new()))
            .collect();

        for (from, to) in edges {
            let Some(siblings) = result.get_mut(&BlockId::new(from)) else {
                continue;
            };
            match children.get(&BlockId::new(to)) {
                Some(child) => siblings.push(child.clone()),
                None => trace!(parent = from, child = to, "skip edge to missing block"),
            }
        }

        Ok(result)
    }

    async fn root_block_of(&self, user: &UserId) -> Result<Option<BlockId>, SqliteError> {
        let row: Option<(i64,)> = query_as(
            "
            SELECT
                id
            FROM
                blocks_v1
            WHERE
                creator_id = ?
            ORDER BY
                id
            LIMIT 1
            ",
        )
        .bind(user.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| BlockId::new(id)))
    }

    async fn parent_count(&self, id: &BlockId) -> Result<usize, SqliteError> {
        let (count,): (i64,) = query_as(
            "
            SELECT
                COUNT(*)
            FROM
                block_children_v1
            WHERE
                to_block_id = ?
            ",
        )
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await?;

        usize::try_from(count)
            .map_err(|_| SqliteError::Decode("parent_count".into(), DecodeError::OutOfRange(count)))
    }
}

impl WritableBlockStore for SqliteStore {
    async fn insert_block(&self, creator: &UserId, new: NewBlock) -> Result<Block, SqliteError> {
        let now = timestamp::now();
        let mut tx = self.pool.begin().await?;

        let result = query(
            "
            INSERT INTO
                blocks_v1 (
                    creator_id,
                    access_type,
                    children_position,
                    class_list,
                    content_class_list,
                    layout,
                    color,
                    text,
                    properties,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(creator.as_i64())
        .bind(new.access_type.as_str())
        .bind(&new.children_position)
        .bind(&new.class_list)
        .bind(&new.content_class_list)
        .bind(new.layout.as_str())
        .bind(&new.color)
        .bind(&new.text)
        .bind(&new.properties)
        .bind(encode_timestamp(now))
        .bind(encode_timestamp(now))
        .execute(&mut *tx)
        .await?;

        let id = BlockId::new(result.last_insert_rowid());

        insert_grant(&mut tx, "block_visible_to_users_v1", &id, creator).await?;
        insert_grant(&mut tx, "block_editable_by_users_v1", &id, creator).await?;

        tx.commit().await?;

        Ok(Block::from_new(id, *creator, new, now))
    }

    async fn update_block(
        &self,
        id: &BlockId,
        patch: BlockPatch,
    ) -> Result<Option<Block>, SqliteError> {
        let mut tx = self.pool.begin().await?;

        let Some(mut block) = load_blocks(&mut tx, &[id.as_i64()]).await?.remove(id) else {
            return Ok(None);
        };
        let children_changed = patch.children.is_some();
        block.apply(patch, timestamp::now());

        query(
            "
            UPDATE
                blocks_v1
            SET
                access_type = ?,
                children_position = ?,
                class_list = ?,
                content_class_list = ?,
                layout = ?,
                color = ?,
                text = ?,
                properties = ?,
                updated_at = ?
            WHERE
                id = ?
            ",
        )
        .bind(block.access_type.as_str())
        .bind(&block.children_position)
        .bind(&block.class_list)
        .bind(&block.content_class_list)
        .bind(block.layout.as_str())
        .bind(&block.color)
        .bind(&block.text)
        .bind(&block.properties)
        .bind(encode_timestamp(block.updated_at))
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await?;

        if children_changed {
            query("DELETE FROM block_children_v1 WHERE from_block_id = ?")
                .bind(id.as_i64())
                .execute(&mut *tx)
                .await?;

            for (position, child) in block.children.iter().enumerate() {
                // Edges to blocks which don't exist are dropped.
                query(
                    "
                    INSERT OR IGNORE
                    INTO
                        block_children_v1 (
                            from_block_id,
                            to_block_id,
                            position
                        )
                    SELECT
                        ?, id, ?
                    FROM
                        blocks_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(id.as_i64())
                .bind(position as i64)
                .bind(child.as_i64())
                .execute(&mut *tx)
                .await?;
            }
        }

        let block = load_blocks(&mut tx, &[id.as_i64()]).await?.remove(id);
        tx.commit().await?;

        Ok(block)
    }

    async fn add_child(&self, parent: &BlockId, child: &BlockId) -> Result<bool, SqliteError> {
        let mut tx = self.pool.begin().await?;

        // Ignore insertion when edge already exists (PRIMARY KEY constraint) or one of both
        // blocks is missing.
        let result = query(
            "
            INSERT OR IGNORE
            INTO
                block_children_v1 (
                    from_block_id,
                    to_block_id,
                    position
                )
            SELECT
                ?,
                ?,
                (
                    SELECT
                        COALESCE(MAX(position), -1) + 1
                    FROM
                        block_children_v1
                    WHERE
                        from_block_id = ?
                )
            WHERE
                EXISTS (SELECT 1 FROM blocks_v1 WHERE id = ?)
                AND EXISTS (SELECT 1 FROM blocks_v1 WHERE id = ?)
            ",
        )
        .bind(parent.as_i64())
        .bind(child.as_i64())
        .bind(parent.as_i64())
        .bind(parent.as_i64())
        .bind(child.as_i64())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_child(&self, parent: &BlockId, child: &BlockId) -> Result<bool, SqliteError> {
        let result = query(
            "
            DELETE FROM
                block_children_v1
            WHERE
                from_block_id = ?
                AND to_block_id = ?
            ",
        )
        .bind(parent.as_i64())
        .bind(child.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn grant_visible(&self, id: &BlockId, user: &UserId) -> Result<bool, SqliteError> {
        let mut conn = self.pool.acquire().await?;
        insert_grant(&mut conn, "block_visible_to_users_v1", id, user).await
    }

    async fn grant_editable(&self, id: &BlockId, user: &UserId) -> Result<bool, SqliteError> {
        let mut conn = self.pool.acquire().await?;
        insert_grant(&mut conn, "block_editable_by_users_v1", id, user).await
    }

    async fn delete_block(&self, id: &BlockId) -> Result<bool, SqliteError> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM block_children_v1 WHERE from_block_id = ? OR to_block_id = ?")
            .bind(id.as_i64())
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        query("DELETE FROM block_visible_to_users_v1 WHERE block_id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        query("DELETE FROM block_editable_by_users_v1 WHERE block_id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        let result = query("DELETE FROM blocks_v1 WHERE id = ?")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}
