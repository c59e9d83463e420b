use super::storage;
use crate::api::handlers::error::ApiError;
use crate::test_support::PostgresContainer;
use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

struct TestContext {
    _postgres: PostgresContainer,
    pool: PgPool,
}

impl TestContext {
    async fn new() -> Result<Self> {
        let postgres = match PostgresContainer::start().await {
            Ok(postgres) => postgres,
            Err(err) => {
                eprintln!("Skipping integration test: {err}");
                return Err(err);
            }
        };
        postgres.apply_schema().await?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&postgres.dsn())
            .await
            .context("failed to connect test pool")?;

        Ok(Self {
            _postgres: postgres,
            pool,
        })
    }
}

async fn insert_user(pool: &PgPool, username: &str) -> Result<Uuid> {
    let user_id = Uuid::new_v4();
    let query = r"
        INSERT INTO users (id, username, email, password_hash)
        VALUES ($1, $2, $3, 'argon2-hash-placeholder')
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(username)
        .bind(format!("{username}@example.com"))
        .execute(pool)
        .await
        .context("insert user")?;
    Ok(user_id)
}

async fn insert_list(pool: &PgPool, creator_id: Uuid) -> Result<Uuid> {
    let list_id = Uuid::new_v4();
    sqlx::query("INSERT INTO lists (id, name, creator_id) VALUES ($1, 'Groceries', $2)")
        .bind(list_id)
        .bind(creator_id)
        .execute(pool)
        .await
        .context("insert list")?;
    sqlx::query("INSERT INTO list_members (list_id, user_id, role) VALUES ($1, $2, 'CREATOR')")
        .bind(list_id)
        .bind(creator_id)
        .execute(pool)
        .await
        .context("insert creator membership")?;
    Ok(list_id)
}

async fn invite_token(
    pool: &PgPool,
    list_id: Uuid,
    creator_id: Uuid,
    max_uses: Option<i32>,
) -> Result<Uuid> {
    let invite = storage::create_invite(pool, list_id, creator_id, 24, max_uses)
        .await
        .map_err(|err| anyhow::anyhow!("create invite: {err:?}"))?;
    Uuid::parse_str(&invite.token).context("parse invite token")
}

#[tokio::test]
async fn racing_accepts_honor_the_usage_cap() -> Result<()> {
    let Ok(ctx) = TestContext::new().await else {
        return Ok(());
    };

    let creator = insert_user(&ctx.pool, "alice").await?;
    let list_id = insert_list(&ctx.pool, creator).await?;
    let token = invite_token(&ctx.pool, list_id, creator, Some(1)).await?;

    let bob = insert_user(&ctx.pool, "bob").await?;
    let carol = insert_user(&ctx.pool, "carol").await?;

    let (first, second) = tokio::join!(
        storage::accept_invite(&ctx.pool, token, bob),
        storage::accept_invite(&ctx.pool, token, carol),
    );

    // Exactly one of the two racing accepts wins the single slot.
    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(ApiError::Gone("Invite has reached its usage limit"))
    )));

    let row: (i32, i64) = sqlx::query_as(
        r"
        SELECT i.used_count,
            (SELECT COUNT(*) FROM list_members m WHERE m.list_id = i.list_id)
        FROM invites i WHERE i.token = $1
        ",
    )
    .bind(token)
    .fetch_one(&ctx.pool)
    .await?;
    assert_eq!(row.0, 1);
    assert_eq!(row.1, 2);

    Ok(())
}

#[tokio::test]
async fn accepting_the_same_list_twice_is_a_conflict() -> Result<()> {
    let Ok(ctx) = TestContext::new().await else {
        return Ok(());
    };

    let creator = insert_user(&ctx.pool, "alice").await?;
    let list_id = insert_list(&ctx.pool, creator).await?;
    let token = invite_token(&ctx.pool, list_id, creator, None).await?;

    let bob = insert_user(&ctx.pool, "bob").await?;
    assert!(storage::accept_invite(&ctx.pool, token, bob).await.is_ok());

    let err = storage::accept_invite(&ctx.pool, token, bob)
        .await
        .expect_err("second accept by the same user");
    assert!(matches!(
        err,
        ApiError::Conflict("You are already a member of this list")
    ));

    Ok(())
}
