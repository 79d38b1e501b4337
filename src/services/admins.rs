use sqlx::PgPool;

use crate::{
    error::{ApiError, ApiResult},
    middleware::auth::issue_access_token,
    models::admin::{
        AdminProfile, AdminRole, AdminUser, CreateAdminRequest, DashboardStats, LoginResponse,
        UpdateAdminRequest,
    },
    services::metrics::LOGINS_COUNTER,
};

pub const BCRYPT_COST: u32 = 12;

pub struct AdminService;

impl AdminService {
    pub async fn login(
        pool: &PgPool,
        email: &str,
        password: &str,
        jwt_secret: &str,
        ttl_hours: i64,
    ) -> ApiResult<LoginResponse> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT * FROM admin_users WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        // Same message for unknown email, wrong password and inactive account
        let invalid = || ApiError::Unauthorized("Invalid credentials".into());

        let Some(admin) = admin.filter(|a| a.active) else {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            return Err(invalid());
        };
        if !bcrypt::verify(password, &admin.password_hash).unwrap_or(false) {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            tracing::info!("failed admin login for {}", admin.email);
            return Err(invalid());
        }

        let role: AdminRole = admin.role.parse()?;
        let token = issue_access_token(admin.id, &admin.email, role, jwt_secret, ttl_hours)?;
        LOGINS_COUNTER.with_label_values(&["success"]).inc();
        tracing::info!("admin {} logged in", admin.email);

        Ok(LoginResponse { token, admin: admin.into() })
    }

    pub async fn list(pool: &PgPool) -> anyhow::Result<Vec<AdminProfile>> {
        let admins = sqlx::query_as::<_, AdminUser>("SELECT * FROM admin_users ORDER BY created_at, id")
            .fetch_all(pool)
            .await?;
        Ok(admins.into_iter().map(AdminProfile::from).collect())
    }

    async fn email_taken(pool: &PgPool, email: &str, except_id: Option<i64>) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM admin_users
                WHERE LOWER(email) = LOWER($1) AND ($2::bigint IS NULL OR id <> $2)
             )",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(pool: &PgPool, req: &CreateAdminRequest) -> ApiResult<AdminProfile> {
        let email = req.email.trim().to_lowercase();
        if Self::email_taken(pool, &email, None).await? {
            return Err(ApiError::Conflict("An admin with this email already exists".into()));
        }

        let password_hash = bcrypt::hash(&req.password, BCRYPT_COST).map_err(anyhow::Error::from)?;
        let role = req.role.unwrap_or(AdminRole::Moderator);

        let admin = sqlx::query_as::<_, AdminUser>(
            "INSERT INTO admin_users (email, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(&req.name)
        .bind(role.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!("created {} account {}", role, admin.email);
        Ok(admin.into())
    }

    /// An admin cannot deactivate their own account.
    pub async fn update(
        pool: &PgPool,
        actor_id: i64,
        id: i64,
        req: &UpdateAdminRequest,
    ) -> ApiResult<AdminProfile> {
        if id == actor_id && req.active == Some(false) {
            return Err(ApiError::BadRequest("You cannot deactivate your own account".into()));
        }

        let email = req.email.as_deref().map(|e| e.trim().to_lowercase());
        if let Some(email) = email.as_deref() {
            if Self::email_taken(pool, email, Some(id)).await? {
                return Err(ApiError::Conflict("An admin with this email already exists".into()));
            }
        }

        let password_hash = match req.password.as_deref() {
            Some(p) => Some(bcrypt::hash(p, BCRYPT_COST).map_err(anyhow::Error::from)?),
            None => None,
        };

        let admin = sqlx::query_as::<_, AdminUser>(
            "UPDATE admin_users
             SET email         = COALESCE($1, email),
                 password_hash = COALESCE($2, password_hash),
                 name          = COALESCE($3, name),
                 role          = COALESCE($4, role),
                 active        = COALESCE($5, active),
                 updated_at    = NOW()
             WHERE id = $6
             RETURNING *",
        )
        .bind(email)
        .bind(password_hash)
        .bind(&req.name)
        .bind(req.role.map(|r| r.to_string()))
        .bind(req.active)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Admin not found".into()))?;

        Ok(admin.into())
    }

    pub async fn delete(pool: &PgPool, actor_id: i64, id: i64) -> ApiResult<()> {
        if id == actor_id {
            return Err(ApiError::BadRequest("You cannot delete your own account".into()));
        }
        let result = sqlx::query("DELETE FROM admin_users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Admin not found".into()));
        }
        Ok(())
    }

    /// Creates the account or resets its password, role and active flag.
    pub async fn upsert(
        pool: &PgPool,
        email: &str,
        password: &str,
        name: Option<&str>,
        role: AdminRole,
    ) -> anyhow::Result<AdminProfile> {
        let password_hash = bcrypt::hash(password, BCRYPT_COST)?;
        let admin = sqlx::query_as::<_, AdminUser>(
            "INSERT INTO admin_users (email, password_hash, name, role, active)
             VALUES (LOWER($1), $2, $3, $4, TRUE)
             ON CONFLICT (email) DO UPDATE
             SET password_hash = EXCLUDED.password_hash,
                 name          = COALESCE(EXCLUDED.name, admin_users.name),
                 role          = EXCLUDED.role,
                 active        = TRUE,
                 updated_at    = NOW()
             RETURNING *",
        )
        .bind(email.trim())
        .bind(&password_hash)
        .bind(name)
        .bind(role.to_string())
        .fetch_one(pool)
        .await?;
        Ok(admin.into())
    }

    pub async fn stats(pool: &PgPool) -> anyhow::Result<DashboardStats> {
        let stats = sqlx::query_as::<_, DashboardStats>(
            "SELECT
                (SELECT COUNT(*) FROM preschools)                            AS preschools,
                (SELECT COUNT(*) FROM preschools WHERE verified_status)      AS verified_preschools,
                (SELECT COUNT(*) FROM reviews)                               AS reviews,
                (SELECT COUNT(*) FROM reviews WHERE NOT verified)            AS pending_reviews,
                (SELECT COUNT(*) FROM comparison_history)                    AS comparisons,
                (SELECT COUNT(*) FROM admin_users WHERE active)              AS admins",
        )
        .fetch_one(pool)
        .await?;
        Ok(stats)
    }

    pub async fn bulk_delete_comparisons(pool: &PgPool, ids: &[i64]) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM comparison_history WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
