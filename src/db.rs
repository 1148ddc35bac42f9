use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};
use crate::mapper::{self, Row};
use crate::models::{
    AdminUser, AdminUserPatch, Category, CategoryPatch, Feedback, Link, LinkPatch, RegisteredUser,
    Skill, SkillPatch, SkillStatus,
};
use crate::store::{
    search_term, CatalogStore, CategoryQuery, LinkQuery, SkillPage, SkillQuery, StatusCounts,
    UserQuery,
};
use async_trait::async_trait;
use deadpool_postgres::{Config, Object, Pool, Runtime, Timeouts};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use serde_json::Value;
use tokio_postgres::types::ToSql;
use tracing::{error, info, warn};

const SKILLS_TABLE: &str = "skills";
const CATEGORIES_TABLE: &str = "categories";
const ADMIN_USERS_TABLE: &str = "admin_users";
const REGISTERED_USERS_TABLE: &str = "users";
const LINKS_TABLE: &str = "link_exchange";
const FEEDBACK_TABLE: &str = "feedback";

/// ホスト型 PostgreSQL を相手にする `CatalogStore` 実装。
/// 行は `to_jsonb(t.*)` で JSON として読み出し、列名の揺れは `mapper` が吸収する。
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// 接続プールを構築する。プール生成時点ではまだ接続しないので、
    /// DB が落ちていても起動は続けられる (疎通確認は `health_check`)。
    pub fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        info!(
            "Creating PostgreSQL connection pool for host: {}:{}",
            config.host, config.port
        );

        let pool = Self::create_pool(config)?;
        Ok(Database { pool })
    }

    /// Deadpool 用の `Config` を組み立ててプールを生成する内部関数。
    /// 接続待ち・生成・リサイクルすべてに同じタイムアウトを掛け、
    /// DB 障害時にリクエストがぶら下がらないようにしている。
    fn create_pool(config: &DatabaseConfig) -> StoreResult<Pool> {
        let mut pg_config = Config::new();

        pg_config.host = Some(config.host.clone());
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database.clone());
        pg_config.user = Some(config.username.clone());
        pg_config.password = Some(config.password.clone());
        pg_config.connect_timeout = Some(config.connection_timeout);

        match config.ssl_mode.as_str() {
            "disable" => {
                pg_config.ssl_mode = Some(deadpool_postgres::SslMode::Disable);
            }
            "allow" | "prefer" => {
                pg_config.ssl_mode = Some(deadpool_postgres::SslMode::Prefer);
            }
            "require" | "verify-ca" | "verify-full" => {
                pg_config.ssl_mode = Some(deadpool_postgres::SslMode::Require);
            }
            _ => {
                warn!("Unknown SSL mode '{}', defaulting to 'require'", config.ssl_mode);
                pg_config.ssl_mode = Some(deadpool_postgres::SslMode::Require);
            }
        }

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(config.max_connections as usize);
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(config.connection_timeout);
        timeouts.create = Some(config.connection_timeout);
        timeouts.recycle = Some(config.connection_timeout);
        pool_config.timeouts = timeouts;
        pg_config.pool = Some(pool_config);

        let tls_connector = TlsConnector::builder().build().map_err(|e| {
            error!("Failed to create TLS connector: {}", e);
            StoreError::Backend(format!("TLS connector creation failed: {}", e))
        })?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config
            .create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                StoreError::Backend(format!("Connection pool creation failed: {}", e))
            })
    }

    /// プールから接続を借りる小さなラッパー。
    /// `PoolError` は `StoreError::Unavailable` などに分類される。
    async fn get_connection(&self) -> StoreResult<Object> {
        Ok(self.pool.get().await?)
    }

    /// `SELECT 1` を投げて DB が生きているか確認する。
    pub async fn health_check(&self) -> StoreResult<()> {
        let client = self.get_connection().await?;

        client.execute("SELECT 1", &[]).await.map_err(|e| {
            error!("Database health check failed: {}", e);
            StoreError::from(e)
        })?;

        info!("Database health check successful");
        Ok(())
    }

    /// アプリ起動時にテーブル群を CREATE する簡易マイグレーター。
    /// `DATABASE_AUTO_MIGRATE=true` のときだけ呼ばれる。既存テーブルには触れない。
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations");

        let client = self.get_connection().await?;

        let statements: [(&str, &str); 11] = [
            ("uuid extension", r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#),
            (
                "categories table",
                r#"
                CREATE TABLE IF NOT EXISTS categories (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    name VARCHAR(100) NOT NULL,
                    name_en VARCHAR(100),
                    slug VARCHAR(100) UNIQUE NOT NULL,
                    description TEXT,
                    description_en TEXT,
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    sort_order INTEGER NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "users table",
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    github_id VARCHAR(64) UNIQUE,
                    username VARCHAR(255) NOT NULL,
                    email VARCHAR(255),
                    avatar_url TEXT,
                    github_url TEXT,
                    role VARCHAR(20) NOT NULL DEFAULT 'normal',
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "skills table",
                r#"
                CREATE TABLE IF NOT EXISTS skills (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    name VARCHAR(200) NOT NULL,
                    title_en VARCHAR(200),
                    description TEXT,
                    description_en TEXT,
                    content TEXT NOT NULL DEFAULT '',
                    content_en TEXT,
                    category_id UUID REFERENCES categories(id) ON DELETE SET NULL,
                    author_id UUID REFERENCES users(id) ON DELETE SET NULL,
                    author_name VARCHAR(255),
                    difficulty_level VARCHAR(20) NOT NULL DEFAULT 'beginner',
                    estimated_time INTEGER,
                    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
                    prerequisites JSONB NOT NULL DEFAULT '[]'::jsonb,
                    status VARCHAR(20) NOT NULL DEFAULT 'draft',
                    featured BOOLEAN NOT NULL DEFAULT FALSE,
                    recommended BOOLEAN NOT NULL DEFAULT FALSE,
                    repo_url TEXT,
                    install_command TEXT,
                    view_count BIGINT NOT NULL DEFAULT 0,
                    like_count BIGINT NOT NULL DEFAULT 0,
                    download_count BIGINT NOT NULL DEFAULT 0,
                    published_at TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "skills status index",
                "CREATE INDEX IF NOT EXISTS idx_skills_status_created_at ON skills(status, created_at DESC)",
            ),
            (
                "skills category index",
                "CREATE INDEX IF NOT EXISTS idx_skills_category_id ON skills(category_id)",
            ),
            (
                "admin_users table",
                r#"
                CREATE TABLE IF NOT EXISTS admin_users (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    username VARCHAR(100) UNIQUE NOT NULL,
                    email VARCHAR(255) UNIQUE NOT NULL,
                    password_hash TEXT,
                    role VARCHAR(20) NOT NULL DEFAULT 'admin',
                    is_active BOOLEAN NOT NULL DEFAULT TRUE,
                    last_login_at TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "link_exchange table",
                r#"
                CREATE TABLE IF NOT EXISTS link_exchange (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    name VARCHAR(100) NOT NULL,
                    url TEXT NOT NULL,
                    description TEXT,
                    logo_url TEXT,
                    enabled BOOLEAN NOT NULL DEFAULT TRUE,
                    sort_order INTEGER NOT NULL DEFAULT 0,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "link_exchange order index",
                "CREATE INDEX IF NOT EXISTS idx_link_exchange_sort_order ON link_exchange(sort_order, created_at DESC)",
            ),
            (
                "feedback table",
                r#"
                CREATE TABLE IF NOT EXISTS feedback (
                    id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                    content TEXT NOT NULL,
                    contact VARCHAR(200),
                    page_url TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
            ),
            (
                "feedback created_at index",
                "CREATE INDEX IF NOT EXISTS idx_feedback_created_at ON feedback(created_at DESC)",
            ),
        ];

        for (name, sql) in statements {
            client.execute(sql, &[]).await.map_err(|e| {
                error!("Migration step '{}' failed: {}", name, e);
                StoreError::from(e)
            })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    // Generic row helpers

    async fn select_rows(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> StoreResult<Vec<Value>> {
        let client = self.get_connection().await?;
        let rows = client.query(sql, params).await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in &rows {
            values.push(row.try_get::<_, Value>(0)?);
        }
        Ok(values)
    }

    async fn select_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> StoreResult<Option<Value>> {
        let client = self.get_connection().await?;
        match client.query_opt(sql, params).await? {
            Some(row) => Ok(Some(row.try_get::<_, Value>(0)?)),
            None => Ok(None),
        }
    }

    async fn count(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> StoreResult<u64> {
        let client = self.get_connection().await?;
        let row = client.query_one(sql, params).await?;
        let total: i64 = row.try_get(0)?;
        Ok(total.max(0) as u64)
    }

    async fn insert_row(&self, table: &str, columns: Row) -> StoreResult<Value> {
        let sql = insert_sql(table, &columns);
        let payload = Value::Object(columns);
        self.select_one(&sql, &[&payload])
            .await?
            .ok_or_else(|| StoreError::Backend(format!("INSERT into {} returned no row", table)))
    }

    /// `None` のときは対象 ID が存在しない。
    async fn update_row(&self, table: &str, id: &str, columns: Row) -> StoreResult<Option<Value>> {
        let sql = update_sql(table, &columns);
        let payload = Value::Object(columns);
        self.select_one(&sql, &[&payload, &id]).await
    }

    async fn delete_row(&self, table: &str, id: &str, resource: &str) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} AS t WHERE t.id::text = $1 RETURNING t.id::text",
            table
        );
        let client = self.get_connection().await?;
        match client.query_opt(&sql, &[&id]).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(resource)),
        }
    }
}

/// Positional parameters plus `WHERE` fragments, built up one filter at a time.
#[derive(Default)]
struct QueryBuilder {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl QueryBuilder {
    /// Register a parameter and return its placeholder.
    fn bind(&mut self, value: impl ToSql + Sync + Send + 'static) -> String {
        self.params.push(Box::new(value));
        format!("${}", self.params.len())
    }

    fn filter(&mut self, clause: String) {
        self.clauses.push(clause);
    }

    /// `column ILIKE '%q%'` over each column, OR-ed together.
    fn search(&mut self, columns: &[String], q: &Option<String>) {
        if let Some(term) = search_term(q) {
            let placeholder = self.bind(like_pattern(&term));
            let ors: Vec<String> = columns
                .iter()
                .map(|column| format!("{} ILIKE {}", column, placeholder))
                .collect();
            self.filter(format!("({})", ors.join(" OR ")));
        }
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Text value of a column read through `to_jsonb`, so a missing column is
/// simply NULL instead of a query error.
fn field(column: &str) -> String {
    format!("(to_jsonb(t.*)->>'{}')", column)
}

fn skill_title_field() -> String {
    format!("COALESCE({}, {})", field("title"), field("name"))
}

fn skill_git_url_field() -> String {
    format!(
        "COALESCE({}, {}, {})",
        field("git_url"),
        field("repo_url"),
        field("github_url")
    )
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn column_list(columns: &Row) -> String {
    columns
        .keys()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `jsonb_populate_record` casts each JSON field to the column's real type.
fn insert_sql(table: &str, columns: &Row) -> String {
    let list = column_list(columns);
    format!(
        "INSERT INTO {table} AS t ({list}) SELECT {list} FROM jsonb_populate_record(NULL::{table}, $1::jsonb) RETURNING to_jsonb(t.*)",
        table = table,
        list = list
    )
}

fn update_sql(table: &str, columns: &Row) -> String {
    let list = column_list(columns);
    format!(
        "UPDATE {table} AS t SET ({list}) = (SELECT {list} FROM jsonb_populate_record(NULL::{table}, $1::jsonb)) WHERE t.id::text = $2 RETURNING to_jsonb(t.*)",
        table = table,
        list = list
    )
}

fn skill_filters(query: &SkillQuery) -> QueryBuilder {
    let mut qb = QueryBuilder::default();

    if let Some(status) = query.status {
        let p = qb.bind(status.as_str().to_string());
        qb.filter(format!("{} = {}", field("status"), p));
    }
    if let Some(ref category_id) = query.category_id {
        let p = qb.bind(category_id.clone());
        qb.filter(format!("{} = {}", field("category_id"), p));
    }
    if let Some(level) = query.difficulty {
        let p = qb.bind(level.as_str().to_string());
        qb.filter(format!("{} = {}", field("difficulty_level"), p));
    }
    if query.featured_only {
        qb.filter(format!("COALESCE({}::boolean, FALSE)", field("featured")));
    }
    if let Some(ref tag) = query.tag {
        let p = qb.bind(tag.clone());
        qb.filter(format!(
            "COALESCE(to_jsonb(t.*)->'tags', '[]'::jsonb) ? {}",
            p
        ));
    }
    if let Some(ref title) = query.title {
        let p = qb.bind(title.clone());
        qb.filter(format!("{} = {}", skill_title_field(), p));
    }
    if let Some(ref author) = query.author_name {
        let p = qb.bind(author.clone());
        qb.filter(format!("{} = {}", field("author_name"), p));
    }
    if let Some(ref git_url) = query.git_url {
        let p = qb.bind(git_url.clone());
        qb.filter(format!("{} = {}", skill_git_url_field(), p));
    }

    qb.search(
        &[
            skill_title_field(),
            field("title_en"),
            field("description"),
            field("description_en"),
            field("content"),
            field("content_en"),
        ],
        &query.q,
    );

    qb
}

fn not_found_or<T>(
    value: Option<Value>,
    resource: &str,
    map: fn(&Value) -> StoreResult<T>,
) -> StoreResult<T> {
    match value {
        Some(value) => map(&value),
        None => Err(StoreError::not_found(resource)),
    }
}

#[async_trait]
impl CatalogStore for Database {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn list_categories(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        let mut qb = QueryBuilder::default();
        if query.active_only {
            qb.filter(format!("COALESCE({}::boolean, TRUE)", field("is_active")));
        }
        qb.search(
            &[
                field("name"),
                field("name_en"),
                field("description"),
                field("description_en"),
                field("slug"),
            ],
            &query.q,
        );

        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t{} ORDER BY t.sort_order ASC, t.created_at DESC",
            CATEGORIES_TABLE,
            qb.where_sql()
        );
        let rows = self.select_rows(&sql, &qb.params()).await?;
        rows.iter().map(mapper::category_from_row).collect()
    }

    async fn create_category(&self, category: &Category) -> StoreResult<Category> {
        let row = self
            .insert_row(CATEGORIES_TABLE, mapper::category_columns(category))
            .await?;
        let created = mapper::category_from_row(&row)?;
        info!("Created category with id: {}", created.id);
        Ok(created)
    }

    async fn update_category(&self, id: &str, patch: &CategoryPatch) -> StoreResult<Category> {
        let columns = mapper::category_patch_columns(patch, crate::models::now());
        let row = self.update_row(CATEGORIES_TABLE, id, columns).await?;
        not_found_or(row, "Category", mapper::category_from_row)
    }

    async fn delete_category(&self, id: &str) -> StoreResult<()> {
        self.delete_row(CATEGORIES_TABLE, id, "Category").await
    }

    async fn list_skills(&self, query: &SkillQuery) -> StoreResult<SkillPage> {
        let mut qb = skill_filters(query);
        let where_sql = qb.where_sql();

        let count_sql = format!("SELECT COUNT(*) FROM {} AS t{}", SKILLS_TABLE, where_sql);
        let total = self.count(&count_sql, &qb.params()).await?;

        let mut sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t{} ORDER BY t.created_at DESC",
            SKILLS_TABLE, where_sql
        );
        if let Some(limit) = query.limit {
            let p = qb.bind(i64::try_from(limit).unwrap_or(i64::MAX));
            sql.push_str(&format!(" LIMIT {}", p));
        }
        if query.offset > 0 {
            let p = qb.bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
            sql.push_str(&format!(" OFFSET {}", p));
        }

        let rows = self.select_rows(&sql, &qb.params()).await?;
        let items = rows
            .iter()
            .map(mapper::skill_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(SkillPage { items, total })
    }

    async fn get_skill(&self, id: &str) -> StoreResult<Skill> {
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t WHERE t.id::text = $1",
            SKILLS_TABLE
        );
        let row = self.select_one(&sql, &[&id]).await?;
        not_found_or(row, "Skill", mapper::skill_from_row)
    }

    async fn create_skill(&self, skill: &Skill) -> StoreResult<Skill> {
        let row = self
            .insert_row(SKILLS_TABLE, mapper::skill_columns(skill))
            .await?;
        let created = mapper::skill_from_row(&row)?;
        info!("Created skill with id: {}", created.id);
        Ok(created)
    }

    async fn update_skill(&self, id: &str, patch: &SkillPatch) -> StoreResult<Skill> {
        let columns = mapper::skill_patch_columns(patch, crate::models::now());
        let row = self.update_row(SKILLS_TABLE, id, columns).await?;
        not_found_or(row, "Skill", mapper::skill_from_row)
    }

    async fn delete_skill(&self, id: &str) -> StoreResult<()> {
        self.delete_row(SKILLS_TABLE, id, "Skill").await
    }

    async fn increment_skill_downloads(&self, id: &str) -> StoreResult<Skill> {
        let sql = format!(
            "UPDATE {} AS t SET download_count = COALESCE(t.download_count, 0) + 1 WHERE t.id::text = $1 RETURNING to_jsonb(t.*)",
            SKILLS_TABLE
        );
        let row = self.select_one(&sql, &[&id]).await?;
        not_found_or(row, "Skill", mapper::skill_from_row)
    }

    async fn skill_status_counts(&self) -> StoreResult<StatusCounts> {
        let sql = format!(
            "SELECT {} AS status, COUNT(*) FROM {} AS t GROUP BY 1",
            field("status"),
            SKILLS_TABLE
        );
        let client = self.get_connection().await?;
        let rows = client.query(&sql, &[]).await?;

        let mut counts = StatusCounts::default();
        for row in &rows {
            let status: Option<String> = row.try_get(0)?;
            let n: i64 = row.try_get(1)?;
            let n = n.max(0) as u64;
            match status.as_deref().and_then(SkillStatus::parse).unwrap_or_default() {
                SkillStatus::Published => counts.published += n,
                SkillStatus::Draft => counts.draft += n,
                SkillStatus::Archived => counts.archived += n,
            }
            counts.total += n;
        }
        Ok(counts)
    }

    async fn list_admin_users(&self, query: &UserQuery) -> StoreResult<Vec<AdminUser>> {
        let mut qb = QueryBuilder::default();
        qb.search(&[field("username"), field("email")], &query.q);

        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t{} ORDER BY t.created_at DESC",
            ADMIN_USERS_TABLE,
            qb.where_sql()
        );
        let rows = self.select_rows(&sql, &qb.params()).await?;
        rows.iter().map(mapper::admin_user_from_row).collect()
    }

    async fn find_admin_user(&self, username: &str) -> StoreResult<Option<AdminUser>> {
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t WHERE {} = $1 LIMIT 1",
            ADMIN_USERS_TABLE,
            field("username")
        );
        match self.select_one(&sql, &[&username]).await? {
            Some(row) => Ok(Some(mapper::admin_user_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_admin_user(&self, user: &AdminUser) -> StoreResult<AdminUser> {
        let row = self
            .insert_row(ADMIN_USERS_TABLE, mapper::admin_user_columns(user))
            .await?;
        let created = mapper::admin_user_from_row(&row)?;
        info!("Created admin user with id: {}", created.id);
        Ok(created)
    }

    async fn update_admin_user(&self, id: &str, patch: &AdminUserPatch) -> StoreResult<AdminUser> {
        let columns = mapper::admin_user_patch_columns(patch, crate::models::now());
        let row = self.update_row(ADMIN_USERS_TABLE, id, columns).await?;
        not_found_or(row, "Admin user", mapper::admin_user_from_row)
    }

    async fn delete_admin_user(&self, id: &str) -> StoreResult<()> {
        self.delete_row(ADMIN_USERS_TABLE, id, "Admin user").await
    }

    async fn record_admin_login(&self, id: &str) -> StoreResult<()> {
        let sql = format!(
            "UPDATE {} AS t SET last_login_at = NOW(), updated_at = NOW() WHERE t.id::text = $1",
            ADMIN_USERS_TABLE
        );
        let client = self.get_connection().await?;
        let updated = client.execute(&sql, &[&id]).await?;
        if updated == 0 {
            return Err(StoreError::not_found("Admin user"));
        }
        Ok(())
    }

    async fn registered_users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<RegisteredUser>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t WHERE t.id::text = ANY($1)",
            REGISTERED_USERS_TABLE
        );
        let rows = self.select_rows(&sql, &[&ids]).await?;
        rows.iter().map(mapper::registered_user_from_row).collect()
    }

    async fn list_links(&self, query: &LinkQuery) -> StoreResult<Vec<Link>> {
        let mut qb = QueryBuilder::default();
        if query.enabled_only {
            qb.filter(format!("COALESCE({}::boolean, TRUE)", field("enabled")));
        }
        qb.search(&[field("name"), field("url"), field("description")], &query.q);

        let sql = format!(
            "SELECT to_jsonb(t.*) FROM {} AS t{} ORDER BY t.sort_order ASC, t.created_at DESC",
            LINKS_TABLE,
            qb.where_sql()
        );
        let rows = self.select_rows(&sql, &qb.params()).await?;
        rows.iter().map(mapper::link_from_row).collect()
    }

    async fn create_link(&self, link: &Link) -> StoreResult<Link> {
        let row = self.insert_row(LINKS_TABLE, mapper::link_columns(link)).await?;
        mapper::link_from_row(&row)
    }

    async fn update_link(&self, id: &str, patch: &LinkPatch) -> StoreResult<Link> {
        let columns = mapper::link_patch_columns(patch, crate::models::now());
        let row = self.update_row(LINKS_TABLE, id, columns).await?;
        not_found_or(row, "Link", mapper::link_from_row)
    }

    async fn delete_link(&self, id: &str) -> StoreResult<()> {
        self.delete_row(LINKS_TABLE, id, "Link").await
    }

    async fn create_feedback(&self, feedback: &Feedback) -> StoreResult<Feedback> {
        let row = self
            .insert_row(FEEDBACK_TABLE, mapper::feedback_columns(feedback))
            .await?;
        mapper::feedback_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DifficultyLevel;
    use serde_json::json;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("vue"), "%vue%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_insert_sql() {
        let mut columns = Row::new();
        columns.insert("id".into(), json!("1"));
        columns.insert("name".into(), json!("x"));

        let sql = insert_sql("skills", &columns);
        assert_eq!(
            sql,
            "INSERT INTO skills AS t (\"id\", \"name\") SELECT \"id\", \"name\" FROM jsonb_populate_record(NULL::skills, $1::jsonb) RETURNING to_jsonb(t.*)"
        );
    }

    #[test]
    fn test_update_sql() {
        let mut columns = Row::new();
        columns.insert("updated_at".into(), json!("2024-01-01T00:00:00Z"));

        let sql = update_sql("categories", &columns);
        assert!(sql.starts_with("UPDATE categories AS t SET (\"updated_at\") = (SELECT \"updated_at\""));
        assert!(sql.ends_with("WHERE t.id::text = $2 RETURNING to_jsonb(t.*)"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_skill_filters_placeholders() {
        let query = SkillQuery {
            q: Some("rust".to_string()),
            status: Some(SkillStatus::Published),
            difficulty: Some(DifficultyLevel::Advanced),
            featured_only: true,
            ..Default::default()
        };
        let qb = skill_filters(&query);
        let where_sql = qb.where_sql();

        assert_eq!(qb.params().len(), 3);
        assert!(where_sql.starts_with(" WHERE (to_jsonb(t.*)->>'status') = $1"));
        assert!(where_sql.contains("(to_jsonb(t.*)->>'difficulty_level') = $2"));
        assert!(where_sql.contains("COALESCE((to_jsonb(t.*)->>'featured')::boolean, FALSE)"));
        assert!(where_sql.contains("(to_jsonb(t.*)->>'content') ILIKE $3"));
    }

    #[test]
    fn test_empty_query_has_no_where_clause() {
        let qb = skill_filters(&SkillQuery::default());
        assert_eq!(qb.where_sql(), "");
        assert!(qb.params().is_empty());
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let mut qb = QueryBuilder::default();
        qb.search(&[field("name")], &Some("   ".to_string()));
        assert_eq!(qb.where_sql(), "");
    }
}
