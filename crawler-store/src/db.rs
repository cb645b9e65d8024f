//! Connection management and schema migrations, ported from the teacher's
//! `postgres-lopez/src/db.rs` `DbConfig` near-verbatim (same StructOpt
//! surface, same `migrant_lib` + `include_dir` embedded-migration wiring).
//! The `params!` helper macro is dropped: this crate's statements all have
//! few enough bound parameters that inline `&[&a, &b, ...]` reads fine
//! without it.

use include_dir::Dir;
use migrant_lib::migration::EmbeddedMigration;
use migrant_lib::{Config, Migratable, Migrator, Settings};
use serde_derive::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use structopt::StructOpt;
use tokio_postgres::error::SqlState;
use tokio_postgres::{connect as pg_connect, Client, NoTls};

#[derive(Debug, Clone, StructOpt, Serialize, Deserialize)]
pub struct DbConfig {
    #[structopt(long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[structopt(long, default_value = "5432", env = "DB_PORT")]
    pub port: u16,
    #[structopt(long, env = "DB_USER")]
    pub user: Option<String>,
    #[structopt(long, env = "DB_DBNAME")]
    pub dbname: Option<String>,
    #[structopt(long, env = "DB_PASSWORD", default_value = "")]
    pub password: String,
}

impl DbConfig {
    fn user(&self) -> String {
        self.user
            .clone()
            .or_else(|| env::var("USER").ok())
            .unwrap_or_default()
    }

    fn dbname(&self) -> String {
        self.dbname.clone().unwrap_or_else(|| "crawler".to_owned())
    }

    pub async fn connect(&self) -> Result<Arc<Client>, crate::error::Error> {
        let (client, connection) = pg_connect(
            &format!(
                "host={} port={} user={} dbname={} password={}",
                self.host,
                self.port,
                self.user(),
                self.dbname(),
                self.password,
            ),
            NoTls,
        )
        .await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::error!("database connection failed: {err}");
            }
        });

        Ok(Arc::new(client))
    }

    /// Creates the target database if it doesn't exist yet, connecting to
    /// the server's `postgres` maintenance database to do so.
    pub async fn ensure_create_db(&self) -> Result<(), crate::error::Error> {
        let (client, connection) = pg_connect(
            &format!(
                "host={} port={} user={} dbname=postgres password={}",
                self.host,
                self.port,
                self.user(),
                self.password,
            ),
            NoTls,
        )
        .await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                log::error!("database connection failed: {err}");
            }
        });

        let outcome = client
            .simple_query(&format!("create database \"{}\";", self.dbname()))
            .await;

        if let Err(error) = outcome {
            let code = error.code().expect("no code returned on create database");
            if *code != SqlState::DUPLICATE_DATABASE {
                return Err(error.into());
            }
        }

        Ok(())
    }

    fn embedded_migrations() -> Vec<Box<dyn Migratable>> {
        const MIGRATIONS: Dir = include_dir::include_dir!("$CARGO_MANIFEST_DIR/migrations");

        let mut migration_names = MIGRATIONS
            .dirs()
            .map(|migration_dir| migration_dir.path().to_owned())
            .collect::<Vec<_>>();

        migration_names.sort_unstable();

        migration_names
            .into_iter()
            .map(|path| {
                EmbeddedMigration::with_tag(path.to_string_lossy().as_ref())
                    .up(String::from_utf8_lossy(
                        MIGRATIONS
                            .get_file(path.join("up.sql"))
                            .expect("missing up.sql")
                            .contents(),
                    ))
                    .down(String::from_utf8_lossy(
                        MIGRATIONS
                            .get_file(path.join("down.sql"))
                            .expect("missing down.sql")
                            .contents(),
                    ))
                    .boxed()
            })
            .collect()
    }

    /// Applies every migration not yet recorded as applied. Safe to call on
    /// every process start: already-applied migrations are skipped.
    pub async fn sync_migrations(self: Arc<Self>) -> Result<(), crate::error::Error> {
        tokio::task::spawn_blocking(move || {
            log::info!("ensuring schema migrations are up to date");

            let settings = Settings::configure_postgres()
                .database_host(&self.host)
                .database_port(self.port)
                .database_name(&self.dbname())
                .database_user(&self.user())
                .database_password(&self.password)
                .build()?;

            let mut config = Config::with_settings(&settings);
            config.use_migrations(DbConfig::embedded_migrations())?;
            config.setup()?;
            config = config.reload()?;

            let mut migrator = Migrator::with_config(&config);
            migrator.all(true).swallow_completion(true).apply()?;

            log::info!("schema up to date");
            Ok(())
        })
        .await
        .expect("migration task panicked")
        .map_err(crate::error::Error::Migration)
    }
}
