use sea_orm_migration::MigratorTrait;
use tracing::{error, info};
use verdant_api::{config, db, migrator::Migrator};

/// `migration [up|down|status|fresh]`, defaulting to `up`.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level.as_str(), cfg.log_json);

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let result = match command.as_str() {
        "up" => Migrator::up(&pool, None).await,
        "down" => Migrator::down(&pool, Some(1)).await,
        "status" => Migrator::status(&pool).await,
        "fresh" => Migrator::fresh(&pool).await,
        other => {
            error!(command = other, "unknown migration command");
            anyhow::bail!("unknown command '{}', expected up|down|status|fresh", other);
        }
    };

    match result {
        Ok(()) => {
            info!(%command, "migration command finished");
            Ok(())
        }
        Err(e) => {
            error!(%command, error = %e, "migration command failed");
            Err(e.into())
        }
    }
}
