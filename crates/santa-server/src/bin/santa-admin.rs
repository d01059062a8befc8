//! Create or reset an organizer account.
//!
//! Usage: santa-admin <username> <password>

use std::path::PathBuf;

use anyhow::bail;
use uuid::Uuid;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "santa=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [username, password] = args.as_slice() else {
        bail!("usage: santa-admin <username> <password>");
    };
    if username.trim().chars().count() < 3 {
        bail!("username must be at least 3 characters");
    }
    if password.len() < 8 {
        bail!("password must be at least 8 characters");
    }

    let db_path = std::env::var("SANTA_DB_PATH").unwrap_or_else(|_| "santa.db".into());
    let db = santa_db::Database::open(&PathBuf::from(&db_path))?;

    let hash = santa_api::auth::hash_password(password)?;
    let created = db.upsert_admin(&Uuid::new_v4().to_string(), username.trim(), &hash)?;
    if created {
        println!("Created organizer {}", username.trim());
    } else {
        println!("Promoted {} to organizer and reset the password", username.trim());
    }
    Ok(())
}
