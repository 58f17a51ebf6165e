//! Editor account seeder for fxgate.
//!
//! Registration only ever grants the viewer role; the editor role is
//! assigned out-of-band, which is what this binary does. It creates the
//! account if needed and grants it `[viewer, editor]`.
//!
//! Usage:
//!   SEED_EMAIL=admin@example.com SEED_PASSWORD=secret cargo run --bin seeder

use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

use fxgate_core::auth::hash_password;
use fxgate_db::UserRepository;
use fxgate_db::entities::users::RoleSet;
use fxgate_shared::Role;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let email = std::env::var("SEED_EMAIL").expect("SEED_EMAIL must be set in environment");
    let password =
        std::env::var("SEED_PASSWORD").expect("SEED_PASSWORD must be set in environment");

    println!("Connecting to database...");
    let db = fxgate_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    let repo = UserRepository::new(db.clone());
    let roles = vec![Role::Viewer, Role::Editor];

    match repo
        .find_by_email(&email)
        .await
        .expect("Failed to look up account")
    {
        Some(user) => {
            println!("Granting editor to existing account {email}...");
            let mut active = user.into_active_model();
            active.roles = Set(RoleSet(roles));
            active.updated_at = Set(chrono::Utc::now().into());
            active.update(&db).await.expect("Failed to update roles");
        }
        None => {
            println!("Creating editor account {email}...");
            let password_hash = hash_password(&password).expect("Failed to hash password");
            repo.create(&email, &password_hash, roles)
                .await
                .expect("Failed to create account");
        }
    }

    println!("Seeding complete!");
}
