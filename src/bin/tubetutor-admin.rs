//! Operator CLI for the TubeTutor database
//!
//! redb holds an exclusive lock on the database file, so run this while the
//! server is stopped.

use clap::{Parser, Subcommand};

use tubetutor_server::db;
use tubetutor_server::models::{NewUser, User};
use tubetutor_server::security::hash_password;
use tubetutor_server::{AppError, open_database};

#[derive(Parser)]
#[command(name = "tubetutor-admin")]
#[command(about = "Manage TubeTutor user accounts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the redb database file
    #[arg(long, global = true, env = "DATABASE_PATH", default_value = "./data/tubetutor.db")]
    database: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
    /// Print every user account
    ListUsers,
}

#[derive(clap::Args)]
struct CreateAdminArgs {
    #[arg(long, default_value = "admin@tubetutor.com")]
    email: String,
    #[arg(long, default_value = "admin")]
    username: String,
    /// Password for the new account
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: String,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tubetutor_server=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let db = open_database(&cli.database)?;

    match cli.command {
        Commands::CreateAdmin(args) => create_admin(&db, args),
        Commands::ListUsers => list_users(&db),
    }
}

fn create_admin(db: &db::Db, args: CreateAdminArgs) -> anyhow::Result<()> {
    if !User::validate_email(&args.email) {
        anyhow::bail!("Invalid email address: {}", args.email);
    }
    if !User::validate_username(&args.username) {
        anyhow::bail!("Invalid username: {}", args.username);
    }

    let new_user = NewUser {
        email: args.email,
        username: args.username,
        hashed_password: hash_password(&args.password)?,
        is_admin: true,
    };

    match db::users::create(db, new_user) {
        Ok(user) => {
            println!("Admin user created successfully!");
            println!("Id: {}", user.id);
            println!("Email: {}", user.email);
            println!("Username: {}", user.username);
            Ok(())
        }
        Err(AppError::UserAlreadyExists) => {
            println!("A user with that email or username already exists!");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn list_users(db: &db::Db) -> anyhow::Result<()> {
    for user in db::users::list(db)? {
        println!(
            "{}\t{}\t{}\t{}",
            user.id,
            user.email,
            user.username,
            if user.is_admin { "admin" } else { "learner" }
        );
    }
    Ok(())
}
