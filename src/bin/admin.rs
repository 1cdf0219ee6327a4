//! CLI administration tool for coach-programs.
//!
//! Provides operator commands for roles, manual enrollments, order review
//! and database checks without going through the web UI.
//!
//! # Usage
//!
//! ```bash
//! # List users
//! cargo run --bin admin -- user list
//!
//! # Promote a user to coach
//! cargo run --bin admin -- user role jane@example.com coach
//!
//! # Grant access to a program without an order
//! cargo run --bin admin -- enrollment grant jane@example.com strength-basics
//!
//! # Expire lapsed enrollments now
//! cargo run --bin admin -- enrollment sweep
//!
//! # Recent orders across all coaches
//! cargo run --bin admin -- orders list --limit 50
//!
//! # View statistics
//! cargo run --bin admin -- stats
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string

use coach_programs::application::services::EnrollmentService;
use coach_programs::domain::entities::{Order, OrderStatus, Role};
use coach_programs::domain::repositories::{OrderRepository, ProfileRepository};
use coach_programs::infrastructure::persistence::{
    PgEnrollmentRepository, PgOrderRepository, PgProfileRepository, PgProgramRepository,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;

/// CLI tool for managing coach-programs.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Manage users and roles
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage enrollments
    Enrollment {
        #[command(subcommand)]
        action: EnrollmentAction,
    },

    /// Review orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },

    /// Show statistics
    Stats,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// List users, newest first
    List {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: i64,

        /// Users per page
        #[arg(short, long, default_value_t = 50)]
        limit: i64,
    },

    /// Change a user's role (member, coach, admin)
    Role {
        /// E-mail address of the user
        email: String,

        /// New role
        role: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum EnrollmentAction {
    /// Grant access to a program without an order
    Grant {
        /// E-mail address of the user
        email: String,

        /// Program slug
        slug: String,
    },

    /// Mark lapsed enrollments as expired
    Sweep,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List recent orders
    List {
        /// Maximum number of orders to show
        #[arg(short, long, default_value_t = 25)]
        limit: i64,
    },
}

/// Database diagnostic subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in .env file")?;

    let pool = PgPool::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::User { action } => handle_user_action(action, &pool).await?,
        Commands::Enrollment { action } => handle_enrollment_action(action, &pool).await?,
        Commands::Orders { action } => handle_orders_action(action, &pool).await?,
        Commands::Stats => handle_stats(&pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

async fn handle_user_action(action: UserAction, pool: &PgPool) -> Result<()> {
    let repo = PgProfileRepository::new(Arc::new(pool.clone()));

    match action {
        UserAction::List { page, limit } => list_users(&repo, page, limit).await,
        UserAction::Role { email, role, yes } => change_role(&repo, &email, &role, yes).await,
    }
}

/// Lists user profiles.
///
/// # Output Format
///
/// ```text
/// 👥 Users
///
///   Email                          Name                 Role     Joined
///   ──────────────────────────────────────────────────────────────────────────
///   jane@example.com               Jane                 coach    2026-01-15
/// ```
async fn list_users(repo: &PgProfileRepository, page: i64, limit: i64) -> Result<()> {
    println!("{}", "👥 Users".bright_blue().bold());
    println!();

    let total = repo
        .count()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to count users: {}", e))?;
    let users = repo
        .list(page, limit)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list users: {}", e))?;

    if users.is_empty() {
        println!("{}", "  No users found".yellow());
        return Ok(());
    }

    println!(
        "  {:<30} {:<20} {:<8} {:<10}",
        "Email".bright_white().bold(),
        "Name".bright_white().bold(),
        "Role".bright_white().bold(),
        "Joined".bright_white().bold()
    );
    println!("  {}", "─".repeat(74).bright_black());

    for user in &users {
        println!(
            "  {:<30} {:<20} {:<8} {}",
            user.email.cyan(),
            truncate(&user.display_name, 20),
            role_colored(user.role),
            user.created_at.format("%Y-%m-%d").to_string().bright_black()
        );
    }

    println!();
    println!(
        "  Showing {} of {}",
        users.len().to_string().bright_white().bold(),
        total.to_string().bright_white().bold()
    );
    println!();

    Ok(())
}

/// Changes a user's role after confirmation.
///
/// Refuses unknown roles before touching the database.
async fn change_role(
    repo: &PgProfileRepository,
    email: &str,
    role: &str,
    skip_confirm: bool,
) -> Result<()> {
    println!("{}", "🔑 Change Role".bright_blue().bold());
    println!();

    let role: Role = role
        .parse()
        .map_err(|_| anyhow::anyhow!("Unknown role '{}': use member, coach or admin", role))?;

    let profile = repo
        .find_by_email(email)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .context("User not found")?;

    if profile.role == role {
        println!(
            "{}",
            format!("⚠️  {} already has role {}", profile.email, role).yellow()
        );
        return Ok(());
    }

    println!("  User: {}", profile.email.cyan());
    println!("  Role: {} → {}", role_colored(profile.role), role_colored(role));
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Apply this change?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    repo.set_role(&profile.id, role)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to change role: {}", e))?;

    println!();
    println!("{}", "✅ Role updated".green().bold());
    println!();

    Ok(())
}

async fn handle_enrollment_action(action: EnrollmentAction, pool: &PgPool) -> Result<()> {
    let pool = Arc::new(pool.clone());
    let service = EnrollmentService::new(
        Arc::new(PgEnrollmentRepository::new(pool.clone())),
        Arc::new(PgProgramRepository::new(pool.clone())),
        Arc::new(PgProfileRepository::new(pool)),
    );

    match action {
        EnrollmentAction::Grant { email, slug } => {
            println!("{}", "🎟️  Grant Enrollment".bright_blue().bold());
            println!();

            let enrollment = service
                .grant(&email, &slug)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to grant enrollment: {}", e))?;

            let access = match enrollment.expires_at {
                Some(expires_at) => format!("until {}", expires_at.format("%Y-%m-%d %H:%M UTC")),
                None => "lifetime".to_string(),
            };

            println!("{}", "✅ Enrollment granted".green().bold());
            println!("  User:    {}", email.cyan());
            println!("  Program: {}", slug.cyan());
            println!("  Access:  {}", access.bright_white());
            println!();
        }
        EnrollmentAction::Sweep => {
            println!("{}", "🧹 Expiring lapsed enrollments...".bright_blue());

            let expired = service.sweep().await;

            println!(
                "{} {}",
                "✅ Expired:".green().bold(),
                expired.to_string().bright_white().bold()
            );
        }
    }

    Ok(())
}

async fn handle_orders_action(action: OrdersAction, pool: &PgPool) -> Result<()> {
    let repo = PgOrderRepository::new(Arc::new(pool.clone()));

    match action {
        OrdersAction::List { limit } => {
            println!("{}", "🧾 Orders".bright_blue().bold());
            println!();

            let orders = repo
                .list_by_coach(None, 1, limit)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to list orders: {}", e))?;

            if orders.is_empty() {
                println!("{}", "  No orders found".yellow());
                return Ok(());
            }

            println!(
                "  {:<22} {:<28} {:>14} {:<9} {:<16}",
                "Number".bright_white().bold(),
                "Program".bright_white().bold(),
                "Amount".bright_white().bold(),
                "Status".bright_white().bold(),
                "Created".bright_white().bold()
            );
            println!("  {}", "─".repeat(93).bright_black());

            for order in &orders {
                print_order(order);
            }

            println!();
        }
    }

    Ok(())
}

fn print_order(order: &Order) {
    let program = order
        .program_title
        .clone()
        .unwrap_or_else(|| format!("Program #{}", order.program_id));

    println!(
        "  {:<22} {:<28} {:>14} {:<9} {}",
        order.order_number.cyan(),
        truncate(&program, 28),
        format!("{} {}", order.amount, order.currency),
        status_colored(order.status),
        order
            .created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );

    if let Some(code) = &order.failure_code {
        println!(
            "  {:<22} {}",
            "",
            format!("{}: {}", code, order.failure_message.as_deref().unwrap_or("")).red()
        );
    }
}

/// Displays system statistics.
///
/// Shows:
/// - Users by role
/// - Published programs
/// - Active enrollments
/// - Paid orders and revenue per currency
async fn handle_stats(pool: &PgPool) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let roles: Vec<(String, i64)> =
        sqlx::query_as("SELECT role, COUNT(*) FROM profiles GROUP BY role ORDER BY role")
            .fetch_all(pool)
            .await?;

    let programs_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM programs WHERE status = 'published'")
            .fetch_one(pool)
            .await?;

    let enrollments_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM enrollments WHERE status = 'active'")
            .fetch_one(pool)
            .await?;

    let revenue: Vec<(String, i64, i64)> = sqlx::query_as(
        "SELECT currency, COUNT(*), COALESCE(SUM(amount), 0)::BIGINT FROM orders \
         WHERE status = 'paid' GROUP BY currency ORDER BY currency",
    )
    .fetch_all(pool)
    .await?;

    for (role, count) in &roles {
        println!(
            "  {:<20} {}",
            format!("Users ({role}):"),
            count.to_string().bright_green().bold()
        );
    }
    println!(
        "  {:<20} {}",
        "Published programs:",
        programs_count.to_string().bright_green().bold()
    );
    println!(
        "  {:<20} {}",
        "Active enrollments:",
        enrollments_count.to_string().bright_green().bold()
    );

    if revenue.is_empty() {
        println!("  {:<20} {}", "Paid orders:", "0".bright_green().bold());
    }
    for (currency, orders, total) in &revenue {
        println!(
            "  {:<20} {} ({} {})",
            format!("Paid orders ({currency}):"),
            orders.to_string().bright_green().bold(),
            total,
            currency
        );
    }
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            let migrations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
                .fetch_one(pool)
                .await
                .unwrap_or(0);

            println!("  PostgreSQL: {}", version.bright_white());
            println!("  Migrations: {}", migrations.to_string().bright_white());
            println!();
        }
    }

    Ok(())
}

fn role_colored(role: Role) -> ColoredString {
    match role {
        Role::Admin => role.as_str().red().bold(),
        Role::Coach => role.as_str().green(),
        Role::Member => role.as_str().normal(),
    }
}

fn status_colored(status: OrderStatus) -> ColoredString {
    match status {
        OrderStatus::Paid => status.as_str().green(),
        OrderStatus::Pending => status.as_str().yellow(),
        OrderStatus::Failed | OrderStatus::Canceled => status.as_str().red(),
        OrderStatus::Refunded => status.as_str().bright_black(),
    }
}

/// Shortens `value` to `max` characters for table columns.
fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut short: String = value.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}
