//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use tutorhub::router::{allowed_sections, Navigation};
use tutorhub::session::Session;
use tutorhub::{DashboardMetrics, Role, UserView};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print a subheader
pub fn subheader(msg: &str) {
    println!("\n{}", msg.bold());
}

fn role_label(role: Role) -> colored::ColoredString {
    match role {
        Role::Administrator => role.as_str().magenta(),
        Role::Student => role.as_str().cyan(),
        Role::Tutor => role.as_str().green(),
    }
}

/// Print a user table
pub fn print_users(users: &[UserView]) {
    if users.is_empty() {
        info("No users");
        return;
    }

    for user in users {
        println!(
            "  {} {} {} {}",
            user.id.dimmed(),
            format!("{} {}", user.first_name, user.last_name).bold(),
            format!("<{}>", user.email),
            role_label(user.role),
        );
    }
}

/// Print dashboard metrics
pub fn print_metrics(metrics: &DashboardMetrics) {
    header("Dashboard");
    println!("  {:<16} {}", "Total users", metrics.total_users.to_string().bold());
    for role in Role::ALL {
        println!("  {:<16} {}", role_label(role), metrics.count(role));
    }

    if !metrics.recent_users.is_empty() {
        subheader("Recent registrations:");
        for user in &metrics.recent_users {
            println!(
                "  {} {} {} {}",
                user.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                format!("{} {}", user.first_name, user.last_name),
                format!("<{}>", user.email),
                role_label(user.role),
            );
        }
    }
}

/// Print the sections a role may reach
pub fn print_sections(role: Role) {
    subheader(&format!("Sections for {}:", role_label(role)));
    for section in allowed_sections(role) {
        println!("  {} {}", "→".cyan(), section);
    }
}

/// Print the outcome of a navigation attempt
pub fn print_navigation(navigation: &Navigation) {
    match navigation {
        Navigation::Allowed(section) => success(&format!("Access granted to {}", section)),
        Navigation::Redirected { requested, to } => {
            warning(&format!("Access to {} denied, redirected to {}", requested, to))
        }
    }
}

/// Print a session snapshot
pub fn print_session(session: &Session) {
    match &session.identity {
        Some(identity) => info(&format!(
            "Signed in as {} ({})",
            identity.user_id,
            role_label(identity.role)
        )),
        None => info("Anonymous"),
    }
    println!("  {:<10} {}", "language", session.preferences.language);
    println!("  {:<10} {}", "theme", session.preferences.theme);
}

/// Print a JSON report
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
