//! tutorhub CLI - server launcher and account administration
//!
//! Runs the HTTP surface and manages the JSON credential store directly:
//! adding and removing accounts, checking credentials, and answering
//! role/section questions from the access table.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

mod config;
mod error;
mod output;

use config::CliConfig;
use error::{CliError, Result};

use tutorhub::router::{self, RouteState};
use tutorhub::session::{FilePreferenceStorage, Language, SessionContext, SessionUpdate, Theme};
use tutorhub::{CredentialStore, CredentialVerifier, ProfileUpdate, Role, Section, TutorhubConfig};

/// tutorhub - tutoring platform access control
#[derive(Parser)]
#[command(name = "tutorhub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to tutorhub.toml configuration file
    #[arg(short, long, default_value = "tutorhub.toml", global = true)]
    config: PathBuf,

    /// Credential store file, overriding the configuration
    #[arg(short, long, env = "TUTORHUB_STORE", global = true)]
    store: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server until Ctrl-C
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage accounts in the credential store
    #[command(subcommand)]
    User(UserCommand),

    /// Check an email and secret against the store
    Verify {
        #[arg(short, long)]
        email: String,

        #[arg(long, env = "TUTORHUB_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Resolve navigation for a role: administrator, student, tutor or anonymous
    Access {
        role: String,

        /// Section path (/admin) or name (admin-dashboard); omit to list
        section: Option<String>,
    },

    /// Show dashboard metrics
    Metrics {
        /// Number of recent registrations to show
        #[arg(short, long, default_value_t = 5)]
        recent: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change stored UI preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create an account
    Add {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(short, long)]
        email: String,

        /// administrator, student or tutor
        #[arg(short, long)]
        role: String,

        #[arg(long, env = "TUTORHUB_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// List accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change profile fields
    Edit {
        id: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(short, long)]
        email: Option<String>,
    },

    /// Replace an account's secret
    Passwd {
        id: String,

        #[arg(long, env = "TUTORHUB_SECRET", hide_env_values = true)]
        secret: String,
    },

    /// Remove an account
    Delete { id: String },
}

#[derive(Subcommand)]
enum PrefsCommand {
    /// Print the stored preferences
    Show {
        #[arg(short, long, default_value = "preferences.json")]
        file: PathBuf,
    },

    /// Change theme and/or language
    Set {
        #[arg(short, long, default_value = "preferences.json")]
        file: PathBuf,

        /// light or dark
        #[arg(long)]
        theme: Option<String>,

        /// en or vi
        #[arg(long)]
        language: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            if let Some(hint) = e.hint() {
                output::info(hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = if cli.config.exists() {
        CliConfig::from_file(&cli.config)?
    } else {
        CliConfig::default()
    };

    let mut config = file.apply(TutorhubConfig::from_env())?;
    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    }

    let fallback = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve { .. }, false) => "info",
        _ => "warn",
    };
    tutorhub::observability::init(file.observability(fallback)?)?;

    match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind),
        Commands::User(command) => cmd_user(&config, command),
        Commands::Verify { email, secret } => cmd_verify(&config, &email, &secret),
        Commands::Access { role, section } => cmd_access(&role, section.as_deref()),
        Commands::Metrics { recent, json } => cmd_metrics(&config, recent, json),
        Commands::Prefs(command) => cmd_prefs(command),
    }
}

fn open_store(config: &TutorhubConfig) -> Result<CredentialStore> {
    let path = config
        .store_path
        .as_ref()
        .ok_or_else(|| CliError::missing("store.path (or --store)"))?;
    Ok(CredentialStore::open(path, config.password_policy())?)
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_serve(mut config: TutorhubConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if config.store_path.is_none() {
        output::warning("No store path configured; accounts will not survive a restart");
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(tutorhub::http::serve(config))?;
    Ok(())
}

fn cmd_user(config: &TutorhubConfig, command: UserCommand) -> Result<()> {
    let store = open_store(config)?;

    match command {
        UserCommand::Add {
            first_name,
            last_name,
            email,
            role,
            secret,
        } => {
            let role: Role = role.parse()?;
            let user = store.create(&first_name, &last_name, &email, &secret, role)?;
            output::success(&format!("Created {} {} ({})", user.email, user.role, user.id));
        }

        UserCommand::List { json } => {
            let users: Vec<_> = store.list().iter().map(|u| u.view()).collect();
            if json {
                output::print_json(&users)?;
            } else {
                output::header(&format!("{} user(s)", users.len()));
                output::print_users(&users);
            }
        }

        UserCommand::Edit {
            id,
            first_name,
            last_name,
            email,
        } => {
            let update = ProfileUpdate {
                first_name,
                last_name,
                email,
            };
            if update.is_empty() {
                return Err(CliError::invalid(
                    "edit",
                    "nothing to change; pass --first-name, --last-name or --email",
                ));
            }
            let user = store.update_profile(&id, update)?;
            output::success(&format!("Updated {} ({})", user.full_name(), user.email));
        }

        UserCommand::Passwd { id, secret } => {
            let user = store.update_password(&id, &secret)?;
            output::success(&format!("Secret changed for {}", user.email));
        }

        UserCommand::Delete { id } => {
            store.delete(&id)?;
            output::success(&format!("Deleted {}", id));
        }
    }

    Ok(())
}

fn cmd_verify(config: &TutorhubConfig, email: &str, secret: &str) -> Result<()> {
    let store = open_store(config)?;
    let verifier = CredentialVerifier::new(Arc::new(store));

    let outcome = verifier.verify(email, secret)?;
    let landing = router::default_section(outcome.role);

    output::success(&format!("Credentials valid for {}", outcome.user_id));
    output::info(&format!("Role {}, lands on {}", outcome.role, landing));
    Ok(())
}

fn cmd_access(role: &str, section: Option<&str>) -> Result<()> {
    let state = match role {
        "anonymous" => RouteState::Anonymous,
        other => RouteState::from(other.parse::<Role>()?),
    };

    let Some(section) = section else {
        match state.role() {
            Some(role) => output::print_sections(role),
            None => output::info(&format!("Anonymous clients may only open {}", Section::Login)),
        }
        return Ok(());
    };

    let section: Section = section
        .parse()
        .map_err(|message: String| CliError::invalid("section", message))?;

    let navigation = router::navigate(state, section);
    output::print_navigation(&navigation);

    match state.role() {
        Some(role) if navigation.is_redirect() => {
            Err(tutorhub::AccessError::UnauthorizedSection { role, section }.into())
        }
        _ => Ok(()),
    }
}

fn cmd_metrics(config: &TutorhubConfig, recent: usize, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let metrics = store.dashboard_metrics(recent);

    if json {
        output::print_json(&metrics)?;
    } else {
        output::print_metrics(&metrics);
    }
    Ok(())
}

fn cmd_prefs(command: PrefsCommand) -> Result<()> {
    match command {
        PrefsCommand::Show { file } => {
            let ctx = load_session(&file)?;
            output::print_session(ctx.session());
        }

        PrefsCommand::Set {
            file,
            theme,
            language,
        } => {
            let mut update = SessionUpdate::new();
            if let Some(theme) = theme {
                let theme: Theme = theme
                    .parse()
                    .map_err(|message: String| CliError::invalid("theme", message))?;
                update = update.theme(theme);
            }
            if let Some(language) = language {
                let language: Language = language
                    .parse()
                    .map_err(|message: String| CliError::invalid("language", message))?;
                update = update.language(language);
            }

            let mut ctx = load_session(&file)?;
            let session = ctx.update(update)?;
            output::success(&format!("Saved {}", file.display()));
            output::print_session(&session);
        }
    }

    Ok(())
}

fn load_session(file: &Path) -> Result<SessionContext<FilePreferenceStorage>> {
    let storage = FilePreferenceStorage::open(file)?;
    Ok(SessionContext::load(storage)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tutorhub::AccessError;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_add() {
        let cli = Cli::try_parse_from([
            "tutorhub",
            "--store",
            "users.json",
            "user",
            "add",
            "--first-name",
            "Jane",
            "--last-name",
            "Doe",
            "--email",
            "jane@example.com",
            "--role",
            "student",
            "--secret",
            "secret123",
        ])
        .unwrap();

        assert_eq!(cli.store, Some(PathBuf::from("users.json")));
        assert!(matches!(
            cli.command,
            Commands::User(UserCommand::Add { ref role, .. }) if role == "student"
        ));
    }

    #[test]
    fn test_access_exit_codes() {
        assert!(cmd_access("student", Some("/student")).is_ok());
        assert!(cmd_access("anonymous", Some("/admin")).is_ok());

        let denied = cmd_access("student", Some("/admin")).unwrap_err();
        assert_eq!(denied.exit_code(), 2);

        let bad_role = cmd_access("staff", None).unwrap_err();
        assert_eq!(bad_role.exit_code(), 1);
    }

    #[test]
    fn test_user_commands_against_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = TutorhubConfig::builder()
            .store_path(dir.path().join("users.json"))
            .build();

        cmd_user(
            &config,
            UserCommand::Add {
                first_name: "Jane".into(),
                last_name: "Doe".into(),
                email: "jane@example.com".into(),
                role: "tutor".into(),
                secret: "secret123".into(),
            },
        )
        .unwrap();

        assert!(cmd_verify(&config, "jane@example.com", "secret123").is_ok());
        let wrong = cmd_verify(&config, "jane@example.com", "nope").unwrap_err();
        assert_eq!(wrong.exit_code(), 2);

        let id = open_store(&config).unwrap().find_by_email("jane@example.com").unwrap().id;
        cmd_user(&config, UserCommand::Delete { id }).unwrap();
        assert!(open_store(&config).unwrap().is_empty());
    }

    #[test]
    fn test_user_add_refused_while_store_is_open() {
        let dir = tempfile::tempdir().unwrap();
        let config = TutorhubConfig::builder()
            .store_path(dir.path().join("users.json"))
            .build();

        let server = open_store(&config).unwrap();
        server
            .create("Jane", "Doe", "jane@example.com", "secret123", Role::Student)
            .unwrap();

        let err = cmd_user(
            &config,
            UserCommand::Add {
                first_name: "Ada".into(),
                last_name: "Lee".into(),
                email: "ada@example.com".into(),
                role: "administrator".into(),
                secret: "secret123".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Access(AccessError::StoreLocked { .. })));
        assert_eq!(err.exit_code(), 1);
        assert!(err.hint().is_some());

        drop(server);
        let store = open_store(&config).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.find_by_email("ada@example.com").is_none());
    }

    #[test]
    fn test_store_required() {
        let err = open_store(&TutorhubConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::MissingRequired { .. }));
    }

    #[test]
    fn test_prefs_persist() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("prefs.json");

        cmd_prefs(PrefsCommand::Set {
            file: file.clone(),
            theme: Some("dark".into()),
            language: Some("vi".into()),
        })
        .unwrap();

        let ctx = load_session(&file).unwrap();
        assert_eq!(ctx.session().preferences.theme, Theme::Dark);
        assert_eq!(ctx.session().preferences.language, Language::Vi);
        assert!(!ctx.session().is_authenticated());

        let bad = cmd_prefs(PrefsCommand::Set {
            file,
            theme: Some("sepia".into()),
            language: None,
        });
        assert!(matches!(bad, Err(CliError::InvalidValue { .. })));
    }
}
