//! Service wiring and command execution

use anyhow::{Result, bail};
use clap::Subcommand;
use std::sync::Arc;
use usersvc_auth::{
    DefaultSessionManager, InMemoryRememberMeStore, InMemoryUserStore, RememberMeAuthProvider,
    RequestContext, Session, SessionManager, UserService,
};
use usersvc_common::Config;

use crate::state::ClientState;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in with login and password
    Login {
        login: String,
        password: String,
        /// Issue a remember-me cookie
        #[arg(long)]
        remember: bool,
    },
    /// Log in as a user without a password
    LoginAs { login: String },
    /// Log in with a one-time token
    Token { token: String },
    /// Issue a one-time login token for a user
    IssueToken { login: String },
    /// Show the current user
    Whoami,
    /// Log the current user off
    Logout,
}

/// The user service plus the in-memory stores backing it
pub struct App {
    service: UserService,
    users: Arc<InMemoryUserStore>,
    remember_me: Arc<InMemoryRememberMeStore>,
    config: Config,
}

impl App {
    /// Build the service from configuration and the saved server-side state
    pub fn new(config: Config, state: &ClientState) -> Result<Self> {
        let users = Arc::new(InMemoryUserStore::from_seed(&config.users)?);
        users.import_tokens(state.login_tokens.clone());

        let remember_me = Arc::new(InMemoryRememberMeStore::from_entries(
            state.remember_me.clone(),
        ));

        let mut service = UserService::from_config(users.clone(), &config.user_service);
        if config.remember_me.enabled {
            let provider = Arc::new(RememberMeAuthProvider::from_config(
                remember_me.clone(),
                &config.remember_me,
            ));
            service.add_auth_provider(provider.clone());
            service.add_auth_listener(provider);
            tracing::debug!("Remember-me enabled with cookie {}", config.remember_me.cookie_name);
        }

        Ok(Self {
            service,
            users,
            remember_me,
            config,
        })
    }

    /// Build the request context for one invocation
    ///
    /// The CLI is the host: like a front controller, it starts the session
    /// before handing the request to the service.
    pub fn request(&self, state: &ClientState, command: &Commands) -> Result<RequestContext> {
        let session = Session::from_snapshot(state.session.clone());
        DefaultSessionManager.start(&session)?;

        let mut ctx =
            RequestContext::new(Arc::new(session)).with_cookies(state.cookies.clone());
        if let Commands::Login { remember: true, .. } = command {
            ctx = ctx.with_param(
                &self.config.remember_me.activate_param,
                &self.config.remember_me.activate_value,
            );
        }
        Ok(ctx)
    }

    /// Run a command, returning the text to print
    pub fn execute(&self, ctx: &RequestContext, command: &Commands) -> Result<String> {
        let output = match command {
            Commands::Login {
                login, password, ..
            } => {
                if self.service.login(ctx, login, password)? {
                    format!("Logged in as {login}")
                } else {
                    bail!("invalid login or password");
                }
            }
            Commands::LoginAs { login } => {
                self.service.login_without_password(ctx, login)?;
                format!("Logged in as {login}")
            }
            Commands::Token { token } => {
                if self.service.login_via_token(ctx, token)? {
                    let login = self.service.user_login(ctx)?.unwrap_or_default();
                    format!("Logged in as {login}")
                } else {
                    bail!("unknown or already used token");
                }
            }
            Commands::IssueToken { login } => self.users.issue_token(login)?,
            Commands::Whoami => match self.service.logged_user(ctx)? {
                Some(user) => match &user.email {
                    Some(email) => format!("{} (id {}, {})", user.display_name(), user.id, email),
                    None => format!("{} (id {})", user.display_name(), user.id),
                },
                None => "Not logged in".to_string(),
            },
            Commands::Logout => {
                // Resolve first so a cookie-only identity is logged off too
                self.service.is_logged(ctx)?;
                self.service.logoff(ctx)?;
                "Logged out".to_string()
            }
        };
        Ok(output)
    }

    /// Copy what must survive this invocation back into the state
    pub fn persist(&self, ctx: &RequestContext, state: &mut ClientState) {
        state.session = ctx.session().snapshot();
        state.cookies = ctx.cookies().values();
        state.remember_me = self.remember_me.entries();
        state.login_tokens = self.users.export_tokens();

        for cookie in ctx.cookies().delta() {
            tracing::debug!("Set-Cookie: {}", cookie.encoded());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [user_service]
        session_prefix = "cli_"
        auto_start_session = true

        [remember_me]
        enabled = true
        expire = "1 week"

        [[users]]
        id = "1"
        login = "alice"
        password = "pw"
        email = "alice@example.com"

        [[users]]
        id = "2"
        login = "bob"
        password = "hunter2"
        full_name = "Bob Builder"
    "#;

    /// Run one command the way `main` does, carrying the state over
    fn invoke(state: &mut ClientState, command: Commands) -> Result<String> {
        let app = App::new(Config::from_toml_str(CONFIG)?, state)?;
        let ctx = app.request(state, &command)?;
        let output = app.execute(&ctx, &command);
        app.persist(&ctx, state);
        output
    }

    fn login(login: &str, password: &str, remember: bool) -> Commands {
        Commands::Login {
            login: login.to_string(),
            password: password.to_string(),
            remember,
        }
    }

    #[test]
    fn test_login_whoami_logout() {
        let mut state = ClientState::default();

        assert_eq!(invoke(&mut state, Commands::Whoami).unwrap(), "Not logged in");
        assert_eq!(
            invoke(&mut state, login("alice", "pw", false)).unwrap(),
            "Logged in as alice"
        );
        assert_eq!(
            invoke(&mut state, Commands::Whoami).unwrap(),
            "alice (id 1, alice@example.com)"
        );
        assert_eq!(state.session.values.get("cli_userId").map(String::as_str), Some("1"));

        assert_eq!(invoke(&mut state, Commands::Logout).unwrap(), "Logged out");
        assert_eq!(invoke(&mut state, Commands::Whoami).unwrap(), "Not logged in");
    }

    #[test]
    fn test_bad_password() {
        let mut state = ClientState::default();
        let err = invoke(&mut state, login("alice", "nope", false)).unwrap_err();
        assert!(err.to_string().contains("invalid login or password"));
    }

    #[test]
    fn test_remember_me_survives_new_session() {
        let mut state = ClientState::default();
        invoke(&mut state, login("bob", "hunter2", true)).unwrap();
        assert!(state.cookies.contains_key("remember_me"));
        assert_eq!(state.remember_me.len(), 1);

        state.drop_session();
        assert_eq!(
            invoke(&mut state, Commands::Whoami).unwrap(),
            "Bob Builder (id 2)"
        );

        // Logging out forgets the cookie, so a new session is anonymous
        invoke(&mut state, Commands::Logout).unwrap();
        assert!(!state.cookies.contains_key("remember_me"));
        state.drop_session();
        assert_eq!(invoke(&mut state, Commands::Whoami).unwrap(), "Not logged in");
    }

    #[test]
    fn test_one_time_token() {
        let mut state = ClientState::default();
        let token = invoke(
            &mut state,
            Commands::IssueToken {
                login: "alice".to_string(),
            },
        )
        .unwrap();
        assert_eq!(state.login_tokens.len(), 1);

        assert_eq!(
            invoke(&mut state, Commands::Token { token: token.clone() }).unwrap(),
            "Logged in as alice"
        );
        assert!(invoke(&mut state, Commands::Token { token }).is_err());
    }

    #[test]
    fn test_login_as_unknown_user() {
        let mut state = ClientState::default();
        let err = invoke(
            &mut state,
            Commands::LoginAs {
                login: "mallory".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("mallory"));
    }
}
